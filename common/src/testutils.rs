#[cfg(test)]
pub async fn create_temp_dir() -> anyhow::Result<std::path::PathBuf> {
    let mut idx = 0;
    loop {
        let tmp_dir = std::env::temp_dir().join(format!("rlogsync_test{}", &idx));
        if let Err(error) = tokio::fs::create_dir(&tmp_dir).await {
            match error.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    idx += 1;
                }
                _ => return Err(error.into()),
            }
        } else {
            return Ok(tmp_dir);
        }
    }
}

/// Writes `contents` to `path` and backdates its modification time by `age`.
#[cfg(test)]
pub async fn write_log(
    path: &std::path::Path,
    contents: &[u8],
    age: std::time::Duration,
) -> anyhow::Result<std::time::SystemTime> {
    tokio::fs::write(path, contents).await?;
    let modified = std::time::SystemTime::now() - age;
    filetime::set_file_mtime(path, filetime::FileTime::from_system_time(modified))?;
    // read it back, the filesystem may round the timestamp
    Ok(tokio::fs::metadata(path).await?.modified()?)
}

#[cfg(test)]
pub async fn setup_share(root: &std::path::Path, server: &str) -> anyhow::Result<std::path::PathBuf> {
    // <root>/<server>/logs
    // |- active.tmp   (written 30 minutes ago)
    // |- other.tmp    (written 10 minutes ago, 3000 bytes)
    // |- rotated.log  (written 30 minutes ago)
    // |- stale.tmp    (written 3 hours ago)
    // |- archive.tmp/ (directory)
    let share = root.join(server).join("logs");
    tokio::fs::create_dir_all(&share).await?;
    let minute = std::time::Duration::from_secs(60);
    write_log(&share.join("active.tmp"), b"active log line\n", 30 * minute).await?;
    let other: Vec<u8> = (0..3000u32).map(|i| b'a' + (i % 26) as u8).collect();
    write_log(&share.join("other.tmp"), &other, 10 * minute).await?;
    write_log(&share.join("rotated.log"), b"rotated\n", 30 * minute).await?;
    write_log(&share.join("stale.tmp"), b"stale\n", 180 * minute).await?;
    tokio::fs::create_dir(share.join("archive.tmp")).await?;
    Ok(share)
}

#[cfg(test)]
pub async fn setup_snapshot(root: &std::path::Path, name: &str) -> anyhow::Result<std::path::PathBuf> {
    // <root>/<name>
    // |- web01
    //    |- a.tmp
    //    |- b.tmp.gz
    // |- web02
    //    |- c.tmp
    //    |- link -> ../web01/a.tmp
    let snapshot = root.join(name);
    let web01 = snapshot.join("web01");
    tokio::fs::create_dir_all(&web01).await?;
    tokio::fs::write(web01.join("a.tmp"), "a").await?;
    tokio::fs::write(web01.join("b.tmp.gz"), "b").await?;
    let web02 = snapshot.join("web02");
    tokio::fs::create_dir(&web02).await?;
    tokio::fs::write(web02.join("c.tmp"), "c").await?;
    tokio::fs::symlink("../web01/a.tmp", web02.join("link")).await?;
    Ok(snapshot)
}

/// True when running with privileges that bypass file permission checks (e.g. as root).
#[cfg(test)]
pub fn ignores_permissions() -> bool {
    use std::os::unix::fs::PermissionsExt;
    static PROBES: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);
    let idx = PROBES.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let probe = std::env::temp_dir().join(format!(
        "rlogsync_perm_probe{}_{}",
        std::process::id(),
        idx
    ));
    if std::fs::create_dir(&probe).is_err() {
        return false;
    }
    let _ = std::fs::set_permissions(&probe, std::fs::Permissions::from_mode(0o500));
    let writable = std::fs::write(probe.join("probe"), "x").is_ok();
    let _ = std::fs::set_permissions(&probe, std::fs::Permissions::from_mode(0o700));
    let _ = std::fs::remove_dir_all(&probe);
    writable
}
