use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::instrument;

use crate::preserve;
use crate::select::Candidate;
use crate::stream;
use crate::window::TimeWindow;

/// Suffix appended to destination names when compressing
pub const COMPRESSED_SUFFIX: &str = ".gz";

/// Read-only settings shared by every server in a run
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub window: TimeWindow,
    pub compress: bool,
}

/// A server and the share its logs are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTarget {
    pub name: String,
    pub source: std::path::PathBuf,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Summary {
    pub servers_synced: usize,
    pub servers_unreachable: usize,
    pub servers_failed: usize,
    pub files_scanned: usize,
    pub files_selected: usize,
    pub files_copied: usize,
    pub files_failed: usize,
    pub bytes_copied: u64,
    pub timestamps_failed: usize,
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            servers_synced: self.servers_synced + other.servers_synced,
            servers_unreachable: self.servers_unreachable + other.servers_unreachable,
            servers_failed: self.servers_failed + other.servers_failed,
            files_scanned: self.files_scanned + other.files_scanned,
            files_selected: self.files_selected + other.files_selected,
            files_copied: self.files_copied + other.files_copied,
            files_failed: self.files_failed + other.files_failed,
            bytes_copied: self.bytes_copied + other.bytes_copied,
            timestamps_failed: self.timestamps_failed + other.timestamps_failed,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "servers synced: {}\n\
            servers unreachable: {}\n\
            servers failed: {}\n\
            files scanned: {}\n\
            files selected: {}\n\
            files copied: {}\n\
            files failed: {}\n\
            bytes copied: {}\n\
            timestamps not restored: {}",
            self.servers_synced,
            self.servers_unreachable,
            self.servers_failed,
            self.files_scanned,
            self.files_selected,
            self.files_copied,
            self.files_failed,
            bytesize::ByteSize(self.bytes_copied),
            self.timestamps_failed,
        )
    }
}

/// Name of the collected copy of `name`
pub fn destination_name(name: &std::ffi::OsStr, compress: bool) -> std::ffi::OsString {
    let mut target = name.to_owned();
    if compress {
        target.push(COMPRESSED_SUFFIX);
    }
    target
}

// Streams everything from `source` into the newly created `destination` file. The destination
// is closed (compressor first, then the file) before returning, on success and on error alike.
fn write_destination(
    source: &mut std::fs::File,
    destination: std::fs::File,
    dst: &std::path::Path,
    compress: bool,
) -> Result<u64> {
    if compress {
        let mut encoder = GzEncoder::new(destination, Compression::default());
        let copied = stream::copy_stream(source, &mut encoder)
            .with_context(|| format!("cannot copy source to destination {:?}", dst))?;
        let destination = encoder
            .finish()
            .with_context(|| format!("cannot finish compressing {:?}", dst))?;
        drop(destination);
        Ok(copied)
    } else {
        let mut destination = destination;
        let copied = stream::copy_stream(source, &mut destination)
            .with_context(|| format!("cannot copy source to destination {:?}", dst))?;
        drop(destination);
        Ok(copied)
    }
}

fn transfer_blocking(src: &std::path::Path, dst: &std::path::Path, compress: bool) -> Result<u64> {
    let mut source = std::fs::File::open(src)
        .with_context(|| format!("cannot open source file {:?}", src))?;
    let destination = std::fs::File::create(dst)
        .with_context(|| format!("cannot open destination file {:?}", dst))?;
    let res = write_destination(&mut source, destination, dst, compress);
    drop(source);
    if res.is_err() {
        // don't leave a truncated copy behind
        if let Err(error) = std::fs::remove_file(dst) {
            tracing::warn!("cannot remove partial destination file {:?}: {}", dst, &error);
        }
    }
    res
}

/// Copies (and optionally compresses) one file, returns the number of source bytes copied.
#[instrument]
pub async fn transfer(src: &std::path::Path, dst: &std::path::Path, compress: bool) -> Result<u64> {
    let _open_file_guard = throttle::open_file_permit().await;
    let span = tracing::Span::current();
    let src = src.to_owned();
    let dst = dst.to_owned();
    tokio::task::spawn_blocking(move || span.in_scope(|| transfer_blocking(&src, &dst, compress)))
        .await?
}

/// Collects the logs of a single server into `<snapshot_root>/<server>`.
///
/// Only a destination directory that can't be created is returned as an error, such a run is
/// misconfigured. An unreachable share and any per-file failure are logged, counted in the
/// returned summary, and skipped.
#[instrument(skip(settings), fields(server = %target.name))]
pub async fn sync_server(
    target: &ServerTarget,
    snapshot_root: &std::path::Path,
    settings: &Settings,
) -> Result<Summary> {
    tracing::info!("scanning {:?}", &target.source);
    let dst_dir = snapshot_root.join(&target.name);
    tokio::fs::create_dir_all(&dst_dir)
        .await
        .with_context(|| format!("error creating destination folder {:?}", &dst_dir))?;
    let mut summary = Summary::default();
    let mut entries = match tokio::fs::read_dir(&target.source).await {
        Ok(entries) => entries,
        Err(error) => {
            tracing::error!("unable to open {:?}: {}", &target.source, &error);
            summary.servers_unreachable = 1;
            return Ok(summary);
        }
    };
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(error) => {
                tracing::error!("failed listing {:?}: {}", &target.source, &error);
                summary.servers_unreachable = 1;
                return Ok(summary);
            }
        };
        let name = entry.file_name();
        let candidate = match entry.metadata().await.and_then(|metadata| {
            Candidate::from_metadata(name.clone(), &metadata)
        }) {
            Ok(candidate) => candidate,
            Err(error) => {
                tracing::error!("cannot read file info for {:?}: {}", &name, &error);
                summary.files_failed += 1;
                continue;
            }
        };
        if candidate.is_dir {
            continue;
        }
        summary.files_scanned += 1;
        if !candidate.qualifies(&settings.window) {
            tracing::trace!("skipping {:?}", &name);
            continue;
        }
        summary.files_selected += 1;
        let src = entry.path();
        let dst = dst_dir.join(destination_name(&name, settings.compress));
        tracing::debug!("copying {:?} to {:?}", &src, &dst);
        match transfer(&src, &dst, settings.compress).await {
            Ok(copied) => {
                summary.files_copied += 1;
                summary.bytes_copied += copied;
            }
            Err(error) => {
                tracing::error!("{:#}", &error);
                summary.files_failed += 1;
                continue;
            }
        }
        if let Err(error) = preserve::set_modified_time(&dst, candidate.times.modified.into()).await
        {
            tracing::error!("{:#}", &error);
            summary.timestamps_failed += 1;
        }
    }
    summary.servers_synced = 1;
    tracing::info!("done scanning {}", &target.name);
    Ok(summary)
}
