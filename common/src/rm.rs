use anyhow::{Context, anyhow};
use async_recursion::async_recursion;
use tracing::instrument;

/// Error type for removal that keeps track of what was removed before failing.
#[derive(Debug, thiserror::Error)]
#[error("{source:#}")]
pub struct Error {
    #[source]
    pub source: anyhow::Error,
    pub summary: Summary,
}

impl Error {
    #[must_use]
    pub fn new(source: anyhow::Error, summary: Summary) -> Self {
        Error { source, summary }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Summary {
    pub files_removed: usize,
    pub symlinks_removed: usize,
    pub directories_removed: usize,
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            files_removed: self.files_removed + other.files_removed,
            symlinks_removed: self.symlinks_removed + other.symlinks_removed,
            directories_removed: self.directories_removed + other.directories_removed,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "files removed: {}\n\
            symlinks removed: {}\n\
            directories removed: {}",
            self.files_removed, self.symlinks_removed, self.directories_removed
        )
    }
}

/// Recursively removes `path`, entries of a directory are removed concurrently.
///
/// Symlinks are removed, never followed. All entries are attempted even if some fail.
#[instrument]
#[async_recursion]
pub async fn rm(path: &std::path::Path) -> Result<Summary, Error> {
    tracing::debug!("remove: {:?}", path);
    let metadata = tokio::fs::symlink_metadata(path)
        .await
        .with_context(|| format!("failed reading metadata from {:?}", &path))
        .map_err(|err| Error::new(err, Default::default()))?;
    if !metadata.is_dir() {
        tokio::fs::remove_file(path)
            .await
            .with_context(|| format!("failed removing {:?}", &path))
            .map_err(|err| Error::new(err, Default::default()))?;
        let summary = if metadata.is_symlink() {
            Summary {
                symlinks_removed: 1,
                ..Default::default()
            }
        } else {
            Summary {
                files_removed: 1,
                ..Default::default()
            }
        };
        return Ok(summary);
    }
    let mut entries = tokio::fs::read_dir(path)
        .await
        .with_context(|| format!("cannot open directory {:?} for reading", path))
        .map_err(|err| Error::new(err, Default::default()))?;
    let mut join_set = tokio::task::JoinSet::new();
    let mut errors = vec![];
    let mut summary = Summary::default();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let entry_path = entry.path();
                join_set.spawn(async move { rm(&entry_path).await });
            }
            Ok(None) => break,
            Err(error) => {
                errors.push(
                    anyhow::Error::from(error)
                        .context(format!("failed traversing directory {:?}", &path)),
                );
                break;
            }
        }
    }
    while let Some(res) = join_set.join_next().await {
        match res {
            Ok(Ok(entry_summary)) => summary = summary + entry_summary,
            Ok(Err(error)) => {
                summary = summary + error.summary;
                errors.push(error.source);
            }
            Err(join_error) => errors.push(join_error.into()),
        }
    }
    if !errors.is_empty() {
        tracing::debug!("remove: {:?} failed with: {:?}", path, &errors);
        return Err(Error::new(anyhow!("{:?}", &errors), summary));
    }
    tokio::fs::remove_dir(path)
        .await
        .with_context(|| format!("failed removing directory {:?}", &path))
        .map_err(|err| Error::new(err, summary))?;
    summary.directories_removed += 1;
    tracing::debug!("remove: {:?} succeeded!", path);
    Ok(summary)
}
