use anyhow::{Context, Result};
use tracing::instrument;

/// Sets the modification time of `path` to `modified`, access time is set to now.
#[instrument]
pub async fn set_modified_time(path: &std::path::Path, modified: std::time::SystemTime) -> Result<()> {
    let dst = path.to_owned();
    tokio::task::spawn_blocking(move || -> Result<()> {
        tracing::debug!("setting timestamps");
        filetime::set_file_times(
            &dst,
            filetime::FileTime::now(),
            filetime::FileTime::from_system_time(modified),
        )
        .with_context(|| format!("failed setting last modified date on {:?}", &dst))
    })
    .await?
}
