use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::instrument;

use crate::rm;
use crate::window;

#[derive(Copy, Clone, Debug, Default)]
pub struct Summary {
    pub snapshots_removed: usize,
    pub snapshots_kept: usize,
    pub entries_ignored: usize,
    pub removal_failures: usize,
    pub rm_summary: rm::Summary,
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            snapshots_removed: self.snapshots_removed + other.snapshots_removed,
            snapshots_kept: self.snapshots_kept + other.snapshots_kept,
            entries_ignored: self.entries_ignored + other.entries_ignored,
            removal_failures: self.removal_failures + other.removal_failures,
            rm_summary: self.rm_summary + other.rm_summary,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "snapshots removed: {}\n\
            snapshots kept: {}\n\
            entries ignored: {}\n\
            removal failures: {}\n\
            {}",
            self.snapshots_removed,
            self.snapshots_kept,
            self.entries_ignored,
            self.removal_failures,
            &self.rm_summary,
        )
    }
}

/// Removes snapshot directories under `cluster_root` whose window ended more than `retention`
/// before `now`.
///
/// Anything that isn't a directory named like a snapshot is left untouched. Only failing to
/// list `cluster_root` itself is an error; a snapshot that can't be removed is logged and the
/// scan moves on.
#[instrument]
pub async fn prune(
    cluster_root: &std::path::Path,
    retention: std::time::Duration,
    now: DateTime<Utc>,
) -> Result<Summary> {
    let cutoff = TimeDelta::from_std(retention)
        .ok()
        .and_then(|retention| now.checked_sub_signed(retention))
        .with_context(|| format!("retention duration {:?} is out of range", retention))?;
    let mut entries = tokio::fs::read_dir(cluster_root)
        .await
        .with_context(|| format!("cannot read from folder {:?}", cluster_root))?;
    let mut summary = Summary::default();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed traversing folder {:?}", cluster_root))?
    {
        let path = entry.path();
        let is_dir = match entry.file_type().await {
            Ok(file_type) => file_type.is_dir(),
            Err(error) => {
                tracing::warn!("cannot read file type of {:?}: {}", &path, &error);
                false
            }
        };
        let end = entry
            .file_name()
            .to_str()
            .and_then(window::snapshot_end)
            .filter(|_| is_dir);
        let Some(end) = end else {
            tracing::trace!("ignoring {:?}", &path);
            summary.entries_ignored += 1;
            continue;
        };
        if end >= cutoff {
            tracing::debug!("keeping {:?}", &path);
            summary.snapshots_kept += 1;
            continue;
        }
        tracing::info!("cleaning up {:?}...", &path);
        match rm::rm(&path).await {
            Ok(rm_summary) => {
                summary.snapshots_removed += 1;
                summary.rm_summary = summary.rm_summary + rm_summary;
            }
            Err(error) => {
                tracing::error!("cannot delete folder {:?}: {}", &path, &error);
                summary.removal_failures += 1;
                summary.rm_summary = summary.rm_summary + error.summary;
            }
        }
    }
    Ok(summary)
}
