use anyhow::Result;
use tracing::instrument;

use crate::sync::{self, ServerTarget, Settings, Summary};

/// Synchronizes every server concurrently and waits for all of them to finish.
///
/// Servers are isolated from each other: an unreachable share or a failing file only shows up in
/// that server's part of the summary. A fatal error (or a panicking worker) is logged as soon as
/// it's seen, but the remaining servers still run to completion. Once all are done the first
/// fatal error is returned.
#[instrument(skip(targets, settings))]
pub async fn collect(
    targets: Vec<ServerTarget>,
    snapshot_root: &std::path::Path,
    settings: &Settings,
) -> Result<Summary> {
    if targets.is_empty() {
        tracing::warn!("no servers configured, nothing to collect");
    }
    let mut join_set = tokio::task::JoinSet::new();
    for target in targets {
        let snapshot_root = snapshot_root.to_owned();
        let settings = *settings;
        join_set.spawn(async move {
            let _server_guard = throttle::server_permit().await;
            let res = sync::sync_server(&target, &snapshot_root, &settings).await;
            (target.name, res)
        });
    }
    let mut summary = Summary::default();
    let mut fatal = None;
    while let Some(res) = join_set.join_next().await {
        match res {
            Ok((_, Ok(server_summary))) => summary = summary + server_summary,
            Ok((server, Err(error))) => {
                tracing::error!("[{}] {:#}", server, &error);
                summary.servers_failed += 1;
                fatal.get_or_insert(error.context(format!("failed collecting logs from {server}")));
            }
            Err(join_error) => {
                tracing::error!("server worker failed: {}", &join_error);
                summary.servers_failed += 1;
            }
        }
    }
    match fatal {
        Some(error) => Err(error),
        None => Ok(summary),
    }
}
