//! Shared library behind the `rlogsync` log collector
//!
//! `rlogsync` pulls log files from a fleet of servers into a central location. For every run it
//! picks the log files that were being written during a time window, copies them (optionally
//! gzip compressed) into a snapshot directory named after the window and restores their original
//! modification times. A separate mode prunes snapshot directories older than a retention age.
//!
//! # Layout
//!
//! ```text
//! <destination>/<cluster>/<start>-<end>/<server>/<file>[.gz]
//! ```
//!
//! Both stamps use the `YYYYMMDDThhmmssZ` format, see [`window`].
//!
//! # Modules
//!
//! - [`window`] - collection window and snapshot directory names
//! - [`select`] - which directory entries get collected
//! - [`stream`] - chunked copy between byte streams
//! - [`sync`] - collecting a single server
//! - [`fanout`] - collecting all servers of a cluster concurrently
//! - [`prune`] - removing expired snapshots
//! - [`fleet`] - the fleet configuration file
//!
//! # Error Handling
//!
//! Failures are isolated as narrowly as possible: a file that can't be copied is skipped, a
//! server whose share can't be listed is skipped, and neither stops the run. They're logged and
//! counted in the run [`sync::Summary`]. Only misconfiguration (bad config, a destination that
//! can't be created, an unreadable cluster directory when pruning) fails the run.
//!
//! # Logging
//!
//! All output goes through `tracing`. [`run`] installs a `tracing-subscriber` formatter whose
//! level follows the `-v`/`-q` flags unless `RUST_LOG` is set.

pub mod config;
pub mod fanout;
pub mod fleet;
pub mod preserve;
pub mod prune;
pub mod rm;
pub mod select;
pub mod stream;
pub mod sync;
pub mod version;
pub mod window;

mod testutils;

pub use config::{OutputConfig, RuntimeConfig, ThrottleConfig};
pub use fanout::collect;
pub use prune::prune;
pub use sync::sync_server;

fn init_tracing(output: &OutputConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(output.log_level()));
    // a subscriber may already be installed, e.g. by tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Runs `func` on a freshly built tokio runtime.
///
/// Sets up logging and the throttles first. On success the summary is printed when requested
/// and returned; on error the error is logged and `None` is returned so the caller can pick an
/// exit code.
pub fn run<Summary, Fut>(
    output: OutputConfig,
    runtime: RuntimeConfig,
    throttle_config: ThrottleConfig,
    func: impl FnOnce() -> Fut,
) -> Option<Summary>
where
    Summary: std::fmt::Display,
    Fut: std::future::Future<Output = anyhow::Result<Summary>>,
{
    init_tracing(&output);
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if runtime.max_workers > 0 {
        builder.worker_threads(runtime.max_workers);
    }
    if runtime.max_blocking_threads > 0 {
        builder.max_blocking_threads(runtime.max_blocking_threads);
    }
    let runtime = match builder.build() {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!("failed to start the runtime: {}", &error);
            return None;
        }
    };
    throttle::set_max_concurrent_servers(throttle_config.max_concurrent_servers);
    throttle::set_max_open_files(throttle_config.max_open_files);
    match runtime.block_on(func()) {
        Ok(summary) => {
            if output.print_summary || output.verbose > 0 {
                println!("{}", &summary);
            }
            Some(summary)
        }
        Err(error) => {
            tracing::error!("{:#}", &error);
            None
        }
    }
}
