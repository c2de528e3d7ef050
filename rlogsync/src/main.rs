use anyhow::{Context, Result};
use clap::Parser;
use tracing::instrument;

/// Window length and retention age used when neither the command line nor the config sets one
const DEFAULT_DURATION: std::time::Duration = std::time::Duration::from_secs(3600);

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rlogsync",
    version,
    long_version = common::version::long_version(),
    about = "Collect log files written during a time window from a fleet of servers",
    long_about = "`rlogsync` collects log files from every server of a cluster into a snapshot directory.

A file is collected when its name ends with `.tmp` (it's still being written), it was modified
after the window start and created before the window end. Each server is processed concurrently;
a server whose share can't be reached is skipped without affecting the others.

Collected files land in:
    <destination>/<cluster>/<start>-<end>/<server>/<file>[.gz]

Servers, shares and the destination come from a TOML config file, by default `<executable>.toml`.

EXAMPLES:
    # Collect the last hour of logs for the default cluster
    rlogsync

    # Collect a specific window, gzip compressing each file
    rlogsync --cluster prod --start \"2024-01-01 00:00:00\" --duration 30m --compress

    # Remove collections whose window ended more than a day ago
    rlogsync --cluster prod --clean --duration 24h"
)]
struct Args {
    // Collection options
    /// Start of the collection window in UTC, formatted as "YYYY-MM-DD HH:MM:SS"
    ///
    /// Defaults to the current time minus --duration.
    #[arg(long, value_name = "TIME", help_heading = "Collection options")]
    start: Option<String>,

    /// Length of the collection window; with --clean, the retention age
    ///
    /// Accepts a human readable duration, e.g. "15m", "1h", "2days". Defaults to the `duration`
    /// set in the config file, or 1h.
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration, help_heading = "Collection options")]
    duration: Option<std::time::Duration>,

    /// Cluster to collect logs from, defaults to the `cluster` set in the config file
    #[arg(long, value_name = "NAME", help_heading = "Collection options")]
    cluster: Option<String>,

    /// Gzip compress each collected file (adds a .gz suffix)
    #[arg(long, help_heading = "Collection options")]
    compress: bool,

    /// Remove collections of the cluster whose window ended longer than --duration ago, instead
    /// of collecting
    #[arg(long, help_heading = "Collection options")]
    clean: bool,

    /// Fleet config file, defaults to `<executable>.toml`
    #[arg(long, value_name = "PATH", help_heading = "Collection options")]
    config: Option<std::path::PathBuf>,

    // Progress & output
    /// Verbose level (implies "summary"): -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Print summary at the end
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    // Performance & throttling
    /// Maximum number of servers collected from at the same time, 0 means no limit
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Performance & throttling"
    )]
    max_concurrent_servers: usize,

    /// Maximum number of files copied at the same time, 0 means no limit
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Performance & throttling"
    )]
    max_open_files: usize,

    // Advanced settings
    /// Number of worker threads, 0 means number of cores
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_workers: usize,

    /// Number of blocking worker threads, 0 means Tokio runtime default (512)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_blocking_threads: usize,
}

enum Outcome {
    Collected(common::sync::Summary),
    Pruned(common::prune::Summary),
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Outcome::Collected(summary) => write!(f, "{summary}"),
            Outcome::Pruned(summary) => write!(f, "{summary}"),
        }
    }
}

#[instrument]
async fn async_main(args: Args) -> Result<Outcome> {
    let config_path = match args.config {
        Some(path) => path,
        None => common::fleet::default_path().context("cannot locate the default config file")?,
    };
    let fleet = common::fleet::FleetConfig::load(&config_path)?;
    let cluster = args
        .cluster
        .or_else(|| fleet.default.cluster.clone())
        .context("no cluster given, use --cluster or set `cluster` in the [default] section")?;
    let duration = match args.duration {
        Some(duration) => duration,
        None => fleet.duration()?.unwrap_or(DEFAULT_DURATION),
    };
    let base_dir =
        common::fleet::executable_dir().context("cannot locate the executable's directory")?;
    let cluster_root = fleet.destination_root(&base_dir)?.join(&cluster);
    if args.clean {
        tracing::info!("starting clean-up of logs in {:?}", &cluster_root);
        let summary = common::prune(&cluster_root, duration, chrono::Utc::now()).await?;
        tracing::info!("finished");
        return Ok(Outcome::Pruned(summary));
    }
    let window = match &args.start {
        Some(start) => common::window::TimeWindow::parse(start, duration)?,
        None => common::window::TimeWindow::ending_at(chrono::Utc::now(), duration)?,
    };
    let targets = fleet.targets(&cluster)?;
    let snapshot_root = cluster_root.join(window.snapshot_name());
    tracing::info!(
        "collecting {} server(s) of {} for {} into {:?}",
        targets.len(),
        &cluster,
        &window,
        &snapshot_root
    );
    let settings = common::sync::Settings {
        window,
        compress: args.compress,
    };
    let summary = common::collect(targets, &snapshot_root, &settings).await?;
    Ok(Outcome::Collected(summary))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let func = {
        let args = args.clone();
        || async_main(args)
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary,
    };
    let runtime = common::RuntimeConfig {
        max_workers: args.max_workers,
        max_blocking_threads: args.max_blocking_threads,
    };
    let throttle = common::ThrottleConfig {
        max_concurrent_servers: args.max_concurrent_servers,
        max_open_files: args.max_open_files,
    };
    let res = common::run(output, runtime, throttle, func);
    if res.is_none() {
        std::process::exit(1);
    }
    Ok(())
}
