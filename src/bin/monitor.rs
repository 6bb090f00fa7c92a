use anyhow::Context;
use chrono::{TimeDelta, Utc};
use clap::{Parser, Subcommand};
use stack_monitor::{
    config::{Config, default_config, read_config_file},
    daemon::{Daemon, ShutdownSignal},
    monitors::{AlertEvaluator, ConditionKey},
    report,
    storage::{AlertStateStore, JsonFileStore, SnapshotStore, load_history},
};
use tracing::{level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Health and resource monitor for a self-hosted service stack")]
struct Args {
    /// Config file (JSON). Built-in defaults are used when omitted
    #[arg(short, long, global = true)]
    file: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the monitoring loop until interrupted
    Run,
    /// Run a single cycle; exits with status 1 when any condition is breaching
    Check,
    /// Show the latest snapshot and alert cooldowns
    Dashboard,
    /// Summarize recent history
    Report {
        /// Number of snapshots to include
        #[arg(short, long, default_value_t = 50)]
        count: usize,
    },
    /// Remove snapshots older than the retention period
    Cleanup {
        /// Override the configured retention in days
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Print the persisted alert state
    State,
    /// Forget when alerts last fired, re-arming them
    ResetState {
        /// Only reset this condition, e.g. `cpu_high` or `service_down:n8n`
        #[arg(short, long)]
        key: Option<ConditionKey>,
    },
}

fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    // library and binary share the `stack_monitor` target
    let filter = filter::Targets::new().with_target("stack_monitor", level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => default_config()?,
    };

    match args.command {
        Command::Run => run(&config).await,
        Command::Check => check(&config).await,
        Command::Dashboard => dashboard(&config),
        Command::Report { count } => history_report(&config, count),
        Command::Cleanup { days } => cleanup(&config, days),
        Command::State => show_state(&config),
        Command::ResetState { key } => reset_state(&config, key),
    }
}

async fn run(config: &Config) -> anyhow::Result<()> {
    let mut daemon = Daemon::from_config(config)?;
    let signal = ShutdownSignal::new();

    signal
        .trigger_on_termination()
        .context("cannot install termination handler")?;

    daemon.run(signal.listener()).await;
    Ok(())
}

async fn check(config: &Config) -> anyhow::Result<()> {
    let mut daemon = Daemon::from_config(config)?;
    let cycle = daemon.run_cycle().await;

    println!("{}", report::status_line(&cycle.snapshot, &cycle.breaching));
    if !cycle.breaching.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn open_store(config: &Config) -> anyhow::Result<JsonFileStore> {
    JsonFileStore::open(&config.state_dir)
        .with_context(|| format!("cannot use state directory {}", config.state_dir.display()))
}

/// Readers never create or write files in the daemon's state directory.
fn open_store_read_only(config: &Config) -> anyhow::Result<JsonFileStore> {
    JsonFileStore::open_read_only(&config.state_dir)
        .with_context(|| format!("cannot read state directory {}", config.state_dir.display()))
}

fn dashboard(config: &Config) -> anyhow::Result<()> {
    let store = open_store_read_only(config)?;
    let latest = store.latest()?;
    let state = AlertStateStore::in_dir(&config.state_dir).load();
    let evaluator = AlertEvaluator::new(config.thresholds, config.cooldown);

    print!(
        "{}",
        report::render_dashboard(latest.as_ref(), &state, &evaluator, Utc::now())
    );
    Ok(())
}

fn history_report(config: &Config, count: usize) -> anyhow::Result<()> {
    let store = open_store_read_only(config)?;
    let history = load_history(&store, count)?;

    print!("{}", report::render_report(&history));
    Ok(())
}

fn cleanup(config: &Config, days: Option<u32>) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let days = days.unwrap_or(config.retention_days);
    let cutoff = Utc::now()
        .checked_sub_signed(TimeDelta::days(i64::from(days)))
        .context("retention period out of range")?;

    let deleted = store.prune(cutoff)?;
    println!("Removed {deleted} snapshots older than {days} days");
    Ok(())
}

fn show_state(config: &Config) -> anyhow::Result<()> {
    let state = AlertStateStore::in_dir(&config.state_dir).load();
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn reset_state(config: &Config, key: Option<ConditionKey>) -> anyhow::Result<()> {
    let store = AlertStateStore::in_dir(&config.state_dir);
    let mut state = store.load();

    match key {
        Some(key) => {
            if !state.remove(&key) {
                println!("No alert state recorded for {key}");
                return Ok(());
            }
            println!("Re-armed {key}");
        }
        None => {
            state.clear();
            println!("Re-armed all alerts");
        }
    }

    store.persist(&state)?;
    Ok(())
}
