use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use monitor_core::{ModelFilter, ViewState, ViewStateStore};
use monitor_poller::Poller;
use monitor_source::{EventSource, HttpEventSource, SampleEventSource};
use tokio::io::{AsyncBufReadExt, BufReader};

mod config;
mod input;
mod logging;
mod render;

use config::{MonitorConfig, Overrides};
use input::{parse_input, InputCommand};
use logging::init_logging;
use render::render_dashboard;

const SAMPLE_EVENT_COUNT: usize = 60;
const SAMPLE_SEED: u64 = 7;

#[derive(Parser, Debug)]
#[command(name = "llm-monitor")]
#[command(about = "Live dashboard for LLM request latency, token usage and cost")]
#[command(version)]
struct Cli {
    /// Monitor API base URL
    #[arg(long, global = true, env = "LLM_MONITOR_API_BASE")]
    base_url: Option<String>,

    /// Seconds between refreshes
    #[arg(long, global = true, env = "LLM_MONITOR_INTERVAL_SECS")]
    interval_secs: Option<u64>,

    /// Number of recent events to fetch
    #[arg(long, global = true, env = "LLM_MONITOR_LIMIT")]
    limit: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Use built-in sample data instead of the live API
    #[arg(long, global = true, default_value = "false")]
    sample: bool,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug mode
    #[arg(long, short, global = true, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Keep the dashboard open and refresh it periodically
    Watch {
        /// Only show events for this model
        #[arg(long, env = "LLM_MONITOR_MODEL")]
        model: Option<String>,
    },
    /// Run a single refresh and print the result
    Snapshot {
        /// Only show events for this model
        #[arg(long, env = "LLM_MONITOR_MODEL")]
        model: Option<String>,

        /// Print the view state as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let model = match &cli.command {
        Commands::Watch { model } | Commands::Snapshot { model, .. } => model.clone(),
    };

    let mut config = MonitorConfig::load(cli.config.as_deref())?;
    config.apply(Overrides {
        base_url: cli.base_url.clone(),
        interval_secs: cli.interval_secs,
        events_limit: cli.limit,
        request_timeout_secs: cli.timeout_secs,
        model,
    });
    config.validate()?;

    log::debug!("Effective configuration: {:?}", config);

    let source = build_source(&config, cli.sample)?;

    match cli.command {
        Commands::Watch { .. } => run_watch(&config, source).await,
        Commands::Snapshot { json, .. } => run_snapshot(&config, source, json).await,
    }
}

fn build_source(config: &MonitorConfig, sample: bool) -> anyhow::Result<Arc<dyn EventSource>> {
    if sample {
        log::info!("Using sample event source");
        return Ok(Arc::new(SampleEventSource::generated(
            SAMPLE_EVENT_COUNT,
            SAMPLE_SEED,
        )));
    }

    log::info!("Using monitor API at {}", config.base_url);
    let source = HttpEventSource::new(config.source_config())
        .with_context(|| format!("cannot use monitor API at {}", config.base_url))?;
    Ok(Arc::new(source))
}

async fn run_snapshot(
    config: &MonitorConfig,
    source: Arc<dyn EventSource>,
    json: bool,
) -> anyhow::Result<()> {
    let store = Arc::new(ViewStateStore::with_filter(config.initial_filter()));
    let poller = Poller::new(source, Arc::clone(&store), config.poller_config());

    poller.run_once().await;
    let state = store.snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        println!("{}", render_dashboard(&state));
    }

    match state.last_error {
        Some(error) => anyhow::bail!("refresh failed: {}", error),
        None => Ok(()),
    }
}

async fn run_watch(config: &MonitorConfig, source: Arc<dyn EventSource>) -> anyhow::Result<()> {
    let store = Arc::new(ViewStateStore::with_filter(config.initial_filter()));
    let mut updates = store.subscribe();
    let handle = Poller::new(source, Arc::clone(&store), config.poller_config()).spawn();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    redraw(&store.snapshot())?;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                redraw(&state)?;
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => match parse_input(&line) {
                    InputCommand::Filter(filter) => apply_filter(&handle, filter),
                    InputCommand::Refresh => handle.refresh(),
                    InputCommand::Quit => break,
                    InputCommand::Empty => {}
                    InputCommand::Unknown(text) => {
                        log::warn!("Unknown command: {}", text);
                    }
                },
                None => {
                    log::debug!("stdin closed; dashboard keeps refreshing until Ctrl-C");
                    stdin_open = false;
                }
            },
        }
    }

    handle.shutdown().await;
    println!("{}", "Dashboard closed".dimmed());
    Ok(())
}

fn apply_filter(handle: &monitor_poller::PollerHandle, filter: ModelFilter) {
    if !handle.set_filter(filter) {
        log::debug!("Filter unchanged");
    }
}

fn redraw(state: &ViewState) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "\x1B[2J\x1B[H{}", render_dashboard(state))?;
    stdout.flush()?;
    Ok(())
}
