//! edumine command-line mining client.

use anyhow::Context;
use clap::Parser;
use edumine_client::{
    ClientConfig, MiningController, MiningTicker, RpcBackend, ShutdownController, TeardownReason,
};
use edumine_mining::display::{format_accrued, format_progress, format_remaining, status_line};
use edumine_mining::{AccrualSnapshot, MiningBackend, MiningTotals};
use edumine_types::{Clock, SystemClock};
use edumine_utils::LogFormat;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "edumine", about = "Mining client for the edumine rewards platform")]
struct Cli {
    /// Backend JSON-RPC endpoint.
    #[arg(long, env = "EDUMINE_BACKEND_URL")]
    backend_url: Option<String>,

    /// Id of the signed-in user.
    #[arg(long, env = "EDUMINE_USER_ID")]
    user_id: Option<String>,

    /// Bearer token from the auth provider.
    #[arg(long, env = "EDUMINE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Display refresh period in milliseconds.
    #[arg(long, env = "EDUMINE_TICK_MS")]
    tick_interval_ms: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "EDUMINE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "EDUMINE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "EDUMINE_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Show the current session and lifetime totals.
    Status {
        /// Print machine-readable JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Start a mining session.
    Start,
    /// Claim a finished session.
    Claim,
    /// Show accrual live until interrupted.
    Watch {
        /// Exit as soon as the session becomes claimable.
        #[arg(long)]
        until_claimable: bool,
    },
}

/// Layer CLI flags and env vars over the config file (or defaults).
fn resolve_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ClientConfig::default(),
    };

    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(user_id) = &cli.user_id {
        config.user_id = user_id.clone();
    }
    if let Some(token) = &cli.access_token {
        config.access_token = Some(token.clone());
    }
    if let Some(ms) = cli.tick_interval_ms {
        config.tick_interval_ms = ms;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    config.validate()?;
    Ok(config)
}

#[derive(Serialize)]
struct StatusReport<'a> {
    #[serde(flatten)]
    snapshot: &'a AccrualSnapshot,
    accrued_display: String,
    progress_display: String,
    remaining_display: String,
    totals: Option<MiningTotals>,
}

fn print_status(
    snapshot: &AccrualSnapshot,
    totals: Option<MiningTotals>,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        let report = StatusReport {
            snapshot,
            accrued_display: format_accrued(snapshot),
            progress_display: format_progress(snapshot),
            remaining_display: format_remaining(snapshot),
            totals,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", status_line(snapshot));
    if let Some(totals) = totals {
        println!(
            "mined today: {} | all time: {}",
            totals.today_mined.to_decimal_string(2),
            totals.total_mined.to_decimal_string(2)
        );
    }
    Ok(())
}

async fn watch(
    controller: Arc<MiningController>,
    clock: Arc<dyn Clock>,
    config: &ClientConfig,
    until_claimable: bool,
) -> anyhow::Result<()> {
    let shutdown = Arc::new(ShutdownController::new());
    let ticker = MiningTicker::spawn(
        controller,
        clock,
        config.tick_interval(),
        shutdown.subscribe(),
    );

    let signals = tokio::spawn({
        let shutdown = Arc::clone(&shutdown);
        async move { shutdown.wait_for_signal().await }
    });

    let mut snapshots = ticker.subscribe();
    let mut stop = shutdown.subscribe();
    let mut stdout = std::io::stdout();
    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        write!(stdout, "\r\x1b[2K{}", status_line(&snapshot))?;
        stdout.flush()?;
        if until_claimable && snapshot.is_claimable() {
            shutdown.shutdown(TeardownReason::Claimable);
            break;
        }
        tokio::select! {
            _ = stop.recv() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    writeln!(stdout)?;

    signals.abort();
    ticker.join().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    edumine_utils::init_logging(config.log_format, &config.log_level);

    let backend: Arc<dyn MiningBackend> = Arc::new(RpcBackend::from_config(&config)?);
    tracing::info!(
        backend = backend.name(),
        url = %config.backend_url,
        user = %config.user_id,
        "connecting to rewards backend"
    );
    let controller = Arc::new(MiningController::new(backend));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    controller.load().await.context("loading mining session")?;

    match cli.command {
        Command::Status { json } => {
            print_status(&controller.snapshot(clock.now()), controller.totals(), json)?;
        }
        Command::Start => {
            controller
                .start(clock.now())
                .await
                .context("starting mining session")?;
            print_status(&controller.snapshot(clock.now()), controller.totals(), false)?;
        }
        Command::Claim => {
            let receipt = controller
                .claim(clock.now())
                .await
                .context("claiming mining reward")?;
            println!("claimed {} coins", receipt.claimed.to_decimal_string(2));
            print_status(&controller.snapshot(clock.now()), controller.totals(), false)?;
        }
        Command::Watch { until_claimable } => {
            watch(controller, clock, &config, until_claimable).await?;
        }
    }

    Ok(())
}
