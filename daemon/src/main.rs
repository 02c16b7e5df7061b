//! `ceremony`: query a node, decode flips, or run a headless validation session.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use ceremony_codec::decode_flip_hex;
use ceremony_rpc::{HttpRemoteNode, RemoteNode};
use ceremony_session::{SessionConfig, ShutdownController, ValidationSession};
use ceremony_store::{FileValidationStore, MemoryValidationStore, ValidationStore};
use ceremony_types::{Clock, EpochInfo, SessionType, SystemClock};
use ceremony_utils::{format_countdown, format_duration, init_logging, LogFormat};
use ceremony_validation::{remaining_seconds, ValidationState};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ceremony", about = "Validation ceremony client")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, global = true, env = "CEREMONY_CONFIG")]
    config: Option<PathBuf>,

    /// Node JSON-RPC endpoint.
    #[arg(long, global = true, env = "CEREMONY_RPC_URL")]
    rpc_url: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, global = true, env = "CEREMONY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, global = true, env = "CEREMONY_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Keep submitted answers in this JSON file instead of memory.
    #[arg(long, global = true, env = "CEREMONY_STATE_FILE")]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Show the current epoch, period and time left in the phase.
    Epoch,
    /// List the flip hashes assigned for a session.
    Flips {
        #[arg(long, default_value = "short")]
        session: SessionType,
    },
    /// Decode a hex flip payload and describe it.
    Decode { hex: String },
    /// Run a validation session until interrupted, logging its progress.
    Watch,
}

impl Cli {
    /// File settings (or defaults), overridden by flags and env vars.
    fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_toml_file(path)?,
            None => SessionConfig::default(),
        };
        if let Some(rpc_url) = &self.rpc_url {
            config.rpc_url = rpc_url.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(path) = &self.state_file {
            config.state_file = Some(path.clone());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.session_config()?;
    init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        info!("Loaded config from {}", path.display());
    }

    match cli.command {
        Command::Epoch => show_epoch(&config).await,
        Command::Flips { session } => list_flips(&config, session).await,
        Command::Decode { hex } => decode(&hex),
        Command::Watch => watch(config).await,
    }
}

fn remote(config: &SessionConfig) -> anyhow::Result<HttpRemoteNode> {
    HttpRemoteNode::new(config.rpc_url.clone(), config.request_timeout())
        .context("failed to create node client")
}

async fn show_epoch(config: &SessionConfig) -> anyhow::Result<()> {
    let remote = remote(config)?;
    let epoch = remote.epoch().await.context("dna_epoch failed")?;
    let now = SystemClock.now();

    println!("epoch:            {}", epoch.epoch);
    println!("period:           {:?}", epoch.current_period);
    println!("validation start: {}", epoch.validation_start().to_rfc3339());

    if epoch.current_period.is_validation() {
        let intervals = remote
            .ceremony_intervals()
            .await
            .context("dna_ceremonyIntervals failed")?;
        let left = remaining_seconds(&epoch, &intervals, now);
        println!("remaining:        {}", format_countdown(Some(left)));
    } else {
        let until = (epoch.next_validation - now).num_seconds().max(0) as u64;
        println!("next validation:  in {}", format_duration(until));
    }
    Ok(())
}

async fn list_flips(config: &SessionConfig, session: SessionType) -> anyhow::Result<()> {
    let remote = remote(config)?;
    let Some(hashes) = remote.flip_hashes(session).await? else {
        println!("no {session} flips assigned yet");
        return Ok(());
    };
    for entry in &hashes {
        println!("{}  extra={}  ready={}", entry.hash, entry.extra, entry.ready);
    }
    println!(
        "{} flips, {} ready, {} extra",
        hashes.len(),
        hashes.iter().filter(|entry| entry.ready).count(),
        hashes.iter().filter(|entry| entry.extra).count()
    );
    Ok(())
}

fn decode(hex: &str) -> anyhow::Result<()> {
    let flip = decode_flip_hex(hex.trim()).context("flip payload does not decode")?;
    println!("{} images", flip.pics.len());
    for (i, pic) in flip.pics.iter().enumerate() {
        println!("  image {i}: {} bytes", pic.len());
    }
    println!("{} orders", flip.orders.len());
    for (i, order) in flip.orders.iter().enumerate() {
        println!("  order {i}: {order:?}");
    }
    Ok(())
}

async fn watch(config: SessionConfig) -> anyhow::Result<()> {
    let remote: Arc<dyn RemoteNode> = Arc::new(remote(&config)?);
    let store: Arc<dyn ValidationStore> = match &config.state_file {
        Some(path) => Arc::new(
            FileValidationStore::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => Arc::new(MemoryValidationStore::new()),
    };
    info!(rpc_url = %config.rpc_url, state_file = ?config.state_file, "starting validation session");

    let session = ValidationSession::start(config, remote, store, Arc::new(SystemClock))?;
    let handle = session.handle();

    let shutdown = ShutdownController::new();
    let mut stop = shutdown.subscribe();
    let signals = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signals.wait_for_signal().await {
            warn!(error = %e, "failed to listen for shutdown signals");
        }
    });

    let mut states = handle.subscribe();
    let mut seconds = handle.subscribe_seconds();
    let mut epochs = handle.subscribe_epoch();
    let mut last = Progress::of(&handle.state());

    loop {
        tokio::select! {
            _ = stop.recv() => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let progress = Progress::of(&states.borrow_and_update());
                if progress != last {
                    progress.log();
                    last = progress;
                }
            }
            changed = seconds.changed() => {
                if changed.is_err() {
                    break;
                }
                let left = *seconds.borrow_and_update();
                if matches!(left, Some(s) if s % 60 == 0 || s <= 10) {
                    info!(remaining = %format_countdown(left), "countdown");
                }
            }
            changed = epochs.changed() => {
                if changed.is_err() {
                    break;
                }
                let epoch: Option<EpochInfo> = epochs.borrow_and_update().clone();
                if let Some(epoch) = epoch {
                    info!(epoch = epoch.epoch, period = ?epoch.current_period, "node epoch");
                }
            }
        }
    }

    session.shutdown().await;
    info!("validation session exited cleanly");
    Ok(())
}

/// The parts of the state worth a log line when they change.
#[derive(PartialEq, Eq)]
struct Progress {
    flips: usize,
    visible: usize,
    failed: usize,
    ready: bool,
    short_submitted: bool,
    long_submitted: bool,
    error: Option<String>,
}

impl Progress {
    fn of(state: &ValidationState) -> Self {
        Self {
            flips: state.flips.len(),
            visible: state.visible_flips().count(),
            failed: state.flips.iter().filter(|flip| flip.failed).count(),
            ready: state.ready,
            short_submitted: state.short_answers_submitted,
            long_submitted: state.long_answers_submitted,
            error: state.error.clone(),
        }
    }

    fn log(&self) {
        match &self.error {
            Some(error) => warn!(
                flips = self.flips,
                error = %error,
                "validation session waiting on the node"
            ),
            None => info!(
                flips = self.flips,
                visible = self.visible,
                failed = self.failed,
                ready = self.ready,
                short_submitted = self.short_submitted,
                long_submitted = self.long_submitted,
                "validation progress"
            ),
        }
    }
}
