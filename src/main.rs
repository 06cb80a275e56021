use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use takfeed_client::{
    ClientConfig, ConnectionStatus, ReconnectConfig, StdoutConnector, TakConnector, TxWorker,
    WorkerSummary,
};
use takfeed_core::{AppConfig, LogFormat, LoggingConfig};
use takfeed_gen::{
    tx_queue, DroneSimulator, IncidentConverter, IncidentFeed, QueueError, RunSummary, Scheduler,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// takfeed - feed synthetic and CAD-derived Cursor on Target events to a TAK server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "TAKFEED_CONFIG")]
    config: Option<PathBuf>,

    /// Print events to stdout instead of sending them
    #[arg(long)]
    stdout: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert every incident in a CAD JSON export, then exit
    Incidents {
        /// JSON document with an `Incidents` array
        file: PathBuf,
    },
    /// Fly the simulated Remote ID drone until interrupted
    Drone {
        /// Stop after this many position reports
        #[arg(long)]
        count: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.logging)?;

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    match &args.config {
        Some(path) => info!("Configuration loaded from {:?}", path),
        None => info!("Using default configuration"),
    }

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    let (queue, receiver) = tx_queue(config.queue.capacity);
    let status = ConnectionStatus::new();
    let reconnect = ReconnectConfig::from(&config.tak.reconnect);

    let worker = if args.stdout {
        info!("Writing events to stdout");
        TxWorker::new(StdoutConnector, reconnect, status)
    } else {
        let client_config = ClientConfig::from_tak_config(&config.tak)?;
        info!("Sending events to {}", client_config.endpoint);
        TxWorker::new(TakConnector::new(client_config, status.clone())?, reconnect, status)
    };
    let worker_handle = tokio::spawn(worker.run(receiver, cancel.clone()));

    let produced = match args.command {
        Command::Incidents { file } => {
            let feed = IncidentFeed::from_path(&file)
                .with_context(|| format!("Failed to load incidents from {:?}", file))?;
            info!(count = feed.len(), "Loaded incident feed");

            let converter = IncidentConverter::with_config(config.incidents.clone());
            let scheduler = Scheduler::new("incidents", queue, cancel.clone());
            scheduler.run_batch(feed, |record| converter.convert(&record)).await
        }
        Command::Drone { count } => {
            let mut simulator = DroneSimulator::with_config(config.drone.clone());
            info!(uas_id = %simulator.uas_id(), "Starting drone simulation");

            let period = config.drone.update_interval();
            let scheduler = Scheduler::new("drone", queue, cancel.clone());
            match count {
                Some(count) => scheduler.run_limited(&mut simulator, period, count).await,
                None => scheduler.run_continuous(&mut simulator, period).await,
            }
        }
    };

    // The scheduler owned the last queue handle, so the worker drains and exits.
    let delivered = worker_handle.await.context("Transmit worker panicked")?;

    report(produced, delivered)
}

fn report(
    produced: std::result::Result<RunSummary, QueueError>,
    delivered: Result<WorkerSummary>,
) -> Result<()> {
    match (produced, delivered) {
        (Ok(run), Ok(sent)) => {
            info!(
                produced = run.produced,
                enqueued = run.enqueued,
                sent = sent.sent,
                "Finished"
            );
            if run.enqueued > sent.sent {
                warn!(
                    unsent = run.enqueued - sent.sent,
                    "Stopped before every queued event was sent"
                );
            }
            Ok(())
        }
        (_, Err(e)) => {
            error!(error = %e, "Transmission failed");
            Err(e)
        }
        (Err(e), Ok(_)) => Err(anyhow::Error::new(e).context("Producer stopped")),
    }
}

fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, stopping...");
                cancel.cancel();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });
}

/// Logs go to stderr so `--stdout` output stays clean. `RUST_LOG` wins over
/// the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let level = logging.parse_level()?;
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let installed = match logging.format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    installed.map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}
