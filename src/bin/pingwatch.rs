use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pingwatch::{
    actors::{CheckDispatcher, DeliveryHandle, EscalationHandler, RetryPolicy, SchedulerHandle},
    channel::{self, NotificationChannel},
    config::{Config, StorageConfig, load_config},
    probe::{AddressProbe, Probe},
    queue::{MemoryQueue, NotificationQueue},
    storage::{StorageBackend, memory::MemoryBackend},
    util,
};
use tracing::{debug, error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (JSON); defaults plus environment when omitted
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    let level = util::env_lookup(util::LOG_LEVEL)
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::TRACE);

    let filter = filter::Targets::new().with_targets(vec![("pingwatch", level)]);
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
    // .env has to be loaded before the log level is read
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = load_config(args.file.as_deref())?;
    debug!("running with {config:?}");

    let (storage, queue) = open_storage(&config).await?;

    let probe: Arc<dyn Probe> = Arc::new(AddressProbe::new(config.probe_timeout())?);
    let channel: Arc<dyn NotificationChannel> =
        channel::from_config(&config.channel, config.send_timeout())?.into();

    let escalation = EscalationHandler::new(storage.clone(), queue.clone());
    let dispatcher = CheckDispatcher::new(probe, escalation, RetryPolicy::from_config(&config))
        .with_single_flight(config.single_flight);

    let scheduler = SchedulerHandle::spawn(storage.clone(), dispatcher, config.period());
    let delivery = DeliveryHandle::spawn(queue, channel, config.mailing_period());
    info!(
        "probing every {}s, delivering every {}s",
        config.period, config.mailing_period
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");

    if let Err(e) = scheduler.shutdown().await {
        warn!("scheduler already stopped: {e:#}");
    }
    if let Err(e) = delivery.shutdown().await {
        warn!("delivery already stopped: {e:#}");
    }

    if let Err(e) = storage.close().await {
        error!("failed to close storage: {e}");
    }

    Ok(())
}

async fn open_storage(
    config: &Config,
) -> anyhow::Result<(Arc<dyn StorageBackend>, Arc<dyn NotificationQueue>)> {
    match &config.storage {
        StorageConfig::None => {
            warn!("running without persistence, queued alerts are lost on exit");
            Ok((Arc::new(MemoryBackend::new()), Arc::new(MemoryQueue::new())))
        }

        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => {
            let backend = pingwatch::storage::sqlite::SqliteBackend::new(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            let queue = backend.queue();
            Ok((Arc::new(backend), Arc::new(queue)))
        }

        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => {
            anyhow::bail!("sqlite storage requested but the storage-sqlite feature is disabled")
        }
    }
}
