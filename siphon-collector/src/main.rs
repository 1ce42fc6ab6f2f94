//! Siphon Collector
//!
//! A daemon that forwards crash entries from a DropBox-style store to a log
//! sink.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Store: Directory of `<tag>@<timestamp>` entry files
//! - Services: Business logic (collection, constraints, log buffering)
//! - Scheduler: Constraint-gated admission of collection runs
//! - Triggers: Startup, SIGUSR1 and timer events that request a run
//!
//! Each admitted run walks the store from newest to oldest, decodes every
//! entry as UTF-8 and forwards it to the configured sink.

use anyhow::{Context, Result};
use siphon_core::domain::schedule::{Constraints, TriggerReason};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siphon_collector::config::{Config, SinkKind};
use siphon_collector::scheduler::{JobScheduler, SchedulerSettings};
use siphon_collector::service::{CollectionJob, CollectionService, ConstraintChecker, NetworkProbe};
use siphon_collector::shutdown::install_shutdown_handler;
use siphon_collector::sink::{JsonLinesSink, LogSink, TracingLogSink};
use siphon_collector::store::DirectoryStoreOpener;
use siphon_collector::trigger::{TriggerListener, spawn_signal_trigger, spawn_timer_trigger};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "siphon_collector=info,crash_log=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Siphon Collector");

    // Load configuration
    let config = load_config()?;
    info!(
        "Loaded configuration: collector_id={}, store_dir={}, tag={}",
        config.collector_id,
        config.store_dir.display(),
        config.tag
    );

    // Initialize services
    let sink = build_sink(&config)?;
    let opener = Arc::new(DirectoryStoreOpener::new(config.store_dir.clone()));
    let job: Arc<dyn CollectionService> = Arc::new(
        CollectionJob::new(opener, sink, config.tag.clone())
            .with_policy(config.result_policy)
            .with_skip_seen(config.skip_seen),
    );
    let checker: Arc<dyn ConstraintChecker> = Arc::new(NetworkProbe::new(
        config.network_probe_addr.clone(),
        config.network_probe_timeout,
    ));

    info!("Services initialized");

    let shutdown = install_shutdown_handler().context("Failed to install shutdown handler")?;
    let (scheduler, handle) = JobScheduler::new(SchedulerSettings::from(&config), job, checker);

    let constraints = Constraints {
        requires_network: config.requires_network,
    };
    let listener = Arc::new(TriggerListener::new(Arc::new(handle.clone()), constraints));

    if config.trigger_on_start {
        listener.on_event(TriggerReason::Startup);
    }

    spawn_signal_trigger(Arc::clone(&listener), shutdown.clone())
        .context("Failed to install SIGUSR1 trigger")?;

    if let Some(period) = config.trigger_interval {
        info!("Periodic trigger every {:?}", period);
        spawn_timer_trigger(Arc::clone(&listener), period, shutdown.clone());
    }

    info!("Collector initialized successfully");
    info!(
        "Poll interval: {:?}, Job timeout: {:?}",
        config.poll_interval, config.job_timeout
    );

    scheduler.run(shutdown).await;

    match handle.last_report() {
        Some(report) => info!(
            "Last run {} finished with {} ({:?}, {} processed, {} failed)",
            report.run_id, report.result, report.stop, report.stats.processed, report.stats.failed
        ),
        None => info!("No collection run completed"),
    }

    info!("Collector stopped");
    Ok(())
}

/// Loads configuration from environment variables
///
/// Unset variables take their defaults; a malformed one stops startup.
fn load_config() -> Result<Config> {
    let config = Config::from_env().context("Failed to load configuration from environment")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_sink(config: &Config) -> Result<Arc<dyn LogSink>> {
    match config.sink {
        SinkKind::Tracing => Ok(Arc::new(TracingLogSink)),
        SinkKind::JsonLines => {
            let path = config
                .output_path
                .as_ref()
                .context("output_path is required for the jsonl sink")?;
            let sink = JsonLinesSink::open(path)
                .with_context(|| format!("Failed to open output file {}", path.display()))?;
            info!("Forwarding entries to {}", path.display());
            Ok(Arc::new(sink))
        }
    }
}
