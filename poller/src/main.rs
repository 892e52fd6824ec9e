// Poller binary entry point

use anyhow::Result;
use common::config::{FileConfigSource, Settings};
use common::db::{DbPool, RollupRepository};
use common::poller::{CpuRollup, ExitReason, PollerConfig, PollerEngine, WorkUnit};
use common::signals::SignalCoordinator;
use common::{config::ConfigSource, telemetry};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before logging so the log level is honored
    let settings = Settings::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    telemetry::init_logging(&settings.observability.log_level)?;
    telemetry::init_metrics(settings.observability.metrics_port)?;

    info!(
        naptime_seconds = settings.poller.naptime_seconds_clamped(),
        "Starting ps-watcher poller"
    );

    // Migrations are run separately; the poller only needs the tables
    // to exist.
    let db_pool = DbPool::new(&settings.database).await.map_err(|e| {
        error!(error = %e, "Failed to initialize database pool");
        anyhow::anyhow!("Database initialization error: {}", e)
    })?;

    let signals = Arc::new(SignalCoordinator::new());
    signals.spawn_listeners()?;
    info!("Signal handlers installed (SIGHUP reload, SIGTERM/SIGINT terminate)");

    let repo = RollupRepository::new(db_pool.clone());
    let work: Arc<dyn WorkUnit> = Arc::new(CpuRollup::new(repo));
    let config_source: Arc<dyn ConfigSource> = Arc::new(FileConfigSource::new("config"));

    let mut engine = PollerEngine::new(
        PollerConfig::from_settings(&settings.poller),
        Arc::clone(&signals),
        config_source,
        work,
    );

    let reason = match engine.run().await {
        Ok(reason) => reason,
        Err(e) => {
            error!(error = %e, "Poller stopped on a fatal error");
            db_pool.close().await;
            return Err(e.into());
        }
    };

    db_pool.close().await;

    // The original background worker exited non-zero on every stop
    // path; here the terminate exit code is explicit configuration and
    // parent death stays a hard failure.
    let code = match reason {
        ExitReason::Terminated => {
            info!(
                exit_code = settings.poller.exit_code_on_terminate,
                "Poller terminated by signal"
            );
            settings.poller.exit_code_on_terminate
        }
        ExitReason::ParentDeath => {
            error!("Poller exiting: supervising parent process is gone");
            1
        }
    };

    std::process::exit(code);
}
