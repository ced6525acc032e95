use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use cycle_common::ingestors::{RedisSubConfig, RedisSubIngestor};
use cycle_common::store::postgres::PgCycleStore;
use cycle_common::{CycleStore, DashboardState, Dispatcher, IngestPipeline};

mod cycle_logic;
use cycle_logic::{config, downstream, logger};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config();
    let log_dir = config.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"));
    let log_level = config.log_level.clone().unwrap_or_else(|| "info".to_string());
    logger::setup_logging(&log_dir, &log_level)?;

    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL is required (env, CLI, or config file)")?;

    let store = PgCycleStore::from_url(&database_url)?;
    store.ensure_schema().await?;
    let store: Arc<dyn CycleStore> = Arc::new(store);
    log::info!("Cycle store ready.");

    let state = Arc::new(DashboardState::new());
    let dispatcher = Arc::new(Dispatcher::new());
    let pipeline = Arc::new(IngestPipeline::new(
        store.clone(),
        state.clone(),
        dispatcher.clone(),
    ));

    // Prime stats, trend, and the record cache from the store before
    // accepting viewers, so the first INITIAL_DATA is already complete.
    pipeline.warm_up().await;

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

    let sub_config = RedisSubConfig {
        url: config
            .redis_url
            .clone()
            .unwrap_or_else(|| "redis://127.0.0.1/".to_string()),
        channel: config
            .channel
            .clone()
            .unwrap_or_else(|| "factory/cycle".to_string()),
        base_delay: config
            .reconnect_base_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(cycle_common::ingestors::redis_sub::RECONNECT_BASE_DELAY),
        max_delay: config
            .reconnect_max_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(cycle_common::ingestors::redis_sub::RECONNECT_MAX_DELAY),
    };
    let ingestor = RedisSubIngestor::new(sub_config, pipeline.clone());
    let upstream_handle = {
        let shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move { ingestor.run(shutdown).await })
    };

    let app_state = Arc::new(downstream::AppState {
        dispatcher: dispatcher.clone(),
        state: state.clone(),
        store: store.clone(),
    });
    let port = config.port.unwrap_or(9100);
    let downstream_handle = tokio::spawn(downstream::run(
        port,
        app_state,
        shutdown_tx.subscribe(),
    ));

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut term_signal = signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();
                term_signal.recv().await;
                log::info!("SIGTERM received, initiating shutdown.");
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    // Send shutdown signal to all components
    let _ = shutdown_tx.send(());

    // Wait for components to shut down
    let _ = tokio::try_join!(upstream_handle, downstream_handle);

    log::info!("Shutdown complete.");
    Ok(())
}
