use anyhow::Result;
use statushub_server::config::ServerConfig;
use statushub_server::sync::scheduler::SyncScheduler;
use statushub_server::sync::service::{ConnectorFactory, SourceConnectorFactory, SyncService};
use statushub_storage::{SqliteSyncStore, SyncStore};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("statushub=info".parse()?))
        .init();

    statushub_common::id::init(1, 1);

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.toml".to_string());
    let config = ServerConfig::load(&config_path)?;

    tracing::info!(
        data_dir = %config.database.data_dir,
        sync_interval_secs = config.sync.interval_secs,
        "statushub-server starting"
    );

    let store: Arc<dyn SyncStore> =
        Arc::new(SqliteSyncStore::new(Path::new(&config.database.data_dir))?);
    let factory: Arc<dyn ConnectorFactory> = Arc::new(SourceConnectorFactory);
    let service = Arc::new(SyncService::new(store.clone(), factory));

    let sync_handle = if config.sync.enabled {
        let scheduler = SyncScheduler::new(
            store.clone(),
            service.clone(),
            config.sync.interval_secs,
            config.sync.bootstrap_sources,
        );
        // Bootstrap failures abort startup; an engine that silently never
        // schedules is worse than a crash here.
        scheduler.start().await?;
        Some(tokio::spawn(async move {
            scheduler.run().await;
        }))
    } else {
        tracing::info!("Sync scheduler disabled");
        None
    };

    tracing::info!("Server started");

    signal::ctrl_c().await?;
    tracing::info!("Shutting down gracefully");

    if let Some(handle) = sync_handle {
        handle.abort();
    }

    Ok(())
}
