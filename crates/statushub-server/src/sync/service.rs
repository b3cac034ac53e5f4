use anyhow::{Context, Result};
use statushub_common::types::{DataSource, IncidentUpdate};
use statushub_connector::{build_connector, Connector, SourceConfig};
use statushub_storage::SyncStore;
use std::sync::Arc;

/// Builds a connector for a data source. Injected so tests can substitute
/// provider stubs; the production implementation is
/// [`SourceConnectorFactory`].
pub trait ConnectorFactory: Send + Sync {
    fn create(
        &self,
        source: &DataSource,
    ) -> statushub_connector::error::Result<Box<dyn Connector>>;
}

/// Production factory: closed dispatch on `DataSource.source_type`.
pub struct SourceConnectorFactory;

impl ConnectorFactory for SourceConnectorFactory {
    fn create(
        &self,
        source: &DataSource,
    ) -> statushub_connector::error::Result<Box<dyn Connector>> {
        build_connector(
            &source.source_type,
            SourceConfig {
                source_id: source.id.clone(),
                name: source.name.clone(),
                base_url: source.base_url.clone(),
                credentials: source.credentials.clone(),
            },
        )
    }
}

/// Counters for one finished sync pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassSummary {
    pub sources_synced: usize,
    pub sources_failed: usize,
    pub incidents_upserted: usize,
    pub components_upserted: usize,
}

/// Executes one complete pass over all active data sources.
///
/// Every failure — unsupported type, missing credentials, transport,
/// parsing, upsert — is caught at the owning source's boundary, recorded
/// on that source, and never aborts the rest of the pass.
pub struct SyncService {
    store: Arc<dyn SyncStore>,
    factory: Arc<dyn ConnectorFactory>,
    pass_lock: tokio::sync::Mutex<()>,
}

impl SyncService {
    pub fn new(store: Arc<dyn SyncStore>, factory: Arc<dyn ConnectorFactory>) -> Self {
        Self {
            store,
            factory,
            pass_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one full pass. Returns `None` when a previous pass is still in
    /// flight and this one was skipped.
    pub async fn run_pass(&self) -> Result<Option<PassSummary>> {
        let _guard = match self.pass_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("Previous sync pass still running, skipping this one");
                return Ok(None);
            }
        };

        let sources = self
            .store
            .list_data_sources()
            .context("Failed to load data sources")?;

        let mut summary = PassSummary::default();
        for source in sources.into_iter().filter(|s| s.is_active) {
            match self.sync_source(&source).await {
                Ok((incidents, components)) => {
                    summary.sources_synced += 1;
                    summary.incidents_upserted += incidents;
                    summary.components_upserted += components;
                    tracing::info!(
                        source = %source.name,
                        incidents,
                        components,
                        "Source synced"
                    );
                    if let Err(e) = self.store.record_sync_outcome(&source.id, None) {
                        tracing::error!(
                            source = %source.name,
                            error = %e,
                            "Failed to record sync success"
                        );
                    }
                }
                Err(e) => {
                    summary.sources_failed += 1;
                    tracing::error!(
                        source = %source.name,
                        source_id = %source.id,
                        error = %e,
                        "Source sync failed"
                    );
                    let message = format!("{e:#}");
                    if let Err(e) = self.store.record_sync_outcome(&source.id, Some(&message)) {
                        tracing::error!(
                            source = %source.name,
                            error = %e,
                            "Failed to record sync failure"
                        );
                    }
                }
            }
        }

        Ok(Some(summary))
    }

    /// Sync one source: build its connector, fetch, upsert. Any error here
    /// belongs to this source alone.
    async fn sync_source(&self, source: &DataSource) -> Result<(usize, usize)> {
        let connector = self
            .factory
            .create(source)
            .with_context(|| format!("Failed to build connector for source '{}'", source.name))?;

        let incidents = connector
            .fetch_incidents()
            .await
            .context("Failed to fetch incidents")?;
        let mut incidents_upserted = 0;
        for incident in &incidents {
            self.store
                .upsert_incident(incident)
                .with_context(|| format!("Failed to upsert incident '{}'", incident.external_id))?;
            incidents_upserted += 1;
        }

        let components = connector
            .fetch_components()
            .await
            .context("Failed to fetch components")?;
        let mut components_upserted = 0;
        for component in &components {
            self.store.upsert_service_component(component).with_context(|| {
                format!("Failed to upsert component '{}'", component.external_id)
            })?;
            components_upserted += 1;
        }

        Ok((incidents_upserted, components_upserted))
    }

    /// On-demand changelog fetch for one incident; not part of the poll
    /// loop.
    pub async fn fetch_incident_updates(
        &self,
        data_source_id: &str,
        external_id: &str,
    ) -> Result<Vec<IncidentUpdate>> {
        let source = self
            .store
            .get_data_source(data_source_id)?
            .ok_or_else(|| anyhow::anyhow!("data source not found: {data_source_id}"))?;
        let connector = self
            .factory
            .create(&source)
            .with_context(|| format!("Failed to build connector for source '{}'", source.name))?;
        connector.fetch_incident_updates(external_id).await
    }
}
