use crate::source_seed;
use crate::sync::service::SyncService;
use anyhow::Result;
use statushub_storage::SyncStore;
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Drives the sync service forever on a fixed global tick.
///
/// Lifecycle: [`start`](Self::start) covers the Starting state (seed
/// defaults, immediate first pass) and is the only place a failure may
/// propagate to process startup; [`run`](Self::run) is the Running state
/// and never returns — every pass error is caught and logged so one bad
/// cycle can never kill future scheduling. Stopping is the owner's job:
/// abort the task running `run` on shutdown.
pub struct SyncScheduler {
    store: Arc<dyn SyncStore>,
    service: Arc<SyncService>,
    interval_secs: u64,
    bootstrap_sources: bool,
}

impl SyncScheduler {
    pub fn new(
        store: Arc<dyn SyncStore>,
        service: Arc<SyncService>,
        interval_secs: u64,
        bootstrap_sources: bool,
    ) -> Self {
        Self {
            store,
            service,
            interval_secs,
            bootstrap_sources,
        }
    }

    /// Bootstrap: seed the default source list when the store is empty,
    /// then run one immediate pass.
    ///
    /// # Errors
    ///
    /// Propagates a store failure that prevents bootstrap entirely. A
    /// failure of the immediate pass is logged, not fatal; failed sources
    /// are retried on the next tick anyway.
    pub async fn start(&self) -> Result<()> {
        if self.bootstrap_sources {
            let created = source_seed::init_default_sources(self.store.as_ref())?;
            if created > 0 {
                tracing::info!(created, "Seeded default data sources");
            }
        }

        match self.service.run_pass().await {
            Ok(Some(summary)) => {
                tracing::info!(
                    sources_synced = summary.sources_synced,
                    sources_failed = summary.sources_failed,
                    incidents = summary.incidents_upserted,
                    components = summary.components_upserted,
                    "Initial sync pass finished"
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "Initial sync pass failed");
            }
        }
        Ok(())
    }

    /// Periodic loop; runs until the owning task is aborted.
    pub async fn run(&self) {
        tracing::info!(interval_secs = self.interval_secs, "Sync scheduler started");

        let mut tick = interval(Duration::from_secs(self.interval_secs));
        // The first tick fires immediately; start() already ran that pass.
        tick.tick().await;
        loop {
            tick.tick().await;
            match self.service.run_pass().await {
                Ok(Some(summary)) => {
                    tracing::info!(
                        sources_synced = summary.sources_synced,
                        sources_failed = summary.sources_failed,
                        incidents = summary.incidents_upserted,
                        components = summary.components_upserted,
                        "Sync pass finished"
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Sync pass failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::service::{ConnectorFactory, SyncService};
    use async_trait::async_trait;
    use statushub_common::types::{
        DataSource, Incident, IncidentSeverity, IncidentStatus, IncidentUpdate, ServiceComponent,
    };
    use statushub_connector::Connector;
    use statushub_storage::SqliteSyncStore;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct EmptyConnector {
        source_name: String,
    }

    #[async_trait]
    impl Connector for EmptyConnector {
        fn name(&self) -> &str {
            &self.source_name
        }

        async fn fetch_incidents(&self) -> anyhow::Result<Vec<Incident>> {
            Ok(vec![Incident {
                external_id: "inc-1".to_string(),
                data_source_id: "unused".to_string(),
                system_name: self.source_name.clone(),
                title: "Seeded incident".to_string(),
                description: None,
                status: IncidentStatus::Investigating,
                severity: IncidentSeverity::Medium,
                impact: None,
                started_at: None,
                resolved_at: None,
                updated_at: None,
                external_url: None,
                affected_services: vec![],
                tags: vec![],
                metadata: serde_json::Value::Null,
                is_active: true,
            }])
        }

        async fn fetch_components(&self) -> anyhow::Result<Vec<ServiceComponent>> {
            Ok(Vec::new())
        }

        async fn fetch_incident_updates(
            &self,
            _external_id: &str,
        ) -> anyhow::Result<Vec<IncidentUpdate>> {
            Ok(Vec::new())
        }
    }

    struct StubFactory;

    impl ConnectorFactory for StubFactory {
        fn create(
            &self,
            source: &DataSource,
        ) -> statushub_connector::error::Result<Box<dyn Connector>> {
            Ok(Box::new(EmptyConnector {
                source_name: source.name.clone(),
            }))
        }
    }

    #[tokio::test]
    async fn start_seeds_defaults_and_runs_an_immediate_pass() {
        statushub_common::id::init(1, 1);
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteSyncStore::new(dir.path()).unwrap());
        let service = Arc::new(SyncService::new(store.clone(), Arc::new(StubFactory)));
        let scheduler = SyncScheduler::new(store.clone(), service, 300, true);

        scheduler.start().await.unwrap();

        let sources = store.list_data_sources().unwrap();
        assert!(!sources.is_empty(), "bootstrap must seed default sources");
        for source in &sources {
            assert!(
                source.last_sync_at.is_some(),
                "the immediate pass must touch every seeded source"
            );
        }

        // Starting again must not seed a second default set.
        scheduler.start().await.unwrap();
        assert_eq!(store.list_data_sources().unwrap().len(), sources.len());
    }

    #[tokio::test]
    async fn start_respects_disabled_bootstrap() {
        statushub_common::id::init(1, 1);
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteSyncStore::new(dir.path()).unwrap());
        let service = Arc::new(SyncService::new(store.clone(), Arc::new(StubFactory)));
        let scheduler = SyncScheduler::new(store.clone(), service, 300, false);

        scheduler.start().await.unwrap();
        assert!(store.list_data_sources().unwrap().is_empty());
    }
}
