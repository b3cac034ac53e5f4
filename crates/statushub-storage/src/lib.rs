//! Persistence layer for the sync engine.
//!
//! The default implementation ([`store::SqliteSyncStore`]) keeps everything
//! in one SQLite database with WAL mode. Incidents and service components
//! are written exclusively through idempotent upserts keyed on
//! `(data_source_id, external_id)`, so re-running a sync pass can never
//! create duplicate rows.

pub mod error;
pub mod store;

#[cfg(test)]
mod tests;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statushub_common::types::{
    ComponentStatus, CreateDataSourceRequest, DataSource, Incident, IncidentSeverity,
    IncidentStatus, ServiceComponent,
};

pub use store::SqliteSyncStore;

/// Advisory default applied when a source is created without an explicit
/// per-source interval.
pub const DEFAULT_SYNC_INTERVAL_SECS: i64 = 300;

/// One stored incident row: the normalized incident plus row bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentRow {
    pub id: String,
    pub external_id: String,
    pub data_source_id: String,
    pub system_name: String,
    pub title: String,
    pub description: Option<String>,
    pub status: IncidentStatus,
    pub severity: IncidentSeverity,
    pub impact: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Last update timestamp as reported by the provider.
    pub provider_updated_at: Option<DateTime<Utc>>,
    pub external_url: Option<String>,
    pub affected_services: Vec<String>,
    pub tags: Vec<String>,
    pub metadata: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every upsert of this row, including no-op re-syncs.
    pub updated_at: DateTime<Utc>,
}

/// One stored service component row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceComponentRow {
    pub id: String,
    pub external_id: String,
    pub data_source_id: String,
    pub name: String,
    pub status: ComponentStatus,
    pub group_name: Option<String>,
    pub position: Option<i64>,
    pub show_uptime: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistence collaborator contract required by the sync engine.
///
/// Implementations must be safe to share across threads (`Send + Sync`)
/// because the store is reached from the scheduler task and from
/// on-demand callers concurrently.
pub trait SyncStore: Send + Sync {
    /// Returns all known data sources, active or not.
    fn list_data_sources(&self) -> Result<Vec<DataSource>>;

    /// Looks up one data source by id.
    fn get_data_source(&self, id: &str) -> Result<Option<DataSource>>;

    /// Registers a new data source. Used by scheduler bootstrap and admin
    /// surfaces.
    fn create_data_source(&self, req: &CreateDataSourceRequest) -> Result<DataSource>;

    /// Activates or deactivates a source. Deactivated sources are skipped
    /// by the sync pass but keep their stored incidents.
    fn set_data_source_active(&self, id: &str, is_active: bool) -> Result<()>;

    /// Idempotent insert-or-update keyed on `(data_source_id, external_id)`.
    /// Refreshes `updated_at` even when the payload is unchanged.
    fn upsert_incident(&self, incident: &Incident) -> Result<()>;

    /// Idempotent insert-or-update with the same key shape as incidents.
    fn upsert_service_component(&self, component: &ServiceComponent) -> Result<()>;

    /// Records the outcome of one sync attempt: sets `last_sync_at`; on
    /// failure stores `last_error` and increments `retry_count`, on
    /// success clears `last_error` and resets `retry_count` to zero.
    fn record_sync_outcome(&self, data_source_id: &str, error: Option<&str>) -> Result<()>;

    /// Queries stored incidents, newest provider update first.
    fn list_incidents(
        &self,
        data_source_id: Option<&str>,
        active_only: bool,
    ) -> Result<Vec<IncidentRow>>;

    /// Queries stored service components in display order.
    fn list_service_components(
        &self,
        data_source_id: Option<&str>,
    ) -> Result<Vec<ServiceComponentRow>>;
}
