use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use statushub_common::id::next_id;
use statushub_common::types::{
    ComponentStatus, CreateDataSourceRequest, DataSource, Incident, IncidentStatus,
    IncidentSeverity, ServiceComponent,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StorageError;
use crate::{IncidentRow, ServiceComponentRow, SyncStore, DEFAULT_SYNC_INTERVAL_SECS};

const DATA_SOURCES_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS data_sources (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    source_type TEXT NOT NULL,
    base_url TEXT NOT NULL,
    credentials TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    sync_interval_secs INTEGER NOT NULL,
    last_sync_at INTEGER,
    retry_count INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_data_sources_active ON data_sources(is_active);
";

const INCIDENTS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS incidents (
    id TEXT PRIMARY KEY,
    external_id TEXT NOT NULL,
    data_source_id TEXT NOT NULL,
    system_name TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL,
    severity TEXT NOT NULL,
    impact TEXT,
    started_at INTEGER,
    resolved_at INTEGER,
    provider_updated_at INTEGER,
    external_url TEXT,
    affected_services TEXT,
    tags TEXT,
    metadata TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE(data_source_id, external_id)
);
CREATE INDEX IF NOT EXISTS idx_incidents_source ON incidents(data_source_id);
CREATE INDEX IF NOT EXISTS idx_incidents_active ON incidents(is_active);
";

const SERVICE_COMPONENTS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS service_components (
    id TEXT PRIMARY KEY,
    external_id TEXT NOT NULL,
    data_source_id TEXT NOT NULL,
    name TEXT NOT NULL,
    status TEXT NOT NULL,
    group_name TEXT,
    position INTEGER,
    show_uptime INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE(data_source_id, external_id)
);
CREATE INDEX IF NOT EXISTS idx_components_source ON service_components(data_source_id);
";

/// SQLite-backed [`SyncStore`].
pub struct SqliteSyncStore {
    conn: Mutex<Connection>,
    _db_path: PathBuf,
}

fn to_millis(dt: Option<DateTime<Utc>>) -> Option<i64> {
    dt.map(|dt| dt.timestamp_millis())
}

fn from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(DateTime::from_timestamp_millis)
}

fn json_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        serde_json::to_string(items).ok()
    }
}

fn parse_json_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

impl SqliteSyncStore {
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("statushub.db");
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(DATA_SOURCES_SCHEMA)?;
        conn.execute_batch(INCIDENTS_SCHEMA)?;
        conn.execute_batch(SERVICE_COMPONENTS_SCHEMA)?;
        tracing::info!(path = %db_path.display(), "Initialized sync store");
        Ok(Self {
            conn: Mutex::new(conn),
            _db_path: db_path,
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn row_to_data_source(row: &rusqlite::Row<'_>) -> rusqlite::Result<DataSource> {
        let credentials: Option<String> = row.get("credentials")?;
        Ok(DataSource {
            id: row.get("id")?,
            name: row.get("name")?,
            source_type: row.get("source_type")?,
            base_url: row.get("base_url")?,
            credentials: credentials.and_then(|s| serde_json::from_str(&s).ok()),
            is_active: row.get::<_, i64>("is_active")? != 0,
            sync_interval_secs: row.get("sync_interval_secs")?,
            last_sync_at: from_millis(row.get("last_sync_at")?),
            retry_count: row.get("retry_count")?,
            last_error: row.get("last_error")?,
            created_at: from_millis(row.get("created_at")?).unwrap_or_default(),
            updated_at: from_millis(row.get("updated_at")?).unwrap_or_default(),
        })
    }

    fn row_to_incident(row: &rusqlite::Row<'_>) -> rusqlite::Result<IncidentRow> {
        let status: String = row.get("status")?;
        let severity: String = row.get("severity")?;
        let metadata: Option<String> = row.get("metadata")?;
        Ok(IncidentRow {
            id: row.get("id")?,
            external_id: row.get("external_id")?,
            data_source_id: row.get("data_source_id")?,
            system_name: row.get("system_name")?,
            title: row.get("title")?,
            description: row.get("description")?,
            status: status.parse().unwrap_or(IncidentStatus::Investigating),
            severity: severity.parse().unwrap_or(IncidentSeverity::Medium),
            impact: row.get("impact")?,
            started_at: from_millis(row.get("started_at")?),
            resolved_at: from_millis(row.get("resolved_at")?),
            provider_updated_at: from_millis(row.get("provider_updated_at")?),
            external_url: row.get("external_url")?,
            affected_services: parse_json_list(row.get("affected_services")?),
            tags: parse_json_list(row.get("tags")?),
            metadata: metadata
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or(serde_json::Value::Null),
            is_active: row.get::<_, i64>("is_active")? != 0,
            created_at: from_millis(row.get("created_at")?).unwrap_or_default(),
            updated_at: from_millis(row.get("updated_at")?).unwrap_or_default(),
        })
    }

    fn row_to_component(row: &rusqlite::Row<'_>) -> rusqlite::Result<ServiceComponentRow> {
        let status: String = row.get("status")?;
        Ok(ServiceComponentRow {
            id: row.get("id")?,
            external_id: row.get("external_id")?,
            data_source_id: row.get("data_source_id")?,
            name: row.get("name")?,
            status: status.parse().unwrap_or(ComponentStatus::Operational),
            group_name: row.get("group_name")?,
            position: row.get("position")?,
            show_uptime: row.get::<_, i64>("show_uptime")? != 0,
            created_at: from_millis(row.get("created_at")?).unwrap_or_default(),
            updated_at: from_millis(row.get("updated_at")?).unwrap_or_default(),
        })
    }
}

impl SyncStore for SqliteSyncStore {
    fn list_data_sources(&self) -> Result<Vec<DataSource>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT * FROM data_sources ORDER BY created_at ASC")?;
        let rows = stmt.query_map([], Self::row_to_data_source)?;
        let mut sources = Vec::new();
        for row in rows {
            sources.push(row?);
        }
        Ok(sources)
    }

    fn get_data_source(&self, id: &str) -> Result<Option<DataSource>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT * FROM data_sources WHERE id = ?1")?;
        let mut rows = stmt.query_map(rusqlite::params![id], Self::row_to_data_source)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn create_data_source(&self, req: &CreateDataSourceRequest) -> Result<DataSource> {
        let id = next_id();
        let now = Utc::now();
        let now_ms = now.timestamp_millis();
        let interval = req
            .sync_interval_secs
            .unwrap_or(DEFAULT_SYNC_INTERVAL_SECS);
        let credentials = match &req.credentials {
            Some(value) => Some(serde_json::to_string(value).map_err(StorageError::Json)?),
            None => None,
        };

        let conn = self.conn();
        conn.execute(
            "INSERT INTO data_sources
             (id, name, source_type, base_url, credentials, is_active,
              sync_interval_secs, retry_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, 0, ?7, ?7)",
            rusqlite::params![id, req.name, req.source_type, req.base_url, credentials, interval, now_ms],
        )?;

        Ok(DataSource {
            id,
            name: req.name.clone(),
            source_type: req.source_type.clone(),
            base_url: req.base_url.clone(),
            credentials: req.credentials.clone(),
            is_active: true,
            sync_interval_secs: interval,
            last_sync_at: None,
            retry_count: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn set_data_source_active(&self, id: &str, is_active: bool) -> Result<()> {
        let now_ms = Utc::now().timestamp_millis();
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE data_sources SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![is_active as i64, now_ms, id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound {
                entity: "data_source",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn upsert_incident(&self, incident: &Incident) -> Result<()> {
        let now_ms = Utc::now().timestamp_millis();
        let metadata = serde_json::to_string(&incident.metadata).map_err(StorageError::Json)?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO incidents
             (id, external_id, data_source_id, system_name, title, description,
              status, severity, impact, started_at, resolved_at, provider_updated_at,
              external_url, affected_services, tags, metadata, is_active,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?18)
             ON CONFLICT(data_source_id, external_id) DO UPDATE SET
             system_name = excluded.system_name,
             title = excluded.title,
             description = excluded.description,
             status = excluded.status,
             severity = excluded.severity,
             impact = excluded.impact,
             started_at = excluded.started_at,
             resolved_at = excluded.resolved_at,
             provider_updated_at = excluded.provider_updated_at,
             external_url = excluded.external_url,
             affected_services = excluded.affected_services,
             tags = excluded.tags,
             metadata = excluded.metadata,
             is_active = excluded.is_active,
             updated_at = excluded.updated_at",
            rusqlite::params![
                next_id(),
                incident.external_id,
                incident.data_source_id,
                incident.system_name,
                incident.title,
                incident.description,
                incident.status.to_string(),
                incident.severity.to_string(),
                incident.impact,
                to_millis(incident.started_at),
                to_millis(incident.resolved_at),
                to_millis(incident.updated_at),
                incident.external_url,
                json_list(&incident.affected_services),
                json_list(&incident.tags),
                metadata,
                incident.is_active as i64,
                now_ms,
            ],
        )?;
        Ok(())
    }

    fn upsert_service_component(&self, component: &ServiceComponent) -> Result<()> {
        let now_ms = Utc::now().timestamp_millis();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO service_components
             (id, external_id, data_source_id, name, status, group_name,
              position, show_uptime, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT(data_source_id, external_id) DO UPDATE SET
             name = excluded.name,
             status = excluded.status,
             group_name = excluded.group_name,
             position = excluded.position,
             show_uptime = excluded.show_uptime,
             updated_at = excluded.updated_at",
            rusqlite::params![
                next_id(),
                component.external_id,
                component.data_source_id,
                component.name,
                component.status.to_string(),
                component.group_name,
                component.position,
                component.show_uptime as i64,
                now_ms,
            ],
        )?;
        Ok(())
    }

    fn record_sync_outcome(&self, data_source_id: &str, error: Option<&str>) -> Result<()> {
        let now_ms = Utc::now().timestamp_millis();
        let conn = self.conn();
        // The CASE keeps the counter update atomic with the outcome write.
        let updated = conn.execute(
            "UPDATE data_sources SET
             last_sync_at = ?1,
             last_error = ?2,
             retry_count = CASE WHEN ?2 IS NULL THEN 0 ELSE retry_count + 1 END,
             updated_at = ?1
             WHERE id = ?3",
            rusqlite::params![now_ms, error, data_source_id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound {
                entity: "data_source",
                id: data_source_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn list_incidents(
        &self,
        data_source_id: Option<&str>,
        active_only: bool,
    ) -> Result<Vec<IncidentRow>> {
        let mut sql = String::from("SELECT * FROM incidents WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(source_id) = data_source_id {
            sql.push_str(" AND data_source_id = ?");
            params.push(Box::new(source_id.to_string()));
        }
        if active_only {
            sql.push_str(" AND is_active = 1");
        }
        sql.push_str(" ORDER BY provider_updated_at DESC, created_at DESC");

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(&param_refs[..], Self::row_to_incident)?;
        let mut incidents = Vec::new();
        for row in rows {
            incidents.push(row?);
        }
        Ok(incidents)
    }

    fn list_service_components(
        &self,
        data_source_id: Option<&str>,
    ) -> Result<Vec<ServiceComponentRow>> {
        let mut sql = String::from("SELECT * FROM service_components WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(source_id) = data_source_id {
            sql.push_str(" AND data_source_id = ?");
            params.push(Box::new(source_id.to_string()));
        }
        sql.push_str(" ORDER BY position ASC, name ASC");

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(&param_refs[..], Self::row_to_component)?;
        let mut components = Vec::new();
        for row in rows {
            components.push(row?);
        }
        Ok(components)
    }
}
