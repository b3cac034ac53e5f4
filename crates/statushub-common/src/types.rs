use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unified incident lifecycle status.
///
/// Every connector maps its provider's native status vocabulary onto these
/// four values; a native value outside the known vocabulary maps to
/// [`IncidentStatus::Investigating`].
///
/// # Examples
///
/// ```
/// use statushub_common::types::IncidentStatus;
///
/// let status: IncidentStatus = "monitoring".parse().unwrap();
/// assert_eq!(status, IncidentStatus::Monitoring);
/// assert_eq!(status.to_string(), "monitoring");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Investigating,
    Identified,
    Monitoring,
    Resolved,
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentStatus::Investigating => write!(f, "investigating"),
            IncidentStatus::Identified => write!(f, "identified"),
            IncidentStatus::Monitoring => write!(f, "monitoring"),
            IncidentStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl std::str::FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "investigating" => Ok(IncidentStatus::Investigating),
            "identified" => Ok(IncidentStatus::Identified),
            "monitoring" => Ok(IncidentStatus::Monitoring),
            "resolved" => Ok(IncidentStatus::Resolved),
            _ => Err(format!("unknown incident status: {s}")),
        }
    }
}

/// Unified incident severity, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use statushub_common::types::IncidentSeverity;
///
/// let sev: IncidentSeverity = "high".parse().unwrap();
/// assert_eq!(sev, IncidentSeverity::High);
/// assert!(IncidentSeverity::Critical > IncidentSeverity::Low);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentSeverity::Low => write!(f, "low"),
            IncidentSeverity::Medium => write!(f, "medium"),
            IncidentSeverity::High => write!(f, "high"),
            IncidentSeverity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for IncidentSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(IncidentSeverity::Low),
            "medium" => Ok(IncidentSeverity::Medium),
            "high" => Ok(IncidentSeverity::High),
            "critical" => Ok(IncidentSeverity::Critical),
            _ => Err(format!("unknown incident severity: {s}")),
        }
    }
}

/// Unified service component health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Operational,
    DegradedPerformance,
    PartialOutage,
    MajorOutage,
    UnderMaintenance,
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentStatus::Operational => write!(f, "operational"),
            ComponentStatus::DegradedPerformance => write!(f, "degraded_performance"),
            ComponentStatus::PartialOutage => write!(f, "partial_outage"),
            ComponentStatus::MajorOutage => write!(f, "major_outage"),
            ComponentStatus::UnderMaintenance => write!(f, "under_maintenance"),
        }
    }
}

impl std::str::FromStr for ComponentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "operational" => Ok(ComponentStatus::Operational),
            "degraded_performance" => Ok(ComponentStatus::DegradedPerformance),
            "partial_outage" => Ok(ComponentStatus::PartialOutage),
            "major_outage" => Ok(ComponentStatus::MajorOutage),
            "under_maintenance" => Ok(ComponentStatus::UnderMaintenance),
            _ => Err(format!("unknown component status: {s}")),
        }
    }
}

/// One incident as normalized by a connector.
///
/// Identity key is `(external_id, data_source_id)`; all writes are upserts
/// keyed on that pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub external_id: String,
    pub data_source_id: String,
    /// Display name of the system this incident belongs to (source name).
    pub system_name: String,
    pub title: String,
    pub description: Option<String>,
    pub status: IncidentStatus,
    pub severity: IncidentSeverity,
    /// Raw provider impact/priority string, preserved as-is.
    pub impact: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Last update timestamp as reported by the provider.
    pub updated_at: Option<DateTime<Utc>>,
    pub external_url: Option<String>,
    pub affected_services: Vec<String>,
    pub tags: Vec<String>,
    /// Opaque provider payload kept for debugging and future reprocessing.
    pub metadata: serde_json::Value,
    pub is_active: bool,
}

/// One service component as normalized by a connector.
///
/// Same `(external_id, data_source_id)` identity and upsert lifecycle as
/// [`Incident`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceComponent {
    pub external_id: String,
    pub data_source_id: String,
    pub name: String,
    pub status: ComponentStatus,
    pub group_name: Option<String>,
    pub position: Option<i64>,
    pub show_uptime: bool,
}

/// One entry of an incident's changelog, fetched on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentUpdate {
    pub incident_external_id: String,
    pub update_type: String,
    pub previous_status: Option<IncidentStatus>,
    pub new_status: Option<IncidentStatus>,
    pub message: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A configured external provider polled by the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub id: String,
    pub name: String,
    /// Connector discriminator; must resolve via the connector factory.
    pub source_type: String,
    pub base_url: String,
    /// Opaque credential blob, interpreted per connector type.
    pub credentials: Option<serde_json::Value>,
    pub is_active: bool,
    /// Advisory per-source interval; the scheduler currently runs one
    /// global interval for all sources.
    pub sync_interval_secs: i64,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for registering a new data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDataSourceRequest {
    pub name: String,
    pub source_type: String,
    pub base_url: String,
    #[serde(default)]
    pub credentials: Option<serde_json::Value>,
    #[serde(default)]
    pub sync_interval_secs: Option<i64>,
}
