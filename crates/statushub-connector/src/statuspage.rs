use crate::error::{ConnectorError, Result as ConnectorResult};
use crate::http::StatusClient;
use crate::{Connector, SourceConfig};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use statushub_common::types::{
    ComponentStatus, Incident, IncidentSeverity, IncidentStatus, IncidentUpdate, ServiceComponent,
};

/// Connector for Atlassian Statuspage public v2 feeds
/// (e.g. `https://www.githubstatus.com/api/v2/incidents.json`).
///
/// Statuspage feeds are public; no credentials are required.
#[derive(Debug)]
pub struct StatuspageConnector {
    source_id: String,
    source_name: String,
    base_url: String,
    client: StatusClient,
}

/// Native incident status vocabulary. Statuspage also reports `postmortem`
/// for closed incidents; anything outside the known set maps to the
/// conservative default `investigating`.
fn map_incident_status(native: &str) -> IncidentStatus {
    match native {
        "investigating" => IncidentStatus::Investigating,
        "identified" => IncidentStatus::Identified,
        "monitoring" => IncidentStatus::Monitoring,
        "resolved" | "postmortem" => IncidentStatus::Resolved,
        _ => IncidentStatus::Investigating,
    }
}

/// Native impact vocabulary drives unified severity; the raw impact string
/// is preserved separately on the incident. Unknown impacts map to the
/// conservative default `medium`.
fn map_impact(native: &str) -> IncidentSeverity {
    match native {
        "none" => IncidentSeverity::Low,
        "minor" => IncidentSeverity::Medium,
        "major" | "critical" => IncidentSeverity::Critical,
        _ => IncidentSeverity::Medium,
    }
}

/// Native component status vocabulary. Unknown values map to `operational`.
fn map_component_status(native: &str) -> ComponentStatus {
    match native {
        "operational" => ComponentStatus::Operational,
        "degraded_performance" => ComponentStatus::DegradedPerformance,
        "partial_outage" => ComponentStatus::PartialOutage,
        "major_outage" => ComponentStatus::MajorOutage,
        "under_maintenance" => ComponentStatus::UnderMaintenance,
        _ => ComponentStatus::Operational,
    }
}

fn parse_time(value: Option<&serde_json::Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

impl StatuspageConnector {
    pub fn new(config: SourceConfig) -> ConnectorResult<Self> {
        let client = StatusClient::new()?;
        Ok(Self {
            source_id: config.source_id,
            source_name: config.name,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn fetch_raw_incidents(&self) -> Result<Vec<serde_json::Value>> {
        let url = format!("{}/api/v2/incidents.json", self.base_url);
        let body = self
            .client
            .get_json(&url, &[], &[])
            .await
            .context("Failed to fetch statuspage incidents")?;

        let incidents = body
            .get("incidents")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ConnectorError::Payload {
                source_name: self.source_name.clone(),
                detail: "missing 'incidents' array".to_string(),
            })?;
        Ok(incidents.to_vec())
    }

    fn parse_incident(&self, raw: &serde_json::Value) -> Option<Incident> {
        let external_id = raw.get("id").and_then(|v| v.as_str())?.to_string();
        let title = raw
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let native_status = raw.get("status").and_then(|v| v.as_str()).unwrap_or("");
        let native_impact = raw.get("impact").and_then(|v| v.as_str());
        let status = map_incident_status(native_status);

        // The newest update body doubles as the incident description;
        // Statuspage incidents carry no standalone description field.
        let description = raw
            .get("incident_updates")
            .and_then(|v| v.as_array())
            .and_then(|updates| updates.first())
            .and_then(|u| u.get("body"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let affected_services = raw
            .get("components")
            .and_then(|v| v.as_array())
            .map(|components| {
                components
                    .iter()
                    .filter_map(|c| c.get("name").and_then(|v| v.as_str()))
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        Some(Incident {
            external_id,
            data_source_id: self.source_id.clone(),
            system_name: self.source_name.clone(),
            title,
            description,
            status,
            severity: map_impact(native_impact.unwrap_or("")),
            impact: native_impact.map(|s| s.to_string()),
            started_at: parse_time(raw.get("started_at")).or_else(|| parse_time(raw.get("created_at"))),
            resolved_at: parse_time(raw.get("resolved_at")),
            updated_at: parse_time(raw.get("updated_at")),
            external_url: raw
                .get("shortlink")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            affected_services,
            tags: Vec::new(),
            metadata: raw.clone(),
            is_active: status != IncidentStatus::Resolved,
        })
    }

    fn parse_component(&self, raw: &serde_json::Value) -> Option<ServiceComponent> {
        let external_id = raw.get("id").and_then(|v| v.as_str())?.to_string();
        Some(ServiceComponent {
            external_id,
            data_source_id: self.source_id.clone(),
            name: raw
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            status: map_component_status(raw.get("status").and_then(|v| v.as_str()).unwrap_or("")),
            group_name: raw
                .get("group_id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            position: raw.get("position").and_then(|v| v.as_i64()),
            show_uptime: raw
                .get("showcase")
                .and_then(|v| v.as_bool())
                .unwrap_or(true),
        })
    }

    /// Statuspage embeds the changelog in the incident feed, newest-first;
    /// `previous_status` of each entry is the status of the next-older one.
    fn parse_updates(&self, incident: &serde_json::Value) -> Vec<IncidentUpdate> {
        let external_id = incident
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let updates = match incident.get("incident_updates").and_then(|v| v.as_array()) {
            Some(updates) => updates,
            None => return Vec::new(),
        };

        updates
            .iter()
            .enumerate()
            .map(|(i, u)| {
                let new_status = u
                    .get("status")
                    .and_then(|v| v.as_str())
                    .map(map_incident_status);
                let previous_status = updates
                    .get(i + 1)
                    .and_then(|older| older.get("status"))
                    .and_then(|v| v.as_str())
                    .map(map_incident_status);
                IncidentUpdate {
                    incident_external_id: external_id.clone(),
                    update_type: "status_change".to_string(),
                    previous_status,
                    new_status,
                    message: u
                        .get("body")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    timestamp: parse_time(u.get("created_at")),
                }
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Connector for StatuspageConnector {
    fn name(&self) -> &str {
        &self.source_name
    }

    async fn fetch_incidents(&self) -> Result<Vec<Incident>> {
        let raw = self.fetch_raw_incidents().await?;
        let mut incidents = Vec::with_capacity(raw.len());
        for value in &raw {
            match self.parse_incident(value) {
                Some(incident) => incidents.push(incident),
                None => {
                    tracing::warn!(
                        source = %self.source_name,
                        "Skipping statuspage incident without an id"
                    );
                }
            }
        }
        Ok(incidents)
    }

    async fn fetch_components(&self) -> Result<Vec<ServiceComponent>> {
        let url = format!("{}/api/v2/components.json", self.base_url);
        let body = self
            .client
            .get_json(&url, &[], &[])
            .await
            .context("Failed to fetch statuspage components")?;

        let components = body
            .get("components")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ConnectorError::Payload {
                source_name: self.source_name.clone(),
                detail: "missing 'components' array".to_string(),
            })?;

        Ok(components
            .iter()
            .filter_map(|c| self.parse_component(c))
            .collect())
    }

    async fn fetch_incident_updates(&self, external_id: &str) -> Result<Vec<IncidentUpdate>> {
        let raw = self.fetch_raw_incidents().await?;
        let incident = raw
            .iter()
            .find(|i| i.get("id").and_then(|v| v.as_str()) == Some(external_id));
        Ok(incident
            .map(|i| self.parse_updates(i))
            .unwrap_or_default())
    }
}
