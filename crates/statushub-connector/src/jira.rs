use crate::error::{ConnectorError, Result as ConnectorResult};
use crate::http::StatusClient;
use crate::{Connector, SourceConfig};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use statushub_common::types::{
    ComponentStatus, Incident, IncidentSeverity, IncidentStatus, IncidentUpdate, ServiceComponent,
};

/// Connector for a Jira project used as an incident tracker.
///
/// The credential blob must carry an `access_token` and may carry a
/// `project_key` (scopes the search and enables component discovery) and a
/// custom `jql` override.
#[derive(Debug)]
pub struct JiraConnector {
    source_id: String,
    source_name: String,
    base_url: String,
    access_token: String,
    project_key: Option<String>,
    jql: Option<String>,
    client: StatusClient,
}

/// Jira workflows are free-form; the table covers the common default
/// status names and falls back to `investigating` for everything else.
fn map_status(native: &str) -> IncidentStatus {
    match native.to_lowercase().as_str() {
        "open" | "to do" | "backlog" | "reopened" => IncidentStatus::Investigating,
        "in progress" => IncidentStatus::Identified,
        "in review" | "monitoring" => IncidentStatus::Monitoring,
        "done" | "closed" | "resolved" => IncidentStatus::Resolved,
        _ => IncidentStatus::Investigating,
    }
}

/// Jira priority resolves unified severity; the raw priority name is
/// preserved as the incident's impact string. Unknown priorities map to
/// the conservative default `medium`.
fn map_priority(native: &str) -> IncidentSeverity {
    match native.to_lowercase().as_str() {
        "highest" | "blocker" => IncidentSeverity::Critical,
        "high" => IncidentSeverity::High,
        "medium" => IncidentSeverity::Medium,
        "low" | "lowest" => IncidentSeverity::Low,
        _ => IncidentSeverity::Medium,
    }
}

/// Jira timestamps come as `2024-04-02T09:45:00.000+0000`, which is not
/// quite RFC 3339; try both forms.
fn parse_time(value: Option<&serde_json::Value>) -> Option<DateTime<Utc>> {
    let s = value.and_then(|v| v.as_str())?;
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.3f%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl JiraConnector {
    pub fn new(config: SourceConfig) -> ConnectorResult<Self> {
        let credentials = config.credentials.as_ref();
        let access_token = credentials
            .and_then(|c| c.get("access_token"))
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .ok_or(ConnectorError::MissingCredentials {
                source_name: config.name.clone(),
                detail: "jira connector requires an access_token credential",
            })?;

        let project_key = credentials
            .and_then(|c| c.get("project_key"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let jql = credentials
            .and_then(|c| c.get("jql"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let client = StatusClient::new()?;
        Ok(Self {
            source_id: config.source_id,
            source_name: config.name,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token,
            project_key,
            jql,
            client,
        })
    }

    fn auth_headers(&self) -> Vec<(&'static str, String)> {
        vec![("Authorization", format!("Bearer {}", self.access_token))]
    }

    fn search_jql(&self) -> String {
        if let Some(jql) = &self.jql {
            return jql.clone();
        }
        match &self.project_key {
            Some(key) => format!("project = {key} ORDER BY updated DESC"),
            None => "ORDER BY updated DESC".to_string(),
        }
    }

    fn parse_issue(&self, raw: &serde_json::Value) -> Option<Incident> {
        let external_id = raw.get("key").and_then(|v| v.as_str())?.to_string();
        let fields = raw.get("fields")?;

        let native_status = fields
            .get("status")
            .and_then(|s| s.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let native_priority = fields
            .get("priority")
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str());
        let status = map_status(native_status);

        let affected_services = fields
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

        let tags = fields
            .get("labels")
            .and_then(|v| v.as_array())
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|l| l.as_str())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        Some(Incident {
            external_id: external_id.clone(),
            data_source_id: self.source_id.clone(),
            system_name: self.source_name.clone(),
            title: fields
                .get("summary")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            description: fields
                .get("description")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            status,
            severity: map_priority(native_priority.unwrap_or("")),
            impact: native_priority.map(|s| s.to_string()),
            started_at: parse_time(fields.get("created")),
            resolved_at: parse_time(fields.get("resolutiondate")),
            updated_at: parse_time(fields.get("updated")),
            external_url: Some(format!("{}/browse/{}", self.base_url, external_id)),
            affected_services,
            tags,
            metadata: raw.clone(),
            is_active: status != IncidentStatus::Resolved,
        })
    }
}

#[async_trait::async_trait]
impl Connector for JiraConnector {
    fn name(&self) -> &str {
        &self.source_name
    }

    async fn fetch_incidents(&self) -> Result<Vec<Incident>> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let body = self
            .client
            .get_json(
                &url,
                &[
                    ("jql", self.search_jql()),
                    ("maxResults", "100".to_string()),
                ],
                &self.auth_headers(),
            )
            .await
            .context("Failed to search jira issues")?;

        let issues = body
            .get("issues")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ConnectorError::Payload {
                source_name: self.source_name.clone(),
                detail: "missing 'issues' array".to_string(),
            })?;

        Ok(issues.iter().filter_map(|i| self.parse_issue(i)).collect())
    }

    async fn fetch_components(&self) -> Result<Vec<ServiceComponent>> {
        let key = match &self.project_key {
            Some(key) => key,
            None => {
                tracing::debug!(
                    source = %self.source_name,
                    "jira source has no project_key, skipping component discovery"
                );
                return Ok(Vec::new());
            }
        };

        let url = format!("{}/rest/api/2/project/{}/components", self.base_url, key);
        let body = self
            .client
            .get_json(&url, &[], &self.auth_headers())
            .await
            .context("Failed to fetch jira project components")?;

        let components = body.as_array().ok_or_else(|| ConnectorError::Payload {
            source_name: self.source_name.clone(),
            detail: "expected a top-level component array".to_string(),
        })?;

        Ok(components
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                let external_id = c.get("id").and_then(|v| v.as_str())?.to_string();
                Some(ServiceComponent {
                    external_id,
                    data_source_id: self.source_id.clone(),
                    name: c
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    // Jira components carry no health state of their own.
                    status: ComponentStatus::Operational,
                    group_name: Some(key.clone()),
                    position: Some(i as i64),
                    show_uptime: false,
                })
            })
            .collect())
    }

    async fn fetch_incident_updates(&self, external_id: &str) -> Result<Vec<IncidentUpdate>> {
        let url = format!(
            "{}/rest/api/2/issue/{}/changelog",
            self.base_url, external_id
        );
        let body = self
            .client
            .get_json(&url, &[], &self.auth_headers())
            .await
            .context("Failed to fetch jira issue changelog")?;

        let entries = body
            .get("values")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ConnectorError::Payload {
                source_name: self.source_name.clone(),
                detail: "missing changelog 'values' array".to_string(),
            })?;

        let mut updates = Vec::new();
        for entry in entries {
            let timestamp = parse_time(entry.get("created"));
            let items = match entry.get("items").and_then(|v| v.as_array()) {
                Some(items) => items,
                None => continue,
            };
            for item in items {
                if item.get("field").and_then(|v| v.as_str()) != Some("status") {
                    continue;
                }
                let from = item.get("fromString").and_then(|v| v.as_str());
                let to = item.get("toString").and_then(|v| v.as_str());
                updates.push(IncidentUpdate {
                    incident_external_id: external_id.to_string(),
                    update_type: "status_change".to_string(),
                    previous_status: from.map(map_status),
                    new_status: to.map(map_status),
                    message: format!(
                        "status changed from {} to {}",
                        from.unwrap_or("unknown"),
                        to.unwrap_or("unknown")
                    ),
                    timestamp,
                });
            }
        }
        Ok(updates)
    }
}
