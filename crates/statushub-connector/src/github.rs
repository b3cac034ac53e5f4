use crate::error::{ConnectorError, Result as ConnectorResult};
use crate::http::StatusClient;
use crate::{Connector, SourceConfig};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use statushub_common::types::{
    Incident, IncidentSeverity, IncidentStatus, IncidentUpdate, ServiceComponent,
};

const SEVERITY_LABEL_PREFIX: &str = "severity:";
const SERVICE_LABEL_PREFIX: &str = "service:";

/// Connector for a GitHub repository used as an incident tracker.
///
/// `base_url` points at the repository API root, e.g.
/// `https://api.github.com/repos/acme/incidents`. The credential blob must
/// carry an `access_token`; issues are the incidents, labels carry the
/// vocabulary (`severity:high`, `service:payments`, `monitoring`, ...).
#[derive(Debug)]
pub struct GithubConnector {
    source_id: String,
    source_name: String,
    base_url: String,
    access_token: String,
    client: StatusClient,
}

/// Issue state plus status labels resolve the unified status. Closed issues
/// are resolved regardless of labels; open issues without a recognized
/// status label default to `investigating`.
fn map_status(state: &str, labels: &[String]) -> IncidentStatus {
    if state == "closed" {
        return IncidentStatus::Resolved;
    }
    for label in labels {
        match label.as_str() {
            "monitoring" => return IncidentStatus::Monitoring,
            "identified" => return IncidentStatus::Identified,
            _ => {}
        }
    }
    IncidentStatus::Investigating
}

/// A `severity:<level>` label resolves the unified severity. A missing or
/// unrecognized level maps to the conservative default `medium`.
fn map_severity(labels: &[String]) -> IncidentSeverity {
    for label in labels {
        if let Some(level) = label.strip_prefix(SEVERITY_LABEL_PREFIX) {
            return match level {
                "critical" => IncidentSeverity::Critical,
                "high" => IncidentSeverity::High,
                "medium" => IncidentSeverity::Medium,
                "low" => IncidentSeverity::Low,
                _ => IncidentSeverity::Medium,
            };
        }
    }
    IncidentSeverity::Medium
}

fn parse_time(value: Option<&serde_json::Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

impl GithubConnector {
    pub fn new(config: SourceConfig) -> ConnectorResult<Self> {
        let access_token = config
            .credentials
            .as_ref()
            .and_then(|c| c.get("access_token"))
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .ok_or(ConnectorError::MissingCredentials {
                source_name: config.name.clone(),
                detail: "github connector requires an access_token credential",
            })?;

        let client = StatusClient::new()?;
        Ok(Self {
            source_id: config.source_id,
            source_name: config.name,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token,
            client,
        })
    }

    fn auth_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", format!("Bearer {}", self.access_token)),
            ("Accept", "application/vnd.github+json".to_string()),
            ("X-GitHub-Api-Version", "2022-11-28".to_string()),
        ]
    }

    fn parse_issue(&self, raw: &serde_json::Value) -> Option<Incident> {
        let external_id = raw.get("number").and_then(|v| v.as_i64())?.to_string();
        let state = raw.get("state").and_then(|v| v.as_str()).unwrap_or("open");

        let labels: Vec<String> = raw
            .get("labels")
            .and_then(|v| v.as_array())
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|l| l.get("name").and_then(|v| v.as_str()))
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        let affected_services = labels
            .iter()
            .filter_map(|l| l.strip_prefix(SERVICE_LABEL_PREFIX))
            .map(|s| s.to_string())
            .collect();

        let status = map_status(state, &labels);
        let raw_severity_label = labels
            .iter()
            .find(|l| l.starts_with(SEVERITY_LABEL_PREFIX))
            .cloned();

        Some(Incident {
            external_id,
            data_source_id: self.source_id.clone(),
            system_name: self.source_name.clone(),
            title: raw
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            description: raw
                .get("body")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            status,
            severity: map_severity(&labels),
            impact: raw_severity_label,
            started_at: parse_time(raw.get("created_at")),
            resolved_at: parse_time(raw.get("closed_at")),
            updated_at: parse_time(raw.get("updated_at")),
            external_url: raw
                .get("html_url")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            affected_services,
            tags: labels,
            metadata: raw.clone(),
            is_active: status != IncidentStatus::Resolved,
        })
    }
}

#[async_trait::async_trait]
impl Connector for GithubConnector {
    fn name(&self) -> &str {
        &self.source_name
    }

    async fn fetch_incidents(&self) -> Result<Vec<Incident>> {
        let url = format!("{}/issues", self.base_url);
        let body = self
            .client
            .get_json(
                &url,
                &[
                    ("state", "all".to_string()),
                    ("per_page", "100".to_string()),
                ],
                &self.auth_headers(),
            )
            .await
            .context("Failed to fetch github issues")?;

        let issues = body.as_array().ok_or_else(|| ConnectorError::Payload {
            source_name: self.source_name.clone(),
            detail: "expected a top-level issue array".to_string(),
        })?;

        let mut incidents = Vec::with_capacity(issues.len());
        for issue in issues {
            // The issues endpoint also returns pull requests.
            if issue.get("pull_request").is_some() {
                continue;
            }
            if let Some(incident) = self.parse_issue(issue) {
                incidents.push(incident);
            }
        }
        Ok(incidents)
    }

    async fn fetch_components(&self) -> Result<Vec<ServiceComponent>> {
        // GitHub issue trackers have no component concept.
        tracing::debug!(source = %self.source_name, "github source has no components");
        Ok(Vec::new())
    }

    async fn fetch_incident_updates(&self, external_id: &str) -> Result<Vec<IncidentUpdate>> {
        let url = format!("{}/issues/{}/comments", self.base_url, external_id);
        let body = self
            .client
            .get_json(&url, &[("per_page", "100".to_string())], &self.auth_headers())
            .await
            .context("Failed to fetch github issue comments")?;

        let comments = body.as_array().ok_or_else(|| ConnectorError::Payload {
            source_name: self.source_name.clone(),
            detail: "expected a top-level comment array".to_string(),
        })?;

        Ok(comments
            .iter()
            .map(|c| IncidentUpdate {
                incident_external_id: external_id.to_string(),
                update_type: "comment".to_string(),
                previous_status: None,
                new_status: None,
                message: c
                    .get("body")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                timestamp: parse_time(c.get("created_at")),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector() -> GithubConnector {
        GithubConnector::new(SourceConfig {
            source_id: "src-gh".to_string(),
            name: "Infra Tracker".to_string(),
            base_url: "https://api.github.com/repos/acme/incidents".to_string(),
            credentials: Some(serde_json::json!({ "access_token": "ghp_test" })),
        })
        .unwrap()
    }

    #[test]
    fn should_require_access_token() {
        let err = GithubConnector::new(SourceConfig {
            source_id: "src-gh".to_string(),
            name: "Infra Tracker".to_string(),
            base_url: "https://api.github.com/repos/acme/incidents".to_string(),
            credentials: Some(serde_json::json!({})),
        })
        .unwrap_err();
        assert!(err.to_string().contains("Infra Tracker"));
        assert!(matches!(err, ConnectorError::MissingCredentials { .. }));
    }

    #[test]
    fn should_resolve_status_from_state_and_labels() {
        assert_eq!(map_status("closed", &[]), IncidentStatus::Resolved);
        assert_eq!(
            map_status("closed", &["monitoring".to_string()]),
            IncidentStatus::Resolved
        );
        assert_eq!(
            map_status("open", &["monitoring".to_string()]),
            IncidentStatus::Monitoring
        );
        assert_eq!(
            map_status("open", &["identified".to_string()]),
            IncidentStatus::Identified
        );
        assert_eq!(map_status("open", &[]), IncidentStatus::Investigating);
        // Unknown states behave like open issues.
        assert_eq!(map_status("draft", &[]), IncidentStatus::Investigating);
    }

    #[test]
    fn should_resolve_severity_from_labels_with_default() {
        assert_eq!(
            map_severity(&["severity:critical".to_string()]),
            IncidentSeverity::Critical
        );
        assert_eq!(
            map_severity(&["severity:high".to_string()]),
            IncidentSeverity::High
        );
        assert_eq!(
            map_severity(&["severity:low".to_string()]),
            IncidentSeverity::Low
        );
        assert_eq!(
            map_severity(&["severity:sev1".to_string()]),
            IncidentSeverity::Medium
        );
        assert_eq!(map_severity(&[]), IncidentSeverity::Medium);
    }

    #[test]
    fn should_parse_open_issue_into_incident() {
        let raw = serde_json::json!({
            "number": 42,
            "title": "Payments API returning 500s",
            "body": "Error rate spiked at 09:40 UTC.",
            "state": "open",
            "created_at": "2024-04-02T09:45:00Z",
            "updated_at": "2024-04-02T10:00:00Z",
            "closed_at": null,
            "html_url": "https://github.com/acme/incidents/issues/42",
            "labels": [
                { "name": "severity:high" },
                { "name": "service:payments" },
                { "name": "identified" }
            ]
        });

        let incident = connector().parse_issue(&raw).unwrap();
        assert_eq!(incident.external_id, "42");
        assert_eq!(incident.status, IncidentStatus::Identified);
        assert_eq!(incident.severity, IncidentSeverity::High);
        assert_eq!(incident.impact.as_deref(), Some("severity:high"));
        assert_eq!(incident.affected_services, vec!["payments"]);
        assert!(incident.tags.contains(&"identified".to_string()));
        assert!(incident.is_active);
        assert!(incident.resolved_at.is_none());
    }

    #[test]
    fn should_mark_closed_issue_resolved_and_inactive() {
        let raw = serde_json::json!({
            "number": 7,
            "title": "Old outage",
            "state": "closed",
            "closed_at": "2024-01-10T00:00:00Z",
            "labels": []
        });
        let incident = connector().parse_issue(&raw).unwrap();
        assert_eq!(incident.status, IncidentStatus::Resolved);
        assert!(!incident.is_active);
        assert!(incident.resolved_at.is_some());
    }
}
