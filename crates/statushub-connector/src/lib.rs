//! Provider connectors for the sync engine.
//!
//! Each connector translates one external provider's schema and vocabulary
//! into the unified incident model. Connectors are built fresh per sync
//! pass via [`build_connector`] and hold nothing beyond the source
//! configuration they close over.

pub mod error;
pub mod github;
pub mod http;
pub mod jira;
pub mod statuspage;

use anyhow::Result;
use async_trait::async_trait;
use statushub_common::types::{Incident, IncidentUpdate, ServiceComponent};

/// The slice of a data source a connector closes over.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Storage id of the owning data source; stamped onto every normalized
    /// item so upserts land under the right source.
    pub source_id: String,
    /// Display name of the source (becomes `system_name` on incidents).
    pub name: String,
    pub base_url: String,
    /// Opaque credential blob, interpreted per connector type.
    pub credentials: Option<serde_json::Value>,
}

/// A polymorphic provider connector.
///
/// Implementations must be cheap to construct and hold no cross-call state;
/// the orchestrator builds one per source per pass.
#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug {
    /// Display name of the owning source.
    fn name(&self) -> &str;

    /// Fetch and normalize the provider's current incident list, in the
    /// provider's natural order (typically newest-first).
    async fn fetch_incidents(&self) -> Result<Vec<Incident>>;

    /// Fetch and normalize the provider's service components. Providers
    /// without a component concept return an empty list.
    async fn fetch_components(&self) -> Result<Vec<ServiceComponent>>;

    /// Fetch the changelog of one incident. An empty list is a valid
    /// result for providers without a changelog endpoint.
    async fn fetch_incident_updates(&self, external_id: &str) -> Result<Vec<IncidentUpdate>>;
}

/// Build a connector from a source's `type` discriminator.
///
/// # Errors
///
/// Returns [`error::ConnectorError::UnsupportedSource`] if `source_type` is
/// not a registered connector kind, and the constructing connector's own
/// error (e.g. [`error::ConnectorError::MissingCredentials`]) when its
/// configuration is invalid. Both surface as per-source failures in the
/// orchestrator, never as pass-fatal ones.
pub fn build_connector(
    source_type: &str,
    config: SourceConfig,
) -> error::Result<Box<dyn Connector>> {
    match source_type {
        "statuspage" => Ok(Box::new(statuspage::StatuspageConnector::new(config)?)),
        "github" => Ok(Box::new(github::GithubConnector::new(config)?)),
        "jira" => Ok(Box::new(jira::JiraConnector::new(config)?)),
        _ => Err(error::ConnectorError::UnsupportedSource(
            source_type.to_string(),
        )),
    }
}
