use crate::error::{ConnectorError, Result};
use reqwest::Client;
use std::time::Duration;

/// Identifying client header sent with every provider request.
const USER_AGENT: &str = concat!("statushub-sync/", env!("CARGO_PKG_VERSION"));

/// Fixed per-request timeout applied to all provider traffic.
const FETCH_TIMEOUT_SECS: u64 = 30;

/// Maximum number of response body characters carried into an HTTP error.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Shared GET primitive for all connectors.
///
/// Every provider call goes through this client: rustls TLS, a fixed
/// 30-second timeout, and an identifying `User-Agent`, plus whatever auth
/// headers the calling connector supplies. Non-2xx responses and transport
/// failures surface as [`ConnectorError`] to the connector's caller.
#[derive(Clone, Debug)]
pub struct StatusClient {
    client: Client,
}

impl StatusClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ConnectorError::Network)?;
        Ok(Self { client })
    }

    /// GET a JSON document from `url`.
    ///
    /// `query` is appended as URL-encoded query parameters; `headers` are
    /// caller-supplied auth headers (e.g. `Authorization`).
    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, String)],
    ) -> Result<serde_json::Value> {
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ConnectorError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                body: truncate_chars(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{truncated}...")
    }
}
