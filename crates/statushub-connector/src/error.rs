/// Errors that can occur when talking to an external status provider.
///
/// # Examples
///
/// ```rust
/// use statushub_connector::error::ConnectorError;
///
/// let err = ConnectorError::UnsupportedSource("pagerduty".to_string());
/// assert!(err.to_string().contains("pagerduty"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// HTTP-level error: non-2xx status code from the provider API.
    #[error("provider API HTTP error: url={url}, status={status}, body={body}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    /// An underlying HTTP transport error from `reqwest`.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization or deserialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider returned a 2xx response whose shape does not match its
    /// documented schema.
    #[error("unexpected payload from '{source_name}': {detail}")]
    Payload { source_name: String, detail: String },

    /// An authenticated connector was configured without the credentials it
    /// needs. This is always a per-source failure.
    #[error("missing credentials for source '{source_name}': {detail}")]
    MissingCredentials {
        source_name: String,
        detail: &'static str,
    },

    /// The requested connector type is not registered in the factory.
    #[error("unsupported connector type: {0}")]
    UnsupportedSource(String),

    /// Source configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience type alias so callers can write `error::Result<T>`.
pub type Result<T> = std::result::Result<T, ConnectorError>;
