/// Errors that can occur within the storage layer.
///
/// The [`crate::SyncStore`] trait returns `anyhow::Result` so callers can
/// attach context at the service boundary; these variants are the typed
/// failures underneath.
///
/// # Examples
///
/// ```rust
/// use statushub_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "data_source",
///     id: "ds-99".to_string(),
/// };
/// assert!(err.to_string().contains("data_source"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found in the database.
    #[error("storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// An underlying SQLite error.
    #[error("storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization or deserialization failure (e.g. the credentials
    /// and tags columns).
    #[error("storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
