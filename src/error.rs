//! Error taxonomy for the aggregation, ingestion, and query pipeline.
//!
//! Library code returns [`ContextError`]; the CLI and server start-up paths
//! wrap it in `anyhow` the same way they wrap config errors.
//!
//! | Variant | Handling |
//! |---------|----------|
//! | [`SourceUnavailable`](ContextError::SourceUnavailable) | Absorbed by the aggregator (empty section) |
//! | [`ConfigurationMissing`](ContextError::ConfigurationMissing) | Fatal for the operation, no retry |
//! | [`Embedding`](ContextError::Embedding) / [`Index`](ContextError::Index) | Abort one ingest batch; fail a query |
//! | [`DimensionMismatch`](ContextError::DimensionMismatch) | Same as an embedding failure |

use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, ContextError>;

#[derive(Debug, Error)]
pub enum ContextError {
    /// A content source could not be read.
    #[error("content source '{source_name}' unavailable: {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
    },

    /// A required credential or endpoint is not configured.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// A configuration value is present but unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The caller supplied an unusable request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The embedding provider failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The vector index rejected a call.
    #[error("vector index error: {0}")]
    Index(String),

    /// An embedding came back with the wrong dimensionality.
    #[error("embedding dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    /// The document source (Drive) failed.
    #[error("document source error: {0}")]
    Drive(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ContextError {
    /// True for failures caused by a downstream service rather than by the
    /// caller or by local configuration.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ContextError::SourceUnavailable { .. }
                | ContextError::Embedding(_)
                | ContextError::Index(_)
                | ContextError::DimensionMismatch { .. }
                | ContextError::Drive(_)
                | ContextError::Http(_)
        )
    }
}
