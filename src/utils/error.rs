//! Crate-wide error type for the analytics services.
//!
//! Every remote-facing operation returns `ApiResult<T>`. The variants map
//! the failure taxonomy of the system: resolution misses, input validation,
//! index/schema mismatches (which trigger query fallbacks instead of
//! surfacing), transport failures, and remote GraphQL errors.

use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A scorecard, score, item, or feedback record could not be resolved
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid caller input (bad days value, missing scorecard, identity mismatch)
    #[error("validation error: {0}")]
    Validation(String),

    /// The remote rejected an index query (unknown field/type); callers fall
    /// back to a filtered list query instead of surfacing this
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Network-level failure talking to the remote service
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote returned a top-level `errors` list
    #[error("remote error: {0}")]
    Remote(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    /// Schema mismatches are recoverable: the query layer retries with the
    /// generic filtered list when it sees one.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, ApiError::SchemaMismatch(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}
