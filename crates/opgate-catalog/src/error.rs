//! Error types for opgate-catalog

use thiserror::Error;

/// Errors that can occur while talking to the certification catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Transport-level failure (connect, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(String),

    /// The catalog answered with a non-2xx status
    #[error("catalog returned {status} for {method} {url}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// Response body could not be decoded
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A record the caller asked for does not exist
    #[error("{kind} not found: {key}")]
    NotFound { kind: String, key: String },

    /// A record is missing its `_id`, so it cannot be addressed for updates
    #[error("{kind} record has no _id")]
    MissingId { kind: String },
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::Http(err.to_string())
    }
}

impl CatalogError {
    /// Whether this error is a 404 answer from the catalog.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::Status { status: 404, .. })
            || matches!(self, CatalogError::NotFound { .. })
    }
}
