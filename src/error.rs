//! Error types for content fetching and rendering

use std::time::Duration;
use thiserror::Error;

/// Transport-level failure while talking to the content repository
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("repository has no master ref")]
    MissingMasterRef,
}

impl FetchError {
    /// Whether the repository rejected the request itself (4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(self, FetchError::Status { status, .. } if (400..500).contains(status))
    }
}

/// Errors surfaced by the content layer, scoped to a single view or request
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("malformed document {id}: missing {field}")]
    MalformedDocument { id: String, field: &'static str },

    #[error("fetch failed: {0}")]
    FetchFailure(#[from] FetchError),

    #[error("invalid preview token")]
    InvalidPreviewToken,

    #[error("{doc_type} '{uid}' not found")]
    NotFound { doc_type: String, uid: String },
}

pub type Result<T, E = ContentError> = std::result::Result<T, E>;
