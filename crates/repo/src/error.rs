//! Repository error types.

use thiserror::Error;

/// Errors from upstream repository calls.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not found in repository: {0}")]
    NotFound(String),

    #[error("repository rejected our credentials: {0}")]
    NotAuthorized(String),

    #[error("received status {status} from upstream for {context}")]
    UpstreamStatus { status: u16, context: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed upstream response: {0}")]
    Malformed(String),

    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),
}

/// Result type for repository operations.
pub type RepoResult<T> = std::result::Result<T, RepoError>;
