//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed rights document: {0}")]
    MalformedRights(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
