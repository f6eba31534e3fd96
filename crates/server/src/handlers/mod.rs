//! Request handlers.

pub mod download;
pub mod zip;

pub use download::download;
pub use zip::download_zip;

use crate::error::{ApiError, ApiResult};
use portico_core::Access;

/// Longest accepted object identifier. Anything longer is treated as
/// nonexistent without touching the repository.
pub(crate) const MAX_ID_LENGTH: usize = 64;

/// Map an access decision to a handler outcome.
pub(crate) fn require_view(decision: Access, id: &str) -> ApiResult<()> {
    match decision {
        Access::Allow => Ok(()),
        Access::Deny => Err(ApiError::Unauthorized(id.to_string())),
        Access::NotFound => Err(ApiError::NotFound(id.to_string())),
        Access::Error => Err(ApiError::Internal(format!(
            "rights evaluation failed for {id}"
        ))),
    }
}

/// Liveness probe.
pub async fn healthz() -> &'static str {
    "OK"
}
