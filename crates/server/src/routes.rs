//! Route definitions.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// A single `get` route serves both GET and HEAD; other methods on it
/// answer 405.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/{id}", get(handlers::download))
        .route("/{id}/zip/{ids}", get(handlers::download_zip))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
