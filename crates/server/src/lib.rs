//! HTTP server for the Portico download-and-authorization proxy.
//!
//! This crate provides the request path:
//! - Authorization gate over cached per-object rights
//! - Identity resolution from trusted front-proxy headers
//! - Seekable wrappers over upstream content for range serving
//! - The download handler and router

pub mod access;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod seek;
pub mod state;

pub use access::{AccessChecker, FixedResolver, HeaderResolver, IdentityResolver};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
