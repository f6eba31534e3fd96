//! Core domain types and shared logic for the Portico download proxy.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Users and group membership
//! - Per-object access rights and the view decision
//! - Rights document parsing
//! - Application configuration

pub mod config;
pub mod error;
pub mod rights;
pub mod user;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use rights::{Access, RightsRecord};
pub use user::{User, intersects, is_member};

/// The only rights-document schema version this proxy understands.
pub const RIGHTS_VERSION: &str = "0.1";
