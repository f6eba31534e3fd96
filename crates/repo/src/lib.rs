//! Upstream object repository client for Portico.
//!
//! This crate provides:
//! - The [`Repository`] trait: the three calls the proxy depends on
//!   (rights document, datastream info, datastream content)
//! - [`RemoteRepository`]: an HTTP-backed implementation of the
//!   repository REST API
//! - [`MemoryRepository`]: an in-memory test double

pub mod error;
pub mod memory;
pub mod remote;
pub mod traits;

pub use error::{RepoError, RepoResult};
pub use memory::MemoryRepository;
pub use remote::RemoteRepository;
pub use traits::{ByteStream, ContentInfo, DatastreamInfo, Repository};
