//! Repository trait definitions.

use crate::error::RepoResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// A boxed stream of bytes for streaming content reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = RepoResult<Bytes>> + Send>>;

/// Metadata the repository stores about a named datastream.
#[derive(Clone, Debug, Default)]
pub struct DatastreamInfo {
    /// Human-readable label, used as the download filename.
    pub label: String,
    /// Version identifier (e.g. "content.2"); the download ETag.
    pub version_id: String,
    /// Datastream state code (e.g. "A" for active).
    pub state: String,
    /// Stored checksum, empty when the repository keeps none.
    pub checksum: String,
    /// Declared media type of the content.
    pub mime_type: String,
    /// Where the content lives when stored outside the repository.
    pub location: Option<String>,
    /// Location kind; "URL" marks externally-stored content.
    pub location_type: Option<String>,
}

/// What a content fetch reported about the bytes it returns.
///
/// Fields mirror response headers and may be absent.
#[derive(Clone, Debug, Default)]
pub struct ContentInfo {
    pub content_type: Option<String>,
    pub length: Option<u64>,
    pub disposition: Option<String>,
    pub md5: Option<String>,
}

/// The object repository as seen by the proxy.
///
/// Implementations must be safe for concurrent use; one instance is shared
/// across all request handlers.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Fetch the raw rights document for an object.
    async fn rights_document(&self, id: &str) -> RepoResult<Bytes>;

    /// Fetch the metadata for the named datastream of an object.
    async fn datastream_info(&self, id: &str, dsname: &str) -> RepoResult<DatastreamInfo>;

    /// Fetch the content of the named datastream as a forward-only byte
    /// stream, along with whatever the upstream reported about it.
    async fn datastream_content(
        &self,
        id: &str,
        dsname: &str,
    ) -> RepoResult<(ByteStream, ContentInfo)>;
}
