//! In-memory repository test double.

use crate::error::{RepoError, RepoResult};
use crate::traits::{ByteStream, ContentInfo, DatastreamInfo, Repository};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A repository stub backed by a map of `(id, dsname)` to bytes.
///
/// Returns deterministic datastream info (`version_id = "{dsname}.0"`,
/// state `"A"`, content type `text/plain`) unless an override is set.
/// Counts rights-document fetches so cache behavior can be asserted.
#[derive(Default)]
pub struct MemoryRepository {
    data: RwLock<HashMap<String, Bytes>>,
    info: RwLock<HashMap<String, DatastreamInfo>>,
    rights_fetches: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(id: &str, dsname: &str) -> String {
        format!("{id}/{dsname}")
    }

    /// Store datastream content for an object.
    pub fn set(&self, id: &str, dsname: &str, value: impl Into<Bytes>) {
        self.data
            .write()
            .unwrap()
            .insert(Self::key(id, dsname), value.into());
    }

    /// Override the datastream info returned for `(id, dsname)`.
    pub fn set_info(&self, id: &str, dsname: &str, info: DatastreamInfo) {
        self.info
            .write()
            .unwrap()
            .insert(Self::key(id, dsname), info);
    }

    /// Number of rights-document fetches served so far.
    pub fn rights_fetches(&self) -> usize {
        self.rights_fetches.load(Ordering::SeqCst)
    }

    fn lookup(&self, id: &str, dsname: &str) -> RepoResult<Bytes> {
        self.data
            .read()
            .unwrap()
            .get(&Self::key(id, dsname))
            .cloned()
            .ok_or_else(|| RepoError::NotFound(Self::key(id, dsname)))
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn rights_document(&self, id: &str) -> RepoResult<Bytes> {
        self.rights_fetches.fetch_add(1, Ordering::SeqCst);
        self.lookup(id, "rightsMetadata")
    }

    async fn datastream_info(&self, id: &str, dsname: &str) -> RepoResult<DatastreamInfo> {
        // content must exist for info to exist, as upstream behaves
        self.lookup(id, dsname)?;
        if let Some(info) = self.info.read().unwrap().get(&Self::key(id, dsname)) {
            return Ok(info.clone());
        }
        Ok(DatastreamInfo {
            label: String::new(),
            version_id: format!("{dsname}.0"),
            state: "A".to_string(),
            checksum: String::new(),
            mime_type: "text/plain".to_string(),
            location: None,
            location_type: None,
        })
    }

    async fn datastream_content(
        &self,
        id: &str,
        dsname: &str,
    ) -> RepoResult<(ByteStream, ContentInfo)> {
        let value = self.lookup(id, dsname)?;
        let info = ContentInfo {
            content_type: Some("text/plain".to_string()),
            length: Some(value.len() as u64),
            disposition: None,
            md5: None,
        };
        let stream: ByteStream = Box::pin(futures::stream::once(async move { Ok(value) }));
        Ok((stream, info))
    }
}
