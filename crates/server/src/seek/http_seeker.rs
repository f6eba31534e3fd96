use super::{SeekRead, resolve_seek};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header;
use std::io::{self, SeekFrom};

/// Largest span fetched from the remote in one request.
pub const DEFAULT_PAGE_SIZE: u64 = 64 * 1024 * 1024;

/// A [`SeekRead`] over a remote URL that honors `Range` requests.
///
/// Content is fetched a page at a time with `Range: bytes=` GETs, so a
/// client that asks for a small slice of a large file costs one small
/// upstream request rather than a full transfer. Seeks in any direction
/// are cheap; they only drop the current page.
pub struct HttpSeeker {
    http: reqwest::Client,
    url: String,
    /// Sent as `X-Api-Key` on every request when present.
    api_key: Option<String>,
    page_size: u64,
    /// Page covering [`page_start`, `page_start + page.len()`).
    page: Bytes,
    page_start: u64,
    pos: u64,
    size: u64,
}

impl HttpSeeker {
    /// Create a seeker over `url` with a known content size.
    pub fn new(http: reqwest::Client, url: impl Into<String>, size: u64) -> Self {
        Self {
            http,
            url: url.into(),
            api_key: None,
            page_size: DEFAULT_PAGE_SIZE,
            page: Bytes::new(),
            page_start: 0,
            pos: 0,
            size,
        }
    }

    /// Create a seeker, learning the content size from a HEAD request.
    pub async fn probe(
        http: reqwest::Client,
        url: impl Into<String>,
        api_key: Option<String>,
    ) -> io::Result<Self> {
        let url = url.into();
        let mut req = http.head(&url);
        if let Some(key) = &api_key {
            req = req.header("X-Api-Key", key);
        }
        let resp = req.send().await.map_err(io::Error::other)?;
        check_status(resp.status().as_u16())?;
        let size = resp
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| io::Error::other("remote did not report a content length"))?;
        let mut seeker = Self::new(http, url, size);
        seeker.api_key = api_key;
        Ok(seeker)
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        assert!(page_size > 0);
        self.page_size = page_size;
        self
    }

    /// Fetch the page starting at the current position.
    async fn fetch_page(&mut self) -> io::Result<()> {
        let last = (self.pos + self.page_size - 1).min(self.size - 1);
        let mut req = self
            .http
            .get(&self.url)
            .header(header::RANGE, format!("bytes={}-{}", self.pos, last));
        if let Some(key) = &self.api_key {
            req = req.header("X-Api-Key", key);
        }
        let resp = req.send().await.map_err(io::Error::other)?;
        check_status(resp.status().as_u16())?;
        self.page_start = self.pos;
        self.page = resp.bytes().await.map_err(io::Error::other)?;
        Ok(())
    }
}

fn check_status(status: u16) -> io::Result<()> {
    match status {
        200..=299 => Ok(()),
        404 => Err(io::Error::new(
            io::ErrorKind::NotFound,
            "remote content not found",
        )),
        401 | 403 => Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "remote refused our credentials",
        )),
        _ => Err(io::Error::other(format!("remote returned status {status}"))),
    }
}

#[async_trait]
impl SeekRead for HttpSeeker {
    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        // past-end targets clamp to the end rather than failing
        let target = resolve_seek(pos, self.pos, self.size)?.min(self.size);
        let page_end = self.page_start + self.page.len() as u64;
        if target < self.page_start || target >= page_end {
            self.page = Bytes::new();
        }
        self.pos = target;
        Ok(target)
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.pos >= self.size {
            return Ok(0);
        }
        let page_end = self.page_start + self.page.len() as u64;
        if self.page.is_empty() || self.pos < self.page_start || self.pos >= page_end {
            self.fetch_page().await?;
        }
        let offset = (self.pos - self.page_start) as usize;
        if offset >= self.page.len() {
            // remote sent a short page; treat as end of content
            return Ok(0);
        }
        let n = buf.len().min(self.page.len() - offset);
        buf[..n].copy_from_slice(&self.page[offset..offset + n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
