//! Seekable reads over bodies that are not seekable at the source.
//!
//! Range requests need random access, but the content we proxy arrives
//! either as a byte stream from the repository or as a remote URL behind
//! an API key. [`SeekRead`] is the common surface: the serving code seeks
//! to the start of the requested range and reads from there, without
//! caring which backing it got.

mod http_seeker;
mod serve;
mod stream_seeker;

pub use http_seeker::HttpSeeker;
pub use serve::serve_content;
pub use stream_seeker::StreamSeeker;

use async_trait::async_trait;
use std::io::{self, SeekFrom};

/// An async reader with a known total size and seek support.
///
/// Implementations may restrict which seeks succeed. [`StreamSeeker`] in
/// particular cannot rewind past bytes it has already read, and reports
/// such seeks as [`io::ErrorKind::InvalidInput`].
#[async_trait]
pub trait SeekRead: Send {
    /// Reposition the read cursor, returning the new absolute position.
    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Read up to `buf.len()` bytes at the cursor. Returns 0 only at end
    /// of content.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Total size of the content in bytes.
    fn size(&self) -> u64;
}

/// Resolve a `SeekFrom` against a cursor and total size.
///
/// Errors when the result would be negative. Positions past `size` are
/// valid targets.
fn resolve_seek(pos: SeekFrom, current: u64, size: u64) -> io::Result<u64> {
    let target = match pos {
        SeekFrom::Start(n) => Some(n),
        SeekFrom::Current(d) => apply_delta(current, d),
        SeekFrom::End(d) => apply_delta(size, d),
    };
    target.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "seek to a negative or overflowing position",
        )
    })
}

fn apply_delta(base: u64, delta: i64) -> Option<u64> {
    if delta >= 0 {
        base.checked_add(delta as u64)
    } else {
        base.checked_sub(delta.unsigned_abs())
    }
}
