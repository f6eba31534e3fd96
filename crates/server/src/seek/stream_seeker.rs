use super::{SeekRead, resolve_seek};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use portico_repo::ByteStream;
use std::io::{self, SeekFrom};

/// Adapts a one-shot byte stream of known length into a [`SeekRead`].
///
/// Forward seeks are honored by discarding bytes from the stream on the
/// next read. Backward seeks are allowed only into the span between the
/// last read position and the furthest byte already consumed, which makes
/// the common pattern of "probe with a relative seek, then seek back"
/// work without buffering the whole body. Seeking before a byte that has
/// been both consumed and surrendered fails with `InvalidInput`.
pub struct StreamSeeker {
    stream: ByteStream,
    /// Bytes pulled from the stream but not yet returned to the caller.
    pending: Bytes,
    /// Absolute position of the read cursor.
    pos: u64,
    /// Absolute position one past the last byte pulled from the stream.
    consumed: u64,
    size: u64,
}

impl StreamSeeker {
    pub fn new(stream: ByteStream, size: u64) -> Self {
        Self {
            stream,
            pending: Bytes::new(),
            pos: 0,
            consumed: 0,
            size,
        }
    }

    /// Pull from the stream until `consumed` reaches `target`, discarding
    /// everything before it. Anything pulled past `target` is kept in
    /// `pending` for the next read.
    async fn discard_to(&mut self, target: u64) -> io::Result<()> {
        // first drain the buffered leftover
        let buffered_start = self.consumed - self.pending.len() as u64;
        if target < self.consumed {
            self.pending = self.pending.slice((target - buffered_start) as usize..);
            return Ok(());
        }
        self.pending = Bytes::new();

        let mut skip = target - self.consumed;
        while skip > 0 {
            let Some(chunk) = self.stream.next().await else {
                // stream ended early; reads at this position return 0
                return Ok(());
            };
            let chunk = chunk.map_err(io::Error::other)?;
            let len = chunk.len() as u64;
            self.consumed += len;
            if len > skip {
                self.pending = chunk.slice(skip as usize..);
                break;
            }
            skip -= len;
        }
        Ok(())
    }
}

#[async_trait]
impl SeekRead for StreamSeeker {
    async fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = resolve_seek(pos, self.pos, self.size)?;
        if target > self.size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot seek past the declared size",
            ));
        }
        let buffered_start = self.consumed - self.pending.len() as u64;
        if target < buffered_start {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot seek backward past consumed data",
            ));
        }
        self.pos = target;
        Ok(target)
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.pos >= self.size {
            return Ok(0);
        }
        if self.pos > self.consumed - self.pending.len() as u64 || self.pending.is_empty() {
            self.discard_to(self.pos).await?;
        }
        if self.pending.is_empty() {
            let Some(chunk) = self.stream.next().await else {
                return Ok(0);
            };
            let chunk = chunk.map_err(io::Error::other)?;
            self.consumed += chunk.len() as u64;
            self.pending = chunk;
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending = self.pending.slice(n..);
        self.pos += n as u64;
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
