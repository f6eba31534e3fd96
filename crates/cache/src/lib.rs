//! A bounded, thread-safe, expiring key-value cache.
//!
//! [`TimeCache`] memoizes values for a fixed time-to-live in a fixed-size
//! ring buffer. It is built for availability over completeness: `put`
//! never fails (the oldest entry is silently dropped when the buffer is
//! full) and a miss only costs the caller a redundant fetch from the
//! authoritative source.
//!
//! Entries are appended in insertion order, which is also expiry order
//! since the TTL is constant. A background sweeper task advances the tail
//! past expired entries; it schedules its next wake from the oldest
//! surviving entry's expiry instead of polling on a fixed period.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Minimum sweeper tick. The sweeper never wakes more often than this.
const MIN_TICK: Duration = Duration::from_millis(30);

/// A bounded, expiring key-value store.
///
/// Cloning is cheap and all clones share the same buffer. The sweeper task
/// is spawned at construction, stopped by [`TimeCache::shutdown`], and
/// aborted when the last clone is dropped.
pub struct TimeCache<V> {
    inner: Arc<RwLock<Ring<V>>>,
    sweeper: Arc<Sweeper>,
}

impl<V> Clone for TimeCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            sweeper: self.sweeper.clone(),
        }
    }
}

struct Entry<V> {
    key: String,
    expires: Instant,
    value: V,
}

/// Circular buffer of entries. `head` points at the first empty slot,
/// `tail` at the oldest live entry; `head == tail` means empty. One slot
/// is always kept free to disambiguate empty from full, so a buffer of
/// `capacity` slots holds at most `capacity - 1` entries.
struct Ring<V> {
    ttl: Duration,
    head: usize,
    tail: usize,
    data: Vec<Option<Entry<V>>>,
}

impl<V: Clone> Ring<V> {
    fn with_capacity(capacity: usize, ttl: Duration) -> Self {
        Self {
            ttl,
            head: 0,
            tail: 0,
            data: (0..capacity).map(|_| None).collect(),
        }
    }

    fn advance(&self, i: usize) -> usize {
        (i + 1) % self.data.len()
    }

    fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    fn len(&self) -> usize {
        (self.head + self.data.len() - self.tail) % self.data.len()
    }

    /// First (oldest surviving) unexpired entry matching `key`, scanning
    /// tail to head. Duplicate keys may coexist; lookup favors the oldest.
    fn get(&self, key: &str, now: Instant) -> Option<V> {
        let mut i = self.tail;
        while i != self.head {
            if let Some(entry) = &self.data[i]
                && entry.key == key
                && entry.expires > now
            {
                return Some(entry.value.clone());
            }
            i = self.advance(i);
        }
        None
    }

    /// Append an entry at head, dropping the oldest entry if full.
    /// Duplicate keys are appended as-is, no de-duplication on write.
    fn put(&mut self, key: &str, value: V, now: Instant) {
        let new_head = self.advance(self.head);
        self.data[self.head] = Some(Entry {
            key: key.to_string(),
            expires: now + self.ttl,
            value,
        });
        self.head = new_head;
        if new_head == self.tail {
            // full; silently drop the oldest entry
            self.data[self.tail] = None;
            self.tail = self.advance(self.tail);
        }
    }

    /// Advance the tail past contiguously-expired entries. Entries are in
    /// increasing expiry order, so the first live entry found is the new
    /// tail. Returns the expiry of the new oldest entry, if any.
    fn prune(&mut self, now: Instant) -> Option<Instant> {
        let mut i = self.tail;
        while i != self.head {
            match &self.data[i] {
                Some(entry) if entry.expires > now => break,
                _ => {
                    self.data[i] = None;
                    i = self.advance(i);
                }
            }
        }
        self.tail = i;
        if self.is_empty() {
            None
        } else {
            self.data[self.tail].as_ref().map(|e| e.expires)
        }
    }
}

/// Handle to the background sweeper task.
struct Sweeper {
    handle: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl<V: Clone + Send + Sync + 'static> TimeCache<V> {
    /// Create a cache holding at most `capacity - 1` entries, each usable
    /// for `ttl` after insertion. Must be called from within a tokio
    /// runtime; the sweeper task is spawned here.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2` (the ring needs its slack slot).
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        assert!(capacity >= 2, "TimeCache capacity must be at least 2");
        let inner = Arc::new(RwLock::new(Ring::with_capacity(capacity, ttl)));
        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(sweep_loop(inner.clone(), ttl, stop_rx));
        Self {
            inner,
            sweeper: Arc::new(Sweeper { handle, stop }),
        }
    }

    /// Get the oldest unexpired value stored under `key`.
    ///
    /// Does not extend the TTL of the entry found.
    pub fn get(&self, key: &str) -> Option<V> {
        let ring = self.inner.read().expect("cache lock poisoned");
        ring.get(key, Instant::now())
    }

    /// Insert `value` under `key` with a fresh TTL. Never fails; if the
    /// buffer is full the oldest entry is evicted regardless of expiry.
    pub fn put(&self, key: &str, value: V) {
        let mut ring = self.inner.write().expect("cache lock poisoned");
        ring.put(key, value, Instant::now());
    }

    /// Drop expired entries from the tail of the buffer. Called by the
    /// sweeper; exposed for tests and for callers that want deterministic
    /// cleanup.
    pub fn prune(&self) {
        let now = Instant::now();
        // cheap shared-lock peek before taking the exclusive lock
        {
            let ring = self.inner.read().expect("cache lock poisoned");
            if ring.is_empty() {
                return;
            }
            let expired = match &ring.data[ring.tail] {
                Some(entry) => entry.expires <= now,
                None => true,
            };
            if !expired {
                return;
            }
        }
        let mut ring = self.inner.write().expect("cache lock poisoned");
        ring.prune(now);
    }

    /// Number of live entries (expired-but-unswept entries included).
    pub fn len(&self) -> usize {
        self.inner.read().expect("cache lock poisoned").len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the background sweeper. The cache remains usable; entries are
    /// still expiry-checked on `get`.
    pub fn shutdown(&self) {
        let _ = self.sweeper.stop.send(true);
    }
}

async fn sweep_loop<V: Clone>(
    inner: Arc<RwLock<Ring<V>>>,
    ttl: Duration,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let next_expiry = {
            let mut ring = inner.write().expect("cache lock poisoned");
            ring.prune(Instant::now())
        };
        // wake when the oldest surviving entry expires; when the buffer is
        // empty there is nothing to sweep for at least one ttl
        let wait = match next_expiry {
            Some(expiry) => expiry
                .saturating_duration_since(Instant::now())
                .max(MIN_TICK),
            None => ttl.max(MIN_TICK),
        };
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    tracing::debug!("cache sweeper stopping");
                    return;
                }
            }
        }
    }
}
