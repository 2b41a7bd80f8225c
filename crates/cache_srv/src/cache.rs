//! In-memory TTL content cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// A cached piece of fetched content.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The raw content bytes. [bytes::Bytes] so serving a hit is a
    /// refcount bump, not a copy.
    pub content: bytes::Bytes,

    /// The upstream Content-Type, echoed when serving.
    pub content_type: String,

    /// The entry is unusable past this instant.
    pub expires_at: std::time::Instant,
}

/// An in-memory TTL cache of fetched byte content.
///
/// Expired entries miss on read and are overwritten by the refetch that
/// follows; there is no background sweep. Reads share the lock, writes
/// exclude, and the hit/request counters are plain atomics so reads
/// never need the write lock.
pub struct ContentCache {
    ttl: std::time::Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    requests: AtomicU64,
}

impl std::fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.read().unwrap().len())
            .finish()
    }
}

impl ContentCache {
    /// Construct an empty cache holding entries for `ttl`.
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            requests: AtomicU64::new(0),
        }
    }

    /// Get a still-fresh entry for `key`.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let entry = self.entries.read().unwrap().get(key).cloned()?;
        if std::time::Instant::now() < entry.expires_at {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(entry)
        } else {
            None
        }
    }

    /// Insert or replace the entry for `key`, fresh for the cache TTL.
    pub fn set(
        &self,
        key: String,
        content: bytes::Bytes,
        content_type: String,
    ) {
        let entry = CacheEntry {
            content,
            content_type,
            expires_at: std::time::Instant::now() + self.ttl,
        };
        self.entries.write().unwrap().insert(key, entry);
    }

    /// Point-in-time `(hits, requests)` counters.
    pub fn metrics(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.requests.load(Ordering::Relaxed),
        )
    }
}
