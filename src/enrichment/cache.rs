//! Expiring store of resolved image URLs.
//!
//! One cache instance is built at startup and shared by every enrichment
//! call. Entries are only written on successful resolution and are evicted
//! lazily, the first time a lookup observes them stale.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Namespace of a cache key. Identical raw identifiers from different
/// sources map to different keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheNamespace {
    KnowledgeBase,
    Encyclopedia,
    Site,
}

impl CacheNamespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            CacheNamespace::KnowledgeBase => "knowledgebase:",
            CacheNamespace::Encyclopedia => "encyclopedia:",
            CacheNamespace::Site => "site:",
        }
    }

    pub fn key(&self, raw: &str) -> String {
        format!("{}{}", self.prefix(), raw)
    }
}

/// Source of the current time, replaceable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Key to image URL store.
pub trait ImageCache: Send + Sync {
    /// Returns the cached URL if present and still fresh.
    fn get(&self, key: &str) -> Option<String>;

    /// Records a successful resolution. Last write wins.
    fn put(&self, key: &str, url: &str);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    url: String,
    inserted_at: Instant,
}

/// [`ImageCache`] with a fixed time-to-live.
pub struct TtlImageCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TtlImageCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ImageCache for TtlImageCache {
    fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let entry = entries.get(key)?;
        if now.saturating_duration_since(entry.inserted_at) < self.ttl {
            return Some(entry.url.clone());
        }
        entries.remove(key);
        None
    }

    fn put(&self, key: &str, url: &str) {
        let inserted_at = self.clock.now();
        self.lock_entries().insert(
            key.to_string(),
            CacheEntry {
                url: url.to_string(),
                inserted_at,
            },
        );
    }
}
