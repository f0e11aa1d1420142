use dashmap::DashMap;
use sha1::{Digest, Sha1};
use std::time::{Duration, Instant};

/// How long remote responses are cached unless configured otherwise.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// A process-wide cache for remote response bodies.
///
/// Implementations must be safe to share between concurrent resolutions. Concurrent writes to the
/// same key are resolved by the last write.
pub trait ResponseCache: Send + Sync {
    fn has(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<String>;

    fn put(&self, key: &str, value: String, ttl: Duration);
}

/// Derives the cache key of a remote request: `hex(sha1(namespace:id:content))`.
pub fn cache_key(namespace: &str, source_id: u64, content: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("{namespace}:{source_id}:").as_bytes());
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// An in-memory [ResponseCache]. Expired entries are dropped on every write and when they are read.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

#[derive(Debug)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResponseCache for MemoryCache {
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    fn put(&self, key: &str, value: String, ttl: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let Some(expires_at) = now.checked_add(ttl) else {
            return;
        };
        self.entries
            .insert(key.to_owned(), CacheEntry { value, expires_at });
    }
}
