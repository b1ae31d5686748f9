//! List-response cache
//!
//! Keys are `METHOD:endpoint?k=v&...` with sorted, form-encoded query
//! parameters, so a value holding `&` or `=` cannot alias another query. A hit is
//! honoured only strictly before expiry; expired entries are removed lazily
//! when a lookup finds them. Mutating operations never touch the cache, so a
//! list may be stale for at most one TTL after a change.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tracing::trace;
use url::form_urlencoded;

use crate::types::{ListPage, QueryParams};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(method: &str, endpoint: &str, query: &QueryParams) -> Self {
        let mut encoded = form_urlencoded::Serializer::new(String::new());
        for (k, v) in query.iter() {
            encoded.append_pair(k, v);
        }
        Self(format!("{}:{}?{}", method, endpoint, encoded.finish()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Cache seam of the gateway
pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<ListPage>;

    fn put(&self, key: CacheKey, value: ListPage);

    /// Number of stored entries, expired ones included
    fn len(&self) -> usize {
        0
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache that never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl ResponseCache for NoopCache {
    fn get(&self, _key: &CacheKey) -> Option<ListPage> {
        None
    }

    fn put(&self, _key: CacheKey, _value: ListPage) {}
}

struct CacheEntry {
    value: ListPage,
    expires_at: Instant,
}

/// In-memory cache with a fixed time-to-live
pub struct TtlCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // A poisoned lock only means a writer panicked mid-insert; the map is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl ResponseCache for TtlCache {
    fn get(&self, key: &CacheKey) -> Option<ListPage> {
        {
            let entries = self.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if Instant::now() < entry.expires_at => {
                    trace!(key = key.as_str(), "cache hit");
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        let mut entries = self.write();
        if entries
            .get(key)
            .is_some_and(|entry| Instant::now() >= entry.expires_at)
        {
            trace!(key = key.as_str(), "cache entry expired");
            entries.remove(key);
        }
        None
    }

    fn put(&self, key: CacheKey, value: ListPage) {
        let expires_at = Instant::now() + self.ttl;
        self.write().insert(key, CacheEntry { value, expires_at });
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}
