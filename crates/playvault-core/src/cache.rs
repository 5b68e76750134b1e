//! In-process TTL cache.
//!
//! Backs three concerns on the server:
//! - advisory response caching with prefix-pattern invalidation
//! - one-shot verification codes (password-reset OTPs)
//! - fixed-window rate-limit counters
//!
//! Entries are disposable projections; dropping the whole cache at any time
//! is always safe. Expired entries are evicted lazily on access.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Thread-safe string cache with per-entry TTLs.
#[derive(Clone)]
pub struct TtlCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a value under `key` for `ttl`.
    pub async fn set(&self, key: &str, value: impl Into<String>, ttl: Duration) {
        let entry = Entry {
            value: value.into(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    /// Fetch a value, evicting it if expired.
    pub async fn get(&self, key: &str) -> Option<String> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: take the write lock to evict.
        self.entries.write().await.remove(key);
        None
    }

    /// Remove a single entry. Returns whether it existed.
    pub async fn remove(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Fetch-and-remove, for one-shot values such as OTP codes.
    pub async fn take(&self, key: &str) -> Option<String> {
        let entry = self.entries.write().await.remove(key)?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.value)
    }

    /// Drop every entry whose key starts with `prefix`. Returns the count.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(prefix, removed, "Cache prefix invalidated");
        }
        removed
    }

    /// Increment a fixed-window counter. The window starts on the first hit
    /// and the counter expires `window` later regardless of further hits.
    /// Returns the count including this hit.
    pub async fn incr_window(&self, key: &str, window: Duration) -> u64 {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                let count = entry.value.parse::<u64>().unwrap_or(0) + 1;
                entry.value = count.to_string();
                count
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: Instant::now() + window,
                    },
                );
                1
            }
        }
    }

    /// Number of live (possibly expired-but-unevicted) entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}
