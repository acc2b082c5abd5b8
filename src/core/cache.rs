//! Ephemeral in-process fallback cache
//!
//! A best-effort local counter used when the remote store is unreachable.
//! This is NOT distributed-safe: each process counts alone, so enforcement is
//! approximate during an outage. It exists purely as a single-process
//! degradation path.

use crate::utils::epoch_ms;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Sweep at most once a minute even for long TTLs
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    count: u64,
    expires: u64,
}

/// TTL-based local counter, exclusively owned by one engine instance.
#[derive(Debug)]
pub struct EphemeralCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl_ms: u64,
}

impl EphemeralCache {
    /// Create a cache and start its background sweep.
    ///
    /// The sweep runs every `min(ttl, 60s)` and holds only a weak reference,
    /// so it ends once the cache is dropped.
    pub fn new(ttl_ms: u64) -> Self {
        let entries: Arc<RwLock<HashMap<String, CacheEntry>>> = Arc::default();
        Self::start_sweep_task(Arc::downgrade(&entries), ttl_ms);
        Self { entries, ttl_ms }
    }

    /// Current count for `key`, or 0 if absent or expired.
    pub async fn get(&self, key: &str) -> u64 {
        let now = epoch_ms();
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.expires > now => entry.count,
            _ => 0,
        }
    }

    /// Increment the counter for `key`, resetting to 1 with a fresh expiry
    /// of `now + window_ms` when absent or expired. Returns the new count.
    pub async fn increment(&self, key: &str, window_ms: u64) -> u64 {
        let now = epoch_ms();
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if entry.expires <= now {
                    entry.count = 0;
                    entry.expires = now + window_ms;
                }
                entry.count += 1;
            })
            .or_insert(CacheEntry {
                count: 1,
                expires: now + window_ms,
            });
        entry.count
    }

    /// Expiry of the live entry for `key` (epoch ms), if any.
    pub async fn expires(&self, key: &str) -> Option<u64> {
        let now = epoch_ms();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.expires > now)
            .map(|entry| entry.expires)
    }

    /// Drop the entry for `key`, live or not.
    pub async fn clear(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Configured entry TTL in milliseconds.
    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    fn start_sweep_task(entries: Weak<RwLock<HashMap<String, CacheEntry>>>, ttl_ms: u64) {
        let period = Duration::from_millis(ttl_ms).min(MAX_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(entries) = entries.upgrade() else {
                    break;
                };
                let now = epoch_ms();
                let mut entries = entries.write().await;
                let before = entries.len();
                entries.retain(|_, entry| entry.expires > now);
                if entries.len() < before {
                    debug!(swept = before - entries.len(), "ephemeral cache sweep");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_absent_is_zero() {
        let cache = EphemeralCache::new(60_000);
        assert_eq!(cache.get("missing").await, 0);
    }

    #[tokio::test]
    async fn test_increment_counts_up() {
        let cache = EphemeralCache::new(60_000);
        assert_eq!(cache.increment("k", 1_000).await, 1);
        assert_eq!(cache.increment("k", 1_000).await, 2);
        assert_eq!(cache.increment("k", 1_000).await, 3);
        assert_eq!(cache.get("k").await, 3);
    }

    #[tokio::test]
    async fn test_expired_entry_resets_to_one() {
        let cache = EphemeralCache::new(60_000);
        cache.increment("k", 30).await;
        cache.increment("k", 30).await;

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(cache.get("k").await, 0);
        assert_eq!(cache.increment("k", 1_000).await, 1);
    }

    #[tokio::test]
    async fn test_clear_removes_entry() {
        let cache = EphemeralCache::new(60_000);
        cache.increment("k", 60_000).await;
        cache.clear("k").await;
        assert_eq!(cache.get("k").await, 0);
        assert!(cache.expires("k").await.is_none());
    }

    #[tokio::test]
    async fn test_expires_tracks_window() {
        let cache = EphemeralCache::new(60_000);
        let before = epoch_ms();
        cache.increment("k", 5_000).await;
        let expires = cache.expires("k").await.unwrap();
        assert!(expires >= before + 5_000);
        assert!(expires <= epoch_ms() + 5_000);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache = EphemeralCache::new(60_000);
        cache.increment("a", 60_000).await;
        cache.increment("a", 60_000).await;
        cache.increment("b", 60_000).await;
        assert_eq!(cache.get("a").await, 2);
        assert_eq!(cache.get("b").await, 1);
    }
}
