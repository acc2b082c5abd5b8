//! In-process store backend
//!
//! Implements the same decision semantics as the Lua scripts in the Redis
//! backend, with atomicity coming from one async mutex instead of server-side
//! scripting. Useful for hosts that want process-local limiting, and as the
//! substitutable store in tests.
//!
//! State is bounded the same way the Redis keys are: every entry carries an
//! expiry of twice its interval and is lazily reset once stale.

use crate::core::algorithm::Algorithm;
use crate::core::response::RateLimitResponse;
use crate::storage::store::{RateLimitStore, StoreRequest};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Analytics throughput is measured over the trailing second
const THROUGHPUT_WINDOW_MS: u64 = 1_000;

#[derive(Debug, Default)]
struct SlidingEntry {
    timestamps: Vec<u64>,
    expires: u64,
}

#[derive(Debug, Default)]
struct CounterEntry {
    count: u64,
    expires: u64,
}

#[derive(Debug)]
struct BucketEntry {
    tokens: u64,
    last_refill: u64,
    expires: u64,
}

#[derive(Debug, Default)]
struct Inner {
    sliding: HashMap<String, SlidingEntry>,
    counters: HashMap<String, CounterEntry>,
    buckets: HashMap<String, BucketEntry>,
    analytics: HashMap<String, Vec<u64>>,
}

/// Store backend holding all state in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn apply(&self, request: StoreRequest<'_>) -> Result<RateLimitResponse> {
        let mut inner = self.inner.lock().await;

        let (success, count, remaining, reset, retry_after) = match *request.algorithm {
            Algorithm::SlidingWindow { limit, interval_ms } => {
                sliding_window(&mut inner, &request, limit, interval_ms)
            }
            Algorithm::FixedWindow { limit, interval_ms } => {
                fixed_window(&mut inner, &request, limit, interval_ms)
            }
            Algorithm::TokenBucket {
                refill_rate,
                interval_ms,
                limit,
            } => token_bucket(&mut inner, &request, refill_rate, interval_ms, limit),
        };

        let (pending, throughput) = match request.analytics_key {
            Some(analytics_key) => {
                let observed = inner.analytics.entry(analytics_key.to_string()).or_default();
                observed.push(request.now_ms);
                let floor = request.now_ms.saturating_sub(THROUGHPUT_WINDOW_MS);
                observed.retain(|&t| t >= floor);
                (Some(count), Some(observed.len() as u64))
            }
            None => (None, None),
        };

        Ok(RateLimitResponse {
            success,
            limit: request.algorithm.limit(),
            remaining,
            reset,
            retry_after: (!success).then_some(retry_after),
            pending,
            throughput,
        })
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        for key in keys {
            inner.sliding.remove(key);
            inner.counters.remove(key);
            inner.buckets.remove(key);
            inner.analytics.remove(key);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Evict, count, maybe insert. Mirrors the sliding window Lua script.
fn sliding_window(
    inner: &mut Inner,
    request: &StoreRequest<'_>,
    limit: u64,
    interval_ms: u64,
) -> (bool, u64, u64, u64, u64) {
    let now = request.now_ms;
    let entry = inner.sliding.entry(request.key.to_string()).or_default();
    if entry.expires <= now {
        entry.timestamps.clear();
    }

    // Boundary timestamps exactly at the window edge are evicted.
    let edge = now.saturating_sub(interval_ms);
    entry.timestamps.retain(|&t| t > edge);

    let mut count = entry.timestamps.len() as u64;
    let success = count < limit;
    if success {
        entry.timestamps.push(now);
        count += 1;
    }
    entry.expires = now + 2 * interval_ms;

    let reset = match entry.timestamps.iter().min() {
        Some(&oldest) => oldest + interval_ms,
        None => now + interval_ms,
    };
    let retry_after = if success {
        0
    } else {
        (reset.saturating_sub(now)).div_ceil(1_000).max(1)
    };

    (success, count, limit.saturating_sub(count), reset, retry_after)
}

/// Increment the epoch-partitioned counter. Mirrors the fixed window Lua
/// script: blocked calls still increment, and the TTL is set on first touch.
fn fixed_window(
    inner: &mut Inner,
    request: &StoreRequest<'_>,
    limit: u64,
    interval_ms: u64,
) -> (bool, u64, u64, u64, u64) {
    let now = request.now_ms;
    let entry = inner.counters.entry(request.key.to_string()).or_default();
    if entry.expires <= now {
        entry.count = 0;
    }

    entry.count += 1;
    if entry.count == 1 {
        entry.expires = now + 2 * interval_ms;
    }

    let count = entry.count;
    let success = count <= limit;
    let reset = (now / interval_ms + 1) * interval_ms;
    let retry_after = if success {
        0
    } else {
        (entry.expires.saturating_sub(now)).div_ceil(1_000).max(1)
    };

    (success, count, limit.saturating_sub(count), reset, retry_after)
}

/// Refill then consume. Mirrors the token bucket Lua script.
fn token_bucket(
    inner: &mut Inner,
    request: &StoreRequest<'_>,
    refill_rate: u64,
    interval_ms: u64,
    capacity: u64,
) -> (bool, u64, u64, u64, u64) {
    let now = request.now_ms;
    let entry = inner
        .buckets
        .entry(request.key.to_string())
        .or_insert(BucketEntry {
            tokens: capacity,
            last_refill: now,
            expires: now + 2 * interval_ms,
        });
    if entry.expires <= now {
        entry.tokens = capacity;
        entry.last_refill = now;
    }

    let elapsed = now.saturating_sub(entry.last_refill);
    let refill = elapsed * refill_rate / interval_ms;
    if refill > 0 {
        entry.tokens = (entry.tokens + refill).min(capacity);
        entry.last_refill = now;
    }

    let success = entry.tokens >= 1;
    if success {
        entry.tokens -= 1;
    }
    entry.expires = now + 2 * interval_ms;

    let consumed = capacity - entry.tokens;
    let reset = entry.last_refill + interval_ms;
    let retry_after = if success {
        0
    } else {
        interval_ms.div_ceil(refill_rate).div_ceil(1_000).max(1)
    };

    (success, consumed, entry.tokens, reset, retry_after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::algorithm::{fixed_window, sliding_window, token_bucket};
    use crate::utils::epoch_ms;

    fn request<'a>(
        key: &'a str,
        algorithm: &'a Algorithm,
        now_ms: u64,
        member: &'a str,
    ) -> StoreRequest<'a> {
        StoreRequest {
            key,
            analytics_key: None,
            algorithm,
            now_ms,
            member,
        }
    }

    #[tokio::test]
    async fn test_sliding_window_blocks_at_limit() {
        let store = MemoryStore::new();
        let algorithm = sliding_window(10, "10 s").unwrap();
        let now = epoch_ms();

        for i in 0..10 {
            let member = format!("m{i}");
            let response = store
                .apply(request("sw:u1", &algorithm, now + i, &member))
                .await
                .unwrap();
            assert!(response.success, "request {} should be admitted", i);
        }

        let response = store
            .apply(request("sw:u1", &algorithm, now + 10, "m10"))
            .await
            .unwrap();
        assert!(!response.success);
        assert_eq!(response.remaining, 0);
        assert!(response.retry_after.unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_sliding_window_evicts_expired_timestamps() {
        let store = MemoryStore::new();
        let algorithm = sliding_window(2, "1 s").unwrap();
        let now = epoch_ms();

        store.apply(request("sw:u2", &algorithm, now, "a")).await.unwrap();
        store
            .apply(request("sw:u2", &algorithm, now + 1, "b"))
            .await
            .unwrap();
        let blocked = store
            .apply(request("sw:u2", &algorithm, now + 2, "c"))
            .await
            .unwrap();
        assert!(!blocked.success);

        // One interval later the old entries are outside the window.
        let later = store
            .apply(request("sw:u2", &algorithm, now + 1_200, "d"))
            .await
            .unwrap();
        assert!(later.success);
    }

    #[tokio::test]
    async fn test_sliding_window_edge_timestamp_excluded() {
        let store = MemoryStore::new();
        let algorithm = sliding_window(1, "1 s").unwrap();
        let now = epoch_ms();

        store.apply(request("sw:u3", &algorithm, now, "a")).await.unwrap();

        // Exactly one interval later the first timestamp sits on the window
        // edge and must already be evicted.
        let response = store
            .apply(request("sw:u3", &algorithm, now + 1_000, "b"))
            .await
            .unwrap();
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_fixed_window_epochs_are_isolated() {
        let store = MemoryStore::new();
        let algorithm = fixed_window(2, "1 s").unwrap();
        let now = epoch_ms();

        // Engine partitions the physical key by epoch; emulate two epochs.
        for _ in 0..2 {
            assert!(store
                .apply(request("fw:u1:100", &algorithm, now, "m"))
                .await
                .unwrap()
                .success);
        }
        let blocked = store
            .apply(request("fw:u1:100", &algorithm, now, "m"))
            .await
            .unwrap();
        assert!(!blocked.success);
        assert!(blocked.retry_after.unwrap() >= 1);

        let next_epoch = store
            .apply(request("fw:u1:101", &algorithm, now + 1_000, "m"))
            .await
            .unwrap();
        assert!(next_epoch.success);
        assert_eq!(next_epoch.remaining, 1);
    }

    #[tokio::test]
    async fn test_fixed_window_blocked_calls_still_count() {
        let store = MemoryStore::new();
        let algorithm = fixed_window(1, "10 s").unwrap();
        let now = epoch_ms();

        store.apply(request("fw:u2:5", &algorithm, now, "m")).await.unwrap();
        let second = store
            .apply(request("fw:u2:5", &algorithm, now, "m"))
            .await
            .unwrap();
        let third = store
            .apply(request("fw:u2:5", &algorithm, now, "m"))
            .await
            .unwrap();
        assert!(!second.success);
        assert!(!third.success);
        assert_eq!(third.remaining, 0);
    }

    #[tokio::test]
    async fn test_token_bucket_consumes_and_refills() {
        let store = MemoryStore::new();
        let algorithm = token_bucket(1, "1 s", 2).unwrap();
        let now = epoch_ms();

        assert!(store.apply(request("tb:u1", &algorithm, now, "m")).await.unwrap().success);
        assert!(store
            .apply(request("tb:u1", &algorithm, now + 1, "m"))
            .await
            .unwrap()
            .success);

        let empty = store
            .apply(request("tb:u1", &algorithm, now + 2, "m"))
            .await
            .unwrap();
        assert!(!empty.success);
        assert_eq!(empty.remaining, 0);
        assert_eq!(empty.retry_after, Some(1));

        // One interval per token: exactly one more admission after a refill.
        let refilled = store
            .apply(request("tb:u1", &algorithm, now + 1_050, "m"))
            .await
            .unwrap();
        assert!(refilled.success);
        let drained = store
            .apply(request("tb:u1", &algorithm, now + 1_060, "m"))
            .await
            .unwrap();
        assert!(!drained.success);
    }

    #[tokio::test]
    async fn test_token_bucket_refill_caps_at_capacity() {
        let store = MemoryStore::new();
        let algorithm = token_bucket(10, "1 s", 3).unwrap();
        let now = epoch_ms();

        store.apply(request("tb:u2", &algorithm, now, "m")).await.unwrap();

        // A long idle period refills far more than capacity; it must clamp.
        let response = store
            .apply(request("tb:u2", &algorithm, now + 60_000, "m"))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.remaining, 2);
    }

    #[tokio::test]
    async fn test_analytics_counters() {
        let store = MemoryStore::new();
        let algorithm = sliding_window(10, "10 s").unwrap();
        let now = epoch_ms();

        let req = StoreRequest {
            key: "an:u1",
            analytics_key: Some("an:u1:analytics"),
            algorithm: &algorithm,
            now_ms: now,
            member: "m0",
        };
        let first = store.apply(req).await.unwrap();
        assert_eq!(first.pending, Some(1));
        assert_eq!(first.throughput, Some(1));

        let req = StoreRequest {
            key: "an:u1",
            analytics_key: Some("an:u1:analytics"),
            algorithm: &algorithm,
            now_ms: now + 10,
            member: "m1",
        };
        let second = store.apply(req).await.unwrap();
        assert_eq!(second.pending, Some(2));
        assert_eq!(second.throughput, Some(2));
    }

    #[tokio::test]
    async fn test_delete_resets_state() {
        let store = MemoryStore::new();
        let algorithm = sliding_window(1, "10 s").unwrap();
        let now = epoch_ms();

        store.apply(request("del:u1", &algorithm, now, "a")).await.unwrap();
        let blocked = store
            .apply(request("del:u1", &algorithm, now + 1, "b"))
            .await
            .unwrap();
        assert!(!blocked.success);

        store.delete(&["del:u1".to_string()]).await.unwrap();

        let fresh = store
            .apply(request("del:u1", &algorithm, now + 2, "c"))
            .await
            .unwrap();
        assert!(fresh.success);
    }

    #[tokio::test]
    async fn test_delete_absent_key_is_noop() {
        let store = MemoryStore::new();
        store.delete(&["ghost".to_string()]).await.unwrap();
        store.delete(&["ghost".to_string()]).await.unwrap();
    }
}
