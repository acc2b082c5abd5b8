//! Ratelimit engine
//!
//! Orchestrates one algorithm against one store handle: builds keys, runs the
//! atomic decision, degrades to the local ephemeral cache or fails open when
//! the store is unreachable, and offers a blocking-wait retry on top.

use crate::config::RatelimitConfig;
use crate::core::algorithm::Algorithm;
use crate::core::cache::EphemeralCache;
use crate::core::response::RateLimitResponse;
use crate::storage::store::{RateLimitStore, StoreRequest};
use crate::utils::epoch_ms;
use crate::utils::error::{RatelimitError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Hard cap on admission attempts inside `block`
const MAX_BLOCK_ATTEMPTS: u32 = 100;

/// Default wait budget for `block`
const DEFAULT_BLOCK_WAIT: Duration = Duration::from_millis(5_000);

/// Reset horizon reported when failing open, arbitrary by design
const FAIL_OPEN_RESET_MS: u64 = 60_000;

/// A configured rate limiter.
///
/// Stateless across calls apart from the shared store handle and the
/// exclusively owned fallback cache; one instance is created at startup and
/// lives for the process. Cheap to share behind an `Arc`.
pub struct Ratelimit {
    store: Arc<dyn RateLimitStore>,
    algorithm: Algorithm,
    prefix: String,
    analytics: bool,
    timeout: Duration,
    cache: Option<EphemeralCache>,
    cache_all_algorithms: bool,
}

impl Ratelimit {
    /// Build an engine around a shared store handle.
    ///
    /// Must be called inside a Tokio runtime when the ephemeral cache is
    /// enabled, since the cache spawns its sweep task here.
    ///
    /// # Errors
    ///
    /// Returns [`RatelimitError::Config`] when the algorithm parameters are
    /// invalid.
    pub fn new(store: Arc<dyn RateLimitStore>, config: RatelimitConfig) -> Result<Self> {
        config.limiter.validate()?;
        let cache = config
            .ephemeral_cache
            .then(|| EphemeralCache::new(config.ephemeral_cache_ttl_ms));
        Ok(Self {
            store,
            algorithm: config.limiter,
            prefix: config.prefix,
            analytics: config.analytics,
            timeout: Duration::from_millis(config.timeout_ms),
            cache,
            cache_all_algorithms: config.ephemeral_cache_all_algorithms,
        })
    }

    /// The algorithm this engine evaluates under.
    pub fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    /// Decide whether `identifier` may proceed.
    ///
    /// Store failures are never surfaced: the engine falls back to its local
    /// cache when one is configured for this algorithm, and otherwise fails
    /// open, logging either way. Availability wins over strict enforcement
    /// during an outage.
    pub async fn limit(&self, identifier: &str) -> RateLimitResponse {
        let now = epoch_ms();
        let key = self.entry_key(identifier, now);
        let analytics_key = self.analytics.then(|| self.analytics_key(identifier));
        let member = format!("{}-{:08x}", now, rand::random::<u32>());

        let request = StoreRequest {
            key: &key,
            analytics_key: analytics_key.as_deref(),
            algorithm: &self.algorithm,
            now_ms: now,
            member: &member,
        };

        let outcome = match tokio::time::timeout(self.timeout, self.store.apply(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RatelimitError::StoreTimeout(self.timeout.as_millis() as u64)),
        };

        match outcome {
            Ok(response) => {
                if !response.success {
                    debug!(identifier, limit = response.limit, "rate limit exceeded");
                }
                response
            }
            Err(error) => self.degraded(identifier, now, &error).await,
        }
    }

    /// Wait for admission, retrying with backoff.
    ///
    /// Sleeps `clamp(retry_after × 500ms, 50ms, 500ms)` between attempts,
    /// bounded by `max_wait` (default 5 s) and a hard cap of 100 attempts.
    /// This is a cooperative busy-wait: competing blocked callers race for
    /// freed capacity with no ordering guarantee.
    ///
    /// # Errors
    ///
    /// Returns [`RatelimitError::BlockTimeout`] when both bounds are
    /// exhausted without admission.
    pub async fn block(
        &self,
        identifier: &str,
        max_wait: Option<Duration>,
    ) -> Result<RateLimitResponse> {
        let max_wait = max_wait.unwrap_or(DEFAULT_BLOCK_WAIT);
        let started = Instant::now();
        let mut attempts = 0;

        while attempts < MAX_BLOCK_ATTEMPTS {
            let response = self.limit(identifier).await;
            attempts += 1;
            if response.success {
                return Ok(response);
            }
            if started.elapsed() >= max_wait {
                break;
            }

            let backoff_ms = (response.retry_after.unwrap_or(1) * 500).clamp(50, 500);
            debug!(identifier, attempts, backoff_ms, "blocked, backing off");
            sleep(Duration::from_millis(backoff_ms)).await;
        }

        Err(RatelimitError::BlockTimeout {
            waited_ms: started.elapsed().as_millis() as u64,
            attempts,
        })
    }

    /// Forget all state for `identifier`: the entry key, its analytics key
    /// and any local fallback entry. Deleting absent keys is a no-op.
    ///
    /// # Errors
    ///
    /// Unlike `limit`, store failures here ARE surfaced, since the caller
    /// asked for something the engine could not honestly do.
    pub async fn reset(&self, identifier: &str) -> Result<()> {
        let now = epoch_ms();
        let keys = vec![self.entry_key(identifier, now), self.analytics_key(identifier)];

        tokio::time::timeout(self.timeout, self.store.delete(&keys))
            .await
            .map_err(|_| RatelimitError::StoreTimeout(self.timeout.as_millis() as u64))??;

        if let Some(cache) = &self.cache {
            cache.clear(&self.cache_key(identifier)).await;
        }
        debug!(identifier, "rate limit state reset");
        Ok(())
    }

    /// Physical entry key; fixed window partitions by window epoch so each
    /// epoch gets its own key.
    fn entry_key(&self, identifier: &str, now_ms: u64) -> String {
        match self.algorithm {
            Algorithm::FixedWindow { interval_ms, .. } => {
                format!("{}:{}:{}", self.prefix, identifier, now_ms / interval_ms)
            }
            _ => format!("{}:{}", self.prefix, identifier),
        }
    }

    fn analytics_key(&self, identifier: &str) -> String {
        format!("{}:{}:analytics", self.prefix, identifier)
    }

    /// Local cache entries are keyed without the epoch so `reset` can find
    /// them regardless of algorithm.
    fn cache_key(&self, identifier: &str) -> String {
        format!("{}:{}", self.prefix, identifier)
    }

    /// Store is unreachable: approximate locally, or fail open.
    async fn degraded(
        &self,
        identifier: &str,
        now_ms: u64,
        error: &RatelimitError,
    ) -> RateLimitResponse {
        let limit = self.algorithm.limit();

        if let Some(cache) = &self.cache {
            let sliding = matches!(self.algorithm, Algorithm::SlidingWindow { .. });
            if sliding || self.cache_all_algorithms {
                warn!(
                    identifier,
                    error = %error,
                    "store unavailable, falling back to ephemeral cache"
                );
                let interval_ms = self.algorithm.interval_ms();
                let key = self.cache_key(identifier);
                let count = cache.increment(&key, interval_ms).await;
                let success = count <= limit;
                let reset = cache.expires(&key).await.unwrap_or(now_ms + interval_ms);
                return RateLimitResponse {
                    success,
                    limit,
                    remaining: limit.saturating_sub(count),
                    reset,
                    retry_after: (!success)
                        .then(|| reset.saturating_sub(now_ms).div_ceil(1_000).max(1)),
                    pending: None,
                    throughput: None,
                };
            }
        }

        warn!(
            identifier,
            error = %error,
            "store unavailable and no local fallback, failing open"
        );
        RateLimitResponse {
            success: true,
            limit,
            remaining: limit.saturating_sub(1),
            reset: now_ms + FAIL_OPEN_RESET_MS,
            retry_after: None,
            pending: None,
            throughput: None,
        }
    }
}

impl std::fmt::Debug for Ratelimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ratelimit")
            .field("algorithm", &self.algorithm)
            .field("prefix", &self.prefix)
            .field("analytics", &self.analytics)
            .field("timeout", &self.timeout)
            .field("ephemeral_cache", &self.cache.is_some())
            .finish()
    }
}
