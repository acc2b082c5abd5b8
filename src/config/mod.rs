//! Limiter configuration
//!
//! The options block a host passes when building an engine. Deserializable so
//! it can be embedded in the host's own configuration file.

use crate::core::algorithm::Algorithm;
use serde::{Deserialize, Serialize};

/// Rate limiter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatelimitConfig {
    /// Algorithm to evaluate admissions under
    pub limiter: Algorithm,
    /// Key prefix; entry keys are `prefix:identifier`
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Emit `pending` / `throughput` analytics counters
    #[serde(default)]
    pub analytics: bool,
    /// Per-store-call timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Keep a local fallback counter for store outages
    #[serde(default = "default_true")]
    pub ephemeral_cache: bool,
    /// TTL for local fallback entries in milliseconds
    #[serde(default = "default_ephemeral_cache_ttl_ms")]
    pub ephemeral_cache_ttl_ms: u64,
    /// Extend the local fallback beyond sliding window to all algorithms
    /// (approximated as a windowed counter)
    #[serde(default)]
    pub ephemeral_cache_all_algorithms: bool,
}

impl RatelimitConfig {
    /// Configuration with the given algorithm and prefix, defaults elsewhere.
    pub fn new(limiter: Algorithm, prefix: impl Into<String>) -> Self {
        Self {
            limiter,
            prefix: prefix.into(),
            analytics: false,
            timeout_ms: default_timeout_ms(),
            ephemeral_cache: true,
            ephemeral_cache_ttl_ms: default_ephemeral_cache_ttl_ms(),
            ephemeral_cache_all_algorithms: false,
        }
    }

    /// Enable analytics counters.
    pub fn with_analytics(mut self, analytics: bool) -> Self {
        self.analytics = analytics;
        self
    }

    /// Override the per-store-call timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Enable or disable the local fallback cache.
    pub fn with_ephemeral_cache(mut self, enabled: bool) -> Self {
        self.ephemeral_cache = enabled;
        self
    }
}

fn default_prefix() -> String {
    "ratelimit".to_string()
}

fn default_timeout_ms() -> u64 {
    1_000
}

fn default_ephemeral_cache_ttl_ms() -> u64 {
    60_000
}

fn default_true() -> bool {
    true
}
