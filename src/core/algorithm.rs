//! Algorithm configuration builders
//!
//! Three strategies are supported, each carried as an explicit enum variant
//! with its normalized parameters. Construction goes through the builder
//! functions, which validate inputs and parse the time window.

use crate::core::duration::parse_time_window;
use crate::utils::error::{RatelimitError, Result};
use serde::{Deserialize, Serialize};

/// Rate limiting algorithm configuration
///
/// Immutable once constructed; one instance is owned per engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Algorithm {
    /// Counter per window epoch; a new physical key per `floor(now / interval)`
    FixedWindow {
        /// Maximum requests per window
        limit: u64,
        /// Window length in milliseconds
        interval_ms: u64,
    },
    /// Ordered set of request timestamps, evicted as the window slides
    SlidingWindow {
        /// Maximum requests per window
        limit: u64,
        /// Window length in milliseconds
        interval_ms: u64,
    },
    /// Bucket of tokens refilled at a steady rate, consumed one per request
    TokenBucket {
        /// Tokens added per interval
        refill_rate: u64,
        /// Refill interval in milliseconds
        interval_ms: u64,
        /// Bucket capacity (burst limit)
        limit: u64,
    },
}

impl Algorithm {
    /// The configured ceiling (window limit or bucket capacity)
    pub fn limit(&self) -> u64 {
        match self {
            Algorithm::FixedWindow { limit, .. }
            | Algorithm::SlidingWindow { limit, .. }
            | Algorithm::TokenBucket { limit, .. } => *limit,
        }
    }

    /// The window or refill interval in milliseconds
    pub fn interval_ms(&self) -> u64 {
        match self {
            Algorithm::FixedWindow { interval_ms, .. }
            | Algorithm::SlidingWindow { interval_ms, .. }
            | Algorithm::TokenBucket { interval_ms, .. } => *interval_ms,
        }
    }

    /// Validate the invariants `limit > 0`, `interval > 0`, `refill_rate > 0`
    pub(crate) fn validate(&self) -> Result<()> {
        if self.limit() == 0 {
            return Err(RatelimitError::Config("limit must be positive".into()));
        }
        if self.interval_ms() == 0 {
            return Err(RatelimitError::Config("interval must be positive".into()));
        }
        if let Algorithm::TokenBucket { refill_rate, .. } = self {
            if *refill_rate == 0 {
                return Err(RatelimitError::Config("refill rate must be positive".into()));
            }
        }
        Ok(())
    }
}

/// Create a fixed window configuration.
///
/// `window` is a time window string such as `"10 s"`.
pub fn fixed_window(limit: u64, window: &str) -> Result<Algorithm> {
    let algorithm = Algorithm::FixedWindow {
        limit,
        interval_ms: parse_time_window(window)?,
    };
    algorithm.validate()?;
    Ok(algorithm)
}

/// Create a sliding window configuration.
pub fn sliding_window(limit: u64, window: &str) -> Result<Algorithm> {
    let algorithm = Algorithm::SlidingWindow {
        limit,
        interval_ms: parse_time_window(window)?,
    };
    algorithm.validate()?;
    Ok(algorithm)
}

/// Create a token bucket configuration.
///
/// `refill_rate` tokens are added per `window`; `limit` is the bucket
/// capacity and therefore the burst limit.
pub fn token_bucket(refill_rate: u64, window: &str, limit: u64) -> Result<Algorithm> {
    let algorithm = Algorithm::TokenBucket {
        refill_rate,
        interval_ms: parse_time_window(window)?,
        limit,
    };
    algorithm.validate()?;
    Ok(algorithm)
}
