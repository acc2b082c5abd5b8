//! Error handling for the rate limiter
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for the rate limiter
pub type Result<T> = std::result::Result<T, RatelimitError>;

/// Main error type for the rate limiter
#[derive(Error, Debug)]
pub enum RatelimitError {
    /// Numeric part of a time window is missing, non-numeric or not positive
    #[error("Invalid time value: {0}")]
    InvalidTimeValue(String),

    /// Unit part of a time window is not one of ms, s, m, h, d
    #[error("Invalid time unit: {0}")]
    InvalidTimeUnit(String),

    /// Limiter configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Redis errors
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    /// Store unreachable or in a state where commands cannot be issued
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Store operation exceeded the configured timeout
    #[error("Store operation timed out after {0}ms")]
    StoreTimeout(u64),

    /// `block` exhausted its wait budget or attempt cap without admission
    #[error("Blocked waiting for capacity: gave up after {waited_ms}ms and {attempts} attempts")]
    BlockTimeout {
        /// Total time spent waiting
        waited_ms: u64,
        /// Number of admission attempts made
        attempts: u32,
    },

    /// Store returned a reply the decision decoder does not understand
    #[error("Unexpected store reply: {0}")]
    Decode(String),
}
