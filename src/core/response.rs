//! Admission decision type
//!
//! Every algorithm produces the same uniform reply: a 5 element array of
//! `{success, limit, remaining, reset, retry_after}`, extended to 7 elements
//! with `{pending, throughput}` when analytics is enabled. This module owns
//! the decoded form handed back to callers.

use crate::utils::error::{RatelimitError, Result};
use serde::Serialize;

/// Outcome of one rate limit decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitResponse {
    /// Whether the call is admitted
    pub success: bool,
    /// The configured ceiling for the current window or bucket
    pub limit: u64,
    /// Capacity left after this decision
    pub remaining: u64,
    /// Epoch milliseconds at which the window or bucket state next changes
    pub reset: u64,
    /// Minimum wait in seconds before retrying; present only when blocked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Current in-window count; present only when analytics is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<u64>,
    /// Requests observed in the last 1000 ms; present only when analytics is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput: Option<u64>,
}

impl RateLimitResponse {
    /// Decode the uniform store reply.
    ///
    /// Expects 5 elements, or 7 when `analytics` is set. Negative counters
    /// are clamped to zero rather than rejected, since Lua arithmetic can
    /// transiently underflow on concurrent eviction.
    pub fn from_reply(values: &[i64], analytics: bool) -> Result<Self> {
        let expected = if analytics { 7 } else { 5 };
        if values.len() != expected {
            return Err(RatelimitError::Decode(format!(
                "expected {} reply elements, got {}",
                expected,
                values.len()
            )));
        }

        let success = values[0] == 1;
        Ok(Self {
            success,
            limit: values[1].max(0) as u64,
            remaining: values[2].max(0) as u64,
            reset: values[3].max(0) as u64,
            retry_after: if success {
                None
            } else {
                Some(values[4].max(0) as u64)
            },
            pending: analytics.then(|| values[5].max(0) as u64),
            throughput: analytics.then(|| values[6].max(0) as u64),
        })
    }
}
