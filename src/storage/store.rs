//! Store contract
//!
//! The engine talks to its backing store exclusively through this trait. A
//! conforming store must execute each decision as one atomic unit: concurrent
//! callers sharing an identifier have to observe a linearized sequence of
//! evict, count and insert steps. The Redis backend gets this from server-side
//! Lua scripts; the in-memory backend from a single lock.

use crate::core::algorithm::Algorithm;
use crate::core::response::RateLimitResponse;
use crate::utils::error::Result;
use async_trait::async_trait;

/// One atomic decision request.
#[derive(Debug, Clone, Copy)]
pub struct StoreRequest<'a> {
    /// Physical entry key (already prefixed, and epoch-suffixed for fixed
    /// window)
    pub key: &'a str,
    /// Parallel analytics key; `None` disables analytics for this call
    pub analytics_key: Option<&'a str>,
    /// Algorithm parameters to evaluate under
    pub algorithm: &'a Algorithm,
    /// Caller-observed time, epoch milliseconds
    pub now_ms: u64,
    /// Unique member for timestamp-set inserts; random-suffixed so two calls
    /// in the same millisecond never collide
    pub member: &'a str,
}

/// A key-value store capable of atomic scripted decisions and expiration.
///
/// Any store satisfying this contract is substitutable; the engine imposes no
/// further requirements.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Evaluate one admission decision atomically.
    async fn apply(&self, request: StoreRequest<'_>) -> Result<RateLimitResponse>;

    /// Delete the given keys unconditionally. Absent keys are a no-op.
    async fn delete(&self, keys: &[String]) -> Result<()>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<()>;
}
