//! # ratelimit-rs
//!
//! Redis-backed distributed rate limiting for Rust services.
//!
//! ## Features
//!
//! - **Three algorithms**: sliding window, fixed window and token bucket
//! - **Atomic decisions**: each check runs as one server-side Lua script, so
//!   check-and-increment never races across concurrent callers
//! - **Graceful degradation**: falls back to an in-process counter, or fails
//!   open, when the store is unreachable
//! - **Analytics counters**: optional `pending` / `throughput` metrics per
//!   decision
//! - **Blocking retry**: `block` waits with backoff until capacity frees
//! - **Substitutable store**: any backend implementing [`RateLimitStore`]
//!   works; an in-memory backend ships for process-local limiting and tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ratelimit_rs::{sliding_window, RatelimitConfig, RatelimitFactory, RedisStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(RedisStore::connect("redis://localhost:6379").await?);
//!     let factory = RatelimitFactory::new(store);
//!
//!     let limiter = factory.limiter(RatelimitConfig::new(
//!         sliding_window(10, "10 s")?,
//!         "api",
//!     ))?;
//!
//!     let decision = limiter.limit("user-42").await;
//!     if !decision.success {
//!         println!("throttled, retry after {:?}s", decision.retry_after);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod storage;
pub mod utils;

// Re-export main types
pub use crate::config::RatelimitConfig;
pub use crate::core::algorithm::{fixed_window, sliding_window, token_bucket, Algorithm};
pub use crate::core::cache::EphemeralCache;
pub use crate::core::duration::{parse_time_window, TimeWindow};
pub use crate::core::engine::Ratelimit;
pub use crate::core::factory::RatelimitFactory;
pub use crate::core::response::RateLimitResponse;
pub use crate::storage::memory::MemoryStore;
pub use crate::storage::redis::RedisStore;
pub use crate::storage::store::{RateLimitStore, StoreRequest};
pub use crate::utils::error::{RatelimitError, Result};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
