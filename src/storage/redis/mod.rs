//! Redis store backend
//!
//! ## Module Structure
//!
//! - `store` - Connection management and the `RateLimitStore` implementation
//! - `scripts` - The per-algorithm Lua decision scripts

mod scripts;
mod store;

pub use store::RedisStore;
