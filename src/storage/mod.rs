//! Store backends
//!
//! ## Module Structure
//!
//! - `store` - The `RateLimitStore` contract every backend satisfies
//! - `redis` - Redis backend (Lua-scripted atomic decisions)
//! - `memory` - In-process backend (single-lock atomicity)

pub mod memory;
pub mod redis;
pub mod store;
