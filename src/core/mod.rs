//! Core rate limiting logic
//!
//! ## Module Structure
//!
//! - `duration` - Time window parsing ("10 s" style strings)
//! - `algorithm` - Algorithm configuration builders
//! - `response` - Admission decision type and reply decoding
//! - `cache` - Ephemeral in-process fallback cache
//! - `engine` - The `Ratelimit` engine (limit / block / reset)
//! - `factory` - Factory wiring around one shared store handle

pub mod algorithm;
pub mod cache;
pub mod duration;
pub mod engine;
pub mod factory;
pub mod response;
