//! Factory wiring
//!
//! One factory is constructed at startup around one shared store handle;
//! every engine built from it shares that handle. The store's lifecycle
//! (connect at startup, drop at shutdown) stays with the host application.

use crate::config::RatelimitConfig;
use crate::core::engine::Ratelimit;
use crate::storage::store::RateLimitStore;
use crate::utils::error::Result;
use std::sync::Arc;

/// Builds engines over one shared store connection.
#[derive(Clone)]
pub struct RatelimitFactory {
    store: Arc<dyn RateLimitStore>,
}

impl RatelimitFactory {
    /// Wrap an already-connected store handle.
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    /// The shared store handle.
    pub fn store(&self) -> Arc<dyn RateLimitStore> {
        self.store.clone()
    }

    /// Build an engine bound to the shared store.
    ///
    /// Must be called inside a Tokio runtime when `config.ephemeral_cache`
    /// is enabled (the default), since the fallback cache spawns its sweep
    /// task during construction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RatelimitError::Config`] when the algorithm
    /// parameters are invalid.
    pub fn limiter(&self, config: RatelimitConfig) -> Result<Ratelimit> {
        Ratelimit::new(self.store.clone(), config)
    }

    /// Probe the shared store.
    pub async fn health_check(&self) -> Result<()> {
        self.store.ping().await
    }
}

impl std::fmt::Debug for RatelimitFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatelimitFactory").finish_non_exhaustive()
    }
}
