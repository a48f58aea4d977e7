//! Port for the best-effort suppression cache used by the audit pipeline.
//!
//! Implementations may be per-process; a shared cache can replace the
//! in-memory one in multi-instance deployments without touching callers.

use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DedupeCache: Send + Sync {
    /// Record `key`. Returns `true` if it was not already present and unexpired.
    async fn first_sighting(&self, key: &str) -> bool;
}

/// Cache that never suppresses anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDedupeCache;

#[async_trait]
impl DedupeCache for NoopDedupeCache {
    async fn first_sighting(&self, _key: &str) -> bool {
        true
    }
}
