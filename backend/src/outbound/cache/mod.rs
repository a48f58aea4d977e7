//! Bounded, TTL-based implementation of the `DedupeCache` port.
//!
//! Entries expire `ttl` after they were recorded. The map is only swept when
//! it grows past `capacity`; if every entry is still live at that point the
//! oldest are dropped, so memory stays bounded under key churn. The cache is
//! per process; a shared cache can replace it behind the same port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tracing::debug;

use crate::domain::ports::DedupeCache;

/// Suppression window used for quota-denial audit events.
pub const DEFAULT_DEDUPE_TTL: Duration = Duration::from_secs(10 * 60);
/// Entries held before an eviction sweep runs.
pub const DEFAULT_DEDUPE_CAPACITY: usize = 10_000;

pub struct BoundedDedupeCache {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
    capacity: usize,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl BoundedDedupeCache {
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }

    /// Cache with the default capacity and ten minute window.
    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(DEFAULT_DEDUPE_CAPACITY, DEFAULT_DEDUPE_TTL, clock)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict(&self, entries: &mut HashMap<String, DateTime<Utc>>, now: DateTime<Utc>) {
        let before = entries.len();
        entries.retain(|_, recorded| now - *recorded < self.ttl);
        if entries.len() > self.capacity {
            let mut ages: Vec<(String, DateTime<Utc>)> =
                entries.iter().map(|(key, at)| (key.clone(), *at)).collect();
            ages.sort_by_key(|(_, at)| *at);
            let excess = entries.len() - self.capacity;
            for (key, _) in ages.into_iter().take(excess) {
                entries.remove(&key);
            }
        }
        debug!(evicted = before - entries.len(), "dedupe cache swept");
    }
}

#[async_trait]
impl DedupeCache for BoundedDedupeCache {
    async fn first_sighting(&self, key: &str) -> bool {
        let now = self.clock.utc();
        let mut entries = self.lock();
        if let Some(recorded) = entries.get(key) {
            if now - *recorded < self.ttl {
                return false;
            }
        }
        entries.insert(key.to_owned(), now);
        if entries.len() > self.capacity {
            self.evict(&mut entries, now);
        }
        true
    }
}
