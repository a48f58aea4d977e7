//! Edge rate limiting with per-identity token buckets.
//!
//! Buckets are keyed by `(identity, class)`: the authenticated user id when
//! there is one, otherwise the peer address. This is a coarse first line in
//! front of the daily quotas, which stay authoritative.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde_json::json;

use crate::domain::{Caller, Error};

/// Operation classes limited independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateClass {
    Write,
    Destructive,
    Invitation,
    AccountDelete,
    VaultDelete,
}

impl RateClass {
    pub const ALL: [Self; 5] = [
        Self::Write,
        Self::Destructive,
        Self::Invitation,
        Self::AccountDelete,
        Self::VaultDelete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Destructive => "destructive",
            Self::Invitation => "invitation",
            Self::AccountDelete => "account_delete",
            Self::VaultDelete => "vault_delete",
        }
    }

    /// Default ceiling and window for the class.
    pub fn default_rule(self) -> RateRule {
        match self {
            Self::Write => RateRule::new(120, Duration::from_secs(60)),
            Self::Destructive => RateRule::new(30, Duration::from_secs(60)),
            Self::Invitation => RateRule::new(20, Duration::from_secs(60 * 60)),
            Self::AccountDelete => RateRule::new(3, Duration::from_secs(60 * 60)),
            Self::VaultDelete => RateRule::new(5, Duration::from_secs(60 * 60)),
        }
    }
}

/// `capacity` requests per `window`, refilled continuously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateRule {
    pub capacity: u32,
    pub window: Duration,
}

impl RateRule {
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            window: window.max(Duration::from_millis(1)),
        }
    }

    /// Tokens regained over `elapsed` seconds.
    fn refill(self, elapsed: f64) -> f64 {
        elapsed * f64::from(self.capacity) / self.window.as_secs_f64()
    }

    /// Seconds until `missing` tokens are regained.
    fn wait_for(self, missing: f64) -> f64 {
        missing * self.window.as_secs_f64() / f64::from(self.capacity)
    }
}

/// Identity a bucket is charged against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateKey {
    User(String),
    Address(String),
}

impl RateKey {
    /// Prefer the authenticated user; fall back to the peer address.
    pub fn resolve(caller: Option<&Caller>, peer: Option<&str>) -> Self {
        match (caller, peer) {
            (Some(caller), _) => Self::User(caller.user_id.as_str().to_owned()),
            (None, Some(peer)) => Self::Address(peer.to_owned()),
            (None, None) => Self::Address("unknown".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    refreshed: Instant,
}

/// Buckets held before idle ones are swept.
const SWEEP_THRESHOLD: usize = 50_000;

/// In-process token bucket limiter.
#[derive(Debug)]
pub struct RateLimiter {
    rules: HashMap<RateClass, RateRule>,
    buckets: Mutex<HashMap<(RateKey, RateClass), Bucket>>,
    enabled: bool,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateClass::ALL.map(|class| (class, class.default_rule())))
    }
}

impl RateLimiter {
    pub fn new(rules: impl IntoIterator<Item = (RateClass, RateRule)>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
            buckets: Mutex::new(HashMap::new()),
            enabled: true,
        }
    }

    /// Limiter that admits everything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(RateKey, RateClass), Bucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rule(&self, class: RateClass) -> RateRule {
        self.rules
            .get(&class)
            .copied()
            .unwrap_or_else(|| class.default_rule())
    }

    /// Take one token for `key` in `class`.
    pub fn check(&self, key: &RateKey, class: RateClass) -> Result<(), Error> {
        self.check_at(key, class, Instant::now())
    }

    pub(crate) fn check_at(&self, key: &RateKey, class: RateClass, now: Instant) -> Result<(), Error> {
        if !self.enabled {
            return Ok(());
        }
        let rule = self.rule(class);
        let capacity = f64::from(rule.capacity);
        let mut buckets = self.lock();
        if buckets.len() >= SWEEP_THRESHOLD {
            sweep(&mut buckets, now, |class| self.rule(class));
        }
        let bucket = buckets.entry((key.clone(), class)).or_insert(Bucket {
            tokens: capacity,
            refreshed: now,
        });
        let elapsed = now.saturating_duration_since(bucket.refreshed).as_secs_f64();
        bucket.tokens = (bucket.tokens + rule.refill(elapsed)).min(capacity);
        bucket.refreshed = now;
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }
        let retry_after = rule.wait_for(1.0 - bucket.tokens).ceil().max(1.0) as u64;
        tracing::debug!(?key, class = class.as_str(), retry_after, "rate limit hit");
        Err(Error::too_many_requests("Rate limit exceeded").with_details(json!({
            "class": class.as_str(),
            "retryAfterSeconds": retry_after,
        })))
    }
}

/// Drop buckets that have refilled completely; they carry no state.
fn sweep(
    buckets: &mut HashMap<(RateKey, RateClass), Bucket>,
    now: Instant,
    rule_for: impl Fn(RateClass) -> RateRule,
) {
    buckets.retain(|(_, class), bucket| {
        now.saturating_duration_since(bucket.refreshed) < rule_for(*class).window
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorCode, UserId};
    use rstest::{fixture, rstest};

    #[fixture]
    fn limiter() -> RateLimiter {
        RateLimiter::new([(RateClass::Destructive, RateRule::new(2, Duration::from_secs(60)))])
    }

    fn user(id: &str) -> RateKey {
        RateKey::User(id.to_owned())
    }

    #[rstest]
    fn bucket_empties_then_refills(limiter: RateLimiter) {
        let start = Instant::now();
        let key = user("alice");
        assert!(limiter.check_at(&key, RateClass::Destructive, start).is_ok());
        assert!(limiter.check_at(&key, RateClass::Destructive, start).is_ok());
        let err = limiter
            .check_at(&key, RateClass::Destructive, start)
            .expect_err("bucket is empty");
        assert_eq!(err.code(), ErrorCode::TooManyRequests);
        let details = err.details().expect("details");
        assert_eq!(details["class"], "destructive");
        assert_eq!(details["retryAfterSeconds"], 30);

        let later = start + Duration::from_secs(30);
        assert!(limiter.check_at(&key, RateClass::Destructive, later).is_ok());
    }

    #[rstest]
    fn identities_and_classes_are_independent(limiter: RateLimiter) {
        let now = Instant::now();
        for _ in 0..2 {
            limiter
                .check_at(&user("alice"), RateClass::Destructive, now)
                .expect("within limit");
        }
        assert!(limiter.check_at(&user("bob"), RateClass::Destructive, now).is_ok());
        assert!(limiter.check_at(&user("alice"), RateClass::Write, now).is_ok());
    }

    #[rstest]
    fn disabled_limiter_admits_everything() {
        let limiter = RateLimiter::disabled();
        let now = Instant::now();
        for _ in 0..100 {
            assert!(limiter.check_at(&user("x"), RateClass::AccountDelete, now).is_ok());
        }
    }

    #[rstest]
    fn key_prefers_user_over_address() {
        let caller = Caller::new(UserId::new("u1").expect("valid"), None);
        assert_eq!(
            RateKey::resolve(Some(&caller), Some("10.0.0.1")),
            RateKey::User("u1".to_owned())
        );
        assert_eq!(
            RateKey::resolve(None, Some("10.0.0.1")),
            RateKey::Address("10.0.0.1".to_owned())
        );
    }
}
