//! Time source and endpoint TTL policy.
//!
//! Expiry is evaluated lazily against a [`Clock`] at access time, so tests can
//! inject a [`ManualClock`] and move time forward without sleeping.

use std::{fmt::Debug, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Default endpoint lifetime: 24 hours.
pub const DEFAULT_TTL_SECONDS: i64 = 86_400;

pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Controllable clock for deterministic expiry tests.
///
/// Clones share the same instant, so a test can keep a handle while the store
/// owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    default_ttl_seconds: i64,
}

impl TtlPolicy {
    /// Non-positive defaults fall back to [`DEFAULT_TTL_SECONDS`].
    pub fn new(default_ttl_seconds: i64) -> Self {
        let default_ttl_seconds = if default_ttl_seconds > 0 {
            default_ttl_seconds
        } else {
            DEFAULT_TTL_SECONDS
        };
        Self { default_ttl_seconds }
    }

    pub fn default_ttl_seconds(&self) -> i64 {
        self.default_ttl_seconds
    }

    /// The caller's override wins only when it is positive.
    pub fn ttl_seconds(&self, requested: Option<i64>) -> i64 {
        match requested {
            Some(ttl) if ttl > 0 => ttl,
            _ => self.default_ttl_seconds,
        }
    }

    pub fn expires_at(&self, now: DateTime<Utc>, requested: Option<i64>) -> DateTime<Utc> {
        // Saturate instead of overflowing on absurd overrides.
        Duration::try_seconds(self.ttl_seconds(requested))
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECONDS)
    }
}

/// An instant equal to `expires_at` is still live.
pub fn is_expired(now: DateTime<Utc>, expires_at: DateTime<Utc>) -> bool {
    now > expires_at
}
