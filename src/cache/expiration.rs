// src/cache/expiration.rs
use crate::types::ScanRecord;
use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Decides whether a stored scan may still be served from the cache.
///
/// Every record carries `cache_expires_at` from the moment it is written,
/// so validity is a single comparison against the clock.
#[derive(Debug, Clone, Copy)]
pub struct ExpirationPolicy {
    ttl: Duration,
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self::from_days(DEFAULT_TTL_DAYS)
    }
}

impl ExpirationPolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn from_days(days: i64) -> Self {
        Self::new(Duration::days(days))
    }

    /// Lifetime of a new scan, counted from its `created_at`.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_valid_at(&self, record: &ScanRecord, now: DateTime<Utc>) -> bool {
        now < record.cache_expires_at
    }
}
