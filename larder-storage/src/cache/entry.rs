//! Cached value with its expiry.

use larder_core::{Count, Timestamp};
use std::time::Duration;

/// One cached count.
///
/// Valid iff `now < expires_at`; an expired entry is logically absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: Count,
    pub cached_at: Timestamp,
    pub expires_at: Timestamp,
}

impl CacheEntry {
    /// Entry cached at `cached_at`, living for `ttl`.
    pub fn new(value: Count, cached_at: Timestamp, ttl: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| cached_at.checked_add_signed(ttl))
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC);
        Self {
            value,
            cached_at,
            expires_at,
        }
    }

    pub fn is_valid(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }

    /// Time left before expiry, or `None` if already expired.
    pub fn remaining(&self, now: Timestamp) -> Option<Duration> {
        if now >= self.expires_at {
            None
        } else {
            (self.expires_at - now).to_std().ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_valid_within_ttl_only() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let entry = CacheEntry::new(7, t0, Duration::from_millis(1500));

        assert!(entry.is_valid(t0));
        assert!(entry.is_valid(t0 + chrono::Duration::milliseconds(1499)));
        assert!(!entry.is_valid(t0 + chrono::Duration::milliseconds(1500)));
        assert!(!entry.is_valid(t0 + chrono::Duration::milliseconds(1600)));
    }

    #[test]
    fn test_remaining() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let entry = CacheEntry::new(7, t0, Duration::from_secs(2));
        assert_eq!(entry.remaining(t0), Some(Duration::from_secs(2)));
        assert_eq!(entry.remaining(t0 + chrono::Duration::seconds(2)), None);
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let entry = CacheEntry::new(1, t0, Duration::MAX);
        assert_eq!(entry.expires_at, chrono::DateTime::<Utc>::MAX_UTC);
        assert!(entry.is_valid(t0));
    }
}
