//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The stored value
    pub value: Vec<u8>,
    /// Last successful read or write
    pub last_access: Instant,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
}

impl Entry {
    // == Constructor ==
    /// Creates a new entry accessed at `now`.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `now` - Creation instant
    /// * `expires_at` - Expiration instant; None means the entry never expires
    pub fn new(value: Vec<u8>, now: Instant, expires_at: Option<Instant>) -> Self {
        Self {
            value,
            last_access: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once the current time reaches its expiration
    /// instant, so an entry whose TTL has fully elapsed is never returned.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => expires <= now,
            None => false,
        }
    }

    // == Time To Live ==
    /// Remaining time to live at `now`; zero if the entry never expires
    /// or has already expired.
    pub fn ttl_remaining_at(&self, now: Instant) -> Duration {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
            .unwrap_or_default()
    }

    /// Size of the value in bytes.
    pub fn size(&self) -> i64 {
        self.value.len() as i64
    }
}

/// Converts a TTL into an absolute expiration instant.
///
/// Zero never expires, and neither does a TTL too large for the clock to
/// represent.
pub fn expires_at(now: Instant, ttl: Duration) -> Option<Instant> {
    if ttl.is_zero() {
        None
    } else {
        now.checked_add(ttl)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation_no_ttl() {
        let now = Instant::now();
        let entry = Entry::new(b"test_value".to_vec(), now, expires_at(now, Duration::ZERO));

        assert_eq!(entry.value, b"test_value");
        assert_eq!(entry.last_access, now);
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired_at(now + Duration::from_secs(3600)));
        assert_eq!(entry.size(), 10);
    }

    #[test]
    fn test_entry_expiration() {
        let now = Instant::now();
        let entry = Entry::new(b"v".to_vec(), now, expires_at(now, Duration::from_secs(1)));

        assert!(!entry.is_expired_at(now));
        assert!(!entry.is_expired_at(now + Duration::from_millis(999)));
        assert!(entry.is_expired_at(now + Duration::from_secs(1)));
        assert!(entry.is_expired_at(now + Duration::from_secs(2)));
    }

    #[test]
    fn test_ttl_remaining() {
        let now = Instant::now();
        let entry = Entry::new(b"v".to_vec(), now, expires_at(now, Duration::from_secs(10)));

        assert_eq!(entry.ttl_remaining_at(now), Duration::from_secs(10));
        assert_eq!(
            entry.ttl_remaining_at(now + Duration::from_secs(4)),
            Duration::from_secs(6)
        );
        assert_eq!(
            entry.ttl_remaining_at(now + Duration::from_secs(11)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_ttl_remaining_no_expiration() {
        let now = Instant::now();
        let entry = Entry::new(b"v".to_vec(), now, expires_at(now, Duration::ZERO));
        assert_eq!(entry.ttl_remaining_at(now), Duration::ZERO);
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let now = Instant::now();
        assert_eq!(expires_at(now, Duration::MAX), None);
        assert_eq!(expires_at(now, Duration::from_secs(u64::MAX)), None);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let entry = Entry {
            value: b"test".to_vec(),
            last_access: now,
            expires_at: Some(now), // Expires exactly at creation time
        };

        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
    }
}
