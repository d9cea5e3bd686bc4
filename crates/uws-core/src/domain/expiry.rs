//! Expiry policy: decides when a job record is destroyed.

use chrono::{DateTime, Duration, Utc};

/// Retention policy for job records.
///
/// Both limits are measured from `creation_time`. `max_expiry >= default_expiry`
/// is expected but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    /// Lifetime given to a freshly created job.
    pub default_expiry: Duration,

    /// Hard retention ceiling; no update can push destruction past it.
    pub max_expiry: Duration,
}

impl ExpiryPolicy {
    pub const DEFAULT_EXPIRY_SECS: i64 = 24 * 60 * 60;
    pub const MAX_EXPIRY_SECS: i64 = Self::DEFAULT_EXPIRY_SECS * 3;

    pub fn new(default_expiry: Duration, max_expiry: Duration) -> Self {
        Self {
            default_expiry,
            max_expiry,
        }
    }

    /// One day by default, three days at most.
    pub fn default_v1() -> Self {
        Self::new(
            Duration::seconds(Self::DEFAULT_EXPIRY_SECS),
            Duration::seconds(Self::MAX_EXPIRY_SECS),
        )
    }

    /// Destruction time of a job created at `creation_time`, never past `max_expiry`.
    pub fn initial_destruction(&self, creation_time: DateTime<Utc>) -> DateTime<Utc> {
        self.clamp(creation_time, offset(creation_time, self.default_expiry))
    }

    /// `min(requested, creation_time + max_expiry)`.
    pub fn clamp(&self, creation_time: DateTime<Utc>, requested: DateTime<Utc>) -> DateTime<Utc> {
        requested.min(offset(creation_time, self.max_expiry))
    }
}

fn offset(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    at.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::default_v1()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn default_policy_has_reasonable_values() {
        let policy = ExpiryPolicy::default_v1();
        assert_eq!(policy.default_expiry, Duration::days(1));
        assert_eq!(policy.max_expiry, Duration::days(3));
    }

    #[test]
    fn clamp_caps_at_max_expiry() {
        let policy = ExpiryPolicy::default_v1();
        let far = created() + Duration::days(365);

        assert_eq!(policy.clamp(created(), far), created() + Duration::days(3));
    }

    #[test]
    fn clamp_keeps_earlier_times() {
        let policy = ExpiryPolicy::default_v1();
        let soon = created() + Duration::hours(2);

        assert_eq!(policy.clamp(created(), soon), soon);
        assert_eq!(
            policy.initial_destruction(created()),
            created() + Duration::days(1)
        );
    }

    #[test]
    fn initial_destruction_obeys_smaller_max() {
        let policy = ExpiryPolicy::new(Duration::hours(2), Duration::hours(1));

        assert_eq!(
            policy.initial_destruction(created()),
            created() + Duration::hours(1)
        );
    }
}
