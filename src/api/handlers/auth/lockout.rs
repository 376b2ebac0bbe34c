//! Brute-force lockout: a per-user state machine over the failure counter
//! and lock-expiry columns.
//!
//! States: Open (failures below threshold) -> Locked (threshold reached,
//! `locked_until` set) -> Open again once the window elapses (lazy expiry,
//! no sweep). The lock check runs before any password hashing so a locked
//! account costs nothing to reject and cannot inflate its own counter.

/// Failure threshold and lock window. Both come from configuration, not
/// hardcoded constants.
#[derive(Clone, Copy, Debug)]
pub struct LockoutPolicy {
    pub threshold: i32,
    pub duration_seconds: i64,
}

impl LockoutPolicy {
    pub(crate) const DEFAULT_THRESHOLD: i32 = 5;
    pub(crate) const DEFAULT_DURATION_SECONDS: i64 = 15 * 60;
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            duration_seconds: Self::DEFAULT_DURATION_SECONDS,
        }
    }
}

/// Lockout state derived from a user row at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum LockoutStatus {
    Open,
    Locked { retry_after_seconds: i64 },
}

impl LockoutStatus {
    /// Derive the status from the SQL-computed `locked` flag and remaining
    /// seconds. An elapsed lock reads as Open; the counter only resets on
    /// the next successful login.
    pub(super) fn from_row(locked: bool, lock_remaining_seconds: i64) -> Self {
        if locked && lock_remaining_seconds > 0 {
            Self::Locked {
                retry_after_seconds: lock_remaining_seconds,
            }
        } else {
            Self::Open
        }
    }
}

/// Result of atomically recording a failed login.
#[derive(Clone, Copy, Debug)]
pub(super) struct FailureOutcome {
    pub(super) failed_logins: i32,
    pub(super) locked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_configuration_defaults() {
        let policy = LockoutPolicy::default();
        assert_eq!(policy.threshold, 5);
        assert_eq!(policy.duration_seconds, 900);
    }

    #[test]
    fn open_when_not_locked() {
        assert_eq!(LockoutStatus::from_row(false, 0), LockoutStatus::Open);
    }

    #[test]
    fn locked_while_window_active() {
        assert_eq!(
            LockoutStatus::from_row(true, 120),
            LockoutStatus::Locked {
                retry_after_seconds: 120
            }
        );
    }

    #[test]
    fn expired_lock_reads_as_open() {
        // Lazy expiry: the row may still carry a stale locked_until.
        assert_eq!(LockoutStatus::from_row(true, 0), LockoutStatus::Open);
        assert_eq!(LockoutStatus::from_row(false, 120), LockoutStatus::Open);
    }
}
