//! Claim window policy.
//!
//! Gates the daily claim on elapsed time since the previous claim. The
//! window is a pure comparison against an explicit `now`; it knows nothing
//! about streaks or calendar days (see [`crate::streak`] for those).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default interval between claims, in hours.
pub const DEFAULT_CLAIM_INTERVAL_HOURS: i64 = 24;

/// Whole hours and minutes until the next claim becomes available.
///
/// Both components are floored; zero when a claim is currently allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    pub hours: i64,
    pub minutes: i64,
}

impl std::fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}h {}m", self.hours, self.minutes)
    }
}

/// Outcome of evaluating the claim window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimDecision {
    pub allowed: bool,
    pub remaining: TimeRemaining,
}

impl ClaimDecision {
    fn allowed() -> Self {
        Self {
            allowed: true,
            remaining: TimeRemaining::default(),
        }
    }
}

/// Time-window gate over the last claim timestamp.
#[derive(Debug, Clone, Copy)]
pub struct ClaimWindow {
    interval: Duration,
}

impl ClaimWindow {
    /// Create a window with the given interval in hours.
    pub fn new(interval_hours: i64) -> Self {
        Self {
            interval: Duration::hours(interval_hours.max(0)),
        }
    }

    /// Decide whether a claim is allowed at `now`.
    ///
    /// A missing last claim always allows; an elapsed time of exactly the
    /// interval allows (`>=`, not `>`). A last claim in the future (clock
    /// skew) never allows, with remaining clamped to the full interval.
    pub fn evaluate(&self, last_claim: Option<DateTime<Utc>>, now: DateTime<Utc>) -> ClaimDecision {
        let Some(last) = last_claim else {
            return ClaimDecision::allowed();
        };

        let elapsed = now - last;
        if elapsed >= self.interval {
            return ClaimDecision::allowed();
        }

        let remaining = (self.interval - elapsed).min(self.interval);
        let secs = remaining.num_seconds();
        ClaimDecision {
            allowed: false,
            remaining: TimeRemaining {
                hours: secs / 3600,
                minutes: (secs % 3600) / 60,
            },
        }
    }
}

impl Default for ClaimWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CLAIM_INTERVAL_HOURS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_never_claimed_is_allowed() {
        let decision = ClaimWindow::default().evaluate(None, at_noon());
        assert!(decision.allowed);
        assert_eq!(decision.remaining, TimeRemaining::default());
    }

    #[test]
    fn test_exactly_interval_is_allowed() {
        let now = at_noon();
        let decision = ClaimWindow::default().evaluate(Some(now - Duration::hours(24)), now);
        assert!(decision.allowed);
    }

    #[test]
    fn test_one_minute_short_is_rejected() {
        let now = at_noon();
        let last = now - Duration::hours(23) - Duration::minutes(59);
        let decision = ClaimWindow::default().evaluate(Some(last), now);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, TimeRemaining { hours: 0, minutes: 1 });
    }

    #[test]
    fn test_remaining_floors_both_components() {
        let now = at_noon();
        // 5h 23m 45s elapsed -> 18h 36m 15s remaining -> reported as 18h 36m
        let last = now - Duration::seconds(5 * 3600 + 23 * 60 + 45);
        let decision = ClaimWindow::default().evaluate(Some(last), now);
        assert!(!decision.allowed);
        assert_eq!(
            decision.remaining,
            TimeRemaining {
                hours: 18,
                minutes: 36
            }
        );
    }

    #[test]
    fn test_future_last_claim_is_rejected_with_clamped_remaining() {
        let now = at_noon();
        let decision = ClaimWindow::default().evaluate(Some(now + Duration::hours(2)), now);
        assert!(!decision.allowed);
        assert_eq!(
            decision.remaining,
            TimeRemaining {
                hours: 24,
                minutes: 0
            }
        );
    }

    #[test]
    fn test_custom_interval() {
        let now = at_noon();
        let window = ClaimWindow::new(1);
        assert!(window.evaluate(Some(now - Duration::hours(1)), now).allowed);
        assert!(!window.evaluate(Some(now - Duration::minutes(59)), now).allowed);
    }

    proptest! {
        #[test]
        fn allowed_iff_elapsed_at_least_interval(elapsed_min in 0i64..4000) {
            let now = at_noon();
            let last = now - Duration::minutes(elapsed_min);
            let decision = ClaimWindow::default().evaluate(Some(last), now);
            prop_assert_eq!(decision.allowed, elapsed_min >= 24 * 60);
            if !decision.allowed {
                prop_assert!(decision.remaining.hours >= 0);
                prop_assert!(decision.remaining.hours < 24);
                prop_assert!((0..60).contains(&decision.remaining.minutes));
            }
        }
    }
}
