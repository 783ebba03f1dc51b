//! Membership tier classification.
//!
//! A user's level is derived solely from their cumulative point total and is
//! recomputed on every write, so `record.level == Tier::for_points(total)`
//! holds after any mutation.

use serde::{Deserialize, Serialize};

/// Membership tier, ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

/// Tier boundaries as inclusive lower bounds, highest first.
const THRESHOLDS: &[(Tier, u64)] = &[
    (Tier::Diamond, 10_000),
    (Tier::Platinum, 5_000),
    (Tier::Gold, 2_500),
    (Tier::Silver, 1_000),
    (Tier::Bronze, 0),
];

impl Tier {
    /// Classify a cumulative point total into a tier.
    pub fn for_points(total: u64) -> Tier {
        THRESHOLDS
            .iter()
            .find(|(_, min)| total >= *min)
            .map(|(tier, _)| *tier)
            .unwrap_or(Tier::Bronze)
    }

    /// Inclusive lower bound of this tier.
    pub fn threshold(self) -> u64 {
        match self {
            Tier::Bronze => 0,
            Tier::Silver => 1_000,
            Tier::Gold => 2_500,
            Tier::Platinum => 5_000,
            Tier::Diamond => 10_000,
        }
    }

    /// Next tier up, if any.
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Bronze => Some(Tier::Silver),
            Tier::Silver => Some(Tier::Gold),
            Tier::Gold => Some(Tier::Platinum),
            Tier::Platinum => Some(Tier::Diamond),
            Tier::Diamond => None,
        }
    }

    /// Points still needed to reach the next tier (None at Diamond).
    pub fn points_to_next(total: u64) -> Option<u64> {
        Tier::for_points(total)
            .next()
            .map(|next| next.threshold() - total)
    }

    /// Stable lowercase name used for storage and display.
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
            Tier::Diamond => "diamond",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(Tier::for_points(0), Tier::Bronze);
        assert_eq!(Tier::for_points(999), Tier::Bronze);
        assert_eq!(Tier::for_points(1_000), Tier::Silver);
        assert_eq!(Tier::for_points(2_499), Tier::Silver);
        assert_eq!(Tier::for_points(2_500), Tier::Gold);
        assert_eq!(Tier::for_points(4_999), Tier::Gold);
        assert_eq!(Tier::for_points(5_000), Tier::Platinum);
        assert_eq!(Tier::for_points(9_999), Tier::Platinum);
        assert_eq!(Tier::for_points(10_000), Tier::Diamond);
        assert_eq!(Tier::for_points(1_000_000), Tier::Diamond);
    }

    #[test]
    fn test_points_to_next() {
        assert_eq!(Tier::points_to_next(0), Some(1_000));
        assert_eq!(Tier::points_to_next(999), Some(1));
        assert_eq!(Tier::points_to_next(1_000), Some(1_500));
        assert_eq!(Tier::points_to_next(9_999), Some(1));
        assert_eq!(Tier::points_to_next(10_000), None);
    }

    #[test]
    fn test_tier_names_round_trip() {
        for tier in [
            Tier::Bronze,
            Tier::Silver,
            Tier::Gold,
            Tier::Platinum,
            Tier::Diamond,
        ] {
            let json = serde_json::to_string(&tier).unwrap();
            assert_eq!(json, format!("\"{}\"", tier.as_str()));
            let back: Tier = serde_json::from_str(&json).unwrap();
            assert_eq!(back, tier);
        }
    }

    proptest! {
        #[test]
        fn classification_is_monotone(a in 0u64..30_000, b in 0u64..30_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(Tier::for_points(lo) <= Tier::for_points(hi));
        }

        #[test]
        fn classification_agrees_with_thresholds(points in 0u64..30_000) {
            let tier = Tier::for_points(points);
            prop_assert!(points >= tier.threshold());
            if let Some(next) = tier.next() {
                prop_assert!(points < next.threshold());
            }
        }
    }
}
