//! Quality score value object (0-100 scale).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Heuristic health metric for a snippet, always between 0 and 100 inclusive.
///
/// A score only moves downwards: the sole mutation is [`QualityScore::penalize`],
/// which saturates at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualityScore(u8);

impl QualityScore {
    /// Lowest possible score.
    pub const MIN: Self = Self(0);

    /// Starting score before any finding is applied.
    pub const MAX: Self = Self(100);

    /// Creates a score, clamping to the valid range.
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    /// Creates a score, returning error if out of range.
    pub fn try_new(value: u8) -> Result<Self, ValidationError> {
        if value > 100 {
            return Err(ValidationError::out_of_range("quality_score", 0, 100, value));
        }
        Ok(Self(value))
    }

    /// Returns a new score lowered by `weight`, floored at zero.
    #[must_use]
    pub fn penalize(self, weight: u32) -> Self {
        let lowered = u32::from(self.0).saturating_sub(weight);
        Self(lowered as u8)
    }

    /// Returns the value as u8.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for QualityScore {
    fn default() -> Self {
        Self::MAX
    }
}

impl fmt::Display for QualityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/100", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn quality_score_new_clamps_to_100() {
        assert_eq!(QualityScore::new(101).value(), 100);
        assert_eq!(QualityScore::new(255).value(), 100);
        assert_eq!(QualityScore::new(42).value(), 42);
    }

    #[test]
    fn quality_score_try_new_rejects_over_100() {
        match QualityScore::try_new(101) {
            Err(ValidationError::OutOfRange { field, actual, .. }) => {
                assert_eq!(field, "quality_score");
                assert_eq!(actual, 101.0);
            }
            other => panic!("Expected OutOfRange error, got {:?}", other),
        }
    }

    #[test]
    fn quality_score_default_is_max() {
        assert_eq!(QualityScore::default(), QualityScore::MAX);
    }

    #[test]
    fn penalize_floors_at_zero() {
        assert_eq!(QualityScore::MAX.penalize(7).value(), 93);
        assert_eq!(QualityScore::new(5).penalize(10), QualityScore::MIN);
        assert_eq!(QualityScore::MAX.penalize(u32::MAX), QualityScore::MIN);
    }

    #[test]
    fn quality_score_displays_out_of_100() {
        assert_eq!(format!("{}", QualityScore::new(75)), "75/100");
    }

    #[test]
    fn quality_score_serializes_as_number() {
        let json = serde_json::to_string(&QualityScore::new(42)).unwrap();
        assert_eq!(json, "42");
    }

    proptest! {
        #[test]
        fn penalties_never_leave_range_or_increase(weights in proptest::collection::vec(0u32..50, 0..40)) {
            let mut score = QualityScore::MAX;
            for weight in weights {
                let next = score.penalize(weight);
                prop_assert!(next <= score);
                prop_assert!(next.value() <= 100);
                score = next;
            }
        }
    }
}
