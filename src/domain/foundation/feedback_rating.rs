//! Feedback rating value object (1 to 5 stars).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Human rating of a generated snippet: 1 (poor) to 5 (excellent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FeedbackRating(u8);

impl FeedbackRating {
    /// Lowest accepted rating.
    pub const MIN: u8 = 1;

    /// Highest accepted rating.
    pub const MAX: u8 = 5;

    /// Creates a rating, returning error if outside 1..=5.
    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ValidationError::out_of_range(
                "rating",
                Self::MIN,
                Self::MAX,
                value,
            ));
        }
        Ok(Self(value))
    }

    /// Returns the numeric value.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Returns true for 4 and 5 star ratings.
    pub fn is_positive(&self) -> bool {
        self.0 >= 4
    }

    /// Returns true for 1 and 2 star ratings.
    pub fn is_negative(&self) -> bool {
        self.0 <= 2
    }
}

impl TryFrom<u8> for FeedbackRating {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FeedbackRating> for u8 {
    fn from(rating: FeedbackRating) -> Self {
        rating.0
    }
}

impl fmt::Display for FeedbackRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/5", self.0)
    }
}
