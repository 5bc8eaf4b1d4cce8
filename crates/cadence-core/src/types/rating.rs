//! Review ratings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CadenceError;

/// Learner's graded outcome for one review.
///
/// - Again (1): Failed recall
/// - Hard (2): Successful but difficult recall
/// - Good (3): Normal successful recall
/// - Easy (4): Effortless recall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Rating {
    /// Failed recall.
    Again = 1,
    /// Successful but difficult recall.
    Hard = 2,
    /// Normal successful recall.
    Good = 3,
    /// Effortless recall.
    Easy = 4,
}

impl Rating {
    /// All ratings, worst to best.
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// Zero-based ordinal (Again = 0 .. Easy = 3), used to index the weight vector.
    pub fn ordinal(self) -> usize {
        self as usize - 1
    }

    /// One-based rating value (Again = 1 .. Easy = 4).
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Create from a one-based rating value.
    ///
    /// Returns None for values outside 1-4.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Rating::Again),
            2 => Some(Rating::Hard),
            3 => Some(Rating::Good),
            4 => Some(Rating::Easy),
            _ => None,
        }
    }

    /// Whether this rating counts as a failed recall.
    pub fn is_failure(self) -> bool {
        self == Rating::Again
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.value()
    }
}

impl TryFrom<u8> for Rating {
    type Error = CadenceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::from_value(value).ok_or_else(|| CadenceError::invalid_rating(value))
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "again" | "1" => Ok(Rating::Again),
            "hard" | "2" => Ok(Rating::Hard),
            "good" | "3" => Ok(Rating::Good),
            "easy" | "4" => Ok(Rating::Easy),
            _ => Err(CadenceError::invalid_rating(s)),
        }
    }
}
