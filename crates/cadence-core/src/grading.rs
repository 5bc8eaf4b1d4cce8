//! Score-to-rating mapping.
//!
//! External graders (pronunciation diff, quiz answer comparison) emit a single
//! 0-100 percentage. This module turns it into a four-level [`Rating`].

use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, CadenceResult, ErrorCode};
use crate::types::Rating;

/// Lowest accepted score.
pub const MIN_SCORE: f64 = 0.0;

/// Highest accepted score.
pub const MAX_SCORE: f64 = 100.0;

/// Minimum score for each passing rating. Anything below `hard` is `Again`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingThresholds {
    pub easy: f64,
    pub good: f64,
    pub hard: f64,
}

impl Default for RatingThresholds {
    fn default() -> Self {
        Self {
            easy: 90.0,
            good: 75.0,
            hard: 60.0,
        }
    }
}

impl RatingThresholds {
    /// Thresholds must be finite, inside the score range and strictly ordered.
    pub fn validate(&self) -> CadenceResult<()> {
        for (field, value) in [("easy", self.easy), ("good", self.good), ("hard", self.hard)] {
            if !value.is_finite() {
                return Err(CadenceError::non_finite(field, value));
            }
            if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
                return Err(CadenceError::invalid_field(
                    field,
                    ErrorCode::ValOutOfRange,
                    format!("threshold {} is outside [0, 100]", value),
                ));
            }
        }
        if !(self.hard < self.good && self.good < self.easy) {
            return Err(CadenceError::invalid_field(
                "thresholds",
                ErrorCode::ValInvalidInput,
                format!(
                    "expected hard < good < easy, got {} / {} / {}",
                    self.hard, self.good, self.easy
                ),
            ));
        }
        Ok(())
    }
}

/// Maps grader scores to ratings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingMapper {
    thresholds: RatingThresholds,
}

impl RatingMapper {
    /// Create a mapper with custom thresholds.
    pub fn new(thresholds: RatingThresholds) -> CadenceResult<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    /// The thresholds this mapper was built with.
    pub fn thresholds(&self) -> &RatingThresholds {
        &self.thresholds
    }

    /// Map a score to a rating.
    ///
    /// Non-finite scores are rejected, never coerced to a default rating.
    /// Finite scores outside 0-100 are clamped first.
    pub fn map(&self, score: f64) -> CadenceResult<Rating> {
        if !score.is_finite() {
            return Err(CadenceError::non_finite("score", score));
        }
        Ok(self.rate(clamp_score(score)))
    }

    fn rate(&self, score: f64) -> Rating {
        if score >= self.thresholds.easy {
            Rating::Easy
        } else if score >= self.thresholds.good {
            Rating::Good
        } else if score >= self.thresholds.hard {
            Rating::Hard
        } else {
            Rating::Again
        }
    }
}

/// Clamp a finite score into 0-100. NaN maps to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        MIN_SCORE
    } else {
        score.clamp(MIN_SCORE, MAX_SCORE)
    }
}

/// Map a score with the default thresholds: >=90 Easy, >=75 Good, >=60 Hard, else Again.
///
/// Same contract as [`RatingMapper::map`]: NaN and infinities are rejected.
pub fn score_to_rating(score: f64) -> CadenceResult<Rating> {
    RatingMapper::default().map(score)
}
