//! FSRS parameter set.

use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, CadenceResult, ErrorCode};

/// Number of weights in the FSRS parameter vector.
pub const WEIGHT_COUNT: usize = 17;

/// Default weight vector.
pub const DEFAULT_WEIGHTS: [f64; WEIGHT_COUNT] = [
    0.4, 0.6, 2.4, 5.8, // w0-w3: initial stability per rating
    4.93, 0.94, 0.86, 0.01, // w4-w7: difficulty
    1.49, 0.14, // w8-w9: first-review stability growth
    0.94, 2.18, 0.05, 0.34, // w10-w13: lapse stability
    1.26, 0.29, 2.61, // w14-w16: success stability
];

/// Default target probability of recall at the scheduled review.
pub const DEFAULT_RETENTION: f64 = 0.9;

/// Longest interval the scheduler will choose, in days (100 years).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Immutable FSRS parameters.
///
/// Injected once into a [`Scheduler`](crate::Scheduler) so alternate parameter
/// sets (per-cohort tuning) can coexist without code changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsrsParameters {
    /// Model weights w0..w16.
    pub weights: [f64; WEIGHT_COUNT],
    /// Target recall probability used to derive intervals.
    pub desired_retention: f64,
    /// Upper bound on scheduled intervals, in days.
    pub maximum_interval: u32,
}

impl Default for FsrsParameters {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS,
            desired_retention: DEFAULT_RETENTION,
            maximum_interval: MAX_INTERVAL_DAYS,
        }
    }
}

impl FsrsParameters {
    /// Parameters with a custom weight vector and default retention.
    pub fn with_weights(weights: [f64; WEIGHT_COUNT]) -> Self {
        Self {
            weights,
            ..Default::default()
        }
    }

    /// Override the desired retention.
    pub fn with_desired_retention(mut self, retention: f64) -> Self {
        self.desired_retention = retention;
        self
    }

    /// Override the maximum interval.
    pub fn with_maximum_interval(mut self, days: u32) -> Self {
        self.maximum_interval = days;
        self
    }

    /// Weight `w[i]`.
    #[inline]
    pub fn w(&self, i: usize) -> f64 {
        self.weights[i]
    }

    /// Reject parameter sets that could produce non-finite card state.
    pub fn validate(&self) -> CadenceResult<()> {
        for (i, w) in self.weights.iter().enumerate() {
            if !w.is_finite() {
                return Err(CadenceError::non_finite(&format!("weights[{}]", i), *w));
            }
        }
        if !self.desired_retention.is_finite()
            || self.desired_retention <= 0.0
            || self.desired_retention >= 1.0
        {
            return Err(CadenceError::invalid_field(
                "desired_retention",
                ErrorCode::ValOutOfRange,
                format!("{} is outside (0, 1)", self.desired_retention),
            ));
        }
        if self.maximum_interval < 1 || self.maximum_interval > MAX_INTERVAL_DAYS {
            return Err(CadenceError::invalid_field(
                "maximum_interval",
                ErrorCode::ValOutOfRange,
                format!("{} is outside [1, {}]", self.maximum_interval, MAX_INTERVAL_DAYS),
            ));
        }
        Ok(())
    }
}
