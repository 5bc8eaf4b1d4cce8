//! FSRS (Free Spaced Repetition Scheduler) memory model.
//!
//! Stateless formulas over an explicit [`FsrsParameters`] value.
//!
//! ## Core Formulas:
//! - Retrievability: R = (1 + FACTOR * t / S)^DECAY where DECAY = -0.5, FACTOR = 0.9^(1/DECAY) - 1
//! - Interval: t = S / FACTOR * (R^(1/DECAY) - 1)
//!
//! Reference: https://github.com/open-spaced-repetition/fsrs4anki

mod model;
mod parameters;

pub use model::{
    initial_difficulty,
    initial_stability,
    next_interval,
    next_interval_with_max,
    // Core functions
    retrievability,
    update_difficulty,
    update_stability_on_first_review,
    update_stability_on_review,
    // Constants
    DECAY,
    EASY_BONUS,
    FACTOR,
    MAX_DIFFICULTY,
    MAX_STABILITY,
    MIN_DIFFICULTY,
    MIN_STABILITY,
};

pub use parameters::{
    FsrsParameters, DEFAULT_RETENTION, DEFAULT_WEIGHTS, MAX_INTERVAL_DAYS, WEIGHT_COUNT,
};
