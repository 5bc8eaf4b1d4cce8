//! Scheduling and persistence.
//!
//! [`Scheduler`] applies the FSRS memory model to one card at a time;
//! [`CardStore`] persists cards and serializes reviews per card.

mod scheduler;
mod store;

pub use scheduler::{
    first_review_interval, next_card_state, RatingPreview, Scheduler, RELEARN_INTERVAL_DAYS,
};
pub use store::{CardStore, Snapshot};
