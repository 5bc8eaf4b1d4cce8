//! Core types for cadence.

mod card;
mod rating;

pub use card::{init_card, Card, CardId, CardState, ReviewEvent, DEFAULT_DIFFICULTY};
pub use rating::Rating;
