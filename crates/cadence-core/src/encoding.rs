//! Compact integer encoding for persistence adapters.
//!
//! Stability is stored as `round(stability * 100)` and difficulty as
//! `round(difficulty * 10)`, recoverable to within 0.01 and 0.1. Every adapter
//! (database column, on-chain struct, file) must use this exact pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, CadenceResult, ErrorCode};
use crate::types::{Card, CardId, CardState};

const STABILITY_SCALE: f64 = 100.0;
const DIFFICULTY_SCALE: f64 = 10.0;
const DAYS_SCALE: f64 = 100.0;

/// Stability in hundredths of a day.
pub fn encode_stability(stability: f64) -> u32 {
    (stability * STABILITY_SCALE).round() as u32
}

/// Inverse of [`encode_stability`].
pub fn decode_stability(encoded: u32) -> f64 {
    f64::from(encoded) / STABILITY_SCALE
}

/// Difficulty in tenths. Fits a byte for the whole 1-10 range.
pub fn encode_difficulty(difficulty: f64) -> u8 {
    (difficulty * DIFFICULTY_SCALE).round() as u8
}

/// Inverse of [`encode_difficulty`].
pub fn decode_difficulty(encoded: u8) -> f64 {
    f64::from(encoded) / DIFFICULTY_SCALE
}

/// Day counts (elapsed, scheduled) keep two decimals so the 0.1-day relearn
/// interval survives.
pub fn encode_days(days: f64) -> u32 {
    (days * DAYS_SCALE).round() as u32
}

/// Inverse of [`encode_days`].
pub fn decode_days(encoded: u32) -> f64 {
    f64::from(encoded) / DAYS_SCALE
}

/// All-integer card record.
///
/// Timestamps are whole unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactCard {
    pub id: CardId,
    pub due: i64,
    pub stability: u32,
    pub difficulty: u8,
    pub elapsed_days: u32,
    pub scheduled_days: u32,
    pub reps: u32,
    pub lapses: u32,
    pub state: u8,
    pub last_review: Option<i64>,
}

impl From<&Card> for CompactCard {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id.clone(),
            due: card.due.timestamp(),
            stability: encode_stability(card.stability),
            difficulty: encode_difficulty(card.difficulty),
            elapsed_days: encode_days(card.elapsed_days),
            scheduled_days: encode_days(card.scheduled_days),
            reps: card.reps,
            lapses: card.lapses,
            state: card.state.code(),
            last_review: card.last_review.map(|at| at.timestamp()),
        }
    }
}

impl TryFrom<CompactCard> for Card {
    type Error = CadenceError;

    /// Decode and validate. Fails on an unknown state code, an unrepresentable
    /// timestamp, or a decoded card that breaks a card invariant.
    fn try_from(compact: CompactCard) -> Result<Self, Self::Error> {
        let state = CardState::from_code(compact.state).ok_or_else(|| {
            CadenceError::invalid_field(
                "state",
                ErrorCode::ValInvalidInput,
                format!("unknown state code {}", compact.state),
            )
        })?;

        let card = Card {
            id: compact.id,
            due: timestamp("due", compact.due)?,
            stability: decode_stability(compact.stability),
            difficulty: decode_difficulty(compact.difficulty),
            elapsed_days: decode_days(compact.elapsed_days),
            scheduled_days: decode_days(compact.scheduled_days),
            reps: compact.reps,
            lapses: compact.lapses,
            state,
            last_review: compact
                .last_review
                .map(|secs| timestamp("last_review", secs))
                .transpose()?,
        };

        card.validate()?;
        Ok(card)
    }
}

fn timestamp(field: &str, secs: i64) -> CadenceResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| {
        CadenceError::invalid_field(
            field,
            ErrorCode::ValOutOfRange,
            format!("{} is not a representable timestamp", secs),
        )
    })
}
