//! Card memory state and review events.
//!
//! A [`Card`] is one learnable unit (a lyric line or a quiz question) together
//! with its FSRS memory state. Cards are plain values: the scheduler consumes
//! one and returns the next, it never mutates shared state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

use crate::error::{CadenceError, CadenceResult, ErrorCode};
use crate::fsrs::{MAX_DIFFICULTY, MIN_DIFFICULTY, MIN_STABILITY};
use crate::types::Rating;

/// Difficulty assigned to a card that has never been reviewed.
pub const DEFAULT_DIFFICULTY: f64 = 5.0;

/// Stable card identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an identifier from card content and its position in the source.
    ///
    /// The same content at the same position always yields the same id, so
    /// re-importing a song or quiz is idempotent.
    pub fn derive(content: &str, position: usize) -> Self {
        let data = format!("{}:{}", position, content.trim());
        Self(format!("{:x}", md5::compute(data.as_bytes())))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CardId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Card state in the review lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CardState {
    /// Never reviewed.
    #[default]
    New,
    /// Short-term learning. Never assigned by the scheduler; kept so stored
    /// cards from other schedulers still sort correctly.
    Learning,
    /// Regular review.
    Review,
    /// Failed a review, waiting for a short relearning interval.
    Relearning,
}

impl CardState {
    /// Integer code used by compact encodings.
    pub fn code(self) -> u8 {
        match self {
            CardState::New => 0,
            CardState::Learning => 1,
            CardState::Review => 2,
            CardState::Relearning => 3,
        }
    }

    /// Inverse of [`CardState::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CardState::New),
            1 => Some(CardState::Learning),
            2 => Some(CardState::Review),
            3 => Some(CardState::Relearning),
            _ => None,
        }
    }

    /// Session ordering priority at equal due time (lower is presented first).
    pub fn queue_priority(self) -> u8 {
        match self {
            CardState::Review => 0,
            CardState::Learning => 1,
            CardState::Relearning => 2,
            CardState::New => 3,
        }
    }
}

/// One learnable unit's memory state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Stable identifier.
    pub id: CardId,
    /// The card must not be presented before this instant.
    pub due: DateTime<Utc>,
    /// Days for recall probability to decay to the target retention.
    pub stability: f64,
    /// Intrinsic hardness, 1.0-10.0 (higher = harder).
    pub difficulty: f64,
    /// Days since the previous review, as of the review that produced this value.
    pub elapsed_days: f64,
    /// Interval chosen by the most recent scheduling decision, in days.
    pub scheduled_days: f64,
    /// Total reviews applied.
    pub reps: u32,
    /// Failed reviews.
    pub lapses: u32,
    /// Lifecycle state.
    pub state: CardState,
    /// Last review timestamp, absent for new cards.
    pub last_review: Option<DateTime<Utc>>,
}

impl Card {
    /// Create a never-reviewed card, due immediately.
    ///
    /// Stability is 0.0 (no memory formed), difficulty is 5.0 (medium).
    pub fn new(id: CardId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            due: now,
            stability: 0.0,
            difficulty: DEFAULT_DIFFICULTY,
            elapsed_days: 0.0,
            scheduled_days: 0.0,
            reps: 0,
            lapses: 0,
            state: CardState::New,
            last_review: None,
        }
    }

    /// Whether the card has never been reviewed.
    pub fn is_new(&self) -> bool {
        self.state == CardState::New
    }

    /// Whether the card may be presented at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }

    /// Check every card invariant.
    ///
    /// New cards carry stability 0.0; every reviewed card must have
    /// stability >= 0.01. Difficulty stays within 1-10 and every float is finite.
    pub fn validate(&self) -> CadenceResult<()> {
        if self.id.as_str().is_empty() {
            return Err(CadenceError::invalid_field(
                "id",
                ErrorCode::ValInvalidInput,
                "card id must not be empty",
            ));
        }

        for (field, value) in [
            ("stability", self.stability),
            ("difficulty", self.difficulty),
            ("elapsed_days", self.elapsed_days),
            ("scheduled_days", self.scheduled_days),
        ] {
            if !value.is_finite() {
                return Err(CadenceError::non_finite(field, value));
            }
        }

        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.difficulty) {
            return Err(CadenceError::invalid_field(
                "difficulty",
                ErrorCode::ValOutOfRange,
                format!("{} is outside [{}, {}]", self.difficulty, MIN_DIFFICULTY, MAX_DIFFICULTY),
            ));
        }

        let is_new = self.state == CardState::New;
        if is_new != (self.reps == 0) || is_new != self.last_review.is_none() {
            return Err(CadenceError::invalid_field(
                "state",
                ErrorCode::ValInconsistentState,
                format!(
                    "state {} with reps={} and last_review {}",
                    self.state,
                    self.reps,
                    if self.last_review.is_some() { "set" } else { "absent" }
                ),
            ));
        }

        if is_new {
            if self.stability < 0.0 {
                return Err(CadenceError::invalid_field(
                    "stability",
                    ErrorCode::ValOutOfRange,
                    format!("{} is negative", self.stability),
                ));
            }
        } else if self.stability < MIN_STABILITY {
            return Err(CadenceError::invalid_field(
                "stability",
                ErrorCode::ValOutOfRange,
                format!("{} is below {}", self.stability, MIN_STABILITY),
            ));
        }

        if self.lapses > self.reps {
            return Err(CadenceError::invalid_field(
                "lapses",
                ErrorCode::ValInconsistentState,
                format!("{} lapses exceed {} reps", self.lapses, self.reps),
            ));
        }

        Ok(())
    }
}

/// Create a never-reviewed card. Callers substitute this for cards they cannot find.
pub fn init_card(id: CardId, now: DateTime<Utc>) -> Card {
    Card::new(id, now)
}

/// One graded attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEvent {
    /// Reviewed card.
    pub card_id: CardId,
    /// Graded outcome.
    pub rating: Rating,
    /// When the attempt was graded.
    pub timestamp: DateTime<Utc>,
}

impl ReviewEvent {
    /// Create a review event.
    pub fn new(card_id: CardId, rating: Rating, timestamp: DateTime<Utc>) -> Self {
        Self {
            card_id,
            rating,
            timestamp,
        }
    }
}
