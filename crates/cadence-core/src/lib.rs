//! cadence-core - Core library for cadence.
//!
//! Spaced repetition scheduling for lyric lines and quiz questions: an FSRS
//! memory model, a per-card scheduler, score-to-rating mapping, and a session
//! queue with a daily new-card cap.
//!
//! # Example
//!
//! ```
//! use cadence_core::{build_queue, init_card, score_to_rating, CardId, Scheduler};
//! use chrono::{DateTime, Utc};
//!
//! let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
//! let card = init_card(CardId::derive("Hello from the other side", 0), now);
//!
//! // Grader emitted 92%
//! let rating = score_to_rating(92.0)?;
//! let next = Scheduler::default().next_card_state(&card, rating, now);
//! assert_eq!(next.scheduled_days, 4.0);
//!
//! let session = build_queue(&[next], &[], now, 15);
//! assert!(session.is_empty());
//! # Ok::<(), cadence_core::CadenceError>(())
//! ```

pub mod cognitive;
pub mod config;
pub mod encoding;
pub mod error;
pub mod fsrs;
pub mod grading;
pub mod queue;
pub mod time;
pub mod types;

// Re-export commonly used types
pub use cognitive::{next_card_state, CardStore, RatingPreview, Scheduler, Snapshot};
pub use config::{CadenceConfig, QueueConfig};
pub use encoding::{
    decode_difficulty, decode_stability, encode_difficulty, encode_stability, CompactCard,
};
pub use error::{CadenceError, CadenceResult, ErrorCode};
pub use fsrs::FsrsParameters;
pub use grading::{clamp_score, score_to_rating, RatingMapper, RatingThresholds};
pub use queue::{build_queue, QueueBuilder, QueuePolicy, QueueStats, SessionQueue};
pub use time::day_start;
pub use types::{init_card, Card, CardId, CardState, Rating, ReviewEvent};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
