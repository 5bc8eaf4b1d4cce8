//! Card scheduler.
//!
//! Turns one card and one rating into the next card value using the FSRS
//! memory model. The first review out of `New` uses a fixed interval ladder
//! (0.1 / 1 / 2 / 4 days); every later review uses the general formula.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CadenceError, CadenceResult, ErrorCode};
use crate::fsrs::{self, FsrsParameters};
use crate::time::{add_days, days_between};
use crate::types::{init_card, Card, CardState, Rating, ReviewEvent};

/// Interval after a failed review, in days (2.4 hours).
pub const RELEARN_INTERVAL_DAYS: f64 = 0.1;

/// Fixed interval for the first review of a new card, in days.
pub fn first_review_interval(rating: Rating) -> f64 {
    match rating {
        Rating::Again => RELEARN_INTERVAL_DAYS,
        Rating::Hard => 1.0,
        Rating::Good => 2.0,
        Rating::Easy => 4.0,
    }
}

/// FSRS scheduler bound to one immutable parameter set.
///
/// Every method is a pure function of its arguments: the same card, rating and
/// instant always produce a bit-identical result.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    params: FsrsParameters,
}

impl Scheduler {
    /// Create a scheduler with the default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scheduler with custom parameters.
    ///
    /// Rejects parameter sets that could produce non-finite card state.
    pub fn with_params(params: FsrsParameters) -> CadenceResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The parameters this scheduler was built with.
    pub fn params(&self) -> &FsrsParameters {
        &self.params
    }

    /// Probability that the card is recalled at `now`.
    ///
    /// New cards have no memory to decay and report 1.0.
    pub fn current_retrievability(&self, card: &Card, now: DateTime<Utc>) -> f64 {
        match (card.state, card.last_review) {
            (CardState::New, _) | (_, None) => 1.0,
            (_, Some(last_review)) => {
                fsrs::retrievability(days_between(last_review, now), card.stability)
            }
        }
    }

    /// Compute the card state that follows reviewing `card` with `rating` at `now`.
    ///
    /// Total over valid cards: there is no failure path.
    pub fn next_card_state(&self, card: &Card, rating: Rating, now: DateTime<Utc>) -> Card {
        let next = if card.state == CardState::New {
            self.first_review(card, rating, now)
        } else {
            self.subsequent_review(card, rating, now)
        };

        debug!(
            card_id = %next.id,
            rating = %rating,
            from = %card.state,
            to = %next.state,
            stability = next.stability,
            difficulty = next.difficulty,
            scheduled_days = next.scheduled_days,
            "Scheduled card"
        );

        next
    }

    fn first_review(&self, card: &Card, rating: Rating, now: DateTime<Utc>) -> Card {
        let scheduled_days = first_review_interval(rating);

        Card {
            id: card.id.clone(),
            due: add_days(now, scheduled_days),
            stability: fsrs::initial_stability(&self.params, rating),
            difficulty: fsrs::initial_difficulty(&self.params, rating),
            elapsed_days: 0.0,
            scheduled_days,
            reps: card.reps + 1,
            lapses: if rating.is_failure() {
                card.lapses + 1
            } else {
                card.lapses
            },
            state: CardState::Review,
            last_review: Some(now),
        }
    }

    fn subsequent_review(&self, card: &Card, rating: Rating, now: DateTime<Utc>) -> Card {
        // Clock skew must not turn into negative elapsed time.
        let elapsed_days = card
            .last_review
            .map(|last| days_between(last, now).max(0.0))
            .unwrap_or(0.0);
        let retrievability = fsrs::retrievability(elapsed_days, card.stability);

        let stability = fsrs::update_stability_on_review(
            &self.params,
            card.stability,
            card.difficulty,
            retrievability,
            rating,
        );
        let difficulty = fsrs::update_difficulty(&self.params, card.difficulty, rating);

        let (state, scheduled_days, lapses) = if rating.is_failure() {
            (CardState::Relearning, RELEARN_INTERVAL_DAYS, card.lapses + 1)
        } else {
            let interval = fsrs::next_interval_with_max(
                stability,
                self.params.desired_retention,
                self.params.maximum_interval,
            );
            (CardState::Review, f64::from(interval), card.lapses)
        };

        Card {
            id: card.id.clone(),
            due: add_days(now, scheduled_days),
            stability,
            difficulty,
            elapsed_days,
            scheduled_days,
            reps: card.reps + 1,
            lapses,
            state,
            last_review: Some(now),
        }
    }

    /// Apply a review event at the public boundary.
    ///
    /// A missing card is replaced by a new one (recoverable). A supplied card is
    /// validated and must carry the event's card id.
    pub fn apply_review(&self, card: Option<Card>, event: &ReviewEvent) -> CadenceResult<Card> {
        let card = match card {
            Some(card) => {
                if card.id != event.card_id {
                    return Err(CadenceError::Validation {
                        message: format!(
                            "review for '{}' applied to card '{}'",
                            event.card_id, card.id
                        ),
                        code: ErrorCode::CardMismatch,
                        field: Some("card_id".to_string()),
                        suggestion: None,
                    });
                }
                card.validate()?;
                card
            }
            None => {
                debug!(card_id = %event.card_id, "Card missing, starting from a new card");
                init_card(event.card_id.clone(), event.timestamp)
            }
        };

        Ok(self.next_card_state(&card, event.rating, event.timestamp))
    }

    /// Candidate next states for every rating, without committing any of them.
    pub fn preview(&self, card: &Card, now: DateTime<Utc>) -> RatingPreview {
        RatingPreview {
            again: self.next_card_state(card, Rating::Again, now),
            hard: self.next_card_state(card, Rating::Hard, now),
            good: self.next_card_state(card, Rating::Good, now),
            easy: self.next_card_state(card, Rating::Easy, now),
        }
    }
}

/// Next card state for each possible rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingPreview {
    pub again: Card,
    pub hard: Card,
    pub good: Card,
    pub easy: Card,
}

impl RatingPreview {
    /// The outcome for one rating.
    pub fn get(&self, rating: Rating) -> &Card {
        match rating {
            Rating::Again => &self.again,
            Rating::Hard => &self.hard,
            Rating::Good => &self.good,
            Rating::Easy => &self.easy,
        }
    }

    /// Outcomes paired with their rating, worst to best.
    pub fn iter(&self) -> impl Iterator<Item = (Rating, &Card)> {
        Rating::ALL.into_iter().map(move |rating| (rating, self.get(rating)))
    }
}

/// [`Scheduler::next_card_state`] with the default parameters.
pub fn next_card_state(card: &Card, rating: Rating, now: DateTime<Utc>) -> Card {
    Scheduler::new().next_card_state(card, rating, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsrs::{MIN_STABILITY, WEIGHT_COUNT};
    use crate::types::CardId;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn new_card() -> Card {
        init_card(CardId::new("line-1"), t0())
    }

    fn review_card(stability: f64, difficulty: f64, last_review: DateTime<Utc>) -> Card {
        Card {
            id: CardId::new("line-1"),
            due: last_review + Duration::days(stability.round() as i64),
            stability,
            difficulty,
            elapsed_days: 0.0,
            scheduled_days: stability.round(),
            reps: 3,
            lapses: 0,
            state: CardState::Review,
            last_review: Some(last_review),
        }
    }

    #[test]
    fn test_first_review_again_due_in_tenth_of_day() {
        let scheduler = Scheduler::new();
        let next = scheduler.next_card_state(&new_card(), Rating::Again, t0());

        assert_eq!(next.due.timestamp() - t0().timestamp(), 8_640);
        assert_eq!(next.scheduled_days, 0.1);
        assert_eq!(next.lapses, 1);
        assert_eq!(next.state, CardState::Review);
        assert_eq!(next.stability, 0.4);
    }

    #[test]
    fn test_first_review_fixed_ladder() {
        let scheduler = Scheduler::new();
        for (rating, days, seconds) in [
            (Rating::Hard, 1.0, 86_400),
            (Rating::Good, 2.0, 172_800),
            (Rating::Easy, 4.0, 345_600),
        ] {
            let next = scheduler.next_card_state(&new_card(), rating, t0());
            assert_eq!(next.scheduled_days, days);
            assert_eq!(next.due.timestamp() - t0().timestamp(), seconds);
            assert_eq!(next.lapses, 0);
            assert_eq!(next.state, CardState::Review);
            assert_eq!(next.stability, fsrs::initial_stability(scheduler.params(), rating));
            assert_eq!(next.difficulty, fsrs::initial_difficulty(scheduler.params(), rating));
        }
    }

    #[test]
    fn test_first_review_bookkeeping() {
        let next = next_card_state(&new_card(), Rating::Good, t0());
        assert_eq!(next.reps, 1);
        assert_eq!(next.last_review, Some(t0()));
        assert_eq!(next.elapsed_days, 0.0);
        assert!(next.validate().is_ok());
    }

    #[test]
    fn test_again_on_review_card_is_lapse() {
        let scheduler = Scheduler::new();
        let card = review_card(10.0, 5.0, t0() - Duration::days(10));
        let next = scheduler.next_card_state(&card, Rating::Again, t0());

        assert_eq!(next.lapses, 1);
        assert_eq!(next.state, CardState::Relearning);
        assert_eq!(next.scheduled_days, RELEARN_INTERVAL_DAYS);
        assert_eq!(next.due.timestamp() - t0().timestamp(), 8_640);
        assert!(next.stability < card.stability);
        assert!(next.difficulty > card.difficulty);
    }

    #[test]
    fn test_good_on_review_card_uses_formula() {
        let scheduler = Scheduler::new();
        let card = review_card(10.0, 5.0, t0() - Duration::days(10));
        let next = scheduler.next_card_state(&card, Rating::Good, t0());

        assert_eq!(next.state, CardState::Review);
        assert!((next.elapsed_days - 10.0).abs() < 1e-9);
        assert!(next.stability > card.stability);
        let expected_days = fsrs::next_interval(next.stability, 0.9) as f64;
        assert_eq!(next.scheduled_days, expected_days);
        assert_eq!(
            next.due.timestamp() - t0().timestamp(),
            (expected_days * 86_400.0) as i64
        );
        assert_eq!(next.reps, card.reps + 1);
        assert_eq!(next.lapses, 0);
    }

    #[test]
    fn test_relearning_card_recovers_to_review() {
        let scheduler = Scheduler::new();
        let card = review_card(10.0, 5.0, t0() - Duration::days(10));
        let lapsed = scheduler.next_card_state(&card, Rating::Again, t0());
        let later = t0() + Duration::hours(3);
        let recovered = scheduler.next_card_state(&lapsed, Rating::Good, later);

        assert_eq!(recovered.state, CardState::Review);
        assert_eq!(recovered.lapses, 1);
        assert!(recovered.scheduled_days >= 1.0);
    }

    #[test]
    fn test_clock_skew_counts_as_zero_elapsed() {
        let scheduler = Scheduler::new();
        let card = review_card(10.0, 5.0, t0() + Duration::days(1));
        let next = scheduler.next_card_state(&card, Rating::Good, t0());
        assert_eq!(next.elapsed_days, 0.0);
        assert!(next.validate().is_ok());
    }

    #[test]
    fn test_review_near_end_of_time_saturates_due() {
        let scheduler = Scheduler::new();
        let now = DateTime::<Utc>::MAX_UTC - Duration::days(1);

        let first =
            scheduler.next_card_state(&init_card(CardId::new("late"), now), Rating::Easy, now);
        assert_eq!(first.due, DateTime::<Utc>::MAX_UTC);
        assert!(first.validate().is_ok());

        let card = review_card(300.0, 5.0, now - Duration::days(300));
        let next = scheduler.next_card_state(&card, Rating::Good, now);
        assert_eq!(next.due, DateTime::<Utc>::MAX_UTC);
        assert!(next.scheduled_days > 1.0);
    }

    #[test]
    fn test_next_card_state_is_deterministic() {
        let scheduler = Scheduler::new();
        let card = review_card(7.3, 6.1, t0() - Duration::hours(200));
        for rating in Rating::ALL {
            let a = scheduler.next_card_state(&card, rating, t0());
            let b = scheduler.next_card_state(&card, rating, t0());
            assert_eq!(a, b);
            assert_eq!(a.stability.to_bits(), b.stability.to_bits());
            assert_eq!(a.difficulty.to_bits(), b.difficulty.to_bits());
        }
    }

    #[test]
    fn test_input_card_is_not_mutated() {
        let card = review_card(10.0, 5.0, t0() - Duration::days(3));
        let before = card.clone();
        let _ = next_card_state(&card, Rating::Easy, t0());
        assert_eq!(card, before);
    }

    #[test]
    fn test_current_retrievability() {
        let scheduler = Scheduler::new();
        assert_eq!(scheduler.current_retrievability(&new_card(), t0()), 1.0);

        let card = review_card(10.0, 5.0, t0() - Duration::days(10));
        let r = scheduler.current_retrievability(&card, t0());
        assert!((r - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_apply_review_substitutes_missing_card() {
        let scheduler = Scheduler::new();
        let event = ReviewEvent::new(CardId::new("fresh"), Rating::Good, t0());
        let next = scheduler.apply_review(None, &event).unwrap();
        assert_eq!(next.id, CardId::new("fresh"));
        assert_eq!(next.reps, 1);
        assert_eq!(next.due.timestamp() - t0().timestamp(), 172_800);
    }

    #[test]
    fn test_apply_review_rejects_mismatched_card() {
        let scheduler = Scheduler::new();
        let event = ReviewEvent::new(CardId::new("other"), Rating::Good, t0());
        let err = scheduler.apply_review(Some(new_card()), &event).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CardMismatch);
    }

    #[test]
    fn test_apply_review_rejects_invalid_card() {
        let scheduler = Scheduler::new();
        let mut card = new_card();
        card.difficulty = f64::INFINITY;
        let event = ReviewEvent::new(card.id.clone(), Rating::Good, t0());
        assert!(scheduler.apply_review(Some(card), &event).is_err());
    }

    #[test]
    fn test_preview_matches_individual_calls() {
        let scheduler = Scheduler::new();
        let card = review_card(4.0, 7.0, t0() - Duration::days(5));
        let preview = scheduler.preview(&card, t0());

        for (rating, outcome) in preview.iter() {
            assert_eq!(outcome, &scheduler.next_card_state(&card, rating, t0()));
        }
        assert!(preview.easy.due >= preview.good.due);
        assert!(preview.good.due >= preview.hard.due);
        assert!(preview.hard.due > preview.again.due);
    }

    #[test]
    fn test_with_params_rejects_invalid_weights() {
        let params = FsrsParameters::with_weights([f64::NAN; WEIGHT_COUNT]);
        assert!(Scheduler::with_params(params).is_err());
    }

    #[test]
    fn test_custom_retention_changes_intervals() {
        let strict = Scheduler::with_params(FsrsParameters::default().with_desired_retention(0.95))
            .unwrap();
        let relaxed = Scheduler::new();
        let card = review_card(20.0, 5.0, t0() - Duration::days(20));

        let a = strict.next_card_state(&card, Rating::Good, t0());
        let b = relaxed.next_card_state(&card, Rating::Good, t0());
        assert_eq!(a.stability, b.stability);
        assert!(a.scheduled_days < b.scheduled_days);
        assert!(a.stability >= MIN_STABILITY);
    }
}
