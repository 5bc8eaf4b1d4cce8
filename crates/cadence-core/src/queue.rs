//! Session queue construction.
//!
//! Given a snapshot of cards and the review history, decides which cards are
//! presented in one session and in what order, capping how many never-reviewed
//! cards are introduced per local day.
//!
//! ## Algorithm
//! 1. Keep cards with `due <= now`.
//! 2. Sort by `due`, then state priority (Review, Learning, Relearning, New), then id.
//! 3. Count cards whose earliest review falls at or after `day_start`.
//! 4. Pass every reviewed card through; pass `New` cards only while the daily
//!    budget lasts.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::time::utc_day_start;
use crate::types::{Card, CardId, CardState, ReviewEvent};

/// Default number of new cards introduced per day.
pub const DEFAULT_DAILY_NEW_CARD_LIMIT: u32 = 15;

/// Session policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueuePolicy {
    /// Maximum number of cards whose first-ever review may fall on one day.
    pub daily_new_card_limit: u32,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            daily_new_card_limit: DEFAULT_DAILY_NEW_CARD_LIMIT,
        }
    }
}

impl QueuePolicy {
    /// Policy with a custom daily new-card cap.
    pub fn with_daily_new_card_limit(limit: u32) -> Self {
        Self {
            daily_new_card_limit: limit,
        }
    }
}

/// Summary counts for one built queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Cards in the capped queue.
    pub total: usize,
    pub new: usize,
    pub learning: usize,
    pub review: usize,
    pub relearning: usize,
    /// Cards first reviewed at or after the start of today.
    pub new_cards_introduced_today: usize,
    /// New-card budget left before this session.
    pub new_cards_remaining: usize,
}

impl QueueStats {
    fn record(&mut self, state: CardState) {
        self.total += 1;
        match state {
            CardState::New => self.new += 1,
            CardState::Learning => self.learning += 1,
            CardState::Review => self.review += 1,
            CardState::Relearning => self.relearning += 1,
        }
    }
}

/// Ordered cards for one session plus their stats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionQueue {
    pub queue: Vec<Card>,
    pub stats: QueueStats,
}

impl SessionQueue {
    /// Number of cards in the session.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is due.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// The card to present first, if any.
    pub fn front(&self) -> Option<&Card> {
        self.queue.first()
    }

    /// Keep only the first `len` cards and recount the per-state stats.
    ///
    /// The daily budget figures are left alone: they describe the day, not the
    /// cut.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.queue.len() {
            return;
        }
        self.queue.truncate(len);

        let mut stats = QueueStats {
            new_cards_introduced_today: self.stats.new_cards_introduced_today,
            new_cards_remaining: self.stats.new_cards_remaining,
            ..Default::default()
        };
        for card in &self.queue {
            stats.record(card.state);
        }
        self.stats = stats;
    }
}

/// Builds session queues under one policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueBuilder {
    policy: QueuePolicy,
}

impl QueueBuilder {
    /// Builder for the given policy.
    pub fn new(policy: QueuePolicy) -> Self {
        Self { policy }
    }

    /// The policy every built queue follows.
    pub fn policy(&self) -> &QueuePolicy {
        &self.policy
    }

    /// Build the session queue.
    ///
    /// `day_start` is the start of the learner's current day (see
    /// [`crate::time::day_start`]). Pure over its arguments: the input
    /// snapshot is never mutated and the wall clock is never read.
    pub fn build(
        &self,
        cards: &[Card],
        history: &[ReviewEvent],
        now: DateTime<Utc>,
        day_start: DateTime<Utc>,
    ) -> SessionQueue {
        let mut due: Vec<&Card> = dedupe(cards)
            .into_iter()
            .filter(|card| card.is_due(now))
            .collect();

        due.sort_by(|a, b| {
            a.due
                .cmp(&b.due)
                .then_with(|| a.state.queue_priority().cmp(&b.state.queue_priority()))
                .then_with(|| a.id.cmp(&b.id))
        });

        let introduced = new_cards_introduced(history, day_start);
        let remaining = (self.policy.daily_new_card_limit as usize).saturating_sub(introduced);

        let mut stats = QueueStats {
            new_cards_introduced_today: introduced,
            new_cards_remaining: remaining,
            ..Default::default()
        };

        let mut queue = Vec::with_capacity(due.len());
        let mut new_taken = 0usize;
        let mut new_deferred = 0usize;
        for card in due {
            if card.state == CardState::New {
                if new_taken >= remaining {
                    new_deferred += 1;
                    continue;
                }
                new_taken += 1;
            }
            stats.record(card.state);
            queue.push(card.clone());
        }

        debug!(
            total = stats.total,
            new = stats.new,
            review = stats.review,
            relearning = stats.relearning,
            introduced_today = introduced,
            new_deferred,
            "Built session queue"
        );

        SessionQueue { queue, stats }
    }
}

/// Number of distinct cards whose earliest review is at or after `day_start`.
pub fn new_cards_introduced(history: &[ReviewEvent], day_start: DateTime<Utc>) -> usize {
    let mut first_review: HashMap<&CardId, DateTime<Utc>> = HashMap::new();
    for event in history {
        first_review
            .entry(&event.card_id)
            .and_modify(|first| {
                if event.timestamp < *first {
                    *first = event.timestamp;
                }
            })
            .or_insert(event.timestamp);
    }

    first_review
        .values()
        .filter(|first| **first >= day_start)
        .count()
}

/// Collapse duplicate ids so a card never appears twice.
///
/// The entry with more reps is the newer state; ties keep the first seen.
fn dedupe(cards: &[Card]) -> Vec<&Card> {
    let mut index: HashMap<&CardId, usize> = HashMap::with_capacity(cards.len());
    let mut unique: Vec<&Card> = Vec::with_capacity(cards.len());

    for card in cards {
        match index.entry(&card.id) {
            Entry::Occupied(slot) => {
                warn!(card_id = %card.id, "Duplicate card in snapshot");
                let kept = &mut unique[*slot.get()];
                if card.reps > kept.reps {
                    *kept = card;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(unique.len());
                unique.push(card);
            }
        }
    }

    unique
}

/// Build a queue using UTC midnight of `now` as the day boundary.
pub fn build_queue(
    cards: &[Card],
    history: &[ReviewEvent],
    now: DateTime<Utc>,
    daily_new_card_limit: u32,
) -> SessionQueue {
    QueueBuilder::new(QueuePolicy::with_daily_new_card_limit(daily_new_card_limit)).build(
        cards,
        history,
        now,
        utc_day_start(now),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{init_card, Rating};
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        // 2024-03-10T15:30:00Z
        DateTime::<Utc>::from_timestamp(1_710_084_600, 0).unwrap()
    }

    fn new_card(id: &str, due: DateTime<Utc>) -> Card {
        init_card(CardId::new(id), due)
    }

    fn review_card(id: &str, due: DateTime<Utc>) -> Card {
        Card {
            state: CardState::Review,
            reps: 2,
            stability: 3.0,
            last_review: Some(due - Duration::days(3)),
            ..new_card(id, due)
        }
    }

    fn event(id: &str, at: DateTime<Utc>) -> ReviewEvent {
        ReviewEvent::new(CardId::new(id), Rating::Good, at)
    }

    #[test]
    fn test_due_filter_and_state_priority() {
        let t = now();
        let cards = vec![
            new_card("a", t + Duration::seconds(10)),
            review_card("b", t - Duration::seconds(5)),
            new_card("c", t - Duration::seconds(5)),
        ];

        let session = build_queue(&cards, &[], t, 15);
        let ids: Vec<&str> = session.queue.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(session.stats.review, 1);
        assert_eq!(session.stats.new, 1);
        assert_eq!(session.stats.total, 2);
    }

    #[test]
    fn test_earlier_due_sorts_first_regardless_of_state() {
        let t = now();
        let cards = vec![
            review_card("late-review", t - Duration::minutes(1)),
            new_card("early-new", t - Duration::hours(1)),
        ];
        let session = build_queue(&cards, &[], t, 15);
        assert_eq!(session.queue[0].id.as_str(), "early-new");
    }

    #[test]
    fn test_relearning_after_learning_at_equal_due() {
        let t = now();
        let mut relearning = review_card("r", t);
        relearning.state = CardState::Relearning;
        let mut learning = review_card("l", t);
        learning.state = CardState::Learning;
        let review = review_card("v", t);

        let session = build_queue(&[relearning, learning, review], &[], t, 15);
        let states: Vec<CardState> = session.queue.iter().map(|c| c.state).collect();
        assert_eq!(
            states,
            vec![CardState::Review, CardState::Learning, CardState::Relearning]
        );
        assert_eq!(session.stats.learning, 1);
        assert_eq!(session.stats.relearning, 1);
    }

    #[test]
    fn test_daily_cap_with_empty_history() {
        let t = now();
        let cards: Vec<Card> = (0..20)
            .map(|i| new_card(&format!("card-{:02}", i), t - Duration::minutes(i)))
            .collect();

        let session = build_queue(&cards, &[], t, 15);
        assert_eq!(session.len(), 15);
        assert_eq!(session.stats.new, 15);
        assert_eq!(session.stats.new_cards_remaining, 15);
        assert_eq!(session.stats.new_cards_introduced_today, 0);
    }

    #[test]
    fn test_zero_limit_surfaces_no_new_cards() {
        let t = now();
        let cards = vec![new_card("n", t), review_card("r", t)];
        let session = build_queue(&cards, &[], t, 0);
        assert_eq!(session.len(), 1);
        assert_eq!(session.stats.new, 0);
        assert_eq!(session.stats.new_cards_remaining, 0);
        assert_eq!(session.front().map(|c| c.state), Some(CardState::Review));
    }

    #[test]
    fn test_reviews_today_consume_budget() {
        let t = now();
        let today = utc_day_start(t);
        let history = vec![
            event("x", today + Duration::hours(1)),
            event("x", today + Duration::hours(2)),
            event("y", today + Duration::hours(3)),
            // first seen yesterday: not introduced today
            event("z", today - Duration::hours(1)),
            event("z", today + Duration::hours(4)),
        ];
        assert_eq!(new_cards_introduced(&history, today), 2);

        let cards: Vec<Card> = (0..5).map(|i| new_card(&format!("n{}", i), t)).collect();
        let session = build_queue(&cards, &history, t, 3);
        assert_eq!(session.stats.new_cards_introduced_today, 2);
        assert_eq!(session.stats.new_cards_remaining, 1);
        assert_eq!(session.stats.new, 1);
    }

    #[test]
    fn test_over_budget_history_saturates_to_zero() {
        let t = now();
        let today = utc_day_start(t);
        let history: Vec<ReviewEvent> = (0..4)
            .map(|i| event(&format!("h{}", i), today + Duration::minutes(i)))
            .collect();
        let session = build_queue(&[new_card("n", t)], &history, t, 2);
        assert_eq!(session.stats.new_cards_remaining, 0);
        assert!(session.is_empty());
    }

    #[test]
    fn test_explicit_day_start_controls_window() {
        let t = now();
        let history = vec![event("x", t - Duration::hours(20))];
        let builder = QueueBuilder::new(QueuePolicy::default());

        let wide = builder.build(&[], &history, t, t - Duration::days(1));
        assert_eq!(wide.stats.new_cards_introduced_today, 1);

        let narrow = builder.build(&[], &history, t, t - Duration::hours(2));
        assert_eq!(narrow.stats.new_cards_introduced_today, 0);
    }

    #[test]
    fn test_duplicate_ids_collapse_to_most_reviewed() {
        let t = now();
        let stale = new_card("dup", t);
        let fresh = review_card("dup", t);
        let session = build_queue(&[stale, fresh], &[], t, 15);

        assert_eq!(session.len(), 1);
        assert_eq!(session.queue[0].state, CardState::Review);
    }

    #[test]
    fn test_new_cards_never_exceed_remaining_budget() {
        let t = now();
        let mut cards = Vec::new();
        for i in 0..10 {
            cards.push(new_card(&format!("n{}", i), t - Duration::minutes(i)));
            cards.push(review_card(&format!("r{}", i), t - Duration::minutes(i)));
        }
        for limit in [0, 1, 4, 15] {
            let session = build_queue(&cards, &[], t, limit);
            assert!(session.stats.new <= session.stats.new_cards_remaining);
            assert_eq!(session.stats.review, 10);
        }
    }

    #[test]
    fn test_truncate_recounts_stats() {
        let t = now();
        let cards = vec![
            review_card("r1", t - Duration::hours(3)),
            review_card("r2", t - Duration::hours(2)),
            new_card("n1", t - Duration::hours(1)),
            new_card("n2", t),
        ];
        let mut session = build_queue(&cards, &[], t, 15);
        assert_eq!(session.stats.total, 4);

        session.truncate(3);
        assert_eq!(session.len(), 3);
        assert_eq!(session.stats.total, 3);
        assert_eq!(session.stats.review, 2);
        assert_eq!(session.stats.new, 1);
        assert_eq!(session.stats.new_cards_remaining, 15);

        let before = session.clone();
        session.truncate(10);
        assert_eq!(session, before);
    }

    #[test]
    fn test_input_snapshot_is_untouched() {
        let t = now();
        let cards = vec![new_card("b", t), new_card("a", t)];
        let before = cards.clone();
        let _ = build_queue(&cards, &[], t, 1);
        assert_eq!(cards, before);
    }
}
