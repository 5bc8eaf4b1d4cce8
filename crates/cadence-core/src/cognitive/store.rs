//! Card persistence store.
//!
//! SQLite-backed storage for cards (compact integer columns) and the review log.
//! Reviews run as one read-modify-write transaction under the connection lock,
//! so two reviews of the same card can never lose an update.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::cognitive::Scheduler;
use crate::encoding::CompactCard;
use crate::error::{CadenceError, CadenceResult, ErrorCode};
use crate::types::{Card, CardId, CardState, Rating, ReviewEvent};

const CARD_COLUMNS: &str = "card_id, due, stability, difficulty, elapsed_days, scheduled_days, \
                            reps, lapses, state, last_review";

/// Cards and review history read at one consistent point.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub cards: Vec<Card>,
    pub history: Vec<ReviewEvent>,
}

/// SQLite-backed card store.
pub struct CardStore {
    conn: Arc<Mutex<Connection>>,
}

impl CardStore {
    /// Open (or create) a store at the given database path.
    ///
    /// Creates parent directories and the schema if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> CadenceResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| CadenceError::Database {
            message: format!("failed to open {}: {}", path.display(), e),
            code: ErrorCode::DbConnectionFailed,
            source: Some(Box::new(e)),
        })?;
        debug!(path = %path.display(), "Opened card store");

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> CadenceResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> CadenceResult<()> {
        let conn = self.conn.lock().map_err(|e| CadenceError::database(e.to_string()))?;

        conn.execute_batch(
            "
            -- Card memory state, compact integer encoding
            CREATE TABLE IF NOT EXISTS cards (
                card_id TEXT PRIMARY KEY,
                content TEXT,
                due INTEGER NOT NULL,
                stability INTEGER NOT NULL,
                difficulty INTEGER NOT NULL,
                elapsed_days INTEGER NOT NULL DEFAULT 0,
                scheduled_days INTEGER NOT NULL DEFAULT 0,
                reps INTEGER NOT NULL DEFAULT 0,
                lapses INTEGER NOT NULL DEFAULT 0,
                state INTEGER NOT NULL DEFAULT 0,
                last_review INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cards_due ON cards(due);
            CREATE INDEX IF NOT EXISTS idx_cards_state ON cards(state);

            -- One row per graded attempt
            CREATE TABLE IF NOT EXISTS review_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                card_id TEXT NOT NULL,
                rating INTEGER NOT NULL,
                reviewed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_review_log_card_id ON review_log(card_id);
            CREATE INDEX IF NOT EXISTS idx_review_log_reviewed_at ON review_log(reviewed_at);
            ",
        )?;

        Ok(())
    }

    /// Insert a card unless its id already exists.
    ///
    /// Returns `true` if the card was inserted.
    pub fn insert_card(&self, card: &Card, content: Option<&str>) -> CadenceResult<bool> {
        card.validate()?;
        let conn = self.conn.lock().map_err(|e| CadenceError::database(e.to_string()))?;

        let compact = CompactCard::from(card);
        let now = Utc::now().to_rfc3339();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO cards
             (card_id, content, due, stability, difficulty, elapsed_days, scheduled_days,
              reps, lapses, state, last_review, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
            params![
                compact.id.as_str(),
                content,
                compact.due,
                compact.stability,
                compact.difficulty,
                compact.elapsed_days,
                compact.scheduled_days,
                compact.reps,
                compact.lapses,
                compact.state,
                compact.last_review,
                now,
            ],
        )?;

        Ok(inserted > 0)
    }

    /// Create or replace a card's memory state. Stored content is kept.
    pub fn upsert_card(&self, card: &Card) -> CadenceResult<()> {
        card.validate()?;
        let conn = self.conn.lock().map_err(|e| CadenceError::database(e.to_string()))?;
        write_card(&conn, card, Utc::now())
    }

    /// Get a card by id.
    ///
    /// Returns None if the card is not stored.
    pub fn get_card(&self, card_id: &CardId) -> CadenceResult<Option<Card>> {
        let conn = self.conn.lock().map_err(|e| CadenceError::database(e.to_string()))?;
        read_card(&conn, card_id)
    }

    /// Get the content a card was imported with.
    pub fn get_content(&self, card_id: &CardId) -> CadenceResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| CadenceError::database(e.to_string()))?;

        let content: Option<Option<String>> = conn
            .query_row(
                "SELECT content FROM cards WHERE card_id = ?1",
                params![card_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(content.flatten())
    }

    /// All cards, ordered by due time.
    pub fn list_cards(&self) -> CadenceResult<Vec<Card>> {
        let conn = self.conn.lock().map_err(|e| CadenceError::database(e.to_string()))?;
        read_all_cards(&conn)
    }

    /// Full review history, oldest first.
    pub fn history(&self) -> CadenceResult<Vec<ReviewEvent>> {
        let conn = self.conn.lock().map_err(|e| CadenceError::database(e.to_string()))?;
        read_history(&conn)
    }

    /// Get count of stored cards.
    pub fn count(&self) -> CadenceResult<usize> {
        let conn = self.conn.lock().map_err(|e| CadenceError::database(e.to_string()))?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;

        Ok(count as usize)
    }

    /// Get count of cards in each state.
    pub fn count_by_state(&self) -> CadenceResult<HashMap<CardState, usize>> {
        let conn = self.conn.lock().map_err(|e| CadenceError::database(e.to_string()))?;

        let mut stmt = conn.prepare("SELECT state, COUNT(*) FROM cards GROUP BY state")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, u8>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = HashMap::new();
        for (code, count) in rows {
            let state = CardState::from_code(code)
                .ok_or_else(|| CadenceError::corrupt_row(format!("unknown state code {}", code)))?;
            counts.insert(state, count as usize);
        }

        Ok(counts)
    }

    /// Apply one review atomically.
    ///
    /// Loads the card (a missing card starts as a new one), computes the next
    /// state, writes it and appends the event to the review log, all in one
    /// transaction.
    pub fn review(
        &self,
        card_id: &CardId,
        rating: Rating,
        now: DateTime<Utc>,
        scheduler: &Scheduler,
    ) -> CadenceResult<Card> {
        let mut conn = self.conn.lock().map_err(|e| CadenceError::database(e.to_string()))?;
        let tx = conn.transaction()?;

        let current = read_card(&tx, card_id)?;
        let event = ReviewEvent::new(card_id.clone(), rating, now);
        let next = scheduler.apply_review(current, &event)?;

        write_card(&tx, &next, now)?;
        tx.execute(
            "INSERT INTO review_log (card_id, rating, reviewed_at) VALUES (?1, ?2, ?3)",
            params![card_id.as_str(), rating.value(), now.to_rfc3339()],
        )?;
        tx.commit()?;

        info!(card_id = %card_id, rating = %rating, due = %next.due, "Recorded review");
        Ok(next)
    }

    /// Read every card and the full history in one transaction.
    pub fn snapshot(&self) -> CadenceResult<Snapshot> {
        let mut conn = self.conn.lock().map_err(|e| CadenceError::database(e.to_string()))?;
        let tx = conn.transaction()?;

        let cards = read_all_cards(&tx)?;
        let history = read_history(&tx)?;
        tx.commit()?;

        Ok(Snapshot { cards, history })
    }
}

fn compact_from_row(row: &Row<'_>) -> rusqlite::Result<CompactCard> {
    Ok(CompactCard {
        id: CardId::new(row.get::<_, String>(0)?),
        due: row.get(1)?,
        stability: row.get(2)?,
        difficulty: row.get(3)?,
        elapsed_days: row.get(4)?,
        scheduled_days: row.get(5)?,
        reps: row.get(6)?,
        lapses: row.get(7)?,
        state: row.get(8)?,
        last_review: row.get(9)?,
    })
}

fn decode(compact: CompactCard) -> CadenceResult<Card> {
    let id = compact.id.clone();
    Card::try_from(compact)
        .map_err(|e| CadenceError::corrupt_row(format!("card '{}' failed to decode: {}", id, e)))
}

fn read_card(conn: &Connection, card_id: &CardId) -> CadenceResult<Option<Card>> {
    let compact = conn
        .query_row(
            &format!("SELECT {} FROM cards WHERE card_id = ?1", CARD_COLUMNS),
            params![card_id.as_str()],
            compact_from_row,
        )
        .optional()?;

    compact.map(decode).transpose()
}

fn read_all_cards(conn: &Connection) -> CadenceResult<Vec<Card>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM cards ORDER BY due ASC, card_id ASC",
        CARD_COLUMNS
    ))?;

    let rows = stmt
        .query_map([], compact_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(decode).collect()
}

fn read_history(conn: &Connection) -> CadenceResult<Vec<ReviewEvent>> {
    let mut stmt = conn.prepare(
        "SELECT card_id, rating, reviewed_at FROM review_log ORDER BY reviewed_at ASC, id ASC",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u8>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(card_id, rating, reviewed_at)| -> CadenceResult<ReviewEvent> {
            let rating = Rating::try_from(rating)
                .map_err(|e| CadenceError::corrupt_row(format!("review of '{}': {}", card_id, e)))?;
            let timestamp = DateTime::parse_from_rfc3339(&reviewed_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    CadenceError::corrupt_row(format!("review of '{}' at '{}': {}", card_id, reviewed_at, e))
                })?;
            Ok(ReviewEvent::new(CardId::new(card_id), rating, timestamp))
        })
        .collect()
}

fn write_card(conn: &Connection, card: &Card, updated_at: DateTime<Utc>) -> CadenceResult<()> {
    let compact = CompactCard::from(card);
    let updated_at = updated_at.to_rfc3339();

    conn.execute(
        "INSERT INTO cards
         (card_id, due, stability, difficulty, elapsed_days, scheduled_days,
          reps, lapses, state, last_review, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
         ON CONFLICT(card_id) DO UPDATE SET
             due = excluded.due,
             stability = excluded.stability,
             difficulty = excluded.difficulty,
             elapsed_days = excluded.elapsed_days,
             scheduled_days = excluded.scheduled_days,
             reps = excluded.reps,
             lapses = excluded.lapses,
             state = excluded.state,
             last_review = excluded.last_review,
             updated_at = excluded.updated_at",
        params![
            compact.id.as_str(),
            compact.due,
            compact.stability,
            compact.difficulty,
            compact.elapsed_days,
            compact.scheduled_days,
            compact.reps,
            compact.lapses,
            compact.state,
            compact.last_review,
            updated_at,
        ],
    )?;

    Ok(())
}
