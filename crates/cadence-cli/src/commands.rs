//! Subcommand implementations.
//!
//! Each command takes the current instant and an output writer explicitly so
//! it can be exercised against an in-memory store.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context as _};
use cadence_core::{
    CadenceConfig, CadenceError, Card, CardId, CardState, CardStore, QueueBuilder, QueueStats,
    Rating, RatingMapper, Scheduler,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

/// Everything a command needs.
pub struct Context {
    pub config: CadenceConfig,
    pub store: CardStore,
    pub scheduler: Scheduler,
    pub mapper: RatingMapper,
}

impl Context {
    /// Open the configured database.
    pub fn open(config: CadenceConfig) -> anyhow::Result<Self> {
        let store = CardStore::open(&config.database_path).with_context(|| {
            format!("failed to open database {}", config.database_path.display())
        })?;
        Self::with_store(config, store)
    }

    pub fn with_store(config: CadenceConfig, store: CardStore) -> anyhow::Result<Self> {
        let scheduler = Scheduler::with_params(config.scheduler.clone())?;
        let mapper = RatingMapper::new(config.rating)?;
        Ok(Self {
            config,
            store,
            scheduler,
            mapper,
        })
    }

    fn load_card(&self, card_id: &str) -> anyhow::Result<Card> {
        let id = CardId::new(card_id);
        match self.store.get_card(&id)? {
            Some(card) => Ok(card),
            None => Err(CadenceError::not_found(card_id).into()),
        }
    }
}

/// Counts reported by `stats`.
#[derive(Debug, Serialize)]
struct StatsReport {
    total: usize,
    new: usize,
    learning: usize,
    review: usize,
    relearning: usize,
    due_today: QueueStats,
}

/// JSON shape of one queued card.
#[derive(Debug, Serialize)]
struct QueueEntry<'a> {
    #[serde(flatten)]
    card: &'a Card,
    content: Option<String>,
}

fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Import one card per non-empty line. Ids derive from content and line
/// position, so importing the same file twice adds nothing.
pub fn import(
    ctx: &Context,
    file: &Path,
    now: DateTime<Utc>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let mut added = 0usize;
    let mut skipped = 0usize;
    for (position, line) in text.lines().enumerate() {
        let content = line.trim();
        if content.is_empty() {
            continue;
        }
        let card = Card::new(CardId::derive(content, position), now);
        if ctx.store.insert_card(&card, Some(content))? {
            added += 1;
        } else {
            skipped += 1;
        }
    }

    info!(file = %file.display(), added, skipped, "Imported cards");
    writeln!(out, "Imported {} new cards ({} already present)", added, skipped)?;
    Ok(())
}

/// Print today's queue.
pub fn queue(
    ctx: &Context,
    limit: Option<usize>,
    json: bool,
    now: DateTime<Utc>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let snapshot = ctx.store.snapshot()?;
    let builder = QueueBuilder::new(ctx.config.queue.policy());
    let mut session = builder.build(
        &snapshot.cards,
        &snapshot.history,
        now,
        ctx.config.queue.day_start(now)?,
    );
    if let Some(limit) = limit {
        session.truncate(limit);
    }

    if json {
        let entries = session
            .queue
            .iter()
            .map(|card| {
                Ok(QueueEntry {
                    card,
                    content: ctx.store.get_content(&card.id)?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let payload = serde_json::json!({ "queue": entries, "stats": session.stats });
        writeln!(out, "{}", serde_json::to_string_pretty(&payload)?)?;
        return Ok(());
    }

    if session.is_empty() {
        writeln!(out, "Nothing due.")?;
    }
    for card in &session.queue {
        let content = ctx.store.get_content(&card.id)?.unwrap_or_default();
        writeln!(
            out,
            "{}  {:<10}  {}  {}",
            card.id,
            card.state,
            format_time(card.due),
            content
        )?;
    }

    let stats = &session.stats;
    writeln!(
        out,
        "\n{} due: {} review, {} relearning, {} new ({} introduced today, {} new remaining)",
        stats.total,
        stats.review,
        stats.relearning,
        stats.new,
        stats.new_cards_introduced_today,
        stats.new_cards_remaining
    )?;
    Ok(())
}

/// Grade a card from a score or an explicit rating and store the result.
pub fn review(
    ctx: &Context,
    card_id: &str,
    score: Option<f64>,
    rating: Option<Rating>,
    now: DateTime<Utc>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let rating = match (score, rating) {
        (_, Some(rating)) => rating,
        (Some(score), None) => ctx.mapper.map(score)?,
        (None, None) => bail!("either --score or --rating is required"),
    };

    // Unknown ids are a typo here, not a new card.
    let card = ctx.load_card(card_id)?;
    let next = ctx.store.review(&card.id, rating, now, &ctx.scheduler)?;

    writeln!(
        out,
        "{} rated {}: {} -> {}, next review {} ({} days)",
        next.id,
        rating,
        card.state,
        next.state,
        format_time(next.due),
        next.scheduled_days
    )?;
    Ok(())
}

/// Show what each rating would do to a card.
pub fn preview(
    ctx: &Context,
    card_id: &str,
    now: DateTime<Utc>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let card = ctx.load_card(card_id)?;
    let preview = ctx.scheduler.preview(&card, now);

    writeln!(
        out,
        "{} ({}, retrievability {:.2})",
        card.id,
        card.state,
        ctx.scheduler.current_retrievability(&card, now)
    )?;
    for (rating, outcome) in preview.iter() {
        writeln!(
            out,
            "  {:<5}  {:>8} days  due {}  stability {:.2}  difficulty {:.2}",
            rating.as_str(),
            outcome.scheduled_days,
            format_time(outcome.due),
            outcome.stability,
            outcome.difficulty
        )?;
    }
    Ok(())
}

/// Print card counts by state plus today's queue stats.
pub fn stats(
    ctx: &Context,
    json: bool,
    now: DateTime<Utc>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let counts = ctx.store.count_by_state()?;
    let count = |state: CardState| counts.get(&state).copied().unwrap_or(0);

    let snapshot = ctx.store.snapshot()?;
    let due_today = QueueBuilder::new(ctx.config.queue.policy())
        .build(
            &snapshot.cards,
            &snapshot.history,
            now,
            ctx.config.queue.day_start(now)?,
        )
        .stats;

    let report = StatsReport {
        total: counts.values().sum(),
        new: count(CardState::New),
        learning: count(CardState::Learning),
        review: count(CardState::Review),
        relearning: count(CardState::Relearning),
        due_today,
    };

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        writeln!(out, "Cards: {}", report.total)?;
        writeln!(out, "  new:        {}", report.new)?;
        writeln!(out, "  learning:   {}", report.learning)?;
        writeln!(out, "  review:     {}", report.review)?;
        writeln!(out, "  relearning: {}", report.relearning)?;
        writeln!(
            out,
            "Due today: {} ({} new remaining)",
            report.due_today.total, report.due_today.new_cards_remaining
        )?;
    }
    Ok(())
}
