//! cadence - spaced repetition review scheduler CLI.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context as _;
use cadence_core::{CadenceConfig, Rating};
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::Context;

/// cadence - schedule lyric and quiz practice with FSRS
#[derive(Parser)]
#[command(name = "cadence")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Spaced repetition scheduler for lyric lines and quiz questions")]
struct Cli {
    /// Configuration file (.toml, .json, .yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Card database path (overrides config and CADENCE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log scheduling decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import cards from a text file, one card per non-empty line
    Import {
        /// Path to the source file
        file: PathBuf,
    },

    /// Show today's review queue
    Queue {
        /// Show at most this many cards
        #[arg(long)]
        limit: Option<usize>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Grade a card and persist its next state
    #[command(group(ArgGroup::new("grade").required(true).args(["score", "rating"])))]
    Review {
        /// Card id
        card_id: String,
        /// Grader score, 0-100
        #[arg(long)]
        score: Option<f64>,
        /// Rating: again, hard, good, easy (or 1-4)
        #[arg(long)]
        rating: Option<Rating>,
    },

    /// Show the outcome of every rating without recording a review
    Preview {
        /// Card id
        card_id: String,
    },

    /// Show card counts by state
    Stats {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if verbose {
        filter = filter.add_directive("cadence_core=debug".parse()?);
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    Ok(())
}

fn load_config(path: Option<PathBuf>, db: Option<PathBuf>) -> anyhow::Result<CadenceConfig> {
    let config = match path {
        Some(path) => CadenceConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => CadenceConfig::default(),
    };
    let mut config = config.with_env_overrides()?;

    if let Some(db) = db {
        config.database_path = db;
    }

    Ok(config)
}

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = load_config(cli.config, cli.db)?;
    debug!(database = %config.database_path.display(), "Loaded configuration");

    let ctx = Context::open(config)?;
    let now = Utc::now();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Commands::Import { file } => commands::import(&ctx, &file, now, &mut out)?,
        Commands::Queue { limit, json } => commands::queue(&ctx, limit, json, now, &mut out)?,
        Commands::Review {
            card_id,
            score,
            rating,
        } => commands::review(&ctx, &card_id, score, rating, now, &mut out)?,
        Commands::Preview { card_id } => commands::preview(&ctx, &card_id, now, &mut out)?,
        Commands::Stats { json } => commands::stats(&ctx, json, now, &mut out)?,
    }

    out.flush()?;
    Ok(())
}
