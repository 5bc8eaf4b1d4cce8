//! Configuration system for cadence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CadenceError, CadenceResult};
use crate::fsrs::FsrsParameters;
use crate::grading::RatingThresholds;
use crate::queue::{QueuePolicy, DEFAULT_DAILY_NEW_CARD_LIMIT};
use crate::time::{self, MAX_UTC_OFFSET_MINUTES};

/// Environment variable overriding the daily new-card limit.
pub const ENV_DAILY_NEW_CARD_LIMIT: &str = "CADENCE_DAILY_NEW_CARD_LIMIT";
/// Environment variable overriding the desired retention.
pub const ENV_DESIRED_RETENTION: &str = "CADENCE_DESIRED_RETENTION";
/// Environment variable overriding the learner's UTC offset.
pub const ENV_UTC_OFFSET_MINUTES: &str = "CADENCE_UTC_OFFSET_MINUTES";
/// Environment variable overriding the database path.
pub const ENV_DB_PATH: &str = "CADENCE_DB_PATH";

/// Session queue configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Cards whose first review may fall on one local day.
    pub daily_new_card_limit: u32,
    /// Learner's offset from UTC, used to find local midnight.
    pub utc_offset_minutes: i32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            daily_new_card_limit: DEFAULT_DAILY_NEW_CARD_LIMIT,
            utc_offset_minutes: 0,
        }
    }
}

impl QueueConfig {
    pub fn policy(&self) -> QueuePolicy {
        QueuePolicy::with_daily_new_card_limit(self.daily_new_card_limit)
    }

    /// Start of the learner's current day.
    pub fn day_start(&self, now: DateTime<Utc>) -> CadenceResult<DateTime<Utc>> {
        time::day_start(now, self.utc_offset_minutes)
    }
}

/// Main cadence configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// FSRS parameters.
    pub scheduler: FsrsParameters,
    /// Session queue policy.
    pub queue: QueueConfig,
    /// Score thresholds for each rating.
    pub rating: RatingThresholds,
    /// Path to the card database.
    pub database_path: PathBuf,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        let cadence_dir = dirs::home_dir()
            .map(|h| h.join(".cadence"))
            .unwrap_or_else(|| PathBuf::from(".cadence"));

        Self {
            scheduler: FsrsParameters::default(),
            queue: QueueConfig::default(),
            rating: RatingThresholds::default(),
            database_path: cadence_dir.join("cards.db"),
        }
    }
}

impl CadenceConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> CadenceResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| CadenceError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| CadenceError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| CadenceError::Configuration(e.to_string()))?,
            _ => {
                return Err(CadenceError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables over the defaults.
    pub fn from_env() -> CadenceResult<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `CADENCE_*` environment variables on top of this configuration.
    pub fn with_env_overrides(self) -> CadenceResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> CadenceResult<Self> {
        if let Some(limit) = lookup(ENV_DAILY_NEW_CARD_LIMIT) {
            self.queue.daily_new_card_limit = parse_var(ENV_DAILY_NEW_CARD_LIMIT, &limit)?;
        }
        if let Some(retention) = lookup(ENV_DESIRED_RETENTION) {
            self.scheduler.desired_retention = parse_var(ENV_DESIRED_RETENTION, &retention)?;
        }
        if let Some(offset) = lookup(ENV_UTC_OFFSET_MINUTES) {
            self.queue.utc_offset_minutes = parse_var(ENV_UTC_OFFSET_MINUTES, &offset)?;
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.database_path = PathBuf::from(path);
        }

        self.validate()?;
        Ok(self)
    }

    /// Check every section.
    pub fn validate(&self) -> CadenceResult<()> {
        self.scheduler
            .validate()
            .map_err(|e| CadenceError::Configuration(format!("scheduler: {}", e)))?;
        self.rating
            .validate()
            .map_err(|e| CadenceError::Configuration(format!("rating: {}", e)))?;
        if self.queue.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(CadenceError::Configuration(format!(
                "queue: utc_offset_minutes {} is beyond +/-{}",
                self.queue.utc_offset_minutes, MAX_UTC_OFFSET_MINUTES
            )));
        }
        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> CadenceConfigBuilder {
        CadenceConfigBuilder::default()
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> CadenceResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| CadenceError::Configuration(format!("{}='{}': {}", key, raw, e)))
}

/// Builder for CadenceConfig.
#[derive(Default)]
pub struct CadenceConfigBuilder {
    config: CadenceConfig,
}

impl CadenceConfigBuilder {
    /// Set FSRS parameters.
    pub fn scheduler(mut self, params: FsrsParameters) -> Self {
        self.config.scheduler = params;
        self
    }

    /// Set the target recall probability used for intervals.
    pub fn desired_retention(mut self, retention: f64) -> Self {
        self.config.scheduler.desired_retention = retention;
        self
    }

    /// Set the daily new-card cap.
    pub fn daily_new_card_limit(mut self, limit: u32) -> Self {
        self.config.queue.daily_new_card_limit = limit;
        self
    }

    /// Set the learner's UTC offset, which moves the day boundary.
    pub fn utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.config.queue.utc_offset_minutes = minutes;
        self
    }

    /// Set rating thresholds.
    pub fn rating(mut self, thresholds: RatingThresholds) -> Self {
        self.config.rating = thresholds;
        self
    }

    /// Set database path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> CadenceResult<CadenceConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
