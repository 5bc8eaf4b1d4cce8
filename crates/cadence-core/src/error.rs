//! Error types for cadence operations.
//!
//! Errors carry a structured [`ErrorCode`] for programmatic handling and an
//! optional suggestion for resolution. Nothing in the scheduling core fails
//! silently: invalid input is rejected at the boundary and reported here.

use thiserror::Error;

/// Result type alias for cadence operations.
pub type CadenceResult<T> = Result<T, CadenceError>;

/// Main error type for all cadence operations.
#[derive(Error, Debug)]
pub enum CadenceError {
    /// Input validation failed (out-of-range rating, non-finite score or timestamp,
    /// card invariant violated).
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        field: Option<String>,
        suggestion: Option<String>,
    },

    /// Card not found. Recoverable: callers substitute a fresh card.
    #[error("Card not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        card_id: Option<String>,
    },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValInvalidRating,
    ValNonFinite,
    ValOutOfRange,
    ValInconsistentState,

    // Card (CARD_xxx)
    CardNotFound,
    CardMismatch,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,
    DbCorruptRow,

    // Configuration (CFG_xxx)
    CfgInvalid,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValInvalidRating => "VAL_002",
            ErrorCode::ValNonFinite => "VAL_003",
            ErrorCode::ValOutOfRange => "VAL_004",
            ErrorCode::ValInconsistentState => "VAL_005",
            ErrorCode::CardNotFound => "CARD_001",
            ErrorCode::CardMismatch => "CARD_002",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::DbCorruptRow => "DB_003",
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl CadenceError {
    /// Create a validation error tied to a specific field.
    pub fn invalid_field(field: &str, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Validation {
            message: format!("{}: {}", field, message.into()),
            code,
            field: Some(field.to_string()),
            suggestion: None,
        }
    }

    /// Create a validation error for a value that must be finite.
    pub fn non_finite(field: &str, value: f64) -> Self {
        Self::Validation {
            message: format!("{} must be finite, got {}", field, value),
            code: ErrorCode::ValNonFinite,
            field: Some(field.to_string()),
            suggestion: Some("Reject NaN and infinite values before calling the scheduler".to_string()),
        }
    }

    /// Create a validation error for an unknown rating.
    pub fn invalid_rating(raw: impl std::fmt::Display) -> Self {
        Self::Validation {
            message: format!("'{}' is not a rating", raw),
            code: ErrorCode::ValInvalidRating,
            field: Some("rating".to_string()),
            suggestion: Some("Use one of again, hard, good, easy (or 1-4)".to_string()),
        }
    }

    /// Create a not found error.
    pub fn not_found(card_id: impl Into<String>) -> Self {
        let id = card_id.into();
        Self::NotFound {
            message: format!("Card with id '{}' not found", id),
            code: ErrorCode::CardNotFound,
            card_id: Some(id),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create an error for a stored row that no longer decodes to a valid card.
    pub fn corrupt_row(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbCorruptRow,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether the caller can recover locally (a missing card is replaced by a new one).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::NotFound { .. } => Some("Substitute a freshly initialized card for unknown ids"),
            Self::Database { .. } => Some("Check the database path and file permissions"),
            Self::Configuration(_) => Some("Check the configuration file and CADENCE_* environment variables"),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for CadenceError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}
