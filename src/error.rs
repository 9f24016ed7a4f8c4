//! Error types for `todo_assistant`.

use std::fmt;

/// Errors that can occur while managing tasks, categories and tags.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input was malformed or a required field was missing.
    #[error("{0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of entity ("task", "category", "tag").
        entity: &'static str,
        /// The id or name that was looked up.
        key: String,
    },

    /// A lifecycle transition is not allowed from the current status.
    #[error("cannot {action} task {id}: task is {status}")]
    InvalidState {
        /// The task id.
        id: i64,
        /// The current status of the task.
        status: String,
        /// The attempted transition ("start", "complete").
        action: &'static str,
    },

    /// A uniqueness constraint was violated.
    #[error("{entity} '{name}' already exists")]
    Conflict {
        /// Kind of entity.
        entity: &'static str,
        /// The conflicting name.
        name: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error occurred.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A `SQLite` database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A template error occurred.
    #[error("Template error: {0}")]
    Template(String),

    /// An unexpected failure, such as a caught panic.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a not-found error.
    pub fn not_found(entity: &'static str, key: impl fmt::Display) -> Self {
        Self::NotFound { entity, key: key.to_string() }
    }

    /// Classify this error into one of the distinguishable kinds.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_)
            | Self::Database(_)
            | Self::Template(_)
            | Self::Internal(_) => {
                ErrorKind::Storage
            }
        }
    }
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing input.
    Validation,
    /// Referenced id or name is absent.
    NotFound,
    /// Illegal lifecycle transition.
    InvalidState,
    /// Name uniqueness violation.
    Conflict,
    /// Storage, filesystem or serialization failure.
    Storage,
}

impl ErrorKind {
    /// Process exit code used by the command surface for this kind.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Storage => 1,
            Self::Validation => 2,
            Self::NotFound => 3,
            Self::InvalidState => 4,
            Self::Conflict => 5,
        }
    }

    /// Short lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::InvalidState => "invalid_state",
            Self::Conflict => "conflict",
            Self::Storage => "storage",
        }
    }
}

/// Returns true if the database error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
