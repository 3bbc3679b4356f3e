//! Error types for medswap.
//!
//! This module defines all error types used throughout the medswap crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for medswap operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Slot Errors ===
    /// A stored slot holds a value that is not a record list.
    #[error("slot '{key}' holds unreadable data: {source}")]
    CorruptSlot {
        /// The slot key.
        key: String,
        /// The parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// Another writer changed the slot between read and write.
    #[error("slot '{key}' changed concurrently (expected version {expected})")]
    SlotConflict {
        /// The slot key.
        key: String,
        /// The version the writer read.
        expected: u64,
    },

    /// Appending kept conflicting with other writers.
    #[error("gave up appending to slot '{key}' after {attempts} attempts")]
    AppendRetriesExhausted {
        /// The slot key.
        key: String,
        /// Number of attempts made.
        attempts: u32,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Rendering Errors ===
    /// A page template failed to render.
    #[error("failed to render template: {0}")]
    Render(#[from] askama::Error),

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for medswap operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a slot conflict error.
    #[must_use]
    pub fn slot_conflict(key: impl Into<String>, expected: u64) -> Self {
        Self::SlotConflict {
            key: key.into(),
            expected,
        }
    }

    /// Check if this error is a write conflict that may succeed on retry.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::SlotConflict { .. })
    }

    /// Check if this error means stored data could not be parsed.
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptSlot { .. })
    }
}
