//! `SQLite` schema definitions for medswap.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the slots table.
///
/// Each row is one named slot; `version` starts at 1 and grows by one on
/// every write.
pub const CREATE_SLOTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS slots (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_SLOTS_TABLE, CREATE_METADATA_TABLE];
