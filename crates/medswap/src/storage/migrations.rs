//! Database migration system for medswap.
//!
//! Schema versions are tracked in the `metadata` table. Each entry in
//! [`MIGRATIONS`] upgrades the schema by exactly one version.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

type Migration = fn(&Connection) -> Result<()>;

/// Migrations in order; entry `i` upgrades version `i` to `i + 1`.
const MIGRATIONS: &[Migration] = &[migrate_v1];

/// The current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Create all tables if needed and bring the schema up to date.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    for next in version..CURRENT_VERSION {
        let migration = usize::try_from(next)
            .ok()
            .and_then(|i| MIGRATIONS.get(i))
            .ok_or_else(|| Error::DatabaseMigration {
                message: format!("unknown migration version: {}", next + 1),
            })?;
        migration(conn)?;
        set_schema_version(conn, next + 1)?;
        info!(version = next + 1, "Applied schema migration");
    }

    Ok(())
}

/// Current schema version, 0 for a fresh database.
///
/// # Errors
///
/// Returns an error if the stored version is unreadable.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    value.map_or(Ok(0), |v| {
        v.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {v}"),
        })
    })
}

fn set_schema_version(conn: &Connection, version: u32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Version 1 is the base schema from `SCHEMA_STATEMENTS`.
#[allow(clippy::unnecessary_wraps)]
fn migrate_v1(_conn: &Connection) -> Result<()> {
    Ok(())
}
