//! SQLite store utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so sweeps can read while interactive edits write
//! - `busy_timeout = 5s` to ride out short lock contention
//! - `foreign_keys = ON` to protect relational integrity

pub mod migrations;
pub mod query;
pub mod schema;
pub mod store;

use crate::error::{DocketError, Result};
use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the store database, apply runtime pragmas and migrate
/// the schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening, configuring or migrating the database fails.
pub fn open_store(path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("open store database {}", path.display()))?;

    configure_connection(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;

    Ok(conn)
}

/// In-memory store, migrated. Used by tests and dry runs.
///
/// # Errors
///
/// Returns an error if SQLite cannot create or migrate the database.
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    migrations::migrate(&mut conn)?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

/// Timestamps are stored as integer microseconds since the epoch.
#[must_use]
pub fn to_us(time: DateTime<Utc>) -> i64 {
    time.timestamp_micros()
}

/// # Errors
///
/// Returns a corrupt-record error for out-of-range values.
pub fn from_us(us: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(us)
        .ok_or_else(|| DocketError::Corrupt(format!("timestamp {us} out of range")))
}
