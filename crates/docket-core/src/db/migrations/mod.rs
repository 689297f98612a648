//! Versioned schema migrations driven by `PRAGMA user_version`.

use super::schema;
use rusqlite::{Connection, types::Type};

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 3;

const MIGRATIONS: &[(u32, &str)] = &[
    (1, schema::MIGRATION_V1_SQL),
    (2, schema::MIGRATION_V2_SQL),
    (3, schema::MIGRATION_V3_SQL),
];

/// Read `PRAGMA user_version` as a `u32`.
///
/// # Errors
///
/// Returns an error if querying SQLite fails or the stored value does not
/// fit a `u32`.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

/// Apply pending migrations in ascending order, each in its own
/// transaction.
///
/// # Errors
///
/// Returns an error if any migration fails; earlier migrations stay applied.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let mut current = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", i64::from(*version))?;
        tx.execute(
            "UPDATE store_meta SET schema_version = ?1 WHERE id = 1",
            [i64::from(*version)],
        )?;
        tx.commit()?;
        tracing::debug!(version, "applied schema migration");
        current = *version;
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::{LATEST_SCHEMA_VERSION, current_schema_version, migrate};
    use crate::db::schema;
    use rusqlite::{Connection, params};

    fn sqlite_object_exists(
        conn: &Connection,
        object_type: &str,
        object_name: &str,
    ) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2)",
            params![object_type, object_name],
            |row| row.get(0),
        )
    }

    #[test]
    fn migrate_empty_db_to_latest() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        let applied = migrate(&mut conn)?;
        assert_eq!(applied, LATEST_SCHEMA_VERSION);
        assert_eq!(current_schema_version(&conn)?, LATEST_SCHEMA_VERSION);

        for table in [
            "documents",
            "document_states",
            "document_tags",
            "document_authors",
            "action_holders",
            "events",
            "doc_history",
            "ballots",
            "ballot_positions",
            "relations",
            "telechat_dates",
            "mail_outbox",
            "store_meta",
        ] {
            assert!(sqlite_object_exists(&conn, "table", table)?, "missing {table}");
        }

        for index in schema::REQUIRED_INDEXES {
            assert!(
                sqlite_object_exists(&conn, "index", index)?,
                "missing expected index {index}"
            );
        }

        Ok(())
    }

    #[test]
    fn migrate_is_idempotent() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);

        let meta_rows: i64 =
            conn.query_row("SELECT COUNT(*) FROM store_meta", [], |row| row.get(0))?;
        assert_eq!(meta_rows, 1);

        let schema_version: i64 = conn.query_row(
            "SELECT schema_version FROM store_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(schema_version, i64::from(LATEST_SCHEMA_VERSION));

        Ok(())
    }

    #[test]
    fn upgrade_from_v1_keeps_documents() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::MIGRATION_V1_SQL)?;
        conn.pragma_update(None, "user_version", 1_i64)?;
        conn.execute(
            "INSERT INTO documents (name, kind, title, rev, time_us)
             VALUES ('draft-ietf-foo', 'draft', 'Foo', '00', 1)",
            [],
        )?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        assert_eq!(count, 1);
        assert!(sqlite_object_exists(&conn, "table", "mail_outbox")?);
        Ok(())
    }

    #[test]
    fn upgrade_from_v2_gives_old_snapshots_no_edges() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::MIGRATION_V1_SQL)?;
        conn.execute_batch(schema::MIGRATION_V2_SQL)?;
        conn.pragma_update(None, "user_version", 2_i64)?;
        conn.execute(
            "INSERT INTO documents (name, kind, title, rev, time_us)
             VALUES ('draft-ietf-foo', 'draft', 'Foo', '00', 1)",
            [],
        )?;
        conn.execute(
            "INSERT INTO doc_history (doc, rev, time_us, snapshot_json)
             VALUES ('draft-ietf-foo', '00', 1, '{}')",
            [],
        )?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);

        let relations: String =
            conn.query_row("SELECT relations_json FROM doc_history", [], |row| row.get(0))?;
        assert_eq!(relations, "[]");
        Ok(())
    }

    #[test]
    fn second_open_ballot_of_same_type_is_rejected() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        migrate(&mut conn)?;
        conn.execute(
            "INSERT INTO documents (name, kind, title, rev, time_us)
             VALUES ('draft-ietf-foo', 'draft', 'Foo', '00', 1)",
            [],
        )?;
        let open = "INSERT INTO ballots (doc, ballot_type, opened_by, opened_at_us)
                    VALUES ('draft-ietf-foo', 'approve', 'ad1', 1)";
        conn.execute(open, [])?;
        assert!(conn.execute(open, []).is_err());

        conn.execute("UPDATE ballots SET closed_at_us = 2", [])?;
        conn.execute(open, [])?;
        Ok(())
    }
}
