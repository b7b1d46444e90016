//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: initial schema
    r#"
    -- Captured device events, partitioned by category.
    -- Each category is size-bounded; eviction is oldest-by-timestamp.
    CREATE TABLE IF NOT EXISTS events (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        category         TEXT NOT NULL,
        ts               INTEGER NOT NULL,    -- ms since epoch
        payload          TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_events_category_ts ON events(category, ts);

    -- Records that failed transport and await replay. One shared set,
    -- capped at 100, no dedup key.
    CREATE TABLE IF NOT EXISTS pending_logs (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        ts               INTEGER NOT NULL,    -- ms since epoch of the failed attempt
        event_type       TEXT NOT NULL,
        message          TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_pending_logs_ts ON pending_logs(ts);

    -- Namespaced string slots: destination candidates, the live poll
    -- interval, and monitor state scalars all live here.
    CREATE TABLE IF NOT EXISTS settings (
        namespace        TEXT NOT NULL,
        key              TEXT NOT NULL,
        value            TEXT NOT NULL,
        updated_at       INTEGER NOT NULL,    -- ms since epoch

        PRIMARY KEY (namespace, key)
    );
    "#,
];

/// Run any outstanding migrations on the given connection.
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        // Run migrations twice - should be idempotent
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables = ["events", "pending_logs", "settings"];
        for table in tables {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "table {} should exist", table);
        }
    }
}
