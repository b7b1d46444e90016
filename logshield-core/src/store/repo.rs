//! Storage repository layer
//!
//! Bounded, durable record sets backed by a single SQLite database. The
//! connection is wrapped in a mutex; every read-modify-write (insert plus
//! eviction) runs inside one transaction under that lock, so concurrent
//! appends and evictions cannot lose updates.

use crate::error::{Error, Result};
use crate::types::{Event, EventCategory, PendingLogEntry};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Mutex;

/// Shared cap for the pending-retry set, across all categories.
pub const PENDING_CAP: usize = 100;

/// Database handle (single connection, mutex-guarded)
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode for better concurrency between the monitor loop and the
        // send worker
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    // ============================================
    // Event operations
    // ============================================

    /// Append an event, evicting oldest-by-timestamp records beyond the
    /// category cap.
    pub fn append_event(&self, category: EventCategory, payload: &str, ts_ms: i64) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO events (category, ts, payload) VALUES (?1, ?2, ?3)",
            params![category.as_str(), ts_ms, payload],
        )?;

        // Keep the newest `cap` rows by timestamp. Ties break on row id so
        // the result is stable under out-of-order writes.
        tx.execute(
            r#"
            DELETE FROM events
            WHERE category = ?1
              AND id NOT IN (
                SELECT id FROM events
                WHERE category = ?1
                ORDER BY ts DESC, id DESC
                LIMIT ?2
              )
            "#,
            params![category.as_str(), category.retention_cap() as i64],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Ordered (oldest first) copy of one category's retained events.
    pub fn snapshot_events(&self, category: EventCategory) -> Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT ts, payload FROM events WHERE category = ?1 ORDER BY ts ASC, id ASC",
        )?;
        let rows = stmt.query_map([category.as_str()], |row| {
            Ok(Event {
                timestamp_ms: row.get(0)?,
                category,
                payload: row.get(1)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// Number of retained events in one category.
    pub fn event_count(&self, category: EventCategory) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE category = ?1",
            [category.as_str()],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    /// Retained event counts for every category, in [`EventCategory::ALL`]
    /// order.
    pub fn event_counts(&self) -> Result<Vec<(String, usize)>> {
        EventCategory::ALL
            .iter()
            .map(|c| Ok((c.as_str().to_string(), self.event_count(*c)?)))
            .collect()
    }

    /// Drop all retained events across every category.
    pub fn clear_events(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM events", [])?;
        Ok(())
    }

    // ============================================
    // Pending-retry operations
    // ============================================

    /// Insert a failed record into the pending set, evicting the oldest
    /// entries by timestamp beyond [`PENDING_CAP`].
    pub fn enqueue_pending(&self, event_type: &str, message: &str, ts_ms: i64) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO pending_logs (ts, event_type, message) VALUES (?1, ?2, ?3)",
            params![ts_ms, event_type, message],
        )?;

        tx.execute(
            r#"
            DELETE FROM pending_logs
            WHERE id NOT IN (
                SELECT id FROM pending_logs
                ORDER BY ts DESC, id DESC
                LIMIT ?1
            )
            "#,
            params![PENDING_CAP as i64],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Ordered (oldest first) copy of the pending set.
    pub fn pending_entries(&self) -> Result<Vec<PendingLogEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, ts, event_type, message FROM pending_logs ORDER BY ts ASC, id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(PendingLogEntry {
                id: row.get(0)?,
                timestamp_ms: row.get(1)?,
                event_type: row.get(2)?,
                message: row.get(3)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// Depth of the pending set.
    pub fn pending_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pending_logs", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    /// Remove exactly the given entries (by id). Entries enqueued after the
    /// caller's snapshot are untouched.
    pub fn remove_pending(&self, ids: &[i64]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for id in ids {
            tx.execute("DELETE FROM pending_logs WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(())
    }

    // ============================================
    // Settings slots
    // ============================================

    /// Read one namespaced string slot.
    pub fn get_setting(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM settings WHERE namespace = ?1 AND key = ?2",
            params![namespace, key],
            |r| r.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    /// Write one namespaced string slot.
    pub fn set_setting(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO settings (namespace, key, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(namespace, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![namespace, key, value, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    /// Remove one slot.
    pub fn delete_setting(&self, namespace: &str, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM settings WHERE namespace = ?1 AND key = ?2",
            params![namespace, key],
        )?;
        Ok(())
    }

    /// Remove every slot in a namespace.
    pub fn clear_namespace(&self, namespace: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM settings WHERE namespace = ?1", params![namespace])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        let s = Store::open_in_memory().unwrap();
        s.migrate().unwrap();
        s
    }

    #[test]
    fn test_append_and_snapshot() {
        let s = store();
        s.append_event(EventCategory::App, "INSTALLED: Foo (com.foo)", 1000)
            .unwrap();
        s.append_event(EventCategory::App, "UNINSTALLED: Foo (com.foo)", 2000)
            .unwrap();

        let events = s.snapshot_events(EventCategory::App).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp_ms, 1000);
        assert_eq!(events[1].payload, "UNINSTALLED: Foo (com.foo)");
    }

    #[test]
    fn test_category_cap_enforced() {
        let s = store();
        let cap = EventCategory::Screen.retention_cap();
        for i in 0..(cap + 25) {
            s.append_event(EventCategory::Screen, &format!("Screen: ON #{}", i), i as i64)
                .unwrap();
        }
        assert_eq!(s.event_count(EventCategory::Screen).unwrap(), cap);

        // Exactly the most-recent `cap` events remain
        let events = s.snapshot_events(EventCategory::Screen).unwrap();
        assert_eq!(events[0].timestamp_ms, 25);
        assert_eq!(events.last().unwrap().timestamp_ms, (cap + 24) as i64);
    }

    #[test]
    fn test_eviction_is_oldest_by_timestamp_not_insertion_order() {
        let s = store();
        let cap = EventCategory::Screen.retention_cap() as i64;

        // Newest timestamps written first, then a spread of older ones
        s.append_event(EventCategory::Screen, "newest", 10_000).unwrap();
        for ts in 0..cap + 10 {
            s.append_event(EventCategory::Screen, "older", ts).unwrap();
        }

        let events = s.snapshot_events(EventCategory::Screen).unwrap();
        assert_eq!(events.len(), cap as usize);
        // The out-of-order "newest" write survives eviction
        assert_eq!(events.last().unwrap().payload, "newest");
    }

    #[test]
    fn test_categories_are_partitioned() {
        let s = store();
        s.append_event(EventCategory::App, "a", 1).unwrap();
        s.append_event(EventCategory::Power, "p", 1).unwrap();
        assert_eq!(s.event_count(EventCategory::App).unwrap(), 1);
        assert_eq!(s.event_count(EventCategory::Power).unwrap(), 1);
        assert_eq!(s.event_count(EventCategory::Screen).unwrap(), 0);
    }

    #[test]
    fn test_clear_events() {
        let s = store();
        s.append_event(EventCategory::App, "a", 1).unwrap();
        s.clear_events().unwrap();
        assert_eq!(s.event_count(EventCategory::App).unwrap(), 0);
    }

    #[test]
    fn test_pending_cap_and_no_dedup() {
        let s = store();
        for i in 0..(PENDING_CAP + 10) {
            // Identical payloads are distinct entries
            s.enqueue_pending("SCREEN_EVENT", "Screen: SCREEN_ON", i as i64)
                .unwrap();
        }
        assert_eq!(s.pending_count().unwrap(), PENDING_CAP);

        let entries = s.pending_entries().unwrap();
        assert_eq!(entries[0].timestamp_ms, 10);
    }

    #[test]
    fn test_remove_pending_by_id() {
        let s = store();
        s.enqueue_pending("A", "one", 1).unwrap();
        s.enqueue_pending("B", "two", 2).unwrap();
        let entries = s.pending_entries().unwrap();

        s.remove_pending(&[entries[0].id]).unwrap();
        let remaining = s.pending_entries().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].message, "two");
    }

    #[test]
    fn test_settings_roundtrip() {
        let s = store();
        assert_eq!(s.get_setting("agent", "server_url").unwrap(), None);

        s.set_setting("agent", "server_url", "10.0.0.5:1514").unwrap();
        assert_eq!(
            s.get_setting("agent", "server_url").unwrap().as_deref(),
            Some("10.0.0.5:1514")
        );

        // Upsert overwrites
        s.set_setting("agent", "server_url", "10.0.0.6").unwrap();
        assert_eq!(
            s.get_setting("agent", "server_url").unwrap().as_deref(),
            Some("10.0.0.6")
        );

        s.clear_namespace("agent").unwrap();
        assert_eq!(s.get_setting("agent", "server_url").unwrap(), None);
    }
}
