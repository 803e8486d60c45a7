//! SQLite persistence for the MIB table and the event registry.
//!
//! One process-wide handle with single-writer discipline: in daemon mode the
//! [`Store`] lives inside the shared-state mutex, so every top-level call is
//! serialized with respect to every other. The schema batch is idempotent and
//! runs on every open.

use crate::error::Result;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use std::path::Path;

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS oids (
    oid      TEXT PRIMARY KEY,
    name     TEXT NOT NULL,
    datatype TEXT NOT NULL,
    access   INTEGER NOT NULL,
    value    TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS events (
    oid     TEXT NOT NULL,
    mode    TEXT NOT NULL,
    timeout INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (oid, mode)
);
CREATE TABLE IF NOT EXISTS event_commands (
    oid     TEXT NOT NULL,
    mode    TEXT NOT NULL,
    seq     INTEGER NOT NULL,
    command TEXT NOT NULL,
    PRIMARY KEY (oid, mode, seq)
);
";

/// Handle to the backing database.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create the database at `path` and run the schema batch.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Execute a batch of statements.
    pub fn exec(&self, batch: &str) -> Result<()> {
        self.conn.execute_batch(batch)?;
        Ok(())
    }

    /// Execute a single mutating statement, returning the affected row count.
    pub fn execute(&self, sql: &str, params: impl rusqlite::Params) -> Result<usize> {
        Ok(self.conn.execute(sql, params)?)
    }

    /// Run a query and return every row as a list of string columns.
    ///
    /// NULL renders as the empty string; integers render in decimal. The MIB
    /// schema only stores text and small integers, so nothing is lost in the
    /// stringly projection.
    pub fn select(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Vec<String>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ncols = stmt.column_count();
        let mapped = stmt.query_map(params, |row| {
            let mut cols = Vec::with_capacity(ncols);
            for i in 0..ncols {
                let rendered = match row.get_ref(i)? {
                    ValueRef::Null => String::new(),
                    ValueRef::Integer(n) => n.to_string(),
                    ValueRef::Real(f) => f.to_string(),
                    ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
                    ValueRef::Blob(b) => String::from_utf8_lossy(b).into_owned(),
                };
                cols.push(rendered);
            }
            Ok(cols)
        })?;

        let mut rows = Vec::new();
        for row in mapped {
            rows.push(row?);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    #[test]
    fn test_schema_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        // re-running the batch must not fail
        store.exec(super::SCHEMA).unwrap();
    }

    #[test]
    fn test_insert_and_select() {
        let store = Store::open_in_memory().unwrap();
        store
            .execute(
                "INSERT INTO oids (oid, name, datatype, access, value) VALUES (?1, ?2, ?3, ?4, ?5)",
                params!["1.3.6.1", "iso", "INTEGER", 1, "5"],
            )
            .unwrap();

        let rows = store
            .select("SELECT oid, name, datatype, access, value FROM oids", [])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], vec!["1.3.6.1", "iso", "INTEGER", "1", "5"]);
    }

    #[test]
    fn test_primary_key_enforced() {
        let store = Store::open_in_memory().unwrap();
        store
            .execute(
                "INSERT INTO oids (oid, name, datatype, access, value) VALUES (?1, ?2, ?3, ?4, ?5)",
                params!["1.3.6.1", "iso", "INTEGER", 1, "5"],
            )
            .unwrap();
        let dup = store.execute(
            "INSERT INTO oids (oid, name, datatype, access, value) VALUES (?1, ?2, ?3, ?4, ?5)",
            params!["1.3.6.1", "other", "INTEGER", 1, "6"],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mib.db");
        {
            let store = Store::open(&path).unwrap();
            store
                .execute(
                    "INSERT INTO events (oid, mode, timeout) VALUES (?1, ?2, ?3)",
                    params!["1.3.6.1", "AUTO", 5],
                )
                .unwrap();
        }
        // reopen and read back
        let store = Store::open(&path).unwrap();
        let rows = store.select("SELECT timeout FROM events", []).unwrap();
        assert_eq!(rows, vec![vec!["5".to_string()]]);
    }
}
