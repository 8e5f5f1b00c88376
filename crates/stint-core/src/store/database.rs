//! SQLite-based record storage and statistics.
//!
//! Provides persistent storage for:
//! - Finished timer runs (immutable time records)
//! - Aggregate statistics (daily and all-time)
//! - Key-value store for the active-run snapshot and alarm cue

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, StoreError};
use crate::record::{RecordSource, TimeRecord};

use super::data_dir;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecordStats {
    pub total_runs: u64,
    pub total_minutes: u64,
    pub today_runs: u64,
    pub today_minutes: u64,
}

/// SQLite database for time records.
///
/// Also hosts the kv table the active-run snapshots live in.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/stint.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("stint.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &std::path::Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and throwaway runs).
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS records (
                    id          TEXT PRIMARY KEY,
                    task_name   TEXT NOT NULL,
                    date        TEXT NOT NULL,
                    started_at  TEXT NOT NULL,
                    ended_at    TEXT NOT NULL,
                    category_id TEXT,
                    source      TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                -- Indexes for the review queries
                CREATE INDEX IF NOT EXISTS idx_records_date ON records(date);
                CREATE INDEX IF NOT EXISTS idx_records_started_at ON records(started_at);",
            )
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))
    }

    // ── Records ─────────────────────────────────────────────────────────

    /// Insert a finished run.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn insert_record(&self, record: &TimeRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO records (id, task_name, date, started_at, ended_at, category_id, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.to_string(),
                record.task_name,
                record.date.format("%Y-%m-%d").to_string(),
                record.started_at.to_rfc3339(),
                record.ended_at.to_rfc3339(),
                record.category_id,
                record.source.as_str(),
            ],
        )?;
        Ok(())
    }

    /// All records for one calendar day, oldest first.
    pub fn records_for_date(&self, date: NaiveDate) -> Result<Vec<TimeRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_name, date, started_at, ended_at, category_id, source
             FROM records WHERE date = ?1 ORDER BY started_at",
        )?;
        let rows = stmt.query_map(params![date.format("%Y-%m-%d").to_string()], row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Most recent records, newest first.
    pub fn recent_records(&self, limit: usize) -> Result<Vec<TimeRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_name, date, started_at, ended_at, category_id, source
             FROM records ORDER BY started_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn stats(&self) -> Result<RecordStats, StoreError> {
        let mut stats = RecordStats::default();

        let (count, minutes) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM((julianday(ended_at) - julianday(started_at)) * 1440.0), 0)
             FROM records",
            [],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, f64>(1)?)),
        )?;
        stats.total_runs = count;
        stats.total_minutes = minutes.max(0.0) as u64;

        let (count, minutes) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM((julianday(ended_at) - julianday(started_at)) * 1440.0), 0)
             FROM records WHERE date = date('now', 'localtime')",
            [],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, f64>(1)?)),
        )?;
        stats.today_runs = count;
        stats.today_minutes = minutes.max(0.0) as u64;

        Ok(stats)
    }

    // ── Key-value store ─────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key from the kv store. Missing keys are fine.
    pub fn kv_delete(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<TimeRecord> {
    let text_err = |idx: usize, e: Box<dyn std::error::Error + Send + Sync>| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e)
    };

    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id).map_err(|e| text_err(0, Box::new(e)))?;

    let date: String = row.get(2)?;
    let date =
        NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| text_err(2, Box::new(e)))?;

    let started_at: String = row.get(3)?;
    let started_at = DateTime::parse_from_rfc3339(&started_at)
        .map_err(|e| text_err(3, Box::new(e)))?
        .with_timezone(&Utc);

    let ended_at: String = row.get(4)?;
    let ended_at = DateTime::parse_from_rfc3339(&ended_at)
        .map_err(|e| text_err(4, Box::new(e)))?
        .with_timezone(&Utc);

    let source: String = row.get(6)?;
    let source = match source.as_str() {
        "manual" => RecordSource::Manual,
        _ => RecordSource::Timer,
    };

    Ok(TimeRecord {
        id,
        task_name: row.get(1)?,
        date,
        started_at,
        ended_at,
        category_id: row.get(5)?,
        source,
    })
}
