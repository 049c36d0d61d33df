//! SQLite-based workout history and key-value storage.
//!
//! Provides persistent storage for:
//! - Finished workout sessions (history)
//! - History statistics (per period)
//! - Key-value store for application state such as pending reminders

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{data_dir, migrations, KeyValueStore};
use crate::error::{CoreError, DatabaseError, Result};
use crate::session::{HistoryRecord, HistorySink, SessionStatus};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct HistoryStats {
    pub workouts: u64,
    pub completed: u64,
    pub total_secs: u64,
    pub calories: u64,
}

/// SQLite database for history and kv storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/repcue.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("repcue.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Append a finished session to the history.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_workout(&self, record: &HistoryRecord) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO workout_history
                (workout_name, completed_at, duration_secs, duration_label, calories, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.workout_name,
                record.completed_at.to_rfc3339(),
                record.duration_secs,
                record.duration,
                record.calories,
                record.status.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent history entries first.
    pub fn history(&self, limit: usize) -> Result<Vec<HistoryRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT workout_name, completed_at, duration_secs, duration_label, calories, status
             FROM workout_history
             ORDER BY completed_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u64>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (workout_name, completed_at, duration_secs, duration, calories, status) = row?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map_err(|e| DatabaseError::QueryFailed(format!("bad completed_at: {e}")))?
                .with_timezone(&Utc);
            let status = SessionStatus::parse(&status)
                .ok_or_else(|| DatabaseError::QueryFailed(format!("bad status: {status}")))?;
            records.push(HistoryRecord {
                workout_name,
                completed_at,
                duration,
                duration_secs,
                calories,
                status,
            });
        }
        Ok(records)
    }

    /// Totals over every session finished at or after `since`.
    pub fn stats_since(&self, since: DateTime<Utc>) -> Result<HistoryStats, DatabaseError> {
        let stats = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'complete' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(duration_secs), 0),
                    COALESCE(SUM(calories), 0)
             FROM workout_history
             WHERE completed_at >= ?1",
            params![since.to_rfc3339()],
            |row| {
                Ok(HistoryStats {
                    workouts: row.get(0)?,
                    completed: row.get(1)?,
                    total_secs: row.get(2)?,
                    calories: row.get(3)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Delete every history entry. Returns how many were removed.
    pub fn clear_history(&self) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute("DELETE FROM workout_history", [])?)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.kv_get(key).map_err(CoreError::from)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.kv_set(key, value).map_err(CoreError::from)
    }
}

impl HistorySink for Database {
    fn append(&mut self, record: &HistoryRecord) {
        if let Err(e) = self.record_workout(record) {
            warn!(error = %e, workout = %record.workout_name, "failed to write history record");
        }
    }
}
