use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS logs (
  id INTEGER PRIMARY KEY,
  exercise TEXT,
  metrics TEXT,
  feedback TEXT,
  ts DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS workout_sessions (
  id INTEGER PRIMARY KEY,
  start_time DATETIME DEFAULT CURRENT_TIMESTAMP,
  end_time DATETIME,
  summary TEXT
);
"#;

/// One generated feedback line with the metrics that prompted it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackLog {
    pub id: i64,
    pub exercise: String,
    /// Metrics snapshot as JSON text
    pub metrics: String,
    pub feedback: String,
    pub ts: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutSession {
    pub id: i64,
    pub start_time: String,
    pub end_time: Option<String>,
    pub summary: Option<String>,
}

/// SQLite-backed workout log
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!("Opened workout database at {}", path.display());
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    /// Create tables if they are missing
    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn log_feedback(&self, exercise: &str, metrics_json: &str, feedback: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO logs (exercise, metrics, feedback) VALUES (?1, ?2, ?3)",
            params![exercise, metrics_json, feedback],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, exercise, "feedback logged");
        Ok(id)
    }

    pub fn start_session(&self) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO workout_sessions (start_time) VALUES (CURRENT_TIMESTAMP)",
            [],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Close a session. Returns `false` when no row has that id.
    pub fn end_session(&self, id: i64, summary: Option<&str>) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE workout_sessions SET end_time = CURRENT_TIMESTAMP, summary = ?1 WHERE id = ?2",
            params![summary, id],
        )?;
        Ok(changed > 0)
    }

    pub fn session(&self, id: i64) -> Result<Option<WorkoutSession>> {
        let session = self
            .conn
            .query_row(
                "SELECT id, start_time, end_time, summary FROM workout_sessions WHERE id = ?1",
                params![id],
                |row| {
                    Ok(WorkoutSession {
                        id: row.get(0)?,
                        start_time: row.get(1)?,
                        end_time: row.get(2)?,
                        summary: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    /// Most recent feedback first
    pub fn recent_logs(&self, limit: usize) -> Result<Vec<FeedbackLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, exercise, metrics, feedback, ts FROM logs ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(FeedbackLog {
                id: row.get(0)?,
                exercise: row.get(1)?,
                metrics: row.get(2)?,
                feedback: row.get(3)?,
                ts: row.get(4)?,
            })
        })?;
        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let store = Store::open_in_memory().unwrap();
        let id = store.start_session().unwrap();
        let open = store.session(id).unwrap().unwrap();
        assert!(open.end_time.is_none());
        assert!(!open.start_time.is_empty());

        assert!(store.end_session(id, Some("3 sets of squats")).unwrap());
        let closed = store.session(id).unwrap().unwrap();
        assert!(closed.end_time.is_some());
        assert_eq!(closed.summary.as_deref(), Some("3 sets of squats"));
    }

    #[test]
    fn test_end_unknown_session_changes_nothing() {
        let store = Store::open_in_memory().unwrap();
        assert!(!store.end_session(42, Some("x")).unwrap());
        assert!(store.session(42).unwrap().is_none());
    }

    #[test]
    fn test_session_ids_increase() {
        let store = Store::open_in_memory().unwrap();
        let a = store.start_session().unwrap();
        let b = store.start_session().unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_recent_logs_newest_first() {
        let store = Store::open_in_memory().unwrap();
        store.log_feedback("squat", "{}", "first").unwrap();
        store.log_feedback("squat", "{}", "second").unwrap();
        store.log_feedback("lunge", "{}", "third").unwrap();

        let logs = store.recent_logs(2).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].feedback, "third");
        assert_eq!(logs[0].exercise, "lunge");
        assert_eq!(logs[1].feedback, "second");
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        store.migrate().unwrap();
        assert_eq!(store.recent_logs(10).unwrap().len(), 0);
    }
}
