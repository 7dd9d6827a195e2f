//! Append-only question history.
//!
//! Writes go through one mutex-guarded connection. File-backed logs read
//! through a fresh connection per call, so a reader sees a snapshot and
//! never waits behind the writer lock.

use crate::types::HistoryRecord;
use askpolicy_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chat_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        question TEXT NOT NULL,
        answer TEXT
    );
"#;

pub struct HistoryLog {
    writer: Mutex<Connection>,
    path: Option<PathBuf>,
}

fn history_err(context: &str) -> impl Fn(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::History(format!("{}: {}", context, e))
}

impl HistoryLog {
    /// Open (or create) the history database at `path`.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(history_err("Failed to open history"))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(history_err("Failed to configure history"))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
            .map_err(history_err("Failed to configure history"))?;
        conn.execute_batch(SCHEMA)
            .map_err(history_err("Failed to create history table"))?;

        tracing::debug!("Opened history log at {:?}", path);

        Ok(Self {
            writer: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// A history log that lives only as long as this value.
    pub fn in_memory() -> AppResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(history_err("Failed to open history"))?;
        conn.execute_batch(SCHEMA)
            .map_err(history_err("Failed to create history table"))?;

        Ok(Self {
            writer: Mutex::new(conn),
            path: None,
        })
    }

    fn writer(&self) -> MutexGuard<'_, Connection> {
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_reader<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> AppResult<T> {
        match &self.path {
            Some(path) => {
                let conn = Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )
                .map_err(history_err("Failed to open history for reading"))?;
                conn.busy_timeout(BUSY_TIMEOUT)
                    .map_err(history_err("Failed to configure history"))?;
                f(&conn).map_err(history_err("Failed to read history"))
            }
            None => f(&*self.writer()).map_err(history_err("Failed to read history")),
        }
    }

    /// Log a question that has no recorded answer.
    pub fn append(&self, question: &str) -> AppResult<i64> {
        self.record(question, None)
    }

    /// Log a question and, optionally, the answer given.
    pub fn record(&self, question: &str, answer: Option<&str>) -> AppResult<i64> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO chat_history (timestamp, question, answer) VALUES (?1, ?2, ?3)",
            params![Utc::now().to_rfc3339(), question, answer],
        )
        .map_err(history_err("Failed to append history"))?;

        Ok(conn.last_insert_rowid())
    }

    /// Most recent questions first.
    pub fn read_recent(&self, limit: usize) -> AppResult<Vec<String>> {
        self.with_reader(|conn| {
            let mut stmt =
                conn.prepare("SELECT question FROM chat_history ORDER BY id DESC LIMIT ?1")?;
            let rows = stmt.query_map([limit as i64], |row| row.get::<_, String>(0))?;
            rows.collect()
        })
    }

    /// Most recent records first.
    pub fn recent_records(&self, limit: usize) -> AppResult<Vec<HistoryRecord>> {
        let raw: Vec<(i64, String, String, Option<String>)> = self.with_reader(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, question, answer FROM chat_history ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map([limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?;
            rows.collect()
        })?;

        raw.into_iter()
            .map(|(id, timestamp, question, answer)| {
                let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                    .map_err(|e| {
                        AppError::History(format!("Bad timestamp on record {}: {}", id, e))
                    })?
                    .with_timezone(&Utc);
                Ok(HistoryRecord {
                    id,
                    timestamp,
                    question,
                    answer,
                })
            })
            .collect()
    }

    pub fn count(&self) -> AppResult<usize> {
        self.with_reader(|conn| {
            conn.query_row("SELECT COUNT(*) FROM chat_history", [], |row| {
                row.get::<_, i64>(0).map(|v| v as usize)
            })
        })
    }
}

impl std::fmt::Debug for HistoryLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryLog").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_read_recent_is_most_recent_first() {
        let log = HistoryLog::in_memory().unwrap();
        log.append("first").unwrap();
        log.append("second").unwrap();
        log.append("third").unwrap();

        assert_eq!(log.read_recent(2).unwrap(), vec!["third", "second"]);
        assert_eq!(log.read_recent(10).unwrap().len(), 3);
        assert_eq!(log.count().unwrap(), 3);
    }

    #[test]
    fn test_record_keeps_answer() {
        let log = HistoryLog::in_memory().unwrap();
        log.record("How many leave days?", Some("20 days.")).unwrap();
        log.append("hi").unwrap();

        let records = log.recent_records(5).unwrap();
        assert_eq!(records[0].question, "hi");
        assert_eq!(records[0].answer, None);
        assert_eq!(records[1].answer.as_deref(), Some("20 days."));
        assert!(records[0].id > records[1].id);
        assert!(records[0].timestamp >= records[1].timestamp);
    }

    #[test]
    fn test_file_log_persists_across_opens() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state/history.sqlite");

        {
            let log = HistoryLog::open(&path).unwrap();
            log.append("What is leave policy?").unwrap();
        }

        let log = HistoryLog::open(&path).unwrap();
        log.append("How many sick days?").unwrap();
        assert_eq!(
            log.read_recent(500).unwrap(),
            vec!["How many sick days?", "What is leave policy?"]
        );
    }

    #[test]
    fn test_concurrent_appends() {
        let temp = TempDir::new().unwrap();
        let log = Arc::new(HistoryLog::open(&temp.path().join("history.sqlite")).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        log.append(&format!("question {}-{}", t, i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.count().unwrap(), 100);
    }

    #[test]
    fn test_empty_log() {
        let log = HistoryLog::in_memory().unwrap();
        assert!(log.read_recent(500).unwrap().is_empty());
        assert_eq!(log.count().unwrap(), 0);
    }
}
