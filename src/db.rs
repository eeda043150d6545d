//! Durable store for finished conversations
//!
//! Each archived conversation is one row holding its JSON snapshot and the
//! time it was saved.

mod schema;

pub use schema::*;

use crate::state_machine::ConversationSnapshot;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
    #[error("Database connection lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Conversation Operations ====================

    /// Store a snapshot under `id`, replacing any earlier save of the same
    /// conversation
    pub fn save_conversation(
        &self,
        id: &str,
        snapshot: &ConversationSnapshot,
        saved_at: DateTime<Utc>,
    ) -> DbResult<SavedConversation> {
        let json = serde_json::to_string(snapshot)?;
        self.conn()?.execute(
            "INSERT INTO conversations (id, snapshot, finished, saved_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                snapshot = excluded.snapshot,
                finished = excluded.finished,
                saved_at = excluded.saved_at",
            params![id, json, snapshot.finished, saved_at.to_rfc3339()],
        )?;

        Ok(SavedConversation {
            id: id.to_string(),
            snapshot: snapshot.clone(),
            finished: snapshot.finished,
            saved_at,
        })
    }

    /// Get an archived conversation by ID
    #[allow(dead_code)] // Used in tests
    pub fn get_conversation(&self, id: &str) -> DbResult<SavedConversation> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, snapshot, finished, saved_at FROM conversations WHERE id = ?1",
        )?;

        let row = stmt
            .query_row(params![id], read_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    DbError::ConversationNotFound(id.to_string())
                }
                other => DbError::Sqlite(other),
            })?;
        row.decode()
    }

    /// All archived conversations, newest first
    #[allow(dead_code)] // Used in tests
    pub fn list_conversations(&self) -> DbResult<Vec<SavedConversation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, snapshot, finished, saved_at FROM conversations
             ORDER BY saved_at DESC",
        )?;

        let rows = stmt.query_map([], read_row)?;
        rows.map(|row| row.map_err(DbError::from).and_then(RawRow::decode))
            .collect()
    }

    pub fn count_conversations(&self) -> DbResult<usize> {
        let count: i64 =
            self.conn()?
                .query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

struct RawRow {
    id: String,
    snapshot: String,
    finished: bool,
    saved_at: String,
}

impl RawRow {
    fn decode(self) -> DbResult<SavedConversation> {
        Ok(SavedConversation {
            id: self.id,
            snapshot: serde_json::from_str(&self.snapshot)?,
            finished: self.finished,
            saved_at: parse_datetime(&self.saved_at),
        })
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        snapshot: row.get(1)?,
        finished: row.get(2)?,
        saved_at: row.get(3)?,
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
