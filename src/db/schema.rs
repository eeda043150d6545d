//! Database schema and record types

use crate::state_machine::ConversationSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    snapshot TEXT NOT NULL,
    finished BOOLEAN NOT NULL,
    saved_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversations_saved ON conversations(saved_at DESC);
";

/// One archived conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConversation {
    pub id: String,
    pub snapshot: ConversationSnapshot,
    pub finished: bool,
    pub saved_at: DateTime<Utc>,
}
