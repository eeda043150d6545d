//! HTTP API for the conversation simulator
//!
//! Each session owns exactly one conversation. Sessions live in memory until
//! they sit idle for longer than the session TTL; a conversation reaches the
//! database once it finishes.

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::SharedDriver;
use crate::state_machine::Conversation;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// One in-memory conversation and its bookkeeping
#[derive(Debug)]
pub struct Session {
    pub conv: Conversation,
    /// Last time a request touched this session
    pub last_active: DateTime<Utc>,
    /// Whether the conversation has been handed to the store
    pub archived: bool,
}

impl Session {
    fn new(conv: Conversation, now: DateTime<Utc>) -> Self {
        Self {
            conv,
            last_active: now,
            archived: false,
        }
    }

    fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_active).to_std().unwrap_or(Duration::ZERO)
    }
}

/// The mutex serializes turns within a session
pub type SessionHandle = Arc<Mutex<Session>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub driver: Arc<SharedDriver>,
    /// Cancelled on server shutdown; aborts in-flight generation
    pub shutdown: CancellationToken,
    /// Idle time after which a session is dropped from memory
    pub session_ttl: Duration,
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
}

impl AppState {
    pub fn new(
        driver: Arc<SharedDriver>,
        shutdown: CancellationToken,
        session_ttl: Duration,
    ) -> Self {
        Self {
            driver,
            shutdown,
            session_ttl,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn insert_session(&self, id: String, conv: Conversation) -> SessionHandle {
        let handle = Arc::new(Mutex::new(Session::new(conv, Utc::now())));
        self.sessions.write().await.insert(id, Arc::clone(&handle));
        handle
    }

    async fn session(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Drop sessions idle for at least the TTL. A finished conversation that
    /// never reached the store (its evaluation kept failing) is archived as
    /// it is. Sessions with a request in flight are skipped.
    pub async fn sweep_sessions_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, handle| {
            let Ok(session) = handle.try_lock() else {
                return true;
            };
            if session.idle_for(now) < self.session_ttl {
                return true;
            }
            if session.conv.is_finished() && !session.archived {
                drop(self.driver.archive(id, &session.conv));
            }
            tracing::debug!(
                session = %id,
                finished = session.conv.is_finished(),
                "Session evicted"
            );
            false
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "Idle sessions evicted");
        }
        evicted
    }

    #[cfg(test)]
    async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
