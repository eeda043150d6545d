//! Per-session quota on backend calls
//!
//! Every generation request (reply or evaluation) counts as one call. The
//! quota is checked before a call is made and recorded after it returns.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Gatekeeper consulted before each backend call
pub trait RateLimiter: Send + Sync {
    /// Whether another call is allowed for this session right now
    fn allow(&self, session: &str) -> bool;

    /// Count one call against the session's quota
    fn record_call(&self, session: &str);
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: DateTime<Utc>,
    calls: u32,
}

/// Fixed-window limiter: `max_calls` per session per 24 hours
pub struct DailyRateLimiter {
    max_calls: u32,
    window: Duration,
    sessions: Mutex<HashMap<String, Window>>,
}

impl DailyRateLimiter {
    pub fn new(max_calls: u32) -> Self {
        Self {
            max_calls,
            window: Duration::hours(24),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn allow_at(&self, session: &str, now: DateTime<Utc>) -> bool {
        let Ok(sessions) = self.sessions.lock() else {
            tracing::error!(session, "Rate limiter state poisoned, refusing call");
            return false;
        };
        match sessions.get(session) {
            Some(w) if now - w.started < self.window => w.calls < self.max_calls,
            _ => self.max_calls > 0,
        }
    }

    pub fn record_call_at(&self, session: &str, now: DateTime<Utc>) {
        let Ok(mut sessions) = self.sessions.lock() else {
            tracing::error!(session, "Rate limiter state poisoned, call not recorded");
            return;
        };
        let window = self.window;
        if !sessions.contains_key(session) {
            // Windows that ran out carry no quota; forget them
            sessions.retain(|_, w| now - w.started < window);
        }
        let entry = sessions.entry(session.to_string()).or_insert(Window {
            started: now,
            calls: 0,
        });
        if now - entry.started >= window {
            *entry = Window {
                started: now,
                calls: 0,
            };
        }
        entry.calls = entry.calls.saturating_add(1);
    }

    /// Calls recorded in the session's current window
    #[allow(dead_code)] // Diagnostics and tests
    pub fn calls(&self, session: &str) -> u32 {
        self.sessions
            .lock()
            .ok()
            .and_then(|s| s.get(session).map(|w| w.calls))
            .unwrap_or(0)
    }
}

#[cfg(test)]
impl DailyRateLimiter {
    fn tracked_sessions(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl RateLimiter for DailyRateLimiter {
    fn allow(&self, session: &str) -> bool {
        self.allow_at(session, Utc::now())
    }

    fn record_call(&self, session: &str) {
        self.record_call_at(session, Utc::now());
    }
}
