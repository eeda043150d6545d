//! Mock implementations for testing
//!
//! These mocks enable driver and API tests without a real backend or store.

use super::traits::*;
use super::DriverError;
use crate::llm::LlmError;
use crate::state_machine::{Conversation, ConversationSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Scripted generator
// ============================================================================

/// One recorded call to a mock generator
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateCall {
    pub prompt: String,
    pub temperature: f32,
    pub purpose: Purpose,
}

/// Generator that returns queued outputs in order
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<GenerateCall>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a well-formed reply for the automated party
    pub fn queue_reply(&self, text: &str) {
        let raw = serde_json::json!({ "agent_response": text }).to_string();
        self.queue_raw(raw);
    }

    /// Queue backend output verbatim (evaluations, malformed replies)
    pub fn queue_raw(&self, raw: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(raw.into()));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<GenerateCall> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, prompt: &str, temperature: f32, purpose: Purpose) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(GenerateCall {
            prompt: prompt.to_string(),
            temperature,
            purpose,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        purpose: Purpose,
    ) -> Result<String, LlmError> {
        self.next(prompt, temperature, purpose)
    }
}

// ============================================================================
// Delayed generator (for timeout and cancellation testing)
// ============================================================================

/// Scripted generator that sleeps before answering
pub struct DelayedGenerator {
    inner: ScriptedGenerator,
    delay: Duration,
    /// Notified when a request starts; holds a permit if nobody is waiting yet
    pub request_started: Arc<Notify>,
}

impl DelayedGenerator {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: ScriptedGenerator::new(),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_reply(&self, text: &str) {
        self.inner.queue_reply(text);
    }
}

#[async_trait]
impl TextGenerator for DelayedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        purpose: Purpose,
    ) -> Result<String, LlmError> {
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.next(prompt, temperature, purpose)
    }
}

// ============================================================================
// Stores
// ============================================================================

/// Store that keeps every save in memory
#[derive(Default)]
pub struct RecordingStore {
    saved: Mutex<Vec<(String, ConversationSnapshot, DateTime<Utc>)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<(String, ConversationSnapshot)> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|(id, snapshot, _)| (id.clone(), snapshot.clone()))
            .collect()
    }

    /// Poll until `count` saves landed; background archiving is not awaited
    /// by every caller
    pub async fn wait_for_saves(&self, count: usize) -> Vec<(String, ConversationSnapshot)> {
        for _ in 0..200 {
            let saved = self.saved();
            if saved.len() >= count {
                return saved;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.saved()
    }
}

#[async_trait]
impl ConversationStore for RecordingStore {
    async fn save(
        &self,
        conv_id: &str,
        snapshot: &ConversationSnapshot,
        saved_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        self.saved
            .lock()
            .unwrap()
            .push((conv_id.to_string(), snapshot.clone(), saved_at));
        Ok(())
    }
}

/// Store whose every save fails
pub struct FailingStore;

#[async_trait]
impl ConversationStore for FailingStore {
    async fn save(
        &self,
        _conv_id: &str,
        _snapshot: &ConversationSnapshot,
        _saved_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        Err(PersistenceError("disk full".to_string()))
    }
}

// ============================================================================
// Scripted human
// ============================================================================

/// Front end that types pre-written lines and records what it was shown
#[derive(Default)]
pub struct ScriptedHuman {
    lines: VecDeque<String>,
    /// Once the lines run out, wait instead of reporting closed input
    hold_open: bool,
    pub begun: bool,
    pub replies: Vec<String>,
    pub errors: Vec<String>,
    pub finished: Option<Conversation>,
}

impl ScriptedHuman {
    pub fn new<I, T>(lines: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Keep the input open after the scripted lines, like an idle terminal
    pub fn pending_forever(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

#[async_trait]
impl HumanInput for ScriptedHuman {
    async fn begin(&mut self, _conv: &Conversation) {
        self.begun = true;
    }

    async fn read_message(&mut self) -> Option<String> {
        match self.lines.pop_front() {
            Some(line) => Some(line),
            None if self.hold_open => std::future::pending().await,
            None => None,
        }
    }

    async fn show_reply(&mut self, reply: &str) {
        self.replies.push(reply.to_string());
    }

    async fn show_error(&mut self, error: &DriverError) {
        self.errors.push(error.to_string());
    }

    async fn finish(&mut self, conv: &Conversation) {
        self.finished = Some(conv.clone());
    }
}
