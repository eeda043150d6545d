//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the driver with mock implementations.

use super::DriverError;
use crate::db::{Database, DbError};
use crate::llm::{LlmError, LlmMessage, LlmRequest, ModelRegistry};
use crate::prompts::{EVALUATION_MAX_TOKENS, SYSTEM_PROMPT};
use crate::state_machine::{Conversation, ConversationSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// What a generation request is for; decides the output constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Next automated message, returned as a JSON object
    Reply,
    /// Free-text evaluation of the finished conversation
    Evaluation,
}

/// Text-generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        purpose: Purpose,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, Error)]
#[error("Persistence failed: {0}")]
pub struct PersistenceError(pub String);

impl From<DbError> for PersistenceError {
    fn from(e: DbError) -> Self {
        Self(e.to_string())
    }
}

/// Durable store for finished conversations
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    async fn save(
        &self,
        conv_id: &str,
        snapshot: &ConversationSnapshot,
        saved_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;
}

/// Front end that supplies human messages and displays progress
#[async_trait]
pub trait HumanInput: Send {
    /// Show the visible context and the opener
    async fn begin(&mut self, conv: &Conversation);

    /// Next human message, `None` once input is closed
    async fn read_message(&mut self) -> Option<String>;

    async fn show_reply(&mut self, reply: &str);

    async fn show_error(&mut self, error: &DriverError);

    /// Reveal the true context and the evaluation
    async fn finish(&mut self, conv: &Conversation);
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        purpose: Purpose,
    ) -> Result<String, LlmError> {
        (**self).generate(prompt, temperature, purpose).await
    }
}

#[async_trait]
impl<T: ConversationStore + ?Sized> ConversationStore for Arc<T> {
    async fn save(
        &self,
        conv_id: &str,
        snapshot: &ConversationSnapshot,
        saved_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        (**self).save(conv_id, snapshot, saved_at).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Build the provider request for a prompt.
///
/// Replies run under the system prompt as a user turn. The evaluation goes
/// out alone as an assistant-role message, with no system prompt.
pub fn build_request(prompt: &str, temperature: f32, purpose: Purpose) -> LlmRequest {
    let request = match purpose {
        Purpose::Reply => LlmRequest::new(LlmMessage::user(prompt))
            .with_system(SYSTEM_PROMPT)
            .with_json_output(),
        Purpose::Evaluation => {
            LlmRequest::new(LlmMessage::assistant(prompt)).with_max_tokens(EVALUATION_MAX_TOKENS)
        }
    };
    request.with_temperature(temperature)
}

/// Adapter to use `ModelRegistry` as `TextGenerator`
pub struct RegistryTextGenerator {
    registry: Arc<ModelRegistry>,
    model_id: String,
}

impl RegistryTextGenerator {
    pub fn new(registry: Arc<ModelRegistry>, model_id: String) -> Self {
        Self { registry, model_id }
    }
}

#[async_trait]
impl TextGenerator for RegistryTextGenerator {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        purpose: Purpose,
    ) -> Result<String, LlmError> {
        let llm = self
            .registry
            .get(&self.model_id)
            .or_else(|| self.registry.default())
            .ok_or_else(|| {
                LlmError::auth("No model available; set OPENAI_API_KEY or LLM_GATEWAY")
            })?;
        let response = llm
            .complete(&build_request(prompt, temperature, purpose))
            .await?;
        Ok(response.text)
    }
}

/// Adapter to use Database as `ConversationStore`
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[allow(dead_code)] // Useful for tests
    pub fn inner(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl ConversationStore for DatabaseStore {
    async fn save(
        &self,
        conv_id: &str,
        snapshot: &ConversationSnapshot,
        saved_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        self.db.save_conversation(conv_id, snapshot, saved_at)?;
        Ok(())
    }
}
