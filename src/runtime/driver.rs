//! Dialogue driver
//!
//! Runs one conversation from opener to archive. Backend calls are bounded by
//! a timeout and a cancellation token, and a failed call never changes the
//! conversation.

use super::traits::{ConversationStore, HumanInput, Purpose, TextGenerator};
use crate::config::{
    AppConfig, ConfigError, DEFAULT_EVALUATION_TEMPERATURE, DEFAULT_MAX_MESSAGES,
    DEFAULT_REPLY_TEMPERATURE, DEFAULT_TURN_TIMEOUT,
};
use crate::llm::LlmError;
use crate::prompts;
use crate::rate_limit::RateLimiter;
use crate::scenario::ScenarioSelector;
use crate::state_machine::{Conversation, Effect, Speaker, TransitionError};
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Tunables for one driver instance
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSettings {
    pub max_messages: u32,
    pub reply_temperature: f32,
    pub evaluation_temperature: f32,
    /// Upper bound on a single backend call
    pub turn_timeout: Duration,
    /// Attempts per reply or evaluation inside [`DialogueDriver::run`]
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            reply_temperature: DEFAULT_REPLY_TEMPERATURE,
            evaluation_temperature: DEFAULT_EVALUATION_TEMPERATURE,
            turn_timeout: DEFAULT_TURN_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl DriverSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_messages: config.max_messages,
            reply_temperature: config.reply_temperature,
            evaluation_temperature: config.evaluation_temperature,
            turn_timeout: config.turn_timeout,
            ..Self::default()
        }
    }
}

/// Why a driver operation did not go through. None of these change the
/// conversation.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Generation failed: {0}")]
    Generation(#[from] LlmError),
    #[error("Generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("Generation cancelled")]
    Cancelled,
    #[error("Backend reply did not match the expected format: {message}")]
    Parse { message: String, raw: String },
    #[error("Backend call limit reached for this session")]
    RateLimited,
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Expected a {expected} turn, but it is {actual}'s turn")]
    WrongTurn { expected: Speaker, actual: Speaker },
    #[error("Input closed before the conversation finished")]
    InputClosed,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DriverError {
    /// Whether asking the backend again may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Generation(e) => e.kind.is_retryable(),
            Self::Timeout(_) | Self::Parse { .. } => true,
            _ => false,
        }
    }
}

/// Orchestrates scenario selection, turns, evaluation and archiving
pub struct DialogueDriver<G, S> {
    generator: G,
    store: Arc<S>,
    limiter: Arc<dyn RateLimiter>,
    selector: Arc<ScenarioSelector>,
    settings: DriverSettings,
}

impl<G: TextGenerator, S: ConversationStore> DialogueDriver<G, S> {
    pub fn new(
        generator: G,
        store: S,
        limiter: Arc<dyn RateLimiter>,
        selector: Arc<ScenarioSelector>,
        settings: DriverSettings,
    ) -> Self {
        Self {
            generator,
            store: Arc::new(store),
            limiter,
            selector,
            settings,
        }
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// Pick a scenario and open a conversation on it
    pub fn start<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Conversation, ConfigError> {
        let scenario = self.selector.select(rng);
        Conversation::create(scenario, self.settings.max_messages)
    }

    /// Accept a human message. Blank input is rejected, not recorded.
    pub fn submit_human(&self, conv: &mut Conversation, text: &str) -> Result<(), DriverError> {
        if conv.is_finished() {
            return Err(TransitionError::Finished.into());
        }
        expect_turn(conv, Speaker::Human)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(DriverError::EmptyMessage);
        }
        conv.add_message(text)?;
        Ok(())
    }

    /// Ask the backend for the automated party's next message and append it.
    pub async fn generate_reply(
        &self,
        session: &str,
        conv: &mut Conversation,
        cancel: &CancellationToken,
    ) -> Result<String, DriverError> {
        if conv.is_finished() {
            return Err(TransitionError::Finished.into());
        }
        expect_turn(conv, Speaker::Automated)?;

        let prompt = prompts::build_reply_prompt(conv);
        let raw = self
            .call_backend(
                session,
                &prompt,
                self.settings.reply_temperature,
                Purpose::Reply,
                cancel,
            )
            .await?;

        let reply = prompts::parse_agent_response(&raw).map_err(|e| {
            tracing::warn!(session, error = %e, raw = %raw, "Backend contract drift: unparseable reply");
            DriverError::Parse {
                message: e.to_string(),
                raw: raw.clone(),
            }
        })?;

        conv.add_message(reply.clone())?;
        tracing::info!(
            session,
            remaining = conv.remaining_automated_turns(),
            finished = conv.is_finished(),
            "Automated reply accepted"
        );
        Ok(reply)
    }

    /// One evaluation call for a finished conversation; the result is stored
    /// on success. An evaluation already present is returned without a call.
    pub async fn evaluate(
        &self,
        session: &str,
        conv: &mut Conversation,
        cancel: &CancellationToken,
    ) -> Result<String, DriverError> {
        if let Some(existing) = conv.evaluation() {
            return Ok(existing.to_string());
        }
        if !conv.is_finished() {
            return Err(TransitionError::NotFinished.into());
        }

        let prompt = prompts::build_evaluation_prompt(conv);
        let text = self
            .call_backend(
                session,
                &prompt,
                self.settings.evaluation_temperature,
                Purpose::Evaluation,
                cancel,
            )
            .await?;

        let text = text.trim().to_string();
        conv.set_evaluation(text.clone())?;
        tracing::info!(session, "Evaluation stored");
        Ok(text)
    }

    /// Persist the conversation in the background. Failures are logged and
    /// never reach the conversation.
    pub fn archive(&self, conv_id: &str, conv: &Conversation) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let conv_id = conv_id.to_string();
        let snapshot = conv.to_snapshot();
        tokio::spawn(async move {
            match store.save(&conv_id, &snapshot, Utc::now()).await {
                Ok(()) => tracing::info!(conv_id = %conv_id, "Conversation archived"),
                Err(e) => {
                    tracing::error!(conv_id = %conv_id, error = %e, "Failed to archive conversation");
                }
            }
        })
    }

    /// Full lifecycle: opener, alternating turns, evaluation, archive.
    ///
    /// Returns the finished, evaluated conversation. If the evaluation cannot
    /// be obtained the conversation is still archived and shown, and the
    /// evaluation error is returned.
    pub async fn run<I, R>(
        &self,
        session: &str,
        input: &mut I,
        rng: &mut R,
        cancel: &CancellationToken,
    ) -> Result<Conversation, DriverError>
    where
        I: HumanInput + ?Sized,
        R: Rng + ?Sized,
    {
        let mut conv = self.start(rng)?;
        tracing::info!(
            session,
            max_messages = conv.max_messages(),
            "Conversation started"
        );
        input.begin(&conv).await;

        let mut outcome = Ok(());
        loop {
            match conv.next_effect() {
                Effect::AwaitHuman => {
                    let text = tokio::select! {
                        () = cancel.cancelled() => return Err(DriverError::Cancelled),
                        text = input.read_message() => text,
                    };
                    let Some(text) = text else {
                        tracing::info!(session, "Input closed mid-conversation");
                        return Err(DriverError::InputClosed);
                    };
                    match self.submit_human(&mut conv, &text) {
                        Ok(()) | Err(DriverError::EmptyMessage) => {}
                        Err(e) => return Err(e),
                    }
                }
                Effect::RequestReply => {
                    let mut attempt = 1;
                    let reply = loop {
                        match self.generate_reply(session, &mut conv, cancel).await {
                            Ok(reply) => break reply,
                            Err(e) => {
                                self.back_off(session, attempt, e, input, cancel).await?;
                                attempt += 1;
                            }
                        }
                    };
                    input.show_reply(&reply).await;
                }
                Effect::RequestEvaluation => {
                    let mut attempt = 1;
                    outcome = loop {
                        match self.evaluate(session, &mut conv, cancel).await {
                            Ok(_) => break Ok(()),
                            Err(e) => match self.back_off(session, attempt, e, input, cancel).await {
                                Ok(()) => attempt += 1,
                                Err(e) => break Err(e),
                            },
                        }
                    };
                    break;
                }
                Effect::Archive => break,
            }
        }

        // Awaited so a short-lived process does not drop the write
        if let Err(e) = self.archive(session, &conv).await {
            tracing::error!(session, error = %e, "Archive task failed");
        }
        input.finish(&conv).await;
        outcome.map(|()| conv)
    }

    /// Report a failed backend step and wait before the next attempt. Returns
    /// the error instead when it is permanent or attempts are used up.
    async fn back_off<I: HumanInput + ?Sized>(
        &self,
        session: &str,
        attempt: u32,
        error: DriverError,
        input: &mut I,
        cancel: &CancellationToken,
    ) -> Result<(), DriverError> {
        input.show_error(&error).await;
        if !error.is_retryable() || attempt >= self.settings.max_attempts {
            tracing::warn!(session, attempt, error = %error, "Giving up on backend step");
            return Err(error);
        }

        tracing::warn!(session, attempt, error = %error, "Backend step failed, retrying");
        let delay = match &error {
            DriverError::Generation(llm) => llm.retry_after.unwrap_or(self.settings.retry_delay),
            _ => self.settings.retry_delay,
        };
        tokio::select! {
            () = cancel.cancelled() => Err(DriverError::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// Rate limit, timeout and cancellation around one generator call.
    /// Only calls that reached the backend and came back are counted.
    async fn call_backend(
        &self,
        session: &str,
        prompt: &str,
        temperature: f32,
        purpose: Purpose,
        cancel: &CancellationToken,
    ) -> Result<String, DriverError> {
        if !self.limiter.allow(session) {
            tracing::warn!(session, ?purpose, "Backend call limit reached");
            return Err(DriverError::RateLimited);
        }

        let start = Instant::now();
        let timeout = self.settings.turn_timeout;
        let result = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                tracing::info!(session, ?purpose, "Generation cancelled");
                return Err(DriverError::Cancelled);
            }

            result = tokio::time::timeout(timeout, self.generator.generate(prompt, temperature, purpose)) => result,
        };

        let Ok(result) = result else {
            tracing::warn!(session, ?purpose, timeout_secs = timeout.as_secs(), "Generation timed out");
            return Err(DriverError::Timeout(timeout));
        };

        self.limiter.record_call(session);
        tracing::debug!(
            session,
            ?purpose,
            duration_ms = %start.elapsed().as_millis(),
            ok = result.is_ok(),
            "Backend call returned"
        );
        result.map_err(DriverError::from)
    }
}

fn expect_turn(conv: &Conversation, expected: Speaker) -> Result<(), DriverError> {
    let actual = conv.current_turn();
    if actual == expected {
        Ok(())
    } else {
        Err(DriverError::WrongTurn { expected, actual })
    }
}
