//! Text-generation backend
//!
//! Only OpenAI-compatible chat completions are supported. Every registered
//! service is wrapped in [`LoggingService`].

mod error;
mod models;
mod openai;
mod registry;
mod types;

pub use error::LlmError;
#[allow(unused_imports)] // Public API re-exports
pub use error::LlmErrorKind;
pub use models::{all_models, ModelDef};
pub use registry::{LlmConfig, ModelRegistry};
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// One completion endpoint for one model
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    fn model_id(&self) -> &str;
}

/// Records timing, token usage and failures of every completion
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = Instant::now();
        let result = self.inner.complete(request).await;
        let duration_ms = start.elapsed().as_millis();
        let model = self.inner.model_id();

        match &result {
            Ok(response) => tracing::info!(
                model,
                duration_ms = %duration_ms,
                json_output = request.json_output,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "Completion returned"
            ),
            Err(e) => tracing::error!(
                model,
                duration_ms = %duration_ms,
                json_output = request.json_output,
                kind = %e.kind,
                retryable = e.kind.is_retryable(),
                error = %e.message,
                "Completion failed"
            ),
        }

        result
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
