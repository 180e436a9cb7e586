//! LLM client implementation.

use super::request::LlmRequest;
use crate::config::LlmConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// A language model transport.
///
/// Implementations return the raw response text. No guarantee is made that
/// the text follows any grammar; callers parse defensively.
#[async_trait]
pub trait LanguageModel: Send + Sync + fmt::Debug {
    /// Model identifier, used for logging.
    fn name(&self) -> &str;

    /// Generate a complete response for the request.
    async fn generate(&self, request: LlmRequest) -> Result<String, LlmError>;
}

/// LLM client wrapping a [`LanguageModel`] with timeout and configuration
///
/// There is no retry: a failed call is reported to the caller as-is.
#[derive(Clone)]
pub struct LlmClient {
    model: Arc<dyn LanguageModel>,
    config: LlmConfig,
}

impl fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmClient")
            .field("model", &self.model.name())
            .field("config", &self.config)
            .finish()
    }
}

impl LlmClient {
    /// Create a new client owning the given model
    pub fn new(model: impl LanguageModel + 'static, config: LlmConfig) -> Self {
        Self {
            model: Arc::new(model),
            config,
        }
    }

    /// Create a client from a shared model instance
    pub fn from_arc(model: Arc<dyn LanguageModel>, config: LlmConfig) -> Self {
        Self { model, config }
    }

    /// Get a reference to the LLM configuration.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Name of the underlying model.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Generate a complete response.
    ///
    /// # Errors
    ///
    /// - `LlmError::InvalidRequest` if the prompt is empty
    /// - `LlmError::Timeout` if the call exceeds `config.timeout`
    /// - `LlmError::NoContent` if the model returns blank text
    /// - any error raised by the transport
    pub async fn generate(&self, mut request: LlmRequest) -> Result<String, LlmError> {
        if request.prompt.trim().is_empty() {
            return Err(LlmError::InvalidRequest(
                "Prompt cannot be empty".to_string(),
            ));
        }

        request.max_tokens.get_or_insert(self.config.max_tokens);
        request.temperature.get_or_insert(self.config.temperature);

        let start = Instant::now();
        log::debug!(
            "LLM request to {} ({} prompt chars, {} history chars)",
            self.model.name(),
            request.prompt.len(),
            request.history.as_ref().map_or(0, |h| h.len())
        );

        let text = match tokio::time::timeout(self.config.timeout, self.model.generate(request))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                log::warn!(
                    "LLM request to {} timed out after {:?}",
                    self.model.name(),
                    self.config.timeout
                );
                return Err(LlmError::Timeout(self.config.timeout.as_millis() as u64));
            }
        };

        if text.trim().is_empty() {
            return Err(LlmError::NoContent);
        }

        log::debug!(
            "LLM response from {} in {}ms ({} chars)",
            self.model.name(),
            start.elapsed().as_millis(),
            text.len()
        );
        Ok(text)
    }
}
