//! Scripted language model for offline, deterministic runs
//!
//! [`ScriptedModel`] replays a fixed sequence of responses, one per call, and
//! records every request it receives. Routers and engines can be exercised end
//! to end without a network:
//!
//! ```
//! use krishi_core::{LlmClient, LlmConfig, LlmRequest, ScriptedModel, ScriptedResponse};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let model = Arc::new(ScriptedModel::new(vec![
//!     ScriptedResponse::text("THOUGHT: easy\nFINAL_ANSWER: 4"),
//!     ScriptedResponse::error("provider unavailable"),
//! ]));
//! let client = LlmClient::from_arc(model.clone(), LlmConfig::default());
//!
//! let first = client.generate(LlmRequest::new("2+2?")).await;
//! assert!(first.unwrap().contains("FINAL_ANSWER"));
//! assert!(client.generate(LlmRequest::new("again")).await.is_err());
//! assert_eq!(model.call_count(), 2);
//! # }
//! ```

use crate::error::LlmError;
use crate::llm::{LanguageModel, LlmRequest};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedResponse {
    /// Return this text.
    Text(String),
    /// Fail with `LlmError::Other` carrying this message.
    Error(String),
    /// Never return; lets the caller's timeout or cancellation fire.
    Hang,
}

impl ScriptedResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }
}

/// Language model that replays scripted responses in order
///
/// Calls past the end of the script fail with `LlmError::NoContent`.
#[derive(Debug)]
pub struct ScriptedModel {
    responses: Vec<ScriptedResponse>,
    current_index: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    /// Create a model replaying the given responses.
    pub fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            responses,
            current_index: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Create a model replaying plain text responses.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(ScriptedResponse::text).collect())
    }

    /// Wait this long before answering each call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `generate` calls received so far.
    pub fn call_count(&self) -> usize {
        self.current_index.load(Ordering::SeqCst)
    }

    /// Check if all scripted responses have been consumed
    pub fn is_exhausted(&self) -> bool {
        self.call_count() >= self.responses.len()
    }

    /// Copies of every request received, in call order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, request: LlmRequest) {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(request),
            Err(poisoned) => poisoned.into_inner().push(request),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: LlmRequest) -> Result<String, LlmError> {
        self.record(request);
        let index = self.current_index.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.responses.get(index) {
            Some(ScriptedResponse::Text(text)) => Ok(text.clone()),
            Some(ScriptedResponse::Error(message)) => Err(LlmError::Other(message.clone())),
            Some(ScriptedResponse::Hang) => {
                std::future::pending::<()>().await;
                Err(LlmError::NoContent)
            }
            None => Err(LlmError::NoContent),
        }
    }
}
