//! Shared run context and the suspension-point helpers used by the engine
//! and the router.

use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::tool::ToolRegistry;

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Shared resources available to a run.
///
/// Contains only cross-component concerns. The engine and the router own
/// their configuration; this carries the model client, the read-only tool
/// registry and the caller's cancellation token.
#[derive(Debug, Clone)]
pub struct AgentContext {
    /// Shared LLM client.
    pub llm: Arc<LlmClient>,

    /// Read-only tool registry, safe for concurrent lookups.
    pub tools: Arc<ToolRegistry>,

    /// Cancellation token for cooperative shutdown.
    ///
    /// Checked at every model and tool call; a cancelled run stops before the
    /// next suspension point resumes.
    pub cancellation_token: CancellationToken,
}

impl AgentContext {
    /// Create a context with a fresh, never-cancelled token.
    pub fn new(llm: LlmClient, tools: ToolRegistry) -> Self {
        Self {
            llm: Arc::new(llm),
            tools: Arc::new(tools),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Create a context from already-shared resources.
    pub fn from_arcs(llm: Arc<LlmClient>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            llm,
            tools,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Replace the cancellation token, e.g. one wired to Ctrl+C.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation_token: CancellationToken) -> Self {
        self.cancellation_token = cancellation_token;
        self
    }
}

/// Calculate remaining time from a total timeout budget.
///
/// Returns an error if the timeout has already been exceeded.
pub(crate) fn remaining_time(
    start: Instant,
    total_timeout: Duration,
    phase: &str,
) -> Result<Duration, AgentError> {
    let elapsed = start.elapsed();
    if elapsed >= total_timeout {
        return Err(timeout_error(start, total_timeout, phase));
    }
    Ok(total_timeout - elapsed)
}

/// Create a timeout error with current elapsed time.
pub(crate) fn timeout_error(start: Instant, total_timeout: Duration, phase: &str) -> AgentError {
    AgentError::Timeout {
        elapsed_ms: start.elapsed().as_millis() as u64,
        timeout_ms: total_timeout.as_millis() as u64,
        phase: phase.to_string(),
    }
}

/// Execute a future with timeout and cancellation support.
///
/// Cancellation is checked first, so an already-cancelled token wins over a
/// ready future.
pub(crate) async fn with_timeout_and_cancellation<F, T>(
    future: F,
    timeout: Duration,
    cancellation_token: &CancellationToken,
    timeout_error_fn: impl FnOnce() -> AgentError,
) -> Result<T, AgentError>
where
    F: std::future::Future<Output = Result<T, AgentError>>,
{
    tokio::select! {
        biased;

        _ = cancellation_token.cancelled() => {
            Err(AgentError::Cancelled)
        }

        result = tokio::time::timeout(timeout, future) => {
            match result {
                Ok(inner) => inner,
                Err(_) => Err(timeout_error_fn()),
            }
        }
    }
}
