use thiserror::Error;

/// Message shown to the user when a run fails.
///
/// Deliberately free of tool names, model output and transport detail; the
/// underlying error is logged instead.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "I'm sorry, I couldn't complete your request right now. Please try again in a moment.";

/// Errors that abort a run.
///
/// Tool failures, parse degradation and iteration exhaustion never show up
/// here: they are absorbed by the engine and turned into forward progress.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgentError {
    /// The language model call failed
    #[error("LLM client error: {0}")]
    Llm(#[from] LlmError),

    /// The run exceeded its time budget while waiting on the model
    #[error("Timeout after {elapsed_ms}ms (limit: {timeout_ms}ms) during {phase}")]
    Timeout {
        elapsed_ms: u64,
        timeout_ms: u64,
        phase: String,
    },

    /// The caller cancelled the run
    #[error("Execution cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Other run-level error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if this is a timeout error (run-level or model-level).
    ///
    /// # Example
    ///
    /// ```
    /// use krishi_core::{AgentError, LlmError};
    ///
    /// assert!(AgentError::Llm(LlmError::Timeout(3000)).is_timeout());
    /// assert!(!AgentError::Cancelled.is_timeout());
    /// ```
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            AgentError::Timeout { .. } | AgentError::Llm(LlmError::Timeout(_))
        )
    }

    /// Check if execution was cancelled by the caller.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AgentError::Cancelled | AgentError::Llm(LlmError::Cancelled))
    }

    /// The text shown to the end user for this error.
    ///
    /// Never includes the diagnostic detail carried by the error itself.
    pub fn user_message(&self) -> &'static str {
        if self.is_cancelled() {
            "Request cancelled."
        } else {
            GENERIC_FAILURE_MESSAGE
        }
    }
}

/// Errors raised by a language model transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LlmError {
    /// Request timed out
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider answered with a non-success status
    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Response processing error
    #[error("Failed to process response: {0}")]
    ResponseProcessing(String),

    /// No content in response
    #[error("No content in response")]
    NoContent,

    /// Request was cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// Other LLM error
    #[error("{0}")]
    Other(String),
}

/// Errors raised by a tool implementation.
///
/// Never fatal to a run: the adapter folds them into an error observation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolError {
    /// Invalid input provided to the tool.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tool execution failed.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Tool execution timed out.
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// The only error the tool adapter layer raises itself.
///
/// Either the name is not registered, or the tool's calling convention has
/// no form accepting the given parameter kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum UnsupportedToolError {
    #[error("Unknown tool '{name}'. Available tools: {available}")]
    UnknownTool { name: String, available: String },

    #[error("Tool '{tool}' does not accept a {kind} parameter")]
    IncompatibleParameter { tool: String, kind: &'static str },
}

/// Why model classification could not produce a routing decision.
///
/// Internal to the router: every variant triggers the keyword fallback.
#[derive(Debug, Error)]
pub(crate) enum RoutingError {
    #[error("classification call failed: {0}")]
    Model(#[from] AgentError),

    #[error("unparsable classification: {0}")]
    Unparsable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::unknown(
        UnsupportedToolError::UnknownTool { name: "search".into(), available: "calculate, get_weather".into() },
        "Unknown tool 'search'. Available tools: calculate, get_weather"
    )]
    #[case::incompatible(
        UnsupportedToolError::IncompatibleParameter { tool: "get_location".into(), kind: "string" },
        "Tool 'get_location' does not accept a string parameter"
    )]
    fn test_unsupported_tool_display(#[case] error: UnsupportedToolError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_tool_error_display() {
        assert_eq!(ToolError::InvalidInput("bad".into()).to_string(), "Invalid input: bad");
        assert_eq!(ToolError::Timeout(1000).to_string(), "Timeout after 1000ms");
    }

    #[rstest]
    #[case::cancelled(AgentError::Cancelled, &["cancelled"])]
    #[case::timeout(
        AgentError::Timeout { elapsed_ms: 5000, timeout_ms: 3000, phase: "iteration_2".into() },
        &["5000", "3000", "iteration_2"]
    )]
    #[case::invalid_config(
        AgentError::InvalidConfig("max_iterations must be greater than 0".into()),
        &["configuration", "max_iterations"]
    )]
    #[case::llm(AgentError::Llm(LlmError::NoContent), &["LLM", "No content"])]
    fn test_agent_error_display(#[case] error: AgentError, #[case] expected: &[&str]) {
        let display = error.to_string();
        for s in expected {
            assert!(display.contains(s), "Expected '{}' in '{}'", s, display);
        }
    }

    #[rstest]
    #[case::run_timeout(AgentError::Timeout { elapsed_ms: 1, timeout_ms: 1, phase: "x".into() }, true)]
    #[case::llm_timeout(AgentError::Llm(LlmError::Timeout(5000)), true)]
    #[case::cancelled(AgentError::Cancelled, false)]
    #[case::other(AgentError::Other("boom".into()), false)]
    fn test_is_timeout(#[case] error: AgentError, #[case] expected: bool) {
        assert_eq!(error.is_timeout(), expected);
    }

    #[rstest]
    #[case::cancelled(AgentError::Cancelled, true)]
    #[case::llm_cancelled(AgentError::Llm(LlmError::Cancelled), true)]
    #[case::llm_timeout(AgentError::Llm(LlmError::Timeout(5000)), false)]
    fn test_is_cancelled(#[case] error: AgentError, #[case] expected: bool) {
        assert_eq!(error.is_cancelled(), expected);
    }

    #[test]
    fn test_user_message_hides_detail() {
        let error = AgentError::Llm(LlmError::Status {
            status: 500,
            body: "stack trace: get_weather panicked".into(),
        });
        let message = error.user_message();
        assert_eq!(message, GENERIC_FAILURE_MESSAGE);
        assert!(!message.contains("get_weather"));
        assert!(!message.contains("500"));
    }

    #[test]
    fn test_llm_error_converts_to_agent_error() {
        let agent_err: AgentError = LlmError::RateLimit("quota".into()).into();
        assert!(matches!(agent_err, AgentError::Llm(LlmError::RateLimit(_))));
    }
}
