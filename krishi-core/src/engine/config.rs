//! Configuration for the iteration engine.

use crate::error::AgentError;
use std::time::Duration;

/// Prompts used by the iteration engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EnginePrompts {
    /// System instruction for the reasoning loop
    ///
    /// Placeholders: `{tool_descriptions}`, `{max_iterations}`
    pub system: String,

    /// Template for each iteration
    ///
    /// Placeholders: `{query}`, `{scratchpad}`
    pub iteration_template: String,
}

impl EnginePrompts {
    /// Render the system instruction with the tool list and iteration budget
    pub fn render_system(&self, tool_descriptions: &str, max_iterations: usize) -> String {
        let tools = if tool_descriptions.trim().is_empty() {
            "(no tools available)"
        } else {
            tool_descriptions
        };
        fill(
            &self.system,
            &[
                ("{tool_descriptions}", tools),
                ("{max_iterations}", max_iterations.to_string().as_str()),
            ],
        )
    }

    /// Render the iteration prompt with placeholders substituted
    pub fn render_iteration(&self, query: &str, scratchpad: &str) -> String {
        fill(
            &self.iteration_template,
            &[("{query}", query), ("{scratchpad}", scratchpad)],
        )
    }

    /// Validate that prompts are non-empty and contain required placeholders
    pub fn validate(&self) -> Result<(), AgentError> {
        let mut errors = Vec::new();

        if self.system.trim().is_empty() {
            errors.push("system cannot be empty".to_string());
        }
        if !self.system.contains("{tool_descriptions}") {
            errors.push("system must contain {tool_descriptions}".to_string());
        }
        if self.iteration_template.trim().is_empty() {
            errors.push("iteration_template cannot be empty".to_string());
        }
        if !self.iteration_template.contains("{query}") {
            errors.push("iteration_template must contain {query}".to_string());
        }
        if !self.iteration_template.contains("{scratchpad}") {
            errors.push("iteration_template must contain {scratchpad}".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AgentError::InvalidConfig(errors.join("; ")))
        }
    }
}

/// Substitute placeholders in one pass over the template.
///
/// Substituted values are never scanned again, so placeholder text inside a
/// query or tool description stays literal.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match values.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

impl Default for EnginePrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an agricultural assistant that solves problems step by step, using tools when you need information you do not have.

You work in iterations:
1. THOUGHT: reason about the situation and decide what to do next
2. ACTION: pick one tool to call, if you need one
3. OBSERVATION: the tool result is given back to you
Repeat until you can answer.

Available tools:
{tool_descriptions}

Rules:
- You have at most {max_iterations} iterations
- Call one tool per iteration and only when it moves you closer to the answer
- Never write OBSERVATION yourself; it comes from the tool
- As soon as you have enough information, give the FINAL_ANSWER

Respond in exactly one of these formats.

To use a tool:
THOUGHT: <your reasoning>
ACTION: <tool_name>
ACTION_INPUT: <parameters as JSON, or leave empty if the tool takes none>

To answer:
THOUGHT: <your final reasoning>
FINAL_ANSWER: <your complete answer to the user>

Example:
THOUGHT: I need the weather for the user's location.
ACTION: get_weather
ACTION_INPUT: {"location": "Rajkot"}"#
                .to_string(),

            iteration_template: r#"Question: {query}

{scratchpad}
Continue with your next step, or give the FINAL_ANSWER if you are ready."#
                .to_string(),
        }
    }
}

/// Configuration for the iteration engine
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct EngineConfig {
    /// Maximum number of model calls in one run
    ///
    /// Default: 5
    pub max_iterations: usize,

    /// Overall timeout for the entire run
    ///
    /// Default: 120 seconds
    pub total_timeout: Duration,

    /// Failed tool calls in a row after which the model is told to stop
    /// calling tools and answer
    ///
    /// Default: 3
    pub max_consecutive_tool_failures: usize,

    /// Prior conversation turns included in every prompt
    ///
    /// Default: 5
    pub history_turns: usize,

    /// Prompts configuration
    pub prompts: EnginePrompts,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            total_timeout: Duration::from_secs(120),
            max_consecutive_tool_failures: 3,
            history_turns: 5,
            prompts: EnginePrompts::default(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_total_timeout(mut self, total_timeout: Duration) -> Self {
        self.total_timeout = total_timeout;
        self
    }

    #[must_use]
    pub fn with_max_consecutive_tool_failures(mut self, failures: usize) -> Self {
        self.max_consecutive_tool_failures = failures;
        self
    }

    #[must_use]
    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    #[must_use]
    pub fn with_prompts(mut self, prompts: EnginePrompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AgentError> {
        let mut errors = Vec::new();

        if self.max_iterations == 0 {
            errors.push("max_iterations must be greater than 0".to_string());
        }
        if self.total_timeout.is_zero() {
            errors.push("total_timeout must be greater than 0".to_string());
        }
        if self.max_consecutive_tool_failures == 0 {
            errors.push("max_consecutive_tool_failures must be greater than 0".to_string());
        }
        if let Err(AgentError::InvalidConfig(prompt_errors)) = self.prompts.validate() {
            errors.push(prompt_errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AgentError::InvalidConfig(errors.join("; ")))
        }
    }
}
