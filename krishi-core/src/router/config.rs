//! Configuration for the query router.

use super::specialist::Specialist;
use crate::error::AgentError;
use std::collections::HashSet;
use std::time::Duration;

/// Default classification system prompt.
///
/// Placeholder: `{agents}` (one `- id: description` line per specialist).
pub const DEFAULT_CLASSIFICATION_PROMPT: &str = r#"You are the query router of an agricultural assistant. Decide how the user's query should be handled.

Available agents:
{agents}

Modes:
- SIMPLE: each chosen agent answers directly in one step, without tools. Use it when the agents can answer from their own knowledge, including weather questions that name a location.
- ITERATIVE: step-by-step reasoning with tools. Use it when the query
  (a) needs several sequential steps of gathering information or computing,
  (b) depends on location-sensitive data such as weather and no location is given in the query or the recent conversation, or
  (c) needs real-time information.

Respond in exactly this format:
MODE: SIMPLE or ITERATIVE
AGENTS: [agent_id, ...]
PARALLEL: yes or no
REASONING: one short sentence

Examples:
"What's the weather in Mumbai?" -> MODE: SIMPLE, AGENTS: [weather], PARALLEL: no
"What's the weather today?" -> MODE: ITERATIVE, AGENTS: [weather], PARALLEL: no
"How much profit can I make from organic tomatoes?" -> MODE: SIMPLE, AGENTS: [organic_farming, financial], PARALLEL: yes
"Hello, how are you?" -> MODE: SIMPLE, AGENTS: [general], PARALLEL: no"#;

/// Configuration for [`QueryRouter`](super::QueryRouter).
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct RouterConfig {
    /// Routable specialists, in the order their answers are combined.
    ///
    /// Default: organic_farming, financial, weather, general
    pub specialists: Vec<Specialist>,

    /// Specialist used when nothing else matches. Must be registered.
    ///
    /// Default: "general"
    pub default_specialist: String,

    /// System prompt for the classification call
    pub classification_prompt: String,

    /// History turns sent with the classification request
    ///
    /// Default: 4
    pub classification_history_turns: usize,

    /// History turns sent with each SIMPLE answer
    ///
    /// Default: 5
    pub answer_history_turns: usize,

    /// Time budget for classification plus the SIMPLE answer calls.
    /// ITERATIVE runs use the engine's own budget.
    ///
    /// Default: 60 seconds
    pub total_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            specialists: Specialist::defaults(),
            default_specialist: "general".to_string(),
            classification_prompt: DEFAULT_CLASSIFICATION_PROMPT.to_string(),
            classification_history_turns: 4,
            answer_history_turns: 5,
            total_timeout: Duration::from_secs(60),
        }
    }
}

impl RouterConfig {
    #[must_use]
    pub fn with_specialists(mut self, specialists: Vec<Specialist>) -> Self {
        self.specialists = specialists;
        self
    }

    #[must_use]
    pub fn with_default_specialist(mut self, id: impl Into<String>) -> Self {
        self.default_specialist = id.into();
        self
    }

    #[must_use]
    pub fn with_classification_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.classification_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn with_classification_history_turns(mut self, turns: usize) -> Self {
        self.classification_history_turns = turns;
        self
    }

    #[must_use]
    pub fn with_answer_history_turns(mut self, turns: usize) -> Self {
        self.answer_history_turns = turns;
        self
    }

    #[must_use]
    pub fn with_total_timeout(mut self, total_timeout: Duration) -> Self {
        self.total_timeout = total_timeout;
        self
    }

    /// Look up a specialist by id.
    pub fn specialist(&self, id: &str) -> Option<&Specialist> {
        self.specialists.iter().find(|s| s.id == id)
    }

    /// Render the classification prompt with the specialist list.
    pub fn render_classification_prompt(&self) -> String {
        let agents = self
            .specialists
            .iter()
            .map(|s| format!("- {}: {}", s.id, s.description))
            .collect::<Vec<_>>()
            .join("\n");
        self.classification_prompt.replace("{agents}", &agents)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AgentError> {
        let mut errors = Vec::new();

        if self.specialists.is_empty() {
            errors.push("specialists cannot be empty".to_string());
        }
        let mut seen = HashSet::new();
        for specialist in &self.specialists {
            if specialist.id.trim().is_empty() {
                errors.push("specialist id cannot be empty".to_string());
            } else if !seen.insert(specialist.id.as_str()) {
                errors.push(format!("duplicate specialist id '{}'", specialist.id));
            }
            if specialist.system_prompt.trim().is_empty() {
                errors.push(format!("specialist '{}' has an empty system_prompt", specialist.id));
            }
        }
        if self.specialist(&self.default_specialist).is_none() {
            errors.push(format!(
                "default_specialist '{}' is not a registered specialist",
                self.default_specialist
            ));
        }
        if !self.classification_prompt.contains("{agents}") {
            errors.push("classification_prompt must contain {agents}".to_string());
        }
        if self.total_timeout.is_zero() {
            errors.push("total_timeout must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AgentError::InvalidConfig(errors.join("; ")))
        }
    }
}
