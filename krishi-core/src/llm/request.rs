//! LLM request type.

/// Request to the language model
///
/// Mirrors the consumed interface: system instructions, the ordered history
/// text, and the user-facing prompt. Generation settings are filled in from
/// [`LlmConfig`](crate::LlmConfig) by [`LlmClient`](super::LlmClient) when
/// left unset.
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct LlmRequest {
    /// User prompt
    pub prompt: String,

    /// Optional system instruction
    pub system_instruction: Option<String>,

    /// Ordered conversation/scratchpad text sent before the prompt
    pub history: Option<String>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl LlmRequest {
    /// Create a new LLM request with just a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Create a new LLM request with prompt and system instruction
    pub fn with_system(prompt: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_instruction: Some(system.into()),
            ..Default::default()
        }
    }

    /// Attach ordered history text. Empty text is ignored.
    #[must_use]
    pub fn with_history(mut self, history: impl Into<String>) -> Self {
        let history = history.into();
        if !history.trim().is_empty() {
            self.history = Some(history);
        }
        self
    }

    /// Set the maximum tokens for this request only.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for this request only.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}
