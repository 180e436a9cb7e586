//! Shared configuration.
//!
//! Contains only cross-component configuration. The engine, router and
//! emitter each own their configuration next to their implementation.

use crate::error::AgentError;
use std::time::Duration;

/// Configuration for the LLM client
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct LlmConfig {
    /// Maximum tokens per request
    ///
    /// Default: 1000
    pub max_tokens: u32,

    /// Timeout for individual LLM requests
    ///
    /// Default: 30 seconds
    pub timeout: Duration,

    /// Temperature for generation (0.0 - 1.0)
    ///
    /// Default: 0.7
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            timeout: Duration::from_secs(30),
            temperature: 0.7,
        }
    }
}

impl LlmConfig {
    /// Set the maximum tokens per request.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the timeout for individual LLM requests.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the temperature for generation (0.0 - 1.0).
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AgentError> {
        let mut errors = Vec::new();

        if self.max_tokens == 0 {
            errors.push("max_tokens must be greater than 0".to_string());
        }
        if self.timeout.is_zero() {
            errors.push("timeout must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            errors.push(format!(
                "temperature must be between 0.0 and 1.0, got {}",
                self.temperature
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AgentError::InvalidConfig(errors.join("; ")))
        }
    }
}
