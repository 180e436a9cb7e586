//! TOML-serializable configuration types.
//!
//! These types mirror the core config structs but use serde-friendly types
//! (e.g., `u64` for seconds instead of `Duration`). Every field is optional;
//! unset fields keep the core defaults.

use krishi_core::{EmitterConfig, EngineConfig, LlmConfig, RouterConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure for the krishi.toml file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct KrishiConfig {
    pub llm: Option<LlmToml>,
    pub engine: Option<EngineToml>,
    pub router: Option<RouterToml>,
    pub emitter: Option<EmitterToml>,
    pub tools: Option<ToolsToml>,
}

/// `[llm]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct LlmToml {
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub temperature: Option<f32>,
}

/// `[engine]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct EngineToml {
    pub max_iterations: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub max_consecutive_tool_failures: Option<usize>,
    pub history_turns: Option<usize>,
    /// Must keep `{tool_descriptions}`
    pub system_prompt: Option<String>,
    /// Must keep `{query}` and `{scratchpad}`
    pub iteration_template: Option<String>,
}

/// `[router]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct RouterToml {
    pub timeout_secs: Option<u64>,
    pub classification_history_turns: Option<usize>,
    pub answer_history_turns: Option<usize>,
    /// Must keep `{agents}`
    pub classification_prompt: Option<String>,
}

/// `[emitter]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct EmitterToml {
    pub chunk_delay_ms: Option<u64>,
}

/// `[tools]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct ToolsToml {
    pub timeout_secs: Option<u64>,
}

impl KrishiConfig {
    /// Convert to LlmConfig, applying overrides to defaults.
    pub fn llm_config(&self) -> LlmConfig {
        let mut config = LlmConfig::default();
        if let Some(llm) = &self.llm {
            if let Some(v) = llm.max_tokens {
                config = config.with_max_tokens(v);
            }
            if let Some(v) = llm.timeout_secs {
                config = config.with_timeout(Duration::from_secs(v));
            }
            if let Some(v) = llm.temperature {
                config = config.with_temperature(v);
            }
        }
        config
    }

    /// Convert to EngineConfig, applying overrides to defaults.
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(engine) = &self.engine {
            if let Some(v) = engine.max_iterations {
                config = config.with_max_iterations(v);
            }
            if let Some(v) = engine.timeout_secs {
                config = config.with_total_timeout(Duration::from_secs(v));
            }
            if let Some(v) = engine.max_consecutive_tool_failures {
                config = config.with_max_consecutive_tool_failures(v);
            }
            if let Some(v) = engine.history_turns {
                config = config.with_history_turns(v);
            }
            if engine.system_prompt.is_some() || engine.iteration_template.is_some() {
                let mut prompts = config.prompts.clone();
                if let Some(v) = &engine.system_prompt {
                    prompts.system = v.clone();
                }
                if let Some(v) = &engine.iteration_template {
                    prompts.iteration_template = v.clone();
                }
                config = config.with_prompts(prompts);
            }
        }
        config
    }

    /// Convert to RouterConfig, applying overrides to defaults.
    pub fn router_config(&self) -> RouterConfig {
        let mut config = RouterConfig::default();
        if let Some(router) = &self.router {
            if let Some(v) = router.timeout_secs {
                config = config.with_total_timeout(Duration::from_secs(v));
            }
            if let Some(v) = router.classification_history_turns {
                config = config.with_classification_history_turns(v);
            }
            if let Some(v) = router.answer_history_turns {
                config = config.with_answer_history_turns(v);
            }
            if let Some(v) = &router.classification_prompt {
                config = config.with_classification_prompt(v.clone());
            }
        }
        config
    }

    /// Convert to EmitterConfig, applying overrides to defaults.
    pub fn emitter_config(&self) -> EmitterConfig {
        let mut config = EmitterConfig::default();
        if let Some(v) = self.emitter.as_ref().and_then(|e| e.chunk_delay_ms) {
            config = config.with_chunk_delay(Duration::from_millis(v));
        }
        config
    }

    /// Per-call tool timeout, if configured.
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tools
            .as_ref()
            .and_then(|t| t.timeout_secs)
            .map(Duration::from_secs)
    }
}
