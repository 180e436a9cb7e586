//! Command-line argument parsing.

use crate::config::KrishiConfig;
use clap::Parser;
use krishi_core::{EmitterConfig, EngineConfig, LlmConfig, RouterConfig, DEFAULT_TOOL_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;

/// Agricultural assistant with bounded tool-using reasoning
#[derive(Parser, Debug)]
#[command(name = "krishi")]
#[command(about = "Ask the Krishi agricultural assistant a question", long_about = None)]
#[command(version)]
pub struct Args {
    /// Question to ask
    pub query: String,

    /// Config file (defaults to ./krishi.toml when present)
    #[arg(long, env = "KRISHI_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON file with prior turns: [{"role": "user", "content": "..."}, ...]
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// API key for the chat-completions endpoint
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "LLM_BASE_URL")]
    pub base_url: Option<String>,

    /// Model name
    #[arg(long, env = "LLM_DEFAULT_MODEL", default_value = krishi_openai::DEFAULT_MODEL)]
    pub model: String,

    /// Maximum reasoning iterations (model calls) per query
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Total timeout for the reasoning loop in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// LLM request timeout in seconds
    #[arg(long)]
    pub llm_timeout: Option<u64>,

    /// Maximum tokens per LLM request
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Temperature for LLM generation (0.0-2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Print the answer at once instead of pacing the words
    #[arg(long)]
    pub no_pacing: bool,

    /// Print run metadata to stderr as JSON
    #[arg(long)]
    pub metadata: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Effective configuration after file and flag overrides.
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmConfig,
    pub engine: EngineConfig,
    pub router: RouterConfig,
    pub emitter: EmitterConfig,
    pub tool_timeout: Duration,
}

impl Args {
    /// Validate arguments that clap cannot check on its own.
    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        if self.query.trim().is_empty() {
            errors.push("query cannot be empty".to_string());
        }
        if self.max_iterations == Some(0) {
            errors.push("--max-iterations must be greater than 0".to_string());
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                errors.push(format!("--temperature must be between 0.0 and 2.0, got {}", t));
            }
        }
        if self.api_key.is_none() && self.base_url.is_none() {
            errors.push("set LLM_API_KEY (or --api-key), or --base-url for a local server".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }

    /// Defaults, then the config file, then flags.
    pub fn settings(&self, file: &KrishiConfig) -> Settings {
        let mut llm = file.llm_config();
        if let Some(v) = self.llm_timeout {
            llm = llm.with_timeout(Duration::from_secs(v));
        }
        if let Some(v) = self.max_tokens {
            llm = llm.with_max_tokens(v);
        }
        if let Some(v) = self.temperature {
            llm = llm.with_temperature(v);
        }

        let mut engine = file.engine_config();
        if let Some(v) = self.max_iterations {
            engine = engine.with_max_iterations(v);
        }
        if let Some(v) = self.timeout {
            engine = engine.with_total_timeout(Duration::from_secs(v));
        }

        let mut emitter = file.emitter_config();
        if self.no_pacing {
            emitter = emitter.with_chunk_delay(Duration::ZERO);
        }

        Settings {
            llm,
            engine,
            router: file.router_config(),
            emitter,
            tool_timeout: file.tool_timeout().unwrap_or(DEFAULT_TOOL_TIMEOUT),
        }
    }
}
