//! # Krishi Core
//!
//! Bounded iterative reasoning for an agricultural assistant.
//!
//! A query is routed either to one or more specialists that answer directly,
//! or to a tool-using reasoning loop capped at a fixed number of model calls.
//! The final answer is streamed back word by word.
//!
//! ## Architecture
//!
//! - **Router**: model classification with a deterministic keyword fallback
//! - **Engine**: thought/action/observation loop over a tool registry
//! - **Tool adapters**: one `invoke` contract over tools with different calling conventions
//! - **Parser**: tolerant extraction of tagged sections from model text
//! - **Emitter**: answer-only chunk stream with a completion marker and run metadata
//!
//! ## Example
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use krishi_core::{AgentContext, AnswerEmitter, EmitterConfig, EngineConfig, LlmClient, LlmConfig};
//! use krishi_core::{Query, QueryRouter, RouterConfig, ScriptedModel, StreamItem, ToolRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let model = ScriptedModel::from_texts([
//!     "MODE: SIMPLE\nAGENTS: [organic_farming]\nPARALLEL: no",
//!     "Rotate tomatoes with legumes to break pest cycles.",
//! ]);
//! let context = AgentContext::new(LlmClient::new(model, LlmConfig::default()), ToolRegistry::new());
//! let router = QueryRouter::new(RouterConfig::default(), EngineConfig::default())?;
//! let emitter = AnswerEmitter::new(router, EmitterConfig::default());
//!
//! let stream = emitter.stream(Query::new("How do I keep pests off tomatoes?"), context);
//! futures_util::pin_mut!(stream);
//! while let Some(item) = stream.next().await {
//!     if let StreamItem::Chunk(text) = item {
//!         print!("{}", text);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod history;
pub mod llm;
pub mod mock_llm;
pub mod parser;
pub mod router;
pub mod tool;
pub mod utils;

// Re-export public API
pub use agent::AgentContext;
pub use config::LlmConfig;
pub use emitter::{AnswerEmitter, Completion, CompletionStatus, EmitterConfig, RunMetadata, StreamItem};
pub use engine::{EngineConfig, EnginePrompts, IterationEngine, IterationStep, RunOutcome, RunStatus};
pub use error::{AgentError, LlmError, ToolError, UnsupportedToolError, GENERIC_FAILURE_MESSAGE};
pub use history::{render_turns, Query, Role, Turn};
pub use llm::{LanguageModel, LlmClient, LlmRequest};
pub use mock_llm::{ScriptedModel, ScriptedResponse};
pub use parser::{parse, ParsedResponse};
pub use router::{
    Mode, QueryRouter, RespondError, RoutedAnswer, RouterConfig, RoutingDecision, RoutingSource,
    Specialist,
    DEFAULT_CLASSIFICATION_PROMPT,
};
pub use tool::{
    KeywordTool, NoArgTool, StructuredTool, TextTool, Tool, ToolAdapter, ToolBinding, ToolInput,
    ToolRegistry, ToolResult, DEFAULT_TOOL_TIMEOUT,
};
pub use utils::{truncate, word_chunks};
