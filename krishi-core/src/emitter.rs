//! Streaming delivery of the final answer.
//!
//! Only the answer reaches the caller: it is sent in word-sized chunks with a
//! small pacing delay, followed by exactly one [`StreamItem::Done`] carrying
//! the run metadata. Intermediate reasoning steps are logged, never streamed.
//!
//! # Example
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use krishi_core::{AgentContext, AnswerEmitter, EmitterConfig, EngineConfig, LlmClient, LlmConfig};
//! use krishi_core::{Query, QueryRouter, RouterConfig, ScriptedModel, StreamItem, ToolRegistry};
//!
//! # async fn example() -> Result<(), krishi_core::AgentError> {
//! let model = ScriptedModel::from_texts(["MODE: SIMPLE\nAGENTS: [general]\nPARALLEL: no", "Hello!"]);
//! let context = AgentContext::new(LlmClient::new(model, LlmConfig::default()), ToolRegistry::new());
//! let router = QueryRouter::new(RouterConfig::default(), EngineConfig::default())?;
//! let emitter = AnswerEmitter::new(router, EmitterConfig::default());
//!
//! let stream = emitter.stream(Query::new("Hi"), context);
//! futures_util::pin_mut!(stream);
//! while let Some(item) = stream.next().await {
//!     match item {
//!         StreamItem::Chunk(text) => print!("{}", text),
//!         StreamItem::Done(completion) => println!("\n{:?}", completion.status),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::agent::AgentContext;
use crate::history::Query;
use crate::router::{Mode, QueryRouter, RespondError, RoutedAnswer, RoutingDecision, RoutingSource};
use crate::utils::word_chunks;

use async_stream::stream;
use futures_util::Stream;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Configuration for [`AnswerEmitter`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct EmitterConfig {
    /// Pause between chunks. Zero disables pacing.
    ///
    /// Default: 30 milliseconds
    pub chunk_delay: Duration,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            chunk_delay: Duration::from_millis(30),
        }
    }
}

impl EmitterConfig {
    #[must_use]
    pub fn with_chunk_delay(mut self, chunk_delay: Duration) -> Self {
        self.chunk_delay = chunk_delay;
        self
    }
}

/// One item of an answer stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// A piece of the answer, including its trailing whitespace.
    Chunk(String),
    /// End of the stream. Always the last item, sent exactly once.
    Done(Completion),
}

/// How the stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    /// The whole answer was delivered.
    Complete,
    /// Cancelled; `delivered` holds what was sent before.
    Incomplete,
    /// The run failed; nothing was delivered.
    Failed,
}

/// Side-channel information about a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunMetadata {
    /// Unset when the query was rejected before routing.
    pub mode: Option<Mode>,
    /// Specialists that answered, or those chosen when the run failed.
    pub specialists: Vec<String>,
    /// Model calls made by the reasoning loop; 0 for SIMPLE answers.
    pub iterations: usize,
    pub exhausted: bool,
    pub degraded: bool,
    pub routing_source: Option<RoutingSource>,
    pub elapsed_ms: u64,
}

impl RunMetadata {
    /// What is known once routing is done, before any answer exists.
    fn from_decision(decision: &RoutingDecision) -> Self {
        Self {
            mode: Some(decision.mode),
            specialists: decision.agents.clone(),
            routing_source: Some(decision.source),
            ..Self::default()
        }
    }

    fn from_answer(answer: &RoutedAnswer) -> Self {
        Self {
            mode: Some(answer.decision.mode),
            specialists: answer.answered_by.clone(),
            iterations: answer.run.as_ref().map_or(0, |run| run.iterations),
            exhausted: answer.run.as_ref().map_or(false, |run| run.is_exhausted()),
            degraded: answer.run.as_ref().map_or(false, |run| run.is_degraded()),
            routing_source: Some(answer.decision.source),
            elapsed_ms: 0,
        }
    }
}

/// The completion marker closing an answer stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub status: CompletionStatus,
    pub metadata: RunMetadata,
    /// Text sent before the stream ended.
    pub delivered: String,
    /// Generic user-facing message for incomplete or failed runs.
    pub message: Option<String>,
}

impl Completion {
    pub fn is_complete(&self) -> bool {
        self.status == CompletionStatus::Complete
    }
}

/// Runs queries through the router and streams their answers.
#[derive(Debug, Clone)]
pub struct AnswerEmitter {
    router: QueryRouter,
    config: EmitterConfig,
}

impl AnswerEmitter {
    pub fn new(router: QueryRouter, config: EmitterConfig) -> Self {
        Self { router, config }
    }

    pub fn router(&self) -> &QueryRouter {
        &self.router
    }

    /// Answer a query as a stream of chunks ending in one completion marker.
    ///
    /// Cancelling the context's token stops the run at its next suspension
    /// point, or stops delivery between chunks; either way the stream ends
    /// with an [`CompletionStatus::Incomplete`] marker.
    pub fn stream(&self, query: Query, context: AgentContext) -> impl Stream<Item = StreamItem> + Send + '_ {
        let router = &self.router;
        let chunk_delay = self.config.chunk_delay;

        stream! {
            let start = Instant::now();

            let answer = match router.try_respond(&query, &context).await {
                Ok(answer) => answer,
                Err(RespondError { error, decision }) => {
                    let status = if error.is_cancelled() {
                        log::info!("Run cancelled before an answer was ready");
                        CompletionStatus::Incomplete
                    } else {
                        log::error!("Run failed: {}", error);
                        CompletionStatus::Failed
                    };
                    let mut metadata = decision
                        .as_ref()
                        .map(RunMetadata::from_decision)
                        .unwrap_or_default();
                    metadata.elapsed_ms = start.elapsed().as_millis() as u64;
                    yield StreamItem::Done(Completion {
                        status,
                        metadata,
                        delivered: String::new(),
                        message: Some(error.user_message().to_string()),
                    });
                    return;
                }
            };

            if let Some(run) = &answer.run {
                for step in &run.steps {
                    log::debug!("Step {}", step);
                }
            }

            let mut metadata = RunMetadata::from_answer(&answer);
            let mut delivered = String::new();
            let mut cancelled = false;

            for (i, chunk) in word_chunks(&answer.text).into_iter().enumerate() {
                if i > 0 && !chunk_delay.is_zero() {
                    tokio::select! {
                        biased;
                        _ = context.cancellation_token.cancelled() => {}
                        _ = tokio::time::sleep(chunk_delay) => {}
                    }
                }
                if context.cancellation_token.is_cancelled() {
                    cancelled = true;
                    break;
                }
                delivered.push_str(chunk);
                yield StreamItem::Chunk(chunk.to_string());
            }

            metadata.elapsed_ms = start.elapsed().as_millis() as u64;
            let completion = if cancelled {
                log::info!(
                    "Delivery cancelled after {} of {} bytes",
                    delivered.len(),
                    answer.text.len()
                );
                Completion {
                    status: CompletionStatus::Incomplete,
                    metadata,
                    delivered,
                    message: Some("Request cancelled.".to_string()),
                }
            } else {
                log::info!(
                    "Answer delivered: mode={:?}, iterations={}, exhausted={}, {}ms",
                    metadata.mode,
                    metadata.iterations,
                    metadata.exhausted,
                    metadata.elapsed_ms
                );
                Completion {
                    status: CompletionStatus::Complete,
                    metadata,
                    delivered,
                    message: None,
                }
            };
            yield StreamItem::Done(completion);
        }
    }
}
