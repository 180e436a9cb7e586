//! Query routing and dispatch.
//!
//! The router decides, once per query, whether a question can be answered
//! directly by one or more specialists (SIMPLE) or needs the tool-using
//! reasoning loop (ITERATIVE), and which specialists are involved.
//!
//! Routing cascades through two strategies:
//!
//! 1. A model classification call with explicit rules.
//! 2. Deterministic keyword matching, used whenever the call fails, times out
//!    or returns something that cannot be read.
//!
//! Classification failure never reaches the caller.
//!
//! # Example
//!
//! ```no_run
//! use krishi_core::{AgentContext, EngineConfig, LlmClient, LlmConfig, Query};
//! use krishi_core::{QueryRouter, RouterConfig, ScriptedModel, ToolRegistry};
//!
//! # async fn example() -> Result<(), krishi_core::AgentError> {
//! let model = ScriptedModel::from_texts([
//!     "MODE: SIMPLE\nAGENTS: [weather]\nPARALLEL: no\nREASONING: location given",
//!     "Expect light showers in Mumbai this afternoon.",
//! ]);
//! let context = AgentContext::new(LlmClient::new(model, LlmConfig::default()), ToolRegistry::new());
//! let router = QueryRouter::new(RouterConfig::default(), EngineConfig::default())?;
//!
//! let answer = router.respond(&Query::new("What's the weather in Mumbai?"), &context).await?;
//! assert_eq!(answer.decision.agents, vec!["weather"]);
//! # Ok(())
//! # }
//! ```

mod classify;
mod config;
mod specialist;

pub use config::{RouterConfig, DEFAULT_CLASSIFICATION_PROMPT};
pub use specialist::Specialist;

use classify::{parse_classification, KeywordRouter};

use crate::agent::{remaining_time, timeout_error, with_timeout_and_cancellation, AgentContext};
use crate::engine::{EngineConfig, IterationEngine, RunOutcome};
use crate::error::{AgentError, RoutingError};
use crate::history::{render_turns, Query};
use crate::llm::LlmRequest;
use crate::utils::truncate;

use futures_util::future::join_all;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use thiserror::Error;

/// How a query is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One direct model call per specialist, no tools.
    Simple,
    /// The bounded reasoning loop with tools.
    Iterative,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Simple => write!(f, "SIMPLE"),
            Mode::Iterative => write!(f, "ITERATIVE"),
        }
    }
}

/// Which strategy produced a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingSource {
    Model,
    KeywordFallback,
}

/// The routing decision for one query. Produced once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub mode: Mode,
    /// Specialist ids, without duplicates, in dispatch order.
    pub agents: Vec<String>,
    /// Ask the specialists concurrently. Only meaningful for several agents.
    pub parallel: bool,
    pub reasoning: String,
    pub source: RoutingSource,
}

/// A routed query's answer.
#[derive(Debug, Clone)]
pub struct RoutedAnswer {
    pub text: String,
    pub decision: RoutingDecision,
    /// Specialists whose answers made it into `text`.
    pub answered_by: Vec<String>,
    /// The engine run, for ITERATIVE answers.
    pub run: Option<RunOutcome>,
}

/// A failed [`QueryRouter::try_respond`].
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RespondError {
    pub error: AgentError,
    /// The decision made before the failure; unset when the query was
    /// rejected before routing.
    pub decision: Option<RoutingDecision>,
}

impl RespondError {
    fn unrouted(error: AgentError) -> Self {
        Self { error, decision: None }
    }
}

/// Routes queries and dispatches them to specialists or the engine.
#[derive(Debug, Clone)]
pub struct QueryRouter {
    config: RouterConfig,
    engine: IterationEngine,
    keywords: KeywordRouter,
}

impl QueryRouter {
    /// Create a router and the engine it uses for ITERATIVE queries.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] if either configuration fails
    /// validation.
    pub fn new(config: RouterConfig, engine_config: EngineConfig) -> Result<Self, AgentError> {
        config.validate()?;
        let engine = IterationEngine::new(engine_config)?;
        Ok(Self {
            config,
            engine,
            keywords: KeywordRouter::new()?,
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn engine(&self) -> &IterationEngine {
        &self.engine
    }

    /// Decide how to answer a query. Never fails.
    pub async fn route(&self, query: &Query, context: &AgentContext) -> RoutingDecision {
        self.route_within(query, context, Instant::now()).await
    }

    async fn route_within(
        &self,
        query: &Query,
        context: &AgentContext,
        start: Instant,
    ) -> RoutingDecision {
        match self.classify(query, context, start).await {
            Ok(decision) => {
                log::info!(
                    "Routed by model: {} {:?} (parallel: {}) - {}",
                    decision.mode,
                    decision.agents,
                    decision.parallel,
                    decision.reasoning
                );
                decision
            }
            Err(e) => {
                log::warn!("Routing classification failed, using keyword fallback: {}", e);
                let decision = self.keywords.route(query, &self.config);
                log::info!(
                    "Routed by keywords: {} {:?} (parallel: {})",
                    decision.mode,
                    decision.agents,
                    decision.parallel
                );
                decision
            }
        }
    }

    async fn classify(
        &self,
        query: &Query,
        context: &AgentContext,
        start: Instant,
    ) -> Result<RoutingDecision, RoutingError> {
        let config = &self.config;
        let remaining = remaining_time(start, config.total_timeout, "routing")?;

        let request = LlmRequest::with_system(
            format!("Route this query: {}", query.text()),
            config.render_classification_prompt(),
        )
        .with_history(render_turns(query.recent(config.classification_history_turns)));

        let raw = with_timeout_and_cancellation(
            async { context.llm.generate(request).await.map_err(AgentError::from) },
            remaining,
            &context.cancellation_token,
            || timeout_error(start, config.total_timeout, "routing"),
        )
        .await?;

        log::debug!("Classification response: {}", truncate(&raw, 300));
        parse_classification(&raw, config)
    }

    /// Route a query and produce its answer.
    ///
    /// # Errors
    ///
    /// Fails on cancellation, on a model failure of the ITERATIVE run or of a
    /// single SIMPLE specialist, or when every specialist of a multi-specialist
    /// SIMPLE answer fails. Routing problems are never returned.
    pub async fn respond(&self, query: &Query, context: &AgentContext) -> Result<RoutedAnswer, AgentError> {
        self.try_respond(query, context).await.map_err(|e| e.error)
    }

    /// Like [`respond`](Self::respond), but a failure keeps the routing
    /// decision that was already made.
    pub async fn try_respond(&self, query: &Query, context: &AgentContext) -> Result<RoutedAnswer, RespondError> {
        if query.text().trim().is_empty() {
            return Err(RespondError::unrouted(AgentError::Other(
                "Query cannot be empty".to_string(),
            )));
        }

        let start = Instant::now();
        let decision = self.route_within(query, context, start).await;

        if context.cancellation_token.is_cancelled() {
            return Err(RespondError {
                error: AgentError::Cancelled,
                decision: Some(decision),
            });
        }

        let answered = match decision.mode {
            Mode::Iterative => self
                .engine
                .run(query, context)
                .await
                .map(|outcome| (outcome.final_answer.clone(), decision.agents.clone(), Some(outcome))),
            Mode::Simple => self
                .answer_simple(query, &decision, context, start)
                .await
                .map(|(text, answered_by)| (text, answered_by, None)),
        };

        match answered {
            Ok((text, answered_by, run)) => Ok(RoutedAnswer {
                text,
                answered_by,
                decision,
                run,
            }),
            Err(error) => Err(RespondError {
                error,
                decision: Some(decision),
            }),
        }
    }

    async fn answer_simple(
        &self,
        query: &Query,
        decision: &RoutingDecision,
        context: &AgentContext,
        start: Instant,
    ) -> Result<(String, Vec<String>), AgentError> {
        let mut specialists: Vec<&Specialist> = decision
            .agents
            .iter()
            .filter_map(|id| self.config.specialist(id))
            .collect();
        if specialists.is_empty() {
            if let Some(default) = self.config.specialist(&self.config.default_specialist) {
                specialists.push(default);
            }
        }

        if let [only] = specialists.as_slice() {
            let text = self.ask(only, query, context, start).await?;
            return Ok((text, vec![only.id.clone()]));
        }

        let results: Vec<Result<String, AgentError>> = if decision.parallel {
            join_all(specialists.iter().map(|s| self.ask(s, query, context, start))).await
        } else {
            let mut results = Vec::with_capacity(specialists.len());
            for specialist in &specialists {
                results.push(self.ask(specialist, query, context, start).await);
            }
            results
        };

        let mut answers: Vec<(&Specialist, String)> = Vec::new();
        let mut first_error = None;
        for (specialist, result) in specialists.iter().zip(results) {
            match result {
                Ok(text) => answers.push((specialist, text)),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    log::warn!("Specialist '{}' failed, skipping: {}", specialist.id, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        let answered_by: Vec<String> = answers.iter().map(|(s, _)| s.id.clone()).collect();
        match answers.len() {
            0 => Err(first_error
                .unwrap_or_else(|| AgentError::Other("No specialist answered".to_string()))),
            1 => Ok((answers.remove(0).1, answered_by)),
            _ => Ok((combine(&answers, decision.parallel), answered_by)),
        }
    }

    /// One direct model call with a specialist's system prompt.
    async fn ask(
        &self,
        specialist: &Specialist,
        query: &Query,
        context: &AgentContext,
        start: Instant,
    ) -> Result<String, AgentError> {
        let config = &self.config;
        let phase = format!("specialist_{}", specialist.id);
        let remaining = remaining_time(start, config.total_timeout, &phase)?;
        log::debug!("Asking specialist '{}'", specialist.id);

        let request = LlmRequest::with_system(query.text(), specialist.system_prompt.as_str())
            .with_history(render_turns(query.recent(config.answer_history_turns)));

        let text = with_timeout_and_cancellation(
            async { context.llm.generate(request).await.map_err(AgentError::from) },
            remaining,
            &context.cancellation_token,
            || timeout_error(start, config.total_timeout, &phase),
        )
        .await?;
        Ok(text.trim().to_string())
    }
}

/// Join several specialists' answers under per-specialist headings.
fn combine(answers: &[(&Specialist, String)], parallel: bool) -> String {
    let mut combined = if parallel {
        String::from("Here's what I found from multiple perspectives:\n\n")
    } else {
        String::from("Here's a comprehensive response:\n\n")
    };
    for (specialist, text) in answers {
        if parallel {
            combined.push_str(&format!("**{} Perspective:**\n", specialist.display_name));
        } else {
            combined.push_str(&format!("**{}:**\n", specialist.display_name));
        }
        combined.push_str(text);
        combined.push_str("\n\n");
    }
    combined.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use crate::llm::LlmClient;
    use crate::mock_llm::{ScriptedModel, ScriptedResponse};
    use crate::tool::ToolRegistry;
    use std::sync::Arc;

    fn context(model: Arc<ScriptedModel>) -> AgentContext {
        let llm = LlmClient::from_arc(model, LlmConfig::default());
        AgentContext::from_arcs(Arc::new(llm), Arc::new(ToolRegistry::new()))
    }

    fn router() -> QueryRouter {
        QueryRouter::new(RouterConfig::default(), EngineConfig::default().with_max_iterations(3)).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RouterConfig::default().with_default_specialist("nobody");
        assert!(matches!(
            QueryRouter::new(config, EngineConfig::default()),
            Err(AgentError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_route_by_model() {
        let model = Arc::new(ScriptedModel::from_texts([
            "MODE: ITERATIVE\nAGENTS: [weather]\nPARALLEL: no\nREASONING: no location",
        ]));
        let decision = router()
            .route(&Query::new("What's the weather today?"), &context(model.clone()))
            .await;

        assert_eq!(decision.mode, Mode::Iterative);
        assert_eq!(decision.source, RoutingSource::Model);

        let requests = model.requests();
        assert!(requests[0].prompt.ends_with("What's the weather today?"));
        let system = requests[0].system_instruction.as_deref().unwrap_or_default();
        assert!(system.contains("- financial: "));
    }

    #[tokio::test]
    async fn test_route_falls_back_on_model_error() {
        let model = Arc::new(ScriptedModel::new(vec![ScriptedResponse::error("unavailable")]));
        let decision = router()
            .route(&Query::new("What's the weather in Mumbai?"), &context(model))
            .await;

        assert_eq!(decision.mode, Mode::Simple);
        assert_eq!(decision.agents, vec!["weather"]);
        assert_eq!(decision.source, RoutingSource::KeywordFallback);
    }

    #[tokio::test]
    async fn test_route_falls_back_on_unparsable_response() {
        let model = Arc::new(ScriptedModel::from_texts(["Sounds like a weather question to me!"]));
        let decision = router()
            .route(&Query::new("What's the weather today?"), &context(model))
            .await;

        assert_eq!(decision.mode, Mode::Iterative);
        assert_eq!(decision.source, RoutingSource::KeywordFallback);
    }

    #[tokio::test]
    async fn test_classification_sends_only_recent_history() {
        let history = (1..=6)
            .map(|i| crate::history::Turn::user(format!("turn {}", i)))
            .collect();
        let model = Arc::new(ScriptedModel::from_texts([
            "MODE: SIMPLE\nAGENTS: [general]\nPARALLEL: no",
        ]));
        router()
            .route(&Query::new("hi").with_history(history), &context(model.clone()))
            .await;

        let sent = model.requests()[0].history.clone().unwrap_or_default();
        assert!(!sent.contains("turn 2"));
        assert!(sent.contains("turn 3"));
        assert!(sent.contains("turn 6"));
    }

    #[tokio::test]
    async fn test_respond_single_specialist() {
        let model = Arc::new(ScriptedModel::from_texts([
            "MODE: SIMPLE\nAGENTS: [weather]\nPARALLEL: no",
            "  Light showers expected in Mumbai.  ",
        ]));
        let answer = router()
            .respond(&Query::new("What's the weather in Mumbai?"), &context(model.clone()))
            .await
            .unwrap();

        assert_eq!(answer.text, "Light showers expected in Mumbai.");
        assert_eq!(answer.answered_by, vec!["weather"]);
        assert!(answer.run.is_none());

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].prompt, "What's the weather in Mumbai?");
        assert_eq!(
            requests[1].system_instruction.as_deref(),
            Some(Specialist::weather().system_prompt.as_str())
        );
    }

    #[tokio::test]
    async fn test_respond_combines_parallel_answers() {
        let model = Arc::new(ScriptedModel::from_texts([
            "MODE: SIMPLE\nAGENTS: [organic_farming, financial]\nPARALLEL: yes",
            "Use compost.",
            "Expect a 20% margin.",
        ]));
        let answer = router()
            .respond(&Query::new("Is organic tomato farming profitable?"), &context(model))
            .await
            .unwrap();

        assert!(answer.text.starts_with("Here's what I found from multiple perspectives:"));
        assert!(answer.text.contains("**Organic Farming Perspective:**\n"));
        assert!(answer.text.contains("**Financial Perspective:**\n"));
        assert_eq!(answer.answered_by.len(), 2);
    }

    #[tokio::test]
    async fn test_respond_sequential_answers_keep_order() {
        let model = Arc::new(ScriptedModel::from_texts([
            "MODE: SIMPLE\nAGENTS: [financial, weather]\nPARALLEL: no",
            "Budget first.",
            "Monsoon is late.",
        ]));
        let answer = router()
            .respond(&Query::new("Plan my season"), &context(model))
            .await
            .unwrap();

        assert_eq!(
            answer.text,
            "Here's a comprehensive response:\n\n**Financial:**\nBudget first.\n\n**Weather:**\nMonsoon is late."
        );
    }

    #[tokio::test]
    async fn test_respond_skips_failed_specialist() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedResponse::text("MODE: SIMPLE\nAGENTS: [financial, weather]\nPARALLEL: no"),
            ScriptedResponse::error("overloaded"),
            ScriptedResponse::text("Monsoon is late."),
        ]));
        let answer = router()
            .respond(&Query::new("Plan my season"), &context(model))
            .await
            .unwrap();

        assert_eq!(answer.text, "Monsoon is late.");
        assert_eq!(answer.answered_by, vec!["weather"]);
    }

    #[tokio::test]
    async fn test_respond_fails_when_all_specialists_fail() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedResponse::text("MODE: SIMPLE\nAGENTS: [financial, weather]\nPARALLEL: no"),
            ScriptedResponse::error("overloaded"),
            ScriptedResponse::error("overloaded"),
        ]));
        let result = router().respond(&Query::new("Plan my season"), &context(model)).await;
        assert!(matches!(result, Err(AgentError::Llm(_))));
    }

    #[tokio::test]
    async fn test_try_respond_keeps_decision_on_failure() {
        let model = Arc::new(ScriptedModel::new(vec![
            ScriptedResponse::text("MODE: SIMPLE\nAGENTS: [weather]\nPARALLEL: no"),
            ScriptedResponse::error("overloaded"),
        ]));
        let err = router()
            .try_respond(&Query::new("Will it rain in Rajkot?"), &context(model))
            .await
            .unwrap_err();

        assert!(matches!(err.error, AgentError::Llm(_)));
        let decision = err.decision.unwrap();
        assert_eq!(decision.mode, Mode::Simple);
        assert_eq!(decision.agents, vec!["weather"]);
        assert_eq!(decision.source, RoutingSource::Model);
    }

    #[tokio::test]
    async fn test_try_respond_empty_query_has_no_decision() {
        let model = Arc::new(ScriptedModel::from_texts(["unused"]));
        let err = router()
            .try_respond(&Query::new(""), &context(model))
            .await
            .unwrap_err();
        assert!(err.decision.is_none());
    }

    #[tokio::test]
    async fn test_respond_iterative_runs_engine() {
        let model = Arc::new(ScriptedModel::from_texts([
            "MODE: ITERATIVE\nAGENTS: [financial]\nPARALLEL: no",
            "THOUGHT: simple enough\nFINAL_ANSWER: 4",
        ]));
        let answer = router()
            .respond(&Query::new("What is 2+2?"), &context(model))
            .await
            .unwrap();

        assert_eq!(answer.text, "4");
        assert_eq!(answer.run.map(|run| run.iterations), Some(1));
    }

    #[tokio::test]
    async fn test_respond_rejects_empty_query() {
        let model = Arc::new(ScriptedModel::from_texts(["unused"]));
        let result = router().respond(&Query::new("   "), &context(model.clone())).await;
        assert!(result.is_err());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_respond_cancelled() {
        let model = Arc::new(ScriptedModel::from_texts(["unused"]));
        let ctx = context(model);
        ctx.cancellation_token.cancel();

        let result = router().respond(&Query::new("hello"), &ctx).await;
        assert!(matches!(result, Err(AgentError::Cancelled)));
    }
}
