//! The bounded reasoning loop.
//!
//! Each iteration makes exactly one model call, parses the response and then
//! either finishes (final answer), invokes one tool and folds the result into
//! the scratchpad (action), or takes the whole response as the answer when
//! nothing structured could be extracted. After `max_iterations` calls without
//! a final answer the run is marked exhausted and a best-effort answer is
//! built from what was gathered.
//!
//! Only model-call failures and cancellation abort a run. Tool failures,
//! unknown tools and parse degradation all turn into forward progress.
//!
//! # Example
//!
//! ```no_run
//! use krishi_core::{AgentContext, EngineConfig, IterationEngine, LlmClient, LlmConfig, Query};
//! use krishi_core::{ScriptedModel, ToolRegistry};
//!
//! # async fn example() -> Result<(), krishi_core::AgentError> {
//! let model = ScriptedModel::from_texts(["THOUGHT: easy\nFINAL_ANSWER: 4"]);
//! let context = AgentContext::new(LlmClient::new(model, LlmConfig::default()), ToolRegistry::new());
//! let engine = IterationEngine::new(EngineConfig::default().with_max_iterations(3))?;
//!
//! let outcome = engine.run(&Query::new("What is 2+2?"), &context).await?;
//! assert_eq!(outcome.final_answer, "4");
//! # Ok(())
//! # }
//! ```

mod config;

pub use config::{EngineConfig, EnginePrompts};

use crate::agent::{remaining_time, timeout_error, with_timeout_and_cancellation, AgentContext};
use crate::error::AgentError;
use crate::history::{render_turns, Query};
use crate::llm::LlmRequest;
use crate::parser;
use crate::tool::ToolInput;
use crate::utils::truncate;

use std::fmt;
use std::time::Instant;

/// Maximum scratchpad size in characters to prevent excessive context growth.
/// When exceeded, older entries are truncated to stay within bounds.
const MAX_SCRATCHPAD_CHARS: usize = 20_000;

/// One thought/action/observation round of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationStep {
    /// 1-based iteration number.
    pub index: usize,
    pub thought: String,
    pub action: Option<String>,
    pub action_input: ToolInput,
    pub observation: Option<String>,
    /// Whether the observation reports a failed invocation.
    pub tool_failed: bool,
    pub is_final: bool,
}

impl fmt::Display for IterationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.index, truncate(&self.thought, 120))?;
        if let Some(action) = &self.action {
            write!(f, " -> {}({})", action, self.action_input)?;
        }
        if let Some(observation) = &self.observation {
            write!(f, " => {}", truncate(observation, 120))?;
        }
        if self.is_final {
            write!(f, " [final]")?;
        }
        Ok(())
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The model gave a final answer.
    Completed,
    /// The model's response had no usable structure and was taken verbatim.
    Degraded,
    /// The iteration or time budget ran out; the answer is best-effort.
    Exhausted,
}

/// Result of one engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub final_answer: String,
    pub steps: Vec<IterationStep>,
    /// Number of model calls made.
    pub iterations: usize,
    pub status: RunStatus,
}

impl RunOutcome {
    pub fn is_exhausted(&self) -> bool {
        self.status == RunStatus::Exhausted
    }

    pub fn is_degraded(&self) -> bool {
        self.status == RunStatus::Degraded
    }
}

/// Bounded thought/action/observation loop.
#[derive(Debug, Clone)]
pub struct IterationEngine {
    config: EngineConfig,
}

impl IterationEngine {
    /// Create a new engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: EngineConfig) -> Result<Self, AgentError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the loop for one query.
    ///
    /// # Errors
    ///
    /// - `AgentError::Llm` / `AgentError::Timeout` if a model call fails
    /// - `AgentError::Cancelled` if the context's token is cancelled
    pub async fn run(&self, query: &Query, context: &AgentContext) -> Result<RunOutcome, AgentError> {
        let config = &self.config;
        let start = Instant::now();
        let system = config
            .prompts
            .render_system(&context.tools.describe(), config.max_iterations);
        let history = render_turns(query.recent(config.history_turns));

        let mut steps: Vec<IterationStep> = Vec::with_capacity(config.max_iterations);
        let mut scratchpad = Scratchpad::default();
        let mut consecutive_failures = 0;

        log::info!(
            "Starting iterative run (max {} iterations, {} tools)",
            config.max_iterations,
            context.tools.len()
        );

        for index in 1..=config.max_iterations {
            let phase = format!("iteration_{}", index);
            let remaining = match remaining_time(start, config.total_timeout, &phase) {
                Ok(remaining) => remaining,
                // A tool call spent the rest of the budget; keep what was gathered.
                Err(e) if index > 1 => {
                    log::warn!(
                        "Run budget spent before iteration {} ({}), ending with a best-effort answer",
                        index,
                        e
                    );
                    return Ok(exhausted(steps, index - 1));
                }
                Err(e) => return Err(e),
            };
            log::info!("Iteration {}/{}", index, config.max_iterations);

            let request = LlmRequest::with_system(
                config.prompts.render_iteration(query.text(), scratchpad.as_str()),
                &system,
            )
            .with_history(history.clone());

            let raw = match with_timeout_and_cancellation(
                async { context.llm.generate(request).await.map_err(AgentError::from) },
                remaining,
                &context.cancellation_token,
                || timeout_error(start, config.total_timeout, &phase),
            )
            .await
            {
                Ok(raw) => raw,
                Err(e) => {
                    if e.is_cancelled() {
                        log::info!("Run cancelled during iteration {}", index);
                    } else {
                        log::error!("Model call failed in iteration {}: {}", index, e);
                    }
                    return Err(e);
                }
            };

            let parsed = parser::parse(&raw);
            let unstructured = parsed.is_unstructured();
            log::debug!("Iteration {} thought: {}", index, truncate(&parsed.thought, 200));

            if let Some(answer) = parsed.final_answer {
                if let Some(action) = &parsed.action {
                    log::debug!(
                        "Iteration {}: final answer present, skipping action '{}'",
                        index,
                        action
                    );
                }
                log::info!("Final answer reached in iteration {}", index);
                steps.push(IterationStep {
                    index,
                    thought: parsed.thought,
                    action: None,
                    action_input: ToolInput::Absent,
                    observation: None,
                    tool_failed: false,
                    is_final: true,
                });
                return Ok(RunOutcome {
                    final_answer: answer,
                    steps,
                    iterations: index,
                    status: RunStatus::Completed,
                });
            }

            if let Some(action) = parsed.action {
                let (observation, failed) = self
                    .observe(&action, parsed.action_input.clone(), context, start, &mut consecutive_failures)
                    .await?;
                log::debug!("Iteration {} observation: {}", index, truncate(&observation, 200));

                scratchpad.push(index, &parsed.thought, &action, &parsed.action_input, &observation);
                steps.push(IterationStep {
                    index,
                    thought: parsed.thought,
                    action: Some(action),
                    action_input: parsed.action_input,
                    observation: Some(observation),
                    tool_failed: failed,
                    is_final: false,
                });
                continue;
            }

            if unstructured {
                log::warn!(
                    "Iteration {}: no structured fields extracted, using the whole response as the answer",
                    index
                );
            } else {
                log::warn!(
                    "Iteration {}: response has neither action nor final answer, using it as the answer",
                    index
                );
            }
            steps.push(IterationStep {
                index,
                thought: parsed.thought,
                action: None,
                action_input: ToolInput::Absent,
                observation: None,
                tool_failed: false,
                is_final: true,
            });
            return Ok(RunOutcome {
                final_answer: raw.trim().to_string(),
                steps,
                iterations: index,
                status: RunStatus::Degraded,
            });
        }

        log::warn!(
            "Reached maximum iterations ({}) without a final answer",
            config.max_iterations
        );
        Ok(exhausted(steps, config.max_iterations))
    }

    /// Invoke one tool and render the observation.
    ///
    /// Only cancellation is returned as an error; everything else, including
    /// a timeout, becomes observation text.
    async fn observe(
        &self,
        action: &str,
        input: ToolInput,
        context: &AgentContext,
        start: Instant,
        consecutive_failures: &mut usize,
    ) -> Result<(String, bool), AgentError> {
        let config = &self.config;
        let phase = format!("tool_{}", action);
        log::info!("Calling tool '{}' with {} parameter", action, input.kind());

        let outcome = match remaining_time(start, config.total_timeout, &phase) {
            Ok(remaining) => {
                with_timeout_and_cancellation(
                    async { Ok(context.tools.invoke(action, input).await) },
                    remaining,
                    &context.cancellation_token,
                    || timeout_error(start, config.total_timeout, &phase),
                )
                .await
            }
            Err(e) => Err(e),
        };

        let (mut observation, failed) = match outcome {
            Ok(Ok(result)) => (result.to_observation(action), result.is_error()),
            Ok(Err(unsupported)) => {
                log::warn!("Tool call rejected: {}", unsupported);
                (format!("Error: {}", unsupported), true)
            }
            Err(e) if e.is_cancelled() => {
                log::info!("Run cancelled while calling tool '{}'", action);
                return Err(e);
            }
            Err(e) => {
                log::warn!("Tool '{}' did not finish: {}", action, e);
                (format!("Error executing {}: timed out", action), true)
            }
        };

        if failed {
            *consecutive_failures += 1;
            if *consecutive_failures >= config.max_consecutive_tool_failures {
                log::warn!(
                    "{} consecutive tool failures, asking the model to answer",
                    consecutive_failures
                );
                observation.push_str(&format!(
                    "\n\nTool calls have failed {} times in a row. Do not call any more tools; \
                     give your FINAL_ANSWER using the information you already have.",
                    consecutive_failures
                ));
            }
        } else {
            *consecutive_failures = 0;
        }

        Ok((observation, failed))
    }
}

fn exhausted(steps: Vec<IterationStep>, iterations: usize) -> RunOutcome {
    RunOutcome {
        final_answer: best_effort_answer(&steps),
        iterations,
        steps,
        status: RunStatus::Exhausted,
    }
}

/// Build the answer for an exhausted run from the latest useful evidence.
fn best_effort_answer(steps: &[IterationStep]) -> String {
    let observation = steps
        .iter()
        .rev()
        .filter(|step| !step.tool_failed)
        .find_map(|step| step.observation.as_deref())
        .map(str::trim)
        .filter(|o| !o.is_empty());

    if let Some(observation) = observation {
        return format!(
            "I couldn't finish working through this within the step limit. \
             Here is what I found so far: {}",
            observation
        );
    }

    let thought = steps
        .iter()
        .rev()
        .map(|step| step.thought.trim())
        .find(|t| !t.is_empty());

    match thought {
        Some(thought) => format!(
            "I couldn't reach a complete answer within the step limit. My reasoning so far: {}",
            thought
        ),
        None => "I couldn't complete this within the allowed number of steps. \
                 Please try rephrasing your question."
            .to_string(),
    }
}

/// Running transcript of prior iterations shown to the model.
#[derive(Debug, Default)]
struct Scratchpad(String);

impl Scratchpad {
    fn as_str(&self) -> &str {
        &self.0
    }

    fn push(&mut self, index: usize, thought: &str, action: &str, input: &ToolInput, observation: &str) {
        self.0.push_str(&format!(
            "Iteration {}\nTHOUGHT: {}\nACTION: {}\nACTION_INPUT: {}\nOBSERVATION: {}\n\n",
            index, thought, action, input, observation,
        ));
        self.truncate_front();
    }

    /// Keep the most recent entries, cutting at a paragraph boundary.
    fn truncate_front(&mut self) {
        if self.0.len() <= MAX_SCRATCHPAD_CHARS {
            return;
        }
        let mut keep_from = self.0.len() - MAX_SCRATCHPAD_CHARS;
        while !self.0.is_char_boundary(keep_from) {
            keep_from += 1;
        }
        let new_start = match self.0[keep_from..].find("\n\n") {
            Some(pos) => keep_from + pos + 2,
            None => keep_from,
        };
        log::warn!(
            "Scratchpad over {} chars, dropping the oldest {} chars from the prompt",
            MAX_SCRATCHPAD_CHARS,
            new_start
        );
        self.0 = format!("[Earlier iterations truncated]\n\n{}", &self.0[new_start..]);
    }
}
