//! Language model interface.
//!
//! The transport is an external collaborator: anything implementing
//! [`LanguageModel`] can back the router and the engine. [`LlmClient`] wraps
//! a model with the per-call timeout and generation defaults from
//! [`LlmConfig`](crate::LlmConfig).
//!
//! # Example
//!
//! ```no_run
//! use krishi_core::{LlmClient, LlmConfig, LlmRequest, ScriptedModel};
//!
//! # async fn example() -> Result<(), krishi_core::LlmError> {
//! let model = ScriptedModel::from_texts(["Paris is the capital of France."]);
//! let client = LlmClient::new(model, LlmConfig::default());
//!
//! let text = client.generate(LlmRequest::new("What is the capital of France?")).await?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

mod client;
mod request;

pub use client::{LanguageModel, LlmClient};
pub use request::LlmRequest;
