//! Adapter from the uniform `invoke(parameter?)` contract to a tool's own
//! calling convention.
//!
//! Dispatch is a fixed (parameter kind × convention) table:
//!
//! | parameter | no-argument | single string | structured | keyword |
//! |---|---|---|---|---|
//! | absent | `call()` | `call("")` | `call({})` | `call({})` |
//! | string | unsupported | `call(s)` | `call("s")` | first parameter = `s` |
//! | mapping | unsupported | single scalar entry | `call(map)` | known names only |
//!
//! Parameters are normalized first (see [`ToolInput::normalize`]), so an
//! empty value takes the absent row and a JSON-object string the mapping row.

use super::{ToolBinding, ToolInput, ToolResult};
use crate::error::{ToolError, UnsupportedToolError};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A registered tool plus its per-call timeout.
#[derive(Debug, Clone)]
pub struct ToolAdapter {
    binding: ToolBinding,
    timeout: Duration,
}

impl ToolAdapter {
    pub fn new(binding: ToolBinding, timeout: Duration) -> Self {
        Self { binding, timeout }
    }

    pub fn name(&self) -> &str {
        self.binding.name()
    }

    pub fn description(&self) -> &str {
        self.binding.description()
    }

    pub fn binding(&self) -> &ToolBinding {
        &self.binding
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Invoke the tool with an optional parameter.
    ///
    /// Tool errors and timeouts both come back as [`ToolResult::Failure`].
    ///
    /// # Errors
    ///
    /// `UnsupportedToolError::IncompatibleParameter` when the tool's
    /// convention has no form for the parameter kind.
    pub async fn invoke(&self, input: ToolInput) -> Result<ToolResult, UnsupportedToolError> {
        let input = input.normalize();
        let kind = input.kind();
        let call = self.dispatch(input)?;

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, call).await;

        let result = match outcome {
            Ok(Ok(value)) => ToolResult::Success(value),
            Ok(Err(e)) => {
                log::warn!("Tool '{}' failed: {}", self.name(), e);
                ToolResult::Failure(e.to_string())
            }
            Err(_) => {
                log::warn!("Tool '{}' timed out after {:?}", self.name(), self.timeout);
                ToolResult::Failure(
                    ToolError::Timeout(self.timeout.as_millis() as u64).to_string(),
                )
            }
        };

        log::debug!(
            "Tool '{}' ({} parameter) finished in {}ms, error={}",
            self.name(),
            kind,
            start.elapsed().as_millis(),
            result.is_error()
        );
        Ok(result)
    }

    fn dispatch(
        &self,
        input: ToolInput,
    ) -> Result<BoxFuture<'static, Result<Value, ToolError>>, UnsupportedToolError> {
        let unsupported = |kind: &'static str| UnsupportedToolError::IncompatibleParameter {
            tool: self.name().to_string(),
            kind,
        };

        let call = match (&self.binding, input) {
            (ToolBinding::NoArg(tool), ToolInput::Absent) => {
                let tool = Arc::clone(tool);
                async move { tool.call().await }.boxed()
            }
            (ToolBinding::NoArg(_), other) => return Err(unsupported(other.kind())),

            (ToolBinding::Text(tool), ToolInput::Absent) => {
                let tool = Arc::clone(tool);
                async move { tool.call("").await }.boxed()
            }
            (ToolBinding::Text(tool), ToolInput::Text(text)) => {
                let tool = Arc::clone(tool);
                async move { tool.call(&text).await }.boxed()
            }
            (ToolBinding::Text(tool), ToolInput::Mapping(map)) => {
                let text = single_scalar(&map).ok_or_else(|| unsupported("mapping"))?;
                let tool = Arc::clone(tool);
                async move { tool.call(&text).await }.boxed()
            }

            (ToolBinding::Structured(tool), input) => {
                let value = match input {
                    ToolInput::Absent => Value::Object(Map::new()),
                    ToolInput::Text(text) => Value::String(text),
                    ToolInput::Mapping(map) => Value::Object(map),
                };
                let tool = Arc::clone(tool);
                async move { tool.call(value).await }.boxed()
            }

            (ToolBinding::Keyword(tool), input) => {
                let args = match input {
                    ToolInput::Absent => Map::new(),
                    ToolInput::Text(text) => {
                        let first = tool.parameters().first().ok_or_else(|| unsupported("string"))?;
                        let mut args = Map::new();
                        args.insert((*first).to_string(), Value::String(text));
                        args
                    }
                    ToolInput::Mapping(map) => {
                        let params = tool.parameters();
                        if !map.keys().all(|k| params.contains(&k.as_str())) {
                            return Err(unsupported("mapping"));
                        }
                        map
                    }
                };
                let tool = Arc::clone(tool);
                async move { tool.call(&args).await }.boxed()
            }
        };
        Ok(call)
    }
}

/// The value of a single-entry mapping as text, when it is a scalar.
fn single_scalar(map: &Map<String, Value>) -> Option<String> {
    if map.len() != 1 {
        return None;
    }
    match map.values().next()? {
        Value::String(s) => Some(s.clone()),
        v @ (Value::Number(_) | Value::Bool(_)) => Some(v.to_string()),
        _ => None,
    }
}
