//! Tool abstraction for agent actions.
//!
//! Tools come with different calling conventions: some take nothing, some a
//! single string, some a structured JSON value, some named keyword
//! arguments. Each tool implements the trait for its own convention and is
//! wrapped in a [`ToolBinding`] at registration. From then on callers only
//! see [`ToolRegistry::invoke`], which accepts an optional parameter and
//! picks the form through a fixed coercion table.
//!
//! # Example
//!
//! ```no_run
//! use krishi_core::tool::{TextTool, Tool, ToolBinding, ToolInput, ToolRegistry};
//! use krishi_core::ToolError;
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//!
//! #[derive(Debug)]
//! struct Shout;
//!
//! impl Tool for Shout {
//!     fn name(&self) -> &str { "shout" }
//!     fn description(&self) -> &str { "Upper-cases its input" }
//! }
//!
//! #[async_trait]
//! impl TextTool for Shout {
//!     async fn call(&self, input: &str) -> Result<Value, ToolError> {
//!         Ok(json!(input.to_uppercase()))
//!     }
//! }
//!
//! # async fn example() {
//! let mut registry = ToolRegistry::new();
//! registry.register(ToolBinding::text(Shout));
//!
//! let result = registry.invoke("shout", ToolInput::text("hello")).await.unwrap();
//! assert_eq!(result.to_observation("shout"), "HELLO");
//! # }
//! ```

mod adapter;
mod registry;

pub use adapter::ToolAdapter;
pub use registry::{ToolRegistry, DEFAULT_TOOL_TIMEOUT};

use crate::error::ToolError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// The optional parameter handed to a tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInput {
    /// No parameter was given.
    Absent,
    /// A plain string.
    Text(String),
    /// A key/value mapping.
    Mapping(Map<String, Value>),
}

impl ToolInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Build a mapping input from a JSON value.
    ///
    /// Objects become [`ToolInput::Mapping`], strings [`ToolInput::Text`],
    /// `null` [`ToolInput::Absent`]; other scalars are rendered as text.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::Object(map) => Self::Mapping(map),
            Value::String(s) => Self::Text(s),
            other => Self::Text(other.to_string()),
        }
    }

    /// Apply the equivalences the adapter relies on.
    ///
    /// Empty strings and empty mappings count as absent, and a string holding
    /// a JSON object counts as that mapping.
    pub fn normalize(self) -> Self {
        match self {
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Self::Absent;
                }
                if trimmed.starts_with('{') {
                    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
                        return Self::Mapping(map).normalize();
                    }
                }
                Self::Text(text)
            }
            Self::Mapping(map) if map.is_empty() => Self::Absent,
            other => other,
        }
    }

    /// Short name of the parameter kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Text(_) => "string",
            Self::Mapping(_) => "mapping",
        }
    }

    /// Whether no parameter was given.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl fmt::Display for ToolInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => Ok(()),
            Self::Text(text) => write!(f, "{}", text),
            Self::Mapping(map) => write!(f, "{}", Value::Object(map.clone())),
        }
    }
}

/// Outcome of one invocation. Write-once.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    /// JSON payload returned by the tool.
    Success(Value),
    /// Description of what went wrong.
    Failure(String),
}

impl ToolResult {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Render the result as observation text for the next prompt.
    ///
    /// String payloads are used verbatim, other payloads are compact JSON.
    pub fn to_observation(&self, tool_name: &str) -> String {
        match self {
            Self::Success(Value::String(s)) => s.clone(),
            Self::Success(value) => value.to_string(),
            Self::Failure(detail) => format!("Error executing {}: {}", tool_name, detail),
        }
    }
}

/// Identity shared by every tool convention.
pub trait Tool: Send + Sync + fmt::Debug {
    /// Unique identifier for this tool (e.g., "calculate").
    fn name(&self) -> &str;

    /// Human-readable description shown to the model in the system prompt.
    fn description(&self) -> &str;
}

/// A tool taking no arguments.
#[async_trait]
pub trait NoArgTool: Tool {
    async fn call(&self) -> Result<Value, ToolError>;
}

/// A tool taking a single positional string.
#[async_trait]
pub trait TextTool: Tool {
    async fn call(&self, input: &str) -> Result<Value, ToolError>;
}

/// A tool taking one structured JSON argument.
#[async_trait]
pub trait StructuredTool: Tool {
    async fn call(&self, input: Value) -> Result<Value, ToolError>;
}

/// A tool taking named keyword arguments.
///
/// Every parameter is optional from the adapter's point of view; the tool
/// applies its own defaults for missing names.
#[async_trait]
pub trait KeywordTool: Tool {
    /// Accepted parameter names, in positional order.
    fn parameters(&self) -> &[&str];

    async fn call(&self, args: &Map<String, Value>) -> Result<Value, ToolError>;
}

/// A tool bound to exactly one calling convention.
#[derive(Debug, Clone)]
pub enum ToolBinding {
    NoArg(Arc<dyn NoArgTool>),
    Text(Arc<dyn TextTool>),
    Structured(Arc<dyn StructuredTool>),
    Keyword(Arc<dyn KeywordTool>),
}

impl ToolBinding {
    pub fn no_arg(tool: impl NoArgTool + 'static) -> Self {
        Self::NoArg(Arc::new(tool))
    }

    pub fn text(tool: impl TextTool + 'static) -> Self {
        Self::Text(Arc::new(tool))
    }

    pub fn structured(tool: impl StructuredTool + 'static) -> Self {
        Self::Structured(Arc::new(tool))
    }

    pub fn keyword(tool: impl KeywordTool + 'static) -> Self {
        Self::Keyword(Arc::new(tool))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::NoArg(t) => t.name(),
            Self::Text(t) => t.name(),
            Self::Structured(t) => t.name(),
            Self::Keyword(t) => t.name(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::NoArg(t) => t.description(),
            Self::Text(t) => t.description(),
            Self::Structured(t) => t.description(),
            Self::Keyword(t) => t.description(),
        }
    }

    /// Name of the bound convention.
    pub fn convention(&self) -> &'static str {
        match self {
            Self::NoArg(_) => "no-argument",
            Self::Text(_) => "single string",
            Self::Structured(_) => "structured",
            Self::Keyword(_) => "keyword",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn mapping(value: Value) -> ToolInput {
        match value {
            Value::Object(map) => ToolInput::Mapping(map),
            _ => panic!("not an object"),
        }
    }

    #[rstest]
    #[case::empty_string(ToolInput::text(""), ToolInput::Absent)]
    #[case::blank_string(ToolInput::text("  \n"), ToolInput::Absent)]
    #[case::empty_mapping(mapping(json!({})), ToolInput::Absent)]
    #[case::json_string(ToolInput::text(r#"{"expression": "2+2"}"#), mapping(json!({"expression": "2+2"})))]
    #[case::json_empty_object(ToolInput::text("{}"), ToolInput::Absent)]
    #[case::plain_string(ToolInput::text("Mumbai"), ToolInput::text("Mumbai"))]
    #[case::broken_json(ToolInput::text("{not json"), ToolInput::text("{not json"))]
    fn test_normalize(#[case] input: ToolInput, #[case] expected: ToolInput) {
        assert_eq!(input.normalize(), expected);
    }

    #[rstest]
    #[case::null(json!(null), "absent")]
    #[case::object(json!({"a": 1}), "mapping")]
    #[case::string(json!("x"), "string")]
    #[case::number(json!(3), "string")]
    fn test_from_value_kind(#[case] value: Value, #[case] kind: &str) {
        assert_eq!(ToolInput::from_value(value).kind(), kind);
    }

    #[rstest]
    #[case::string(ToolResult::Success(json!("110")), "110")]
    #[case::object(ToolResult::Success(json!({"temp": 31})), r#"{"temp":31}"#)]
    #[case::failure(ToolResult::Failure("division by zero".into()), "Error executing calculate: division by zero")]
    fn test_to_observation(#[case] result: ToolResult, #[case] expected: &str) {
        assert_eq!(result.to_observation("calculate"), expected);
    }

    #[test]
    fn test_input_display() {
        assert_eq!(ToolInput::Absent.to_string(), "");
        assert_eq!(ToolInput::text("x").to_string(), "x");
        assert_eq!(mapping(json!({"a": "b"})).to_string(), r#"{"a":"b"}"#);
    }
}
