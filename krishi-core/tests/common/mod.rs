//! Shared test utilities for integration tests
//!
//! Mock versions of the built-in tools that record what they were called
//! with, plus context builders around a scripted model.

// Allow unused code - each test file includes this module separately,
// so not all functions are used in every compilation unit.
#![allow(dead_code)]

use async_trait::async_trait;
use krishi_core::{
    AgentContext, KeywordTool, LlmClient, LlmConfig, NoArgTool, ScriptedModel, TextTool, Tool,
    ToolBinding, ToolError, ToolRegistry,
};
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};

/// Inputs a mock tool was called with, in call order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

fn record(log: &CallLog, entry: String) {
    log.lock().unwrap().push(entry);
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// `calculate`: knows a handful of expressions.
#[derive(Debug, Default)]
pub struct MockCalculator {
    pub log: CallLog,
}

impl Tool for MockCalculator {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate a mathematical expression"
    }
}

#[async_trait]
impl TextTool for MockCalculator {
    async fn call(&self, input: &str) -> Result<Value, ToolError> {
        record(&self.log, input.to_string());
        match input.replace(' ', "").as_str() {
            "25*4+10" => Ok(json!("110")),
            "2+2" => Ok(json!("4")),
            other => Err(ToolError::InvalidInput(format!("cannot evaluate '{}'", other))),
        }
    }
}

/// `get_location`: fixed location record.
#[derive(Debug, Default)]
pub struct MockLocation {
    pub log: CallLog,
}

impl Tool for MockLocation {
    fn name(&self) -> &str {
        "get_location"
    }

    fn description(&self) -> &str {
        "Get the user's current location"
    }
}

#[async_trait]
impl NoArgTool for MockLocation {
    async fn call(&self) -> Result<Value, ToolError> {
        record(&self.log, String::new());
        Ok(json!({"city": "Baroda", "region": "Jamjodhpur", "country": "India"}))
    }
}

/// `get_weather`: keyword tool with a single `location` parameter.
#[derive(Debug, Default)]
pub struct MockWeather {
    pub log: CallLog,
}

impl Tool for MockWeather {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get current weather for a location"
    }
}

#[async_trait]
impl KeywordTool for MockWeather {
    fn parameters(&self) -> &[&str] {
        &["location"]
    }

    async fn call(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let location = args
            .get("location")
            .and_then(Value::as_str)
            .unwrap_or("Baroda, Jamjodhpur")
            .to_string();
        record(&self.log, location.clone());
        Ok(json!({"location": location, "temperature_c": 31, "condition": "Sunny"}))
    }
}

/// Call logs of the three mock tools.
#[derive(Debug, Default, Clone)]
pub struct ToolLogs {
    pub calculate: CallLog,
    pub get_location: CallLog,
    pub get_weather: CallLog,
}

/// Registry with the three mock tools and handles on their call logs.
pub fn mock_registry() -> (ToolRegistry, ToolLogs) {
    let logs = ToolLogs::default();
    let mut registry = ToolRegistry::new();
    registry
        .register(ToolBinding::text(MockCalculator {
            log: logs.calculate.clone(),
        }))
        .register(ToolBinding::no_arg(MockLocation {
            log: logs.get_location.clone(),
        }))
        .register(ToolBinding::keyword(MockWeather {
            log: logs.get_weather.clone(),
        }));
    (registry, logs)
}

/// Context over a scripted model and the mock tools.
pub fn scripted_context(model: Arc<ScriptedModel>) -> (AgentContext, ToolLogs) {
    let (registry, logs) = mock_registry();
    let llm = LlmClient::from_arc(model, LlmConfig::default());
    (AgentContext::from_arcs(Arc::new(llm), Arc::new(registry)), logs)
}
