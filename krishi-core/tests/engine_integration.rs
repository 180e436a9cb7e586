//! End-to-end runs of the iteration engine over scripted model responses
//! and the mock tools.

mod common;

use common::{calls, mock_registry, scripted_context};
use krishi_core::{
    EngineConfig, IterationEngine, Query, RunStatus, ScriptedModel, ToolInput, ToolResult,
};
use rstest::rstest;
use std::sync::Arc;

fn engine(max_iterations: usize) -> IterationEngine {
    IterationEngine::new(EngineConfig::default().with_max_iterations(max_iterations)).unwrap()
}

const LOCATE: &str = "THOUGHT: I need the user's location first.\nACTION: get_location\nACTION_INPUT:";
const WEATHER: &str = "THOUGHT: Now the weather for Baroda.\nACTION: get_weather\nACTION_INPUT: {\"location\": \"Baroda, Jamjodhpur\"}";
const WEATHER_FINAL: &str = "THOUGHT: I have the weather.\nFINAL_ANSWER: It is sunny and 31°C in Baroda today.";

#[tokio::test]
async fn test_arithmetic_scenario() {
    let model = Arc::new(ScriptedModel::from_texts([
        "THOUGHT: I need to calculate this.\nACTION: calculate\nACTION_INPUT: {\"expression\": \"25*4+10\"}",
        "THOUGHT: The calculator returned 110.\nFINAL_ANSWER: 25*4+10 = 110",
    ]));
    let (context, logs) = scripted_context(model.clone());

    let outcome = engine(3)
        .run(&Query::new("What is 25*4+10?"), &context)
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.iterations, 2);
    assert!(outcome.final_answer.contains("110"));
    assert_eq!(calls(&logs.calculate), vec!["25*4+10"]);

    assert_eq!(outcome.steps.len(), 2);
    assert_eq!(outcome.steps[0].action.as_deref(), Some("calculate"));
    assert_eq!(outcome.steps[0].observation.as_deref(), Some("110"));
    assert!(outcome.steps[1].is_final);

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].prompt.contains("OBSERVATION: 110"));
}

#[tokio::test]
async fn test_weather_scenario_within_budget() {
    let model = Arc::new(ScriptedModel::from_texts([LOCATE, WEATHER, WEATHER_FINAL]));
    let (context, logs) = scripted_context(model.clone());

    let outcome = engine(3)
        .run(&Query::new("What's the weather today?"), &context)
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert!(outcome.iterations <= 3);
    assert_eq!(calls(&logs.get_location).len(), 1);
    assert_eq!(calls(&logs.get_weather), vec!["Baroda, Jamjodhpur"]);
    assert!(outcome.final_answer.contains("sunny"));
    assert_eq!(model.call_count(), 3);

    // The weather step is decided with the location observation in view.
    let requests = model.requests();
    assert!(requests[1].prompt.contains("ACTION: get_location"));
    assert!(requests[1].prompt.contains("OBSERVATION: {"));
    assert!(requests[1].prompt.contains(r#""city":"Baroda""#));
    assert!(requests[1].prompt.contains(r#""region":"Jamjodhpur""#));
    assert!(requests[2].prompt.contains(r#""condition":"Sunny""#));
}

#[tokio::test]
async fn test_weather_scenario_exhausted() {
    let model = Arc::new(ScriptedModel::from_texts([LOCATE, WEATHER, WEATHER_FINAL]));
    let (context, _logs) = scripted_context(model.clone());

    let outcome = engine(2)
        .run(&Query::new("What's the weather today?"), &context)
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Exhausted);
    assert!(outcome.is_exhausted());
    assert_eq!(outcome.iterations, 2);
    assert_eq!(model.call_count(), 2);
    assert!(outcome.steps.iter().all(|step| !step.is_final));
    // Best effort comes from the last successful observation.
    assert!(outcome.final_answer.contains("Sunny"));
    assert!(outcome.final_answer.contains("Baroda"));
}

#[rstest]
#[case::one(1)]
#[case::three(3)]
#[case::five(5)]
#[tokio::test]
async fn test_model_calls_bounded(#[case] max_iterations: usize) {
    let model = Arc::new(ScriptedModel::from_texts(vec![LOCATE; 10]));
    let (context, logs) = scripted_context(model.clone());

    let outcome = engine(max_iterations)
        .run(&Query::new("Where am I?"), &context)
        .await
        .unwrap();

    assert_eq!(model.call_count(), max_iterations);
    assert_eq!(outcome.steps.len(), max_iterations);
    assert_eq!(calls(&logs.get_location).len(), max_iterations);
    assert!(outcome.is_exhausted());
}

#[tokio::test]
async fn test_final_answer_wins_over_action() {
    let model = Arc::new(ScriptedModel::from_texts([
        "THOUGHT: Easy.\nACTION: calculate\nACTION_INPUT: 2+2\nFINAL_ANSWER: 4",
    ]));
    let (context, logs) = scripted_context(model.clone());

    let outcome = engine(3).run(&Query::new("What is 2+2?"), &context).await.unwrap();

    assert_eq!(outcome.final_answer, "4");
    assert_eq!(outcome.iterations, 1);
    assert!(calls(&logs.calculate).is_empty());
    assert_eq!(outcome.steps.iter().filter(|step| step.is_final).count(), 1);
}

#[tokio::test]
async fn test_unknown_tool_becomes_observation() {
    let model = Arc::new(ScriptedModel::from_texts([
        "THOUGHT: Check the soil.\nACTION: get_soil_report\nACTION_INPUT: {}",
        "THOUGHT: No such tool, answer directly.\nFINAL_ANSWER: Test your soil pH with a kit.",
    ]));
    let (context, _logs) = scripted_context(model.clone());

    let outcome = engine(3)
        .run(&Query::new("Is my soil acidic?"), &context)
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.iterations, 2);

    let first = &outcome.steps[0];
    assert!(first.tool_failed);
    let observation = first.observation.as_deref().unwrap_or_default();
    assert!(observation.contains("Unknown tool 'get_soil_report'"));
    assert!(observation.contains("calculate, get_location, get_weather"));
    assert!(model.requests()[1].prompt.contains("Unknown tool 'get_soil_report'"));
}

#[tokio::test]
async fn test_tool_error_becomes_observation() {
    let model = Arc::new(ScriptedModel::from_texts([
        "THOUGHT: Calculate.\nACTION: calculate\nACTION_INPUT: sqrt(-1)",
        "THOUGHT: The tool failed.\nFINAL_ANSWER: That has no real answer.",
    ]));
    let (context, _logs) = scripted_context(model);

    let outcome = engine(3).run(&Query::new("sqrt(-1)?"), &context).await.unwrap();

    assert!(outcome.steps[0].tool_failed);
    assert!(outcome.steps[0]
        .observation
        .as_deref()
        .unwrap_or_default()
        .starts_with("Error executing calculate:"));
    assert_eq!(outcome.final_answer, "That has no real answer.");
}

#[tokio::test]
async fn test_absent_parameter_never_raises() {
    let (registry, logs) = mock_registry();

    for name in ["calculate", "get_location", "get_weather"] {
        assert!(
            registry.invoke(name, ToolInput::Absent).await.is_ok(),
            "absent parameter raised for {}",
            name
        );
    }
    assert_eq!(calls(&logs.get_location).len(), 1);
    assert_eq!(calls(&logs.get_weather), vec!["Baroda, Jamjodhpur"]);
}

#[tokio::test]
async fn test_explicit_empty_value_reaches_tool() {
    let (registry, logs) = mock_registry();

    let result = registry
        .invoke("calculate", ToolInput::text(""))
        .await
        .unwrap();

    // The tool itself saw the empty string and rejected it.
    assert_eq!(calls(&logs.calculate), vec![""]);
    assert!(matches!(result, ToolResult::Failure(_)));
}

#[tokio::test]
async fn test_no_tags_is_degraded_success() {
    let model = Arc::new(ScriptedModel::from_texts([
        "Organic mulch keeps moisture in and weeds down.",
    ]));
    let (context, _logs) = scripted_context(model);

    let outcome = engine(3)
        .run(&Query::new("Why mulch?"), &context)
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Degraded);
    assert_eq!(outcome.final_answer, "Organic mulch keeps moisture in and weeds down.");
    assert_eq!(outcome.iterations, 1);
}
