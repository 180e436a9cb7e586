//! Response parser for the THOUGHT / ACTION / ACTION_INPUT / FINAL_ANSWER
//! grammar.
//!
//! The parser is a deterministic line scanner. A line starting with a tag
//! opens that section; untagged lines continue the current one. Tags are
//! case-insensitive and tolerate the spellings models actually produce:
//!
//! ```text
//! THOUGHT: I need the expression evaluated.
//! **Action:** calculate
//! Action Input: {"expression": "25*4+10"}
//! ```
//!
//! The first occurrence of each tag wins. `FINAL_ANSWER` consumes the rest of
//! the response. `OBSERVATION` sections are dropped, since observations come
//! from tools and never from the model. A response with no tags at all is
//! reported through [`ParsedResponse::is_unstructured`] rather than as an
//! error.

use crate::tool::ToolInput;
use serde_json::Value;

/// Fields extracted from one model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    /// Reasoning text; empty when none was given.
    pub thought: String,
    /// Name of the tool to invoke.
    pub action: Option<String>,
    /// Parameter for the tool; [`ToolInput::Absent`] when not given.
    pub action_input: ToolInput,
    /// Terminal answer text.
    pub final_answer: Option<String>,
}

impl ParsedResponse {
    /// True when no structured field could be extracted.
    pub fn is_unstructured(&self) -> bool {
        self.thought.is_empty() && self.action.is_none() && self.final_answer.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Thought,
    Action,
    ActionInput,
    FinalAnswer,
    Ignored,
}

#[derive(Default)]
struct Sections {
    preamble: String,
    thought: Option<String>,
    action: Option<String>,
    action_input: Option<String>,
    final_answer: Option<String>,
    tagged: bool,
}

impl Sections {
    fn slot(&mut self, section: Section) -> Option<&mut Option<String>> {
        match section {
            Section::Thought => Some(&mut self.thought),
            Section::Action => Some(&mut self.action),
            Section::ActionInput => Some(&mut self.action_input),
            Section::FinalAnswer => Some(&mut self.final_answer),
            Section::Preamble | Section::Ignored => None,
        }
    }

    /// Open a section. Returns the section to append to, which is
    /// `Ignored` when the tag was already seen.
    fn open(&mut self, section: Section, rest: &str) -> Section {
        self.tagged = true;
        match self.slot(section) {
            Some(slot) if slot.is_none() => {
                *slot = Some(rest.to_string());
                section
            }
            _ => Section::Ignored,
        }
    }

    fn append(&mut self, section: Section, line: &str) {
        if section == Section::Preamble {
            self.preamble.push_str(line);
            self.preamble.push('\n');
            return;
        }
        if let Some(Some(text)) = self.slot(section) {
            text.push('\n');
            text.push_str(line);
        }
    }
}

/// Parse a raw model response.
///
/// Never fails: a response without tags yields an unstructured result.
pub fn parse(raw: &str) -> ParsedResponse {
    let mut sections = Sections::default();
    let mut current = Section::Preamble;

    for line in raw.lines() {
        if current == Section::FinalAnswer {
            sections.append(current, line);
            continue;
        }
        match match_tag(line) {
            Some((section, rest)) => current = sections.open(section, rest),
            None => sections.append(current, line),
        }
    }

    let thought = match sections.thought.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ if sections.tagged => sections.preamble.trim().to_string(),
        _ => String::new(),
    };

    let (action, inline_input) = match sections.action.as_deref() {
        Some(text) => parse_action(text),
        None => (None, None),
    };

    let action_input = match (sections.action_input.as_deref(), inline_input) {
        (Some(text), _) => parse_action_input(text),
        (None, Some(text)) => parse_action_input(&text),
        (None, None) => ToolInput::Absent,
    };

    let final_answer = sections
        .final_answer
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    ParsedResponse {
        thought,
        action,
        action_input,
        final_answer,
    }
}

/// Recognize a tag at the start of a line, returning the section and the
/// text following the colon.
fn match_tag(line: &str) -> Option<(Section, &str)> {
    let trimmed = line.trim_start_matches(|c: char| c.is_whitespace() || "*_#>-".contains(c));
    let colon = trimmed.find(':')?;
    let label = trimmed[..colon]
        .trim()
        .trim_matches(|c: char| c == '*' || c == '_');

    if label.len() > "FINAL_ANSWER".len() + 1 {
        return None;
    }
    let key: String = label
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();

    let section = match key.as_str() {
        "THOUGHT" => Section::Thought,
        "ACTION" => Section::Action,
        "ACTION_INPUT" | "ACTIONINPUT" => Section::ActionInput,
        "FINAL_ANSWER" | "FINALANSWER" => Section::FinalAnswer,
        "OBSERVATION" => Section::Ignored,
        _ => return None,
    };

    let rest = trimmed[colon + 1..]
        .trim_start_matches(|c: char| c == '*' || c == '_')
        .trim_start();
    Some((section, rest))
}

/// Extract the tool name, plus any inline `name[input]` / `name(input)`.
fn parse_action(text: &str) -> (Option<String>, Option<String>) {
    let text = text
        .trim()
        .trim_start_matches(|c: char| "[`'\"*".contains(c))
        .trim_start();

    let end = text
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(text.len(), |(i, _)| i);
    let name = &text[..end];

    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_ok || matches!(name.to_ascii_lowercase().as_str(), "none" | "null") {
        return (None, None);
    }

    let rest = text[end..].trim();
    let inline = [('[', ']'), ('(', ')')]
        .iter()
        .find_map(|(open, close)| {
            rest.strip_prefix(*open)
                .and_then(|r| r.lines().next())
                .and_then(|r| r.trim_end().strip_suffix(*close))
        })
        .map(str::trim)
        .filter(|inner| !inner.is_empty())
        .map(String::from);

    (Some(name.to_string()), inline)
}

/// Interpret action-input text as a mapping, a string, or nothing.
fn parse_action_input(text: &str) -> ToolInput {
    let text = strip_code_fence(text.trim());

    if text.is_empty() || matches!(text.to_ascii_lowercase().as_str(), "none" | "null" | "n/a") {
        return ToolInput::Absent;
    }

    if text.starts_with('{') {
        if let Some(map) = parse_object(text) {
            return ToolInput::Mapping(map);
        }
    }

    if text.starts_with('"') {
        if let Ok(Value::String(s)) = serde_json::from_str::<Value>(text) {
            return ToolInput::Text(s);
        }
    }

    ToolInput::Text(text.to_string())
}

/// Parse a JSON object, tolerating trailing text and single quotes.
fn parse_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    let end = text.rfind('}')?;
    let candidate = &text[..=end];

    let parsed = serde_json::from_str::<Value>(candidate)
        .or_else(|_| serde_json::from_str::<Value>(&candidate.replace('\'', "\"")));

    match parsed {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(body) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line, then the closing fence.
    let body = body.split_once('\n').map_or("", |(_, rest)| rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn mapping(value: Value) -> ToolInput {
        ToolInput::from_value(value)
    }

    #[test]
    fn test_parse_full_action() {
        let parsed = parse(
            "THOUGHT: I need to compute this.\nACTION: calculate\nACTION_INPUT: {\"expression\": \"25*4+10\"}",
        );
        assert_eq!(parsed.thought, "I need to compute this.");
        assert_eq!(parsed.action.as_deref(), Some("calculate"));
        assert_eq!(parsed.action_input, mapping(json!({"expression": "25*4+10"})));
        assert!(parsed.final_answer.is_none());
    }

    #[test]
    fn test_parse_final_answer_consumes_remainder() {
        let parsed = parse("THOUGHT: done\nFINAL_ANSWER: The result is 110.\n\nACTION: calculate\nMore text");
        assert_eq!(
            parsed.final_answer.as_deref(),
            Some("The result is 110.\n\nACTION: calculate\nMore text")
        );
        assert!(parsed.action.is_none());
    }

    #[test]
    fn test_parse_action_and_final_both_present() {
        let parsed = parse("ACTION: get_weather\nACTION_INPUT: {}\nFINAL_ANSWER: It is sunny.");
        assert_eq!(parsed.action.as_deref(), Some("get_weather"));
        assert_eq!(parsed.final_answer.as_deref(), Some("It is sunny."));
    }

    #[test]
    fn test_parse_no_tags() {
        let parsed = parse("Just a plain answer without any structure.");
        assert!(parsed.is_unstructured());
        assert_eq!(parsed.action_input, ToolInput::Absent);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").is_unstructured());
    }

    #[rstest]
    #[case::upper("THOUGHT: x\nACTION: calculate")]
    #[case::lower("thought: x\naction: calculate")]
    #[case::title("Thought: x\nAction: calculate")]
    #[case::bold("**THOUGHT:** x\n**ACTION:** calculate")]
    #[case::bold_outside("**Thought**: x\n**Action**: calculate")]
    #[case::indented("   THOUGHT: x\n\tACTION:   calculate  ")]
    #[case::bulleted("- THOUGHT: x\n- ACTION: calculate")]
    #[case::bracketed("THOUGHT: x\nACTION: [calculate]")]
    #[case::backticks("THOUGHT: x\nACTION: `calculate`")]
    #[case::order_swapped("ACTION: calculate\nTHOUGHT: x")]
    fn test_tag_spellings(#[case] raw: &str) {
        let parsed = parse(raw);
        assert_eq!(parsed.thought, "x");
        assert_eq!(parsed.action.as_deref(), Some("calculate"));
    }

    #[rstest]
    #[case::underscore("ACTION_INPUT: 2+2")]
    #[case::space("Action Input: 2+2")]
    #[case::hyphen("action-input: 2+2")]
    fn test_action_input_spellings(#[case] line: &str) {
        let parsed = parse(&format!("ACTION: calculate\n{}", line));
        assert_eq!(parsed.action_input, ToolInput::text("2+2"));
    }

    #[rstest]
    #[case::final_underscore("FINAL_ANSWER: 42")]
    #[case::final_space("Final Answer: 42")]
    #[case::final_bold("**Final Answer:** 42")]
    fn test_final_answer_spellings(#[case] raw: &str) {
        assert_eq!(parse(raw).final_answer.as_deref(), Some("42"));
    }

    #[rstest]
    #[case::json(r#"{"expression": "25*4+10"}"#, mapping(json!({"expression": "25*4+10"})))]
    #[case::single_quotes("{'location': 'Mumbai'}", mapping(json!({"location": "Mumbai"})))]
    #[case::trailing_text(r#"{"location": "Pune"} (city)"#, mapping(json!({"location": "Pune"})))]
    #[case::fenced("```json\n{\"a\": 1}\n```", mapping(json!({"a": 1})))]
    #[case::quoted(r#""Mumbai""#, ToolInput::text("Mumbai"))]
    #[case::plain("25 * 4 + 10", ToolInput::text("25 * 4 + 10"))]
    #[case::broken_json("{location: Pune", ToolInput::text("{location: Pune"))]
    #[case::empty("", ToolInput::Absent)]
    #[case::none("None", ToolInput::Absent)]
    #[case::null("null", ToolInput::Absent)]
    fn test_action_input_values(#[case] input: &str, #[case] expected: ToolInput) {
        let parsed = parse(&format!("ACTION: tool\nACTION_INPUT: {}", input));
        assert_eq!(parsed.action_input, expected);
    }

    #[test]
    fn test_action_input_multiline_json() {
        let parsed = parse("ACTION: get_weather\nACTION_INPUT: {\n  \"location\": \"Rajkot\"\n}");
        assert_eq!(parsed.action_input, mapping(json!({"location": "Rajkot"})));
    }

    #[test]
    fn test_missing_action_input_is_absent() {
        let parsed = parse("THOUGHT: where am I\nACTION: get_location");
        assert_eq!(parsed.action.as_deref(), Some("get_location"));
        assert_eq!(parsed.action_input, ToolInput::Absent);
    }

    #[rstest]
    #[case::square("ACTION: calculate[25*4]", "25*4")]
    #[case::paren("ACTION: calculate(25*4)", "25*4")]
    fn test_inline_action_input(#[case] raw: &str, #[case] expected: &str) {
        let parsed = parse(raw);
        assert_eq!(parsed.action.as_deref(), Some("calculate"));
        assert_eq!(parsed.action_input, ToolInput::text(expected));
    }

    #[test]
    fn test_explicit_input_beats_inline() {
        let parsed = parse("ACTION: calculate[1+1]\nACTION_INPUT: 2+2");
        assert_eq!(parsed.action_input, ToolInput::text("2+2"));
    }

    #[rstest]
    #[case::none("ACTION: none")]
    #[case::null("ACTION: NULL")]
    #[case::blank("ACTION:")]
    #[case::not_identifier("ACTION: 42")]
    fn test_non_actions(#[case] raw: &str) {
        assert!(parse(raw).action.is_none());
    }

    #[test]
    fn test_first_occurrence_wins() {
        let parsed = parse("THOUGHT: first\nACTION: get_location\nTHOUGHT: second\nACTION: calculate");
        assert_eq!(parsed.thought, "first");
        assert_eq!(parsed.action.as_deref(), Some("get_location"));
    }

    #[test]
    fn test_untagged_lines_continue_section() {
        let parsed = parse("THOUGHT: line one\nline two\nACTION: get_location");
        assert_eq!(parsed.thought, "line one\nline two");
    }

    #[test]
    fn test_preamble_becomes_thought() {
        let parsed = parse("Let me check the weather first.\nACTION: get_location");
        assert_eq!(parsed.thought, "Let me check the weather first.");
    }

    #[test]
    fn test_hallucinated_observation_dropped() {
        let parsed = parse(
            "THOUGHT: check\nACTION: get_weather\nACTION_INPUT: {\"location\": \"Pune\"}\nOBSERVATION: sunny 40C\nit is hot",
        );
        assert_eq!(parsed.action_input, mapping(json!({"location": "Pune"})));
        assert_eq!(parsed.thought, "check");
    }

    #[test]
    fn test_empty_final_answer_is_none() {
        let parsed = parse("THOUGHT: hmm\nFINAL_ANSWER:   ");
        assert!(parsed.final_answer.is_none());
        assert_eq!(parsed.thought, "hmm");
    }

    #[test]
    fn test_colon_in_ordinary_text_is_not_a_tag() {
        let parsed = parse("Note: the weather varies.\nRatio is 3:1");
        assert!(parsed.is_unstructured());
    }

    #[test]
    fn test_multibyte_text() {
        let parsed = parse("THOUGHT: मौसम देखना है\nFINAL_ANSWER: आज धूप है।");
        assert_eq!(parsed.thought, "मौसम देखना है");
        assert_eq!(parsed.final_answer.as_deref(), Some("आज धूप है।"));
    }
}
