//! The two routing strategies: reading the model's classification and the
//! deterministic keyword fallback.

use super::config::RouterConfig;
use super::specialist::normalize_for_keywords;
use super::{Mode, RoutingDecision, RoutingSource};
use crate::error::{AgentError, RoutingError};
use crate::history::Query;

use regex::Regex;

/// `in Mumbai`, `near the Narmada`, `for Rajkot`.
const LOCATION_PATTERN: &str = r"\b(?:in|at|for|near|around|from)\s+(?:the\s+)?(\p{Lu}[\w\-]*)";

/// Two numbers joined by an operator. `-` is left out so ranges like
/// `2-3 days` do not count.
const ARITHMETIC_PATTERN: &str = r"\d(?:[\d.,]*)\s*[+*/^×÷]\s*\(?\s*\d";

/// Capitalized words after a preposition that are not places.
const NOT_LOCATIONS: &[&str] = &[
    "I", "Today", "Tomorrow", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday",
    "Saturday", "Sunday", "January", "February", "March", "April", "May", "June", "July",
    "August", "September", "October", "November", "December", "Kharif", "Rabi", "Zaid",
];

/// Read a classification response.
///
/// Tags are matched case-insensitively anywhere in the text, so both the
/// one-tag-per-line form and a single comma-separated line are accepted.
/// Unknown agent ids are dropped; a missing mode or an empty agent list makes
/// the response unparsable.
pub(crate) fn parse_classification(
    raw: &str,
    config: &RouterConfig,
) -> Result<RoutingDecision, RoutingError> {
    let text = raw.replace('*', "");
    let upper = text.to_ascii_uppercase();

    let mode = field(&text, &upper, "MODE:")
        .and_then(first_word)
        .and_then(|word| match word.to_ascii_uppercase().as_str() {
            "SIMPLE" => Some(Mode::Simple),
            "ITERATIVE" => Some(Mode::Iterative),
            _ => None,
        })
        .ok_or_else(|| RoutingError::Unparsable(format!("no MODE in '{}'", raw.trim())))?;

    let mut agents: Vec<String> = Vec::new();
    if let Some(value) = field(&text, &upper, "AGENTS:") {
        let list = match value.trim_start().strip_prefix('[') {
            Some(rest) => rest.split(']').next().unwrap_or(rest),
            None => value,
        };
        for item in list.split(',') {
            let id = item
                .trim()
                .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '[' | ']'))
                .trim()
                .to_lowercase()
                .replace([' ', '-'], "_");
            if config.specialist(&id).is_none() {
                if !id.is_empty() {
                    log::debug!("Dropping unknown agent id '{}' from classification", id);
                }
                continue;
            }
            if !agents.contains(&id) {
                agents.push(id);
            }
        }
    }
    if agents.is_empty() {
        return Err(RoutingError::Unparsable(format!(
            "no known agents in '{}'",
            raw.trim()
        )));
    }

    let parallel = field(&text, &upper, "PARALLEL:")
        .and_then(first_word)
        .map(|word| matches!(word.to_ascii_lowercase().as_str(), "yes" | "true"))
        .unwrap_or(false);

    let reasoning = field(&text, &upper, "REASONING:")
        .map(|value| value.trim().to_string())
        .unwrap_or_default();

    Ok(RoutingDecision {
        mode,
        parallel: parallel && agents.len() > 1,
        agents,
        reasoning,
        source: RoutingSource::Model,
    })
}

/// Text after `tag` up to the end of its line.
///
/// `upper` must be `text.to_ascii_uppercase()`, which keeps byte offsets.
fn field<'a>(text: &'a str, upper: &str, tag: &str) -> Option<&'a str> {
    let position = upper.match_indices(tag).map(|(i, _)| i).find(|&i| {
        upper[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_ascii_alphanumeric() && c != '_')
    })?;
    let rest = &text[position + tag.len()..];
    Some(rest.lines().next().unwrap_or(""))
}

fn first_word(value: &str) -> Option<&str> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .find(|word| !word.is_empty())
}

/// Deterministic routing from keyword lists. Never fails.
#[derive(Debug, Clone)]
pub(crate) struct KeywordRouter {
    location: Regex,
    arithmetic: Regex,
}

impl KeywordRouter {
    pub(crate) fn new() -> Result<Self, AgentError> {
        let location = Regex::new(LOCATION_PATTERN)
            .map_err(|e| AgentError::InvalidConfig(format!("location pattern: {}", e)))?;
        let arithmetic = Regex::new(ARITHMETIC_PATTERN)
            .map_err(|e| AgentError::InvalidConfig(format!("arithmetic pattern: {}", e)))?;
        Ok(Self {
            location,
            arithmetic,
        })
    }

    /// Whether the text names a place.
    pub(crate) fn has_location(&self, text: &str) -> bool {
        self.location.captures_iter(text).any(|captures| {
            captures
                .get(1)
                .map_or(false, |word| !NOT_LOCATIONS.contains(&word.as_str()))
        })
    }

    pub(crate) fn has_arithmetic(&self, text: &str) -> bool {
        self.arithmetic.is_match(text)
    }

    pub(crate) fn route(&self, query: &Query, config: &RouterConfig) -> RoutingDecision {
        let normalized = normalize_for_keywords(query.text());

        let mut matched: Vec<&str> = config
            .specialists
            .iter()
            .filter(|s| s.id != config.default_specialist && s.matches(&normalized))
            .map(|s| s.id.as_str())
            .collect();

        let arithmetic = self.has_arithmetic(query.text());
        if arithmetic {
            if let Some(computational) = config.specialists.iter().find(|s| s.computational) {
                if !matched.contains(&computational.id.as_str()) {
                    matched.push(computational.id.as_str());
                }
            }
        }

        let needs_location = matched
            .iter()
            .filter_map(|id| config.specialist(id))
            .any(|s| s.location_sensitive)
            && !self.has_location(query.text())
            && !query
                .recent(config.classification_history_turns)
                .iter()
                .any(|turn| self.has_location(&turn.content));

        let mode = if arithmetic || needs_location {
            Mode::Iterative
        } else {
            Mode::Simple
        };

        let reasoning = if matched.is_empty() {
            "Keyword fallback: no specialist keywords matched".to_string()
        } else {
            let mut reasoning = format!("Keyword fallback: matched {}", matched.join(", "));
            if arithmetic {
                reasoning.push_str("; arithmetic needs a calculation");
            }
            if needs_location {
                reasoning.push_str("; location-sensitive with no location given");
            }
            reasoning
        };

        let agents: Vec<String> = if matched.is_empty() {
            vec![config.default_specialist.clone()]
        } else {
            matched.into_iter().map(String::from).collect()
        };

        RoutingDecision {
            mode,
            parallel: agents.len() > 1,
            agents,
            reasoning,
            source: RoutingSource::KeywordFallback,
        }
    }
}
