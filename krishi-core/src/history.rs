//! Queries and the conversation turns that precede them.
//!
//! The core never stores history: it is handed in with each [`Query`] by the
//! persistence collaborator and read, never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
            Role::System => write!(f, "System"),
        }
    }
}

/// A single role/content pair of prior conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A submitted user query together with its prior turns (most recent last).
///
/// Immutable once built: the fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    text: String,
    history: Vec<Turn>,
}

impl Query {
    /// Create a query with no prior conversation.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            history: Vec::new(),
        }
    }

    /// Attach prior conversation turns, ordered oldest first.
    #[must_use]
    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// The last `n` turns of history.
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }
}

/// Render turns as `Role: content` lines for inclusion in a prompt.
///
/// Returns an empty string for no turns.
pub fn render_turns(turns: &[Turn]) -> String {
    if turns.is_empty() {
        return String::new();
    }

    let mut context = String::from("Previous conversation:\n");
    for turn in turns {
        context.push_str(&format!("{}: {}\n", turn.role, turn.content.trim()));
    }
    context
}
