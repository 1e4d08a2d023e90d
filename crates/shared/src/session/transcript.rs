use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::llm::AssistantAction;

/// One completed request/response exchange. Fields are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    action: AssistantAction,
    request: String,
    response: String,
    created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(
        action: AssistantAction,
        request: impl Into<String>,
        response: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            action,
            request: request.into(),
            response: response.into(),
            created_at,
        }
    }

    pub fn action(&self) -> AssistantAction {
        self.action
    }

    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayEntry<'a> {
    /// 1 is the most recent turn.
    pub position: usize,
    #[serde(flatten)]
    pub turn: &'a Turn,
}

/// Append-only history for one session. Only the session controller writes to it.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub(crate) fn clear(&mut self) {
        self.turns.clear();
    }

    /// Chronological, oldest first.
    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn display_order(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().rev()
    }

    pub fn display_entries(&self) -> Vec<DisplayEntry<'_>> {
        self.display_order()
            .enumerate()
            .map(|(index, turn)| DisplayEntry {
                position: index + 1,
                turn,
            })
            .collect()
    }

    /// The newest `max_turns` turns in chronological order, or all of them for `None`.
    pub fn recent(&self, max_turns: Option<usize>) -> &[Turn] {
        match max_turns {
            Some(max_turns) => {
                let start = self.turns.len().saturating_sub(max_turns);
                &self.turns[start..]
            }
            None => &self.turns,
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
