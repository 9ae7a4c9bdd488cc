use serde::{Deserialize, Serialize};

use crate::models::candidate::ScheduleCandidate;

/// History is capped to a sliding window; the oldest turns fall off first.
pub const MAX_TURNS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Per-conversation mutable state: the bounded turn history and the
/// not-yet-complete candidate being filled in across turns.
#[derive(Debug, Default, Clone)]
pub struct ConversationState {
    pub history: Vec<ChatTurn>,
    pub pending: Option<ScheduleCandidate>,
}

impl ConversationState {
    pub fn push_turn(&mut self, turn: ChatTurn) {
        self.history.push(turn);
        if self.history.len() > MAX_TURNS {
            let excess = self.history.len() - MAX_TURNS;
            self.history.drain(..excess);
        }
    }

    /// Assistant turns, newest first, for slot and title back-fill lookups.
    pub fn assistant_turns_newest_first(&self) -> impl Iterator<Item = &ChatTurn> {
        self.history
            .iter()
            .rev()
            .filter(|t| t.role == Role::Assistant)
    }
}
