//! Turn Memory
//!
//! Bounded FIFO window over the conversation. Keeps the last `k` exchange pairs
//! (2·k turns) and renders them as a plain transcript for the SQL generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TurnMemory {
    turns: VecDeque<Turn>,
    k: usize,
}

impl TurnMemory {
    pub fn new(k: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            k,
        }
    }

    /// Maximum number of turns retained.
    pub fn capacity(&self) -> usize {
        self.k.saturating_mul(2)
    }

    /// Append a turn, evicting the oldest ones beyond the window.
    pub fn record(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push_back(Turn {
            role,
            text: text.into(),
            recorded_at: Utc::now(),
        });
        while self.turns.len() > self.capacity() {
            self.turns.pop_front();
        }
    }

    pub fn record_user(&mut self, text: impl Into<String>) {
        self.record(Role::User, text);
    }

    pub fn record_assistant(&mut self, text: impl Into<String>) {
        self.record(Role::Assistant, text);
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Transcript of the retained window, oldest first.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.role.label(), turn.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
