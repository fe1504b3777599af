//! Dialogue Orchestrator
//!
//! Decides, once per user turn, whether the question can go to SQL generation or
//! needs clarifying first. A turn runs in two phases:
//!
//! 1. commit: the user text is recorded and folded into the preferences. This
//!    happens on every turn, including ones that end in a clarification, so
//!    partial answers carry over to the next turn.
//! 2. decide: a pure read of the committed state that yields either the
//!    clarifying questions or the transcript plus preference hints.

use crate::config::ConversationConfig;
use crate::conversation::ambiguity::{AmbiguityDetector, AmbiguityFlag};
use crate::conversation::memory::TurnMemory;
use crate::conversation::preferences::PreferenceModel;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DialogueState {
    AwaitingInput,
    Ready,
}

/// Outcome of one user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DialogueStep {
    Clarification {
        flags: Vec<AmbiguityFlag>,
        questions: Vec<String>,
        assistant_reply: String,
    },
    Proceed {
        transcript: String,
        preference_hints: String,
    },
}

impl DialogueStep {
    pub fn need_clarification(&self) -> bool {
        matches!(self, DialogueStep::Clarification { .. })
    }
}

pub struct DialogueOrchestrator {
    memory: TurnMemory,
    preferences: PreferenceModel,
    detector: AmbiguityDetector,
    state: DialogueState,
    clarification_streak: usize,
}

impl DialogueOrchestrator {
    pub fn new(config: ConversationConfig) -> Self {
        Self {
            memory: TurnMemory::new(config.memory_k),
            preferences: PreferenceModel::new(),
            detector: AmbiguityDetector::new(),
            state: DialogueState::AwaitingInput,
            clarification_streak: 0,
        }
    }

    /// Handle one user turn. Never fails: every input yields exactly one step.
    pub fn next_action(&mut self, user_text: &str) -> DialogueStep {
        self.state = DialogueState::AwaitingInput;
        self.commit_turn(user_text);

        let step = self.decide(user_text);
        match &step {
            DialogueStep::Clarification {
                flags,
                assistant_reply,
                ..
            } => {
                debug!(flags = ?flags, "clarification needed");
                self.memory.record_assistant(assistant_reply.clone());
                self.clarification_streak += 1;
            }
            DialogueStep::Proceed { .. } => {
                self.state = DialogueState::Ready;
                self.clarification_streak = 0;
            }
        }
        step
    }

    fn commit_turn(&mut self, user_text: &str) {
        self.memory.record_user(user_text);
        self.preferences.update(user_text);
    }

    /// Pure decision over the committed state for the given turn text.
    pub fn decide(&self, user_text: &str) -> DialogueStep {
        let flags = self.detector.detect(user_text, &self.preferences);
        if !flags.is_empty() {
            let questions = self.detector.questions(&flags);
            let assistant_reply = format!("Clarification needed:\n- {}", questions.join("\n- "));
            return DialogueStep::Clarification {
                flags,
                questions,
                assistant_reply,
            };
        }

        DialogueStep::Proceed {
            transcript: self.memory.render(),
            preference_hints: self.preferences.hint_block(),
        }
    }

    /// Store the caller's final answer so later turns can refer back to it.
    pub fn record_assistant(&mut self, text: impl Into<String>) {
        self.memory.record_assistant(text);
    }

    pub fn preferences(&self) -> &PreferenceModel {
        &self.preferences
    }

    pub fn memory(&self) -> &TurnMemory {
        &self.memory
    }

    pub fn state(&self) -> DialogueState {
        self.state
    }

    /// Consecutive turns that ended in a clarification.
    pub fn clarification_streak(&self) -> usize {
        self.clarification_streak
    }
}

impl Default for DialogueOrchestrator {
    fn default() -> Self {
        Self::new(ConversationConfig::default())
    }
}
