//! Conversation Engine
//!
//! The dialogue disambiguation layer: bounded turn memory, the preference model
//! built from user answers, the ambiguity detector, and the orchestrator that
//! turns them into one next action per user turn. Nothing in here performs I/O.

pub mod ambiguity;
pub mod error_normalizer;
pub mod memory;
pub mod orchestrator;
pub mod preferences;

pub use ambiguity::{AmbiguityDetector, AmbiguityFlag};
pub use error_normalizer::{normalize, ExecutionFailure};
pub use memory::{Role, Turn, TurnMemory};
pub use orchestrator::{DialogueOrchestrator, DialogueState, DialogueStep};
pub use preferences::{CountryField, DateField, Metric, PreferenceModel, TimeGranularity};
