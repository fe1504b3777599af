pub mod config;
pub mod conversation;
pub mod data_assistant;
pub mod error;
pub mod llm;
pub mod query_guard;
pub mod result_format;
pub mod schema_rag;
pub mod sql_engine;

pub use config::{ConversationConfig, Settings};
pub use conversation::{DialogueOrchestrator, DialogueStep};
pub use data_assistant::{AssistantReply, DataAssistant};
pub use error::{AssistantError, Result};
