//! Data Assistant
//!
//! Runs one analytics conversation end to end:
//! 1. The dialogue orchestrator decides whether the turn needs clarifying
//! 2. Otherwise schema context is retrieved for the current question
//! 3. The generator writes SQL bound by the preference hints
//! 4. The executor runs it; failures are normalized and fed back to the
//!    generator for a bounded number of retries

use crate::config::{ConversationConfig, Settings};
use crate::conversation::{normalize, DialogueOrchestrator, DialogueStep};
use crate::error::{AssistantError, Result};
use crate::llm::{FailedAttempt, GenerationRequest, LlmClient, SqlGenerator};
use crate::result_format::render_markdown;
use crate::schema_rag::{Retriever, SchemaRetriever};
use crate::sql_engine::{SqlExecutor, SqliteEngine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub const DEFAULT_MAX_RETRIES: usize = 2;
pub const DEFAULT_DISPLAY_ROWS: usize = 50;
const NO_CONTEXT: &str = "(no context retrieved)";

/// Reply to one user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssistantReply {
    Clarification {
        questions: Vec<String>,
        message: String,
        /// Consecutive clarification rounds, including this one.
        round: usize,
    },
    Answer {
        sql: String,
        table: String,
        row_count: usize,
        duration_ms: u64,
        attempts: usize,
    },
    Failure {
        sql: String,
        message: String,
        error: String,
        attempts: usize,
    },
}

impl AssistantReply {
    pub fn need_clarification(&self) -> bool {
        matches!(self, AssistantReply::Clarification { .. })
    }

    /// Text shown to the user.
    pub fn message(&self) -> String {
        match self {
            AssistantReply::Clarification { message, .. } => message.clone(),
            AssistantReply::Answer { sql, table, .. } => format!("SQL> {}\n\n{}", sql, table),
            AssistantReply::Failure { sql, message, .. } => format!("SQL> {}\n\n{}", sql, message),
        }
    }
}

pub struct DataAssistant {
    orchestrator: DialogueOrchestrator,
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn SqlGenerator>,
    executor: Arc<dyn SqlExecutor>,
    max_retries: usize,
    display_rows: usize,
}

impl DataAssistant {
    pub fn new(
        config: ConversationConfig,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn SqlGenerator>,
        executor: Arc<dyn SqlExecutor>,
    ) -> Self {
        Self {
            orchestrator: DialogueOrchestrator::new(config),
            retriever,
            generator,
            executor,
            max_retries: DEFAULT_MAX_RETRIES,
            display_rows: DEFAULT_DISPLAY_ROWS,
        }
    }

    /// Wire the SQLite store, schema index and LLM client described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let retriever = SchemaRetriever::from_sqlite(
            &settings.northwind_db,
            Some(settings.docs_dir.as_path()),
            settings.top_k,
        )?;
        let generator = LlmClient::from_settings(settings);
        if generator.is_offline() {
            warn!("OPENAI_API_KEY not set - SQL generation runs in offline mode");
        }
        let executor = SqliteEngine::new(
            settings.northwind_db.clone(),
            settings.max_rows,
            settings.query_timeout(),
        );

        Ok(Self::new(
            settings.conversation,
            Arc::new(retriever),
            Arc::new(generator),
            Arc::new(executor),
        )
        .with_max_retries(settings.max_sql_retries)
        .with_display_rows(settings.max_rows))
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_display_rows(mut self, display_rows: usize) -> Self {
        self.display_rows = display_rows;
        self
    }

    pub fn orchestrator(&self) -> &DialogueOrchestrator {
        &self.orchestrator
    }

    pub async fn ask(&mut self, question: &str) -> Result<AssistantReply> {
        let query_id = Uuid::new_v4();
        let span = info_span!("ask", %query_id);
        self.ask_inner(question).instrument(span).await
    }

    async fn ask_inner(&mut self, question: &str) -> Result<AssistantReply> {
        info!("Received question: {}", question);

        let (transcript, preference_hints) = match self.orchestrator.next_action(question) {
            DialogueStep::Clarification {
                questions,
                assistant_reply,
                ..
            } => {
                let round = self.orchestrator.clarification_streak();
                info!(round, "Asking {} clarifying question(s)", questions.len());
                return Ok(AssistantReply::Clarification {
                    questions,
                    message: assistant_reply,
                    round,
                });
            }
            DialogueStep::Proceed {
                transcript,
                preference_hints,
            } => (transcript, preference_hints),
        };

        let schema_context = match self.retriever.retrieve(question).await {
            Ok(snippets) if !snippets.is_empty() => snippets.join("\n---\n"),
            Ok(_) => NO_CONTEXT.to_string(),
            Err(e) => {
                warn!("Schema retrieval failed, continuing without context: {}", e);
                NO_CONTEXT.to_string()
            }
        };

        let mut request = GenerationRequest {
            question: question.to_string(),
            transcript,
            preference_hints,
            schema_context,
            previous_attempt: None,
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            let sql = self.generator.generate(&request).await?;
            info!(attempt = attempts, "Generated SQL: {}", sql);

            let raw_error = match self.executor.execute(&sql).await {
                Ok(result) if result.ok => {
                    self.orchestrator.record_assistant(format!(
                        "Ran SQL: {} ({} rows)",
                        sql, result.row_count
                    ));
                    return Ok(AssistantReply::Answer {
                        table: render_markdown(&result, self.display_rows),
                        row_count: result.row_count,
                        duration_ms: result.duration_ms,
                        sql,
                        attempts,
                    });
                }
                Ok(result) => result
                    .error
                    .unwrap_or_else(|| "unknown execution error".to_string()),
                Err(AssistantError::Guard(reason)) => reason,
                Err(e) => return Err(e),
            };

            let explanation = normalize(&raw_error);
            warn!(attempt = attempts, "SQL failed on {}: {}", self.executor.name(), raw_error);

            if attempts > self.max_retries {
                self.orchestrator.record_assistant(explanation);
                return Ok(AssistantReply::Failure {
                    sql,
                    message: explanation.to_string(),
                    error: raw_error,
                    attempts,
                });
            }

            request.previous_attempt = Some(FailedAttempt {
                sql,
                error: raw_error,
                explanation: explanation.to_string(),
            });
        }
    }
}
