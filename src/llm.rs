//! LLM SQL Generator
//!
//! Turns the resolved conversation (transcript, preference hints, retrieved
//! schema context) into a single SQLite query through an OpenAI-compatible
//! chat-completions endpoint.

use crate::config::Settings;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

lazy_static! {
    static ref FENCED_SQL: Regex =
        Regex::new(r"(?is)```(?:sql|sqlite)?\s*(.*?)```").expect("valid fence pattern");
    static ref SQL_START: Regex = Regex::new(r"(?im)^\s*(SELECT|WITH)\b").expect("valid sql pattern");
}

/// Query returned when no API key is configured.
pub const OFFLINE_SQL: &str = "SELECT 1;";

const SYSTEM_PROMPT: &str = "You are an NL-to-SQL generator. You convert business questions into valid \
SQLite SQL for the Northwind schema. Use only tables and columns present in the schema context. \
Use explicit joins, correct column names, and SQLite-compatible date functions such as strftime. \
Avoid SELECT *. Add LIMIT 10 unless the user asks for full results or a preference sets a limit. \
Treat every preference as a binding default. Return only the SQL query, no explanation.";

/// A failed execution fed back to the generator on retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedAttempt {
    pub sql: String,
    pub error: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub question: String,
    pub transcript: String,
    pub preference_hints: String,
    pub schema_context: String,
    pub previous_attempt: Option<FailedAttempt>,
}

#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

pub struct LlmClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.openai_api_key.clone(),
            settings.openai_base_url.clone(),
            settings.llm_model.clone(),
        )
    }

    pub fn is_offline(&self) -> bool {
        self.api_key.is_none()
    }

    async fn call_llm(&self, prompt: &str) -> Result<String> {
        let Some(api_key) = &self.api_key else {
            warn!("No OPENAI_API_KEY configured - returning the offline query");
            return Ok(OFFLINE_SQL.to_string());
        };

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        if !status.is_success() {
            let message = response_json["error"]["message"]
                .as_str()
                .unwrap_or("unknown error");
            return Err(AssistantError::Llm(format!("LLM API returned {}: {}", status, message)));
        }

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AssistantError::Llm("No content in LLM response".to_string()))?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl SqlGenerator for LlmClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let prompt = build_prompt(request);
        debug!("SQL generation prompt:\n{}", prompt);
        let response = self.call_llm(&prompt).await?;
        extract_sql(&response)
    }
}

/// User message for the generator.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "Schema context:\n{}\n\nConversation:\n{}\n\nPreferences:\n{}\n\nQuestion: {}\n",
        request.schema_context, request.transcript, request.preference_hints, request.question
    );

    if let Some(attempt) = &request.previous_attempt {
        prompt.push_str(&format!(
            "\nThe previous SQL failed.\nSQL:\n{}\nError: {}\nHint: {}\nWrite a corrected query.\n",
            attempt.sql, attempt.error, attempt.explanation
        ));
    }

    prompt
}

/// Strip code fences and leading prose from a model reply.
pub fn extract_sql(response: &str) -> Result<String> {
    let body = FENCED_SQL
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(response);

    let sql = match SQL_START.find(body) {
        Some(start) => body[start.start()..].trim(),
        None => body.trim(),
    };

    if sql.is_empty() {
        return Err(AssistantError::Llm("LLM response contained no SQL".to_string()));
    }
    Ok(sql.to_string())
}
