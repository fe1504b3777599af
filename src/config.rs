//! Runtime configuration
//!
//! Settings are read from the process environment (after `.env` has been loaded by
//! the binaries) and validated up front, so a bad value fails at construction
//! rather than on the first turn of a conversation.

use crate::error::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MEMORY_K: usize = 5;
pub const MAX_MEMORY_K: usize = 1_000;

/// Configuration owned by a single conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Number of user/assistant exchange pairs kept in turn memory.
    pub memory_k: usize,
}

impl ConversationConfig {
    pub fn new(memory_k: usize) -> Result<Self> {
        if memory_k == 0 {
            return Err(AssistantError::Config(
                "MEMORY_K must be at least 1".to_string(),
            ));
        }
        if memory_k > MAX_MEMORY_K {
            return Err(AssistantError::Config(format!(
                "MEMORY_K must be at most {}, got {}",
                MAX_MEMORY_K, memory_k
            )));
        }
        Ok(Self { memory_k })
    }

    /// Build from `MEMORY_K`, falling back to the default when it is unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let memory_k = parse_positive(&lookup, "MEMORY_K", DEFAULT_MEMORY_K)?;
        Self::new(memory_k)
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            memory_k: DEFAULT_MEMORY_K,
        }
    }
}

/// Process-level settings for the collaborators around the conversation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub llm_provider: String,
    pub llm_model: String,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub northwind_db: PathBuf,
    pub docs_dir: PathBuf,
    pub top_k: usize,
    pub max_rows: usize,
    pub max_sql_retries: usize,
    pub query_timeout_secs: u64,
    pub conversation: ConversationConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let llm_provider = lookup("LLM_PROVIDER")
            .unwrap_or_else(|| "openai".to_string())
            .to_lowercase();
        if llm_provider != "openai" {
            return Err(AssistantError::Config(format!(
                "Unsupported LLM_PROVIDER '{}' (only 'openai' is available)",
                llm_provider
            )));
        }

        Ok(Self {
            llm_provider,
            llm_model: lookup("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            openai_api_key: lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            openai_base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            northwind_db: lookup("NORTHWIND_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/northwind.sqlite")),
            docs_dir: lookup("DOCS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./docs")),
            top_k: parse_positive(&lookup, "TOP_K", 6)?,
            max_rows: parse_positive(&lookup, "MAX_ROWS", 50)?,
            max_sql_retries: parse_number(&lookup, "MAX_SQL_RETRIES", 2)?,
            query_timeout_secs: parse_positive(&lookup, "QUERY_TIMEOUT_SECS", 30)?,
            conversation: ConversationConfig::from_lookup(&lookup)?,
        })
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            AssistantError::Config(format!("{} must be a non-negative integer, got '{}'", key, raw))
        }),
    }
}

fn parse_positive<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + Default,
{
    let value = parse_number(lookup, key, default)?;
    if value == T::default() {
        return Err(AssistantError::Config(format!("{} must be greater than zero", key)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let settings = Settings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings.conversation.memory_k, 5);
        assert_eq!(settings.top_k, 6);
        assert_eq!(settings.max_rows, 50);
        assert_eq!(settings.max_sql_retries, 2);
        assert_eq!(settings.llm_model, "gpt-4o-mini");
        assert!(settings.openai_api_key.is_none());
    }

    #[test]
    fn test_memory_k_is_read_from_environment() {
        let config = ConversationConfig::from_lookup(lookup_from(&[("MEMORY_K", "3")])).unwrap();
        assert_eq!(config.memory_k, 3);
    }

    #[test]
    fn test_oversized_retention_is_rejected() {
        let err = ConversationConfig::from_lookup(lookup_from(&[(
            "MEMORY_K",
            "9223372036854775808",
        )]))
        .unwrap_err();
        assert!(matches!(err, AssistantError::Config(_)));
        assert!(ConversationConfig::new(MAX_MEMORY_K + 1).is_err());
        assert_eq!(ConversationConfig::new(MAX_MEMORY_K).unwrap().memory_k, MAX_MEMORY_K);
    }

    #[test]
    fn test_zero_retention_is_rejected() {
        assert!(ConversationConfig::new(0).is_err());
        let err = ConversationConfig::from_lookup(lookup_from(&[("MEMORY_K", "0")])).unwrap_err();
        assert!(matches!(err, AssistantError::Config(_)));
    }

    #[test]
    fn test_non_numeric_retention_is_rejected() {
        let err = ConversationConfig::from_lookup(lookup_from(&[("MEMORY_K", "five")])).unwrap_err();
        assert!(err.to_string().contains("MEMORY_K"));
        assert!(ConversationConfig::from_lookup(lookup_from(&[("MEMORY_K", "-2")])).is_err());
    }

    #[test]
    fn test_retries_may_be_zero_but_rows_may_not() {
        let settings = Settings::from_lookup(lookup_from(&[("MAX_SQL_RETRIES", "0")])).unwrap();
        assert_eq!(settings.max_sql_retries, 0);
        assert!(Settings::from_lookup(lookup_from(&[("MAX_ROWS", "0")])).is_err());
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let settings = Settings::from_lookup(lookup_from(&[("OPENAI_API_KEY", "  ")])).unwrap();
        assert!(settings.openai_api_key.is_none());
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        assert!(Settings::from_lookup(lookup_from(&[("LLM_PROVIDER", "gemini")])).is_err());
    }
}
