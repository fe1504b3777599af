//! Maps raw execution failures to short user-facing explanations.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionFailure {
    SchemaMismatch,
    AmbiguousReference,
    SyntaxError,
    Timeout,
    Unknown,
}

impl ExecutionFailure {
    /// First matching marker wins.
    pub fn classify(raw_error: &str) -> Self {
        let msg = raw_error.to_lowercase();
        if msg.contains("no such column") {
            ExecutionFailure::SchemaMismatch
        } else if msg.contains("ambiguous column") {
            ExecutionFailure::AmbiguousReference
        } else if msg.contains("syntax error") {
            ExecutionFailure::SyntaxError
        } else if msg.contains("timeout") {
            ExecutionFailure::Timeout
        } else {
            ExecutionFailure::Unknown
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ExecutionFailure::SchemaMismatch => {
                "That column doesn't exist. I'll re-check the schema."
            }
            ExecutionFailure::AmbiguousReference => {
                "Ambiguous column: I'll qualify it with table aliases."
            }
            ExecutionFailure::SyntaxError => "The SQL had a syntax issue. I'll fix it.",
            ExecutionFailure::Timeout => "Query took too long. I can add filters or a LIMIT.",
            ExecutionFailure::Unknown => "Something went wrong executing the query.",
        }
    }
}

pub fn normalize(raw_error: &str) -> &'static str {
    ExecutionFailure::classify(raw_error).message()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch() {
        assert_eq!(
            normalize("no such column: Foo"),
            ExecutionFailure::SchemaMismatch.message()
        );
    }

    #[test]
    fn test_unknown_failure() {
        assert_eq!(normalize("Connection reset"), ExecutionFailure::Unknown.message());
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(
            ExecutionFailure::classify("Ambiguous Column name: OrderID"),
            ExecutionFailure::AmbiguousReference
        );
        assert_eq!(
            ExecutionFailure::classify("near \"FORM\": SYNTAX ERROR"),
            ExecutionFailure::SyntaxError
        );
        assert_eq!(
            ExecutionFailure::classify("Timeout: query exceeded 30s"),
            ExecutionFailure::Timeout
        );
    }

    #[test]
    fn test_first_rule_wins() {
        assert_eq!(
            ExecutionFailure::classify("syntax error near timeout, no such column: X"),
            ExecutionFailure::SchemaMismatch
        );
    }

    #[test]
    fn test_only_five_messages_exist() {
        let inputs = ["", "no such column", "ambiguous column", "syntax error", "timeout", "disk I/O error"];
        let mut messages: Vec<&str> = inputs.iter().map(|i| normalize(i)).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), 5);
    }
}
