//! Query Guard
//!
//! Generated SQL is only allowed to read. The guard parses it with the SQLite
//! dialect and rejects anything other than a single query statement. SQL the
//! parser cannot handle is passed through: the store is opened read-only, and
//! the driver's own error message is more useful to the retry loop.

use crate::error::{AssistantError, Result};
use sqlparser::ast::Statement;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryGuard;

impl QueryGuard {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, sql: &str) -> Result<()> {
        if sql.trim().trim_end_matches(';').trim().is_empty() {
            return Err(AssistantError::Guard("empty SQL statement".to_string()));
        }

        let statements = match Parser::parse_sql(&SQLiteDialect {}, sql) {
            Ok(statements) => statements,
            Err(e) => {
                debug!("guard could not parse SQL, deferring to the driver: {}", e);
                return Ok(());
            }
        };

        if statements.len() != 1 {
            return Err(AssistantError::Guard(format!(
                "expected exactly one statement, found {}",
                statements.len()
            )));
        }

        match &statements[0] {
            Statement::Query(_) => Ok(()),
            other => Err(AssistantError::Guard(format!(
                "only read-only SELECT queries are allowed, got: {}",
                first_keyword(&other.to_string())
            ))),
        }
    }
}

fn first_keyword(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase()
}
