//! SQL Engine
//!
//! Executes generated SQL against the Northwind SQLite store. Driver failures
//! (bad column, syntax, timeout) come back as a failed [`QueryResult`] carrying
//! the raw error text, which the caller runs through the error normalizer. Only
//! infrastructure faults (unopenable database, worker panic) surface as `Err`.

use crate::error::{AssistantError, Result};
use crate::query_guard::QueryGuard;
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Outcome of executing one SQL statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub ok: bool,

    /// Raw driver error when `ok` is false.
    pub error: Option<String>,

    pub columns: Vec<String>,

    /// Returned rows, truncated to the engine's row cap.
    pub rows: Vec<Vec<serde_json::Value>>,

    /// Total rows produced by the query before truncation.
    pub row_count: usize,

    pub duration_ms: u64,
}

impl QueryResult {
    pub fn success(
        columns: Vec<String>,
        rows: Vec<Vec<serde_json::Value>>,
        row_count: usize,
        duration_ms: u64,
    ) -> Self {
        Self {
            ok: true,
            error: None,
            columns,
            rows,
            row_count,
            duration_ms,
        }
    }

    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            duration_ms,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.row_count > self.rows.len()
    }
}

/// Executes SQL on behalf of the assistant pipeline.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, sql: &str) -> Result<QueryResult>;
}

/// Read-only SQLite executor.
pub struct SqliteEngine {
    db_path: PathBuf,
    max_rows: usize,
    timeout: Duration,
    guard: QueryGuard,
}

impl SqliteEngine {
    pub fn new(db_path: impl Into<PathBuf>, max_rows: usize, timeout: Duration) -> Self {
        Self {
            db_path: db_path.into(),
            max_rows,
            timeout,
            guard: QueryGuard::new(),
        }
    }

    fn open(&self) -> Result<Connection> {
        if !self.db_path.exists() {
            return Err(AssistantError::Execution(format!(
                "Database not found at {}",
                self.db_path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(conn)
    }
}

#[async_trait]
impl SqlExecutor for SqliteEngine {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.guard.check(sql)?;

        let start = Instant::now();
        let conn = self.open()?;
        let interrupt = conn.get_interrupt_handle();
        let owned_sql = sql.to_string();
        let max_rows = self.max_rows;

        let worker = tokio::task::spawn_blocking(move || run_query(&conn, &owned_sql, max_rows));

        let outcome = match tokio::time::timeout(self.timeout, worker).await {
            Ok(joined) => joined
                .map_err(|e| AssistantError::Execution(format!("Query worker failed: {}", e)))?,
            Err(_) => {
                interrupt.interrupt();
                warn!("Query interrupted after {}s", self.timeout.as_secs());
                Err(format!("timeout: query exceeded {}s", self.timeout.as_secs()))
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let result = match outcome {
            Ok((columns, rows, row_count)) => {
                QueryResult::success(columns, rows, row_count, duration_ms)
            }
            Err(error) => QueryResult::failure(error, duration_ms),
        };

        info!(
            ok = result.ok,
            rows = result.row_count,
            duration_ms = result.duration_ms,
            "Executed SQL on {}",
            self.db_path.display()
        );
        Ok(result)
    }
}

type QueryRows = (Vec<String>, Vec<Vec<serde_json::Value>>, usize);

fn run_query(
    conn: &Connection,
    sql: &str,
    max_rows: usize,
) -> std::result::Result<QueryRows, String> {
    let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = stmt.query([]).map_err(|e| e.to_string())?;
    let mut kept = Vec::new();
    let mut row_count = 0;
    while let Some(row) = rows.next().map_err(|e| e.to_string())? {
        row_count += 1;
        if kept.len() < max_rows {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                let value = row.get_ref(idx).map_err(|e| e.to_string())?;
                values.push(to_json(value));
            }
            kept.push(values);
        }
    }
    Ok((columns, kept, row_count))
}

fn to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
        ValueRef::Blob(bytes) => serde_json::Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}
