//! Result Formatting
//!
//! GitHub-flavoured markdown rendering of query results for the CLI and server.

use crate::sql_engine::QueryResult;
use itertools::Itertools;

/// Meta line plus a markdown table of at most `max_rows` rows.
pub fn render_markdown(result: &QueryResult, max_rows: usize) -> String {
    let meta = format!("Rows: {} | Duration: {} ms", result.row_count, result.duration_ms);
    if result.columns.is_empty() {
        return meta;
    }

    let header = format!("| {} |", result.columns.iter().map(|c| escape(c)).join(" | "));
    let divider = format!("|{}|", result.columns.iter().map(|_| "---").join("|"));
    let body = result
        .rows
        .iter()
        .take(max_rows)
        .map(|row| format!("| {} |", row.iter().map(format_cell).join(" | ")))
        .join("\n");

    let mut out = format!("{}\n\n{}\n{}", meta, header, divider);
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&body);
    }
    if result.row_count > max_rows.min(result.rows.len()) {
        out.push_str(&format!(
            "\n\n(showing {} of {} rows)",
            max_rows.min(result.rows.len()),
            result.row_count
        ));
    }
    out
}

fn format_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map(|f| format!("{:.2}", f))
            .unwrap_or_else(|| n.to_string()),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => escape(s),
        other => escape(&other.to_string()),
    }
}

fn escape(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(rows: Vec<Vec<serde_json::Value>>, row_count: usize) -> QueryResult {
        QueryResult::success(
            vec!["ShipCountry".to_string(), "Revenue".to_string()],
            rows,
            row_count,
            12,
        )
    }

    #[test]
    fn test_renders_table_with_two_decimals() {
        let out = render_markdown(
            &result(vec![vec![json!("Germany"), json!(1234.5)], vec![json!("USA"), json!(7)]], 2),
            10,
        );
        assert_eq!(
            out,
            "Rows: 2 | Duration: 12 ms\n\n| ShipCountry | Revenue |\n|---|---|\n| Germany | 1234.50 |\n| USA | 7 |"
        );
    }

    #[test]
    fn test_nulls_render_empty_and_pipes_are_escaped() {
        let out = render_markdown(&result(vec![vec![json!("A|B"), json!(null)]], 1), 10);
        assert!(out.ends_with("| A\\|B |  |"));
    }

    #[test]
    fn test_truncation_note() {
        let rows = vec![vec![json!("Germany"), json!(1.0)], vec![json!("USA"), json!(2.0)]];
        let out = render_markdown(&result(rows, 40), 1);
        assert!(out.ends_with("(showing 1 of 40 rows)"));
    }

    #[test]
    fn test_no_columns_only_meta() {
        let out = render_markdown(&QueryResult::success(vec![], vec![], 0, 3), 10);
        assert_eq!(out, "Rows: 0 | Duration: 3 ms");
    }
}
