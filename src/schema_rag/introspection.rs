//! Builds schema documents from the SQLite catalogue and curated notes on disk.

use crate::error::Result;
use crate::schema_rag::document_store::{Document, DocumentKind};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

/// Curated files read from the docs directory when present.
pub const NOTE_FILES: &[&str] = &["schema_notes.md", "sample_queries.md"];

/// One document per user table with its columns, plus one per table that has indexes.
pub fn introspect_schema(conn: &Connection) -> Result<Vec<Document>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut documents = Vec::new();
    for table in &tables {
        let mut cols = conn.prepare("SELECT name, type FROM pragma_table_info(?1)")?;
        let col_lines = cols
            .query_map([table], |row| {
                let name: String = row.get(0)?;
                let ty: String = row.get(1)?;
                Ok(format!("- {} ({})", name, ty))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        documents.push(Document::new(
            format!("table:{}", table),
            format!("Table {} columns:\n{}", table, col_lines.join("\n")),
            DocumentKind::Table,
        ));

        let mut idx = conn.prepare("SELECT name FROM pragma_index_list(?1)")?;
        let indexes = idx
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if !indexes.is_empty() {
            documents.push(Document::new(
                format!("indexes:{}", table),
                format!("Indexes for {}: {}", table, indexes.join(", ")),
                DocumentKind::Indexes,
            ));
        }
    }

    info!("Introspected {} tables", tables.len());
    Ok(documents)
}

/// Paragraphs of the curated note files; missing files are skipped.
pub fn load_notes(docs_dir: &Path) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for file in NOTE_FILES {
        let path = docs_dir.join(file);
        if !path.exists() {
            debug!("No notes at {}", path.display());
            continue;
        }
        let content = std::fs::read_to_string(&path)?;
        for (i, paragraph) in split_paragraphs(&content).into_iter().enumerate() {
            documents.push(Document::new(
                format!("note:{}:{}", file, i),
                paragraph,
                DocumentKind::Note,
            ));
        }
    }
    Ok(documents)
}

fn split_paragraphs(content: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_introspect_lists_columns_and_indexes() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE Orders (OrderID INTEGER PRIMARY KEY, ShipCountry TEXT, OrderDate DATETIME);
             CREATE INDEX idx_orders_date ON Orders (OrderDate);
             CREATE TABLE Shippers (ShipperID INTEGER PRIMARY KEY, CompanyName TEXT);",
        )
        .unwrap();

        let docs = introspect_schema(&conn).unwrap();
        let orders = docs.iter().find(|d| d.id == "table:Orders").unwrap();
        assert_eq!(
            orders.text,
            "Table Orders columns:\n- OrderID (INTEGER)\n- ShipCountry (TEXT)\n- OrderDate (DATETIME)"
        );
        let indexes = docs.iter().find(|d| d.id == "indexes:Orders").unwrap();
        assert!(indexes.text.contains("idx_orders_date"));
        assert!(docs.iter().all(|d| d.id != "indexes:Shippers"));
    }

    #[test]
    fn test_notes_split_into_paragraphs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("schema_notes.md"),
            "Revenue is UnitPrice * Quantity.\n\n\nDiscount is a fraction.\nBetween 0 and 1.\n",
        )
        .unwrap();

        let docs = load_notes(dir.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].text, "Discount is a fraction.\nBetween 0 and 1.");
        assert_eq!(docs[0].kind, DocumentKind::Note);
    }

    #[test]
    fn test_missing_docs_dir_yields_nothing() {
        let docs = load_notes(Path::new("/nonexistent/docs")).unwrap();
        assert!(docs.is_empty());
    }
}
