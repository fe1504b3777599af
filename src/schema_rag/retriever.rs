//! Schema Retriever
//!
//! Returns the schema snippets most relevant to a question, ranked best first.

use crate::error::{AssistantError, Result};
use crate::schema_rag::document_store::{Document, DocumentKind, LexicalStore};
use crate::schema_rag::introspection::{introspect_schema, load_notes};
use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::info;

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Ranked snippets for the question; empty when nothing matches.
    async fn retrieve(&self, question: &str) -> Result<Vec<String>>;
}

pub struct SchemaRetriever {
    store: LexicalStore,
    top_k: usize,
}

impl SchemaRetriever {
    pub fn new(documents: Vec<Document>, top_k: usize) -> Self {
        let mut store = LexicalStore::new();
        for document in documents {
            store.add_document(document);
        }
        Self { store, top_k }
    }

    /// Index the live schema of `db_path` plus the note files under `docs_dir`.
    pub fn from_sqlite(db_path: &Path, docs_dir: Option<&Path>, top_k: usize) -> Result<Self> {
        if !db_path.exists() {
            return Err(AssistantError::Retrieval(format!(
                "Database not found at {}",
                db_path.display()
            )));
        }
        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let mut documents = introspect_schema(&conn)?;
        if let Some(dir) = docs_dir {
            documents.extend(load_notes(dir)?);
        }

        let tables = count_kind(&documents, DocumentKind::Table);
        let notes = count_kind(&documents, DocumentKind::Note);
        let retriever = Self::new(documents, top_k);
        info!(
            tables,
            notes,
            "Built schema index from {} with {} documents",
            db_path.display(),
            retriever.len()
        );
        Ok(retriever)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

fn count_kind(documents: &[Document], kind: DocumentKind) -> usize {
    documents.iter().filter(|d| d.kind == kind).count()
}

#[async_trait]
impl Retriever for SchemaRetriever {
    async fn retrieve(&self, question: &str) -> Result<Vec<String>> {
        Ok(self
            .store
            .search(question, self.top_k)
            .into_iter()
            .map(|hit| hit.document.text)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_retrieve_from_live_schema() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("northwind.sqlite");
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE Products (ProductID INTEGER PRIMARY KEY, ProductName TEXT);
             CREATE TABLE Employees (EmployeeID INTEGER PRIMARY KEY, LastName TEXT);",
        )
        .unwrap();
        drop(conn);
        std::fs::write(dir.path().join("sample_queries.md"), "Top products by revenue use Order Details.").unwrap();

        let retriever = SchemaRetriever::from_sqlite(&db, Some(dir.path()), 6).unwrap();
        assert_eq!(retriever.len(), 3);

        let snippets = retriever.retrieve("best products").await.unwrap();
        assert_eq!(snippets.len(), 2);
        assert!(snippets[0].starts_with("Table Products") || snippets[0].starts_with("Top products"));
        assert!(snippets.iter().all(|s| !s.contains("Employees")));
    }

    #[tokio::test]
    async fn test_top_k_caps_results() {
        let docs = (0..10)
            .map(|i| Document::new(format!("note:{}", i), "orders per customer", DocumentKind::Note))
            .collect();
        let retriever = SchemaRetriever::new(docs, 3);
        assert_eq!(retriever.retrieve("orders").await.unwrap().len(), 3);
        assert!(retriever.retrieve("weather").await.unwrap().is_empty());
    }

    #[test]
    fn test_count_kind_separates_tables_from_notes() {
        let docs = vec![
            Document::new("table:Orders", "Table Orders columns:", DocumentKind::Table),
            Document::new("indexes:Orders", "Indexes for Orders: idx", DocumentKind::Indexes),
            Document::new("note:0", "Discount is a fraction.", DocumentKind::Note),
            Document::new("table:Products", "Table Products columns:", DocumentKind::Table),
        ];
        assert_eq!(count_kind(&docs, DocumentKind::Table), 2);
        assert_eq!(count_kind(&docs, DocumentKind::Note), 1);
    }

    #[test]
    fn test_missing_database_is_a_retrieval_error() {
        let err = SchemaRetriever::from_sqlite(Path::new("/nonexistent.sqlite"), None, 6)
            .err()
            .unwrap();
        assert!(matches!(err, AssistantError::Retrieval(_)));
    }
}
