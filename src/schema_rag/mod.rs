//! Schema RAG
//!
//! Grounds SQL generation in the actual Northwind schema. The index holds one
//! document per table (columns and types), one per indexed table, and the
//! paragraphs of any curated notes; questions are matched lexically.

pub mod document_store;
pub mod introspection;
pub mod retriever;

pub use document_store::{Document, DocumentKind, LexicalStore, SearchResult};
pub use retriever::{Retriever, SchemaRetriever};
