//! Document Store
//!
//! In-memory store of schema documents searched by term overlap. Identifiers
//! are split on CamelCase so "ShipCountry" in a document matches "ship country"
//! in a question.

use std::collections::HashSet;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "by", "do", "for", "from", "how", "in", "is", "me", "of", "on",
    "or", "per", "show", "the", "to", "what", "which", "with",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Table,
    Indexes,
    Note,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub kind: DocumentKind,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: Document,
    pub score: usize,
}

#[derive(Debug, Default)]
pub struct LexicalStore {
    documents: Vec<(Document, HashSet<String>)>,
}

impl LexicalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents with blank text are skipped.
    pub fn add_document(&mut self, document: Document) {
        if document.text.trim().is_empty() {
            return;
        }
        let index_terms = terms(&document.text);
        self.documents.push((document, index_terms));
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Top `limit` documents sharing at least one term with `query`, best first.
    /// Equal scores keep insertion order.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let query_terms = terms(query);
        let mut hits: Vec<SearchResult> = self
            .documents
            .iter()
            .filter_map(|(document, doc_terms)| {
                let score = query_terms.intersection(doc_terms).count();
                (score > 0).then(|| SearchResult {
                    document: document.clone(),
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(limit);
        hits
    }
}

/// Normalized search terms of a text.
pub fn terms(text: &str) -> HashSet<String> {
    let mut out = HashSet::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let mut variants = split_camel_case(word);
        if variants.len() > 1 {
            variants.push(word.to_string());
        }
        for variant in variants {
            let term = normalize_term(&variant);
            if term.len() >= 2 && !STOPWORDS.contains(&term.as_str()) {
                out.insert(term);
            }
        }
    }
    out
}

fn split_camel_case(word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev_lower_or_digit = false;
    for c in word.chars() {
        if c.is_uppercase() && prev_lower_or_digit && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        prev_lower_or_digit = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn normalize_term(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.len() > 3 && lower.ends_with('s') && !lower.ends_with("ss") {
        lower[..lower.len() - 1].to_string()
    } else {
        lower
    }
}
