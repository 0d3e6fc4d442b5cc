//! Gazette edition types.

use serde::{Deserialize, Serialize};

use crate::article::Article;

/// Metadata describing one published gazette issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditionMetadata {
    pub edition_id: String,

    /// Publication date as published by the source, expected as `YYYY-MM-DD`
    pub publication_date: String,

    #[serde(default)]
    pub edition_number: i64,

    #[serde(default)]
    pub supplement: bool,

    #[serde(default)]
    pub edition_type_id: i64,

    #[serde(default)]
    pub edition_type_name: String,

    #[serde(default)]
    pub pdf_url: String,
}

/// One gazette issue together with its articles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazetteEdition {
    pub metadata: EditionMetadata,

    #[serde(default)]
    pub articles: Vec<Article>,
}

impl GazetteEdition {
    pub fn new(metadata: EditionMetadata, articles: Vec<Article>) -> Self {
        Self { metadata, articles }
    }

    pub fn article_count(&self) -> usize {
        self.articles.len()
    }
}
