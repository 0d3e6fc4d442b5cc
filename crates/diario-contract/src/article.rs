//! Article types
//!
//! An article is one content unit of an edition. Its body arrives from the
//! crawler either as text or as raw bytes (for extracted attachments that are
//! not guaranteed to be UTF-8).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of body an article carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Html,
    Table,
    Image,
    Pdf,
}

impl ContentType {
    /// Tag stored in the `content_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Html => "html",
            ContentType::Table => "table",
            ContentType::Image => "image",
            ContentType::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Article body as delivered by the crawler.
///
/// In JSON a string maps to [`RawContent::Text`] and an array of byte values
/// maps to [`RawContent::Bytes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawContent {
    Text(String),
    Bytes(Vec<u8>),
}

impl From<String> for RawContent {
    fn from(text: String) -> Self {
        RawContent::Text(text)
    }
}

impl From<&str> for RawContent {
    fn from(text: &str) -> Self {
        RawContent::Text(text.to_string())
    }
}

impl From<Vec<u8>> for RawContent {
    fn from(bytes: Vec<u8>) -> Self {
        RawContent::Bytes(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleContent {
    #[serde(default)]
    pub raw_content: Option<RawContent>,

    #[serde(default)]
    pub content_type: ContentType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    pub article_id: String,
    pub edition_id: String,

    #[serde(default)]
    pub title: Option<String>,

    /// Section labels from the gazette's table of contents, outermost first
    #[serde(default)]
    pub hierarchy_path: Vec<String>,

    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default)]
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub metadata: ArticleMetadata,
    pub content: ArticleContent,
}

impl Article {
    /// Convenience constructor for a text article without optional metadata.
    pub fn text(
        article_id: impl Into<String>,
        edition_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ArticleMetadata {
                article_id: article_id.into(),
                edition_id: edition_id.into(),
                title: None,
                hierarchy_path: Vec::new(),
                identifier: None,
                protocol: None,
            },
            content: ArticleContent {
                raw_content: Some(RawContent::Text(body.into())),
                content_type: ContentType::Text,
            },
        }
    }
}
