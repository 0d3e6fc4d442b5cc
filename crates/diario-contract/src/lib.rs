//! Diario Contract
//!
//! Shared vocabulary between the gazette crawler and the storage layer.
//!
//! ## Contents
//!
//! - **Editions**: [`GazetteEdition`] and its [`EditionMetadata`]
//! - **Articles**: [`Article`], [`ArticleMetadata`], [`ArticleContent`] and the
//!   [`ContentType`] tag
//! - **Schemas**: the fixed Arrow schemas of the three output tables
//!   (`gazettes/`, `articles/`, `relationships/`)
//!
//! Everything here is serde-deserializable so crawler output (JSON) can be fed
//! straight into `diario-storage`.

pub mod article;
pub mod edition;
pub mod schema;

pub use article::{Article, ArticleContent, ArticleMetadata, ContentType, RawContent};
pub use edition::{EditionMetadata, GazetteEdition};
pub use schema::{articles_schema, editions_schema, relationships_schema};
