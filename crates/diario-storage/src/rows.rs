//! Flat row sets and their Arrow conversion.
//!
//! A batch produces three row sets which are turned into record batches
//! matching the fixed schemas in `diario_contract::schema`. Conversion happens
//! entirely in memory, so a row set that does not fit its schema fails with
//! `SchemaMismatch` before anything is written.

use arrow::array::{
    ArrayRef, BooleanArray, Date32Array, Int32Array, Int64Array, StringArray,
    TimestampMicrosecondArray,
};
use arrow::datatypes::{Date32Type, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, Utc};
use diario_contract::schema::{articles_schema, editions_schema, relationships_schema};
use md5::{Digest, Md5};
use std::sync::Arc;

use crate::content::ContentBlob;
use crate::error::{Error, Result};
use crate::partition::DateParts;

/// Legacy edition fingerprint: MD5 hex of `<edition_id>_<publication_date>_<count>`.
///
/// Distinct editions that share id, date text and article count get the same
/// hash. Existing tables rely on this exact format, so it is not strengthened.
pub fn edition_hash(edition_id: &str, publication_date: &str, article_count: usize) -> String {
    let input = format!("{}_{}_{}", edition_id, publication_date, article_count);
    hex::encode(Md5::digest(input.as_bytes()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditionRow {
    pub municipality: String,
    pub edition_id: String,
    /// `None` when the source date did not parse
    pub publication_date: Option<NaiveDate>,
    pub edition_number: i64,
    pub supplement: bool,
    pub edition_type_id: i64,
    pub edition_type_name: String,
    pub pdf_url: String,
    pub total_articles: i64,
    pub processed_at: DateTime<Utc>,
    pub edition_hash: String,
    pub batch_id: String,
    pub partition: DateParts,
}

/// Where an article body ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredBody {
    Inline(String),
    Blob(ContentBlob),
}

impl StoredBody {
    pub fn inline_text(&self) -> Option<&str> {
        match self {
            StoredBody::Inline(text) => Some(text),
            StoredBody::Blob(_) => None,
        }
    }

    pub fn blob(&self) -> Option<&ContentBlob> {
        match self {
            StoredBody::Inline(_) => None,
            StoredBody::Blob(blob) => Some(blob),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRow {
    pub municipality: String,
    pub article_id: String,
    pub edition_id: String,
    pub edition_hash: String,
    pub publication_date: Option<NaiveDate>,
    pub title: String,
    /// JSON array text
    pub hierarchy_path: String,
    pub identifier: String,
    pub protocol: String,
    pub depth: i32,
    pub content_type: String,
    /// Byte length of the body, whether inline or in a blob
    pub content_size: i64,
    pub body: StoredBody,
    pub processed_at: DateTime<Utc>,
    pub batch_id: String,
    pub partition: DateParts,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipRow {
    pub municipality: String,
    pub edition_id: String,
    pub article_id: String,
    pub edition_hash: String,
    /// Source text, verbatim
    pub publication_date: String,
    pub batch_id: String,
    /// RFC 3339
    pub processed_at: String,
}

fn strings<'a, T: 'a>(rows: &'a [T], f: impl Fn(&'a T) -> &'a str) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn optional_strings<'a, T: 'a>(rows: &'a [T], f: impl Fn(&'a T) -> Option<&'a str>) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn dates<T>(rows: &[T], f: impl Fn(&T) -> Option<NaiveDate>) -> ArrayRef {
    Arc::new(Date32Array::from(
        rows.iter()
            .map(|row| f(row).map(Date32Type::from_naive_date))
            .collect::<Vec<_>>(),
    ))
}

fn timestamps<T>(rows: &[T], f: impl Fn(&T) -> DateTime<Utc>) -> ArrayRef {
    Arc::new(
        TimestampMicrosecondArray::from(
            rows.iter().map(|row| f(row).timestamp_micros()).collect::<Vec<_>>(),
        )
        .with_timezone("UTC"),
    )
}

fn int32s<T>(rows: &[T], f: impl Fn(&T) -> i32) -> ArrayRef {
    Arc::new(Int32Array::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn int64s<T>(rows: &[T], f: impl Fn(&T) -> i64) -> ArrayRef {
    Arc::new(Int64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn assemble(table: &str, schema: SchemaRef, columns: Vec<ArrayRef>) -> Result<RecordBatch> {
    RecordBatch::try_new(schema, columns).map_err(|e| Error::SchemaMismatch {
        table: table.to_string(),
        reason: e.to_string(),
    })
}

pub fn editions_batch(rows: &[EditionRow]) -> Result<RecordBatch> {
    assemble(
        "gazettes",
        editions_schema(),
        vec![
            strings(rows, |r| r.municipality.as_str()),
            strings(rows, |r| r.edition_id.as_str()),
            dates(rows, |r| r.publication_date),
            int64s(rows, |r| r.edition_number),
            Arc::new(BooleanArray::from(
                rows.iter().map(|r| r.supplement).collect::<Vec<_>>(),
            )),
            int64s(rows, |r| r.edition_type_id),
            strings(rows, |r| r.edition_type_name.as_str()),
            strings(rows, |r| r.pdf_url.as_str()),
            int64s(rows, |r| r.total_articles),
            timestamps(rows, |r| r.processed_at),
            strings(rows, |r| r.edition_hash.as_str()),
            strings(rows, |r| r.batch_id.as_str()),
            int32s(rows, |r| r.partition.year),
            int32s(rows, |r| r.partition.month),
            int32s(rows, |r| r.partition.day),
        ],
    )
}

pub fn articles_batch(rows: &[ArticleRow]) -> Result<RecordBatch> {
    assemble(
        "articles",
        articles_schema(),
        vec![
            strings(rows, |r| r.municipality.as_str()),
            strings(rows, |r| r.article_id.as_str()),
            strings(rows, |r| r.edition_id.as_str()),
            strings(rows, |r| r.edition_hash.as_str()),
            dates(rows, |r| r.publication_date),
            strings(rows, |r| r.title.as_str()),
            strings(rows, |r| r.hierarchy_path.as_str()),
            strings(rows, |r| r.identifier.as_str()),
            strings(rows, |r| r.protocol.as_str()),
            int32s(rows, |r| r.depth),
            strings(rows, |r| r.content_type.as_str()),
            int64s(rows, |r| r.content_size),
            optional_strings(rows, |r| r.body.blob().map(|b| b.hash.as_str())),
            optional_strings(rows, |r| r.body.blob().map(|b| b.path.as_str())),
            optional_strings(rows, |r| r.body.inline_text()),
            timestamps(rows, |r| r.processed_at),
            strings(rows, |r| r.batch_id.as_str()),
            int32s(rows, |r| r.partition.year),
            int32s(rows, |r| r.partition.month),
            int32s(rows, |r| r.partition.day),
        ],
    )
}

pub fn relationships_batch(rows: &[RelationshipRow]) -> Result<RecordBatch> {
    assemble(
        "relationships",
        relationships_schema(),
        vec![
            strings(rows, |r| r.municipality.as_str()),
            strings(rows, |r| r.edition_id.as_str()),
            strings(rows, |r| r.article_id.as_str()),
            strings(rows, |r| r.edition_hash.as_str()),
            strings(rows, |r| r.publication_date.as_str()),
            strings(rows, |r| r.batch_id.as_str()),
            strings(rows, |r| r.processed_at.as_str()),
        ],
    )
}
