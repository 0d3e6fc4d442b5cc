//! Fixed Arrow schemas for the three output tables.
//!
//! Column order here is the column order of every Parquet file written by
//! `diario-storage`. `year`/`month`/`day` are the partition components
//! derived from `publication_date`.

use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use std::sync::Arc;

/// Timestamp type used for `processed_at` columns.
pub fn processed_at_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
}

/// Schema of `gazettes/batch_*.parquet`
pub fn editions_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("municipality", DataType::Utf8, false),
        Field::new("edition_id", DataType::Utf8, false),
        Field::new("publication_date", DataType::Date32, true),
        Field::new("edition_number", DataType::Int64, false),
        Field::new("supplement", DataType::Boolean, false),
        Field::new("edition_type_id", DataType::Int64, false),
        Field::new("edition_type_name", DataType::Utf8, false),
        Field::new("pdf_url", DataType::Utf8, false),
        Field::new("total_articles", DataType::Int64, false),
        Field::new("processed_at", processed_at_type(), false),
        Field::new("edition_hash", DataType::Utf8, false),
        Field::new("batch_id", DataType::Utf8, false),
        Field::new("year", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
        Field::new("day", DataType::Int32, false),
    ]))
}

/// Schema of `articles/batch_*.parquet`
///
/// Exactly one of `inline_text` or (`content_hash`, `content_path`) is set
/// on every row.
pub fn articles_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("municipality", DataType::Utf8, false),
        Field::new("article_id", DataType::Utf8, false),
        Field::new("edition_id", DataType::Utf8, false),
        Field::new("edition_hash", DataType::Utf8, false),
        Field::new("publication_date", DataType::Date32, true),
        Field::new("title", DataType::Utf8, false),
        Field::new("hierarchy_path", DataType::Utf8, false),
        Field::new("identifier", DataType::Utf8, false),
        Field::new("protocol", DataType::Utf8, false),
        Field::new("depth", DataType::Int32, false),
        Field::new("content_type", DataType::Utf8, false),
        Field::new("content_size", DataType::Int64, false),
        Field::new("content_hash", DataType::Utf8, true),
        Field::new("content_path", DataType::Utf8, true),
        Field::new("inline_text", DataType::Utf8, true),
        Field::new("processed_at", processed_at_type(), false),
        Field::new("batch_id", DataType::Utf8, false),
        Field::new("year", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
        Field::new("day", DataType::Int32, false),
    ]))
}

/// Schema of `relationships/batch_*.parquet`
///
/// Denormalized edition/article links. `publication_date` keeps the source
/// text verbatim and `processed_at` is RFC 3339 text.
pub fn relationships_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("municipality", DataType::Utf8, false),
        Field::new("edition_id", DataType::Utf8, false),
        Field::new("article_id", DataType::Utf8, false),
        Field::new("edition_hash", DataType::Utf8, false),
        Field::new("publication_date", DataType::Utf8, false),
        Field::new("batch_id", DataType::Utf8, false),
        Field::new("processed_at", DataType::Utf8, false),
    ]))
}
