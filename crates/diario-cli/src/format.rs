//! Output formatting utilities for diario
//!
//! Supports two output formats:
//! - Table: ASCII tables with borders (default)
//! - JSON: Machine-readable JSON

use crate::config::OutputFormat;
use anyhow::{Context, Result};
use arrow::json::ArrayWriter;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use colored::*;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Format and print output based on the selected format
pub struct Formatter {
    format: OutputFormat,
    colored: bool,
}

impl Formatter {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    /// Print query results
    pub fn print_batch(&self, batch: &RecordBatch) -> Result<()> {
        println!("{}", self.render_batch(batch)?);
        Ok(())
    }

    /// Print a single item
    pub fn print_single<T: Serialize + Tabled>(&self, item: T) -> Result<()> {
        println!("{}", self.render_single(item)?);
        Ok(())
    }

    /// Print a success message
    pub fn print_success(&self, message: &str) {
        if self.colored {
            eprintln!("{} {}", "✅".green(), message);
        } else {
            eprintln!("✅ {}", message);
        }
    }

    /// Print an info message
    pub fn print_info(&self, message: &str) {
        if self.colored {
            eprintln!("{} {}", "ℹ️".blue(), message);
        } else {
            eprintln!("ℹ️  {}", message);
        }
    }

    fn render_batch(&self, batch: &RecordBatch) -> Result<String> {
        match self.format {
            OutputFormat::Table => {
                if batch.num_rows() == 0 {
                    return Ok("No articles found".to_string());
                }
                Ok(pretty_format_batches(&[batch.clone()])
                    .context("Failed to format results")?
                    .to_string())
            }
            OutputFormat::Json => {
                let mut writer = ArrayWriter::new(Vec::new());
                writer.write_batches(&[batch])?;
                writer.finish()?;
                let body = writer.into_inner();
                // An empty writer produces no output at all
                if body.is_empty() {
                    return Ok("[]".to_string());
                }
                Ok(String::from_utf8(body).context("Query results are not valid UTF-8")?)
            }
        }
    }

    fn render_single<T: Serialize + Tabled>(&self, item: T) -> Result<String> {
        match self.format {
            OutputFormat::Table => {
                let mut table = Table::new(vec![item]);
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&item)?),
        }
    }
}
