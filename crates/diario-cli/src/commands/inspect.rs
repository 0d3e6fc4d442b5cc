//! Inspection commands: blob contents and file counts.

use anyhow::{Context, Result};
use clap::Args;
use diario_storage::{GazetteStorage, StorageStats};
use serde::Serialize;
use std::io::Write;
use tabled::Tabled;

use crate::format::Formatter;

#[derive(Debug, Args)]
pub struct ContentArgs {
    /// Blob path as stored in `content_path`
    pub path: String,
}

#[derive(Debug, Serialize, Tabled)]
struct StatsSummary {
    location: String,
    backend: String,
    editions_files: usize,
    articles_files: usize,
    content_files: usize,
}

impl StatsSummary {
    fn new(location: String, stats: StorageStats) -> Self {
        Self {
            location,
            backend: stats.backend,
            editions_files: stats.editions_files,
            articles_files: stats.articles_files,
            content_files: stats.content_files,
        }
    }
}

/// Write the raw blob bytes to stdout.
pub async fn handle_content(storage: &GazetteStorage, args: ContentArgs) -> Result<()> {
    let data = storage
        .get_content(&args.path)
        .await
        .with_context(|| format!("Failed to read content {}", args.path))?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;
    Ok(())
}

pub async fn handle_stats(
    storage: &GazetteStorage,
    location: String,
    formatter: &Formatter,
) -> Result<()> {
    let stats = storage.stats().await.context("Failed to collect stats")?;
    formatter.print_single(StatsSummary::new(location, stats))
}
