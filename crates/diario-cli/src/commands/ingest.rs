//! Ingest command
//!
//! Saves a crawler output file (a JSON array of editions) as one batch.
//!
//! ## Examples
//!
//! ```bash
//! diario ingest editions.json --municipality sao-paulo
//! diario ingest editions.json --municipality sao-paulo --batch-id rerun-2024-03-05
//! ```

use anyhow::{Context, Result};
use clap::Args;
use diario_contract::GazetteEdition;
use diario_storage::{GazetteStorage, SaveOptions, SaveStats};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::Tabled;

use crate::format::Formatter;

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// JSON file with an array of editions
    pub file: PathBuf,

    /// Municipality stamped on every row
    #[arg(short, long, default_value = "")]
    pub municipality: String,

    /// Batch id (default: batch_<yyyyMMdd_HHmmss>)
    #[arg(long)]
    pub batch_id: Option<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct SaveSummary {
    batch_id: String,
    municipality: String,
    editions: usize,
    articles: usize,
    relationships: usize,
    timestamp: String,
}

impl From<SaveStats> for SaveSummary {
    fn from(stats: SaveStats) -> Self {
        Self {
            batch_id: stats.batch_id,
            municipality: stats.municipality,
            editions: stats.editions,
            articles: stats.articles,
            relationships: stats.relationships,
            timestamp: stats.timestamp.to_rfc3339(),
        }
    }
}

/// Parse crawler output.
pub fn read_editions(path: &Path) -> Result<Vec<GazetteEdition>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array of editions", path.display()))
}

pub async fn handle_ingest(
    storage: &GazetteStorage,
    args: IngestArgs,
    formatter: &Formatter,
) -> Result<()> {
    let editions = read_editions(&args.file)?;
    if editions.is_empty() {
        formatter.print_info("No editions in input, nothing to save");
    }

    let mut options = SaveOptions::for_municipality(args.municipality);
    options.batch_id = args.batch_id;

    let stats = storage
        .save_editions(&editions, options)
        .await
        .context("Failed to save editions")?;

    formatter.print_success(&format!(
        "Saved {} editions ({} articles)",
        stats.editions, stats.articles
    ));
    formatter.print_single(SaveSummary::from(stats))
}
