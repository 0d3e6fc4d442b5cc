//! Diario CLI (diario)
//!
//! Command-line tool for the gazette storage layer.
//!
//! ## Overview
//!
//! `diario` works directly on the store, no server involved:
//! - **Ingest**: Save crawler output (a JSON array of editions) as a batch
//! - **Query**: Filter stored articles by municipality, date range and content type
//! - **Content**: Print a content-addressed article body
//! - **Stats**: Count stored tables and blobs
//!
//! ## Quick Start
//!
//! ```bash
//! # Local store under ./data/raw
//! diario ingest editions.json --municipality sao-paulo
//! diario query --municipality sao-paulo --from 2024-01-01 --limit 20
//! diario content content/3a/7b/3a7b...e1.bin > body.txt
//! diario stats
//!
//! # S3/MinIO store described by a config file
//! DIARIO_CONFIG=diario.toml diario stats
//! ```
//!
//! ## Configuration
//!
//! - `--config` / `DIARIO_CONFIG`: TOML file with a full `StorageConfig`
//! - `--data-dir` / `DIARIO_DATA_DIR`: Local store used when no config file is
//!   given (default: data/raw)
//! - `--log-level`: Log filter in `RUST_LOG` syntax (default: info). Logs go
//!   to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use diario_storage::GazetteStorage;
use std::path::PathBuf;

mod commands;
mod config;
mod format;

use config::OutputFormat;
use format::Formatter;

#[derive(Parser)]
#[command(name = "diario")]
#[command(about = "Gazette storage command-line tool", long_about = None)]
struct Cli {
    /// Storage config file (TOML)
    #[arg(long, env = "DIARIO_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Local data directory, used when no config file is given
    #[arg(long, env = "DIARIO_DATA_DIR", default_value = "data/raw", global = true)]
    data_dir: PathBuf,

    /// Log filter, e.g. `info` or `diario_storage=debug`
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    format: OutputFormat,

    /// Disable colored messages
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a JSON array of editions as a new batch
    Ingest(commands::IngestArgs),
    /// Query stored articles
    Query(commands::QueryArgs),
    /// Write a stored article body to stdout
    Content(commands::ContentArgs),
    /// Count stored files
    Stats,
}

fn init_logging(filter: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(filter)
        .with_context(|| format!("Invalid log filter '{}'", filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let storage_config = config::load(cli.config.as_deref(), &cli.data_dir)?;
    let location = config::describe_backend(&storage_config);
    let storage = GazetteStorage::from_config(&storage_config)
        .with_context(|| format!("Failed to open storage at {}", location))?;

    let formatter = Formatter::new(cli.format, !cli.no_color);

    match cli.command {
        Commands::Ingest(args) => {
            commands::ingest::handle_ingest(&storage, args, &formatter).await?
        }
        Commands::Query(args) => commands::query::handle_query(&storage, args, &formatter).await?,
        Commands::Content(args) => commands::inspect::handle_content(&storage, args).await?,
        Commands::Stats => commands::inspect::handle_stats(&storage, location, &formatter).await?,
    }

    Ok(())
}
