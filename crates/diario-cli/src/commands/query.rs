//! Query command
//!
//! Filters articles across every stored batch.
//!
//! ## Examples
//!
//! ```bash
//! # Everything
//! diario query
//!
//! # One municipality, first quarter, html or tables only
//! diario query --municipality sao-paulo --from 2024-01-01 --to 2024-03-31 \
//!     --content-type html --content-type table
//!
//! # Machine readable
//! diario --format json query --limit 10
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use diario_storage::{ArticleFilter, GazetteStorage};

use crate::format::Formatter;

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[arg(short, long)]
    pub municipality: Option<String>,

    /// First publication date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last publication date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Content type tag; repeat to match any of several
    #[arg(long = "content-type")]
    pub content_types: Vec<String>,

    /// Maximum number of rows
    #[arg(short, long)]
    pub limit: Option<usize>,
}

impl QueryArgs {
    pub fn filter(&self) -> ArticleFilter {
        ArticleFilter {
            municipality: self.municipality.clone(),
            start_date: self.from,
            end_date: self.to,
            content_types: self.content_types.clone(),
        }
    }
}

pub async fn handle_query(
    storage: &GazetteStorage,
    args: QueryArgs,
    formatter: &Formatter,
) -> Result<()> {
    let batch = storage
        .query_articles(args.filter(), args.limit)
        .await
        .context("Query failed")?;

    formatter.print_batch(&batch)?;
    eprintln!("({} rows)", batch.num_rows());
    Ok(())
}
