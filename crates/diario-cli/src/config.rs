//! Configuration loading for diario

use anyhow::{Context, Result};
use diario_storage::{BackendConfig, StorageConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Resolve the storage configuration.
///
/// With a config file the file wins entirely. Without one, storage is local
/// under `data_dir` with every other setting at its default.
pub fn load(config_path: Option<&Path>, data_dir: &Path) -> Result<StorageConfig> {
    match config_path {
        Some(path) => from_file(path),
        None => Ok(StorageConfig::local(data_dir)),
    }
}

fn from_file(path: &Path) -> Result<StorageConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: StorageConfig = toml::from_str(&contents)
        .with_context(|| format!("Invalid config file {}", path.display()))?;

    tracing::debug!(path = %path.display(), backend = ?config.backend, "Loaded config");
    Ok(config)
}

/// Human readable location of the configured backend.
pub fn describe_backend(config: &StorageConfig) -> String {
    match &config.backend {
        BackendConfig::Local { base_path } => base_path.display().to_string(),
        BackendConfig::S3(s3) => match &s3.prefix {
            Some(prefix) => format!("s3://{}/{}", s3.bucket, prefix),
            None => format!("s3://{}", s3.bucket),
        },
        BackendConfig::Memory => "memory".to_string(),
    }
}
