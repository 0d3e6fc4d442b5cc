//! CLI integration tests
//!
//! Runs the diario binary against a temporary local store.

use std::path::Path;
use std::process::{Command, Output};

const EDITIONS: &str = r#"[
  {
    "metadata": {
      "edition_id": "e1",
      "publication_date": "2024-03-05",
      "edition_number": 7,
      "edition_type_name": "Ordinária"
    },
    "articles": [
      {
        "metadata": {"article_id": "a1", "edition_id": "e1", "hierarchy_path": ["Executivo"]},
        "content": {"raw_content": "Fica nomeado", "content_type": "text"}
      },
      {
        "metadata": {"article_id": "a2", "edition_id": "e1"},
        "content": {"raw_content": "<table></table>", "content_type": "html"}
      }
    ]
  }
]"#;

fn diario(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_diario"))
        .env_remove("DIARIO_CONFIG")
        .arg("--data-dir")
        .arg(data_dir)
        .args(["--no-color", "--log-level", "warn"])
        .args(args)
        .output()
        .expect("Failed to execute diario")
}

fn ingest(data_dir: &Path) {
    let input = data_dir.join("editions.json");
    std::fs::write(&input, EDITIONS).unwrap();
    let output = diario(
        data_dir,
        &["ingest", input.to_str().unwrap(), "--municipality", "sp"],
    );
    assert!(
        output.status.success(),
        "ingest failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_help_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_diario"))
        .arg("--help")
        .output()
        .expect("Failed to execute diario");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ingest"));
    assert!(stdout.contains("query"));
}

#[test]
fn test_invalid_subcommand_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output = diario(temp_dir.path(), &["nonexistent-command"]);
    assert!(!output.status.success());
}

#[test]
fn test_ingest_then_stats() {
    let temp_dir = tempfile::tempdir().unwrap();
    ingest(temp_dir.path());

    let output = diario(temp_dir.path(), &["--format", "json", "stats"]);
    assert!(output.status.success());

    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["backend"], "local");
    assert_eq!(stats["editions_files"], 1);
    assert_eq!(stats["articles_files"], 1);
    assert_eq!(stats["content_files"], 0);
}

#[test]
fn test_ingest_then_query_json() {
    let temp_dir = tempfile::tempdir().unwrap();
    ingest(temp_dir.path());

    let output = diario(
        temp_dir.path(),
        &["--format", "json", "query", "--content-type", "html"],
    );
    assert!(
        output.status.success(),
        "query failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["article_id"], "a2");
    assert_eq!(rows[0]["municipality"], "sp");
    assert_eq!(rows[0]["inline_text"], "<table></table>");
}

#[test]
fn test_content_missing_blob_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output = diario(
        temp_dir.path(),
        &["content", "content/00/00/0000.bin"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read content"));
}
