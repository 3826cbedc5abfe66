use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::schema::Triplet;

pub const DEFAULT_AUDIT_DIR: &str = "data/knowledge_base";

pub fn audit_file_name(source_stem: &str) -> String {
    format!(
        "triplets_{}_{}.json",
        source_stem,
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Persist the merged triplets as pretty-printed UTF-8 JSON.
pub async fn write_audit_file(dir: &Path, source_stem: &str, triplets: &[Triplet]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create audit directory {}", dir.display()))?;

    let path = dir.join(audit_file_name(source_stem));
    let json = serde_json::to_string_pretty(triplets).context("Failed to serialize triplets")?;

    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write audit file {}", path.display()))?;

    info!(path = %path.display(), count = triplets.len(), "Triplets saved");
    Ok(path)
}

pub async fn read_triplet_file(path: &Path) -> Result<Vec<Triplet>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read triplet file {}", path.display()))?;

    serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse triplet file {}", path.display()))
}
