//! JSON snapshots of a template cache.
//!
//! A snapshot is a plain JSON object of key → content, written pretty-printed
//! so it diffs well.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::directory::Cache;

/// Serialize `cache` to pretty JSON.
///
/// # Errors
///
/// Fails only if serialization fails.
pub fn to_json(cache: &Cache) -> Result<String> {
    serde_json::to_string_pretty(cache).context("Failed to serialize template cache")
}

/// Write `cache` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directories or the file cannot be written.
pub fn write_snapshot(path: &Path, cache: &Cache) -> Result<()> {
    let json = to_json(cache)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create snapshot file: {}", path.display()))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write snapshot to: {}", path.display()))?;
    log::debug!("Wrote snapshot of {} templates to {}", cache.len(), path.display());
    Ok(())
}

/// Read a snapshot written by [`write_snapshot`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON object of
/// strings.
pub fn read_snapshot(path: &Path) -> Result<Cache> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;
    let cache: Cache = serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse snapshot {}: expected a JSON object of strings",
            path.display()
        )
    })?;
    Ok(cache)
}
