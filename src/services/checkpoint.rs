use crate::models::SessionSnapshot;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Write `snapshot` to `path` as JSON, replacing any previous checkpoint atomically.
pub fn save_checkpoint(path: &Utf8Path, snapshot: &SessionSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create checkpoint directory: {}", parent))?;
    }

    let json =
        serde_json::to_string_pretty(snapshot).context("Failed to serialize session checkpoint")?;
    let tmp = Utf8PathBuf::from(format!("{}.tmp", path));
    fs::write(&tmp, json).with_context(|| format!("Failed to write checkpoint: {}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace checkpoint: {}", path))?;

    tracing::debug!(
        "Saved checkpoint {} ({} candidates, {} rounds)",
        path,
        snapshot.remaining.len(),
        snapshot.history.len()
    );
    Ok(())
}

/// Read the checkpoint at `path`, or `None` if there is none.
pub fn load_checkpoint(path: &Utf8Path) -> Result<Option<SessionSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read checkpoint: {}", path))?;
    let snapshot = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse checkpoint: {}", path))?;

    tracing::info!("Loaded checkpoint from {}", path);
    Ok(Some(snapshot))
}

pub fn clear_checkpoint(path: &Utf8Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove checkpoint: {}", path))?;
    }
    Ok(())
}
