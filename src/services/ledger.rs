//! Persistent record of the folders a bisection run has disabled.
//!
//! The ledger is a JSON array of on-disk disabled paths. It is rewritten
//! atomically (temp file + rename) after every change and deleted when it
//! becomes empty, so a leftover ledger file always means a run did not
//! restore everything it touched.

use crate::models::hash_index::has_prefix_ignore_case;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexSet;
use std::fs;

#[derive(Debug, Clone, Default)]
pub struct DisabledLedger {
    path: Option<Utf8PathBuf>,
    entries: IndexSet<Utf8PathBuf>,
}

impl DisabledLedger {
    /// A ledger that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the ledger at `path`, keeping entries left by an earlier run.
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = load_ledger(&path)?.into_iter().collect();
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Add `disabled` and persist. On error the entry is not kept.
    pub fn record(&mut self, disabled: &Utf8Path) -> Result<()> {
        if self.entries.insert(disabled.to_path_buf()) {
            if let Err(e) = self.save() {
                self.entries.shift_remove(disabled);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Drop `disabled` and persist. On error the entry stays where it was.
    pub fn remove(&mut self, disabled: &Utf8Path) -> Result<()> {
        if let Some((index, entry)) = self.entries.shift_remove_full(disabled) {
            if let Err(e) = self.save() {
                self.entries.shift_insert(index, entry);
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn contains(&self, disabled: &Utf8Path) -> bool {
        self.entries.contains(disabled)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Utf8Path> {
        self.entries.iter().map(Utf8PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if self.entries.is_empty() {
            if path.exists() {
                fs::remove_file(path)
                    .with_context(|| format!("Failed to remove ledger: {}", path))?;
            }
            return Ok(());
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create ledger directory: {}", parent))?;
        }

        let json = serde_json::to_string(&self.entries).context("Failed to serialize ledger")?;
        let tmp = Utf8PathBuf::from(format!("{}.tmp", path));
        fs::write(&tmp, json).with_context(|| format!("Failed to write ledger: {}", tmp))?;
        fs::rename(&tmp, path).with_context(|| format!("Failed to replace ledger: {}", path))?;

        tracing::debug!("Ledger {} now holds {} entries", path, self.entries.len());
        Ok(())
    }
}

/// Read the disabled paths recorded at `path`. A missing file is an empty ledger.
///
/// Entries that are not strings are ignored.
pub fn load_ledger(path: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read ledger: {}", path))?;
    let values: Vec<serde_json::Value> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse ledger: {}", path))?;

    Ok(values
        .into_iter()
        .filter_map(|v| v.as_str().map(Utf8PathBuf::from))
        .collect())
}

/// Re-enable every folder recorded in the ledger at `path`, then delete the ledger.
///
/// Returns the number of folders restored.
pub fn recover_from_ledger(path: &Utf8Path, prefix: &str) -> Result<usize> {
    let entries = load_ledger(path)?;
    let mut restored = 0;

    for disabled in &entries {
        let Some(name) = disabled.file_name() else {
            continue;
        };
        if !disabled.exists() || !has_prefix_ignore_case(name, prefix) {
            tracing::warn!("Ledger entry {} is no longer disabled on disk, skipping", disabled);
            continue;
        }

        let original = disabled.with_file_name(&name[prefix.len()..]);
        if original.exists() {
            tracing::warn!(
                "Cannot restore {}: {} already exists",
                disabled,
                original
            );
            continue;
        }

        match fs::rename(disabled, &original) {
            Ok(()) => {
                tracing::info!("Restored {}", original);
                restored += 1;
            }
            Err(e) => tracing::warn!("Failed to restore {}: {}", disabled, e),
        }
    }

    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove ledger: {}", path))?;
    }

    tracing::info!("Recovery complete: {} of {} entries restored", restored, entries.len());
    Ok(restored)
}
