use crate::models::hash_index::has_prefix_ignore_case;
use crate::models::{ModUnit, UnitStatus, UserConfig};
use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use walkdir::WalkDir;

/// Find the mod folders under `root`.
///
/// A mod is a directory below `root` that directly contains a configuration
/// file. The walk does not descend into a mod once found. A mod whose folder,
/// or any folder above it, carries the disabled prefix is reported as
/// `Disabled`; mods listed in `excluded_mods` are `Excluded`.
///
/// Units come back in file name order.
pub fn discover_mod_units(root: &Utf8Path, config: &UserConfig) -> Result<Vec<ModUnit>> {
    if !root.is_dir() {
        bail!("Not a directory: {}", root);
    }

    let options = config.scan_options();
    let mut units = Vec::new();
    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name().into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("Skipping unreadable entry during mod discovery: {}", err);
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path().to_path_buf()) else {
            tracing::warn!("Skipping non UTF-8 folder {}", entry.path().display());
            continue;
        };

        if !contains_config_file(&path, |p| options.is_config_file(p)) {
            continue;
        }
        walker.skip_current_dir();

        let relative = path
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", path, root))?;
        let id = relative
            .components()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join("/");

        let status = if relative
            .components()
            .any(|c| has_prefix_ignore_case(c.as_str(), &config.disabled_prefix))
        {
            UnitStatus::Disabled
        } else if config.is_excluded(&id) {
            UnitStatus::Excluded
        } else {
            UnitStatus::Active
        };

        tracing::debug!("Found mod {} ({:?})", id, status);
        units.push(ModUnit { id, path, status });
    }

    tracing::info!("Discovered {} mods under {}", units.len(), root);
    Ok(units)
}

/// Ids of the units a bisection should consider
pub fn candidate_ids(units: &[ModUnit]) -> Vec<String> {
    units
        .iter()
        .filter(|u| u.status == UnitStatus::Active)
        .map(|u| u.id.clone())
        .collect()
}

fn contains_config_file(dir: &Utf8Path, is_config: impl Fn(&Utf8Path) -> bool) -> bool {
    match dir.read_dir_utf8() {
        Ok(entries) => any_config_file(
            dir,
            entries.map(|entry| entry.map(|e| e.path().to_path_buf())),
            is_config,
        ),
        Err(e) => {
            tracing::warn!("Cannot list {}: {}", dir, e);
            false
        }
    }
}

fn any_config_file(
    dir: &Utf8Path,
    entries: impl IntoIterator<Item = io::Result<Utf8PathBuf>>,
    is_config: impl Fn(&Utf8Path) -> bool,
) -> bool {
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", dir, e);
                continue;
            }
        };
        let is_file = fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false);
        if is_file && is_config(&path) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mods_tree(layout: &[&str]) -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        for file in layout {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "hash = 1a2b3c4d\n").unwrap();
        }
        (temp_dir, root)
    }

    #[test]
    fn test_discovers_folders_with_ini() {
        let (_temp_dir, root) = mods_tree(&[
            "ModB/mod.ini",
            "ModA/mod.ini",
            "Pack/ModC/mod.ini",
            "Textures/readme.txt",
        ]);

        let units = discover_mod_units(&root, &UserConfig::default()).unwrap();
        let ids: Vec<_> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["ModA", "ModB", "Pack/ModC"]);
        assert!(units.iter().all(|u| u.status == UnitStatus::Active));
    }

    #[test]
    fn test_does_not_descend_into_mod() {
        let (_temp_dir, root) = mods_tree(&["ModA/mod.ini", "ModA/Variants/alt.ini"]);

        let units = discover_mod_units(&root, &UserConfig::default()).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].id, "ModA");
    }

    #[test]
    fn test_statuses() {
        let (_temp_dir, root) = mods_tree(&[
            "DISABLED Old/mod.ini",
            "DISABLED Pack/Inner/mod.ini",
            "Core/mod.ini",
            "Hair/mod.ini",
        ]);
        let config = UserConfig {
            excluded_mods: vec!["core".to_string()],
            ..UserConfig::default()
        };

        let units = discover_mod_units(&root, &config).unwrap();
        let status_of = |id: &str| units.iter().find(|u| u.id == id).unwrap().status;

        assert_eq!(status_of("DISABLED Old"), UnitStatus::Disabled);
        assert_eq!(status_of("DISABLED Pack/Inner"), UnitStatus::Disabled);
        assert_eq!(status_of("Core"), UnitStatus::Excluded);
        assert_eq!(status_of("Hair"), UnitStatus::Active);
        assert_eq!(candidate_ids(&units), vec!["Hair".to_string()]);
    }

    #[test]
    fn test_unreadable_entry_is_skipped() {
        let (_temp_dir, root) = mods_tree(&["ModA/mod.ini"]);
        let entries = vec![
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            Ok(root.join("ModA/mod.ini")),
        ];

        assert!(any_config_file(&root.join("ModA"), entries, |p| {
            p.extension() == Some("ini")
        }));
    }

    #[test]
    fn test_root_must_be_directory() {
        let (_temp_dir, root) = mods_tree(&[]);
        assert!(discover_mod_units(&root.join("nope"), &UserConfig::default()).is_err());
    }
}
