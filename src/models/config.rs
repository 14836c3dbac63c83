use crate::models::hash_index::{HashShape, ScanOptions};
use serde::{Deserialize, Serialize};

/// User settings from `mod-bisector.yaml`
///
/// Contains the last used mods directory, state file locations, and the
/// rules used to recognize hash declarations in INI files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Last mods directory the user worked with
    pub mods_path: String,

    /// Ledger of folders disabled by a bisection run
    pub state_file: String,

    /// Snapshot of an in-progress bisection
    pub checkpoint_file: String,

    /// Folder name prefix marking a disabled mod
    pub disabled_prefix: String,

    /// Keys whose values are hash declarations
    pub hash_keys: Vec<String>,

    /// Number of hex digits in a hash token
    pub hash_length: usize,

    /// Extensions of files that carry hash declarations
    pub config_extensions: Vec<String>,

    /// Skip disabled folders and files while scanning
    pub skip_disabled: bool,

    /// Mods never considered by a bisection
    pub excluded_mods: Vec<String>,

    pub debug_mode: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            mods_path: String::new(),
            state_file: default_state_file(),
            checkpoint_file: default_checkpoint_file(),
            disabled_prefix: DEFAULT_DISABLED_PREFIX.to_string(),
            hash_keys: vec!["hash".to_string()],
            hash_length: DEFAULT_HASH_LENGTH,
            config_extensions: vec!["ini".to_string()],
            skip_disabled: true,
            excluded_mods: Vec::new(),
            debug_mode: false,
        }
    }
}

/// Prefix the mod loader ignores when it appears at the start of a folder name
pub const DEFAULT_DISABLED_PREFIX: &str = "DISABLED ";

/// Hash tokens are 8 hex digits (32-bit hashes)
pub const DEFAULT_HASH_LENGTH: usize = 8;

fn default_state_file() -> String {
    "bisect-state.json".to_string()
}

fn default_checkpoint_file() -> String {
    "bisect-checkpoint.json".to_string()
}

impl UserConfig {
    /// Shape a value must have to count as a hash token
    pub fn hash_shape(&self) -> HashShape {
        HashShape::new(self.hash_length)
    }

    /// Options for a `ConfigIndex` scan built from these settings
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            hash_keys: self.hash_keys.iter().map(|k| k.to_lowercase()).collect(),
            shape: self.hash_shape(),
            extensions: self
                .config_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            disabled_prefix: self.skip_disabled.then(|| self.disabled_prefix.clone()),
        }
    }

    /// True if the mod should be left out of a bisection
    pub fn is_excluded(&self, unit_id: &str) -> bool {
        self.excluded_mods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(unit_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_config_defaults() {
        let config = UserConfig::default();
        assert_eq!(config.disabled_prefix, "DISABLED ");
        assert_eq!(config.hash_length, 8);
        assert_eq!(config.hash_keys, vec!["hash".to_string()]);
        assert!(config.skip_disabled);
        assert!(config.excluded_mods.is_empty());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: UserConfig = serde_yaml_ng::from_str("mods_path: /games/mods\n").unwrap();
        assert_eq!(config.mods_path, "/games/mods");
        assert_eq!(config.hash_length, 8);
        assert_eq!(config.state_file, "bisect-state.json");
    }

    #[test]
    fn test_scan_options_normalize_extensions() {
        let config = UserConfig {
            config_extensions: vec![".INI".to_string(), "txt".to_string()],
            hash_keys: vec!["Hash".to_string(), "vb_hash".to_string()],
            ..UserConfig::default()
        };

        let options = config.scan_options();
        assert_eq!(options.extensions, vec!["ini", "txt"]);
        assert_eq!(options.hash_keys, vec!["hash", "vb_hash"]);
        assert_eq!(options.disabled_prefix.as_deref(), Some("DISABLED "));
    }

    #[test]
    fn test_scan_options_without_skip_disabled() {
        let config = UserConfig {
            skip_disabled: false,
            ..UserConfig::default()
        };
        assert!(config.scan_options().disabled_prefix.is_none());
    }

    #[test]
    fn test_is_excluded_ignores_case() {
        let config = UserConfig {
            excluded_mods: vec!["ShaderFix".to_string()],
            ..UserConfig::default()
        };
        assert!(config.is_excluded("shaderfix"));
        assert!(!config.is_excluded("Other"));
    }
}
