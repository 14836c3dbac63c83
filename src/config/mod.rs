use crate::models::UserConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Name of the settings file inside the configuration directory
pub const SETTINGS_FILE: &str = "mod-bisector.yaml";

/// Prefix of environment variables that override settings,
/// e.g. `MOD_BISECTOR_HASH_LENGTH=16`
pub const ENV_PREFIX: &str = "MOD_BISECTOR";

/// Loads and saves [`UserConfig`].
///
/// Settings live in a single YAML file (`mod-bisector.yaml`). Values from
/// `MOD_BISECTOR_*` environment variables take precedence over the file, and
/// anything set in neither place keeps its default.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory holding `mod-bisector.yaml`; created if missing
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        })
    }

    /// Load the user configuration.
    ///
    /// # Returns
    /// The settings file layered under environment overrides, or defaults
    /// when neither supplies a value
    pub fn load_user_config(&self) -> Result<UserConfig> {
        if !self.settings_path.exists() {
            tracing::debug!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let config = Config::builder()
            .add_source(
                File::from(self.settings_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("hash_keys")
                    .with_list_parse_key("config_extensions")
                    .with_list_parse_key("excluded_mods"),
            )
            .build()
            .with_context(|| format!("Failed to read user config: {}", self.settings_path))?;

        let user_config: UserConfig = config
            .try_deserialize()
            .with_context(|| format!("Failed to parse user config: {}", self.settings_path))?;

        tracing::info!("Loaded user config from {}", self.settings_path);
        Ok(user_config)
    }

    /// Save the user configuration file.
    pub fn save_user_config(&self, config: &UserConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize user config to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write user config: {}", self.settings_path))?;

        tracing::info!("Saved user config to {}", self.settings_path);
        Ok(())
    }

    /// Remember `mods_path` as the directory to use when none is given.
    pub fn save_last_path(&self, mods_path: &Utf8Path) -> Result<()> {
        let mut config = self.load_file_config()?;
        if config.mods_path == mods_path.as_str() {
            return Ok(());
        }

        config.mods_path = mods_path.to_string();
        self.save_user_config(&config)
    }

    /// Copy the settings file to `dest`.
    pub fn backup_settings(&self, dest: &Utf8Path) -> Result<()> {
        if !self.settings_path.exists() {
            // Nothing saved yet, back up the defaults instead
            self.save_user_config(&UserConfig::default())?;
        }

        if let Some(parent) = dest.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create backup directory: {}", parent))?;
        }

        fs::copy(&self.settings_path, dest)
            .with_context(|| format!("Failed to back up settings to {}", dest))?;

        tracing::info!("Backed up settings to {}", dest);
        Ok(())
    }

    /// Replace the settings file with `src`.
    ///
    /// The current settings are left untouched if `src` is not a valid
    /// settings document.
    pub fn restore_settings(&self, src: &Utf8Path) -> Result<()> {
        let contents = fs::read_to_string(src)
            .with_context(|| format!("Failed to read settings backup: {}", src))?;

        let _: UserConfig = serde_yaml_ng::from_str(&contents)
            .with_context(|| format!("Settings backup is not valid: {}", src))?;

        fs::write(&self.settings_path, contents)
            .with_context(|| format!("Failed to restore settings: {}", self.settings_path))?;

        tracing::info!("Restored settings from {}", src);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// The settings file alone, so environment overrides are never written back.
    fn load_file_config(&self) -> Result<UserConfig> {
        if !self.settings_path.exists() {
            return Ok(UserConfig::default());
        }

        let contents = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read user config: {}", self.settings_path))?;
        serde_yaml_ng::from_str(&contents)
            .with_context(|| format!("Failed to parse user config: {}", self.settings_path))
    }
}
