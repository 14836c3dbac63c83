//! Directory scanner that builds a [`HashIndex`] from INI-style configuration files.
//!
//! A hash declaration is a `key = value` line whose key is one of the configured
//! hash keys and whose value has the configured [`HashShape`]:
//!
//! ```text
//! [TextureOverrideBody]
//! hash = 0x1A2B3C4D   ; inline comments are dropped
//! match_first_index = 0
//! ```
//!
//! Files that cannot be read, are not UTF-8, or contain a broken section
//! header are skipped and reported as [`MalformedConfigWarning`]s. A broken
//! mod set is exactly what this tool is pointed at, so one bad file never
//! fails the whole scan.

use crate::models::{ConfigFile, HashIndex, MalformedConfigWarning, ScanOptions, ScanReport};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::fs;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors that abort a scan. Per-file problems are warnings, not errors.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Not a directory: {0}")]
    NotADirectory(Utf8PathBuf),

    #[error("Cannot read directory {path}: {source}")]
    Unreadable {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Scan cancelled")]
    Cancelled,
}

/// Scanner for configuration files and their hash declarations
///
/// # Fields
///
/// - `entry_pattern`: Splits a trimmed line into key and value
///   - Pattern: `^([^=]+?)\s*=\s*(.*)$`
///   - Example match: "hash = 1a2b3c4d"
///
/// - `comment_pattern`: Finds the start of an inline comment in a value
///   - Pattern: `\s*(?:;|#|//)`
///   - Example match: " ; body texture"
#[derive(Debug, Clone)]
pub struct ConfigIndex {
    options: ScanOptions,
    entry_pattern: Regex,
    comment_pattern: Regex,
}

impl ConfigIndex {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            entry_pattern: Regex::new(r"^([^=]+?)\s*=\s*(.*)$").expect("Invalid entry regex"),
            comment_pattern: Regex::new(r"\s*(?:;|#|//)").expect("Invalid comment regex"),
        }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scan `root` recursively and build a fresh index.
    pub fn scan(&self, root: &Utf8Path) -> Result<ScanReport, ScanError> {
        self.scan_with_cancel(root, &AtomicBool::new(false))
    }

    /// Scan `root`, checking `cancel` before each entry.
    ///
    /// Entries are visited in file name order and the resulting index is
    /// sorted, so repeated scans of an unchanged tree give equal indexes.
    pub fn scan_with_cancel(
        &self,
        root: &Utf8Path,
        cancel: &AtomicBool,
    ) -> Result<ScanReport, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        fs::read_dir(root).map_err(|source| ScanError::Unreadable {
            path: root.to_path_buf(),
            source,
        })?;

        tracing::info!("Scanning {} for configuration files", root);

        let mut files = Vec::new();
        let mut warnings = Vec::new();

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !self
                        .options
                        .is_disabled_name(&entry.file_name().to_string_lossy())
            });

        for entry in walker {
            if cancel.load(Ordering::Relaxed) {
                tracing::info!("Scan of {} cancelled after {} files", root, files.len());
                return Err(ScanError::Cancelled);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    return Err(ScanError::Unreadable {
                        path: root.to_path_buf(),
                        source: io::Error::from(err),
                    });
                }
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_else(|| root.to_string());
                    tracing::warn!("Skipping unreadable entry {}: {}", path, err);
                    warnings.push(MalformedConfigWarning::new(path, err.to_string()));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = match Utf8PathBuf::from_path_buf(entry.into_path()) {
                Ok(path) => path,
                Err(path) => {
                    let lossy = path.to_string_lossy().into_owned();
                    tracing::warn!("Skipping non UTF-8 path {}", lossy);
                    warnings.push(MalformedConfigWarning::new(lossy, "path is not valid UTF-8"));
                    continue;
                }
            };

            if !self.options.is_config_file(&path) {
                continue;
            }

            match self.read_config_file(&path) {
                Ok(file) => {
                    tracing::debug!("{}: {} hash declarations", file.path, file.hashes.len());
                    files.push(file);
                }
                Err(warning) => {
                    tracing::warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        let index = HashIndex::from_files(files);
        tracing::info!(
            "Scan complete: files={}, hashes={}, skipped={}",
            index.file_count(),
            index.hash_count(),
            warnings.len()
        );

        Ok(ScanReport { index, warnings })
    }

    fn read_config_file(&self, path: &Utf8Path) -> Result<ConfigFile, MalformedConfigWarning> {
        let bytes = fs::read(path)
            .map_err(|e| MalformedConfigWarning::new(path, format!("cannot read file: {}", e)))?;
        let contents = String::from_utf8(bytes)
            .map_err(|_| MalformedConfigWarning::new(path, "file is not valid UTF-8"))?;
        let hashes = self
            .parse_contents(&contents)
            .map_err(|reason| MalformedConfigWarning::new(path, reason))?;

        Ok(ConfigFile {
            path: path.to_path_buf(),
            hashes,
        })
    }

    /// Extract hash tokens from file contents in declaration order.
    ///
    /// Returns the reason as `Err` when the contents are malformed.
    pub fn parse_contents(&self, contents: &str) -> Result<Vec<String>, String> {
        let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
        let mut hashes = Vec::new();

        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty()
                || line.starts_with(';')
                || line.starts_with('#')
                || line.starts_with("//")
            {
                continue;
            }

            if line.starts_with('[') {
                if !line.contains(']') {
                    return Err(format!("unterminated section header on line {}", line_no + 1));
                }
                continue;
            }

            let Some(caps) = self.entry_pattern.captures(line) else {
                continue;
            };

            let key = caps[1].trim().to_lowercase();
            if !self.options.hash_keys.iter().any(|k| *k == key) {
                continue;
            }

            let value = self.clean_value(&caps[2]);
            match self.options.shape.normalize(value) {
                Some(hash) => hashes.push(hash),
                None => tracing::debug!(
                    "Ignoring {} value {:?} on line {}: not a {}-digit hex token",
                    key,
                    value,
                    line_no + 1,
                    self.options.shape.length()
                ),
            }
        }

        Ok(hashes)
    }

    /// Drop an inline comment and one pair of surrounding quotes
    fn clean_value<'a>(&self, raw: &'a str) -> &'a str {
        let value = match self.comment_pattern.find(raw) {
            Some(m) => &raw[..m.start()],
            None => raw,
        };
        let value = value.trim();

        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                return value[1..value.len() - 1].trim();
            }
        }
        value
    }
}

impl Default for ConfigIndex {
    fn default() -> Self {
        Self::new(ScanOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HashShape;
    use tempfile::TempDir;

    fn utf8_root(temp_dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_parse_hash_lines() {
        let index = ConfigIndex::default();
        let contents = "\
[TextureOverrideBody]
hash = 1A2B3C4D
HASH=0xdeadbeef ; comment
  hash = \"cafebabe\"
hash = 1234 // too short
match_first_index = 00000000
";
        let hashes = index.parse_contents(contents).unwrap();
        assert_eq!(hashes, vec!["1a2b3c4d", "deadbeef", "cafebabe"]);
    }

    #[test]
    fn test_parse_skips_comment_lines() {
        let index = ConfigIndex::default();
        let hashes = index
            .parse_contents("; hash = 11111111\n# hash = 22222222\n// hash = 33333333\n")
            .unwrap();
        assert!(hashes.is_empty());
    }

    #[test]
    fn test_parse_strips_byte_order_mark() {
        let index = ConfigIndex::default();
        let hashes = index.parse_contents("\u{feff}hash = 0badf00d\n").unwrap();
        assert_eq!(hashes, vec!["0badf00d"]);
    }

    #[test]
    fn test_unterminated_section_is_malformed() {
        let index = ConfigIndex::default();
        let err = index
            .parse_contents("[TextureOverride\nhash = 1a2b3c4d\n")
            .unwrap_err();
        assert!(err.contains("line 1"));
    }

    #[test]
    fn test_custom_keys_and_length() {
        let index = ConfigIndex::new(ScanOptions {
            hash_keys: vec!["vb_hash".to_string()],
            shape: HashShape::new(4),
            ..ScanOptions::default()
        });
        let hashes = index
            .parse_contents("hash = abcd\nvb_hash = ABCD\nvb_hash = abcdef\n")
            .unwrap();
        assert_eq!(hashes, vec!["abcd"]);
    }

    #[test]
    fn test_scan_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let missing = utf8_root(&temp_dir).join("missing");

        let result = ConfigIndex::default().scan(&missing);
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }

    #[test]
    fn test_scan_honors_cancel_flag() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        fs::write(root.join("a.ini"), "hash = 1a2b3c4d\n").unwrap();

        let cancel = AtomicBool::new(true);
        let result = ConfigIndex::default().scan_with_cancel(&root, &cancel);
        assert!(matches!(result, Err(ScanError::Cancelled)));
    }

    #[test]
    fn test_scan_collects_malformed_warnings() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_root(&temp_dir);
        fs::create_dir_all(root.join("ModA")).unwrap();
        fs::write(root.join("ModA/good.ini"), "hash = 1a2b3c4d\n").unwrap();
        fs::write(root.join("ModA/binary.ini"), [0xffu8, 0xfe, 0x00, 0x41]).unwrap();

        let report = ConfigIndex::default().scan(&root).unwrap();
        assert_eq!(report.index.file_count(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].path.as_str().ends_with("binary.ini"));
    }
}
