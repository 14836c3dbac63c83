use crate::models::config::{DEFAULT_DISABLED_PREFIX, DEFAULT_HASH_LENGTH};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A configuration file and the hash tokens it declares, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: Utf8PathBuf,
    pub hashes: Vec<String>,
}

/// Reverse mapping from hash token to the files that declare it.
///
/// Built once per scan and never updated in place. File sets are ordered
/// lexicographically by path, so two scans of the same tree compare equal
/// and report in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashIndex {
    files: Vec<ConfigFile>,
    by_hash: BTreeMap<String, BTreeSet<Utf8PathBuf>>,
}

impl HashIndex {
    /// Build the index from scanned files. Every declared hash of every file is indexed.
    pub fn from_files(mut files: Vec<ConfigFile>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut by_hash: BTreeMap<String, BTreeSet<Utf8PathBuf>> = BTreeMap::new();
        for file in &files {
            for hash in &file.hashes {
                by_hash
                    .entry(hash.clone())
                    .or_default()
                    .insert(file.path.clone());
            }
        }

        Self { files, by_hash }
    }

    /// Scanned files sorted by path
    pub fn files(&self) -> &[ConfigFile] {
        &self.files
    }

    /// Files declaring `hash`. The token must already be normalized.
    pub fn files_declaring(&self, hash: &str) -> Option<&BTreeSet<Utf8PathBuf>> {
        self.by_hash.get(hash)
    }

    /// All (hash, files) entries in hash order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &BTreeSet<Utf8PathBuf>)> {
        self.by_hash.iter().map(|(hash, files)| (hash.as_str(), files))
    }

    pub fn hash_count(&self) -> usize {
        self.by_hash.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A configuration file left out of the index. Scanning continues past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedConfigWarning {
    pub path: Utf8PathBuf,
    pub reason: String,
}

impl MalformedConfigWarning {
    pub fn new(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MalformedConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped {}: {}", self.path, self.reason)
    }
}

/// Result of a successful scan: the index plus the files that were skipped.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub index: HashIndex,
    pub warnings: Vec<MalformedConfigWarning>,
}

/// Fixed shape of a hash token: `length` hex digits, optionally written with `0x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashShape {
    length: usize,
}

impl HashShape {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Normalize `raw` to a lowercase token, or `None` if it does not have the shape.
    ///
    /// A zero-length shape matches nothing.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let digits = strip_hex_prefix(raw.trim());
        if self.length > 0
            && digits.len() == self.length && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(digits.to_ascii_lowercase())
        } else {
            None
        }
    }
}

impl Default for HashShape {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_LENGTH)
    }
}

/// Normalize a user-supplied hash query without validating its shape
pub fn normalize_query(raw: &str) -> String {
    strip_hex_prefix(raw.trim()).to_ascii_lowercase()
}

fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// What counts as a configuration file and a hash declaration during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Lowercase keys whose values are hash declarations
    pub hash_keys: Vec<String>,
    pub shape: HashShape,
    /// Lowercase extensions without the leading dot
    pub extensions: Vec<String>,
    /// Skip folders and files with this prefix (case-insensitive); `None` scans everything
    pub disabled_prefix: Option<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            hash_keys: vec!["hash".to_string()],
            shape: HashShape::default(),
            extensions: vec!["ini".to_string()],
            disabled_prefix: Some(DEFAULT_DISABLED_PREFIX.to_string()),
        }
    }
}

impl ScanOptions {
    pub fn is_config_file(&self, path: &Utf8Path) -> bool {
        path.extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    pub fn is_disabled_name(&self, name: &str) -> bool {
        match &self.disabled_prefix {
            Some(prefix) => has_prefix_ignore_case(name, prefix),
            None => false,
        }
    }
}

/// Case-insensitive ASCII prefix test
pub fn has_prefix_ignore_case(name: &str, prefix: &str) -> bool {
    name.len() >= prefix.len()
        && name.is_char_boundary(prefix.len())
        && name[..prefix.len()].eq_ignore_ascii_case(prefix)
}
