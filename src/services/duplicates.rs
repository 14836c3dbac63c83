use crate::models::HashIndex;
use camino::Utf8PathBuf;
use std::collections::{BTreeMap, BTreeSet};

/// Hashes declared by two or more files, each with its complete file set
pub type DuplicateReport = BTreeMap<String, BTreeSet<Utf8PathBuf>>;

/// Reports hashes that more than one configuration file declares.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateDetector<'a> {
    index: &'a HashIndex,
}

impl<'a> DuplicateDetector<'a> {
    pub fn new(index: &'a HashIndex) -> Self {
        Self { index }
    }

    /// Single pass over the index keeping entries with at least two files.
    pub fn find_duplicates(&self) -> DuplicateReport {
        let duplicates: DuplicateReport = self
            .index
            .entries()
            .filter(|(_, files)| files.len() >= 2)
            .map(|(hash, files)| (hash.to_string(), files.clone()))
            .collect();

        tracing::info!(
            "Found {} duplicated hashes among {} indexed hashes",
            duplicates.len(),
            self.index.hash_count()
        );

        duplicates
    }
}
