use crate::models::HashIndex;
use crate::models::hash_index::normalize_query;
use camino::Utf8PathBuf;
use std::collections::BTreeSet;

/// Answers "which files declare hash H" against one scan's index.
///
/// Holds the index by reference, so a rescan never changes the answers of a
/// lookup service built from the previous snapshot.
#[derive(Debug, Clone, Copy)]
pub struct HashLookupService<'a> {
    index: &'a HashIndex,
}

impl<'a> HashLookupService<'a> {
    pub fn new(index: &'a HashIndex) -> Self {
        Self { index }
    }

    /// Files declaring `hash`, in path order.
    ///
    /// The query is trimmed, lowercased and stripped of a `0x` prefix first.
    /// An unknown hash yields an empty set.
    pub fn lookup(&self, hash: &str) -> BTreeSet<Utf8PathBuf> {
        let query = normalize_query(hash);
        match self.index.files_declaring(&query) {
            Some(files) => files.clone(),
            None => {
                tracing::debug!("Hash {} not declared by any scanned file", query);
                BTreeSet::new()
            }
        }
    }
}
