use std::collections::btree_set::{self, BTreeSet};
use std::ops::Bound::Included;
use std::sync::Arc;
use crate::core::types::RecordId;

/// Upper sentinel appended to a prefix to bound a "starts with" range scan.
/// Keys compare by UTF-8 bytes, so every key that extends the prefix sorts at
/// or below `prefix + SENTINEL`, except one continuing with U+10FFFF followed
/// by more characters.
pub const PREFIX_SENTINEL: char = char::MAX;

pub type IndexEntry = (Arc<str>, RecordId);

/// Non-unique secondary index on record data, ordered by (data, id)
#[derive(Debug, Default)]
pub struct DataIndex {
    entries: BTreeSet<IndexEntry>,
}

impl DataIndex {
    pub fn new() -> Self {
        DataIndex { entries: BTreeSet::new() }
    }

    pub fn insert(&mut self, data: Arc<str>, id: RecordId) -> bool {
        self.entries.insert((data, id))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with keys in `[prefix, prefix + U+10FFFF]`, both ends inclusive.
    pub fn prefix_range(&self, prefix: &str) -> btree_set::Range<'_, IndexEntry> {
        let mut upper = String::with_capacity(prefix.len() + PREFIX_SENTINEL.len_utf8());
        upper.push_str(prefix);
        upper.push(PREFIX_SENTINEL);

        let lower: IndexEntry = (Arc::from(prefix), RecordId(0));
        let upper: IndexEntry = (Arc::from(upper), RecordId(u64::MAX));
        self.entries.range((Included(lower), Included(upper)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(keys: &[&str]) -> DataIndex {
        let mut index = DataIndex::new();
        for (i, key) in keys.iter().enumerate() {
            index.insert(Arc::from(*key), RecordId(i as u64 + 1));
        }
        index
    }

    fn keys(index: &DataIndex, prefix: &str) -> Vec<String> {
        index.prefix_range(prefix).map(|(k, _)| k.to_string()).collect()
    }

    #[test]
    fn prefix_range_matches_starts_with() {
        let index = index_of(&["ab", "abc", "abz", "ac", "a", "b", "Ab", "ab9"]);
        assert_eq!(keys(&index, "ab"), vec!["ab", "ab9", "abc", "abz"]);
        assert_eq!(keys(&index, "abc"), vec!["abc"]);
        assert!(keys(&index, "zz").is_empty());
    }

    #[test]
    fn empty_prefix_covers_everything() {
        let index = index_of(&["x", "A", "5"]);
        assert_eq!(keys(&index, ""), vec!["5", "A", "x"]);
    }

    #[test]
    fn duplicate_data_is_ordered_by_id() {
        let mut index = DataIndex::new();
        index.insert(Arc::from("same"), RecordId(9));
        index.insert(Arc::from("same"), RecordId(2));
        let ids: Vec<u64> = index.prefix_range("sa").map(|(_, id)| id.0).collect();
        assert_eq!(ids, vec![2, 9]);
    }

    #[test]
    fn supplementary_characters_stay_in_range() {
        let index = index_of(&["ab\u{1F600}", "ab\u{FFFF}z", "ab\u{10FFFF}", "ac"]);
        assert_eq!(keys(&index, "ab"), vec!["ab\u{FFFF}z", "ab\u{1F600}", "ab\u{10FFFF}"]);
    }
}
