use std::collections::btree_map::BTreeMap;
use std::collections::btree_set;
use std::sync::Arc;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Record, RecordId};
use crate::index::data_index::IndexEntry;

/// Forward cursor over a range of the data index.
///
/// Each index entry is resolved against the primary record map, so an entry
/// whose record is missing or disagrees with the index surfaces as an error
/// instead of a phantom result.
pub struct IndexCursor<'a> {
    entries: btree_set::Range<'a, IndexEntry>,
    records: &'a BTreeMap<RecordId, Arc<str>>,
}

impl<'a> IndexCursor<'a> {
    pub fn new(entries: btree_set::Range<'a, IndexEntry>, records: &'a BTreeMap<RecordId, Arc<str>>) -> Self {
        IndexCursor {
            entries,
            records,
        }
    }

    /// Skip up to `count` entries without resolving them. Returns how many were skipped.
    pub fn advance(&mut self, count: u64) -> u64 {
        self.entries.by_ref().take(count as usize).count() as u64
    }

    /// Step once and resolve the entry to its record.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let Some((key, id)) = self.entries.next() else {
            return Ok(None);
        };

        match self.records.get(id) {
            Some(data) if Arc::ptr_eq(data, key) || **data == **key => {
                Ok(Some(Record::new(*id, data.as_ref())))
            }
            Some(_) => Err(Error::new(
                ErrorKind::Corrupted,
                format!("index entry for record {} does not match its data", id),
            )),
            None => Err(Error::new(
                ErrorKind::Corrupted,
                format!("index entry points at missing record {}", id),
            )),
        }
    }

    /// Whether another entry follows, without moving the cursor.
    pub fn has_next(&self) -> bool {
        self.entries.clone().next().is_some()
    }
}
