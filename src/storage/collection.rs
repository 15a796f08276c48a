use std::collections::BTreeMap;
use std::sync::Arc;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Record, RecordId};
use crate::index::cursor::IndexCursor;
use crate::index::data_index::DataIndex;

/// In-memory record set: primary map by id plus the data index.
///
/// Record data is shared between the map and the index, so each string is
/// stored once.
#[derive(Debug)]
pub struct Collection {
    records: BTreeMap<RecordId, Arc<str>>,
    index: DataIndex,
    next_id: RecordId,
}

impl Default for Collection {
    fn default() -> Self {
        Self::new()
    }
}

impl Collection {
    pub fn new() -> Self {
        Collection {
            records: BTreeMap::new(),
            index: DataIndex::new(),
            next_id: RecordId::FIRST,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn next_id(&self) -> RecordId {
        self.next_id
    }

    pub(crate) fn set_next_id(&mut self, next_id: RecordId) {
        self.next_id = next_id;
    }

    /// Assign consecutive ids to `data` without inserting anything.
    pub fn assign_ids(&self, data: Vec<String>) -> Vec<Record> {
        let mut id = self.next_id;
        data.into_iter()
            .map(|data| {
                let record = Record::new(id, data);
                id = id.next();
                record
            })
            .collect()
    }

    /// Insert records that already carry ids; both maps change together.
    pub fn apply_batch(&mut self, records: Vec<Record>) -> Result<()> {
        if let Some(record) = records.iter().find(|r| self.records.contains_key(&r.id)) {
            return Err(Error::new(
                ErrorKind::Corrupted,
                format!("record id {} already present", record.id),
            ));
        }

        for record in records {
            let data: Arc<str> = Arc::from(record.data);
            self.records.insert(record.id, data.clone());
            self.index.insert(data, record.id);
            if record.id >= self.next_id {
                self.next_id = record.id.next();
            }
        }
        Ok(())
    }

    /// Drop every record and restart id assignment.
    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
        self.next_id = RecordId::FIRST;
    }

    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.records.get(&id).map(|data| Record::new(id, data.as_ref()))
    }

    pub fn iter(&self) -> impl Iterator<Item = Record> + '_ {
        self.records.iter().map(|(id, data)| Record::new(*id, data.as_ref()))
    }

    pub fn prefix_cursor(&self, prefix: &str) -> IndexCursor<'_> {
        IndexCursor::new(self.index.prefix_range(prefix), &self.records)
    }

    #[cfg(test)]
    fn index_len(&self) -> usize {
        self.index.len()
    }
}
