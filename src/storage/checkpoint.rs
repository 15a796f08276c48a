use std::fs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::core::types::RecordId;
use crate::storage::layout::StorageLayout;
use crate::storage::segment::SegmentId;
use crate::core::error::Result;

/// Durable pointer to the current on-disk state: one optional snapshot segment
/// plus every WAL generation from `wal_generation` onwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub wal_generation: u64,
    pub wal_sequence: u64,
    pub segment: Option<SegmentId>,
    pub next_id: RecordId,
    pub record_count: u64,
    pub timestamp: DateTime<Utc>,
}

impl Checkpoint {
    pub fn empty() -> Self {
        Checkpoint {
            wal_generation: 0,
            wal_sequence: 0,
            segment: None,
            next_id: RecordId::FIRST,
            record_count: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn load(storage: &StorageLayout) -> Result<Option<Self>> {
        let path = storage.checkpoint_path();
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(path)?;
        let checkpoint = bincode::deserialize(&data)?;
        Ok(Some(checkpoint))
    }

    /// Write to a temporary file, then rename over the old checkpoint.
    pub fn save(&self, storage: &StorageLayout) -> Result<()> {
        let path = storage.checkpoint_path();
        let tmp = path.with_extension("tmp");

        let data = bincode::serialize(self)?;
        fs::write(&tmp, data)?;
        fs::File::open(&tmp)?.sync_all()?;
        fs::rename(&tmp, &path)?;

        #[cfg(unix)]
        fs::File::open(&storage.meta_dir)?.sync_all()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_replaces_previous_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();
        assert!(Checkpoint::load(&storage).unwrap().is_none());

        let mut checkpoint = Checkpoint::empty();
        checkpoint.save(&storage).unwrap();

        checkpoint.wal_generation = 4;
        checkpoint.next_id = RecordId(501);
        checkpoint.segment = Some(SegmentId::new());
        checkpoint.save(&storage).unwrap();

        let loaded = Checkpoint::load(&storage).unwrap().unwrap();
        assert_eq!(loaded.wal_generation, 4);
        assert_eq!(loaded.next_id, RecordId(501));
        assert_eq!(loaded.segment, checkpoint.segment);
        assert!(!storage.checkpoint_path().with_extension("tmp").exists());
    }
}
