use serde::{Serialize, Deserialize};
use crate::core::types::RecordId;

/// Store statistics for the `stats` command and health logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub record_count: usize,
    pub next_id: RecordId,

    // Persistence
    pub wal_generation: u64,
    pub wal_size_bytes: u64,
    pub has_segment: bool,
    pub segment_records: u64,
}
