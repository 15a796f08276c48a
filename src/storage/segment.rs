use chrono::{DateTime, Utc};
use uuid::Uuid;
use serde::{Deserialize, Serialize};
use crate::core::error::Result;
use crate::core::types::RecordId;

/// Unique segment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new() -> Self {
        SegmentId(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable snapshot of the collection at checkpoint time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub record_count: u64,
    pub metadata: SegmentMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMetadata {
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub min_id: Option<RecordId>,
    pub max_id: Option<RecordId>,
}

/// Segment file header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentHeader {
    pub version: u32,
    pub record_count: u64,
    pub block_count: u32,
    pub checksum: u32,    // CRC32 over every block after the header
    pub compression: CompressionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    Lz4,
}

impl SegmentHeader {
    pub const VERSION: u32 = 1;

    pub fn new(compression: CompressionType) -> Self {
        SegmentHeader {
            version: Self::VERSION,
            record_count: 0,
            block_count: 0,
            checksum: 0,
            compression,
        }
    }

    /// All header fields are fixed-width, so every header encodes to the same size.
    pub fn encoded_len() -> Result<u64> {
        Ok(bincode::serialized_size(&SegmentHeader::new(CompressionType::None))?)
    }
}
