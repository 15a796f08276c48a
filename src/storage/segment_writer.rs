use std::io::{BufWriter, Write, Seek, SeekFrom};
use std::fs::File;
use chrono::Utc;
use crc32fast::Hasher;
use crate::core::types::Record;
use crate::storage::layout::StorageLayout;
use crate::storage::segment::{CompressionType, Segment, SegmentHeader, SegmentId, SegmentMetadata};
use crate::core::error::Result;

/// Records per compressed block
pub const BLOCK_RECORDS: usize = 64 * 1024;

pub struct SegmentWriter {
    pub segment: Segment,
    pub header: SegmentHeader,
    pub file: BufWriter<File>,
    pub hasher: Hasher,
}

impl SegmentWriter {
    pub fn new(storage: &StorageLayout, segment_id: SegmentId) -> Result<Self> {
        let path = storage.segment_path(&segment_id);
        let mut file = BufWriter::new(File::create(path)?);

        // Placeholder, rewritten by finish()
        let header = SegmentHeader::new(CompressionType::Lz4);
        file.write_all(&bincode::serialize(&header)?)?;

        Ok(SegmentWriter {
            segment: Segment {
                id: segment_id,
                record_count: 0,
                metadata: SegmentMetadata {
                    created_at: Utc::now(),
                    size_bytes: 0,
                    min_id: None,
                    max_id: None,
                },
            },
            header,
            file,
            hasher: Hasher::new(),
        })
    }

    /// Append records in id order, split into fixed-size blocks.
    pub fn write_records<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut block = Vec::with_capacity(BLOCK_RECORDS);
        for record in records {
            block.push(record);
            if block.len() == BLOCK_RECORDS {
                self.write_block(&block)?;
                block.clear();
            }
        }
        if !block.is_empty() {
            self.write_block(&block)?;
        }
        Ok(())
    }

    // [ len u32 ][ lz4(bincode(Vec<Record>)) ]
    fn write_block(&mut self, block: &[Record]) -> Result<()> {
        let data = bincode::serialize(block)?;
        let compressed = lz4_flex::compress_prepend_size(&data);

        let len = (compressed.len() as u32).to_le_bytes();
        self.hasher.update(&len);
        self.hasher.update(&compressed);
        self.file.write_all(&len)?;
        self.file.write_all(&compressed)?;

        let meta = &mut self.segment.metadata;
        if meta.min_id.is_none() {
            meta.min_id = block.first().map(|r| r.id);
        }
        meta.max_id = block.last().map(|r| r.id).or(meta.max_id);

        self.segment.record_count += block.len() as u64;
        self.header.block_count += 1;
        Ok(())
    }

    // [ HEADER (counts, checksum) ] <- byte 0
    // [ BLOCK 1 ]
    // [ BLOCK 2 ]
    pub fn finish(mut self) -> Result<Segment> {
        self.header.record_count = self.segment.record_count;
        self.header.checksum = self.hasher.finalize();

        let mut file = self.file.into_inner().map_err(|e| e.into_error())?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&bincode::serialize(&self.header)?)?;
        file.sync_all()?;

        self.segment.metadata.size_bytes = file.metadata()?.len();
        Ok(self.segment)
    }
}
