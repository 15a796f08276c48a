use std::fs::File;
use std::io::{BufReader, Read};
use crc32fast::Hasher;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Record;
use crate::storage::layout::StorageLayout;
use crate::storage::segment::{CompressionType, SegmentHeader, SegmentId};

pub struct SegmentReader {
    pub segment_id: SegmentId,
    pub header: SegmentHeader,
    file: BufReader<File>,
    hasher: Hasher,
    blocks_read: u32,
}

impl SegmentReader {
    pub fn open(storage: &StorageLayout, segment_id: SegmentId) -> Result<Self> {
        let path = storage.segment_path(&segment_id);
        let mut file = BufReader::new(File::open(path)?);

        let mut header_buf = vec![0u8; SegmentHeader::encoded_len()? as usize];
        file.read_exact(&mut header_buf)?;
        let header: SegmentHeader = bincode::deserialize(&header_buf)?;

        if header.version != SegmentHeader::VERSION {
            return Err(Error::new(
                ErrorKind::Corrupted,
                format!("incompatible segment version {}", header.version),
            ));
        }

        Ok(SegmentReader {
            segment_id,
            header,
            file,
            hasher: Hasher::new(),
            blocks_read: 0,
        })
    }

    /// Next block of records, or `None` once every block has been read and the
    /// checksum verified.
    pub fn next_block(&mut self) -> Result<Option<Vec<Record>>> {
        if self.blocks_read == self.header.block_count {
            let checksum = std::mem::take(&mut self.hasher).finalize();
            if checksum != self.header.checksum {
                return Err(Error::new(
                    ErrorKind::Corrupted,
                    format!("segment {} checksum mismatch", self.segment_id.0),
                ));
            }
            self.blocks_read += 1;
            return Ok(None);
        }
        if self.blocks_read > self.header.block_count {
            return Ok(None);
        }

        let mut len_buf = [0u8; 4];
        self.file.read_exact(&mut len_buf)?;
        let mut block = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        self.file.read_exact(&mut block)?;

        self.hasher.update(&len_buf);
        self.hasher.update(&block);
        self.blocks_read += 1;

        let data = match self.header.compression {
            CompressionType::Lz4 => lz4_flex::decompress_size_prepended(&block)?,
            CompressionType::None => block,
        };
        Ok(Some(bincode::deserialize(&data)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RecordId;
    use crate::storage::segment_writer::{SegmentWriter, BLOCK_RECORDS};

    #[test]
    fn reads_back_multiple_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();

        let records: Vec<Record> = (1..=(BLOCK_RECORDS as u64 + 10))
            .map(|i| Record::new(RecordId(i), format!("{:06}", i)))
            .collect();

        let mut writer = SegmentWriter::new(&storage, SegmentId::new()).unwrap();
        writer.write_records(records.iter().cloned()).unwrap();
        let segment = writer.finish().unwrap();
        assert_eq!(segment.record_count, records.len() as u64);
        assert_eq!(segment.metadata.min_id, Some(RecordId(1)));
        assert_eq!(segment.metadata.max_id, Some(RecordId(records.len() as u64)));

        let mut reader = SegmentReader::open(&storage, segment.id).unwrap();
        assert_eq!(reader.header.block_count, 2);
        let mut read = Vec::new();
        while let Some(block) = reader.next_block().unwrap() {
            read.extend(block);
        }
        assert_eq!(read, records);
    }

    #[test]
    fn flipped_byte_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();

        let records = vec![Record::new(RecordId(1), "abc"), Record::new(RecordId(2), "abd")];
        let mut writer = SegmentWriter::new(&storage, SegmentId::new()).unwrap();
        writer.write_records(records.iter().cloned()).unwrap();
        let segment = writer.finish().unwrap();

        let path = storage.segment_path(&segment.id);
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        std::fs::write(&path, bytes).unwrap();

        let mut reader = SegmentReader::open(&storage, segment.id).unwrap();
        let outcome = (|| -> Result<()> {
            while reader.next_block()?.is_some() {}
            Ok(())
        })();
        assert!(outcome.is_err());
    }
}
