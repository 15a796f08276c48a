use std::fs::{File, OpenOptions};
use std::io::{BufReader, ErrorKind as IoErrorKind, Read, Write};
use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use crate::core::types::Record;
use crate::storage::layout::StorageLayout;
use crate::core::error::{Result, Error, ErrorKind};

/// Frame header: payload length + CRC32 of the payload, both little-endian.
const FRAME_HEADER_LEN: u64 = 8;
/// Bytes written between fsyncs in `SyncMode::Batch`.
const BATCH_SYNC_BYTES: u64 = 1024 * 1024;

/// Write-ahead log for durability
pub struct WAL {
    pub file: File,
    pub generation: u64,
    pub position: u64,
    pub sync_mode: SyncMode,
    pub sequence: u64,
    unsynced: u64,
    poisoned: bool,
    #[cfg(test)]
    pub(crate) fail_next_sync: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    Immediate,  // fsync after every frame
    Batch,      // fsync once per BATCH_SYNC_BYTES
    None,       // Let OS handle it
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WALEntry {
    pub sequence: u64,
    pub operation: Operation,
    pub timestamp: DateTime<Utc>,
}

/// Borrowed twin of `WALEntry`; encodes to identical bytes.
#[derive(Serialize)]
struct WALEntryRef<'a> {
    sequence: u64,
    operation: &'a Operation,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operation {
    InsertBatch(Vec<Record>),
    Clear,
}

/// Result of replaying one WAL file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replay {
    pub entries: u64,
    pub last_sequence: Option<u64>,
    pub valid_len: u64,
    pub truncated_bytes: u64,
}

impl WAL {
    pub fn open(storage: &StorageLayout, generation: u64, sequence: u64, sync_mode: SyncMode) -> Result<Self> {
        let path = storage.wal_path(generation);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let position = file.metadata()?.len();

        Ok(WAL {
            file,
            generation,
            position,
            sync_mode,
            sequence,
            unsynced: 0,
            poisoned: false,
            #[cfg(test)]
            fail_next_sync: false,
        })
    }

    /// Append one operation as a single frame. A frame is the unit of atomicity:
    /// replay either sees all of it or none of it.
    ///
    /// An append that fails after bytes reached the file, including a failed
    /// fsync, cuts the frame off again before returning the error, so the log
    /// never holds an operation the caller was told did not happen.
    pub fn append(&mut self, operation: &Operation) -> Result<u64> {
        self.append_frame(operation, false)
    }

    /// Like `append`, but fsyncs before returning regardless of the sync mode.
    pub fn append_synced(&mut self, operation: &Operation) -> Result<u64> {
        self.append_frame(operation, true)
    }

    fn append_frame(&mut self, operation: &Operation, force_sync: bool) -> Result<u64> {
        if self.poisoned {
            return Err(Error::new(
                ErrorKind::Io,
                format!("WAL generation {} holds an unremovable partial frame", self.generation),
            ));
        }

        let sequence = self.sequence;
        let entry = WALEntryRef {
            sequence,
            operation,
            timestamp: Utc::now(),
        };

        let data = bincode::serialize(&entry)?;
        if data.len() > u32::MAX as usize {
            return Err(Error::new(ErrorKind::InvalidArgument, "WAL entry exceeds frame limit"));
        }

        let mut hasher = Hasher::new();
        hasher.update(&data);

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN as usize + data.len());
        frame.extend_from_slice(&(data.len() as u32).to_le_bytes());
        frame.extend_from_slice(&hasher.finalize().to_le_bytes());
        frame.extend_from_slice(&data);

        let (position, unsynced) = (self.position, self.unsynced);
        if let Err(err) = self.write_frame(&frame, force_sync) {
            self.rollback(position, unsynced);
            return Err(err);
        }

        self.sequence += 1;
        Ok(sequence)
    }

    fn write_frame(&mut self, frame: &[u8], force_sync: bool) -> Result<()> {
        self.file.write_all(frame)?;
        self.position += frame.len() as u64;
        self.unsynced += frame.len() as u64;

        let due = force_sync
            || match self.sync_mode {
                SyncMode::Immediate => true,
                SyncMode::Batch => self.unsynced >= BATCH_SYNC_BYTES,
                SyncMode::None => false,
            };
        if due {
            self.sync()?;
        }
        Ok(())
    }

    /// Truncate back to `position`. If that fails the log may end in a frame
    /// that later appends would bury mid-file, so the writer stops accepting them.
    fn rollback(&mut self, position: u64, unsynced: u64) {
        match self.file.set_len(position) {
            Ok(()) => {
                self.position = position;
                self.unsynced = unsynced;
            }
            Err(err) => {
                error!(generation = self.generation, error = %err, "could not remove failed WAL frame");
                self.poisoned = true;
            }
        }
    }

    pub fn sync(&mut self) -> Result<()> {
        #[cfg(test)]
        if std::mem::take(&mut self.fail_next_sync) {
            return Err(Error::new(ErrorKind::Io, "fsync failed"));
        }
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    pub fn size_bytes(&self) -> u64 {
        self.position
    }

    /// Feed every intact frame of `generation` to `apply`, in order.
    ///
    /// A frame that runs past the end of the file, or whose checksum fails on the
    /// file's final frame, is a torn write. With `repair_tail` it is cut off;
    /// otherwise, or for a bad frame with intact frames after it, the log is
    /// reported as corrupted.
    pub fn replay<F>(storage: &StorageLayout, generation: u64, repair_tail: bool, mut apply: F) -> Result<Replay>
    where
        F: FnMut(WALEntry) -> Result<()>,
    {
        let path = storage.wal_path(generation);
        let file = File::open(&path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut replay = Replay {
            entries: 0,
            last_sequence: None,
            valid_len: 0,
            truncated_bytes: 0,
        };
        let mut torn = false;

        loop {
            let mut header = [0u8; FRAME_HEADER_LEN as usize];
            match reader.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == IoErrorKind::UnexpectedEof => {
                    torn = replay.valid_len < file_len;
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as u64;
            let checksum = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
            let frame_end = replay.valid_len + FRAME_HEADER_LEN + len;

            if frame_end > file_len {
                torn = true;
                break;
            }

            let mut data = vec![0u8; len as usize];
            reader.read_exact(&mut data)?;

            let mut hasher = Hasher::new();
            hasher.update(&data);
            if hasher.finalize() != checksum {
                if frame_end == file_len {
                    torn = true;
                    break;
                }
                return Err(Error::new(
                    ErrorKind::Corrupted,
                    format!("checksum mismatch in {} at offset {}", path.display(), replay.valid_len),
                ));
            }

            let entry: WALEntry = bincode::deserialize(&data)?;
            replay.last_sequence = Some(entry.sequence);
            apply(entry)?;

            replay.entries += 1;
            replay.valid_len = frame_end;
        }

        if torn {
            if !repair_tail {
                return Err(Error::new(
                    ErrorKind::Corrupted,
                    format!("incomplete frame in sealed log {}", path.display()),
                ));
            }
            replay.truncated_bytes = file_len - replay.valid_len;
            warn!(
                wal = %path.display(),
                valid_len = replay.valid_len,
                truncated = replay.truncated_bytes,
                "discarding torn WAL tail"
            );
            let file = OpenOptions::new().write(true).open(&path)?;
            file.set_len(replay.valid_len)?;
            file.sync_all()?;
        }

        Ok(replay)
    }
}
