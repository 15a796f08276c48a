use std::fs;
use chrono::Utc;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};
use crate::core::config::Config;
use crate::core::error::{ErrorKind, Result};
use crate::core::stats::StoreStats;
use crate::core::types::RecordId;
use crate::schema::schema::CollectionSchema;
use crate::storage::checkpoint::Checkpoint;
use crate::storage::collection::Collection;
use crate::storage::file_lock::FileLock;
use crate::storage::layout::StorageLayout;
use crate::storage::segment::SegmentId;
use crate::storage::segment_reader::SegmentReader;
use crate::storage::segment_writer::SegmentWriter;
use crate::storage::wal::{Operation, WAL};

/// Operations the engines need from a record store.
pub trait RecordStore: Send + Sync {
    /// Shared view of the collection. Holding it blocks writers from publishing.
    fn read(&self) -> RwLockReadGuard<'_, Collection>;

    /// Assign ids to `data` and insert it as one atomic unit. Returns the ids
    /// given to the first and last record, or `None` for an empty batch.
    fn insert_batch(&self, data: Vec<String>) -> Result<Option<(RecordId, RecordId)>>;

    /// Remove every record and restart id assignment.
    fn clear(&self) -> Result<()>;

    /// Force buffered writes to disk.
    fn flush(&self) -> Result<()>;
}

/// The persistent record collection.
///
/// Reads go through a shared lock on the in-memory collection. Writes are
/// serialized by the writer mutex: each one is appended to the WAL as a single
/// frame before it becomes visible to readers.
pub struct Store {
    storage: StorageLayout,
    collection: RwLock<Collection>,
    writer: Mutex<StoreWriter>,
    _lock: FileLock,
}

struct StoreWriter {
    wal: WAL,
    checkpoint: Checkpoint,
}

impl Store {
    /// Open or create the store at `config.storage_path`, recovering any
    /// state left by a previous process. Every failure is `StoreUnavailable`.
    pub fn open(config: &Config) -> Result<Self> {
        Self::open_inner(config).map_err(|e| e.within(ErrorKind::StoreUnavailable))
    }

    fn open_inner(config: &Config) -> Result<Self> {
        let storage = StorageLayout::new(config.storage_path.clone())?;
        let lock = FileLock::acquire(&storage)?;

        if CollectionSchema::records().ensure(&storage)? {
            info!(path = %storage.base_dir.display(), "created collection schema");
        }

        let checkpoint = match Checkpoint::load(&storage)? {
            Some(checkpoint) => checkpoint,
            None => {
                let checkpoint = Checkpoint::empty();
                checkpoint.save(&storage)?;
                checkpoint
            }
        };

        let mut collection = Collection::new();
        if let Some(segment_id) = checkpoint.segment {
            let mut reader = SegmentReader::open(&storage, segment_id)?;
            while let Some(block) = reader.next_block()? {
                collection.apply_batch(block)?;
            }
        }
        if checkpoint.next_id > collection.next_id() {
            collection.set_next_id(checkpoint.next_id);
        }

        // Replay the checkpoint's generation and any newer ones left by an
        // interrupted rotation. Only the newest may carry a torn tail.
        let generations: Vec<u64> = storage
            .wal_generations()?
            .into_iter()
            .filter(|g| *g >= checkpoint.wal_generation)
            .collect();
        let mut active_generation = checkpoint.wal_generation;
        let mut sequence = checkpoint.wal_sequence;
        let mut replayed = 0u64;

        for (i, generation) in generations.iter().enumerate() {
            let newest = i + 1 == generations.len();
            let replay = WAL::replay(&storage, *generation, newest, |entry| {
                match entry.operation {
                    Operation::InsertBatch(records) => collection.apply_batch(records),
                    Operation::Clear => {
                        collection.clear();
                        Ok(())
                    }
                }
            })?;
            if let Some(last) = replay.last_sequence {
                sequence = last + 1;
            }
            replayed += replay.entries;
            active_generation = *generation;
        }

        let wal = WAL::open(&storage, active_generation, sequence, config.sync_mode)?;
        info!(
            path = %storage.base_dir.display(),
            records = collection.len(),
            replayed,
            wal_generation = active_generation,
            "store opened"
        );

        let store = Store {
            storage,
            collection: RwLock::new(collection),
            writer: Mutex::new(StoreWriter { wal, checkpoint }),
            _lock: lock,
        };
        {
            let writer = store.writer.lock();
            store.remove_superseded(&writer.checkpoint);
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.collection.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.read().is_empty()
    }

    /// Snapshot the collection into a segment and start a fresh WAL generation.
    pub fn compact(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.wal.sync()?;

        let (segment, next_id, count) = {
            let collection = self.collection.read();
            let segment = if collection.is_empty() {
                None
            } else {
                let mut segment_writer = SegmentWriter::new(&self.storage, SegmentId::new())?;
                segment_writer.write_records(collection.iter())?;
                Some(segment_writer.finish()?.id)
            };
            (segment, collection.next_id(), collection.len() as u64)
        };

        self.rotate(&mut writer, segment, next_id, count)?;
        info!(records = count, "store compacted");
        Ok(())
    }

    pub fn stats(&self) -> StoreStats {
        let writer = self.writer.lock();
        let collection = self.collection.read();
        StoreStats {
            record_count: collection.len(),
            next_id: collection.next_id(),
            wal_generation: writer.wal.generation,
            wal_size_bytes: writer.wal.size_bytes(),
            has_segment: writer.checkpoint.segment.is_some(),
            segment_records: if writer.checkpoint.segment.is_some() {
                writer.checkpoint.record_count
            } else {
                0
            },
        }
    }

    fn rotate(
        &self,
        writer: &mut StoreWriter,
        segment: Option<SegmentId>,
        next_id: RecordId,
        record_count: u64,
    ) -> Result<()> {
        let generation = writer.wal.generation + 1;
        let wal = WAL::open(&self.storage, generation, writer.wal.sequence, writer.wal.sync_mode)?;

        let checkpoint = Checkpoint {
            wal_generation: generation,
            wal_sequence: wal.sequence,
            segment,
            next_id,
            record_count,
            timestamp: Utc::now(),
        };
        if let Err(err) = checkpoint.save(&self.storage) {
            drop(wal);
            let _ = fs::remove_file(self.storage.wal_path(generation));
            return Err(err);
        }

        writer.wal = wal;
        writer.checkpoint = checkpoint;
        self.remove_superseded(&writer.checkpoint);
        debug!(wal_generation = generation, "rotated WAL");
        Ok(())
    }

    /// Delete WAL generations and segments the checkpoint no longer references.
    fn remove_superseded(&self, checkpoint: &Checkpoint) {
        let stale_wals = self.storage.wal_generations().unwrap_or_default();
        for generation in stale_wals.into_iter().filter(|g| *g < checkpoint.wal_generation) {
            if let Err(err) = fs::remove_file(self.storage.wal_path(generation)) {
                warn!(generation, error = %err, "could not remove old WAL");
            }
        }

        let segments = self.storage.segment_ids().unwrap_or_default();
        for id in segments.into_iter().filter(|id| Some(*id) != checkpoint.segment) {
            if let Err(err) = fs::remove_file(self.storage.segment_path(&id)) {
                warn!(segment = %id.0, error = %err, "could not remove old segment");
            }
        }
    }
}

impl RecordStore for Store {
    fn read(&self) -> RwLockReadGuard<'_, Collection> {
        self.collection.read()
    }

    fn insert_batch(&self, data: Vec<String>) -> Result<Option<(RecordId, RecordId)>> {
        if data.is_empty() {
            return Ok(None);
        }

        let mut writer = self.writer.lock();
        let records = self.collection.read().assign_ids(data);
        let span = (records[0].id, records[records.len() - 1].id);

        let operation = Operation::InsertBatch(records);
        writer.wal.append(&operation)?;

        if let Operation::InsertBatch(records) = operation {
            self.collection.write().apply_batch(records)?;
        }
        Ok(Some(span))
    }

    // The durable Clear frame is the commit point. Rotation afterwards only
    // reclaims disk space; the next clear or compaction rotates again.
    fn clear(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.wal.append_synced(&Operation::Clear)?;
        self.collection.write().clear();

        if let Err(err) = self.rotate(&mut writer, None, RecordId::FIRST, 0) {
            warn!(error = %err, "WAL rotation after clear failed");
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().wal.sync()
    }
}
