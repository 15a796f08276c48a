use std::path::PathBuf;
use std::fs;
use crate::core::error::Result;
use crate::storage::segment::SegmentId;

/// Directory structure for store files
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,      // Root directory
    pub segments_dir: PathBuf,  // Snapshot segments (.seg files)
    pub wal_dir: PathBuf,       // Write-ahead log location
    pub meta_dir: PathBuf,      // Manifest and checkpoint
}

impl StorageLayout {
    /// Creates any missing directories; existing ones are left untouched.
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        let segments_dir = base_dir.join("segments");
        let wal_dir = base_dir.join("wal");
        let meta_dir = base_dir.join("meta");

        fs::create_dir_all(&segments_dir)?;
        fs::create_dir_all(&wal_dir)?;
        fs::create_dir_all(&meta_dir)?;

        Ok(StorageLayout {
            base_dir,
            segments_dir,
            wal_dir,
            meta_dir,
        })
    }

    pub fn segment_path(&self, id: &SegmentId) -> PathBuf {
        self.segments_dir.join(format!("{}.seg", id.0))
    }

    pub fn wal_path(&self, generation: u64) -> PathBuf {
        self.wal_dir.join(format!("wal_{:08}.log", generation))
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.meta_dir.join("checkpoint.bin")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.meta_dir.join("schema.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join(".lock")
    }

    /// WAL generations present on disk, ascending.
    pub fn wal_generations(&self) -> Result<Vec<u64>> {
        let mut generations = Vec::new();

        for entry in fs::read_dir(&self.wal_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("log") {
                continue;
            }
            let generation = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.strip_prefix("wal_"))
                .and_then(|seq| seq.parse::<u64>().ok());
            if let Some(generation) = generation {
                generations.push(generation);
            }
        }

        generations.sort_unstable();
        Ok(generations)
    }

    /// Segment files present on disk.
    pub fn segment_ids(&self) -> Result<Vec<SegmentId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.segments_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("seg") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse().ok())
            {
                ids.push(SegmentId(id));
            }
        }
        Ok(ids)
    }
}
