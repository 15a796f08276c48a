use std::fs;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::layout::StorageLayout;

pub const COLLECTION_NAME: &str = "store";
pub const DATA_INDEX_NAME: &str = "data_idx";

/// Secondary index definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub field: String,
    pub unique: bool,
}

/// The single fixed collection: auto-increment `id` plus one index on `data`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub collection: String,
    pub key_path: String,
    pub auto_increment: bool,
    pub indexes: Vec<IndexDefinition>,
    pub version: u32,
}

impl CollectionSchema {
    pub const VERSION: u32 = 1;

    pub fn records() -> Self {
        CollectionSchema {
            collection: COLLECTION_NAME.to_string(),
            key_path: "id".to_string(),
            auto_increment: true,
            indexes: vec![IndexDefinition {
                name: DATA_INDEX_NAME.to_string(),
                field: "data".to_string(),
                unique: false,
            }],
            version: Self::VERSION,
        }
    }

    /// Write the manifest on first access; afterwards only check that the
    /// directory holds the same collection. Returns true when it was created.
    pub fn ensure(&self, storage: &StorageLayout) -> Result<bool> {
        let path = storage.manifest_path();
        if path.exists() {
            let existing: CollectionSchema = serde_json::from_slice(&fs::read(&path)?)?;
            if existing != *self {
                return Err(Error::new(
                    ErrorKind::StoreUnavailable,
                    format!(
                        "{} describes collection '{}' v{}, expected '{}' v{}",
                        path.display(),
                        existing.collection,
                        existing.version,
                        self.collection,
                        self.version
                    ),
                ));
            }
            return Ok(false);
        }

        fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(true)
    }
}
