use std::fmt;
use serde::{Serialize, Deserialize};

/// Store-assigned primary key. Assignment starts at 1 and restarts after a clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    pub const FIRST: RecordId = RecordId(1);

    pub fn new(id: u64) -> Self {
        RecordId(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> RecordId {
        RecordId(self.0 + 1)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        RecordId(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub data: String,
}

impl Record {
    pub fn new(id: RecordId, data: impl Into<String>) -> Self {
        Record { id, data: data.into() }
    }
}
