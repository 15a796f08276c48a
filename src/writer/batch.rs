use crate::core::error::Result;
use crate::generation::data::DataGenerator;
use crate::storage::store::RecordStore;

/// Splits a run of `total` records into batches of at most `batch_size`.
/// Every batch is full except possibly the last.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub total: u64,
    pub batch_size: usize,
    pub planned: u64,
}

impl BatchPlan {
    pub fn new(total: u64, batch_size: usize) -> Self {
        BatchPlan {
            total,
            batch_size: batch_size.max(1),
            planned: 0,
        }
    }

    pub fn batch_count(&self) -> u64 {
        self.total.div_ceil(self.batch_size as u64)
    }
}

impl Iterator for BatchPlan {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let remaining = self.total - self.planned;
        if remaining == 0 {
            return None;
        }
        let len = remaining.min(self.batch_size as u64);
        self.planned += len;
        Some(len as usize)
    }
}

/// `100 * written / total`, unclamped.
pub fn progress_percent(written: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    100.0 * written as f64 / total as f64
}

/// Generate `len` payloads of `symbols` characters and insert them as one batch.
pub fn write_batch(
    store: &dyn RecordStore,
    generator: &dyn DataGenerator,
    len: usize,
    symbols: usize,
) -> Result<usize> {
    let mut buffer = Vec::with_capacity(len);
    for _ in 0..len {
        buffer.push(generator.generate(symbols));
    }
    store.insert_batch(buffer)?;
    Ok(len)
}
