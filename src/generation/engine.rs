use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, warn};
use crate::core::error::{Error, ErrorKind, Result};
use crate::generation::data::DataGenerator;
use crate::generation::events::{EventBus, GenerationEvent};
use crate::storage::handle::StoreHandle;
use crate::storage::store::RecordStore;
use crate::writer::batch::{progress_percent, write_batch, BatchPlan};

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub records_written: u64,
    pub batches: u64,
    pub elapsed: Duration,
}

/// Clears the store and refills it in batches, one run at a time.
pub struct GenerationEngine {
    store: StoreHandle,
    generator: Arc<dyn DataGenerator>,
    events: EventBus,
    filling: AtomicBool,
    quantity_records: u64,
    quantity_symbols: usize,
    batch_size: usize,
}

enum RunFailure {
    Clear(Error),
    Fill { err: Error, written: u64 },
}

/// Held for the duration of a run; releasing it is tied to drop so every exit
/// path, including a panic or a dropped future, frees the latch.
struct FillLatch<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FillLatch<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FillLatch { flag })
    }
}

impl Drop for FillLatch<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl GenerationEngine {
    pub fn new(store: StoreHandle, generator: Arc<dyn DataGenerator>, events: EventBus) -> Self {
        let config = store.config();
        GenerationEngine {
            quantity_records: config.quantity_records,
            quantity_symbols: config.quantity_symbols,
            batch_size: config.batch_size,
            store,
            generator,
            events,
            filling: AtomicBool::new(false),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Whether a run currently holds the latch.
    pub fn is_filling(&self) -> bool {
        self.filling.load(Ordering::Acquire)
    }

    /// Run one clear-and-fill cycle, reporting every step on the event bus.
    ///
    /// Rejected immediately with `NotReady` if the store has not been opened,
    /// or `AlreadyInProgress` if another run holds the latch; neither touches
    /// the running generation. The latch is released before the terminal
    /// event goes out, so a caller may retry as soon as it sees one.
    pub async fn generate(&self) -> Result<GenerationReport> {
        let Some(store) = self.store.get() else {
            self.events.emit(GenerationEvent::NotReady);
            return Err(Error::new(ErrorKind::NotReady, "store is not initialized"));
        };

        let Some(latch) = FillLatch::acquire(&self.filling) else {
            warn!("generation requested while a run is in progress");
            self.events.emit(GenerationEvent::AlreadyInProgress);
            return Err(Error::new(ErrorKind::AlreadyInProgress, "store is already being filled"));
        };

        let outcome = self.run(store).await;
        drop(latch);

        match outcome {
            Ok(report) => {
                info!(
                    records = report.records_written,
                    batches = report.batches,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "generation complete"
                );
                self.events.emit(GenerationEvent::Complete);
                Ok(report)
            }
            Err(RunFailure::Clear(err)) => {
                error!(error = %err, "clearing the store failed");
                self.events.emit(GenerationEvent::ClearError { reason: err.to_string() });
                Err(err.within(ErrorKind::Clear))
            }
            Err(RunFailure::Fill { err, written }) => {
                error!(error = %err, written, "filling the store failed");
                self.events.emit(GenerationEvent::FillError { reason: err.to_string() });
                Err(err.within(ErrorKind::Fill))
            }
        }
    }

    /// Everything between acquiring the latch and the terminal event.
    async fn run(&self, store: Arc<dyn RecordStore>) -> std::result::Result<GenerationReport, RunFailure> {
        let started = Instant::now();
        let plan = BatchPlan::new(self.quantity_records, self.batch_size);
        info!(
            records = self.quantity_records,
            batch_size = self.batch_size,
            batches = plan.batch_count(),
            symbols = self.quantity_symbols,
            "generation started"
        );

        self.events.emit(GenerationEvent::StartClear);
        let cleared = {
            let store = store.clone();
            task::spawn_blocking(move || store.clear()).await
        };
        cleared.map_err(Error::from).and_then(|r| r).map_err(RunFailure::Clear)?;

        self.events.emit(GenerationEvent::StartFill);
        self.events.emit(GenerationEvent::Progress { percent: 0.0 });

        let mut written = 0u64;
        let mut batches = 0u64;
        for len in plan {
            let store = store.clone();
            let generator = self.generator.clone();
            let symbols = self.quantity_symbols;

            let inserted = task::spawn_blocking(move || {
                write_batch(store.as_ref(), generator.as_ref(), len, symbols)
            })
            .await
            .map_err(Error::from)
            .and_then(|r| r)
            .map_err(|err| RunFailure::Fill { err, written })?;

            written += inserted as u64;
            batches += 1;
            let percent = progress_percent(written, self.quantity_records);
            debug!(batch = batches, written, percent, "batch committed");
            self.events.emit(GenerationEvent::Progress { percent });
        }

        task::spawn_blocking(move || store.flush())
            .await
            .map_err(Error::from)
            .and_then(|r| r)
            .map_err(|err| RunFailure::Fill { err, written })?;

        Ok(GenerationReport {
            records_written: written,
            batches,
            elapsed: started.elapsed(),
        })
    }

    /// Start a run on the runtime without waiting for it.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<Result<GenerationReport>> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.generate().await })
    }
}
