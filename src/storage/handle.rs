use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::error;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::store::{RecordStore, Store};

/// Shared, lazily opened store.
///
/// The first `open()` performs recovery on a blocking thread; concurrent
/// callers wait on the same initialization. A failed open leaves the handle
/// uninitialized so a later call can try again.
#[derive(Clone)]
pub struct StoreHandle {
    config: Arc<Config>,
    cell: Arc<OnceCell<Arc<dyn RecordStore>>>,
}

impl StoreHandle {
    pub fn new(config: Config) -> Self {
        StoreHandle {
            config: Arc::new(config),
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// Wrap an already opened store.
    pub fn from_store(config: Config, store: Arc<dyn RecordStore>) -> Self {
        StoreHandle {
            config: Arc::new(config),
            cell: Arc::new(OnceCell::new_with(Some(store))),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The store, if initialization has completed.
    pub fn get(&self) -> Option<Arc<dyn RecordStore>> {
        self.cell.get().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn open(&self) -> Result<Arc<dyn RecordStore>> {
        let store = self
            .cell
            .get_or_try_init(|| async {
                let config = self.config.clone();
                let store = tokio::task::spawn_blocking(move || Store::open(&config))
                    .await
                    .map_err(|e| Error::from(e).within(ErrorKind::StoreUnavailable))??;
                Ok::<_, Error>(Arc::new(store) as Arc<dyn RecordStore>)
            })
            .await
            .inspect_err(|err| error!(error = %err, "failed to open store"))?;
        Ok(store.clone())
    }
}
