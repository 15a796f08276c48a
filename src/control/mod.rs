use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::generation::data::{AlphanumericGenerator, DataGenerator};
use crate::generation::engine::{GenerationEngine, GenerationReport};
use crate::generation::events::{EventBus, GenerationEvent};
use crate::search::engine::QueryEngine;
use crate::search::request::SearchParams;
use crate::search::results::SearchPage;
use crate::storage::handle::StoreHandle;

/// Inbound control message, e.g. `{"action": "generateRecords"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    GenerateRecords,
}

/// Entry point tying the store, both engines and the event bus together.
pub struct Controller {
    store: StoreHandle,
    generation: Arc<GenerationEngine>,
    query: QueryEngine,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_generator(config, Arc::new(AlphanumericGenerator::new()))
    }

    pub fn with_generator(config: Config, generator: Arc<dyn DataGenerator>) -> Result<Self> {
        Self::from_handle(StoreHandle::new(config), generator)
    }

    /// Fails with `InvalidArgument` if the handle's config does not validate.
    pub fn from_handle(store: StoreHandle, generator: Arc<dyn DataGenerator>) -> Result<Self> {
        store.config().validate()?;
        let events = EventBus::new(store.config().event_capacity);
        Ok(Controller {
            generation: Arc::new(GenerationEngine::new(store.clone(), generator, events)),
            query: QueryEngine::new(store.clone()),
            store,
        })
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn generation(&self) -> &Arc<GenerationEngine> {
        &self.generation
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.generation.events().subscribe()
    }

    /// Make sure the store is open, then start the command in the background.
    ///
    /// Opening failures are reported as `error_connect_db` and returned; the
    /// outcome of the run itself arrives through the events and the handle.
    pub async fn handle_command(&self, command: Command) -> Result<JoinHandle<Result<GenerationReport>>> {
        match command {
            Command::GenerateRecords => {
                if let Err(err) = self.store.open().await {
                    self.generation.events().emit(GenerationEvent::StoreUnavailable { reason: err.to_string() });
                    return Err(err);
                }
                info!("generation requested");
                Ok(self.generation.spawn())
            }
        }
    }

    /// Parse a JSON control message and dispatch it.
    pub async fn handle_message(&self, message: &str) -> Result<JoinHandle<Result<GenerationReport>>> {
        let command: Command = serde_json::from_str(message)?;
        self.handle_command(command).await
    }

    /// Resolve raw query parameters and run the search.
    pub async fn handle_search(&self, params: &SearchParams) -> Result<SearchPage> {
        let request = params.resolve(self.store.config())?;
        self.query.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn command_wire_form() {
        let command: Command = serde_json::from_str(r#"{"action":"generateRecords"}"#).unwrap();
        assert_eq!(command, Command::GenerateRecords);
        assert!(serde_json::from_str::<Command>(r#"{"action":"dropTables"}"#).is_err());
    }

    #[tokio::test]
    async fn unreachable_store_reports_connect_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let controller = Controller::new(Config::default().with_storage_path(&blocker)).unwrap();
        let mut events = controller.subscribe();

        let err = controller.handle_command(Command::GenerateRecords).await.err().unwrap();
        assert!(err.is(ErrorKind::StoreUnavailable));
        assert_eq!(events.recv().await.unwrap().kind(), "error_connect_db");
    }

    #[tokio::test]
    async fn message_starts_a_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default().with_storage_path(dir.path());
        config.quantity_records = 25;
        config.quantity_symbols = 8;
        config.batch_size = 10;

        let controller = Controller::with_generator(config, Arc::new(AlphanumericGenerator::seeded(7))).unwrap();
        let handle = controller.handle_message(r#"{"action":"generateRecords"}"#).await.unwrap();
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.records_written, 25);
        assert_eq!(report.batches, 3);

        let page = controller
            .handle_search(&SearchParams::from_pairs([("limit", "100")]))
            .await
            .unwrap();
        assert_eq!(page.len(), 25);
        assert!(!page.has_more);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut config = Config::default();
        config.event_capacity = 0;
        let err = Controller::new(config).err().unwrap();
        assert!(err.is(ErrorKind::InvalidArgument));

        let mut config = Config::default();
        config.batch_size = 0;
        assert!(Controller::new(config).is_err());
    }
}
