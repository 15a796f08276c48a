use serde::{Serialize, Serializer};
use tokio::sync::broadcast;
use tracing::debug;

/// Outbound notifications of the control channel
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    StoreUnavailable { reason: String },
    NotReady,
    AlreadyInProgress,
    StartClear,
    ClearError { reason: String },
    StartFill,
    Progress { percent: f64 },
    Complete,
    FillError { reason: String },
}

impl GenerationEvent {
    /// Wire name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationEvent::StoreUnavailable { .. } => "error_connect_db",
            GenerationEvent::NotReady => "db_not_ready",
            GenerationEvent::AlreadyInProgress => "db_already_filling",
            GenerationEvent::StartClear => "start_clear_db",
            GenerationEvent::ClearError { .. } => "error_clear_db",
            GenerationEvent::StartFill => "db_start_fill",
            GenerationEvent::Progress { .. } => "fill_progress",
            GenerationEvent::Complete => "end_fill_data",
            GenerationEvent::FillError { .. } => "error_fill_db",
        }
    }

    pub fn message(&self) -> String {
        match self {
            GenerationEvent::StoreUnavailable { reason } => format!("Could not connect to the store: {}", reason),
            GenerationEvent::NotReady => "The store is not ready yet".to_string(),
            GenerationEvent::AlreadyInProgress => "The store is already being filled".to_string(),
            GenerationEvent::StartClear => "Clearing the store".to_string(),
            GenerationEvent::ClearError { reason } => format!("Failed to clear the store: {}", reason),
            GenerationEvent::StartFill => "Filling the store".to_string(),
            GenerationEvent::Progress { percent } => format!("Fill progress --> {}", percent),
            GenerationEvent::Complete => "The store was filled successfully".to_string(),
            GenerationEvent::FillError { reason } => format!("Failed to fill the store because --> {}", reason),
        }
    }

    /// Events after which no further events of the same run follow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationEvent::Complete
                | GenerationEvent::ClearError { .. }
                | GenerationEvent::FillError { .. }
        )
    }
}

#[derive(Serialize)]
struct WireEvent<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    message: String,
}

impl Serialize for GenerationEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (percent, reason) = match self {
            GenerationEvent::Progress { percent } => (Some(*percent), None),
            GenerationEvent::FillError { reason } => (None, Some(reason.as_str())),
            _ => (None, None),
        };
        WireEvent {
            kind: self.kind(),
            percent,
            reason,
            message: self.message(),
        }
        .serialize(serializer)
    }
}

/// Fan-out of generation events to every subscriber.
///
/// Emitting with no subscribers is not an error. A subscriber that falls more
/// than the configured capacity behind loses the oldest events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GenerationEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        EventBus { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: GenerationEvent) {
        debug!(kind = event.kind(), "generation event");
        let _ = self.sender.send(event);
    }
}
