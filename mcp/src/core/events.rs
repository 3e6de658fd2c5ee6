//! Server lifecycle events.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "server-started")]
    Started { name: String },
    #[serde(rename = "server-stopped")]
    Stopped { name: String },
    #[serde(rename = "server-error")]
    Error { name: String, error: String },
}

impl ServerEvent {
    pub fn server_name(&self) -> &str {
        match self {
            ServerEvent::Started { name }
            | ServerEvent::Stopped { name }
            | ServerEvent::Error { name, .. } => name,
        }
    }
}

/// Fire-and-forget fan-out of [`ServerEvent`]s.
///
/// Sending never waits on subscribers. A subscriber that falls more than the
/// channel capacity behind skips the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ServerEvent) {
        if self.tx.send(event).is_err() {
            trace!("No event subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
