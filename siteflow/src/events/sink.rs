//! Event sink trait and implementations.

use super::BuildEvent;
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn, Level};

/// Receives build events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Handles one event. Sinks never fail the build.
    async fn emit(&self, event: &BuildEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: &BuildEvent) {}
}

/// Logs events through `tracing`.
///
/// Failures are always logged at `warn`; other events use the configured level.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: &BuildEvent) {
        let event_type = event.event_type();
        let data = event.data();
        match event {
            BuildEvent::StageFailed { .. } | BuildEvent::BuildFailed { .. } => {
                warn!(event_type, event_data = %data, "Event: {event_type}");
            }
            _ if self.level == Level::DEBUG => {
                debug!(event_type, event_data = %data, "Event: {event_type}");
            }
            _ => {
                info!(event_type, event_data = %data, "Event: {event_type}");
            }
        }
    }
}

/// Keeps every event in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<BuildEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.read().clone()
    }

    /// Returns the dotted names of all collected events, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.read().iter().map(BuildEvent::event_type).collect()
    }

    /// Returns events whose name starts with `prefix`.
    #[must_use]
    pub fn events_of_type(&self, prefix: &str) -> Vec<BuildEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type().starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: &BuildEvent) {
        self.events.write().push(event.clone());
    }
}
