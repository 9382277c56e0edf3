//! Observability sink for session decisions.
//!
//! The session reports state transitions, turn decisions and usage through
//! `EventBus`; the host decides where the records go.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

/// Sink for observability events.
pub trait EventBus: Send + Sync {
    /// Emit `payload` under `topic` (one of `event_names`).
    fn emit(&self, topic: &str, payload: serde_json::Value);
}

pub type EventBusRef = Arc<dyn EventBus>;

/// Serialize `payload` and emit it. Payloads that fail to serialize are
/// skipped.
pub fn emit_to<T: Serialize>(bus: &dyn EventBus, topic: &str, payload: &T) {
    if let Ok(value) = serde_json::to_value(payload) {
        bus.emit(topic, value);
    }
}

/// One record captured by `RecordingEventBus`.
#[derive(Debug, Clone)]
pub struct EmittedEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Keeps every emitted record in memory, in emission order.
#[derive(Default)]
pub struct RecordingEventBus {
    emitted: Mutex<Vec<EmittedEvent>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<EmittedEvent>> {
        self.emitted.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records emitted under `topic`.
    pub fn emitted_on(&self, topic: &str) -> Vec<EmittedEvent> {
        self.lock()
            .iter()
            .filter(|e| e.topic == topic)
            .cloned()
            .collect()
    }

    /// Topics of every record, in emission order.
    pub fn topics(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.topic.clone()).collect()
    }
}

impl EventBus for RecordingEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        self.lock().push(EmittedEvent {
            topic: topic.to_string(),
            payload,
        });
    }
}
