use std::sync::Mutex;

use serde_json::Value;

// ============================================================================
// Event Sinks
// ============================================================================

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SinkError {
    #[error("Analytics sink rejected {event_type}: {reason}")]
    Rejected { event_type: String, reason: String },
}

/// External analytics sink
pub trait EventSink: Send + Sync {
    fn dispatch(&self, event_type: &str, payload: Value) -> Result<(), SinkError>;
}

/// Writes every event to the log
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn dispatch(&self, event_type: &str, payload: Value) -> Result<(), SinkError> {
        tracing::info!(event_type, payload = %payload, "Analytics event");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedEvent {
    pub event_type: String,
    pub payload: Value,
}

/// Keeps dispatched events in memory. Can be told to refuse them.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<DispatchedEvent>>,
    refuse: Mutex<bool>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        let sink = Self::default();
        *sink.refuse.lock().unwrap_or_else(|e| e.into_inner()) = true;
        sink
    }

    pub fn events(&self) -> Vec<DispatchedEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, event_type: &str) -> usize {
        self.events().iter().filter(|e| e.event_type == event_type).count()
    }
}

impl EventSink for RecordingEventSink {
    fn dispatch(&self, event_type: &str, payload: Value) -> Result<(), SinkError> {
        if *self.refuse.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(SinkError::Rejected {
                event_type: event_type.to_string(),
                reason: "sink offline".to_string(),
            });
        }
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DispatchedEvent {
                event_type: event_type.to_string(),
                payload,
            });
        Ok(())
    }
}
