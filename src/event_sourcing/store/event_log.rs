use uuid::Uuid;

use crate::event_sourcing::core::{DomainEvent, EventEnvelope};

// ============================================================================
// In-Memory Event Log
// ============================================================================
//
// Append-only, process-local record of one aggregate's events.
// Lives exactly as long as the owning session; nothing is persisted.
//
// Responsibilities:
// 1. Append envelopes with optimistic version checking
// 2. Hand out the history for replay and diagnostics
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EventLogError {
    #[error("Concurrency conflict: expected version {expected}, but current is {current}")]
    ConcurrencyConflict { expected: i64, current: i64 },
}

pub struct EventLog<E: DomainEvent> {
    aggregate_id: Uuid,
    envelopes: Vec<EventEnvelope<E>>,
}

impl<E: DomainEvent> EventLog<E> {
    pub fn new(aggregate_id: Uuid) -> Self {
        Self {
            aggregate_id,
            envelopes: Vec::new(),
        }
    }

    pub fn aggregate_id(&self) -> Uuid {
        self.aggregate_id
    }

    /// Current version, i.e. the sequence number of the last envelope
    pub fn version(&self) -> i64 {
        self.envelopes.last().map(|e| e.sequence_number).unwrap_or(0)
    }

    /// Wrap and append the events one command produced. Returns the
    /// appended envelopes.
    pub fn append(
        &mut self,
        expected_version: i64,
        events: Vec<(String, E)>,
        correlation_id: Uuid,
        command: &str,
    ) -> Result<&[EventEnvelope<E>], EventLogError> {
        let current = self.version();
        if current != expected_version {
            return Err(EventLogError::ConcurrencyConflict {
                expected: expected_version,
                current,
            });
        }

        let start = self.envelopes.len();
        let mut seq = expected_version;
        for (event_type, event) in events {
            seq += 1;
            self.envelopes.push(EventEnvelope::new(
                self.aggregate_id,
                seq,
                event_type,
                event,
                correlation_id,
            )
            .with_metadata("command", command));
        }

        Ok(&self.envelopes[start..])
    }

    pub fn envelopes(&self) -> &[EventEnvelope<E>] {
        &self.envelopes
    }

    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }
}
