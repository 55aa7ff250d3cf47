use uuid::Uuid;
use super::event::EventEnvelope;

// ============================================================================
// Aggregate Root Pattern
// ============================================================================
//
// Key Principles:
// 1. State is derived from events (not written directly)
// 2. Commands are validated before emitting events
// 3. A command that changes nothing emits no events
// 4. Aggregates enforce business invariants
//
// ============================================================================

/// Generic Aggregate trait - all event-driven aggregates implement this
///
/// Type Parameters:
/// - `Event`: The domain event type for this aggregate
/// - `Command`: The command type for this aggregate
/// - `Error`: The error type for business rule violations
pub trait Aggregate: Sized + Send + Sync {
    type Event;
    type Command;
    type Error;

    /// Fresh aggregate before any event has been applied
    fn initial(aggregate_id: Uuid) -> Self;

    /// Apply an event to update state
    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error>;

    /// Handle command and emit events (business logic)
    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    fn aggregate_id(&self) -> Uuid;

    /// Number of events applied so far
    fn version(&self) -> i64;

    /// Handle a command and apply whatever it emits
    fn execute(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let events = self.handle_command(command)?;
        for event in &events {
            self.apply_event(event)?;
        }
        Ok(events)
    }

    /// Rebuild an aggregate from its event history
    fn load_from_events(aggregate_id: Uuid, events: &[EventEnvelope<Self::Event>]) -> Result<Self, Self::Error> {
        let mut aggregate = Self::initial(aggregate_id);
        for envelope in events {
            aggregate.apply_event(&envelope.event_data)?;
        }
        Ok(aggregate)
    }
}
