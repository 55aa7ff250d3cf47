// ============================================================================
// Event Sourcing Store - In-Memory Event Log
// ============================================================================

pub mod event_log;

pub use event_log::{EventLog, EventLogError};
