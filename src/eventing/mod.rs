// ============================================================================
// Analytics / Eventing Bridge
// ============================================================================
//
// - sink       - the external analytics sink and in-process implementations
// - dispatcher - fire-and-forget dispatch with the storefront event names
// - observer   - turns session state changes into at-most-once events
//
// ============================================================================

mod dispatcher;
mod observer;
mod sink;

pub use dispatcher::{EventDispatcher, CHECKOUT_PAGE_VIEW, CHECKOUT_REVIEW_BUTTON_CLICKED, ORDER_SUCCESS};
pub use observer::{ObservedState, Transition, TransitionObserver};
pub use sink::{DispatchedEvent, EventSink, RecordingEventSink, SinkError, TracingEventSink};
