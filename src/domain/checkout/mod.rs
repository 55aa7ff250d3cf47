// ============================================================================
// Checkout Domain - Business Logic for one checkout session
// ============================================================================
//
// - Value objects (CheckoutStep, CartItem, CartSnapshot, OrderResult)
// - Commands and Events for the step state machine
// - Errors (CheckoutError, CheckoutFailure)
// - Aggregate (CheckoutAggregate)
// - Derived view model and UI-state registry
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod view_model;
pub mod ui_state;

pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use view_model::*;
pub use ui_state::*;
