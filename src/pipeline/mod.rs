// ============================================================================
// Order Placement
// ============================================================================

mod errors;
mod place_order;
mod single_flight;

pub use errors::{CartRotationError, PipelineOutcome, PipelineStep, PlaceOrderError, StepError};
pub use place_order::OrderPlacementPipeline;
pub use single_flight::{FlightGuard, SingleFlight};
