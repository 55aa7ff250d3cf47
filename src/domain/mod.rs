// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Domain-specific aggregates and projections. Each aggregate has its own
// subdirectory with value objects, events, commands, errors and the
// aggregate implementation.
//
// This layer knows nothing about the gateway, the cart store or analytics.
//
// ============================================================================

pub mod checkout;
