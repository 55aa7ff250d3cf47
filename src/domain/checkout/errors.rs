// ============================================================================
// Checkout Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckoutError {
    #[error("An order is already being placed for this checkout")]
    PlacementInProgress,

    #[error("An order has already been placed in this checkout session")]
    OrderAlreadyPlaced,

    #[error("No order placement is in progress")]
    NoPlacementInProgress,

    #[error("Checkout session is closed")]
    SessionClosed,

    #[error("Session history out of step: expected version {expected}, found {current}")]
    HistoryDiverged { expected: i64, current: i64 },
}

/// Failure shown to the shopper after a placement attempt goes wrong
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Error placing order")]
pub struct CheckoutFailure {
    /// Diagnostic detail, logged but not meant for display
    pub reason: String,
}

impl CheckoutFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
