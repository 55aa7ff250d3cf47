use crate::cart::CartStoreError;
use crate::domain::checkout::{CartId, OrderResult};
use crate::gateway::{GatewayError, GraphQlError};

/// Why a single pipeline step did not produce its result
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum StepError {
    /// The backend answered but refused: GraphQL errors or an empty payload
    #[error("Rejected by backend: {}", .messages.join("; "))]
    Rejected { messages: Vec<String> },

    /// The backend answered with a payload missing the fields we need
    #[error("Malformed response: {reason}")]
    Malformed { reason: String },
}

impl StepError {
    pub fn rejected(errors: &[GraphQlError]) -> Self {
        StepError::Rejected {
            messages: errors.iter().map(|e| e.message.clone()).collect(),
        }
    }

    pub fn empty_payload() -> Self {
        StepError::Rejected {
            messages: vec!["empty payload".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    BillingAddress,
    PlaceOrder,
}

impl PipelineStep {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStep::BillingAddress => "billing_address",
            PipelineStep::PlaceOrder => "place_order",
        }
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum PlaceOrderError {
    #[error("Failed to set billing address: {0}")]
    BillingAddress(StepError),

    #[error("Failed to place order: {0}")]
    PlaceOrder(StepError),

    #[error("Gateway failure during {step}: {source}")]
    Transient {
        step: PipelineStep,
        #[source]
        source: GatewayError,
    },

    #[error("Order placement already in flight for cart {0}")]
    AlreadyInFlight(CartId),

    #[error("No active cart")]
    NoActiveCart,
}

impl PlaceOrderError {
    /// Short label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            PlaceOrderError::BillingAddress(_) => "billing_address",
            PlaceOrderError::PlaceOrder(_) => "place_order",
            PlaceOrderError::Transient { .. } => "transient",
            PlaceOrderError::AlreadyInFlight(_) => "already_in_flight",
            PlaceOrderError::NoActiveCart => "no_active_cart",
        }
    }

    pub(crate) fn at(step: PipelineStep, error: StepError) -> Self {
        match step {
            PipelineStep::BillingAddress => PlaceOrderError::BillingAddress(error),
            PipelineStep::PlaceOrder => PlaceOrderError::PlaceOrder(error),
        }
    }

    pub(crate) fn from_gateway(step: PipelineStep, error: GatewayError) -> Self {
        match error {
            GatewayError::Decode { reason, .. } => {
                PlaceOrderError::at(step, StepError::Malformed { reason })
            }
            source => PlaceOrderError::Transient { step, source },
        }
    }
}

/// Why the post-order cart replacement did not complete
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum CartRotationError {
    #[error(transparent)]
    Store(#[from] CartStoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Backend did not create a cart: {}", .0.join("; "))]
    NotCreated(Vec<String>),
}

/// Where the most recent placement attempt of a session stands
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PipelineOutcome {
    #[default]
    Idle,
    InProgress,
    Succeeded(OrderResult),
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_failure_maps_to_malformed() {
        let error = PlaceOrderError::from_gateway(
            PipelineStep::PlaceOrder,
            GatewayError::Decode {
                operation: "SetPaymentMethodAndPlaceOrder",
                reason: "missing field `order_number`".to_string(),
            },
        );

        assert!(matches!(error, PlaceOrderError::PlaceOrder(StepError::Malformed { .. })));
        assert_eq!(error.reason(), "place_order");
    }

    #[test]
    fn test_transport_failure_stays_transient() {
        let error = PlaceOrderError::from_gateway(
            PipelineStep::BillingAddress,
            GatewayError::Timeout(500),
        );

        assert_eq!(
            error,
            PlaceOrderError::Transient {
                step: PipelineStep::BillingAddress,
                source: GatewayError::Timeout(500),
            }
        );
        assert!(error.to_string().contains("billing_address"));
    }

    #[test]
    fn test_rejected_message_joins_errors() {
        let error = StepError::rejected(&[
            GraphQlError { message: "a".to_string() },
            GraphQlError { message: "b".to_string() },
        ]);
        assert_eq!(error.to_string(), "Rejected by backend: a; b");
    }
}
