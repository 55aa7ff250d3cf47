// ============================================================================
// Remote Data Gateway
// ============================================================================
//
// The transport is external. This module defines what the checkout core
// asks of it (`RemoteGateway`), the typed operations it issues, and an
// in-memory implementation for the demo binary and tests.
//
// ============================================================================

mod in_memory;
pub mod operations;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::checkout::NetworkStatus;
use crate::utils::IsTransient;

pub use in_memory::{InMemoryGateway, RecordedCall, Scripted};
pub use operations::Operation;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Failed to decode {operation} response: {reason}")]
    Decode { operation: &'static str, reason: String },
}

impl IsTransient for GatewayError {
    fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transport(_) | GatewayError::Timeout(_))
    }
}

/// How the transport may cache a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    #[default]
    CacheFirst,
    NetworkOnly,
    /// Fetch fresh and keep nothing afterwards
    NoCache,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    pub operation: Operation,
    pub variables: Value,
    pub fetch_policy: FetchPolicy,
}

impl OperationRequest {
    pub fn new(operation: Operation, variables: Value) -> Self {
        Self {
            operation,
            variables,
            fetch_policy: operation.default_fetch_policy(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub data: Option<Value>,
    pub network_status: NetworkStatus,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MutationResponse {
    pub data: Option<Value>,
    pub errors: Vec<GraphQlError>,
}

/// Executes queries and mutations. `Err` means the call itself failed;
/// business-level rejections come back as `errors` or empty `data`.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn query(&self, request: OperationRequest) -> Result<QueryResponse, GatewayError>;

    async fn mutate(&self, request: OperationRequest) -> Result<MutationResponse, GatewayError>;
}
