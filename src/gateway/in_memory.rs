use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::checkout::{CartId, CartSnapshot, Customer, NetworkStatus};
use super::{
    FetchPolicy, GatewayError, GraphQlError, MutationResponse, Operation, OperationRequest, QueryResponse,
    RemoteGateway,
};

// ============================================================================
// In-Memory Gateway
// ============================================================================
//
// A small storefront backend held in memory: carts, a customer, placed
// orders. Scripted replies can be queued per operation to override it.
// Every request is recorded in arrival order.
//
// ============================================================================

/// A queued reply that replaces the built-in behaviour for one call
#[derive(Debug, Clone)]
pub enum Scripted {
    Data(Value),
    Errors(Vec<String>),
    Fail(GatewayError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: Operation,
    pub variables: Value,
    pub fetch_policy: FetchPolicy,
}

#[derive(Default)]
struct Backend {
    carts: HashMap<CartId, CartSnapshot>,
    customer: Option<Customer>,
    orders: HashMap<String, Value>,
    next_order: u64,
}

pub struct InMemoryGateway {
    backend: Mutex<Backend>,
    scripts: Mutex<HashMap<Operation, VecDeque<Scripted>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Mutex<HashMap<Operation, Duration>>,
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            backend: Mutex::new(Backend {
                next_order: 1,
                ..Default::default()
            }),
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            latency: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_cart(self, cart: CartSnapshot) -> Self {
        self.lock_backend().carts.insert(cart.id.clone(), cart);
        self
    }

    pub fn with_customer(self, customer: Customer) -> Self {
        self.lock_backend().customer = Some(customer);
        self
    }

    /// Delay every call of `operation` by `delay`
    pub fn with_latency(self, operation: Operation, delay: Duration) -> Self {
        self.latency
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(operation, delay);
        self
    }

    /// Queue a reply for the next call of `operation`
    pub fn script(&self, operation: Operation, reply: Scripted) {
        self.scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(operation)
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn calls_to(&self, operation: Operation) -> usize {
        self.calls().iter().filter(|c| c.operation == operation).count()
    }

    pub fn has_cart(&self, cart_id: &CartId) -> bool {
        self.lock_backend().carts.contains_key(cart_id)
    }

    fn lock_backend(&self) -> std::sync::MutexGuard<'_, Backend> {
        self.backend.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn begin(&self, request: &OperationRequest) -> Option<Scripted> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                operation: request.operation,
                variables: request.variables.clone(),
                fetch_policy: request.fetch_policy,
            });

        let delay = self
            .latency
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&request.operation)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(&request.operation)
            .and_then(VecDeque::pop_front)
    }

    fn cart_id_of(request: &OperationRequest) -> Option<CartId> {
        request
            .variables
            .get("cartId")
            .and_then(Value::as_str)
            .map(CartId::new)
    }

    fn respond(&self, request: &OperationRequest) -> MutationResponse {
        let mut backend = self.lock_backend();

        match request.operation {
            Operation::GetCheckoutDetails => {
                let cart = Self::cart_id_of(request).and_then(|id| backend.carts.get(&id).cloned());
                data(json!({ "cart": cart }))
            }
            Operation::GetCustomer => data(json!({ "customer": backend.customer })),
            Operation::GetOrderDetails => {
                let order = request
                    .variables
                    .get("orderId")
                    .and_then(Value::as_str)
                    .and_then(|id| backend.orders.get(id).cloned());
                data(json!({ "order": order }))
            }
            Operation::SetBillingAddressOnCart => match Self::cart_id_of(request) {
                Some(id) if backend.carts.contains_key(&id) => data(json!({
                    "setBillingAddressOnCart": { "cart": { "id": id } }
                })),
                _ => rejected("Could not find a cart with the given ID"),
            },
            Operation::SetPaymentMethodAndPlaceOrder => {
                let Some(cart) = Self::cart_id_of(request).and_then(|id| backend.carts.remove(&id)) else {
                    return rejected("Could not find a cart with the given ID");
                };
                let order_id = backend.next_order.to_string();
                let order_number = format!("{:09}", backend.next_order);
                backend.next_order += 1;
                backend.orders.insert(
                    order_id.clone(),
                    json!({ "order_number": order_number, "items": cart.items }),
                );
                data(json!({
                    "setPaymentMethodAndPlaceOrder": {
                        "order": { "order_id": order_id, "order_number": order_number }
                    }
                }))
            }
            Operation::CreateEmptyCart => {
                let id = CartId::new(Uuid::new_v4().simple().to_string());
                backend.carts.insert(
                    id.clone(),
                    CartSnapshot {
                        id: id.clone(),
                        items: vec![],
                        total_quantity: 0.0,
                        available_payment_methods: vec![],
                        is_virtual: false,
                    },
                );
                data(json!({ "createEmptyCart": id }))
            }
        }
    }
}

fn data(value: Value) -> MutationResponse {
    MutationResponse {
        data: Some(value),
        errors: vec![],
    }
}

fn rejected(message: &str) -> MutationResponse {
    MutationResponse {
        data: None,
        errors: vec![GraphQlError {
            message: message.to_string(),
        }],
    }
}

fn from_script(reply: Scripted) -> Result<MutationResponse, GatewayError> {
    match reply {
        Scripted::Data(value) => Ok(data(value)),
        Scripted::Errors(messages) => Ok(MutationResponse {
            data: None,
            errors: messages.into_iter().map(|message| GraphQlError { message }).collect(),
        }),
        Scripted::Fail(error) => Err(error),
    }
}

#[async_trait]
impl RemoteGateway for InMemoryGateway {
    async fn query(&self, request: OperationRequest) -> Result<QueryResponse, GatewayError> {
        let response = match self.begin(&request).await {
            Some(reply) => from_script(reply)?,
            None => self.respond(&request),
        };

        let network_status = if response.errors.is_empty() {
            NetworkStatus::Ready
        } else {
            NetworkStatus::Error
        };
        Ok(QueryResponse {
            data: response.data,
            network_status,
        })
    }

    async fn mutate(&self, request: OperationRequest) -> Result<MutationResponse, GatewayError> {
        match self.begin(&request).await {
            Some(reply) => from_script(reply),
            None => Ok(self.respond(&request)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checkout::CartItem;
    use crate::gateway::operations::place_order_variables;

    fn cart() -> CartSnapshot {
        CartSnapshot {
            id: CartId::new("abc123"),
            items: vec![CartItem::new("X")],
            total_quantity: 1.0,
            available_payment_methods: vec![],
            is_virtual: false,
        }
    }

    #[tokio::test]
    async fn test_place_order_consumes_cart() {
        let gateway = InMemoryGateway::new().with_cart(cart());
        let request = OperationRequest::new(
            Operation::SetPaymentMethodAndPlaceOrder,
            place_order_variables(&CartId::new("abc123"), "checkmo"),
        );

        let first = gateway.mutate(request.clone()).await.unwrap();
        assert!(first.errors.is_empty());
        assert!(!gateway.has_cart(&CartId::new("abc123")));

        let second = gateway.mutate(request).await.unwrap();
        assert_eq!(second.errors.len(), 1);
        assert_eq!(gateway.calls_to(Operation::SetPaymentMethodAndPlaceOrder), 2);
    }

    #[tokio::test]
    async fn test_scripted_reply_takes_precedence_once() {
        let gateway = InMemoryGateway::new();
        gateway.script(Operation::CreateEmptyCart, Scripted::Fail(GatewayError::Timeout(500)));

        let request = OperationRequest::new(Operation::CreateEmptyCart, json!({}));
        assert_eq!(
            gateway.mutate(request.clone()).await.unwrap_err(),
            GatewayError::Timeout(500)
        );
        assert!(gateway.mutate(request).await.unwrap().data.is_some());
    }
}
