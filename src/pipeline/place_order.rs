use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};

use crate::cart::{ActiveCart, CartHandle, CartStore};
use crate::config::CheckoutConfig;
use crate::domain::checkout::{CartId, CartItem, OrderResult};
use crate::eventing::EventDispatcher;
use crate::gateway::operations::{
    billing_address_variables, decode, is_falsy, place_order_variables, CreateEmptyCartData,
    PlaceOrderData, SetBillingAddressData,
};
use crate::gateway::{Operation, OperationRequest, RemoteGateway};
use crate::metrics::CheckoutMetrics;
use crate::navigation::{ConfirmationState, Navigator};
use super::errors::{CartRotationError, PipelineStep, PlaceOrderError, StepError};
use super::single_flight::SingleFlight;

// ============================================================================
// Order Placement Pipeline
// ============================================================================
//
// Billing address, then payment + place order, then success event,
// navigation and cart rotation. Steps run strictly in order and the first
// failure ends the run. Nothing after a failed step happens, so the cart is
// left as it was and the user can retry.
//
// Once the order exists the run is a success. Later steps log their own
// problems and never turn it into a failure.
//
// ============================================================================

pub struct OrderPlacementPipeline {
    gateway: Arc<dyn RemoteGateway>,
    cart_store: Arc<dyn CartStore>,
    dispatcher: EventDispatcher,
    navigator: Arc<dyn Navigator>,
    metrics: Option<Arc<CheckoutMetrics>>,
    config: CheckoutConfig,
    in_flight: SingleFlight<CartId>,
}

impl OrderPlacementPipeline {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        cart_store: Arc<dyn CartStore>,
        dispatcher: EventDispatcher,
        navigator: Arc<dyn Navigator>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            gateway,
            cart_store,
            dispatcher,
            navigator,
            metrics: None,
            config,
            in_flight: SingleFlight::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<CheckoutMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Place the order for the active cart. `items` is the cart content as
    /// the user saw it; it is handed to the confirmation page.
    pub async fn run(&self, cart: &ActiveCart, items: Vec<CartItem>) -> Result<OrderResult, PlaceOrderError> {
        let Some(cart_id) = cart.current_id().await else {
            tracing::warn!("Place order requested without an active cart");
            return Err(PlaceOrderError::NoActiveCart);
        };

        let Some(_flight) = self.in_flight.try_acquire(&cart_id) else {
            tracing::warn!(cart_id = %cart_id, "Order placement already in flight, rejecting");
            return Err(PlaceOrderError::AlreadyInFlight(cart_id));
        };

        let started = Instant::now();
        tracing::info!(cart_id = %cart_id, "Placing order");

        let result = self.place(cart, &cart_id, items).await;

        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(order) => {
                tracing::info!(
                    cart_id = %cart_id,
                    order_number = %order.number,
                    elapsed_ms = (elapsed * 1000.0) as u64,
                    "Order placed"
                );
            }
            Err(error) => {
                tracing::error!(cart_id = %cart_id, error = %error, "Order placement failed");
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_placement(elapsed, result.as_ref().err().map(PlaceOrderError::reason));
        }

        result
    }

    async fn place(
        &self,
        cart: &ActiveCart,
        cart_id: &CartId,
        items: Vec<CartItem>,
    ) -> Result<OrderResult, PlaceOrderError> {
        self.set_billing_address(cart_id).await?;
        let order = self.set_payment_method_and_place_order(cart_id).await?;

        self.dispatcher.order_success(&order);

        let state = ConfirmationState {
            order_number: order.number.clone(),
            items,
        };
        match serde_json::to_value(&state) {
            Ok(state) => self.navigator.navigate(&self.config.confirmation_path, state),
            Err(e) => tracing::error!(error = %e, "Failed to encode confirmation state"),
        }

        self.rotate_cart(cart).await;

        Ok(order)
    }

    async fn set_billing_address(&self, cart_id: &CartId) -> Result<(), PlaceOrderError> {
        let step = PipelineStep::BillingAddress;
        let data = self
            .mutate(
                step,
                Operation::SetBillingAddressOnCart,
                billing_address_variables(cart_id, true),
            )
            .await?;

        let payload = decode::<SetBillingAddressData>(Operation::SetBillingAddressOnCart, Some(data))
            .map_err(|e| PlaceOrderError::from_gateway(step, e))?
            .and_then(|d| d.payload);
        match payload {
            Some(payload) if !is_falsy(&payload) => {
                tracing::debug!(cart_id = %cart_id, "Billing address set");
                Ok(())
            }
            _ => Err(PlaceOrderError::at(step, StepError::empty_payload())),
        }
    }

    async fn set_payment_method_and_place_order(&self, cart_id: &CartId) -> Result<OrderResult, PlaceOrderError> {
        let step = PipelineStep::PlaceOrder;
        let data = self
            .mutate(
                step,
                Operation::SetPaymentMethodAndPlaceOrder,
                place_order_variables(cart_id, &self.config.payment_method_code),
            )
            .await?;

        decode::<PlaceOrderData>(Operation::SetPaymentMethodAndPlaceOrder, Some(data))
            .map_err(|e| PlaceOrderError::from_gateway(step, e))?
            .and_then(|d| d.payload)
            .map(|payload| payload.order)
            .ok_or_else(|| PlaceOrderError::at(step, StepError::empty_payload()))
    }

    /// Issue a mutation and hand back its data, or the step failure
    async fn mutate(&self, step: PipelineStep, operation: Operation, variables: Value) -> Result<Value, PlaceOrderError> {
        let response = self
            .gateway
            .mutate(OperationRequest::new(operation, variables))
            .await
            .map_err(|e| PlaceOrderError::from_gateway(step, e))?;

        if !response.errors.is_empty() {
            return Err(PlaceOrderError::at(step, StepError::rejected(&response.errors)));
        }
        match response.data {
            Some(data) if !is_falsy(&data) => Ok(data),
            _ => Err(PlaceOrderError::at(step, StepError::empty_payload())),
        }
    }

    /// Retire the ordered cart and install a fresh one. The write lock is
    /// held throughout, so readers see either the old cart or the new one
    /// (or none if replacement failed), never the retired one mid-teardown.
    async fn rotate_cart(&self, cart: &ActiveCart) {
        let mut slot = cart.lock().await;
        let Some(retired) = slot.take() else {
            tracing::warn!("Active cart vanished before rotation");
            return;
        };
        let retired_id = retired.id().clone();

        let rotated = self.replace_cart(retired).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_cart_rotation(rotated.is_ok());
        }

        match rotated {
            Ok(handle) => {
                tracing::info!(retired = %retired_id, cart_id = %handle.id(), "Cart rotated");
                *slot = Some(handle);
            }
            Err(error) => {
                tracing::error!(
                    retired = %retired_id,
                    error = %error,
                    "Cart rotation failed, no active cart until the next load"
                );
            }
        }
    }

    async fn replace_cart(&self, retired: CartHandle) -> Result<CartHandle, CartRotationError> {
        self.cart_store.remove_cart(retired.id()).await?;
        self.cart_store.clear_cache_data(&self.config.cart_cache_tag).await?;
        drop(retired);

        let response = self
            .gateway
            .mutate(OperationRequest::new(Operation::CreateEmptyCart, json!({})))
            .await?;
        if !response.errors.is_empty() {
            return Err(CartRotationError::NotCreated(
                response.errors.into_iter().map(|e| e.message).collect(),
            ));
        }

        let cart_id = decode::<CreateEmptyCartData>(Operation::CreateEmptyCart, response.data)?
            .and_then(|d| d.cart_id)
            .ok_or_else(|| CartRotationError::NotCreated(vec!["empty payload".to_string()]))?;

        self.cart_store.bind_cart(&cart_id).await?;
        Ok(CartHandle::new(cart_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::cart::{CartStoreOp, InMemoryCartStore};
    use crate::domain::checkout::CartSnapshot;
    use crate::eventing::{RecordingEventSink, ORDER_SUCCESS};
    use crate::gateway::{GatewayError, InMemoryGateway, Scripted};
    use crate::navigation::RecordingNavigator;

    struct Harness {
        gateway: Arc<InMemoryGateway>,
        store: Arc<InMemoryCartStore>,
        sink: Arc<RecordingEventSink>,
        navigator: Arc<RecordingNavigator>,
        metrics: Arc<CheckoutMetrics>,
        cart: ActiveCart,
        pipeline: OrderPlacementPipeline,
    }

    fn abc123() -> CartSnapshot {
        CartSnapshot {
            id: CartId::new("abc123"),
            items: items(),
            total_quantity: 2.0,
            available_payment_methods: vec![],
            is_virtual: false,
        }
    }

    fn items() -> Vec<CartItem> {
        vec![CartItem::new("X"), CartItem::new("Y")]
    }

    fn harness_with(gateway: InMemoryGateway, sink: RecordingEventSink) -> Harness {
        let gateway = Arc::new(gateway);
        let store = Arc::new(InMemoryCartStore::new(Some(CartId::new("abc123"))));
        let sink = Arc::new(sink);
        let navigator = Arc::new(RecordingNavigator::new());
        let metrics = Arc::new(CheckoutMetrics::new().unwrap());

        let pipeline = OrderPlacementPipeline::new(
            gateway.clone(),
            store.clone(),
            EventDispatcher::new(sink.clone()),
            navigator.clone(),
            CheckoutConfig::default(),
        )
        .with_metrics(metrics.clone());

        Harness {
            gateway,
            store,
            sink,
            navigator,
            metrics,
            cart: ActiveCart::new(Some(CartHandle::new(CartId::new("abc123")))),
            pipeline,
        }
    }

    fn harness() -> Harness {
        harness_with(InMemoryGateway::new().with_cart(abc123()), RecordingEventSink::new())
    }

    fn script_order_99(gateway: &InMemoryGateway) {
        gateway.script(
            Operation::SetPaymentMethodAndPlaceOrder,
            Scripted::Data(json!({
                "setPaymentMethodAndPlaceOrder": {
                    "order": { "order_id": "99", "order_number": "000000099" }
                }
            })),
        );
    }

    #[tokio::test]
    async fn test_abc123_scenario() {
        let h = harness();
        script_order_99(&h.gateway);

        let order = h.pipeline.run(&h.cart, items()).await.unwrap();

        assert_eq!(
            order,
            OrderResult {
                id: "99".to_string(),
                number: "000000099".to_string(),
            }
        );

        let visits = h.navigator.visits();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].path, "/order-confirmation");
        assert_eq!(
            visits[0].state,
            json!({ "orderNumber": "000000099", "items": [{ "sku": "X" }, { "sku": "Y" }] })
        );

        let new_id = h.cart.current_id().await.unwrap();
        assert_ne!(new_id, CartId::new("abc123"));
        assert_eq!(h.store.bound(), Some(new_id.clone()));
        assert_eq!(
            h.store.ops(),
            vec![
                CartStoreOp::Removed(CartId::new("abc123")),
                CartStoreOp::CacheCleared("cart".to_string()),
                CartStoreOp::Bound(new_id),
            ]
        );

        assert_eq!(h.sink.count(ORDER_SUCCESS), 1);
        assert_eq!(h.metrics.orders_placed.get(), 1);
    }

    #[tokio::test]
    async fn test_remote_calls_in_order_with_expected_variables() {
        let h = harness();
        h.pipeline.run(&h.cart, items()).await.unwrap();

        let calls = h.gateway.calls();
        let operations: Vec<_> = calls.iter().map(|c| c.operation).collect();
        assert_eq!(
            operations,
            vec![
                Operation::SetBillingAddressOnCart,
                Operation::SetPaymentMethodAndPlaceOrder,
                Operation::CreateEmptyCart,
            ]
        );
        assert_eq!(calls[0].variables, json!({ "cartId": "abc123", "sameAsShipping": true }));
        assert_eq!(calls[1].variables, json!({ "cartId": "abc123", "paymentCode": "cashondelivery" }));
    }

    #[tokio::test]
    async fn test_billing_rejection_stops_everything() {
        let h = harness();
        h.gateway.script(
            Operation::SetBillingAddressOnCart,
            Scripted::Errors(vec!["Billing address is invalid".to_string()]),
        );

        let error = h.pipeline.run(&h.cart, items()).await.unwrap_err();

        assert_eq!(
            error,
            PlaceOrderError::BillingAddress(StepError::Rejected {
                messages: vec!["Billing address is invalid".to_string()],
            })
        );
        assert_eq!(h.gateway.calls().len(), 1);
        assert!(h.navigator.visits().is_empty());
        assert!(h.store.ops().is_empty());
        assert_eq!(h.sink.events().len(), 0);
        assert_eq!(h.cart.current_id().await, Some(CartId::new("abc123")));
        assert_eq!(
            h.metrics
                .order_failures
                .with_label_values(&["billing_address"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_empty_place_order_payload_keeps_cart() {
        let h = harness();
        h.gateway.script(
            Operation::SetPaymentMethodAndPlaceOrder,
            Scripted::Data(json!({ "setPaymentMethodAndPlaceOrder": null })),
        );

        let error = h.pipeline.run(&h.cart, items()).await.unwrap_err();

        assert!(matches!(error, PlaceOrderError::PlaceOrder(StepError::Rejected { .. })));
        assert_eq!(h.gateway.calls_to(Operation::SetBillingAddressOnCart), 1);
        assert_eq!(h.gateway.calls_to(Operation::CreateEmptyCart), 0);
        assert!(h.navigator.visits().is_empty());
        assert!(h.store.ops().is_empty());
        assert_eq!(h.cart.current_id().await, Some(CartId::new("abc123")));
        assert!(h.gateway.has_cart(&CartId::new("abc123")));
    }

    #[tokio::test]
    async fn test_order_without_number_is_malformed() {
        let h = harness();
        h.gateway.script(
            Operation::SetPaymentMethodAndPlaceOrder,
            Scripted::Data(json!({
                "setPaymentMethodAndPlaceOrder": { "order": { "order_id": "99" } }
            })),
        );

        let error = h.pipeline.run(&h.cart, items()).await.unwrap_err();
        assert!(matches!(error, PlaceOrderError::PlaceOrder(StepError::Malformed { .. })));
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_retried() {
        let h = harness();
        h.gateway.script(
            Operation::SetBillingAddressOnCart,
            Scripted::Fail(GatewayError::Transport("connection reset".to_string())),
        );

        let error = h.pipeline.run(&h.cart, items()).await.unwrap_err();

        assert!(matches!(
            error,
            PlaceOrderError::Transient {
                step: PipelineStep::BillingAddress,
                ..
            }
        ));
        assert_eq!(h.gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_after_failure_succeeds() {
        let h = harness();
        h.gateway.script(
            Operation::SetPaymentMethodAndPlaceOrder,
            Scripted::Errors(vec!["Payment declined".to_string()]),
        );

        assert!(h.pipeline.run(&h.cart, items()).await.is_err());
        let order = h.pipeline.run(&h.cart, items()).await.unwrap();

        assert_eq!(order.number, "000000001");
        assert_eq!(h.gateway.calls_to(Operation::SetBillingAddressOnCart), 2);
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_single_flight() {
        let h = harness_with(
            InMemoryGateway::new()
                .with_cart(abc123())
                .with_latency(Operation::SetBillingAddressOnCart, Duration::from_millis(50)),
            RecordingEventSink::new(),
        );

        let (first, second) = tokio::join!(
            h.pipeline.run(&h.cart, items()),
            h.pipeline.run(&h.cart, items())
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(PlaceOrderError::AlreadyInFlight(id)) if id.as_str() == "abc123")));
        assert_eq!(h.gateway.calls_to(Operation::SetBillingAddressOnCart), 1);
        assert_eq!(h.gateway.calls_to(Operation::SetPaymentMethodAndPlaceOrder), 1);
    }

    #[tokio::test]
    async fn test_rotation_failure_leaves_no_active_cart() {
        let h = harness();
        h.gateway.script(
            Operation::CreateEmptyCart,
            Scripted::Fail(GatewayError::Timeout(500)),
        );

        let order = h.pipeline.run(&h.cart, items()).await.unwrap();

        assert_eq!(order.number, "000000001");
        assert_eq!(h.cart.current_id().await, None);
        assert_eq!(h.navigator.visits().len(), 1);
        assert_eq!(h.metrics.cart_rotations.with_label_values(&["failed"]).get(), 1);
        assert_eq!(h.metrics.orders_placed.get(), 1);
    }

    #[tokio::test]
    async fn test_refused_success_event_does_not_fail_run() {
        let h = harness_with(
            InMemoryGateway::new().with_cart(abc123()),
            RecordingEventSink::refusing(),
        );

        assert!(h.pipeline.run(&h.cart, items()).await.is_ok());
        assert_eq!(h.navigator.visits().len(), 1);
    }

    #[tokio::test]
    async fn test_no_active_cart() {
        let h = harness();
        let empty = ActiveCart::new(None);

        let error = h.pipeline.run(&empty, items()).await.unwrap_err();
        assert_eq!(error, PlaceOrderError::NoActiveCart);
        assert!(h.gateway.calls().is_empty());
    }
}
