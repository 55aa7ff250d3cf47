use std::sync::Arc;

use serde_json::{json, Value};

use crate::domain::checkout::{CartId, CartItem, OrderResult};
use crate::metrics::CheckoutMetrics;
use super::sink::EventSink;

pub const CHECKOUT_PAGE_VIEW: &str = "CHECKOUT_PAGE_VIEW";
pub const CHECKOUT_REVIEW_BUTTON_CLICKED: &str = "CHECKOUT_REVIEW_BUTTON_CLICKED";
pub const ORDER_SUCCESS: &str = "USER/SET_USER_ON_ORDER_SUCCESS";

/// Fire-and-forget front for the analytics sink. Refusals are logged and
/// counted, never returned.
#[derive(Clone)]
pub struct EventDispatcher {
    sink: Arc<dyn EventSink>,
    metrics: Option<Arc<CheckoutMetrics>>,
}

impl EventDispatcher {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<CheckoutMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn dispatch(&self, event_type: &str, payload: Value) {
        if let Err(error) = self.sink.dispatch(event_type, payload) {
            tracing::warn!(event_type, error = %error, "Analytics dispatch failed, ignoring");
            if let Some(metrics) = &self.metrics {
                metrics.record_dispatch_failure();
            }
        }
    }

    pub fn page_view(&self, cart_id: Option<&CartId>, products: &[CartItem]) {
        self.dispatch(
            CHECKOUT_PAGE_VIEW,
            json!({ "cart_id": cart_id, "products": products }),
        );
    }

    pub fn review_button_clicked(&self, cart_id: Option<&CartId>) {
        self.dispatch(CHECKOUT_REVIEW_BUTTON_CLICKED, json!({ "cart_id": cart_id }));
    }

    pub fn order_success(&self, order: &OrderResult) {
        self.dispatch(ORDER_SUCCESS, json!({ "order": order }));
    }
}
