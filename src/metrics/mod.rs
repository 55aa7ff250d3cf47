// Private module declaration
mod exposition;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

pub use exposition::render_text;

// ============================================================================
// Metrics Module - Prometheus metrics for the checkout core
// ============================================================================
//
// Provides metrics for:
// - Checkout step transitions
// - Order placement outcomes and pipeline latency
// - Cart rotation after a placed order
// - Analytics dispatch failures (which are otherwise swallowed)
//
// Exposed through `render_text` for whatever transport the host uses.
// ============================================================================

pub struct CheckoutMetrics {
    registry: Registry,

    pub step_transitions: IntCounterVec,

    pub orders_placed: IntCounter,
    pub order_failures: IntCounterVec,
    pub pipeline_duration: Histogram,

    pub cart_rotations: IntCounterVec,

    pub analytics_dispatch_failures: IntCounter,
}

impl CheckoutMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let step_transitions = IntCounterVec::new(
            Opts::new("checkout_step_transitions_total", "Checkout step transitions"),
            &["to"],
        )?;
        registry.register(Box::new(step_transitions.clone()))?;

        let orders_placed = IntCounter::new(
            "checkout_orders_placed_total",
            "Orders placed successfully",
        )?;
        registry.register(Box::new(orders_placed.clone()))?;

        let order_failures = IntCounterVec::new(
            Opts::new("checkout_order_failures_total", "Order placement failures"),
            &["reason"],
        )?;
        registry.register(Box::new(order_failures.clone()))?;

        let pipeline_duration = Histogram::with_opts(
            HistogramOpts::new("checkout_pipeline_duration_seconds", "Order placement pipeline duration")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(pipeline_duration.clone()))?;

        let cart_rotations = IntCounterVec::new(
            Opts::new("checkout_cart_rotations_total", "Cart teardown and replacement after an order"),
            &["result"],
        )?;
        registry.register(Box::new(cart_rotations.clone()))?;

        let analytics_dispatch_failures = IntCounter::new(
            "checkout_analytics_dispatch_failures_total",
            "Analytics events the sink refused",
        )?;
        registry.register(Box::new(analytics_dispatch_failures.clone()))?;

        Ok(Self {
            registry,
            step_transitions,
            orders_placed,
            order_failures,
            pipeline_duration,
            cart_rotations,
            analytics_dispatch_failures,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_step_transition(&self, to: &str) {
        self.step_transitions.with_label_values(&[to]).inc();
    }

    /// Helper to record the end of one pipeline run
    pub fn record_placement(&self, duration_secs: f64, failure: Option<&str>) {
        match failure {
            None => self.orders_placed.inc(),
            Some(reason) => self.order_failures.with_label_values(&[reason]).inc(),
        }
        self.pipeline_duration.observe(duration_secs);
    }

    pub fn record_cart_rotation(&self, success: bool) {
        let result = if success { "rotated" } else { "failed" };
        self.cart_rotations.with_label_values(&[result]).inc();
    }

    pub fn record_dispatch_failure(&self) {
        self.analytics_dispatch_failures.inc();
    }
}
