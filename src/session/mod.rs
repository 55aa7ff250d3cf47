use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use crate::cart::{ActiveCart, CartHandle, CartStore};
use crate::config::CheckoutConfig;
use crate::domain::checkout::{
    CartId, CartSnapshot, CheckoutAggregate, CheckoutCommand, CheckoutError, CheckoutEvent, CheckoutFailure,
    CheckoutStep, CheckoutViewModel, DismissTimers, NetworkStatus, OrderResult, QueryState,
    ScrollTarget, UiEffect, UiEffects, UiFlags, ViewInputs, ViewModelPublisher,
};
use crate::event_sourcing::{serialize_event, Aggregate, EventEnvelope, EventLog, EventLogError};
use crate::eventing::{EventDispatcher, EventSink, ObservedState, Transition, TransitionObserver};
use crate::gateway::operations::{
    checkout_details_variables, decode, order_details_variables, CheckoutDetailsData,
    CustomerData, OrderDetailsData,
};
use crate::gateway::{GatewayError, Operation, OperationRequest, QueryResponse, RemoteGateway};
use crate::metrics::CheckoutMetrics;
use crate::navigation::Navigator;
use crate::pipeline::{OrderPlacementPipeline, PipelineOutcome, PlaceOrderError};
use crate::utils::{retry_on_transient, RetryConfig};

// ============================================================================
// Checkout Session
// ============================================================================
//
// One shopper's pass through the checkout page. Owns the step aggregate and
// its event log, the view inputs, the analytics observer and the
// placement pipeline, and exposes the operations the page calls.
//
// Session state sits behind a std mutex that is never held across an
// await. Every change goes through `apply`, which republishes the view
// model and lets the observer look at the new state.
//
// ============================================================================

const EFFECT_CAPACITY: usize = 16;

/// External collaborators a session talks to
#[derive(Clone)]
pub struct CheckoutDeps {
    pub gateway: Arc<dyn RemoteGateway>,
    pub cart_store: Arc<dyn CartStore>,
    pub sink: Arc<dyn EventSink>,
    pub navigator: Arc<dyn Navigator>,
    pub metrics: Option<Arc<CheckoutMetrics>>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    PlaceOrder(#[from] PlaceOrderError),
}

struct SessionCore {
    aggregate: CheckoutAggregate,
    log: EventLog<CheckoutEvent>,
    inputs: ViewInputs,
    cart_id: Option<CartId>,
    observer: TransitionObserver,
    outcome: PipelineOutcome,
    closed: bool,
}

/// State shared with background timers
struct Shared {
    core: Mutex<SessionCore>,
    publisher: ViewModelPublisher,
    effects: UiEffects,
    dispatcher: EventDispatcher,
    metrics: Option<Arc<CheckoutMetrics>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionCore> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run a command against the aggregate and record what it emitted.
    /// Events are logged before they are applied, so a rejected append
    /// leaves both untouched.
    fn execute(&self, command: CheckoutCommand, correlation_id: Uuid) -> Result<Vec<CheckoutEvent>, CheckoutError> {
        let (events, transitions) = {
            let mut core = self.lock();
            if core.closed {
                return Err(CheckoutError::SessionClosed);
            }

            let events = core.aggregate.handle_command(&command)?;
            if events.is_empty() {
                tracing::debug!(command = command.name(), "Command changed nothing");
                return Ok(events);
            }

            let expected_version = core.aggregate.version();
            let named = events.iter().map(|e| (e.name().to_string(), e.clone())).collect();
            if let Err(EventLogError::ConcurrencyConflict { expected, current }) =
                core.log.append(expected_version, named, correlation_id, command.name())
            {
                tracing::error!(command = command.name(), expected, current, "Event log out of step with aggregate");
                return Err(CheckoutError::HistoryDiverged { expected, current });
            }

            for event in &events {
                core.aggregate.apply_event(event)?;
            }
            let transitions = self.sync(&mut *core);
            (events, transitions)
        };

        for event in &events {
            self.react(event);
        }
        self.dispatch(transitions);

        Ok(events)
    }

    /// Change session state outside the aggregate. Ignored once closed.
    fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut SessionCore),
    {
        let transitions = {
            let mut core = self.lock();
            if core.closed {
                tracing::debug!("Session closed, dropping input update");
                return;
            }
            change(&mut *core);
            self.sync(&mut *core)
        };
        self.dispatch(transitions);
    }

    fn react(&self, event: &CheckoutEvent) {
        match event {
            CheckoutEvent::StepAdvanced(e) => {
                tracing::info!(from = %e.from, step = %e.to, "Checkout step advanced");
                if let Some(metrics) = &self.metrics {
                    metrics.record_step_transition(e.to.as_str());
                }
            }
            CheckoutEvent::ScrolledToTop(_) => self.effects.emit(UiEffect::ScrollToTop),
            other => tracing::debug!(event = other.name(), "Checkout event"),
        }
    }

    /// Republish the view model and collect the analytics it calls for
    fn sync(&self, core: &mut SessionCore) -> Vec<Transition> {
        core.inputs.is_signed_in = core.aggregate.is_signed_in;
        self.publisher.publish(&core.inputs);

        let view = self.publisher.current();
        let state = ObservedState {
            step: core.aggregate.step,
            review_order_button_clicked: core.aggregate.review_order_button_clicked,
            cart_id: core.cart_id.as_ref(),
            view: &view,
        };
        core.observer.observe(&state)
    }

    /// Must be called without the core lock held: sinks may read the session
    fn dispatch(&self, transitions: Vec<Transition>) {
        for transition in &transitions {
            transition.dispatch(&self.dispatcher);
        }
    }
}

/// Fails the placement if the future driving it is dropped before the
/// pipeline returns, so the session accepts a new attempt
struct AbandonedPlacement<'a> {
    shared: &'a Shared,
    correlation_id: Uuid,
    armed: bool,
}

impl<'a> AbandonedPlacement<'a> {
    fn arm(shared: &'a Shared, correlation_id: Uuid) -> Self {
        Self {
            shared,
            correlation_id,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonedPlacement<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        tracing::warn!(correlation_id = %self.correlation_id, "Order placement abandoned before completion");
        let reason = "cancelled".to_string();
        let failed = self.shared.execute(
            CheckoutCommand::FailPlacement { reason: reason.clone() },
            self.correlation_id,
        );
        if failed.is_ok() {
            self.shared
                .update(|core| core.outcome = PipelineOutcome::Failed(reason));
        }
    }
}

pub struct CheckoutSession {
    shared: Arc<Shared>,
    cart: ActiveCart,
    pipeline: OrderPlacementPipeline,
    gateway: Arc<dyn RemoteGateway>,
    timers: DismissTimers,
    config: CheckoutConfig,
    retry: RetryConfig,
}

impl CheckoutSession {
    pub fn new(deps: CheckoutDeps, config: CheckoutConfig, cart: Option<CartHandle>) -> Self {
        let session_id = Uuid::new_v4();
        let cart_id = cart.as_ref().map(|h| h.id().clone());

        let mut dispatcher = EventDispatcher::new(deps.sink.clone());
        if let Some(metrics) = &deps.metrics {
            dispatcher = dispatcher.with_metrics(metrics.clone());
        }

        let mut pipeline = OrderPlacementPipeline::new(
            deps.gateway.clone(),
            deps.cart_store.clone(),
            dispatcher.clone(),
            deps.navigator.clone(),
            config.clone(),
        );
        if let Some(metrics) = &deps.metrics {
            pipeline = pipeline.with_metrics(metrics.clone());
        }

        let inputs = ViewInputs::default();
        let shared = Arc::new(Shared {
            publisher: ViewModelPublisher::new(&inputs),
            core: Mutex::new(SessionCore {
                aggregate: CheckoutAggregate::initial(session_id),
                log: EventLog::new(session_id),
                inputs,
                cart_id: cart_id.clone(),
                observer: TransitionObserver::new(),
                outcome: PipelineOutcome::Idle,
                closed: false,
            }),
            effects: UiEffects::new(EFFECT_CAPACITY),
            dispatcher,
            metrics: deps.metrics,
        });

        tracing::info!(session_id = %session_id, cart_id = ?cart_id, "Checkout session opened");

        Self {
            shared,
            cart: ActiveCart::new(cart),
            pipeline,
            gateway: deps.gateway,
            timers: DismissTimers::new(),
            retry: config.retry_config(),
            config,
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn session_id(&self) -> Uuid {
        self.shared.lock().aggregate.session_id
    }

    /// Id of the active cart. Waits while the cart is being rotated.
    pub async fn cart_id(&self) -> Option<CartId> {
        self.cart.current_id().await
    }

    pub fn view_model(&self) -> Arc<CheckoutViewModel> {
        self.shared.publisher.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<CheckoutViewModel>> {
        self.shared.publisher.subscribe()
    }

    pub fn subscribe_effects(&self) -> broadcast::Receiver<UiEffect> {
        self.shared.effects.subscribe()
    }

    pub fn checkout_step(&self) -> CheckoutStep {
        self.shared.lock().aggregate.step
    }

    pub fn ui_flags(&self) -> UiFlags {
        UiFlags::from(&self.shared.lock().aggregate)
    }

    pub fn is_signed_in(&self) -> bool {
        self.shared.lock().aggregate.is_signed_in
    }

    pub fn outcome(&self) -> PipelineOutcome {
        self.shared.lock().outcome.clone()
    }

    pub fn order_result(&self) -> Option<OrderResult> {
        self.shared.lock().aggregate.order.clone()
    }

    pub fn order_number(&self) -> Option<String> {
        self.order_result().map(|o| o.number)
    }

    pub fn checkout_error(&self) -> Option<CheckoutFailure> {
        self.shared.lock().aggregate.checkout_error.clone()
    }

    pub fn has_error(&self) -> bool {
        self.checkout_error().is_some()
    }

    /// Everything that happened in this session, oldest first
    pub fn history(&self) -> Vec<EventEnvelope<CheckoutEvent>> {
        self.shared.lock().log.envelopes().to_vec()
    }

    /// History as JSON, for diagnostics
    pub fn export_history(&self) -> anyhow::Result<String> {
        serialize_event(&self.history())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    // ========================================================================
    // Step triggers and UI flags
    // ========================================================================

    fn execute(&self, command: CheckoutCommand) -> Result<(), CheckoutError> {
        self.shared.execute(command, Uuid::new_v4()).map(|_| ())
    }

    pub fn set_shipping_information_done(&self) -> Result<(), CheckoutError> {
        self.execute(CheckoutCommand::AdvanceStep {
            from: CheckoutStep::ShippingAddress,
        })
    }

    pub fn set_shipping_method_done(&self) -> Result<(), CheckoutError> {
        self.execute(CheckoutCommand::AdvanceStep {
            from: CheckoutStep::ShippingMethod,
        })
    }

    pub fn set_payment_information_done(&self) -> Result<(), CheckoutError> {
        self.execute(CheckoutCommand::AdvanceStep {
            from: CheckoutStep::Payment,
        })
    }

    pub fn scroll_shipping_information_into_view(&self) {
        self.shared
            .effects
            .emit(UiEffect::ScrollIntoView(ScrollTarget::ShippingInformation));
    }

    pub fn scroll_shipping_method_into_view(&self) {
        self.shared
            .effects
            .emit(UiEffect::ScrollIntoView(ScrollTarget::ShippingMethod));
    }

    pub fn toggle_address_book_content(&self) -> Result<(), CheckoutError> {
        self.execute(CheckoutCommand::ToggleAddressBook)
    }

    pub fn toggle_sign_in_content(&self) -> Result<(), CheckoutError> {
        self.execute(CheckoutCommand::ToggleSignIn)
    }

    /// Follow the storefront's authentication state. Signing out drops the
    /// customer profile from the view.
    pub fn set_authenticated(&self, signed_in: bool) -> Result<(), CheckoutError> {
        self.execute(CheckoutCommand::SetAuthenticated { signed_in })?;
        if !signed_in {
            self.shared
                .update(|core| core.inputs.customer = QueryState::skipped());
        }
        Ok(())
    }

    pub fn handle_review_order(&self) -> Result<(), CheckoutError> {
        self.execute(CheckoutCommand::ReviewOrder)
    }

    pub fn handle_review_order_key_press(&self, key: &str) -> Result<(), CheckoutError> {
        if key != "Enter" {
            return Ok(());
        }
        self.handle_review_order()
    }

    pub fn reset_review_order_button_clicked(&self) -> Result<(), CheckoutError> {
        self.execute(CheckoutCommand::ResetReviewOrder)
    }

    pub fn set_is_updating(&self, is_updating: bool) -> Result<(), CheckoutError> {
        self.execute(CheckoutCommand::SetUpdating { is_updating })
    }

    pub fn set_guest_sign_in_username(&self, username: impl Into<String>) -> Result<(), CheckoutError> {
        self.execute(CheckoutCommand::SetGuestSignInUsername {
            username: username.into(),
        })
    }

    pub fn dismiss_success_dialog(&self) -> Result<(), CheckoutError> {
        self.execute(CheckoutCommand::DismissSuccessDialog)
    }

    // ========================================================================
    // Data loading
    // ========================================================================

    /// Query with retries on transient gateway failures
    async fn query(&self, request: OperationRequest) -> Result<QueryResponse, GatewayError> {
        let gateway = self.gateway.clone();
        retry_on_transient(request.operation.name(), &self.retry, |_attempt| {
            let gateway = gateway.clone();
            let request = request.clone();
            async move { gateway.query(request).await }
        })
        .await
        .into_result()
    }

    /// Load the checkout snapshot of the active cart. Skipped when there is
    /// no cart.
    pub async fn refresh_checkout_details(&self) -> Result<(), GatewayError> {
        let cart_id = self.cart.current_id().await;
        let Some(id) = cart_id.clone() else {
            self.shared.update(|core| {
                core.cart_id = None;
                core.inputs.checkout = QueryState::skipped();
            });
            return Ok(());
        };

        self.shared.update(|core| {
            core.cart_id = cart_id;
            let status = if core.inputs.checkout.data.is_some() {
                NetworkStatus::Refetch
            } else {
                NetworkStatus::Loading
            };
            core.inputs.checkout = QueryState::in_flight(&core.inputs.checkout, status);
        });

        let request = OperationRequest::new(Operation::GetCheckoutDetails, checkout_details_variables(&id));
        let result = self.query(request).await.and_then(|response| {
            let failed = response.network_status == NetworkStatus::Error;
            decode::<CheckoutDetailsData>(Operation::GetCheckoutDetails, response.data)
                .map(|data| (failed, data.and_then(|d| d.cart)))
        });

        match result {
            Ok((false, cart)) => {
                tracing::debug!(cart_id = %id, loaded = cart.is_some(), "Checkout details loaded");
                self.apply_checkout_read(&id, |_| QueryState::ready(cart));
                Ok(())
            }
            Ok((true, _)) => {
                tracing::warn!(cart_id = %id, "Checkout details query reported errors");
                self.apply_checkout_read(&id, QueryState::failed);
                Ok(())
            }
            Err(error) => {
                tracing::error!(cart_id = %id, error = %error, "Failed to load checkout details");
                self.apply_checkout_read(&id, QueryState::failed);
                Err(error)
            }
        }
    }

    /// Store a checkout read for `cart_id`, unless the active cart changed
    /// while it was in flight
    fn apply_checkout_read<F>(&self, cart_id: &CartId, next: F)
    where
        F: FnOnce(&QueryState<CartSnapshot>) -> QueryState<CartSnapshot>,
    {
        self.shared.update(|core| {
            if core.cart_id.as_ref() != Some(cart_id) {
                tracing::debug!(cart_id = %cart_id, "Active cart changed during read, discarding checkout details");
                return;
            }
            core.inputs.checkout = next(&core.inputs.checkout);
        });
    }

    /// Load the signed-in customer's profile. Skipped for guests.
    pub async fn refresh_customer(&self) -> Result<(), GatewayError> {
        if !self.is_signed_in() {
            self.shared
                .update(|core| core.inputs.customer = QueryState::skipped());
            return Ok(());
        }

        self.shared.update(|core| {
            core.inputs.customer = QueryState::in_flight(&core.inputs.customer, NetworkStatus::Loading);
        });

        let request = OperationRequest::new(Operation::GetCustomer, serde_json::json!({}));
        let result = self.query(request).await.and_then(|response| {
            decode::<CustomerData>(Operation::GetCustomer, response.data).map(|d| d.and_then(|d| d.customer))
        });

        match result {
            Ok(customer) => {
                self.shared
                    .update(|core| core.inputs.customer = QueryState::ready(customer));
                Ok(())
            }
            Err(error) => {
                tracing::error!(error = %error, "Failed to load customer");
                self.shared
                    .update(|core| core.inputs.customer = QueryState::failed(&core.inputs.customer));
                Err(error)
            }
        }
    }

    /// Fetch details of a placed order. Never served from or kept in a cache.
    pub async fn fetch_order_details(&self, order_id: &str) -> Result<(), GatewayError> {
        self.shared.update(|core| {
            core.inputs.order_details = QueryState::in_flight(&core.inputs.order_details, NetworkStatus::Loading);
        });

        let request = OperationRequest::new(Operation::GetOrderDetails, order_details_variables(order_id));
        let result = self.query(request).await.and_then(|response| {
            decode::<OrderDetailsData>(Operation::GetOrderDetails, response.data).map(|d| d.and_then(|d| d.order))
        });

        match result {
            Ok(order) => {
                self.shared
                    .update(|core| core.inputs.order_details = QueryState::ready(order));
                Ok(())
            }
            Err(error) => {
                tracing::error!(order_id, error = %error, "Failed to load order details");
                self.shared.update(|core| {
                    core.inputs.order_details = QueryState::failed(&core.inputs.order_details)
                });
                Err(error)
            }
        }
    }

    // ========================================================================
    // Order placement
    // ========================================================================

    /// Place the order for the active cart
    pub async fn handle_place_order(&self) -> Result<OrderResult, SessionError> {
        let correlation_id = Uuid::new_v4();
        self.shared.execute(CheckoutCommand::BeginPlacement, correlation_id)?;
        self.shared.update(|core| core.outcome = PipelineOutcome::InProgress);

        let abandoned = AbandonedPlacement::arm(&self.shared, correlation_id);
        let items = self.view_model().cart_items.clone();
        let result = self.pipeline.run(&self.cart, items).await;
        abandoned.disarm();

        if self.is_closed() {
            tracing::info!(correlation_id = %correlation_id, "Session closed during placement, discarding result");
            return Err(CheckoutError::SessionClosed.into());
        }

        match result {
            Ok(order) => {
                self.shared.execute(
                    CheckoutCommand::CompletePlacement { order: order.clone() },
                    correlation_id,
                )?;
                let cart_id = self.cart.current_id().await;
                self.shared.update(|core| {
                    core.outcome = PipelineOutcome::Succeeded(order.clone());
                    core.cart_id = cart_id;
                    core.inputs.checkout = QueryState::skipped();
                });
                self.show_success_dialog(correlation_id)?;
                Ok(order)
            }
            Err(error) => {
                let reason = error.to_string();
                self.shared.execute(
                    CheckoutCommand::FailPlacement { reason: reason.clone() },
                    correlation_id,
                )?;
                self.shared
                    .update(|core| core.outcome = PipelineOutcome::Failed(reason));
                Err(error.into())
            }
        }
    }

    pub async fn handle_place_order_key_press(&self, key: &str) -> Result<Option<OrderResult>, SessionError> {
        if key != "Enter" {
            return Ok(None);
        }
        self.handle_place_order().await.map(Some)
    }

    fn show_success_dialog(&self, correlation_id: Uuid) -> Result<(), CheckoutError> {
        self.shared
            .execute(CheckoutCommand::ShowSuccessDialog, correlation_id)?;

        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        self.timers.schedule(self.config.success_dialog_timeout(), move || {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            if let Err(error) = shared.execute(CheckoutCommand::DismissSuccessDialog, correlation_id) {
                tracing::debug!(error = %error, "Success dialog not dismissed");
            }
        });
        Ok(())
    }

    /// Tear down the session. Pending timers are aborted and anything that
    /// completes afterwards leaves the session untouched.
    pub fn close(&self) {
        let mut core = self.shared.lock();
        if core.closed {
            return;
        }
        core.closed = true;
        drop(core);

        self.timers.cancel_all();
        tracing::info!("Checkout session closed");
    }
}

impl Drop for CheckoutSession {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
