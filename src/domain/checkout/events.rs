use serde::{Deserialize, Serialize};

use crate::event_sourcing::core::DomainEvent;
use super::value_objects::{ActiveContent, CheckoutStep, OrderResult};

// ============================================================================
// Checkout Events - Facts about the checkout session
// ============================================================================

/// Checkout Event - Union type for all checkout session events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CheckoutEvent {
    StepAdvanced(StepAdvanced),
    ScrolledToTop(ScrolledToTop),
    ActiveContentChanged(ActiveContentChanged),
    AuthenticationChanged(AuthenticationChanged),
    ReviewOrderRequested(ReviewOrderRequested),
    ReviewOrderReset(ReviewOrderReset),
    UpdatingChanged(UpdatingChanged),
    GuestSignInUsernameChanged(GuestSignInUsernameChanged),
    PlacementStarted(PlacementStarted),
    OrderPlaced(OrderPlaced),
    PlacementFailed(PlacementFailed),
    SuccessDialogShown(SuccessDialogShown),
    SuccessDialogDismissed(SuccessDialogDismissed),
}

impl CheckoutEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutEvent::StepAdvanced(_) => StepAdvanced::event_type(),
            CheckoutEvent::ScrolledToTop(_) => ScrolledToTop::event_type(),
            CheckoutEvent::ActiveContentChanged(_) => ActiveContentChanged::event_type(),
            CheckoutEvent::AuthenticationChanged(_) => AuthenticationChanged::event_type(),
            CheckoutEvent::ReviewOrderRequested(_) => ReviewOrderRequested::event_type(),
            CheckoutEvent::ReviewOrderReset(_) => ReviewOrderReset::event_type(),
            CheckoutEvent::UpdatingChanged(_) => UpdatingChanged::event_type(),
            CheckoutEvent::GuestSignInUsernameChanged(_) => GuestSignInUsernameChanged::event_type(),
            CheckoutEvent::PlacementStarted(_) => PlacementStarted::event_type(),
            CheckoutEvent::OrderPlaced(_) => OrderPlaced::event_type(),
            CheckoutEvent::PlacementFailed(_) => PlacementFailed::event_type(),
            CheckoutEvent::SuccessDialogShown(_) => SuccessDialogShown::event_type(),
            CheckoutEvent::SuccessDialogDismissed(_) => SuccessDialogDismissed::event_type(),
        }
    }
}

impl DomainEvent for CheckoutEvent {
    fn event_type() -> &'static str { "CheckoutEvent" }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Step Advanced - the session moved forward by exactly one step
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StepAdvanced {
    pub from: CheckoutStep,
    pub to: CheckoutStep,
}

impl DomainEvent for StepAdvanced {
    fn event_type() -> &'static str { "StepAdvanced" }
}

/// Scrolled To Top - page should return to the top (payment -> review)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScrolledToTop;

impl DomainEvent for ScrolledToTop {
    fn event_type() -> &'static str { "ScrolledToTop" }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ActiveContentChanged {
    pub from: ActiveContent,
    pub to: ActiveContent,
}

impl DomainEvent for ActiveContentChanged {
    fn event_type() -> &'static str { "ActiveContentChanged" }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AuthenticationChanged {
    pub signed_in: bool,
}

impl DomainEvent for AuthenticationChanged {
    fn event_type() -> &'static str { "AuthenticationChanged" }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReviewOrderRequested;

impl DomainEvent for ReviewOrderRequested {
    fn event_type() -> &'static str { "ReviewOrderRequested" }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReviewOrderReset;

impl DomainEvent for ReviewOrderReset {
    fn event_type() -> &'static str { "ReviewOrderReset" }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UpdatingChanged {
    pub is_updating: bool,
}

impl DomainEvent for UpdatingChanged {
    fn event_type() -> &'static str { "UpdatingChanged" }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GuestSignInUsernameChanged {
    pub username: String,
}

impl DomainEvent for GuestSignInUsernameChanged {
    fn event_type() -> &'static str { "GuestSignInUsernameChanged" }
}

/// Placement Started - an order placement attempt is in flight
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlacementStarted;

impl DomainEvent for PlacementStarted {
    fn event_type() -> &'static str { "PlacementStarted" }
}

/// Order Placed - terminal success of a placement attempt
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderPlaced {
    pub order: OrderResult,
}

impl DomainEvent for OrderPlaced {
    fn event_type() -> &'static str { "OrderPlaced" }
}

/// Placement Failed - terminal failure of a placement attempt
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlacementFailed {
    pub reason: String,
}

impl DomainEvent for PlacementFailed {
    fn event_type() -> &'static str { "PlacementFailed" }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SuccessDialogShown;

impl DomainEvent for SuccessDialogShown {
    fn event_type() -> &'static str { "SuccessDialogShown" }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SuccessDialogDismissed;

impl DomainEvent for SuccessDialogDismissed {
    fn event_type() -> &'static str { "SuccessDialogDismissed" }
}
