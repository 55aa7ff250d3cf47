use uuid::Uuid;

use crate::event_sourcing::core::Aggregate;
use super::commands::CheckoutCommand;
use super::errors::{CheckoutError, CheckoutFailure};
use super::events::*;
use super::value_objects::{ActiveContent, CheckoutStep, OrderResult};

// ============================================================================
// Checkout Aggregate - Step State Machine
// ============================================================================
//
// Holds the current step and the session-scoped flags. Steps only move
// forward, one at a time, and only from the expected predecessor. A request
// made from any other step emits nothing.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutAggregate {
    pub session_id: Uuid,
    pub version: i64,

    pub step: CheckoutStep,
    pub is_signed_in: bool,

    pub active_content: ActiveContent,
    pub review_order_button_clicked: bool,
    pub is_updating: bool,
    pub guest_sign_in_username: String,
    pub success_dialog_open: bool,

    pub placing_order: bool,
    pub order: Option<OrderResult>,
    pub checkout_error: Option<CheckoutFailure>,
}

impl CheckoutAggregate {
    fn ensure_not_placing(&self) -> Result<(), CheckoutError> {
        if self.placing_order {
            return Err(CheckoutError::PlacementInProgress);
        }
        Ok(())
    }

    fn content_change(&self, to: ActiveContent) -> Vec<CheckoutEvent> {
        if self.active_content == to {
            return vec![];
        }
        vec![CheckoutEvent::ActiveContentChanged(ActiveContentChanged {
            from: self.active_content,
            to,
        })]
    }
}

impl Aggregate for CheckoutAggregate {
    type Event = CheckoutEvent;
    type Command = CheckoutCommand;
    type Error = CheckoutError;

    fn initial(aggregate_id: Uuid) -> Self {
        Self {
            session_id: aggregate_id,
            version: 0,
            step: CheckoutStep::ShippingAddress,
            is_signed_in: false,
            active_content: ActiveContent::Checkout,
            review_order_button_clicked: false,
            is_updating: false,
            guest_sign_in_username: String::new(),
            success_dialog_open: false,
            placing_order: false,
            order: None,
            checkout_error: None,
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        self.version += 1;

        match event {
            CheckoutEvent::StepAdvanced(e) => {
                self.step = e.to;
            }
            CheckoutEvent::ScrolledToTop(_) => {
                // UI side effect only
            }
            CheckoutEvent::ActiveContentChanged(e) => {
                self.active_content = e.to;
            }
            CheckoutEvent::AuthenticationChanged(e) => {
                self.is_signed_in = e.signed_in;
            }
            CheckoutEvent::ReviewOrderRequested(_) => {
                self.review_order_button_clicked = true;
            }
            CheckoutEvent::ReviewOrderReset(_) => {
                self.review_order_button_clicked = false;
            }
            CheckoutEvent::UpdatingChanged(e) => {
                self.is_updating = e.is_updating;
            }
            CheckoutEvent::GuestSignInUsernameChanged(e) => {
                self.guest_sign_in_username = e.username.clone();
            }
            CheckoutEvent::PlacementStarted(_) => {
                self.placing_order = true;
                self.checkout_error = None;
            }
            CheckoutEvent::OrderPlaced(e) => {
                self.placing_order = false;
                self.order = Some(e.order.clone());
            }
            CheckoutEvent::PlacementFailed(e) => {
                self.placing_order = false;
                self.checkout_error = Some(CheckoutFailure::new(e.reason.clone()));
            }
            CheckoutEvent::SuccessDialogShown(_) => {
                self.success_dialog_open = true;
            }
            CheckoutEvent::SuccessDialogDismissed(_) => {
                self.success_dialog_open = false;
            }
        }

        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CheckoutCommand::AdvanceStep { from } => {
                if self.step != *from {
                    return Ok(vec![]);
                }
                let Some(to) = from.next() else {
                    return Ok(vec![]);
                };

                let mut events = Vec::with_capacity(2);
                if to == CheckoutStep::Review {
                    events.push(CheckoutEvent::ScrolledToTop(ScrolledToTop));
                }
                events.push(CheckoutEvent::StepAdvanced(StepAdvanced { from: *from, to }));
                Ok(events)
            }

            CheckoutCommand::ToggleAddressBook => {
                Ok(self.content_change(self.active_content.flip_address_book()))
            }

            CheckoutCommand::ToggleSignIn => {
                Ok(self.content_change(self.active_content.flip_sign_in()))
            }

            CheckoutCommand::SetAuthenticated { signed_in } => {
                if self.is_signed_in == *signed_in {
                    return Ok(vec![]);
                }

                let mut events = vec![CheckoutEvent::AuthenticationChanged(AuthenticationChanged {
                    signed_in: *signed_in,
                })];
                // Signing in mid-flow sends the shopper back to the checkout pane
                if *signed_in {
                    events.extend(self.content_change(ActiveContent::Checkout));
                }
                Ok(events)
            }

            CheckoutCommand::ReviewOrder => {
                self.ensure_not_placing()?;
                if self.review_order_button_clicked {
                    return Ok(vec![]);
                }
                Ok(vec![CheckoutEvent::ReviewOrderRequested(ReviewOrderRequested)])
            }

            CheckoutCommand::ResetReviewOrder => {
                if !self.review_order_button_clicked {
                    return Ok(vec![]);
                }
                Ok(vec![CheckoutEvent::ReviewOrderReset(ReviewOrderReset)])
            }

            CheckoutCommand::SetUpdating { is_updating } => {
                if self.is_updating == *is_updating {
                    return Ok(vec![]);
                }
                Ok(vec![CheckoutEvent::UpdatingChanged(UpdatingChanged {
                    is_updating: *is_updating,
                })])
            }

            CheckoutCommand::SetGuestSignInUsername { username } => {
                if self.guest_sign_in_username == *username {
                    return Ok(vec![]);
                }
                Ok(vec![CheckoutEvent::GuestSignInUsernameChanged(GuestSignInUsernameChanged {
                    username: username.clone(),
                })])
            }

            CheckoutCommand::BeginPlacement => {
                self.ensure_not_placing()?;
                if self.order.is_some() {
                    return Err(CheckoutError::OrderAlreadyPlaced);
                }
                Ok(vec![CheckoutEvent::PlacementStarted(PlacementStarted)])
            }

            CheckoutCommand::CompletePlacement { order } => {
                if !self.placing_order {
                    return Err(CheckoutError::NoPlacementInProgress);
                }
                Ok(vec![CheckoutEvent::OrderPlaced(OrderPlaced {
                    order: order.clone(),
                })])
            }

            CheckoutCommand::FailPlacement { reason } => {
                if !self.placing_order {
                    return Err(CheckoutError::NoPlacementInProgress);
                }
                Ok(vec![CheckoutEvent::PlacementFailed(PlacementFailed {
                    reason: reason.clone(),
                })])
            }

            CheckoutCommand::ShowSuccessDialog => {
                if self.success_dialog_open {
                    return Ok(vec![]);
                }
                Ok(vec![CheckoutEvent::SuccessDialogShown(SuccessDialogShown)])
            }

            CheckoutCommand::DismissSuccessDialog => {
                if !self.success_dialog_open {
                    return Ok(vec![]);
                }
                Ok(vec![CheckoutEvent::SuccessDialogDismissed(SuccessDialogDismissed)])
            }
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.session_id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
