use super::value_objects::{CheckoutStep, OrderResult};

// ============================================================================
// Checkout Commands - Represent shopper intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum CheckoutCommand {
    /// Move to the step after `from`, only if the session is currently at `from`
    AdvanceStep {
        from: CheckoutStep,
    },
    ToggleAddressBook,
    ToggleSignIn,
    SetAuthenticated {
        signed_in: bool,
    },
    ReviewOrder,
    ResetReviewOrder,
    SetUpdating {
        is_updating: bool,
    },
    SetGuestSignInUsername {
        username: String,
    },
    BeginPlacement,
    CompletePlacement {
        order: OrderResult,
    },
    FailPlacement {
        reason: String,
    },
    ShowSuccessDialog,
    DismissSuccessDialog,
}

impl CheckoutCommand {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutCommand::AdvanceStep { .. } => "AdvanceStep",
            CheckoutCommand::ToggleAddressBook => "ToggleAddressBook",
            CheckoutCommand::ToggleSignIn => "ToggleSignIn",
            CheckoutCommand::SetAuthenticated { .. } => "SetAuthenticated",
            CheckoutCommand::ReviewOrder => "ReviewOrder",
            CheckoutCommand::ResetReviewOrder => "ResetReviewOrder",
            CheckoutCommand::SetUpdating { .. } => "SetUpdating",
            CheckoutCommand::SetGuestSignInUsername { .. } => "SetGuestSignInUsername",
            CheckoutCommand::BeginPlacement => "BeginPlacement",
            CheckoutCommand::CompletePlacement { .. } => "CompletePlacement",
            CheckoutCommand::FailPlacement { .. } => "FailPlacement",
            CheckoutCommand::ShowSuccessDialog => "ShowSuccessDialog",
            CheckoutCommand::DismissSuccessDialog => "DismissSuccessDialog",
        }
    }
}
