//! Checkout orchestration core for a headless storefront: the checkout step
//! state machine, the derived view model, order placement with cart
//! rotation, and the analytics bridge.

pub mod cart;
pub mod config;
pub mod domain;
pub mod event_sourcing;
pub mod eventing;
pub mod gateway;
pub mod metrics;
pub mod navigation;
pub mod pipeline;
pub mod session;
pub mod utils;

pub use config::CheckoutConfig;
pub use session::{CheckoutDeps, CheckoutSession, SessionError};
