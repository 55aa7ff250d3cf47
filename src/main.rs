use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storefront_checkout::cart::{CartHandle, InMemoryCartStore};
use storefront_checkout::domain::checkout::{CartId, CartItem, CartSnapshot, Customer, PaymentMethod};
use storefront_checkout::eventing::TracingEventSink;
use storefront_checkout::gateway::InMemoryGateway;
use storefront_checkout::metrics::{render_text, CheckoutMetrics};
use storefront_checkout::navigation::RecordingNavigator;
use storefront_checkout::{CheckoutConfig, CheckoutDeps, CheckoutSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,storefront_checkout=debug"))
        )
        .init();

    tracing::info!("🚀 Starting storefront checkout demo");

    // === 1. Configuration (defaults, checkout.toml, CHECKOUT_* env) ===
    let config = CheckoutConfig::load()?;
    tracing::info!(
        payment_method = %config.payment_method_code,
        confirmation_path = %config.confirmation_path,
        "Configuration loaded"
    );

    // === 2. Metrics ===
    let metrics = Arc::new(CheckoutMetrics::new()?);

    // === 3. In-process collaborators ===
    let cart_id = CartId::new("demo-cart");
    let gateway = Arc::new(
        InMemoryGateway::new()
            .with_cart(CartSnapshot {
                id: cart_id.clone(),
                items: vec![
                    CartItem::new("VSK12-LA").with_field("quantity", 1),
                    CartItem::new("VA22-SI-NA").with_field("quantity", 1),
                ],
                total_quantity: 2.0,
                available_payment_methods: vec![PaymentMethod {
                    code: "cashondelivery".to_string(),
                    title: "Cash On Delivery".to_string(),
                }],
                is_virtual: false,
            })
            .with_customer(Customer {
                email: Some("veronica@example.com".to_string()),
                firstname: Some("Veronica".to_string()),
                lastname: Some("Costello".to_string()),
            }),
    );
    let navigator = Arc::new(RecordingNavigator::new());

    let deps = CheckoutDeps {
        gateway,
        cart_store: Arc::new(InMemoryCartStore::new(Some(cart_id.clone()))),
        sink: Arc::new(TracingEventSink),
        navigator: navigator.clone(),
        metrics: Some(metrics.clone()),
    };
    let session = CheckoutSession::new(deps, config, Some(CartHandle::new(cart_id)));

    // === 4. Follow the view model like a page would ===
    let mut updates = session.subscribe();
    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let view = updates.borrow_and_update().clone();
            tracing::debug!(
                items = view.cart_items.len(),
                is_loading = view.is_loading,
                is_cart_empty = view.is_cart_empty,
                "View model updated"
            );
        }
    });

    // === 5. Walk through checkout ===
    session.set_authenticated(true)?;
    session.refresh_customer().await?;
    session.refresh_checkout_details().await?;

    session.set_shipping_information_done()?;
    session.set_shipping_method_done()?;
    session.set_payment_information_done()?;
    session.handle_review_order()?;

    match session.handle_place_order().await {
        Ok(order) => {
            tracing::info!(order_number = %order.number, "✅ Order placed");
            session.fetch_order_details(&order.id).await?;
        }
        Err(error) => tracing::error!(error = %error, "❌ Order placement failed"),
    }

    for visit in navigator.visits() {
        tracing::info!(path = %visit.path, state = %visit.state, "Navigation requested");
    }
    tracing::info!(cart_id = ?session.cart_id().await, "Active cart after checkout");

    tracing::debug!(history = %session.export_history()?, "Session history");

    session.close();
    drop(session);
    watcher.await?;

    println!("{}", render_text(metrics.registry())?);
    Ok(())
}
