use std::sync::Arc;
use tokio::sync::watch;

use super::value_objects::{CartItem, CartSnapshot, Customer, OrderDetails, PaymentMethod};

// ============================================================================
// Derived View Model
// ============================================================================
//
// Pure projection over the latest snapshots of three independent reads:
// customer profile, checkout cart and post-submit order details.
// The publisher recomputes on every input change and only notifies
// subscribers when the projection actually differs.
//
// ============================================================================

/// Network status of a read, numbered the way the GraphQL client reports it.
/// Anything below `Ready` is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NetworkStatus {
    Loading = 1,
    SetVariables = 2,
    FetchMore = 3,
    Refetch = 4,
    Poll = 6,
    Ready = 7,
    Error = 8,
}

impl NetworkStatus {
    pub fn is_in_flight(self) -> bool {
        self < NetworkStatus::Ready
    }
}

/// Latest known state of one remote read
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    pub loading: bool,
    /// `None` until the read has reported anything at all
    pub network_status: Option<NetworkStatus>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            network_status: None,
        }
    }
}

impl<T> QueryState<T> {
    /// Read intentionally not issued (e.g. no cart, or signed out)
    pub fn skipped() -> Self {
        Self {
            data: None,
            loading: false,
            network_status: Some(NetworkStatus::Ready),
        }
    }

    /// Read issued; keeps whatever data was already known
    pub fn in_flight(previous: &Self, status: NetworkStatus) -> Self {
        Self {
            data: previous.data.clone(),
            loading: true,
            network_status: Some(status),
        }
    }

    pub fn ready(data: Option<T>) -> Self {
        Self {
            data: data.map(Arc::new),
            loading: false,
            network_status: Some(NetworkStatus::Ready),
        }
    }

    pub fn failed(previous: &Self) -> Self {
        Self {
            data: previous.data.clone(),
            loading: false,
            network_status: Some(NetworkStatus::Error),
        }
    }
}

/// Everything the projection depends on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewInputs {
    pub customer: QueryState<Customer>,
    pub checkout: QueryState<CartSnapshot>,
    pub order_details: QueryState<OrderDetails>,
    pub is_signed_in: bool,
}

/// Read-only projection handed to the UI collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutViewModel {
    pub cart_items: Vec<CartItem>,
    pub available_payment_methods: Option<Vec<PaymentMethod>>,
    pub customer: Option<Customer>,
    pub order_details: Option<OrderDetails>,
    pub order_details_loading: bool,
    pub is_loading: bool,
    pub is_cart_empty: bool,
    pub is_guest_checkout: bool,
}

impl CheckoutViewModel {
    pub fn derive(inputs: &ViewInputs) -> Self {
        let cart = inputs.checkout.data.as_deref();

        // An absent status means the checkout read has not resolved yet
        let checkout_in_flight = inputs
            .checkout
            .network_status
            .map_or(true, NetworkStatus::is_in_flight);

        Self {
            cart_items: cart.map(|c| c.items.clone()).unwrap_or_default(),
            available_payment_methods: cart.map(|c| c.available_payment_methods.clone()),
            customer: inputs.customer.data.as_deref().cloned(),
            order_details: inputs.order_details.data.as_deref().cloned(),
            order_details_loading: inputs.order_details.loading,
            is_loading: checkout_in_flight || inputs.customer.loading,
            is_cart_empty: !cart.is_some_and(|c| c.total_quantity > 0.0),
            is_guest_checkout: !inputs.is_signed_in,
        }
    }
}

// ============================================================================
// Publisher - explicit subscribe/notify wiring
// ============================================================================

pub struct ViewModelPublisher {
    sender: watch::Sender<Arc<CheckoutViewModel>>,
}

impl ViewModelPublisher {
    pub fn new(inputs: &ViewInputs) -> Self {
        let (sender, _) = watch::channel(Arc::new(CheckoutViewModel::derive(inputs)));
        Self { sender }
    }

    /// Recompute from `inputs`. Returns `true` if subscribers were notified.
    pub fn publish(&self, inputs: &ViewInputs) -> bool {
        let next = CheckoutViewModel::derive(inputs);
        self.sender.send_if_modified(|current| {
            if **current == next {
                return false;
            }
            *current = Arc::new(next);
            true
        })
    }

    pub fn current(&self) -> Arc<CheckoutViewModel> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<CheckoutViewModel>> {
        self.sender.subscribe()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checkout::value_objects::CartId;

    fn cart(total_quantity: f64, skus: &[&str]) -> CartSnapshot {
        CartSnapshot {
            id: CartId::new("abc123"),
            items: skus.iter().map(|s| CartItem::new(*s)).collect(),
            total_quantity,
            available_payment_methods: vec![PaymentMethod {
                code: "cashondelivery".to_string(),
                title: "Cash On Delivery".to_string(),
            }],
            is_virtual: false,
        }
    }

    fn loaded(snapshot: CartSnapshot) -> ViewInputs {
        ViewInputs {
            checkout: QueryState::ready(Some(snapshot)),
            customer: QueryState::skipped(),
            ..Default::default()
        }
    }

    #[test]
    fn test_absent_cart_projects_empty_defaults() {
        let view = CheckoutViewModel::derive(&ViewInputs::default());

        assert!(view.cart_items.is_empty());
        assert!(view.available_payment_methods.is_none());
        assert!(view.is_cart_empty);
        assert!(view.is_guest_checkout);
        // Never-resolved checkout read counts as loading
        assert!(view.is_loading);
    }

    #[test]
    fn test_skipped_reads_are_not_loading() {
        let inputs = ViewInputs {
            checkout: QueryState::skipped(),
            customer: QueryState::skipped(),
            ..Default::default()
        };
        assert!(!CheckoutViewModel::derive(&inputs).is_loading);
    }

    #[test]
    fn test_in_flight_statuses_are_loading() {
        for status in [NetworkStatus::Loading, NetworkStatus::Refetch, NetworkStatus::Poll] {
            let inputs = ViewInputs {
                checkout: QueryState::in_flight(&QueryState::default(), status),
                customer: QueryState::skipped(),
                ..Default::default()
            };
            assert!(CheckoutViewModel::derive(&inputs).is_loading);
        }
    }

    #[test]
    fn test_customer_loading_counts() {
        let mut inputs = loaded(cart(1.0, &["X"]));
        inputs.customer = QueryState::in_flight(&QueryState::default(), NetworkStatus::Loading);
        assert!(CheckoutViewModel::derive(&inputs).is_loading);
    }

    #[test]
    fn test_cart_empty_follows_total_quantity() {
        assert!(CheckoutViewModel::derive(&loaded(cart(0.0, &[]))).is_cart_empty);
        assert!(!CheckoutViewModel::derive(&loaded(cart(1.0, &["X"]))).is_cart_empty);
        assert!(!CheckoutViewModel::derive(&loaded(cart(2.0, &["X", "Y"]))).is_cart_empty);
    }

    #[test]
    fn test_guest_checkout_follows_session() {
        let mut inputs = loaded(cart(1.0, &["X"]));
        assert!(CheckoutViewModel::derive(&inputs).is_guest_checkout);

        inputs.is_signed_in = true;
        assert!(!CheckoutViewModel::derive(&inputs).is_guest_checkout);
    }

    #[test]
    fn test_payment_methods_present_once_cart_loaded() {
        let mut snapshot = cart(1.0, &["X"]);
        snapshot.available_payment_methods.clear();

        let view = CheckoutViewModel::derive(&loaded(snapshot));
        assert_eq!(view.available_payment_methods, Some(vec![]));
    }

    #[test]
    fn test_cart_items_keep_server_order() {
        let view = CheckoutViewModel::derive(&loaded(cart(3.0, &["Y", "X", "Z"])));
        let skus: Vec<_> = view.cart_items.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, vec!["Y", "X", "Z"]);
    }

    #[tokio::test]
    async fn test_publisher_only_notifies_on_change() {
        let inputs = loaded(cart(2.0, &["X", "Y"]));
        let publisher = ViewModelPublisher::new(&ViewInputs::default());
        let mut receiver = publisher.subscribe();

        assert!(publisher.publish(&inputs));
        assert!(receiver.has_changed().unwrap());
        let first = receiver.borrow_and_update().clone();

        // Same inputs, rebuilt from scratch: no notification, same Arc
        assert!(!publisher.publish(&loaded(cart(2.0, &["X", "Y"]))));
        assert!(!receiver.has_changed().unwrap());
        assert!(Arc::ptr_eq(&first, &publisher.current()));
    }
}
