use crate::domain::checkout::{CartId, CartItem, CheckoutStep, CheckoutViewModel};
use super::dispatcher::EventDispatcher;

/// What the observer needs to know about the session at one instant
pub struct ObservedState<'a> {
    pub step: CheckoutStep,
    pub review_order_button_clicked: bool,
    pub cart_id: Option<&'a CartId>,
    pub view: &'a CheckoutViewModel,
}

/// An analytics event a transition calls for, not yet dispatched
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    PageView {
        cart_id: Option<CartId>,
        products: Vec<CartItem>,
    },
    ReviewButtonClicked {
        cart_id: Option<CartId>,
    },
}

impl Transition {
    pub fn dispatch(&self, dispatcher: &EventDispatcher) {
        match self {
            Transition::PageView { cart_id, products } => dispatcher.page_view(cart_id.as_ref(), products),
            Transition::ReviewButtonClicked { cart_id } => dispatcher.review_button_clicked(cart_id.as_ref()),
        }
    }
}

/// Detects analytics transitions. Each trigger remembers whether it held
/// last time and fires when it goes from false to true. The caller
/// dispatches what `observe` returns.
#[derive(Debug, Default)]
pub struct TransitionObserver {
    page_view_armed: bool,
    review_clicked: bool,
}

impl TransitionObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, state: &ObservedState<'_>) -> Vec<Transition> {
        let mut transitions = Vec::new();

        let page_view = state.step == CheckoutStep::ShippingAddress && !state.view.cart_items.is_empty();
        if page_view && !self.page_view_armed {
            transitions.push(Transition::PageView {
                cart_id: state.cart_id.cloned(),
                products: state.view.cart_items.clone(),
            });
        }
        self.page_view_armed = page_view;

        let review = state.review_order_button_clicked;
        if review && !self.review_clicked {
            transitions.push(Transition::ReviewButtonClicked {
                cart_id: state.cart_id.cloned(),
            });
        }
        self.review_clicked = review;

        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::domain::checkout::{CartSnapshot, QueryState, ViewInputs};
    use crate::eventing::dispatcher::CHECKOUT_PAGE_VIEW;
    use crate::eventing::sink::RecordingEventSink;

    fn view_with(skus: &[&str]) -> CheckoutViewModel {
        CheckoutViewModel::derive(&ViewInputs {
            checkout: QueryState::ready(Some(CartSnapshot {
                id: CartId::new("abc123"),
                items: skus.iter().map(|s| CartItem::new(*s)).collect(),
                total_quantity: skus.len() as f64,
                available_payment_methods: vec![],
                is_virtual: false,
            })),
            ..Default::default()
        })
    }

    fn page_views(transitions: &[Transition]) -> usize {
        transitions
            .iter()
            .filter(|t| matches!(t, Transition::PageView { .. }))
            .count()
    }

    #[test]
    fn test_page_view_emitted_once_per_entry() {
        let mut observer = TransitionObserver::new();
        let cart_id = CartId::new("abc123");
        let view = view_with(&["X", "Y"]);
        let state = ObservedState {
            step: CheckoutStep::ShippingAddress,
            review_order_button_clicked: false,
            cart_id: Some(&cart_id),
            view: &view,
        };

        let first = observer.observe(&state);
        assert_eq!(observer.observe(&state), vec![]);
        assert_eq!(observer.observe(&state), vec![]);

        assert_eq!(
            first,
            vec![Transition::PageView {
                cart_id: Some(cart_id.clone()),
                products: vec![CartItem::new("X"), CartItem::new("Y")],
            }]
        );
    }

    #[test]
    fn test_page_view_waits_for_items() {
        let mut observer = TransitionObserver::new();
        let empty = view_with(&[]);
        let loaded = view_with(&["X"]);

        let mut emitted = Vec::new();
        for view in [&empty, &empty, &loaded] {
            emitted.extend(observer.observe(&ObservedState {
                step: CheckoutStep::ShippingAddress,
                review_order_button_clicked: false,
                cart_id: None,
                view,
            }));
        }

        assert_eq!(page_views(&emitted), 1);
    }

    #[test]
    fn test_review_click_emitted_on_rising_edge_only() {
        let mut observer = TransitionObserver::new();
        let view = view_with(&["X"]);

        let mut emitted = Vec::new();
        for clicked in [false, true, true, false, true] {
            emitted.extend(observer.observe(&ObservedState {
                step: CheckoutStep::Review,
                review_order_button_clicked: clicked,
                cart_id: None,
                view: &view,
            }));
        }

        assert_eq!(emitted.len(), 2);
        assert_eq!(page_views(&emitted), 0);
    }

    #[test]
    fn test_dispatch_uses_storefront_payload() {
        let sink = Arc::new(RecordingEventSink::new());
        let dispatcher = EventDispatcher::new(sink.clone());

        Transition::PageView {
            cart_id: Some(CartId::new("abc123")),
            products: vec![CartItem::new("X"), CartItem::new("Y")],
        }
        .dispatch(&dispatcher);

        assert_eq!(sink.count(CHECKOUT_PAGE_VIEW), 1);
        let payload = &sink.events()[0].payload;
        assert_eq!(payload["cart_id"], "abc123");
        assert_eq!(payload["products"][1]["sku"], "Y");
    }
}
