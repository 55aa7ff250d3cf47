use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Checkout Value Objects
// ============================================================================

/// Checkout step, totally ordered from address entry to review
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStep {
    #[default]
    ShippingAddress = 1,
    ShippingMethod = 2,
    Payment = 3,
    Review = 4,
}

impl CheckoutStep {
    /// The step directly after this one, `None` at review
    pub fn next(self) -> Option<Self> {
        match self {
            CheckoutStep::ShippingAddress => Some(CheckoutStep::ShippingMethod),
            CheckoutStep::ShippingMethod => Some(CheckoutStep::Payment),
            CheckoutStep::Payment => Some(CheckoutStep::Review),
            CheckoutStep::Review => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CheckoutStep::ShippingAddress => "SHIPPING_ADDRESS",
            CheckoutStep::ShippingMethod => "SHIPPING_METHOD",
            CheckoutStep::Payment => "PAYMENT",
            CheckoutStep::Review => "REVIEW",
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pane the checkout page is showing. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActiveContent {
    #[default]
    Checkout,
    AddressBook,
    SignIn,
}

impl ActiveContent {
    /// checkout <-> addressBook; from signIn it returns to checkout
    pub fn flip_address_book(self) -> Self {
        match self {
            ActiveContent::Checkout => ActiveContent::AddressBook,
            _ => ActiveContent::Checkout,
        }
    }

    /// checkout <-> signIn; from addressBook it returns to checkout
    pub fn flip_sign_in(self) -> Self {
        match self {
            ActiveContent::Checkout => ActiveContent::SignIn,
            _ => ActiveContent::Checkout,
        }
    }
}

/// Opaque server-side cart identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(String);

impl CartId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CartId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cart line item. Only `sku` is interpreted; every other field the server
/// sent is kept so snapshots re-serialize as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub sku: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CartItem {
    pub fn new(sku: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub code: String,
    #[serde(default)]
    pub title: String,
}

/// Point-in-time copy of the remote cart as returned by the checkout query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub id: CartId,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total_quantity: f64,
    #[serde(default)]
    pub available_payment_methods: Vec<PaymentMethod>,
    #[serde(default)]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
}

/// Order snapshot read after submission. Never cached by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Identifiers of a placed order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    #[serde(rename = "order_id")]
    pub id: String,
    #[serde(rename = "order_number")]
    pub number: String,
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_order_and_next() {
        assert!(CheckoutStep::ShippingAddress < CheckoutStep::ShippingMethod);
        assert!(CheckoutStep::Payment < CheckoutStep::Review);
        assert_eq!(CheckoutStep::Payment.next(), Some(CheckoutStep::Review));
        assert_eq!(CheckoutStep::Review.next(), None);
        assert_eq!(CheckoutStep::default(), CheckoutStep::ShippingAddress);
    }

    #[test]
    fn test_active_content_flips() {
        let content = ActiveContent::Checkout;
        assert_eq!(content.flip_address_book(), ActiveContent::AddressBook);
        assert_eq!(content.flip_address_book().flip_address_book(), ActiveContent::Checkout);
        assert_eq!(content.flip_sign_in(), ActiveContent::SignIn);
        assert_eq!(ActiveContent::SignIn.flip_address_book(), ActiveContent::Checkout);
    }

    #[test]
    fn test_cart_item_keeps_unknown_fields() {
        let raw = json!({"sku": "X", "quantity": 2, "product": {"name": "Shirt"}});
        let item: CartItem = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(item.sku, "X");
        assert_eq!(serde_json::to_value(&item).unwrap(), raw);
    }

    #[test]
    fn test_cart_snapshot_defaults_missing_lists() {
        let snapshot: CartSnapshot = serde_json::from_value(json!({"id": "abc123"})).unwrap();

        assert_eq!(snapshot.id, CartId::new("abc123"));
        assert!(snapshot.items.is_empty());
        assert!(snapshot.available_payment_methods.is_empty());
        assert_eq!(snapshot.total_quantity, 0.0);
    }

    #[test]
    fn test_order_result_uses_wire_names() {
        let order: OrderResult =
            serde_json::from_value(json!({"order_id": "99", "order_number": "000000099"})).unwrap();
        assert_eq!(order.id, "99");
        assert_eq!(order.number, "000000099");
    }
}
