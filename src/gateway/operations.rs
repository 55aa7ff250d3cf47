use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::checkout::{CartId, CartSnapshot, Customer, OrderDetails, OrderResult};
use super::{FetchPolicy, GatewayError};

// ============================================================================
// Checkout Operations
// ============================================================================
//
// Every query and mutation the checkout core issues, with its document,
// variables and typed response shape.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetCheckoutDetails,
    GetCustomer,
    GetOrderDetails,
    SetBillingAddressOnCart,
    SetPaymentMethodAndPlaceOrder,
    CreateEmptyCart,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::GetCheckoutDetails => "GetCheckoutDetails",
            Operation::GetCustomer => "GetCustomer",
            Operation::GetOrderDetails => "GetOrderDetails",
            Operation::SetBillingAddressOnCart => "SetBillingAddressOnCart",
            Operation::SetPaymentMethodAndPlaceOrder => "SetPaymentMethodAndPlaceOrder",
            Operation::CreateEmptyCart => "CreateEmptyCart",
        }
    }

    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Operation::SetBillingAddressOnCart
                | Operation::SetPaymentMethodAndPlaceOrder
                | Operation::CreateEmptyCart
        )
    }

    /// Order details may contain personal data, so they bypass the cache
    pub fn default_fetch_policy(self) -> FetchPolicy {
        match self {
            Operation::GetOrderDetails => FetchPolicy::NoCache,
            Operation::GetCheckoutDetails => FetchPolicy::NetworkOnly,
            _ => FetchPolicy::CacheFirst,
        }
    }

    pub fn document(self) -> &'static str {
        match self {
            Operation::GetCheckoutDetails => GET_CHECKOUT_DETAILS,
            Operation::GetCustomer => GET_CUSTOMER,
            Operation::GetOrderDetails => GET_ORDER_DETAILS,
            Operation::SetBillingAddressOnCart => SET_BILLING_ADDRESS_ON_CART,
            Operation::SetPaymentMethodAndPlaceOrder => SET_PAYMENT_METHOD_AND_PLACE_ORDER,
            Operation::CreateEmptyCart => CREATE_EMPTY_CART,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

const GET_CHECKOUT_DETAILS: &str = r#"
query GetCheckoutDetails($cartId: String!) {
    cart(cart_id: $cartId) {
        id
        items { uid sku quantity product { name } }
        total_quantity
        available_payment_methods { code title }
        is_virtual
    }
}"#;

const GET_CUSTOMER: &str = r#"
query GetCustomer {
    customer { email firstname lastname }
}"#;

const GET_ORDER_DETAILS: &str = r#"
query GetOrderDetails($orderId: String!) {
    order(order_id: $orderId) { order_number items { sku quantity } }
}"#;

const SET_BILLING_ADDRESS_ON_CART: &str = r#"
mutation SetBillingAddressOnCart($cartId: String!, $sameAsShipping: Boolean!) {
    setBillingAddressOnCart(
        input: { cart_id: $cartId, billing_address: { same_as_shipping: $sameAsShipping } }
    ) {
        cart { email id is_virtual total_quantity total_summary_quantity_including_config }
    }
}"#;

const SET_PAYMENT_METHOD_AND_PLACE_ORDER: &str = r#"
mutation SetPaymentMethodAndPlaceOrder($cartId: String!, $paymentCode: String!) {
    setPaymentMethodAndPlaceOrder(
        input: { cart_id: $cartId, payment_method: { code: $paymentCode } }
    ) {
        order { order_id order_number }
    }
}"#;

const CREATE_EMPTY_CART: &str = r#"
mutation CreateEmptyCart {
    createEmptyCart
}"#;

// ============================================================================
// Variables
// ============================================================================

pub fn checkout_details_variables(cart_id: &CartId) -> Value {
    json!({ "cartId": cart_id })
}

pub fn order_details_variables(order_id: &str) -> Value {
    json!({ "orderId": order_id })
}

pub fn billing_address_variables(cart_id: &CartId, same_as_shipping: bool) -> Value {
    json!({ "cartId": cart_id, "sameAsShipping": same_as_shipping })
}

pub fn place_order_variables(cart_id: &CartId, payment_code: &str) -> Value {
    json!({ "cartId": cart_id, "paymentCode": payment_code })
}

// ============================================================================
// Response Shapes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CheckoutDetailsData {
    pub cart: Option<CartSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerData {
    pub customer: Option<Customer>,
}

#[derive(Debug, Deserialize)]
pub struct OrderDetailsData {
    pub order: Option<OrderDetails>,
}

/// The cart payload is not interpreted; only its presence matters
#[derive(Debug, Deserialize)]
pub struct SetBillingAddressData {
    #[serde(rename = "setBillingAddressOnCart")]
    pub payload: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderData {
    #[serde(rename = "setPaymentMethodAndPlaceOrder")]
    pub payload: Option<PlaceOrderPayload>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderPayload {
    pub order: OrderResult,
}

#[derive(Debug, Deserialize)]
pub struct CreateEmptyCartData {
    #[serde(rename = "createEmptyCart")]
    pub cart_id: Option<CartId>,
}

/// Decode `data` into `T`. Absent or null data decodes to `None`.
pub fn decode<T: DeserializeOwned>(operation: Operation, data: Option<Value>) -> Result<Option<T>, GatewayError> {
    match data {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| GatewayError::Decode {
                operation: operation.name(),
                reason: e.to_string(),
            }),
    }
}

/// Falsy in the sense the storefront uses for mutation payloads
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_kinds_and_policies() {
        assert!(Operation::CreateEmptyCart.is_mutation());
        assert!(!Operation::GetCustomer.is_mutation());
        assert_eq!(Operation::GetOrderDetails.default_fetch_policy(), FetchPolicy::NoCache);
        assert!(Operation::SetBillingAddressOnCart.document().contains("same_as_shipping"));
    }

    #[test]
    fn test_decode_place_order_payload() {
        let data = json!({
            "setPaymentMethodAndPlaceOrder": {
                "order": { "order_id": "99", "order_number": "000000099" }
            }
        });

        let decoded: PlaceOrderData = decode(Operation::SetPaymentMethodAndPlaceOrder, Some(data))
            .unwrap()
            .unwrap();
        let order = decoded.payload.unwrap().order;
        assert_eq!(order.number, "000000099");
    }

    #[test]
    fn test_decode_null_data_is_none() {
        let decoded: Option<CreateEmptyCartData> =
            decode(Operation::CreateEmptyCart, Some(Value::Null)).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_decode_wrong_shape_is_error() {
        let data = json!({ "setPaymentMethodAndPlaceOrder": { "order": { "order_id": "99" } } });
        let result: Result<Option<PlaceOrderData>, _> =
            decode(Operation::SetPaymentMethodAndPlaceOrder, Some(data));
        assert!(matches!(result, Err(GatewayError::Decode { .. })));
    }

    #[test]
    fn test_falsy_values() {
        assert!(is_falsy(&Value::Null));
        assert!(is_falsy(&json!(false)));
        assert!(is_falsy(&json!("")));
        assert!(!is_falsy(&json!({})));
        assert!(!is_falsy(&json!({ "cart": {} })));
    }

    #[test]
    fn test_variables_use_wire_names() {
        let vars = billing_address_variables(&CartId::new("abc123"), true);
        assert_eq!(vars, json!({ "cartId": "abc123", "sameAsShipping": true }));
    }
}
