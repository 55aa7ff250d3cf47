use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use crate::domain::checkout::CartItem;

// ============================================================================
// Navigation
// ============================================================================

/// Client-side router owned by the host application
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str, state: Value);
}

/// Location state handed to the order confirmation page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationState {
    pub order_number: String,
    pub items: Vec<CartItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub path: String,
    pub state: Value,
}

/// Remembers every navigation request
#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<Visit>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<Visit> {
        self.visits.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str, state: Value) {
        tracing::info!(path, "Navigating");
        self.visits
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Visit {
                path: path.to_string(),
                state,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_confirmation_state_wire_shape() {
        let state = ConfirmationState {
            order_number: "000000099".to_string(),
            items: vec![CartItem::new("X"), CartItem::new("Y")],
        };

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({ "orderNumber": "000000099", "items": [{ "sku": "X" }, { "sku": "Y" }] })
        );
    }
}
