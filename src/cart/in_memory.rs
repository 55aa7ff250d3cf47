use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::checkout::CartId;
use super::{CartStore, CartStoreError};

#[derive(Debug, Clone, PartialEq)]
pub enum CartStoreOp {
    Removed(CartId),
    CacheCleared(String),
    Bound(CartId),
}

/// Process-local cart store that remembers every call
#[derive(Default)]
pub struct InMemoryCartStore {
    bound: Mutex<Option<CartId>>,
    ops: Mutex<Vec<CartStoreOp>>,
}

impl InMemoryCartStore {
    pub fn new(initial: Option<CartId>) -> Self {
        Self {
            bound: Mutex::new(initial),
            ops: Mutex::new(Vec::new()),
        }
    }

    pub fn bound(&self) -> Option<CartId> {
        self.bound.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn ops(&self) -> Vec<CartStoreOp> {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, op: CartStoreOp) {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).push(op);
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn remove_cart(&self, cart_id: &CartId) -> Result<(), CartStoreError> {
        let mut bound = self.bound.lock().unwrap_or_else(|e| e.into_inner());
        if bound.as_ref() == Some(cart_id) {
            *bound = None;
        }
        drop(bound);
        self.record(CartStoreOp::Removed(cart_id.clone()));
        Ok(())
    }

    async fn clear_cache_data(&self, tag: &str) -> Result<(), CartStoreError> {
        self.record(CartStoreOp::CacheCleared(tag.to_string()));
        Ok(())
    }

    async fn bind_cart(&self, cart_id: &CartId) -> Result<(), CartStoreError> {
        *self.bound.lock().unwrap_or_else(|e| e.into_inner()) = Some(cart_id.clone());
        self.record(CartStoreOp::Bound(cart_id.clone()));
        Ok(())
    }
}
