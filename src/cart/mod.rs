// ============================================================================
// Cart Lifecycle
// ============================================================================
//
// `CartHandle` is the single owner of the active cart identity.
// `ActiveCart` is the one slot it lives in; replacing the handle happens
// under its write lock so readers never see a retired cart.
// `CartStore` is the external collaborator that keeps the client-side
// cart identity and cache.
//
// ============================================================================

mod in_memory;

use async_trait::async_trait;
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::domain::checkout::CartId;

pub use in_memory::{CartStoreOp, InMemoryCartStore};

/// Handle to the active cart. Deliberately not `Clone`.
#[derive(Debug, PartialEq, Eq)]
pub struct CartHandle {
    id: CartId,
}

impl CartHandle {
    pub fn new(id: CartId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &CartId {
        &self.id
    }
}

pub struct ActiveCart {
    slot: RwLock<Option<CartHandle>>,
}

impl ActiveCart {
    pub fn new(handle: Option<CartHandle>) -> Self {
        Self {
            slot: RwLock::new(handle),
        }
    }

    /// Id of the active cart, waiting out any rotation in progress
    pub async fn current_id(&self) -> Option<CartId> {
        self.slot.read().await.as_ref().map(|h| h.id().clone())
    }

    /// Exclusive access for the duration of a rotation
    pub async fn lock(&self) -> RwLockWriteGuard<'_, Option<CartHandle>> {
        self.slot.write().await
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum CartStoreError {
    #[error("Cart store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Forget the local identity of `cart_id`
    async fn remove_cart(&self, cart_id: &CartId) -> Result<(), CartStoreError>;

    /// Drop cached entries carrying `tag`
    async fn clear_cache_data(&self, tag: &str) -> Result<(), CartStoreError>;

    /// Make `cart_id` the cart the storefront uses from now on
    async fn bind_cart(&self, cart_id: &CartId) -> Result<(), CartStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_readers_wait_for_rotation() {
        let active = Arc::new(ActiveCart::new(Some(CartHandle::new(CartId::new("old")))));

        let mut guard = active.lock().await;
        let reader = {
            let active = active.clone();
            tokio::spawn(async move { active.current_id().await })
        };

        // Retire the old handle, then install the new one before releasing
        *guard = None;
        tokio::time::sleep(Duration::from_millis(10)).await;
        *guard = Some(CartHandle::new(CartId::new("new")));
        drop(guard);

        assert_eq!(reader.await.unwrap(), Some(CartId::new("new")));
    }
}
