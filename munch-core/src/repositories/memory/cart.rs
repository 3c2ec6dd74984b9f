// File: munch-core/src/repositories/memory/cart.rs

use async_trait::async_trait;
use dashmap::DashMap;
use munch_common::error::Error;
use munch_common::models::Cart;
use munch_common::traits::repository_traits::CartStore;

/// Key-value cart store holding each cart as its JSON document, the same
/// shape a browser local store keeps.
#[derive(Default)]
pub struct MemoryCartStore {
    carts: DashMap<String, String>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn load(&self, session_id: &str) -> Result<Cart, Error> {
        match self.carts.get(session_id) {
            Some(doc) => Ok(serde_json::from_str(doc.value())?),
            None => Ok(Cart::default()),
        }
    }

    async fn save(&self, session_id: &str, cart: &Cart) -> Result<(), Error> {
        let doc = serde_json::to_string(cart)?;
        self.carts.insert(session_id.to_string(), doc);
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), Error> {
        self.carts.remove(session_id);
        Ok(())
    }
}
