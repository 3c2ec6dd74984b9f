// File: munch-common/src/models/cart.rs

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * i64::from(self.quantity)
    }
}

/// Session-scoped shopping cart. Plain value; persistence is the
/// caller's business (see `CartStore`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` of a product, merging with an existing line.
    pub fn add(
        &mut self,
        product_id: &str,
        name: &str,
        unit_price_cents: i64,
        quantity: u32,
    ) -> Result<(), Error> {
        if product_id.trim().is_empty() {
            return Err(Error::InvalidInput("product_id must not be empty".into()));
        }
        if unit_price_cents < 0 {
            return Err(Error::InvalidInput(format!(
                "price for '{product_id}' must not be negative"
            )));
        }
        if quantity == 0 {
            return Err(Error::InvalidInput("quantity must be at least 1".into()));
        }

        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            self.items.push(CartItem {
                product_id: product_id.to_string(),
                name: name.to_string(),
                unit_price_cents,
                quantity,
            });
        }
        Ok(())
    }

    /// Returns true if a line was removed.
    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != before
    }

    /// Sets the quantity of a line; zero removes it.
    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), Error> {
        if quantity == 0 {
            self.remove(product_id);
            return Ok(());
        }
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                item.quantity = quantity;
                Ok(())
            }
            None => Err(Error::NotFound(format!("Cart item '{product_id}'"))),
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn subtotal_cents(&self) -> i64 {
        self.items.iter().map(CartItem::line_total_cents).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_same_product_merges_quantity() {
        let mut cart = Cart::new();
        cart.add("taco", "Taco", 350, 1).unwrap();
        cart.add("taco", "Taco", 350, 2).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.subtotal_cents(), 1050);
    }

    #[test]
    fn zero_quantity_removes_line() {
        let mut cart = Cart::new();
        cart.add("taco", "Taco", 350, 1).unwrap();
        cart.add("soda", "Soda", 150, 2).unwrap();
        cart.update_quantity("taco", 0).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.subtotal_cents(), 300);
    }

    #[test]
    fn rejects_bad_lines() {
        let mut cart = Cart::new();
        assert!(matches!(cart.add("x", "X", -1, 1), Err(Error::InvalidInput(_))));
        assert!(matches!(cart.add("x", "X", 100, 0), Err(Error::InvalidInput(_))));
        assert!(matches!(cart.update_quantity("missing", 2), Err(Error::NotFound(_))));
        assert!(cart.is_empty());
    }
}
