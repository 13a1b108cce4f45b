//! # Cart State Handle
//!
//! The original console kept the cart in a module-level reactive store.
//! Here it is an explicit service owned by the composition root and
//! injected into the checkout flow: an `Arc<Mutex<Cart>>` for exclusive
//! mutation plus a `watch` channel so UIs subscribe to view snapshots
//! instead of reaching into ambient globals. Tests construct isolated
//! instances.
//!
//! ## Thread Safety
//! One operator per terminal means no real contention; the mutex exists
//! so concurrent UI tasks serialize, and the watch channel is the only
//! read path that never takes the lock.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use ts_rs::TS;

use crate::cart::{Cart, CartLine};
use crate::types::Currency;

/// An immutable snapshot of the cart for display, published on every
/// mutation. Totals are recomputed from the lines, never cached stale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub display_currency: Currency,
    pub total_usd_cents: i64,

    /// Only present once a rate snapshot is frozen; before that the UI
    /// shows the live rate itself.
    pub total_ves_cents: Option<i64>,

    pub rate: Option<f64>,
    pub selected_customer_id: Option<i64>,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let rate = cart.rate_snapshot().map(|s| s.rate);
        CartView {
            lines: cart.lines().to_vec(),
            display_currency: cart.display_currency(),
            total_usd_cents: cart.total_usd().cents(),
            total_ves_cents: rate.map(|r| cart.total_ves(r).cents()),
            rate,
            selected_customer_id: cart.selected_customer(),
        }
    }
}

/// Shared, observable handle over the cart aggregate.
#[derive(Debug, Clone)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
    view_tx: Arc<watch::Sender<CartView>>,
}

impl CartState {
    /// Creates a handle over an empty cart.
    pub fn new() -> Self {
        let cart = Cart::new();
        let (view_tx, _) = watch::channel(CartView::from(&cart));
        CartState {
            cart: Arc::new(Mutex::new(cart)),
            view_tx: Arc::new(view_tx),
        }
    }

    /// Executes a closure with read access to the cart.
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.cart.lock().expect("Cart mutex poisoned");
        f(&cart)
    }

    /// Executes a closure with write access to the cart and publishes
    /// the resulting view to all subscribers.
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.cart.lock().expect("Cart mutex poisoned");
        let result = f(&mut cart);
        self.view_tx.send_replace(CartView::from(&*cart));
        result
    }

    /// Subscribes to view snapshots. The receiver always holds the
    /// latest published view.
    pub fn subscribe(&self) -> watch::Receiver<CartView> {
        self.view_tx.subscribe()
    }
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductSnapshot;

    fn product(id: i64, price_cents: i64) -> ProductSnapshot {
        ProductSnapshot {
            id,
            name: format!("Product {}", id),
            sku: None,
            unit_price_cents: price_cents,
            stock_limit: 10,
        }
    }

    #[test]
    fn test_mutation_publishes_view() {
        let state = CartState::new();
        let rx = state.subscribe();

        state
            .with_cart_mut(|c| c.add_product(&product(1, 1000), 2))
            .unwrap();

        let view = rx.borrow();
        assert_eq!(view.total_usd_cents, 2000);
        assert_eq!(view.lines.len(), 1);
        assert!(view.total_ves_cents.is_none()); // no snapshot yet
    }

    #[test]
    fn test_isolated_instances() {
        let a = CartState::new();
        let b = CartState::new();

        a.with_cart_mut(|c| c.add_product(&product(1, 500), 1))
            .unwrap();

        assert_eq!(a.with_cart(|c| c.total_usd().cents()), 500);
        assert!(b.with_cart(|c| c.is_empty()));
    }

    #[test]
    fn test_clones_share_the_same_cart() {
        let state = CartState::new();
        let other = state.clone();

        state
            .with_cart_mut(|c| c.add_product(&product(1, 500), 1))
            .unwrap();

        assert_eq!(other.with_cart(|c| c.line_count()), 1);
        assert_eq!(other.subscribe().borrow().total_usd_cents, 500);
    }
}
