//! # Cart Aggregate
//!
//! The transaction under composition: an ordered set of lines of two
//! kinds, a display-currency toggle, and a frozen exchange-rate snapshot.
//!
//! ## Line kinds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Product line   retail item, unit price × quantity, capped by the   │
//! │                 stock limit frozen at add time                      │
//! │                                                                     │
//! │  Service line   the outstanding balance of a repair work order;     │
//! │                 exactly one unit, not quantity-adjustable           │
//! │                                                                     │
//! │  Both settle in USD. total_usd() is always derived from the lines, │
//! │  never cached.                                                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by `(kind, id)`; re-adding a product raises its
//!   quantity, re-adding a repair is a signalled no-op.
//! - The rate snapshot freezes once per cart lifecycle (`capture_rate`)
//!   and only `clear()` releases it.
//! - Switching the display currency never touches the USD total.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Ves};
use crate::rate::RateSnapshot;
use crate::types::{Currency, ProductSnapshot, RepairSnapshot};
use crate::validation::validate_quantity;
use crate::MAX_CART_LINES;

// =============================================================================
// Cart Lines
// =============================================================================

/// A line in the cart. Tagged so every consumer matches exhaustively
/// instead of duck-typing on field presence.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartLine {
    /// A retail product at `unit_price × quantity`.
    Product {
        product: ProductSnapshot,
        quantity: i64,
    },
    /// A repair work order's remaining balance. One unit, always.
    Service { repair: RepairSnapshot },
}

impl CartLine {
    /// The `(kind, id)` identity of this line.
    pub fn key(&self) -> LineKey {
        match self {
            CartLine::Product { product, .. } => LineKey::Product(product.id),
            CartLine::Service { repair } => LineKey::Service(repair.id),
        }
    }

    /// What this line contributes to the USD total.
    pub fn total(&self) -> Money {
        match self {
            CartLine::Product { product, quantity } => {
                product.unit_price().multiply_quantity(*quantity)
            }
            CartLine::Service { repair } => repair.remaining_balance(),
        }
    }
}

/// Identity of a cart line: the kind discriminates the id namespaces
/// (product 7 and repair 7 are different lines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LineKey {
    Product(i64),
    Service(i64),
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineKey::Product(id) => write!(f, "product {}", id),
            LineKey::Service(id) => write!(f, "service {}", id),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The cart aggregate. Owned by the active checkout flow; torn down on
/// successful submission or explicit cancellation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    display_currency: Currency,
    rate_snapshot: Option<RateSnapshot>,
    selected_customer_id: Option<i64>,
}

impl Cart {
    /// Creates an empty cart with USD display.
    pub fn new() -> Self {
        Cart::default()
    }

    // -------------------------------------------------------------------------
    // Product lines
    // -------------------------------------------------------------------------

    /// Adds a product or raises the quantity of its existing line.
    ///
    /// Rejected (no-op + [`CoreError::InsufficientStock`]) when the
    /// resulting quantity would exceed the stock limit frozen on the
    /// snapshot.
    pub fn add_product(&mut self, product: &ProductSnapshot, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if let Some(CartLine::Product { product: p, quantity: q }) = self
            .lines
            .iter_mut()
            .find(|l| l.key() == LineKey::Product(product.id))
        {
            let requested = *q + quantity;
            if requested > p.stock_limit {
                return Err(CoreError::InsufficientStock {
                    name: p.name.clone(),
                    available: p.stock_limit,
                    requested,
                });
            }
            *q = requested;
            return Ok(());
        }

        if quantity > product.stock_limit {
            return Err(CoreError::InsufficientStock {
                name: product.name.clone(),
                available: product.stock_limit,
                requested: quantity,
            });
        }
        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge { max: MAX_CART_LINES });
        }

        self.lines.push(CartLine::Product {
            product: product.clone(),
            quantity,
        });
        Ok(())
    }

    /// Sets the quantity of a product line.
    ///
    /// `qty <= 0` removes the line; anything above the stock limit is
    /// clamped to it.
    pub fn set_quantity(&mut self, product_id: i64, qty: i64) -> CoreResult<()> {
        if qty <= 0 {
            return self.remove_line(LineKey::Product(product_id));
        }

        match self
            .lines
            .iter_mut()
            .find(|l| l.key() == LineKey::Product(product_id))
        {
            Some(CartLine::Product { product, quantity }) => {
                *quantity = qty.min(product.stock_limit);
                Ok(())
            }
            _ => Err(CoreError::LineNotFound(
                LineKey::Product(product_id).to_string(),
            )),
        }
    }

    // -------------------------------------------------------------------------
    // Service lines
    // -------------------------------------------------------------------------

    /// Adds a repair work order's remaining balance as a service line.
    ///
    /// Idempotent: re-adding the same work order returns `Ok(false)` and
    /// changes nothing, so a double tap cannot duplicate a balance. On
    /// first insert the repair's customer becomes the cart's selected
    /// customer, so a later partial payment already has its ledger.
    pub fn add_repair_balance(&mut self, repair: &RepairSnapshot) -> CoreResult<bool> {
        if self.lines.iter().any(|l| l.key() == LineKey::Service(repair.id)) {
            return Ok(false);
        }
        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge { max: MAX_CART_LINES });
        }

        self.selected_customer_id = Some(repair.customer_id);
        self.lines.push(CartLine::Service {
            repair: repair.clone(),
        });
        Ok(true)
    }

    // -------------------------------------------------------------------------
    // General operations
    // -------------------------------------------------------------------------

    /// Removes a line by identity.
    pub fn remove_line(&mut self, key: LineKey) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.key() != key);
        if self.lines.len() == before {
            return Err(CoreError::LineNotFound(key.to_string()));
        }
        Ok(())
    }

    /// Empties the cart and resets it to the defaults: no lines, no rate
    /// snapshot, no selected customer, USD display.
    pub fn clear(&mut self) {
        *self = Cart::default();
    }

    /// Presentation toggle only; the USD total is untouched.
    pub fn set_display_currency(&mut self, currency: Currency) {
        self.display_currency = currency;
    }

    pub fn display_currency(&self) -> Currency {
        self.display_currency
    }

    /// Selects (or deselects) the customer the sale is for.
    pub fn select_customer(&mut self, customer_id: Option<i64>) {
        self.selected_customer_id = customer_id;
    }

    pub fn selected_customer(&self) -> Option<i64> {
        self.selected_customer_id
    }

    // -------------------------------------------------------------------------
    // Rate snapshot (freeze-once)
    // -------------------------------------------------------------------------

    /// Captures the rate snapshot if none is held yet and returns the
    /// snapshot in force. A second capture before `clear()` is a no-op:
    /// the quoted total must not drift while the customer is paying,
    /// even if the authoritative rate changes mid-transaction.
    pub fn capture_rate(&mut self, snapshot: RateSnapshot) -> &RateSnapshot {
        self.rate_snapshot.get_or_insert(snapshot)
    }

    /// The frozen snapshot, if one has been captured.
    pub fn rate_snapshot(&self) -> Option<&RateSnapshot> {
        self.rate_snapshot.as_ref()
    }

    // -------------------------------------------------------------------------
    // Derived totals (never cached)
    // -------------------------------------------------------------------------

    /// Σ product subtotals + Σ service remaining balances, in USD.
    pub fn total_usd(&self) -> Money {
        self.lines.iter().map(CartLine::total).sum()
    }

    /// The product-lines share of the total.
    pub fn product_total_usd(&self) -> Money {
        self.lines
            .iter()
            .filter(|l| matches!(l, CartLine::Product { .. }))
            .map(CartLine::total)
            .sum()
    }

    /// The service-lines share of the total.
    pub fn service_total_usd(&self) -> Money {
        self.lines
            .iter()
            .filter(|l| matches!(l, CartLine::Service { .. }))
            .map(CartLine::total)
            .sum()
    }

    /// The total in VES. The frozen snapshot wins; the live rate is only
    /// used when nothing has been captured yet.
    pub fn total_ves(&self, live_rate: f64) -> Ves {
        let rate = self.rate_snapshot.as_ref().map_or(live_rate, |s| s.rate);
        self.total_usd().to_ves(rate)
    }

    /// Product lines as `(snapshot, quantity)` pairs, cart order.
    pub fn product_lines(&self) -> impl Iterator<Item = (&ProductSnapshot, i64)> {
        self.lines.iter().filter_map(|l| match l {
            CartLine::Product { product, quantity } => Some((product, *quantity)),
            CartLine::Service { .. } => None,
        })
    }

    /// Service lines, cart order.
    pub fn service_lines(&self) -> impl Iterator<Item = &RepairSnapshot> {
        self.lines.iter().filter_map(|l| match l {
            CartLine::Service { repair } => Some(repair),
            CartLine::Product { .. } => None,
        })
    }

    /// All lines, cart order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: i64, price_cents: i64, stock: i64) -> ProductSnapshot {
        ProductSnapshot {
            id,
            name: format!("Product {}", id),
            sku: Some(format!("SKU-{}", id)),
            unit_price_cents: price_cents,
            stock_limit: stock,
        }
    }

    fn repair(id: i64, customer_id: i64, balance_cents: i64) -> RepairSnapshot {
        RepairSnapshot {
            id,
            customer_id,
            customer_name: "Carlos Rondón".to_string(),
            brand: "Xiaomi".to_string(),
            model: "Redmi 9".to_string(),
            description: "Cambio de batería".to_string(),
            remaining_balance_cents: balance_cents,
            created_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_total_is_sum_of_both_line_kinds() {
        let mut cart = Cart::new();
        cart.add_product(&product(1, 1000, 10), 1).unwrap();
        cart.add_repair_balance(&repair(5, 3, 1500)).unwrap();

        assert_eq!(cart.total_usd().cents(), 2500);
        assert_eq!(cart.product_total_usd().cents(), 1000);
        assert_eq!(cart.service_total_usd().cents(), 1500);
        assert_eq!(cart.line_count(), 2);
    }

    #[test]
    fn test_add_same_product_raises_quantity() {
        let mut cart = Cart::new();
        let p = product(1, 999, 10);
        cart.add_product(&p, 2).unwrap();
        cart.add_product(&p, 3).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_usd().cents(), 999 * 5);
    }

    #[test]
    fn test_stock_limit_rejects_fourth_add() {
        // Scenario: stock_limit = 3, three adds succeed, the fourth is a no-op.
        let mut cart = Cart::new();
        let p = product(1, 500, 3);
        for _ in 0..3 {
            cart.add_product(&p, 1).unwrap();
        }

        let err = cart.add_product(&p, 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 3,
                requested: 4,
                ..
            }
        ));
        assert_eq!(cart.total_usd().cents(), 1500); // quantity stayed 3
    }

    #[test]
    fn test_set_quantity_clamps_and_removes() {
        let mut cart = Cart::new();
        cart.add_product(&product(1, 100, 5), 1).unwrap();

        cart.set_quantity(1, 99).unwrap();
        assert_eq!(cart.total_usd().cents(), 500); // clamped to stock 5

        cart.set_quantity(1, 0).unwrap();
        assert!(cart.is_empty());

        assert!(matches!(
            cart.set_quantity(1, 2),
            Err(CoreError::LineNotFound(_))
        ));
    }

    #[test]
    fn test_repair_add_is_idempotent_and_selects_customer() {
        let mut cart = Cart::new();
        let r = repair(5, 42, 1500);

        assert!(cart.add_repair_balance(&r).unwrap());
        assert_eq!(cart.selected_customer(), Some(42));

        // Second add: signalled no-op, balance not duplicated.
        assert!(!cart.add_repair_balance(&r).unwrap());
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_usd().cents(), 1500);
    }

    #[test]
    fn test_rate_snapshot_freezes_once() {
        let mut cart = Cart::new();
        let first = RateSnapshot::new(36.5, "BCV", Utc::now()).unwrap();
        let second = RateSnapshot::new(40.1, "Monitor", Utc::now()).unwrap();

        cart.capture_rate(first);
        let held = cart.capture_rate(second).clone();

        assert_eq!(held.rate, 36.5);
        assert_eq!(cart.rate_snapshot().unwrap().source, "BCV");
    }

    #[test]
    fn test_clear_releases_snapshot_and_resets_defaults() {
        let mut cart = Cart::new();
        cart.add_product(&product(1, 100, 5), 1).unwrap();
        cart.capture_rate(RateSnapshot::new(36.5, "BCV", Utc::now()).unwrap());
        cart.set_display_currency(Currency::Ves);
        cart.select_customer(Some(9));

        cart.clear();

        assert!(cart.is_empty());
        assert!(cart.rate_snapshot().is_none());
        assert_eq!(cart.display_currency(), Currency::Usd);
        assert_eq!(cart.selected_customer(), None);

        // A fresh capture is allowed again after clear().
        cart.capture_rate(RateSnapshot::new(40.1, "Monitor", Utc::now()).unwrap());
        assert_eq!(cart.rate_snapshot().unwrap().rate, 40.1);
    }

    #[test]
    fn test_currency_toggle_never_touches_totals() {
        let mut cart = Cart::new();
        cart.add_product(&product(1, 2500, 10), 1).unwrap();

        let before = cart.total_usd();
        cart.set_display_currency(Currency::Ves);
        assert_eq!(cart.total_usd(), before);
        cart.set_display_currency(Currency::Usd);
        assert_eq!(cart.total_usd(), before);
    }

    #[test]
    fn test_total_ves_prefers_snapshot_over_live_rate() {
        let mut cart = Cart::new();
        cart.add_product(&product(1, 2500, 10), 1).unwrap();

        // No snapshot yet: the live rate applies.
        assert_eq!(cart.total_ves(40.0).cents(), 100_000);

        cart.capture_rate(RateSnapshot::new(36.5, "BCV", Utc::now()).unwrap());
        // Snapshot frozen: the live rate no longer matters.
        assert_eq!(cart.total_ves(40.0).cents(), 91_250);
    }

    #[test]
    fn test_remove_line_by_kind() {
        let mut cart = Cart::new();
        cart.add_product(&product(7, 100, 5), 1).unwrap();
        cart.add_repair_balance(&repair(7, 1, 900)).unwrap();

        // Same id, different kind: only the product goes.
        cart.remove_line(LineKey::Product(7)).unwrap();
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_usd().cents(), 900);

        assert!(cart.remove_line(LineKey::Product(7)).is_err());
    }
}
