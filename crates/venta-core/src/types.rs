//! # Domain Types
//!
//! Core domain types shared by the cart, checkout and drawer modules.
//!
//! ## Snapshot pattern
//! Cart lines never hold live references into the catalog: adding a
//! product or a repair order copies the fields that matter into a
//! `*Snapshot` struct, so the cart keeps displaying consistent data even
//! if the backend record changes while the operator is mid-sale.
//!
//! All monetary fields are integer cents (see [`crate::money`]); the
//! structs expose typed accessors so call sites never do raw arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, Ves};

// =============================================================================
// Currency & Payment Method
// =============================================================================

/// The two currencies the terminal deals in.
///
/// USD is the settlement currency; VES is display/tender only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Ves,
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Usd
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash in either currency.
    Cash,
    /// Card terminal / debit.
    Card,
    /// Mobile payment (pago móvil) or bank transfer.
    Transfer,
    /// Split across methods; recorded as a single amount here.
    Mixed,
}

// =============================================================================
// Product Snapshot
// =============================================================================

/// Catalog data frozen into a cart line at add time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSnapshot {
    /// Backend-issued product id.
    pub id: i64,

    /// Display name shown to the cashier and on the ticket.
    pub name: String,

    /// Optional SKU.
    pub sku: Option<String>,

    /// Unit price in USD cents at time of adding (frozen).
    pub unit_price_cents: i64,

    /// Units available when the line was created. The cart refuses to
    /// grow a line past this; the backend re-checks at submission.
    pub stock_limit: i64,
}

impl ProductSnapshot {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

// =============================================================================
// Repair Snapshot
// =============================================================================

/// An outstanding repair-service balance, frozen into a cart line.
///
/// Exactly one unit; the amount owed is whatever balance remains on the
/// work order, not a unit price times quantity.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RepairSnapshot {
    /// Backend-issued work order id.
    pub id: i64,

    /// Owner of the device; auto-selected on the cart when the line is
    /// added so a partial payment has a ledger to land on.
    pub customer_id: i64,

    pub customer_name: String,

    /// Device make/model, for the ticket and the warranty notice.
    pub brand: String,
    pub model: String,

    /// Work description.
    pub description: String,

    /// Balance still owed on the work order, in USD cents.
    pub remaining_balance_cents: i64,

    /// When the device came in (shown on the delivery ticket).
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

impl RepairSnapshot {
    /// Returns the remaining balance as Money.
    #[inline]
    pub fn remaining_balance(&self) -> Money {
        Money::from_cents(self.remaining_balance_cents)
    }

    /// "Brand Model" label for tickets and notifications.
    pub fn device(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer as the directory gateway reports them.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,

    /// Outstanding ledger debt in USD cents.
    pub current_debt_cents: i64,
}

impl Customer {
    #[inline]
    pub fn current_debt(&self) -> Money {
        Money::from_cents(self.current_debt_cents)
    }
}

// =============================================================================
// Sale Record
// =============================================================================

/// The persisted transaction the sale gateway returns on success.
///
/// The backend owns stock deduction and ledger posting; this is a
/// read-back of what it committed.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRecord {
    pub id: i64,

    /// Transaction total in USD cents.
    pub total_cents: i64,

    /// Amount settled at creation, USD cents.
    pub amount_paid_cents: i64,

    /// Balance the backend posted to the customer ledger, USD cents.
    pub pending_balance_cents: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleRecord {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn pending_balance(&self) -> Money {
        Money::from_cents(self.pending_balance_cents)
    }
}

// =============================================================================
// Cash Session
// =============================================================================

/// Lifecycle of a drawer session: one cycle per shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Closed,
}

/// One shift's cash-drawer custody period.
///
/// `expected_*` amounts are computed by the backend from the transactions
/// posted during the session and are treated as trusted input here — the
/// authoritative ledger lives server-side. The `shortage_*`/`overage_*`
/// fields are only present once the session is closed.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashSession {
    pub id: i64,

    /// Human-readable shift code (e.g. "CS-20260829-01").
    pub session_code: String,

    pub cashier_name: Option<String>,

    pub status: SessionStatus,

    /// Opening float, per currency (cents).
    pub opening_usd_cents: i64,
    pub opening_ves_cents: i64,

    /// Expected drawer contents at close, per currency (cents).
    pub expected_usd_cents: i64,
    pub expected_ves_cents: i64,

    /// Physically counted at close.
    pub actual_usd_cents: Option<i64>,
    pub actual_ves_cents: Option<i64>,

    /// Recorded at close for reporting: `shortage = max(0, -variance)`,
    /// `overage = max(0, variance)` per currency.
    pub shortage_usd_cents: Option<i64>,
    pub overage_usd_cents: Option<i64>,
    pub shortage_ves_cents: Option<i64>,
    pub overage_ves_cents: Option<i64>,

    /// Justification note, mandatory above the variance threshold.
    pub notes: Option<String>,

    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl CashSession {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    #[inline]
    pub fn opening_usd(&self) -> Money {
        Money::from_cents(self.opening_usd_cents)
    }

    #[inline]
    pub fn opening_ves(&self) -> Ves {
        Ves::from_cents(self.opening_ves_cents)
    }

    #[inline]
    pub fn expected_usd(&self) -> Money {
        Money::from_cents(self.expected_usd_cents)
    }

    #[inline]
    pub fn expected_ves(&self) -> Ves {
        Ves::from_cents(self.expected_ves_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_default_is_settlement() {
        assert_eq!(Currency::default(), Currency::Usd);
    }

    #[test]
    fn test_repair_device_label() {
        let repair = RepairSnapshot {
            id: 7,
            customer_id: 3,
            customer_name: "María Pérez".to_string(),
            brand: "Samsung".to_string(),
            model: "A52".to_string(),
            description: "Cambio de pantalla".to_string(),
            remaining_balance_cents: 1500,
            created_at: None,
        };
        assert_eq!(repair.device(), "Samsung A52");
        assert_eq!(repair.remaining_balance().cents(), 1500);
    }

    #[test]
    fn test_payment_method_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Transfer).unwrap(),
            "\"transfer\""
        );
        assert_eq!(serde_json::to_string(&Currency::Ves).unwrap(), "\"VES\"");
    }
}
