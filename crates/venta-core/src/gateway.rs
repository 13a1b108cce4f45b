//! # Gateway Contracts
//!
//! The four external collaborators the checkout/drawer core consumes,
//! specified as async traits: shapes only, no transport detail. The
//! `venta-client` crate implements them over REST; tests implement them
//! in memory.
//!
//! Everything that may suspend in this system is behind one of these
//! traits — the core itself never does I/O.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::GatewayResult;
use crate::money::{Money, Ves};
use crate::rate::RateSnapshot;
use crate::types::{CashSession, Currency, Customer, PaymentMethod, SaleRecord};

// =============================================================================
// Sale Submission DTOs
// =============================================================================

/// One product position of a sale submission. Quantities only; the
/// backend re-reads prices and performs the stock deduction itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItemRequest {
    pub product_id: i64,
    pub quantity: i64,
}

/// A finalized transaction, ready for the backend to persist.
///
/// `amount_paid` is always USD — the settlement currency — even when the
/// customer physically tendered bolívares; `payment_currency` records
/// what actually went into the drawer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRequest {
    /// Required whenever the sale extends credit.
    pub customer_id: Option<i64>,

    pub items: Vec<SaleItemRequest>,

    /// Work orders whose remaining balances this sale settles.
    pub repair_ids: Vec<i64>,

    pub payment_method: PaymentMethod,
    pub payment_currency: Currency,

    /// Amount settled now, in USD cents.
    pub amount_paid_cents: i64,

    pub notes: Option<String>,
}

// =============================================================================
// Gateway Traits
// =============================================================================

/// Supplies the current authoritative USD→VES conversion rate.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn current_rate(&self) -> GatewayResult<RateSnapshot>;
}

/// Persists a finalized transaction: stock deduction, ledger posting,
/// drawer attribution all happen behind this call.
///
/// May fail with a validation rejection (e.g. insufficient stock at
/// commit time); the core surfaces it but never attempts to resolve it.
#[async_trait]
pub trait SaleGateway: Send + Sync {
    async fn create_sale(&self, request: &SaleRequest) -> GatewayResult<SaleRecord>;
}

/// Customer lookup/search, consulted only when a partial payment is in
/// play.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn get_customer(&self, id: i64) -> GatewayResult<Customer>;
    async fn search_customers(&self, query: &str) -> GatewayResult<Vec<Customer>>;
}

/// Drawer session lifecycle. Expected amounts are computed server-side
/// from the transactions posted during the session.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    async fn open_session(&self, opening_usd: Money, opening_ves: Ves)
        -> GatewayResult<CashSession>;

    /// The session currently open for this terminal, if any.
    async fn active_session(&self) -> GatewayResult<Option<CashSession>>;

    async fn close_session(
        &self,
        actual_usd: Money,
        actual_ves: Ves,
        notes: Option<&str>,
    ) -> GatewayResult<CashSession>;

    async fn list_sessions(&self) -> GatewayResult<Vec<CashSession>>;
}
