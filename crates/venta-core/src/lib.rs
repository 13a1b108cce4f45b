//! # Venta Core
//!
//! Pure business logic for the point-of-sale terminal: cart composition,
//! dual-currency settlement and cash-drawer reconciliation.
//!
//! ## Design Principles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  1. No I/O here. Every external collaborator (rates, sales,         │
//! │     customers, sessions) is an async trait in `gateway`;            │
//! │     `venta-client` implements them over REST, tests in memory.      │
//! │                                                                     │
//! │  2. Integer cents everywhere. USD is the settlement currency;       │
//! │     VES exists for display and physical tender, derived through     │
//! │     a rate snapshot frozen per cart.                                │
//! │                                                                     │
//! │  3. Failures are recoverable. A rejected submission or close        │
//! │     leaves its aggregate intact; only a settled sale or a closed    │
//! │     session is irreversible.                                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Map
//! - [`money`] — `Money` (USD cents) and `Ves` (céntimos), rate crossings
//! - [`types`] — snapshots, customers, sale records, cash sessions
//! - [`rate`] — the freeze-once exchange-rate snapshot
//! - [`cart`] — the cart aggregate and its line rules
//! - [`state`] — shared observable cart handle
//! - [`checkout`] — tender evaluation and the submission state machine
//! - [`session`] — drawer lifecycle and close reconciliation
//! - [`gateway`] — the async contracts the outside world implements
//! - [`validation`] / [`error`] — input checks and the error taxonomy

pub mod cart;
pub mod checkout;
pub mod error;
pub mod gateway;
pub mod money;
pub mod rate;
pub mod session;
pub mod state;
pub mod types;
pub mod validation;

pub use cart::{Cart, CartLine, LineKey};
pub use checkout::{BlockedReason, CheckoutFlow, CheckoutPhase, EvaluatedTender, Settlement};
pub use error::{CoreError, CoreResult, GatewayError, GatewayResult, ValidationError};
pub use gateway::{
    CustomerDirectory, RateProvider, SaleGateway, SaleItemRequest, SaleRequest, SessionGateway,
};
pub use money::{Money, Ves};
pub use rate::{RateSnapshot, FALLBACK_RATE};
pub use session::{reconcile, DrawerService, Reconciliation};
pub use state::{CartState, CartView};
pub use types::{
    CashSession, Currency, Customer, PaymentMethod, ProductSnapshot, RepairSnapshot, SaleRecord,
    SessionStatus,
};

// =============================================================================
// Business Constants
// =============================================================================

/// Pending debt at or below this many USD cents is rounding dust from a
/// rate crossing, not real credit.
pub const DEBT_EPSILON_CENTS: i64 = 1;

/// Close-time variance (per currency, USD-normalized) above this many
/// cents demands a justification note. $5.00.
pub const VARIANCE_NOTE_THRESHOLD_CENTS: i64 = 500;

/// Hard cap on distinct cart lines.
pub const MAX_CART_LINES: usize = 100;

/// Hard cap on a single line's quantity, to catch typing errors.
pub const MAX_LINE_QUANTITY: i64 = 999;
