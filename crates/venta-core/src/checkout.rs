//! # Checkout Flow
//!
//! Drives a cart from composition to a settled sale:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Composing ──propose──▶ Proposing ──submit──▶ Submitting            │
//! │      ▲                     │   ▲                  │                 │
//! │      │                     ▼   │ (re-propose)     ├──ok──▶ Settled  │
//! │   cancel                 Blocked                  └──err─▶ Failed   │
//! │                                                                     │
//! │  Blocked   = credit would be extended but no customer is selected   │
//! │  Submitting = the in-flight guard: a second submit is rejected,     │
//! │               never queued                                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Settlement rules
//! - Every debt figure is computed in USD cents; a VES tender crosses the
//!   rate exactly once, at proposal time.
//! - `pending = max(0, total − tendered_usd)`; one cent or less of
//!   pending is treated as fully paid (rate rounding dust, not credit).
//! - Extending any real credit requires a selected customer to post the
//!   debt against.
//! - A failed submission leaves the cart and the phase recoverable; a
//!   settled one clears the cart and releases the rate snapshot.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::gateway::{CustomerDirectory, RateProvider, SaleGateway, SaleItemRequest, SaleRequest};
use crate::money::{Money, Ves};
use crate::rate::RateSnapshot;
use crate::session::DrawerService;
use crate::state::CartState;
use crate::types::{Currency, Customer, PaymentMethod, RepairSnapshot, SaleRecord};
use crate::validation::{validate_notes, validate_search_query, validate_tendered_cents};
use crate::DEBT_EPSILON_CENTS;

// =============================================================================
// Phase
// =============================================================================

/// Where the checkout currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    /// Lines are being added/removed; no tender evaluated yet.
    Composing,
    /// A tender has been evaluated and is awaiting submission.
    Proposing,
    /// Submission refused: credit needs a customer first.
    Blocked,
    /// The sale is on the wire. Nothing else may happen until it lands.
    Submitting,
    /// The backend committed the sale; the cart has been cleared.
    Settled,
    /// The backend rejected or the call failed; cart intact.
    Failed,
}

impl fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckoutPhase::Composing => "composing",
            CheckoutPhase::Proposing => "proposing",
            CheckoutPhase::Blocked => "blocked",
            CheckoutPhase::Submitting => "submitting",
            CheckoutPhase::Settled => "settled",
            CheckoutPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a submission is blocked (queried by the UI to direct the
/// operator, distinct from the error that rejected the submit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BlockedReason {
    /// Credit would be extended but no customer is selected.
    CustomerRequired,
}

// =============================================================================
// Evaluated Tender
// =============================================================================

/// A tender offer evaluated against the cart: what the customer hands
/// over, normalized to the settlement currency, and what (if anything)
/// becomes ledger debt.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EvaluatedTender {
    /// Currency the cash/transfer physically arrives in.
    pub currency: Currency,

    /// Raw tendered amount in `currency`'s smallest unit.
    pub tendered_cents: i64,

    pub method: PaymentMethod,
    pub notes: Option<String>,

    /// The cart total the evaluation ran against. Submission refuses to
    /// proceed if the cart's total has since moved off this basis.
    pub total_usd: Money,

    /// The tender normalized to USD through the frozen rate.
    pub tendered_usd: Money,

    /// `max(0, total − tendered_usd)`. Whatever is here becomes customer
    /// ledger debt on submission.
    pub pending_debt: Money,

    /// True when `pending_debt` is real credit (more than rounding dust).
    pub is_partial: bool,

    /// The rate the conversion used (the cart's frozen snapshot).
    pub rate: f64,
}

/// What a successful submission produced.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub sale: SaleRecord,
    pub total: Money,
    pub pending_debt: Money,

    /// Whether this sale posted debt to the customer ledger.
    pub extended_credit: bool,

    /// The customer's total ledger debt after this sale, when credit was
    /// extended and the directory answered. Informational only.
    pub projected_customer_debt: Option<Money>,

    /// Work orders settled in full by this sale: their devices are now
    /// ready to hand back to the customer.
    pub delivered_repairs: Vec<RepairSnapshot>,
}

// =============================================================================
// Checkout Flow
// =============================================================================

/// The checkout orchestrator. Owns the phase machine and the evaluated
/// tender; mutates the cart only on settlement.
///
/// Clones share state, so a UI task and a submission task see the same
/// phase.
#[derive(Clone)]
pub struct CheckoutFlow {
    cart: CartState,
    drawer: DrawerService,
    rates: Arc<dyn RateProvider>,
    sales: Arc<dyn SaleGateway>,
    customers: Arc<dyn CustomerDirectory>,

    phase: Arc<Mutex<CheckoutPhase>>,
    proposal: Arc<Mutex<Option<EvaluatedTender>>>,
}

impl CheckoutFlow {
    pub fn new(
        cart: CartState,
        drawer: DrawerService,
        rates: Arc<dyn RateProvider>,
        sales: Arc<dyn SaleGateway>,
        customers: Arc<dyn CustomerDirectory>,
    ) -> Self {
        CheckoutFlow {
            cart,
            drawer,
            rates,
            sales,
            customers,
            phase: Arc::new(Mutex::new(CheckoutPhase::Composing)),
            proposal: Arc::new(Mutex::new(None)),
        }
    }

    pub fn phase(&self) -> CheckoutPhase {
        *self.phase.lock().expect("Phase mutex poisoned")
    }

    /// The current evaluated tender, if any.
    pub fn proposal(&self) -> Option<EvaluatedTender> {
        self.proposal.lock().expect("Proposal mutex poisoned").clone()
    }

    /// Why the last submit was blocked, if the checkout is blocked.
    pub fn blocked_reason(&self) -> Option<BlockedReason> {
        if self.phase() != CheckoutPhase::Blocked {
            return None;
        }
        Some(BlockedReason::CustomerRequired)
    }

    fn set_phase(&self, phase: CheckoutPhase) {
        *self.phase.lock().expect("Phase mutex poisoned") = phase;
    }

    // -------------------------------------------------------------------------
    // Propose
    // -------------------------------------------------------------------------

    /// Evaluates a tender against the cart and moves to `Proposing`.
    ///
    /// May be called repeatedly to amend the offer (different amount,
    /// currency or method) until submission. The first proposal freezes
    /// the cart's rate snapshot; amendments reuse it, so the quoted
    /// conversion cannot drift between offers.
    ///
    /// Local rejections: no open session, empty cart, negative tender,
    /// submission already in flight.
    pub async fn propose(
        &self,
        currency: Currency,
        tendered_cents: i64,
        method: PaymentMethod,
        notes: &str,
    ) -> CoreResult<EvaluatedTender> {
        if self.phase() == CheckoutPhase::Submitting {
            return Err(CoreError::SubmissionInFlight);
        }
        if !self.drawer.is_open() {
            return Err(CoreError::SessionNotOpen);
        }
        if self.cart.with_cart(|c| c.is_empty()) {
            return Err(CoreError::EmptyCart);
        }
        validate_tendered_cents(tendered_cents)?;
        let notes = validate_notes(notes)?;

        let snapshot = self.frozen_rate().await;
        let rate = snapshot.rate;

        let total = self.cart.with_cart(|c| c.total_usd());
        let tendered_usd = match currency {
            Currency::Usd => Money::from_cents(tendered_cents),
            Currency::Ves => Ves::from_cents(tendered_cents).to_usd(rate),
        };
        let pending = Money::from_cents((total - tendered_usd).cents().max(0));
        let is_partial = pending.cents() > DEBT_EPSILON_CENTS;

        let tender = EvaluatedTender {
            currency,
            tendered_cents,
            method,
            notes,
            total_usd: total,
            tendered_usd,
            pending_debt: pending,
            is_partial,
            rate,
        };

        debug!(
            total = %total,
            tendered_usd = %tendered_usd,
            pending = %pending,
            is_partial,
            rate,
            "tender evaluated"
        );

        *self.proposal.lock().expect("Proposal mutex poisoned") = Some(tender.clone());
        self.set_phase(CheckoutPhase::Proposing);
        Ok(tender)
    }

    /// The cart's frozen snapshot, capturing one now if this is the first
    /// proposal. A provider failure falls back to the last resort rate
    /// rather than blocking the sale.
    async fn frozen_rate(&self) -> RateSnapshot {
        if let Some(snapshot) = self.cart.with_cart(|c| c.rate_snapshot().cloned()) {
            return snapshot;
        }

        let fresh = match self.rates.current_rate().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "rate provider unavailable, using fallback rate");
                RateSnapshot::fallback()
            }
        };
        self.cart.with_cart_mut(|c| c.capture_rate(fresh).clone())
    }

    /// Searches the customer directory, e.g. to attach a customer to a
    /// blocked partial sale. The query is validated and trimmed before
    /// anything reaches the network.
    pub async fn search_customers(&self, query: &str) -> CoreResult<Vec<Customer>> {
        let query = validate_search_query(query)?;
        Ok(self.customers.search_customers(&query).await?)
    }

    /// Overrides the partial-payment flag on the current proposal.
    ///
    /// Evaluation defaults the flag from the pending debt; the operator
    /// may override it, e.g. to record an intentional write-off as a
    /// non-credit sale. The backend still sees the real amounts.
    pub fn set_partial(&self, is_partial: bool) -> CoreResult<EvaluatedTender> {
        let phase = self.phase();
        if phase == CheckoutPhase::Submitting {
            return Err(CoreError::SubmissionInFlight);
        }

        let mut guard = self.proposal.lock().expect("Proposal mutex poisoned");
        let proposal = guard.as_mut().ok_or(CoreError::InvalidPhase {
            action: "set the partial flag",
            phase: phase.to_string(),
        })?;
        proposal.is_partial = is_partial;
        Ok(proposal.clone())
    }

    // -------------------------------------------------------------------------
    // Submit
    // -------------------------------------------------------------------------

    /// Submits the proposed sale.
    ///
    /// Phase guards come first: a second submit while one is in flight is
    /// rejected outright. Next the staleness check: if the cart's total
    /// has moved off the evaluated basis the proposal is withdrawn, so a
    /// line added after the quote can never ride on the old tender. Then
    /// the credit gate: real pending debt (more than rounding dust) on a
    /// partial sale with no selected customer blocks the checkout. Past
    /// all three, the phase flips to `Submitting` before anything awaits,
    /// so the guard holds across the whole call.
    ///
    /// On success the cart is cleared (releasing the rate snapshot) and
    /// the settlement reports delivered repairs and the customer's
    /// projected debt. On failure the cart is untouched and the operator
    /// may re-propose.
    pub async fn submit(&self) -> CoreResult<Settlement> {
        let proposal = {
            let mut phase = self.phase.lock().expect("Phase mutex poisoned");
            match *phase {
                CheckoutPhase::Submitting => return Err(CoreError::SubmissionInFlight),
                CheckoutPhase::Proposing | CheckoutPhase::Blocked => {}
                other => {
                    return Err(CoreError::InvalidPhase {
                        action: "submit",
                        phase: other.to_string(),
                    })
                }
            }

            let proposal = self
                .proposal
                .lock()
                .expect("Proposal mutex poisoned")
                .clone()
                .ok_or(CoreError::InvalidPhase {
                    action: "submit",
                    phase: "composing".to_string(),
                })?;

            if self.cart.with_cart(|c| c.total_usd()) != proposal.total_usd {
                warn!(
                    evaluated = %proposal.total_usd,
                    "cart changed after tender evaluation, proposal withdrawn"
                );
                *self.proposal.lock().expect("Proposal mutex poisoned") = None;
                *phase = CheckoutPhase::Composing;
                return Err(CoreError::StaleProposal);
            }

            let extends_credit =
                proposal.is_partial && proposal.pending_debt.cents() > DEBT_EPSILON_CENTS;
            if extends_credit && self.cart.with_cart(|c| c.selected_customer()).is_none() {
                *phase = CheckoutPhase::Blocked;
                return Err(CoreError::CustomerRequired);
            }

            *phase = CheckoutPhase::Submitting;
            proposal
        };

        let (request, total, repairs) = self.cart.with_cart(|cart| {
            let items = cart
                .product_lines()
                .map(|(p, q)| SaleItemRequest {
                    product_id: p.id,
                    quantity: q,
                })
                .collect();
            let repairs: Vec<RepairSnapshot> = cart.service_lines().cloned().collect();
            let total = cart.total_usd();
            let request = SaleRequest {
                customer_id: cart.selected_customer(),
                items,
                repair_ids: repairs.iter().map(|r| r.id).collect(),
                payment_method: proposal.method,
                payment_currency: proposal.currency,
                amount_paid_cents: (total - proposal.pending_debt).cents(),
                notes: proposal.notes.clone(),
            };
            (request, total, repairs)
        });

        let sale = match self.sales.create_sale(&request).await {
            Ok(sale) => sale,
            Err(err) => {
                warn!(error = %err, "sale submission failed, cart preserved");
                *self.proposal.lock().expect("Proposal mutex poisoned") = None;
                self.set_phase(CheckoutPhase::Failed);
                return Err(err.into());
            }
        };

        let extended_credit =
            proposal.is_partial && proposal.pending_debt.cents() > DEBT_EPSILON_CENTS;
        let projected_customer_debt = if extended_credit {
            match request.customer_id {
                // The directory read is informational; its failure never
                // unwinds a committed sale.
                Some(id) => match self.customers.get_customer(id).await {
                    Ok(customer) => Some(customer.current_debt()),
                    Err(err) => {
                        warn!(customer_id = id, error = %err, "could not read back customer debt");
                        None
                    }
                },
                None => None,
            }
        } else {
            None
        };

        // Fully settled work orders mean the devices go home with the
        // customer now. Keyed on the actual remaining debt, not the
        // partial flag: a flagged-but-fully-paid sale still delivers.
        let delivered_repairs = if proposal.pending_debt.cents() > DEBT_EPSILON_CENTS {
            Vec::new()
        } else {
            repairs
        };

        self.cart.with_cart_mut(|c| c.clear());
        *self.proposal.lock().expect("Proposal mutex poisoned") = None;
        self.set_phase(CheckoutPhase::Settled);

        info!(
            sale_id = sale.id,
            total = %total,
            pending = %proposal.pending_debt,
            extended_credit,
            delivered = delivered_repairs.len(),
            "sale settled"
        );

        Ok(Settlement {
            sale,
            total,
            pending_debt: proposal.pending_debt,
            extended_credit,
            projected_customer_debt,
            delivered_repairs,
        })
    }

    // -------------------------------------------------------------------------
    // Cancel / reset
    // -------------------------------------------------------------------------

    /// Withdraws the proposal and returns to `Composing`. The cart is
    /// untouched. Refused while a submission is in flight.
    pub fn cancel(&self) -> CoreResult<()> {
        let mut phase = self.phase.lock().expect("Phase mutex poisoned");
        if *phase == CheckoutPhase::Submitting {
            return Err(CoreError::SubmissionInFlight);
        }
        *self.proposal.lock().expect("Proposal mutex poisoned") = None;
        *phase = CheckoutPhase::Composing;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
