//! REST implementations of the core gateway contracts.
//!
//! ## Wire format
//! The backend speaks decimal money: amounts travel as strings like
//! `"25.00"` (occasionally bare numbers). The core speaks integer cents.
//! Conversion happens here, at the edge, in both directions — string
//! decimals are parsed digit-wise, never through `f64`, so `"0.10"` is
//! exactly 10 cents.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use venta_core::{
    CashSession, Customer, CustomerDirectory, GatewayError, GatewayResult, Money, RateProvider,
    RateSnapshot, SaleGateway, SaleRecord, SaleRequest, SessionGateway, SessionStatus, Ves,
};

use crate::client::ApiClient;
use crate::error::ClientError;

// =============================================================================
// Decimal <-> cents
// =============================================================================

/// A decimal amount as the backend serializes it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum DecimalWire {
    Text(String),
    Number(f64),
}

impl DecimalWire {
    fn to_cents(&self) -> Result<i64, ClientError> {
        match self {
            DecimalWire::Text(s) => decimal_str_to_cents(s)
                .ok_or_else(|| ClientError::Transport(format!("unparseable amount: {s:?}"))),
            DecimalWire::Number(n) => Ok((n * 100.0).round() as i64),
        }
    }

    fn to_rate(&self) -> Result<f64, ClientError> {
        match self {
            DecimalWire::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ClientError::Transport(format!("unparseable rate: {s:?}"))),
            DecimalWire::Number(n) => Ok(*n),
        }
    }
}

/// Parses `"-123.45"` to -12345 without a float crossing. At most two
/// fraction digits are read; anything deeper is beyond the backend's
/// precision and ignored.
pub(crate) fn decimal_str_to_cents(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if s.is_empty() {
        return None;
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };

    let int: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };

    let mut frac: i64 = 0;
    for (i, c) in frac_part.chars().take(2).enumerate() {
        let digit = c.to_digit(10)? as i64;
        frac += digit * if i == 0 { 10 } else { 1 };
    }
    if !frac_part.chars().all(|c| c.is_ascii_digit()) && !frac_part.is_empty() {
        return None;
    }

    let cents = int.checked_mul(100)?.checked_add(frac)?;
    Some(if negative { -cents } else { cents })
}

/// Formats cents as the backend expects: `1370` → `"13.70"`.
pub(crate) fn cents_to_decimal(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, (cents / 100).abs(), (cents % 100).abs())
}

// =============================================================================
// Exchange rate
// =============================================================================

#[derive(Debug, Deserialize)]
struct ExchangeRateWire {
    rate: DecimalWire,
    source: String,
}

#[async_trait]
impl RateProvider for ApiClient {
    async fn current_rate(&self) -> GatewayResult<RateSnapshot> {
        let wire: ExchangeRateWire = self
            .get("finance/exchange-rates/current/")
            .await
            .map_err(GatewayError::from)?;

        let rate = wire.rate.to_rate().map_err(GatewayError::from)?;
        debug!(rate, source = %wire.source, "fetched exchange rate");

        // captured_at is when THIS terminal took the figure, not the
        // backend's effective date.
        RateSnapshot::new(rate, wire.source, Utc::now())
            .map_err(|err| GatewayError::Rejected(err.to_string()))
    }
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Serialize)]
struct SaleItemWire {
    product_id: i64,
    quantity: i64,
}

#[derive(Debug, Serialize)]
struct SaleRequestWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_id: Option<i64>,
    items: Vec<SaleItemWire>,
    repair_ids: Vec<i64>,
    payment_method: String,
    payment_currency: String,
    amount_paid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl SaleRequestWire {
    fn from_core(request: &SaleRequest) -> Result<Self, ClientError> {
        Ok(SaleRequestWire {
            customer_id: request.customer_id,
            items: request
                .items
                .iter()
                .map(|i| SaleItemWire {
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect(),
            repair_ids: request.repair_ids.clone(),
            payment_method: enum_wire_name(&request.payment_method)?,
            payment_currency: enum_wire_name(&request.payment_currency)?,
            amount_paid: cents_to_decimal(request.amount_paid_cents),
            notes: request.notes.clone(),
        })
    }
}

/// Serde already knows each enum's wire spelling; reuse it instead of
/// duplicating the names here.
fn enum_wire_name<T: Serialize>(value: &T) -> Result<String, ClientError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        _ => Err(ClientError::Transport("unserializable enum".to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct SaleWire {
    id: i64,
    total_amount: DecimalWire,
    amount_paid: DecimalWire,
    pending_balance: DecimalWire,
    created_at: DateTime<Utc>,
}

impl SaleWire {
    fn into_core(self) -> Result<SaleRecord, ClientError> {
        Ok(SaleRecord {
            id: self.id,
            total_cents: self.total_amount.to_cents()?,
            amount_paid_cents: self.amount_paid.to_cents()?,
            pending_balance_cents: self.pending_balance.to_cents()?,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl SaleGateway for ApiClient {
    async fn create_sale(&self, request: &SaleRequest) -> GatewayResult<SaleRecord> {
        let wire = SaleRequestWire::from_core(request).map_err(GatewayError::from)?;
        let response: SaleWire = self
            .post("sales/", &wire)
            .await
            .map_err(GatewayError::from)?;
        response.into_core().map_err(GatewayError::from)
    }
}

// =============================================================================
// Customers
// =============================================================================

#[derive(Debug, Deserialize)]
struct CustomerWire {
    id: i64,
    name: String,
    phone: Option<String>,
    current_debt: DecimalWire,
}

impl CustomerWire {
    fn into_core(self) -> Result<Customer, ClientError> {
        Ok(Customer {
            id: self.id,
            name: self.name,
            phone: self.phone,
            current_debt_cents: self.current_debt.to_cents()?,
        })
    }
}

/// Listing endpoints answer either a bare array or a paginated envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Plain(Vec<T>),
    Paginated { results: Vec<T> },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Plain(items) => items,
            Listing::Paginated { results } => results,
        }
    }
}

#[async_trait]
impl CustomerDirectory for ApiClient {
    async fn get_customer(&self, id: i64) -> GatewayResult<Customer> {
        let wire: CustomerWire = self
            .get(&format!("customers/{id}/"))
            .await
            .map_err(GatewayError::from)?;
        wire.into_core().map_err(GatewayError::from)
    }

    async fn search_customers(&self, query: &str) -> GatewayResult<Vec<Customer>> {
        let listing: Listing<CustomerWire> = self
            .get_with_query("customers/", &[("search", query)])
            .await
            .map_err(GatewayError::from)?;

        listing
            .into_vec()
            .into_iter()
            .map(|w| w.into_core().map_err(GatewayError::from))
            .collect()
    }
}

// =============================================================================
// Cash sessions
// =============================================================================

#[derive(Debug, Deserialize)]
struct SessionWire {
    id: i64,
    session_code: String,
    cashier_name: Option<String>,
    status: String,
    opening_amount_usd: DecimalWire,
    opening_amount_ves: DecimalWire,
    expected_amount_usd: DecimalWire,
    expected_amount_ves: DecimalWire,
    actual_amount_usd: Option<DecimalWire>,
    actual_amount_ves: Option<DecimalWire>,
    shortage_usd: Option<DecimalWire>,
    overage_usd: Option<DecimalWire>,
    shortage_ves: Option<DecimalWire>,
    overage_ves: Option<DecimalWire>,
    notes: Option<String>,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

fn optional_cents(wire: Option<DecimalWire>) -> Result<Option<i64>, ClientError> {
    wire.map(|w| w.to_cents()).transpose()
}

impl SessionWire {
    fn into_core(self) -> Result<CashSession, ClientError> {
        let status = match self.status.as_str() {
            "open" => SessionStatus::Open,
            "closed" => SessionStatus::Closed,
            other => {
                return Err(ClientError::Transport(format!(
                    "unknown session status: {other:?}"
                )))
            }
        };

        Ok(CashSession {
            id: self.id,
            session_code: self.session_code,
            cashier_name: self.cashier_name,
            status,
            opening_usd_cents: self.opening_amount_usd.to_cents()?,
            opening_ves_cents: self.opening_amount_ves.to_cents()?,
            expected_usd_cents: self.expected_amount_usd.to_cents()?,
            expected_ves_cents: self.expected_amount_ves.to_cents()?,
            actual_usd_cents: optional_cents(self.actual_amount_usd)?,
            actual_ves_cents: optional_cents(self.actual_amount_ves)?,
            shortage_usd_cents: optional_cents(self.shortage_usd)?,
            overage_usd_cents: optional_cents(self.overage_usd)?,
            shortage_ves_cents: optional_cents(self.shortage_ves)?,
            overage_ves_cents: optional_cents(self.overage_ves)?,
            notes: self.notes,
            opened_at: self.opened_at,
            closed_at: self.closed_at,
        })
    }
}

#[derive(Debug, Serialize)]
struct OpenSessionWire {
    opening_amount_usd: String,
    opening_amount_ves: String,
}

#[derive(Debug, Serialize)]
struct CloseSessionWire {
    actual_amount_usd: String,
    actual_amount_ves: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

#[async_trait]
impl SessionGateway for ApiClient {
    async fn open_session(
        &self,
        opening_usd: Money,
        opening_ves: Ves,
    ) -> GatewayResult<CashSession> {
        let body = OpenSessionWire {
            opening_amount_usd: cents_to_decimal(opening_usd.cents()),
            opening_amount_ves: cents_to_decimal(opening_ves.cents()),
        };
        let wire: SessionWire = self
            .post("finance/cash-sessions/open/", &body)
            .await
            .map_err(GatewayError::from)?;
        wire.into_core().map_err(GatewayError::from)
    }

    async fn active_session(&self) -> GatewayResult<Option<CashSession>> {
        match self
            .get::<SessionWire>("finance/cash-sessions/current/")
            .await
        {
            Ok(wire) => Ok(Some(wire.into_core().map_err(GatewayError::from)?)),
            // No session open is a normal state, not an error.
            Err(ClientError::NotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn close_session(
        &self,
        actual_usd: Money,
        actual_ves: Ves,
        notes: Option<&str>,
    ) -> GatewayResult<CashSession> {
        let body = CloseSessionWire {
            actual_amount_usd: cents_to_decimal(actual_usd.cents()),
            actual_amount_ves: cents_to_decimal(actual_ves.cents()),
            notes: notes.map(str::to_string),
        };
        let wire: SessionWire = self
            .post("finance/cash-sessions/close/", &body)
            .await
            .map_err(GatewayError::from)?;
        wire.into_core().map_err(GatewayError::from)
    }

    async fn list_sessions(&self) -> GatewayResult<Vec<CashSession>> {
        let listing: Listing<SessionWire> = self
            .get("finance/cash-sessions/")
            .await
            .map_err(GatewayError::from)?;

        listing
            .into_vec()
            .into_iter()
            .map(|w| w.into_core().map_err(GatewayError::from))
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
