//! # Cash Session & Reconciliation
//!
//! One drawer session per shift: `Closed → Open → Closed`. An open
//! session is a precondition for any checkout. Closing counts the
//! physical cash in both currencies and reconciles it against the
//! expected amounts the backend computed from the session's
//! transactions.
//!
//! ## Variance policy
//! ```text
//! variance = counted − expected            (per currency)
//! shortage = max(0, −variance)             (missing cash)
//! overage  = max(0,  variance)             (surplus cash)
//!
//! A justification note is MANDATORY when either currency's variance
//! alone exceeds $5 of settlement value — the VES variance is
//! normalized through the current rate for comparability. The close is
//! rejected locally, before any network call, until a note is given.
//! ```
//!
//! Expected amounts are trusted external input; the core never re-derives
//! expected cash from transaction history (the authoritative ledger lives
//! server-side).

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::gateway::SessionGateway;
use crate::money::{Money, Ves};
use crate::types::CashSession;
use crate::validation::validate_notes;
use crate::VARIANCE_NOTE_THRESHOLD_CENTS;

// =============================================================================
// Reconciliation (pure)
// =============================================================================

/// The result of comparing counted vs. expected drawer cash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reconciliation {
    pub variance_usd: Money,
    pub variance_ves: Ves,

    pub shortage_usd: Money,
    pub overage_usd: Money,
    pub shortage_ves: Ves,
    pub overage_ves: Ves,

    /// Whether the variance is large enough to demand a justification
    /// note before the close is accepted.
    pub notes_required: bool,
}

/// Computes variance, shortage/overage per currency, and whether a
/// justification note is required.
///
/// `rate` (VES per USD) normalizes the VES variance so one threshold
/// applies to both currencies.
pub fn reconcile(
    expected_usd: Money,
    expected_ves: Ves,
    actual_usd: Money,
    actual_ves: Ves,
    rate: f64,
) -> Reconciliation {
    let variance_usd = actual_usd - expected_usd;
    let variance_ves = actual_ves - expected_ves;

    let over_threshold_usd = variance_usd.abs().cents() > VARIANCE_NOTE_THRESHOLD_CENTS;
    let over_threshold_ves =
        variance_ves.abs().to_usd(rate).cents() > VARIANCE_NOTE_THRESHOLD_CENTS;

    Reconciliation {
        variance_usd,
        variance_ves,
        shortage_usd: Money::from_cents((-variance_usd.cents()).max(0)),
        overage_usd: Money::from_cents(variance_usd.cents().max(0)),
        shortage_ves: Ves::from_cents((-variance_ves.cents()).max(0)),
        overage_ves: Ves::from_cents(variance_ves.cents().max(0)),
        notes_required: over_threshold_usd || over_threshold_ves,
    }
}

// =============================================================================
// Drawer Service
// =============================================================================

/// Process-wide cash session service: tracks the open session for this
/// terminal, routes open/close through the gateway, and enforces the
/// variance policy locally before anything reaches the network.
///
/// Outlives any single cart; cloned handles share state, and
/// subscribers observe open/close transitions.
#[derive(Clone)]
pub struct DrawerService {
    gateway: Arc<dyn SessionGateway>,
    active: Arc<Mutex<Option<CashSession>>>,
    session_tx: Arc<watch::Sender<Option<CashSession>>>,
}

impl DrawerService {
    pub fn new(gateway: Arc<dyn SessionGateway>) -> Self {
        let (session_tx, _) = watch::channel(None);
        DrawerService {
            gateway,
            active: Arc::new(Mutex::new(None)),
            session_tx: Arc::new(session_tx),
        }
    }

    /// Whether a session is currently open on this terminal.
    pub fn is_open(&self) -> bool {
        self.active
            .lock()
            .expect("Session mutex poisoned")
            .as_ref()
            .is_some_and(CashSession::is_open)
    }

    /// The active session, if any.
    pub fn active(&self) -> Option<CashSession> {
        self.active.lock().expect("Session mutex poisoned").clone()
    }

    /// Subscribes to session transitions (open, close, refresh).
    pub fn subscribe(&self) -> watch::Receiver<Option<CashSession>> {
        self.session_tx.subscribe()
    }

    fn store(&self, session: Option<CashSession>) {
        *self.active.lock().expect("Session mutex poisoned") = session.clone();
        self.session_tx.send_replace(session);
    }

    /// Re-reads the active session from the gateway, e.g. on startup or
    /// after the terminal reconnects.
    pub async fn refresh(&self) -> CoreResult<Option<CashSession>> {
        debug!("refreshing active cash session");
        let session = self.gateway.active_session().await?;
        self.store(session.clone());
        Ok(session)
    }

    /// Opens a drawer session with the counted opening float.
    ///
    /// Rejected locally when this terminal already has one open; the
    /// backend enforces the one-session-per-operator rule globally.
    pub async fn open(&self, opening_usd: Money, opening_ves: Ves) -> CoreResult<CashSession> {
        if let Some(session) = self.active() {
            if session.is_open() {
                warn!(session_code = %session.session_code, "open refused: session already open");
                return Err(CoreError::SessionAlreadyOpen {
                    session_code: session.session_code,
                });
            }
        }

        let session = self.gateway.open_session(opening_usd, opening_ves).await?;
        info!(
            session_code = %session.session_code,
            opening_usd = %opening_usd,
            opening_ves = %opening_ves,
            "cash session opened"
        );
        self.store(Some(session.clone()));
        Ok(session)
    }

    /// Previews the reconciliation for the counted amounts without
    /// committing anything, so the UI can show the variance (and whether
    /// a note will be demanded) as the operator types.
    pub fn preview_close(
        &self,
        actual_usd: Money,
        actual_ves: Ves,
        rate: f64,
    ) -> CoreResult<Reconciliation> {
        let session = self.active().ok_or(CoreError::SessionNotOpen)?;
        Ok(reconcile(
            session.expected_usd(),
            session.expected_ves(),
            actual_usd,
            actual_ves,
            rate,
        ))
    }

    /// Closes the active session with the physically counted cash.
    ///
    /// Local rejections (no network call): no session open; variance
    /// over threshold with no justification note. On acceptance the
    /// gateway records the close and the terminal forgets the session.
    pub async fn close(
        &self,
        actual_usd: Money,
        actual_ves: Ves,
        notes: &str,
        rate: f64,
    ) -> CoreResult<CashSession> {
        let session = self.active().ok_or(CoreError::SessionNotOpen)?;
        if !session.is_open() {
            return Err(CoreError::SessionNotOpen);
        }

        let notes = validate_notes(notes)?;
        let reconciliation = reconcile(
            session.expected_usd(),
            session.expected_ves(),
            actual_usd,
            actual_ves,
            rate,
        );

        if reconciliation.notes_required && notes.is_none() {
            warn!(
                session_code = %session.session_code,
                variance_usd = %reconciliation.variance_usd,
                variance_ves = %reconciliation.variance_ves,
                "close refused: variance over threshold without a note"
            );
            return Err(CoreError::NotesRequired {
                variance_usd: reconciliation.variance_usd,
                variance_ves: reconciliation.variance_ves,
            });
        }

        let closed = self
            .gateway
            .close_session(actual_usd, actual_ves, notes.as_deref())
            .await?;

        info!(
            session_code = %closed.session_code,
            variance_usd = %reconciliation.variance_usd,
            variance_ves = %reconciliation.variance_ves,
            "cash session closed"
        );
        self.store(None);
        Ok(closed)
    }

    /// Session history passthrough for the finance screens.
    pub async fn list_sessions(&self) -> CoreResult<Vec<CashSession>> {
        Ok(self.gateway.list_sessions().await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GatewayError, GatewayResult};
    use crate::types::SessionStatus;
    use async_trait::async_trait;
    use chrono::Utc;

    fn session(expected_usd_cents: i64, expected_ves_cents: i64) -> CashSession {
        CashSession {
            id: 1,
            session_code: "CS-20260829-01".to_string(),
            cashier_name: Some("Ana".to_string()),
            status: SessionStatus::Open,
            opening_usd_cents: 5000,
            opening_ves_cents: 0,
            expected_usd_cents,
            expected_ves_cents,
            actual_usd_cents: None,
            actual_ves_cents: None,
            shortage_usd_cents: None,
            overage_usd_cents: None,
            shortage_ves_cents: None,
            overage_ves_cents: None,
            notes: None,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    /// In-memory gateway double; `fail_close` simulates a backend
    /// rejection.
    struct FakeSessionGateway {
        active: Mutex<Option<CashSession>>,
        fail_close: bool,
    }

    impl FakeSessionGateway {
        fn with_active(session: CashSession) -> Self {
            FakeSessionGateway {
                active: Mutex::new(Some(session)),
                fail_close: false,
            }
        }

        fn empty() -> Self {
            FakeSessionGateway {
                active: Mutex::new(None),
                fail_close: false,
            }
        }
    }

    #[async_trait]
    impl SessionGateway for FakeSessionGateway {
        async fn open_session(
            &self,
            opening_usd: Money,
            opening_ves: Ves,
        ) -> GatewayResult<CashSession> {
            let mut s = session(opening_usd.cents(), opening_ves.cents());
            s.opening_usd_cents = opening_usd.cents();
            s.opening_ves_cents = opening_ves.cents();
            *self.active.lock().unwrap() = Some(s.clone());
            Ok(s)
        }

        async fn active_session(&self) -> GatewayResult<Option<CashSession>> {
            Ok(self.active.lock().unwrap().clone())
        }

        async fn close_session(
            &self,
            actual_usd: Money,
            actual_ves: Ves,
            notes: Option<&str>,
        ) -> GatewayResult<CashSession> {
            if self.fail_close {
                return Err(GatewayError::Rejected("backend said no".to_string()));
            }
            let mut s = self.active.lock().unwrap().take().expect("no session");
            let rec = reconcile(
                s.expected_usd(),
                s.expected_ves(),
                actual_usd,
                actual_ves,
                36.5,
            );
            s.status = SessionStatus::Closed;
            s.actual_usd_cents = Some(actual_usd.cents());
            s.actual_ves_cents = Some(actual_ves.cents());
            s.shortage_usd_cents = Some(rec.shortage_usd.cents());
            s.overage_usd_cents = Some(rec.overage_usd.cents());
            s.shortage_ves_cents = Some(rec.shortage_ves.cents());
            s.overage_ves_cents = Some(rec.overage_ves.cents());
            s.notes = notes.map(str::to_string);
            s.closed_at = Some(Utc::now());
            Ok(s)
        }

        async fn list_sessions(&self) -> GatewayResult<Vec<CashSession>> {
            Ok(self.active.lock().unwrap().clone().into_iter().collect())
        }
    }

    fn drawer_with_expected(expected_usd_cents: i64) -> DrawerService {
        let gateway = Arc::new(FakeSessionGateway::with_active(session(
            expected_usd_cents,
            0,
        )));
        DrawerService::new(gateway)
    }

    #[test]
    fn test_reconcile_small_overage_needs_no_note() {
        // Expected $180, counted $184: +$4, under the $5 threshold.
        let rec = reconcile(
            Money::from_cents(18_000),
            Ves::zero(),
            Money::from_cents(18_400),
            Ves::zero(),
            36.5,
        );
        assert_eq!(rec.variance_usd.cents(), 400);
        assert_eq!(rec.overage_usd.cents(), 400);
        assert_eq!(rec.shortage_usd.cents(), 0);
        assert!(!rec.notes_required);
    }

    #[test]
    fn test_reconcile_shortage_over_threshold_needs_note() {
        // Expected $180, counted $170: -$10.
        let rec = reconcile(
            Money::from_cents(18_000),
            Ves::zero(),
            Money::from_cents(17_000),
            Ves::zero(),
            36.5,
        );
        assert_eq!(rec.variance_usd.cents(), -1000);
        assert_eq!(rec.shortage_usd.cents(), 1000);
        assert_eq!(rec.overage_usd.cents(), 0);
        assert!(rec.notes_required);
    }

    #[test]
    fn test_reconcile_ves_variance_normalized_through_rate() {
        // Bs. 400 short at 36.5 ≈ $10.96: over threshold on VES alone.
        let rec = reconcile(
            Money::zero(),
            Ves::from_cents(100_000),
            Money::zero(),
            Ves::from_cents(60_000),
            36.5,
        );
        assert_eq!(rec.variance_ves.cents(), -40_000);
        assert!(rec.notes_required);

        // Bs. 100 at the same rate ≈ $2.74: fine.
        let rec = reconcile(
            Money::zero(),
            Ves::from_cents(100_000),
            Money::zero(),
            Ves::from_cents(90_000),
            36.5,
        );
        assert!(!rec.notes_required);
    }

    #[test]
    fn test_exact_threshold_does_not_require_note() {
        // Exactly $5.00 either way is the boundary, not a violation.
        let rec = reconcile(
            Money::from_cents(18_000),
            Ves::zero(),
            Money::from_cents(18_500),
            Ves::zero(),
            36.5,
        );
        assert!(!rec.notes_required);
    }

    #[tokio::test]
    async fn test_close_within_threshold_succeeds_without_notes() {
        let drawer = drawer_with_expected(18_000);
        drawer.refresh().await.unwrap();

        let closed = drawer
            .close(Money::from_cents(18_400), Ves::zero(), "", 36.5)
            .await
            .unwrap();

        assert_eq!(closed.status, SessionStatus::Closed);
        assert_eq!(closed.overage_usd_cents, Some(400));
        assert!(!drawer.is_open());
    }

    #[tokio::test]
    async fn test_close_over_threshold_rejected_then_accepted_with_notes() {
        let drawer = drawer_with_expected(18_000);
        drawer.refresh().await.unwrap();

        // Without a note: rejected locally, session stays open.
        let err = drawer
            .close(Money::from_cents(17_000), Ves::zero(), "  ", 36.5)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotesRequired { .. }));
        assert!(drawer.is_open());

        // With a note: accepted, shortage recorded.
        let closed = drawer
            .close(
                Money::from_cents(17_000),
                Ves::zero(),
                "faltó vuelto de la tarde",
                36.5,
            )
            .await
            .unwrap();
        assert_eq!(closed.shortage_usd_cents, Some(1000));
        assert_eq!(closed.notes.as_deref(), Some("faltó vuelto de la tarde"));
        assert!(!drawer.is_open());
    }

    #[tokio::test]
    async fn test_close_without_session_is_rejected() {
        let drawer = DrawerService::new(Arc::new(FakeSessionGateway::empty()));
        let err = drawer
            .close(Money::zero(), Ves::zero(), "", 36.5)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SessionNotOpen));
    }

    #[tokio::test]
    async fn test_open_twice_is_rejected_locally() {
        let drawer = DrawerService::new(Arc::new(FakeSessionGateway::empty()));
        drawer
            .open(Money::from_cents(5000), Ves::zero())
            .await
            .unwrap();
        assert!(drawer.is_open());

        let err = drawer
            .open(Money::from_cents(1000), Ves::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SessionAlreadyOpen { .. }));
    }

    #[tokio::test]
    async fn test_gateway_rejection_preserves_session() {
        let mut gateway = FakeSessionGateway::with_active(session(18_000, 0));
        gateway.fail_close = true;
        let drawer = DrawerService::new(Arc::new(gateway));
        drawer.refresh().await.unwrap();

        let err = drawer
            .close(Money::from_cents(18_000), Ves::zero(), "", 36.5)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Gateway(GatewayError::Rejected(_))));
        // The terminal still considers the session open for retry.
        assert!(drawer.is_open());
    }

    #[tokio::test]
    async fn test_subscribe_observes_transitions() {
        let drawer = DrawerService::new(Arc::new(FakeSessionGateway::empty()));
        let rx = drawer.subscribe();
        assert!(rx.borrow().is_none());

        drawer
            .open(Money::from_cents(5000), Ves::zero())
            .await
            .unwrap();
        assert!(rx.borrow().as_ref().is_some_and(CashSession::is_open));
    }
}
