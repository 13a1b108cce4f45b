//! # Exchange Rate Snapshot
//!
//! The authoritative USD→VES rate keeps moving (BCV publishes daily, the
//! parallel monitor more often). A quoted total must NOT move with it
//! while the customer is paying, so the cart freezes one [`RateSnapshot`]
//! at composition time and uses it for every secondary-currency figure
//! until the cart is cleared.
//!
//! The freeze is modelled as `Option<RateSnapshot>` plus a single
//! capture-once operation on the cart, rather than an `if rate == 0`
//! check scattered across call sites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Compiled-in fallback rate, used only when the provider has never
/// answered (fresh install, offline first run).
pub const FALLBACK_RATE: f64 = 36.5;

/// A conversion rate captured at a point in time, with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RateSnapshot {
    /// VES per USD. Strictly positive.
    pub rate: f64,

    /// Where the figure came from: "BCV", "Monitor", "Manual".
    pub source: String,

    #[ts(as = "String")]
    pub captured_at: DateTime<Utc>,
}

impl RateSnapshot {
    /// Builds a snapshot, rejecting non-positive or non-finite rates.
    pub fn new(rate: f64, source: impl Into<String>, captured_at: DateTime<Utc>) -> CoreResult<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(CoreError::InvalidRate(rate));
        }
        Ok(RateSnapshot {
            rate,
            source: source.into(),
            captured_at,
        })
    }

    /// The compiled-in fallback, tagged as such.
    pub fn fallback() -> Self {
        RateSnapshot {
            rate: FALLBACK_RATE,
            source: "Fallback".to_string(),
            captured_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_snapshot() {
        let snap = RateSnapshot::new(36.5, "BCV", Utc::now()).unwrap();
        assert_eq!(snap.rate, 36.5);
        assert_eq!(snap.source, "BCV");
    }

    #[test]
    fn test_rejects_bad_rates() {
        assert!(matches!(
            RateSnapshot::new(0.0, "Manual", Utc::now()),
            Err(CoreError::InvalidRate(_))
        ));
        assert!(RateSnapshot::new(-1.0, "Manual", Utc::now()).is_err());
        assert!(RateSnapshot::new(f64::NAN, "Manual", Utc::now()).is_err());
        assert!(RateSnapshot::new(f64::INFINITY, "Manual", Utc::now()).is_err());
    }

    #[test]
    fn test_fallback_is_tagged() {
        let snap = RateSnapshot::fallback();
        assert_eq!(snap.rate, FALLBACK_RATE);
        assert_eq!(snap.source, "Fallback");
    }
}
