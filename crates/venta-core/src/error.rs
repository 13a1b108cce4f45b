//! # Error Types
//!
//! Domain-specific error types for venta-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  venta-core errors (this file)                                      │
//! │  ├── CoreError        - business rule violations (local, no I/O)   │
//! │  ├── ValidationError  - input validation failures                   │
//! │  └── GatewayError     - what the external collaborators report      │
//! │                                                                     │
//! │  venta-client errors (separate crate)                               │
//! │  └── ClientError      - HTTP status / transport classification      │
//! │                                                                     │
//! │  Flow: ClientError → GatewayError → CoreError → UI                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is fatal: every failure leaves the cart and session
//! aggregates intact so the operator can correct and retry. The only
//! irreversible transitions are a settled sale and a closed session.

use thiserror::Error;

use crate::money::{Money, Ves};

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and checkout/drawer state errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Adding or raising a product line would exceed its stock limit.
    /// The cart is left unchanged.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Cart has reached the maximum number of lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// The referenced line is not in the cart.
    #[error("Line not in cart: {0}")]
    LineNotFound(String),

    /// A checkout action was attempted on an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// A partial/credit sale needs a customer to post the debt against.
    ///
    /// This is the core business rule of the settlement engine: anonymous
    /// credit sales are disallowed because there is no ledger for them.
    #[error("A customer must be selected to register a partial payment")]
    CustomerRequired,

    /// A submission is already in flight; the second attempt is ignored,
    /// not queued, to avoid duplicate charge attempts.
    #[error("A sale submission is already in progress")]
    SubmissionInFlight,

    /// The checkout is not in a phase that allows the requested action.
    #[error("Cannot {action} while checkout is {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: String,
    },

    /// The cart changed after the tender was evaluated; the proposal no
    /// longer describes what would be sold.
    #[error("Cart changed since the tender was evaluated; propose again")]
    StaleProposal,

    /// Checkout (or close) requires an open cash session.
    #[error("No cash session is open")]
    SessionNotOpen,

    /// Only one drawer session may be open per terminal.
    #[error("Cash session {session_code} is already open")]
    SessionAlreadyOpen { session_code: String },

    /// Closing with an out-of-threshold variance needs a justification note.
    #[error("Cash variance ({variance_usd} / {variance_ves}) exceeds the threshold; a justification note is required")]
    NotesRequired {
        variance_usd: Money,
        variance_ves: Ves,
    },

    /// Exchange rates must be strictly positive.
    #[error("Invalid exchange rate: {0}")]
    InvalidRate(f64),

    /// An external collaborator rejected or failed the call.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Input validation failure.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Gateway Error
// =============================================================================

/// Failures reported by the external collaborators (rate provider, sale
/// submission, customer directory, session gateway).
///
/// Both variants have identical consequences for the core: no partial
/// mutation is applied and no retry is attempted automatically.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The backend rejected the request (insufficient stock, debt ceiling,
    /// malformed payload...). The message is surfaced verbatim.
    #[error("{0}")]
    Rejected(String),

    /// The call never resolved meaningfully: network failure, timeout,
    /// undecodable response.
    #[error("Gateway unreachable: {0}")]
    Transport(String),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
}

// =============================================================================
// Result Aliases
// =============================================================================

/// Convenience alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience alias for gateway trait methods.
pub type GatewayResult<T> = Result<T, GatewayError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            name: "Pantalla iPhone 11".to_string(),
            available: 3,
            requested: 4,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Pantalla iPhone 11: available 3, requested 4"
        );

        let err = CoreError::NotesRequired {
            variance_usd: Money::from_cents(-1000),
            variance_ves: Ves::zero(),
        };
        assert!(err.to_string().contains("-$10.00"));
    }

    #[test]
    fn test_gateway_rejection_is_verbatim() {
        let err = GatewayError::Rejected("Stock insuficiente para el producto 42".to_string());
        assert_eq!(err.to_string(), "Stock insuficiente para el producto 42");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let err: CoreError = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(err.to_string(), "Validation error: quantity must be positive");
    }
}
