//! # Validation Module
//!
//! Early input validation, before business logic runs. The backend
//! re-validates everything server-side; these checks exist so obvious
//! mistakes (negative tender, runaway quantity) never leave the terminal.

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a cart line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999) — guards against typing
///   1000 instead of 10
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a tendered amount in cents.
///
/// Zero is allowed: a full-credit sale tenders nothing and posts the
/// whole total to the customer ledger. Negative is not.
pub fn validate_tendered_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustBePositive {
            field: "tendered amount".to_string(),
        });
    }
    Ok(())
}

/// Validates a free-text note (sale notes, variance justification).
///
/// Returns the trimmed note, or `None` when effectively empty.
pub fn validate_notes(notes: &str) -> ValidationResult<Option<String>> {
    let notes = notes.trim();
    if notes.is_empty() {
        return Ok(None);
    }
    if notes.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: 500,
        });
    }
    Ok(Some(notes.to_string()))
}

/// Validates a customer search query. Empty is fine (default listing).
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();
    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }
    Ok(query.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_tendered_cents() {
        assert!(validate_tendered_cents(0).is_ok()); // full credit
        assert!(validate_tendered_cents(1370).is_ok());
        assert!(validate_tendered_cents(-1).is_err());
    }

    #[test]
    fn test_validate_notes() {
        assert_eq!(validate_notes("  ").unwrap(), None);
        assert_eq!(
            validate_notes(" pago móvil ref 1234 ").unwrap().as_deref(),
            Some("pago móvil ref 1234")
        );
        assert!(validate_notes(&"x".repeat(600)).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  maría ").unwrap(), "maría");
        assert!(validate_search_query(&"q".repeat(200)).is_err());
    }
}
