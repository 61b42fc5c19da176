//! # Validation Module
//!
//! Input validation for engine operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (front desk terminal)                                 │
//! │  └── Parses text into Money / Quantity                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any store access)                        │
//! │  ├── 0 < qty, 0 <= unit price, 0 < amount, all capped                  │
//! │  └── names / methods non-empty, normalized                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger store (SQLite)                                        │
//! │  ├── CHECK constraints on amounts                                      │
//! │  ├── Partial UNIQUE index: one open session per room                   │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use hamam_core::validation::{normalize_payment_method, validate_quantity};
//! use hamam_core::Quantity;
//!
//! assert_eq!(normalize_payment_method("  Cash ").unwrap(), "cash");
//! assert!(validate_quantity(Quantity::whole(0)).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::{
    MAX_CUSTOMER_LABEL_LEN, MAX_ITEM_QUANTITY_THOUSANDTHS, MAX_PAYMENT_CENTS,
    MAX_PAYMENT_METHOD_LEN, MAX_SERVICE_NAME_LEN, MAX_UNIT_PRICE_CENTS,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Trims `value` and checks it is non-empty and at most `max` characters.
fn required_text(value: &str, field: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates a service name and returns it trimmed.
///
/// ## Example
/// ```rust
/// use hamam_core::validation::validate_service_name;
///
/// assert_eq!(validate_service_name(" Kese ").unwrap(), "Kese");
/// assert!(validate_service_name("   ").is_err());
/// ```
pub fn validate_service_name(name: &str) -> ValidationResult<String> {
    required_text(name, "service name", MAX_SERVICE_NAME_LEN)
}

/// Validates a room display name and returns it trimmed.
pub fn validate_room_name(name: &str) -> ValidationResult<String> {
    required_text(name, "room name", MAX_SERVICE_NAME_LEN)
}

/// Normalizes a payment method code: trimmed, lower-cased.
///
/// Methods are free-form codes ("cash", "card", "mix"); the engine does not
/// keep a closed list.
pub fn normalize_payment_method(method: &str) -> ValidationResult<String> {
    required_text(method, "payment method", MAX_PAYMENT_METHOD_LEN).map(|m| m.to_lowercase())
}

/// Normalizes the optional customer label.
///
/// Blank labels become `None`.
pub fn normalize_customer_label(label: Option<&str>) -> ValidationResult<Option<String>> {
    let label = match label.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(label) => label,
    };

    if label.chars().count() > MAX_CUSTOMER_LABEL_LEN {
        return Err(ValidationError::TooLong {
            field: "customer label".to_string(),
            max: MAX_CUSTOMER_LABEL_LEN,
        });
    }

    Ok(Some(label.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line-item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed 999 units
pub fn validate_quantity(quantity: Quantity) -> ValidationResult<()> {
    if !quantity.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity.thousandths() > MAX_ITEM_QUANTITY_THOUSANDTHS {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY_THOUSANDTHS / 1000,
        });
    }

    Ok(())
}

/// Validates a unit price.
///
/// ## Rules
/// - Zero is allowed (complimentary services)
/// - Must not exceed [`MAX_UNIT_PRICE_CENTS`]
pub fn validate_unit_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() || price.cents() > MAX_UNIT_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "unit price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a payment amount.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_PAYMENT_CENTS`]
/// - Refunds are not payments
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    if amount.cents() > MAX_PAYMENT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "payment amount".to_string(),
            min: 1,
            max: MAX_PAYMENT_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_service_name() {
        assert_eq!(validate_service_name("Massage").unwrap(), "Massage");
        assert_eq!(validate_service_name("  Tea  ").unwrap(), "Tea");
        assert!(validate_service_name("").is_err());
        assert!(validate_service_name("   ").is_err());
        assert!(validate_service_name(&"A".repeat(101)).is_err());
        // Multi-byte characters count once
        assert!(validate_service_name(&"ş".repeat(100)).is_ok());
    }

    #[test]
    fn test_normalize_payment_method() {
        assert_eq!(normalize_payment_method("Cash").unwrap(), "cash");
        assert_eq!(normalize_payment_method(" CARD ").unwrap(), "card");
        assert!(matches!(
            normalize_payment_method("  "),
            Err(ValidationError::Required { .. })
        ));
        assert!(normalize_payment_method(&"x".repeat(21)).is_err());
    }

    #[test]
    fn test_normalize_customer_label() {
        assert_eq!(normalize_customer_label(None).unwrap(), None);
        assert_eq!(normalize_customer_label(Some("  ")).unwrap(), None);
        assert_eq!(
            normalize_customer_label(Some(" Ayse K. ")).unwrap(),
            Some("Ayse K.".to_string())
        );
        assert!(normalize_customer_label(Some(&"a".repeat(101))).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(Quantity::whole(1)).is_ok());
        assert!(validate_quantity(Quantity::from_thousandths(1)).is_ok());
        assert!(validate_quantity(Quantity::whole(999)).is_ok());

        assert!(validate_quantity(Quantity::whole(0)).is_err());
        assert!(validate_quantity(Quantity::from_thousandths(-500)).is_err());
        assert!(validate_quantity(Quantity::whole(1000)).is_err());
    }

    #[test]
    fn test_validate_unit_price() {
        assert!(validate_unit_price(Money::zero()).is_ok());
        assert!(validate_unit_price(Money::from_cents(30_000)).is_ok());
        assert!(validate_unit_price(Money::from_cents(-1)).is_err());

        assert!(validate_unit_price(Money::from_cents(MAX_UNIT_PRICE_CENTS)).is_ok());
        assert_eq!(
            validate_unit_price(Money::from_cents(MAX_UNIT_PRICE_CENTS + 1)),
            Err(ValidationError::OutOfRange {
                field: "unit price".to_string(),
                min: 0,
                max: MAX_UNIT_PRICE_CENTS,
            })
        );
        assert!(validate_unit_price(Money::from_cents(i64::MAX)).is_err());
    }

    #[test]
    fn test_price_cap_times_quantity_cap_fits() {
        let line = Money::from_cents(MAX_UNIT_PRICE_CENTS)
            .checked_times(Quantity::from_thousandths(MAX_ITEM_QUANTITY_THOUSANDTHS));
        assert_eq!(line, Some(Money::from_cents(999_000_000_000)));
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(Money::from_cents(1)).is_ok());
        assert!(matches!(
            validate_payment_amount(Money::zero()),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(validate_payment_amount(Money::from_cents(-100)).is_err());

        assert!(validate_payment_amount(Money::from_cents(MAX_PAYMENT_CENTS)).is_ok());
        assert!(matches!(
            validate_payment_amount(Money::from_cents(MAX_PAYMENT_CENTS + 1)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_payment_amount(Money::from_cents(i64::MAX)).is_err());
    }
}
