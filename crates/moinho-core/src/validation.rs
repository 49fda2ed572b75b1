//! # Validation Module
//!
//! Field validators and input coercion for Moinho forms.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web client                                                   │
//! │  └── Immediate feedback while typing                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Form shapes (forms.rs)                                       │
//! │  ├── Loose JSON: "10,50", 10.5, "" are all accepted as input           │
//! │  └── Every field checked, every failure collected                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: THIS MODULE - one rule per field                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE and foreign key constraints                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use moinho_core::validation::{validate_quantity, validate_password};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_password("1234567").is_err());
//! ```

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_SALE_ITEMS, MAX_UNIT_PRICE, MIN_PASSWORD_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Trims `value` and rejects it when blank.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(value.to_string())
}

/// Validates a name: required, trimmed, between `min` and `max` characters.
///
/// Length counts characters, not bytes, so "Pão" is three long.
///
/// ## Example
/// ```rust
/// use moinho_core::validation::validate_name;
///
/// assert_eq!(validate_name("name", "  Pão ", 3, 120).unwrap(), "Pão");
/// assert!(validate_name("name", "Pã", 3, 120).is_err());
/// ```
pub fn validate_name(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<String> {
    let value = validate_required(field, value)?;
    let len = value.chars().count();

    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }
    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value)
}

/// Trims an optional text field; blank becomes `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates a Brazilian postal code (CEP).
///
/// ## Rules
/// - Eight digits
/// - A hyphen (`01310-100`) is accepted and stripped
pub fn validate_postal_code(value: &str) -> ValidationResult<String> {
    let digits: String = value.trim().chars().filter(|c| *c != '-').collect();

    if digits.len() != 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "postal code".to_string(),
            reason: "must have 8 digits".to_string(),
        });
    }

    Ok(digits)
}

/// Validates an email address and normalizes it to lowercase.
///
/// ## Example
/// ```rust
/// use moinho_core::validation::validate_email;
///
/// assert_eq!(validate_email(" Ana@Moinho.com ").unwrap(), "ana@moinho.com");
/// assert!(validate_email("ana@").is_err());
/// ```
pub fn validate_email(value: &str) -> ValidationResult<String> {
    let value = validate_required("email", value)?;

    if !validator::validate_email(value.as_str()) {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must be a valid email address".to_string(),
        });
    }

    Ok(value.to_lowercase())
}

/// Validates a new password.
///
/// Only the length is checked; whitespace counts.
pub fn validate_password(value: &str) -> ValidationResult<()> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item quantity.
///
/// ## Rules
/// - Whole units, at least 1
/// - At most MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a unit price.
///
/// ## Rules
/// - At least 0.01
/// - At most MAX_UNIT_PRICE
pub fn validate_unit_price(price: Decimal) -> ValidationResult<()> {
    if price < Decimal::new(1, 2) {
        return Err(ValidationError::BelowMinimum {
            field: "unit price".to_string(),
            min: "0.01".to_string(),
        });
    }
    if price > Decimal::from(MAX_UNIT_PRICE) {
        return Err(ValidationError::AboveMaximum {
            field: "unit price".to_string(),
            max: MAX_UNIT_PRICE.to_string(),
        });
    }
    Ok(())
}

/// Validates a commission percentage: 0 to 100 inclusive.
///
/// Values outside the range are rejected, not clamped.
pub fn validate_commission_percent(percent: Decimal) -> ValidationResult<()> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "commission".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of line items in a sale.
pub fn validate_item_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }
    if count > MAX_SALE_ITEMS {
        return Err(ValidationError::TooMany {
            field: "items".to_string(),
            max: MAX_SALE_ITEMS,
        });
    }
    Ok(())
}

// =============================================================================
// Dates
// =============================================================================

/// Parses a sale date from `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// Impossible dates such as `2024-02-30` are rejected.
pub fn parse_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    let value = validate_required(field, value)?;

    if let Ok(date) = NaiveDate::parse_from_str(&value, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(&value) {
        return Ok(ts.date_naive());
    }

    Err(ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid date (YYYY-MM-DD)".to_string(),
    })
}

// =============================================================================
// Loose Numbers
// =============================================================================

/// A number as forms send it: a JSON number or a string.
///
/// Strings may use a decimal comma (`"10,50"`). A blank string counts as
/// missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(serde_json::Number),
    Text(String),
}

impl LooseNumber {
    /// Coerces to a decimal. `Ok(None)` when blank.
    pub fn to_decimal(&self, field: &str) -> ValidationResult<Option<Decimal>> {
        let not_a_number = || ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a number".to_string(),
        };

        let text = match self {
            LooseNumber::Number(n) => n.to_string(),
            LooseNumber::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                if s.contains(',') && !s.contains('.') {
                    s.replace(',', ".")
                } else {
                    s.to_string()
                }
            }
        };

        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map(Some)
            .map_err(|_| not_a_number())
    }

    /// Coerces to a whole number. `Ok(None)` when blank.
    pub fn to_whole(&self, field: &str) -> ValidationResult<Option<i64>> {
        let Some(value) = self.to_decimal(field)? else {
            return Ok(None);
        };

        if !value.fract().is_zero() {
            return Err(ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: "must be a whole number".to_string(),
            });
        }

        value.to_i64().map(Some).ok_or_else(|| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "is too large".to_string(),
        })
    }
}

impl From<i64> for LooseNumber {
    fn from(n: i64) -> Self {
        LooseNumber::Number(n.into())
    }
}

impl From<Decimal> for LooseNumber {
    fn from(d: Decimal) -> Self {
        LooseNumber::Text(d.to_string())
    }
}

impl From<&str> for LooseNumber {
    fn from(s: &str) -> Self {
        LooseNumber::Text(s.to_string())
    }
}

/// Coerces an optional loose number to a decimal, treating blank as missing.
pub fn coerce_decimal(field: &str, value: Option<&LooseNumber>) -> ValidationResult<Option<Decimal>> {
    match value {
        Some(n) => n.to_decimal(field),
        None => Ok(None),
    }
}

/// Coerces an optional loose number to a whole number, treating blank as missing.
pub fn coerce_whole(field: &str, value: Option<&LooseNumber>) -> ValidationResult<Option<i64>> {
    match value {
        Some(n) => n.to_whole(field),
        None => Ok(None),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", " Integral ", 3, 120).unwrap(), "Integral");
        assert!(matches!(
            validate_name("name", "   ", 3, 120),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_name("name", "ab", 3, 120),
            Err(ValidationError::TooShort { min: 3, .. })
        ));
        assert!(matches!(
            validate_name("name", &"a".repeat(121), 3, 120),
            Err(ValidationError::TooLong { max: 120, .. })
        ));
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(Some("  Centro ")), Some("Centro".to_string()));
        assert_eq!(optional_text(Some("   ")), None);
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn test_validate_postal_code() {
        assert_eq!(validate_postal_code("01310-100").unwrap(), "01310100");
        assert_eq!(validate_postal_code("01310100").unwrap(), "01310100");
        assert!(validate_postal_code("0131010").is_err());
        assert!(validate_postal_code("0131A100").is_err());
    }

    #[test]
    fn test_password_length_boundary() {
        let err = validate_password("1234567").unwrap_err();
        assert_eq!(err.to_string(), "password must be at least 8 characters");
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("maria@padaria.com.br").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not an email").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_unit_price_and_commission() {
        assert!(validate_unit_price(dec!(0.01)).is_ok());
        assert!(validate_unit_price(dec!(0.009)).is_err());
        assert!(validate_unit_price(dec!(0)).is_err());
        assert!(validate_unit_price(Decimal::from(MAX_UNIT_PRICE)).is_ok());
        assert!(matches!(
            validate_unit_price(Decimal::from(MAX_UNIT_PRICE) + dec!(0.01)),
            Err(ValidationError::AboveMaximum { .. })
        ));
        assert!(validate_unit_price(Decimal::MAX).is_err());

        assert!(validate_commission_percent(dec!(0)).is_ok());
        assert!(validate_commission_percent(dec!(100)).is_ok());
        assert!(validate_commission_percent(dec!(100.01)).is_err());
        assert!(validate_commission_percent(dec!(-1)).is_err());
    }

    #[test]
    fn test_validate_item_count() {
        assert!(matches!(validate_item_count(0), Err(ValidationError::Empty { .. })));
        assert!(validate_item_count(1).is_ok());
        assert!(validate_item_count(MAX_SALE_ITEMS).is_ok());
        assert!(validate_item_count(MAX_SALE_ITEMS + 1).is_err());
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("date", "2024-03-15").unwrap(), expected);
        assert_eq!(parse_date("date", "2024-03-15T10:30:00Z").unwrap(), expected);
        assert!(parse_date("date", "2024-02-30").is_err());
        assert!(parse_date("date", "15/03/2024").is_err());
        assert!(parse_date("date", "").is_err());
    }

    #[test]
    fn test_loose_number_coercion() {
        let json: LooseNumber = serde_json::from_str("10.5").unwrap();
        assert_eq!(json.to_decimal("price").unwrap(), Some(dec!(10.5)));

        let text: LooseNumber = serde_json::from_str("\"10,50\"").unwrap();
        assert_eq!(text.to_decimal("price").unwrap(), Some(dec!(10.50)));

        let blank = LooseNumber::from("  ");
        assert_eq!(blank.to_decimal("price").unwrap(), None);

        assert!(LooseNumber::from("dez").to_decimal("price").is_err());

        assert_eq!(LooseNumber::from("3").to_whole("quantity").unwrap(), Some(3));
        assert_eq!(LooseNumber::from(4).to_whole("quantity").unwrap(), Some(4));
        assert!(LooseNumber::from("2.5").to_whole("quantity").is_err());
        assert_eq!(coerce_whole("quantity", None).unwrap(), None);
    }
}
