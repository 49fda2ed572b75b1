//! # Error Types
//!
//! Domain-specific error types for moinho-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  moinho-core errors (this file)                                        │
//! │  ├── ValidationError  - One field failed one rule                      │
//! │  ├── FormErrors       - Every failing field of a submitted form        │
//! │  ├── DashboardError   - Illegal form state transitions                 │
//! │  └── CoreError        - General domain errors                          │
//! │                                                                         │
//! │  moinho-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  moinho-api errors (in app)                                            │
//! │  └── ApiError         - What the web client sees (JSON)                │
//! │                                                                         │
//! │  Flow: ValidationError → FormErrors → ApiError (422) → inline messages │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// The `field` is the short field name used in the message; the full path
/// inside a form (e.g. `items[2].quantity`) lives in [`FieldError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Numeric value is below its minimum.
    #[error("{field} must be at least {min}")]
    BelowMinimum { field: String, min: String },

    /// Numeric value is above its maximum.
    #[error("{field} must be at most {max}")]
    AboveMaximum { field: String, max: String },

    /// The values are each fine but add up to more than can be stored.
    #[error("{field} add up to an amount too large to record")]
    TotalTooLarge { field: String },

    /// Invalid format (e.g., not a number, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A list that must not be empty.
    #[error("{field} must contain at least one item")]
    Empty { field: String },

    /// A list with too many entries.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// Cross-field rule: at least one of the fields must be filled.
    #[error("at least one of {} is required", .fields.join(" or "))]
    MissingOneOf { fields: Vec<String> },
}

// =============================================================================
// Form Errors
// =============================================================================

/// A validation failure attached to a path inside a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Path of the field, e.g. `items[0].unitPrice`.
    pub field: String,
    pub error: ValidationError,
}

/// All field failures of one form submission.
///
/// Validation keeps going after the first failure so the dialog can show
/// every message at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    errors: Vec<FieldError>,
}

impl FormErrors {
    pub fn new() -> Self {
        FormErrors::default()
    }

    /// Records a failure for `field`.
    pub fn push(&mut self, field: impl Into<String>, error: ValidationError) {
        self.errors.push(FieldError {
            field: field.into(),
            error,
        });
    }

    /// Runs a validator and records its error under `field`.
    ///
    /// Returns the validated value when the check passes.
    pub fn check<T>(
        &mut self,
        field: impl Into<String>,
        result: Result<T, ValidationError>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.push(field, error);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns the first error recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&ValidationError> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| &e.error)
    }

    /// Groups messages by field path, in the shape the web client renders
    /// under each input.
    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for e in &self.errors {
            map.entry(e.field.clone())
                .or_default()
                .push(e.error.to_string());
        }
        map
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.error))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FormErrors {}

// =============================================================================
// Dashboard Error
// =============================================================================

/// Rejected transitions of the add/edit dialog state machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DashboardError {
    /// A submit is already running for this dialog.
    #[error("A submission is already in progress")]
    SubmitInFlight,

    /// The action does not apply in the current state.
    #[error("Cannot {action} while {state}")]
    InvalidTransition { action: String, state: String },

    /// The submitted values failed validation; the dialog stays open.
    #[error("Form is invalid: {0}")]
    Invalid(FormErrors),
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Stored totals disagree with the line items.
    #[error("Sale {sale_id} totals do not match its items")]
    TotalsMismatch { sale_id: String },

    /// Adding up amounts went past what a decimal can hold.
    #[error("Amounts of {what} are too large to add up")]
    AmountOverflow { what: String },

    /// Unknown entity name in a route or form request.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// Form validation failed.
    #[error("Invalid form: {0}")]
    Form(#[from] FormErrors),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        };
        assert_eq!(err.to_string(), "password must be at least 8 characters");

        let err = ValidationError::MissingOneOf {
            fields: vec!["cpf".to_string(), "cnpj".to_string()],
        };
        assert_eq!(err.to_string(), "at least one of cpf or cnpj is required");
    }

    #[test]
    fn test_form_errors_collects_and_groups() {
        let mut errors = FormErrors::new();
        assert!(errors.is_empty());

        errors.push(
            "items[0].quantity",
            ValidationError::BelowMinimum {
                field: "quantity".to_string(),
                min: "1".to_string(),
            },
        );
        errors.push(
            "items[0].quantity",
            ValidationError::Required {
                field: "quantity".to_string(),
            },
        );
        errors.push(
            "bakeryId",
            ValidationError::Required {
                field: "bakery".to_string(),
            },
        );

        assert_eq!(errors.len(), 3);
        let map = errors.to_map();
        assert_eq!(map["items[0].quantity"].len(), 2);
        assert_eq!(map["bakeryId"], vec!["bakery is required".to_string()]);
        assert!(errors.get("bakeryId").is_some());
        assert!(errors.get("date").is_none());
    }

    #[test]
    fn test_check_returns_value_or_records() {
        let mut errors = FormErrors::new();
        let ok: Option<i64> = errors.check("a", Ok(5));
        assert_eq!(ok, Some(5));

        let bad: Option<i64> = errors.check(
            "b",
            Err(ValidationError::Required {
                field: "b".to_string(),
            }),
        );
        assert!(bad.is_none());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_form_errors_convert_to_core_error() {
        let mut errors = FormErrors::new();
        errors.push(
            "name",
            ValidationError::Required {
                field: "name".to_string(),
            },
        );
        let core: CoreError = errors.into();
        assert!(matches!(core, CoreError::Form(_)));
    }
}
