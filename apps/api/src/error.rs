//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Moinho                                 │
//! │                                                                         │
//! │  Browser                      Rust Backend                              │
//! │  ───────                      ────────────                              │
//! │                                                                         │
//! │  POST /api/sales                                                        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler                                                         │  │
//! │  │  Result<Json<T>, ApiError>                                       │  │
//! │  │         │                                                        │  │
//! │  │  FormErrors?      ──── 422 VALIDATION_ERROR + fields ───┐        │  │
//! │  │  DbError?         ──── 404 / 409 / 500 ─────────────────┤        │  │
//! │  │  DashboardError?  ──── 409 SUBMIT_IN_FLIGHT ────────────┤        │  │
//! │  │  Collaborator?    ──── 502 UPSTREAM_ERROR ──────────────┤        │  │
//! │  │                                                         ▼        │  │
//! │  │                                              (status, Json)      │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "VALIDATION_ERROR",                                         │
//! │    "message": "Please correct the highlighted fields",                 │
//! │    "fields": { "items[1].unitPrice": ["unit price must be ..."] } }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Store failures are logged with their details; the response only carries
//! a generic message.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use moinho_core::auth::AuthFailure;
use moinho_core::{CoreError, DashboardError, FormErrors};
use moinho_db::DbError;

/// Where the client should go after an authentication failure.
pub const LOGIN_PATH: &str = "/login";

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Sale not found"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Per-field messages when a form failed validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,

    /// Path the client should navigate to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed request (400)
    BadRequest,

    /// Resource not found for this account (404)
    NotFound,

    /// Form validation failed (422)
    ValidationError,

    /// Unique constraint or invalid state (409)
    Conflict,

    /// A submit is already running for this dialog (409)
    SubmitInFlight,

    /// Missing, invalid, expired, or signed-out token (401)
    Unauthenticated,

    /// Wrong email or password (401)
    InvalidCredentials,

    /// No account with this email (401)
    UserNotFound,

    /// Email already registered (409)
    EmailInUse,

    /// Other sign-in or sign-up failure (401)
    AuthError,

    /// Store operation failed (500)
    DatabaseError,

    /// Payment or postal collaborator failed (502)
    UpstreamError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::Conflict | ErrorCode::SubmitInFlight | ErrorCode::EmailInUse => {
                StatusCode::CONFLICT
            }
            ErrorCode::Unauthenticated
            | ErrorCode::InvalidCredentials
            | ErrorCode::UserNotFound
            | ErrorCode::AuthError => StatusCode::UNAUTHORIZED,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            fields: None,
            redirect: None,
        }
    }

    pub fn not_found(resource: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::BadRequest, message)
    }

    /// 401 that sends the client back to the login page.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError {
            redirect: Some(LOGIN_PATH.to_string()),
            ..ApiError::new(ErrorCode::Unauthenticated, message)
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::UpstreamError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, .. } => ApiError::not_found(&entity),
            DbError::UniqueViolation { field, .. } => {
                ApiError::new(ErrorCode::Conflict, format!("{} already exists", field))
            }
            DbError::ForeignKeyViolation { message } => {
                error!(%message, "Foreign key violation");
                ApiError::new(ErrorCode::Conflict, "Invalid reference")
            }
            DbError::PoolExhausted => {
                error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "The database is busy, try again")
            }
            other => {
                // Log the actual error but return a generic message
                error!(error = %other, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<FormErrors> for ApiError {
    fn from(errors: FormErrors) -> Self {
        ApiError {
            fields: Some(errors.to_map()),
            ..ApiError::new(ErrorCode::ValidationError, "Please correct the highlighted fields")
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::SubmitInFlight => ApiError::new(ErrorCode::SubmitInFlight, err.to_string()),
            DashboardError::InvalidTransition { .. } => ApiError::new(ErrorCode::Conflict, err.to_string()),
            DashboardError::Invalid(errors) => errors.into(),
        }
    }
}

impl From<AuthFailure> for ApiError {
    fn from(failure: AuthFailure) -> Self {
        let code = match failure {
            AuthFailure::InvalidCredentials => ErrorCode::InvalidCredentials,
            AuthFailure::UserNotFound => ErrorCode::UserNotFound,
            AuthFailure::EmailInUse => ErrorCode::EmailInUse,
            AuthFailure::Other => ErrorCode::AuthError,
        };
        ApiError::new(code, failure.user_message())
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownEntity(name) => {
                ApiError::new(ErrorCode::NotFound, format!("Unknown entity: {}", name))
            }
            CoreError::Form(errors) => errors.into(),
            CoreError::Validation(e) => ApiError::new(ErrorCode::ValidationError, e.to_string()),
            CoreError::TotalsMismatch { sale_id } => {
                error!(%sale_id, "Sale totals do not match its items");
                ApiError::internal("Sale totals are inconsistent")
            }
            CoreError::AmountOverflow { what } => {
                error!(%what, "Amount overflow while totalling");
                ApiError::internal("Totals are too large to add up")
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::bad_request(format!("Malformed form values: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moinho_core::ValidationError;

    #[test]
    fn test_db_errors_map_to_status() {
        let err: ApiError = DbError::not_found("Sale", "s-1").into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Sale not found");

        let err: ApiError = DbError::duplicate("email", "a@b.c").into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: ApiError = DbError::QueryFailed("disk I/O error".to_string()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_form_errors_carry_fields() {
        let mut errors = FormErrors::new();
        errors.push(
            "items[1].unitPrice",
            ValidationError::BelowMinimum {
                field: "unit price".to_string(),
                min: "0.01".to_string(),
            },
        );

        let err: ApiError = errors.into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = serde_json::to_value(&err).unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["fields"]["items[1].unitPrice"].is_array());
        assert!(body.get("redirect").is_none());
    }

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        let body = serde_json::to_value(ApiError::unauthenticated("Token expired")).unwrap();
        assert_eq!(body["code"], "UNAUTHENTICATED");
        assert_eq!(body["redirect"], "/login");
    }

    #[test]
    fn test_dashboard_and_auth_errors() {
        let err: ApiError = DashboardError::SubmitInFlight.into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code, ErrorCode::SubmitInFlight);

        let err: ApiError = AuthFailure::EmailInUse.into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.message, "This email is already in use.");

        let err: ApiError = AuthFailure::InvalidCredentials.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_amount_overflow_is_a_server_error() {
        let err: ApiError = CoreError::AmountOverflow {
            what: "the sales list".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "Totals are too large to add up");
    }
}
