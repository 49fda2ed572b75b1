//! Auth failure codes and the phrases shown on the login and signup pages.
//!
//! The codes are stable strings carried in API error bodies; a client that
//! only has a code can still pick the right message with
//! [`AuthFailure::from_code`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum AuthFailure {
    InvalidCredentials,
    UserNotFound,
    EmailInUse,
    Other,
}

impl AuthFailure {
    /// Maps an error code to a failure kind.
    ///
    /// Accepts our own codes and the `auth/...` codes hosted auth providers
    /// use. Anything else is `Other`.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "INVALID_CREDENTIALS" | "auth/invalid-credential" | "auth/wrong-password"
            | "auth/invalid-email" => AuthFailure::InvalidCredentials,
            "USER_NOT_FOUND" | "auth/user-not-found" => AuthFailure::UserNotFound,
            "EMAIL_IN_USE" | "auth/email-already-in-use" => AuthFailure::EmailInUse,
            _ => AuthFailure::Other,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthFailure::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthFailure::UserNotFound => "USER_NOT_FOUND",
            AuthFailure::EmailInUse => "EMAIL_IN_USE",
            AuthFailure::Other => "AUTH_ERROR",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AuthFailure::InvalidCredentials => "Invalid email or password.",
            AuthFailure::UserNotFound => "No account found with this email.",
            AuthFailure::EmailInUse => "This email is already in use.",
            AuthFailure::Other => "Something went wrong. Please try again.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(
            AuthFailure::from_code("auth/invalid-credential"),
            AuthFailure::InvalidCredentials
        );
        assert_eq!(
            AuthFailure::from_code("auth/user-not-found"),
            AuthFailure::UserNotFound
        );
        assert_eq!(
            AuthFailure::from_code("auth/email-already-in-use"),
            AuthFailure::EmailInUse
        );
        assert_eq!(AuthFailure::from_code("EMAIL_IN_USE"), AuthFailure::EmailInUse);
        assert_eq!(AuthFailure::from_code("auth/too-many-requests"), AuthFailure::Other);
    }

    #[test]
    fn test_codes_round_trip() {
        for failure in [
            AuthFailure::InvalidCredentials,
            AuthFailure::UserNotFound,
            AuthFailure::EmailInUse,
        ] {
            assert_eq!(AuthFailure::from_code(failure.code()), failure);
            assert!(!failure.user_message().is_empty());
        }
    }
}
