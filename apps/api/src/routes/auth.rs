//! Account routes: signup, login, logout, and the session endpoints.
//!
//! ```text
//! signup/login ──► IssuedToken { token, expiresAt } + identity
//! logout       ──► revoked_tokens row ──► SessionHub::sign_out(jti)
//!                                          └─► session stream: signedOut, end
//! ```

use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use moinho_core::auth::AuthFailure;
use moinho_core::forms::{LoginForm, SignupForm};
use moinho_core::{Identity, User};
use moinho_db::DbError;

use super::json_body;
use super::live::json_event;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Response of signup and login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub identity: Identity,
}

fn respond(state: &AppState, user: &User) -> Result<AuthResponse, ApiError> {
    let issued = state.jwt.issue(user)?;
    Ok(AuthResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        identity: Identity::from(user),
    })
}

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupForm>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let signup = json_body(payload)?.validate()?;

    let user = state
        .db
        .users()
        .create(&signup.email, &signup.full_name, &signup.password)
        .await
        .map_err(|e| match e {
            DbError::UniqueViolation { .. } => ApiError::from(AuthFailure::EmailInUse),
            other => ApiError::from(other),
        })?;

    info!(user_id = %user.id, "Account created");
    Ok((StatusCode::CREATED, Json(respond(&state, &user)?)))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginForm>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let credentials = json_body(payload)?.validate()?;

    let stored = state
        .db
        .users()
        .find_by_email(&credentials.email)
        .await?
        .ok_or(AuthFailure::UserNotFound)?;

    if !stored.verify_password(&credentials.password) {
        warn!(user_id = %stored.user.id, "Login with wrong password");
        return Err(AuthFailure::InvalidCredentials.into());
    }

    info!(user_id = %stored.user.id, "Signed in");
    Ok(Json(respond(&state, &stored.user)?))
}

/// Revokes the request's token and signs out its listeners.
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> Result<StatusCode, ApiError> {
    state
        .db
        .users()
        .revoke_token(&user.jti, user.owner_id(), user.expires_at)
        .await?;
    state.sessions.sign_out(&user.jti);

    info!(user_id = %user.owner_id(), "Signed out");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn session(user: AuthUser) -> Json<Identity> {
    Json(user.identity)
}

/// `session` events: the identity now, then `signedOut` when the token
/// logs out, after which the stream ends.
pub async fn session_stream(
    State(state): State<AppState>,
    user: AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.sessions.subscribe(&user.jti, &user.identity);
    let events = WatchStream::new(rx).map(|session| Ok(json_event("session", &session)));
    Sse::new(events).keep_alive(KeepAlive::default())
}
