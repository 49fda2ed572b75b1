//! # HTTP Routes
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  /health                         liveness + database                    │
//! │                                                                         │
//! │  /api/auth/*                     signup, login, logout, session (SSE)   │
//! │  /api/flours      /api/sales     CRUD, live policy                      │
//! │  /api/bakeries    /api/clients   CRUD, refetch policy                   │
//! │  /api/live/{entity}              SSE snapshots (flours, sales)          │
//! │  /api/forms/*                    dialog sessions (open/submit/cancel)   │
//! │  /api/create-subscription        Mercado Pago checkout URL              │
//! │  /api/postal/{code}              CEP lookup                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything under `/api` except signup and login requires a bearer token
//! (see [`crate::auth::AuthUser`]).

pub mod auth;
pub mod bakeries;
pub mod billing;
pub mod clients;
pub mod flours;
pub mod forms;
pub mod live;
pub mod sales;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::session))
        .route("/auth/session/stream", get(auth::session_stream))
        .route("/flours", get(flours::list).post(flours::create))
        .route("/flours/{id}", put(flours::update).delete(flours::delete))
        .route("/bakeries", get(bakeries::list).post(bakeries::create))
        .route(
            "/bakeries/{id}",
            get(bakeries::get).put(bakeries::update).delete(bakeries::delete),
        )
        .route("/clients", get(clients::list).post(clients::create))
        .route("/clients/{id}", put(clients::update).delete(clients::delete))
        .route("/sales", get(sales::list).post(sales::create))
        .route("/sales/{id}", get(sales::get).put(sales::update).delete(sales::delete))
        .route("/live/{entity}", get(live::stream))
        .route("/forms", post(forms::open))
        .route("/forms/{token}", get(forms::view).delete(forms::cancel))
        .route("/forms/{token}/submit", post(forms::submit))
        .route("/create-subscription", post(billing::create_subscription))
        .route("/postal/{code}", get(billing::postal_lookup));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
}

/// Unwraps a JSON body, turning axum's rejection into an [`ApiError`].
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Returned by create endpoints.
#[derive(Debug, Serialize)]
pub struct Created {
    pub id: String,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    database: &'static str,
    pending_migrations: usize,
    version: &'static str,
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Health>) {
    let database_up = state.db.health_check().await;
    if !database_up {
        warn!("Health check: database unavailable");
    }
    let pending_migrations = match state.db.migration_status().await {
        Ok((total, applied)) => total.saturating_sub(applied),
        Err(_) => 0,
    };

    let status = if database_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(Health {
            status: if database_up { "ok" } else { "degraded" },
            database: if database_up { "up" } else { "down" },
            pending_migrations,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
