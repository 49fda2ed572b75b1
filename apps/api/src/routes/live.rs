//! # Live Lists
//!
//! `GET /api/live/{entity}` streams full snapshots of the caller's list as
//! server-sent events. Only entities with the live refresh policy (sales,
//! flours) are streamed; bakeries and clients are refetched by the client.
//!
//! ## Stream Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subscribe ChangeFeed ──► snapshot ──► wait ─┬─ change for (owner, entity)│
//! │                                              │    └─► snapshot, wait     │
//! │                                              ├─ lagged ─► snapshot, wait │
//! │                                              ├─ session signed out       │
//! │                                              │    └─► signedOut, end     │
//! │                                              └─ client gone ─► end       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events carry no row data, so a lagging subscriber loses nothing: the
//! next snapshot is complete.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, warn};

use moinho_core::{CurrencyFormat, EntityKind, RefreshPolicy};
use moinho_db::{ChangeEvent, Database};

use super::sales::SalesPage;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::{AppState, SessionState};

/// Buffered events per stream before the pump waits for the client.
const STREAM_BUFFER: usize = 8;

/// Builds a named SSE event with a JSON payload.
pub(crate) fn json_event<T: Serialize>(name: &str, data: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(data)
        .unwrap_or_else(|e| {
            warn!(error = %e, event = name, "Failed to serialize event");
            Event::default().comment("serialization failed")
        })
}

/// The current list of `kind` for `owner_id`, as the matching list
/// endpoint returns it.
async fn snapshot(db: &Database, owner_id: &str, kind: EntityKind, format: &CurrencyFormat) -> Result<Value, ApiError> {
    let value = match kind {
        EntityKind::Sale => serde_json::to_value(SalesPage::load(db, owner_id, format).await?)?,
        EntityKind::Flour => serde_json::to_value(db.flours().list(owner_id).await?)?,
        EntityKind::Bakery => serde_json::to_value(db.bakeries().list(owner_id).await?)?,
        EntityKind::Client => serde_json::to_value(db.clients().list_with_bakery(owner_id).await?)?,
    };
    Ok(value)
}

struct Pump {
    db: Database,
    owner_id: String,
    kind: EntityKind,
    format: CurrencyFormat,
    changes: broadcast::Receiver<ChangeEvent>,
    session: watch::Receiver<SessionState>,
    tx: mpsc::Sender<Result<Event, Infallible>>,
}

impl Pump {
    /// Sends a fresh snapshot. `false` once the client is gone.
    async fn send_snapshot(&self) -> bool {
        let event = match snapshot(&self.db, &self.owner_id, self.kind, &self.format).await {
            Ok(value) => json_event("snapshot", &value),
            Err(err) => {
                warn!(entity = %self.kind, error = %err, "Live snapshot failed");
                json_event("error", &err)
            }
        };
        self.tx.send(Ok(event)).await.is_ok()
    }

    async fn run(mut self) {
        if !self.send_snapshot().await {
            return;
        }

        loop {
            tokio::select! {
                _ = self.tx.closed() => break,

                changed = self.session.changed() => {
                    let signed_out = changed.is_err()
                        || matches!(*self.session.borrow_and_update(), SessionState::SignedOut);
                    if signed_out {
                        let _ = self.tx.send(Ok(json_event("session", &SessionState::SignedOut))).await;
                        break;
                    }
                }

                received = self.changes.recv() => {
                    let refresh = match received {
                        Ok(event) => event.affects(&self.owner_id, self.kind),
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "Live stream lagged; resending snapshot");
                            true
                        }
                        Err(RecvError::Closed) => break,
                    };
                    if refresh && !self.send_snapshot().await {
                        break;
                    }
                }
            }
        }

        debug!(entity = %self.kind, "Live stream ended");
    }
}

pub async fn stream(
    State(state): State<AppState>,
    user: AuthUser,
    Path(entity): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let kind: EntityKind = entity.parse()?;
    if kind.refresh_policy() != RefreshPolicy::Live {
        return Err(ApiError::bad_request(format!(
            "{} lists are not streamed; fetch them again after changes",
            kind
        )));
    }

    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let pump = Pump {
        changes: state.db.changes().subscribe(),
        session: state.sessions.subscribe(&user.jti, &user.identity),
        db: state.db.clone(),
        owner_id: user.owner_id().to_string(),
        kind,
        format: state.config.currency_format(),
        tx,
    };
    tokio::spawn(pump.run());

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{next_frame, send, signup, test_app, test_request};
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_snapshot_then_refresh_on_change() {
        let (app, _) = test_app().await;
        let (token, _) = signup(&app, "ana@moinho.app").await;
        let (other, _) = signup(&app, "bia@moinho.app").await;

        let response = app
            .clone()
            .oneshot(test_request(Method::GET, "/api/live/flours", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let mut body = response.into_body();

        let first = next_frame(&mut body).await.unwrap();
        assert!(first.contains("event: snapshot"));
        assert!(first.contains("data: []"));

        send(&app, Method::POST, "/api/flours", Some(&other), Some(json!({ "name": "Alheia" }))).await;
        send(&app, Method::POST, "/api/flours", Some(&token), Some(json!({ "name": "Integral" }))).await;

        let next = next_frame(&mut body).await.unwrap();
        assert!(next.contains("Integral"));
        assert!(!next.contains("Alheia"));
    }

    #[tokio::test]
    async fn test_logout_ends_live_stream() {
        let (app, _) = test_app().await;
        let (token, _) = signup(&app, "ana@moinho.app").await;

        let uri = format!("/api/live/sales?access_token={}", token);
        let response = app.clone().oneshot(test_request(Method::GET, &uri, None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let mut body = response.into_body();

        let first = next_frame(&mut body).await.unwrap();
        assert!(first.contains("\"summary\""));

        send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;

        let last = next_frame(&mut body).await.unwrap();
        assert!(last.contains("signedOut"));
        assert!(next_frame(&mut body).await.is_none());
    }

    #[tokio::test]
    async fn test_refetch_entities_are_not_streamed() {
        let (app, _) = test_app().await;
        let (token, _) = signup(&app, "ana@moinho.app").await;

        let (status, body) = send(&app, Method::GET, "/api/live/bakeries", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, _) = send(&app, Method::GET, "/api/live/invoices", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
