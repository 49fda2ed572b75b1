//! Client routes. The list is joined with bakery names and can be
//! filtered with `?q=`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use moinho_core::dashboard::FormMode;
use moinho_core::forms::{ClientForm, EntityDraft};
use moinho_core::ClientWithBakery;

use super::forms::persist;
use super::{json_body, Created};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ClientQuery {
    pub q: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ClientQuery>,
) -> Result<Json<Vec<ClientWithBakery>>, ApiError> {
    let mut rows = state.db.clients().list_with_bakery(user.owner_id()).await?;
    if let Some(term) = query.q.as_deref() {
        rows.retain(|row| row.matches(term));
    }
    Ok(Json(rows))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<ClientForm>, JsonRejection>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let draft = EntityDraft::Client(json_body(payload)?.validate()?);
    let id = persist(&state.db, user.owner_id(), &FormMode::Add, &draft).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<ClientForm>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let draft = EntityDraft::Client(json_body(payload)?.validate()?);
    persist(&state.db, user.owner_id(), &FormMode::Edit { id }, &draft).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db.clients().delete(user.owner_id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{create_bakery, send, signup, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_search_by_client_or_bakery() {
        let (app, _) = test_app().await;
        let (token, _) = signup(&app, "ana@moinho.app").await;
        let central = create_bakery(&app, &token, "Padaria Central").await;
        let trigo = create_bakery(&app, &token, "Casa do Trigo").await;

        for (name, bakery) in [("João Silva", &central), ("Pedro Pão", &trigo)] {
            let (status, _) = send(
                &app,
                Method::POST,
                "/api/clients",
                Some(&token),
                Some(json!({ "name": name, "bakeryId": bakery })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, body) = send(&app, Method::GET, "/api/clients?q=central", Some(&token), None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], "João Silva");
        assert_eq!(body[0]["bakeryName"], "Padaria Central");

        let (_, body) = send(&app, Method::GET, "/api/clients?q=PEDRO", Some(&token), None).await;
        assert_eq!(body[0]["bakeryName"], "Casa do Trigo");

        let (_, body) = send(&app, Method::GET, "/api/clients", Some(&token), None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_client_for_foreign_bakery_rejected() {
        let (app, _) = test_app().await;
        let (ana, _) = signup(&app, "ana@moinho.app").await;
        let (bia, _) = signup(&app, "bia@moinho.app").await;
        let bakery = create_bakery(&app, &ana, "Padaria Central").await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/clients",
            Some(&bia),
            Some(json!({ "name": "Intrusa", "bakeryId": bakery })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
