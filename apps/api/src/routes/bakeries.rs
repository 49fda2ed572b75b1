//! Bakery routes.
//!
//! Bakeries follow the refetch policy: the client lists again after each
//! mutation. Creating and updating carry the embedded client rows; deleting
//! removes the bakery's clients in the same transaction.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use moinho_core::dashboard::FormMode;
use moinho_core::forms::{BakeryForm, EntityDraft};
use moinho_core::{Bakery, BakeryWithClients};

use super::forms::persist;
use super::{json_body, Created};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<Bakery>>, ApiError> {
    Ok(Json(state.db.bakeries().list(user.owner_id()).await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<BakeryWithClients>, ApiError> {
    state
        .db
        .bakeries()
        .get_with_clients(user.owner_id(), &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Bakery"))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<BakeryForm>, JsonRejection>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let draft = EntityDraft::Bakery(json_body(payload)?.validate()?);
    let id = persist(&state.db, user.owner_id(), &FormMode::Add, &draft).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<BakeryForm>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let draft = EntityDraft::Bakery(json_body(payload)?.validate()?);
    persist(&state.db, user.owner_id(), &FormMode::Edit { id }, &draft).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db.bakeries().delete(user.owner_id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{send, signup, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_bakery_needs_cpf_or_cnpj() {
        let (app, _) = test_app().await;
        let (token, _) = signup(&app, "ana@moinho.app").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/bakeries",
            Some(&token),
            Some(json!({ "name": "Padaria Central", "postalCode": "123" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["cpf"].is_array());
        assert!(body["fields"]["cnpj"].is_array());
        assert!(body["fields"]["postalCode"].is_array());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_clients() {
        let (app, _) = test_app().await;
        let (token, _) = signup(&app, "ana@moinho.app").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/bakeries",
            Some(&token),
            Some(json!({
                "name": "Padaria Central",
                "cnpj": "12.345.678/0001-90",
                "postalCode": "01310-100",
                "clients": [{ "name": "João Silva" }, { "name": "Maria Souza", "phone": "11 99999-0000" }, { "name": "" }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/api/bakeries/{}", body["id"].as_str().unwrap());

        let (_, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(body["postalCode"], "01310100");
        assert_eq!(body["clients"].as_array().unwrap().len(), 2);

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app, Method::GET, "/api/clients", Some(&token), None).await;
        assert_eq!(body, json!([]));
        let (status, _) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
