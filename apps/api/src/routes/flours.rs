//! Flour routes. Flours are a live list (see [`super::live`]).

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use moinho_core::dashboard::FormMode;
use moinho_core::forms::{EntityDraft, FlourForm};
use moinho_core::Flour;

use super::forms::persist;
use super::{json_body, Created};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<Flour>>, ApiError> {
    Ok(Json(state.db.flours().list(user.owner_id()).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<FlourForm>, JsonRejection>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let draft = EntityDraft::Flour(json_body(payload)?.validate()?);
    let id = persist(&state.db, user.owner_id(), &FormMode::Add, &draft).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<FlourForm>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let draft = EntityDraft::Flour(json_body(payload)?.validate()?);
    persist(&state.db, user.owner_id(), &FormMode::Edit { id }, &draft).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db.flours().delete(user.owner_id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{send, signup, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_flour_crud_is_private() {
        let (app, _) = test_app().await;
        let (ana, _) = signup(&app, "ana@moinho.app").await;
        let (bia, _) = signup(&app, "bia@moinho.app").await;

        let (status, body) =
            send(&app, Method::POST, "/api/flours", Some(&ana), Some(json!({ "name": "Integral" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) =
            send(&app, Method::POST, "/api/flours", Some(&ana), Some(json!({ "name": "ab" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["name"].is_array());

        let uri = format!("/api/flours/{}", id);
        let (status, _) = send(&app, Method::PUT, &uri, Some(&bia), Some(json!({ "name": "Roubada" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::PUT, &uri, Some(&ana), Some(json!({ "name": "Integral Fina" }))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app, Method::GET, "/api/flours", Some(&ana), None).await;
        assert_eq!(body[0]["name"], "Integral Fina");
        let (_, body) = send(&app, Method::GET, "/api/flours", Some(&bia), None).await;
        assert_eq!(body, json!([]));

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&ana), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&ana), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
