//! Routes backed by outbound collaborators: the Plano PRO subscription
//! checkout and the bakery dialog's postal-code lookup.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use moinho_core::validation::validate_postal_code;
use moinho_core::CoreError;

use super::json_body;
use crate::auth::AuthUser;
use crate::collaborators::postal::PostalAddress;
use crate::collaborators::CollaboratorError;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionRequest {
    pub user_email: String,
    pub user_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub checkout_url: String,
}

/// Errors on this route are `{ "error": message }`, the shape the checkout
/// button reads.
pub struct SubscriptionError(ApiError);

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        (self.0.status(), Json(json!({ "error": self.0.message }))).into_response()
    }
}

impl From<ApiError> for SubscriptionError {
    fn from(err: ApiError) -> Self {
        SubscriptionError(err)
    }
}

impl From<CollaboratorError> for SubscriptionError {
    fn from(err: CollaboratorError) -> Self {
        SubscriptionError(err.into())
    }
}

/// `POST /api/create-subscription` → `{ checkoutUrl }`.
pub async fn create_subscription(
    State(state): State<AppState>,
    _user: AuthUser,
    payload: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> Result<Json<SubscriptionResponse>, SubscriptionError> {
    let request = json_body(payload)?;
    let email = request.user_email.trim();
    let name = request.user_name.trim();
    if email.is_empty() || name.is_empty() {
        return Err(ApiError::bad_request("userEmail and userName are required").into());
    }

    let checkout_url = state.checkout.create_subscription(email, name).await?;
    Ok(Json(SubscriptionResponse { checkout_url }))
}

/// `GET /api/postal/{code}`; the code may carry a hyphen.
pub async fn postal_lookup(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(code): Path<String>,
) -> Result<Json<PostalAddress>, ApiError> {
    let cep = validate_postal_code(&code).map_err(CoreError::from)?;

    state
        .postal
        .lookup(&cep)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Postal code"))
}

#[cfg(test)]
mod tests {
    use crate::collaborators::test_server;
    use crate::config::AppConfig;
    use crate::test_support::{send, signup, test_app_with};
    use axum::extract::Path;
    use axum::http::{Method, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn fake_upstream() -> String {
        let router = Router::new()
            .route(
                "/preapproval",
                post(|Json(body): Json<Value>| async move {
                    let id = body["payer_email"].as_str().unwrap_or_default().to_string();
                    Json(json!({ "id": id, "init_point": "https://mp.test/checkout" }))
                }),
            )
            .route(
                "/ws/{cep}/json/",
                get(|Path(cep): Path<String>| async move {
                    if cep == "01310100" {
                        Json(json!({ "logradouro": "Avenida Paulista", "bairro": "Bela Vista", "localidade": "São Paulo", "uf": "SP" }))
                    } else {
                        Json(json!({ "erro": true }))
                    }
                }),
            );
        test_server::spawn(router).await
    }

    async fn app() -> (Router, String) {
        let upstream = fake_upstream().await;
        let mut config = AppConfig::defaults().unwrap();
        config.checkout.base_url = upstream.clone();
        config.checkout.access_token = Some("test-token".to_string());
        config.postal.base_url = upstream;

        let (app, _) = test_app_with(config).await;
        let (token, _) = signup(&app, "ana@moinho.app").await;
        (app, token)
    }

    #[tokio::test]
    async fn test_create_subscription() {
        let (app, token) = app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/create-subscription",
            Some(&token),
            Some(json!({ "userEmail": "ana@moinho.app", "userName": "Ana" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checkoutUrl"], "https://mp.test/checkout");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/create-subscription",
            Some(&token),
            Some(json!({ "userEmail": "ana@moinho.app" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_subscription_without_checkout_token() {
        let (app, _) = crate::test_support::test_app().await;
        let (token, _) = signup(&app, "ana@moinho.app").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/create-subscription",
            Some(&token),
            Some(json!({ "userEmail": "ana@moinho.app", "userName": "Ana" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].is_string());
        assert!(body.get("checkoutUrl").is_none());
    }

    #[tokio::test]
    async fn test_postal_lookup() {
        let (app, token) = app().await;

        let (status, body) = send(&app, Method::GET, "/api/postal/01310-100", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["street"], "Avenida Paulista");
        assert_eq!(body["postalCode"], "01310100");

        let (status, _) = send(&app, Method::GET, "/api/postal/99999999", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, Method::GET, "/api/postal/123", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}
