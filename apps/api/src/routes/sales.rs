//! Sale routes.
//!
//! The list carries the dashboard footer: the count and summed totals, both
//! as exact amounts and formatted for display. Totals always come from the
//! items; any totals a client sends are ignored.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use moinho_core::aggregation::{summarize, SalesSummary};
use moinho_core::dashboard::FormMode;
use moinho_core::forms::{EntityDraft, SaleForm};
use moinho_core::{CurrencyFormat, Sale};
use moinho_db::Database;

use super::forms::persist;
use super::{json_body, Created};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Footer totals rendered with the configured currency format.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDisplay {
    pub total_value: String,
    pub total_commission: String,
}

/// The sales dashboard: rows plus footer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesPage {
    pub sales: Vec<Sale>,
    pub summary: SalesSummary,
    pub display: SummaryDisplay,
}

impl SalesPage {
    pub async fn load(db: &Database, owner_id: &str, format: &CurrencyFormat) -> Result<Self, ApiError> {
        let sales = db.sales().list(owner_id).await?;
        let summary = summarize(&sales)?;
        let display = SummaryDisplay {
            total_value: summary.total_value.format(format),
            total_commission: summary.total_commission.format(format),
        };
        Ok(SalesPage {
            sales,
            summary,
            display,
        })
    }
}

pub async fn list(State(state): State<AppState>, user: AuthUser) -> Result<Json<SalesPage>, ApiError> {
    let page = SalesPage::load(&state.db, user.owner_id(), &state.config.currency_format()).await?;
    Ok(Json(page))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Sale>, ApiError> {
    state
        .db
        .sales()
        .get(user.owner_id(), &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Sale"))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<SaleForm>, JsonRejection>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let draft = EntityDraft::Sale(json_body(payload)?.validate()?);
    let id = persist(&state.db, user.owner_id(), &FormMode::Add, &draft).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// Replaces the sale's date, bakery, and full item list.
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<SaleForm>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let draft = EntityDraft::Sale(json_body(payload)?.validate()?);
    persist(&state.db, user.owner_id(), &FormMode::Edit { id }, &draft).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.db.sales().delete(user.owner_id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{create_bakery, send, signup, test_app};
    use axum::http::{Method, StatusCode};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    fn amount(value: &Value) -> Decimal {
        value.as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_totals_come_from_items() {
        let (app, _) = test_app().await;
        let (token, _) = signup(&app, "ana@moinho.app").await;
        let bakery = create_bakery(&app, &token, "Padaria Central").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/sales",
            Some(&token),
            Some(json!({
                "bakeryId": bakery,
                "date": "2024-05-02",
                "totalValue": "999",
                "items": [
                    { "flourName": "Especial", "quantity": "2", "unitPrice": "10", "commissionPercent": 5 },
                    { "flourName": "Integral", "quantity": 1, "unitPrice": 20 }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/api/sales/{}", body["id"].as_str().unwrap());

        let (_, sale) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(sale["buyerName"], "Padaria Central");
        assert_eq!(sale["items"].as_array().unwrap().len(), 2);

        let (_, page) = send(&app, Method::GET, "/api/sales", Some(&token), None).await;
        assert_eq!(page["summary"]["count"], 1);
        assert_eq!(amount(&page["summary"]["totalValue"]), Decimal::from(40));
        assert_eq!(page["display"]["totalValue"], "R$ 40,00");
        assert_eq!(page["display"]["totalCommission"], "R$ 1,00");
    }

    #[tokio::test]
    async fn test_invalid_sale_reports_every_field() {
        let (app, _) = test_app().await;
        let (token, _) = signup(&app, "ana@moinho.app").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/sales",
            Some(&token),
            Some(json!({
                "bakeryId": "",
                "date": "2024-02-30",
                "items": [
                    { "flourName": "Especial", "quantity": 1, "unitPrice": 10 },
                    { "flourName": "Integral", "quantity": 1, "unitPrice": 0 }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["bakeryId"].is_array());
        assert!(body["fields"]["date"].is_array());
        assert!(body["fields"]["items[1].unitPrice"].is_array());

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/sales",
            Some(&token),
            Some(json!({ "bakeryId": "b-1", "date": "2024-05-02", "items": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["items"].is_array());
    }

    #[tokio::test]
    async fn test_price_above_maximum_is_rejected() {
        let (app, _) = test_app().await;
        let (token, _) = signup(&app, "ana@moinho.app").await;
        let bakery = create_bakery(&app, &token, "Padaria Central").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/sales",
            Some(&token),
            Some(json!({
                "bakeryId": bakery,
                "date": "2024-05-02",
                "items": [{ "flourName": "Especial", "quantity": 2, "unitPrice": "79228162514264337593543950335" }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fields"]["items[0].unitPrice"][0], "unit price must be at most 1000000");

        let (status, page) = send(&app, Method::GET, "/api/sales", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["summary"]["count"], 0);
    }

    #[tokio::test]
    async fn test_footer_overflow_is_an_error_response() {
        let (app, state) = test_app().await;
        let (token, owner) = signup(&app, "ana@moinho.app").await;
        let bakery = create_bakery(&app, &token, "Padaria Central").await;
        let sale = json!({
            "bakeryId": bakery,
            "date": "2024-05-02",
            "items": [{ "flourName": "Especial", "quantity": 1, "unitPrice": 10 }]
        });
        send(&app, Method::POST, "/api/sales", Some(&token), Some(sale.clone())).await;
        send(&app, Method::POST, "/api/sales", Some(&token), Some(sale)).await;

        // Rows written before prices were bounded.
        sqlx::query("UPDATE sales SET total_value = '50000000000000000000000000000' WHERE owner_id = ?1")
            .bind(&owner)
            .execute(state.db.pool())
            .await
            .unwrap();

        let (status, body) = send(&app, Method::GET, "/api/sales", Some(&token), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL");

        let (status, _) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_edit_replaces_items() {
        let (app, _) = test_app().await;
        let (token, _) = signup(&app, "ana@moinho.app").await;
        let bakery = create_bakery(&app, &token, "Padaria Central").await;
        let sale = |qty: i64| {
            json!({
                "bakeryId": bakery,
                "date": "2024-05-02",
                "items": [{ "flourName": "Especial", "quantity": qty, "unitPrice": 5, "commissionPercent": 10 }]
            })
        };

        let (_, body) = send(&app, Method::POST, "/api/sales", Some(&token), Some(sale(3))).await;
        let uri = format!("/api/sales/{}", body["id"].as_str().unwrap());
        let (_, before) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(amount(&before["totalValue"]), Decimal::from(15));
        assert_eq!(amount(&before["totalCommission"]), Decimal::new(15, 1));

        let (status, _) = send(&app, Method::PUT, &uri, Some(&token), Some(sale(1))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, after) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(amount(&after["totalValue"]), Decimal::from(5));
        assert_eq!(amount(&after["totalCommission"]), Decimal::new(5, 1));
        assert_eq!(after["items"].as_array().unwrap().len(), 1);
    }
}
