//! Dialog session routes.
//!
//! A dashboard dialog opens a form session, submits through it, and the
//! session's state machine makes sure only one submit is in flight.
//!
//! ```text
//! POST   /api/forms                 { entity, editId? }  ──► FormView (201)
//! GET    /api/forms/{token}                              ──► FormView
//! POST   /api/forms/{token}/submit  form values          ──► { id, entity, mode }
//! DELETE /api/forms/{token}                              ──► 204
//! ```

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tracing::{error, info, warn};

use moinho_core::dashboard::{FormMode, Submission};
use moinho_core::forms::{BakeryForm, ClientForm, EntityDraft, EntityForm, FlourForm, SaleForm};
use moinho_core::EntityKind;
use moinho_db::{Database, DbResult};

use super::json_body;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::forms::FormView;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRequest {
    /// `sale`, `flour`, `bakery`, `client` (plurals accepted)
    pub entity: String,
    pub edit_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Saved {
    pub id: String,
    pub entity: EntityKind,
    #[serde(flatten)]
    pub mode: FormMode,
}

/// Writes a validated draft: creates in add mode, replaces in edit mode.
///
/// Returns the id of the written record.
pub(crate) async fn persist(
    db: &Database,
    owner_id: &str,
    mode: &FormMode,
    draft: &EntityDraft,
) -> DbResult<String> {
    let edit_id = match mode {
        FormMode::Add => None,
        FormMode::Edit { id } => Some(id.as_str()),
    };

    match (draft, edit_id) {
        (EntityDraft::Sale(d), None) => db.sales().create(owner_id, d).await,
        (EntityDraft::Sale(d), Some(id)) => db.sales().update(owner_id, id, d).await.map(|_| id.to_string()),
        (EntityDraft::Flour(d), None) => db.flours().create(owner_id, d).await,
        (EntityDraft::Flour(d), Some(id)) => db.flours().update(owner_id, id, d).await.map(|_| id.to_string()),
        (EntityDraft::Bakery(d), id) => db.bakeries().save_with_clients(owner_id, id, d).await,
        (EntityDraft::Client(d), None) => db.clients().create(owner_id, d).await,
        (EntityDraft::Client(d), Some(id)) => {
            db.clients().update(owner_id, id, d).await.map(|_| id.to_string())
        }
    }
}

fn label(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Sale => "Sale",
        EntityKind::Flour => "Flour",
        EntityKind::Bakery => "Bakery",
        EntityKind::Client => "Client",
    }
}

/// The stored record as dialog values.
async fn load_values(db: &Database, owner_id: &str, kind: EntityKind, id: &str) -> Result<EntityForm, ApiError> {
    let values = match kind {
        EntityKind::Sale => db
            .sales()
            .get(owner_id, id)
            .await?
            .map(|sale| EntityForm::Sale(SaleForm::from_sale(&sale))),
        EntityKind::Flour => db
            .flours()
            .get(owner_id, id)
            .await?
            .map(|flour| EntityForm::Flour(FlourForm::from_flour(&flour))),
        EntityKind::Bakery => db
            .bakeries()
            .get_with_clients(owner_id, id)
            .await?
            .map(|bakery| EntityForm::Bakery(BakeryForm::from_bakery(&bakery))),
        EntityKind::Client => db
            .clients()
            .get(owner_id, id)
            .await?
            .map(|client| EntityForm::Client(ClientForm::from_client(&client))),
    };

    values.ok_or_else(|| ApiError::not_found(label(kind)))
}

pub async fn open(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<OpenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FormView>), ApiError> {
    let request = json_body(payload)?;
    let kind: EntityKind = request
        .entity
        .parse()
        .map_err(|e: moinho_core::CoreError| ApiError::bad_request(e.to_string()))?;
    let owner_id = user.owner_id();

    let view = match request.edit_id {
        Some(id) => {
            let values = load_values(&state.db, owner_id, kind, &id).await?;
            state.forms.open(owner_id, kind, Some(id), values)?
        }
        None => {
            let defaults = EntityForm::blank(kind, Utc::now().date_naive());
            state.forms.open(owner_id, kind, None, defaults)?
        }
    };

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn view(
    State(state): State<AppState>,
    user: AuthUser,
    Path(token): Path<String>,
) -> Result<Json<FormView>, ApiError> {
    Ok(Json(state.forms.view(user.owner_id(), &token)?))
}

/// Settles the form with the write's outcome, including a write task that
/// died. Only success closes the dialog.
fn settle(
    state: &AppState,
    owner_id: &str,
    token: &str,
    kind: EntityKind,
    mode: FormMode,
    outcome: Result<DbResult<String>, JoinError>,
) -> Result<Saved, ApiError> {
    let err = match outcome {
        Ok(Ok(id)) => {
            state.forms.finish(owner_id, token, Ok(()))?;
            info!(entity = %kind, %id, "Form submitted");
            return Ok(Saved { id, entity: kind, mode });
        }
        Ok(Err(e)) => ApiError::from(e),
        Err(e) => {
            error!(entity = %kind, error = %e, "Form write task failed");
            ApiError::internal("Could not save, please try again")
        }
    };

    warn!(entity = %kind, error = %err, "Form submit failed");
    state.forms.finish(owner_id, token, Err(err.message.clone()))?;
    Err(err)
}

/// Validates and writes the submitted values.
///
/// A second submit while one is in flight gets `409 SUBMIT_IN_FLIGHT`.
/// A store failure reopens the dialog with the draft and the message.
pub async fn submit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(token): Path<String>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<Saved>, ApiError> {
    let owner_id = user.owner_id().to_string();
    let kind = state.forms.kind(&owner_id, &token)?;
    let values = EntityForm::parse(kind, json_body(payload)?)?;
    let Submission { mode, value } = state.forms.begin_submit(&owner_id, &token, values)?;

    // Detached so a dropped request still settles the form; the write runs
    // in its own task so a panic there still reaches `settle`.
    let settled = tokio::spawn(async move {
        let write = {
            let db = state.db.clone();
            let owner_id = owner_id.clone();
            let mode = mode.clone();
            tokio::spawn(async move { persist(&db, &owner_id, &mode, &value).await })
        };
        let outcome = write.await;
        settle(&state, &owner_id, &token, kind, mode, outcome)
    });

    let saved = settled
        .await
        .map_err(|e| ApiError::internal(format!("Submit task failed: {}", e)))??;
    Ok(Json(saved))
}

pub async fn cancel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(token): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.forms.cancel(user.owner_id(), &token)?;
    Ok(StatusCode::NO_CONTENT)
}
