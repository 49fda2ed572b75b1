//! # Form Registry
//!
//! Hosts one dialog state machine per open add/edit form.
//!
//! ## Submit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/forms            open(owner, kind, Add | Edit) ──► token     │
//! │                                                                         │
//! │  POST /api/forms/{t}/submit                                             │
//! │     ├── lock ── begin_submit(values) ── unlock      (no await inside)   │
//! │     │     ├── invalid      → 422, dialog stays open                     │
//! │     │     ├── in flight    → 409 SUBMIT_IN_FLIGHT                       │
//! │     │     └── ok           → Submitting, validated draft handed out     │
//! │     ├── repository write (await)                                        │
//! │     └── lock ── finish(outcome) ── unlock                               │
//! │           ├── ok    → session removed (dialog closed)                   │
//! │           └── error → dialog reopened with the draft and the message    │
//! │                                                                         │
//! │  DELETE /api/forms/{t}      cancel ── session removed                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The mutex is only held for the synchronous state transitions.
//!
//! Abandoned dialogs are pruned whenever another one opens: forms left
//! untouched for the idle timeout go, and an account holding more than
//! [`MAX_OPEN_FORMS_PER_OWNER`] loses its stalest. A form with a submit in
//! flight is never pruned.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use moinho_core::dashboard::{Feedback, FormMode, FormSession, Submission};
use moinho_core::forms::{EntityDraft, EntityForm};
use moinho_core::EntityKind;

use crate::error::ApiError;

/// How long a dialog may sit untouched before it is pruned.
pub const FORM_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Open dialogs kept per account.
pub const MAX_OPEN_FORMS_PER_OWNER: usize = 16;

struct OpenForm {
    owner_id: String,
    kind: EntityKind,
    session: FormSession<EntityForm>,
    touched_at: Instant,
    /// Touch order across the registry, for picking the stalest.
    touch_seq: u64,
}

impl OpenForm {
    fn prunable(&self) -> bool {
        !self.session.is_submitting()
    }
}

/// What the client needs to render an open dialog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormView {
    pub token: String,
    pub entity: EntityKind,
    #[serde(flatten)]
    pub mode: Option<FormMode>,
    pub submitting: bool,
    pub values: Option<EntityForm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
}

#[derive(Clone)]
pub struct FormRegistry {
    forms: Arc<Mutex<HashMap<String, OpenForm>>>,
    touches: Arc<AtomicU64>,
    idle_timeout: Duration,
}

impl Default for FormRegistry {
    fn default() -> Self {
        FormRegistry::with_idle_timeout(FORM_IDLE_TIMEOUT)
    }
}

impl FormRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        FormRegistry {
            forms: Arc::default(),
            touches: Arc::default(),
            idle_timeout,
        }
    }

    fn touch(&self, form: &mut OpenForm) {
        form.touched_at = Instant::now();
        form.touch_seq = self.touches.fetch_add(1, Ordering::Relaxed);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, OpenForm>> {
        self.forms.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Opens a dialog. `edit_id` with the stored values opens it for
    /// editing; otherwise `values` are the add defaults.
    pub fn open(
        &self,
        owner_id: &str,
        kind: EntityKind,
        edit_id: Option<String>,
        values: EntityForm,
    ) -> Result<FormView, ApiError> {
        let mut session = FormSession::new();
        match edit_id {
            Some(id) => session.open_edit(id, values)?,
            None => session.open_add(values)?,
        }

        let token = Uuid::new_v4().to_string();
        let form = OpenForm {
            owner_id: owner_id.to_string(),
            kind,
            session,
            touched_at: Instant::now(),
            touch_seq: self.touches.fetch_add(1, Ordering::Relaxed),
        };
        let view = view(&token, &form);

        let mut forms = self.lock();
        let pruned = prune(&mut forms, owner_id, self.idle_timeout);
        debug!(entity = %kind, pruned, "Opened form session");
        forms.insert(token, form);
        Ok(view)
    }

    pub fn view(&self, owner_id: &str, token: &str) -> Result<FormView, ApiError> {
        let mut forms = self.lock();
        let form = owned_mut(&mut forms, owner_id, token)?;
        self.touch(form);
        Ok(view(token, form))
    }

    /// The entity an open form edits.
    pub fn kind(&self, owner_id: &str, token: &str) -> Result<EntityKind, ApiError> {
        let forms = self.lock();
        Ok(owned(&forms, owner_id, token)?.kind)
    }

    /// Validates `values` and marks the form as submitting.
    pub fn begin_submit(
        &self,
        owner_id: &str,
        token: &str,
        values: EntityForm,
    ) -> Result<Submission<EntityDraft>, ApiError> {
        let mut forms = self.lock();
        let form = owned_mut(&mut forms, owner_id, token)?;
        self.touch(form);

        Ok(form.session.begin_submit(values, EntityForm::validate)?)
    }

    /// Records the store's outcome. A successful submit closes the form.
    pub fn finish(&self, owner_id: &str, token: &str, outcome: Result<(), String>) -> Result<(), ApiError> {
        let mut forms = self.lock();
        let form = owned_mut(&mut forms, owner_id, token)?;
        self.touch(form);

        form.session.finish_submit(outcome)?;
        if form.session.is_viewing() {
            forms.remove(token);
        }
        Ok(())
    }

    /// Discards the form. Refused while a submit is in flight.
    pub fn cancel(&self, owner_id: &str, token: &str) -> Result<(), ApiError> {
        let mut forms = self.lock();
        owned_mut(&mut forms, owner_id, token)?.session.cancel()?;
        forms.remove(token);
        Ok(())
    }

    /// Open forms across all accounts.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn owned<'a>(
    forms: &'a HashMap<String, OpenForm>,
    owner_id: &str,
    token: &str,
) -> Result<&'a OpenForm, ApiError> {
    forms
        .get(token)
        .filter(|f| f.owner_id == owner_id)
        .ok_or_else(|| ApiError::not_found("Form"))
}

fn owned_mut<'a>(
    forms: &'a mut HashMap<String, OpenForm>,
    owner_id: &str,
    token: &str,
) -> Result<&'a mut OpenForm, ApiError> {
    forms
        .get_mut(token)
        .filter(|f| f.owner_id == owner_id)
        .ok_or_else(|| ApiError::not_found("Form"))
}

/// Drops idle forms, then the owner's stalest ones past the per-account
/// limit, leaving room for one more. Returns how many went.
fn prune(forms: &mut HashMap<String, OpenForm>, owner_id: &str, idle_timeout: Duration) -> usize {
    let before = forms.len();
    forms.retain(|_, f| !f.prunable() || f.touched_at.elapsed() < idle_timeout);

    let held = forms.values().filter(|f| f.owner_id == owner_id).count();
    if held >= MAX_OPEN_FORMS_PER_OWNER {
        let mut stalest: Vec<(u64, String)> = forms
            .iter()
            .filter(|(_, f)| f.owner_id == owner_id && f.prunable())
            .map(|(token, f)| (f.touch_seq, token.clone()))
            .collect();
        stalest.sort();

        for (_, token) in stalest.into_iter().take(held + 1 - MAX_OPEN_FORMS_PER_OWNER) {
            forms.remove(&token);
        }
    }

    before - forms.len()
}

fn view(token: &str, form: &OpenForm) -> FormView {
    let (errors, store_error) = match form.session.feedback() {
        Some(Feedback::Invalid(errors)) => (Some(errors.to_map()), None),
        Some(Feedback::StoreFailed(message)) => (None, Some(message.clone())),
        None => (None, None),
    };

    FormView {
        token: token.to_string(),
        entity: form.kind,
        mode: form.session.mode(),
        submitting: form.session.is_submitting(),
        values: form.session.draft().cloned(),
        errors,
        store_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use moinho_core::forms::FlourForm;

    fn flour(name: &str) -> EntityForm {
        EntityForm::Flour(FlourForm {
            name: name.to_string(),
        })
    }

    #[test]
    fn test_second_submit_rejected_while_in_flight() {
        let registry = FormRegistry::new();
        let view = registry
            .open("owner", EntityKind::Flour, None, flour(""))
            .unwrap();

        let submission = registry.begin_submit("owner", &view.token, flour("Integral")).unwrap();
        assert_eq!(submission.mode, FormMode::Add);

        let err = registry
            .begin_submit("owner", &view.token, flour("Integral"))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SubmitInFlight);

        let err = registry.cancel("owner", &view.token).unwrap_err();
        assert_eq!(err.code, ErrorCode::SubmitInFlight);

        registry.finish("owner", &view.token, Ok(())).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_submit_keeps_form_open() {
        let registry = FormRegistry::new();
        let token = registry
            .open("owner", EntityKind::Flour, Some("f-1".to_string()), flour("Integral"))
            .unwrap()
            .token;

        let err = registry.begin_submit("owner", &token, flour("ab")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let view = registry.view("owner", &token).unwrap();
        assert!(view.errors.unwrap().contains_key("name"));
        assert_eq!(view.mode, Some(FormMode::Edit { id: "f-1".to_string() }));
        assert_eq!(view.values, Some(flour("ab")));
    }

    #[test]
    fn test_store_failure_reopens_with_message() {
        let registry = FormRegistry::new();
        let token = registry.open("owner", EntityKind::Flour, None, flour("")).unwrap().token;

        registry.begin_submit("owner", &token, flour("Integral")).unwrap();
        registry
            .finish("owner", &token, Err("Database operation failed".to_string()))
            .unwrap();

        let view = registry.view("owner", &token).unwrap();
        assert!(!view.submitting);
        assert_eq!(view.store_error.as_deref(), Some("Database operation failed"));
        assert_eq!(view.values, Some(flour("Integral")));
    }

    #[test]
    fn test_idle_forms_are_pruned_on_open() {
        let registry = FormRegistry::with_idle_timeout(Duration::ZERO);
        let abandoned = registry.open("owner", EntityKind::Flour, None, flour("")).unwrap().token;
        let in_flight = registry.open("owner", EntityKind::Flour, None, flour("")).unwrap().token;
        registry.begin_submit("owner", &in_flight, flour("Integral")).unwrap();

        let latest = registry.open("other", EntityKind::Flour, None, flour("")).unwrap().token;

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.view("owner", &abandoned).unwrap_err().code, ErrorCode::NotFound);
        assert!(registry.view("owner", &in_flight).unwrap().submitting);
        assert!(registry.view("other", &latest).is_ok());

        registry.finish("owner", &in_flight, Ok(())).unwrap();
    }

    #[test]
    fn test_open_forms_per_owner_are_capped() {
        let registry = FormRegistry::new();
        let other = registry.open("other", EntityKind::Flour, None, flour("")).unwrap().token;

        let tokens: Vec<String> = (0..MAX_OPEN_FORMS_PER_OWNER + 5)
            .map(|_| registry.open("owner", EntityKind::Flour, None, flour("")).unwrap().token)
            .collect();

        assert_eq!(registry.len(), MAX_OPEN_FORMS_PER_OWNER + 1);
        assert_eq!(registry.view("owner", &tokens[0]).unwrap_err().code, ErrorCode::NotFound);
        assert!(registry.view("owner", tokens.last().unwrap()).is_ok());
        assert!(registry.view("other", &other).is_ok());
    }

    #[test]
    fn test_forms_are_private_to_their_owner() {
        let registry = FormRegistry::new();
        let token = registry.open("owner", EntityKind::Flour, None, flour("")).unwrap().token;

        assert_eq!(registry.view("intruder", &token).unwrap_err().code, ErrorCode::NotFound);
        assert_eq!(registry.cancel("intruder", &token).unwrap_err().code, ErrorCode::NotFound);
        registry.cancel("owner", &token).unwrap();
        assert!(registry.is_empty());
    }
}
