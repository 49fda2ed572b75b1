//! # Dashboard Form State Machine
//!
//! Every dashboard (sales, flours, bakeries, clients) has one add/edit
//! dialog. This module is that dialog's lifecycle, with no I/O: the caller
//! validates through a closure and reports the store's outcome back.
//!
//! ## State Diagram
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │              open_add(defaults)            open_edit(id, values)        │
//! │   ┌─────────┐ ─────────────► ┌──────────┐                               │
//! │   │ Viewing │                │  Adding  │◄──┐                           │
//! │   │         │ ◄───cancel──── │ {draft}  │   │ invalid / store failed    │
//! │   └────▲────┘                └────┬─────┘   │                           │
//! │        │      ─────────────► ┌──────────┐   │                           │
//! │        │                     │ Editing  │◄──┤                           │
//! │        │      ◄───cancel──── │{id,draft}│   │                           │
//! │        │                     └────┬─────┘   │                           │
//! │        │                          │ begin_submit (valid)                │
//! │        │                     ┌────▼──────┐  │                           │
//! │        └─── finish_submit ───│Submitting │──┘ finish_submit(Err)        │
//! │                 (Ok)         │{mode,draft}│                             │
//! │                              └───────────┘                              │
//! │                                                                         │
//! │  begin_submit while Submitting  →  DashboardError::SubmitInFlight       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use moinho_core::dashboard::FormSession;
//! use moinho_core::forms::FlourForm;
//!
//! let mut session = FormSession::new();
//! session.open_add(FlourForm::default()).unwrap();
//!
//! let values = FlourForm { name: "Integral".to_string() };
//! let submission = session.begin_submit(values, |f| f.validate()).unwrap();
//! assert_eq!(submission.value.name, "Integral");
//! assert!(session.is_submitting());
//!
//! session.finish_submit(Ok(())).unwrap();
//! assert!(session.is_viewing());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, FormErrors};

/// Whether the dialog creates a new record or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum FormMode {
    Add,
    Edit { id: String },
}

/// Why the dialog is still open after a submit.
#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    Invalid(FormErrors),
    StoreFailed(String),
}

/// Dialog state, holding the draft values of type `V`.
#[derive(Debug, Clone, PartialEq)]
pub enum FormState<V> {
    Viewing,
    Adding {
        draft: V,
        feedback: Option<Feedback>,
    },
    Editing {
        id: String,
        draft: V,
        feedback: Option<Feedback>,
    },
    Submitting {
        mode: FormMode,
        draft: V,
    },
}

impl<V> FormState<V> {
    fn name(&self) -> &'static str {
        match self {
            FormState::Viewing => "viewing",
            FormState::Adding { .. } => "adding",
            FormState::Editing { .. } => "editing",
            FormState::Submitting { .. } => "submitting",
        }
    }
}

/// Validated values handed out by [`FormSession::begin_submit`].
#[derive(Debug, Clone, PartialEq)]
pub struct Submission<T> {
    pub mode: FormMode,
    pub value: T,
}

/// One dialog's lifecycle.
#[derive(Debug, Clone)]
pub struct FormSession<V> {
    state: FormState<V>,
}

impl<V> Default for FormSession<V> {
    fn default() -> Self {
        FormSession {
            state: FormState::Viewing,
        }
    }
}

impl<V> FormSession<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FormState<V> {
        &self.state
    }

    pub fn is_viewing(&self) -> bool {
        matches!(self.state, FormState::Viewing)
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, FormState::Submitting { .. })
    }

    /// Add or edit, while the dialog is open or submitting.
    pub fn mode(&self) -> Option<FormMode> {
        match &self.state {
            FormState::Viewing => None,
            FormState::Adding { .. } => Some(FormMode::Add),
            FormState::Editing { id, .. } => Some(FormMode::Edit { id: id.clone() }),
            FormState::Submitting { mode, .. } => Some(mode.clone()),
        }
    }

    /// Current draft values, if the dialog is open.
    pub fn draft(&self) -> Option<&V> {
        match &self.state {
            FormState::Viewing => None,
            FormState::Adding { draft, .. }
            | FormState::Editing { draft, .. }
            | FormState::Submitting { draft, .. } => Some(draft),
        }
    }

    /// Feedback from the last failed submit, if any.
    pub fn feedback(&self) -> Option<&Feedback> {
        match &self.state {
            FormState::Adding { feedback, .. } | FormState::Editing { feedback, .. } => {
                feedback.as_ref()
            }
            _ => None,
        }
    }

    fn reject(&self, action: &str) -> DashboardError {
        if self.is_submitting() {
            return DashboardError::SubmitInFlight;
        }
        DashboardError::InvalidTransition {
            action: action.to_string(),
            state: self.state.name().to_string(),
        }
    }

    /// Opens the dialog empty (or with defaults) to create a record.
    pub fn open_add(&mut self, defaults: V) -> Result<(), DashboardError> {
        if !self.is_viewing() {
            return Err(self.reject("open add"));
        }
        self.state = FormState::Adding {
            draft: defaults,
            feedback: None,
        };
        Ok(())
    }

    /// Opens the dialog pre-filled with a stored record.
    pub fn open_edit(&mut self, id: impl Into<String>, values: V) -> Result<(), DashboardError> {
        if !self.is_viewing() {
            return Err(self.reject("open edit"));
        }
        self.state = FormState::Editing {
            id: id.into(),
            draft: values,
            feedback: None,
        };
        Ok(())
    }

    /// Discards the draft and closes the dialog.
    pub fn cancel(&mut self) -> Result<(), DashboardError> {
        if self.is_submitting() {
            return Err(DashboardError::SubmitInFlight);
        }
        self.state = FormState::Viewing;
        Ok(())
    }

    /// Validates `values` and, when they pass, moves to `Submitting`.
    ///
    /// On validation failure the dialog stays open with the new values and
    /// the errors. Only one submit can be in flight per session.
    pub fn begin_submit<T, F>(&mut self, values: V, validate: F) -> Result<Submission<T>, DashboardError>
    where
        F: FnOnce(&V) -> Result<T, FormErrors>,
    {
        let mode = match &self.state {
            FormState::Adding { .. } => FormMode::Add,
            FormState::Editing { id, .. } => FormMode::Edit { id: id.clone() },
            FormState::Submitting { .. } => return Err(DashboardError::SubmitInFlight),
            FormState::Viewing => return Err(self.reject("submit")),
        };

        match validate(&values) {
            Ok(value) => {
                self.state = FormState::Submitting {
                    mode: mode.clone(),
                    draft: values,
                };
                Ok(Submission { mode, value })
            }
            Err(errors) => {
                self.state = reopen(mode, values, Feedback::Invalid(errors.clone()));
                Err(DashboardError::Invalid(errors))
            }
        }
    }

    /// Reports the store's outcome for the submit in flight.
    ///
    /// Success closes the dialog. Failure reopens it in the same mode with
    /// the draft intact and the error message.
    pub fn finish_submit(&mut self, outcome: Result<(), String>) -> Result<(), DashboardError> {
        if !self.is_submitting() {
            return Err(DashboardError::InvalidTransition {
                action: "finish submit".to_string(),
                state: self.state.name().to_string(),
            });
        }

        let previous = std::mem::replace(&mut self.state, FormState::Viewing);
        if let (FormState::Submitting { mode, draft }, Err(message)) = (previous, outcome) {
            self.state = reopen(mode, draft, Feedback::StoreFailed(message));
        }
        Ok(())
    }
}

fn reopen<V>(mode: FormMode, draft: V, feedback: Feedback) -> FormState<V> {
    match mode {
        FormMode::Add => FormState::Adding {
            draft,
            feedback: Some(feedback),
        },
        FormMode::Edit { id } => FormState::Editing {
            id,
            draft,
            feedback: Some(feedback),
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{FlourDraft, FlourForm, SaleForm};
    use chrono::NaiveDate;
    use serde_json::json;

    fn flour(name: &str) -> FlourForm {
        FlourForm {
            name: name.to_string(),
        }
    }

    fn validate(f: &FlourForm) -> Result<FlourDraft, FormErrors> {
        f.validate()
    }

    #[test]
    fn test_add_flow() {
        let mut session = FormSession::new();
        assert!(session.is_viewing());
        assert_eq!(session.mode(), None);

        session.open_add(flour("")).unwrap();
        assert_eq!(session.mode(), Some(FormMode::Add));

        let submission = session.begin_submit(flour("Especial"), validate).unwrap();
        assert_eq!(submission.mode, FormMode::Add);
        assert_eq!(submission.value.name, "Especial");
        assert!(session.is_submitting());

        session.finish_submit(Ok(())).unwrap();
        assert!(session.is_viewing());
    }

    #[test]
    fn test_open_only_from_viewing() {
        let mut session = FormSession::new();
        session.open_add(flour("")).unwrap();

        let err = session.open_edit("f-1", flour("Integral")).unwrap_err();
        assert!(matches!(err, DashboardError::InvalidTransition { .. }));
    }

    #[test]
    fn test_invalid_submit_keeps_dialog_open() {
        let mut session = FormSession::new();
        session.open_edit("f-1", flour("Integral")).unwrap();

        let err = session.begin_submit(flour("ab"), validate).unwrap_err();
        assert!(matches!(err, DashboardError::Invalid(_)));

        match session.state() {
            FormState::Editing { id, draft, feedback } => {
                assert_eq!(id, "f-1");
                assert_eq!(draft.name, "ab");
                assert!(matches!(feedback, Some(Feedback::Invalid(_))));
            }
            other => panic!("expected editing, got {other:?}"),
        }
    }

    #[test]
    fn test_second_submit_rejected_while_in_flight() {
        let mut session = FormSession::new();
        let today = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        session.open_add(SaleForm::blank(today)).unwrap();

        let values: SaleForm = serde_json::from_value(json!({
            "bakeryId": "b-1",
            "date": "2024-05-02",
            "items": [{ "flourName": "Especial", "quantity": 1, "unitPrice": 10 }]
        }))
        .unwrap();

        let mut writes = 0;
        let first = session.begin_submit(values.clone(), |f| f.validate());
        if first.is_ok() {
            writes += 1;
        }
        let second = session.begin_submit(values, |f| f.validate());
        assert_eq!(second.unwrap_err(), DashboardError::SubmitInFlight);
        assert_eq!(session.cancel(), Err(DashboardError::SubmitInFlight));

        session.finish_submit(Ok(())).unwrap();
        assert_eq!(writes, 1);
        assert!(session.is_viewing());
    }

    #[test]
    fn test_store_failure_reopens_with_draft() {
        let mut session = FormSession::new();
        session.open_edit("f-9", flour("Integral")).unwrap();
        session.begin_submit(flour("Integral Fina"), validate).unwrap();

        session.finish_submit(Err("database unavailable".to_string())).unwrap();
        assert_eq!(session.mode(), Some(FormMode::Edit { id: "f-9".to_string() }));
        assert_eq!(session.draft().map(|d| d.name.as_str()), Some("Integral Fina"));
        assert_eq!(
            session.feedback(),
            Some(&Feedback::StoreFailed("database unavailable".to_string()))
        );

        // Can retry after a failure
        assert!(session.begin_submit(flour("Integral Fina"), validate).is_ok());
    }

    #[test]
    fn test_cancel_and_finish_outside_submit() {
        let mut session: FormSession<FlourForm> = FormSession::new();
        assert!(session.finish_submit(Ok(())).is_err());
        assert!(session.begin_submit(flour("Especial"), validate).is_err());

        session.open_add(flour("x")).unwrap();
        session.cancel().unwrap();
        assert!(session.is_viewing());
        assert!(session.draft().is_none());
    }
}
