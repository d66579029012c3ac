//! The form-submission protocol shared by every data-entry form.
//!
//! A [`FormController`] owns the field values and submit lifecycle of one form
//! instance; a [`FormAction`] says what the form does with them. Every submit
//! goes through the same steps:
//!
//! 1. `submitting` goes up, previous messages are cleared.
//! 2. [`FormAction::prepare`] turns the fields into a payload. This is where
//!    preconditions fail fast (no token, no image file) without any remote
//!    call.
//! 3. [`FormAction::send`] makes exactly one service call.
//! 4. Success sets the result message, clears the fields and, if the action
//!    asks for it, schedules a redirect. Failure sets `"Error: ..."` and keeps
//!    the fields.
//! 5. `submitting` goes down, whatever happened. That includes a submit
//!    future dropped before it finished (a timeout, a `select!`).
//!
//! There are no retries; the user resubmits.

pub mod login;
pub mod product;
pub mod register;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tracing::Instrument;

use shopfront_core::{ApiError, AuthError, ServerMessage, SubmissionId};
use shopfront_products::ImageError;

use crate::navigation::{Navigator, ScheduledNavigation};

pub use login::LoginAction;
pub use product::{CreateProductAction, EditProductAction};
pub use register::RegisterAction;

/// Field values keyed by field name.
pub type FieldValues = BTreeMap<String, String>;

/// Why a submission did not succeed.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// A precondition failed before any remote call; the text is shown as is.
    #[error("{0}")]
    Precondition(String),

    #[error("could not read the selected image: {0}")]
    Image(#[from] ImageError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SubmitError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Text for the user, without the `Error:` prefix.
    pub fn user_message(&self) -> &str {
        match self {
            SubmitError::Precondition(msg) => msg,
            SubmitError::Image(_) => "Could not read the selected image file.",
            SubmitError::Auth(err) => err.user_message(),
            SubmitError::Api(err) => err.user_message(),
        }
    }
}

/// Misuse of the controller itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("form has no field named `{0}`")]
    UnknownField(String),
}

/// Where to go after a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
    pub delay: Duration,
}

impl Redirect {
    pub fn now(path: impl Into<String>) -> Self {
        Self::after(path, Duration::ZERO)
    }

    pub fn after(path: impl Into<String>, delay: Duration) -> Self {
        Self {
            path: path.into(),
            delay,
        }
    }
}

/// What a form does with its fields.
#[async_trait]
pub trait FormAction: Send + Sync {
    /// What `prepare` hands to `send`.
    type Payload: Send;
    /// What a successful `send` returns.
    type Output: Send + Sync;

    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Field names, in display order.
    fn fields(&self) -> &'static [&'static str];

    /// Assemble the payload. Must not call the remote service.
    async fn prepare(&self, fields: &FieldValues) -> Result<Self::Payload, SubmitError>;

    /// The one remote call of a submission.
    async fn send(&self, payload: Self::Payload) -> Result<Self::Output, SubmitError>;

    fn success_message(&self, output: &Self::Output) -> String;

    fn redirect(&self, _output: &Self::Output) -> Option<Redirect> {
        None
    }

    /// Failure text, without the `Error:` prefix.
    fn failure_message(&self, err: &SubmitError) -> String {
        err.user_message().to_string()
    }
}

/// Observable state of one form instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    fields: FieldValues,
    submitting: bool,
    result_message: Option<String>,
    error_message: Option<String>,
}

impl FormState {
    fn new(names: &[&str]) -> Self {
        Self {
            fields: names.iter().map(|n| (n.to_string(), String::new())).collect(),
            submitting: false,
            result_message: None,
            error_message: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &FieldValues {
        &self.fields
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// The submit control is disabled while a submission is in flight.
    pub fn submit_enabled(&self) -> bool {
        !self.submitting
    }

    pub fn result_message(&self) -> Option<&str> {
        self.result_message.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    fn clear_fields(&mut self) {
        for value in self.fields.values_mut() {
            value.clear();
        }
    }
}

/// One mounted form: its state, its action and its pending redirect.
///
/// Submitting takes `&mut self`, so a form instance never has two submissions
/// in flight. Dropping the controller cancels a pending redirect.
pub struct FormController<A: FormAction> {
    action: A,
    state: watch::Sender<FormState>,
    navigator: Arc<dyn Navigator>,
    pending: Option<ScheduledNavigation>,
}

impl<A: FormAction> FormController<A> {
    pub fn new(action: A, navigator: Arc<dyn Navigator>) -> Self {
        let (state, _) = watch::channel(FormState::new(action.fields()));
        Self {
            action,
            state,
            navigator,
            pending: None,
        }
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> FormState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change, including `submitting`
    /// going up and down.
    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.state.subscribe()
    }

    /// Change one field. Nothing else in the state is touched.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), FormError> {
        if !self.state.borrow().fields.contains_key(name) {
            return Err(FormError::UnknownField(name.to_string()));
        }
        let value = value.into();
        self.state.send_modify(|s| {
            if let Some(slot) = s.fields.get_mut(name) {
                *slot = value;
            }
        });
        Ok(())
    }

    /// Set several fields at once. Names the form does not have are skipped.
    pub fn prefill(&mut self, values: FieldValues) {
        self.state.send_modify(|s| {
            for (name, value) in values {
                if let Some(slot) = s.fields.get_mut(&name) {
                    *slot = value;
                }
            }
        });
    }

    /// The redirect scheduled by the last successful submit, if it has not
    /// been cancelled.
    pub fn pending_redirect(&mut self) -> Option<&mut ScheduledNavigation> {
        self.pending.as_mut()
    }

    /// Run one submission through the protocol.
    ///
    /// The outcome is always reflected in the form state; it is also returned
    /// so callers can use the created record. Cancelling the returned future
    /// re-enables the submit control but leaves the fields and messages alone.
    pub async fn submit(&mut self) -> Result<A::Output, SubmitError> {
        let submission = SubmissionId::new();
        let span = tracing::info_span!("form_submit", form = self.action.name(), %submission);
        self.run_submission().instrument(span).await
    }

    async fn run_submission(&mut self) -> Result<A::Output, SubmitError> {
        self.state.send_modify(|s| {
            s.submitting = true;
            s.result_message = None;
            s.error_message = None;
        });
        let in_flight = InFlight(&self.state);
        let fields = self.state.borrow().fields.clone();

        let result = match self.action.prepare(&fields).await {
            Ok(payload) => self.action.send(payload).await,
            Err(err) => {
                tracing::info!(reason = %err, "submission stopped before the remote call");
                Err(err)
            }
        };

        let redirect = match &result {
            Ok(output) => {
                let message = self.action.success_message(output);
                self.state.send_modify(|s| {
                    s.result_message = Some(message);
                    s.clear_fields();
                    s.submitting = false;
                });
                tracing::info!("submission succeeded");
                self.action.redirect(output)
            }
            Err(err) => {
                let message = format!("Error: {}", self.action.failure_message(err));
                self.state.send_modify(|s| {
                    s.error_message = Some(message);
                    s.submitting = false;
                });
                tracing::warn!(error = %err, "submission failed");
                None
            }
        };
        drop(in_flight);

        if let Some(redirect) = redirect {
            self.follow(redirect);
        }
        result
    }

    fn follow(&mut self, redirect: Redirect) {
        if redirect.delay.is_zero() {
            self.pending = None;
            self.navigator.navigate(&redirect.path);
        } else {
            // Replacing a previous redirect cancels it.
            self.pending = Some(ScheduledNavigation::schedule(
                self.navigator.clone(),
                redirect.path,
                redirect.delay,
            ));
        }
    }
}

/// Lowers `submitting` when a submission ends, including by cancellation.
struct InFlight<'a>(&'a watch::Sender<FormState>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let cancelled = self
            .0
            .send_if_modified(|s| std::mem::replace(&mut s.submitting, false));
        if cancelled {
            tracing::info!("submission cancelled before it finished");
        }
    }
}
