//! Account registration form.

use std::sync::Arc;

use async_trait::async_trait;

use shopfront_auth::SessionStore;
use shopfront_core::AuthError;

use super::{FieldValues, FormAction, SubmitError};

pub const DUPLICATE_EMAIL_MESSAGE: &str = "This email is already in use. Please try a different one.";
pub const REGISTER_FAILED_MESSAGE: &str = "Failed to register. Please try again later.";

/// Creates an account through the session store. Never logs in and never
/// navigates; the user goes to the login view on their own.
pub struct RegisterAction {
    session: Arc<SessionStore>,
}

/// Email and password as typed.
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn from_fields(fields: &FieldValues) -> Self {
        Self {
            email: fields.get("email").cloned().unwrap_or_default(),
            password: fields.get("password").cloned().unwrap_or_default(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl RegisterAction {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl FormAction for RegisterAction {
    type Payload = Credentials;
    type Output = ();

    fn name(&self) -> &'static str {
        "register"
    }

    fn fields(&self) -> &'static [&'static str] {
        &["email", "password"]
    }

    async fn prepare(&self, fields: &FieldValues) -> Result<Credentials, SubmitError> {
        Ok(Credentials::from_fields(fields))
    }

    async fn send(&self, payload: Credentials) -> Result<(), SubmitError> {
        self.session
            .register(payload.email(), payload.password())
            .await?;
        Ok(())
    }

    fn success_message(&self, _output: &()) -> String {
        "Registration successful. Please log in.".to_string()
    }

    fn failure_message(&self, err: &SubmitError) -> String {
        match err {
            SubmitError::Auth(AuthError::DuplicateEmail { .. }) => DUPLICATE_EMAIL_MESSAGE,
            _ => REGISTER_FAILED_MESSAGE,
        }
        .to_string()
    }
}
