//! Login form.

use std::sync::Arc;

use async_trait::async_trait;

use shopfront_auth::{Identity, SessionStore};

use super::register::Credentials;
use super::{FieldValues, FormAction, Redirect, SubmitError};

/// Logs in through the session store and goes straight to `landing`.
pub struct LoginAction {
    session: Arc<SessionStore>,
    landing: String,
}

impl LoginAction {
    pub fn new(session: Arc<SessionStore>, landing: impl Into<String>) -> Self {
        Self {
            session,
            landing: landing.into(),
        }
    }
}

#[async_trait]
impl FormAction for LoginAction {
    type Payload = Credentials;
    type Output = Identity;

    fn name(&self) -> &'static str {
        "login"
    }

    fn fields(&self) -> &'static [&'static str] {
        &["email", "password"]
    }

    async fn prepare(&self, fields: &FieldValues) -> Result<Credentials, SubmitError> {
        Ok(Credentials::from_fields(fields))
    }

    async fn send(&self, payload: Credentials) -> Result<Identity, SubmitError> {
        Ok(self.session.login(payload.email(), payload.password()).await?)
    }

    fn success_message(&self, identity: &Identity) -> String {
        format!("Logged in as {}.", identity.email)
    }

    fn redirect(&self, _identity: &Identity) -> Option<Redirect> {
        Some(Redirect::now(self.landing.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FormController;
    use crate::navigation::History;
    use shopfront_auth::testing::StubAuthService;
    use shopfront_auth::{MemoryStorage, SESSION_KEY, SessionStorage};
    use shopfront_core::AuthError;

    #[tokio::test]
    async fn successful_login_navigates_to_landing() {
        let storage = MemoryStorage::new();
        let session = Arc::new(SessionStore::new(Arc::new(StubAuthService::new()), Arc::new(storage.clone())));
        session.restore().await;
        let history = Arc::new(History::new());
        let mut form = FormController::new(LoginAction::new(session.clone(), "/products"), history.clone());
        form.set_field("email", "a@b.com").unwrap();
        form.set_field("password", "pw1").unwrap();

        let identity = form.submit().await.unwrap();

        assert_eq!(session.current_user(), Some(identity));
        assert!(storage.load(SESSION_KEY).await.unwrap().is_some());
        assert_eq!(history.entries(), vec!["/products"]);
        assert_eq!(form.state().field("password"), Some(""));
    }

    #[tokio::test]
    async fn rejected_login_stays_put() {
        let auth = StubAuthService::new();
        auth.fail_login(AuthError::invalid_credentials(Some("Invalid credentials".into())))
            .await;
        let session = Arc::new(SessionStore::new(Arc::new(auth), Arc::new(MemoryStorage::new())));
        session.restore().await;
        let history = Arc::new(History::new());
        let mut form = FormController::new(LoginAction::new(session.clone(), "/products"), history.clone());
        form.set_field("email", "a@b.com").unwrap();

        assert!(form.submit().await.is_err());

        assert!(!session.state().is_logged_in());
        assert!(history.is_empty());
        let state = form.state();
        assert_eq!(state.error_message(), Some("Error: Invalid credentials"));
        assert_eq!(state.field("email"), Some("a@b.com"));
    }
}
