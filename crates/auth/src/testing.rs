//! In-memory collaborators for tests.
//!
//! Enabled for this crate's own tests and, through the `testing` feature, for
//! downstream crates that need a session store without a network.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use shopfront_core::{AuthError, AuthResult};

use crate::identity::{Account, AuthToken, Identity};
use crate::service::AuthService;
use crate::storage::{SessionStorage, StorageError};

#[derive(Debug, Default)]
struct StubState {
    login_response: Option<Value>,
    login_error: Option<AuthError>,
    register_error: Option<AuthError>,
    registered: Vec<String>,
    login_calls: usize,
}

/// Scriptable [`AuthService`].
///
/// By default every registration succeeds and every login returns an identity
/// with the given email and a token derived from it.
#[derive(Debug, Clone, Default)]
pub struct StubAuthService {
    inner: Arc<Mutex<StubState>>,
}

impl StubAuthService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make logins return this body (parsed as an [`Identity`]).
    pub async fn respond_to_login(&self, body: Value) {
        self.inner.lock().await.login_response = Some(body);
    }

    pub async fn fail_login(&self, err: AuthError) {
        self.inner.lock().await.login_error = Some(err);
    }

    pub async fn fail_register(&self, err: AuthError) {
        self.inner.lock().await.register_error = Some(err);
    }

    /// Emails of successful registrations, in order.
    pub async fn registered(&self) -> Vec<String> {
        self.inner.lock().await.registered.clone()
    }

    pub async fn login_calls(&self) -> usize {
        self.inner.lock().await.login_calls
    }
}

#[async_trait]
impl AuthService for StubAuthService {
    async fn register(&self, email: &str, _secret: &str) -> AuthResult<Account> {
        let mut state = self.inner.lock().await;
        if let Some(err) = state.register_error.clone() {
            return Err(err);
        }
        state.registered.push(email.to_string());
        Ok(Account::new(email))
    }

    async fn login(&self, email: &str, _secret: &str) -> AuthResult<Identity> {
        let mut state = self.inner.lock().await;
        state.login_calls += 1;
        if let Some(err) = state.login_error.clone() {
            return Err(err);
        }
        match state.login_response.clone() {
            Some(body) => serde_json::from_value(body)
                .map_err(|e| AuthError::transport(format!("bad stub body: {e}"))),
            None => {
                let token = AuthToken::new(format!("token-{email}"))
                    .map_err(|e| AuthError::transport(e.to_string()))?;
                Ok(Identity::new(email, token))
            }
        }
    }
}

/// Storage whose every operation fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStorage;

#[async_trait]
impl SessionStorage for FailingStorage {
    async fn load(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("disk on fire".to_string()))
    }

    async fn save(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Operation("read-only".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Operation("read-only".to_string()))
    }
}
