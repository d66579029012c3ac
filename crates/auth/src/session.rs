//! Session store: the single authority for "who is logged in".
//!
//! The store is constructed once per application, injected into whatever needs
//! it, and is the only writer of session state. Everybody else reads through
//! [`SessionStore::state`] or observes changes through
//! [`SessionStore::subscribe`].
//!
//! ```text
//!                 restore()
//!  Initializing ───────────────┬──────────▶ LoggedIn ◀──┐
//!                              │               │        │ login()
//!                              │      logout() │        │
//!                              └──────────▶ LoggedOut ──┘
//! ```
//!
//! `login` and `logout` issued while the store is still `Initializing` wait
//! for [`SessionStore::restore`] to settle before they act. State changes are
//! applied one at a time, so a restore that is still reading storage can never
//! overwrite a session adopted by `login`.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use shopfront_core::AuthResult;

use crate::identity::{AuthToken, Identity};
use crate::service::AuthService;
use crate::storage::SessionStorage;

/// Fixed storage key of the persisted session record.
pub const SESSION_KEY: &str = "user";

/// Observable session state.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Persisted data has not been examined yet.
    Initializing,
    LoggedOut,
    LoggedIn(Identity),
}

impl SessionState {
    pub fn is_initializing(&self) -> bool {
        matches!(self, SessionState::Initializing)
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, SessionState::LoggedIn(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::LoggedIn(identity) => Some(identity),
            _ => None,
        }
    }
}

pub struct SessionStore {
    auth: Arc<dyn AuthService>,
    storage: Arc<dyn SessionStorage>,
    state: watch::Sender<SessionState>,
    /// Held while a state change and its storage write are applied.
    changes: Mutex<()>,
}

impl SessionStore {
    /// Create a store in the `Initializing` state. Call [`restore`](Self::restore)
    /// before rendering anything that depends on the session.
    pub fn new(auth: Arc<dyn AuthService>, storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);
        Self {
            auth,
            storage,
            state,
            changes: Mutex::new(()),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    /// Token of the logged-in user, for authorizing service calls.
    pub fn token(&self) -> Option<AuthToken> {
        self.state.borrow().identity().map(|i| i.token.clone())
    }

    /// Wait until the store has left `Initializing` and return the settled state.
    pub async fn ready(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|s| !s.is_initializing()).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so the channel cannot close while we wait.
            Err(_) => self.state(),
        }
    }

    /// Adopt the persisted session, if there is a well-formed one.
    ///
    /// Anything else (missing record, unreadable storage, malformed JSON, blank
    /// token) leaves the user logged out, and a partial record is removed.
    /// Only the first call reads storage; later calls return the current state.
    pub async fn restore(&self) -> SessionState {
        let _changes = self.changes.lock().await;
        if !self.state.borrow().is_initializing() {
            tracing::debug!("session already restored");
            return self.state();
        }

        let raw = match self.storage.load(SESSION_KEY).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read persisted session; starting logged out");
                None
            }
        };

        let restored = raw.as_deref().and_then(|raw| {
            serde_json::from_str::<Identity>(raw)
                .inspect_err(|err| tracing::warn!(error = %err, "discarding malformed persisted session"))
                .ok()
        });

        let next = match restored {
            Some(identity) => {
                tracing::info!(email = %identity.email, "restored persisted session");
                SessionState::LoggedIn(identity)
            }
            None => {
                self.clear_persisted().await;
                SessionState::LoggedOut
            }
        };

        self.transition(next)
    }

    /// Create an account. The session is left exactly as it was.
    pub async fn register(&self, email: &str, secret: &str) -> AuthResult<()> {
        match self.auth.register(email, secret).await {
            Ok(account) => {
                tracing::info!(email = %account.email, "registered account");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(email, error = %err, "registration failed");
                Err(err)
            }
        }
    }

    /// Log in, persist the identity and make it the current session.
    ///
    /// Waits for [`restore`](Self::restore) when the store is still
    /// `Initializing`. On failure the current state is untouched.
    pub async fn login(&self, email: &str, secret: &str) -> AuthResult<Identity> {
        self.settled().await;
        let identity = self
            .auth
            .login(email, secret)
            .await
            .inspect_err(|err| tracing::warn!(email, error = %err, "login failed"))?;

        let _changes = self.changes.lock().await;
        self.persist(&identity).await;
        self.transition(SessionState::LoggedIn(identity.clone()));
        tracing::info!(email = %identity.email, "logged in");

        Ok(identity)
    }

    /// Drop the session, persisted and in memory. Never fails.
    ///
    /// Like [`login`](Self::login), waits for a pending restore first.
    pub async fn logout(&self) {
        self.settled().await;
        let _changes = self.changes.lock().await;
        self.clear_persisted().await;
        self.transition(SessionState::LoggedOut);
        tracing::info!("logged out");
    }

    async fn settled(&self) {
        if self.state.borrow().is_initializing() {
            tracing::debug!("waiting for session restore");
            self.ready().await;
        }
    }

    fn transition(&self, next: SessionState) -> SessionState {
        let previous = self.state.send_replace(next.clone());
        tracing::debug!(from = discriminant(&previous), to = discriminant(&next), "session transition");
        next
    }

    async fn persist(&self, identity: &Identity) {
        let raw = match serde_json::to_string(identity) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize identity; session will not survive restart");
                return;
            }
        };

        // The session still works in memory if the write fails.
        if let Err(err) = self.storage.save(SESSION_KEY, &raw).await {
            tracing::warn!(error = %err, "failed to persist session; it will not survive restart");
        }
    }

    async fn clear_persisted(&self) {
        if let Err(err) = self.storage.remove(SESSION_KEY).await {
            tracing::warn!(error = %err, "failed to clear persisted session");
        }
    }
}

fn discriminant(state: &SessionState) -> &'static str {
    match state {
        SessionState::Initializing => "initializing",
        SessionState::LoggedOut => "logged_out",
        SessionState::LoggedIn(_) => "logged_in",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, StorageError};
    use crate::testing::{FailingStorage, StubAuthService};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::json;
    use shopfront_core::AuthError;
    use tokio::sync::Notify;

    fn store_with(auth: StubAuthService, storage: MemoryStorage) -> SessionStore {
        SessionStore::new(Arc::new(auth), Arc::new(storage))
    }

    /// Memory storage whose reads hold until `release` is notified.
    struct SlowReads {
        inner: MemoryStorage,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl SessionStorage for SlowReads {
        async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
            let raw = self.inner.load(key).await?;
            self.release.notified().await;
            Ok(raw)
        }

        async fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.save(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn starts_initializing() {
        let store = store_with(StubAuthService::new(), MemoryStorage::new());
        assert_eq!(store.state(), SessionState::Initializing);
        assert_eq!(store.token(), None);
    }

    #[tokio::test]
    async fn restore_adopts_well_formed_record() {
        let storage = MemoryStorage::with_entry(SESSION_KEY, r#"{"email":"a@b.com","token":"t1"}"#);
        let store = store_with(StubAuthService::new(), storage);

        let state = store.restore().await;

        let identity = state.identity().unwrap();
        assert_eq!(identity.email, "a@b.com");
        assert_eq!(store.token().unwrap().as_str(), "t1");
    }

    #[tokio::test]
    async fn restore_clears_record_without_token() {
        let storage = MemoryStorage::with_entry(SESSION_KEY, r#"{"email":"a@b.com"}"#);
        let store = store_with(StubAuthService::new(), storage.clone());

        assert_eq!(store.restore().await, SessionState::LoggedOut);
        assert_eq!(storage.load(SESSION_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn restore_treats_malformed_json_as_absent() {
        let storage = MemoryStorage::with_entry(SESSION_KEY, "{not json");
        let store = store_with(StubAuthService::new(), storage.clone());

        assert_eq!(store.restore().await, SessionState::LoggedOut);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn restore_survives_unreadable_storage() {
        let store = SessionStore::new(Arc::new(StubAuthService::new()), Arc::new(FailingStorage));
        assert_eq!(store.restore().await, SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn restore_only_reads_storage_once() {
        let storage = MemoryStorage::new();
        let store = store_with(StubAuthService::new(), storage.clone());
        assert_eq!(store.restore().await, SessionState::LoggedOut);

        storage
            .save(SESSION_KEY, r#"{"email":"a@b.com","token":"t1"}"#)
            .await
            .unwrap();
        assert_eq!(store.restore().await, SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn ready_resolves_after_restore() {
        let store = Arc::new(store_with(StubAuthService::new(), MemoryStorage::new()));

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.ready().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        store.restore().await;
        assert_eq!(waiter.await.unwrap(), SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn login_during_restore_is_not_overwritten() {
        let storage = MemoryStorage::new();
        let release = Arc::new(Notify::new());
        let store = Arc::new(SessionStore::new(
            Arc::new(StubAuthService::new()),
            Arc::new(SlowReads {
                inner: storage.clone(),
                release: release.clone(),
            }),
        ));

        let restoring = {
            let store = store.clone();
            tokio::spawn(async move { store.restore().await })
        };
        let logging_in = {
            let store = store.clone();
            tokio::spawn(async move { store.login("a@b.com", "pw1").await })
        };
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(!logging_in.is_finished());
        assert_eq!(store.state(), SessionState::Initializing);

        release.notify_one();
        assert_eq!(restoring.await.unwrap(), SessionState::LoggedOut);
        let identity = logging_in.await.unwrap().unwrap();

        assert_eq!(store.state(), SessionState::LoggedIn(identity));
        let persisted: serde_json::Value =
            serde_json::from_str(&storage.load(SESSION_KEY).await.unwrap().unwrap()).unwrap();
        assert_eq!(persisted["email"], "a@b.com");
    }

    #[tokio::test]
    async fn logout_before_restore_waits_for_it() {
        let storage = MemoryStorage::with_entry(SESSION_KEY, r#"{"email":"a@b.com","token":"t1"}"#);
        let store = Arc::new(store_with(StubAuthService::new(), storage.clone()));

        let logging_out = {
            let store = store.clone();
            tokio::spawn(async move { store.logout().await })
        };
        tokio::task::yield_now().await;
        assert!(!logging_out.is_finished());
        assert_eq!(storage.len().await, 1);

        assert!(store.restore().await.is_logged_in());
        logging_out.await.unwrap();

        assert_eq!(store.state(), SessionState::LoggedOut);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn register_does_not_log_in() {
        let auth = StubAuthService::new();
        let store = store_with(auth.clone(), MemoryStorage::new());
        store.restore().await;

        store.register("a@b.com", "pw1").await.unwrap();

        assert_eq!(store.state(), SessionState::LoggedOut);
        assert_eq!(auth.registered().await, vec!["a@b.com".to_string()]);
    }

    #[tokio::test]
    async fn register_forwards_rejection() {
        let auth = StubAuthService::new();
        auth.fail_register(AuthError::duplicate_email(Some("Email already exist".into())))
            .await;
        let store = store_with(auth, MemoryStorage::new());
        store.restore().await;

        let err = store.register("a@b.com", "pw1").await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail { .. }));
        assert_eq!(store.state(), SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn login_adopts_and_persists_returned_identity() {
        let auth = StubAuthService::new();
        auth.respond_to_login(json!({ "token": "t1", "email": "a@b.com" })).await;
        let storage = MemoryStorage::new();
        let store = store_with(auth, storage.clone());
        store.restore().await;

        let identity = store.login("a@b.com", "pw1").await.unwrap();

        assert_eq!(store.state(), SessionState::LoggedIn(identity.clone()));
        let persisted = storage.load(SESSION_KEY).await.unwrap().unwrap();
        let persisted: serde_json::Value = serde_json::from_str(&persisted).unwrap();
        assert_eq!(persisted, json!({ "token": "t1", "email": "a@b.com" }));
    }

    #[tokio::test]
    async fn failed_login_leaves_state_alone() {
        let auth = StubAuthService::new();
        auth.fail_login(AuthError::invalid_credentials(Some("Invalid credentials".into())))
            .await;
        let storage = MemoryStorage::new();
        let store = store_with(auth, storage.clone());
        store.restore().await;

        assert!(store.login("a@b.com", "wrong").await.is_err());
        assert_eq!(store.state(), SessionState::LoggedOut);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn login_still_works_when_persisting_fails() {
        let store = SessionStore::new(Arc::new(StubAuthService::new()), Arc::new(FailingStorage));
        store.restore().await;

        store.login("a@b.com", "pw1").await.unwrap();
        assert!(store.state().is_logged_in());
    }

    #[tokio::test]
    async fn logout_clears_everything_from_any_state() {
        for logged_in_first in [false, true] {
            let storage = MemoryStorage::new();
            let store = store_with(StubAuthService::new(), storage.clone());
            store.restore().await;
            if logged_in_first {
                store.login("a@b.com", "pw1").await.unwrap();
            }

            store.logout().await;

            assert_eq!(store.state(), SessionState::LoggedOut);
            assert!(storage.is_empty().await);
        }
    }

    #[tokio::test]
    async fn logout_never_fails_on_broken_storage() {
        let store = SessionStore::new(Arc::new(StubAuthService::new()), Arc::new(FailingStorage));
        store.restore().await;
        store.login("a@b.com", "pw1").await.unwrap();

        store.logout().await;
        assert_eq!(store.state(), SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let store = store_with(StubAuthService::new(), MemoryStorage::new());
        let mut rx = store.subscribe();

        store.restore().await;
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionState::LoggedOut);

        store.login("a@b.com", "pw1").await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_logged_in());
    }

    proptest! {
        #[test]
        fn login_then_read_yields_returned_identity(
            email in "[a-z]{1,12}@[a-z]{1,8}\\.[a-z]{2,3}",
            secret in "[ -~]{1,32}",
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            rt.block_on(async {
                let store = store_with(StubAuthService::new(), MemoryStorage::new());
                store.restore().await;

                let identity = store.login(&email, &secret).await.unwrap();

                prop_assert_eq!(&identity.email, &email);
                prop_assert_eq!(store.state(), SessionState::LoggedIn(identity));
                Ok(())
            })?;
        }

        #[test]
        fn logout_always_ends_logged_out(login_first in any::<bool>()) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            rt.block_on(async {
                let storage = MemoryStorage::with_entry(SESSION_KEY, r#"{"email":"x@y.z","token":"old"}"#);
                let store = store_with(StubAuthService::new(), storage.clone());

                // Issued before restore runs; both wait for it.
                let (_, login) = tokio::join!(store.restore(), async {
                    let login = if login_first {
                        Some(store.login("a@b.com", "pw1").await)
                    } else {
                        None
                    };
                    store.logout().await;
                    login
                });

                prop_assert!(login.is_none_or(|login| login.is_ok()));
                prop_assert_eq!(store.state(), SessionState::LoggedOut);
                prop_assert!(storage.is_empty().await);
                Ok(())
            })?;
        }
    }
}
