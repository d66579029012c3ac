//! Contract of the external auth API.

use async_trait::async_trait;

use shopfront_core::AuthResult;

use crate::identity::{Account, Identity};

/// Remote authentication collaborator.
///
/// Implementations only translate calls into requests; session state lives in
/// [`crate::SessionStore`]. Logging out has no server counterpart: dropping
/// the persisted identity is the whole operation.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account. Does not log the user in.
    async fn register(&self, email: &str, secret: &str) -> AuthResult<Account>;

    /// Exchange credentials for an identity carrying a token.
    async fn login(&self, email: &str, secret: &str) -> AuthResult<Identity>;
}
