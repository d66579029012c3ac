use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Bearer token issued by the auth API.
///
/// Never empty: a token only comes into existence by parsing a server
/// response or a persisted record, and both reject blank values.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AuthToken(String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("auth token must not be empty")]
pub struct InvalidToken;

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Result<Self, InvalidToken> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(InvalidToken);
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AuthToken {
    type Error = InvalidToken;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AuthToken> for String {
    fn from(value: AuthToken) -> Self {
        value.0
    }
}

// Keep tokens out of logs.
impl core::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// The authenticated user, as issued by the auth API on login.
///
/// Only `email` and `token` are interpreted; any other fields the server sends
/// are carried along untouched so the persisted record matches what was
/// received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub token: AuthToken,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Identity {
    pub fn new(email: impl Into<String>, token: AuthToken) -> Self {
        Self {
            email: email.into(),
            token,
            extra: Map::new(),
        }
    }
}

/// The account record returned by a successful registration.
///
/// Registration does not authenticate, so no token is expected here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Account {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            extra: Map::new(),
        }
    }
}
