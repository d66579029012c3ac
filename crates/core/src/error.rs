//! Client error model.
//!
//! Collaborator failures are split by concern: [`AuthError`] for the auth
//! service and [`ApiError`] for everything behind the product API. Both carry
//! the server's human-readable explanation when one was sent, and
//! [`ServerMessage`] picks between that explanation and the generic fallback.

use thiserror::Error;

/// Fallback shown to the user when a failure carries no explanation.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred.";

/// Result type for auth-service calls.
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type for product-API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Access to the explanation a collaborator attached to a failure.
pub trait ServerMessage {
    /// The collaborator-supplied explanation, if any.
    fn server_message(&self) -> Option<&str>;

    /// The text to present: the explanation when non-blank, otherwise
    /// [`UNEXPECTED_ERROR`].
    fn user_message(&self) -> &str {
        self.server_message()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(UNEXPECTED_ERROR)
    }
}

/// Failure reported by the auth service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong secret.
    #[error("invalid credentials")]
    InvalidCredentials { message: Option<String> },

    /// Registration attempted with an email that already has an account.
    #[error("email already registered")]
    DuplicateEmail { message: Option<String> },

    /// Any other non-success response.
    #[error("auth request rejected with status {status}")]
    Rejected { status: u16, message: Option<String> },

    /// The request never produced a usable response.
    #[error("auth transport failure: {0}")]
    Transport(String),
}

impl AuthError {
    pub fn invalid_credentials(message: Option<String>) -> Self {
        Self::InvalidCredentials { message }
    }

    pub fn duplicate_email(message: Option<String>) -> Self {
        Self::DuplicateEmail { message }
    }

    pub fn rejected(status: u16, message: Option<String>) -> Self {
        Self::Rejected { status, message }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

impl ServerMessage for AuthError {
    fn server_message(&self) -> Option<&str> {
        match self {
            AuthError::InvalidCredentials { message }
            | AuthError::DuplicateEmail { message }
            | AuthError::Rejected { message, .. } => message.as_deref(),
            // Transport details are for logs, not for the screen.
            AuthError::Transport(_) => None,
        }
    }
}

/// Failure reported by the product API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The API refused the request (validation, not found, conflict, ...).
    #[error("request rejected with status {status}")]
    Rejected { status: u16, message: Option<String> },

    /// Missing or expired token.
    #[error("not authorized")]
    Unauthorized { message: Option<String> },

    /// The request never produced a usable response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A success response whose body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn rejected(status: u16, message: Option<String>) -> Self {
        Self::Rejected { status, message }
    }

    pub fn unauthorized(message: Option<String>) -> Self {
        Self::Unauthorized { message }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// HTTP status of the rejection, when the API answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Transport(_) | ApiError::Decode(_) => None,
        }
    }
}

impl ServerMessage for ApiError {
    fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } | ApiError::Unauthorized { message } => {
                message.as_deref()
            }
            ApiError::Transport(_) | ApiError::Decode(_) => None,
        }
    }
}
