//! `shopfront-core`: shared client building blocks.
//!
//! This crate contains the error taxonomy every collaborator reports through and
//! the identifiers used to correlate requests. It has no IO.

pub mod error;
pub mod id;

pub use error::{
    ApiError, ApiResult, AuthError, AuthResult, ServerMessage, UNEXPECTED_ERROR,
};
pub use id::{RequestId, SubmissionId};
