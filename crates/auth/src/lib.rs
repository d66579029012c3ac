//! `shopfront-auth`: who is logged in, and may they see this view.
//!
//! This crate owns the session lifecycle (restore, login, register, logout),
//! its persistence, and the admission decision for protected views. Talking to
//! the actual auth API is behind the [`AuthService`] trait.

pub mod gate;
pub mod identity;
pub mod service;
pub mod session;
pub mod storage;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use gate::{GateDecision, RouteGate};
pub use identity::{Account, AuthToken, Identity, InvalidToken};
pub use service::AuthService;
pub use session::{SESSION_KEY, SessionState, SessionStore};
pub use storage::{MemoryStorage, SessionStorage, SqliteStorage, StorageError};
