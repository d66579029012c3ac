//! `shopfront-client`
//!
//! **Responsibility:** the catalog client itself.
//!
//! This crate provides:
//! - The form-submission protocol and the concrete forms (register, login,
//!   create/edit product)
//! - Navigation, including delayed redirects that die with their form
//! - The route table and its admission check
//! - HTTP implementations of the auth and product collaborators
//! - The application context that owns all of the above
//!
//! The client is a **thin shell** around the catalog API: it never validates
//! or stores catalog data itself.

pub mod app;
pub mod config;
pub mod forms;
pub mod http;
pub mod navigation;
pub mod routes;

pub use app::App;
pub use config::{ClientConfig, ConfigError};
pub use forms::{FormController, FormError, FormState, SubmitError};
pub use navigation::{History, Navigator, ScheduledNavigation};
pub use routes::{Router, Screen, View};
