//! Route table: which view a path shows and whether the session may see it.

use shopfront_auth::{GateDecision, RouteGate, SessionState};
use shopfront_products::ProductId;

pub const LOGIN: &str = "/login";
pub const REGISTER: &str = "/register";
pub const HOME: &str = "/home";
pub const PRODUCTS: &str = "/products";
pub const CREATE_PRODUCT: &str = "/create-products";
pub const EDIT_PRODUCT_PREFIX: &str = "/product-update/";
pub const PRODUCT_LIST: &str = "/product-list";

/// A view the client can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Login,
    Register,
    Home,
    /// Public catalog.
    Products,
    CreateProduct,
    EditProduct(ProductId),
    /// Management listing.
    ProductList,
}

impl View {
    /// Parse a path. Query strings and trailing slashes are ignored.
    pub fn from_path(path: &str) -> Option<View> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        let view = match path {
            LOGIN => View::Login,
            REGISTER => View::Register,
            HOME => View::Home,
            PRODUCTS => View::Products,
            CREATE_PRODUCT => View::CreateProduct,
            PRODUCT_LIST => View::ProductList,
            other => {
                let id = other.strip_prefix(EDIT_PRODUCT_PREFIX)?;
                if id.is_empty() || id.contains('/') {
                    return None;
                }
                View::EditProduct(ProductId::new(id))
            }
        };
        Some(view)
    }

    pub fn path(&self) -> String {
        match self {
            View::Login => LOGIN.to_string(),
            View::Register => REGISTER.to_string(),
            View::Home => HOME.to_string(),
            View::Products => PRODUCTS.to_string(),
            View::CreateProduct => CREATE_PRODUCT.to_string(),
            View::EditProduct(id) => format!("{EDIT_PRODUCT_PREFIX}{id}"),
            View::ProductList => PRODUCT_LIST.to_string(),
        }
    }

    /// Whether the view needs a logged-in session.
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            View::CreateProduct | View::EditProduct(_) | View::ProductList
        )
    }
}

/// What to show for a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Render(View),
    Redirect(String),
    /// Session still being restored; show nothing yet.
    Blank,
    NotFound,
}

#[derive(Debug, Clone, Default)]
pub struct Router {
    gate: RouteGate,
}

impl Router {
    pub fn new(gate: RouteGate) -> Self {
        Self { gate }
    }

    /// Nothing renders until the session has been restored, public views
    /// included.
    pub fn resolve(&self, path: &str, session: &SessionState) -> Screen {
        if session.is_initializing() {
            tracing::debug!(path, "session not restored yet");
            return Screen::Blank;
        }

        let Some(view) = View::from_path(path) else {
            tracing::debug!(path, "no route");
            return Screen::NotFound;
        };

        if !view.is_protected() {
            return Screen::Render(view);
        }

        match self.gate.check(session) {
            GateDecision::Admit => Screen::Render(view),
            GateDecision::Wait => Screen::Blank,
            GateDecision::Redirect(to) => {
                tracing::debug!(path, to = %to, "protected view, redirecting");
                Screen::Redirect(to)
            }
        }
    }
}
