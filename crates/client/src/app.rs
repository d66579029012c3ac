//! Application context.
//!
//! One [`App`] per process. It owns the session store and the collaborators,
//! and hands them to forms and views as they are opened.

use std::sync::Arc;

use anyhow::Context;

use shopfront_auth::{AuthService, Identity, RouteGate, SessionState, SessionStorage, SessionStore, SqliteStorage};
use shopfront_core::ApiResult;
use shopfront_products::{ProductId, ProductRecord, ProductService};

use crate::config::ClientConfig;
use crate::forms::{CreateProductAction, EditProductAction, FormController, LoginAction, RegisterAction};
use crate::http::{ApiClient, HttpAuthService, HttpProductService};
use crate::navigation::{History, Navigator};
use crate::routes::{self, Router, Screen};

pub struct App {
    config: ClientConfig,
    session: Arc<SessionStore>,
    products: Arc<dyn ProductService>,
    history: Arc<History>,
    router: Router,
}

impl App {
    pub fn new(
        config: ClientConfig,
        auth: Arc<dyn AuthService>,
        products: Arc<dyn ProductService>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        Self {
            config,
            session: Arc::new(SessionStore::new(auth, storage)),
            products,
            history: Arc::new(History::new()),
            router: Router::new(RouteGate::new(routes::LOGIN)),
        }
    }

    /// Wire up the HTTP collaborators and SQLite session storage.
    pub fn from_config(config: ClientConfig) -> anyhow::Result<Self> {
        let api = ApiClient::new(config.api_url.clone());
        let storage = match &config.data_dir {
            Some(dir) => SqliteStorage::in_dir(dir),
            None => SqliteStorage::in_default_location().context("failed to locate session storage")?,
        };
        tracing::info!(api_url = %config.api_url, storage = ?storage.path(), "client configured");

        Ok(Self::new(
            config,
            Arc::new(HttpAuthService::new(api.clone())),
            Arc::new(HttpProductService::new(api)),
            Arc::new(storage),
        ))
    }

    /// Restore the persisted session. Call once before showing anything.
    pub async fn start(&self) -> SessionState {
        self.session.restore().await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn history(&self) -> &Arc<History> {
        &self.history
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.session.current_user()
    }

    /// Resolve `path` for the current session and move there.
    ///
    /// A gated view sends the user to the login view instead. Nothing moves
    /// while the session is still being restored or the path is unknown.
    pub fn open(&self, path: &str) -> Screen {
        let screen = self.router.resolve(path, &self.session.state());
        match &screen {
            Screen::Render(view) => self.history.navigate(&view.path()),
            Screen::Redirect(to) => self.history.navigate(to),
            Screen::Blank | Screen::NotFound => {}
        }
        screen
    }

    pub async fn logout(&self) {
        self.session.logout().await;
    }

    pub fn register_form(&self) -> FormController<RegisterAction> {
        FormController::new(RegisterAction::new(self.session.clone()), self.navigator())
    }

    pub fn login_form(&self) -> FormController<LoginAction> {
        FormController::new(
            LoginAction::new(self.session.clone(), routes::PRODUCTS),
            self.navigator(),
        )
    }

    pub fn create_product_form(&self) -> FormController<CreateProductAction> {
        let action = CreateProductAction::new(
            self.session.clone(),
            self.products.clone(),
            routes::PRODUCTS,
            self.config.redirect_delay,
        );
        FormController::new(action, self.navigator())
    }

    /// Fetch product `id` and open an edit form prefilled with it.
    pub async fn edit_product_form(&self, id: ProductId) -> ApiResult<FormController<EditProductAction>> {
        EditProductAction::new(
            id,
            self.session.clone(),
            self.products.clone(),
            routes::PRODUCTS,
            self.config.redirect_delay,
        )
        .open(self.navigator())
        .await
    }

    pub async fn list_products(&self) -> ApiResult<Vec<ProductRecord>> {
        let token = self.session.token();
        self.products.list_products(token.as_ref()).await
    }

    fn navigator(&self) -> Arc<dyn Navigator> {
        self.history.clone()
    }
}
