//! HTTP implementations of the auth and product collaborators.
//!
//! Endpoints, relative to the configured API URL:
//!
//! - `POST /auth/register`, `POST /auth/login`
//! - `GET /products`, `POST /products`
//! - `GET /products/{id}`, `PUT /products/{id}`
//!
//! Writes carry `Authorization: Bearer <token>`. Every request carries a
//! fresh `x-request-id`. Error bodies of the form `{ "message": "..." }` become
//! the error's server message.

use async_trait::async_trait;
use reqwest::{Client, IntoUrl, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use shopfront_auth::{Account, AuthService, AuthToken, Identity};
use shopfront_core::{ApiError, ApiResult, AuthError, AuthResult, RequestId};
use shopfront_products::{ProductDraft, ProductId, ProductRecord, ProductService};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Message the auth API sends when registering a taken email.
const DUPLICATE_EMAIL_MESSAGE: &str = "Email already exist";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Shared connection to the API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Base URL extended by `segments`, each percent-encoded as one path
    /// segment.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ApiError::transport(format!("invalid API URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::transport("API URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, path: &str, token: Option<&AuthToken>) -> RequestBuilder {
        self.request_to(method, self.url(path), token)
    }

    fn request_to<U>(&self, method: reqwest::Method, url: U, token: Option<&AuthToken>) -> RequestBuilder
    where
        U: IntoUrl + std::fmt::Display,
    {
        let request_id = RequestId::new();
        tracing::debug!(%method, %url, %request_id, authorized = token.is_some(), "api request");
        let mut req = self
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(token) = token {
            req = req.bearer_auth(token.as_str());
        }
        req
    }
}

/// Pull `message` out of an error response, if it has one.
async fn error_message(resp: Response) -> Option<String> {
    let text = resp.text().await.ok()?;
    serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.message)
}

async fn api_json<T: DeserializeOwned>(req: RequestBuilder) -> ApiResult<T> {
    let resp = req
        .send()
        .await
        .map_err(|e| ApiError::transport(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let message = error_message(resp).await;
        tracing::debug!(status = status.as_u16(), ?message, "api request rejected");
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::unauthorized(message),
            _ => ApiError::rejected(status.as_u16(), message),
        });
    }

    resp.json::<T>()
        .await
        .map_err(|e| ApiError::decode(e.to_string()))
}

/// Product list responses come bare or wrapped in `{ "products": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProductList {
    Bare(Vec<ProductRecord>),
    Wrapped { products: Vec<ProductRecord> },
}

#[derive(Debug, Clone)]
pub struct HttpAuthService {
    api: ApiClient,
}

impl HttpAuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    async fn post(&self, path: &str, email: &str, secret: &str) -> AuthResult<Value> {
        let resp = self
            .api
            .request(reqwest::Method::POST, path, None)
            .json(&json!({ "email": email, "password_hash": secret }))
            .send()
            .await
            .map_err(|e| AuthError::transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = error_message(resp).await;
            return Err(classify_auth_failure(path, status, message));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| AuthError::transport(format!("unreadable auth response: {e}")))
    }
}

fn classify_auth_failure(path: &str, status: StatusCode, message: Option<String>) -> AuthError {
    let duplicate = status == StatusCode::CONFLICT || message.as_deref() == Some(DUPLICATE_EMAIL_MESSAGE);
    match status {
        _ if path.ends_with("/register") && duplicate => AuthError::duplicate_email(message),
        StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND if path.ends_with("/login") => {
            AuthError::invalid_credentials(message)
        }
        _ => AuthError::rejected(status.as_u16(), message),
    }
}

/// Parse a login response, filling in the submitted email when the server
/// leaves it out.
fn identity_from_login(mut body: Value, email: &str) -> AuthResult<Identity> {
    if let Value::Object(map) = &mut body {
        map.entry("email").or_insert_with(|| Value::String(email.to_string()));
    }
    serde_json::from_value(body)
        .map_err(|e| AuthError::transport(format!("login response without a usable identity: {e}")))
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn register(&self, email: &str, secret: &str) -> AuthResult<Account> {
        let mut body = self.post("/auth/register", email, secret).await?;
        if let Value::Object(map) = &mut body {
            map.entry("email").or_insert_with(|| Value::String(email.to_string()));
        }
        // Any success status counts, whatever the body looks like.
        Ok(serde_json::from_value(body).unwrap_or_else(|_| Account::new(email)))
    }

    async fn login(&self, email: &str, secret: &str) -> AuthResult<Identity> {
        let body = self.post("/auth/login", email, secret).await?;
        identity_from_login(body, email)
    }
}

#[derive(Debug, Clone)]
pub struct HttpProductService {
    api: ApiClient,
}

impl HttpProductService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn product_url(&self, id: &ProductId) -> ApiResult<Url> {
        self.api.endpoint(&["products", id.as_str()])
    }
}

#[async_trait]
impl ProductService for HttpProductService {
    async fn create_product(&self, draft: &ProductDraft, token: &AuthToken) -> ApiResult<ProductRecord> {
        let req = self
            .api
            .request(reqwest::Method::POST, "/products", Some(token))
            .json(draft);
        api_json(req).await
    }

    async fn list_products(&self, token: Option<&AuthToken>) -> ApiResult<Vec<ProductRecord>> {
        let req = self.api.request(reqwest::Method::GET, "/products", token);
        Ok(match api_json::<ProductList>(req).await? {
            ProductList::Bare(products) | ProductList::Wrapped { products } => products,
        })
    }

    async fn get_product(&self, id: &ProductId, token: Option<&AuthToken>) -> ApiResult<ProductRecord> {
        let req = self
            .api
            .request_to(reqwest::Method::GET, self.product_url(id)?, token);
        api_json(req).await
    }

    async fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
        token: &AuthToken,
    ) -> ApiResult<ProductRecord> {
        let req = self
            .api
            .request_to(reqwest::Method::PUT, self.product_url(id)?, Some(token))
            .json(draft);
        api_json(req).await
    }
}
