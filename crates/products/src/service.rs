//! Contract of the external product API.

use async_trait::async_trait;

use shopfront_auth::AuthToken;
use shopfront_core::ApiResult;

use crate::product::{ProductDraft, ProductId, ProductRecord};

/// Remote product collaborator. Writes require a token; reads accept one.
#[async_trait]
pub trait ProductService: Send + Sync {
    async fn create_product(&self, draft: &ProductDraft, token: &AuthToken) -> ApiResult<ProductRecord>;

    async fn list_products(&self, token: Option<&AuthToken>) -> ApiResult<Vec<ProductRecord>>;

    async fn get_product(&self, id: &ProductId, token: Option<&AuthToken>) -> ApiResult<ProductRecord>;

    /// Replace the editable fields of a product. A draft without an image
    /// leaves the stored image as it is.
    async fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
        token: &AuthToken,
    ) -> ApiResult<ProductRecord>;
}
