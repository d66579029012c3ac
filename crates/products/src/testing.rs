//! In-memory product service for tests.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Map;
use tokio::sync::Mutex;

use shopfront_auth::AuthToken;
use shopfront_core::{ApiError, ApiResult};

use crate::product::{ProductDraft, ProductId, ProductRecord};
use crate::service::ProductService;

/// One recorded write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteCall {
    Create { draft: ProductDraft, token: String },
    Update { id: ProductId, draft: ProductDraft, token: String },
}

#[derive(Debug, Default)]
struct CatalogState {
    records: Vec<ProductRecord>,
    next_id: u64,
    write_error: Option<ApiError>,
    read_error: Option<ApiError>,
    writes: Vec<WriteCall>,
}

/// A catalog kept in memory. Writes can be scripted to fail.
#[derive(Debug, Clone, Default)]
pub struct StubProductService {
    inner: Arc<Mutex<CatalogState>>,
}

impl StubProductService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent write fails with `err`.
    pub async fn fail_writes(&self, err: ApiError) {
        self.inner.lock().await.write_error = Some(err);
    }

    /// Every subsequent read fails with `err`.
    pub async fn fail_reads(&self, err: ApiError) {
        self.inner.lock().await.read_error = Some(err);
    }

    /// Writes received so far, successful or not.
    pub async fn writes(&self) -> Vec<WriteCall> {
        self.inner.lock().await.writes.clone()
    }

    pub async fn records(&self) -> Vec<ProductRecord> {
        self.inner.lock().await.records.clone()
    }

    /// Insert a record directly, bypassing the write log.
    pub async fn seed(&self, draft: ProductDraft) -> ProductRecord {
        let mut state = self.inner.lock().await;
        insert(&mut state, &draft)
    }
}

fn insert(state: &mut CatalogState, draft: &ProductDraft) -> ProductRecord {
    state.next_id += 1;
    let record = ProductRecord {
        id: ProductId::new(state.next_id.to_string()),
        name: draft.name.clone(),
        description: draft.description.clone(),
        price: draft.price.clone(),
        stock: draft.stock.clone(),
        image: draft.image.clone(),
        extra: Map::new(),
    };
    state.records.push(record.clone());
    record
}

#[async_trait]
impl ProductService for StubProductService {
    async fn create_product(&self, draft: &ProductDraft, token: &AuthToken) -> ApiResult<ProductRecord> {
        let mut state = self.inner.lock().await;
        state.writes.push(WriteCall::Create {
            draft: draft.clone(),
            token: token.as_str().to_string(),
        });
        if let Some(err) = state.write_error.clone() {
            return Err(err);
        }
        Ok(insert(&mut state, draft))
    }

    async fn list_products(&self, _token: Option<&AuthToken>) -> ApiResult<Vec<ProductRecord>> {
        let state = self.inner.lock().await;
        if let Some(err) = state.read_error.clone() {
            return Err(err);
        }
        Ok(state.records.clone())
    }

    async fn get_product(&self, id: &ProductId, _token: Option<&AuthToken>) -> ApiResult<ProductRecord> {
        let state = self.inner.lock().await;
        if let Some(err) = state.read_error.clone() {
            return Err(err);
        }
        state
            .records
            .iter()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| ApiError::rejected(404, Some("Product not found".to_string())))
    }

    async fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
        token: &AuthToken,
    ) -> ApiResult<ProductRecord> {
        let mut state = self.inner.lock().await;
        state.writes.push(WriteCall::Update {
            id: id.clone(),
            draft: draft.clone(),
            token: token.as_str().to_string(),
        });
        if let Some(err) = state.write_error.clone() {
            return Err(err);
        }

        let record = state
            .records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| ApiError::rejected(404, Some("Product not found".to_string())))?;
        record.name = draft.name.clone();
        record.description = draft.description.clone();
        record.price = draft.price.clone();
        record.stock = draft.stock.clone();
        if let Some(image) = &draft.image {
            record.image = Some(image.clone());
        }
        Ok(record.clone())
    }
}
