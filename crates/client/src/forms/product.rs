//! Product creation and editing forms.
//!
//! Both send the typed values through unchanged; only the image needs work
//! before the remote call, since a selected file has to be read and embedded.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use shopfront_auth::{AuthToken, SessionStore};
use shopfront_core::ApiResult;
use shopfront_products::{ImageRef, ProductDraft, ProductId, ProductRecord, ProductService, embed_image_file};

use super::{FieldValues, FormAction, FormController, Redirect, SubmitError};
use crate::navigation::Navigator;

pub const SELECT_IMAGE_MESSAGE: &str = "Please select an image file.";
pub const LOGIN_REQUIRED_MESSAGE: &str = "You must be logged in to do that.";

/// Fields shared by both forms. `image_file` is a local path.
const CREATE_FIELDS: &[&str] = &["name", "description", "price", "stock", "image_file"];
/// Editing also accepts a hosted image by URL.
const EDIT_FIELDS: &[&str] = &["name", "description", "price", "stock", "image_file", "image_url"];

fn draft_from_fields(fields: &FieldValues) -> ProductDraft {
    let text = |name: &str| fields.get(name).cloned().unwrap_or_default();
    ProductDraft {
        name: text("name"),
        description: text("description"),
        price: text("price"),
        stock: text("stock"),
        image: None,
    }
}

fn non_blank<'a>(fields: &'a FieldValues, name: &str) -> Option<&'a str> {
    fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn require_token(session: &SessionStore) -> Result<AuthToken, SubmitError> {
    session
        .token()
        .ok_or_else(|| SubmitError::precondition(LOGIN_REQUIRED_MESSAGE))
}

/// A draft and the token to send it with.
pub struct ProductWrite {
    draft: ProductDraft,
    token: AuthToken,
}

impl ProductWrite {
    pub fn draft(&self) -> &ProductDraft {
        &self.draft
    }
}

/// Creates a product from the typed fields and an embedded image file, then
/// returns to the listing after `delay`.
pub struct CreateProductAction {
    session: Arc<SessionStore>,
    products: Arc<dyn ProductService>,
    listing: String,
    delay: Duration,
}

impl CreateProductAction {
    pub fn new(
        session: Arc<SessionStore>,
        products: Arc<dyn ProductService>,
        listing: impl Into<String>,
        delay: Duration,
    ) -> Self {
        Self {
            session,
            products,
            listing: listing.into(),
            delay,
        }
    }
}

#[async_trait]
impl FormAction for CreateProductAction {
    type Payload = ProductWrite;
    type Output = ProductRecord;

    fn name(&self) -> &'static str {
        "create_product"
    }

    fn fields(&self) -> &'static [&'static str] {
        CREATE_FIELDS
    }

    async fn prepare(&self, fields: &FieldValues) -> Result<ProductWrite, SubmitError> {
        let Some(image_file) = non_blank(fields, "image_file") else {
            return Err(SubmitError::precondition(SELECT_IMAGE_MESSAGE));
        };
        let token = require_token(&self.session)?;
        let image = embed_image_file(Path::new(image_file)).await?;

        Ok(ProductWrite {
            draft: draft_from_fields(fields).with_image(image),
            token,
        })
    }

    async fn send(&self, payload: ProductWrite) -> Result<ProductRecord, SubmitError> {
        Ok(self
            .products
            .create_product(&payload.draft, &payload.token)
            .await?)
    }

    fn success_message(&self, _record: &ProductRecord) -> String {
        "Product created successfully!".to_string()
    }

    fn redirect(&self, _record: &ProductRecord) -> Option<Redirect> {
        Some(Redirect::after(self.listing.clone(), self.delay))
    }
}

/// Updates an existing product.
///
/// A selected file wins over a URL; with neither, the stored image is kept.
pub struct EditProductAction {
    id: ProductId,
    session: Arc<SessionStore>,
    products: Arc<dyn ProductService>,
    listing: String,
    delay: Duration,
}

impl EditProductAction {
    pub fn new(
        id: ProductId,
        session: Arc<SessionStore>,
        products: Arc<dyn ProductService>,
        listing: impl Into<String>,
        delay: Duration,
    ) -> Self {
        Self {
            id,
            session,
            products,
            listing: listing.into(),
            delay,
        }
    }

    pub fn id(&self) -> &ProductId {
        &self.id
    }

    /// Fetch the product and build a form prefilled with its values.
    ///
    /// An embedded image is not copied into the URL field; leaving the image
    /// fields blank keeps it.
    pub async fn open(self, navigator: Arc<dyn Navigator>) -> ApiResult<FormController<Self>> {
        let token = self.session.token();
        let record = self.products.get_product(&self.id, token.as_ref()).await?;

        let mut form = FormController::new(self, navigator);
        form.prefill(prefill_values(&record));
        Ok(form)
    }
}

fn prefill_values(record: &ProductRecord) -> FieldValues {
    let draft = ProductDraft::from_record(record);
    let image_url = match &draft.image {
        Some(ImageRef::Url(url)) => url.clone(),
        _ => String::new(),
    };
    [
        ("name", draft.name),
        ("description", draft.description),
        ("price", draft.price),
        ("stock", draft.stock),
        ("image_url", image_url),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

#[async_trait]
impl FormAction for EditProductAction {
    type Payload = ProductWrite;
    type Output = ProductRecord;

    fn name(&self) -> &'static str {
        "edit_product"
    }

    fn fields(&self) -> &'static [&'static str] {
        EDIT_FIELDS
    }

    async fn prepare(&self, fields: &FieldValues) -> Result<ProductWrite, SubmitError> {
        let token = require_token(&self.session)?;

        let image = if let Some(image_file) = non_blank(fields, "image_file") {
            Some(embed_image_file(Path::new(image_file)).await?)
        } else {
            non_blank(fields, "image_url").map(ImageRef::parse)
        };

        Ok(ProductWrite {
            draft: ProductDraft {
                image,
                ..draft_from_fields(fields)
            },
            token,
        })
    }

    async fn send(&self, payload: ProductWrite) -> Result<ProductRecord, SubmitError> {
        Ok(self
            .products
            .update_product(&self.id, &payload.draft, &payload.token)
            .await?)
    }

    fn success_message(&self, _record: &ProductRecord) -> String {
        "Product updated successfully!".to_string()
    }

    fn redirect(&self, _record: &ProductRecord) -> Option<Redirect> {
        Some(Redirect::after(self.listing.clone(), self.delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::History;
    use serde_json::json;
    use shopfront_auth::MemoryStorage;
    use shopfront_auth::testing::StubAuthService;
    use shopfront_core::ApiError;
    use shopfront_products::testing::{StubProductService, WriteCall};

    const DELAY: Duration = Duration::from_secs(2);

    struct Fixture {
        session: Arc<SessionStore>,
        products: StubProductService,
        history: Arc<History>,
    }

    impl Fixture {
        async fn logged_in() -> Self {
            let auth = StubAuthService::new();
            auth.respond_to_login(json!({ "token": "t1", "email": "a@b.com" })).await;
            let fixture = Self::logged_out_with(auth).await;
            fixture.session.login("a@b.com", "pw1").await.unwrap();
            fixture
        }

        async fn logged_out_with(auth: StubAuthService) -> Self {
            let session = Arc::new(SessionStore::new(Arc::new(auth), Arc::new(MemoryStorage::new())));
            session.restore().await;
            Self {
                session,
                products: StubProductService::new(),
                history: Arc::new(History::new()),
            }
        }

        fn create_form(&self) -> FormController<CreateProductAction> {
            let action = CreateProductAction::new(
                self.session.clone(),
                Arc::new(self.products.clone()),
                "/products",
                DELAY,
            );
            FormController::new(action, self.history.clone())
        }

        fn edit_action(&self, id: &ProductId) -> EditProductAction {
            EditProductAction::new(
                id.clone(),
                self.session.clone(),
                Arc::new(self.products.clone()),
                "/products",
                DELAY,
            )
        }
    }

    fn fill(form: &mut FormController<CreateProductAction>, image_file: &str) {
        form.set_field("name", "Mug").unwrap();
        form.set_field("description", "Blue").unwrap();
        form.set_field("price", "9.99").unwrap();
        form.set_field("stock", "3").unwrap();
        form.set_field("image_file", image_file).unwrap();
    }

    fn image_on_disk(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("mug.png");
        std::fs::write(&path, b"hello").unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn missing_image_fails_fast_without_a_remote_call() {
        let fixture = Fixture::logged_in().await;
        let mut form = fixture.create_form();
        fill(&mut form, "");

        let err = form.submit().await.unwrap_err();

        assert!(matches!(err, SubmitError::Precondition(_)));
        assert!(fixture.products.writes().await.is_empty());
        let state = form.state();
        assert_eq!(state.error_message(), Some("Error: Please select an image file."));
        assert!(!state.is_submitting());
        assert_eq!(state.field("name"), Some("Mug"));
    }

    #[tokio::test]
    async fn logged_out_user_cannot_create() {
        let fixture = Fixture::logged_out_with(StubAuthService::new()).await;
        let dir = tempfile::tempdir().unwrap();
        let mut form = fixture.create_form();
        fill(&mut form, &image_on_disk(&dir));

        assert!(form.submit().await.is_err());

        assert!(fixture.products.writes().await.is_empty());
        assert_eq!(
            form.state().error_message(),
            Some("Error: You must be logged in to do that.")
        );
    }

    #[tokio::test]
    async fn unreadable_image_is_reported_without_a_remote_call() {
        let fixture = Fixture::logged_in().await;
        let dir = tempfile::tempdir().unwrap();
        let mut form = fixture.create_form();
        fill(&mut form, &dir.path().join("gone.png").to_string_lossy());

        let err = form.submit().await.unwrap_err();

        assert!(matches!(err, SubmitError::Image(_)));
        assert!(fixture.products.writes().await.is_empty());
        assert_eq!(
            form.state().error_message(),
            Some("Error: Could not read the selected image file.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn successful_create_sends_typed_values_and_redirects_once() {
        let fixture = Fixture::logged_in().await;
        let dir = tempfile::tempdir().unwrap();
        let mut form = fixture.create_form();
        fill(&mut form, &image_on_disk(&dir));

        let record = form.submit().await.unwrap();

        let writes = fixture.products.writes().await;
        assert_eq!(writes.len(), 1);
        let WriteCall::Create { draft, token } = &writes[0] else {
            panic!("expected a create, got {writes:?}");
        };
        assert_eq!(token, "t1");
        assert_eq!(draft.price, "9.99");
        assert_eq!(draft.stock, "3");
        assert_eq!(
            draft.image,
            Some(ImageRef::EmbeddedData("data:image/png;base64,aGVsbG8=".into()))
        );
        assert_eq!(record.name, "Mug");

        let state = form.state();
        assert_eq!(state.result_message(), Some("Product created successfully!"));
        assert!(state.fields().values().all(String::is_empty));
        assert!(fixture.history.is_empty());

        form.pending_redirect().unwrap().finished().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fixture.history.entries(), vec!["/products"]);
    }

    #[tokio::test]
    async fn rejected_create_shows_server_message_and_keeps_fields() {
        let fixture = Fixture::logged_in().await;
        fixture
            .products
            .fail_writes(ApiError::rejected(422, Some("Invalid price".into())))
            .await;
        let dir = tempfile::tempdir().unwrap();
        let image = image_on_disk(&dir);
        let mut form = fixture.create_form();
        fill(&mut form, &image);
        form.set_field("price", "abc").unwrap();

        assert!(form.submit().await.is_err());

        let state = form.state();
        assert_eq!(state.error_message(), Some("Error: Invalid price"));
        assert_eq!(state.result_message(), None);
        assert_eq!(state.field("price"), Some("abc"));
        assert_eq!(state.field("image_file"), Some(image.as_str()));
        assert!(state.submit_enabled());
        assert!(form.pending_redirect().is_none());
    }

    #[tokio::test]
    async fn edit_form_is_prefilled_from_the_record() {
        let fixture = Fixture::logged_in().await;
        let record = fixture
            .products
            .seed(ProductDraft {
                name: "Mug".into(),
                description: "Blue".into(),
                price: "9.99".into(),
                stock: "3".into(),
                image: Some(ImageRef::parse("https://cdn.example/mug.png")),
            })
            .await;

        let form = fixture
            .edit_action(&record.id)
            .open(fixture.history.clone())
            .await
            .unwrap();

        let state = form.state();
        assert_eq!(state.field("name"), Some("Mug"));
        assert_eq!(state.field("price"), Some("9.99"));
        assert_eq!(state.field("image_url"), Some("https://cdn.example/mug.png"));
        assert_eq!(state.field("image_file"), Some(""));
    }

    #[tokio::test]
    async fn opening_a_missing_product_fails() {
        let fixture = Fixture::logged_in().await;
        let result = fixture
            .edit_action(&ProductId::new("404"))
            .open(fixture.history.clone())
            .await;
        assert!(matches!(result, Err(ApiError::Rejected { status: 404, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn edit_without_new_image_keeps_the_stored_one() {
        let fixture = Fixture::logged_in().await;
        let embedded = ImageRef::parse("data:image/png;base64,AAAA");
        let record = fixture
            .products
            .seed(ProductDraft {
                name: "Mug".into(),
                price: "1".into(),
                stock: "1".into(),
                image: Some(embedded.clone()),
                ..ProductDraft::default()
            })
            .await;
        let mut form = fixture
            .edit_action(&record.id)
            .open(fixture.history.clone())
            .await
            .unwrap();
        form.set_field("price", "2").unwrap();

        let updated = form.submit().await.unwrap();

        assert_eq!(updated.price, "2");
        assert_eq!(updated.image, Some(embedded));
        let writes = fixture.products.writes().await;
        let WriteCall::Update { draft, .. } = &writes[0] else {
            panic!("expected an update, got {writes:?}");
        };
        assert_eq!(draft.image, None);
        assert_eq!(form.state().result_message(), Some("Product updated successfully!"));

        form.pending_redirect().unwrap().finished().await;
        assert_eq!(fixture.history.entries(), vec!["/products"]);
    }

    #[tokio::test]
    async fn edit_prefers_a_selected_file_over_the_url() {
        let fixture = Fixture::logged_in().await;
        let record = fixture.products.seed(ProductDraft::default()).await;
        let dir = tempfile::tempdir().unwrap();
        let mut form = fixture
            .edit_action(&record.id)
            .open(fixture.history.clone())
            .await
            .unwrap();
        form.set_field("image_url", "https://cdn.example/new.png").unwrap();
        form.set_field("image_file", image_on_disk(&dir)).unwrap();

        let updated = form.submit().await.unwrap();

        assert!(updated.image.unwrap().is_embedded());
    }

    #[tokio::test]
    async fn edit_with_url_replaces_the_image() {
        let fixture = Fixture::logged_in().await;
        let record = fixture.products.seed(ProductDraft::default()).await;
        let mut form = fixture
            .edit_action(&record.id)
            .open(fixture.history.clone())
            .await
            .unwrap();
        form.set_field("image_url", "https://cdn.example/new.png").unwrap();

        let updated = form.submit().await.unwrap();

        assert_eq!(updated.image, Some(ImageRef::Url("https://cdn.example/new.png".into())));
    }
}
