//! Product catalog types, as the client sees them.
//!
//! The catalog itself lives behind the remote API; this crate only describes
//! what travels over it (drafts out, records back), how a local image file is
//! embedded into a draft, and the [`ProductService`] contract.

pub mod image;
pub mod product;
pub mod service;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use image::{ImageError, embed_image_bytes, embed_image_file, guess_mime_type};
pub use product::{ImageRef, ProductDraft, ProductId, ProductRecord};
pub use service::ProductService;
