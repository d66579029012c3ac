//! Embedding a local image file into a product draft.
//!
//! The file is read asynchronously and turned into a data URL, the same text
//! form a browser produces for a selected file.

use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use thiserror::Error;
use tokio::fs;

use crate::product::ImageRef;

#[derive(Debug, Error)]
#[error("failed to read image file {path:?}: {source}")]
pub struct ImageError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Guess a media type from the file extension.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "avif" => "image/avif",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Encode raw bytes as an embedded image.
pub fn embed_image_bytes(mime_type: &str, bytes: &[u8]) -> ImageRef {
    ImageRef::EmbeddedData(format!(
        "data:{};base64,{}",
        mime_type,
        BASE64_STANDARD.encode(bytes)
    ))
}

/// Read `path` and encode it as an embedded image.
pub async fn embed_image_file(path: &Path) -> Result<ImageRef, ImageError> {
    let bytes = fs::read(path).await.map_err(|source| ImageError {
        path: path.to_path_buf(),
        source,
    })?;

    let mime_type = guess_mime_type(path);
    tracing::debug!(?path, mime_type, size = bytes.len(), "embedded image file");

    Ok(embed_image_bytes(mime_type, &bytes))
}
