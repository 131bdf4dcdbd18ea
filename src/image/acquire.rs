//! Turning a user-selected file into an [`EncodedImage`].

use crate::error::Result;
use crate::image::types::{is_image_mime_type, EncodedImage, ImageFormat};
use std::path::{Path, PathBuf};

/// MIME type declared for files whose extension is not a known image type.
const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// A file picked or dropped by the user, with its declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    path: PathBuf,
    mime_type: String,
}

impl SelectedFile {
    /// Creates a selection with an explicitly declared MIME type.
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Creates a selection, declaring the MIME type from the file extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension)
            .map(|f| f.mime_type())
            .unwrap_or(UNKNOWN_MIME_TYPE)
            .to_string();
        Self { path, mime_type }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the declared MIME type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns true if the declared type is an image type.
    pub fn is_image(&self) -> bool {
        is_image_mime_type(&self.mime_type)
    }
}

/// Reads a selected file into an [`EncodedImage`].
///
/// Files whose declared type is not `image/*` are ignored: the result is
/// `Ok(None)` and nothing is read. A read failure is returned as
/// [`SwapError::Io`](crate::SwapError::Io) and the caller should leave
/// its image slot unset.
pub async fn acquire(file: &SelectedFile) -> Result<Option<EncodedImage>> {
    if !file.is_image() {
        tracing::debug!(
            path = %file.path.display(),
            mime_type = %file.mime_type,
            "ignoring non-image file"
        );
        return Ok(None);
    }

    let bytes = tokio::fs::read(&file.path).await?;
    let image = EncodedImage::from_bytes(file.mime_type.clone(), &bytes)?;

    tracing::debug!(
        path = %file.path.display(),
        mime_type = %file.mime_type,
        bytes = bytes.len(),
        "acquired image"
    );

    Ok(Some(image))
}
