//! Core image types.

use crate::error::{Result, SwapError};
use base64::Engine;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Attempts to detect format from a MIME type.
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        match mime_type.to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// An image held in memory as its MIME type plus base64 payload.
///
/// This is the form images travel in between acquisition, the model
/// request and the result view. Construction guarantees the MIME type
/// starts with `image/` and the payload is non-empty, valid base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    mime_type: String,
    base64_data: String,
}

impl EncodedImage {
    /// Creates an encoded image from a MIME type and base64 payload.
    pub fn new(mime_type: impl Into<String>, base64_data: impl Into<String>) -> Result<Self> {
        let mime_type = mime_type.into();
        let base64_data = base64_data.into();

        if !is_image_mime_type(&mime_type) {
            return Err(SwapError::InvalidImage(format!(
                "expected an image/* MIME type, got {mime_type:?}"
            )));
        }
        if base64_data.is_empty() {
            return Err(SwapError::InvalidImage("empty image data".into()));
        }
        base64::engine::general_purpose::STANDARD
            .decode(&base64_data)
            .map_err(|e| SwapError::Decode(e.to_string()))?;

        Ok(Self {
            mime_type,
            base64_data,
        })
    }

    /// Encodes raw image bytes under the given MIME type.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        Self::new(
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(bytes),
        )
    }

    /// Parses a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let malformed = || SwapError::InvalidImage("malformed data URL".into());

        let rest = url.strip_prefix("data:").ok_or_else(malformed)?;
        let (header, payload) = rest.split_once(',').ok_or_else(malformed)?;
        let mime_type = header.strip_suffix(";base64").ok_or_else(malformed)?;

        Self::new(mime_type, payload)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data)
    }

    /// Returns the declared MIME type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the base64 payload.
    pub fn base64_data(&self) -> &str {
        &self.base64_data
    }

    /// Decodes the payload back into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.base64_data)
            .map_err(|e| SwapError::Decode(e.to_string()))
    }

    /// Returns the known format for the declared MIME type, if any.
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime_type(&self.mime_type)
    }
}

/// Returns true if the MIME type names an image (`image/...`).
pub fn is_image_mime_type(mime_type: &str) -> bool {
    mime_type
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"short"), None);
    }

    #[test]
    fn test_format_from_extension_and_mime() {
        assert_eq!(ImageFormat::from_extension("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("txt"), None);
        assert_eq!(
            ImageFormat::from_mime_type("image/webp"),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_mime_type("image/gif"), None);
    }

    #[test]
    fn test_is_image_mime_type() {
        assert!(is_image_mime_type("image/png"));
        assert!(is_image_mime_type("Image/HEIC"));
        assert!(!is_image_mime_type("text/plain"));
        assert!(!is_image_mime_type("image"));
        assert!(!is_image_mime_type(""));
    }

    #[test]
    fn test_encoded_image_rejects_non_image_mime() {
        let err = EncodedImage::new("application/pdf", "AAAA").unwrap_err();
        assert!(matches!(err, SwapError::InvalidImage(_)));
    }

    #[test]
    fn test_encoded_image_rejects_empty_and_bad_payload() {
        assert!(matches!(
            EncodedImage::new("image/png", "").unwrap_err(),
            SwapError::InvalidImage(_)
        ));
        assert!(matches!(
            EncodedImage::new("image/png", "not base64!").unwrap_err(),
            SwapError::Decode(_)
        ));
    }

    #[test]
    fn test_from_bytes_decodes_to_same_bytes() {
        let image = EncodedImage::from_bytes("image/png", &PNG_MAGIC).unwrap();
        assert_eq!(image.decode().unwrap(), PNG_MAGIC.to_vec());
        assert_eq!(image.format(), Some(ImageFormat::Png));
    }

    #[test]
    fn test_data_url_parsing() {
        let image = EncodedImage::from_data_url("data:image/jpeg;base64,/9j/4A==").unwrap();
        assert_eq!(image.mime_type(), "image/jpeg");
        assert_eq!(image.base64_data(), "/9j/4A==");
        assert_eq!(image.to_data_url(), "data:image/jpeg;base64,/9j/4A==");
    }

    #[test]
    fn test_data_url_rejects_malformed_input() {
        for url in [
            "image/png;base64,AAAA",
            "data:image/png,AAAA",
            "data:image/png;base64",
            "data:text/plain;base64,AAAA",
        ] {
            assert!(EncodedImage::from_data_url(url).is_err(), "{url}");
        }
    }
}
