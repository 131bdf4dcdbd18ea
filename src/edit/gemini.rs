//! Gemini (Google) image editing backend.

use crate::config::Config;
use crate::edit::model::EditModel;
use crate::edit::wire::{GenerateContentRequest, GenerateContentResponse};
use crate::error::{parse_retry_after, sanitize_error_message, Result, SwapError};
use async_trait::async_trait;
use std::time::Instant;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini image model variants.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeminiModel {
    /// Gemini 2.5 Flash Image preview.
    #[default]
    FlashImagePreview,
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
    /// Any other model id.
    Custom(String),
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &str {
        match self {
            Self::FlashImagePreview => "gemini-2.5-flash-image-preview",
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "gemini-3-pro-image-preview",
            Self::Custom(id) => id.as_str(),
        }
    }

    /// Maps a model id back to a variant, keeping unknown ids as `Custom`.
    pub fn from_id(id: &str) -> Self {
        match id {
            "gemini-2.5-flash-image-preview" => Self::FlashImagePreview,
            "gemini-2.5-flash-image" => Self::NanoBanana,
            "gemini-3-pro-image-preview" => Self::NanoBananaPro,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for [`GeminiEditor`].
#[derive(Debug, Clone, Default)]
pub struct GeminiEditorBuilder {
    api_key: Option<String>,
    model: GeminiModel,
    base_url: Option<String>,
}

impl GeminiEditorBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `API_KEY` / `GOOGLE_API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API root (proxies, test servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the editor, resolving the API key.
    pub fn build(self) -> Result<GeminiEditor> {
        let api_key = match self.api_key {
            Some(key) => key,
            None => Config::api_key_from_env()?,
        };

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(GeminiEditor {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
            base_url,
        })
    }
}

/// Gemini image editing backend.
pub struct GeminiEditor {
    client: reqwest::Client,
    api_key: String,
    model: GeminiModel,
    base_url: String,
}

impl GeminiEditor {
    /// Creates a new `GeminiEditorBuilder`.
    pub fn builder() -> GeminiEditorBuilder {
        GeminiEditorBuilder::new()
    }

    /// Builds an editor from resolved configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Self::builder()
            .api_key(config.api_key.clone())
            .model(config.model.clone());
        if let Some(ref url) = config.base_url {
            builder = builder.base_url(url.clone());
        }
        builder.build()
    }

    /// Returns the model in use.
    pub fn model(&self) -> &GeminiModel {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            self.model.as_str()
        )
    }

    fn parse_error(
        &self,
        status: u16,
        text: &str,
        headers: &reqwest::header::HeaderMap,
    ) -> SwapError {
        let text = sanitize_error_message(text);
        if status == 404 {
            return SwapError::InvalidRequest(format!(
                "Model {} not found. Verify the model name is correct.",
                self.model
            ));
        }
        if status == 429 {
            let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
            return SwapError::RateLimited { retry_after };
        }
        if status == 401 || status == 403 {
            return SwapError::Auth(text);
        }
        let lower = text.to_lowercase();
        if lower.contains("api key not valid") || lower.contains("api_key_invalid") {
            return SwapError::Auth(text);
        }
        if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited") {
            return SwapError::ContentBlocked(text);
        }
        SwapError::Api {
            status,
            message: text,
        }
    }
}

#[async_trait]
impl EditModel for GeminiEditor {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let start = Instant::now();

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text, &headers));
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;

        tracing::debug!(
            model = %self.model,
            candidates = parsed.candidates.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Gemini generateContent complete"
        );

        Ok(parsed)
    }

    fn name(&self) -> &str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    fn editor() -> GeminiEditor {
        GeminiEditorBuilder::new()
            .api_key("test-key")
            .build()
            .unwrap()
    }

    #[test]
    fn test_gemini_model_ids() {
        assert_eq!(
            GeminiModel::default().as_str(),
            "gemini-2.5-flash-image-preview"
        );
        assert_eq!(GeminiModel::NanoBanana.as_str(), "gemini-2.5-flash-image");
        assert_eq!(
            GeminiModel::from_id("gemini-3-pro-image-preview"),
            GeminiModel::NanoBananaPro
        );
        assert_eq!(
            GeminiModel::from_id("my-tuned-model"),
            GeminiModel::Custom("my-tuned-model".into())
        );
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let editor = GeminiEditorBuilder::new()
            .api_key("test-key")
            .model(GeminiModel::NanoBanana)
            .build()
            .unwrap();
        assert_eq!(editor.model(), &GeminiModel::NanoBanana);
        assert_eq!(editor.name(), "Gemini");
    }

    #[test]
    fn test_endpoint_respects_base_url() {
        assert_eq!(
            editor().endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image-preview:generateContent"
        );

        let local = GeminiEditorBuilder::new()
            .api_key("k")
            .base_url("http://127.0.0.1:8080/")
            .model(GeminiModel::NanoBanana)
            .build()
            .unwrap();
        assert_eq!(
            local.endpoint(),
            "http://127.0.0.1:8080/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            api_key: "abc".into(),
            model: GeminiModel::NanoBananaPro,
            base_url: Some("http://localhost:1".into()),
        };
        let editor = GeminiEditor::from_config(&config).unwrap();
        assert_eq!(editor.api_key, "abc");
        assert_eq!(editor.base_url, "http://localhost:1");
    }

    #[test]
    fn test_parse_error_classification() {
        let editor = editor();
        let headers = HeaderMap::new();

        assert!(matches!(
            editor.parse_error(401, "nope", &headers),
            SwapError::Auth(_)
        ));
        assert!(matches!(
            editor.parse_error(400, "API key not valid. Please pass a valid API key.", &headers),
            SwapError::Auth(_)
        ));
        assert!(matches!(
            editor.parse_error(404, "", &headers),
            SwapError::InvalidRequest(_)
        ));
        assert!(matches!(
            editor.parse_error(400, "request blocked by safety settings", &headers),
            SwapError::ContentBlocked(_)
        ));
        assert!(matches!(
            editor.parse_error(500, "boom", &headers),
            SwapError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_parse_error_rate_limit_reads_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));

        match editor().parse_error(429, "slow down", &headers) {
            SwapError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(std::time::Duration::from_secs(12)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
