//! The model seam: anything that can answer a `generateContent` request.

use crate::edit::wire::{GenerateContentRequest, GenerateContentResponse};
use crate::error::Result;
use async_trait::async_trait;

/// Trait for image-editing model backends.
///
/// Implementations perform one round trip and report transport,
/// authentication and parse problems as errors. Interpreting the
/// response is left to [`request_edit`](crate::edit::request_edit).
#[async_trait]
pub trait EditModel: Send + Sync {
    /// Sends the request and returns the parsed response.
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;

    /// Returns the provider name used in user-facing messages.
    fn name(&self) -> &str;
}
