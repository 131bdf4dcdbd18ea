//! Building the product-swap request and interpreting the reply.

use crate::edit::model::EditModel;
use crate::edit::wire::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Modality, Part,
};
use crate::error::{Result, SwapError};
use crate::image::{is_image_mime_type, EncodedImage};
use std::time::Instant;

/// Shown when the model answered without producing an image.
pub const NO_EDIT_MESSAGE: &str =
    "The model could not edit the image. Please try a different image or product.";

/// Everything needed for one swap: poster, product and the label of the
/// object to replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    poster: EncodedImage,
    product: EncodedImage,
    target_label: String,
}

impl EditRequest {
    /// Creates a request. Returns `None` if the label is blank.
    pub fn new(
        poster: EncodedImage,
        product: EncodedImage,
        target_label: impl Into<String>,
    ) -> Option<Self> {
        let target_label = target_label.into();
        if target_label.trim().is_empty() {
            return None;
        }
        Some(Self {
            poster,
            product,
            target_label,
        })
    }

    /// Returns the poster image.
    pub fn poster(&self) -> &EncodedImage {
        &self.poster
    }

    /// Returns the product image.
    pub fn product(&self) -> &EncodedImage {
        &self.product
    }

    /// Returns the label of the object to replace.
    pub fn target_label(&self) -> &str {
        &self.target_label
    }
}

/// Result of one edit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The model returned an edited image.
    Success(EncodedImage),
    /// The model answered but produced no image.
    NoEditProduced,
    /// The call failed; carries the user-facing message.
    Failure(String),
}

impl EditOutcome {
    /// Returns the message to show the user, if this is not a success.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::NoEditProduced => Some(NO_EDIT_MESSAGE),
            Self::Failure(message) => Some(message.as_str()),
        }
    }
}

/// The uniform failure message for a provider.
pub fn failure_message(provider: &str) -> String {
    format!("Failed to process image with {provider} API")
}

/// The product placement instruction sent alongside the two images.
pub fn instruction(target_label: &str) -> String {
    format!(
        r#"You are a photorealistic product placement expert AI. Your primary function is to seamlessly replace a product within a given image (the "poster") with a new product image.

You will receive two images and one text instruction:
1.  **Poster Image:** The main image where the product replacement will occur. This is the first image provided.
2.  **New Product Image:** The image of the product that will be placed into the poster. This image might have a background that needs to be removed. This is the second image provided.
3.  **Product to Replace:** "{target_label}"

**Your task is to follow these steps precisely:**
1.  **Identify:** Carefully locate the object described as "{target_label}" within the Poster Image.
2.  **Remove:** Neatly remove the original product from the scene.
3.  **Integrate:** Place the New Product Image into the position of the removed product. This is the most critical step. The new product must look completely natural and photorealistic in the poster.
    *   **Perspective and Scale:** Match the exact perspective, angle, and scale of the original object's placement.
    *   **Lighting and Shadows:** Replicate the lighting of the original scene. The new product must cast realistic shadows that match the direction, softness, and color of other shadows in the image. It must also receive light and reflections from the environment correctly.
    *   **Color, Tone, and Texture Matching:** Adjust the colors, saturation, brightness, and contrast of the new product to perfectly match the overall color grading, tone, and atmosphere of the poster. The texture of the product should be rendered consistently with the lighting and photographic style of the poster (e.g., film grain, sharpness, glossiness).
    *   **Interaction:** If the original product was held by someone or was interacting with a surface (e.g., sitting on a table, partially submerged in water, partially hidden behind another object), the new product must have the same interaction in a believable way.

**Output requirements:**
- **CRITICAL:** Your output MUST be ONLY the final edited image.
- DO NOT output any text, explanation, or confirmation. Your entire response must be a single image part."#
    )
}

/// Builds the request payload: poster, product, instruction, in that order.
pub fn build_payload(request: &EditRequest) -> GenerateContentRequest {
    let image_part = |image: &EncodedImage| Part::inline(image.mime_type(), image.base64_data());

    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                image_part(&request.poster),
                image_part(&request.product),
                Part::text(instruction(&request.target_label)),
            ],
            role: None,
        }],
        generation_config: GenerationConfig {
            response_modalities: vec![Modality::Image, Modality::Text],
        },
    }
}

/// Extracts the first inline image from the first candidate.
///
/// `Ok(None)` means the model declined or produced no image. Inline parts
/// of other types are skipped; an `image/*` part with a bad payload is a
/// malformed response.
pub fn decode_response(response: GenerateContentResponse) -> Result<Option<EncodedImage>> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        tracing::warn!(block_reason = reason, "prompt was blocked by the model");
        return Ok(None);
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        tracing::warn!("model response contained no candidates");
        return Ok(None);
    };

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    for part in parts {
        if let Some(inline) = part.inline_data {
            if !is_image_mime_type(&inline.mime_type) {
                tracing::debug!(
                    mime_type = %inline.mime_type,
                    "ignoring non-image inline part in model response"
                );
                continue;
            }
            return EncodedImage::new(inline.mime_type, inline.data)
                .map(Some)
                .map_err(|e| SwapError::UnexpectedResponse(format!("bad inline image: {e}")));
        }
        if let Some(text) = part.text {
            tracing::debug!(text = %text, "ignoring text part in model response");
        }
    }

    tracing::warn!(
        finish_reason = candidate.finish_reason.as_deref().unwrap_or("none"),
        "no image part found in model response"
    );
    Ok(None)
}

/// Runs one swap against the model and maps every result to an outcome.
///
/// Errors never escape: they pass through [`into_failure`], which logs the
/// detail and returns the uniform failure message.
pub async fn request_edit<M>(model: &M, request: &EditRequest) -> EditOutcome
where
    M: EditModel + ?Sized,
{
    let start = Instant::now();
    let payload = build_payload(request);

    let result = model
        .generate_content(&payload)
        .await
        .and_then(decode_response);

    let duration_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(Some(image)) => {
            tracing::info!(
                provider = model.name(),
                mime_type = image.mime_type(),
                duration_ms,
                "edit produced an image"
            );
            EditOutcome::Success(image)
        }
        Ok(None) => {
            tracing::warn!(provider = model.name(), duration_ms, "edit produced no image");
            EditOutcome::NoEditProduced
        }
        Err(e) => into_failure(model.name(), e),
    }
}

/// The single place errors turn into what the user sees.
///
/// Full detail goes to the log; the outcome only carries the fixed message.
pub fn into_failure(provider: &str, error: SwapError) -> EditOutcome {
    tracing::error!(provider, error = %error, "error calling {provider} API");
    EditOutcome::Failure(failure_message(provider))
}
