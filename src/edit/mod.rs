//! The edit request: payload construction, the model call, and decoding.

mod gemini;
mod model;
mod request;
pub mod wire;

pub use gemini::{GeminiEditor, GeminiEditorBuilder, GeminiModel, DEFAULT_BASE_URL};
pub use model::EditModel;
pub use request::{
    build_payload, decode_response, failure_message, instruction, into_failure, request_edit,
    EditOutcome, EditRequest, NO_EDIT_MESSAGE,
};
