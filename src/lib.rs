#![warn(missing_docs)]
//! productswap - Swap a product in a poster for your own product image.
//!
//! Give it a poster, a product photo and the name of the object in the
//! poster to replace. A hosted image-editing model (Gemini) removes that
//! object and composites your product in its place.
//!
//! # Quick Start
//!
//! ```no_run
//! use productswap::{acquire, Controller, GeminiEditor, SelectedFile, View};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> productswap::Result<()> {
//!     let editor = GeminiEditor::builder().build()?;
//!     let controller = Controller::new(Arc::new(editor));
//!
//!     controller.set_poster(acquire(&SelectedFile::from_path("poster.jpg")).await?);
//!     controller.set_product(acquire(&SelectedFile::from_path("can.png")).await?);
//!     controller.set_target_label("soda can");
//!
//!     if controller.generate().await.is_ok() {
//!         if let View::Comparison { edited, .. } = productswap::render(&controller.snapshot()) {
//!             productswap::Download::of(&edited)?.save_in(".")?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Layout
//!
//! - [`image`]: reading user files into [`EncodedImage`]s
//! - [`edit`]: the model request, the [`EditModel`] seam and the Gemini backend
//! - [`session`]: the request state machine and the result view
//!
//! # Features
//!
//! - `cli` (default): the `productswap` command-line tool

mod config;
mod error;
pub mod edit;
pub mod image;
pub mod session;

pub use config::{Config, API_KEY_ENV, BASE_URL_ENV, GOOGLE_API_KEY_ENV, MODEL_ENV};
pub use error::{Result, SwapError};

pub use edit::{
    request_edit, EditModel, EditOutcome, EditRequest, GeminiEditor, GeminiEditorBuilder,
    GeminiModel,
};
pub use image::{acquire, EncodedImage, ImageFormat, SelectedFile};
pub use session::{render, Controller, Download, Phase, SessionState, TriggerRejected, View};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::edit::{EditModel, EditOutcome, GeminiEditor};
    pub use crate::error::{Result, SwapError};
    pub use crate::image::{acquire, EncodedImage, SelectedFile};
    pub use crate::session::{render, Controller, Download, View};
}
