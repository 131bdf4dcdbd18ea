//! Image acquisition and encoded image types.

mod acquire;
mod types;

pub use acquire::{acquire, SelectedFile};
pub use types::{is_image_mime_type, EncodedImage, ImageFormat};
