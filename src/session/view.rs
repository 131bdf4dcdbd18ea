//! What to show for a given session state, and saving the result.

use crate::edit::EditOutcome;
use crate::error::Result;
use crate::image::{EncodedImage, ImageFormat};
use crate::session::controller::{Phase, SessionState};
use std::path::{Path, PathBuf};

/// File name stem for saved results.
pub const DEFAULT_FILE_STEM: &str = "brand-swap-result";

/// The result panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Nothing generated yet.
    Placeholder,
    /// A request is running.
    Progress,
    /// Validation or request error text.
    Error(String),
    /// Original poster next to the edited image.
    Comparison {
        /// Poster the edit was made from.
        original: EncodedImage,
        /// Edited image returned by the model.
        edited: EncodedImage,
    },
}

impl View {
    /// Returns the save action, available only for a comparison.
    pub fn download(&self) -> Option<Result<Download>> {
        match self {
            Self::Comparison { edited, .. } => Some(Download::of(edited)),
            _ => None,
        }
    }
}

/// Renders the result panel for a state.
///
/// A running request wins, then any error text (validation notice first),
/// then a successful result.
pub fn render(state: &SessionState) -> View {
    if state.is_pending() {
        return View::Progress;
    }
    if let Some(notice) = state.notice() {
        return View::Error(notice.to_string());
    }
    match state.phase() {
        Phase::Finished {
            original,
            outcome: EditOutcome::Success(edited),
        } => View::Comparison {
            original: original.clone(),
            edited: edited.clone(),
        },
        Phase::Finished { outcome, .. } => {
            View::Error(outcome.message().unwrap_or_default().to_string())
        }
        Phase::Idle | Phase::Pending { .. } => View::Placeholder,
    }
}

/// An edited image ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Suggested file name.
    pub file_name: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

impl Download {
    /// Prepares an image for saving.
    ///
    /// The extension follows the image data, falling back to the declared
    /// type and then to PNG.
    pub fn of(image: &EncodedImage) -> Result<Self> {
        let bytes = image.decode()?;
        let format = ImageFormat::from_magic_bytes(&bytes)
            .or_else(|| image.format())
            .unwrap_or_default();
        Ok(Self {
            file_name: format!("{DEFAULT_FILE_STEM}.{}", format.extension()),
            bytes,
        })
    }

    /// Writes the file into `dir` under its suggested name.
    pub fn save_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        self.save_as(&path)?;
        Ok(path)
    }

    /// Writes the file to an explicit path.
    pub fn save_as(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), &self.bytes)?;
        tracing::info!(
            path = %path.as_ref().display(),
            bytes = self.bytes.len(),
            "saved edited image"
        );
        Ok(())
    }
}
