//! The interactive session: state machine, controller and result view.

mod controller;
mod view;

pub use controller::{Controller, Phase, SessionState, TriggerRejected, MISSING_INPUT_MESSAGE};
pub use view::{render, Download, View, DEFAULT_FILE_STEM};
