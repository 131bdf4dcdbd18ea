//! Session state machine and the controller that drives it.

use crate::edit::{failure_message, request_edit, EditModel, EditOutcome, EditRequest};
use crate::image::EncodedImage;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shown when generation is triggered with missing input.
pub const MISSING_INPUT_MESSAGE: &str = "Please fill in all fields.";

/// Why a trigger did not start a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TriggerRejected {
    /// Poster, product or label is missing.
    #[error("Please fill in all fields.")]
    MissingInput,
    /// A request is already outstanding.
    #[error("a request is already in progress")]
    AlreadyPending,
}

/// Where the session is in its request lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// One request is outstanding.
    Pending {
        /// Poster the request was made from.
        original: EncodedImage,
    },
    /// The last request resolved.
    Finished {
        /// Poster the request was made from.
        original: EncodedImage,
        /// What the request produced.
        outcome: EditOutcome,
    },
}

/// The controller's working set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    poster: Option<EncodedImage>,
    product: Option<EncodedImage>,
    target_label: String,
    phase: Phase,
    notice: Option<TriggerRejected>,
}

impl SessionState {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or clears the poster image.
    pub fn set_poster(&mut self, image: Option<EncodedImage>) {
        self.poster = image;
    }

    /// Sets or clears the product image.
    pub fn set_product(&mut self, image: Option<EncodedImage>) {
        self.product = image;
    }

    /// Sets the label of the object to replace.
    pub fn set_target_label(&mut self, label: impl Into<String>) {
        self.target_label = label.into();
    }

    /// Returns the poster image, if set.
    pub fn poster(&self) -> Option<&EncodedImage> {
        self.poster.as_ref()
    }

    /// Returns the product image, if set.
    pub fn product(&self) -> Option<&EncodedImage> {
        self.product.as_ref()
    }

    /// Returns the current label text.
    pub fn target_label(&self) -> &str {
        &self.target_label
    }

    /// Returns the request phase.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Returns the validation notice from the last rejected trigger.
    pub fn notice(&self) -> Option<TriggerRejected> {
        self.notice
    }

    /// Returns true while a request is outstanding.
    pub fn is_pending(&self) -> bool {
        matches!(self.phase, Phase::Pending { .. })
    }

    /// Returns true if a trigger would start a request right now.
    pub fn can_generate(&self) -> bool {
        !self.is_pending()
            && self.poster.is_some()
            && self.product.is_some()
            && !self.target_label.trim().is_empty()
    }

    /// Starts a request, moving to `Pending`.
    ///
    /// While pending, the state is left untouched. With missing input the
    /// phase is kept and the validation notice is set.
    pub fn begin(&mut self) -> Result<EditRequest, TriggerRejected> {
        if self.is_pending() {
            return Err(TriggerRejected::AlreadyPending);
        }

        let request = match (&self.poster, &self.product) {
            (Some(poster), Some(product)) => {
                EditRequest::new(poster.clone(), product.clone(), self.target_label.clone())
            }
            _ => None,
        };
        let Some(request) = request else {
            tracing::debug!("generation triggered with missing input");
            self.notice = Some(TriggerRejected::MissingInput);
            return Err(TriggerRejected::MissingInput);
        };

        self.notice = None;
        self.phase = Phase::Pending {
            original: request.poster().clone(),
        };
        Ok(request)
    }

    /// Applies the outcome of the outstanding request.
    pub fn resolve(&mut self, outcome: EditOutcome) {
        match std::mem::take(&mut self.phase) {
            Phase::Pending { original } => {
                self.phase = Phase::Finished { original, outcome };
            }
            other => {
                tracing::warn!("outcome arrived with no request pending, ignoring");
                self.phase = other;
            }
        }
    }
}

/// Owns a session and the model it sends requests to.
///
/// Shareable across tasks; at most one request is in flight at a time.
pub struct Controller {
    model: Arc<dyn EditModel>,
    state: Mutex<SessionState>,
}

impl Controller {
    /// Creates a controller with an empty session.
    pub fn new(model: Arc<dyn EditModel>) -> Self {
        Self {
            model,
            state: Mutex::new(SessionState::new()),
        }
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    /// Sets or clears the poster image.
    pub fn set_poster(&self, image: Option<EncodedImage>) {
        self.lock().set_poster(image);
    }

    /// Sets or clears the product image.
    pub fn set_product(&self, image: Option<EncodedImage>) {
        self.lock().set_product(image);
    }

    /// Sets the label of the object to replace.
    pub fn set_target_label(&self, label: impl Into<String>) {
        self.lock().set_target_label(label);
    }

    /// Runs one generation to completion.
    ///
    /// Returns the rejection if the request could not start. Once started,
    /// the session always leaves `Pending`, even if this future is dropped
    /// or the model panics.
    pub async fn generate(&self) -> Result<(), TriggerRejected> {
        let request = self.lock().begin()?;

        let mut guard = ResolveOnDrop {
            state: &self.state,
            provider: self.model.name(),
            outcome: None,
        };
        guard.outcome = Some(request_edit(self.model.as_ref(), &request).await);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolves the pending request when dropped.
struct ResolveOnDrop<'a> {
    state: &'a Mutex<SessionState>,
    provider: &'a str,
    outcome: Option<EditOutcome>,
}

impl Drop for ResolveOnDrop<'_> {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or_else(|| {
            tracing::error!(provider = self.provider, "edit request abandoned before completion");
            EditOutcome::Failure(failure_message(self.provider))
        });
        lock(self.state).resolve(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::wire::{GenerateContentRequest, GenerateContentResponse, Part};
    use crate::edit::NO_EDIT_MESSAGE;
    use crate::error::{Result, SwapError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUg==";

    fn image() -> EncodedImage {
        EncodedImage::new("image/png", PNG_B64).unwrap()
    }

    fn ready_state() -> SessionState {
        let mut state = SessionState::new();
        state.set_poster(Some(image()));
        state.set_product(Some(image()));
        state.set_target_label("bottle");
        state
    }

    enum Reply {
        Image,
        Text,
        Error,
        Hang,
        Panic,
    }

    struct StubModel {
        reply: Reply,
        calls: AtomicUsize,
        release: Notify,
    }

    impl StubModel {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                release: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl EditModel for StubModel {
        async fn generate_content(
            &self,
            _request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Image => {
                    self.release.notified().await;
                    Ok(GenerateContentResponse::from_parts(vec![Part::inline(
                        "image/png",
                        PNG_B64,
                    )]))
                }
                Reply::Text => Ok(GenerateContentResponse::from_parts(vec![Part::text(
                    "cannot help",
                )])),
                Reply::Error => Err(SwapError::Auth("bad key".into())),
                Reply::Hang => std::future::pending().await,
                Reply::Panic => panic!("model exploded"),
            }
        }

        fn name(&self) -> &str {
            "Gemini"
        }
    }

    fn ready_controller(model: &Arc<StubModel>) -> Controller {
        let controller = Controller::new(model.clone());
        controller.set_poster(Some(image()));
        controller.set_product(Some(image()));
        controller.set_target_label("bottle");
        controller
    }

    #[test]
    fn test_begin_requires_all_inputs() {
        let mut state = SessionState::new();
        assert_eq!(state.begin(), Err(TriggerRejected::MissingInput));
        assert_eq!(state.phase(), &Phase::Idle);
        assert_eq!(state.notice(), Some(TriggerRejected::MissingInput));

        state.set_poster(Some(image()));
        state.set_product(Some(image()));
        state.set_target_label("   ");
        assert!(!state.can_generate());
        assert_eq!(state.begin(), Err(TriggerRejected::MissingInput));
        assert_eq!(state.phase(), &Phase::Idle);

        state.set_target_label("bottle");
        assert!(state.can_generate());
        let request = state.begin().unwrap();
        assert_eq!(request.target_label(), "bottle");
        assert!(state.is_pending());
        assert_eq!(state.notice(), None);
    }

    #[test]
    fn test_begin_while_pending_is_rejected() {
        let mut state = ready_state();
        state.begin().unwrap();
        let before = state.clone();

        assert_eq!(state.begin(), Err(TriggerRejected::AlreadyPending));
        assert_eq!(state, before);
    }

    #[test]
    fn test_resolve_moves_pending_to_finished() {
        let mut state = ready_state();
        state.begin().unwrap();
        state.resolve(EditOutcome::NoEditProduced);

        assert_eq!(
            state.phase(),
            &Phase::Finished {
                original: image(),
                outcome: EditOutcome::NoEditProduced,
            }
        );
    }

    #[test]
    fn test_resolve_without_pending_is_ignored() {
        let mut state = ready_state();
        state.resolve(EditOutcome::NoEditProduced);
        assert_eq!(state.phase(), &Phase::Idle);
    }

    #[test]
    fn test_input_edits_keep_outcome() {
        let mut state = ready_state();
        state.begin().unwrap();
        state.resolve(EditOutcome::Success(image()));

        state.set_target_label("can");
        state.set_product(None);
        assert!(matches!(state.phase(), Phase::Finished { .. }));
    }

    #[tokio::test]
    async fn test_generate_with_missing_input_dispatches_nothing() {
        let model = StubModel::new(Reply::Text);
        let controller = Controller::new(model.clone());
        controller.set_poster(Some(image()));

        assert_eq!(
            controller.generate().await,
            Err(TriggerRejected::MissingInput)
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert_eq!(controller.snapshot().phase(), &Phase::Idle);
    }

    #[tokio::test]
    async fn test_second_trigger_while_pending_is_ignored() {
        let model = StubModel::new(Reply::Image);
        let controller = Arc::new(ready_controller(&model));

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.generate().await }
        });
        while !controller.snapshot().is_pending() {
            tokio::task::yield_now().await;
        }

        assert_eq!(
            controller.generate().await,
            Err(TriggerRejected::AlreadyPending)
        );

        model.release.notify_one();
        first.await.unwrap().unwrap();

        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        match controller.snapshot().phase() {
            Phase::Finished { outcome, .. } => {
                assert_eq!(outcome, &EditOutcome::Success(image()));
            }
            other => panic!("unexpected phase: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_maps_no_image_and_errors() {
        let model = StubModel::new(Reply::Text);
        let controller = ready_controller(&model);
        controller.generate().await.unwrap();
        match controller.snapshot().phase() {
            Phase::Finished { outcome, .. } => {
                assert_eq!(outcome.message(), Some(NO_EDIT_MESSAGE));
            }
            other => panic!("unexpected phase: {other:?}"),
        }

        let model = StubModel::new(Reply::Error);
        let controller = ready_controller(&model);
        controller.generate().await.unwrap();
        match controller.snapshot().phase() {
            Phase::Finished { outcome, .. } => assert_eq!(
                outcome,
                &EditOutcome::Failure("Failed to process image with Gemini API".into())
            ),
            other => panic!("unexpected phase: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropped_request_does_not_stay_pending() {
        let model = StubModel::new(Reply::Hang);
        let controller = ready_controller(&model);

        let timed_out = tokio::time::timeout(Duration::from_millis(20), controller.generate()).await;
        assert!(timed_out.is_err());

        let state = controller.snapshot();
        assert!(!state.is_pending());
        assert!(matches!(
            state.phase(),
            Phase::Finished {
                outcome: EditOutcome::Failure(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_panicking_model_does_not_stay_pending() {
        let model = StubModel::new(Reply::Panic);
        let controller = Arc::new(ready_controller(&model));

        let handle = tokio::spawn({
            let controller = controller.clone();
            async move { controller.generate().await }
        });
        assert!(handle.await.unwrap_err().is_panic());

        assert!(!controller.snapshot().is_pending());
        // A fresh trigger is accepted again.
        assert!(controller.snapshot().can_generate());
    }
}
