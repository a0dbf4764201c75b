#![warn(missing_docs)]
//! # smart-leaf-ui
//!
//! ## Purpose
//! Defines the prediction screen as an explicit finite-state machine.
//!
//! ## Responsibilities
//! - Hold the per-visit [`ScreenState`] and the selected image.
//! - Guarantee at most one submission in flight per screen.
//! - Discard completions that arrive after the screen was invalidated.
//! - Translate failures into one user-visible [`Notice`].
//! - Project the state into a render-ready [`ScreenView`].
//!
//! ## Data flow
//! Acquisition outcome -> [`PredictionScreen::apply_acquisition`];
//! submit button -> [`PredictionScreen::begin_submission`] -> transport ->
//! [`PredictionScreen::finish_submission`]; logout ->
//! [`PredictionScreen::invalidate`].
//!
//! ## Ownership and lifetimes
//! The screen owns its image and result. Submissions receive a clone of the
//! image together with a [`SubmissionTicket`] so the transport call never
//! borrows screen state.
//!
//! ## Error model
//! Rejected transitions return [`ScreenError`]; submission failures are
//! stored as state (`Failed`), never propagated.

use std::sync::atomic::{AtomicU64, Ordering};

use smart_leaf_capture::{AcquisitionOutcome, ImageSourceKind};
use smart_leaf_core::{
    DEFAULT_RANK_LIMIT, InferenceResult, RankedEntry, SelectedImage, display_label,
    format_confidence, rank,
};
use smart_leaf_upload::SubmitError;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Prediction screen states.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenState {
    /// No image selected.
    Idle,
    /// Image chosen, nothing submitted yet.
    ImageSelected,
    /// Submission in flight.
    Uploading,
    /// Last submission succeeded.
    ResultReady(InferenceResult),
    /// Last submission failed.
    Failed(SubmitError),
}

/// Blocking or dismissible message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Dialog title.
    pub title: String,
    /// Dialog body.
    pub message: String,
}

impl Notice {
    fn new(title: &str, message: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            message: message.into(),
        }
    }

    /// Camera or library permission missing.
    pub fn permission_denied() -> Self {
        Self::new(
            "Permissions required",
            "This app needs permission to access your camera and photo library.",
        )
    }

    /// Picker could not be opened.
    pub fn acquisition_failed(source: ImageSourceKind) -> Self {
        match source {
            ImageSourceKind::Camera => Self::new("Error", "Could not open camera."),
            ImageSourceKind::Library => Self::new("Error", "Could not open image picker."),
        }
    }

    /// Submit pressed with nothing selected.
    pub fn no_image() -> Self {
        Self::new("No image", "Please pick an image first.")
    }

    /// Submission failed.
    pub fn upload_failed(error: &SubmitError) -> Self {
        let message = match error {
            SubmitError::Server { message, .. } => message.clone(),
            SubmitError::Network(reason) => format!("Network error: {reason}"),
            SubmitError::MalformedResponse(_) => {
                "The server returned an unexpected response.".to_string()
            }
            SubmitError::NoImage => "Please pick an image first.".to_string(),
            SubmitError::ImageUnreadable(_) => "The selected image could not be read.".to_string(),
            SubmitError::InvalidEndpoint(_) => error.to_string(),
        };
        Self::new("Upload failed", message)
    }
}

/// Ticket ids are unique across every screen in the process, so an outcome
/// from an invalidated visit can never match a later visit's ticket.
static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Proof that a submission was started; required to apply its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTicket {
    id: u64,
}

/// What happened to a submission outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Outcome became the screen state.
    Applied,
    /// Ticket was stale (screen invalidated); outcome dropped.
    Discarded,
}

/// One rendered row of the ranked list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRow {
    /// 1-based rank.
    pub rank: usize,
    /// Label with underscores rendered as spaces.
    pub label: String,
    /// Confidence with four decimals and `%`.
    pub confidence: String,
}

/// Rendered result card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    /// Headline label.
    pub headline: String,
    /// Headline confidence.
    pub confidence: String,
    /// Top ranked rows.
    pub top: Vec<RankedRow>,
}

/// Render-ready snapshot of the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenView {
    /// Short status line.
    pub status: String,
    /// Whether an image preview is shown.
    pub has_image: bool,
    /// Whether the analyze button is enabled.
    pub can_submit: bool,
    /// Whether the progress indicator is shown.
    pub loading: bool,
    /// Result card, when a result is ready.
    pub result: Option<ResultView>,
}

/// Prediction screen state machine.
#[derive(Debug, Clone)]
pub struct PredictionScreen {
    state: ScreenState,
    image: Option<SelectedImage>,
    in_flight: Option<u64>,
    notice: Option<Notice>,
}

impl PredictionScreen {
    /// Creates a screen in `Idle`.
    pub fn new() -> Self {
        Self {
            state: ScreenState::Idle,
            image: None,
            in_flight: None,
            notice: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    /// Currently selected image.
    pub fn image(&self) -> Option<&SelectedImage> {
        self.image.as_ref()
    }

    /// Returns `true` while a submission is in flight.
    pub fn is_uploading(&self) -> bool {
        matches!(self.state, ScreenState::Uploading)
    }

    /// Returns `true` when the submit action is enabled.
    pub fn can_submit(&self) -> bool {
        self.image.is_some() && !self.is_uploading()
    }

    /// Pending notice, if any.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Removes and returns the pending notice (user dismissed it).
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Shows a notice without changing state.
    pub fn raise_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    /// Replaces the image and resets to `ImageSelected`.
    ///
    /// Any previous result or error is discarded.
    ///
    /// # Errors
    /// Returns [`ScreenError::Busy`] while a submission is in flight.
    pub fn select_image(&mut self, image: SelectedImage) -> Result<(), ScreenError> {
        if self.is_uploading() {
            return Err(ScreenError::Busy);
        }

        debug!(stage = "screen", action = "image_selected", file_name = %image.implied_filename);
        self.image = Some(image);
        self.state = ScreenState::ImageSelected;
        Ok(())
    }

    /// Applies an acquisition outcome.
    ///
    /// `Cancelled` changes nothing. `Failed` raises a notice and keeps the
    /// current state.
    ///
    /// # Errors
    /// Returns [`ScreenError::Busy`] when a selection arrives mid-upload.
    pub fn apply_acquisition(&mut self, outcome: AcquisitionOutcome) -> Result<(), ScreenError> {
        match outcome {
            AcquisitionOutcome::Selected(image) => self.select_image(image),
            AcquisitionOutcome::Cancelled => Ok(()),
            AcquisitionOutcome::Failed { source, .. } => {
                self.raise_notice(Notice::acquisition_failed(source));
                Ok(())
            }
        }
    }

    /// Enters `Uploading` and hands out the image to submit.
    ///
    /// # Errors
    /// Returns [`ScreenError::SubmissionInFlight`] when an upload is already
    /// active, and [`ScreenError::NoImage`] (with a notice) when nothing is
    /// selected.
    pub fn begin_submission(&mut self) -> Result<(SubmissionTicket, SelectedImage), ScreenError> {
        if self.is_uploading() {
            warn!(stage = "screen", action = "submit_rejected", reason = "in_flight");
            return Err(ScreenError::SubmissionInFlight);
        }
        let Some(image) = self.image.clone() else {
            self.raise_notice(Notice::no_image());
            return Err(ScreenError::NoImage);
        };

        let ticket = SubmissionTicket {
            id: NEXT_TICKET.fetch_add(1, Ordering::Relaxed),
        };
        self.in_flight = Some(ticket.id);
        self.state = ScreenState::Uploading;
        info!(stage = "screen", action = "uploading", ticket = ticket.id);
        Ok((ticket, image))
    }

    /// Applies a submission outcome if `ticket` is still current.
    pub fn finish_submission(
        &mut self,
        ticket: SubmissionTicket,
        outcome: Result<InferenceResult, SubmitError>,
    ) -> Completion {
        if self.in_flight != Some(ticket.id) {
            info!(stage = "screen", action = "completion_discarded", ticket = ticket.id);
            return Completion::Discarded;
        }

        self.in_flight = None;
        self.state = match outcome {
            Ok(result) => {
                info!(stage = "screen", action = "result_ready", label = %result.top_label());
                ScreenState::ResultReady(result)
            }
            Err(error) => {
                self.raise_notice(Notice::upload_failed(&error));
                ScreenState::Failed(error)
            }
        };
        Completion::Applied
    }

    /// Drops all per-visit state; any in-flight completion becomes stale.
    ///
    /// Used on logout. Not reported as an error.
    pub fn invalidate(&mut self) {
        if self.in_flight.take().is_some() {
            info!(stage = "screen", action = "upload_invalidated");
        }
        self.state = ScreenState::Idle;
        self.image = None;
        self.notice = None;
    }

    /// Ranked entries of the current result, empty otherwise.
    pub fn ranked(&self, limit: usize) -> Vec<RankedEntry> {
        match &self.state {
            ScreenState::ResultReady(result) => rank(result, limit),
            _ => Vec::new(),
        }
    }

    /// Projects the screen into render-ready values.
    pub fn view(&self) -> ScreenView {
        let status = match &self.state {
            ScreenState::Idle => "Take a photo or pick an image".to_string(),
            ScreenState::ImageSelected => "Ready to analyze".to_string(),
            ScreenState::Uploading => "Analyzing image...".to_string(),
            ScreenState::ResultReady(_) => "Prediction ready".to_string(),
            ScreenState::Failed(error) => format!("Analysis failed: {error}"),
        };

        let result = match &self.state {
            ScreenState::ResultReady(result) => Some(ResultView {
                headline: display_label(result.top_label()),
                confidence: format_confidence(result.top_confidence()),
                top: rank(result, DEFAULT_RANK_LIMIT)
                    .into_iter()
                    .map(|entry| RankedRow {
                        rank: entry.rank,
                        label: display_label(&entry.label),
                        confidence: format_confidence(entry.confidence),
                    })
                    .collect(),
            }),
            _ => None,
        };

        ScreenView {
            status,
            has_image: self.image.is_some(),
            can_submit: self.can_submit(),
            loading: self.is_uploading(),
            result,
        }
    }
}

impl Default for PredictionScreen {
    fn default() -> Self {
        Self::new()
    }
}

/// Rejected screen transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScreenError {
    /// A submission is already in flight.
    #[error("a submission is already in progress")]
    SubmissionInFlight,
    /// Submit invoked without a selected image.
    #[error("no image selected")]
    NoImage,
    /// Image selection attempted while uploading.
    #[error("screen is busy uploading")]
    Busy,
}
