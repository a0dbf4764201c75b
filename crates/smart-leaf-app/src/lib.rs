#![warn(missing_docs)]
//! # smart-leaf-app
//!
//! ## Purpose
//! Orchestrates session routing, permissions, acquisition, submission and
//! screen state for `smart-leaf`.
//!
//! ## Responsibilities
//! - Resolve runtime configuration from the environment.
//! - Sequence the prediction flow: permission gate -> acquisition ->
//!   submission -> ranked result.
//! - Route between screens from the session state and cancel in-flight work
//!   on logout.
//! - Provide log-safe redaction helpers.
//!
//! ## Data flow
//! Session provider -> [`AppShell::sync_session`] -> route decision.
//! Prediction screen actions -> [`PredictionFlow`] -> capture/upload crates ->
//! [`smart_leaf_ui::PredictionScreen`].
//!
//! ## Ownership and lifetimes
//! The shell owns one [`PredictionFlow`] per prediction screen visit. The
//! session provider is shared as `Arc<dyn SessionProvider>` and only read
//! here, apart from explicit login/logout calls.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]. Submission failures are
//! not errors at this level: they become `Failed` screen state plus a notice.
//!
//! ## Security and privacy notes
//! - Acquisition is blocked unless the permission gate grants access.
//! - Log redaction helpers strip password/token strings.

use std::sync::Arc;

use smart_leaf_auth::{AuthError, Route, RouteDecision, SessionProvider, SessionRouter};
use smart_leaf_capture::{ImageAcquirer, PermissionGate, PermissionOutcome};
use smart_leaf_core::{CoreError, Endpoints, InferenceResult, SelectedImage};
use smart_leaf_ui::{Completion, Notice, PredictionScreen, ScreenError, SubmissionTicket};
use smart_leaf_upload::{DEFAULT_TIMEOUT_MS, InferenceClient, SubmitError};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("SMART_LEAF_VERSION");

/// Env var holding the backend base URL.
pub const ENV_API_BASE_URL: &str = "SMART_LEAF_API_BASE_URL";

/// Env var holding the HTTP timeout in milliseconds.
pub const ENV_HTTP_TIMEOUT_MS: &str = "SMART_LEAF_HTTP_TIMEOUT_MS";

/// Base URL used when [`ENV_API_BASE_URL`] is unset.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Runtime configuration resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Backend endpoint table.
    pub endpoints: Endpoints,
    /// HTTP timeout for auth and inference requests.
    pub http_timeout_ms: u64,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for an unusable base URL and
    /// [`AppError::InvalidTimeout`] for a bad timeout.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps env keys to values.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for an unusable base URL and
    /// [`AppError::InvalidTimeout`] for a bad timeout.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_API_BASE_URL)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let endpoints = Endpoints::from_base_url(&base_url).map_err(AppError::Config)?;

        let http_timeout_ms = match lookup(ENV_HTTP_TIMEOUT_MS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| AppError::InvalidTimeout(raw.clone()))?,
            None => DEFAULT_TIMEOUT_MS,
        };

        if !is_https_endpoint(endpoints.base_url()) {
            warn!(
                stage = "config",
                action = "plaintext_transport",
                base_url = %endpoints.base_url(),
                "backend is reached over http"
            );
        }

        Ok(Self {
            endpoints,
            http_timeout_ms,
        })
    }
}

/// Returns `true` when endpoint URL is HTTPS.
pub fn is_https_endpoint(endpoint: &str) -> bool {
    Url::parse(endpoint)
        .map(|url| url.scheme() == "https")
        .unwrap_or(false)
}

/// Redacts common secret markers in log-safe output.
///
/// Each `key=value` (or `key: value`) pair loses its value up to the next
/// `;`, `,`, `&` or line break. Text around the pair is kept.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for key in ["password", "secret", "token", "authorization"] {
        redacted = redact_key_value(&redacted, key);
    }
    redacted
}

fn redact_key_value(input: &str, key: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut output = String::with_capacity(input.len());
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find(key) {
        let key_end = cursor + found + key.len();
        let rest = &input[key_end..];
        let value_start = key_end + rest.len() - rest.trim_start_matches(['=', ':', ' ', '"']).len();
        let value_end = input[value_start..]
            .find([';', ',', '&', '\n'])
            .map_or(input.len(), |offset| value_start + offset);

        output.push_str(&input[cursor..key_end]);
        output.push_str("=<redacted>");
        cursor = value_end;
    }

    output.push_str(&input[cursor..]);
    output
}

/// A submission that has entered `Uploading` but not completed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    ticket: SubmissionTicket,
    image: SelectedImage,
}

impl PendingSubmission {
    /// Image being submitted.
    pub fn image(&self) -> &SelectedImage {
        &self.image
    }
}

/// Sequences one prediction screen visit.
pub struct PredictionFlow {
    gate: PermissionGate,
    acquirer: ImageAcquirer,
    client: InferenceClient,
    permission: Option<PermissionOutcome>,
    screen: PredictionScreen,
}

impl PredictionFlow {
    /// Creates a flow with a fresh `Idle` screen.
    pub fn new(gate: PermissionGate, acquirer: ImageAcquirer, client: InferenceClient) -> Self {
        Self {
            gate,
            acquirer,
            client,
            permission: None,
            screen: PredictionScreen::new(),
        }
    }

    /// Screen state machine of this visit.
    pub fn screen(&self) -> &PredictionScreen {
        &self.screen
    }

    /// Mutable access for notice dismissal.
    pub fn screen_mut(&mut self) -> &mut PredictionScreen {
        &mut self.screen
    }

    /// Runs the permission gate once for this visit.
    ///
    /// A denial raises the blocking permission notice. Later calls reuse the
    /// first outcome; the user re-grants outside the app and reopens the
    /// screen.
    pub fn prepare(&mut self) -> PermissionOutcome {
        if let Some(outcome) = self.permission {
            return outcome;
        }

        let outcome = self.gate.check_and_request();
        if outcome == PermissionOutcome::Denied {
            self.screen.raise_notice(Notice::permission_denied());
        }
        self.permission = Some(outcome);
        outcome
    }

    /// Captures a photo with the camera.
    ///
    /// # Errors
    /// Returns [`AppError::PermissionDenied`] when the gate denied access and
    /// [`AppError::Screen`] when an upload is in flight.
    pub fn take_photo(&mut self) -> Result<(), AppError> {
        self.ensure_ready_to_acquire()?;
        let outcome = self.acquirer.capture_from_device();
        self.screen.apply_acquisition(outcome).map_err(AppError::Screen)
    }

    /// Picks an image from the library.
    ///
    /// # Errors
    /// Same conditions as [`PredictionFlow::take_photo`].
    pub fn pick_image(&mut self) -> Result<(), AppError> {
        self.ensure_ready_to_acquire()?;
        let outcome = self.acquirer.pick_from_library();
        self.screen.apply_acquisition(outcome).map_err(AppError::Screen)
    }

    fn ensure_ready_to_acquire(&mut self) -> Result<(), AppError> {
        if self.prepare() == PermissionOutcome::Denied {
            self.screen.raise_notice(Notice::permission_denied());
            return Err(AppError::PermissionDenied);
        }
        if self.screen.is_uploading() {
            return Err(AppError::Screen(ScreenError::Busy));
        }
        Ok(())
    }

    /// Moves the screen to `Uploading` and returns the pending submission.
    ///
    /// # Errors
    /// Returns [`AppError::Screen`] when an upload is already in flight or no
    /// image is selected. No network request is made in either case.
    pub fn begin_submission(&mut self) -> Result<PendingSubmission, AppError> {
        let (ticket, image) = self.screen.begin_submission().map_err(AppError::Screen)?;
        Ok(PendingSubmission { ticket, image })
    }

    /// Performs the network round trip for `pending`.
    ///
    /// Does not touch screen state, so the call can run while the screen keeps
    /// serving other events.
    pub fn run_submission(
        &self,
        pending: &PendingSubmission,
    ) -> Result<InferenceResult, SubmitError> {
        self.client.submit(Some(&pending.image))
    }

    /// Applies the outcome of `pending` unless the screen was invalidated.
    pub fn finish_submission(
        &mut self,
        pending: PendingSubmission,
        outcome: Result<InferenceResult, SubmitError>,
    ) -> Completion {
        self.screen.finish_submission(pending.ticket, outcome)
    }

    /// Begins, runs and finishes one submission.
    ///
    /// # Errors
    /// Returns [`AppError::Screen`] when the submission could not start.
    /// Submission failures are reported through screen state, not here.
    pub fn submit(&mut self) -> Result<Completion, AppError> {
        let pending = self.begin_submission()?;
        let outcome = self.run_submission(&pending);
        Ok(self.finish_submission(pending, outcome))
    }

    /// Cancels this visit (logout); late responses are discarded.
    pub fn invalidate(&mut self) {
        self.screen.invalidate();
    }
}

/// Builds a fresh [`PredictionFlow`] for each prediction screen visit.
pub type FlowFactory = Box<dyn Fn() -> PredictionFlow + Send>;

/// Session-gated shell holding the router and the active prediction visit.
pub struct AppShell {
    session: Arc<dyn SessionProvider>,
    router: SessionRouter,
    new_flow: FlowFactory,
    flow: Option<PredictionFlow>,
}

impl AppShell {
    /// Creates a shell over a session provider.
    pub fn new(session: Arc<dyn SessionProvider>, new_flow: FlowFactory) -> Self {
        Self {
            session,
            router: SessionRouter::new(),
            new_flow,
            flow: None,
        }
    }

    /// Currently displayed route (`None` while the session is loading).
    pub fn current_route(&self) -> Option<Route> {
        self.router.current_route()
    }

    /// Re-reads the session state and applies the router decision.
    ///
    /// `ForceLogin` invalidates the active prediction visit so an in-flight
    /// response can never be applied after logout.
    pub fn sync_session(&mut self) -> RouteDecision {
        let state = self.session.state();
        let decision = self.router.observe(&state);

        match decision {
            RouteDecision::ForceLogin => {
                if let Some(flow) = self.flow.as_mut() {
                    flow.invalidate();
                }
                info!(stage = "shell", action = "force_login");
            }
            RouteDecision::Navigate(route) => {
                info!(stage = "shell", action = "navigate", ?route);
            }
            RouteDecision::Stay => {}
        }
        decision
    }

    /// Signs in and routes on success.
    ///
    /// # Errors
    /// Propagates [`AuthError`] from the provider.
    pub fn login(&mut self, email: &str, password: &str) -> Result<bool, AppError> {
        let accepted = self.session.login(email, password)?;
        self.sync_session();
        Ok(accepted)
    }

    /// Signs out and forces the login screen.
    pub fn logout(&mut self) -> RouteDecision {
        self.session.logout();
        self.sync_session()
    }

    /// Greeting name for the home screen.
    pub fn greeting(&self) -> Option<String> {
        self.session
            .state()
            .user()
            .map(|user| user.greeting_name().to_string())
    }

    /// Opens the prediction screen with a fresh visit.
    ///
    /// # Errors
    /// Returns [`AppError::Auth`] when no user is signed in.
    pub fn open_prediction(&mut self) -> Result<&mut PredictionFlow, AppError> {
        let state = self.session.state();
        self.router.navigate(Route::Prediction, &state)?;
        Ok(self.flow.insert((self.new_flow)()))
    }

    /// Leaves the prediction screen for home.
    ///
    /// # Errors
    /// Returns [`AppError::Auth`] when no user is signed in.
    pub fn back_to_home(&mut self) -> Result<(), AppError> {
        let state = self.session.state();
        self.router.navigate(Route::Home, &state)?;
        self.flow = None;
        Ok(())
    }

    /// Most recent prediction visit.
    ///
    /// After a forced logout the visit stays reachable in its invalidated
    /// form so late completions can be handed back and discarded.
    pub fn prediction(&mut self) -> Option<&mut PredictionFlow> {
        self.flow.as_mut()
    }
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Auth or routing error.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(CoreError),
    /// Timeout setting is not a positive integer.
    #[error("SMART_LEAF_HTTP_TIMEOUT_MS must be a positive integer of milliseconds, got '{0}'")]
    InvalidTimeout(String),
    /// Permission gate denied camera or library access.
    #[error("camera and photo library permissions are required")]
    PermissionDenied,
    /// Screen rejected the transition.
    #[error("screen error: {0}")]
    Screen(ScreenError),
    /// Transport setup failure.
    #[error("submission error: {0}")]
    Submit(#[from] SubmitError),
}
