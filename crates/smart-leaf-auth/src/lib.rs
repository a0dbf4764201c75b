#![warn(missing_docs)]
//! # smart-leaf-auth
//!
//! ## Purpose
//! Implements the session provider and session-gated routing for
//! `smart-leaf`.
//!
//! ## Responsibilities
//! - Model the session tri-state (`Loading`, `Authenticated`,
//!   `Unauthenticated`).
//! - Validate login/signup input shape and execute requests through an
//!   injectable [`AuthTransport`].
//! - Decide the single reachable initial screen and force re-routing on logout
//!   ([`SessionRouter`]).
//!
//! ## Data flow
//! Stored user (if any) -> [`AuthSession::restore`] resolves `Loading` ->
//! [`SessionRouter::observe`] emits a [`RouteDecision`] -> the shell navigates.
//! Login form -> [`SessionProvider::login`] -> [`AuthTransport::login`] ->
//! session becomes `Authenticated`.
//!
//! ## Ownership and lifetimes
//! The session state lives behind a `Mutex` inside [`AuthSession`] and is
//! handed out as owned snapshots; the router never mutates it.
//!
//! ## Error model
//! Input-shape violations, rejected credentials and transport failures are
//! surfaced as [`AuthError`].
//!
//! ## Security and privacy notes
//! This crate does not log credentials. Passwords are only held for the
//! duration of one request.
//!
//! ## Example
//! ```rust
//! use smart_leaf_auth::{Route, RouteDecision, SessionRouter, SessionState};
//!
//! let mut router = SessionRouter::new();
//! assert_eq!(router.observe(&SessionState::Loading), RouteDecision::Stay);
//! assert_eq!(
//!     router.observe(&SessionState::Unauthenticated),
//!     RouteDecision::Navigate(Route::Login)
//! );
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Minimum password length accepted by signup.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Authenticated account as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend user id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
}

impl User {
    /// Name shown in the home screen greeting.
    pub fn greeting_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "User"
        } else {
            &self.name
        }
    }
}

/// Session tri-state owned by the session provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Stored session is still being restored.
    Loading,
    /// A user is signed in.
    Authenticated(User),
    /// Nobody is signed in.
    Unauthenticated,
}

impl SessionState {
    /// Returns the signed-in user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Read side plus login/logout of the session, passed explicitly as context.
pub trait SessionProvider: Send + Sync {
    /// Returns a snapshot of the current session state.
    fn state(&self) -> SessionState;

    /// Attempts to sign in.
    ///
    /// Returns `Ok(false)` when the backend rejects the credentials.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidInput`] for badly shaped input and
    /// [`AuthError::Transport`] when the backend is unreachable.
    fn login(&self, identifier: &str, secret: &str) -> Result<bool, AuthError>;

    /// Signs out; the session becomes `Unauthenticated`.
    fn logout(&self);
}

/// Login request payload forwarded to the auth transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Normalized (trimmed, lower-cased) email.
    pub email: String,
    /// Password as typed.
    pub password: String,
}

impl LoginRequest {
    /// Validates shape and normalizes the email.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidInput`] when a field is blank or the email
    /// does not look like `local@domain.tld`.
    pub fn new(email: &str, password: &str) -> Result<Self, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Please fill in all fields".to_string(),
            ));
        }
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidInput(
                "Please enter a valid email address".to_string(),
            ));
        }

        Ok(Self {
            email,
            password: password.to_string(),
        })
    }
}

/// Signup request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
    /// Display name.
    pub name: String,
    /// Normalized email.
    pub email: String,
    /// Password, at least [`MIN_PASSWORD_LEN`] characters.
    pub password: String,
}

impl SignupRequest {
    /// Validates shape and normalizes the email.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidInput`] for blank fields, a malformed email
    /// or a short password.
    pub fn new(name: &str, email: &str, password: &str) -> Result<Self, AuthError> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput("All fields are required".to_string()));
        }
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidInput(
                "Please enter a valid email address".to_string(),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidInput(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(Self {
            name: name.trim().to_string(),
            email,
            password: password.to_string(),
        })
    }
}

/// Successful login/signup body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Optional server message.
    #[serde(default)]
    pub message: Option<String>,
    /// Account the session belongs to.
    pub user: User,
}

/// Returns `true` when `email` has the shape `local@domain.tld`.
///
/// No whitespace, exactly one `@`, and a dot inside the domain with at least
/// one character on each side.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain
        .char_indices()
        .any(|(index, ch)| ch == '.' && index > 0 && index + 1 < domain.len())
}

/// Abstract transport used by [`AuthSession`].
pub trait AuthTransport: Send + Sync {
    /// Sends a login request.
    ///
    /// # Errors
    /// Returns [`AuthError::Rejected`] for refused credentials and
    /// [`AuthError::Transport`] when no usable response arrived.
    fn login(&self, endpoint: &str, request: &LoginRequest) -> Result<AuthResponse, AuthError>;

    /// Sends a signup request.
    ///
    /// # Errors
    /// Same classification as [`AuthTransport::login`].
    fn signup(&self, endpoint: &str, request: &SignupRequest) -> Result<AuthResponse, AuthError>;
}

/// Concrete session provider backed by an [`AuthTransport`].
#[derive(Clone)]
pub struct AuthSession {
    login_endpoint: String,
    signup_endpoint: String,
    transport: Arc<dyn AuthTransport>,
    state: Arc<Mutex<SessionState>>,
}

impl AuthSession {
    /// Creates a provider in the `Loading` state.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidEndpoint`] when either URL is unusable.
    pub fn new(
        login_endpoint: impl Into<String>,
        signup_endpoint: impl Into<String>,
        transport: Arc<dyn AuthTransport>,
    ) -> Result<Self, AuthError> {
        let login_endpoint = login_endpoint.into();
        let signup_endpoint = signup_endpoint.into();
        validate_endpoint(&login_endpoint)?;
        validate_endpoint(&signup_endpoint)?;

        Ok(Self {
            login_endpoint,
            signup_endpoint,
            transport,
            state: Arc::new(Mutex::new(SessionState::Loading)),
        })
    }

    /// Resolves `Loading` from a previously stored user.
    pub fn restore(&self, stored: Option<User>) {
        let next = match stored {
            Some(user) => SessionState::Authenticated(user),
            None => SessionState::Unauthenticated,
        };
        info!(stage = "auth", action = "restore", authenticated = next.user().is_some());
        *self.lock() = next;
    }

    /// Creates an account. Does not sign in.
    ///
    /// # Errors
    /// Returns [`AuthError`] for invalid input, rejection or transport
    /// failure.
    pub fn signup(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let request = SignupRequest::new(name, email, password)?;
        let response = self.transport.signup(&self.signup_endpoint, &request)?;
        info!(stage = "auth", action = "signup_success", user_id = response.user.id);
        Ok(response.user)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionProvider for AuthSession {
    fn state(&self) -> SessionState {
        self.lock().clone()
    }

    fn login(&self, identifier: &str, secret: &str) -> Result<bool, AuthError> {
        let request = LoginRequest::new(identifier, secret)?;
        debug!(stage = "auth", action = "login_attempt", email_len = request.email.len());

        match self.transport.login(&self.login_endpoint, &request) {
            Ok(response) => {
                info!(stage = "auth", action = "login_success", user_id = response.user.id);
                *self.lock() = SessionState::Authenticated(response.user);
                Ok(true)
            }
            Err(AuthError::Rejected(reason)) => {
                warn!(stage = "auth", action = "login_rejected", %reason);
                Ok(false)
            }
            Err(error) => {
                warn!(stage = "auth", action = "login_failed", %error);
                Err(error)
            }
        }
    }

    fn logout(&self) {
        info!(stage = "auth", action = "logout");
        *self.lock() = SessionState::Unauthenticated;
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), AuthError> {
    let parsed = Url::parse(endpoint)
        .map_err(|error| AuthError::InvalidEndpoint(format!("{endpoint}: {error}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AuthError::InvalidEndpoint(format!(
            "{endpoint}: scheme must be http or https"
        )));
    }
    Ok(())
}

/// Blocking JSON transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpAuthTransport {
    client: reqwest::blocking::Client,
}

impl HttpAuthTransport {
    /// Creates a transport with the given request timeout.
    ///
    /// # Errors
    /// Returns [`AuthError::Transport`] when the HTTP client cannot be built.
    pub fn new(timeout_ms: u64) -> Result<Self, AuthError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|error| AuthError::Transport(format!("http client init failed: {error}")))?;
        Ok(Self { client })
    }

    fn post<T: Serialize>(&self, endpoint: &str, body: &T) -> Result<AuthResponse, AuthError> {
        let response = self
            .client
            .post(endpoint)
            .json(body)
            .send()
            .map_err(|error| AuthError::Transport(error.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|error| AuthError::Transport(error.to_string()))?;

        if (200..300).contains(&status) {
            return serde_json::from_str(&text)
                .map_err(|error| AuthError::InvalidResponse(error.to_string()));
        }

        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("server returned {status}"));
        if (400..500).contains(&status) {
            Err(AuthError::Rejected(message))
        } else {
            Err(AuthError::Transport(message))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl AuthTransport for HttpAuthTransport {
    fn login(&self, endpoint: &str, request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        self.post(endpoint, request)
    }

    fn signup(&self, endpoint: &str, request: &SignupRequest) -> Result<AuthResponse, AuthError> {
        self.post(endpoint, request)
    }
}

/// Screens reachable in the app shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Credential entry.
    Login,
    /// Account creation.
    Signup,
    /// Dashboard for a signed-in user.
    Home,
    /// Leaf photo submission.
    Prediction,
}

impl Route {
    /// Returns `true` when the route needs a signed-in user.
    pub fn requires_session(&self) -> bool {
        matches!(self, Self::Home | Self::Prediction)
    }
}

/// Navigation decision emitted by [`SessionRouter::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Keep the current screen.
    Stay,
    /// Replace the current screen.
    Navigate(Route),
    /// Session ended: go to login and cancel in-flight work.
    ForceLogin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Loading,
    Authenticated,
    Unauthenticated,
}

impl From<&SessionState> for Phase {
    fn from(state: &SessionState) -> Self {
        match state {
            SessionState::Loading => Self::Loading,
            SessionState::Authenticated(_) => Self::Authenticated,
            SessionState::Unauthenticated => Self::Unauthenticated,
        }
    }
}

/// Session-gated router.
///
/// Decisions fire only once the session has left `Loading`; afterwards
/// only real transitions produce navigation.
#[derive(Debug, Clone, Default)]
pub struct SessionRouter {
    /// Last phase other than `Loading`; `None` until the first resolution.
    resolved: Option<Phase>,
    current: Option<Route>,
}

impl SessionRouter {
    /// Creates a router with no screen decided yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently displayed route, `None` while still loading.
    pub fn current_route(&self) -> Option<Route> {
        self.current
    }

    /// Feeds one observed session state and returns the navigation decision.
    pub fn observe(&mut self, state: &SessionState) -> RouteDecision {
        let phase = Phase::from(state);

        let decision = match (phase, self.resolved) {
            (Phase::Loading, _) => RouteDecision::Stay,
            (Phase::Authenticated, None) => RouteDecision::Navigate(Route::Home),
            (Phase::Unauthenticated, None) => RouteDecision::Navigate(Route::Login),
            (Phase::Unauthenticated, Some(Phase::Authenticated)) => RouteDecision::ForceLogin,
            (Phase::Authenticated, Some(Phase::Unauthenticated)) => {
                RouteDecision::Navigate(Route::Home)
            }
            _ => RouteDecision::Stay,
        };

        if phase != Phase::Loading {
            self.resolved = Some(phase);
        }
        match decision {
            RouteDecision::Navigate(route) => self.current = Some(route),
            RouteDecision::ForceLogin => self.current = Some(Route::Login),
            RouteDecision::Stay => {}
        }

        debug!(stage = "router", action = "observe", ?phase, ?decision);
        decision
    }

    /// Navigates on user request, refusing routes the session cannot reach.
    ///
    /// # Errors
    /// Returns [`AuthError::RouteBlocked`] while loading or when `route`
    /// requires a session that does not exist.
    pub fn navigate(&mut self, route: Route, state: &SessionState) -> Result<(), AuthError> {
        let allowed = match state {
            SessionState::Loading => false,
            SessionState::Authenticated(_) => true,
            SessionState::Unauthenticated => !route.requires_session(),
        };
        if !allowed {
            return Err(AuthError::RouteBlocked(route));
        }

        self.current = Some(route);
        Ok(())
    }
}

/// Errors produced by auth client/session logic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Endpoint URL is unusable.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Form input violates basic shape rules.
    #[error("{0}")]
    InvalidInput(String),
    /// Backend refused the credentials or signup.
    #[error("rejected: {0}")]
    Rejected(String),
    /// No usable response from the backend.
    #[error("auth transport failure: {0}")]
    Transport(String),
    /// Response payload violated the auth contract.
    #[error("invalid auth response: {0}")]
    InvalidResponse(String),
    /// Navigation target is not reachable in the current session state.
    #[error("route {0:?} is not reachable in the current session state")]
    RouteBlocked(Route),
}
