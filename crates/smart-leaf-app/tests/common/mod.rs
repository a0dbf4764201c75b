//! Shared fixtures for app integration tests.

use std::io::Write;
use std::sync::{Arc, Mutex};

use smart_leaf_app::{FlowFactory, PredictionFlow};
use smart_leaf_auth::{AuthError, SessionProvider, SessionState, User};
use smart_leaf_capture::{ImageAcquirer, PermissionGate, StaticPermissions, SyntheticImageSource};
use smart_leaf_upload::{
    InferenceClient, InferenceTransport, PredictRequest, SubmitError, TransportResponse,
};
use tempfile::NamedTempFile;

/// Predict body with a clear top class.
#[allow(dead_code)]
pub const HEALTHY_BODY: &str = r#"{"predicted_class":"Tomato___healthy","confidence":91.25,"all_confidences":{"Tomato___healthy":91.25,"Tomato___Late_blight":6.5,"Tomato___Early_blight":2.25}}"#;

/// In-memory session provider accepting a single password.
#[allow(dead_code)]
pub struct FakeSession {
    state: Mutex<SessionState>,
    password: String,
}

#[allow(dead_code)]
impl FakeSession {
    pub fn signed_out(password: &str) -> Self {
        Self {
            state: Mutex::new(SessionState::Unauthenticated),
            password: password.to_string(),
        }
    }

    pub fn loading(password: &str) -> Self {
        Self {
            state: Mutex::new(SessionState::Loading),
            password: password.to_string(),
        }
    }

    pub fn finish_loading(&self) {
        *self.state.lock().expect("state lock should work") = SessionState::Unauthenticated;
    }
}

impl SessionProvider for FakeSession {
    fn state(&self) -> SessionState {
        self.state.lock().expect("state lock should work").clone()
    }

    fn login(&self, identifier: &str, secret: &str) -> Result<bool, AuthError> {
        if identifier.trim().is_empty() {
            return Err(AuthError::InvalidInput("email is required".to_string()));
        }
        if secret != self.password {
            return Ok(false);
        }
        *self.state.lock().expect("state lock should work") = SessionState::Authenticated(User {
            id: 1,
            name: "Ada".to_string(),
            email: identifier.to_string(),
        });
        Ok(true)
    }

    fn logout(&self) {
        *self.state.lock().expect("state lock should work") = SessionState::Unauthenticated;
    }
}

/// Transport that answers every request with the same response.
#[allow(dead_code)]
pub struct CountingTransport {
    status: u16,
    body: String,
    pub requests: Mutex<Vec<PredictRequest>>,
}

#[allow(dead_code)]
impl CountingTransport {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("request lock should work").len()
    }
}

impl InferenceTransport for CountingTransport {
    fn send(&self, request: &PredictRequest) -> Result<TransportResponse, SubmitError> {
        self.requests
            .lock()
            .expect("request lock should work")
            .push(request.clone());
        Ok(TransportResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

/// Writes a small JPEG-looking temp file and returns it with its `file://` URI.
#[allow(dead_code)]
pub fn fixture_image() -> (NamedTempFile, String) {
    let mut file = tempfile::Builder::new()
        .prefix("leaf")
        .suffix(".jpg")
        .tempfile()
        .expect("temp image should be created");
    file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0, 9, 8, 7])
        .expect("temp image should be written");
    let uri = format!("file://{}", file.path().display());
    (file, uri)
}

/// Builds a flow over the given permission backend, picker and transport.
#[allow(dead_code)]
pub fn flow_with(
    permissions: Arc<StaticPermissions>,
    source: Arc<SyntheticImageSource>,
    transport: Arc<CountingTransport>,
) -> PredictionFlow {
    let client = InferenceClient::new("http://127.0.0.1:5000/predict", transport)
        .expect("fixture endpoint should be valid");
    PredictionFlow::new(
        PermissionGate::new(permissions),
        ImageAcquirer::new(source),
        client,
    )
}

/// Factory producing flows that all pick `uri` and share `transport`.
#[allow(dead_code)]
pub fn flow_factory(uri: String, transport: Arc<CountingTransport>) -> FlowFactory {
    Box::new(move || {
        flow_with(
            Arc::new(StaticPermissions::all_granted()),
            Arc::new(SyntheticImageSource::picking(uri.clone())),
            transport.clone(),
        )
    })
}
