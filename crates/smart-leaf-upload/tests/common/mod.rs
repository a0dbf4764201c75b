//! Shared fixtures for upload integration tests.

use std::io::Write;
use std::sync::Mutex;

use smart_leaf_core::SelectedImage;
use smart_leaf_upload::{InferenceTransport, PredictRequest, SubmitError, TransportResponse};
use tempfile::NamedTempFile;

/// Transport returning one scripted outcome and recording every request.
#[allow(dead_code)]
pub struct ScriptedTransport {
    outcome: Result<TransportResponse, SubmitError>,
    pub requests: Mutex<Vec<PredictRequest>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn responding(status: u16, body: &str) -> Self {
        Self {
            outcome: Ok(TransportResponse {
                status,
                body: body.to_string(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            outcome: Err(SubmitError::Network(reason.to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("request lock should work").len()
    }
}

impl InferenceTransport for ScriptedTransport {
    fn send(&self, request: &PredictRequest) -> Result<TransportResponse, SubmitError> {
        self.requests
            .lock()
            .expect("request lock should work")
            .push(request.clone());
        self.outcome.clone()
    }
}

/// Writes image bytes to a temp file with the given suffix.
#[allow(dead_code)]
pub fn fixture_image(suffix: &str) -> (NamedTempFile, SelectedImage) {
    let mut file = tempfile::Builder::new()
        .prefix("leaf")
        .suffix(suffix)
        .tempfile()
        .expect("temp image should be created");
    file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3])
        .expect("temp image should be written");
    let uri = format!("file://{}", file.path().display());
    let image = SelectedImage::from_uri(uri).expect("fixture uri should parse");
    (file, image)
}
