#![warn(missing_docs)]
//! # smart-leaf-upload
//!
//! ## Purpose
//! Sends one selected image to the inference endpoint and classifies the
//! outcome.
//!
//! ## Responsibilities
//! - Validate the predict endpoint URL.
//! - Build a single-file multipart request (`file` field) from a
//!   [`SelectedImage`].
//! - Send exactly one request through an injectable [`InferenceTransport`].
//! - Classify responses into an [`InferenceResult`] or a typed
//!   [`SubmitError`].
//!
//! ## Data flow
//! Screen state machine hands over [`SelectedImage`] -> [`InferenceClient::submit`]
//! reads image bytes -> [`PredictRequest`] -> transport -> [`TransportResponse`]
//! -> [`classify_response`].
//!
//! ## Ownership and lifetimes
//! Requests own their byte buffer so transports may move them into a
//! multipart body without copying back into caller state.
//!
//! ## Error model
//! Every failure becomes a [`SubmitError`] variant. The client never retries;
//! [`classify_submit_error`] tells the UI whether a manual retry with the same
//! image makes sense.
//!
//! ## Security and privacy notes
//! Image bytes are never logged. Log lines carry a truncated SHA-256
//! fingerprint instead.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use smart_leaf_core::{ImageMimeType, InferenceResult, SelectedImage};
use smart_leaf_inference_contract::{parse_predict_response, server_error_message};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Multipart field name expected by the inference endpoint.
pub const FILE_FIELD_NAME: &str = "file";

/// Default HTTP timeout for inference requests.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// One multipart upload, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictRequest {
    /// Absolute predict endpoint URL.
    pub endpoint: String,
    /// Multipart field name.
    pub field_name: &'static str,
    /// Filename attached to the file part.
    pub file_name: String,
    /// Content type attached to the file part.
    pub content_type: ImageMimeType,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

/// Status and body of a received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body decoded as text.
    pub body: String,
}

impl TransportResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstract transport used by [`InferenceClient`].
pub trait InferenceTransport: Send + Sync {
    /// Sends one multipart request and returns whatever response arrived.
    ///
    /// # Errors
    /// Implementations return [`SubmitError::Network`] when no response was
    /// received.
    fn send(&self, request: &PredictRequest) -> Result<TransportResponse, SubmitError>;
}

/// Whether a failed submission can be retried with the same image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Retrying the same image may succeed.
    Retriable,
    /// A new image (or a fixed configuration) is required.
    Permanent,
}

/// Client for the inference endpoint.
#[derive(Clone)]
pub struct InferenceClient {
    endpoint: String,
    transport: Arc<dyn InferenceTransport>,
}

impl InferenceClient {
    /// Creates a client for a validated predict endpoint.
    ///
    /// # Errors
    /// Returns [`SubmitError::InvalidEndpoint`] when the URL does not parse or
    /// is not `http`/`https`.
    pub fn new(
        endpoint: impl Into<String>,
        transport: Arc<dyn InferenceTransport>,
    ) -> Result<Self, SubmitError> {
        let endpoint = endpoint.into();
        let parsed = Url::parse(&endpoint)
            .map_err(|error| SubmitError::InvalidEndpoint(format!("{endpoint}: {error}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SubmitError::InvalidEndpoint(format!(
                "{endpoint}: scheme must be http or https"
            )));
        }
        if parsed.scheme() == "http" {
            warn!(stage = "upload", action = "configure", endpoint = %endpoint, "plaintext inference endpoint");
        }

        Ok(Self {
            endpoint,
            transport,
        })
    }

    /// Returns the configured predict endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Builds the multipart request for `image`.
    ///
    /// # Errors
    /// Returns [`SubmitError::ImageUnreadable`] when the file behind the URI
    /// cannot be read.
    pub fn build_request(&self, image: &SelectedImage) -> Result<PredictRequest, SubmitError> {
        let path = image.local_path();
        let bytes = std::fs::read(&path).map_err(|error| {
            SubmitError::ImageUnreadable(format!("{}: {error}", path.display()))
        })?;

        Ok(PredictRequest {
            endpoint: self.endpoint.clone(),
            field_name: FILE_FIELD_NAME,
            file_name: image.implied_filename.clone(),
            content_type: image.implied_mime_type,
            bytes,
        })
    }

    /// Submits one image and classifies the response.
    ///
    /// Exactly one transport call is made per invocation; there is no
    /// automatic retry.
    ///
    /// # Errors
    /// See [`SubmitError`] for the full taxonomy.
    pub fn submit(&self, image: Option<&SelectedImage>) -> Result<InferenceResult, SubmitError> {
        let image = image.ok_or(SubmitError::NoImage)?;
        let request = self.build_request(image)?;

        info!(
            stage = "upload",
            action = "submit",
            file_name = %request.file_name,
            content_type = %request.content_type,
            size_bytes = request.bytes.len(),
            fingerprint = %image_fingerprint(&request.bytes),
            "sending image to inference endpoint"
        );

        let response = self.transport.send(&request).inspect_err(|error| {
            warn!(stage = "upload", action = "transport_failed", %error);
        })?;

        debug!(stage = "upload", action = "response", status = response.status);
        classify_response(&response)
    }
}

/// Maps a received response to a result or a typed failure.
///
/// # Errors
/// Returns [`SubmitError::Server`] for non-2xx statuses and
/// [`SubmitError::MalformedResponse`] when a 2xx body breaks the contract.
pub fn classify_response(response: &TransportResponse) -> Result<InferenceResult, SubmitError> {
    if !response.is_success() {
        let message = server_error_message(response.status, &response.body);
        warn!(stage = "upload", action = "server_error", status = response.status, %message);
        return Err(SubmitError::Server {
            status: response.status,
            message,
        });
    }

    parse_predict_response(&response.body).map_err(|error| {
        warn!(stage = "upload", action = "malformed_response", %error);
        SubmitError::MalformedResponse(error.to_string())
    })
}

/// Classifies a submission failure for the retry affordance.
pub fn classify_submit_error(error: &SubmitError) -> FailureClass {
    match error {
        SubmitError::Network(_) | SubmitError::Server { .. } | SubmitError::MalformedResponse(_) => {
            FailureClass::Retriable
        }
        SubmitError::NoImage | SubmitError::ImageUnreadable(_) | SubmitError::InvalidEndpoint(_) => {
            FailureClass::Permanent
        }
    }
}

/// Returns a short, stable SHA-256 fingerprint for log correlation.
pub fn image_fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..8])
}

/// Blocking HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpInferenceTransport {
    client: reqwest::blocking::Client,
}

impl HttpInferenceTransport {
    /// Creates a transport with the given request timeout.
    ///
    /// # Errors
    /// Returns [`SubmitError::Network`] when the HTTP client cannot be built.
    pub fn new(timeout_ms: u64) -> Result<Self, SubmitError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|error| SubmitError::Network(format!("http client init failed: {error}")))?;
        Ok(Self { client })
    }
}

impl InferenceTransport for HttpInferenceTransport {
    fn send(&self, request: &PredictRequest) -> Result<TransportResponse, SubmitError> {
        use reqwest::blocking::multipart::{Form, Part};

        let part = Part::bytes(request.bytes.clone())
            .file_name(request.file_name.clone())
            .mime_str(request.content_type.as_str())
            .map_err(|error| SubmitError::Network(error.to_string()))?;
        let form = Form::new().part(request.field_name, part);

        let response = self
            .client
            .post(&request.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .map_err(|error| SubmitError::Network(error.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|error| SubmitError::Network(format!("response body read failed: {error}")))?;

        Ok(TransportResponse { status, body })
    }
}

/// Submission failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Submit was invoked without a selected image.
    #[error("no image selected")]
    NoImage,
    /// Selected image file could not be read.
    #[error("image could not be read: {0}")]
    ImageUnreadable(String),
    /// No response was received.
    #[error("network error: {0}")]
    Network(String),
    /// Response received with a non-success status.
    #[error("server error {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Extracted server message.
        message: String,
    },
    /// Success status, but the body breaks the response contract.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// Predict endpoint URL is unusable.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}
