#![warn(missing_docs)]
//! # smart-leaf-inference-contract
//!
//! ## Purpose
//! Defines the `/predict` response contract and client-side parsing helpers.
//!
//! ## Responsibilities
//! - Parse success payloads into [`smart_leaf_core::InferenceResult`].
//! - Extract a human-readable message from failure bodies.
//! - Keep the server's label order so ties rank deterministically.
//!
//! ## Data flow
//! Raw response body -> [`parse_predict_response`] (2xx) or
//! [`server_error_message`] (any other status) -> submission client outcome.
//!
//! ## Ownership and lifetimes
//! Parsed values are owned so nothing borrows from transient network buffers.
//!
//! ## Error model
//! Bodies that do not match the contract return [`ContractError`]; the
//! submission client reports them as malformed responses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smart_leaf_core::{CoreError, InferenceResult};
use thiserror::Error;

/// Success body returned by `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Headline class label.
    pub predicted_class: Option<String>,
    /// Headline confidence on the 0-100 scale.
    pub confidence: Option<f64>,
    /// Every class with its confidence, in model output order.
    #[serde(default)]
    pub all_confidences: Option<Map<String, Value>>,
}

/// Structured failure body (`{"error": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Server-provided failure description.
    pub error: String,
}

/// Parses a 2xx `/predict` body into an inference result.
///
/// # Errors
/// Returns [`ContractError::Decode`] for invalid JSON,
/// [`ContractError::MissingField`] when `predicted_class` or `confidence` is
/// absent, and [`ContractError::InvalidField`] when a confidence is not a
/// number.
pub fn parse_predict_response(raw: &str) -> Result<InferenceResult, ContractError> {
    let parsed: PredictResponse = serde_json::from_str(raw)?;

    let top_label = parsed
        .predicted_class
        .ok_or(ContractError::MissingField("predicted_class"))?;
    let top_confidence = parsed
        .confidence
        .ok_or(ContractError::MissingField("confidence"))?;

    let mut confidence_by_label = Vec::new();
    for (label, value) in parsed.all_confidences.unwrap_or_default() {
        let confidence = value.as_f64().ok_or_else(|| {
            ContractError::InvalidField(format!("confidence for '{label}' is not a number"))
        })?;
        confidence_by_label.push((label, confidence));
    }

    InferenceResult::new(top_label, top_confidence, confidence_by_label).map_err(ContractError::Core)
}

/// Extracts the message shown for a non-success response.
///
/// Preference order: the `error` string of a JSON body, the compact JSON body
/// itself, the trimmed raw text, then `server returned <status>`.
pub fn server_error_message(status: u16, raw: &str) -> String {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(message) = value.get("error").and_then(Value::as_str)
            && !message.trim().is_empty()
        {
            return message.to_string();
        }
        if !value.is_null() {
            return value.to_string();
        }
    }

    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    format!("server returned {status}")
}

/// Contract parse errors.
#[derive(Debug, Error)]
pub enum ContractError {
    /// Body is not valid JSON for the expected shape.
    #[error("prediction decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Mandatory field is absent.
    #[error("prediction response missing `{0}`")]
    MissingField(&'static str),
    /// Field is present with an unusable value.
    #[error("prediction response invalid: {0}")]
    InvalidField(String),
    /// Parsed values violate model invariants.
    #[error("prediction response rejected: {0}")]
    Core(CoreError),
}
