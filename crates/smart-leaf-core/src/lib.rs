#![warn(missing_docs)]
//! # smart-leaf-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `smart-leaf` workspace.
//!
//! ## Responsibilities
//! - Normalize picker URIs into [`SelectedImage`] values with an implied
//!   filename and MIME type.
//! - Hold one diagnosis as an immutable [`InferenceResult`].
//! - Rank confidence maps into display order ([`rank`]).
//! - Resolve the static endpoint table ([`Endpoints`]).
//!
//! ## Data flow
//! Image acquisition emits [`SelectedImage`]. The submission client turns a
//! server payload into [`InferenceResult`], and the result view calls
//! [`rank`] on every render.
//!
//! ## Ownership and lifetimes
//! All values own their strings so they can move freely between the screen
//! state machine and transport layers.
//!
//! ## Error model
//! Construction-time validation failures return [`CoreError`].
//!
//! ## Example
//! ```rust
//! use smart_leaf_core::{InferenceResult, rank};
//!
//! let result = InferenceResult::new(
//!     "healthy",
//!     87.5,
//!     vec![("healthy".to_string(), 87.5)],
//! )
//! .unwrap();
//! let ranked = rank(&result, 5);
//! assert_eq!(ranked.len(), 1);
//! assert_eq!(ranked[0].rank, 1);
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Number of ranked entries shown by the result view.
pub const DEFAULT_RANK_LIMIT: usize = 5;

/// Filename used when a picker URI carries no final path segment.
pub const FALLBACK_FILENAME: &str = "photo.jpg";

const FILE_SCHEME_PREFIX: &str = "file://";

/// Image MIME types accepted by the inference endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageMimeType {
    /// `image/jpeg`, the default for unknown extensions.
    Jpeg,
    /// `image/png`.
    Png,
}

impl ImageMimeType {
    /// Infers the MIME type from a filename extension.
    ///
    /// Only a literal `png` extension (any case) selects PNG; everything else,
    /// including a missing extension, falls back to JPEG.
    pub fn from_filename(filename: &str) -> Self {
        match filename_extension(filename) {
            Some(extension) if extension.eq_ignore_ascii_case("png") => Self::Png,
            _ => Self::Jpeg,
        }
    }

    /// Returns the MIME essence string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

impl fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One image chosen by the user for a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedImage {
    /// Picker-provided URI (`file://` URI or plain local path).
    pub uri: String,
    /// Filename sent in the multipart part.
    pub implied_filename: String,
    /// Content type sent in the multipart part.
    pub implied_mime_type: ImageMimeType,
}

impl SelectedImage {
    /// Normalizes a picker URI into a selected image.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyImageUri`] when `uri` is blank.
    pub fn from_uri(uri: impl Into<String>) -> Result<Self, CoreError> {
        let uri = uri.into();
        if uri.trim().is_empty() {
            return Err(CoreError::EmptyImageUri);
        }

        let implied_filename = match uri.rsplit('/').next() {
            Some(segment) if !segment.is_empty() => segment.to_string(),
            _ => FALLBACK_FILENAME.to_string(),
        };
        let implied_mime_type = ImageMimeType::from_filename(&implied_filename);

        Ok(Self {
            uri,
            implied_filename,
            implied_mime_type,
        })
    }

    /// Returns the local filesystem path behind the URI.
    pub fn local_path(&self) -> PathBuf {
        PathBuf::from(
            self.uri
                .strip_prefix(FILE_SCHEME_PREFIX)
                .unwrap_or(&self.uri),
        )
    }
}

/// Returns the trailing `.<word>` extension of `filename`, if any.
///
/// Word characters are ASCII alphanumerics and `_`.
pub fn filename_extension(filename: &str) -> Option<&str> {
    let (_, extension) = filename.rsplit_once('.')?;
    if extension.is_empty()
        || !extension
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return None;
    }
    Some(extension)
}

/// Diagnosis returned by one successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "InferenceResultFields")]
pub struct InferenceResult {
    top_label: String,
    top_confidence: f64,
    confidence_by_label: Vec<(String, f64)>,
}

impl InferenceResult {
    /// Creates a result, keeping the server's label order.
    ///
    /// Confidences are stored as received on the 0-100 scale; they are not
    /// normalized. When `confidence_by_label` lacks `top_label`, the top entry
    /// is appended so the map always covers the headline prediction.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyLabel`] when `top_label` is blank.
    pub fn new(
        top_label: impl Into<String>,
        top_confidence: f64,
        mut confidence_by_label: Vec<(String, f64)>,
    ) -> Result<Self, CoreError> {
        let top_label = top_label.into();
        if top_label.trim().is_empty() {
            return Err(CoreError::EmptyLabel);
        }

        if !confidence_by_label
            .iter()
            .any(|(label, _)| *label == top_label)
        {
            confidence_by_label.push((top_label.clone(), top_confidence));
        }

        Ok(Self {
            top_label,
            top_confidence,
            confidence_by_label,
        })
    }

    /// Headline label.
    pub fn top_label(&self) -> &str {
        &self.top_label
    }

    /// Headline confidence (0-100).
    pub fn top_confidence(&self) -> f64 {
        self.top_confidence
    }

    /// Every label with its confidence, in server order.
    pub fn confidence_by_label(&self) -> &[(String, f64)] {
        &self.confidence_by_label
    }
}

#[derive(Deserialize)]
struct InferenceResultFields {
    top_label: String,
    top_confidence: f64,
    confidence_by_label: Vec<(String, f64)>,
}

impl TryFrom<InferenceResultFields> for InferenceResult {
    type Error = CoreError;

    fn try_from(fields: InferenceResultFields) -> Result<Self, Self::Error> {
        Self::new(fields.top_label, fields.top_confidence, fields.confidence_by_label)
    }
}

/// One row of the ranked result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// 1-based position.
    pub rank: usize,
    /// Class label as reported by the server.
    pub label: String,
    /// Confidence on the 0-100 scale.
    pub confidence: f64,
}

/// Ranks every label of `result` by confidence, highest first.
///
/// The sort is stable, so equal confidences keep the server's order. At most
/// `limit` entries are returned.
pub fn rank(result: &InferenceResult, limit: usize) -> Vec<RankedEntry> {
    let mut entries: Vec<&(String, f64)> = result.confidence_by_label.iter().collect();
    entries.sort_by(|left, right| rank_key(right.1).total_cmp(&rank_key(left.1)));

    entries
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, (label, confidence))| RankedEntry {
            rank: index + 1,
            label: label.clone(),
            confidence: *confidence,
        })
        .collect()
}

/// Sort key for a confidence: `-0.0` ranks equal to `0.0`, `NaN` ranks last.
fn rank_key(confidence: f64) -> f64 {
    if confidence.is_nan() {
        f64::NEG_INFINITY
    } else {
        confidence + 0.0
    }
}

/// Renders a class label for display (`Tomato___Late_blight` becomes
/// `Tomato   Late blight`).
pub fn display_label(label: &str) -> String {
    label.replace('_', " ")
}

/// Renders a confidence with four decimals and a percent sign.
pub fn format_confidence(confidence: f64) -> String {
    format!("{confidence:.4}%")
}

/// Logical backend operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Credential check.
    Login,
    /// Account creation.
    Signup,
    /// Image inference.
    Predict,
    /// User listing.
    Users,
}

impl Endpoint {
    /// Every endpoint, in table order.
    pub const ALL: [Endpoint; 4] = [
        Endpoint::Login,
        Endpoint::Signup,
        Endpoint::Predict,
        Endpoint::Users,
    ];

    /// Path appended to the base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Signup => "/signup",
            Self::Predict => "/predict",
            Self::Users => "/users",
        }
    }

    /// Upper-case operation name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::Signup => "SIGNUP",
            Self::Predict => "PREDICT",
            Self::Users => "USERS",
        }
    }
}

/// Fully qualified endpoint table, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
    login: String,
    signup: String,
    predict: String,
    users: String,
}

impl Endpoints {
    /// Derives every endpoint URL from `base_url`.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidBaseUrl`] when the URL does not parse or
    /// its scheme is neither `http` nor `https`.
    pub fn from_base_url(base_url: &str) -> Result<Self, CoreError> {
        let parsed = Url::parse(base_url.trim())
            .map_err(|error| CoreError::InvalidBaseUrl(format!("{base_url}: {error}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CoreError::InvalidBaseUrl(format!(
                "{base_url}: scheme must be http or https"
            )));
        }

        let base = parsed.as_str().trim_end_matches('/').to_string();
        let join = |endpoint: Endpoint| format!("{base}{}", endpoint.path());

        Ok(Self {
            login: join(Endpoint::Login),
            signup: join(Endpoint::Signup),
            predict: join(Endpoint::Predict),
            users: join(Endpoint::Users),
            base_url: base,
        })
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the URL for `endpoint`.
    pub fn url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Login => &self.login,
            Endpoint::Signup => &self.signup,
            Endpoint::Predict => &self.predict,
            Endpoint::Users => &self.users,
        }
    }

    /// Returns `true` when the base URL uses TLS.
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

/// Error type for core model validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Picker returned an empty URI.
    #[error("image uri is empty")]
    EmptyImageUri,
    /// Prediction label is blank.
    #[error("prediction label is empty")]
    EmptyLabel,
    /// Endpoint base URL is unusable.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
}
