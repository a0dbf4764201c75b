#![warn(missing_docs)]
//! # smart-leaf-capture
//!
//! ## Purpose
//! Provides the permission gate and image acquisition abstractions used by the
//! prediction screen.
//!
//! ## Responsibilities
//! - Reduce camera and media-library permissions to one
//!   [`PermissionOutcome`].
//! - Wrap camera capture and library selection into a single
//!   [`AcquisitionOutcome`] carrying a normalized [`SelectedImage`].
//! - Expose a file-backed image source for desktop hosts.
//! - Expose deterministic synthetic backends for CI and unit tests.
//!
//! ## Data flow
//! Prediction flow asks [`PermissionGate::check_and_request`] -> on `Granted`
//! launches [`ImageAcquirer`] -> platform [`ImageSource`] returns a picker URI
//! -> [`SelectedImage::from_uri`].
//!
//! ## Ownership and lifetimes
//! Backends are shared behind `Arc<dyn ...>`; acquisition takes `&mut self`, so
//! one picker launch at a time is enforced by the borrow checker.
//!
//! ## Error model
//! Backend failures surface as [`CaptureError`] and are folded into
//! [`AcquisitionOutcome::Failed`]. Cancellation is a normal outcome, not an
//! error.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use smart_leaf_core::SelectedImage;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Device permissions required before any acquisition path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionKind {
    /// Photo/media library read access.
    MediaLibrary,
    /// Camera capture access.
    Camera,
}

impl PermissionKind {
    /// Order in which permissions are checked and requested.
    pub const REQUIRED: [PermissionKind; 2] = [PermissionKind::MediaLibrary, PermissionKind::Camera];
}

/// Platform permission status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// User granted access.
    Granted,
    /// User refused access.
    Denied,
    /// User has not answered yet.
    Undetermined,
}

/// Combined gate result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    /// Every required permission is granted.
    Granted,
    /// At least one required permission is missing.
    Denied,
}

/// Platform permission API.
pub trait PermissionBackend: Send + Sync {
    /// Returns the current status without prompting.
    fn status(&self, kind: PermissionKind) -> PermissionStatus;

    /// Prompts the user for `kind` and returns the resulting status.
    ///
    /// # Errors
    /// Returns [`CaptureError::Backend`] when the prompt cannot be shown.
    fn request(&self, kind: PermissionKind) -> Result<PermissionStatus, CaptureError>;
}

/// Checks and requests every required permission.
#[derive(Clone)]
pub struct PermissionGate {
    backend: Arc<dyn PermissionBackend>,
}

impl PermissionGate {
    /// Creates a gate over a platform backend.
    pub fn new(backend: Arc<dyn PermissionBackend>) -> Self {
        Self { backend }
    }

    /// Resolves the combined permission outcome.
    ///
    /// Each permission that is not already granted is requested once.
    /// Anything other than `Granted` after the request counts as denied.
    pub fn check_and_request(&self) -> PermissionOutcome {
        let mut outcome = PermissionOutcome::Granted;

        for kind in PermissionKind::REQUIRED {
            let status = match self.backend.status(kind) {
                PermissionStatus::Granted => PermissionStatus::Granted,
                _ => self.backend.request(kind).unwrap_or_else(|error| {
                    warn!(stage = "permission", action = "request_failed", ?kind, %error);
                    PermissionStatus::Denied
                }),
            };

            debug!(stage = "permission", action = "resolved", ?kind, ?status);
            if status != PermissionStatus::Granted {
                outcome = PermissionOutcome::Denied;
            }
        }

        info!(stage = "permission", action = "gate", ?outcome);
        outcome
    }
}

/// Which picker produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSourceKind {
    /// Device camera.
    Camera,
    /// Photo library.
    Library,
}

/// Raw picker response from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerResponse {
    /// User chose or captured an image.
    Picked {
        /// URI of the chosen asset.
        uri: String,
    },
    /// User dismissed the picker.
    Cancelled,
}

/// Platform camera/library launcher.
pub trait ImageSource: Send + Sync {
    /// Launches the camera.
    ///
    /// # Errors
    /// Returns [`CaptureError`] when the camera cannot be opened.
    fn launch_camera(&self) -> Result<PickerResponse, CaptureError>;

    /// Launches the photo library picker.
    ///
    /// # Errors
    /// Returns [`CaptureError`] when the picker cannot be opened.
    fn launch_library(&self) -> Result<PickerResponse, CaptureError>;
}

/// Normalized acquisition result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    /// An image is ready for submission.
    Selected(SelectedImage),
    /// User dismissed the picker; not an error.
    Cancelled,
    /// Platform failure.
    Failed {
        /// Picker that failed.
        source: ImageSourceKind,
        /// Underlying failure description.
        reason: String,
    },
}

/// Launches pickers and normalizes their responses.
#[derive(Clone)]
pub struct ImageAcquirer {
    source: Arc<dyn ImageSource>,
}

impl ImageAcquirer {
    /// Creates an acquirer over a platform image source.
    pub fn new(source: Arc<dyn ImageSource>) -> Self {
        Self { source }
    }

    /// Captures a new photo with the device camera.
    ///
    /// Callers must have obtained [`PermissionOutcome::Granted`] first.
    pub fn capture_from_device(&mut self) -> AcquisitionOutcome {
        let response = self.source.launch_camera();
        normalize(ImageSourceKind::Camera, response)
    }

    /// Picks an existing image from the library.
    ///
    /// Callers must have obtained [`PermissionOutcome::Granted`] first.
    pub fn pick_from_library(&mut self) -> AcquisitionOutcome {
        let response = self.source.launch_library();
        normalize(ImageSourceKind::Library, response)
    }
}

fn normalize(
    source: ImageSourceKind,
    response: Result<PickerResponse, CaptureError>,
) -> AcquisitionOutcome {
    let outcome = match response {
        Ok(PickerResponse::Picked { uri }) => match SelectedImage::from_uri(uri) {
            Ok(image) => AcquisitionOutcome::Selected(image),
            Err(error) => AcquisitionOutcome::Failed {
                source,
                reason: error.to_string(),
            },
        },
        Ok(PickerResponse::Cancelled) => AcquisitionOutcome::Cancelled,
        Err(error) => AcquisitionOutcome::Failed {
            source,
            reason: error.to_string(),
        },
    };

    match &outcome {
        AcquisitionOutcome::Selected(image) => info!(
            stage = "acquisition",
            action = "selected",
            ?source,
            file_name = %image.implied_filename,
            content_type = %image.implied_mime_type
        ),
        AcquisitionOutcome::Cancelled => debug!(stage = "acquisition", action = "cancelled", ?source),
        AcquisitionOutcome::Failed { reason, .. } => {
            warn!(stage = "acquisition", action = "failed", ?source, %reason)
        }
    }

    outcome
}

/// Permission backend with fixed answers, for hosts without a permission
/// model and for tests.
#[derive(Debug)]
pub struct StaticPermissions {
    media_library: PermissionStatus,
    camera: PermissionStatus,
    answer: PermissionStatus,
    prompts: Mutex<u32>,
}

impl StaticPermissions {
    /// Backend where every permission is already granted.
    pub fn all_granted() -> Self {
        Self::new(PermissionStatus::Granted, PermissionStatus::Granted, PermissionStatus::Granted)
    }

    /// Backend with explicit current statuses and the status every prompt
    /// resolves to.
    pub fn new(
        media_library: PermissionStatus,
        camera: PermissionStatus,
        answer: PermissionStatus,
    ) -> Self {
        Self {
            media_library,
            camera,
            answer,
            prompts: Mutex::new(0),
        }
    }

    /// Number of prompts shown so far.
    pub fn prompts(&self) -> u32 {
        self.prompts.lock().map(|count| *count).unwrap_or(0)
    }
}

impl PermissionBackend for StaticPermissions {
    fn status(&self, kind: PermissionKind) -> PermissionStatus {
        match kind {
            PermissionKind::MediaLibrary => self.media_library,
            PermissionKind::Camera => self.camera,
        }
    }

    fn request(&self, _kind: PermissionKind) -> Result<PermissionStatus, CaptureError> {
        let mut prompts = self
            .prompts
            .lock()
            .map_err(|_| CaptureError::Backend("permission prompt lock poisoned".to_string()))?;
        *prompts += 1;
        Ok(self.answer)
    }
}

/// Image source backed by a local file, for desktop hosts.
///
/// The library picker "selects" the configured file. There is no camera.
#[derive(Debug, Clone)]
pub struct FileImageSource {
    path: PathBuf,
}

impl FileImageSource {
    /// Creates a source that always offers `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ImageSource for FileImageSource {
    fn launch_camera(&self) -> Result<PickerResponse, CaptureError> {
        Err(CaptureError::Unavailable(
            "no camera is available on this host".to_string(),
        ))
    }

    fn launch_library(&self) -> Result<PickerResponse, CaptureError> {
        if !self.path.is_file() {
            return Err(CaptureError::Backend(format!(
                "image file not found: {}",
                self.path.display()
            )));
        }

        Ok(PickerResponse::Picked {
            uri: format!("file://{}", self.path.display()),
        })
    }
}

/// Deterministic image source that replays scripted picker responses.
#[derive(Debug, Default)]
pub struct SyntheticImageSource {
    script: Mutex<VecDeque<Result<PickerResponse, CaptureError>>>,
    launches: Mutex<u32>,
}

impl SyntheticImageSource {
    /// Creates a source that replays `script` in order, for either picker.
    pub fn new(script: Vec<Result<PickerResponse, CaptureError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            launches: Mutex::new(0),
        }
    }

    /// Convenience constructor for a single picked URI.
    pub fn picking(uri: impl Into<String>) -> Self {
        Self::new(vec![Ok(PickerResponse::Picked { uri: uri.into() })])
    }

    /// Number of picker launches so far.
    pub fn launches(&self) -> u32 {
        self.launches.lock().map(|count| *count).unwrap_or(0)
    }

    fn next(&self) -> Result<PickerResponse, CaptureError> {
        let mut launches = self
            .launches
            .lock()
            .map_err(|_| CaptureError::Backend("synthetic launch lock poisoned".to_string()))?;
        *launches += 1;

        self.script
            .lock()
            .map_err(|_| CaptureError::Backend("synthetic script lock poisoned".to_string()))?
            .pop_front()
            .unwrap_or(Ok(PickerResponse::Cancelled))
    }
}

impl ImageSource for SyntheticImageSource {
    fn launch_camera(&self) -> Result<PickerResponse, CaptureError> {
        self.next()
    }

    fn launch_library(&self) -> Result<PickerResponse, CaptureError> {
        self.next()
    }
}

/// Capture layer error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Requested hardware or picker does not exist on this host.
    #[error("capture source unavailable: {0}")]
    Unavailable(String),
    /// Backend runtime failure.
    #[error("capture backend failure: {0}")]
    Backend(String),
}
