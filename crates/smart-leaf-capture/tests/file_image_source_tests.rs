//! Integration tests for the desktop file-backed image source.

use std::sync::Arc;

use smart_leaf_capture::{AcquisitionOutcome, FileImageSource, ImageAcquirer, ImageSourceKind};
use smart_leaf_core::ImageMimeType;

#[test]
fn file_image_source_tests_library_pick_selects_existing_file() {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("temp image should be created");
    let mut acquirer = ImageAcquirer::new(Arc::new(FileImageSource::new(file.path())));

    match acquirer.pick_from_library() {
        AcquisitionOutcome::Selected(image) => {
            assert_eq!(image.implied_mime_type, ImageMimeType::Png);
            assert_eq!(image.local_path(), file.path());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn file_image_source_tests_camera_and_missing_file_fail() {
    let mut acquirer = ImageAcquirer::new(Arc::new(FileImageSource::new("/nonexistent/leaf.jpg")));

    assert!(matches!(
        acquirer.capture_from_device(),
        AcquisitionOutcome::Failed {
            source: ImageSourceKind::Camera,
            ..
        }
    ));
    assert!(matches!(
        acquirer.pick_from_library(),
        AcquisitionOutcome::Failed {
            source: ImageSourceKind::Library,
            ..
        }
    ));
}
