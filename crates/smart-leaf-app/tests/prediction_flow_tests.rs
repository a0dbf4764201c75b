//! Integration tests for the permission -> acquisition -> submission flow.

mod common;

use std::sync::Arc;

use common::{CountingTransport, HEALTHY_BODY, fixture_image, flow_with};
use smart_leaf_app::AppError;
use smart_leaf_capture::{
    CaptureError, PermissionOutcome, PermissionStatus, PickerResponse, StaticPermissions,
    SyntheticImageSource,
};
use smart_leaf_ui::{Completion, ScreenError, ScreenState};
use smart_leaf_upload::SubmitError;

#[test]
fn prediction_flow_tests_denied_permission_blocks_acquisition() {
    let permissions = Arc::new(StaticPermissions::new(
        PermissionStatus::Granted,
        PermissionStatus::Undetermined,
        PermissionStatus::Denied,
    ));
    let source = Arc::new(SyntheticImageSource::picking("file:///tmp/leaf.jpg"));
    let transport = Arc::new(CountingTransport::new(200, HEALTHY_BODY));
    let mut flow = flow_with(permissions.clone(), source.clone(), transport);

    assert_eq!(flow.prepare(), PermissionOutcome::Denied);
    assert_eq!(permissions.prompts(), 1);
    assert_eq!(
        flow.screen().notice().map(|notice| notice.title.as_str()),
        Some("Permissions required")
    );

    let err = flow.pick_image().expect_err("pick should be blocked");
    assert!(matches!(err, AppError::PermissionDenied));
    assert_eq!(source.launches(), 0);
    assert_eq!(flow.screen().state(), &ScreenState::Idle);
}

#[test]
fn prediction_flow_tests_granted_permissions_are_not_prompted_again() {
    let permissions = Arc::new(StaticPermissions::all_granted());
    let source = Arc::new(SyntheticImageSource::picking("file:///tmp/leaf.jpg"));
    let transport = Arc::new(CountingTransport::new(200, HEALTHY_BODY));
    let mut flow = flow_with(permissions.clone(), source, transport);

    assert_eq!(flow.prepare(), PermissionOutcome::Granted);
    assert_eq!(flow.prepare(), PermissionOutcome::Granted);
    assert_eq!(permissions.prompts(), 0);
    assert!(flow.screen().notice().is_none());
}

#[test]
fn prediction_flow_tests_pick_then_submit_ranks_result() {
    let (_file, uri) = fixture_image();
    let transport = Arc::new(CountingTransport::new(200, HEALTHY_BODY));
    let mut flow = flow_with(
        Arc::new(StaticPermissions::all_granted()),
        Arc::new(SyntheticImageSource::picking(uri)),
        transport.clone(),
    );

    flow.pick_image().expect("pick should succeed");
    assert_eq!(flow.screen().state(), &ScreenState::ImageSelected);

    let completion = flow.submit().expect("submit should start");
    assert_eq!(completion, Completion::Applied);
    assert_eq!(transport.request_count(), 1);

    let ranked = flow.screen().ranked(5);
    let labels: Vec<&str> = ranked.iter().map(|entry| entry.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["Tomato___healthy", "Tomato___Late_blight", "Tomato___Early_blight"]
    );

    let view = flow.screen().view();
    let result = view.result.expect("result view should be present");
    assert_eq!(result.headline, "Tomato   healthy");
    assert_eq!(result.confidence, "91.2500%");
}

#[test]
fn prediction_flow_tests_second_submit_while_uploading_sends_nothing() {
    let (_file, uri) = fixture_image();
    let transport = Arc::new(CountingTransport::new(200, HEALTHY_BODY));
    let mut flow = flow_with(
        Arc::new(StaticPermissions::all_granted()),
        Arc::new(SyntheticImageSource::picking(uri)),
        transport.clone(),
    );
    flow.pick_image().expect("pick should succeed");

    let pending = flow.begin_submission().expect("first submit should start");
    let second = flow.begin_submission().expect_err("second submit should be rejected");
    assert!(matches!(
        second,
        AppError::Screen(ScreenError::SubmissionInFlight)
    ));
    assert_eq!(transport.request_count(), 0);

    let outcome = flow.run_submission(&pending);
    assert_eq!(flow.finish_submission(pending, outcome), Completion::Applied);
    assert_eq!(transport.request_count(), 1);
}

#[test]
fn prediction_flow_tests_acquisition_while_uploading_is_busy() {
    let (_file, uri) = fixture_image();
    let source = Arc::new(SyntheticImageSource::new(vec![
        Ok(PickerResponse::Picked { uri: uri.clone() }),
        Ok(PickerResponse::Picked { uri }),
    ]));
    let mut flow = flow_with(
        Arc::new(StaticPermissions::all_granted()),
        source.clone(),
        Arc::new(CountingTransport::new(200, HEALTHY_BODY)),
    );
    flow.pick_image().expect("pick should succeed");
    let _pending = flow.begin_submission().expect("submit should start");

    let err = flow.take_photo().expect_err("camera should be refused mid-upload");
    assert!(matches!(err, AppError::Screen(ScreenError::Busy)));
    assert_eq!(source.launches(), 1);
    assert!(flow.screen().is_uploading());
}

#[test]
fn prediction_flow_tests_submit_without_image_raises_notice() {
    let transport = Arc::new(CountingTransport::new(200, HEALTHY_BODY));
    let mut flow = flow_with(
        Arc::new(StaticPermissions::all_granted()),
        Arc::new(SyntheticImageSource::default()),
        transport.clone(),
    );

    let err = flow.submit().expect_err("submit should be rejected");
    assert!(matches!(err, AppError::Screen(ScreenError::NoImage)));
    assert_eq!(transport.request_count(), 0);
    assert_eq!(flow.screen().state(), &ScreenState::Idle);
    assert_eq!(
        flow.screen().notice().map(|notice| notice.message.as_str()),
        Some("Please pick an image first.")
    );
}

#[test]
fn prediction_flow_tests_cancelled_picker_keeps_previous_image() {
    let (_file, uri) = fixture_image();
    let source = Arc::new(SyntheticImageSource::new(vec![
        Ok(PickerResponse::Picked { uri }),
        Ok(PickerResponse::Cancelled),
    ]));
    let mut flow = flow_with(
        Arc::new(StaticPermissions::all_granted()),
        source,
        Arc::new(CountingTransport::new(200, HEALTHY_BODY)),
    );

    flow.pick_image().expect("pick should succeed");
    let first = flow.screen().image().cloned();
    flow.pick_image().expect("cancel should be accepted");

    assert_eq!(flow.screen().image().cloned(), first);
    assert_eq!(flow.screen().state(), &ScreenState::ImageSelected);
    assert!(flow.screen().notice().is_none());
}

#[test]
fn prediction_flow_tests_camera_failure_raises_notice() {
    let source = Arc::new(SyntheticImageSource::new(vec![Err(
        CaptureError::Unavailable("no camera".to_string()),
    )]));
    let mut flow = flow_with(
        Arc::new(StaticPermissions::all_granted()),
        source,
        Arc::new(CountingTransport::new(200, HEALTHY_BODY)),
    );

    flow.take_photo().expect("failure is reported through a notice");
    assert_eq!(flow.screen().state(), &ScreenState::Idle);
    assert_eq!(
        flow.screen().notice().map(|notice| notice.message.as_str()),
        Some("Could not open camera.")
    );
}

#[test]
fn prediction_flow_tests_server_error_moves_to_failed_with_message() {
    let (_file, uri) = fixture_image();
    let mut flow = flow_with(
        Arc::new(StaticPermissions::all_granted()),
        Arc::new(SyntheticImageSource::picking(uri)),
        Arc::new(CountingTransport::new(500, r#"{"error":"model not loaded"}"#)),
    );
    flow.pick_image().expect("pick should succeed");

    assert_eq!(flow.submit().expect("submit should start"), Completion::Applied);
    assert_eq!(
        flow.screen().state(),
        &ScreenState::Failed(SubmitError::Server {
            status: 500,
            message: "model not loaded".to_string(),
        })
    );
    assert_eq!(
        flow.screen().notice().map(|notice| notice.message.as_str()),
        Some("model not loaded")
    );
    assert!(flow.screen().can_submit());
}
