//! Integration tests for log redaction.

use smart_leaf_app::redact_sensitive;

#[test]
fn log_redaction_tests_removes_password_values() {
    let redacted = redact_sensitive("login email=ada@example.test password=hunter22");

    assert!(redacted.contains("<redacted>"));
    assert!(!redacted.contains("hunter22"));
    assert!(redacted.starts_with("login email=ada@example.test"));
}

#[test]
fn log_redaction_tests_removes_authorization_headers() {
    let redacted = redact_sensitive("Authorization=Bearer abc123");

    assert!(!redacted.contains("abc123"));
}

#[test]
fn log_redaction_tests_leaves_plain_text_alone() {
    assert_eq!(
        redact_sensitive("predict Tomato___healthy 91.25"),
        "predict Tomato___healthy 91.25"
    );
}

#[test]
fn log_redaction_tests_keeps_text_after_the_secret() {
    let redacted = redact_sensitive("password=x; retry later, token: abc&user=ada");

    assert_eq!(
        redacted,
        "password=<redacted>; retry later, token=<redacted>&user=ada"
    );
}
