//! Integration tests for the session provider login/logout lifecycle.

use std::sync::{Arc, Mutex};

use smart_leaf_auth::{
    AuthError, AuthResponse, AuthSession, AuthTransport, LoginRequest, SessionProvider,
    SessionState, SignupRequest, User,
};

#[derive(Default)]
struct FakeAuthTransport {
    seen: Mutex<Vec<LoginRequest>>,
}

impl AuthTransport for FakeAuthTransport {
    fn login(&self, _endpoint: &str, request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        self.seen
            .lock()
            .expect("request lock should work")
            .push(request.clone());
        match request.password.as_str() {
            "correct-horse" => Ok(AuthResponse {
                message: Some("Login successful".to_string()),
                user: User {
                    id: 1,
                    name: "Grower".to_string(),
                    email: request.email.clone(),
                },
            }),
            "offline" => Err(AuthError::Transport("connection refused".to_string())),
            _ => Err(AuthError::Rejected("Invalid password".to_string())),
        }
    }

    fn signup(&self, _endpoint: &str, request: &SignupRequest) -> Result<AuthResponse, AuthError> {
        Ok(AuthResponse {
            message: None,
            user: User {
                id: 2,
                name: request.name.clone(),
                email: request.email.clone(),
            },
        })
    }
}

fn session(transport: Arc<FakeAuthTransport>) -> AuthSession {
    AuthSession::new(
        "http://127.0.0.1:5000/login",
        "http://127.0.0.1:5000/signup",
        transport,
    )
    .expect("session should build")
}

#[test]
fn session_provider_tests_starts_loading_until_restored() {
    let session = session(Arc::new(FakeAuthTransport::default()));
    assert_eq!(session.state(), SessionState::Loading);

    session.restore(None);
    assert_eq!(session.state(), SessionState::Unauthenticated);
}

#[test]
fn session_provider_tests_login_success_and_logout() {
    let transport = Arc::new(FakeAuthTransport::default());
    let session = session(transport.clone());
    session.restore(None);

    assert_eq!(session.login(" Grower@Farm.TEST ", "correct-horse"), Ok(true));
    let user = session.state().user().cloned().expect("user should be signed in");
    assert_eq!(user.email, "grower@farm.test");

    session.logout();
    assert_eq!(session.state(), SessionState::Unauthenticated);
}

#[test]
fn session_provider_tests_rejection_is_false_not_error() {
    let transport = Arc::new(FakeAuthTransport::default());
    let session = session(transport.clone());
    session.restore(None);

    assert_eq!(session.login("grower@farm.test", "wrong"), Ok(false));
    assert!(matches!(
        session.login("grower@farm.test", "offline"),
        Err(AuthError::Transport(_))
    ));
    assert_eq!(session.state(), SessionState::Unauthenticated);
}

#[test]
fn session_provider_tests_invalid_shape_never_reaches_transport() {
    let transport = Arc::new(FakeAuthTransport::default());
    let session = session(transport.clone());

    assert!(matches!(
        session.login("not-an-email", "pw"),
        Err(AuthError::InvalidInput(_))
    ));
    assert!(transport.seen.lock().expect("request lock should work").is_empty());
}

#[test]
fn session_provider_tests_signup_does_not_sign_in() {
    let session = session(Arc::new(FakeAuthTransport::default()));
    session.restore(None);

    let user = session
        .signup("New Grower", "new@farm.test", "secret1")
        .expect("signup should succeed");
    assert_eq!(user.name, "New Grower");
    assert_eq!(session.state(), SessionState::Unauthenticated);
}
