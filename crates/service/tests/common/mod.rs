#![allow(dead_code)]

use std::sync::Arc;

use markethub_core::totp;
use markethub_db::{CredentialStore, MemoryStore};
use markethub_service::config::ServiceConfig;
use markethub_service::identity::{AuthSession, LoginOutcome, LoginRequest, RegisterRequest};
use markethub_service::state::AppState;
use markethub_service::two_factor::unix_now;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Build a test `ServiceConfig`: defaults plus a fixed signing secret.
pub fn test_config() -> ServiceConfig {
    ServiceConfig::from_lookup(|name| match name {
        "JWT_SECRET" => Some("test-secret-that-is-long-enough-for-hmac".to_string()),
        _ => None,
    })
    .expect("test config must load")
}

/// Application state over a fresh in-memory store.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

pub fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn CredentialStore> = store.clone();
    TestApp {
        state: AppState::new(dyn_store, test_config()),
        store,
    }
}

impl TestApp {
    pub async fn register(&self, email: &str) -> AuthSession {
        self.state
            .identities
            .register(&RegisterRequest {
                email: email.to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .expect("registration should succeed")
    }

    pub async fn login(&self, email: &str, code: Option<String>) -> LoginOutcome {
        self.state
            .identities
            .authenticate(&LoginRequest {
                email: email.to_string(),
                password: TEST_PASSWORD.to_string(),
                code,
            })
            .await
            .expect("login should succeed")
    }

    /// Register, enroll, and enable 2FA. Returns the identity id and secret.
    pub async fn register_with_two_factor(&self, email: &str) -> (i64, String) {
        let id = self.register(email).await.identity.id;
        let enrollment = self.state.two_factor.enroll(id).await.unwrap();
        self.state
            .two_factor
            .verify(id, &current_code(&enrollment.secret))
            .await
            .unwrap();
        (id, enrollment.secret)
    }
}

/// The code an authenticator app would show right now.
pub fn current_code(secret: &str) -> String {
    totp::code_at(secret, unix_now(), &test_config().totp).unwrap()
}

/// A well-formed code guaranteed not to match any step in the window.
pub fn wrong_code(secret: &str) -> String {
    let config = test_config().totp;
    let now = unix_now();
    let window: Vec<String> = [now - config.step_secs, now, now + config.step_secs]
        .iter()
        .map(|t| totp::code_at(secret, *t, &config).unwrap())
        .collect();
    (0..1_000_000u32)
        .map(|n| format!("{n:06}"))
        .find(|candidate| !window.contains(candidate))
        .unwrap()
}
