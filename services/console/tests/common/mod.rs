#![allow(dead_code)]
use axum::body::Body;
use axum::http::{Request, StatusCode};
use console::api::types::FeatureFlags;
use console::app::{AppState, build_router};
use console::auth::keys::keys_from_seed;
use console::auth::password::hash_password;
use console::store::{AdminStore, RbacSeed, memory::InMemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "password";

pub type TestService = axum::routing::RouterIntoService<Body, ()>;

/// Router plus direct store access for test fixtures.
pub struct TestApp {
    pub api: TestService,
    pub store: Arc<InMemoryStore>,
    pub admin_token: String,
    pub admin_id: Uuid,
}

pub fn test_state(store: Arc<InMemoryStore>) -> AppState {
    AppState {
        api_version: "v1".to_string(),
        features: FeatureFlags {
            durable_storage: false,
        },
        store,
        signing_keys: Arc::new(keys_from_seed(&[11u8; 32])),
        token_ttl: Duration::from_secs(3600),
        bootstrap_enabled: false,
        bootstrap_token: None,
    }
}

/// Seed an in-memory store with the full catalog, an `admin` role holding
/// every permission, and an administrator account, then log in through the
/// API so tests drive the real token path.
pub async fn seeded_app() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let outcome = store
        .seed_rbac(RbacSeed {
            permissions: console::auth::rbac::catalog()
                .into_iter()
                .map(str::to_string)
                .collect(),
            role_name: "admin".to_string(),
            role_permissions: console::auth::rbac::catalog()
                .into_iter()
                .map(str::to_string)
                .collect(),
            admin_name: "Administrator".to_string(),
            admin_email: ADMIN_EMAIL.to_string(),
            admin_password_hash: hash_password(ADMIN_PASSWORD).expect("hash"),
        })
        .await
        .expect("seed");

    let api = build_router(test_state(store.clone())).into_service();
    let admin_token = login(&api, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    TestApp {
        api,
        store,
        admin_token,
        admin_id: outcome.admin_id,
    }
}

/// Log in through the API and return the bearer token.
pub async fn login(api: &TestService, email: &str, password: &str) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({ "email": email, "password": password }).to_string(),
        ))
        .expect("request");
    let response = api.clone().oneshot(request).await.expect("login");
    assert_eq!(response.status(), StatusCode::OK, "login should succeed");
    let payload = read_json(response).await;
    payload["token"].as_str().expect("token").to_string()
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}
