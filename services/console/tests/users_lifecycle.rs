mod common;
mod http_helpers;

use axum::http::StatusCode;
use common::{TestApp, login, read_json, seeded_app};
use http_helpers::{auth_json_request, auth_request};
use tower::ServiceExt;

async fn admin_role_id(app: &TestApp) -> String {
    let request = auth_request("GET", "/v1/roles", &app.admin_token);
    let response = app.api.clone().oneshot(request).await.expect("roles");
    let payload = read_json(response).await;
    payload["items"][0]["id"].as_str().expect("id").to_string()
}

#[tokio::test]
async fn create_user_validates_fields() {
    let app = seeded_app().await;
    let role_id = admin_role_id(&app).await;

    // Confirmation mismatch, bad email shape, and empty roles all surface as
    // field-level messages in one response.
    let invalid = auth_json_request(
        "POST",
        "/v1/users",
        &app.admin_token,
        serde_json::json!({
            "name": "",
            "email": "not-an-email",
            "password": "secret",
            "password_confirmation": "different",
            "roles": []
        }),
    );
    let response = app.api.clone().oneshot(invalid).await.expect("invalid");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json(response).await;
    let errors = &payload["errors"];
    assert!(errors["name"].is_array());
    assert!(errors["email"].is_array());
    assert!(errors["password"].is_array());
    assert!(errors["roles"].is_array());

    // Unknown role ids fail validation, not 404.
    let ghost_role = auth_json_request(
        "POST",
        "/v1/users",
        &app.admin_token,
        serde_json::json!({
            "name": "Alice",
            "email": "alice@corp.test",
            "password": "secret",
            "password_confirmation": "secret",
            "roles": [uuid::Uuid::new_v4()]
        }),
    );
    let response = app.api.clone().oneshot(ghost_role).await.expect("ghost");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let valid = auth_json_request(
        "POST",
        "/v1/users",
        &app.admin_token,
        serde_json::json!({
            "name": "Alice",
            "email": "alice@corp.test",
            "password": "secret",
            "password_confirmation": "secret",
            "roles": [role_id]
        }),
    );
    let response = app.api.clone().oneshot(valid).await.expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    assert_eq!(created["name"], "Alice");
    assert_eq!(created["roles"][0]["name"], "admin");
    assert!(created.get("password_hash").is_none());

    let duplicate = auth_json_request(
        "POST",
        "/v1/users",
        &app.admin_token,
        serde_json::json!({
            "name": "Alice Again",
            "email": "ALICE@corp.test",
            "password": "secret",
            "password_confirmation": "secret",
            "roles": [role_id]
        }),
    );
    let response = app.api.clone().oneshot(duplicate).await.expect("dup");
    // Case-insensitive unique email.
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn update_user_syncs_roles_and_keeps_password() {
    let app = seeded_app().await;
    let role_id = admin_role_id(&app).await;

    let create = auth_json_request(
        "POST",
        "/v1/users",
        &app.admin_token,
        serde_json::json!({
            "name": "Bob",
            "email": "bob@corp.test",
            "password": "secret",
            "password_confirmation": "secret",
            "roles": [role_id]
        }),
    );
    let response = app.api.clone().oneshot(create).await.expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    let id = created["id"].as_str().expect("id").to_string();

    // New role to swap in.
    let perms = auth_request("GET", "/v1/permissions", &app.admin_token);
    let response = app.api.clone().oneshot(perms).await.expect("perms");
    let perms = read_json(response).await;
    let new_role = auth_json_request(
        "POST",
        "/v1/roles",
        &app.admin_token,
        serde_json::json!({
            "name": "viewer",
            "permissions": [perms["items"][0]["id"]]
        }),
    );
    let response = app.api.clone().oneshot(new_role).await.expect("role");
    let viewer = read_json(response).await;
    let viewer_id = viewer["id"].as_str().expect("id").to_string();

    let update = auth_json_request(
        "PUT",
        &format!("/v1/users/{id}"),
        &app.admin_token,
        serde_json::json!({
            "name": "Robert",
            "email": "bob@corp.test",
            "password": null,
            "password_confirmation": null,
            "roles": [viewer_id]
        }),
    );
    let response = app.api.clone().oneshot(update).await.expect("update");
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await;
    assert_eq!(updated["name"], "Robert");
    // Replacement, not merge: admin role gone, viewer role in.
    let roles = updated["roles"].as_array().unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0]["name"], "viewer");

    // Password untouched: the old one still logs in.
    let token = login(&app.api, "bob@corp.test", "secret").await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn soft_delete_restore_and_force_delete() {
    let app = seeded_app().await;
    let role_id = admin_role_id(&app).await;

    let create = auth_json_request(
        "POST",
        "/v1/users",
        &app.admin_token,
        serde_json::json!({
            "name": "Carol",
            "email": "carol@corp.test",
            "password": "secret",
            "password_confirmation": "secret",
            "roles": [role_id]
        }),
    );
    let response = app.api.clone().oneshot(create).await.expect("create");
    let created = read_json(response).await;
    let id = created["id"].as_str().expect("id").to_string();

    // Soft delete: gone from the live listing, present in the trashed one.
    let delete = auth_request("DELETE", &format!("/v1/users/{id}"), &app.admin_token);
    let response = app.api.clone().oneshot(delete).await.expect("delete");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["status"], "deleted");
    assert!(payload.get("redirect").is_none());

    let live = auth_request("GET", "/v1/users?search=carol", &app.admin_token);
    let response = app.api.clone().oneshot(live).await.expect("live");
    let payload = read_json(response).await;
    assert_eq!(payload["meta"]["total"], 0);

    let trashed = auth_request("GET", "/v1/users?trashed=true", &app.admin_token);
    let response = app.api.clone().oneshot(trashed).await.expect("trashed");
    let payload = read_json(response).await;
    assert_eq!(payload["meta"]["total"], 1);
    assert_eq!(payload["items"][0]["deleted_by"], app.admin_id.to_string());

    // Deleted accounts cannot log in.
    let login_attempt = http_helpers::json_request(
        "POST",
        "/v1/auth/login",
        serde_json::json!({ "email": "carol@corp.test", "password": "secret" }),
    );
    let response = app.api.clone().oneshot(login_attempt).await.expect("login");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Deleting again is a 404: the live row no longer exists.
    let delete_again = auth_request("DELETE", &format!("/v1/users/{id}"), &app.admin_token);
    let response = app.api.clone().oneshot(delete_again).await.expect("again");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Restore clears the marker.
    let restore = auth_request("POST", &format!("/v1/users/{id}/restore"), &app.admin_token);
    let response = app.api.clone().oneshot(restore).await.expect("restore");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert!(payload["deleted_at"].is_null());

    let live = auth_request("GET", "/v1/users?search=carol", &app.admin_token);
    let response = app.api.clone().oneshot(live).await.expect("live");
    let payload = read_json(response).await;
    assert_eq!(payload["meta"]["total"], 1);

    // Force delete removes the row entirely.
    let force = auth_request("DELETE", &format!("/v1/users/{id}/force"), &app.admin_token);
    let response = app.api.clone().oneshot(force).await.expect("force");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let missing = auth_request("GET", &format!("/v1/users/{id}"), &app.admin_token);
    let response = app.api.clone().oneshot(missing).await.expect("missing");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn self_delete_invalidates_the_session() {
    let app = seeded_app().await;
    let admin_id = app.admin_id;

    let delete = auth_request("DELETE", &format!("/v1/users/{admin_id}"), &app.admin_token);
    let response = app.api.clone().oneshot(delete).await.expect("delete");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    // Self-delete redirects the client back to login...
    assert_eq!(payload["redirect"], "login");

    // ...and the old token stops working immediately.
    let me = auth_request("GET", "/v1/auth/me", &app.admin_token);
    let response = app.api.clone().oneshot(me).await.expect("me");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = read_json(response).await;
    assert_eq!(payload["message"], "session is no longer valid");
}
