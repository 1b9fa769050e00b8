mod common;
mod http_helpers;

use axum::http::StatusCode;
use common::{TestApp, login, read_json, seeded_app};
use http_helpers::{auth_json_request, auth_request};
use tower::ServiceExt;

/// Create a role with the named permissions and a user holding only that
/// role, then log the user in. Returns (role id, user token).
async fn user_with_permissions(app: &TestApp, role_name: &str, grants: &[&str]) -> (String, String) {
    let perms = auth_request("GET", "/v1/permissions?per_page=100", &app.admin_token);
    let response = app.api.clone().oneshot(perms).await.expect("perms");
    let payload = read_json(response).await;
    let permission_ids: Vec<String> = payload["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|item| grants.contains(&item["name"].as_str().unwrap()))
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(permission_ids.len(), grants.len(), "all grants must exist");

    let create_role = auth_json_request(
        "POST",
        "/v1/roles",
        &app.admin_token,
        serde_json::json!({ "name": role_name, "permissions": permission_ids }),
    );
    let response = app.api.clone().oneshot(create_role).await.expect("role");
    assert_eq!(response.status(), StatusCode::CREATED);
    let role = read_json(response).await;
    let role_id = role["id"].as_str().unwrap().to_string();

    let email = format!("{role_name}@corp.test");
    let create_user = auth_json_request(
        "POST",
        "/v1/users",
        &app.admin_token,
        serde_json::json!({
            "name": role_name,
            "email": email,
            "password": "secret",
            "password_confirmation": "secret",
            "roles": [role_id]
        }),
    );
    let response = app.api.clone().oneshot(create_user).await.expect("user");
    assert_eq!(response.status(), StatusCode::CREATED);

    let token = login(&app.api, &email, "secret").await;
    (role_id, token)
}

#[tokio::test]
async fn routes_reject_callers_without_the_declared_permission() {
    let app = seeded_app().await;
    let (_, token) = user_with_permissions(&app, "roles-only", &["roles.index"]).await;

    // Granted: the roles resource opens on any roles.* permission.
    let allowed = auth_request("GET", "/v1/roles", &token);
    let response = app.api.clone().oneshot(allowed).await.expect("roles");
    assert_eq!(response.status(), StatusCode::OK);

    // Everything else is rejected before any service logic runs. The create
    // body is deliberately valid: the guard must cut the request off first.
    for request in [
        auth_request("GET", "/v1/users", &token),
        auth_json_request(
            "POST",
            "/v1/users",
            &token,
            serde_json::json!({
                "name": "Eve",
                "email": "eve@corp.test",
                "password": "secret",
                "password_confirmation": "secret",
                "roles": []
            }),
        ),
        auth_request("GET", "/v1/permissions", &token),
    ] {
        let uri = request.uri().to_string();
        let response = app.api.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "uri: {uri}");
        let payload = read_json(response).await;
        assert_eq!(payload["code"], "forbidden");
    }

    // Dashboard needs authentication only.
    let dashboard = auth_request("GET", "/v1/dashboard", &token);
    let response = app.api.clone().oneshot(dashboard).await.expect("dashboard");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn any_of_gate_accepts_each_resource_permission() {
    let app = seeded_app().await;
    let (_, token) = user_with_permissions(&app, "role-editor", &["roles.edit"]).await;

    // roles.edit alone opens the roles listing (resource-style gate).
    let allowed = auth_request("GET", "/v1/roles", &token);
    let response = app.api.clone().oneshot(allowed).await.expect("roles");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn permission_changes_take_effect_without_a_new_token() {
    let app = seeded_app().await;
    let (role_id, token) = user_with_permissions(&app, "grower", &["roles.index"]).await;

    let denied = auth_request("GET", "/v1/users", &token);
    let response = app.api.clone().oneshot(denied).await.expect("users");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admin grants users.index to the role; the same token now passes.
    let perms = auth_request("GET", "/v1/permissions?per_page=100", &app.admin_token);
    let response = app.api.clone().oneshot(perms).await.expect("perms");
    let payload = read_json(response).await;
    let wanted: Vec<String> = payload["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|item| {
            let name = item["name"].as_str().unwrap();
            name == "roles.index" || name == "users.index"
        })
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect();
    let update = auth_json_request(
        "PUT",
        &format!("/v1/roles/{role_id}"),
        &app.admin_token,
        serde_json::json!({ "name": "grower", "permissions": wanted }),
    );
    let response = app.api.clone().oneshot(update).await.expect("update");
    assert_eq!(response.status(), StatusCode::OK);

    let allowed = auth_request("GET", "/v1/users", &token);
    let response = app.api.clone().oneshot(allowed).await.expect("users");
    assert_eq!(response.status(), StatusCode::OK);

    // Revoking flips it straight back. The listing sorts by name, so the
    // first retained id is roles.index.
    let revoke = auth_json_request(
        "PUT",
        &format!("/v1/roles/{role_id}"),
        &app.admin_token,
        serde_json::json!({ "name": "grower", "permissions": [wanted[0]] }),
    );
    let response = app.api.clone().oneshot(revoke).await.expect("revoke");
    assert_eq!(response.status(), StatusCode::OK);

    let denied = auth_request("GET", "/v1/users", &token);
    let response = app.api.clone().oneshot(denied).await.expect("users");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn union_across_multiple_roles() {
    let app = seeded_app().await;
    let (_, _indexer_token) = user_with_permissions(&app, "indexer", &["roles.index"]).await;

    // Second role carrying permissions.index; assign both to a fresh user.
    let (perm_role_id, _) =
        user_with_permissions(&app, "perm-viewer", &["permissions.index"]).await;
    let roles_list = auth_request("GET", "/v1/roles?per_page=100", &app.admin_token);
    let response = app.api.clone().oneshot(roles_list).await.expect("roles");
    let payload = read_json(response).await;
    let indexer_role_id = payload["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|item| item["name"] == "indexer")
        .map(|item| item["id"].as_str().unwrap().to_string())
        .expect("indexer role");

    let create_user = auth_json_request(
        "POST",
        "/v1/users",
        &app.admin_token,
        serde_json::json!({
            "name": "Both",
            "email": "both@corp.test",
            "password": "secret",
            "password_confirmation": "secret",
            "roles": [indexer_role_id, perm_role_id]
        }),
    );
    let response = app.api.clone().oneshot(create_user).await.expect("user");
    assert_eq!(response.status(), StatusCode::CREATED);
    let both_token = login(&app.api, "both@corp.test", "secret").await;

    // The union of both roles opens both screens.
    for uri in ["/v1/roles", "/v1/permissions"] {
        let request = auth_request("GET", uri, &both_token);
        let response = app.api.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK, "uri: {uri}");
    }
    let users = auth_request("GET", "/v1/users", &both_token);
    let response = app.api.clone().oneshot(users).await.expect("users");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
