//! Console HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! This module centralizes route composition to keep `main` small and testable.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::api::types::FeatureFlags;
use crate::auth;
use crate::auth::token::SigningKeys;
use crate::observability;
use crate::store::AdminStore;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub api_version: String,
    pub features: FeatureFlags,
    pub store: Arc<dyn AdminStore + Send + Sync>,
    pub signing_keys: Arc<SigningKeys>,
    pub token_ttl: Duration,
    pub bootstrap_enabled: bool,
    pub bootstrap_token: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route(
            "/v1/system/info",
            axum::routing::get(api::system::system_info),
        )
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route("/v1/auth/login", axum::routing::post(auth::login::login))
        .route("/v1/auth/me", axum::routing::get(auth::login::me))
        .route(
            "/v1/dashboard",
            axum::routing::get(api::dashboard::dashboard),
        )
        .route(
            "/v1/users",
            axum::routing::get(api::users::list_users).post(api::users::create_user),
        )
        .route(
            "/v1/users/:id",
            axum::routing::get(api::users::get_user)
                .put(api::users::update_user)
                .delete(api::users::delete_user),
        )
        .route(
            "/v1/users/:id/restore",
            axum::routing::post(api::users::restore_user),
        )
        .route(
            "/v1/users/:id/force",
            axum::routing::delete(api::users::force_delete_user),
        )
        .route(
            "/v1/roles",
            axum::routing::get(api::roles::list_roles).post(api::roles::create_role),
        )
        .route(
            "/v1/roles/:id",
            axum::routing::get(api::roles::get_role)
                .put(api::roles::update_role)
                .delete(api::roles::delete_role),
        )
        .route(
            "/v1/permissions",
            axum::routing::get(api::permissions::list_permissions)
                .post(api::permissions::create_permission),
        )
        .route(
            "/v1/permissions/:id",
            axum::routing::put(api::permissions::update_permission)
                .delete(api::permissions::delete_permission),
        )
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}

/// Internal router for the one-shot seed endpoint; bound separately so it can
/// stay off the public listener.
pub fn build_bootstrap_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/internal/bootstrap/initialize",
            axum::routing::post(api::bootstrap::initialize),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
