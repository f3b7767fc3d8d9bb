use axum::{
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use common::{metrics::encode_metrics, types::Health};

use crate::auth::authenticate;
use crate::openapi::ApiDoc;
use crate::state::ServerState;
use crate::timing::request_timing;

pub mod accounts;
pub mod auth;
pub mod me;

#[utoipa::path(get, path = "/health", tag = "health",
    responses((status = 200, description = "Service is up", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn metrics() -> impl IntoResponse {
    encode_metrics()
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the full application router.
pub fn build_router(state: ServerState) -> Router {
    let ops = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api-docs/openapi.json", get(openapi_json));

    let session = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/login/", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/logout/", post(auth::logout))
        .route("/me", get(me::me))
        .route("/me/", get(me::me));

    let account_routes = Router::new()
        .route("/accounts", get(accounts::list).post(accounts::create))
        .route("/accounts/", get(accounts::list).post(accounts::create))
        .route(
            "/accounts/:id",
            get(accounts::retrieve)
                .put(accounts::update)
                .patch(accounts::partial_update)
                .delete(accounts::destroy),
        )
        .route(
            "/accounts/:id/",
            get(accounts::retrieve)
                .put(accounts::update)
                .patch(accounts::partial_update)
                .delete(accounts::destroy),
        );

    ops.merge(session)
        .merge(account_routes)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(middleware::from_fn(request_timing))
        .with_state(state)
        .layer(CorsLayer::very_permissive())
        .layer(
            TraceLayer::new_for_http()
                // one INFO span per request carrying method and path
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // status and latency on the way out
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 5xx and friends at ERROR
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
