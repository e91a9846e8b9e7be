use std::sync::Arc;

use axum::{
    handler::Handler,
    http::{StatusCode, Uri},
    middleware,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use fbauth_core::{Identity, Verifier};
use serde_json::json;

use crate::auth;

pub const HEALTH_URI: &str = "/health";
pub const IDENTITY_URI: &str = "/api/v1/identity";

pub fn build(verifier: Arc<Verifier>) -> Router {
    let authenticated = Router::new()
        .route(IDENTITY_URI, get(identity_handler))
        .route_layer(middleware::from_fn(auth::auth_middleware));

    Router::new()
        .route(HEALTH_URI, get(health_handler))
        .merge(authenticated)
        .layer(Extension(verifier))
        .fallback(not_found_handler.into_service())
}

async fn health_handler() -> &'static str {
    "UP"
}

async fn identity_handler(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(identity)
}

async fn not_found_handler(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "result": "failure",
            "message": "not found",
            "uri": uri.to_string()
        })),
    )
}
