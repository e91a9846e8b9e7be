use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use fbauth_core::{Error, Verifier};
use serde_json::json;

/// Verifies the request's bearer token and attaches the caller's
/// [`fbauth_core::Identity`] to the request extensions.
///
/// Every failure is answered with the same 401; the reason is only logged.
pub async fn auth_middleware<B>(mut req: Request<B>, next: Next<B>) -> Response {
    let verifier = match req.extensions().get::<Arc<Verifier>>() {
        Some(verifier) => verifier.clone(),
        None => {
            tracing::error!("no verifier registered, rejecting request");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let token = match bearer_token(req.headers()) {
        Ok(token) => token,
        Err(e) => {
            tracing::debug!(kind = e.kind(), "request has no bearer token");
            return unauthorized();
        }
    };

    match verifier.verify(&token).await {
        Ok(identity) => {
            tracing::trace!(uid = identity.uid.as_str(), "request authenticated");
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(kind = e.kind(), "rejected bearer token");
            unauthorized()
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<String, Error> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(Error::MissingToken)?;

    let (scheme, token) = value.trim().split_once(' ').ok_or(Error::MissingToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(Error::MissingToken);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(Error::MissingToken);
    }

    Ok(token.to_string())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
        Json(json!({
            "result": "failure",
            "message": "unauthorized"
        })),
    )
        .into_response()
}
