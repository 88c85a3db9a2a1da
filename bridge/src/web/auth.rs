//! Admin authentication
//!
//! Admin routes (settings, editor page, admin-scope tokens) require the
//! admin token when `server.admin_token` is set, either as
//! `Authorization: Bearer <token>` or as the password of HTTP Basic
//! credentials (any user name). Rejections carry a Basic challenge so a
//! browser prompts for it. With no token configured every request is
//! allowed, which suits a bridge bound to localhost.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine;

use super::state::AppState;

const CHALLENGE: &str = r#"Basic realm="immich-bridge", charset="UTF-8""#;

/// Whether `headers` carry the expected admin token
pub fn is_authorized(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected.filter(|t| !t.is_empty()) else {
        return true;
    };

    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return false;
    };

    if let Some(token) = value.strip_prefix("Bearer ") {
        return token.trim() == expected;
    }
    value
        .strip_prefix("Basic ")
        .and_then(basic_password)
        .is_some_and(|password| password == expected)
}

/// Password half of `base64(user:password)`
fn basic_password(encoded: &str) -> Option<String> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    credentials
        .split_once(':')
        .map(|(_, password)| password.to_string())
}

/// 401 with a Basic challenge
pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE))],
    )
        .into_response()
}

/// Middleware guarding the admin routes
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let expected = state.config.server.admin_token.as_deref();
    if is_authorized(expected, request.headers()) {
        return next.run(request).await;
    }

    tracing::warn!("Rejected admin request for {}", request.uri().path());
    unauthorized()
}
