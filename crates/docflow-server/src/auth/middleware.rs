//! Identity middleware
//!
//! Identity is verified upstream (gateway or proxy) and forwarded as trusted
//! headers. This layer only lifts them into a [`CallerIdentity`] extension.

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use docflow::CallerIdentity;

pub const SUBJECT_HEADER: &str = "x-auth-subject";
pub const EMAIL_HEADER: &str = "x-auth-email";
pub const NAME_HEADER: &str = "x-auth-name";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Identity middleware
pub async fn identity_middleware(mut request: Request<Body>, next: Next) -> Response {
    let headers = request.headers();
    let Some(subject) = header_value(headers, SUBJECT_HEADER) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "code": "UNAUTHENTICATED",
                "message": "Missing caller identity"
            })),
        )
            .into_response();
    };

    let caller = CallerIdentity {
        subject,
        email: header_value(headers, EMAIL_HEADER),
        display_name: header_value(headers, NAME_HEADER),
    };
    request.extensions_mut().insert(caller);
    next.run(request).await
}
