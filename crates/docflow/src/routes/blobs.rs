//! Capability redemption: serves a blob to whoever holds a valid signed link

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;

pub fn blob_routes() -> Router<Arc<AppState>> {
    Router::new().route("/blobs/{*path}", get(redeem))
}

#[derive(Debug, Deserialize)]
struct CapabilityQuery {
    expires: i64,
    signature: String,
}

fn reject(status: StatusCode, code: &str, message: &str) -> Response {
    let body = ApiError {
        code: code.to_string(),
        message: message.to_string(),
        details: None,
    };
    (status, Json(body)).into_response()
}

async fn redeem(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    query: Result<Query<CapabilityQuery>, QueryRejection>,
) -> Response {
    let Ok(Query(q)) = query else {
        return reject(
            StatusCode::FORBIDDEN,
            "INVALID_CAPABILITY",
            "Missing capability parameters",
        );
    };

    let objects = state.workflow.objects();
    if !objects.verify_read_capability(&path, q.expires, &q.signature) {
        tracing::debug!("Rejected capability for {}", path);
        return reject(
            StatusCode::FORBIDDEN,
            "INVALID_CAPABILITY",
            "Link is invalid or has expired",
        );
    }

    match objects.get(&path).await {
        Ok(object) => (
            [(header::CONTENT_TYPE, object.content_type)],
            object.bytes,
        )
            .into_response(),
        Err(e) if e.is_not_found() => {
            reject(StatusCode::NOT_FOUND, "NOT_FOUND", "Object not found")
        }
        Err(e) => {
            tracing::error!("Failed to read blob {}: {}", path, e);
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_READ_ERROR",
                "Failed to read object",
            )
        }
    }
}
