//! Document API: upload, list, share, capability re-issue, delete

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Extension, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;

use super::{ApiJson, ApiPath, AppState};
use crate::error::{DocflowError, DocflowResult};
use crate::models::{DocumentMetadata, DocumentSummary, ETag, ShareRequest};
use crate::services::Upload;
use crate::storage::Capability;
use crate::CallerIdentity;

/// Room for multipart boundaries and the text fields next to the file
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub(super) fn upload_body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_add(MULTIPART_OVERHEAD)
}

pub fn document_routes(upload_limit: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/documents/upload",
            post(upload_doc).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/documents", get(list_docs))
        .route("/documents/{id}", delete(delete_doc))
        .route("/documents/{id}/share", post(share_doc))
        .route("/documents/{id}/capability", post(issue_capability))
}

#[derive(Serialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<DocumentSummary>,
}

#[derive(Serialize)]
struct OkResponse {
    ok: bool,
}

async fn upload_doc(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    mut multipart: Multipart,
) -> DocflowResult<impl IntoResponse> {
    let max = state.workflow.config().max_upload_bytes;
    let mut upload = Upload::default();
    let mut fields = BTreeMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            upload.file_name = field.file_name().unwrap_or("unknown").to_string();
            upload.mime_type = field.content_type().map(|ct| ct.to_string());
            let bytes = field.bytes().await.map_err(|e| multipart_error(e, max))?;
            upload.bytes = Some(bytes.to_vec());
        } else if !name.is_empty() {
            let text = field.text().await.map_err(|e| multipart_error(e, max))?;
            fields.insert(name, text);
        }
    }

    let metadata = DocumentMetadata::from_form(&fields)?;
    let id = state.workflow.ingest(upload, metadata, &caller).await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

fn multipart_error(err: MultipartError, max: usize) -> DocflowError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        DocflowError::PayloadTooLarge {
            size: upload_body_limit(max),
            max,
        }
    } else {
        DocflowError::field("file", err.body_text())
    }
}

async fn list_docs(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
) -> DocflowResult<Json<DocumentsResponse>> {
    let documents = state.workflow.list_owned(&caller).await?;
    Ok(Json(DocumentsResponse { documents }))
}

async fn share_doc(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    ApiPath(id): ApiPath<String>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<ShareRequest>,
) -> DocflowResult<impl IntoResponse> {
    let if_match = if_match(&headers)?;
    let outcome = state
        .workflow
        .share(&id, req, &caller, if_match.as_ref())
        .await?;
    Ok(Json(outcome))
}

/// `If-Match` as an ETag; absent or `*` means no precondition.
fn if_match(headers: &HeaderMap) -> DocflowResult<Option<ETag>> {
    let Some(value) = headers.get(header::IF_MATCH) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| DocflowError::field("If-Match", "Malformed ETag"))?;
    if value.trim() == "*" {
        return Ok(None);
    }
    ETag::parse(value)
        .map(Some)
        .ok_or_else(|| DocflowError::field("If-Match", "Malformed ETag"))
}

async fn issue_capability(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    ApiPath(id): ApiPath<String>,
) -> DocflowResult<Json<Capability>> {
    let capability = state.workflow.issue_capability(&id, &caller).await?;
    Ok(Json(capability))
}

async fn delete_doc(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    ApiPath(id): ApiPath<String>,
) -> DocflowResult<Json<OkResponse>> {
    state.workflow.teardown(&id, &caller).await?;
    Ok(Json(OkResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::routes::testing::{app, app_for, json_body};
    use crate::services::testing::owner;

    const BOUNDARY: &str = "docflow-test-boundary";

    fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, content_type, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/documents/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_creates_document() {
        let (h, app) = app(owner());
        let body = multipart_body(
            &[
                ("title", "Budget.pdf"),
                ("sector", "Finance"),
                ("tags", r#"["q3"]"#),
            ],
            Some(("budget.pdf", "application/pdf", &[5u8; 2048])),
        );

        let response = app.oneshot(upload_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let id = json_body(response).await["id"].as_str().unwrap().to_string();
        let doc = h.catalog.document(&id).unwrap();
        assert_eq!(doc.file_size, 2048);
        assert_eq!(doc.tags, vec!["q3"]);
        assert_eq!(doc.mime_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_upload_validation_error_has_field_details() {
        let (h, app) = app(owner());
        let body = multipart_body(
            &[("sector", "Finance")],
            Some(("a.txt", "text/plain", b"hello")),
        );

        let response = app.oneshot(upload_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert!(json["details"]["title"].is_array());
        assert_eq!(h.objects.put_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_without_file() {
        let (_h, app) = app(owner());
        let body = multipart_body(&[("title", "Plan"), ("sector", "Ops")], None);

        let response = app.oneshot(upload_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "MISSING_PAYLOAD");
    }

    #[tokio::test]
    async fn test_share_list_and_delete() {
        let (h, app) = app(owner());
        let doc_id = h
            .workflow
            .ingest(
                Upload::new(vec![1; 8], "plan.pdf"),
                DocumentMetadata::new("Plan", "Operations"),
                &owner(),
            )
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                &format!("/api/documents/{doc_id}/share"),
                serde_json::json!({
                    "department": "Engineering",
                    "employeeIds": ["E1", "E2", "E9"],
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["projectIds"].as_array().unwrap().len(), 2);
        assert_eq!(json["sharedWith"].as_array().unwrap().len(), 2);
        assert_eq!(json["sharedWith"][0]["name"], "Asha Rao");
        assert!(!json.to_string().contains("E9"));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/documents")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json["documents"][0]["id"], doc_id.as_str());
        assert_eq!(json["documents"][0]["sharedDepartment"], "Engineering");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(format!("/api/documents/{doc_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["ok"], true);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(format!("/api/documents/{doc_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_share_body_is_validation_error() {
        let (h, app) = app(owner());
        let doc_id = h
            .workflow
            .ingest(
                Upload::new(vec![1], "plan.pdf"),
                DocumentMetadata::new("Plan", "Operations"),
                &owner(),
            )
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                &format!("/api/documents/{doc_id}/share"),
                serde_json::json!({ "department": "Engineering", "employeeIds": "E1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let json = json_body(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert!(json["details"]["body"].is_array());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(format!("/api/documents/{doc_id}/share"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "VALIDATION_ERROR");
        assert!(h.catalog.assignments().is_empty());
    }

    #[tokio::test]
    async fn test_share_with_stale_if_match() {
        let (h, app) = app(owner());
        let doc_id = h
            .workflow
            .ingest(
                Upload::new(vec![1], "plan.pdf"),
                DocumentMetadata::new("Plan", "Operations"),
                &owner(),
            )
            .await
            .unwrap();

        let mut request = json_request(
            Method::POST,
            &format!("/api/documents/{doc_id}/share"),
            serde_json::json!({ "department": "Engineering", "employeeIds": ["E1"] }),
        );
        request
            .headers_mut()
            .insert(header::IF_MATCH, "W/\"5\"".parse().unwrap());

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(h.catalog.assignments().is_empty());
    }

    #[tokio::test]
    async fn test_non_owner_cannot_delete() {
        let (h, _) = app(owner());
        let doc_id = h
            .workflow
            .ingest(
                Upload::new(vec![1], "plan.pdf"),
                DocumentMetadata::new("Plan", "Operations"),
                &owner(),
            )
            .await
            .unwrap();
        let intruder = app_for(&h, CallerIdentity::new("U2"));

        let response = intruder
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(format!("/api/documents/{doc_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["code"], "FORBIDDEN");
        assert!(h.catalog.document(&doc_id).is_some());
    }
}
