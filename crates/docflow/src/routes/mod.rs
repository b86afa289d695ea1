//! Routes module - HTTP API endpoints
//!
//! Document routes expect a [`CallerIdentity`] request extension, inserted by
//! the embedding server's identity middleware. Blob routes are public and
//! authorized by the capability signature alone.

pub mod blobs;
pub mod documents;

use axum::extract::FromRequest;
use axum::extract::FromRequestParts;
use axum::Router;
use std::sync::Arc;

use crate::error::DocflowError;
use crate::services::DocumentWorkflow;

pub use crate::CallerIdentity;

/// Shared state for all document workflow routes
#[derive(Clone)]
pub struct AppState {
    pub workflow: DocumentWorkflow,
}

impl AppState {
    pub fn new(workflow: DocumentWorkflow) -> Self {
        Self { workflow }
    }
}

/// JSON body whose rejections are reported as validation errors
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(DocflowError))]
pub struct ApiJson<T>(pub T);

/// Path parameters whose rejections are reported as validation errors
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(DocflowError))]
pub struct ApiPath<T>(pub T);

/// Routes that require a caller identity
pub fn configure(state: Arc<AppState>) -> Router {
    let upload_limit = documents::upload_body_limit(state.workflow.config().max_upload_bytes);
    documents::document_routes(upload_limit).with_state(state)
}

/// Capability-authorized routes
pub fn public_routes(state: Arc<AppState>) -> Router {
    blobs::blob_routes().with_state(state)
}
