//! Lambda Runtime API HTTP endpoints.
//!
//! Implements the Lambda Runtime API as documented at:
//! <https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html>
//!
//! Result endpoints are served both with and without a trailing slash, and
//! every post is recorded byte-for-byte before it is acknowledged.

use crate::invocation::{PostKind, RecordedPost};
use crate::state::{PostOutcome, RuntimeState};
use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use std::sync::Arc;

/// Shared state for Runtime API endpoints.
#[derive(Clone)]
pub(crate) struct RuntimeApiState {
    pub runtime: Arc<RuntimeState>,
}

/// Creates the Runtime API router.
pub(crate) fn create_runtime_api_router(state: RuntimeApiState) -> Router {
    Router::new()
        .route("/2018-06-01/runtime/invocation/next", get(next_invocation))
        .route(
            "/2018-06-01/runtime/invocation/{request_id}/response",
            post(invocation_response),
        )
        .route(
            "/2018-06-01/runtime/invocation/{request_id}/response/",
            post(invocation_response),
        )
        .route(
            "/2018-06-01/runtime/invocation/{request_id}/error",
            post(invocation_error),
        )
        .route(
            "/2018-06-01/runtime/invocation/{request_id}/error/",
            post(invocation_error),
        )
        .route("/2018-06-01/runtime/init/error", post(init_error))
        .with_state(state)
        .fallback(|uri: Uri| async move {
            tracing::warn!(%uri, "Unhandled request");
            StatusCode::NOT_FOUND
        })
}

/// GET /2018-06-01/runtime/invocation/next
///
/// Long-polls until an invocation is queued, then serves it with its
/// scripted faults applied.
async fn next_invocation(State(state): State<RuntimeApiState>) -> Response {
    let invocation = state.runtime.next_invocation().await;

    if let Some(status) = invocation.faults.next_status {
        tracing::debug!(
            request_id = %invocation.request_id,
            status,
            "Serving scripted next-invocation status"
        );
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return status.into_response();
    }

    let mut headers = HeaderMap::new();
    for (name, value) in invocation.response_headers() {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) else {
            tracing::error!(header = %name, "Scripted header is not representable");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create header {}", name),
            )
                .into_response();
        };
        headers.insert(name, value);
    }

    tracing::debug!(request_id = %invocation.request_id, "Delivered invocation");

    (StatusCode::OK, headers, invocation.payload).into_response()
}

/// POST /2018-06-01/runtime/invocation/{request_id}/response
async fn invocation_response(
    State(state): State<RuntimeApiState>,
    Path(request_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record_result(&state, PostKind::Response, request_id, uri, headers, body).await
}

/// POST /2018-06-01/runtime/invocation/{request_id}/error
async fn invocation_error(
    State(state): State<RuntimeApiState>,
    Path(request_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record_result(&state, PostKind::Error, request_id, uri, headers, body).await
}

async fn record_result(
    state: &RuntimeApiState,
    kind: PostKind,
    request_id: String,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let post = RecordedPost {
        kind,
        request_id: Some(request_id.clone()),
        path: uri.path().to_string(),
        headers,
        body,
        status: 0,
        received_at: Utc::now(),
    };

    match state.runtime.record_result(post).await {
        PostOutcome::Accepted(_) => StatusCode::ACCEPTED.into_response(),
        PostOutcome::Faulted(status) => StatusCode::from_u16(status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        PostOutcome::Unknown => (
            StatusCode::NOT_FOUND,
            format!("Unknown request ID: {}", request_id),
        )
            .into_response(),
        PostOutcome::Duplicate => (
            StatusCode::BAD_REQUEST,
            "Response already submitted for this invocation",
        )
            .into_response(),
    }
}

/// POST /2018-06-01/runtime/init/error
async fn init_error(
    State(state): State<RuntimeApiState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let post = RecordedPost {
        kind: PostKind::InitError,
        request_id: None,
        path: uri.path().to_string(),
        headers,
        body,
        status: StatusCode::ACCEPTED.as_u16(),
        received_at: Utc::now(),
    };
    state.runtime.record_post(post).await;

    StatusCode::ACCEPTED.into_response()
}
