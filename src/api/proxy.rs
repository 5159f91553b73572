// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::dispatcher::{Dispatched, ProxyRequest};
use crate::error::ApiError;
use crate::state::AppState;

/// Successful local `attachToTangle` result.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttachResponse {
    /// Finalized transaction trytes, ascending by `currentIndex`.
    pub trytes: Vec<String>,
}

/// Node API entry point.
///
/// `attachToTangle` is answered locally when local PoW is enabled; every
/// other command is relayed to the remote node unchanged.
#[utoipa::path(
    post,
    path = "/",
    tag = "Node API",
    request_body(content = String, description = "IOTA node API command", content_type = "application/json"),
    responses(
        (status = 200, description = "Command result", body = AttachResponse),
        (status = 400, description = "Invalid JSON or attachToTangle parameters", body = String, content_type = "text/plain"),
        (status = 404, description = "Remote node unreachable", body = String, content_type = "text/plain"),
        (status = 503, description = "Proof-of-work interrupted or unavailable", body = String, content_type = "text/plain")
    )
)]
pub async fn handle(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let request = ProxyRequest::parse(method, path, &headers, body)
        .ok_or_else(|| ApiError::bad_request("error: invalid JSON"))?;

    match state.dispatcher.dispatch(request).await? {
        Dispatched::Attached(trytes) => attached_response(trytes),
        Dispatched::Relayed(relayed) => {
            let mut builder = Response::builder().status(relayed.status);
            if let Some(content_type) = relayed.content_type {
                builder = builder.header(CONTENT_TYPE, content_type);
            }
            builder
                .body(Body::from(relayed.body))
                .map_err(|e| ApiError::internal(e.to_string()))
        }
    }
}

fn attached_response(trytes: Vec<String>) -> Result<Response, ApiError> {
    let body = serde_json::to_string_pretty(&AttachResponse { trytes })
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok((StatusCode::OK, [(CONTENT_TYPE, "application/json")], body).into_response())
}
