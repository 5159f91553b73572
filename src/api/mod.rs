// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum::{extract::DefaultBodyLimit, http::StatusCode, routing::get, Json, Router};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::state::AppState;

pub mod health;
pub mod proxy;

/// Largest accepted request body, in bytes.
pub const MAX_BODY_BYTES: usize = 1_000_000;

/// Build the proxy router. Any request not matched by a health or docs
/// route is a node API call. Requests outliving `request_timeout` get 503.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/api-doc/openapi.json", get(openapi))
        .fallback(proxy::handle)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::SERVICE_UNAVAILABLE,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        proxy::handle,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            proxy::AttachResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Node API", description = "IOTA node commands, attachToTangle answered locally"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
