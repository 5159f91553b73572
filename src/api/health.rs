// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::relay::Relay;
use crate::state::AppState;

/// Proxy readiness: "ok", or "degraded" once a local PoW engine has closed.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Always "ok" while the proxy answers.
    pub service: String,
    /// "ok" when attachToTangle is answered locally, "disabled" when it is
    /// relayed by configuration, "unavailable" after the engine has closed.
    pub pow: String,
    /// Nonce search threads of an open engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pow_workers: Option<usize>,
    /// Node URL that relayed commands are sent to.
    pub relay: String,
}

/// Liveness body; the status is always "ok".
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

fn check_pow(state: &AppState) -> (String, Option<usize>) {
    let dispatcher = &state.dispatcher;
    if !dispatcher.local_pow_enabled() {
        return ("disabled".to_string(), None);
    }
    match dispatcher.available_engine() {
        Some(engine) => ("ok".to_string(), Some(engine.workers())),
        None => ("unavailable".to_string(), None),
    }
}

/// PoW engine and relay status; 503 when local PoW is configured but the
/// engine no longer accepts work.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let (pow, pow_workers) = check_pow(&state);
    let all_ok = pow != "unavailable";

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            pow,
            pow_workers,
            relay: state.dispatcher.relay().target(),
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Answers 200 whenever the proxy is up, whatever the engine state.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Same checks as `/health`.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}
