// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::bundle::AttachError;
use crate::dispatcher::DispatchError;
use crate::pow::PowError;

/// Error returned to API clients as a plain-text body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Attach(attach) => attach.into(),
            // The node being unreachable is reported the way the upstream
            // proxy always has.
            DispatchError::Relay(relay) => {
                error!(error = %relay, "Relay failed");
                Self::not_found("Not Found")
            }
            DispatchError::Internal(message) => {
                error!(%message, "Dispatch failed");
                Self::internal(message)
            }
        }
    }
}

impl From<AttachError> for ApiError {
    fn from(err: AttachError) -> Self {
        let message = err.to_string();
        match err {
            AttachError::InvalidParameter(_)
            | AttachError::BundleOrder
            | AttachError::MalformedTransaction { .. } => Self::bad_request(message),
            AttachError::Pow(PowError::Interrupted | PowError::Unavailable) => {
                Self::unavailable(message)
            }
            AttachError::Pow(PowError::InvalidMagnitude(_) | PowError::Ternary(_)) => {
                Self::bad_request(message)
            }
            AttachError::InvalidPowResult { .. }
            | AttachError::Encoding(_)
            | AttachError::Pow(PowError::Exhausted | PowError::WorkerPool(_)) => {
                error!(error = %message, "attachToTangle failed internally");
                Self::internal(message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("{}\n", self.message),
        )
            .into_response()
    }
}
