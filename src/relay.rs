// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pass-through relay to the remote node.
//!
//! Requests are forwarded with their method, path and raw body untouched.
//! Only `Content-Type` and `X-IOTA-API-Version` are carried over, and only
//! when there is a body.

use std::future::Future;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header::CONTENT_TYPE, Method, StatusCode};
use url::Url;

/// Header the IOTA node API uses for version negotiation.
pub const API_VERSION_HEADER: &str = "X-IOTA-API-Version";

/// A request as it will be sent upstream.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub method: Method,
    /// Path and query of the original request.
    pub path: String,
    pub content_type: Option<String>,
    pub api_version: Option<String>,
    pub body: Bytes,
}

/// The upstream answer, passed back verbatim.
#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Errors that can occur while relaying.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(String),

    #[error("Remote node unreachable: {0}")]
    Unreachable(String),
}

/// Forwards requests to a remote node.
pub trait Relay: Send + Sync {
    fn forward(
        &self,
        request: RelayRequest,
    ) -> impl Future<Output = Result<RelayResponse, RelayError>> + Send;

    /// Human-readable upstream target, for logs and health output.
    fn target(&self) -> String;
}

/// `reqwest`-backed relay to a single node URL.
pub struct HttpRelay {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpRelay {
    /// Create a relay for `base_url` with the given request timeout.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, RelayError> {
        if base_url.cannot_be_a_base() {
            return Err(RelayError::InvalidUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::InvalidUrl(e.to_string()))?;
        Ok(Self { base_url, client })
    }

    /// The configured node with only path and query taken from `target`.
    fn url_for(&self, target: &str) -> Result<Url, RelayError> {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        if !path.starts_with('/') {
            return Err(RelayError::InvalidUrl(target.to_string()));
        }

        let mut url = self.base_url.clone();
        url.set_path(path);
        url.set_query(query);
        Ok(url)
    }
}

impl Relay for HttpRelay {
    async fn forward(&self, request: RelayRequest) -> Result<RelayResponse, RelayError> {
        let url = self.url_for(&request.path)?;
        let mut builder = self.client.request(request.method, url);

        if !request.body.is_empty() {
            if let Some(content_type) = &request.content_type {
                builder = builder.header(CONTENT_TYPE, content_type);
            }
            if let Some(api_version) = &request.api_version {
                builder = builder.header(API_VERSION_HEADER, api_version);
            }
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| RelayError::Unreachable(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::Unreachable(e.to_string()))?;

        Ok(RelayResponse {
            status,
            content_type,
            body,
        })
    }

    fn target(&self) -> String {
        self.base_url.to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{spawn_echo_upstream, ECHO_CONTENT_TYPE};
    use super::*;

    #[tokio::test]
    async fn forwards_body_and_returns_upstream_response() {
        let relay = HttpRelay::new(spawn_echo_upstream().await, Duration::from_secs(5)).unwrap();
        let body = Bytes::from_static(br#"{"command":"getNodeInfo"}"#);

        let response = relay
            .forward(RelayRequest {
                method: Method::POST,
                path: "/api?x=1".to_string(),
                content_type: Some("application/json".to_string()),
                api_version: Some("1".to_string()),
                body: body.clone(),
            })
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::ACCEPTED);
        assert_eq!(response.content_type.as_deref(), Some(ECHO_CONTENT_TYPE));
        assert_eq!(response.body, body);
    }

    #[tokio::test]
    async fn unreachable_node_is_reported() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let relay = HttpRelay::new(
            Url::parse("http://127.0.0.1:9").unwrap(),
            Duration::from_secs(2),
        )
        .unwrap();

        let result = relay
            .forward(RelayRequest {
                method: Method::POST,
                path: "/".to_string(),
                content_type: None,
                api_version: None,
                body: Bytes::from_static(b"{}"),
            })
            .await;
        assert!(matches!(result, Err(RelayError::Unreachable(_))));
    }

    #[tokio::test]
    async fn authority_in_path_stays_on_configured_node() {
        let relay = HttpRelay::new(spawn_echo_upstream().await, Duration::from_secs(5)).unwrap();

        let target = relay.url_for("//127.0.0.1:9/other?x=1").unwrap();
        assert_eq!(target.host_str(), relay.base_url.host_str());
        assert_eq!(target.port(), relay.base_url.port());
        assert_eq!(target.query(), Some("x=1"));

        // Port 9 would refuse; the echo node answers instead.
        let response = relay
            .forward(RelayRequest {
                method: Method::POST,
                path: "//127.0.0.1:9/other".to_string(),
                content_type: None,
                api_version: None,
                body: Bytes::from_static(b"{}"),
            })
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::ACCEPTED);
    }

    #[test]
    fn rejects_relative_targets() {
        let relay = HttpRelay::new(
            Url::parse("http://node.example.com:14265").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(matches!(
            relay.url_for("http://elsewhere.example.com/"),
            Err(RelayError::InvalidUrl(_))
        ));
        assert_eq!(
            relay.url_for("/").unwrap().as_str(),
            "http://node.example.com:14265/"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        let url = Url::parse("mailto:node@example.com").unwrap();
        assert!(matches!(
            HttpRelay::new(url, Duration::from_secs(1)),
            Err(RelayError::InvalidUrl(_))
        ));
    }
}
