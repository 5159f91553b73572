// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Interception Dispatcher
//!
//! Routes `attachToTangle` to the local bundle builder when local PoW is
//! enabled and the engine is open. Every other command, and
//! `attachToTangle` without a usable engine, goes to the relay unchanged.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header::CONTENT_TYPE, HeaderMap, Method};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bundle::{attach_to_tangle, current_millis, AttachError, AttachRequest};
use crate::pow::PowEngine;
use crate::relay::{Relay, RelayError, RelayRequest, RelayResponse, API_VERSION_HEADER};

/// The command answered locally.
pub const ATTACH_TO_TANGLE: &str = "attachToTangle";

/// A proxied request with its body already parsed as JSON.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    pub api_version: Option<String>,
    /// Raw body, relayed byte-for-byte.
    pub body: Bytes,
    /// Parsed body.
    pub payload: Value,
}

impl ProxyRequest {
    /// Build from the parts of an incoming HTTP request. Returns `None` when
    /// the body is not valid JSON.
    pub fn parse(method: Method, path: String, headers: &HeaderMap, body: Bytes) -> Option<Self> {
        let payload = serde_json::from_slice(&body).ok()?;
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Some(Self {
            method,
            path,
            content_type: header(CONTENT_TYPE.as_str()),
            api_version: header(API_VERSION_HEADER),
            body,
            payload,
        })
    }

    pub fn command(&self) -> Option<&str> {
        self.payload.get("command").and_then(Value::as_str)
    }

    fn into_relay(self) -> RelayRequest {
        RelayRequest {
            method: self.method,
            path: self.path,
            content_type: self.content_type,
            api_version: self.api_version,
            body: self.body,
        }
    }
}

/// Result of a dispatch.
#[derive(Debug)]
pub enum Dispatched {
    /// Finalized bundle trytes, ascending by `currentIndex`.
    Attached(Vec<String>),
    /// Upstream answer, passed through.
    Relayed(RelayResponse),
}

/// Errors surfaced by [`Dispatcher::dispatch`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Attach(#[from] AttachError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Owns the PoW engine and the relay for the lifetime of the server.
pub struct Dispatcher<R> {
    relay: R,
    engine: Option<Arc<PowEngine>>,
    clock: fn() -> i64,
}

impl<R: Relay> Dispatcher<R> {
    /// `engine` is `None` when local PoW is disabled.
    pub fn new(relay: R, engine: Option<Arc<PowEngine>>) -> Self {
        Self {
            relay,
            engine,
            clock: current_millis,
        }
    }

    /// Override the attachment timestamp source.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn local_pow_enabled(&self) -> bool {
        self.engine.is_some()
    }

    /// The engine, if local PoW is enabled and it still accepts work.
    pub fn available_engine(&self) -> Option<&Arc<PowEngine>> {
        self.engine.as_ref().filter(|engine| engine.is_open())
    }

    pub async fn dispatch(&self, request: ProxyRequest) -> Result<Dispatched, DispatchError> {
        if request.command() == Some(ATTACH_TO_TANGLE) {
            if let Some(engine) = self.available_engine() {
                info!(command = ATTACH_TO_TANGLE, "Processing command");
                let params = AttachRequest::from_params(&request.payload)?;
                let trytes = self.attach(Arc::clone(engine), params).await?;
                return Ok(Dispatched::Attached(trytes));
            }
        }

        info!(command = request.command().unwrap_or_default(), "Relaying command");
        let response = self.relay.forward(request.into_relay()).await?;
        Ok(Dispatched::Relayed(response))
    }

    async fn attach(
        &self,
        engine: Arc<PowEngine>,
        params: AttachRequest,
    ) -> Result<Vec<String>, DispatchError> {
        let session = engine.session().map_err(AttachError::from)?;
        // Abandoned requests stop their search.
        let _abandon = session.clone().drop_guard();
        let clock = self.clock;

        tokio::task::spawn_blocking(move || {
            attach_to_tangle(engine.as_ref(), &session, &params, clock)
        })
        .await
        .map_err(|e| DispatchError::Internal(format!("PoW task failed: {e}")))?
        .map_err(|e| {
            warn!(error = %e, "attachToTangle failed");
            DispatchError::Attach(e)
        })
    }

    /// Interrupt in-flight work and close the engine.
    pub fn shutdown(&self) {
        if let Some(engine) = &self.engine {
            engine.close();
        }
    }

    /// Wait for `token`, then [`shutdown`](Self::shutdown).
    pub async fn shutdown_on(&self, token: CancellationToken) {
        token.cancelled().await;
        info!("Closing proof-of-work engine");
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::http::StatusCode;
    use serde_json::json;

    use crate::pow::PowError;
    use crate::ternary::trits_from_trytes;
    use crate::transaction::{fixtures, Transaction};

    /// Records forwarded requests and answers with a fixed body.
    #[derive(Default)]
    struct RecordingRelay {
        seen: Mutex<Vec<RelayRequest>>,
    }

    impl RecordingRelay {
        fn seen(&self) -> Vec<RelayRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Relay for RecordingRelay {
        async fn forward(&self, request: RelayRequest) -> Result<RelayResponse, RelayError> {
            self.seen.lock().unwrap().push(request);
            Ok(RelayResponse {
                status: StatusCode::OK,
                content_type: Some("application/json".to_string()),
                body: Bytes::from_static(b"{\"relayed\":true}"),
            })
        }

        fn target(&self) -> String {
            "recording".to_string()
        }
    }

    fn proxy_request(body: Value) -> ProxyRequest {
        let raw = Bytes::from(serde_json::to_vec(&body).unwrap());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
        headers.insert(API_VERSION_HEADER, "1".parse().unwrap());
        ProxyRequest::parse(Method::POST, "/".to_string(), &headers, raw).unwrap()
    }

    fn attach_body(min_weight_magnitude: Value) -> Value {
        json!({
            "command": "attachToTangle",
            "trunkTransaction": "T".repeat(81),
            "branchTransaction": "B".repeat(81),
            "minWeightMagnitude": min_weight_magnitude,
            "trytes": [fixtures::fragment(0, 0)],
        })
    }

    fn engine() -> Option<Arc<PowEngine>> {
        Some(Arc::new(PowEngine::new(2).unwrap()))
    }

    #[tokio::test]
    async fn other_commands_are_relayed_byte_identical() {
        let dispatcher = Dispatcher::new(RecordingRelay::default(), engine());
        let request = proxy_request(json!({"command": "getNodeInfo"}));
        let raw = request.body.clone();

        let outcome = dispatcher.dispatch(request).await.unwrap();
        assert!(matches!(outcome, Dispatched::Relayed(_)));

        let seen = dispatcher.relay().seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].body, raw);
        assert_eq!(seen[0].api_version.as_deref(), Some("1"));
        assert_eq!(seen[0].content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn attach_is_answered_locally() {
        let dispatcher =
            Dispatcher::new(RecordingRelay::default(), engine()).with_clock(|| 1_650_000_000_000);

        let outcome = dispatcher.dispatch(proxy_request(attach_body(json!(3)))).await.unwrap();
        let trytes = match outcome {
            Dispatched::Attached(trytes) => trytes,
            other => panic!("expected local attach, got {other:?}"),
        };

        assert!(dispatcher.relay().seen().is_empty());
        assert_eq!(trytes.len(), 1);
        let tx = Transaction::decode(&trytes[0]).unwrap();
        assert_eq!(tx.attachment_timestamp, 1_650_000_000_000);
        assert_eq!(tx.trunk_transaction, "T".repeat(81));
        let hash = trits_from_trytes(&tx.hash).unwrap();
        assert!(hash.iter().rev().take(3).all(|&t| t == 0));
    }

    #[tokio::test]
    async fn attach_is_relayed_without_local_pow() {
        let dispatcher = Dispatcher::new(RecordingRelay::default(), None);
        let outcome = dispatcher.dispatch(proxy_request(attach_body(json!(3)))).await.unwrap();
        assert!(matches!(outcome, Dispatched::Relayed(_)));
        assert_eq!(dispatcher.relay().seen().len(), 1);
    }

    #[tokio::test]
    async fn attach_is_relayed_after_shutdown() {
        let dispatcher = Dispatcher::new(RecordingRelay::default(), engine());
        dispatcher.shutdown();
        assert!(dispatcher.available_engine().is_none());

        let outcome = dispatcher.dispatch(proxy_request(attach_body(json!(3)))).await.unwrap();
        assert!(matches!(outcome, Dispatched::Relayed(_)));
    }

    #[tokio::test]
    async fn invalid_parameters_are_rejected_before_pow() {
        let dispatcher = Dispatcher::new(RecordingRelay::default(), engine());
        let err = dispatcher
            .dispatch(proxy_request(attach_body(json!(-3))))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Attach(AttachError::InvalidParameter(ref name)) if name == "minWeightMagnitude"
        ));
        assert!(dispatcher.relay().seen().is_empty());
    }

    #[tokio::test]
    async fn newer_attach_interrupts_older_one() {
        let dispatcher = Arc::new(Dispatcher::new(RecordingRelay::default(), engine()));

        let slow = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.dispatch(proxy_request(attach_body(json!(60)))).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let fast = dispatcher.dispatch(proxy_request(attach_body(json!(2)))).await;
        assert!(matches!(fast, Ok(Dispatched::Attached(_))));

        let displaced = slow.await.unwrap();
        assert!(matches!(
            displaced,
            Err(DispatchError::Attach(AttachError::Pow(PowError::Interrupted)))
        ));
    }

    #[tokio::test]
    async fn shutdown_token_closes_engine_and_interrupts_search() {
        let dispatcher = Arc::new(Dispatcher::new(RecordingRelay::default(), engine()));
        let token = CancellationToken::new();
        let closer = {
            let dispatcher = Arc::clone(&dispatcher);
            let token = token.clone();
            tokio::spawn(async move { dispatcher.shutdown_on(token).await })
        };

        let slow = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.dispatch(proxy_request(attach_body(json!(60)))).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(dispatcher.available_engine().is_some());

        token.cancel();
        closer.await.unwrap();

        assert!(dispatcher.available_engine().is_none());
        assert!(matches!(
            slow.await.unwrap(),
            Err(DispatchError::Attach(AttachError::Pow(
                PowError::Interrupted | PowError::Unavailable
            )))
        ));
    }

    #[test]
    fn parse_rejects_invalid_json() {
        let headers = HeaderMap::new();
        assert!(ProxyRequest::parse(Method::POST, "/".into(), &headers, Bytes::from_static(b"{nope")).is_none());
        assert!(ProxyRequest::parse(Method::POST, "/".into(), &headers, Bytes::new()).is_none());
    }
}
