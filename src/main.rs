// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tangle_pow_proxy::{
    api::router,
    config::{LogFormat, ProxyConfig, DEFAULT_LOG_FILTER},
    dispatcher::Dispatcher,
    pow::PowEngine,
    relay::{HttpRelay, Relay},
    state::AppState,
};

fn init_tracing(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

/// Cancel `token` on Ctrl-C or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
    token.cancel();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ProxyConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    let relay = match HttpRelay::new(config.node_url.clone(), config.pow_timeout) {
        Ok(relay) => relay,
        Err(e) => {
            error!(error = %e, "Failed to build relay client");
            return ExitCode::FAILURE;
        }
    };

    let engine = if config.override_attach {
        match PowEngine::new(config.pow_workers) {
            Ok(engine) => Some(Arc::new(engine)),
            Err(e) => {
                warn!(error = %e, "Local proof-of-work unavailable, relaying attachToTangle");
                None
            }
        }
    } else {
        None
    };

    info!(
        node = %relay.target(),
        local_pow = engine.is_some(),
        workers = config.pow_workers,
        "Proxy configured"
    );

    let state = AppState::new(Dispatcher::new(relay, engine));
    let app = router(state.clone(), config.pow_timeout);

    let addr = match config.bind_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "Failed to parse bind address");
            return ExitCode::FAILURE;
        }
    };
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!(%addr, "Tangle PoW proxy listening (docs at /api-doc/openapi.json)");

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    // In-flight searches would otherwise hold connections open.
    let dispatcher = Arc::clone(&state.dispatcher);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { dispatcher.shutdown_on(shutdown).await })
        .await;

    match served {
        Ok(()) => {
            info!("Proxy stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
