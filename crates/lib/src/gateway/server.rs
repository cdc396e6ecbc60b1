//! Gateway HTTP server: VK callback endpoint plus a health probe (single port).

use crate::channels::VkNotifier;
use crate::config::{self, Config};
use crate::dispatch::{DispatchError, Dispatcher};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared state for the gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub dispatcher: Arc<Dispatcher>,
}

/// Routes: `POST /callback` and `GET /`.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/callback", post(callback))
        .with_state(state)
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Fails before binding when a required platform value is missing.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    let app = router(build_state(&config)?);
    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);
    serve(listener, app).await
}

/// Run the gateway on an already bound listener (e.g. port 0 in tests).
pub async fn run_gateway_on(listener: tokio::net::TcpListener, config: Config) -> Result<()> {
    let app = router(build_state(&config)?);
    if let Ok(addr) = listener.local_addr() {
        log::info!("gateway listening on {}", addr);
    }
    serve(listener, app).await
}

fn build_state(config: &Config) -> Result<GatewayState> {
    let credentials = config::resolve_platform(config)?;
    if config.delivery.request_timeout().is_none() {
        log::debug!("messages.send has no request timeout (set delivery.requestTimeoutSecs to bound it)");
    }
    let secret = credentials.secret.clone();
    let confirmation = credentials.confirmation.clone();
    let notifier = VkNotifier::new(credentials, &config.delivery)
        .context("building VK API client")?;
    let dispatcher = Dispatcher::new(confirmation, Arc::new(notifier)).with_secret(secret);
    Ok(GatewayState {
        config: Arc::new(config.clone()),
        dispatcher: Arc::new(dispatcher),
    })
}

async fn serve(listener: tokio::net::TcpListener, app: Router) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// In-flight callbacks, including their retries, finish before the server returns.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining in-flight callbacks");
}

/// POST /callback — receives VK callback JSON and answers with the dispatcher's plain-text body.
async fn callback(State(state): State<GatewayState>, body: Bytes) -> Response {
    match state.dispatcher.dispatch_body(&body).await {
        Ok(reply) => (StatusCode::OK, reply).into_response(),
        Err(e) => {
            let status = status_for(&e);
            log::error!("callback failed ({}): {}", status, e);
            (status, response_text(&e)).into_response()
        }
    }
}

fn status_for(e: &DispatchError) -> StatusCode {
    match e {
        DispatchError::Malformed(_) => StatusCode::BAD_REQUEST,
        DispatchError::SecretMismatch => StatusCode::FORBIDDEN,
        DispatchError::Notify(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client errors describe what was wrong with the request; server errors stay opaque.
fn response_text(e: &DispatchError) -> String {
    match e {
        DispatchError::Malformed(_) | DispatchError::SecretMismatch => e.to_string(),
        DispatchError::Notify(_) => "reply delivery failed".to_string(),
    }
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
    }))
}
