//! Query gateway: HTTP front door for metric data queries.
//!
//! Accepts a batch of editor-saved metric queries as JSON, translates them
//! into batched `GetMetricData` exchanges against the metrics backend, and
//! returns named frames keyed by `refId`.
//!
//! # Environment variables
//! | Var                             | Default                  |
//! |---------------------------------|--------------------------|
//! | `GATEWAY_ADDR`                  | `0.0.0.0:8080`           |
//! | `METRICS_BACKEND_URL`           | `http://127.0.0.1:4566`  |
//! | `METRICS_BACKEND_TOKEN`         | optional                 |
//! | `METRICS_DEFAULT_REGION`        | `us-east-1`              |
//! | `METRICS_MAX_QUERIES_PER_CALL`  | `500`                    |
//! | `METRICS_REQUEST_TIMEOUT_SECS`  | `30`                     |

mod error;
mod handlers;
mod models;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use query_engine::{executor::MAX_QUERIES_PER_CALL, Executor, ExecutorConfig, HttpMetricDataClient};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

// ------------------------------------------------------------------ //
//  Shared application state                                           //
// ------------------------------------------------------------------ //

/// Shared state injected into every Axum handler via `State`.
pub struct AppState {
    pub executor: Executor,
    /// Cancelled on shutdown; every call runs under a child token.
    pub shutdown: CancellationToken,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/query", post(handlers::query))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

// ------------------------------------------------------------------ //
//  Entry point                                                        //
// ------------------------------------------------------------------ //

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("query_gateway=info".parse()?)
                .add_directive("query_engine=info".parse()?),
        )
        .json()
        .init();

    let backend_url = std::env::var("METRICS_BACKEND_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:4566".to_string());
    let backend_token = std::env::var("METRICS_BACKEND_TOKEN")
        .ok()
        .filter(|t| !t.is_empty());
    let config = ExecutorConfig {
        default_region: std::env::var("METRICS_DEFAULT_REGION")
            .unwrap_or_else(|_| "us-east-1".to_string()),
        max_queries_per_call: env_or("METRICS_MAX_QUERIES_PER_CALL", MAX_QUERIES_PER_CALL),
    };
    let timeout = Duration::from_secs(env_or("METRICS_REQUEST_TIMEOUT_SECS", 30u64));

    info!(
        backend_url,
        default_region = %config.default_region,
        max_queries_per_call = config.max_queries_per_call,
        "connecting to metrics backend"
    );

    let client = HttpMetricDataClient::new(&backend_url, backend_token, timeout)?;
    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState {
        executor: Executor::new(Arc::new(client), config),
        shutdown: shutdown.clone(),
    });

    let bind_addr = std::env::var("GATEWAY_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = bind_addr, "query-gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
    shutdown.cancel();
}
