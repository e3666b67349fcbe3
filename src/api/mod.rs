//! HTTP API: Axum server exposing the estimator and the valuation engine.
//!
//! CORS is enabled for browser front-ends.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::future::Future;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use routes::AppState;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState, enable_cors: bool) -> Router {
    let router = Router::new()
        .route("/api/estimate", get(routes::get_estimate))
        .route("/api/commune", get(routes::get_commune))
        .route("/api/valuation", post(routes::post_valuation))
        .route("/api/deductions", get(routes::get_deductions))
        .route("/api/parcel", get(routes::get_parcel))
        .route("/health", get(routes::health))
        .with_state(state);

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]);
        router.layer(cors)
    } else {
        router
    }
}

/// Serve the API on `port` until `shutdown` resolves.
pub async fn serve<F>(state: AppState, port: u16, enable_cors: bool, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state, enable_cors);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API port {port}"))?;
    info!(port, "API server listening on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
