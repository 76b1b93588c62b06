//! Dashboard — Axum web server exposing the cached market data.
//!
//! Serves a JSON REST API consumed by the dashboard frontend.
//! CORS enabled for local development.

pub mod routes;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use routes::AppState;

/// Start the dashboard web server.
///
/// This spawns a background task — it doesn't block.
pub fn spawn_dashboard(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "Dashboard server starting on http://localhost:{port}");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind dashboard port");

        axum::serve(listener, app)
            .await
            .expect("Dashboard server error");
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // API routes
        .route("/api/status", get(routes::get_status))
        .route("/api/snapshot", get(routes::get_snapshot))
        .route("/api/domains/:domain", get(routes::get_domain))
        .route("/api/refresh", post(routes::post_refresh))
        .route("/health", get(routes::health))
        // API index
        .route("/", get(serve_index))
        .layer(cors)
        .with_state(state)
}

/// Serve a small machine-readable index at the root.
async fn serve_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "mandi",
        "endpoints": [
            "/health",
            "/api/status",
            "/api/snapshot",
            "/api/domains/:domain",
            "POST /api/refresh",
        ],
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
