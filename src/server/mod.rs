//! HTTP API over a shared [`RagSession`].
pub mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::session::RagSession;

/// Shared state for every handler.
pub struct AppState {
    pub session: Arc<RagSession>,
}

/// Build the router with CORS and request tracing.
pub fn build_router(session: Arc<RagSession>) -> Router {
    let cors = cors_layer(&session.config().server);
    let state = Arc::new(AppState { session });

    Router::new()
        .route("/", get(routes::root))
        .route("/api/health", get(routes::health))
        .route("/api/chat", post(routes::chat))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentials are allowed, so origins are an explicit list and
/// methods/headers echo the preflight request instead of `*`.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .into_iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Initialize the session, then serve until Ctrl-C.
pub async fn serve(session: Arc<RagSession>) -> Result<()> {
    let config = session.config().clone();
    info!(
        app = %config.app.name,
        environment = %config.app.environment,
        origins = ?config.server.cors_origins_list(),
        "starting HTTP server"
    );

    session
        .initialize()
        .await
        .context("failed to initialize the RAG session")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, build_router(session))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
