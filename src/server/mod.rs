//! HTTP API.
//!
//! Every `/api` route identifies the caller through the `X-Parent-Id` header
//! and only serves children linked to that parent.

mod auth;
mod config;
mod handlers;

pub use auth::{LoggedParent, PARENT_HEADER};
pub use config::{DEFAULT_ADDR, ServerConfig};
pub use handlers::AppState;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::store::EventStore;

/// Builds the API router over `store`.
pub fn router(store: Arc<dyn EventStore>) -> Router {
    let state = AppState { store };

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/parent", get(handlers::get_parent))
        .route("/api/child", post(handlers::create_child))
        .route("/api/child/all", get(handlers::list_children))
        .route(
            "/api/child/{child_id}",
            get(handlers::get_child)
                .patch(handlers::patch_child)
                .delete(handlers::delete_child),
        )
        .route("/api/feeds/average/{child_id}", get(handlers::feed_average))
        .route(
            "/api/feeds/{child_id}",
            get(handlers::list_feeds).post(handlers::create_feed),
        )
        .route(
            "/api/feeds/{child_id}/{record_id}",
            get(handlers::get_feed)
                .patch(handlers::patch_feed)
                .delete(handlers::delete_feed),
        )
        .route("/api/changes/average/{child_id}", get(handlers::change_average))
        .route(
            "/api/changes/{child_id}",
            get(handlers::list_changes).post(handlers::create_change),
        )
        .route(
            "/api/changes/{child_id}/{record_id}",
            get(handlers::get_change)
                .patch(handlers::patch_change)
                .delete(handlers::delete_change),
        )
        .route("/api/sleeps/average/{child_id}", get(handlers::sleep_average))
        .route(
            "/api/sleeps/{child_id}",
            get(handlers::list_sleeps).post(handlers::create_sleep),
        )
        .route(
            "/api/sleeps/{child_id}/{record_id}",
            get(handlers::get_sleep)
                .patch(handlers::patch_sleep)
                .delete(handlers::delete_sleep),
        )
        .fallback(handlers::fallback)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API until Ctrl+C. `config` should already be validated.
///
/// Writes only reach `store`; nothing is persisted back to `config.data_dir`.
pub async fn serve(config: &ServerConfig, store: Arc<dyn EventStore>) -> Result<()> {
    let app = router(store);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    info!(addr = %config.addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
