//! HTTP API
//!
//! REST endpoints for reading and saving page layouts plus the WebSocket
//! invalidation stream that tells mounted screens to refetch.

pub mod content;
pub mod error;
pub mod health;
pub mod layout;
pub mod websocket;

use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use marquee_cluster::LayoutHub;
use marquee_core::{
    config::{RealtimeConfig, ServerConfig},
    service::{ContentResolver, LayoutStore},
};

pub use error::{AppError, AppResult, ErrorResponse};

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub layout_store: LayoutStore,
    pub hub: LayoutHub,
    /// Catalog used by the content picker; search is unavailable without it
    pub catalog: Option<Arc<dyn ContentResolver>>,
    pub realtime: RealtimeConfig,
}

impl AppState {
    #[must_use]
    pub fn new(layout_store: LayoutStore, hub: LayoutHub) -> Self {
        let catalog = layout_store.resolver().cloned();
        Self {
            layout_store,
            hub,
            catalog,
            realtime: RealtimeConfig::default(),
        }
    }

    #[must_use]
    pub fn with_realtime(mut self, realtime: RealtimeConfig) -> Self {
        self.realtime = realtime;
        self
    }
}

/// Build the application router
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/api/layout", get(layout::list_pages))
        .route(
            "/api/layout/{page}",
            get(layout::get_layout).put(layout::put_layout),
        )
        .route("/api/content/search", get(content::search))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_seconds,
        )));

    // The event stream is long lived and sits outside the request timeout
    let router = Router::new()
        .merge(health::create_health_router())
        .merge(api)
        .route("/ws/layout", get(websocket::websocket_handler));

    // Apply layers before state
    let router = router
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Apply state to all routes (must be last)
    router.with_state(state)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::create_router;
    use axum::http::StatusCode;
    use marquee_core::config::ServerConfig;

    #[tokio::test]
    async fn test_health() {
        let router = router(state());
        let (status, body) = send(&router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!("OK"));
    }

    #[tokio::test]
    async fn test_body_limit() {
        let server = ServerConfig {
            max_body_bytes: 64,
            ..ServerConfig::default()
        };
        let router = create_router(state(), &server);
        let big = serde_json::json!({ "hero_content": [], "sections": [], "pad": "x".repeat(256) });

        let (status, _) = send(&router, put_json("/api/layout/home", &big)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
