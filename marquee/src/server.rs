//! Server lifecycle management
//!
//! Runs the HTTP server and tears down the realtime components on shutdown.

use std::sync::Arc;
use tracing::{error, info};

use marquee_api::{create_router, AppState};
use marquee_cluster::{LayoutHub, RedisRelay};
use marquee_core::{service::LayoutStore, Config};

/// Marquee server - owns everything that must be stopped on shutdown
pub struct MarqueeServer {
    config: Config,
    layout_store: LayoutStore,
    hub: LayoutHub,
    relay: Option<Arc<RedisRelay>>,
}

impl MarqueeServer {
    pub fn new(
        config: Config,
        layout_store: LayoutStore,
        hub: LayoutHub,
        relay: Option<Arc<RedisRelay>>,
    ) -> Self {
        Self {
            config,
            layout_store,
            hub,
            relay,
        }
    }

    /// Serve HTTP until SIGTERM or Ctrl+C, then shut down
    pub async fn run(self) -> anyhow::Result<()> {
        let http_address = self.config.http_address();
        let http_addr: std::net::SocketAddr = http_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid HTTP address '{http_address}': {e}"))?;

        let state = AppState::new(self.layout_store.clone(), self.hub.clone())
            .with_realtime(self.config.realtime.clone());
        let router = create_router(state, &self.config.server);

        let listener = tokio::net::TcpListener::bind(http_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind HTTP address {http_addr}: {e}"))?;
        info!("HTTP server listening on {}", http_addr);

        // Closing the hub ends every open event stream, which lets
        // graceful shutdown finish instead of waiting on idle sockets
        let hub = self.hub.clone();
        let graceful = async move {
            shutdown_signal().await;
            info!("Shutdown signal received, starting graceful shutdown...");
            hub.close();
        };

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(graceful)
            .await;
        if let Err(e) = &served {
            error!("HTTP server error: {}", e);
        }

        self.shutdown();
        served.map_err(Into::into)
    }

    fn shutdown(&self) {
        if let Some(relay) = &self.relay {
            relay.shutdown();
            info!("Redis relay stopped");
        }
        self.hub.close();
        info!("Marquee server shut down");
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C signal");
            }
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
