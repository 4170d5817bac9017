mod server;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use marquee_cluster::{generate_node_id, LayoutHub, RedisRelay};
use marquee_core::{
    bootstrap::{init_catalog, init_database, init_layout_store, load_config},
    config::StorageBackend,
    logging,
};

use server::MarqueeServer;

/// Dynamic layout server
#[derive(Debug, Parser)]
#[command(name = "marquee", version, about)]
struct Args {
    /// Path to a YAML config file
    #[arg(short, long, env = "MARQUEE_CONFIG_PATH")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration
    let config = load_config(args.config.as_deref())?;

    // 1.5. Validate configuration (fail fast on misconfigurations)
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("Marquee server starting...");
    info!("HTTP address: {}", config.http_address());

    // 3. Initialize database and run migrations
    let pool = match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = init_database(&config).await?;

            info!("Running database migrations...");
            sqlx::migrate!("../migrations")
                .run(&pool)
                .await
                .map_err(|e| {
                    error!("Failed to run migrations: {}", e);
                    anyhow::anyhow!("Migration failed: {e}")
                })?;
            info!("Migrations completed");
            Some(pool)
        }
        StorageBackend::Memory => None,
    };

    // 4. Initialize LayoutHub
    let hub = LayoutHub::new();
    info!("LayoutHub initialized");

    // 5. Initialize Redis relay for multi-node invalidation
    let relay = if config.redis.url.is_empty() {
        info!("Redis not configured, layout events stay on this node");
        None
    } else {
        let node_id = generate_node_id();
        let relay = RedisRelay::new(
            &config.redis.url,
            &config.redis.key_prefix,
            hub.clone(),
            node_id.clone(),
        )?
        .with_reconnect_delay(Duration::from_secs(config.redis.reconnect_delay_seconds));
        let relay = Arc::new(relay);

        match relay.clone().start() {
            Ok(()) => {
                info!(node_id = %node_id, channel = %relay.channel(), "Redis layout relay started");
                Some(relay)
            }
            Err(e) => {
                warn!("Failed to start Redis relay, continuing single-node: {}", e);
                None
            }
        }
    };

    // 6. Initialize catalog and layout store
    let catalog = init_catalog(&config)?;
    let layout_store = init_layout_store(&config, pool, Arc::new(hub.clone()), catalog)?;
    info!("Layout store initialized");

    // 7. Serve until a shutdown signal arrives
    let server = MarqueeServer::new(config, layout_store, hub, relay);
    server.run().await
}
