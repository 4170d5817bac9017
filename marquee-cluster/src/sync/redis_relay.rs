//! Cross-node relay for layout invalidation events
//!
//! Local publishes are forwarded to one Redis Pub/Sub channel, wrapped in an
//! envelope carrying the origin node id. Every node re-broadcasts envelopes
//! from other nodes to its own sessions and ignores its own. Redis Pub/Sub
//! keeps the at-most-once contract: nothing is replayed after a reconnect.

use futures::StreamExt;
use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::events::LayoutEvent;
use super::layout_hub::LayoutHub;
use crate::{Error, Result};

/// Channel name, appended to the configured key prefix
pub const LAYOUT_CHANNEL: &str = "layout:invalidation";

/// Default pause before resubscribing after a Redis failure
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Full channel name for a key prefix (`marquee:` -> `marquee:layout:invalidation`)
#[must_use]
pub fn layout_channel(key_prefix: &str) -> String {
    format!("{key_prefix}{LAYOUT_CHANNEL}")
}

/// Unique id of this server instance
#[must_use]
pub fn generate_node_id() -> String {
    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    format!("{hostname}-{}", nanoid::nanoid!(6))
}

/// Envelope for events published to Redis
#[derive(Debug, Serialize, Deserialize)]
struct RelayEnvelope {
    node_id: String,
    event: LayoutEvent,
}

pub struct RedisRelay {
    client: RedisClient,
    hub: LayoutHub,
    node_id: String,
    channel: String,
    reconnect_delay: Duration,
    cancel_token: CancellationToken,
    started: AtomicBool,
}

impl RedisRelay {
    /// Create a relay; no connection is made until [`RedisRelay::start`]
    pub fn new(redis_url: &str, key_prefix: &str, hub: LayoutHub, node_id: String) -> Result<Self> {
        let client = RedisClient::open(redis_url)?;

        Ok(Self {
            client,
            hub,
            node_id,
            channel: layout_channel(key_prefix),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            cancel_token: CancellationToken::new(),
            started: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Get the cancellation token for external shutdown signaling
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Stop both relay tasks and stop forwarding local publishes
    pub fn shutdown(&self) {
        info!(node_id = %self.node_id, "Shutting down layout relay");
        self.hub.detach_relay();
        self.cancel_token.cancel();
    }

    /// Attach to the hub and spawn the publisher and subscriber tasks
    pub fn start(self: Arc<Self>) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.hub.attach_relay(tx);

        tokio::spawn(Arc::clone(&self).run_publisher(rx));
        tokio::spawn(Arc::clone(&self).run_subscriber());

        info!(
            node_id = %self.node_id,
            channel = %self.channel,
            "Layout relay started"
        );
        Ok(())
    }

    async fn run_publisher(self: Arc<Self>, mut outbound: mpsc::UnboundedReceiver<LayoutEvent>) {
        let mut conn = None;

        loop {
            let event = tokio::select! {
                () = self.cancel_token.cancelled() => break,
                event = outbound.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let payload = match self.encode(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "Failed to encode layout event for relay");
                    continue;
                }
            };

            if conn.is_none() {
                match self.client.get_multiplexed_async_connection().await {
                    Ok(c) => conn = Some(c),
                    Err(e) => {
                        warn!(
                            error = %e,
                            page = %event.page(),
                            "Redis unavailable, layout event not relayed"
                        );
                        continue;
                    }
                }
            }

            if let Some(c) = conn.as_mut() {
                match c.publish::<_, _, ()>(self.channel.as_str(), payload).await {
                    Ok(()) => debug!(page = %event.page(), "Relayed layout event"),
                    Err(e) => {
                        warn!(error = %e, page = %event.page(), "Failed to relay layout event");
                        conn = None;
                    }
                }
            }
        }

        debug!("Layout relay publisher stopped");
    }

    async fn run_subscriber(self: Arc<Self>) {
        loop {
            match self.subscribe_once().await {
                Ok(()) => break,
                Err(e) => {
                    error!(
                        error = %e,
                        delay_secs = self.reconnect_delay.as_secs(),
                        "Layout relay subscriber error, reconnecting"
                    );
                    tokio::select! {
                        () = self.cancel_token.cancelled() => break,
                        () = tokio::time::sleep(self.reconnect_delay) => {}
                    }
                }
            }
        }

        info!("Layout relay subscriber stopped");
    }

    /// Returns `Ok` only on shutdown
    async fn subscribe_once(&self) -> Result<()> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(self.channel.as_str()).await?;

        info!(
            node_id = %self.node_id,
            channel = %self.channel,
            "Subscribed to layout invalidation channel"
        );

        let mut messages = pubsub.on_message();
        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => return Ok(()),
                msg = messages.next() => {
                    let Some(msg) = msg else {
                        return Err(Error::Disconnected("Redis Pub/Sub stream ended".to_string()));
                    };
                    match msg.get_payload::<String>() {
                        Ok(payload) => {
                            self.handle_payload(&payload);
                        }
                        Err(e) => warn!(error = %e, "Invalid payload on layout channel"),
                    }
                }
            }
        }
    }

    fn encode(&self, event: &LayoutEvent) -> Result<String> {
        Ok(serde_json::to_string(&RelayEnvelope {
            node_id: self.node_id.clone(),
            event: event.clone(),
        })?)
    }

    /// Re-broadcast a remote envelope locally. Returns the number of
    /// sessions reached, or `None` if the payload was ignored.
    fn handle_payload(&self, payload: &str) -> Option<usize> {
        let envelope = match serde_json::from_str::<RelayEnvelope>(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, json = %payload, "Failed to parse relayed layout event");
                return None;
            }
        };

        if envelope.node_id == self.node_id {
            debug!("Ignoring layout event from self");
            return None;
        }

        debug!(
            origin = %envelope.node_id,
            page = %envelope.event.page(),
            "Received relayed layout event"
        );
        Some(self.hub.broadcast(&envelope.event))
    }
}

impl std::fmt::Debug for RedisRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRelay")
            .field("node_id", &self.node_id)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
