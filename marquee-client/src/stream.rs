//! Client side of the `/ws/layout` invalidation channel

use backon::{BackoffBuilder, ExponentialBuilder};
use futures::{SinkExt, StreamExt};
use marquee_cluster::LayoutEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::{config::ClientConfig, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// What the stream reports to its consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// First successful connection
    Connected,
    /// Connection re-established; events sent while away were lost
    Reconnected,
    Event(LayoutEvent),
}

/// Reconnecting WebSocket reader of layout events
#[derive(Debug, Clone)]
pub struct InvalidationStream {
    url: Url,
    min_delay: Duration,
    max_delay: Duration,
}

impl InvalidationStream {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            url: config.events_url()?,
            min_delay: config.reconnect_min_delay(),
            max_delay: config.reconnect_max_delay(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Run until `cancel` fires or the receiver is dropped
    pub fn spawn(self, cancel: CancellationToken) -> mpsc::UnboundedReceiver<StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(self.run(tx, cancel));
        rx
    }

    async fn run(self, tx: mpsc::UnboundedSender<StreamEvent>, cancel: CancellationToken) {
        let mut connected_before = false;

        loop {
            let backoff = ExponentialBuilder::default()
                .with_min_delay(self.min_delay)
                .with_max_delay(self.max_delay)
                .without_max_times()
                .with_jitter()
                .build();

            let mut socket = None;
            for delay in std::iter::once(Duration::ZERO).chain(backoff) {
                if delay > Duration::ZERO {
                    tokio::select! {
                        () = cancel.cancelled() => return,
                        () = tokio::time::sleep(delay) => {}
                    }
                }

                let attempt = tokio::select! {
                    () = cancel.cancelled() => return,
                    attempt = timeout(CONNECT_TIMEOUT, connect_async(self.url.as_str())) => attempt,
                };
                match attempt {
                    Ok(Ok((ws, _response))) => {
                        socket = Some(ws);
                        break;
                    }
                    Ok(Err(e)) => warn!(url = %self.url, error = %e, "Layout channel connect failed"),
                    Err(_) => warn!(url = %self.url, "Layout channel connect timed out"),
                }
            }
            let Some(mut ws) = socket else { return };

            let signal = if connected_before {
                StreamEvent::Reconnected
            } else {
                StreamEvent::Connected
            };
            connected_before = true;
            info!(url = %self.url, ?signal, "Layout channel connected");
            if tx.send(signal).is_err() {
                return;
            }

            loop {
                let message = tokio::select! {
                    () = cancel.cancelled() => {
                        let _ = ws.close(None).await;
                        return;
                    }
                    message = ws.next() => message,
                };

                match message {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<LayoutEvent>(text.as_str()) {
                            Ok(event) => {
                                if tx.send(StreamEvent::Event(event)).is_err() {
                                    let _ = ws.close(None).await;
                                    return;
                                }
                            }
                            Err(e) => debug!(error = %e, "Ignoring unknown layout channel message"),
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(url = %self.url, "Layout channel closed by server");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(url = %self.url, error = %e, "Layout channel read failed");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::models::PageKey;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn next(rx: &mut mpsc::UnboundedReceiver<StreamEvent>) -> StreamEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    async fn config_for(listener: &TcpListener) -> ClientConfig {
        let addr = listener.local_addr().unwrap();
        ClientConfig {
            reconnect_min_delay_ms: 10,
            reconnect_max_delay_ms: 50,
            ..ClientConfig::with_base_url(format!("http://{addr}"))
        }
    }

    #[tokio::test]
    async fn test_receives_events_and_reconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = config_for(&listener).await;

        tokio::spawn(async move {
            // first connection: an unknown frame, one event, then hang up
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.send(Message::Text(r#"{"event":"something_else"}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"event":"layout_updated","page":"home"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
            drop(ws);

            // second connection stays open
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.send(Message::Text(r#"{"event":"layout_updated","page":"shorts"}"#.into()))
                .await
                .unwrap();
            while ws.next().await.is_some() {}
        });

        let cancel = CancellationToken::new();
        let mut rx = InvalidationStream::new(&config).unwrap().spawn(cancel.clone());

        assert_eq!(next(&mut rx).await, StreamEvent::Connected);
        assert_eq!(next(&mut rx).await, StreamEvent::Event(LayoutEvent::updated(PageKey::home())));
        assert_eq!(next(&mut rx).await, StreamEvent::Reconnected);
        assert_eq!(next(&mut rx).await, StreamEvent::Event(LayoutEvent::updated(PageKey::shorts())));

        cancel.cancel();
    }

    #[tokio::test]
    async fn test_cancel_while_unreachable() {
        // bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = config_for(&listener).await;
        drop(listener);

        let cancel = CancellationToken::new();
        let mut rx = InvalidationStream::new(&config).unwrap().spawn(cancel.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        let end = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(end, None);
    }
}
