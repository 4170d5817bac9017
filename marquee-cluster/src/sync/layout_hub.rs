use async_trait::async_trait;
use dashmap::DashMap;
use marquee_core::{
    models::{generate_id, PageKey},
    service::LayoutPublisher,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::LayoutEvent;

/// Identifier of one connected session
pub type SessionId = String;

/// Per-session event sender
pub type EventSender = mpsc::UnboundedSender<LayoutEvent>;

/// In-memory invalidation bus for connected sessions
///
/// There is a single physical channel: every session receives every event
/// and filters on the page it renders. Delivery is at-most-once with no
/// buffering for sessions that are not connected. Each session owns an
/// unbounded FIFO, so events for the same page arrive in publish order.
#[derive(Clone, Default)]
pub struct LayoutHub {
    sessions: Arc<DashMap<SessionId, EventSender>>,

    /// Outbound queue of the cross-node relay, when one is attached
    relay: Arc<RwLock<Option<EventSender>>>,
}

impl LayoutHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session on the channel
    ///
    /// The session stays registered until the returned [`Subscription`] is
    /// dropped.
    #[must_use]
    pub fn connect(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = generate_id();

        self.sessions.insert(id.clone(), tx);

        info!(
            session_id = %id,
            sessions = self.sessions.len(),
            "Session connected to layout channel"
        );

        Subscription {
            id,
            receiver: rx,
            hub: self.clone(),
        }
    }

    /// Invoke `handler` for every event about `page`
    ///
    /// Spawns a task on the current tokio runtime. The task is aborted and
    /// the session unregistered when the guard is dropped.
    pub fn subscribe<F>(&self, page: PageKey, mut handler: F) -> SubscriptionGuard
    where
        F: FnMut(LayoutEvent) + Send + 'static,
    {
        let mut subscription = self.connect();
        let id = subscription.id().to_string();
        let filter = page.clone();

        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                if event.concerns(&filter) {
                    handler(event);
                }
            }
        });

        debug!(session_id = %id, page = %page, "Page subscription started");

        SubscriptionGuard {
            id,
            page,
            hub: self.clone(),
            task,
        }
    }

    /// Remove a session. Returns false if it was not registered.
    pub fn disconnect(&self, session_id: &str) -> bool {
        if self.sessions.remove(session_id).is_some() {
            info!(
                session_id = %session_id,
                sessions = self.sessions.len(),
                "Session disconnected from layout channel"
            );
            true
        } else {
            debug!(session_id = %session_id, "Session already disconnected");
            false
        }
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Deliver an event to the sessions of this node only
    ///
    /// Sessions whose receiver is gone are pruned.
    pub fn broadcast(&self, event: &LayoutEvent) -> usize {
        let mut sent_count = 0;
        let mut failed_sessions = Vec::new();

        for entry in self.sessions.iter() {
            match entry.value().send(event.clone()) {
                Ok(()) => sent_count += 1,
                Err(err) => {
                    warn!(
                        session_id = %entry.key(),
                        error = %err,
                        "Failed to send layout event, marking session for cleanup"
                    );
                    failed_sessions.push(entry.key().clone());
                }
            }
        }

        for session_id in failed_sessions {
            self.disconnect(&session_id);
        }

        debug!(
            page = %event.page(),
            event_type = %event.event_type(),
            sent_count,
            "Layout event broadcast complete"
        );

        sent_count
    }

    /// Deliver locally and hand the event to the relay, if attached
    pub fn publish_event(&self, event: LayoutEvent) -> usize {
        let sent_count = self.broadcast(&event);

        if let Some(relay) = self.relay.read().as_ref() {
            if relay.send(event).is_err() {
                warn!("Layout relay stopped, event delivered on this node only");
            }
        }

        sent_count
    }

    /// Forward every local publish to `sender`
    pub fn attach_relay(&self, sender: EventSender) {
        *self.relay.write() = Some(sender);
        info!("Layout relay attached");
    }

    pub fn detach_relay(&self) {
        if self.relay.write().take().is_some() {
            info!("Layout relay detached");
        }
    }

    /// Drop every session; pending `recv` calls return `None`
    pub fn close(&self) {
        let count = self.sessions.len();
        self.sessions.clear();
        info!(sessions = count, "Layout channel closed");
    }
}

impl std::fmt::Debug for LayoutHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutHub")
            .field("sessions", &self.sessions.len())
            .field("relay_attached", &self.relay.read().is_some())
            .finish()
    }
}

#[async_trait]
impl LayoutPublisher for LayoutHub {
    async fn publish(&self, page: &PageKey) -> marquee_core::Result<usize> {
        Ok(self.publish_event(LayoutEvent::updated(page.clone())))
    }
}

/// A connected session; unregisters itself on drop
pub struct Subscription {
    id: SessionId,
    receiver: mpsc::UnboundedReceiver<LayoutEvent>,
    hub: LayoutHub,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Next event, or `None` once the hub dropped this session
    pub async fn recv(&mut self) -> Option<LayoutEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<LayoutEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.disconnect(&self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Handle of a page subscription task
pub struct SubscriptionGuard {
    id: SessionId,
    page: PageKey,
    hub: LayoutHub,
    task: JoinHandle<()>,
}

impl SubscriptionGuard {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn page(&self) -> &PageKey {
        &self.page
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.task.abort();
        self.hub.disconnect(&self.id);
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("id", &self.id)
            .field("page", &self.page)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_every_session_receives_every_page() {
        let hub = LayoutHub::new();
        let mut home_screen = hub.connect();
        let mut shorts_screen = hub.connect();

        assert_eq!(hub.publish_event(LayoutEvent::updated(PageKey::home())), 2);

        assert_eq!(home_screen.try_recv(), Some(LayoutEvent::updated(PageKey::home())));
        assert_eq!(shorts_screen.try_recv(), Some(LayoutEvent::updated(PageKey::home())));
    }

    #[tokio::test]
    async fn test_dropped_subscription_unregisters() {
        let hub = LayoutHub::new();
        let sub = hub.connect();
        assert_eq!(hub.session_count(), 1);

        drop(sub);
        assert_eq!(hub.session_count(), 0);
        assert_eq!(hub.publish_event(LayoutEvent::updated(PageKey::home())), 0);
    }

    #[tokio::test]
    async fn test_dead_sessions_are_pruned() {
        let hub = LayoutHub::new();
        let (tx, rx) = mpsc::unbounded_channel();
        hub.sessions.insert("dead".to_string(), tx);
        drop(rx);
        let _live = hub.connect();

        assert_eq!(hub.broadcast(&LayoutEvent::updated(PageKey::home())), 1);
        assert_eq!(hub.session_count(), 1);
    }

    #[tokio::test]
    async fn test_no_replay_for_late_sessions() {
        let hub = LayoutHub::new();
        hub.publish_event(LayoutEvent::updated(PageKey::home()));

        let mut late = hub.connect();
        assert_eq!(late.try_recv(), None);
    }

    #[tokio::test]
    async fn test_events_arrive_in_publish_order() {
        let hub = LayoutHub::new();
        let mut sub = hub.connect();

        for page in ["a", "b", "c"] {
            hub.publish_event(LayoutEvent::updated(PageKey::parse(page).unwrap()));
        }

        let received: Vec<_> = std::iter::from_fn(|| sub.try_recv())
            .map(|e| e.page().to_string())
            .collect();
        assert_eq!(received, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_subscribe_filters_by_page() {
        let hub = LayoutHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard = hub.subscribe(PageKey::home(), move |event| {
            let _ = tx.send(event);
        });

        hub.publish_event(LayoutEvent::updated(PageKey::shorts()));
        hub.publish_event(LayoutEvent::updated(PageKey::home()));

        let event = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(event.page(), &PageKey::home());
        assert!(rx.try_recv().is_err());
        assert_eq!(guard.page(), &PageKey::home());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let hub = LayoutHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard = hub.subscribe(PageKey::home(), move |event| {
            let _ = tx.send(event);
        });
        assert_eq!(hub.session_count(), 1);

        guard.unsubscribe();
        assert_eq!(hub.session_count(), 0);
        assert_eq!(hub.publish_event(LayoutEvent::updated(PageKey::home())), 0);

        // the handler (and its sender) is dropped with the aborted task
        let closed = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert!(closed.is_none());
    }

    #[tokio::test]
    async fn test_publisher_trait() {
        let hub = LayoutHub::new();
        let mut sub = hub.connect();
        let publisher: Arc<dyn LayoutPublisher> = Arc::new(hub.clone());

        assert_eq!(publisher.publish(&PageKey::shorts()).await.unwrap(), 1);
        assert_eq!(sub.try_recv(), Some(LayoutEvent::updated(PageKey::shorts())));
    }

    #[tokio::test]
    async fn test_relay_receives_local_publishes_only() {
        let hub = LayoutHub::new();
        let (tx, mut relay_rx) = mpsc::unbounded_channel();
        hub.attach_relay(tx);

        hub.publish_event(LayoutEvent::updated(PageKey::home()));
        hub.broadcast(&LayoutEvent::updated(PageKey::shorts()));

        assert_eq!(relay_rx.try_recv().ok(), Some(LayoutEvent::updated(PageKey::home())));
        assert!(relay_rx.try_recv().is_err());

        hub.detach_relay();
        hub.publish_event(LayoutEvent::updated(PageKey::home()));
        assert!(relay_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_ends_sessions() {
        let hub = LayoutHub::new();
        let mut sub = hub.connect();
        hub.close();
        assert_eq!(sub.recv().await, None);
        assert!(!hub.disconnect(sub.id()));
    }
}
