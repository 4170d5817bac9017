//! A mounted screen: layout cache kept fresh by push events and focus pulls

use marquee_core::models::{Layout, PageKey};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{CacheStatus, ClientLayoutCache};
use crate::config::ClientConfig;
use crate::source::{HttpLayoutSource, LayoutSource};
use crate::stream::{InvalidationStream, StreamEvent};
use crate::Result;

/// What the screen renders from
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    pub layout: Option<Layout>,
    pub status: CacheStatus,
}

impl CacheSnapshot {
    fn of(cache: &ClientLayoutCache) -> Self {
        Self {
            layout: cache.layout().cloned(),
            status: cache.status(),
        }
    }
}

/// Background task owning one [`ClientLayoutCache`]
///
/// Mounts on start, refetches on matching events, on every (re)connection
/// of the event stream and on [`ScreenSession::focus`]. Dropping the session
/// cancels the task and the stream it owns.
pub struct ScreenSession {
    page: PageKey,
    snapshot: watch::Receiver<CacheSnapshot>,
    focus: mpsc::UnboundedSender<()>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ScreenSession {
    /// Connect a screen for `page` to a marquee server
    pub fn connect(config: &ClientConfig, page: PageKey) -> Result<Self> {
        let source: Arc<dyn LayoutSource> = Arc::new(HttpLayoutSource::new(config)?);
        let stream = InvalidationStream::new(config)?;

        let cancel = CancellationToken::new();
        let events = stream.spawn(cancel.child_token());
        Ok(Self::spawn_with(ClientLayoutCache::new(page, source), events, cancel))
    }

    /// Drive `cache` from an arbitrary event feed
    pub fn spawn(cache: ClientLayoutCache, events: mpsc::UnboundedReceiver<StreamEvent>) -> Self {
        Self::spawn_with(cache, events, CancellationToken::new())
    }

    fn spawn_with(
        cache: ClientLayoutCache,
        events: mpsc::UnboundedReceiver<StreamEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let page = cache.page().clone();
        let (snapshot_tx, snapshot) = watch::channel(CacheSnapshot::of(&cache));
        let (focus, focus_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run(cache, events, focus_rx, snapshot_tx, cancel.clone()));
        info!(page = %page, "Screen session started");

        Self {
            page,
            snapshot,
            focus,
            cancel,
            task,
        }
    }

    #[must_use]
    pub fn page(&self) -> &PageKey {
        &self.page
    }

    /// Current layout and status
    #[must_use]
    pub fn snapshot(&self) -> CacheSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every cache change
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<CacheSnapshot> {
        self.snapshot.clone()
    }

    /// Screen regained focus or the app came to the foreground
    ///
    /// Returns `false` when the session task has already stopped.
    pub fn focus(&self) -> bool {
        if self.focus.send(()).is_err() {
            debug!(page = %self.page, "Focus ignored, screen session stopped");
            return false;
        }
        true
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ScreenSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

impl std::fmt::Debug for ScreenSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenSession")
            .field("page", &self.page)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

async fn run(
    mut cache: ClientLayoutCache,
    mut events: mpsc::UnboundedReceiver<StreamEvent>,
    mut focus: mpsc::UnboundedReceiver<()>,
    snapshot: watch::Sender<CacheSnapshot>,
    cancel: CancellationToken,
) {
    cache.mount().await;
    snapshot.send_replace(CacheSnapshot::of(&cache));

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            Some(event) = events.recv() => match event {
                StreamEvent::Event(event) => {
                    if cache.on_event(&event).await {
                        snapshot.send_replace(CacheSnapshot::of(&cache));
                    }
                }
                StreamEvent::Connected | StreamEvent::Reconnected => {
                    cache.on_reconnect().await;
                    snapshot.send_replace(CacheSnapshot::of(&cache));
                }
            },
            Some(()) = focus.recv() => {
                cache.on_focus().await;
                snapshot.send_replace(CacheSnapshot::of(&cache));
            }
        }
    }

    debug!(page = %cache.page(), "Screen session stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockLayoutSource;
    use marquee_cluster::LayoutEvent;
    use marquee_core::models::ContentRef;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Source returning a layout whose single hero id is the fetch count
    fn counting_source() -> (Arc<dyn LayoutSource>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let mut source = MockLayoutSource::new();
        source.expect_fetch().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let mut layout = Layout::empty();
            layout
                .hero_content
                .push(ContentRef::new(n.to_string(), "title", "movie"));
            Ok(layout)
        });
        (Arc::new(source), count)
    }

    async fn wait_for_hero(session: &ScreenSession, id: &str) {
        let mut watch = session.watch();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let matches = watch
                    .borrow_and_update()
                    .layout
                    .as_ref()
                    .and_then(|l| l.hero_content.first())
                    .is_some_and(|c| c.id.as_str() == id);
                if matches {
                    return;
                }
                watch.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_mounts_and_refetches_on_matching_events() {
        let (source, count) = counting_source();
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ScreenSession::spawn(ClientLayoutCache::new(PageKey::home(), source), rx);

        wait_for_hero(&session, "1").await;
        assert_eq!(session.snapshot().status, CacheStatus::Ready);

        tx.send(StreamEvent::Event(LayoutEvent::updated(PageKey::shorts()))).unwrap();
        tx.send(StreamEvent::Event(LayoutEvent::updated(PageKey::home()))).unwrap();
        wait_for_hero(&session, "2").await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reconnect_and_focus_pull() {
        let (source, count) = counting_source();
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ScreenSession::spawn(ClientLayoutCache::new(PageKey::home(), source), rx);
        wait_for_hero(&session, "1").await;

        tx.send(StreamEvent::Reconnected).unwrap();
        wait_for_hero(&session, "2").await;

        assert!(session.focus());
        wait_for_hero(&session, "3").await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_focus_after_stop_is_reported() {
        let (source, count) = counting_source();
        let (_tx, rx) = mpsc::unbounded_channel();
        let session = ScreenSession::spawn(ClientLayoutCache::new(PageKey::home(), source), rx);
        wait_for_hero(&session, "1").await;

        session.stop();
        tokio::time::timeout(Duration::from_secs(5), async {
            while session.is_running() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert!(!session.focus());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_stops_task() {
        let (source, _count) = counting_source();
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ScreenSession::spawn(ClientLayoutCache::new(PageKey::home(), source), rx);
        wait_for_hero(&session, "1").await;

        drop(session);
        tokio::time::timeout(Duration::from_secs(5), tx.closed())
            .await
            .unwrap();
    }
}
