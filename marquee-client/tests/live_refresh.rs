//! End-to-end refresh flow without a network: an editor saves through the
//! store, the hub announces it, and a mounted screen picks up the new layout.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use marquee_client::{
    CacheStatus, CarouselEngine, ClientLayoutCache, LayoutSource, ScreenSession, StreamEvent,
    ViewportCommand,
};
use marquee_cluster::LayoutHub;
use marquee_core::{
    models::{ContentRef, Layout, PageKey},
    repository::MemoryLayoutRepository,
    service::{LayoutEditor, LayoutStore},
};

/// Reads straight from the store instead of over HTTP
struct StoreSource(LayoutStore);

#[async_trait]
impl LayoutSource for StoreSource {
    async fn fetch(&self, page: &PageKey) -> marquee_client::Result<Layout> {
        self.0
            .get(page)
            .await
            .map_err(|e| marquee_client::ClientError::InvalidUrl(e.to_string()))
    }
}

/// Pipes hub events into a session feed, like the WebSocket stream does
fn bridge(hub: &LayoutHub) -> mpsc::UnboundedReceiver<StreamEvent> {
    let mut subscription = hub.connect();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            if tx.send(StreamEvent::Event(event)).is_err() {
                break;
            }
        }
    });
    rx
}

async fn wait_for_hero_count(session: &ScreenSession, count: usize) -> Layout {
    let mut watch = session.watch();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let layout = watch.borrow_and_update().layout.clone();
            if let Some(layout) = layout.filter(|l| l.hero_content.len() == count) {
                return layout;
            }
            watch.changed().await.unwrap();
        }
    })
    .await
    .unwrap()
}

fn movie(id: &str) -> ContentRef {
    ContentRef::new(id, format!("Movie {id}"), "movie")
}

#[tokio::test]
async fn test_saved_layout_reaches_mounted_screen() {
    let hub = LayoutHub::new();
    let store = LayoutStore::new(Arc::new(MemoryLayoutRepository::new()), Arc::new(hub.clone()));

    let source = Arc::new(StoreSource(store.clone()));
    let home = ScreenSession::spawn(ClientLayoutCache::new(PageKey::home(), source.clone()), bridge(&hub));
    let shorts =
        ScreenSession::spawn(ClientLayoutCache::new(PageKey::shorts(), source), bridge(&hub));

    let empty = wait_for_hero_count(&home, 0).await;
    assert!(empty.is_empty());
    assert_eq!(home.snapshot().status, CacheStatus::Ready);

    let mut editor = LayoutEditor::open(store.clone(), PageKey::home()).await.unwrap();
    editor.add_hero_items(vec![movie("a"), movie("b"), movie("c")]);
    editor.save().await.unwrap();

    let layout = wait_for_hero_count(&home, 3).await;

    // the other screen ignored the event
    assert!(shorts.snapshot().layout.unwrap_or_default().hero_content.is_empty());

    // and the refreshed hero list feeds a carousel
    let engine = CarouselEngine::new(&layout.hero_content, 320.0).unwrap();
    assert_eq!(engine.slides().len(), 5);
    assert_eq!(engine.initial_command(), ViewportCommand::JumpTo(1));
}

#[tokio::test]
async fn test_empty_hero_has_no_carousel() {
    let hub = LayoutHub::new();
    let store = LayoutStore::new(Arc::new(MemoryLayoutRepository::new()), Arc::new(hub.clone()));
    let session = ScreenSession::spawn(
        ClientLayoutCache::new(PageKey::home(), Arc::new(StoreSource(store))),
        bridge(&hub),
    );

    let layout = wait_for_hero_count(&session, 0).await;
    assert!(CarouselEngine::new(&layout.hero_content, 320.0).is_none());
}
