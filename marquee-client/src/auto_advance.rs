//! Lifecycle-bound auto-advance timer for a [`CarouselEngine`]

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::carousel::{CarouselEngine, ViewportCommand};
use crate::config::CarouselConfig;

/// Ticks the engine every interval and forwards the resulting commands
///
/// The timer is not reset by manual drags; only the engine's video flag
/// suppresses it. The task stops on [`AutoAdvance::stop`], when dropped, or
/// when the command receiver goes away.
pub struct AutoAdvance {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl AutoAdvance {
    /// Spawn the timer on the current tokio runtime
    pub fn start(
        engine: Arc<Mutex<CarouselEngine>>,
        config: &CarouselConfig,
        commands: mpsc::UnboundedSender<ViewportCommand>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            engine,
            config.interval(),
            config.animation_duration(),
            commands,
            cancel.clone(),
        ));

        Self { cancel, task }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for AutoAdvance {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

impl std::fmt::Debug for AutoAdvance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoAdvance")
            .field("running", &self.is_running())
            .finish()
    }
}

async fn run(
    engine: Arc<Mutex<CarouselEngine>>,
    interval: Duration,
    animation: Duration,
    commands: mpsc::UnboundedSender<ViewportCommand>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let (command, wrapping) = {
            let mut engine = engine.lock();
            let command = engine.on_timer();
            (command, engine.is_wrapping())
        };

        let Some(command) = command else {
            trace!("Video playing, auto-advance skipped");
            continue;
        };
        if commands.send(command).is_err() {
            break;
        }

        if wrapping {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(animation) => {}
            }

            let jump = engine.lock().complete_wrap();
            if let Some(jump) = jump {
                if commands.send(jump).is_err() {
                    break;
                }
            }
        }
    }

    debug!("Carousel auto-advance stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::models::ContentRef;

    const WIDTH: f64 = 100.0;

    fn engine(ids: &[&str]) -> Arc<Mutex<CarouselEngine>> {
        let items: Vec<_> = ids.iter().map(|id| ContentRef::new(*id, *id, "movie")).collect();
        Arc::new(Mutex::new(CarouselEngine::new(&items, WIDTH).unwrap()))
    }

    /// What a view does with an animated command once the animation ends
    fn land(engine: &Mutex<CarouselEngine>, command: ViewportCommand) {
        let offset = command.offset(WIDTH);
        let mut engine = engine.lock();
        engine.on_scroll(offset);
    }

    #[tokio::test(start_paused = true)]
    async fn test_advances_every_interval() {
        let engine = engine(&["a", "b", "c"]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let started = Instant::now();
        let _auto = AutoAdvance::start(engine.clone(), &CarouselConfig::default(), tx);

        let first = rx.recv().await.unwrap();
        assert_eq!(first, ViewportCommand::AnimateTo(2));
        assert_eq!(started.elapsed(), Duration::from_millis(4000));
        land(&engine, first);

        let second = rx.recv().await.unwrap();
        assert_eq!(second, ViewportCommand::AnimateTo(3));
        assert_eq!(started.elapsed(), Duration::from_millis(8000));
        assert_eq!(engine.lock().active_index(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrap_completes_after_animation() {
        let engine = engine(&["a", "b"]);
        engine.lock().on_settle(2.0 * WIDTH);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _auto = AutoAdvance::start(engine.clone(), &CarouselConfig::default(), tx);

        assert_eq!(rx.recv().await, Some(ViewportCommand::AnimateTo(3)));
        let animated_at = Instant::now();

        assert_eq!(rx.recv().await, Some(ViewportCommand::JumpTo(1)));
        assert_eq!(animated_at.elapsed(), Duration::from_millis(350));
        assert_eq!(engine.lock().active_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_playback_suppresses_ticks() {
        let engine = engine(&["a", "b"]);
        engine.lock().set_video_playing(true);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _auto = AutoAdvance::start(engine.clone(), &CarouselConfig::default(), tx);

        let quiet = tokio::time::timeout(Duration::from_secs(20), rx.recv()).await;
        assert!(quiet.is_err());

        engine.lock().set_video_playing(false);
        assert_eq!(rx.recv().await, Some(ViewportCommand::AnimateTo(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_task() {
        let engine = engine(&["a", "b"]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let auto = AutoAdvance::start(engine, &CarouselConfig::default(), tx);
        assert!(auto.is_running());

        auto.stop();
        assert_eq!(rx.recv().await, None);
        assert!(!auto.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_task() {
        let engine = engine(&["a", "b"]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let auto = AutoAdvance::start(engine, &CarouselConfig::default(), tx);

        drop(auto);
        assert_eq!(rx.recv().await, None);
    }
}
