//! Infinitely looping hero carousel
//!
//! The `N` hero slides are laid out on `N + 2` pages: a clone of the last
//! slide at page 0, the real slides at pages `1..=N` and a clone of the
//! first slide at page `N + 1`. Landing on either clone triggers an instant
//! jump to the real slide it duplicates, so wrapping around is invisible.
//!
//! The engine is a pure state machine. The view reports scroll offsets and
//! settles, the [`AutoAdvance`](crate::AutoAdvance) task reports timer ticks,
//! and both get back [`ViewportCommand`]s to apply.

use marquee_core::models::ContentRef;

pub const LEAD_SUFFIX: &str = "__lead";
pub const TRAIL_SUFFIX: &str = "__trail";

/// Which clone page the viewport is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    /// Page 0, a copy of the last slide
    Leading,
    /// Page `N + 1`, a copy of the first slide
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselState {
    AtRest(usize),
    Animating(usize),
    OnSentinel(Sentinel),
}

/// Viewport instruction, in page units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportCommand {
    AnimateTo(usize),
    /// Reposition without animation
    JumpTo(usize),
}

impl ViewportCommand {
    #[must_use]
    pub fn page(&self) -> usize {
        match *self {
            Self::AnimateTo(page) | Self::JumpTo(page) => page,
        }
    }

    #[must_use]
    pub fn is_animated(&self) -> bool {
        matches!(self, Self::AnimateTo(_))
    }

    /// Horizontal offset of the target page
    #[must_use]
    pub fn offset(&self, page_width: f64) -> f64 {
        self.page() as f64 * page_width
    }
}

/// One page of the extended sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    /// Render key, unique across the extended sequence
    pub key: String,
    pub content: ContentRef,
    /// Index of the real slide this page shows
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct CarouselEngine {
    slides: Vec<Slide>,
    page_width: f64,
    active: usize,
    state: CarouselState,
    video_playing: bool,
    /// Sentinel we already issued a jump away from, until an interior page is observed
    jump_issued: Option<Sentinel>,
}

impl CarouselEngine {
    /// Build the extended sequence. `None` when there is nothing to show.
    #[must_use]
    pub fn new(items: &[ContentRef], page_width: f64) -> Option<Self> {
        let (first, last) = (items.first()?, items.last()?);
        let n = items.len();

        let mut slides = Vec::with_capacity(n + 2);
        slides.push(Slide {
            key: format!("{}{LEAD_SUFFIX}", last.id),
            content: last.clone(),
            index: n - 1,
        });
        slides.extend(items.iter().enumerate().map(|(index, content)| Slide {
            key: content.id.to_string(),
            content: content.clone(),
            index,
        }));
        slides.push(Slide {
            key: format!("{}{TRAIL_SUFFIX}", first.id),
            content: first.clone(),
            index: 0,
        });

        Some(Self {
            slides,
            page_width,
            active: 0,
            state: CarouselState::AtRest(1),
            video_playing: false,
            jump_issued: None,
        })
    }

    /// Number of real slides
    #[must_use]
    pub fn len(&self) -> usize {
        self.slides.len() - 2
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `N + 2` pages to render, in order
    #[must_use]
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    #[must_use]
    pub fn active_index(&self) -> usize {
        self.active
    }

    #[must_use]
    pub fn state(&self) -> CarouselState {
        self.state
    }

    #[must_use]
    pub fn page_width(&self) -> f64 {
        self.page_width
    }

    /// Viewport resized; offsets reported afterwards use the new width
    pub fn set_page_width(&mut self, page_width: f64) {
        self.page_width = page_width;
    }

    pub fn set_video_playing(&mut self, playing: bool) {
        self.video_playing = playing;
    }

    #[must_use]
    pub fn is_video_playing(&self) -> bool {
        self.video_playing
    }

    /// Position before first paint: the first real slide, not animated
    #[must_use]
    pub fn initial_command(&self) -> ViewportCommand {
        ViewportCommand::JumpTo(1)
    }

    /// Whether the pending animation runs into the trailing clone
    #[must_use]
    pub fn is_wrapping(&self) -> bool {
        self.state == CarouselState::Animating(self.len() + 1)
            || self.state == CarouselState::OnSentinel(Sentinel::Trailing)
    }

    fn raw_page(&self, offset_x: f64) -> i64 {
        if self.page_width.is_nan() || self.page_width <= 0.0 || !offset_x.is_finite() {
            return match self.state {
                CarouselState::AtRest(page) | CarouselState::Animating(page) => page as i64,
                CarouselState::OnSentinel(Sentinel::Leading) => 0,
                CarouselState::OnSentinel(Sentinel::Trailing) => self.len() as i64 + 1,
            };
        }
        (offset_x / self.page_width).round() as i64
    }

    /// Scroll frame. Returns the new active index when it changed.
    pub fn on_scroll(&mut self, offset_x: f64) -> Option<usize> {
        let n = self.len() as i64;
        let raw = self.raw_page(offset_x);

        match self.state {
            CarouselState::Animating(target) if raw == target as i64 => {
                self.state = self.landing_state(target);
            }
            CarouselState::OnSentinel(_) if self.jump_issued.is_some() && (1..=n).contains(&raw) => {
                self.state = CarouselState::AtRest(raw as usize);
                self.jump_issued = None;
            }
            _ => {}
        }

        let actual = (raw - 1).rem_euclid(n) as usize;
        if actual == self.active {
            return None;
        }
        self.active = actual;
        Some(actual)
    }

    /// Scroll momentum ended. Returns a jump when resting on a clone.
    ///
    /// The page is recomputed from the absolute offset and clamped to the
    /// extended range, so a fling past either end still lands on a clone.
    pub fn on_settle(&mut self, offset_x: f64) -> Option<ViewportCommand> {
        let n = self.len();
        let page = self.raw_page(offset_x).clamp(0, n as i64 + 1) as usize;

        if page == 0 {
            self.state = CarouselState::OnSentinel(Sentinel::Leading);
            return self.jump_from(Sentinel::Leading);
        }
        if page == n + 1 {
            self.state = CarouselState::OnSentinel(Sentinel::Trailing);
            return self.jump_from(Sentinel::Trailing);
        }

        self.state = CarouselState::AtRest(page);
        self.active = page - 1;
        self.jump_issued = None;
        None
    }

    /// Auto-advance tick. Nothing happens while a video is playing.
    pub fn on_timer(&mut self) -> Option<ViewportCommand> {
        if self.video_playing {
            return None;
        }

        let n = self.len();
        let target = if self.active < n - 1 { self.active + 2 } else { n + 1 };
        self.state = CarouselState::Animating(target);
        Some(ViewportCommand::AnimateTo(target))
    }

    /// Second half of a timer wrap, once the animation into the trailing
    /// clone had time to finish
    pub fn complete_wrap(&mut self) -> Option<ViewportCommand> {
        if !self.is_wrapping() {
            return None;
        }
        self.state = CarouselState::OnSentinel(Sentinel::Trailing);
        self.jump_from(Sentinel::Trailing)
    }

    /// Pagination dot `index` is highlighted
    #[must_use]
    pub fn is_dot_active(&self, index: usize) -> bool {
        self.active == index
            || (index == 0 && self.state == CarouselState::OnSentinel(Sentinel::Trailing))
    }

    fn landing_state(&self, page: usize) -> CarouselState {
        if page == 0 {
            CarouselState::OnSentinel(Sentinel::Leading)
        } else if page == self.len() + 1 {
            CarouselState::OnSentinel(Sentinel::Trailing)
        } else {
            CarouselState::AtRest(page)
        }
    }

    fn jump_from(&mut self, sentinel: Sentinel) -> Option<ViewportCommand> {
        if self.jump_issued == Some(sentinel) {
            return None;
        }
        self.jump_issued = Some(sentinel);

        let target = match sentinel {
            Sentinel::Leading => self.len(),
            Sentinel::Trailing => 1,
        };
        self.active = target - 1;
        Some(ViewportCommand::JumpTo(target))
    }
}
