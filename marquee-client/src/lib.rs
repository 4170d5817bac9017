//! Screen-side pieces of marquee: the per-screen layout cache, its live
//! invalidation stream and the looping hero carousel.

pub mod auto_advance;
pub mod cache;
pub mod carousel;
pub mod config;
pub mod error;
pub mod session;
pub mod source;
pub mod stream;

pub use auto_advance::AutoAdvance;
pub use cache::{CacheStatus, ClientLayoutCache};
pub use carousel::{CarouselEngine, CarouselState, Sentinel, Slide, ViewportCommand};
pub use config::{CarouselConfig, ClientConfig};
pub use error::{ClientError, Result};
pub use session::{CacheSnapshot, ScreenSession};
pub use source::{HttpLayoutSource, LayoutSource};
pub use stream::{InvalidationStream, StreamEvent};
