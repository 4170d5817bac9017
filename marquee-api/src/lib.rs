// Marquee API Library
//
// HTTP and WebSocket surface for layouts

pub mod http;

// Re-export commonly used types
pub use http::{create_router, AppState};
