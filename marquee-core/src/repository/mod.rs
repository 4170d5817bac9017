pub mod layout;

pub use layout::{LayoutRepository, MemoryLayoutRepository, PgLayoutRepository};

#[cfg(test)]
pub use layout::MockLayoutRepository;
