pub mod catalog;
pub mod editor;
pub mod layout_store;
pub mod publisher;

pub use catalog::{CatalogClient, ContentResolver, SearchQuery};
pub use editor::{
    apply, ContentTarget, Direction, EditorCommand, LayoutEditor, SectionField, HERO_TARGET,
};
pub use layout_store::LayoutStore;
pub use publisher::{LayoutPublisher, NoopPublisher};
