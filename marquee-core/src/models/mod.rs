pub mod content;
pub mod id;
pub mod layout;
pub mod section;

pub use content::ContentRef;
pub use id::{generate_id, ContentId, PageKey, SectionId};
pub use layout::{CoercionReport, Layout};
pub use section::{Section, SectionType};
