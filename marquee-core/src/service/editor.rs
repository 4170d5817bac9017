//! Layout editing: a disposable draft mutated by a pure command reducer
//!
//! Every edit is an [`EditorCommand`] value folded into the draft with
//! [`apply`], so an editing session can be replayed or tested without any
//! UI. Nothing reaches the store until [`LayoutEditor::save`], which sends
//! the entire draft. Dropping the editor discards unsaved changes.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    models::{
        content::union_by_id, ContentId, ContentRef, Layout, PageKey, Section, SectionId,
        SectionType,
    },
    service::layout_store::LayoutStore,
    Result,
};

/// Wire sentinel naming the hero list as a removal target
pub const HERO_TARGET: &str = "hero";

/// List a content item is removed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentTarget {
    Hero,
    Section(SectionId),
}

impl From<String> for ContentTarget {
    fn from(value: String) -> Self {
        if value == HERO_TARGET {
            Self::Hero
        } else {
            Self::Section(SectionId::from_string(value))
        }
    }
}

impl From<ContentTarget> for String {
    fn from(target: ContentTarget) -> Self {
        match target {
            ContentTarget::Hero => HERO_TARGET.to_string(),
            ContentTarget::Section(id) => id.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// Scalar section fields the editor may set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionField {
    Title,
    Genre,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditorCommand {
    /// Set-union into the hero list; existing entries keep their place
    AddHeroItems { items: Vec<ContentRef> },
    /// Set-union into one section's refs
    AddSectionItems {
        section_id: SectionId,
        items: Vec<ContentRef>,
    },
    RemoveContent {
        target: ContentTarget,
        item_id: ContentId,
    },
    AddSection { section_type: SectionType },
    RemoveSection { id: SectionId },
    /// Swap with the neighbour; no-op at either end
    MoveSection { index: usize, direction: Direction },
    UpdateSection {
        id: SectionId,
        field: SectionField,
        value: String,
    },
    /// Replace the whole draft
    Reset { layout: Layout },
}

/// Fold one command into a draft
#[must_use]
pub fn apply(mut draft: Layout, command: EditorCommand) -> Layout {
    match command {
        EditorCommand::AddHeroItems { items } => {
            let added = union_by_id(&mut draft.hero_content, items);
            debug!(added, "Added hero items");
        }
        EditorCommand::AddSectionItems { section_id, items } => {
            if let Some(section) = draft.section_mut(&section_id) {
                union_by_id(&mut section.content_refs, items);
            }
        }
        EditorCommand::RemoveContent { target, item_id } => {
            let list = match target {
                ContentTarget::Hero => Some(&mut draft.hero_content),
                ContentTarget::Section(id) => draft.section_mut(&id).map(|s| &mut s.content_refs),
            };
            if let Some(list) = list {
                list.retain(|item| item.id != item_id);
            }
        }
        EditorCommand::AddSection { section_type } => {
            let mut id = SectionId::new();
            while draft.section(&id).is_some() {
                id = SectionId::new();
            }
            let mut section = Section::with_id(id, section_type);
            section.order = draft.sections.len();
            draft.sections.push(section);
        }
        EditorCommand::RemoveSection { id } => {
            draft.sections.retain(|s| s.id != id);
            renumber(&mut draft);
        }
        EditorCommand::MoveSection { index, direction } => {
            let neighbour = match direction {
                Direction::Up => index.checked_sub(1),
                Direction::Down => index.checked_add(1),
            };
            if let Some(neighbour) = neighbour {
                if index < draft.sections.len() && neighbour < draft.sections.len() {
                    draft.sections.swap(index, neighbour);
                    renumber(&mut draft);
                }
            }
        }
        EditorCommand::UpdateSection { id, field, value } => {
            if let Some(section) = draft.section_mut(&id) {
                match field {
                    SectionField::Title => section.title = value,
                    SectionField::Genre => {
                        let genre = value.trim();
                        section.genre = (!genre.is_empty()).then(|| genre.to_string());
                    }
                }
            }
        }
        EditorCommand::Reset { layout } => draft = layout,
    }
    draft
}

fn renumber(draft: &mut Layout) {
    for (position, section) in draft.sections.iter_mut().enumerate() {
        section.order = position;
    }
}

/// One editing session over one page's layout
pub struct LayoutEditor {
    store: LayoutStore,
    page: PageKey,
    saved: Layout,
    draft: Layout,
}

impl std::fmt::Debug for LayoutEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutEditor")
            .field("page", &self.page)
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

impl LayoutEditor {
    /// Start a session from the page's current stored layout
    pub async fn open(store: LayoutStore, page: PageKey) -> Result<Self> {
        let layout = store.get(&page).await?;
        Ok(Self::with_layout(store, page, layout))
    }

    /// Start a session from a known layout
    #[must_use]
    pub fn with_layout(store: LayoutStore, page: PageKey, layout: Layout) -> Self {
        Self {
            store,
            page,
            saved: layout.clone(),
            draft: layout,
        }
    }

    #[must_use]
    pub const fn page(&self) -> &PageKey {
        &self.page
    }

    #[must_use]
    pub const fn draft(&self) -> &Layout {
        &self.draft
    }

    /// Whether the draft differs from the last loaded or saved document
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.draft != self.saved
    }

    pub fn dispatch(&mut self, command: EditorCommand) {
        let draft = std::mem::take(&mut self.draft);
        self.draft = apply(draft, command);
    }

    pub fn add_hero_items(&mut self, items: Vec<ContentRef>) {
        self.dispatch(EditorCommand::AddHeroItems { items });
    }

    pub fn add_section_items(&mut self, section_id: SectionId, items: Vec<ContentRef>) {
        self.dispatch(EditorCommand::AddSectionItems { section_id, items });
    }

    pub fn remove_content(&mut self, target: ContentTarget, item_id: ContentId) {
        self.dispatch(EditorCommand::RemoveContent { target, item_id });
    }

    /// Append a section and return its generated id
    pub fn add_section(&mut self, section_type: SectionType) -> SectionId {
        self.dispatch(EditorCommand::AddSection { section_type });
        self.draft
            .sections
            .last()
            .map(|s| s.id.clone())
            .unwrap_or_default()
    }

    pub fn remove_section(&mut self, id: SectionId) {
        self.dispatch(EditorCommand::RemoveSection { id });
    }

    pub fn move_section(&mut self, index: usize, direction: Direction) {
        self.dispatch(EditorCommand::MoveSection { index, direction });
    }

    pub fn update_section(&mut self, id: SectionId, field: SectionField, value: impl Into<String>) {
        self.dispatch(EditorCommand::UpdateSection {
            id,
            field,
            value: value.into(),
        });
    }

    /// Send the whole draft to the store
    ///
    /// On success the draft becomes the persisted document.
    pub async fn save(&mut self) -> Result<Layout> {
        let persisted = self.store.put(&self.page, self.draft.clone()).await?;
        info!(page = %self.page, "Editor draft saved");
        self.saved = persisted.clone();
        self.draft = persisted.clone();
        Ok(persisted)
    }
}
