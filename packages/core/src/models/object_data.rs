//! Type-specific object payloads
//!
//! Each object type carries its own data record. Composite data lists the
//! subobjects placed in its grid; while editing, that list is replaced by a
//! [`CompositeLayout`](crate::edit::CompositeLayout).

use super::object::{ObjectId, ObjectType};
use serde::{Deserialize, Serialize};

/// Data payload of an object, one variant per [`ObjectType`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectData {
    Link(LinkData),
    Markdown(MarkdownData),
    ToDoList(ToDoListData),
    Composite(CompositeData),
}

impl ObjectData {
    /// Default payload for a freshly created object
    pub fn empty(object_type: ObjectType) -> Self {
        match object_type {
            ObjectType::Link => ObjectData::Link(LinkData::default()),
            ObjectType::Markdown => ObjectData::Markdown(MarkdownData::default()),
            ObjectType::ToDoList => ObjectData::ToDoList(ToDoListData::default()),
            ObjectType::Composite => ObjectData::Composite(CompositeData::default()),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            ObjectData::Link(_) => ObjectType::Link,
            ObjectData::Markdown(_) => ObjectType::Markdown,
            ObjectData::ToDoList(_) => ObjectType::ToDoList,
            ObjectData::Composite(_) => ObjectType::Composite,
        }
    }

    /// Whether a field the type requires is empty
    ///
    /// Composite emptiness depends on the edit layout and is checked there.
    pub fn is_missing_required_field(&self) -> bool {
        match self {
            ObjectData::Link(link) => link.link.trim().is_empty(),
            ObjectData::Markdown(markdown) => markdown.raw_text.trim().is_empty(),
            ObjectData::ToDoList(list) => list.items.is_empty(),
            ObjectData::Composite(_) => false,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeData> {
        match self {
            ObjectData::Composite(data) => Some(data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkData {
    pub link: String,
    #[serde(default)]
    pub show_description_as_link: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownData {
    pub raw_text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToDoListItemState {
    #[default]
    Active,
    Optional,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToDoListItem {
    pub item_text: String,
    #[serde(default)]
    pub commentary: String,
    #[serde(default)]
    pub item_state: ToDoListItemState,
    #[serde(default)]
    pub indent: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToDoListSortType {
    #[default]
    Default,
    State,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToDoListData {
    pub items: Vec<ToDoListItem>,
    #[serde(default)]
    pub sort_type: ToDoListSortType,
}

/// How a composite renders its subobjects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeDisplayMode {
    #[default]
    Basic,
    GroupedLinks,
    MultiColumn,
    Chapters,
}

/// Per-subobject override of the subobject's own "show description" flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowDescriptionComposite {
    Yes,
    No,
    #[default]
    Inherit,
}

/// Canonical grid entry of a composite object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeSubobject {
    pub subobject_id: ObjectId,
    pub column: usize,
    pub row: usize,
    #[serde(default)]
    pub selected_tab: u32,
    #[serde(default = "default_expanded")]
    pub is_expanded: bool,
    #[serde(default)]
    pub show_description_composite: ShowDescriptionComposite,
}

fn default_expanded() -> bool {
    true
}

impl CompositeSubobject {
    pub fn new(subobject_id: ObjectId, column: usize, row: usize) -> Self {
        Self {
            subobject_id,
            column,
            row,
            selected_tab: 0,
            is_expanded: true,
            show_description_composite: ShowDescriptionComposite::Inherit,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeData {
    #[serde(default)]
    pub display_mode: CompositeDisplayMode,
    #[serde(default)]
    pub numerate_chapters: bool,
    #[serde(default)]
    pub subobjects: Vec<CompositeSubobject>,
}
