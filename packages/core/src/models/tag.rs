//! Tag model and tag references
//!
//! A tag being edited is either a saved tag (known id) or a name the user typed
//! that does not exist yet. [`TagRef`] keeps the two apart explicitly so that a
//! pending name can never be mistaken for an id.

use super::object::TagId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Saved tag as held by the canonical tag store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub tag_id: TagId,
    pub tag_name: String,
    #[serde(default)]
    pub tag_description: String,
    #[serde(default)]
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(tag_id: TagId, tag_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            tag_id,
            tag_name: tag_name.into(),
            tag_description: String::new(),
            is_published: false,
            created_at: now,
            modified_at: now,
        }
    }
}

/// Reference to a tag in a pending edit
///
/// Existing refs sort before new ones, so ordered collections list saved tags first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TagRef {
    /// A saved tag
    Existing { id: TagId },
    /// A tag name that has not been created on the backend yet
    New { name: String },
}

impl TagRef {
    pub fn existing(id: TagId) -> Self {
        TagRef::Existing { id }
    }

    pub fn named(name: impl Into<String>) -> Self {
        TagRef::New { name: name.into() }
    }

    /// The tag id, if this is a saved tag
    pub fn id(&self) -> Option<TagId> {
        match self {
            TagRef::Existing { id } => Some(*id),
            TagRef::New { .. } => None,
        }
    }

    /// The pending name, if this tag does not exist yet
    pub fn name(&self) -> Option<&str> {
        match self {
            TagRef::Existing { .. } => None,
            TagRef::New { name } => Some(name),
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, TagRef::New { .. })
    }
}

impl From<TagId> for TagRef {
    fn from(id: TagId) -> Self {
        TagRef::existing(id)
    }
}

impl fmt::Display for TagRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagRef::Existing { id } => write!(f, "#{}", id),
            TagRef::New { name } => write!(f, "new:{}", name),
        }
    }
}
