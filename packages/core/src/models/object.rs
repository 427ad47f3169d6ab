//! Object Data Structures
//!
//! Canonical object records as held by the normalized store, plus the editable
//! attribute set that edit states copy and diverge from.
//!
//! # View Modes
//!
//! Attribute sets are sometimes copied partially, e.g. composite subobject cards
//! only load the "basic" fields. Partial copies go through
//! [`ObjectAttributes::project`] and [`ObjectAttributes::apply`], which use an
//! explicit allow-list per [`AttributeViewMode`].
//!
//! # Examples
//!
//! ```rust
//! use objectshelf_core::models::{AttributeViewMode, ObjectAttributes, ObjectType};
//!
//! let mut attributes = ObjectAttributes::new(ObjectType::Link);
//! attributes.object_name = "Rust book".to_string();
//!
//! let basic = attributes.project(AttributeViewMode::Basic);
//! assert_eq!(basic.object_name.as_deref(), Some("Rust book"));
//! assert!(basic.display_in_feed.is_none());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of an object or subobject.
///
/// Saved objects have positive ids. The new-object sentinel is `0` by default and
/// unsaved composite subobjects use negative ids.
pub type ObjectId = i64;

/// Identifier of a saved tag
pub type TagId = i64;

/// Object type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Link,
    Markdown,
    ToDoList,
    Composite,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Link => "link",
            ObjectType::Markdown => "markdown",
            ObjectType::ToDoList => "to_do_list",
            ObjectType::Composite => "composite",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "link" => Ok(ObjectType::Link),
            "markdown" => Ok(ObjectType::Markdown),
            "to_do_list" => Ok(ObjectType::ToDoList),
            "composite" => Ok(ObjectType::Composite),
            other => Err(format!("Unknown object type '{}'", other)),
        }
    }
}

/// Editable attributes of an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectAttributes {
    pub object_type: ObjectType,
    pub object_name: String,
    pub object_description: String,
    pub is_published: bool,
    pub display_in_feed: bool,
    pub feed_timestamp: Option<DateTime<Utc>>,
    pub show_description: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl ObjectAttributes {
    /// Empty attribute set for a not-yet-saved object of the given type
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            object_name: String::new(),
            object_description: String::new(),
            is_published: false,
            display_in_feed: false,
            feed_timestamp: None,
            show_description: true,
            created_at: None,
            modified_at: None,
        }
    }

    /// Compare the user-editable fields, ignoring server-managed timestamps
    pub fn editable_fields_differ(&self, other: &ObjectAttributes) -> bool {
        self.object_type != other.object_type
            || self.object_name != other.object_name
            || self.object_description != other.object_description
            || self.is_published != other.is_published
            || self.display_in_feed != other.display_in_feed
            || self.feed_timestamp != other.feed_timestamp
            || self.show_description != other.show_description
    }

    /// Copy the fields allowed by `mode` into a projection
    pub fn project(&self, mode: AttributeViewMode) -> AttributesProjection {
        let mut projection = AttributesProjection::default();
        for field in mode.fields() {
            match field {
                AttributeField::ObjectType => projection.object_type = Some(self.object_type),
                AttributeField::ObjectName => {
                    projection.object_name = Some(self.object_name.clone())
                }
                AttributeField::ObjectDescription => {
                    projection.object_description = Some(self.object_description.clone())
                }
                AttributeField::IsPublished => projection.is_published = Some(self.is_published),
                AttributeField::DisplayInFeed => {
                    projection.display_in_feed = Some(self.display_in_feed)
                }
                AttributeField::FeedTimestamp => {
                    projection.feed_timestamp = Some(self.feed_timestamp)
                }
                AttributeField::ShowDescription => {
                    projection.show_description = Some(self.show_description)
                }
                AttributeField::CreatedAt => projection.created_at = Some(self.created_at),
                AttributeField::ModifiedAt => projection.modified_at = Some(self.modified_at),
            }
        }
        projection
    }

    /// Overwrite the fields present in `projection`, leaving the rest untouched
    pub fn apply(&mut self, projection: &AttributesProjection) {
        if let Some(object_type) = projection.object_type {
            self.object_type = object_type;
        }
        if let Some(name) = &projection.object_name {
            self.object_name = name.clone();
        }
        if let Some(description) = &projection.object_description {
            self.object_description = description.clone();
        }
        if let Some(is_published) = projection.is_published {
            self.is_published = is_published;
        }
        if let Some(display_in_feed) = projection.display_in_feed {
            self.display_in_feed = display_in_feed;
        }
        if let Some(feed_timestamp) = projection.feed_timestamp {
            self.feed_timestamp = feed_timestamp;
        }
        if let Some(show_description) = projection.show_description {
            self.show_description = show_description;
        }
        if let Some(created_at) = projection.created_at {
            self.created_at = created_at;
        }
        if let Some(modified_at) = projection.modified_at {
            self.modified_at = modified_at;
        }
    }
}

/// Individually addressable attribute fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeField {
    ObjectType,
    ObjectName,
    ObjectDescription,
    IsPublished,
    DisplayInFeed,
    FeedTimestamp,
    ShowDescription,
    CreatedAt,
    ModifiedAt,
}

const BASIC_FIELDS: &[AttributeField] = &[
    AttributeField::ObjectType,
    AttributeField::ObjectName,
    AttributeField::ObjectDescription,
    AttributeField::IsPublished,
    AttributeField::ShowDescription,
    AttributeField::CreatedAt,
    AttributeField::ModifiedAt,
];

const FULL_FIELDS: &[AttributeField] = &[
    AttributeField::ObjectType,
    AttributeField::ObjectName,
    AttributeField::ObjectDescription,
    AttributeField::IsPublished,
    AttributeField::DisplayInFeed,
    AttributeField::FeedTimestamp,
    AttributeField::ShowDescription,
    AttributeField::CreatedAt,
    AttributeField::ModifiedAt,
];

/// Which attribute fields a view loads
///
/// `Basic` is what subobject cards and feed items load; `Full` is the edit page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeViewMode {
    #[default]
    Basic,
    Full,
}

impl AttributeViewMode {
    /// Allow-list of fields for this view mode
    pub fn fields(self) -> &'static [AttributeField] {
        match self {
            AttributeViewMode::Basic => BASIC_FIELDS,
            AttributeViewMode::Full => FULL_FIELDS,
        }
    }
}

impl std::str::FromStr for AttributeViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(AttributeViewMode::Basic),
            "full" => Ok(AttributeViewMode::Full),
            other => Err(format!("Unknown attribute view mode '{}'", other)),
        }
    }
}

/// Partial attribute set produced by [`ObjectAttributes::project`]
///
/// `None` means "not part of the projection". Nullable fields are doubly wrapped
/// so that a projected `None` value can still be copied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributesProjection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<ObjectType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_in_feed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_timestamp: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_description: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<Option<DateTime<Utc>>>,
}

/// Saved object as held by the normalized store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalObject {
    pub object_id: ObjectId,
    pub attributes: ObjectAttributes,
    #[serde(default)]
    pub current_tag_ids: BTreeSet<TagId>,
}

impl CanonicalObject {
    pub fn object_type(&self) -> ObjectType {
        self.attributes.object_type
    }
}
