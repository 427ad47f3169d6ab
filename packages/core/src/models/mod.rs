//! Data Models
//!
//! Plain data shared by the edit engine and its collaborators:
//!
//! - `CanonicalObject` / `ObjectAttributes` - saved object state and its editable copy
//! - `ObjectData` - type-specific payloads (link, markdown, to-do list, composite)
//! - `Tag` / `TagRef` - saved tags and references to existing-or-new tags

mod object;
mod object_data;
mod tag;

pub use object::{
    AttributeField, AttributeViewMode, AttributesProjection, CanonicalObject, ObjectAttributes,
    ObjectId, ObjectType, TagId,
};
pub use object_data::{
    CompositeData, CompositeDisplayMode, CompositeSubobject, LinkData, MarkdownData, ObjectData,
    ShowDescriptionComposite, ToDoListData, ToDoListItem, ToDoListItemState, ToDoListSortType,
};
pub use tag::{Tag, TagRef};
