//! Collaborators of the edit session
//!
//! [`CanonicalStore`] is the normalized store of saved objects, their data,
//! the object → tags map and the tags themselves. It is read to seed edit
//! states and written only with backend-confirmed results.
//!
//! [`SaveCollaborator`] talks to the backend. Its methods are the only
//! suspend points of an edit session; see [`super::EditSessionStore`] for the
//! two-phase begin/complete/fail flows built around them.

use crate::edit::CompositeSavePayload;
use crate::models::{
    CanonicalObject, ObjectAttributes, ObjectData, ObjectId, ObjectType, Tag, TagId, TagRef,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Saved (backend-confirmed) state
pub trait CanonicalStore: Send + Sync {
    //
    // READS
    //

    fn get_object(&self, object_id: ObjectId) -> Option<ObjectAttributes>;

    fn get_object_data(&self, object_id: ObjectId, object_type: ObjectType) -> Option<ObjectData>;

    /// Empty when the object has no tags or is unknown
    fn get_object_tags(&self, object_id: ObjectId) -> BTreeSet<TagId>;

    fn get_tag(&self, tag_id: TagId) -> Option<Tag>;

    /// Case-insensitive lookup
    fn find_tag_by_name(&self, name: &str) -> Option<Tag>;

    /// Attributes and tags of an object in one record
    fn canonical_object(&self, object_id: ObjectId) -> Option<CanonicalObject> {
        let attributes = self.get_object(object_id)?;
        Some(CanonicalObject {
            object_id,
            attributes,
            current_tag_ids: self.get_object_tags(object_id),
        })
    }

    //
    // WRITES
    //

    fn upsert_tags(&mut self, tags: Vec<Tag>);

    /// Replace the tags of an object, bumping its `modified_at` when given
    fn set_object_tags(
        &mut self,
        object_id: ObjectId,
        tag_ids: BTreeSet<TagId>,
        modified_at: Option<DateTime<Utc>>,
    );

    fn upsert_object(&mut self, object: CanonicalObject, data: Option<ObjectData>);

    fn remove_object(&mut self, object_id: ObjectId);
}

/// Response of a single-object tag save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSaveResult {
    /// One id per added tag ref, in request order; new names resolved
    pub resolved_tag_ids: Vec<TagId>,
    pub modified_at: Option<DateTime<Utc>>,
    /// Tags created for new names
    #[serde(default)]
    pub created_tags: Vec<Tag>,
}

/// Response of a bulk tag save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTagSaveResult {
    pub added_tag_ids: Vec<TagId>,
    pub removed_tag_ids: Vec<TagId>,
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_tags: Vec<Tag>,
}

/// Outgoing payload of an object save
///
/// `object_id` is the sentinel id for objects that don't exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSavePayload {
    pub object_id: ObjectId,
    pub is_new: bool,
    pub attributes: ObjectAttributes,
    /// Saved tag ids after the pending diff is applied
    pub tag_ids: BTreeSet<TagId>,
    /// Tags to create and add
    pub new_tag_names: Vec<String>,
    pub data: ObjectData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite: Option<CompositeSavePayload>,
    /// New or modified subobjects saved along with a composite
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subobjects: Vec<ObjectSavePayload>,
}

/// Response of an object save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedObject {
    /// Canonical record with the id assigned by the backend
    pub object: CanonicalObject,
    pub data: Option<ObjectData>,
    #[serde(default)]
    pub created_tags: Vec<Tag>,
    #[serde(default)]
    pub subobjects: Vec<SavedSubobject>,
}

/// Subobject saved along with its composite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSubobject {
    /// Id the subobject had in the request (negative for new subobjects)
    pub previous_id: ObjectId,
    pub object: CanonicalObject,
    pub data: Option<ObjectData>,
}

/// Backend persistence
#[async_trait]
pub trait SaveCollaborator: Send + Sync {
    async fn save_object_tags(
        &self,
        object_id: ObjectId,
        added: &[TagRef],
        removed: &[TagId],
    ) -> anyhow::Result<TagSaveResult>;

    async fn save_objects_tags(
        &self,
        object_ids: &[ObjectId],
        added: &[TagRef],
        removed: &[TagId],
    ) -> anyhow::Result<BulkTagSaveResult>;

    async fn save_object(&self, payload: &ObjectSavePayload) -> anyhow::Result<SavedObject>;

    async fn delete_objects(
        &self,
        object_ids: &[ObjectId],
        delete_subobjects: bool,
    ) -> anyhow::Result<()>;
}
