//! In-memory canonical store
//!
//! Plain maps behind [`CanonicalStore`]. Hosts without their own normalized
//! store use it directly; tests use it to seed canonical state.

use super::collaborators::CanonicalStore;
use crate::models::{
    CanonicalObject, ObjectAttributes, ObjectData, ObjectId, ObjectType, Tag, TagId,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Default)]
pub struct InMemoryCanonicalStore {
    objects: HashMap<ObjectId, ObjectAttributes>,
    data: HashMap<ObjectId, ObjectData>,
    objects_tags: HashMap<ObjectId, BTreeSet<TagId>>,
    tags: BTreeMap<TagId, Tag>,
}

impl InMemoryCanonicalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of an object with its tags and data
    pub fn with_object(mut self, object: CanonicalObject, data: Option<ObjectData>) -> Self {
        self.upsert_object(object, data);
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.upsert_tags(tags.into_iter().collect());
        self
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }
}

impl CanonicalStore for InMemoryCanonicalStore {
    fn get_object(&self, object_id: ObjectId) -> Option<ObjectAttributes> {
        self.objects.get(&object_id).cloned()
    }

    fn get_object_data(&self, object_id: ObjectId, object_type: ObjectType) -> Option<ObjectData> {
        self.data
            .get(&object_id)
            .filter(|data| data.object_type() == object_type)
            .cloned()
    }

    fn get_object_tags(&self, object_id: ObjectId) -> BTreeSet<TagId> {
        self.objects_tags
            .get(&object_id)
            .cloned()
            .unwrap_or_default()
    }

    fn get_tag(&self, tag_id: TagId) -> Option<Tag> {
        self.tags.get(&tag_id).cloned()
    }

    fn find_tag_by_name(&self, name: &str) -> Option<Tag> {
        let name = name.trim().to_lowercase();
        self.tags
            .values()
            .find(|tag| tag.tag_name.to_lowercase() == name)
            .cloned()
    }

    fn upsert_tags(&mut self, tags: Vec<Tag>) {
        for tag in tags {
            self.tags.insert(tag.tag_id, tag);
        }
    }

    fn set_object_tags(
        &mut self,
        object_id: ObjectId,
        tag_ids: BTreeSet<TagId>,
        modified_at: Option<DateTime<Utc>>,
    ) {
        self.objects_tags.insert(object_id, tag_ids);
        if let (Some(attributes), Some(modified_at)) =
            (self.objects.get_mut(&object_id), modified_at)
        {
            attributes.modified_at = Some(modified_at);
        }
    }

    fn upsert_object(&mut self, object: CanonicalObject, data: Option<ObjectData>) {
        let object_id = object.object_id;
        self.objects.insert(object_id, object.attributes);
        self.objects_tags.insert(object_id, object.current_tag_ids);
        match data {
            Some(data) => {
                self.data.insert(object_id, data);
            }
            None => {
                self.data.remove(&object_id);
            }
        }
    }

    fn remove_object(&mut self, object_id: ObjectId) {
        self.objects.remove(&object_id);
        self.data.remove(&object_id);
        self.objects_tags.remove(&object_id);
    }
}
