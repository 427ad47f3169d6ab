//! Shared fixtures for edit session integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use objectshelf_core::models::{
    CanonicalObject, CompositeData, CompositeSubobject, LinkData, ObjectAttributes, ObjectData,
    ObjectId, ObjectType, Tag, TagId, TagRef,
};
use objectshelf_core::session::{
    BulkTagSaveResult, EditSessionStore, InMemoryCanonicalStore, ObjectSavePayload,
    SaveCollaborator, SavedObject, SavedSubobject, TagSaveResult,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

pub type TestStore = EditSessionStore<InMemoryCanonicalStore, FakeSaver>;

/// Timestamp every fake save reports
pub fn saved_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// Backend double: records every call, assigns ids, optionally fails
pub struct FakeSaver {
    fail_with: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
    saved_payloads: Mutex<Vec<ObjectSavePayload>>,
    next_tag_id: AtomicI64,
    next_object_id: AtomicI64,
}

impl Default for FakeSaver {
    fn default() -> Self {
        Self {
            fail_with: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            saved_payloads: Mutex::new(Vec::new()),
            next_tag_id: AtomicI64::new(100),
            next_object_id: AtomicI64::new(1000),
        }
    }
}

impl FakeSaver {
    pub fn fail_next(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn saved_payloads(&self) -> Vec<ObjectSavePayload> {
        self.saved_payloads.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.fail_with.lock().unwrap().take() {
            Some(message) => Err(anyhow::anyhow!(message)),
            None => Ok(()),
        }
    }

    fn resolve(&self, added: &[TagRef]) -> (Vec<TagId>, Vec<Tag>) {
        let mut ids = Vec::new();
        let mut created = Vec::new();
        for tag in added {
            match tag {
                TagRef::Existing { id } => ids.push(*id),
                TagRef::New { name } => {
                    let id = self.next_tag_id.fetch_add(1, Ordering::SeqCst);
                    created.push(Tag::new(id, name.clone()));
                    ids.push(id);
                }
            }
        }
        (ids, created)
    }

    fn assign_id(&self, object_id: ObjectId) -> ObjectId {
        if object_id > 0 {
            object_id
        } else {
            self.next_object_id.fetch_add(1, Ordering::SeqCst)
        }
    }
}

#[async_trait]
impl SaveCollaborator for FakeSaver {
    async fn save_object_tags(
        &self,
        object_id: ObjectId,
        added: &[TagRef],
        removed: &[TagId],
    ) -> anyhow::Result<TagSaveResult> {
        self.record(format!("save_object_tags({})", object_id))?;
        let _ = removed;
        let (resolved_tag_ids, created_tags) = self.resolve(added);
        Ok(TagSaveResult {
            resolved_tag_ids,
            modified_at: Some(saved_at()),
            created_tags,
        })
    }

    async fn save_objects_tags(
        &self,
        object_ids: &[ObjectId],
        added: &[TagRef],
        removed: &[TagId],
    ) -> anyhow::Result<BulkTagSaveResult> {
        self.record(format!("save_objects_tags({:?})", object_ids))?;
        let (added_tag_ids, created_tags) = self.resolve(added);
        Ok(BulkTagSaveResult {
            added_tag_ids,
            removed_tag_ids: removed.to_vec(),
            modified_at: Some(saved_at()),
            created_tags,
        })
    }

    async fn save_object(&self, payload: &ObjectSavePayload) -> anyhow::Result<SavedObject> {
        self.record(format!("save_object({})", payload.object_id))?;
        self.saved_payloads.lock().unwrap().push(payload.clone());

        let mut ids: HashMap<ObjectId, ObjectId> = HashMap::new();
        let mut subobjects = Vec::new();
        for sub in &payload.subobjects {
            let object_id = self.assign_id(sub.object_id);
            ids.insert(sub.object_id, object_id);
            subobjects.push(SavedSubobject {
                previous_id: sub.object_id,
                object: saved_record(object_id, sub),
                data: Some(sub.data.clone()),
            });
        }

        let object_id = self.assign_id(payload.object_id);
        let data = match &payload.data {
            ObjectData::Composite(composite) => ObjectData::Composite(CompositeData {
                subobjects: composite
                    .subobjects
                    .iter()
                    .map(|s| CompositeSubobject {
                        subobject_id: ids.get(&s.subobject_id).copied().unwrap_or(s.subobject_id),
                        ..s.clone()
                    })
                    .collect(),
                ..composite.clone()
            }),
            other => other.clone(),
        };

        let mut object = saved_record(object_id, payload);
        let (new_ids, created_tags) = self.resolve(
            &payload
                .new_tag_names
                .iter()
                .map(|name| TagRef::named(name.clone()))
                .collect::<Vec<_>>(),
        );
        object.current_tag_ids.extend(new_ids);

        Ok(SavedObject {
            object,
            data: Some(data),
            created_tags,
            subobjects,
        })
    }

    async fn delete_objects(
        &self,
        object_ids: &[ObjectId],
        delete_subobjects: bool,
    ) -> anyhow::Result<()> {
        self.record(format!(
            "delete_objects({:?}, {})",
            object_ids, delete_subobjects
        ))
    }
}

fn saved_record(object_id: ObjectId, payload: &ObjectSavePayload) -> CanonicalObject {
    let mut attributes = payload.attributes.clone();
    attributes.modified_at = Some(saved_at());
    if attributes.created_at.is_none() {
        attributes.created_at = Some(saved_at());
    }
    CanonicalObject {
        object_id,
        attributes,
        current_tag_ids: payload.tag_ids.clone(),
    }
}

pub fn link_object(object_id: ObjectId, tags: &[TagId]) -> CanonicalObject {
    let mut attributes = ObjectAttributes::new(ObjectType::Link);
    attributes.object_name = format!("Link #{}", object_id);
    CanonicalObject {
        object_id,
        attributes,
        current_tag_ids: tags.iter().copied().collect(),
    }
}

pub fn link_data(object_id: ObjectId) -> ObjectData {
    ObjectData::Link(LinkData {
        link: format!("https://example.com/{}", object_id),
        show_description_as_link: false,
    })
}

pub fn composite_object(object_id: ObjectId) -> CanonicalObject {
    let mut attributes = ObjectAttributes::new(ObjectType::Composite);
    attributes.object_name = format!("Composite #{}", object_id);
    CanonicalObject {
        object_id,
        attributes,
        current_tag_ids: Default::default(),
    }
}

/// Composite data from columns of subobject ids, top to bottom
pub fn composite_data(columns: &[&[ObjectId]]) -> ObjectData {
    let subobjects = columns
        .iter()
        .enumerate()
        .flat_map(|(column, ids)| {
            ids.iter()
                .enumerate()
                .map(move |(row, id)| CompositeSubobject::new(*id, column, row))
        })
        .collect();
    ObjectData::Composite(CompositeData {
        subobjects,
        ..CompositeData::default()
    })
}

/// Canonical store with link objects `(id, tags)` and the tags 1..=9
pub fn canonical_with_links(links: &[(ObjectId, &[TagId])]) -> InMemoryCanonicalStore {
    let mut canonical =
        InMemoryCanonicalStore::new().with_tags((1..=9).map(|id| Tag::new(id, format!("tag {}", id))));
    for (object_id, tags) in links {
        canonical = canonical.with_object(link_object(*object_id, tags), Some(link_data(*object_id)));
    }
    canonical
}

pub fn store_with_links(links: &[(ObjectId, &[TagId])]) -> TestStore {
    EditSessionStore::new(canonical_with_links(links), FakeSaver::default())
}
