//! Single object edit state
//!
//! The pending, unsaved changes to one object: a mutable copy of its attributes
//! and data, the tag diff, and for composites the subobject grid. The state also
//! keeps the canonical values it was seeded from, which the indicator predicates
//! compare against.

use super::composite_layout::CompositeLayout;
use super::tag_diff::{merge, AddedTags};
use super::tag_toggle::TagEditState;
use crate::models::{
    AttributesProjection, CanonicalObject, CompositeData, ObjectAttributes, ObjectData, ObjectId,
    ObjectType, TagId, TagRef,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Canonical values an edit state was seeded from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditBaseline {
    attributes: ObjectAttributes,
    tag_ids: BTreeSet<TagId>,
    data: ObjectData,
    composite_layout: Option<CompositeLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEditState {
    object_id: ObjectId,
    pub attributes: ObjectAttributes,
    /// For composites the subobject list lives in the layout; `data` only keeps
    /// the composite-level settings.
    pub data: ObjectData,
    added_tags: AddedTags,
    removed_tag_ids: BTreeSet<TagId>,
    composite_layout: Option<CompositeLayout>,
    baseline: EditBaseline,
}

/// Split composite data into its settings and its grid
fn split_layout(data: ObjectData) -> (ObjectData, Option<CompositeLayout>) {
    match data {
        ObjectData::Composite(composite) => {
            let layout = CompositeLayout::from_subobjects(&composite.subobjects);
            let settings = CompositeData {
                subobjects: Vec::new(),
                ..composite
            };
            (ObjectData::Composite(settings), Some(layout))
        }
        other => (other, None),
    }
}

impl ObjectEditState {
    /// Seed from canonical state with empty pending sets
    ///
    /// When `data` is `None` (not loaded, or failed to load) an empty payload of
    /// the object's type is used.
    pub fn seed(object: &CanonicalObject, data: Option<ObjectData>) -> Self {
        let data = data.unwrap_or_else(|| ObjectData::empty(object.object_type()));
        let (data, composite_layout) = split_layout(data);

        Self {
            object_id: object.object_id,
            attributes: object.attributes.clone(),
            data: data.clone(),
            added_tags: AddedTags::new(),
            removed_tag_ids: BTreeSet::new(),
            composite_layout: composite_layout.clone(),
            baseline: EditBaseline {
                attributes: object.attributes.clone(),
                tag_ids: object.current_tag_ids.clone(),
                data,
                composite_layout,
            },
        }
    }

    /// Empty state for an object that does not exist on the backend yet
    ///
    /// A new composite starts with one column holding one new subobject.
    pub fn new_object(object_id: ObjectId, object_type: ObjectType) -> Self {
        let attributes = ObjectAttributes::new(object_type);
        let data = ObjectData::empty(object_type);
        let composite_layout = (object_type == ObjectType::Composite).then(CompositeLayout::new);

        let mut state = Self {
            object_id,
            attributes: attributes.clone(),
            data: data.clone(),
            added_tags: AddedTags::new(),
            removed_tag_ids: BTreeSet::new(),
            composite_layout: composite_layout.clone(),
            baseline: EditBaseline {
                attributes,
                tag_ids: BTreeSet::new(),
                data,
                composite_layout,
            },
        };
        if let Some(layout) = state.composite_layout.as_mut() {
            layout.add_new_subobject();
        }
        state
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn object_type(&self) -> ObjectType {
        self.attributes.object_type
    }

    /// Unsaved objects use the sentinel id (`<= 0`); unsaved subobjects are negative
    pub fn is_new(&self) -> bool {
        self.object_id <= 0
    }

    /// Switch the type of the edited object, replacing its data with an empty payload
    pub fn set_object_type(&mut self, object_type: ObjectType) {
        if self.attributes.object_type == object_type {
            return;
        }
        self.attributes.object_type = object_type;
        self.data = ObjectData::empty(object_type);
        self.composite_layout = (object_type == ObjectType::Composite).then(|| {
            let mut layout = CompositeLayout::new();
            layout.add_new_subobject();
            layout
        });
    }

    pub fn composite_layout(&self) -> Option<&CompositeLayout> {
        self.composite_layout.as_ref()
    }

    pub fn composite_layout_mut(&mut self) -> Option<&mut CompositeLayout> {
        self.composite_layout.as_mut()
    }

    /// Data as it would be saved, with the grid folded back into composite data
    ///
    /// Deleted subobjects are left out; see [`CompositeLayout::to_save_payload`].
    pub fn data_for_save(&self) -> ObjectData {
        match (&self.data, &self.composite_layout) {
            (ObjectData::Composite(settings), Some(layout)) => {
                ObjectData::Composite(CompositeData {
                    subobjects: layout.to_save_payload().subobjects,
                    ..settings.clone()
                })
            }
            (data, _) => data.clone(),
        }
    }

    //
    // TAGS
    //

    pub fn added_tags(&self) -> &AddedTags {
        &self.added_tags
    }

    pub fn removed_tag_ids(&self) -> &BTreeSet<TagId> {
        &self.removed_tag_ids
    }

    /// Canonical tags this state was seeded (or last reset) from
    pub fn current_tag_ids(&self) -> &BTreeSet<TagId> {
        &self.baseline.tag_ids
    }

    pub fn has_canonical_tag(&self, tag_id: TagId) -> bool {
        self.baseline.tag_ids.contains(&tag_id)
    }

    pub fn tag_state(&self, tag: &TagRef) -> TagEditState {
        TagEditState::of(tag, &self.added_tags, &self.removed_tag_ids)
    }

    /// Click on a tag: start or stop adding it, or start or stop removing it
    ///
    /// Saved tags already on the object go through removal; everything else
    /// (other saved tags, new tag names) goes through addition.
    pub fn toggle_tag(&mut self, tag: TagRef) -> TagEditState {
        let on_object = tag.id().is_some_and(|id| self.has_canonical_tag(id));
        let next = self.tag_state(&tag).next(on_object);
        next.write(&tag, &mut self.added_tags, &mut self.removed_tag_ids);
        tracing::debug!("Object {} tag {} -> {:?}", self.object_id, tag, next);
        next
    }

    /// Force a tag into the given state
    pub fn set_tag_state(&mut self, tag: &TagRef, state: TagEditState) {
        state.write(tag, &mut self.added_tags, &mut self.removed_tag_ids);
    }

    pub fn has_tag_diff(&self) -> bool {
        !self.added_tags.is_empty() || !self.removed_tag_ids.is_empty()
    }

    pub fn clear_tag_diff(&mut self) {
        self.added_tags.clear();
        self.removed_tag_ids.clear();
    }

    /// Tag ids to persist; pending new names are not included
    pub fn merged_tag_ids(&self) -> BTreeSet<TagId> {
        merge(&self.baseline.tag_ids, &self.added_tags, &self.removed_tag_ids)
    }

    /// Accept committed tags as the new baseline and clear the tag diff
    ///
    /// Attribute and data edits are kept.
    pub fn reset_tags(&mut self, tag_ids: BTreeSet<TagId>, modified_at: Option<DateTime<Utc>>) {
        self.clear_tag_diff();
        self.baseline.tag_ids = tag_ids;
        if modified_at.is_some() {
            self.attributes.modified_at = modified_at;
            self.baseline.attributes.modified_at = modified_at;
        }
    }

    /// Overwrite the projected fields in both the edit copy and the baseline
    ///
    /// Fields outside the projection keep their pending edits.
    pub fn refresh_attributes(&mut self, projection: &AttributesProjection) {
        self.attributes.apply(projection);
        self.baseline.attributes.apply(projection);
    }

    //
    // INDICATORS
    //

    /// Name empty, or a field required by the object type empty
    pub fn has_validation_error(&self) -> bool {
        if self.attributes.object_name.trim().is_empty() {
            return true;
        }
        if self.data.is_missing_required_field() {
            return true;
        }
        match &self.composite_layout {
            Some(layout) => layout.positions().all(|p| p.is_deleted()),
            None => false,
        }
    }

    pub fn is_existing_with_modified_attributes(&self) -> bool {
        !self.is_new()
            && self
                .attributes
                .editable_fields_differ(&self.baseline.attributes)
    }

    pub fn is_existing_with_modified_tags(&self) -> bool {
        !self.is_new() && self.has_tag_diff()
    }

    /// Type-specific data or grid structure differs from the baseline
    ///
    /// Expansion and tab selection are parameters, not data.
    pub fn is_existing_with_modified_data(&self) -> bool {
        if self.is_new() {
            return false;
        }
        if self.data != self.baseline.data {
            return true;
        }
        match (&self.composite_layout, &self.baseline.composite_layout) {
            (Some(current), Some(baseline)) => current.structure() != baseline.structure(),
            (None, None) => false,
            _ => true,
        }
    }

    /// Display parameters of an existing subobject differ from the baseline
    pub fn is_existing_with_modified_parameters(&self, subobject_id: ObjectId) -> bool {
        let current = self
            .composite_layout
            .as_ref()
            .and_then(|layout| layout.position(subobject_id));
        let baseline = self
            .baseline
            .composite_layout
            .as_ref()
            .and_then(|layout| layout.position(subobject_id));

        match (current, baseline) {
            (Some(current), Some(baseline)) => {
                current.expanded != baseline.expanded
                    || current.selected_tab != baseline.selected_tab
                    || current.show_description_composite != baseline.show_description_composite
            }
            _ => false,
        }
    }
}
