//! Edit Session Store
//!
//! The table of [`ObjectEditState`]s of one editing session, keyed by object id,
//! together with the canonical store it seeds from and the save collaborator it
//! persists through.
//!
//! # Lifecycle
//!
//! - [`EditSessionStore::get`] seeds an edit state from canonical state on first
//!   access. For composites, every subobject gets its own edit state (seeded with
//!   the configured attribute projection) and subobjects missing from the
//!   canonical store keep their grid slot with a fetch error.
//! - [`EditSessionStore::reset`] reseeds one object, dropping all its pending edits.
//! - [`EditSessionStore::reset_many`] drops only the tag diffs of the given objects.
//! - Saves are two-phase: `begin`/`prepare` marks the implicated objects as
//!   fetching, `complete` writes the backend's answer to the canonical store and
//!   reseeds, `fail` clears the flag and keeps every pending edit. The async
//!   wrappers (`save_object`, `save_object_tags`, `save_objects_tags`,
//!   `delete_objects`) chain the phases around one collaborator call.
//!
//! All mutation happens through `&mut self`; the store is meant to be driven
//! by one event loop.

use super::collaborators::{
    BulkTagSaveResult, CanonicalStore, ObjectSavePayload, SaveCollaborator, SavedObject,
    TagSaveResult,
};
use super::events::{SessionEvent, SESSION_EVENT_CHANNEL_CAPACITY};
use crate::config::EditSessionConfig;
use crate::edit::{
    merge, AddedTags, CompositeLayout, CompositeLayoutError, DropOutcome, DropTarget, EditStates,
    ObjectEditState, SideMenuMode, TagEditState, TagSelection,
};
use crate::error::{EditSessionError, Result};
use crate::models::{
    AttributeViewMode, CanonicalObject, ObjectAttributes, ObjectData, ObjectId, ObjectType, TagId,
    TagRef,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::broadcast;

/// One bulk tag request handed out by [`EditSessionStore::begin_tag_update`]
///
/// Every object in `object_ids` has exactly this pending diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTagUpdate {
    pub object_ids: Vec<ObjectId>,
    pub added: Vec<TagRef>,
    pub removed: Vec<TagId>,
}

impl PendingTagUpdate {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub struct EditSessionStore<C, S>
where
    C: CanonicalStore,
    S: SaveCollaborator,
{
    canonical: C,
    saver: S,
    config: EditSessionConfig,
    edits: EditStates,
    /// Objects with a collaborator call in flight
    fetching: BTreeSet<ObjectId>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl<C, S> EditSessionStore<C, S>
where
    C: CanonicalStore,
    S: SaveCollaborator,
{
    pub fn new(canonical: C, saver: S) -> Self {
        let (event_tx, _) = broadcast::channel(SESSION_EVENT_CHANNEL_CAPACITY);
        Self {
            canonical,
            saver,
            config: EditSessionConfig::default(),
            edits: EditStates::new(),
            fetching: BTreeSet::new(),
            event_tx,
        }
    }

    pub fn with_config(canonical: C, saver: S, config: EditSessionConfig) -> Result<Self> {
        config.validate()?;
        let mut store = Self::new(canonical, saver);
        store.config = config;
        Ok(store)
    }

    pub fn config(&self) -> &EditSessionConfig {
        &self.config
    }

    pub fn canonical(&self) -> &C {
        &self.canonical
    }

    /// Direct access for hosts that receive canonical updates from elsewhere
    pub fn canonical_mut(&mut self) -> &mut C {
        &mut self.canonical
    }

    pub fn saver(&self) -> &S {
        &self.saver
    }

    pub fn subscribe_to_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Ignores errors if no subscribers
    fn emit_event(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }

    //
    // EDIT TABLE
    //

    /// Edit state of an object, seeded from canonical state on first access
    pub fn get(&mut self, object_id: ObjectId) -> Result<&ObjectEditState> {
        self.ensure_seeded(object_id)?;
        self.edit_state(object_id)
            .ok_or_else(|| EditSessionError::edit_state_missing(object_id))
    }

    pub fn get_mut(&mut self, object_id: ObjectId) -> Result<&mut ObjectEditState> {
        self.ensure_seeded(object_id)?;
        self.edits
            .get_mut(&object_id)
            .ok_or_else(|| EditSessionError::edit_state_missing(object_id))
    }

    /// Edit state without seeding
    pub fn edit_state(&self, object_id: ObjectId) -> Option<&ObjectEditState> {
        self.edits.get(&object_id)
    }

    pub fn edit_states(&self) -> &EditStates {
        &self.edits
    }

    pub fn edited_object_ids(&self) -> Vec<ObjectId> {
        self.edits.keys().copied().collect()
    }

    fn existing_state(&self, object_id: ObjectId) -> Result<&ObjectEditState> {
        self.edits
            .get(&object_id)
            .ok_or_else(|| EditSessionError::edit_state_missing(object_id))
    }

    fn existing_state_mut(&mut self, object_id: ObjectId) -> Result<&mut ObjectEditState> {
        self.edits
            .get_mut(&object_id)
            .ok_or_else(|| EditSessionError::edit_state_missing(object_id))
    }

    fn ensure_seeded(&mut self, object_id: ObjectId) -> Result<()> {
        if self.edits.contains_key(&object_id) {
            return Ok(());
        }
        self.seed_edit_state(object_id)
    }

    /// Seed (or reseed) an edit state from canonical state
    fn seed_edit_state(&mut self, object_id: ObjectId) -> Result<()> {
        let object = self
            .canonical
            .canonical_object(object_id)
            .ok_or_else(|| EditSessionError::object_not_found(object_id))?;
        let data = self
            .canonical
            .get_object_data(object_id, object.object_type());

        let mut state = ObjectEditState::seed(&object, data);
        if let Some(layout) = state.composite_layout_mut() {
            self.seed_layout_subobjects(layout)?;
        }
        self.edits.insert(object_id, state);

        tracing::debug!("Seeded edit state for object {}", object_id);
        self.emit_event(SessionEvent::EditStateSeeded { object_id });
        Ok(())
    }

    /// Make sure every subobject of `layout` has an edit state
    fn seed_layout_subobjects(&mut self, layout: &mut CompositeLayout) -> Result<()> {
        for subobject_id in layout.subobject_ids() {
            if subobject_id <= 0 {
                let object_type = self.config.default_object_type;
                self.edits
                    .entry(subobject_id)
                    .or_insert_with(|| ObjectEditState::new_object(subobject_id, object_type));
                continue;
            }
            match self.seed_subobject(subobject_id) {
                Some(object_type) => {
                    layout.set_is_composite(subobject_id, object_type == ObjectType::Composite)?;
                }
                None => {
                    tracing::warn!("Subobject {} could not be loaded", subobject_id);
                    layout.set_fetch_error(subobject_id, fetch_error_message(subobject_id))?;
                }
            }
        }
        Ok(())
    }

    /// Seed a subobject's edit state with the configured attribute projection
    ///
    /// Returns the subobject's type, or `None` when it has no canonical record.
    /// An existing edit state is kept as it is.
    fn seed_subobject(&mut self, subobject_id: ObjectId) -> Option<ObjectType> {
        if let Some(state) = self.edits.get(&subobject_id) {
            return Some(state.object_type());
        }
        let object = self.canonical.canonical_object(subobject_id)?;
        let projected = project_object(object, self.config.subobject_view_mode);
        let data = self
            .canonical
            .get_object_data(subobject_id, projected.object_type());

        let state = ObjectEditState::seed(&projected, data);
        let object_type = state.object_type();
        self.edits.insert(subobject_id, state);
        Some(object_type)
    }

    /// Start editing a new object under the configured sentinel id
    ///
    /// Replaces a previous new-object edit state. A new composite starts with
    /// one column holding one new subobject.
    pub fn create_new(&mut self, object_type: Option<ObjectType>) -> Result<&mut ObjectEditState> {
        let object_id = self.config.new_object_id;
        let object_type = object_type.unwrap_or(self.config.default_object_type);
        self.discard(object_id);

        let mut state = ObjectEditState::new_object(object_id, object_type);
        if let Some(layout) = state.composite_layout_mut() {
            for subobject_id in layout.subobject_ids() {
                if self.edits.contains_key(&subobject_id) {
                    let fresh = self.next_new_subobject_id(layout);
                    layout.rekey(subobject_id, fresh)?;
                }
            }
            self.seed_layout_subobjects(layout)?;
        }
        self.edits.insert(object_id, state);

        tracing::debug!("Created new {} edit state", object_type);
        self.existing_state_mut(object_id)
    }

    /// Drop an edit state, e.g. on cancel or navigating away
    ///
    /// Edit states of the object's unsaved subobjects go with it.
    pub fn discard(&mut self, object_id: ObjectId) -> Option<ObjectEditState> {
        let state = self.edits.remove(&object_id)?;
        self.drop_new_subobject_states(&state);
        tracing::debug!("Discarded edit state for object {}", object_id);
        Some(state)
    }

    fn drop_new_subobject_states(&mut self, state: &ObjectEditState) {
        if let Some(layout) = state.composite_layout() {
            for subobject_id in layout.subobject_ids() {
                if subobject_id < 0 {
                    self.edits.remove(&subobject_id);
                }
            }
        }
    }

    /// Reseed from canonical state, dropping every pending edit of the object
    ///
    /// Edit states of other objects, including saved subobjects, are kept.
    ///
    /// Fails with `ObjectNotFound`, keeping the edit state, when a saved object
    /// is gone from the canonical store.
    pub fn reset(&mut self, object_id: ObjectId) -> Result<()> {
        let exists = self.canonical.get_object(object_id).is_some();
        let is_new = self
            .edits
            .get(&object_id)
            .is_some_and(ObjectEditState::is_new);
        if !exists && !is_new {
            return Err(EditSessionError::object_not_found(object_id));
        }

        let previous = self.edits.remove(&object_id);
        if let Some(previous) = &previous {
            self.drop_new_subobject_states(previous);
        }
        match previous {
            Some(previous) if !exists => {
                self.create_new(Some(previous.object_type()))?;
            }
            _ => self.seed_edit_state(object_id)?,
        }

        tracing::info!("Reset edit state for object {}", object_id);
        self.emit_event(SessionEvent::EditStateReset { object_id });
        Ok(())
    }

    /// Drop the tag diffs of `object_ids`, taking canonical tags as the new baseline
    ///
    /// Attribute and data edits of those objects are kept. Objects without an
    /// edit state are skipped.
    pub fn reset_many(&mut self, object_ids: &[ObjectId]) {
        for object_id in object_ids {
            let tag_ids = self.canonical.get_object_tags(*object_id);
            let modified_at = self
                .canonical
                .get_object(*object_id)
                .and_then(|attributes| attributes.modified_at);
            if let Some(state) = self.edits.get_mut(object_id) {
                state.reset_tags(tag_ids, modified_at);
            }
        }
        tracing::info!("Reset tag diffs of {} object(s)", object_ids.len());
    }

    /// Write a committed tag update through to the canonical store, then reset
    /// the tag diffs of exactly `object_ids`
    pub fn commit_tag_update(
        &mut self,
        object_ids: &[ObjectId],
        added_tag_ids: &[TagId],
        removed_tag_ids: &[TagId],
        modified_at: Option<DateTime<Utc>>,
    ) {
        let added: AddedTags = added_tag_ids.iter().copied().map(TagRef::existing).collect();
        let removed: BTreeSet<TagId> = removed_tag_ids.iter().copied().collect();

        for object_id in object_ids {
            if self.canonical.get_object(*object_id).is_none() {
                tracing::warn!("Tag update for unknown object {} skipped", object_id);
                continue;
            }
            let merged = merge(&self.canonical.get_object_tags(*object_id), &added, &removed);
            self.canonical
                .set_object_tags(*object_id, merged, modified_at);
        }
        self.reset_many(object_ids);

        tracing::info!(
            "Committed tag update (+{:?} -{:?}) for objects {:?}",
            added_tag_ids,
            removed_tag_ids,
            object_ids
        );
        self.emit_event(SessionEvent::TagsCommitted {
            object_ids: object_ids.to_vec(),
            modified_at,
        });
    }

    /// Copy the canonical fields allowed by `mode` into the edit state
    pub fn refresh_attributes(&mut self, object_id: ObjectId, mode: AttributeViewMode) -> Result<()> {
        let attributes = self
            .canonical
            .get_object(object_id)
            .ok_or_else(|| EditSessionError::object_not_found(object_id))?;
        let projection = attributes.project(mode);
        self.get_mut(object_id)?.refresh_attributes(&projection);
        Ok(())
    }

    //
    // INDICATORS
    //

    pub fn is_fetching(&self, object_id: ObjectId) -> bool {
        self.fetching.contains(&object_id)
    }

    /// Subobject that was added to the composite and not saved yet
    pub fn is_new_subobject(&self, composite_id: ObjectId, subobject_id: ObjectId) -> Result<bool> {
        let layout = self.composite_layout(composite_id)?;
        Ok(layout.contains(subobject_id) && subobject_id < 0)
    }

    /// Save is blocked; for composites this includes subobjects that would be saved along
    pub fn has_validation_error(&self, object_id: ObjectId) -> Result<bool> {
        Ok(self.validation_error(object_id)?.is_some())
    }

    pub fn is_existing_with_modified_attributes(&self, object_id: ObjectId) -> Result<bool> {
        Ok(self
            .existing_state(object_id)?
            .is_existing_with_modified_attributes())
    }

    pub fn is_existing_with_modified_tags(&self, object_id: ObjectId) -> Result<bool> {
        Ok(self.existing_state(object_id)?.is_existing_with_modified_tags())
    }

    pub fn is_existing_with_modified_data(&self, object_id: ObjectId) -> Result<bool> {
        Ok(self.existing_state(object_id)?.is_existing_with_modified_data())
    }

    pub fn is_existing_with_modified_parameters(
        &self,
        composite_id: ObjectId,
        subobject_id: ObjectId,
    ) -> Result<bool> {
        let state = self.existing_state(composite_id)?;
        if state.composite_layout().is_none() {
            return Err(EditSessionError::not_composite(composite_id));
        }
        Ok(state.is_existing_with_modified_parameters(subobject_id))
    }

    /// First validation problem, with the id of the offending object
    fn validation_error(&self, object_id: ObjectId) -> Result<Option<(ObjectId, &'static str)>> {
        let state = self.existing_state(object_id)?;
        if let Some(reason) = validation_reason(state) {
            return Ok(Some((object_id, reason)));
        }
        for subobject in self.subobjects_to_save(state) {
            if let Some(reason) = validation_reason(subobject) {
                return Ok(Some((subobject.object_id(), reason)));
            }
        }
        Ok(None)
    }

    /// Non-deleted subobjects that are new or carry modifications
    fn subobjects_to_save<'a>(&'a self, state: &'a ObjectEditState) -> Vec<&'a ObjectEditState> {
        let Some(layout) = state.composite_layout() else {
            return Vec::new();
        };
        layout
            .positions()
            .filter(|p| !p.is_deleted() && !p.has_fetch_error())
            .filter_map(|p| self.edits.get(&p.subobject_id))
            .filter(|sub| {
                sub.is_new()
                    || sub.is_existing_with_modified_attributes()
                    || sub.is_existing_with_modified_tags()
                    || sub.is_existing_with_modified_data()
            })
            .collect()
    }

    //
    // TAGS
    //

    /// Click on a tag of one object
    pub fn toggle_tag(&mut self, object_id: ObjectId, tag: TagRef) -> Result<TagEditState> {
        if let TagRef::New { name } = &tag {
            self.check_tag_name(name)?;
        }
        Ok(self.get_mut(object_id)?.toggle_tag(tag))
    }

    /// Tag typed into the tag input of one object
    ///
    /// Names of saved tags (compared case-insensitively) toggle that tag.
    pub fn toggle_tag_name(&mut self, object_id: ObjectId, name: &str) -> Result<TagEditState> {
        let tag = self.resolve_tag_name(name)?;
        self.toggle_tag(object_id, tag)
    }

    fn check_tag_name(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(EditSessionError::invalid_tag_name(name, "tag name is empty"));
        }
        let length = name.chars().count();
        if length > self.config.max_tag_name_length {
            return Err(EditSessionError::invalid_tag_name(
                name,
                format!(
                    "tag name is {} characters long, at most {} are allowed",
                    length, self.config.max_tag_name_length
                ),
            ));
        }
        Ok(())
    }

    fn resolve_tag_name(&self, name: &str) -> Result<TagRef> {
        let name = name.trim();
        self.check_tag_name(name)?;
        Ok(match self.canonical.find_tag_by_name(name) {
            Some(tag) => TagRef::existing(tag.tag_id),
            None => TagRef::named(name),
        })
    }

    /// Selection over `object_ids`, seeding their edit states
    pub fn tag_selection(&mut self, object_ids: &[ObjectId]) -> Result<TagSelection> {
        for object_id in object_ids {
            self.ensure_seeded(*object_id)?;
        }
        Ok(self.selection_snapshot(object_ids))
    }

    fn selection_snapshot(&self, object_ids: &[ObjectId]) -> TagSelection {
        TagSelection::new(
            object_ids
                .iter()
                .map(|id| (*id, self.canonical.get_object_tags(*id))),
        )
    }

    /// Click on a tag shown for a multi-object selection
    pub fn toggle_selection_tag(
        &mut self,
        object_ids: &[ObjectId],
        tag: &TagRef,
    ) -> Result<TagEditState> {
        let selection = self.tag_selection(object_ids)?;
        Ok(selection.toggle_tag(&mut self.edits, tag)?)
    }

    /// Tag typed into the tag input of a multi-object selection
    pub fn add_new_tag(&mut self, object_ids: &[ObjectId], name: &str) -> Result<TagRef> {
        let tag = self.resolve_tag_name(name)?;
        let selection = self.tag_selection(object_ids)?;
        selection.add_new_tag(&mut self.edits, &tag)?;
        Ok(tag)
    }

    /// Drop the tag diffs of a multi-object selection
    pub fn cancel_tag_update(&mut self, object_ids: &[ObjectId]) {
        self.selection_snapshot(object_ids)
            .cancel_update(&mut self.edits);
    }

    pub fn side_menu_mode(&self, object_ids: &[ObjectId]) -> SideMenuMode {
        self.selection_snapshot(object_ids).side_menu_mode(&self.edits)
    }

    //
    // COMPOSITE LAYOUT
    //

    pub fn composite_layout(&self, composite_id: ObjectId) -> Result<&CompositeLayout> {
        self.existing_state(composite_id)?
            .composite_layout()
            .ok_or_else(|| EditSessionError::not_composite(composite_id))
    }

    /// Layout for operations that need no edit-table bookkeeping (moves,
    /// delete modes, card parameters)
    pub fn composite_layout_mut(&mut self, composite_id: ObjectId) -> Result<&mut CompositeLayout> {
        self.existing_state_mut(composite_id)?
            .composite_layout_mut()
            .ok_or_else(|| EditSessionError::not_composite(composite_id))
    }

    /// Id below every id in use by the edit table, its layouts and `layout`
    fn next_new_subobject_id(&self, layout: &CompositeLayout) -> ObjectId {
        let table_min = self
            .edits
            .keys()
            .copied()
            .chain(
                self.edits
                    .values()
                    .filter_map(ObjectEditState::composite_layout)
                    .flat_map(CompositeLayout::subobject_ids),
            )
            .min()
            .unwrap_or(0);
        layout.next_new_subobject_id().min(table_min.min(0) - 1)
    }

    /// Append a new, empty subobject and seed its edit state
    pub fn add_new_subobject(&mut self, composite_id: ObjectId) -> Result<ObjectId> {
        let subobject_id = self.next_new_subobject_id(self.composite_layout(composite_id)?);
        let object_type = self.config.default_object_type;

        let layout = self.composite_layout_mut(composite_id)?;
        layout.add_new_subobject_as(subobject_id)?;
        layout.set_is_composite(subobject_id, object_type == ObjectType::Composite)?;
        self.edits.insert(
            subobject_id,
            ObjectEditState::new_object(subobject_id, object_type),
        );

        tracing::debug!(
            "Added new subobject {} to composite {}",
            subobject_id,
            composite_id
        );
        Ok(subobject_id)
    }

    /// Append a saved object as a subobject and seed its edit state
    ///
    /// An object missing from the canonical store still gets a slot, marked
    /// with a fetch error.
    pub fn add_existing_subobject(
        &mut self,
        composite_id: ObjectId,
        subobject_id: ObjectId,
    ) -> Result<()> {
        if subobject_id == composite_id {
            return Err(EditSessionError::validation(
                composite_id,
                "a composite can't contain itself",
            ));
        }
        if self.composite_layout(composite_id)?.contains(subobject_id) {
            return Err(CompositeLayoutError::DuplicateSubobject { subobject_id }.into());
        }

        let object_type = self.seed_subobject(subobject_id);
        let layout = self.composite_layout_mut(composite_id)?;
        layout.add_existing_subobject(
            subobject_id,
            object_type == Some(ObjectType::Composite),
        )?;
        if object_type.is_none() {
            tracing::warn!("Subobject {} could not be loaded", subobject_id);
            layout.set_fetch_error(subobject_id, fetch_error_message(subobject_id))?;
        }
        Ok(())
    }

    /// Apply a drop gesture to a composite's grid
    pub fn apply_drop(
        &mut self,
        composite_id: ObjectId,
        dragged_id: ObjectId,
        target: DropTarget,
    ) -> Result<DropOutcome> {
        if target == DropTarget::Outside {
            tracing::warn!(
                "Subobject {} of composite {} dropped on a non-grid target",
                dragged_id,
                composite_id
            );
        }
        Ok(self
            .composite_layout_mut(composite_id)?
            .apply_drop(dragged_id, target)?)
    }

    //
    // SAVE FLOWS
    //

    fn ensure_not_fetching(&self, object_ids: &[ObjectId]) -> Result<()> {
        match object_ids.iter().find(|id| self.fetching.contains(*id)) {
            Some(object_id) => Err(EditSessionError::AlreadyFetching {
                object_id: *object_id,
            }),
            None => Ok(()),
        }
    }

    fn payload_for(state: &ObjectEditState) -> ObjectSavePayload {
        ObjectSavePayload {
            object_id: state.object_id(),
            is_new: state.is_new(),
            attributes: state.attributes.clone(),
            tag_ids: state.merged_tag_ids(),
            new_tag_names: state
                .added_tags()
                .new_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            data: state.data_for_save(),
            composite: state
                .composite_layout()
                .map(CompositeLayout::to_save_payload),
            subobjects: Vec::new(),
        }
    }

    /// Build the save payload and mark the object as fetching
    pub fn prepare_save(&mut self, object_id: ObjectId) -> Result<ObjectSavePayload> {
        self.ensure_not_fetching(&[object_id])?;
        if let Some((invalid_id, reason)) = self.validation_error(object_id)? {
            return Err(EditSessionError::validation(invalid_id, reason));
        }

        let state = self.existing_state(object_id)?;
        let mut payload = Self::payload_for(state);
        payload.subobjects = self
            .subobjects_to_save(state)
            .into_iter()
            .map(Self::payload_for)
            .collect();

        self.fetching.insert(object_id);
        Ok(payload)
    }

    /// Accept a saved object: write canonical state and reseed the edit state
    ///
    /// `previous_id` is the id the save was prepared with; new objects move to
    /// the id assigned by the backend. If the edit state was discarded while the
    /// save was in flight, only the canonical store is updated.
    pub fn complete_save(&mut self, previous_id: ObjectId, saved: SavedObject) -> Result<ObjectId> {
        self.fetching.remove(&previous_id);
        let previous = self.edits.remove(&previous_id);
        let object_id = saved.object.object_id;

        self.canonical.upsert_tags(saved.created_tags);
        for subobject in saved.subobjects {
            self.edits.remove(&subobject.previous_id);
            self.edits.remove(&subobject.object.object_id);
            self.canonical.upsert_object(subobject.object, subobject.data);
        }

        if let Some(previous) = &previous {
            if let Some(layout) = previous.composite_layout() {
                for subobject_id in layout.to_save_payload().fully_deleted_subobject_ids {
                    self.canonical.remove_object(subobject_id);
                    self.edits.remove(&subobject_id);
                }
            }
            self.drop_new_subobject_states(previous);
        }

        self.canonical.upsert_object(saved.object, saved.data);
        self.edits.remove(&object_id);
        if previous.is_some() {
            self.seed_edit_state(object_id)?;
        }

        tracing::info!("Saved object {} (was {})", object_id, previous_id);
        self.emit_event(SessionEvent::ObjectSaved {
            previous_id,
            object_id,
        });
        Ok(object_id)
    }

    /// Record a rejected save; every pending edit stays as it was
    pub fn fail_save(&mut self, object_id: ObjectId, error: anyhow::Error) -> EditSessionError {
        self.record_failure(&[object_id], error)
    }

    fn record_failure(&mut self, object_ids: &[ObjectId], error: anyhow::Error) -> EditSessionError {
        for object_id in object_ids {
            self.fetching.remove(object_id);
        }
        let error = EditSessionError::save_failed(error);
        tracing::warn!("Save failed for objects {:?}: {}", object_ids, error);
        self.emit_event(SessionEvent::SaveFailed {
            object_ids: object_ids.to_vec(),
            message: error.to_string(),
        });
        error
    }

    /// Validate, send and commit one object save
    pub async fn save_object(&mut self, object_id: ObjectId) -> Result<ObjectId> {
        let payload = self.prepare_save(object_id)?;
        match self.saver.save_object(&payload).await {
            Ok(saved) => self.complete_save(object_id, saved),
            Err(error) => Err(self.fail_save(object_id, error)),
        }
    }

    /// Save the tag diff of one object and commit it for that object only
    ///
    /// Returns the committed tag ids.
    pub async fn save_object_tags(&mut self, object_id: ObjectId) -> Result<BTreeSet<TagId>> {
        self.ensure_not_fetching(&[object_id])?;
        let state = self.existing_state(object_id)?;
        if state.is_new() {
            return Err(EditSessionError::validation(
                object_id,
                "tags of an unsaved object are saved with the object",
            ));
        }
        if !state.has_tag_diff() {
            return Ok(state.current_tag_ids().clone());
        }
        let added = state.added_tags().as_slice().to_vec();
        let removed: Vec<TagId> = state.removed_tag_ids().iter().copied().collect();

        self.fetching.insert(object_id);
        let result = self
            .saver
            .save_object_tags(object_id, &added, &removed)
            .await;
        match result {
            Ok(result) => self.complete_object_tags(object_id, &added, result),
            Err(error) => Err(self.record_failure(&[object_id], error)),
        }
    }

    fn complete_object_tags(
        &mut self,
        object_id: ObjectId,
        added: &[TagRef],
        result: TagSaveResult,
    ) -> Result<BTreeSet<TagId>> {
        self.fetching.remove(&object_id);
        self.canonical.upsert_tags(result.created_tags);

        let assigned: HashMap<String, TagId> = added
            .iter()
            .zip(&result.resolved_tag_ids)
            .filter_map(|(tag, id)| tag.name().map(|name| (name.to_string(), *id)))
            .collect();

        let state = self.existing_state(object_id)?;
        let resolved = state.added_tags().resolved(&assigned);
        let merged = merge(state.current_tag_ids(), &resolved, state.removed_tag_ids());

        self.canonical
            .set_object_tags(object_id, merged.clone(), result.modified_at);
        self.existing_state_mut(object_id)?
            .reset_tags(merged.clone(), result.modified_at);

        tracing::info!("Saved tags of object {}: {:?}", object_id, merged);
        self.emit_event(SessionEvent::TagsCommitted {
            object_ids: vec![object_id],
            modified_at: result.modified_at,
        });
        Ok(merged)
    }

    /// Group `object_ids` by identical pending tag diff and mark them as fetching
    ///
    /// Each group becomes one bulk request, so an object is only ever sent its
    /// own additions and removals. Objects without a diff are left out.
    pub fn begin_tag_update(&mut self, object_ids: &[ObjectId]) -> Result<Vec<PendingTagUpdate>> {
        self.ensure_not_fetching(object_ids)?;

        let mut groups: Vec<(&AddedTags, &BTreeSet<TagId>, Vec<ObjectId>)> = Vec::new();
        for object_id in object_ids {
            let state = self.existing_state(*object_id)?;
            if !state.has_tag_diff() {
                continue;
            }
            let (added, removed) = (state.added_tags(), state.removed_tag_ids());
            match groups
                .iter_mut()
                .find(|(a, r, _)| *a == added && *r == removed)
            {
                Some((_, _, ids)) => ids.push(*object_id),
                None => groups.push((added, removed, vec![*object_id])),
            }
        }

        let pending: Vec<PendingTagUpdate> = groups
            .into_iter()
            .map(|(added, removed, object_ids)| PendingTagUpdate {
                object_ids,
                added: added.as_slice().to_vec(),
                removed: removed.iter().copied().collect(),
            })
            .collect();
        for update in &pending {
            self.fetching.extend(update.object_ids.iter().copied());
        }
        tracing::debug!(
            "Tag update for {} object(s) split into {} request(s)",
            object_ids.len(),
            pending.len()
        );
        Ok(pending)
    }

    pub fn complete_tag_update(&mut self, pending: PendingTagUpdate, result: BulkTagSaveResult) {
        for object_id in &pending.object_ids {
            self.fetching.remove(object_id);
        }
        self.canonical.upsert_tags(result.created_tags);
        self.commit_tag_update(
            &pending.object_ids,
            &result.added_tag_ids,
            &result.removed_tag_ids,
            result.modified_at,
        );
    }

    pub fn fail_tag_update(
        &mut self,
        pending: PendingTagUpdate,
        error: anyhow::Error,
    ) -> EditSessionError {
        self.record_failure(&pending.object_ids, error)
    }

    /// Save the tag diffs of a multi-object selection
    ///
    /// One request per group of objects sharing a diff. A failed request stops
    /// the save; groups already committed stay committed, the failed and
    /// unsent ones keep their diffs.
    pub async fn save_objects_tags(&mut self, object_ids: &[ObjectId]) -> Result<()> {
        if self.side_menu_mode(object_ids) == SideMenuMode::Default {
            return Ok(());
        }
        let mut updates = self.begin_tag_update(object_ids)?.into_iter();
        while let Some(pending) = updates.next() {
            let result = self
                .saver
                .save_objects_tags(&pending.object_ids, &pending.added, &pending.removed)
                .await;
            match result {
                Ok(result) => self.complete_tag_update(pending, result),
                Err(error) => {
                    for unsent in updates.by_ref() {
                        for object_id in &unsent.object_ids {
                            self.fetching.remove(object_id);
                        }
                    }
                    return Err(self.fail_tag_update(pending, error));
                }
            }
        }
        Ok(())
    }

    /// Delete objects on the backend, then drop them from canonical store and edit table
    ///
    /// With `delete_subobjects`, the subobjects of deleted composites go too.
    pub async fn delete_objects(
        &mut self,
        object_ids: &[ObjectId],
        delete_subobjects: bool,
    ) -> Result<()> {
        self.ensure_not_fetching(object_ids)?;
        self.fetching.extend(object_ids.iter().copied());

        let result = self
            .saver
            .delete_objects(object_ids, delete_subobjects)
            .await;
        if let Err(error) = result {
            return Err(self.record_failure(object_ids, error));
        }
        for object_id in object_ids {
            self.fetching.remove(object_id);
        }

        let mut removed = object_ids.to_vec();
        if delete_subobjects {
            for object_id in object_ids {
                if let Some(ObjectData::Composite(data)) = self
                    .canonical
                    .get_object_data(*object_id, ObjectType::Composite)
                {
                    removed.extend(data.subobjects.iter().map(|s| s.subobject_id));
                }
            }
        }
        for object_id in &removed {
            self.canonical.remove_object(*object_id);
            self.discard(*object_id);
        }

        tracing::info!("Deleted objects {:?}", removed);
        self.emit_event(SessionEvent::ObjectsDeleted {
            object_ids: removed,
        });
        Ok(())
    }
}

/// Keep only the fields allowed by `mode`; the rest take their defaults
fn project_object(object: CanonicalObject, mode: AttributeViewMode) -> CanonicalObject {
    let mut attributes = ObjectAttributes::new(object.object_type());
    attributes.apply(&object.attributes.project(mode));
    CanonicalObject {
        attributes,
        ..object
    }
}

fn fetch_error_message(subobject_id: ObjectId) -> String {
    format!("Object {} could not be loaded", subobject_id)
}

fn validation_reason(state: &ObjectEditState) -> Option<&'static str> {
    if !state.has_validation_error() {
        return None;
    }
    if state.attributes.object_name.trim().is_empty() {
        Some("object name is empty")
    } else if state.data.is_missing_required_field() {
        Some("a required field is empty")
    } else {
        Some("composite has no subobjects left")
    }
}
