//! Multi-object tag reconciliation
//!
//! Edits tags of several selected objects at once. Tags present on every
//! selected object are "common", tags present on some of them are "partial".
//!
//! # Click semantics
//!
//! - **Common tag**: removal is broadcast. The first click marks the tag for
//!   removal on every object, the next click clears the removal everywhere.
//! - **Partial tag**: addition is broadcast to the objects missing the tag. Objects
//!   that already have it are never touched, so a second click only undoes the
//!   additions made to the missing subset.
//! - **Any other tag** (saved or new): addition is broadcast to every object.
//!
//! The selection-level state is derived from the per-object [`TagEditState`]s, so
//! the same two-click cycle holds as for a single object.

use super::object_edit_state::ObjectEditState;
use super::tag_toggle::TagEditState;
use crate::models::{ObjectId, TagId, TagRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Edit table shared by the reconciler and the session store
pub type EditStates = BTreeMap<ObjectId, ObjectEditState>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("No edit state for selected object {object_id}")]
    EditStateMissing { object_id: ObjectId },
}

/// How a tag relates to the current selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagPresence {
    /// On every selected object
    Common,
    /// On some, but not all selected objects
    Partial,
    /// On none of them
    Absent,
}

/// Which actions the side menu offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideMenuMode {
    /// Add / edit / delete
    Default,
    /// Update tags / cancel
    TagUpdate,
}

/// Selected objects with their canonical tags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSelection {
    canonical: BTreeMap<ObjectId, BTreeSet<TagId>>,
}

impl TagSelection {
    pub fn new(entries: impl IntoIterator<Item = (ObjectId, BTreeSet<TagId>)>) -> Self {
        Self {
            canonical: entries.into_iter().collect(),
        }
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.canonical.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Tags present on every selected object
    pub fn common_tags(&self) -> BTreeSet<TagId> {
        let mut sets = self.canonical.values();
        let Some(first) = sets.next() else {
            return BTreeSet::new();
        };
        sets.fold(first.clone(), |common, tags| {
            common.intersection(tags).copied().collect()
        })
    }

    /// Tags present on at least one, but not every selected object
    pub fn partial_tags(&self) -> BTreeSet<TagId> {
        let common = self.common_tags();
        self.all_tags().difference(&common).copied().collect()
    }

    /// Union of the canonical tags of the selection
    pub fn all_tags(&self) -> BTreeSet<TagId> {
        self.canonical.values().flatten().copied().collect()
    }

    pub fn presence(&self, tag_id: TagId) -> TagPresence {
        let holders = self
            .canonical
            .values()
            .filter(|tags| tags.contains(&tag_id))
            .count();
        match holders {
            0 => TagPresence::Absent,
            n if n == self.canonical.len() => TagPresence::Common,
            _ => TagPresence::Partial,
        }
    }

    fn has_tag(&self, object_id: ObjectId, tag: &TagRef) -> bool {
        match (tag.id(), self.canonical.get(&object_id)) {
            (Some(id), Some(tags)) => tags.contains(&id),
            _ => false,
        }
    }

    fn check_states(&self, states: &EditStates) -> Result<(), ReconcileError> {
        match self.canonical.keys().find(|id| !states.contains_key(*id)) {
            Some(object_id) => Err(ReconcileError::EditStateMissing {
                object_id: *object_id,
            }),
            None => Ok(()),
        }
    }

    /// Objects a click on `tag` acts upon, with the transition each goes through
    ///
    /// Objects holding the tag go through removal only when every object holds it.
    fn targets(&self, tag: &TagRef) -> (Vec<ObjectId>, bool) {
        let common = tag
            .id()
            .is_some_and(|id| self.presence(id) == TagPresence::Common);
        if common {
            return (self.object_ids(), true);
        }
        let missing = self
            .canonical
            .keys()
            .copied()
            .filter(|id| !self.has_tag(*id, tag))
            .collect();
        (missing, false)
    }

    /// Click on a tag shown for the selection
    ///
    /// Returns the selection-level state after the click.
    pub fn toggle_tag(
        &self,
        states: &mut EditStates,
        tag: &TagRef,
    ) -> Result<TagEditState, ReconcileError> {
        self.check_states(states)?;
        let (targets, on_objects) = self.targets(tag);

        let current = self.selection_state(states, tag, &targets);
        let next = current.next(on_objects);

        for object_id in &targets {
            if let Some(state) = states.get_mut(object_id) {
                state.set_tag_state(tag, next);
            }
        }

        tracing::debug!(
            "Selection tag {} -> {:?} on {} object(s)",
            tag,
            next,
            targets.len()
        );
        Ok(next)
    }

    /// Selection-level state: the transition is "on" only if it is on for every target
    fn selection_state(
        &self,
        states: &EditStates,
        tag: &TagRef,
        targets: &[ObjectId],
    ) -> TagEditState {
        let mut per_object = targets
            .iter()
            .filter_map(|id| states.get(id))
            .map(|state| state.tag_state(tag));

        match per_object.next() {
            Some(first) if first != TagEditState::Neutral && per_object.all(|s| s == first) => {
                first
            }
            _ => TagEditState::Neutral,
        }
    }

    /// Selection-level state of a tag, for display
    pub fn tag_state(&self, states: &EditStates, tag: &TagRef) -> TagEditState {
        let (targets, _) = self.targets(tag);
        self.selection_state(states, tag, &targets)
    }

    /// Add a tag typed into the tag input to every selected object
    pub fn add_new_tag(&self, states: &mut EditStates, tag: &TagRef) -> Result<(), ReconcileError> {
        self.check_states(states)?;
        for object_id in self.canonical.keys() {
            if self.has_tag(*object_id, tag) {
                continue;
            }
            if let Some(state) = states.get_mut(object_id) {
                state.set_tag_state(tag, TagEditState::Adding);
            }
        }
        Ok(())
    }

    /// Drop the pending tag diff of every selected object
    ///
    /// Attribute and data edits are left alone.
    pub fn cancel_update(&self, states: &mut EditStates) {
        for object_id in self.canonical.keys() {
            if let Some(state) = states.get_mut(object_id) {
                state.clear_tag_diff();
            }
        }
    }

    pub fn has_pending_changes(&self, states: &EditStates) -> bool {
        self.canonical
            .keys()
            .filter_map(|id| states.get(id))
            .any(ObjectEditState::has_tag_diff)
    }

    pub fn side_menu_mode(&self, states: &EditStates) -> SideMenuMode {
        if self.has_pending_changes(states) {
            SideMenuMode::TagUpdate
        } else {
            SideMenuMode::Default
        }
    }
}
