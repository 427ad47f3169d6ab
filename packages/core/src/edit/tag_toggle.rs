//! Per (object, tag) toggle state machine
//!
//! Every pair of an edited object and a tag is in exactly one of three states:
//!
//! ```text
//!            click (tag not on object)          click (tag on object)
//!   Neutral ---------------------------> Adding   Neutral ----------------> Removing
//!      ^                                   |         ^                        |
//!      +------------- click ---------------+         +-------- click ---------+
//! ```
//!
//! Whether the tag is "on the object" is decided by the object's canonical tags, so
//! from a given starting state two clicks always return to `Neutral`.

use super::tag_diff::AddedTags;
use crate::models::{TagId, TagRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagEditState {
    Neutral,
    Adding,
    Removing,
}

impl TagEditState {
    /// Read the state of `tag` from the pending sets
    pub fn of(tag: &TagRef, added: &AddedTags, removed: &BTreeSet<TagId>) -> Self {
        if added.contains(tag) {
            return TagEditState::Adding;
        }
        match tag.id() {
            Some(id) if removed.contains(&id) => TagEditState::Removing,
            _ => TagEditState::Neutral,
        }
    }

    /// State after one click
    ///
    /// `on_object` is true when the tag is among the object's canonical tags.
    pub fn next(self, on_object: bool) -> Self {
        match (self, on_object) {
            (TagEditState::Neutral, true) => TagEditState::Removing,
            (TagEditState::Neutral, false) => TagEditState::Adding,
            (TagEditState::Adding, _) | (TagEditState::Removing, _) => TagEditState::Neutral,
        }
    }

    /// Write this state for `tag` into the pending sets
    ///
    /// New-tag names can't be removed; `Removing` for a name is treated as `Neutral`.
    pub fn write(self, tag: &TagRef, added: &mut AddedTags, removed: &mut BTreeSet<TagId>) {
        match self {
            TagEditState::Neutral => {
                added.remove(tag);
                if let Some(id) = tag.id() {
                    removed.remove(&id);
                }
            }
            TagEditState::Adding => {
                if let Some(id) = tag.id() {
                    removed.remove(&id);
                }
                added.insert(tag.clone());
            }
            TagEditState::Removing => {
                added.remove(tag);
                if let Some(id) = tag.id() {
                    removed.insert(id);
                }
            }
        }
    }
}
