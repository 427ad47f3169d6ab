//! Tag Set Diff
//!
//! Pure computation of the tag id set to persist from a canonical set and the
//! pending added/removed sets of an edit state.
//!
//! Pending additions may contain names of tags that do not exist yet. Those are
//! never part of a canonical set; they are left out of [`merge`] until the save
//! collaborator has assigned ids, after which [`AddedTags::resolved`] swaps them
//! for [`TagRef::Existing`] and `merge` is run again.
//!
//! # Examples
//!
//! ```rust
//! use objectshelf_core::edit::{merge, AddedTags};
//! use objectshelf_core::models::TagRef;
//! use std::collections::BTreeSet;
//!
//! let canonical: BTreeSet<i64> = [1, 2, 3].into_iter().collect();
//! let added: AddedTags = [TagRef::existing(7), TagRef::named("new")].into_iter().collect();
//! let removed: BTreeSet<i64> = [1].into_iter().collect();
//!
//! let merged = merge(&canonical, &added, &removed);
//! assert_eq!(merged, BTreeSet::from([2, 3, 7]));
//! ```

use crate::models::{TagId, TagRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Insertion-ordered set of pending tag additions
///
/// Order only matters for display; equality and merge semantics treat it as a set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddedTags(Vec<TagRef>);

impl PartialEq for AddedTags {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().all(|tag| other.contains(tag))
    }
}

impl Eq for AddedTags {}

impl AddedTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, tag: &TagRef) -> bool {
        self.0.contains(tag)
    }

    /// Append `tag` unless already present. Returns whether it was inserted.
    pub fn insert(&mut self, tag: TagRef) -> bool {
        if self.contains(&tag) {
            return false;
        }
        self.0.push(tag);
        true
    }

    /// Remove `tag` if present. Returns whether it was removed.
    pub fn remove(&mut self, tag: &TagRef) -> bool {
        let before = self.0.len();
        self.0.retain(|t| t != tag);
        self.0.len() != before
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagRef> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[TagRef] {
        &self.0
    }

    /// Ids of the saved tags being added
    pub fn existing_ids(&self) -> BTreeSet<TagId> {
        self.0.iter().filter_map(TagRef::id).collect()
    }

    /// Names of tags that still have to be created
    pub fn new_names(&self) -> Vec<&str> {
        self.0.iter().filter_map(TagRef::name).collect()
    }

    /// Replace new-tag names with the ids assigned by the backend
    ///
    /// Names missing from `assigned` stay as they are. Duplicates created by the
    /// substitution (a name resolving to an id that was already added) collapse.
    pub fn resolved(&self, assigned: &HashMap<String, TagId>) -> AddedTags {
        self.0
            .iter()
            .map(|tag| match tag {
                TagRef::New { name } => assigned
                    .get(name)
                    .map(|id| TagRef::existing(*id))
                    .unwrap_or_else(|| tag.clone()),
                existing => existing.clone(),
            })
            .collect()
    }
}

impl FromIterator<TagRef> for AddedTags {
    fn from_iter<I: IntoIterator<Item = TagRef>>(iter: I) -> Self {
        let mut added = AddedTags::new();
        for tag in iter {
            added.insert(tag);
        }
        added
    }
}

impl<'a> IntoIterator for &'a AddedTags {
    type Item = &'a TagRef;
    type IntoIter = std::slice::Iter<'a, TagRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// `(canonical - removed) ∪ added`, restricted to saved tag ids
pub fn merge(
    canonical: &BTreeSet<TagId>,
    added: &AddedTags,
    removed: &BTreeSet<TagId>,
) -> BTreeSet<TagId> {
    canonical
        .difference(removed)
        .copied()
        .chain(added.iter().filter_map(TagRef::id))
        .collect()
}
