//! Composite Grid Layout
//!
//! Positions of the subobjects of one composite object, arranged in columns and
//! rows, and the re-flow rules applied on insertion, removal and drag-and-drop.
//!
//! # Invariants
//!
//! - Columns are numbered `0..C` with no gaps and no empty column.
//! - Within a column, rows are numbered `0..R` with no gaps and no duplicates.
//!
//! Every mutating operation validates its arguments before touching the layout,
//! so an `Err` always leaves the layout exactly as it was.
//!
//! Subobjects marked as deleted keep their slot until the composite is saved;
//! [`CompositeLayout::to_save_payload`] drops them and compacts the grid.
//!
//! # Examples
//!
//! ```rust
//! use objectshelf_core::edit::{CompositeLayout, DropTarget};
//! use objectshelf_core::models::CompositeSubobject;
//!
//! let mut layout = CompositeLayout::from_subobjects(&[
//!     CompositeSubobject::new(1, 0, 0),
//!     CompositeSubobject::new(2, 0, 1),
//!     CompositeSubobject::new(3, 0, 2),
//! ]);
//!
//! // Drop card 1 onto card 3: it lands right before it
//! layout.apply_drop(1, DropTarget::Subobject(3)).unwrap();
//! assert_eq!(layout.column_ids(0), vec![2, 1, 3]);
//! ```

use crate::models::{CompositeSubobject, ObjectId, ShowDescriptionComposite};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors for layout operations called with arguments that break its contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositeLayoutError {
    #[error("Subobject {subobject_id} is not part of the layout")]
    SubobjectNotFound { subobject_id: ObjectId },

    #[error("Subobject {subobject_id} is already part of the layout")]
    DuplicateSubobject { subobject_id: ObjectId },

    #[error("Column {column} is out of range (layout has {column_count} columns)")]
    ColumnOutOfRange { column: usize, column_count: usize },

    #[error("Row {row} is out of range for column {column} ({row_count} rows)")]
    RowOutOfRange {
        column: usize,
        row: usize,
        row_count: usize,
    },

    #[error("Subobject {subobject_id} cannot go from {from:?} to {to:?}")]
    InvalidDeleteTransition {
        subobject_id: ObjectId,
        from: DeleteMode,
        to: DeleteMode,
    },
}

impl CompositeLayoutError {
    pub fn subobject_not_found(subobject_id: ObjectId) -> Self {
        Self::SubobjectNotFound { subobject_id }
    }

    pub fn column_out_of_range(column: usize, column_count: usize) -> Self {
        Self::ColumnOutOfRange {
            column,
            column_count,
        }
    }
}

pub type LayoutResult<T> = std::result::Result<T, CompositeLayoutError>;

/// Delete state of a subobject inside its composite
///
/// `Deleted` removes the subobject from the composite on save; `FullyDeleted`
/// also deletes the subobject itself. Both go back to `None` via restore, and
/// neither can be reached from the other directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    #[default]
    None,
    Deleted,
    FullyDeleted,
}

impl DeleteMode {
    fn can_transition_to(self, to: DeleteMode) -> bool {
        matches!(
            (self, to),
            (DeleteMode::None, DeleteMode::Deleted)
                | (DeleteMode::None, DeleteMode::FullyDeleted)
                | (DeleteMode::Deleted, DeleteMode::None)
                | (DeleteMode::FullyDeleted, DeleteMode::None)
        )
    }
}

/// Grid slot and per-card UI state of one subobject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubobjectPosition {
    pub subobject_id: ObjectId,
    pub column: usize,
    pub row: usize,
    pub expanded: bool,
    pub delete_mode: DeleteMode,
    /// Empty when the subobject loaded fine
    pub fetch_error: String,
    /// Read-only marker for subobjects that are composites themselves
    pub is_composite: bool,
    pub selected_tab: u32,
    pub show_description_composite: ShowDescriptionComposite,
}

impl SubobjectPosition {
    fn new(subobject_id: ObjectId, column: usize, row: usize) -> Self {
        Self {
            subobject_id,
            column,
            row,
            expanded: true,
            delete_mode: DeleteMode::None,
            fetch_error: String::new(),
            is_composite: false,
            selected_tab: 0,
            show_description_composite: ShowDescriptionComposite::Inherit,
        }
    }

    fn from_subobject(subobject: &CompositeSubobject) -> Self {
        Self {
            subobject_id: subobject.subobject_id,
            column: subobject.column,
            row: subobject.row,
            expanded: subobject.is_expanded,
            delete_mode: DeleteMode::None,
            fetch_error: String::new(),
            is_composite: false,
            selected_tab: subobject.selected_tab,
            show_description_composite: subobject.show_description_composite,
        }
    }

    fn to_subobject(&self) -> CompositeSubobject {
        CompositeSubobject {
            subobject_id: self.subobject_id,
            column: self.column,
            row: self.row,
            selected_tab: self.selected_tab,
            is_expanded: self.expanded,
            show_description_composite: self.show_description_composite,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.delete_mode != DeleteMode::None
    }

    pub fn has_fetch_error(&self) -> bool {
        !self.fetch_error.is_empty()
    }
}

/// Where a dragged card was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// Another card; the dragged card is inserted right before it
    Subobject(ObjectId),
    /// The trailing "add" menu of a column
    ColumnEnd(usize),
    /// The new-column dropzone on the left side of a column
    NewColumnLeft(usize),
    /// The new-column dropzone on the right side of a column
    NewColumnRight(usize),
    /// Anything that is not part of the grid
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Moved,
    Unchanged,
}

/// Result of projecting an edited layout into a save payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeSavePayload {
    /// Remaining subobjects with compacted coordinates
    pub subobjects: Vec<CompositeSubobject>,
    /// Subobjects removed from the composite only
    pub deleted_subobject_ids: Vec<ObjectId>,
    /// Subobjects removed from the composite and deleted themselves
    pub fully_deleted_subobject_ids: Vec<ObjectId>,
}

/// Subobject grid of one composite edit state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeLayout {
    positions: BTreeMap<ObjectId, SubobjectPosition>,
}

impl CompositeLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a layout from canonical subobject entries
    ///
    /// Coordinates are normalized: distinct column values are renumbered in
    /// ascending order and rows are renumbered per column.
    pub fn from_subobjects(subobjects: &[CompositeSubobject]) -> Self {
        let mut sorted: Vec<&CompositeSubobject> = subobjects.iter().collect();
        sorted.sort_by_key(|s| (s.column, s.row, s.subobject_id));

        let mut positions = BTreeMap::new();
        let mut column = 0;
        let mut row = 0;
        let mut previous_column = None;

        for subobject in sorted {
            if positions.contains_key(&subobject.subobject_id) {
                tracing::warn!(
                    "Duplicate subobject {} in composite data, keeping the first slot",
                    subobject.subobject_id
                );
                continue;
            }
            match previous_column {
                Some(prev) if prev == subobject.column => row += 1,
                Some(_) => {
                    column += 1;
                    row = 0;
                }
                None => {}
            }
            previous_column = Some(subobject.column);

            let mut position = SubobjectPosition::from_subobject(subobject);
            position.column = column;
            position.row = row;
            positions.insert(subobject.subobject_id, position);
        }

        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, subobject_id: ObjectId) -> bool {
        self.positions.contains_key(&subobject_id)
    }

    pub fn position(&self, subobject_id: ObjectId) -> Option<&SubobjectPosition> {
        self.positions.get(&subobject_id)
    }

    pub fn positions(&self) -> impl Iterator<Item = &SubobjectPosition> {
        self.positions.values()
    }

    pub fn subobject_ids(&self) -> Vec<ObjectId> {
        self.positions.keys().copied().collect()
    }

    pub fn column_count(&self) -> usize {
        self.positions
            .values()
            .map(|p| p.column + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn row_count(&self, column: usize) -> usize {
        self.positions.values().filter(|p| p.column == column).count()
    }

    /// Positions of one column, ordered by row
    pub fn column(&self, column: usize) -> Vec<&SubobjectPosition> {
        let mut cells: Vec<&SubobjectPosition> = self
            .positions
            .values()
            .filter(|p| p.column == column)
            .collect();
        cells.sort_by_key(|p| p.row);
        cells
    }

    /// Subobject ids of one column, ordered by row
    pub fn column_ids(&self, column: usize) -> Vec<ObjectId> {
        self.column(column).iter().map(|p| p.subobject_id).collect()
    }

    /// All columns in display order
    pub fn columns(&self) -> Vec<Vec<&SubobjectPosition>> {
        (0..self.column_count()).map(|c| self.column(c)).collect()
    }

    /// Check both grid invariants
    pub fn is_compact(&self) -> bool {
        let column_count = self.column_count();
        (0..column_count).all(|column| {
            let mut rows: Vec<usize> = self
                .positions
                .values()
                .filter(|p| p.column == column)
                .map(|p| p.row)
                .collect();
            rows.sort_unstable();
            !rows.is_empty() && rows.iter().enumerate().all(|(i, row)| i == *row)
        })
    }

    /// Id for the next unsaved subobject: one below the smallest id, starting at -1
    pub fn next_new_subobject_id(&self) -> ObjectId {
        let min_id = self.positions.keys().next().copied().unwrap_or(0);
        min_id.min(0) - 1
    }

    /// Append a new, unsaved subobject to the end of the last column
    pub fn add_new_subobject(&mut self) -> ObjectId {
        let subobject_id = self.next_new_subobject_id();
        let position = self.append_position(subobject_id);
        tracing::debug!(
            "Added new subobject {} at ({}, {})",
            subobject_id,
            position.column,
            position.row
        );
        subobject_id
    }

    /// Append an existing object as a subobject to the end of the last column
    pub fn add_existing_subobject(
        &mut self,
        subobject_id: ObjectId,
        is_composite: bool,
    ) -> LayoutResult<&SubobjectPosition> {
        if self.contains(subobject_id) {
            return Err(CompositeLayoutError::DuplicateSubobject { subobject_id });
        }
        let position = self.append_position(subobject_id);
        position.is_composite = is_composite;
        Ok(position)
    }

    /// Append a new subobject under an id allocated by the caller
    pub fn add_new_subobject_as(&mut self, subobject_id: ObjectId) -> LayoutResult<()> {
        if self.contains(subobject_id) {
            return Err(CompositeLayoutError::DuplicateSubobject { subobject_id });
        }
        self.append_position(subobject_id);
        Ok(())
    }

    /// Give a subobject another id, keeping its slot and card state
    pub fn rekey(&mut self, subobject_id: ObjectId, new_id: ObjectId) -> LayoutResult<()> {
        if self.contains(new_id) {
            return Err(CompositeLayoutError::DuplicateSubobject {
                subobject_id: new_id,
            });
        }
        let mut position = self
            .positions
            .remove(&subobject_id)
            .ok_or(CompositeLayoutError::subobject_not_found(subobject_id))?;
        position.subobject_id = new_id;
        self.positions.insert(new_id, position);
        Ok(())
    }

    fn append_position(&mut self, subobject_id: ObjectId) -> &mut SubobjectPosition {
        let column = self.column_count().saturating_sub(1);
        let row = self.row_count(column);
        self.positions
            .entry(subobject_id)
            .or_insert_with(|| SubobjectPosition::new(subobject_id, column, row))
    }

    /// Remove a subobject and compact its column (and the column list if it empties)
    pub fn remove_entirely(&mut self, subobject_id: ObjectId) -> LayoutResult<SubobjectPosition> {
        self.take_out(subobject_id)
            .ok_or(CompositeLayoutError::subobject_not_found(subobject_id))
    }

    fn take_out(&mut self, subobject_id: ObjectId) -> Option<SubobjectPosition> {
        let removed = self.positions.remove(&subobject_id)?;

        for position in self.positions.values_mut() {
            if position.column == removed.column && position.row > removed.row {
                position.row -= 1;
            }
        }

        if self.row_count(removed.column) == 0 {
            for position in self.positions.values_mut() {
                if position.column > removed.column {
                    position.column -= 1;
                }
            }
        }

        Some(removed)
    }

    fn insert_at(&mut self, mut position: SubobjectPosition, column: usize, row: usize) {
        for other in self.positions.values_mut() {
            if other.column == column && other.row >= row {
                other.row += 1;
            }
        }
        position.column = column;
        position.row = row;
        self.positions.insert(position.subobject_id, position);
    }

    fn insert_column_with(&mut self, mut position: SubobjectPosition, column: usize) {
        for other in self.positions.values_mut() {
            if other.column >= column {
                other.column += 1;
            }
        }
        position.column = column;
        position.row = 0;
        self.positions.insert(position.subobject_id, position);
    }

    fn origin(&self, subobject_id: ObjectId) -> LayoutResult<(usize, usize, usize)> {
        let position = self
            .position(subobject_id)
            .ok_or(CompositeLayoutError::subobject_not_found(subobject_id))?;
        Ok((
            position.column,
            position.row,
            self.row_count(position.column),
        ))
    }

    fn check_column(&self, column: usize) -> LayoutResult<()> {
        let column_count = self.column_count();
        if column >= column_count {
            return Err(CompositeLayoutError::column_out_of_range(
                column,
                column_count,
            ));
        }
        Ok(())
    }

    /// Move a card so that it lands at `(target_column, target_row)`
    ///
    /// Coordinates refer to the layout before the move. The card previously at
    /// the target slot (if any) ends up right after the moved card, so a drop on
    /// a card inserts immediately before it. `target_row` may equal the row count
    /// of the column to append.
    pub fn move_onto_position(
        &mut self,
        dragged_id: ObjectId,
        target_column: usize,
        target_row: usize,
    ) -> LayoutResult<DropOutcome> {
        let (origin_column, origin_row, origin_len) = self.origin(dragged_id)?;
        self.check_column(target_column)?;
        let row_count = self.row_count(target_column);
        if target_row > row_count {
            return Err(CompositeLayoutError::RowOutOfRange {
                column: target_column,
                row: target_row,
                row_count,
            });
        }

        let mut column = target_column;
        let mut row = target_row;
        if origin_column == target_column {
            if origin_row == target_row || origin_row + 1 == target_row {
                return Ok(DropOutcome::Unchanged);
            }
            if origin_row < target_row {
                row -= 1;
            }
        } else if origin_len == 1 && origin_column < target_column {
            column -= 1;
        }

        if let Some(position) = self.take_out(dragged_id) {
            self.insert_at(position, column, row);
        }
        tracing::debug!(
            "Moved subobject {} from ({}, {}) to ({}, {})",
            dragged_id,
            origin_column,
            origin_row,
            column,
            row
        );
        Ok(DropOutcome::Moved)
    }

    /// Move a card to the end of `target_column`
    pub fn move_onto_column_end(
        &mut self,
        dragged_id: ObjectId,
        target_column: usize,
    ) -> LayoutResult<DropOutcome> {
        self.check_column(target_column)?;
        let row_count = self.row_count(target_column);
        self.move_onto_position(dragged_id, target_column, row_count)
    }

    /// Move a card into a new column created right after `after_column`
    pub fn move_to_new_column_right(
        &mut self,
        dragged_id: ObjectId,
        after_column: usize,
    ) -> LayoutResult<DropOutcome> {
        self.check_column(after_column)?;
        self.move_to_new_column(dragged_id, after_column + 1)
    }

    /// Move a card into a new column created at `before_column`, shifting it right
    pub fn move_to_new_column_left(
        &mut self,
        dragged_id: ObjectId,
        before_column: usize,
    ) -> LayoutResult<DropOutcome> {
        self.check_column(before_column)?;
        self.move_to_new_column(dragged_id, before_column)
    }

    /// `new_column` is the index of the new column in the layout before the move
    fn move_to_new_column(
        &mut self,
        dragged_id: ObjectId,
        new_column: usize,
    ) -> LayoutResult<DropOutcome> {
        let (origin_column, _, origin_len) = self.origin(dragged_id)?;

        let mut column = new_column;
        if origin_len == 1 {
            if origin_column < column {
                column -= 1;
            }
            // A lone card next to its own column would recreate the same grid
            if column == origin_column {
                return Ok(DropOutcome::Unchanged);
            }
        }

        if let Some(position) = self.take_out(dragged_id) {
            self.insert_column_with(position, column);
        }
        tracing::debug!(
            "Moved subobject {} from column {} into new column {}",
            dragged_id,
            origin_column,
            column
        );
        Ok(DropOutcome::Moved)
    }

    /// Apply a drop gesture
    pub fn apply_drop(
        &mut self,
        dragged_id: ObjectId,
        target: DropTarget,
    ) -> LayoutResult<DropOutcome> {
        match target {
            DropTarget::Subobject(target_id) => {
                if target_id == dragged_id {
                    return Ok(DropOutcome::Unchanged);
                }
                let (column, row, _) = self.origin(target_id)?;
                self.move_onto_position(dragged_id, column, row)
            }
            DropTarget::ColumnEnd(column) => self.move_onto_column_end(dragged_id, column),
            DropTarget::NewColumnLeft(column) => self.move_to_new_column_left(dragged_id, column),
            DropTarget::NewColumnRight(column) => {
                self.move_to_new_column_right(dragged_id, column)
            }
            DropTarget::Outside => {
                tracing::debug!("Subobject {} dropped outside the grid", dragged_id);
                Ok(DropOutcome::Unchanged)
            }
        }
    }

    fn position_mut(&mut self, subobject_id: ObjectId) -> LayoutResult<&mut SubobjectPosition> {
        self.positions
            .get_mut(&subobject_id)
            .ok_or(CompositeLayoutError::subobject_not_found(subobject_id))
    }

    fn transition_delete_mode(
        &mut self,
        subobject_id: ObjectId,
        to: DeleteMode,
    ) -> LayoutResult<()> {
        let position = self.position_mut(subobject_id)?;
        if !position.delete_mode.can_transition_to(to) {
            return Err(CompositeLayoutError::InvalidDeleteTransition {
                subobject_id,
                from: position.delete_mode,
                to,
            });
        }
        position.delete_mode = to;
        Ok(())
    }

    /// Mark a subobject for removal from the composite
    pub fn delete(&mut self, subobject_id: ObjectId) -> LayoutResult<()> {
        self.transition_delete_mode(subobject_id, DeleteMode::Deleted)
    }

    /// Mark a subobject for removal from the composite and deletion of the object itself
    pub fn fully_delete(&mut self, subobject_id: ObjectId) -> LayoutResult<()> {
        self.transition_delete_mode(subobject_id, DeleteMode::FullyDeleted)
    }

    pub fn restore(&mut self, subobject_id: ObjectId) -> LayoutResult<()> {
        self.transition_delete_mode(subobject_id, DeleteMode::None)
    }

    /// Flip expanded/collapsed; grid coordinates are not affected
    pub fn toggle_expanded(&mut self, subobject_id: ObjectId) -> LayoutResult<bool> {
        let position = self.position_mut(subobject_id)?;
        position.expanded = !position.expanded;
        Ok(position.expanded)
    }

    pub fn set_selected_tab(&mut self, subobject_id: ObjectId, tab: u32) -> LayoutResult<()> {
        self.position_mut(subobject_id)?.selected_tab = tab;
        Ok(())
    }

    pub fn set_show_description_composite(
        &mut self,
        subobject_id: ObjectId,
        value: ShowDescriptionComposite,
    ) -> LayoutResult<()> {
        self.position_mut(subobject_id)?.show_description_composite = value;
        Ok(())
    }

    pub fn set_fetch_error(
        &mut self,
        subobject_id: ObjectId,
        error: impl Into<String>,
    ) -> LayoutResult<()> {
        self.position_mut(subobject_id)?.fetch_error = error.into();
        Ok(())
    }

    pub fn clear_fetch_error(&mut self, subobject_id: ObjectId) -> LayoutResult<()> {
        self.position_mut(subobject_id)?.fetch_error.clear();
        Ok(())
    }

    pub fn set_is_composite(&mut self, subobject_id: ObjectId, is_composite: bool) -> LayoutResult<()> {
        self.position_mut(subobject_id)?.is_composite = is_composite;
        Ok(())
    }

    /// Canonical entries for every position, including ones marked as deleted
    pub fn to_subobjects(&self) -> Vec<CompositeSubobject> {
        let mut subobjects: Vec<CompositeSubobject> =
            self.positions.values().map(|p| p.to_subobject()).collect();
        subobjects.sort_by_key(|s| (s.column, s.row));
        subobjects
    }

    /// Drop deleted positions, compact the grid and collect the ids to delete
    pub fn to_save_payload(&self) -> CompositeSavePayload {
        let mut remaining = self.clone();
        let mut payload = CompositeSavePayload::default();

        for position in self.positions.values() {
            match position.delete_mode {
                DeleteMode::None => continue,
                DeleteMode::Deleted => payload.deleted_subobject_ids.push(position.subobject_id),
                DeleteMode::FullyDeleted => payload
                    .fully_deleted_subobject_ids
                    .push(position.subobject_id),
            }
            remaining.take_out(position.subobject_id);
        }

        payload.subobjects = remaining.to_subobjects();
        payload
    }

    /// Grid structure used to detect data modifications
    pub(crate) fn structure(&self) -> BTreeMap<ObjectId, (usize, usize, DeleteMode)> {
        self.positions
            .values()
            .map(|p| (p.subobject_id, (p.column, p.row, p.delete_mode)))
            .collect()
    }
}

/// Pointer zone of a card heading while hovering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerZone {
    #[default]
    Outside,
    Heading,
    ExpandToggle,
}

/// Whether a drag gesture may start from a card
///
/// Dragging starts from the heading only. Hovering the expand/collapse toggle
/// suppresses it until the pointer leaves the toggle again; nothing is latched
/// beyond the current hover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragEligibility {
    zone: PointerZone,
}

impl DragEligibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zone(&self) -> PointerZone {
        self.zone
    }

    pub fn pointer_enter_heading(&mut self) {
        self.zone = PointerZone::Heading;
    }

    pub fn pointer_leave_heading(&mut self) {
        self.zone = PointerZone::Outside;
    }

    pub fn pointer_enter_toggle(&mut self) {
        self.zone = PointerZone::ExpandToggle;
    }

    /// The toggle sits inside the heading, so leaving it lands back on the heading
    pub fn pointer_leave_toggle(&mut self) {
        if self.zone == PointerZone::ExpandToggle {
            self.zone = PointerZone::Heading;
        }
    }

    pub fn can_start_drag(&self) -> bool {
        self.zone == PointerZone::Heading
    }
}
