//! Pending Edit Model
//!
//! Value-like records describing unsaved changes to objects: tag diffs, the
//! per-object edit state, multi-object tag reconciliation and the composite grid.
//! Nothing in this module talks to a store; see [`crate::session`] for that.

mod composite_layout;
mod object_edit_state;
mod reconciler;
mod tag_diff;
mod tag_toggle;

#[cfg(test)]
mod composite_layout_test;

pub use composite_layout::{
    CompositeLayout, CompositeLayoutError, CompositeSavePayload, DeleteMode, DragEligibility,
    DropOutcome, DropTarget, LayoutResult, PointerZone, SubobjectPosition,
};
pub use object_edit_state::ObjectEditState;
pub use reconciler::{EditStates, ReconcileError, SideMenuMode, TagPresence, TagSelection};
pub use tag_diff::{merge, AddedTags};
pub use tag_toggle::TagEditState;
