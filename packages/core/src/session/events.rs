//! Session Events
//!
//! Emitted by [`super::EditSessionStore`] after canonical state was written or
//! an edit state was replaced, so that views holding derived data (feeds,
//! tag lists, side menus) can refresh without polling the store.
//!
//! Events are sent on a tokio broadcast channel; sending with no subscriber
//! is not an error.

use crate::models::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capacity of the session event channel
pub const SESSION_EVENT_CHANNEL_CAPACITY: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// An edit state was seeded from canonical state
    #[serde(rename_all = "camelCase")]
    EditStateSeeded { object_id: ObjectId },

    /// An edit state was reseeded, dropping its pending edits
    #[serde(rename_all = "camelCase")]
    EditStateReset { object_id: ObjectId },

    /// A tag update was committed for the listed objects
    #[serde(rename_all = "camelCase")]
    TagsCommitted {
        object_ids: Vec<ObjectId>,
        modified_at: Option<DateTime<Utc>>,
    },

    /// An object was saved; `previous_id` differs for newly created objects
    #[serde(rename_all = "camelCase")]
    ObjectSaved {
        previous_id: ObjectId,
        object_id: ObjectId,
    },

    #[serde(rename_all = "camelCase")]
    ObjectsDeleted { object_ids: Vec<ObjectId> },

    /// The save collaborator rejected a request; pending edits are kept
    #[serde(rename_all = "camelCase")]
    SaveFailed {
        object_ids: Vec<ObjectId>,
        message: String,
    },
}

impl SessionEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::EditStateSeeded { .. } => "edit_state_seeded",
            SessionEvent::EditStateReset { .. } => "edit_state_reset",
            SessionEvent::TagsCommitted { .. } => "tags_committed",
            SessionEvent::ObjectSaved { .. } => "object_saved",
            SessionEvent::ObjectsDeleted { .. } => "objects_deleted",
            SessionEvent::SaveFailed { .. } => "save_failed",
        }
    }
}
