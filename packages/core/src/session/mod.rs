//! Edit Session
//!
//! [`EditSessionStore`] owns the edit states of one session and connects them
//! to the canonical store and the backend through injected collaborators.

mod collaborators;
mod events;
mod in_memory;
mod store;

pub use collaborators::{
    BulkTagSaveResult, CanonicalStore, ObjectSavePayload, SaveCollaborator, SavedObject,
    SavedSubobject, TagSaveResult,
};
pub use events::{SessionEvent, SESSION_EVENT_CHANNEL_CAPACITY};
pub use in_memory::InMemoryCanonicalStore;
pub use store::{EditSessionStore, PendingTagUpdate};
