//! Edit Session Error Types
//!
//! Errors surfaced by [`crate::session::EditSessionStore`]. Layout contract
//! violations convert through `From`, collaborator failures are flattened into
//! [`EditSessionError::SaveFailed`] with the original message preserved.

use crate::edit::{CompositeLayoutError, ReconcileError};
use crate::models::ObjectId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditSessionError {
    /// No canonical record for the object
    #[error("Object not found: {object_id}")]
    ObjectNotFound { object_id: ObjectId },

    /// Operation needs an edit state that was never seeded (or was discarded)
    #[error("No edit state for object {object_id}")]
    EditStateMissing { object_id: ObjectId },

    /// Grid operation on an object that is not a composite
    #[error("Object {object_id} is not a composite")]
    NotComposite { object_id: ObjectId },

    /// Pending edits fail validation; save is blocked
    #[error("Validation failed for object {object_id}: {reason}")]
    Validation { object_id: ObjectId, reason: String },

    /// Tag name typed into the tag input is empty or too long
    #[error("Invalid tag name '{name}': {reason}")]
    InvalidTagName { name: String, reason: String },

    /// Save collaborator rejected the request; edit state is untouched
    #[error("Save failed: {0}")]
    SaveFailed(String),

    /// An operation is still outstanding for the object
    #[error("Object {object_id} has an operation in flight")]
    AlreadyFetching { object_id: ObjectId },

    #[error("Layout error: {0}")]
    Layout(#[from] CompositeLayoutError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EditSessionError {
    pub fn object_not_found(object_id: ObjectId) -> Self {
        Self::ObjectNotFound { object_id }
    }

    pub fn edit_state_missing(object_id: ObjectId) -> Self {
        Self::EditStateMissing { object_id }
    }

    pub fn not_composite(object_id: ObjectId) -> Self {
        Self::NotComposite { object_id }
    }

    pub fn validation(object_id: ObjectId, reason: impl Into<String>) -> Self {
        Self::Validation {
            object_id,
            reason: reason.into(),
        }
    }

    pub fn invalid_tag_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTagName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Keep the whole `anyhow` context chain in the message
    pub fn save_failed(error: anyhow::Error) -> Self {
        Self::SaveFailed(format!("{:#}", error))
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<ReconcileError> for EditSessionError {
    fn from(error: ReconcileError) -> Self {
        match error {
            ReconcileError::EditStateMissing { object_id } => Self::EditStateMissing { object_id },
        }
    }
}

pub type Result<T> = std::result::Result<T, EditSessionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_save_failed_keeps_context_chain() {
        let error = Err::<(), _>(anyhow::anyhow!("HTTP 500"))
            .context("saving tags of object 3")
            .unwrap_err();
        let error = EditSessionError::save_failed(error);
        assert_eq!(
            error.to_string(),
            "Save failed: saving tags of object 3: HTTP 500"
        );
    }

    #[test]
    fn test_layout_error_converts() {
        let error: EditSessionError = CompositeLayoutError::subobject_not_found(4).into();
        assert!(matches!(error, EditSessionError::Layout(_)));
        assert_eq!(
            error.to_string(),
            "Layout error: Subobject 4 is not part of the layout"
        );
    }
}
