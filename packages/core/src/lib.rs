//! Objectshelf Core Edit Engine
//!
//! This crate tracks pending, unsaved changes to objects of the Objectshelf
//! knowledge base while they are being edited, and lays out the subobject grid
//! of composite objects.
//!
//! # Architecture
//!
//! - **Value-like edit records**: tag diffs, edit states and grid layouts are plain
//!   data, cloned on write; no interior mutability
//! - **Explicit state machines**: per (object, tag) toggle state, per subobject
//!   delete mode, drag eligibility
//! - **Injected collaborators**: canonical store and backend are traits handed to
//!   the session store, no process-wide state
//!
//! # Modules
//!
//! - [`models`] - Data structures (objects, attributes, type-specific data, tags)
//! - [`edit`] - Tag diff, edit state, multi-object tag reconciliation, composite grid
//! - [`session`] - Edit session store, collaborator traits, session events
//! - [`config`] - Session configuration
//! - [`logging`] - Tracing setup for hosts

pub mod config;
pub mod edit;
pub mod error;
pub mod logging;
pub mod models;
pub mod session;

// Re-export commonly used types
pub use config::EditSessionConfig;
pub use error::{EditSessionError, Result};
pub use models::*;
pub use session::{CanonicalStore, EditSessionStore, InMemoryCanonicalStore, SaveCollaborator};
