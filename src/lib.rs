//! # Field Manager
//!
//! Field-ownership tracking and server-side apply orchestration for
//! declarative resource objects.
//!
//! When several independent actors (controllers, operators, tooling) write
//! to the same object, the control plane must remember which actor last set
//! which field, merge partial "apply" patches without clobbering fields
//! owned by others, and reject conflicting writes unless they are forced.
//! This crate implements that bookkeeping and the orchestration around it.
//!
//! ## Modules
//!
//! - [`value`] - In-memory representation of YAML/JSON objects
//! - [`fieldpath`] - Field paths, field sets and per-manager ownership records
//! - [`typed`] - Structural comparison, merge and field-set extraction on values
//! - [`merge`] - The merge engine: multi-manager update/apply with conflicts
//! - [`object`] - Resource object wrapper with metadata accessors
//! - [`manager`] - The structured merge orchestrator and manager identity rules

pub mod error;
pub mod fieldpath;
pub mod manager;
pub mod merge;
pub mod object;
pub mod typed;
pub mod value;

pub use error::Error;
pub use fieldpath::{
    APIVersion, ManagedFields, ManagerIdentity, Operation, Path, PathElement,
    Set as FieldPathSet, VersionedSet,
};
pub use manager::{
    Managed, ManagedFieldsEntry, StructuredMergeManager, DEFAULT_FIELD_MANAGER,
    FIELD_MANAGER_MAX_LENGTH,
};
pub use merge::{Conflict, Conflicts, Updater};
pub use object::Object;
pub use typed::{Comparison, TypedValue};
pub use value::Value;
