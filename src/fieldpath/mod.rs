//! Field path module - field paths, field sets and ownership records.
//!
//! This module tracks which manager owns which fields of an object.

mod path;
mod serialize;
mod set;

pub use path::*;
pub use serialize::*;
pub use set::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// APIVersion tags a field set with the version it was computed in.
///
/// Ownership bookkeeping is always stored normalized to the hub version.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct APIVersion(String);

impl APIVersion {
    /// Creates a new APIVersion.
    pub fn new(version: impl Into<String>) -> Self {
        APIVersion(version.into())
    }

    /// Returns the version string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for APIVersion {
    fn from(s: &str) -> Self {
        APIVersion(s.to_string())
    }
}

impl fmt::Display for APIVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operation is the kind of write a manager performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Operation {
    Apply,
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Apply => write!(f, "Apply"),
            Operation::Update => write!(f, "Update"),
        }
    }
}

/// ManagerIdentity is the actor attributed with a write: a manager name
/// plus the operation kind it used. The same name used through Apply and
/// through Update counts as two independent owners.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ManagerIdentity {
    name: String,
    operation: Operation,
}

impl ManagerIdentity {
    /// Creates a new identity.
    pub fn new(name: impl Into<String>, operation: Operation) -> Self {
        ManagerIdentity {
            name: name.into(),
            operation,
        }
    }

    /// Returns the manager name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the operation kind.
    pub fn operation(&self) -> Operation {
        self.operation
    }
}

impl fmt::Display for ManagerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} using {}", self.name, self.operation)
    }
}

/// VersionedSet is a field set tagged with the API version it was
/// computed in, plus whether it came from an apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedSet {
    set: Set,
    api_version: APIVersion,
    applied: bool,
}

impl VersionedSet {
    /// Creates a new VersionedSet.
    pub fn new(set: Set, api_version: APIVersion, applied: bool) -> Self {
        VersionedSet {
            set,
            api_version,
            applied,
        }
    }

    /// Returns the field set.
    pub fn set(&self) -> &Set {
        &self.set
    }

    /// Returns the API version the set was computed in.
    pub fn api_version(&self) -> &APIVersion {
        &self.api_version
    }

    /// Returns true if the set came from an apply operation.
    pub fn applied(&self) -> bool {
        self.applied
    }
}

/// ManagedFields maps each manager identity to the fields it owns.
///
/// Invariant: at most one entry per identity, and a manager's set equals
/// exactly the leaf fields it set in its most recent successful write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedFields {
    managers: BTreeMap<ManagerIdentity, VersionedSet>,
}

impl ManagedFields {
    /// Creates an empty ManagedFields.
    pub fn new() -> Self {
        ManagedFields::default()
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    /// Gets a manager's entry.
    pub fn get(&self, manager: &ManagerIdentity) -> Option<&VersionedSet> {
        self.managers.get(manager)
    }

    /// Inserts or replaces a manager's entry.
    pub fn insert(&mut self, manager: ManagerIdentity, vs: VersionedSet) {
        self.managers.insert(manager, vs);
    }

    /// Removes a manager's entry.
    pub fn remove(&mut self, manager: &ManagerIdentity) -> Option<VersionedSet> {
        self.managers.remove(manager)
    }

    pub fn contains(&self, manager: &ManagerIdentity) -> bool {
        self.managers.contains_key(manager)
    }

    /// Iterates over entries in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (&ManagerIdentity, &VersionedSet)> {
        self.managers.iter()
    }

    /// Iterates over manager identities.
    pub fn managers(&self) -> impl Iterator<Item = &ManagerIdentity> {
        self.managers.keys()
    }

    /// Drops every manager whose set became empty.
    pub fn remove_empty(&mut self) {
        self.managers.retain(|_, vs| !vs.set.is_empty());
    }
}

impl fmt::Display for ManagedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (manager, vs) in &self.managers {
            writeln!(f, "{}:", manager)?;
            writeln!(f, "- APIVersion: {}", vs.api_version)?;
            for path in vs.set.paths() {
                writeln!(f, "- {}", path)?;
            }
        }
        Ok(())
    }
}
