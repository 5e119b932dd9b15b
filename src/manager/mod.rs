//! Manager module - the structured merge orchestrator and its collaborators.
//!
//! One write request produces one call into [`StructuredMergeManager`]:
//! it reads the live object, the incoming write and the previously
//! recorded ownership, and returns the resulting object content plus
//! fresh ownership bookkeeping. There is no shared mutable state; stale
//! writes are the storage layer's optimistic-concurrency problem.

mod capabilities;
mod entries;
mod identity;
mod preparers;
mod structuredmerge;


pub use capabilities::*;
pub use entries::*;
pub use identity::*;
pub use preparers::*;
pub use structuredmerge::*;

use crate::fieldpath::{APIVersion, ManagedFields, ManagerIdentity};
use crate::object::Object;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// GroupVersion identifies an API group and version, e.g. `apps/v1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupVersion {
    pub group: String,
    pub version: String,
}

impl GroupVersion {
    /// Creates a GroupVersion.
    pub fn new(group: impl Into<String>, version: impl Into<String>) -> Self {
        GroupVersion {
            group: group.into(),
            version: version.into(),
        }
    }

    /// Parses `"apps/v1"` or the core form `"v1"`.
    pub fn parse(s: &str) -> Self {
        match s.split_once('/') {
            Some((group, version)) => GroupVersion::new(group, version),
            None => GroupVersion::new("", s),
        }
    }

    /// Reads the group and version an object declares.
    pub fn from_object(obj: &Object) -> Option<GroupVersion> {
        obj.api_version().map(GroupVersion::parse)
    }

    /// The version tag used for ownership bookkeeping.
    pub fn api_version(&self) -> APIVersion {
        APIVersion::new(self.to_string())
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.version)
        } else {
            write!(f, "{}/{}", self.group, self.version)
        }
    }
}

/// Managed is an immutable snapshot of ownership records plus each
/// manager's last-write time. A fresh value is constructed on every
/// successful Update/Apply; the caller attaches it to the object before
/// persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Managed {
    fields: ManagedFields,
    times: BTreeMap<ManagerIdentity, DateTime<Utc>>,
}

impl Managed {
    /// Creates a snapshot from ownership records and timestamps.
    pub fn new(
        fields: ManagedFields,
        times: BTreeMap<ManagerIdentity, DateTime<Utc>>,
    ) -> Self {
        Managed { fields, times }
    }

    /// A snapshot with no owners.
    pub fn empty() -> Self {
        Managed::default()
    }

    /// The full ownership mapping.
    pub fn fields(&self) -> &ManagedFields {
        &self.fields
    }

    /// The full timestamp mapping.
    pub fn times(&self) -> &BTreeMap<ManagerIdentity, DateTime<Utc>> {
        &self.times
    }

    /// Returns a copy with one manager's last-write time set. Used by the
    /// persistence layer to stamp the acting manager.
    pub fn with_time(&self, manager: ManagerIdentity, time: DateTime<Utc>) -> Managed {
        let mut times = self.times.clone();
        times.insert(manager, time);
        Managed {
            fields: self.fields.clone(),
            times,
        }
    }
}

/// Clears the deprecated single-string manager attribute so it is never
/// persisted. Called unconditionally on every write path.
pub fn remove_object_field_manager(obj: &mut Object) {
    obj.set_field_manager("");
}
