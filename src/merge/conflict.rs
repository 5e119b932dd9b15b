//! Conflict types for merge operations.

use crate::fieldpath::{ManagerIdentity, Path, Set};
use std::fmt;

/// Conflict is one disputed field: the manager that owns it and the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub manager: ManagerIdentity,
    pub path: Path,
}

impl Conflict {
    /// Creates a new conflict.
    pub fn new(manager: ManagerIdentity, path: Path) -> Self {
        Conflict { manager, path }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conflict with {} at {}", self.manager, self.path)
    }
}

/// Conflicts is the full set of disputed fields from one apply attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conflicts {
    conflicts: Vec<Conflict>,
}

impl Conflicts {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Conflicts::default()
    }

    /// Adds a conflict.
    pub fn add(&mut self, conflict: Conflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter()
    }

    /// Collects the disputed paths owned by one manager.
    pub fn paths_of(&self, manager: &ManagerIdentity) -> Set {
        let mut set = Set::new();
        for conflict in &self.conflicts {
            if &conflict.manager == manager {
                set.insert(&conflict.path);
            }
        }
        set
    }

    /// Collects every disputed path.
    pub fn to_set(&self) -> Set {
        let mut set = Set::new();
        for conflict in &self.conflicts {
            set.insert(&conflict.path);
        }
        set
    }
}

impl IntoIterator for Conflicts {
    type Item = Conflict;
    type IntoIter = std::vec::IntoIter<Conflict>;

    fn into_iter(self) -> Self::IntoIter {
        self.conflicts.into_iter()
    }
}

impl fmt::Display for Conflicts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, conflict) in self.conflicts.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", conflict)?;
        }
        Ok(())
    }
}
