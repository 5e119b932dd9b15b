//! Comparison result types.

use crate::fieldpath::Set;
use std::fmt;

/// Comparison holds the result of comparing two typed values.
///
/// No field appears in more than one of the three sets. If all three are
/// empty the values were equal.
#[derive(Debug, Clone, Default)]
pub struct Comparison {
    /// Leaves present on the left-hand side only.
    pub removed: Set,
    /// Leaves present on both sides with different values.
    pub modified: Set,
    /// Leaves present on the right-hand side only.
    pub added: Set,
}

impl Comparison {
    /// Creates an empty Comparison.
    pub fn new() -> Self {
        Comparison::default()
    }

    /// Returns true if the values were equal.
    pub fn is_same(&self) -> bool {
        self.removed.is_empty() && self.modified.is_empty() && self.added.is_empty()
    }

    /// Every leaf the right-hand side touched relative to the left.
    pub fn touched(&self) -> Set {
        self.modified.union(&self.added).union(&self.removed)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, set) in [
            ("modified", &self.modified),
            ("added", &self.added),
            ("removed", &self.removed),
        ] {
            if set.is_empty() {
                continue;
            }
            writeln!(f, "- {} fields:", label)?;
            for path in set.paths() {
                writeln!(f, "  {}", path)?;
            }
        }
        Ok(())
    }
}
