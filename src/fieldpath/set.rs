//! Set of field paths, stored as a trie.

use super::path::{Path, PathElement};
use std::collections::{BTreeMap, BTreeSet};

/// Set is a collection of field paths with standard set algebra.
///
/// Paths are stored as a trie: `members` holds elements whose path ends at
/// this level, `children` holds prefixes that continue deeper. The empty
/// set is the additive identity for union.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Set {
    members: BTreeSet<PathElement>,
    children: BTreeMap<PathElement, Set>,
}

impl Set {
    /// Creates an empty set.
    pub fn new() -> Self {
        Set::default()
    }

    /// Creates a set holding the given paths.
    pub fn from_paths<I: IntoIterator<Item = Path>>(paths: I) -> Self {
        let mut set = Set::new();
        for path in paths {
            set.insert(&path);
        }
        set
    }

    /// Returns true if the set holds no paths.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.children.is_empty()
    }

    /// Returns the number of paths in the set.
    pub fn len(&self) -> usize {
        let mut n = self.members.len();
        for child in self.children.values() {
            n += child.len();
        }
        n
    }

    /// Returns true if the set contains exactly this path.
    pub fn has(&self, path: &Path) -> bool {
        self.has_elements(path.as_slice())
    }

    fn has_elements(&self, elements: &[PathElement]) -> bool {
        match elements {
            [] => false,
            [last] => self.members.contains(last),
            [first, rest @ ..] => self
                .children
                .get(first)
                .map(|child| child.has_elements(rest))
                .unwrap_or(false),
        }
    }

    /// Inserts a path. Empty paths are ignored.
    pub fn insert(&mut self, path: &Path) {
        self.insert_elements(path.as_slice());
    }

    fn insert_elements(&mut self, elements: &[PathElement]) {
        match elements {
            [] => {}
            [last] => {
                self.members.insert(last.clone());
            }
            [first, rest @ ..] => {
                self.children
                    .entry(first.clone())
                    .or_default()
                    .insert_elements(rest);
            }
        }
    }

    /// Returns the union of two sets.
    pub fn union(&self, other: &Set) -> Set {
        let mut result = self.clone();
        result.merge_in(other);
        result
    }

    fn merge_in(&mut self, other: &Set) {
        self.members.extend(other.members.iter().cloned());
        for (key, other_child) in &other.children {
            match self.children.get_mut(key) {
                Some(child) => child.merge_in(other_child),
                None => {
                    self.children.insert(key.clone(), other_child.clone());
                }
            }
        }
    }

    /// Returns the intersection of two sets.
    pub fn intersection(&self, other: &Set) -> Set {
        let members = self.members.intersection(&other.members).cloned().collect();

        let mut children = BTreeMap::new();
        for (key, child) in &self.children {
            if let Some(other_child) = other.children.get(key) {
                let common = child.intersection(other_child);
                if !common.is_empty() {
                    children.insert(key.clone(), common);
                }
            }
        }

        Set { members, children }
    }

    /// Returns the difference of two sets (self - other).
    pub fn difference(&self, other: &Set) -> Set {
        let members = self.members.difference(&other.members).cloned().collect();

        let mut children = BTreeMap::new();
        for (key, child) in &self.children {
            match other.children.get(key) {
                Some(other_child) => {
                    let remaining = child.difference(other_child);
                    if !remaining.is_empty() {
                        children.insert(key.clone(), remaining);
                    }
                }
                None => {
                    children.insert(key.clone(), child.clone());
                }
            }
        }

        Set { members, children }
    }

    /// Calls `f` for every path in the set, in sorted order.
    pub fn iterate<F>(&self, mut f: F)
    where
        F: FnMut(&Path),
    {
        self.iterate_inner(&mut Path::new(), &mut f);
    }

    fn iterate_inner<F>(&self, prefix: &mut Path, f: &mut F)
    where
        F: FnMut(&Path),
    {
        for member in &self.members {
            prefix.push(member.clone());
            f(prefix);
            prefix.pop();
        }
        for (key, child) in &self.children {
            prefix.push(key.clone());
            child.iterate_inner(prefix, f);
            prefix.pop();
        }
    }

    /// Collects every path in the set, in sorted order.
    pub fn paths(&self) -> Vec<Path> {
        let mut out = Vec::new();
        self.iterate(|p| out.push(p.clone()));
        out
    }

    /// Direct members at this level.
    pub fn members(&self) -> impl Iterator<Item = &PathElement> {
        self.members.iter()
    }

    /// Children continuing below this level.
    pub fn children(&self) -> impl Iterator<Item = (&PathElement, &Set)> {
        self.children.iter()
    }

    pub(crate) fn insert_member(&mut self, element: PathElement) {
        self.members.insert(element);
    }

    pub(crate) fn insert_child(&mut self, element: PathElement, child: Set) {
        self.children.insert(element, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_and_has() {
        let mut set = Set::new();
        assert!(set.is_empty());

        let path = Path::fields(&["metadata", "name"]);
        set.insert(&path);
        assert!(set.has(&path));
        // A strict prefix is not a member.
        assert!(!set.has(&Path::fields(&["metadata"])));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_union_identity() {
        let set = Set::from_paths(vec![Path::fields(&["a"])]);
        assert_eq!(set.union(&Set::new()), set);
        assert_eq!(Set::new().union(&set), set);
    }

    #[test]
    fn test_set_algebra() {
        let left = Set::from_paths(vec![
            Path::fields(&["spec", "replicas"]),
            Path::fields(&["spec", "paused"]),
        ]);
        let right = Set::from_paths(vec![
            Path::fields(&["spec", "paused"]),
            Path::fields(&["status", "phase"]),
        ]);

        let union = left.union(&right);
        assert_eq!(union.len(), 3);

        let common = left.intersection(&right);
        assert_eq!(common.paths(), vec![Path::fields(&["spec", "paused"])]);

        let only_left = left.difference(&right);
        assert_eq!(only_left.paths(), vec![Path::fields(&["spec", "replicas"])]);
    }

    #[test]
    fn test_iterate_sorted() {
        let set = Set::from_paths(vec![
            Path::fields(&["b"]),
            Path::fields(&["a", "y"]),
            Path::fields(&["a", "x"]),
        ]);
        let paths = set.paths();
        assert_eq!(
            paths,
            vec![
                Path::fields(&["b"]),
                Path::fields(&["a", "x"]),
                Path::fields(&["a", "y"]),
            ]
        );
    }
}
