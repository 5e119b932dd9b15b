//! Updater: the merge engine's two operations.
//!
//! `update` recomputes ownership for a full-replacement write without
//! touching object content. `apply` merges a partial patch into the live
//! object, surfacing conflicts with other managers. Both are
//! deterministic: the same inputs always produce the same outputs, and a
//! manager's set always equals exactly the leaves it set in its most
//! recent write.

use super::{Conflict, Conflicts};
use crate::error::Result;
use crate::fieldpath::{APIVersion, ManagedFields, ManagerIdentity, Operation, Set, VersionedSet};
use crate::typed::TypedValue;

/// Updater performs multi-manager merge operations. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct Updater;

impl Updater {
    /// Creates a new Updater.
    pub fn new() -> Self {
        Updater
    }

    /// Recomputes ownership after a full-replacement write.
    ///
    /// The acting manager ends up owning the leaves it changed or added;
    /// leaves it changed are stripped from their previous owners, and
    /// leaves removed from the object are dropped from every owner.
    /// Object content is never altered by this operation.
    pub fn update(
        &self,
        live: &TypedValue,
        new: &TypedValue,
        version: &APIVersion,
        managers: &mut ManagedFields,
        manager: &ManagerIdentity,
    ) -> Result<()> {
        let compare = live.compare(new)?;
        let changed = compare.modified.union(&compare.added);

        let updates: Vec<(ManagerIdentity, VersionedSet)> = managers
            .iter()
            .filter(|(id, _)| *id != manager)
            .map(|(id, vs)| {
                let remaining = vs.set().difference(&changed).difference(&compare.removed);
                (
                    id.clone(),
                    VersionedSet::new(remaining, vs.api_version().clone(), vs.applied()),
                )
            })
            .collect();
        for (id, vs) in updates {
            managers.insert(id, vs);
        }

        let previous = managers
            .get(manager)
            .map(|vs| vs.set().clone())
            .unwrap_or_default();
        let owned = previous.difference(&compare.removed).union(&changed);

        if owned.is_empty() {
            managers.remove(manager);
        } else {
            managers.insert(
                manager.clone(),
                VersionedSet::new(owned, version.clone(), false),
            );
        }

        managers.remove_empty();
        Ok(())
    }

    /// Merges a partial patch into the live object.
    ///
    /// The patch's declared leaves become owned by `manager`. A leaf the
    /// patch changes that a different manager owns is a conflict: without
    /// `force` the whole operation fails with the full conflict set and no
    /// ownership mutation; with `force` the disputed leaves transfer to
    /// `manager`. Leaves the manager previously owned but stopped
    /// declaring are pruned from the result unless another manager owns
    /// them. Returns `None` if the merge left no content.
    pub fn apply(
        &self,
        live: &TypedValue,
        patch: &TypedValue,
        version: &APIVersion,
        managers: &mut ManagedFields,
        manager: &ManagerIdentity,
        force: bool,
    ) -> Result<Option<TypedValue>> {
        let patch_set = patch.to_field_set()?;
        let merged = live.merge(patch)?;

        let compare = live.compare(&merged)?;
        let changed = compare.modified.union(&compare.added);

        let mut conflicts = Conflicts::new();
        for (id, vs) in managers.iter() {
            if id == manager {
                continue;
            }
            let disputed = vs.set().intersection(&changed);
            for path in disputed.paths() {
                conflicts.add(Conflict::new(id.clone(), path));
            }
        }
        if !conflicts.is_empty() && !force {
            return Err(conflicts.into());
        }

        // Forced: disputed leaves transfer to the applier.
        if !conflicts.is_empty() {
            let taken = conflicts.to_set();
            let transfers: Vec<(ManagerIdentity, VersionedSet)> = managers
                .iter()
                .filter(|(id, _)| *id != manager)
                .map(|(id, vs)| {
                    (
                        id.clone(),
                        VersionedSet::new(
                            vs.set().difference(&taken),
                            vs.api_version().clone(),
                            vs.applied(),
                        ),
                    )
                })
                .collect();
            for (id, vs) in transfers {
                managers.insert(id, vs);
            }
        }

        // Prune leaves the manager relinquished, unless someone else owns them.
        let previous = managers
            .get(manager)
            .map(|vs| vs.set().clone())
            .unwrap_or_default();
        let relinquished = previous.difference(&patch_set);
        let mut to_remove = Set::new();
        for path in relinquished.paths() {
            let owned_elsewhere = managers
                .iter()
                .any(|(id, vs)| id != manager && vs.set().has(&path));
            if !owned_elsewhere {
                to_remove.insert(&path);
            }
        }
        let pruned = if to_remove.is_empty() {
            merged
        } else {
            merged.remove_items(&to_remove)
        };

        if patch_set.is_empty() {
            managers.remove(manager);
        } else {
            managers.insert(
                manager.clone(),
                VersionedSet::new(patch_set, version.clone(), true),
            );
        }
        managers.remove_empty();

        if pruned.is_deleted() {
            return Ok(None);
        }
        Ok(Some(pruned))
    }
}

/// Shorthand for the identity an apply is attributed to.
pub fn applier(name: &str) -> ManagerIdentity {
    ManagerIdentity::new(name, Operation::Apply)
}

/// Shorthand for the identity an update is attributed to.
pub fn updater_identity(name: &str) -> ManagerIdentity {
    ManagerIdentity::new(name, Operation::Update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fieldpath::Path;
    use crate::typed::KeyedLists;
    use crate::value::from_json;
    use std::sync::Arc;

    fn typed(json: &str) -> TypedValue {
        TypedValue::new(from_json(json).unwrap(), Arc::new(KeyedLists::new()))
    }

    fn v1() -> APIVersion {
        APIVersion::new("v1")
    }

    #[test]
    fn test_update_ownership_equals_leaves_changed() {
        let updater = Updater::new();
        let live = typed(r#"{"spec":{"a":1}}"#);
        let new = typed(r#"{"spec":{"a":2,"b":3}}"#);

        let mut managers = ManagedFields::new();
        let ctrl = updater_identity("ctrl");
        updater
            .update(&live, &new, &v1(), &mut managers, &ctrl)
            .unwrap();

        let set = managers.get(&ctrl).unwrap().set();
        assert!(set.has(&Path::fields(&["spec", "a"])));
        assert!(set.has(&Path::fields(&["spec", "b"])));
    }

    #[test]
    fn test_update_steals_changed_fields() {
        let updater = Updater::new();
        let live = typed(r#"{"spec":{"a":1,"b":2}}"#);
        let new = typed(r#"{"spec":{"a":9,"b":2}}"#);

        let prior = applier("first");
        let mut managers = ManagedFields::new();
        managers.insert(
            prior.clone(),
            VersionedSet::new(
                Set::from_paths(vec![
                    Path::fields(&["spec", "a"]),
                    Path::fields(&["spec", "b"]),
                ]),
                v1(),
                true,
            ),
        );

        let ctrl = updater_identity("ctrl");
        updater
            .update(&live, &new, &v1(), &mut managers, &ctrl)
            .unwrap();

        // "a" moved to ctrl, "b" stayed with the prior owner.
        assert!(managers.get(&ctrl).unwrap().set().has(&Path::fields(&["spec", "a"])));
        let prior_set = managers.get(&prior).unwrap().set();
        assert!(!prior_set.has(&Path::fields(&["spec", "a"])));
        assert!(prior_set.has(&Path::fields(&["spec", "b"])));
    }

    #[test]
    fn test_update_noop_leaves_no_entry() {
        let updater = Updater::new();
        let live = typed(r#"{"spec":{"a":1}}"#);
        let new = typed(r#"{"spec":{"a":1}}"#);

        let mut managers = ManagedFields::new();
        let ctrl = updater_identity("ctrl");
        updater
            .update(&live, &new, &v1(), &mut managers, &ctrl)
            .unwrap();
        assert!(!managers.contains(&ctrl));
    }

    #[test]
    fn test_apply_conflict_blocks_without_force() {
        let updater = Updater::new();
        let live = typed(r#"{"spec":{"replicas":2}}"#);
        let patch = typed(r#"{"spec":{"replicas":5}}"#);

        let owner = applier("first");
        let mut managers = ManagedFields::new();
        managers.insert(
            owner.clone(),
            VersionedSet::new(
                Set::from_paths(vec![Path::fields(&["spec", "replicas"])]),
                v1(),
                true,
            ),
        );
        let before = managers.clone();

        let second = applier("second");
        let err = updater
            .apply(&live, &patch, &v1(), &mut managers, &second, false)
            .unwrap_err();

        let conflicts = err.conflicts().expect("conflict error");
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts.iter().next().unwrap().manager, owner);
        // No partial effect.
        assert_eq!(managers, before);
    }

    #[test]
    fn test_apply_force_transfers_ownership() {
        let updater = Updater::new();
        let live = typed(r#"{"spec":{"replicas":2}}"#);
        let patch = typed(r#"{"spec":{"replicas":5}}"#);

        let owner = applier("first");
        let mut managers = ManagedFields::new();
        managers.insert(
            owner.clone(),
            VersionedSet::new(
                Set::from_paths(vec![Path::fields(&["spec", "replicas"])]),
                v1(),
                true,
            ),
        );

        let second = applier("second");
        let merged = updater
            .apply(&live, &patch, &v1(), &mut managers, &second, true)
            .unwrap()
            .unwrap();

        assert!(managers
            .get(&second)
            .unwrap()
            .set()
            .has(&Path::fields(&["spec", "replicas"])));
        // First owner lost its only field and was dropped.
        assert!(!managers.contains(&owner));
        let replicas = merged
            .as_value()
            .as_map()
            .unwrap()
            .get("spec")
            .unwrap()
            .as_map()
            .unwrap()
            .get("replicas")
            .unwrap();
        assert_eq!(replicas, &crate::value::Value::Int(5));
    }

    #[test]
    fn test_apply_same_value_is_not_conflict() {
        let updater = Updater::new();
        let live = typed(r#"{"spec":{"replicas":2}}"#);
        let patch = typed(r#"{"spec":{"replicas":2}}"#);

        let owner = applier("first");
        let mut managers = ManagedFields::new();
        managers.insert(
            owner,
            VersionedSet::new(
                Set::from_paths(vec![Path::fields(&["spec", "replicas"])]),
                v1(),
                true,
            ),
        );

        let second = applier("second");
        let result = updater.apply(&live, &patch, &v1(), &mut managers, &second, false);
        assert!(result.is_ok());
    }

    #[test]
    fn test_apply_prunes_relinquished_fields() {
        let updater = Updater::new();
        let ctrl = applier("ctrl");

        let live = typed(r#"{"spec":{"a":1,"b":2}}"#);
        let mut managers = ManagedFields::new();
        managers.insert(
            ctrl.clone(),
            VersionedSet::new(
                Set::from_paths(vec![
                    Path::fields(&["spec", "a"]),
                    Path::fields(&["spec", "b"]),
                ]),
                v1(),
                true,
            ),
        );

        // The manager stops declaring "b".
        let patch = typed(r#"{"spec":{"a":1}}"#);
        let merged = updater
            .apply(&live, &patch, &v1(), &mut managers, &ctrl, false)
            .unwrap()
            .unwrap();

        let spec = merged.as_value().as_map().unwrap().get("spec").unwrap();
        assert!(!spec.as_map().unwrap().has("b"));
        assert!(!managers.get(&ctrl).unwrap().set().has(&Path::fields(&["spec", "b"])));
    }

    #[test]
    fn test_apply_keeps_fields_owned_by_others() {
        let updater = Updater::new();
        let ctrl = applier("ctrl");
        let other = updater_identity("other");

        let live = typed(r#"{"spec":{"a":1,"b":2}}"#);
        let mut managers = ManagedFields::new();
        managers.insert(
            ctrl.clone(),
            VersionedSet::new(
                Set::from_paths(vec![
                    Path::fields(&["spec", "a"]),
                    Path::fields(&["spec", "b"]),
                ]),
                v1(),
                true,
            ),
        );
        managers.insert(
            other,
            VersionedSet::new(
                Set::from_paths(vec![Path::fields(&["spec", "b"])]),
                v1(),
                false,
            ),
        );

        let patch = typed(r#"{"spec":{"a":1}}"#);
        let merged = updater
            .apply(&live, &patch, &v1(), &mut managers, &ctrl, false)
            .unwrap()
            .unwrap();

        // "b" survives because another manager owns it.
        let spec = merged.as_value().as_map().unwrap().get("spec").unwrap();
        assert!(spec.as_map().unwrap().has("b"));
    }

    #[test]
    fn test_apply_removing_everything_returns_none() {
        let updater = Updater::new();
        let ctrl = applier("ctrl");

        let live = typed(r#"{"spec":{"a":1}}"#);
        let mut managers = ManagedFields::new();
        managers.insert(
            ctrl.clone(),
            VersionedSet::new(
                Set::from_paths(vec![Path::fields(&["spec", "a"])]),
                v1(),
                true,
            ),
        );

        let patch = typed(r#"{}"#);
        let result = updater
            .apply(&live, &patch, &v1(), &mut managers, &ctrl, false)
            .unwrap();
        assert!(result.is_none());
        assert!(!managers.contains(&ctrl));
    }

    #[test]
    fn test_apply_is_idempotent_on_ownership() {
        let updater = Updater::new();
        let ctrl = applier("ctrl");
        let live = typed(r#"{}"#);
        let patch = typed(r#"{"spec":{"a":1,"b":2}}"#);

        let mut managers = ManagedFields::new();
        let first = updater
            .apply(&live, &patch, &v1(), &mut managers, &ctrl, false)
            .unwrap()
            .unwrap();
        let after_first = managers.clone();

        let second = updater
            .apply(&first, &patch, &v1(), &mut managers, &ctrl, false)
            .unwrap()
            .unwrap();
        assert_eq!(managers, after_first);
        assert_eq!(first.as_value(), second.as_value());
    }
}
