//! Per-kind prepare-for-update hooks.
//!
//! Some kinds have subresources a regular write must not touch: a
//! workload's status belongs to its controller, so an incoming write has
//! its status replaced with the live one before persistence. The hook is
//! looked up per kind in a capability map; kinds with no registered hook
//! get a shared no-op and are exempt from the ownership wipe.

use crate::object::Object;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::Arc;

/// UpdatePreparer mutates an incoming object against the live one before
/// it is persisted.
pub trait UpdatePreparer: Send + Sync {
    fn prepare(&self, newer: &mut Object, older: &Object);
}

/// NoopPreparer leaves the incoming object untouched.
#[derive(Debug, Clone, Default)]
pub struct NoopPreparer;

impl UpdatePreparer for NoopPreparer {
    fn prepare(&self, _newer: &mut Object, _older: &Object) {}
}

static NOOP_PREPARER: Lazy<Arc<NoopPreparer>> = Lazy::new(|| Arc::new(NoopPreparer));

/// UpdatePreparers maps resource kinds to their prepare hook.
#[derive(Clone, Default)]
pub struct UpdatePreparers {
    by_kind: BTreeMap<String, Arc<dyn UpdatePreparer>>,
}

impl UpdatePreparers {
    /// Creates an empty map: every kind gets the no-op.
    pub fn new() -> Self {
        UpdatePreparers::default()
    }

    /// Registers a hook for a kind.
    pub fn register(mut self, kind: impl Into<String>, preparer: Arc<dyn UpdatePreparer>) -> Self {
        self.by_kind.insert(kind.into(), preparer);
        self
    }

    /// Returns the hook for a kind, defaulting to the shared no-op.
    pub fn get(&self, kind: &str) -> Arc<dyn UpdatePreparer> {
        self.by_kind
            .get(kind)
            .cloned()
            .unwrap_or_else(|| NOOP_PREPARER.clone() as Arc<dyn UpdatePreparer>)
    }

    /// Returns true if the kind has a real hook. Only such kinds are
    /// subject to the ownership wipe.
    pub fn is_registered(&self, kind: &str) -> bool {
        self.by_kind.contains_key(kind)
    }
}

impl std::fmt::Debug for UpdatePreparers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdatePreparers")
            .field("kinds", &self.by_kind.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// StatusStripper replaces the incoming object's `status` with the live
/// object's, the controller-owned-subresource policy for workload kinds.
#[derive(Debug, Clone, Default)]
pub struct StatusStripper;

impl UpdatePreparer for StatusStripper {
    fn prepare(&self, newer: &mut Object, older: &Object) {
        let live_status = older
            .as_value()
            .as_map()
            .and_then(|m| m.get("status"))
            .cloned();

        let mut value = newer.as_value().clone();
        let Some(map) = value.as_map_mut() else {
            return;
        };
        match live_status {
            Some(status) => map.set("status".into(), status),
            None => {
                map.delete("status");
            }
        }
        if let Ok(prepared) = Object::new(value) {
            *newer = prepared;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_json;

    fn object(json: &str) -> Object {
        Object::new(from_json(json).unwrap()).unwrap()
    }

    #[test]
    fn test_unregistered_kind_gets_noop() {
        let preparers = UpdatePreparers::new();
        assert!(!preparers.is_registered("Pod"));

        let mut newer = object(r#"{"status":{"phase":"testing"}}"#);
        let older = object(r#"{}"#);
        preparers.get("Pod").prepare(&mut newer, &older);
        // No-op: the incoming status survives.
        assert!(newer.as_value().as_map().unwrap().has("status"));
    }

    #[test]
    fn test_status_stripper_restores_live_status() {
        let preparers =
            UpdatePreparers::new().register("Pod", Arc::new(StatusStripper));
        assert!(preparers.is_registered("Pod"));

        let mut newer = object(r#"{"spec":{"a":1},"status":{"phase":"testing"}}"#);
        let older = object(r#"{"status":{"phase":"Running"}}"#);
        preparers.get("Pod").prepare(&mut newer, &older);

        let status = newer.as_value().as_map().unwrap().get("status").unwrap();
        assert_eq!(
            status.as_map().unwrap().get("phase"),
            Some(&crate::value::Value::String("Running".into()))
        );
    }

    #[test]
    fn test_status_stripper_drops_status_when_live_has_none() {
        let mut newer = object(r#"{"status":{"phase":"testing"}}"#);
        let older = object(r#"{}"#);
        StatusStripper.prepare(&mut newer, &older);
        assert!(!newer.as_value().as_map().unwrap().has("status"));
    }
}
