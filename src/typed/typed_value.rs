//! TypedValue: a value plus the list-key metadata needed to walk it.

use crate::error::{Error, Result};
use crate::fieldpath::{Path, PathElement, Set};
use crate::typed::Comparison;
use crate::value::{Field, FieldList, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// KeyedLists records which list fields are associative and which fields
/// of their elements form the discriminating key. Lists not registered
/// here are treated as atomic leaves.
#[derive(Debug, Clone, Default)]
pub struct KeyedLists {
    keys: BTreeMap<String, Vec<String>>,
}

impl KeyedLists {
    /// Creates an empty table: every list is atomic.
    pub fn new() -> Self {
        KeyedLists::default()
    }

    /// Registers `field` as an associative list keyed by `key_fields`.
    pub fn with_keys(mut self, field: impl Into<String>, key_fields: &[&str]) -> Self {
        self.keys
            .insert(field.into(), key_fields.iter().map(|s| s.to_string()).collect());
        self
    }

    fn key_fields(&self, field: &str) -> Option<&[String]> {
        self.keys.get(field).map(|v| v.as_slice())
    }
}

/// TypedValue is a schema-aware view of one object, produced through a
/// type converter. Created per call and discarded after use.
#[derive(Debug, Clone)]
pub struct TypedValue {
    value: Value,
    keys: Arc<KeyedLists>,
}

impl TypedValue {
    /// Creates a typed view over a value.
    pub fn new(value: Value, keys: Arc<KeyedLists>) -> Self {
        TypedValue { value, keys }
    }

    /// Creates a typed view with no associative lists.
    pub fn deduced(value: Value) -> Self {
        TypedValue {
            value,
            keys: Arc::new(KeyedLists::new()),
        }
    }

    /// Returns the underlying value.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Consumes the view and returns the value.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Returns the set of leaf fields present in this value.
    pub fn to_field_set(&self) -> Result<Set> {
        match &self.value {
            Value::Map(map) => Ok(field_set_of_map(map, &self.keys)),
            Value::Null => Ok(Set::new()),
            _ => Err(Error::validation("object root must be a map")),
        }
    }

    /// Compares two typed values, producing leaf-granular added,
    /// modified and removed sets.
    pub fn compare(&self, other: &TypedValue) -> Result<Comparison> {
        let (left, right) = match (&self.value, &other.value) {
            (Value::Map(a), Value::Map(b)) => (a, b),
            _ => return Err(Error::validation("object root must be a map")),
        };
        let mut cmp = Comparison::new();
        compare_maps(left, right, &self.keys, &mut Path::new(), &mut cmp);
        Ok(cmp)
    }

    /// Merges a patch into this value. Maps merge field-wise, associative
    /// lists merge by key, everything else takes the patch's value. An
    /// explicit null in the patch deletes the field.
    pub fn merge(&self, patch: &TypedValue) -> Result<TypedValue> {
        match (&self.value, &patch.value) {
            (Value::Map(_), Value::Map(_)) | (Value::Null, Value::Map(_)) => {
                let merged = merge_values(&self.value, &patch.value, None, &self.keys);
                Ok(TypedValue::new(merged, Arc::clone(&self.keys)))
            }
            _ => Err(Error::validation("object root must be a map")),
        }
    }

    /// Removes the leaves named by `set`, returning the pruned value.
    pub fn remove_items(&self, set: &Set) -> TypedValue {
        let mut value = self.value.clone();
        if let Value::Map(map) = &mut value {
            remove_from_map(map, set, &self.keys);
        }
        TypedValue::new(value, Arc::clone(&self.keys))
    }

    /// Returns true if the value holds no content.
    pub fn is_deleted(&self) -> bool {
        match &self.value {
            Value::Null => true,
            Value::Map(m) => m.is_empty(),
            _ => false,
        }
    }
}

fn key_of_element(element: &Value, key_fields: &[String]) -> Option<PathElement> {
    let map = element.as_map()?;
    let mut fields = Vec::new();
    for key_field in key_fields {
        fields.push(Field {
            name: key_field.clone(),
            value: map.get(key_field)?.clone(),
        });
    }
    Some(PathElement::Key(FieldList::with_fields(fields)))
}

fn field_set_of_map(map: &Map, keys: &KeyedLists) -> Set {
    let mut set = Set::new();
    for (name, value) in map.iter() {
        let element = PathElement::field_name(name.clone());
        match value {
            Value::Map(child) if !child.is_empty() => {
                set.insert_child(element, field_set_of_map(child, keys));
            }
            Value::List(items) => match keys.key_fields(name) {
                Some(key_fields) => {
                    let mut child = Set::new();
                    for item in items {
                        let Some(key) = key_of_element(item, key_fields) else {
                            continue;
                        };
                        // The element itself is owned, plus its leaves.
                        child.insert_member(key.clone());
                        if let Some(item_map) = item.as_map() {
                            let grand = field_set_of_map(item_map, keys);
                            if !grand.is_empty() {
                                child.insert_child(key, grand);
                            }
                        }
                    }
                    if child.is_empty() {
                        set.insert_member(element);
                    } else {
                        set.insert_child(element, child);
                    }
                }
                None => set.insert_member(element),
            },
            _ => set.insert_member(element),
        }
    }
    set
}

/// Grafts every path of `sub` under `prefix` into `target`.
fn graft(target: &mut Set, prefix: &Path, sub: &Set) {
    sub.iterate(|path| {
        let mut full = prefix.clone();
        for element in path {
            full.push(element.clone());
        }
        target.insert(&full);
    });
}

fn leaf_set_at(target: &mut Set, prefix: &Path, value: &Value, keys: &KeyedLists) {
    match value {
        Value::Map(map) if !map.is_empty() => {
            let sub = field_set_of_map(map, keys);
            graft(target, prefix, &sub);
        }
        _ => target.insert(prefix),
    }
}

fn compare_maps(left: &Map, right: &Map, keys: &KeyedLists, path: &mut Path, cmp: &mut Comparison) {
    for (name, left_value) in left.iter() {
        path.push(PathElement::field_name(name.clone()));
        match right.get(name) {
            None => leaf_set_at(&mut cmp.removed, path, left_value, keys),
            Some(right_value) => compare_values(left_value, right_value, name, keys, path, cmp),
        }
        path.pop();
    }
    for (name, right_value) in right.iter() {
        if left.has(name) {
            continue;
        }
        path.push(PathElement::field_name(name.clone()));
        leaf_set_at(&mut cmp.added, path, right_value, keys);
        path.pop();
    }
}

fn compare_values(
    left: &Value,
    right: &Value,
    field: &str,
    keys: &KeyedLists,
    path: &mut Path,
    cmp: &mut Comparison,
) {
    match (left, right) {
        (Value::Map(a), Value::Map(b)) => compare_maps(a, b, keys, path, cmp),
        (Value::List(a), Value::List(b)) => match keys.key_fields(field) {
            Some(key_fields) => compare_keyed_lists(a, b, key_fields, keys, path, cmp),
            None => {
                if a != b {
                    cmp.modified.insert(path);
                }
            }
        },
        _ => {
            if left != right {
                cmp.modified.insert(path);
            }
        }
    }
}

fn compare_keyed_lists(
    left: &[Value],
    right: &[Value],
    key_fields: &[String],
    keys: &KeyedLists,
    path: &mut Path,
    cmp: &mut Comparison,
) {
    let left_by_key: BTreeMap<_, _> = left
        .iter()
        .filter_map(|item| key_of_element(item, key_fields).map(|k| (k, item)))
        .collect();
    let right_by_key: BTreeMap<_, _> = right
        .iter()
        .filter_map(|item| key_of_element(item, key_fields).map(|k| (k, item)))
        .collect();

    for (key, left_item) in &left_by_key {
        path.push(key.clone());
        match right_by_key.get(key) {
            None => {
                cmp.removed.insert(path);
                leaf_set_at(&mut cmp.removed, path, left_item, keys);
            }
            Some(right_item) => {
                if let (Value::Map(a), Value::Map(b)) = (left_item, right_item) {
                    compare_maps(a, b, keys, path, cmp);
                } else if left_item != right_item {
                    cmp.modified.insert(path);
                }
            }
        }
        path.pop();
    }
    for (key, right_item) in &right_by_key {
        if left_by_key.contains_key(key) {
            continue;
        }
        path.push(key.clone());
        cmp.added.insert(path);
        leaf_set_at(&mut cmp.added, path, right_item, keys);
        path.pop();
    }
}

fn merge_values(live: &Value, patch: &Value, field: Option<&str>, keys: &KeyedLists) -> Value {
    match (live, patch) {
        (Value::Map(a), Value::Map(b)) => {
            let mut out = a.clone();
            for (name, patch_value) in b.iter() {
                if patch_value.is_null() {
                    out.delete(name);
                    continue;
                }
                let merged = match a.get(name) {
                    Some(live_value) => merge_values(live_value, patch_value, Some(name), keys),
                    None => patch_value.clone(),
                };
                out.set(name.clone(), merged);
            }
            Value::Map(out)
        }
        (Value::List(a), Value::List(b)) => {
            let key_fields = match field.and_then(|f| keys.key_fields(f)) {
                Some(kf) => kf,
                None => return patch.clone(),
            };
            let mut patch_by_key: BTreeMap<_, _> = b
                .iter()
                .filter_map(|item| key_of_element(item, key_fields).map(|k| (k, item)))
                .collect();

            let mut out = Vec::with_capacity(a.len() + b.len());
            for live_item in a {
                match key_of_element(live_item, key_fields)
                    .and_then(|k| patch_by_key.remove(&k))
                {
                    Some(patch_item) => {
                        out.push(merge_values(live_item, patch_item, None, keys));
                    }
                    None => out.push(live_item.clone()),
                }
            }
            // Patch-only elements keep the patch's declared order.
            for item in b {
                if let Some(key) = key_of_element(item, key_fields) {
                    if patch_by_key.contains_key(&key) {
                        out.push(item.clone());
                    }
                }
            }
            Value::List(out)
        }
        (_, patch) => patch.clone(),
    }
}

fn remove_from_map(map: &mut Map, set: &Set, keys: &KeyedLists) {
    let member_names: Vec<String> = set
        .members()
        .filter_map(|e| e.as_field_name().map(|s| s.to_string()))
        .collect();
    for name in member_names {
        map.delete(&name);
    }

    let children: Vec<(PathElement, Set)> = set
        .children()
        .map(|(e, s)| (e.clone(), s.clone()))
        .collect();
    for (element, child_set) in children {
        let Some(name) = element.as_field_name() else {
            continue;
        };
        let emptied = match map.get_mut(name) {
            Some(Value::Map(child_map)) => {
                remove_from_map(child_map, &child_set, keys);
                child_map.is_empty()
            }
            Some(Value::List(items)) => {
                if let Some(key_fields) = keys.key_fields(name).map(|k| k.to_vec()) {
                    remove_from_keyed_list(items, &child_set, &key_fields, keys);
                }
                items.is_empty()
            }
            _ => false,
        };
        // Pruning a relinquished subtree leaves no empty shell behind.
        if emptied {
            map.delete(name);
        }
    }
}

fn remove_from_keyed_list(
    items: &mut Vec<Value>,
    set: &Set,
    key_fields: &[String],
    keys: &KeyedLists,
) {
    items.retain(|item| match key_of_element(item, key_fields) {
        Some(key) => !set.members().any(|m| *m == key),
        None => true,
    });
    for item in items.iter_mut() {
        let Some(key) = key_of_element(item, key_fields) else {
            continue;
        };
        if let Some((_, child_set)) = set.children().find(|(e, _)| **e == key) {
            if let Some(item_map) = item.as_map_mut() {
                let child = child_set.clone();
                remove_from_map(item_map, &child, keys);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_json;
    use pretty_assertions::assert_eq;

    fn pod_keys() -> Arc<KeyedLists> {
        Arc::new(KeyedLists::new().with_keys("containers", &["name"]))
    }

    fn typed(json: &str, keys: &Arc<KeyedLists>) -> TypedValue {
        TypedValue::new(from_json(json).unwrap(), Arc::clone(keys))
    }

    #[test]
    fn test_field_set_extraction() {
        let keys = pod_keys();
        let tv = typed(
            r#"{"spec":{"replicas":3,"containers":[{"name":"web","image":"x"}]}}"#,
            &keys,
        );
        let set = tv.to_field_set().unwrap();

        assert!(set.has(&Path::fields(&["spec", "replicas"])));

        let key = PathElement::key(FieldList::with_fields(vec![Field {
            name: "name".into(),
            value: Value::String("web".into()),
        }]));
        // The container element itself and its leaves are both present.
        assert!(set.has(&Path::from_elements(vec![
            PathElement::field_name("spec"),
            PathElement::field_name("containers"),
            key.clone(),
        ])));
        assert!(set.has(&Path::from_elements(vec![
            PathElement::field_name("spec"),
            PathElement::field_name("containers"),
            key,
            PathElement::field_name("image"),
        ])));
    }

    #[test]
    fn test_compare_leaf_buckets() {
        let keys = pod_keys();
        let live = typed(r#"{"spec":{"a":1,"b":2},"status":{"phase":"Running"}}"#, &keys);
        let new = typed(r#"{"spec":{"a":1,"b":3,"c":4}}"#, &keys);

        let cmp = live.compare(&new).unwrap();
        assert!(cmp.modified.has(&Path::fields(&["spec", "b"])));
        assert!(cmp.added.has(&Path::fields(&["spec", "c"])));
        assert!(cmp.removed.has(&Path::fields(&["status", "phase"])));
        assert!(!cmp.modified.has(&Path::fields(&["spec", "a"])));
    }

    #[test]
    fn test_compare_equal_is_same() {
        let keys = pod_keys();
        let a = typed(r#"{"spec":{"containers":[{"name":"web","image":"x"}]}}"#, &keys);
        let b = typed(r#"{"spec":{"containers":[{"name":"web","image":"x"}]}}"#, &keys);
        assert!(a.compare(&b).unwrap().is_same());
    }

    #[test]
    fn test_merge_maps_and_keyed_lists() {
        let keys = pod_keys();
        let live = typed(
            r#"{"spec":{"replicas":1,"containers":[{"name":"web","image":"old","port":80}]}}"#,
            &keys,
        );
        let patch = typed(
            r#"{"spec":{"containers":[{"name":"web","image":"new"},{"name":"sidecar","image":"s"}]}}"#,
            &keys,
        );

        let merged = live.merge(&patch).unwrap();
        let spec = merged.as_value().as_map().unwrap().get("spec").unwrap();
        let spec_map = spec.as_map().unwrap();

        // Unpatched fields survive.
        assert_eq!(spec_map.get("replicas"), Some(&Value::Int(1)));

        let containers = spec_map.get("containers").unwrap().as_list().unwrap();
        assert_eq!(containers.len(), 2);
        let web = containers[0].as_map().unwrap();
        assert_eq!(web.get("image"), Some(&Value::String("new".into())));
        assert_eq!(web.get("port"), Some(&Value::Int(80)));
        let sidecar = containers[1].as_map().unwrap();
        assert_eq!(sidecar.get("name"), Some(&Value::String("sidecar".into())));
    }

    #[test]
    fn test_merge_null_deletes() {
        let keys = pod_keys();
        let live = typed(r#"{"spec":{"a":1,"b":2}}"#, &keys);
        let patch = typed(r#"{"spec":{"a":null}}"#, &keys);

        let merged = live.merge(&patch).unwrap();
        let spec = merged.as_value().as_map().unwrap().get("spec").unwrap();
        assert!(!spec.as_map().unwrap().has("a"));
        assert!(spec.as_map().unwrap().has("b"));
    }

    #[test]
    fn test_remove_items() {
        let keys = pod_keys();
        let tv = typed(
            r#"{"spec":{"replicas":3,"containers":[{"name":"web","image":"x"},{"name":"db","image":"y"}]}}"#,
            &keys,
        );

        let mut set = Set::new();
        set.insert(&Path::fields(&["spec", "replicas"]));
        set.insert(&Path::from_elements(vec![
            PathElement::field_name("spec"),
            PathElement::field_name("containers"),
            PathElement::key(FieldList::with_fields(vec![Field {
                name: "name".into(),
                value: Value::String("db".into()),
            }])),
        ]));

        let pruned = tv.remove_items(&set);
        let spec = pruned.as_value().as_map().unwrap().get("spec").unwrap();
        let spec_map = spec.as_map().unwrap();
        assert!(!spec_map.has("replicas"));
        let containers = spec_map.get("containers").unwrap().as_list().unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(
            containers[0].as_map().unwrap().get("name"),
            Some(&Value::String("web".into()))
        );
    }

    #[test]
    fn test_atomic_list_replaced_wholesale() {
        let keys = Arc::new(KeyedLists::new());
        let live = typed(r#"{"spec":{"args":["a","b"]}}"#, &keys);
        let patch = typed(r#"{"spec":{"args":["c"]}}"#, &keys);

        let merged = live.merge(&patch).unwrap();
        let args = merged
            .as_value()
            .as_map()
            .unwrap()
            .get("spec")
            .unwrap()
            .as_map()
            .unwrap()
            .get("args")
            .unwrap();
        assert_eq!(args, &Value::List(vec![Value::String("c".into())]));

        let cmp = live.compare(&patch).unwrap();
        assert!(cmp.modified.has(&Path::fields(&["spec", "args"])));
    }
}
