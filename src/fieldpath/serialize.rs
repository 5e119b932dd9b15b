//! Wire encoding of field sets.
//!
//! Persisted ownership records encode a [`Set`] as a JSON object tree.
//! Every path element becomes a prefixed key (`f:` field name, `k:` list
//! key, `v:` set value, `i:` index); a `.` entry marks that the element
//! itself is owned, not just fields below it:
//!
//! ```json
//! {"f:spec":{"f:containers":{"k:{\"name\":\"web\"}":{".":{},"f:image":{}}}}}
//! ```

use super::path::PathElement;
use super::set::Set;
use crate::value::{Field, FieldList, Value};
use serde_json::{Map as JsonMap, Value as JsonValue};
use thiserror::Error;

/// Marker key for "this element itself is owned".
const SELF_KEY: &str = ".";

/// Error decoding or encoding a wire field set.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SerializeError(String);

impl SerializeError {
    fn new(msg: impl Into<String>) -> Self {
        SerializeError(msg.into())
    }
}

/// Encodes a path element as a wire key.
pub fn serialize_path_element(pe: &PathElement) -> Result<String, SerializeError> {
    match pe {
        PathElement::FieldName(name) => Ok(format!("f:{}", name)),
        PathElement::Key(fields) => {
            let mut obj = JsonMap::new();
            for field in fields.iter() {
                obj.insert(field.name.clone(), field.value.to_serde());
            }
            let json = serde_json::to_string(&JsonValue::Object(obj))
                .map_err(|e| SerializeError::new(format!("bad key element: {}", e)))?;
            Ok(format!("k:{}", json))
        }
        PathElement::Value(v) => {
            let json = serde_json::to_string(&v.to_serde())
                .map_err(|e| SerializeError::new(format!("bad value element: {}", e)))?;
            Ok(format!("v:{}", json))
        }
        PathElement::Index(i) => Ok(format!("i:{}", i)),
    }
}

/// Decodes a wire key back into a path element.
///
/// Persisted data is external input: any key without a known prefix,
/// including multibyte garbage, is a decode error, never a panic.
pub fn deserialize_path_element(s: &str) -> Result<PathElement, SerializeError> {
    if let Some(name) = s.strip_prefix("f:") {
        return Ok(PathElement::FieldName(name.to_string()));
    }
    if let Some(content) = s.strip_prefix("k:") {
        let json: JsonValue = serde_json::from_str(content)
            .map_err(|e| SerializeError::new(format!("bad key element: {}", e)))?;
        let obj = json
            .as_object()
            .ok_or_else(|| SerializeError::new("key element must be an object"))?;
        let fields = obj
            .iter()
            .map(|(name, v)| Field {
                name: name.clone(),
                value: Value::from_serde(v),
            })
            .collect();
        return Ok(PathElement::Key(FieldList::with_fields(fields)));
    }
    if let Some(content) = s.strip_prefix("v:") {
        let json: JsonValue = serde_json::from_str(content)
            .map_err(|e| SerializeError::new(format!("bad value element: {}", e)))?;
        return Ok(PathElement::Value(Value::from_serde(&json)));
    }
    if let Some(content) = s.strip_prefix("i:") {
        return content
            .parse::<i32>()
            .map(PathElement::Index)
            .map_err(|e| SerializeError::new(format!("bad index element: {}", e)));
    }
    Err(SerializeError::new(format!(
        "unknown path element prefix: {:?}",
        s
    )))
}

/// Encodes a set into its wire JSON form.
pub fn set_to_json(set: &Set) -> Result<JsonValue, SerializeError> {
    let mut obj = JsonMap::new();

    for member in set.members() {
        let key = serialize_path_element(member)?;
        obj.insert(key, JsonValue::Object(JsonMap::new()));
    }
    for (element, child) in set.children() {
        let key = serialize_path_element(element)?;
        let mut child_json = match set_to_json(child)? {
            JsonValue::Object(m) => m,
            _ => unreachable!(),
        };
        // Element owned both as a whole and through descendants.
        if let Some(JsonValue::Object(existing)) = obj.remove(&key) {
            if existing.is_empty() {
                child_json.insert(SELF_KEY.to_string(), JsonValue::Object(JsonMap::new()));
            }
        }
        obj.insert(key, JsonValue::Object(child_json));
    }

    Ok(JsonValue::Object(obj))
}

/// Decodes a set from its wire JSON form.
pub fn set_from_json(json: &JsonValue) -> Result<Set, SerializeError> {
    let obj = json
        .as_object()
        .ok_or_else(|| SerializeError::new("field set must be a JSON object"))?;

    let mut set = Set::new();
    for (key, value) in obj {
        if key == SELF_KEY {
            continue;
        }
        let element = deserialize_path_element(key)?;
        let child_obj = value
            .as_object()
            .ok_or_else(|| SerializeError::new("field set entries must be objects"))?;

        if child_obj.is_empty() {
            set.insert_member(element);
            continue;
        }
        if child_obj.contains_key(SELF_KEY) {
            set.insert_member(element.clone());
        }
        let child = set_from_json(value)?;
        if !child.is_empty() {
            set.insert_child(element, child);
        }
    }
    Ok(set)
}
