//! Resource object wrapper.
//!
//! An [`Object`] is a concrete resource object (a map at the root) plus
//! the metadata accessors the orchestrator needs: API version, kind, the
//! structured ownership list and the deprecated single-string manager
//! attribute.

use crate::error::{Error, Result};
use crate::value::{Map, Value};

/// Object wraps a resource object value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    value: Value,
}

impl Object {
    /// Wraps a value. The root must be a map (or null, for an absent
    /// object).
    pub fn new(value: Value) -> Result<Self> {
        match value {
            Value::Map(_) | Value::Null => Ok(Object { value }),
            _ => Err(Error::validation("object root must be a map")),
        }
    }

    /// An absent object.
    pub fn empty() -> Self {
        Object {
            value: Value::Map(Map::new()),
        }
    }

    /// Returns the underlying value.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Consumes the wrapper and returns the value.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Returns the declared apiVersion, e.g. `"apps/v1"`.
    pub fn api_version(&self) -> Option<&str> {
        self.value.as_map()?.get("apiVersion")?.as_str()
    }

    /// Returns the declared kind, e.g. `"Pod"`.
    pub fn kind(&self) -> Option<&str> {
        self.value.as_map()?.get("kind")?.as_str()
    }

    /// Returns `metadata.name`.
    pub fn name(&self) -> Option<&str> {
        self.metadata()?.get("name")?.as_str()
    }

    fn metadata(&self) -> Option<&Map> {
        self.value.as_map()?.get("metadata")?.as_map()
    }

    fn metadata_mut(&mut self) -> &mut Map {
        let root = match &mut self.value {
            Value::Map(m) => m,
            other => {
                *other = Value::Map(Map::new());
                match other {
                    Value::Map(m) => m,
                    _ => unreachable!(),
                }
            }
        };
        if !matches!(root.get("metadata"), Some(Value::Map(_))) {
            root.set("metadata".into(), Value::Map(Map::new()));
        }
        match root.get_mut("metadata") {
            Some(Value::Map(m)) => m,
            _ => unreachable!(),
        }
    }

    /// Returns the raw structured ownership list, if present.
    pub fn managed_fields(&self) -> Option<&Value> {
        self.metadata()?.get("managedFields")
    }

    /// Returns true if the object carries a non-empty ownership list.
    pub fn has_managed_fields(&self) -> bool {
        match self.managed_fields() {
            Some(Value::List(entries)) => !entries.is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        }
    }

    /// Replaces the structured ownership list. `None` removes it.
    pub fn set_managed_fields(&mut self, entries: Option<Value>) {
        match entries {
            Some(v) => self.metadata_mut().set("managedFields".into(), v),
            None => {
                self.metadata_mut().delete("managedFields");
            }
        }
    }

    /// Returns the deprecated single-string manager attribute.
    pub fn field_manager(&self) -> Option<&str> {
        self.metadata()?.get("fieldManager")?.as_str()
    }

    /// Sets the deprecated single-string manager attribute. An empty
    /// value removes it.
    pub fn set_field_manager(&mut self, manager: &str) {
        if manager.is_empty() {
            self.metadata_mut().delete("fieldManager");
        } else {
            self.metadata_mut()
                .set("fieldManager".into(), Value::String(manager.to_string()));
        }
    }
}
