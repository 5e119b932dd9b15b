//! Consumed capabilities: type conversion, version conversion, defaulting.
//!
//! The orchestrator holds these as trait objects. The crate ships the
//! implementations a schemaless (CRD-style) resource needs; richer
//! deployments substitute their own.

use super::GroupVersion;
use crate::error::{Error, Result};
use crate::object::Object;
use crate::typed::{KeyedLists, TypedValue};
use crate::value::Value;
use std::sync::Arc;

/// Converts a concrete object to and from its typed tree view.
pub trait TypeConverter: Send + Sync {
    fn object_to_typed(&self, obj: &Object) -> Result<TypedValue>;
    fn typed_to_object(&self, tv: &TypedValue) -> Result<Object>;
}

/// Converts an object between its declared API version and the hub
/// version. Field identity must be preserved; renames across versions are
/// not modeled.
pub trait VersionConverter: Send + Sync {
    fn convert_to_version(&self, obj: &Object, gv: &GroupVersion) -> Result<Object>;
}

/// Applies server defaults to an object after an apply merge.
pub trait Defaulter: Send + Sync {
    fn default(&self, obj: &mut Object);
}

/// DeducedTypeConverter types objects from their shape: maps are
/// granular, lists are atomic unless registered as associative. This is
/// the schemaless path used for resources without models.
#[derive(Debug, Clone, Default)]
pub struct DeducedTypeConverter {
    keys: Arc<KeyedLists>,
}

impl DeducedTypeConverter {
    /// A converter that treats every list as atomic.
    pub fn new() -> Self {
        DeducedTypeConverter::default()
    }

    /// A converter with an associative-list key table.
    pub fn with_keys(keys: KeyedLists) -> Self {
        DeducedTypeConverter {
            keys: Arc::new(keys),
        }
    }
}

impl TypeConverter for DeducedTypeConverter {
    fn object_to_typed(&self, obj: &Object) -> Result<TypedValue> {
        Ok(TypedValue::new(
            obj.as_value().clone(),
            Arc::clone(&self.keys),
        ))
    }

    fn typed_to_object(&self, tv: &TypedValue) -> Result<Object> {
        Object::new(tv.as_value().clone())
    }
}

/// IdentityVersionConverter serves resources with a single version: the
/// declared version and the hub version are the same, so conversion only
/// checks that the requested version is the one configured.
#[derive(Debug, Clone)]
pub struct IdentityVersionConverter {
    served: GroupVersion,
}

impl IdentityVersionConverter {
    pub fn new(served: GroupVersion) -> Self {
        IdentityVersionConverter { served }
    }
}

impl VersionConverter for IdentityVersionConverter {
    fn convert_to_version(&self, obj: &Object, gv: &GroupVersion) -> Result<Object> {
        if gv != &self.served {
            return Err(Error::conversion(format!(
                "no conversion to version {} (serving {})",
                gv, self.served
            )));
        }
        Ok(obj.clone())
    }
}

/// NoopDefaulter leaves objects untouched.
#[derive(Debug, Clone, Default)]
pub struct NoopDefaulter;

impl Defaulter for NoopDefaulter {
    fn default(&self, _obj: &mut Object) {}
}

/// StaticDefaulter fills in fixed top-level defaults for missing fields.
/// Enough for tests and single-resource deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticDefaulter {
    defaults: Vec<(String, Value)>,
}

impl StaticDefaulter {
    pub fn new() -> Self {
        // Plain construction: `StaticDefaulter::default()` would be
        // ambiguous with the `Defaulter` trait method in scope here.
        StaticDefaulter {
            defaults: Vec::new(),
        }
    }

    /// Registers a default for a missing top-level field.
    pub fn with_default(mut self, field: impl Into<String>, value: Value) -> Self {
        self.defaults.push((field.into(), value));
        self
    }
}

impl Defaulter for StaticDefaulter {
    fn default(&self, obj: &mut Object) {
        let mut value = obj.as_value().clone();
        let Some(map) = value.as_map_mut() else {
            return;
        };
        for (field, default) in &self.defaults {
            if !map.has(field) {
                map.set(field.clone(), default.clone());
            }
        }
        if let Ok(defaulted) = Object::new(value) {
            *obj = defaulted;
        }
    }
}
