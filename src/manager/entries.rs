//! Persisted wire form of ownership records.
//!
//! Ownership is stored on the object as a list of per-manager entries:
//! manager name, operation kind, API version, the encoded field set and
//! the last-write time. One entry per identity; list order carries no
//! meaning, but entries are emitted sorted for stable output.

use super::Managed;
use crate::error::{Error, Result};
use crate::fieldpath::{
    set_from_json, set_to_json, APIVersion, ManagedFields, ManagerIdentity, Operation,
    VersionedSet,
};
use crate::object::Object;
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ManagedFieldsEntry is one persisted ownership record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedFieldsEntry {
    pub manager: String,
    pub operation: Operation,
    pub api_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(rename = "fieldsV1", skip_serializing_if = "Option::is_none")]
    pub fields_v1: Option<serde_json::Value>,
}

/// Encodes a snapshot into wire entries, sorted by identity.
pub fn encode_managed(managed: &Managed) -> Result<Vec<ManagedFieldsEntry>> {
    let mut entries = Vec::with_capacity(managed.fields().len());
    for (identity, vs) in managed.fields().iter() {
        let fields_v1 = set_to_json(vs.set())
            .map_err(|e| Error::conversion(format!("failed to encode field set: {}", e)))?;
        entries.push(ManagedFieldsEntry {
            manager: identity.name().to_string(),
            operation: identity.operation(),
            api_version: vs.api_version().to_string(),
            time: managed.times().get(identity).copied(),
            fields_v1: Some(fields_v1),
        });
    }
    Ok(entries)
}

/// Decodes wire entries into a snapshot. Later duplicates of an identity
/// replace earlier ones.
pub fn decode_managed(entries: &[ManagedFieldsEntry]) -> Result<Managed> {
    let mut fields = ManagedFields::new();
    let mut times: BTreeMap<ManagerIdentity, DateTime<Utc>> = BTreeMap::new();

    for entry in entries {
        let identity = ManagerIdentity::new(&entry.manager, entry.operation);
        let set = match &entry.fields_v1 {
            Some(json) => set_from_json(json)
                .map_err(|e| Error::conversion(format!("failed to decode field set: {}", e)))?,
            None => Default::default(),
        };
        fields.insert(
            identity.clone(),
            VersionedSet::new(
                set,
                APIVersion::new(&entry.api_version),
                entry.operation == Operation::Apply,
            ),
        );
        if let Some(time) = entry.time {
            times.insert(identity, time);
        }
    }
    Ok(Managed::new(fields, times))
}

/// Reads the snapshot persisted on an object. A missing or null list is
/// an empty snapshot.
pub fn managed_from_object(obj: &Object) -> Result<Managed> {
    let Some(raw) = obj.managed_fields() else {
        return Ok(Managed::empty());
    };
    if raw.is_null() {
        return Ok(Managed::empty());
    }
    let entries: Vec<ManagedFieldsEntry> = serde_json::from_value(raw.to_serde())
        .map_err(|e| Error::conversion(format!("failed to decode managedFields: {}", e)))?;
    decode_managed(&entries)
}

/// Writes the snapshot onto an object's metadata, replacing what was
/// there.
pub fn managed_to_object(managed: &Managed, obj: &mut Object) -> Result<()> {
    let entries = encode_managed(managed)?;
    if entries.is_empty() {
        obj.set_managed_fields(None);
        return Ok(());
    }
    let json = serde_json::to_value(&entries)
        .map_err(|e| Error::conversion(format!("failed to encode managedFields: {}", e)))?;
    obj.set_managed_fields(Some(Value::from_serde(&json)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fieldpath::{Path, Set};
    use crate::value::from_json;
    use pretty_assertions::assert_eq;

    fn sample_managed() -> Managed {
        let identity = ManagerIdentity::new("kubectl", Operation::Apply);
        let mut fields = ManagedFields::new();
        fields.insert(
            identity.clone(),
            VersionedSet::new(
                Set::from_paths(vec![Path::fields(&["spec", "replicas"])]),
                APIVersion::new("apps/v1"),
                true,
            ),
        );
        let mut times = BTreeMap::new();
        times.insert(identity, Utc::now());
        Managed::new(fields, times)
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let managed = sample_managed();
        let entries = encode_managed(&managed).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].manager, "kubectl");
        assert_eq!(entries[0].operation, Operation::Apply);
        assert_eq!(entries[0].api_version, "apps/v1");

        let decoded = decode_managed(&entries).unwrap();
        assert_eq!(decoded.fields(), managed.fields());
        assert_eq!(decoded.times().len(), 1);
    }

    #[test]
    fn test_wire_field_names() {
        let entries = encode_managed(&sample_managed()).unwrap();
        let json = serde_json::to_value(&entries).unwrap();
        let entry = &json.as_array().unwrap()[0];
        assert!(entry.get("apiVersion").is_some());
        assert!(entry.get("fieldsV1").is_some());
        assert_eq!(entry.get("operation").unwrap(), "Apply");
    }

    #[test]
    fn test_object_roundtrip() {
        let managed = sample_managed();
        let mut obj = Object::new(from_json(r#"{"kind":"Deployment"}"#).unwrap()).unwrap();

        managed_to_object(&managed, &mut obj).unwrap();
        assert!(obj.has_managed_fields());

        let read_back = managed_from_object(&obj).unwrap();
        assert_eq!(read_back.fields(), managed.fields());
    }

    #[test]
    fn test_missing_list_is_empty_snapshot() {
        let obj = Object::empty();
        let managed = managed_from_object(&obj).unwrap();
        assert!(managed.fields().is_empty());
    }

    #[test]
    fn test_empty_snapshot_clears_list() {
        let mut obj = Object::empty();
        managed_to_object(&sample_managed(), &mut obj).unwrap();
        managed_to_object(&Managed::empty(), &mut obj).unwrap();
        assert!(!obj.has_managed_fields());
    }
}
