//! The structured merge orchestrator.
//!
//! Sequences, for one write request: version conversion, typed-value
//! conversion, merge engine invocation, the per-kind ownership wipe,
//! reverse conversion and defaulting. Pure and reentrant: every call
//! reads only its arguments and the capabilities it holds.

use super::{
    Defaulter, GroupVersion, Managed, TypeConverter, UpdatePreparers, VersionConverter,
};
use crate::error::{Error, Result};
use crate::fieldpath::{ManagedFields, ManagerIdentity, Operation};
use crate::merge::{wipe_managed_fields, Updater};
use crate::object::Object;
use crate::typed::TypedValue;
use std::sync::Arc;
use tracing::debug;

/// StructuredMergeManager merges apply requests and recomputes ownership
/// records for every other kind of write.
pub struct StructuredMergeManager {
    type_converter: Arc<dyn TypeConverter>,
    version_converter: Arc<dyn VersionConverter>,
    defaulter: Arc<dyn Defaulter>,
    preparers: UpdatePreparers,
    group_version: GroupVersion,
    hub_version: GroupVersion,
    updater: Updater,
}

impl StructuredMergeManager {
    /// Creates a manager for one resource, serving `group_version` and
    /// keeping ownership bookkeeping in `hub_version`.
    pub fn new(
        type_converter: Arc<dyn TypeConverter>,
        version_converter: Arc<dyn VersionConverter>,
        defaulter: Arc<dyn Defaulter>,
        preparers: UpdatePreparers,
        group_version: GroupVersion,
        hub_version: GroupVersion,
    ) -> Self {
        StructuredMergeManager {
            type_converter,
            version_converter,
            defaulter,
            preparers,
            group_version,
            hub_version,
            updater: Updater::new(),
        }
    }

    /// Handles a full-replacement write. Returns the caller's object
    /// verbatim together with the recomputed ownership snapshot; content
    /// is never altered by an update.
    pub fn update(
        &self,
        live_obj: &Object,
        new_obj: &Object,
        managed: &Managed,
        manager: &str,
    ) -> Result<(Object, Managed)> {
        let new_versioned = self.to_versioned(new_obj).map_err(|e| {
            Error::conversion(format!("failed to convert new object to proper version: {}", e))
        })?;
        let live_versioned = self.to_versioned(live_obj).map_err(|e| {
            Error::conversion(format!("failed to convert live object to proper version: {}", e))
        })?;

        let new_typed = self
            .type_converter
            .object_to_typed(&new_versioned)
            .map_err(|e| Error::conversion(format!("failed to convert new object to typed: {}", e)))?;
        let live_typed = self
            .type_converter
            .object_to_typed(&live_versioned)
            .map_err(|e| {
                Error::conversion(format!("failed to convert live object to typed: {}", e))
            })?;

        let identity = ManagerIdentity::new(manager, Operation::Update);
        let api_version = self.group_version.api_version();

        let mut fields = managed.fields().clone();
        self.updater
            .update(&live_typed, &new_typed, &api_version, &mut fields, &identity)
            .map_err(|e| Error::engine(format!("failed to update managed fields: {}", e)))?;

        let fields = self.maybe_wipe(
            new_obj.kind(),
            live_obj,
            new_obj,
            managed,
            fields,
            &identity,
            &live_typed,
        )?;

        // Timestamps are carried over untouched by updates.
        Ok((
            new_obj.clone(),
            Managed::new(fields, managed.times().clone()),
        ))
    }

    /// Handles a partial declarative write. Returns the merged,
    /// defaulted object in the hub version, or no object if the apply
    /// removed all declared content.
    pub fn apply(
        &self,
        live_obj: &Object,
        patch_obj: &Object,
        managed: &Managed,
        manager: &str,
        force: bool,
    ) -> Result<(Option<Object>, Managed)> {
        let patch_version = patch_obj.api_version().unwrap_or("");
        if patch_version != self.group_version.to_string() {
            return Err(Error::validation(format!(
                "incorrect version specified in apply patch. Specified patch version: {}, expected: {}",
                patch_version, self.group_version
            )));
        }
        if patch_obj.has_managed_fields() {
            return Err(Error::validation("metadata.managedFields must be nil"));
        }

        let live_versioned = self.to_versioned(live_obj).map_err(|e| {
            Error::conversion(format!("failed to convert live object to proper version: {}", e))
        })?;

        let patch_typed = self
            .type_converter
            .object_to_typed(patch_obj)
            .map_err(|e| Error::conversion(format!("failed to create typed patch object: {}", e)))?;
        let live_typed = self
            .type_converter
            .object_to_typed(&live_versioned)
            .map_err(|e| Error::conversion(format!("failed to create typed live object: {}", e)))?;

        let identity = ManagerIdentity::new(manager, Operation::Apply);
        let api_version = self.group_version.api_version();

        let mut fields = managed.fields().clone();
        let merged = self.updater.apply(
            &live_typed,
            &patch_typed,
            &api_version,
            &mut fields,
            &identity,
            force,
        )?;

        let fields = self.maybe_wipe(
            patch_obj.kind(),
            live_obj,
            patch_obj,
            managed,
            fields,
            &identity,
            &live_typed,
        )?;

        let managed = Managed::new(fields, managed.times().clone());

        let Some(merged) = merged else {
            return Ok((None, managed));
        };

        let new_obj = self
            .type_converter
            .typed_to_object(&merged)
            .map_err(|e| Error::conversion(format!("failed to convert merged object: {}", e)))?;
        let mut new_versioned = self.to_versioned(&new_obj).map_err(|e| {
            Error::conversion(format!("failed to convert new object to proper version: {}", e))
        })?;
        self.defaulter.default(&mut new_versioned);
        let new_unversioned = self.to_unversioned(&new_versioned).map_err(|e| {
            Error::conversion(format!("failed to convert to unversioned: {}", e))
        })?;

        Ok((Some(new_unversioned), managed))
    }

    fn to_versioned(&self, obj: &Object) -> Result<Object> {
        self.version_converter
            .convert_to_version(obj, &self.group_version)
    }

    fn to_unversioned(&self, obj: &Object) -> Result<Object> {
        self.version_converter
            .convert_to_version(obj, &self.hub_version)
    }

    /// Applies the ownership wipe for kinds with a registered prepare
    /// hook; everything else passes through unchanged.
    #[allow(clippy::too_many_arguments)]
    fn maybe_wipe(
        &self,
        kind: Option<&str>,
        live_obj: &Object,
        incoming_obj: &Object,
        managed: &Managed,
        fields: ManagedFields,
        identity: &ManagerIdentity,
        live_typed: &TypedValue,
    ) -> Result<ManagedFields> {
        let Some(kind) = kind else {
            return Ok(fields);
        };
        if !self.preparers.is_registered(kind) {
            return Ok(fields);
        }

        let prepared_typed = self.prepared_typed(kind, live_obj, incoming_obj).map_err(|e| {
            Error::engine(format!("failed to prepare incoming object for wipe: {}", e))
        })?;

        debug!(kind, manager = %identity, before = %fields.len(), "wiping managed fields");
        let wiped = wipe_managed_fields(
            managed.fields(),
            &fields,
            identity,
            live_typed,
            &prepared_typed,
        )
        .map_err(|e| Error::engine(format!("failed to wipe managed fields: {}", e)))?;
        debug!(kind, after = %wiped.len(), "wiped managed fields");

        Ok(wiped)
    }

    /// Runs the kind's prepare hook against the live object and types the
    /// result, all in the hub version.
    fn prepared_typed(
        &self,
        kind: &str,
        live_obj: &Object,
        incoming_obj: &Object,
    ) -> Result<TypedValue> {
        let live_unversioned = self.to_unversioned(live_obj)?;
        let mut incoming_unversioned = self.to_unversioned(incoming_obj)?;

        self.preparers
            .get(kind)
            .prepare(&mut incoming_unversioned, &live_unversioned);

        let prepared_versioned = self.to_versioned(&incoming_unversioned)?;
        self.type_converter.object_to_typed(&prepared_versioned)
    }
}
