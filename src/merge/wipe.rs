//! Ownership wipe for server-prepared fields.
//!
//! Some kinds carry subresources (typically status) that a per-kind
//! prepare-for-update hook resets before persistence. Without correction,
//! a writer that echoed the live status back, or that raced a controller,
//! would be recorded as owning fields it never substantively set. The
//! wipe removes those entries: of the leaves the acting manager *gained*
//! in this write, only the ones the prepared write actually changes
//! relative to the live object are kept.

use crate::error::Result;
use crate::fieldpath::{ManagedFields, ManagerIdentity, VersionedSet};
use crate::typed::TypedValue;
use tracing::debug;

/// Removes ownership records the acting manager gained for leaves the
/// prepared write does not actually change.
///
/// `live_managed` is the ownership before the write, `new_managed` the
/// ownership computed for it, `prepared` the incoming object after the
/// per-kind prepare hook ran against `live`.
pub fn wipe_managed_fields(
    live_managed: &ManagedFields,
    new_managed: &ManagedFields,
    manager: &ManagerIdentity,
    live: &TypedValue,
    prepared: &TypedValue,
) -> Result<ManagedFields> {
    let Some(current) = new_managed.get(manager) else {
        return Ok(new_managed.clone());
    };

    let previous = live_managed
        .get(manager)
        .map(|vs| vs.set().clone())
        .unwrap_or_default();
    let gained = current.set().difference(&previous);
    if gained.is_empty() {
        return Ok(new_managed.clone());
    }

    // Leaves the prepared write substantively changes. Anything else the
    // manager gained came from server-prepared content, not its own intent.
    let substantive = live.compare(prepared)?.touched();
    let spurious = gained.difference(&substantive);
    if spurious.is_empty() {
        return Ok(new_managed.clone());
    }

    debug!(
        manager = %manager,
        wiped = %spurious.len(),
        "removing ownership of server-prepared fields"
    );

    let mut wiped = new_managed.clone();
    let remaining = current.set().difference(&spurious);
    if remaining.is_empty() {
        wiped.remove(manager);
    } else {
        wiped.insert(
            manager.clone(),
            VersionedSet::new(remaining, current.api_version().clone(), current.applied()),
        );
    }
    Ok(wiped)
}
