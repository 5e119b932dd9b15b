//! Merge module - multi-manager update/apply operations.
//!
//! The engine recomputes per-manager field ownership for full-replacement
//! updates, performs ownership-aware three-way merges for applies, and
//! surfaces conflicts between managers.

mod conflict;
mod updater;
mod wipe;

pub use conflict::*;
pub use updater::*;
pub use wipe::*;
