//! Crate-wide error taxonomy.
//!
//! Callers need to distinguish three classes of failure: bad requests
//! (invalid manager names, client-supplied ownership metadata, version
//! mismatches), apply conflicts (expected, resolvable by the client), and
//! internal failures (conversion or merge engine errors). Every failure
//! aborts the whole Update/Apply call; no partial ownership or content
//! change is ever applied.

use crate::merge::Conflicts;
use thiserror::Error;

/// Error covers every failure mode surfaced by this crate.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Client-visible bad request. Never retryable as-is.
    #[error("{0}")]
    Validation(String),

    /// Object/version/typed-value translation failure. Internal.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// Field ownership conflicts from a non-forced apply.
    #[error("apply failed with {} conflict(s): {conflicts}", conflicts.len())]
    Conflict { conflicts: Conflicts },

    /// Merge or wipe engine failure. Internal, surfaced verbatim.
    #[error("{0}")]
    Engine(String),
}

impl Error {
    /// Creates a validation (bad request) error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Creates a conversion error.
    pub fn conversion(msg: impl Into<String>) -> Self {
        Error::Conversion(msg.into())
    }

    /// Creates an engine error.
    pub fn engine(msg: impl Into<String>) -> Self {
        Error::Engine(msg.into())
    }

    /// Returns true for client-visible bad-request errors.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Returns true for apply conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Returns the conflict set, if this is a conflict error.
    pub fn conflicts(&self) -> Option<&Conflicts> {
        match self {
            Error::Conflict { conflicts } => Some(conflicts),
            _ => None,
        }
    }
}

impl From<Conflicts> for Error {
    fn from(conflicts: Conflicts) -> Self {
        Error::Conflict { conflicts }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
