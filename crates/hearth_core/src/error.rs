//! # Object Core Error Types
//!
//! Everything that can go wrong while maintaining an object's state.
//!
//! [`GobError::Loading`] is not a failure: it is the deferred-value signal
//! and callers at a tick boundary swallow it. Every other variant is a
//! consistency violation or a defect and is surfaced to the caller.

use hearth_shared::{ObjectId, ResRef};
use thiserror::Error;

use crate::deferred::Loading;

/// Errors raised by object-state operations.
#[derive(Error, Debug, Clone)]
pub enum GobError {
    /// Required data is not available yet; retry later.
    #[error(transparent)]
    Loading(#[from] Loading),

    /// Two distinct resources claimed the same resource-backed attribute family.
    #[error("conflicting resource ids for {family}: {current} -> {incoming}")]
    ConflictingResource {
        /// Family both resources derive.
        family: &'static str,
        /// Resource already bound to the family.
        current: ResRef,
        /// Resource that tried to bind.
        incoming: ResRef,
    },

    /// A node was added twice under the same slot.
    #[error("node already attached to slot {0}")]
    SlotAlreadyAttached(u64),

    /// A node was removed from a slot it was never added to.
    #[error("node not attached to slot {0}")]
    SlotNotAttached(u64),

    /// A resource does not publish the factory kind that was asked for.
    #[error("resource {resource} has no {kind} factory")]
    NoFactory {
        /// Resource name.
        resource: String,
        /// Factory kind.
        kind: &'static str,
    },

    /// The object was already disposed.
    #[error("object {0} is disposed")]
    Disposed(ObjectId),

    /// A factory failed for a reason other than missing data.
    #[error("construction failed: {0}")]
    Construction(String),

    /// An overlay was added or removed twice.
    #[error("overlay state violation: {0}")]
    OverlayState(&'static str),
}

impl GobError {
    /// Whether this is the deferred-value signal rather than a failure.
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }

    /// Returns the deferred signal, if that is what this is.
    #[must_use]
    pub fn into_loading(self) -> Option<Loading> {
        match self {
            Self::Loading(l) => Some(l),
            _ => None,
        }
    }
}

/// Result type for object-state operations.
pub type GobResult<T> = Result<T, GobError>;
