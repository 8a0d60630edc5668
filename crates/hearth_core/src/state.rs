//! # Snapshot Caches
//!
//! Object state that the renderer consumes is published as immutable
//! snapshots. A new snapshot is built every cycle but only published when
//! it differs from the last one published, so unchanged objects cost the
//! renderer nothing.

use std::sync::Arc;

use hearth_shared::{ClickArgs, ClickKind, Coord2d, ObjectId, POSITION_RESOLUTION};

use crate::scene::{op_eq, Op};

/// Part of a clicked scene-graph path that refines the click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickNode {
    /// An overlay with this server id.
    Overlay(i32),
    /// A mesh part with this id.
    Mesh(i32),
    /// Anything else.
    Other,
}

/// Makes an object clickable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickTarget {
    /// The clickable object.
    pub object: ObjectId,
}

impl ClickTarget {
    /// Click arguments for a hit along `path`, with the object at `position`.
    #[must_use]
    pub fn click_args(&self, position: Coord2d, path: &[ClickNode]) -> ClickArgs {
        let mut args = ClickArgs {
            kind: ClickKind::Body,
            object: self.object,
            position: position.floor(POSITION_RESOLUTION),
            mesh: -1,
        };
        for node in path {
            match *node {
                ClickNode::Overlay(id) => args.kind = ClickKind::Overlay(id),
                ClickNode::Mesh(id) => args.mesh = id,
                ClickNode::Other => {}
            }
        }
        args
    }
}

/// Marker that registers the object with the render-tick list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickMarker(pub ObjectId);

/// Render-state snapshot.
#[derive(Debug)]
pub struct GobState {
    /// Click target; absent for virtual objects.
    pub click: Option<ClickTarget>,
    /// Tick-list marker.
    pub monitor: TickMarker,
    /// Composed modifiers of every contributor.
    pub mods: Option<Op>,
}

impl GobState {
    /// Builds a snapshot around already composed modifiers.
    #[must_use]
    pub fn new(object: ObjectId, is_virtual: bool, mods: Option<Op>) -> Self {
        Self {
            click: (!is_virtual).then_some(ClickTarget { object }),
            monitor: TickMarker(object),
            mods,
        }
    }
}

/// Click target and marker are rebuilt identically every cycle, so only the
/// modifiers decide equality.
impl PartialEq for GobState {
    fn eq(&self, other: &Self) -> bool {
        op_eq(self.mods.as_ref(), other.mods.as_ref())
    }
}

/// Last published snapshot plus a change counter.
#[derive(Debug)]
pub struct SnapshotCache<T> {
    current: Option<Arc<T>>,
    generation: u64,
}

impl<T> Default for SnapshotCache<T> {
    fn default() -> Self {
        Self {
            current: None,
            generation: 0,
        }
    }
}

impl<T: PartialEq> SnapshotCache<T> {
    /// Last published snapshot.
    #[must_use]
    pub fn current(&self) -> Option<&Arc<T>> {
        self.current.as_ref()
    }

    /// Number of snapshots published.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Commits `next` if it differs from the current snapshot and returns it.
    pub fn offer(&mut self, next: T) -> Option<Arc<T>> {
        if self.current.as_deref() == Some(&next) {
            return None;
        }
        let next = Arc::new(next);
        self.current = Some(Arc::clone(&next));
        self.generation += 1;
        Some(next)
    }
}
