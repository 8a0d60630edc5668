//! # Scene Graph Seam
//!
//! The renderer's scene graph is an external collaborator. The object core
//! only needs four things from it: add a child under a slot, remove a slot,
//! publish a state onto a slot, and identify slots. That is [`Slot`].
//!
//! [`Attachments`] does the bookkeeping for one node attached under many
//! parent slots, with rollback when a partial attach fails.

pub mod mock;
mod op;

pub use op::{compose, op_eq, Composed, Op, PipeOp};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{GobError, GobResult};

/// Identity of a slot in the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u64);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot:{}", self.0)
    }
}

/// Identity of a node placed into the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    /// What kind of node this is.
    pub kind: &'static str,
    /// Unique serial.
    pub serial: u64,
}

static NEXT_NODE: AtomicU64 = AtomicU64::new(1);

impl NodeKey {
    /// Allocates a fresh key.
    #[must_use]
    pub fn fresh(kind: &'static str) -> Self {
        Self {
            kind,
            serial: NEXT_NODE.fetch_add(1, Ordering::Relaxed),
        }
    }
}

/// A position in the scene graph that nodes can be added under.
pub trait Slot: Send + Sync {
    /// Slot identity.
    fn id(&self) -> SlotId;

    /// Adds `node` as a child of this slot and returns the child's slot.
    ///
    /// # Errors
    ///
    /// [`GobError::SlotAlreadyAttached`] if `node` is already a child here.
    fn add_child(&self, node: NodeKey) -> GobResult<SlotRef>;

    /// Removes this slot and everything below it.
    ///
    /// # Errors
    ///
    /// [`GobError::SlotNotAttached`] if the slot was already removed.
    fn remove(&self) -> GobResult<()>;

    /// Sets the pipeline state applied to everything below this slot.
    fn publish_state(&self, state: Op);
}

/// Shared handle to a slot.
pub type SlotRef = Arc<dyn Slot>;

/// Render-tick context handed to `gtick`.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Frame number.
    pub number: u64,
    /// Seconds since the previous frame.
    pub dt: f64,
    /// Nodes that prepared themselves for drawing this frame.
    pub prepared: usize,
}

impl Frame {
    /// Context for frame `number`.
    #[must_use]
    pub fn new(number: u64, dt: f64) -> Self {
        Self {
            number,
            dt,
            prepared: 0,
        }
    }
}

/// Tracks the child slots one node occupies under each parent slot.
#[derive(Debug)]
pub struct Attachments {
    node: NodeKey,
    children: Vec<(SlotId, SlotRef)>,
}

impl fmt::Debug for dyn Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl Attachments {
    /// Bookkeeping for `node`, attached nowhere yet.
    #[must_use]
    pub fn new(node: NodeKey) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    /// The node being tracked.
    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeKey {
        self.node
    }

    /// Adds the node under `parent`, then lets `populate` fill the new slot.
    ///
    /// If `populate` fails the child slot is removed again.
    ///
    /// # Errors
    ///
    /// Propagates scene-graph errors and whatever `populate` returns.
    pub fn attach<F>(&mut self, parent: &SlotRef, populate: F) -> GobResult<()>
    where
        F: FnOnce(&SlotRef) -> GobResult<()>,
    {
        let parent_id = parent.id();
        if self.is_attached_to(parent_id) {
            return Err(GobError::SlotAlreadyAttached(parent_id.0));
        }
        let child = parent.add_child(self.node)?;
        if let Err(e) = populate(&child) {
            if let Err(rollback) = child.remove() {
                tracing::warn!(slot = child.id().0, error = %rollback, "rollback of failed populate");
            }
            return Err(e);
        }
        self.children.push((parent_id, child));
        Ok(())
    }

    /// Attaches under every slot in `parents`, or under none of them.
    ///
    /// # Errors
    ///
    /// The first error hit; earlier attachments are rolled back.
    pub fn attach_all<F>(&mut self, parents: &[SlotRef], mut populate: F) -> GobResult<()>
    where
        F: FnMut(&SlotRef) -> GobResult<()>,
    {
        let mut done = Vec::with_capacity(parents.len());
        for parent in parents {
            if let Err(e) = self.attach(parent, &mut populate) {
                for id in done {
                    if let Err(rollback) = self.detach(id) {
                        tracing::warn!(parent = id.0, error = %rollback, "rollback of partial attach");
                    }
                }
                return Err(e);
            }
            done.push(parent.id());
        }
        Ok(())
    }

    /// Removes the node from under `parent`.
    ///
    /// # Errors
    ///
    /// [`GobError::SlotNotAttached`] if it was never attached there.
    pub fn detach(&mut self, parent: SlotId) -> GobResult<()> {
        let idx = self
            .children
            .iter()
            .position(|(p, _)| *p == parent)
            .ok_or(GobError::SlotNotAttached(parent.0))?;
        let (_, child) = self.children.remove(idx);
        child.remove()
    }

    /// Removes the node from under every parent.
    ///
    /// # Errors
    ///
    /// The first scene-graph error; remaining slots are still removed.
    pub fn detach_all(&mut self) -> GobResult<()> {
        let mut first = Ok(());
        for (_, child) in self.children.drain(..) {
            if let Err(e) = child.remove() {
                if first.is_ok() {
                    first = Err(e);
                }
            }
        }
        first
    }

    /// Child slot the node occupies under `parent`.
    #[must_use]
    pub fn child_of(&self, parent: SlotId) -> Option<SlotId> {
        self.children.iter().find(|(p, _)| *p == parent).map(|(_, c)| c.id())
    }

    /// Whether the node sits under `parent`.
    #[must_use]
    pub fn is_attached_to(&self, parent: SlotId) -> bool {
        self.children.iter().any(|(p, _)| *p == parent)
    }

    /// Child slots the node occupies.
    pub fn slots(&self) -> impl Iterator<Item = &SlotRef> {
        self.children.iter().map(|(_, c)| c)
    }

    /// Number of parents the node is attached under.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the node is attached nowhere.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
