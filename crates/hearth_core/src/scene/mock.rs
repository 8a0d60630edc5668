//! In-memory scene graph for tests and headless runs.
//!
//! Records membership and every published state so tests can count
//! publications per slot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{NodeKey, Op, Slot, SlotId, SlotRef};
use crate::error::{GobError, GobResult};

#[derive(Debug)]
struct Record {
    parent: Option<SlotId>,
    node: Option<NodeKey>,
    alive: bool,
    published: Vec<Op>,
}

/// A scene graph that only keeps books.
#[derive(Debug, Default)]
pub struct MockGraph {
    next: AtomicU64,
    slots: Mutex<HashMap<SlotId, Record>>,
}

/// A slot of a [`MockGraph`].
#[derive(Debug)]
pub struct MockSlot {
    id: SlotId,
    graph: Arc<MockGraph>,
}

impl MockGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a new top-level slot.
    pub fn root(self: &Arc<Self>) -> SlotRef {
        self.insert(None, None)
    }

    fn insert(self: &Arc<Self>, parent: Option<SlotId>, node: Option<NodeKey>) -> SlotRef {
        let id = SlotId(self.next.fetch_add(1, Ordering::Relaxed));
        self.slots.lock().insert(
            id,
            Record {
                parent,
                node,
                alive: true,
                published: Vec::new(),
            },
        );
        Arc::new(MockSlot {
            id,
            graph: Arc::clone(self),
        })
    }

    /// Number of states published onto `slot`.
    #[must_use]
    pub fn publish_count(&self, slot: SlotId) -> usize {
        self.slots.lock().get(&slot).map_or(0, |r| r.published.len())
    }

    /// Last state published onto `slot`.
    #[must_use]
    pub fn last_state(&self, slot: SlotId) -> Option<Op> {
        self.slots
            .lock()
            .get(&slot)
            .and_then(|r| r.published.last().cloned())
    }

    /// Live child slots directly under `slot`.
    #[must_use]
    pub fn children(&self, slot: SlotId) -> Vec<(SlotId, NodeKey)> {
        let slots = self.slots.lock();
        let mut out: Vec<_> = slots
            .iter()
            .filter(|(_, r)| r.alive && r.parent == Some(slot))
            .filter_map(|(id, r)| r.node.map(|n| (*id, n)))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    /// Whether `node` is a live child of `slot`.
    #[must_use]
    pub fn contains(&self, slot: SlotId, node: NodeKey) -> bool {
        self.children(slot).iter().any(|(_, n)| *n == node)
    }

    /// Whether `slot` is still part of the graph.
    #[must_use]
    pub fn is_alive(&self, slot: SlotId) -> bool {
        self.slots.lock().get(&slot).is_some_and(|r| r.alive)
    }

    /// Number of live slots, roots included.
    #[must_use]
    pub fn live_slots(&self) -> usize {
        self.slots.lock().values().filter(|r| r.alive).count()
    }
}

impl Slot for MockSlot {
    fn id(&self) -> SlotId {
        self.id
    }

    fn add_child(&self, node: NodeKey) -> GobResult<SlotRef> {
        {
            let slots = self.graph.slots.lock();
            if !slots.get(&self.id).is_some_and(|r| r.alive) {
                return Err(GobError::SlotNotAttached(self.id.0));
            }
            let dup = slots
                .values()
                .any(|r| r.alive && r.parent == Some(self.id) && r.node == Some(node));
            if dup {
                return Err(GobError::SlotAlreadyAttached(self.id.0));
            }
        }
        Ok(self.graph.insert(Some(self.id), Some(node)))
    }

    fn remove(&self) -> GobResult<()> {
        let mut slots = self.graph.slots.lock();
        if !slots.get(&self.id).is_some_and(|r| r.alive) {
            return Err(GobError::SlotNotAttached(self.id.0));
        }
        let mut doomed = vec![self.id];
        while let Some(id) = doomed.pop() {
            if let Some(r) = slots.get_mut(&id) {
                r.alive = false;
            }
            doomed.extend(
                slots
                    .iter()
                    .filter(|(_, r)| r.alive && r.parent == Some(id))
                    .map(|(child, _)| *child),
            );
        }
        Ok(())
    }

    fn publish_state(&self, state: Op) {
        if let Some(r) = self.graph.slots.lock().get_mut(&self.id) {
            r.published.push(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_takes_subtree() {
        let graph = MockGraph::new();
        let root = graph.root();
        let a = root.add_child(NodeKey::fresh("a")).unwrap();
        let b = a.add_child(NodeKey::fresh("b")).unwrap();

        a.remove().unwrap();
        assert!(graph.is_alive(root.id()));
        assert!(!graph.is_alive(a.id()));
        assert!(!graph.is_alive(b.id()));
        assert!(matches!(a.remove(), Err(GobError::SlotNotAttached(_))));
    }
}
