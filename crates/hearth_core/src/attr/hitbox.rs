use std::any::Any;
use std::sync::Arc;

use hearth_shared::Coord2d;

use super::{AttrFamily, AttrKind, Attribute};
use crate::error::GobResult;
use crate::object::Owner;
use crate::scene::{NodeKey, Op, SlotId, SlotRef};

/// Outline state published onto the hitbox node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitboxOutline {
    /// Minimum corner.
    pub min: Coord2d,
    /// Maximum corner.
    pub max: Coord2d,
}

/// Debug outline of an object's collision box.
#[derive(Debug)]
pub struct Hitbox {
    outline: HitboxOutline,
    /// Outline nodes, keyed by the slot they were populated under.
    nodes: Vec<(SlotId, SlotRef)>,
    refreshes: u32,
}

impl Hitbox {
    /// Outline of the box spanned by `bounds`.
    #[must_use]
    pub fn new((min, max): (Coord2d, Coord2d)) -> Self {
        Self {
            outline: HitboxOutline { min, max },
            nodes: Vec::new(),
            refreshes: 0,
        }
    }

    /// Current outline.
    #[must_use]
    pub fn outline(&self) -> HitboxOutline {
        self.outline
    }

    /// Times the outline was refreshed after install.
    #[must_use]
    pub fn refreshes(&self) -> u32 {
        self.refreshes
    }

    /// Number of outline nodes currently in the scene graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Refreshes the outline after the drawable changed.
    pub fn update_state(&mut self, bounds: Option<(Coord2d, Coord2d)>) {
        if let Some((min, max)) = bounds {
            self.outline = HitboxOutline { min, max };
        }
        self.refreshes += 1;
        let op: Op = Arc::new(self.outline);
        for (_, node) in &self.nodes {
            node.publish_state(Arc::clone(&op));
        }
    }
}

impl Attribute for Hitbox {
    fn family(&self) -> AttrFamily {
        Self::FAMILY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn is_node(&self) -> bool {
        true
    }

    fn populate(&mut self, slot: &SlotRef, _owner: &Owner<'_>) -> GobResult<()> {
        let node = slot.add_child(NodeKey::fresh("hitbox-outline"))?;
        node.publish_state(Arc::new(self.outline));
        self.nodes.push((slot.id(), node));
        Ok(())
    }

    fn unpopulate(&mut self, slot: SlotId) {
        self.nodes.retain(|(parent, _)| *parent != slot);
    }

    fn dispose(&mut self) {
        self.nodes.clear();
    }
}

impl AttrKind for Hitbox {
    const FAMILY: AttrFamily = AttrFamily::HITBOX;
}
