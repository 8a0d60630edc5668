//! # Attributes
//!
//! An object holds at most one attribute per [`AttrFamily`]. Attributes may
//! be scene-graph nodes (attached under every slot the object occupies) and
//! may contribute render-state or placement modifiers through [`SetupMod`].
//!
//! ## Install order
//!
//! ```text
//! detach old ──► unregister old mod ──► attach new ─┬─ ok ──► register new mod ──► commit ──► dispose old
//!                                                   └─ err ─► reattach old, restore mod + slot, propagate
//! ```

mod drawable;
mod highlight;
mod hitbox;
mod info;
mod moving;
mod offset;

pub use drawable::ResDrawable;
pub use highlight::{Highlight, HighlightTint};
pub use hitbox::{Hitbox, HitboxOutline};
pub use info::InfoLabel;
pub use moving::{Following, LinMove};
pub use offset::DrawOffset;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use hearth_shared::{Coord2d, Coord3f, ResRef};

use crate::deferred::Deferred;
use crate::error::GobResult;
use crate::object::Owner;
use crate::overlay::OverlayKey;
use crate::resource::Resource;
use crate::scene::{Attachments, Frame, NodeKey, Op, SlotId, SlotRef};

/// Attribute family; the store keeps one attribute per family.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttrFamily(&'static str);

impl AttrFamily {
    /// The object's visual body.
    pub const DRAWABLE: Self = Self("drawable");
    /// Movement: linear motion or following another object.
    pub const MOVING: Self = Self("moving");
    /// Fixed render offset.
    pub const DRAW_OFFSET: Self = Self("draw-offset");
    /// Selection highlight.
    pub const HIGHLIGHT: Self = Self("highlight");
    /// Debug hitbox outline.
    pub const HITBOX: Self = Self("hitbox");
    /// Info label.
    pub const INFO: Self = Self("info");

    /// A family outside the stock set.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Family name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for AttrFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Contributes pipeline modifiers to an object's snapshots.
pub trait SetupMod {
    /// Modifier for the render-state snapshot.
    ///
    /// # Errors
    ///
    /// [`crate::Loading`] if the modifier cannot be built yet.
    fn gob_state(&self) -> Deferred<Option<Op>> {
        Ok(None)
    }

    /// Modifier for the placement snapshot.
    ///
    /// # Errors
    ///
    /// [`crate::Loading`] if the modifier cannot be built yet.
    fn place_state(&self) -> Deferred<Option<Op>> {
        Ok(None)
    }
}

/// Capability of the MOVING family.
pub trait Moving {
    /// Current world position including height.
    ///
    /// # Errors
    ///
    /// [`crate::Loading`] if terrain or a followed object is not ready.
    fn coordinate(&self, owner: &Owner<'_>) -> Deferred<Coord3f>;

    /// Current speed.
    fn velocity(&self) -> f64 {
        0.0
    }

    /// Told about an explicit position change.
    fn moved(&mut self, _to: Coord2d) {}

    /// Borrowed transform, for movers that ride another object.
    ///
    /// # Errors
    ///
    /// [`crate::Loading`] if the transform source is not ready.
    fn transform(&self, _owner: &Owner<'_>) -> Deferred<Option<Op>> {
        Ok(None)
    }
}

/// Capability of the DRAWABLE family.
pub trait Drawable {
    /// Resource the body is built from.
    fn resource_ref(&self) -> ResRef;

    /// The resolved resource, once attached.
    fn resource(&self) -> Option<&Arc<Resource>>;
}

/// A per-object attribute.
pub trait Attribute: Any + Send {
    /// Family this attribute occupies.
    fn family(&self) -> AttrFamily;

    /// Upcast for typed access.
    fn as_any(&self) -> &dyn Any;

    /// Upcast for typed mutable access.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Simulation tick.
    fn ctick(&mut self, _owner: &Owner<'_>, _dt: f64) {}

    /// Non-simulation tick.
    fn tick(&mut self) {}

    /// Render tick.
    fn gtick(&mut self, _frame: &mut Frame) {}

    /// Whether this attribute is a scene-graph node.
    fn is_node(&self) -> bool {
        false
    }

    /// Fills the slot this node was just attached under.
    ///
    /// # Errors
    ///
    /// [`crate::GobError::Loading`] if node content is not ready.
    fn populate(&mut self, _slot: &SlotRef, _owner: &Owner<'_>) -> GobResult<()> {
        Ok(())
    }

    /// Forgets the slot handed to [`Attribute::populate`]; the scene graph
    /// has already dropped it.
    fn unpopulate(&mut self, _slot: SlotId) {}

    /// Modifier contribution, if any.
    fn setup_mod(&self) -> Option<&dyn SetupMod> {
        None
    }

    /// MOVING-family capability.
    fn as_moving(&self) -> Option<&dyn Moving> {
        None
    }

    /// MOVING-family capability, mutably.
    fn as_moving_mut(&mut self) -> Option<&mut dyn Moving> {
        None
    }

    /// DRAWABLE-family capability.
    fn as_drawable(&self) -> Option<&dyn Drawable> {
        None
    }

    /// Releases held resources. Called exactly once.
    fn dispose(&mut self) {}
}

/// Statically known attribute kind.
pub trait AttrKind: Attribute + Sized {
    /// The family every instance occupies.
    const FAMILY: AttrFamily;
}

/// Who contributes a modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModKey {
    /// The attribute in this family.
    Attr(AttrFamily),
    /// This overlay's sprite.
    Overlay(OverlayKey),
}

/// Ordered set of modifier contributors.
///
/// Composition follows insertion order; rollback restores the original
/// position so a failed install leaves the composition unchanged.
#[derive(Debug, Default, Clone)]
pub struct ModSet(Vec<ModKey>);

impl ModSet {
    /// Appends a contributor.
    pub fn push(&mut self, key: ModKey) {
        if !self.0.contains(&key) {
            self.0.push(key);
        }
    }

    /// Removes a contributor, returning where it was.
    pub fn remove(&mut self, key: ModKey) -> Option<usize> {
        let idx = self.0.iter().position(|k| *k == key)?;
        self.0.remove(idx);
        Some(idx)
    }

    /// Puts a contributor back where it was.
    pub fn restore(&mut self, idx: usize, key: ModKey) {
        let idx = idx.min(self.0.len());
        self.0.insert(idx, key);
    }

    /// Contributors in composition order.
    pub fn iter(&self) -> impl Iterator<Item = ModKey> + '_ {
        self.0.iter().copied()
    }

    /// Number of contributors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing contributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

struct Entry {
    attr: Box<dyn Attribute>,
    slots: Attachments,
}

impl Entry {
    fn detach(&mut self, parent: SlotId) -> GobResult<()> {
        let child = self.slots.child_of(parent);
        let res = self.slots.detach(parent);
        if let Some(child) = child {
            self.attr.unpopulate(child);
        }
        res
    }

    fn detach_all(&mut self) -> GobResult<()> {
        let children: Vec<SlotId> = self.slots.slots().map(|s| s.id()).collect();
        let res = self.slots.detach_all();
        for child in children {
            self.attr.unpopulate(child);
        }
        res
    }
}

/// Attributes of one object, one per family.
#[derive(Default)]
pub struct AttrStore {
    entries: HashMap<AttrFamily, Entry>,
}

impl AttrStore {
    /// Attribute in `family`.
    #[must_use]
    pub fn family(&self, family: AttrFamily) -> Option<&dyn Attribute> {
        self.entries.get(&family).map(|e| &*e.attr)
    }

    /// Attribute in `family`, mutably.
    pub fn family_mut(&mut self, family: AttrFamily) -> Option<&mut Box<dyn Attribute>> {
        self.entries.get_mut(&family).map(|e| &mut e.attr)
    }

    /// Whether `family` is occupied.
    #[must_use]
    pub fn contains(&self, family: AttrFamily) -> bool {
        self.entries.contains_key(&family)
    }

    /// Typed access.
    #[must_use]
    pub fn get<T: AttrKind>(&self) -> Option<&T> {
        self.family(T::FAMILY)?.as_any().downcast_ref::<T>()
    }

    /// Typed mutable access.
    pub fn get_mut<T: AttrKind>(&mut self) -> Option<&mut T> {
        self.entries
            .get_mut(&T::FAMILY)?
            .attr
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// The MOVING-family attribute, if it exposes the capability.
    #[must_use]
    pub fn moving(&self) -> Option<&dyn Moving> {
        self.family(AttrFamily::MOVING)?.as_moving()
    }

    /// The DRAWABLE-family attribute, if it exposes the capability.
    #[must_use]
    pub fn drawable(&self) -> Option<&dyn Drawable> {
        self.family(AttrFamily::DRAWABLE)?.as_drawable()
    }

    /// Child slots a family's node occupies.
    pub fn slots_of(&self, family: AttrFamily) -> impl Iterator<Item = &SlotRef> {
        self.entries.get(&family).into_iter().flat_map(|e| e.slots.slots())
    }

    /// Every attribute, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Attribute>> {
        self.entries.values_mut().map(|e| &mut e.attr)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no attribute is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces the attribute in `family` with `next`, or clears it.
    ///
    /// On error the previous attribute stays installed, with its modifier
    /// back in its original position. It is reattached too, unless the
    /// error came from taking it off its old slots.
    pub(crate) fn install(
        &mut self,
        family: AttrFamily,
        next: Option<Box<dyn Attribute>>,
        slots: &[SlotRef],
        mods: &mut ModSet,
        owner: &Owner<'_>,
    ) -> GobResult<()> {
        let mut prev = self.entries.remove(&family);
        if let Some(Err(e)) = prev.as_mut().map(Entry::detach_all) {
            if let Some(p) = prev {
                self.entries.insert(family, p);
            }
            return Err(e);
        }
        let prev_mod = if prev.is_some() {
            mods.remove(ModKey::Attr(family))
        } else {
            None
        };

        let Some(mut attr) = next else {
            if let Some(mut p) = prev {
                p.attr.dispose();
            }
            return Ok(());
        };

        let mut attached = Attachments::new(NodeKey::fresh(family.name()));
        if attr.is_node() {
            if let Err(e) = attached.attach_all(slots, |s| attr.populate(s, owner)) {
                if let Some(mut p) = prev {
                    let restored = if p.attr.is_node() {
                        let Entry { attr: old, slots: old_slots } = &mut p;
                        old_slots.attach_all(slots, |s| old.populate(s, owner))
                    } else {
                        Ok(())
                    };
                    if let Some(idx) = prev_mod {
                        mods.restore(idx, ModKey::Attr(family));
                    }
                    self.entries.insert(family, p);
                    restored?;
                }
                return Err(e);
            }
        }

        if attr.setup_mod().is_some() {
            mods.push(ModKey::Attr(family));
        }
        self.entries.insert(family, Entry { attr, slots: attached });
        if let Some(mut p) = prev {
            p.attr.dispose();
        }
        Ok(())
    }

    /// Attaches every node attribute under a newly occupied slot.
    pub(crate) fn attach_slot(&mut self, slot: &SlotRef, owner: &Owner<'_>) -> GobResult<()> {
        let nodes: Vec<AttrFamily> = self
            .entries
            .iter()
            .filter(|(_, e)| e.attr.is_node())
            .map(|(f, _)| *f)
            .collect();
        for (i, family) in nodes.iter().enumerate() {
            let Some(Entry { attr, slots }) = self.entries.get_mut(family) else {
                continue;
            };
            if let Err(e) = slots.attach(slot, |s| attr.populate(s, owner)) {
                for f in &nodes[..i] {
                    if let Some(entry) = self.entries.get_mut(f) {
                        if let Err(rollback) = entry.detach(slot.id()) {
                            tracing::warn!(family = f.name(), error = %rollback, "rollback of node attach");
                        }
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Detaches every node attribute from a slot the object is leaving.
    pub(crate) fn detach_slot(&mut self, slot: SlotId) -> GobResult<()> {
        let mut first = Ok(());
        for entry in self.entries.values_mut() {
            if entry.slots.is_attached_to(slot) {
                if let Err(e) = entry.detach(slot) {
                    if first.is_ok() {
                        first = Err(e);
                    }
                }
            }
        }
        first
    }

    /// Takes every attribute out for disposal.
    pub(crate) fn drain(&mut self) -> Vec<Box<dyn Attribute>> {
        self.entries.drain().map(|(_, e)| e.attr).collect()
    }
}

impl fmt::Debug for AttrStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}
