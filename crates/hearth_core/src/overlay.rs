//! # Overlays
//!
//! Transient visual effects stacked on an object. An overlay is created from
//! a resource (its sprite built lazily) or directly from a sprite. Deferred
//! overlays are registered at once and initialized on a later tick, once
//! their resource has loaded.
//!
//! An overlay whose sprite reports completion is removed on the same tick,
//! unless it is persistent and its sprite does not allow removal in that
//! case.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use hearth_shared::{Message, ResRef};

use crate::attr::{ModKey, ModSet, SetupMod};
use crate::error::{GobError, GobResult};
use crate::object::Owner;
use crate::scene::{Attachments, Frame, NodeKey, SlotId, SlotRef};

/// A visual effect driven by an overlay.
pub trait Sprite: Send {
    /// Fills the overlay's slot.
    ///
    /// # Errors
    ///
    /// [`GobError::Loading`] if sprite content is not ready.
    fn attach(&mut self, _slot: &SlotRef) -> GobResult<()> {
        Ok(())
    }

    /// Simulation tick. Returns `true` once the effect is finished.
    fn tick(&mut self, _dt: f64) -> bool {
        false
    }

    /// Render tick.
    fn gtick(&mut self, _frame: &mut Frame) {}

    /// Modifier contribution, if any.
    fn setup_mod(&self) -> Option<&dyn SetupMod> {
        None
    }

    /// Whether a finished effect may be removed even from a persistent overlay.
    fn removable_when_persistent(&self) -> bool {
        false
    }

    /// Releases held resources.
    fn dispose(&mut self) {}
}

/// Unique identity of an overlay instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayKey(u64);

static NEXT_OVERLAY: AtomicU64 = AtomicU64::new(1);

/// A visual effect attached to an object.
pub struct Overlay {
    key: OverlayKey,
    id: Option<i32>,
    res: Option<ResRef>,
    payload: Message,
    sprite: Option<Box<dyn Sprite>>,
    persistent: bool,
    added: bool,
    attached: Option<Attachments>,
}

impl Overlay {
    /// An overlay whose sprite is built from `res`.
    #[must_use]
    pub fn from_resource(id: Option<i32>, res: ResRef, payload: Message) -> Self {
        Self::build(id, Some(res), payload, None)
    }

    /// An overlay around an existing sprite.
    #[must_use]
    pub fn from_sprite(id: Option<i32>, sprite: Box<dyn Sprite>) -> Self {
        Self::build(id, None, Message::empty(), Some(sprite))
    }

    fn build(id: Option<i32>, res: Option<ResRef>, payload: Message, sprite: Option<Box<dyn Sprite>>) -> Self {
        Self {
            key: OverlayKey(NEXT_OVERLAY.fetch_add(1, Ordering::Relaxed)),
            id,
            res,
            payload,
            sprite,
            persistent: false,
            added: false,
            attached: None,
        }
    }

    /// Marks the overlay persistent.
    #[must_use]
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Instance identity.
    #[inline]
    #[must_use]
    pub fn key(&self) -> OverlayKey {
        self.key
    }

    /// Server-assigned id, if any.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<i32> {
        self.id
    }

    /// Source resource, if any.
    #[inline]
    #[must_use]
    pub fn res(&self) -> Option<ResRef> {
        self.res
    }

    /// Creation payload.
    #[must_use]
    pub fn payload(&self) -> &Message {
        &self.payload
    }

    /// Whether the overlay survives its sprite finishing.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Whether the overlay is registered with its object.
    #[must_use]
    pub fn is_added(&self) -> bool {
        self.added
    }

    /// Whether the sprite exists and the overlay is in the scene graph.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.attached.is_some()
    }

    /// The sprite, once built.
    #[must_use]
    pub fn sprite(&self) -> Option<&dyn Sprite> {
        self.sprite.as_deref()
    }

    /// Modifier contribution of the sprite.
    #[must_use]
    pub fn setup_mod(&self) -> Option<&dyn SetupMod> {
        self.sprite.as_ref()?.setup_mod()
    }

    fn has_mod(&self) -> bool {
        self.setup_mod().is_some()
    }

    /// Builds the sprite if needed, then attaches under `slots`.
    fn init(&mut self, owner: &Owner<'_>, slots: &[SlotRef], mods: &mut ModSet) -> GobResult<()> {
        if self.sprite.is_none() {
            let res = self
                .res
                .ok_or(GobError::OverlayState("overlay has neither sprite nor resource"))?;
            let resource = owner.glob.resources().resolve(res)?;
            let sprite = resource.sprite_factory()?.make(owner, &resource, &self.payload)?;
            self.sprite = Some(sprite);
            if self.added && self.has_mod() {
                mods.push(ModKey::Overlay(self.key));
            }
        }
        if self.attached.is_none() {
            let mut attached = Attachments::new(NodeKey::fresh("overlay"));
            if let Some(sprite) = self.sprite.as_mut() {
                attached.attach_all(slots, |s| sprite.attach(s))?;
            }
            self.attached = Some(attached);
        }
        Ok(())
    }

    fn add0(&mut self, mods: &mut ModSet) -> GobResult<()> {
        if self.added {
            return Err(GobError::OverlayState("overlay added twice"));
        }
        if self.has_mod() {
            mods.push(ModKey::Overlay(self.key));
        }
        self.added = true;
        Ok(())
    }

    fn remove0(&mut self, mods: &mut ModSet) -> GobResult<()> {
        if !self.added {
            return Err(GobError::OverlayState("overlay removed while not added"));
        }
        if let Some(mut attached) = self.attached.take() {
            attached.detach_all()?;
        }
        mods.remove(ModKey::Overlay(self.key));
        self.added = false;
        Ok(())
    }

    fn dispose(&mut self) {
        if let Some(sprite) = self.sprite.as_mut() {
            sprite.dispose();
        }
    }
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("res", &self.res)
            .field("persistent", &self.persistent)
            .field("added", &self.added)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

/// Overlays of one object, in insertion order.
#[derive(Debug, Default)]
pub struct OverlaySet {
    list: Vec<Overlay>,
}

impl OverlaySet {
    /// Registers an overlay. Unless `deferred`, it is initialized first and
    /// registration is skipped if that defers.
    pub(crate) fn add(
        &mut self,
        mut overlay: Overlay,
        deferred: bool,
        owner: &Owner<'_>,
        slots: &[SlotRef],
        mods: &mut ModSet,
    ) -> GobResult<OverlayKey> {
        if !deferred {
            overlay.init(owner, slots, mods)?;
        }
        overlay.add0(mods)?;
        let key = overlay.key;
        self.list.push(overlay);
        Ok(key)
    }

    /// Advances every overlay; finished ones are removed.
    pub(crate) fn tick(&mut self, dt: f64, owner: &Owner<'_>, slots: &[SlotRef], mods: &mut ModSet) -> GobResult<()> {
        let mut i = 0;
        while i < self.list.len() {
            let overlay = &mut self.list[i];
            if !overlay.is_initialized() {
                match overlay.init(owner, slots, mods) {
                    Err(e) if e.is_loading() => {
                        tracing::trace!(object = %owner.id, reason = %e, "overlay still loading");
                    }
                    other => other?,
                }
                i += 1;
                continue;
            }
            let Some(sprite) = overlay.sprite.as_mut() else {
                i += 1;
                continue;
            };
            let done = sprite.tick(dt);
            if done && (!overlay.persistent || sprite.removable_when_persistent()) {
                overlay.remove0(mods)?;
                let mut gone = self.list.remove(i);
                gone.dispose();
                continue;
            }
            i += 1;
        }
        Ok(())
    }

    /// Removes an overlay by instance key. Returns whether it was present.
    pub(crate) fn remove(&mut self, key: OverlayKey, mods: &mut ModSet) -> GobResult<bool> {
        let Some(idx) = self.list.iter().position(|o| o.key == key) else {
            return Ok(false);
        };
        self.list[idx].remove0(mods)?;
        let mut gone = self.list.remove(idx);
        gone.dispose();
        Ok(true)
    }

    pub(crate) fn gtick(&mut self, frame: &mut Frame) {
        for sprite in self.list.iter_mut().filter_map(|o| o.sprite.as_mut()) {
            sprite.gtick(frame);
        }
    }

    /// Attaches initialized overlays under a newly occupied slot.
    pub(crate) fn attach_slot(&mut self, slot: &SlotRef) -> GobResult<()> {
        for i in 0..self.list.len() {
            let overlay = &mut self.list[i];
            let (Some(attached), Some(sprite)) = (overlay.attached.as_mut(), overlay.sprite.as_mut()) else {
                continue;
            };
            if let Err(e) = attached.attach(slot, |s| sprite.attach(s)) {
                self.detach_slot(slot.id())?;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Detaches every overlay from a slot the object is leaving.
    pub(crate) fn detach_slot(&mut self, slot: SlotId) -> GobResult<()> {
        for attached in self.list.iter_mut().filter_map(|o| o.attached.as_mut()) {
            if attached.is_attached_to(slot) {
                attached.detach(slot)?;
            }
        }
        Ok(())
    }

    /// Takes every overlay out and disposes it.
    pub(crate) fn dispose_all(&mut self) -> usize {
        let n = self.list.len();
        for mut overlay in self.list.drain(..) {
            overlay.dispose();
        }
        n
    }

    /// First overlay carrying server id `id`.
    #[must_use]
    pub fn find(&self, id: i32) -> Option<&Overlay> {
        self.list.iter().find(|o| o.id == Some(id))
    }

    /// Overlay by instance key.
    #[must_use]
    pub fn get(&self, key: OverlayKey) -> Option<&Overlay> {
        self.list.iter().find(|o| o.key == key)
    }

    /// Overlays in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.list.iter()
    }

    /// Number of overlays.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether there are no overlays.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
