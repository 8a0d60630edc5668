//! # Game Objects
//!
//! A [`GameObject`] is one world entity as the client sees it. It owns an
//! attribute store, resource-backed attributes, overlays, and two snapshot
//! caches (render state and placement), and keeps the scene graph in sync
//! with them once per tick.
//!
//! ## Tick Order
//!
//! ```text
//! advance(dt): attributes ──► pending resource attributes ──► overlays ──► render state
//!              └──► returns true when a virtual object has nothing left to show
//! update_placement(): placement snapshot, published to placement slots on change
//! prepare_draw(): drawable + overlay sprites
//! ```
//!
//! Every mutating entry point takes the object's lock, so ticks, attribute
//! installs and disposal are mutually exclusive.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use hearth_shared::{
    ClickArgs, Coord, Coord2d, Coord3f, Message, ObjectId, OutboundMessage, ResRef, REMOVAL_WAIT_MS,
};
use parking_lot::{Mutex, MutexGuard, RwLock};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::attr::{
    AttrFamily, AttrKind, AttrStore, Attribute, DrawOffset, Highlight, Hitbox, InfoLabel, ModKey, ModSet, SetupMod,
};
use crate::damage::{parse_damage, DamageInfo};
use crate::deferred::{Callback, Deferred, Loading, WaitFor, WaitQueue, Waiting};
use crate::error::{GobError, GobResult};
use crate::glob::Glob;
use crate::overlay::{Overlay, OverlayKey, OverlaySet};
use crate::placement::Placement;
use crate::resattr::{ResAttrCache, ResAttrKind};
use crate::scene::{compose, Frame, NodeKey, Op, SlotId, SlotRef};
use crate::state::{ClickNode, ClickTarget, GobState, SnapshotCache};

/// What an attribute, sprite or factory may know about its object.
#[derive(Clone, Copy)]
pub struct Owner<'a> {
    /// Object id.
    pub id: ObjectId,
    /// World context.
    pub glob: &'a Arc<Glob>,
    /// Ground position.
    pub position: Coord2d,
    /// Heading in radians.
    pub angle: f64,
    /// Whether the object is virtual.
    pub is_virtual: bool,
}

struct UpdateSeq {
    seq: AtomicU64,
    queue: Arc<WaitQueue>,
}

struct SeqWait {
    updates: Arc<UpdateSeq>,
    seen: u64,
}

impl WaitFor for SeqWait {
    fn wait_for(&self, callback: Callback) -> Waiting {
        let updates = &self.updates;
        let seen = self.seen;
        updates
            .queue
            .add_checked(callback, || updates.seq.load(Ordering::Acquire) != seen)
    }
}

struct PlacedSlot {
    parent: SlotId,
    placed: SlotRef,
    object: SlotRef,
}

struct Removal {
    disposed: AtomicBool,
    signal: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
}

struct ObjectInner {
    position: Coord2d,
    angle: f64,
    is_virtual: bool,
    preview: bool,
    disposed: bool,
    attrs: AttrStore,
    rattrs: ResAttrCache,
    overlays: OverlaySet,
    mods: ModSet,
    slots: Vec<SlotRef>,
    state: SnapshotCache<GobState>,
    placed: Vec<PlacedSlot>,
    placement: SnapshotCache<Placement>,
    damage: Option<DamageInfo>,
}

impl ObjectInner {
    fn compose(&self, pick: impl Fn(&dyn SetupMod) -> Deferred<Option<Op>>) -> Deferred<Option<Op>> {
        let mut ops = Vec::new();
        for key in self.mods.iter() {
            let contributor = match key {
                ModKey::Attr(family) => self.attrs.family(family).and_then(|a| a.setup_mod()),
                ModKey::Overlay(key) => self.overlays.get(key).and_then(Overlay::setup_mod),
            };
            if let Some(op) = contributor.map(&pick).transpose()?.flatten() {
                ops.push(op);
            }
        }
        Ok(compose(ops))
    }

    fn build_state(&self, id: ObjectId) -> Deferred<GobState> {
        let mods = self.compose(|m| m.gob_state())?;
        Ok(GobState::new(id, self.is_virtual, mods))
    }

    fn coordinate(&self, owner: &Owner<'_>) -> Deferred<Coord3f> {
        let base = match self.attrs.moving() {
            Some(m) => m.coordinate(owner)?,
            None => Coord3f::from_ground(self.position, owner.glob.terrain().ground_z(self.position)?),
        };
        Ok(match self.attrs.get::<DrawOffset>() {
            Some(off) => base + off.0,
            None => base,
        })
    }

    fn compute_placement(&self, owner: &Owner<'_>) -> Deferred<Placement> {
        let mods = self.compose(|m| m.place_state())?;
        if let Some(m) = self.attrs.moving() {
            if let Some(xf) = m.transform(owner)? {
                return Ok(Placement::following(xf, None, mods));
            }
        }
        let origin = self.coordinate(owner)?;
        let tile_state = owner.glob.terrain().tile_state(origin)?;
        Ok(Placement::at(origin, self.angle, tile_state, mods))
    }

    fn should_remove(&self) -> bool {
        self.is_virtual && self.overlays.is_empty() && !self.attrs.contains(AttrFamily::DRAWABLE)
    }
}

/// A world object.
pub struct GameObject {
    id: ObjectId,
    glob: Arc<Glob>,
    node: NodeKey,
    placed_node: NodeKey,
    inner: Mutex<ObjectInner>,
    committed: RwLock<Option<Arc<Placement>>>,
    updates: Arc<UpdateSeq>,
    removal: Removal,
}

impl GameObject {
    /// Creates an object at `position`. Negative ids make it virtual.
    #[must_use]
    pub fn new(glob: Arc<Glob>, id: ObjectId, position: Coord2d) -> Arc<Self> {
        let (signal, done) = crossbeam_channel::bounded(0);
        let mut attrs = AttrStore::default();
        let mut mods = ModSet::default();
        let owner = Owner {
            id,
            glob: &glob,
            position,
            angle: 0.0,
            is_virtual: id.is_virtual(),
        };
        // A label has no slots to attach to yet; this cannot defer.
        if let Err(e) = attrs.install(AttrFamily::INFO, Some(Box::new(InfoLabel::new())), &[], &mut mods, &owner) {
            tracing::warn!(object = %id, error = %e, "info label not installed");
        }
        let inner = ObjectInner {
            position,
            angle: 0.0,
            is_virtual: id.is_virtual(),
            preview: false,
            disposed: false,
            attrs,
            rattrs: ResAttrCache::default(),
            overlays: OverlaySet::default(),
            mods,
            slots: Vec::new(),
            state: SnapshotCache::default(),
            placed: Vec::new(),
            placement: SnapshotCache::default(),
            damage: None,
        };
        Arc::new(Self {
            id,
            glob,
            node: NodeKey::fresh("object"),
            placed_node: NodeKey::fresh("placed"),
            inner: Mutex::new(inner),
            committed: RwLock::new(None),
            updates: Arc::new(UpdateSeq {
                seq: AtomicU64::new(0),
                queue: WaitQueue::new(),
            }),
            removal: Removal {
                disposed: AtomicBool::new(false),
                signal: Mutex::new(Some(signal)),
                done,
            },
        })
    }

    /// Object id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// World context.
    #[inline]
    #[must_use]
    pub fn glob(&self) -> &Arc<Glob> {
        &self.glob
    }

    fn lock(&self) -> GobResult<MutexGuard<'_, ObjectInner>> {
        let inner = self.inner.lock();
        if inner.disposed {
            return Err(GobError::Disposed(self.id));
        }
        Ok(inner)
    }

    fn owner(&self, inner: &ObjectInner) -> Owner<'_> {
        Owner {
            id: self.id,
            glob: &self.glob,
            position: inner.position,
            angle: inner.angle,
            is_virtual: inner.is_virtual,
        }
    }

    /// Ground position.
    #[must_use]
    pub fn position(&self) -> Coord2d {
        self.inner.lock().position
    }

    /// Heading in radians.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.inner.lock().angle
    }

    /// Whether the object is virtual (not confirmed by the server).
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.inner.lock().is_virtual
    }

    /// Marks the object virtual or confirmed.
    pub fn set_virtual(&self, is_virtual: bool) {
        self.inner.lock().is_virtual = is_virtual;
    }

    /// Marks the object as a placement preview.
    pub fn set_preview(&self, preview: bool) {
        self.inner.lock().preview = preview;
    }

    /// Whether the object was disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.removal.disposed.load(Ordering::Acquire)
    }

    /// Installs `attr`, replacing whatever occupies its family.
    ///
    /// # Errors
    ///
    /// [`GobError::Loading`] if the new attribute cannot attach yet; the
    /// previous one then stays installed and attached.
    pub fn set_attr(&self, attr: Box<dyn Attribute>) -> GobResult<()> {
        let family = attr.family();
        self.install(family, Some(attr))
    }

    /// Removes the attribute in `family`.
    ///
    /// # Errors
    ///
    /// Scene-graph consistency errors while detaching.
    pub fn del_attr(&self, family: AttrFamily) -> GobResult<()> {
        self.install(family, None)
    }

    fn install(&self, family: AttrFamily, next: Option<Box<dyn Attribute>>) -> GobResult<()> {
        {
            let mut guard = self.lock()?;
            let inner = &mut *guard;
            let owner = self.owner(inner);
            inner.attrs.install(family, next, &inner.slots, &mut inner.mods, &owner)?;
            if family == AttrFamily::DRAWABLE {
                self.drawable_updated(inner, &owner)?;
            }
        }
        self.updated();
        Ok(())
    }

    fn drawable_updated(&self, inner: &mut ObjectInner, owner: &Owner<'_>) -> GobResult<()> {
        let display = self.glob.display();
        if !display.show_hitboxes {
            if inner.attrs.contains(AttrFamily::HITBOX) {
                inner.attrs.install(AttrFamily::HITBOX, None, &inner.slots, &mut inner.mods, owner)?;
            }
            return Ok(());
        }
        let resolved = inner
            .attrs
            .drawable()
            .map(|d| self.glob.resources().resolve(d.resource_ref()))
            .transpose();
        let bounds = match resolved {
            Ok(res) => res.and_then(|r| r.bounds()),
            Err(l) => {
                tracing::trace!(object = %self.id, reason = %l, "hitbox deferred");
                return Ok(());
            }
        };
        if let Some(hitbox) = inner.attrs.get_mut::<Hitbox>() {
            hitbox.update_state(bounds);
            return Ok(());
        }
        if inner.is_virtual && !(inner.preview && display.hitbox_on_previews) {
            return Ok(());
        }
        let Some(hitbox) = bounds.map(Hitbox::new) else {
            return Ok(());
        };
        match inner
            .attrs
            .install(AttrFamily::HITBOX, Some(Box::new(hitbox)), &inner.slots, &mut inner.mods, owner)
        {
            Err(e) if e.is_loading() => {
                tracing::trace!(object = %self.id, reason = %e, "hitbox deferred");
                Ok(())
            }
            other => other,
        }
    }

    /// Re-evaluates the hitbox after display settings changed.
    ///
    /// # Errors
    ///
    /// Scene-graph consistency errors.
    pub fn refresh_hitbox(&self) -> GobResult<()> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        let owner = self.owner(inner);
        self.drawable_updated(inner, &owner)
    }

    /// Whether `family` is occupied.
    #[must_use]
    pub fn has_attr(&self, family: AttrFamily) -> bool {
        self.inner.lock().attrs.contains(family)
    }

    /// Runs `f` on the typed attribute, if installed.
    pub fn with_attr<T: AttrKind, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.inner.lock().attrs.get::<T>().map(f)
    }

    /// Runs `f` on the typed attribute mutably, if installed.
    pub fn with_attr_mut<T: AttrKind, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.inner.lock().attrs.get_mut::<T>().map(f)
    }

    /// Applies a resource-backed attribute update.
    ///
    /// # Errors
    ///
    /// [`GobError::ConflictingResource`] if the derived family is bound to
    /// another resource.
    pub fn set_res_attr(&self, res: ResRef, payload: Message) -> GobResult<()> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        let owner = self.owner(inner);
        inner.rattrs.set(res, payload, &owner)
    }

    /// Drops the resource-backed attribute derived from `res`.
    ///
    /// # Errors
    ///
    /// [`GobError::Disposed`] after disposal.
    pub fn del_res_attr(&self, res: ResRef) -> GobResult<()> {
        self.lock()?.rattrs.remove(res);
        Ok(())
    }

    /// Runs `f` on the typed resource-backed attribute, if constructed.
    pub fn with_res_attr<T: ResAttrKind, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.inner.lock().rattrs.get::<T>().map(f)
    }

    /// Number of resource-backed updates still waiting on data.
    #[must_use]
    pub fn pending_res_attrs(&self) -> usize {
        self.inner.lock().rattrs.pending()
    }

    /// Adds an overlay. Deferred overlays initialize on a later tick.
    ///
    /// # Errors
    ///
    /// [`GobError::Loading`] if a non-deferred overlay is not ready.
    pub fn add_overlay(&self, overlay: Overlay, deferred: bool) -> GobResult<OverlayKey> {
        let key = {
            let mut guard = self.lock()?;
            let inner = &mut *guard;
            let owner = self.owner(inner);
            let key = inner
                .overlays
                .add(overlay, deferred, &owner, &inner.slots, &mut inner.mods)?;
            self.overlay_added(inner, key);
            key
        };
        self.updated();
        Ok(key)
    }

    fn overlay_added(&self, inner: &mut ObjectInner, key: OverlayKey) {
        let Some((res, payload)) = inner
            .overlays
            .get(key)
            .and_then(|o| Some((o.res()?, o.payload().clone())))
        else {
            return;
        };
        let resource = match self.glob.resources().resolve(res) {
            Ok(r) => r,
            Err(l) => {
                tracing::trace!(object = %self.id, reason = %l, "overlay hook skipped");
                return;
            }
        };
        let display = self.glob.display();
        if resource.name() == display.damage_resource {
            match parse_damage(&payload) {
                Ok((colour, value)) => inner.damage.get_or_insert_with(DamageInfo::default).update(colour, value),
                Err(e) => tracing::debug!(object = %self.id, error = %e, "malformed damage payload"),
            }
        } else if resource.name() == display.radius_resource && self.glob.show_radius() {
            tracing::debug!(object = %self.id, "radius display enabled");
        }
    }

    /// First overlay with server id `id`.
    #[must_use]
    pub fn find_overlay(&self, id: i32) -> Option<OverlayKey> {
        self.inner.lock().overlays.find(id).map(Overlay::key)
    }

    /// Runs `f` on an overlay, if present.
    pub fn with_overlay<R>(&self, key: OverlayKey, f: impl FnOnce(&Overlay) -> R) -> Option<R> {
        self.inner.lock().overlays.get(key).map(f)
    }

    /// Removes an overlay. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Scene-graph consistency errors while detaching.
    pub fn remove_overlay(&self, key: OverlayKey) -> GobResult<bool> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        inner.overlays.remove(key, &mut inner.mods)
    }

    /// Number of overlays.
    #[must_use]
    pub fn overlay_count(&self) -> usize {
        self.inner.lock().overlays.len()
    }

    /// Accumulated damage numbers.
    #[must_use]
    pub fn damage(&self) -> Option<DamageInfo> {
        self.inner.lock().damage.clone()
    }

    /// Forgets accumulated damage numbers.
    pub fn clear_damage(&self) {
        self.inner.lock().damage = None;
    }

    /// Simulation tick. Returns `true` when the object asks to be removed.
    ///
    /// # Errors
    ///
    /// Consistency violations; missing data never errors.
    pub fn advance(&self, dt: f64) -> GobResult<bool> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        let owner = self.owner(inner);
        for attr in inner.attrs.iter_mut() {
            attr.ctick(&owner, dt);
        }
        inner.rattrs.replay(&owner)?;
        inner.overlays.tick(dt, &owner, &inner.slots, &mut inner.mods)?;
        self.refresh_state(inner);
        Ok(inner.should_remove())
    }

    /// Non-simulation tick.
    ///
    /// # Errors
    ///
    /// Consistency violations while replaying resource attributes.
    pub fn tick(&self) -> GobResult<()> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        let owner = self.owner(inner);
        for attr in inner.attrs.iter_mut() {
            attr.tick();
        }
        inner.rattrs.replay(&owner).map(|_| ())
    }

    /// Render tick.
    pub fn prepare_draw(&self, frame: &mut Frame) {
        let Ok(mut guard) = self.lock() else {
            return;
        };
        if let Some(drawable) = guard.attrs.family_mut(AttrFamily::DRAWABLE) {
            drawable.gtick(frame);
        }
        guard.overlays.gtick(frame);
    }

    fn refresh_state(&self, inner: &mut ObjectInner) {
        let next = match inner.build_state(self.id) {
            Ok(next) => next,
            Err(l) => {
                tracing::trace!(object = %self.id, reason = %l, "render state deferred");
                return;
            }
        };
        if let Some(published) = inner.state.offer(next) {
            let op: Op = published;
            for slot in &inner.slots {
                slot.publish_state(Arc::clone(&op));
            }
        }
    }

    /// Last published render state.
    #[must_use]
    pub fn render_state(&self) -> Option<Arc<GobState>> {
        self.inner.lock().state.current().cloned()
    }

    /// Number of render states published.
    #[must_use]
    pub fn render_generation(&self) -> u64 {
        self.inner.lock().state.generation()
    }

    /// Recomputes placement and publishes it if it changed. Returns whether
    /// it published.
    ///
    /// # Errors
    ///
    /// [`GobError::Disposed`] after disposal; missing data never errors.
    pub fn update_placement(&self) -> GobResult<bool> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        let owner = self.owner(inner);
        let next = match self.build_placement(inner, &owner) {
            Ok(p) => p,
            Err(l) => {
                tracing::trace!(object = %self.id, reason = %l, "placement deferred");
                return Ok(false);
            }
        };
        let Some(published) = inner.placement.offer(next) else {
            return Ok(false);
        };
        *self.committed.write() = Some(Arc::clone(&published));
        let op: Op = published;
        for p in &inner.placed {
            p.placed.publish_state(Arc::clone(&op));
        }
        Ok(true)
    }

    fn build_placement(&self, inner: &ObjectInner, owner: &Owner<'_>) -> Deferred<Placement> {
        inner
            .compute_placement(owner)
            .map_err(|l| l.or(self.data_loading("object updated")))
    }

    /// Last committed placement.
    #[must_use]
    pub fn placement(&self) -> Option<Arc<Placement>> {
        self.committed.read().clone()
    }

    /// Number of placements published.
    #[must_use]
    pub fn placement_generation(&self) -> u64 {
        self.inner.lock().placement.generation()
    }

    /// Called when the scene graph adds the object under `slot`.
    ///
    /// Publishes the current render state onto the slot and attaches
    /// initialized overlays and node attributes under it.
    ///
    /// # Errors
    ///
    /// [`GobError::Loading`] if the render state or a node is not ready;
    /// nothing stays attached under `slot` in that case.
    /// [`GobError::SlotAlreadyAttached`] if the object is already under `slot`.
    pub fn on_attached_to(&self, slot: SlotRef) -> GobResult<()> {
        let mut guard = self.lock()?;
        self.attach_locked(&mut guard, slot)
    }

    fn attach_locked(&self, inner: &mut ObjectInner, slot: SlotRef) -> GobResult<()> {
        if inner.slots.iter().any(|s| s.id() == slot.id()) {
            return Err(GobError::SlotAlreadyAttached(slot.id().0));
        }
        if inner.state.current().is_none() {
            let state = inner.build_state(self.id)?;
            inner.state.offer(state);
        }
        if let Some(state) = inner.state.current() {
            slot.publish_state(Arc::clone(state) as Op);
        }
        let owner = self.owner(inner);
        inner.overlays.attach_slot(&slot)?;
        if let Err(e) = inner.attrs.attach_slot(&slot, &owner) {
            if let Err(rollback) = inner.overlays.detach_slot(slot.id()) {
                tracing::warn!(object = %self.id, error = %rollback, "overlay rollback failed");
            }
            return Err(e);
        }
        inner.slots.push(slot);
        Ok(())
    }

    /// Called when the scene graph takes the object out of `slot`.
    ///
    /// # Errors
    ///
    /// [`GobError::SlotNotAttached`] if the object was not under `slot`.
    pub fn on_detached_from(&self, slot: SlotId) -> GobResult<()> {
        let mut guard = self.lock()?;
        self.detach_locked(&mut guard, slot)
    }

    fn detach_locked(&self, inner: &mut ObjectInner, slot: SlotId) -> GobResult<()> {
        let idx = inner
            .slots
            .iter()
            .position(|s| s.id() == slot)
            .ok_or(GobError::SlotNotAttached(slot.0))?;
        inner.slots.remove(idx);
        let overlays = inner.overlays.detach_slot(slot);
        let attrs = inner.attrs.detach_slot(slot);
        overlays.and(attrs)
    }

    /// Places the object under `parent`: a placement node carrying the
    /// placement snapshot, with the object below it.
    ///
    /// # Errors
    ///
    /// [`GobError::Loading`] if placement or render state is not ready;
    /// nothing stays attached in that case.
    pub fn attach_placed(&self, parent: &SlotRef) -> GobResult<()> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        if inner.placed.iter().any(|p| p.parent == parent.id()) {
            return Err(GobError::SlotAlreadyAttached(parent.id().0));
        }
        if inner.placement.current().is_none() {
            let owner = self.owner(inner);
            let first = self.build_placement(inner, &owner)?;
            if let Some(p) = inner.placement.offer(first) {
                *self.committed.write() = Some(p);
            }
        }
        let placed = parent.add_child(self.placed_node)?;
        if let Some(p) = inner.placement.current() {
            placed.publish_state(Arc::clone(p) as Op);
        }
        let attached = placed
            .add_child(self.node)
            .and_then(|object| self.attach_locked(inner, Arc::clone(&object)).map(|()| object));
        match attached {
            Ok(object) => {
                inner.placed.push(PlacedSlot {
                    parent: parent.id(),
                    placed,
                    object,
                });
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = placed.remove() {
                    tracing::warn!(object = %self.id, error = %rollback, "placement node rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Undoes [`GameObject::attach_placed`].
    ///
    /// # Errors
    ///
    /// [`GobError::SlotNotAttached`] if not placed under `parent`.
    pub fn detach_placed(&self, parent: SlotId) -> GobResult<()> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        let idx = inner
            .placed
            .iter()
            .position(|p| p.parent == parent)
            .ok_or(GobError::SlotNotAttached(parent.0))?;
        let p = inner.placed.remove(idx);
        self.detach_locked(inner, p.object.id())?;
        p.placed.remove()
    }

    /// Slots the object node occupies.
    #[must_use]
    pub fn slots(&self) -> Vec<SlotRef> {
        self.inner.lock().slots.clone()
    }

    /// Placement-node slots, one per placed parent.
    #[must_use]
    pub fn placement_slots(&self) -> Vec<SlotRef> {
        self.inner.lock().placed.iter().map(|p| Arc::clone(&p.placed)).collect()
    }

    /// Moves the object and tells its mover.
    pub fn move_to(&self, position: Coord2d, angle: f64) {
        {
            let mut inner = self.inner.lock();
            if let Some(m) = inner
                .attrs
                .family_mut(AttrFamily::MOVING)
                .and_then(|a| a.as_moving_mut())
            {
                m.moved(position);
            }
            inner.position = position;
            inner.angle = angle;
        }
        self.updated();
    }

    /// World position including height and draw offset.
    ///
    /// # Errors
    ///
    /// [`Loading`] while terrain or a followed object is not ready.
    pub fn coordinate(&self) -> Deferred<Coord3f> {
        let inner = self.inner.lock();
        let owner = self.owner(&inner);
        inner.coordinate(&owner)
    }

    /// Current speed; zero without a mover.
    #[must_use]
    pub fn velocity(&self) -> f64 {
        self.inner.lock().attrs.moving().map_or(0.0, |m| m.velocity())
    }

    /// Starts (or restarts) the selection highlight.
    ///
    /// # Errors
    ///
    /// [`GobError::Disposed`] after disposal.
    pub fn highlight(&self) -> GobResult<()> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        if let Some(h) = inner.attrs.get_mut::<Highlight>() {
            h.start();
            return Ok(());
        }
        let mut h = Highlight::default();
        h.start();
        let owner = self.owner(inner);
        inner
            .attrs
            .install(AttrFamily::HIGHLIGHT, Some(Box::new(h)), &inner.slots, &mut inner.mods, &owner)
    }

    /// Click arguments for a hit along `path`; `None` for virtual objects.
    #[must_use]
    pub fn click_args(&self, path: &[ClickNode]) -> Option<ClickArgs> {
        let inner = self.inner.lock();
        if inner.is_virtual {
            return None;
        }
        Some(ClickTarget { object: self.id }.click_args(inner.position, path))
    }

    /// Sends a right click on the object body to the server.
    pub fn right_click(&self) {
        let position = self.inner.lock().position;
        let args = ClickTarget { object: self.id }.click_args(position, &[]);
        self.glob.send(OutboundMessage::Click {
            screen: Coord::ZERO,
            local: Coord::ZERO,
            button: 3,
            modflags: 0,
            args,
        });
    }

    /// Deterministic random source seeded from the object id.
    #[must_use]
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(u64::from_ne_bytes(self.id.0.to_ne_bytes()))
    }

    /// Signals that object data changed, waking anyone waiting on it.
    pub fn updated(&self) {
        self.updates.seq.fetch_add(1, Ordering::AcqRel);
        self.updates.queue.notify();
    }

    /// A deferral that resolves the next time the object is updated.
    #[must_use]
    pub fn data_loading(&self, reason: &'static str) -> Loading {
        let wait = SeqWait {
            updates: Arc::clone(&self.updates),
            seen: self.updates.seq.load(Ordering::Acquire),
        };
        Loading::new(reason, Arc::new(wait))
    }

    /// Takes the object out of the scene graph, disposes every attribute,
    /// resource-backed attribute and overlay exactly once, then wakes removal
    /// waiters. Returns how many attributes of both kinds were disposed; zero
    /// on repeat calls.
    pub fn dispose(&self) -> usize {
        let disposed = {
            let mut inner = self.inner.lock();
            if inner.disposed {
                return 0;
            }
            inner.disposed = true;
            self.detach_everywhere(&mut inner);
            let attrs = inner.attrs.drain();
            let n = attrs.len();
            for mut attr in attrs {
                attr.dispose();
            }
            let n = n + inner.rattrs.dispose_all();
            inner.overlays.dispose_all();
            inner.damage = None;
            n
        };
        self.removal.disposed.store(true, Ordering::Release);
        drop(self.removal.signal.lock().take());
        self.updated();
        tracing::debug!(object = %self.id, attributes = disposed, "object disposed");
        disposed
    }

    /// Detaches from every slot and removes every placement node. Failures
    /// are logged so that the remaining slots are still released.
    fn detach_everywhere(&self, inner: &mut ObjectInner) {
        let slots: Vec<SlotId> = inner.slots.iter().map(|s| s.id()).collect();
        for slot in slots {
            if let Err(e) = self.detach_locked(inner, slot) {
                tracing::warn!(object = %self.id, slot = slot.0, error = %e, "detach on dispose failed");
            }
        }
        for p in std::mem::take(&mut inner.placed) {
            if let Err(e) = p.placed.remove() {
                tracing::warn!(object = %self.id, parent = p.parent.0, error = %e, "placement node removal failed");
            }
        }
    }

    /// Blocks until the object is disposed, for at most the removal wait.
    /// Returns whether it was disposed.
    #[must_use]
    pub fn await_removal(&self) -> bool {
        self.await_removal_for(Duration::from_millis(REMOVAL_WAIT_MS))
    }

    /// [`GameObject::await_removal`] with an explicit bound.
    #[must_use]
    pub fn await_removal_for(&self, timeout: Duration) -> bool {
        if self.is_disposed() {
            return true;
        }
        match self.removal.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => self.is_disposed(),
        }
    }
}

impl fmt::Debug for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameObject")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
