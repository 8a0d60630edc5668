//! # Object Cache
//!
//! The live set of objects. Drives their ticks, removes virtual objects
//! that have nothing left to show, and isolates failures: an object whose
//! tick hits a consistency violation is logged once and stops updating,
//! without disturbing the rest.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use hearth_shared::{Coord2d, ObjectId, FIRST_VIRTUAL_ID};
use parking_lot::Mutex;

use crate::error::GobError;
use crate::glob::Glob;
use crate::object::GameObject;
use crate::scene::Frame;

/// Outcome of one simulation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Objects ticked.
    pub ticked: usize,
    /// Objects removed because they asked to be.
    pub removed: Vec<ObjectId>,
    /// Objects that failed this pass and stopped updating.
    pub faulted: Vec<ObjectId>,
}

/// Live objects of one world.
pub struct ObjectCache {
    glob: Arc<Glob>,
    next_virtual: AtomicI64,
    faulted: Mutex<HashSet<ObjectId>>,
}

impl ObjectCache {
    /// Creates an empty cache over `glob`.
    #[must_use]
    pub fn new(glob: Arc<Glob>) -> Self {
        Self {
            glob,
            next_virtual: AtomicI64::new(FIRST_VIRTUAL_ID),
            faulted: Mutex::new(HashSet::new()),
        }
    }

    /// World context.
    #[inline]
    #[must_use]
    pub fn glob(&self) -> &Arc<Glob> {
        &self.glob
    }

    /// Returns the object with `id`, creating it at `position` if absent.
    pub fn create(&self, id: ObjectId, position: Coord2d) -> Arc<GameObject> {
        if let Some(existing) = self.glob.objects().get(id) {
            return existing;
        }
        let obj = GameObject::new(Arc::clone(&self.glob), id, position);
        self.glob.objects().insert(Arc::clone(&obj));
        tracing::debug!(object = %id, "object created");
        obj
    }

    /// Creates a local object with a fresh negative id.
    pub fn create_virtual(&self, position: Coord2d) -> Arc<GameObject> {
        let id = ObjectId(self.next_virtual.fetch_sub(1, Ordering::Relaxed));
        self.create(id, position)
    }

    /// Live object by id.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<Arc<GameObject>> {
        self.glob.objects().get(id)
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glob.objects().len()
    }

    /// Whether no objects are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glob.objects().is_empty()
    }

    /// Whether `id` stopped updating after a failure.
    #[must_use]
    pub fn is_faulted(&self, id: ObjectId) -> bool {
        self.faulted.lock().contains(&id)
    }

    /// Removes and disposes an object.
    pub fn remove(&self, id: ObjectId) -> Option<Arc<GameObject>> {
        let obj = self.glob.objects().remove(id)?;
        self.faulted.lock().remove(&id);
        obj.dispose();
        Some(obj)
    }

    fn fault(&self, id: ObjectId, error: &GobError) -> bool {
        let first = self.faulted.lock().insert(id);
        if first {
            tracing::error!(object = %id, error = %error, "object update failed; object stops updating");
        }
        first
    }

    fn live(&self) -> Vec<Arc<GameObject>> {
        let faulted = self.faulted.lock().clone();
        self.glob
            .objects()
            .snapshot()
            .into_iter()
            .filter(|o| !faulted.contains(&o.id()))
            .collect()
    }

    /// Simulation pass over every healthy object.
    pub fn ctick(&self, dt: f64) -> TickReport {
        let mut report = TickReport::default();
        for obj in self.live() {
            report.ticked += 1;
            match obj.advance(dt) {
                Ok(false) => {}
                Ok(true) => {
                    self.remove(obj.id());
                    tracing::debug!(object = %obj.id(), "empty virtual object removed");
                    report.removed.push(obj.id());
                }
                Err(GobError::Disposed(_)) => {
                    self.glob.objects().remove(obj.id());
                }
                Err(e) => {
                    if self.fault(obj.id(), &e) {
                        report.faulted.push(obj.id());
                    }
                }
            }
        }
        report
    }

    /// Non-simulation pass over every healthy object.
    pub fn tick(&self) {
        for obj in self.live() {
            if let Err(e) = obj.tick() {
                if !matches!(e, GobError::Disposed(_)) {
                    self.fault(obj.id(), &e);
                }
            }
        }
    }

    /// Placement pass. Returns how many placements were published.
    pub fn placement_tick(&self) -> usize {
        let mut published = 0;
        for obj in self.live() {
            match obj.update_placement() {
                Ok(true) => published += 1,
                Ok(false) | Err(GobError::Disposed(_)) => {}
                Err(e) => {
                    self.fault(obj.id(), &e);
                }
            }
        }
        published
    }

    /// Render pass over every healthy object.
    pub fn gtick(&self, frame: &mut Frame) {
        for obj in self.live() {
            obj.prepare_draw(frame);
        }
    }

    /// Re-evaluates every hitbox against the current display settings.
    pub fn refresh_hitboxes(&self) {
        for obj in self.live() {
            if let Err(e) = obj.refresh_hitbox() {
                if !e.is_loading() && !matches!(e, GobError::Disposed(_)) {
                    self.fault(obj.id(), &e);
                }
            }
        }
    }

    /// Removes and disposes every object.
    pub fn clear(&self) {
        for obj in self.glob.objects().drain() {
            obj.dispose();
        }
        self.faulted.lock().clear();
    }
}

impl Drop for ObjectCache {
    fn drop(&mut self) {
        self.clear();
    }
}
