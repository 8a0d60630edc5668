//! # Frame Driver
//!
//! One call per rendered frame:
//!
//! ```text
//! 1. Apply inbound events (parked ones first, in arrival order)
//! 2. Simulation tick over every live object
//! 3. Placement tick, at its own lower cadence
//! 4. Render tick
//! ```
//!
//! An event that hits missing data is parked until the data's wait fires.
//! Later events for the same object queue behind it so an object never
//! sees its updates out of order.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use hearth_core::{DisplaySettings, Frame, GameObject, Glob, GobError, GobResult, ObjectCache, Overlay, Waiting};
use hearth_shared::ObjectId;

use crate::config::TimingConfig;
use crate::events::ObjectEvent;

/// What one frame did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Events applied this frame.
    pub applied: usize,
    /// Events still waiting for data after this frame.
    pub parked: usize,
    /// Events discarded because they could not apply.
    pub dropped: usize,
    /// Objects ticked.
    pub ticked: usize,
    /// Objects removed by the simulation tick.
    pub removed: Vec<ObjectId>,
    /// Objects that failed and stopped updating.
    pub faulted: Vec<ObjectId>,
    /// Whether the placement tick ran.
    pub placement_ran: bool,
    /// Placements published by the placement tick.
    pub placements_published: usize,
    /// Nodes prepared by the render tick.
    pub prepared: usize,
}

struct Parked {
    event: ObjectEvent,
    ready: Arc<AtomicBool>,
    waiting: Waiting,
}

impl Parked {
    /// Queued only to keep order behind an earlier parked event.
    fn behind(event: ObjectEvent) -> Self {
        Self {
            event,
            ready: Arc::new(AtomicBool::new(true)),
            waiting: Waiting::dummy(),
        }
    }
}

/// Drives one world's objects frame by frame.
pub struct TickDriver {
    cache: ObjectCache,
    inbox: Receiver<ObjectEvent>,
    parked: VecDeque<Parked>,
    timing: TimingConfig,
    placement_clock: f64,
    frame: u64,
}

impl TickDriver {
    /// Creates a driver over a fresh object cache for `glob`.
    #[must_use]
    pub fn new(glob: Arc<Glob>, inbox: Receiver<ObjectEvent>, timing: TimingConfig) -> Self {
        Self {
            cache: ObjectCache::new(glob),
            inbox,
            parked: VecDeque::new(),
            timing,
            placement_clock: 0.0,
            frame: 0,
        }
    }

    /// Live objects.
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    /// Live object by id.
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<Arc<GameObject>> {
        self.cache.get(id)
    }

    /// Events waiting for data.
    #[must_use]
    pub fn parked(&self) -> usize {
        self.parked.len()
    }

    /// Frames run so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frame
    }

    /// Swaps display settings and re-evaluates every hitbox.
    pub fn set_display(&self, display: DisplaySettings) {
        self.cache.glob().set_display(display);
        self.cache.refresh_hitboxes();
    }

    /// Waits, up to the configured bound, for `obj` to be disposed.
    #[must_use]
    pub fn await_removal(&self, obj: &GameObject) -> bool {
        obj.await_removal_for(self.removal_wait())
    }

    /// Configured removal wait.
    #[must_use]
    pub fn removal_wait(&self) -> Duration {
        self.timing.removal_wait()
    }

    /// Runs one frame of `dt` seconds.
    pub fn frame(&mut self, dt: f64) -> FrameStats {
        self.frame += 1;
        let mut stats = FrameStats {
            frame: self.frame,
            ..FrameStats::default()
        };

        self.apply_events(&mut stats);

        let report = self.cache.ctick(dt);
        stats.ticked = report.ticked;
        stats.removed = report.removed;
        stats.faulted = report.faulted;
        self.cache.tick();

        self.placement_clock += dt;
        let period = self.timing.placement_period();
        if self.placement_clock >= period {
            self.placement_clock = (self.placement_clock - period).min(period);
            stats.placement_ran = true;
            stats.placements_published = self.cache.placement_tick();
        }

        let mut frame = Frame::new(self.frame, dt);
        self.cache.gtick(&mut frame);
        stats.prepared = frame.prepared;

        stats.parked = self.parked.len();
        if !stats.faulted.is_empty() {
            tracing::warn!(frame = self.frame, faulted = stats.faulted.len(), "objects faulted this frame");
        }
        stats
    }

    fn apply_events(&mut self, stats: &mut FrameStats) {
        let mut blocked = HashSet::new();
        for parked in std::mem::take(&mut self.parked) {
            let id = parked.event.id();
            if blocked.contains(&id) || !parked.ready.load(Ordering::Acquire) {
                blocked.insert(id);
                self.parked.push_back(parked);
                continue;
            }
            self.apply_or_park(parked.event, &mut blocked, stats);
        }
        while let Ok(event) = self.inbox.try_recv() {
            let id = event.id();
            if matches!(event, ObjectEvent::Remove { .. }) {
                self.unpark(id);
                blocked.remove(&id);
            }
            if blocked.contains(&id) {
                self.parked.push_back(Parked::behind(event));
                continue;
            }
            self.apply_or_park(event, &mut blocked, stats);
        }
    }

    /// Drops parked events of an object that is leaving.
    fn unpark(&mut self, id: ObjectId) {
        let (gone, kept): (VecDeque<_>, VecDeque<_>) =
            std::mem::take(&mut self.parked).into_iter().partition(|p| p.event.id() == id);
        self.parked = kept;
        for parked in gone {
            tracing::debug!(object = %id, event = parked.event.kind(), "parked event discarded on removal");
            parked.waiting.cancel();
        }
    }

    fn apply_or_park(&mut self, event: ObjectEvent, blocked: &mut HashSet<ObjectId>, stats: &mut FrameStats) {
        match self.apply(&event) {
            Ok(true) => stats.applied += 1,
            Ok(false) => {
                tracing::debug!(object = %event.id(), event = event.kind(), "event for unknown object dropped");
                stats.dropped += 1;
            }
            Err(GobError::Loading(loading)) => {
                tracing::trace!(object = %event.id(), event = event.kind(), reason = %loading, "event waiting for data");
                let ready = Arc::new(AtomicBool::new(false));
                let flag = Arc::clone(&ready);
                let waiting = loading.wait_for(Box::new(move || flag.store(true, Ordering::Release)));
                blocked.insert(event.id());
                self.parked.push_back(Parked { event, ready, waiting });
            }
            Err(e) => {
                tracing::warn!(object = %event.id(), event = event.kind(), error = %e, "event rejected");
                stats.dropped += 1;
            }
        }
    }

    /// Applies one event. `Ok(false)` when the object is not live.
    fn apply(&self, event: &ObjectEvent) -> GobResult<bool> {
        let id = event.id();
        if let ObjectEvent::Create { position, .. } = event {
            self.cache.create(id, *position);
            return Ok(true);
        }
        if let ObjectEvent::Remove { .. } = event {
            return Ok(self.cache.remove(id).is_some());
        }
        let Some(obj) = self.cache.get(id) else {
            return Ok(false);
        };
        match event {
            ObjectEvent::Move { position, angle, .. } => obj.move_to(*position, *angle),
            ObjectEvent::SetAttr { make, .. } => obj.set_attr(make())?,
            ObjectEvent::DelAttr { family, .. } => obj.del_attr(*family)?,
            ObjectEvent::SetResAttr { res, payload, .. } => obj.set_res_attr(*res, payload.clone())?,
            ObjectEvent::DelResAttr { res, .. } => obj.del_res_attr(*res)?,
            ObjectEvent::AddOverlay {
                overlay,
                res,
                payload,
                persistent,
                ..
            } => {
                let mut ol = Overlay::from_resource(Some(*overlay), *res, payload.clone());
                if *persistent {
                    ol = ol.persistent();
                }
                obj.add_overlay(ol, true)?;
            }
            ObjectEvent::RemoveOverlay { overlay, .. } => match obj.find_overlay(*overlay) {
                Some(key) => {
                    obj.remove_overlay(key)?;
                }
                None => tracing::trace!(object = %id, overlay, "overlay already gone"),
            },
            ObjectEvent::Create { .. } | ObjectEvent::Remove { .. } => {}
        }
        Ok(true)
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        for parked in self.parked.drain(..) {
            parked.waiting.cancel();
        }
    }
}
