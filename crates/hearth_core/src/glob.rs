//! # World Context
//!
//! [`Glob`] bundles what every object reaches for: resources, terrain,
//! display settings, the outbound session channel, and the registry of
//! live objects (needed to resolve follow targets).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use hearth_shared::{ObjectId, OutboundMessage};
use parking_lot::RwLock;

use crate::deferred::{Loading, WaitFor, WaitQueue};
use crate::object::GameObject;
use crate::resource::ResourceSource;
use crate::terrain::Terrain;

/// Display toggles the object core consults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    /// Attach hitbox outlines to objects.
    pub show_hitboxes: bool,
    /// Also outline virtual objects that are placement previews.
    pub hitbox_on_previews: bool,
    /// Render info labels.
    pub show_info_labels: bool,
    /// Overlay resource whose payload carries a damage number.
    pub damage_resource: String,
    /// Overlay resource that turns on radius display.
    pub radius_resource: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_hitboxes: false,
            hitbox_on_previews: true,
            show_info_labels: false,
            damage_resource: "gfx/fx/floatimg".into(),
            radius_resource: "gfx/fx/msrad".into(),
        }
    }
}

/// Registry of live objects by id.
#[derive(Default)]
pub struct ObjectRegistry {
    objects: RwLock<HashMap<ObjectId, Arc<GameObject>>>,
    arrivals: Arc<WaitQueue>,
}

impl ObjectRegistry {
    /// Looks up a live object.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<Arc<GameObject>> {
        self.objects.read().get(&id).cloned()
    }

    /// Looks up a live object, deferring until it shows up.
    ///
    /// # Errors
    ///
    /// [`Loading`] that wakes on the next registration.
    pub fn require(&self, id: ObjectId) -> Result<Arc<GameObject>, Loading> {
        self.get(id).ok_or_else(|| {
            Loading::new(
                format!("waiting for object {id}"),
                Arc::new(Arc::clone(&self.arrivals)) as Arc<dyn WaitFor>,
            )
        })
    }

    /// Point-in-time copy of every live object.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<GameObject>> {
        let mut all: Vec<_> = self.objects.read().values().cloned().collect();
        all.sort_by_key(|o| o.id());
        all
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether no objects are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn insert(&self, obj: Arc<GameObject>) -> Option<Arc<GameObject>> {
        let prev = self.objects.write().insert(obj.id(), obj);
        self.arrivals.notify();
        prev
    }

    pub(crate) fn remove(&self, id: ObjectId) -> Option<Arc<GameObject>> {
        self.objects.write().remove(&id)
    }

    pub(crate) fn drain(&self) -> Vec<Arc<GameObject>> {
        self.objects.write().drain().map(|(_, o)| o).collect()
    }
}

/// Shared world context.
pub struct Glob {
    resources: Arc<dyn ResourceSource>,
    terrain: Arc<dyn Terrain>,
    display: RwLock<DisplaySettings>,
    session: Sender<OutboundMessage>,
    objects: ObjectRegistry,
    radius_shown: AtomicBool,
}

impl Glob {
    /// Creates a context around its collaborators.
    pub fn new(
        resources: Arc<dyn ResourceSource>,
        terrain: Arc<dyn Terrain>,
        display: DisplaySettings,
        session: Sender<OutboundMessage>,
    ) -> Arc<Self> {
        Arc::new(Self {
            resources,
            terrain,
            display: RwLock::new(display),
            session,
            objects: ObjectRegistry::default(),
            radius_shown: AtomicBool::new(false),
        })
    }

    /// Creates a context with default display settings, plus the receiving
    /// end of its session channel.
    pub fn headless(
        resources: Arc<dyn ResourceSource>,
        terrain: Arc<dyn Terrain>,
    ) -> (Arc<Self>, Receiver<OutboundMessage>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(resources, terrain, DisplaySettings::default(), tx), rx)
    }

    /// Resource source.
    #[inline]
    #[must_use]
    pub fn resources(&self) -> &dyn ResourceSource {
        &*self.resources
    }

    /// Terrain.
    #[inline]
    #[must_use]
    pub fn terrain(&self) -> &dyn Terrain {
        &*self.terrain
    }

    /// Current display settings.
    #[must_use]
    pub fn display(&self) -> DisplaySettings {
        self.display.read().clone()
    }

    /// Replaces the display settings.
    pub fn set_display(&self, display: DisplaySettings) {
        *self.display.write() = display;
    }

    /// Live objects.
    #[inline]
    #[must_use]
    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    /// Queues a message for the server. Dropped if the session is gone.
    pub fn send(&self, msg: OutboundMessage) {
        if self.session.send(msg).is_err() {
            tracing::debug!("session closed; outbound message dropped");
        }
    }

    /// Turns radius display on. Returns `true` the first time.
    pub fn show_radius(&self) -> bool {
        !self.radius_shown.swap(true, Ordering::AcqRel)
    }

    /// Whether radius display was turned on.
    #[must_use]
    pub fn radius_shown(&self) -> bool {
        self.radius_shown.load(Ordering::Acquire)
    }
}
