//! Shared fixtures for the object core integration tests.

#![allow(dead_code)]

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use hearth_core::{
    AttrFactory, AttrFamily, Attribute, DisplaySettings, Deferred, FlatTerrain, Glob, GobResult, MakeResAttr,
    MockGraph, MockResources, ObjectCache, Op, Owner, ResAttr, ResAttrFamily, ResAttrKind, Resource, SetupMod,
    SlotRef, Sprite, SpriteFactory, Terrain,
};
use hearth_shared::{Message, OutboundMessage};

pub struct World {
    pub resources: Arc<MockResources>,
    pub graph: Arc<MockGraph>,
    pub cache: ObjectCache,
    pub session: Receiver<OutboundMessage>,
}

impl World {
    pub fn glob(&self) -> &Arc<Glob> {
        self.cache.glob()
    }
}

pub fn world() -> World {
    world_with(DisplaySettings::default(), Arc::new(FlatTerrain::default()))
}

pub fn world_with(display: DisplaySettings, terrain: Arc<dyn Terrain>) -> World {
    let resources = MockResources::new();
    let (tx, rx) = crossbeam_channel::unbounded();
    let glob = Glob::new(resources.clone(), terrain, display, tx);
    World {
        resources,
        graph: MockGraph::new(),
        cache: ObjectCache::new(glob),
        session: rx,
    }
}

/// Tint op used by modifier-contributing fixtures.
#[derive(Debug, PartialEq)]
pub struct Tint(pub u8);

/// Attribute that counts its disposals and may be a node or a modifier.
pub struct Counted {
    pub family: AttrFamily,
    pub node: bool,
    pub tint: Option<u8>,
    pub disposed: Arc<AtomicUsize>,
}

impl Counted {
    pub fn new(family: &'static str) -> (Self, Arc<AtomicUsize>) {
        let disposed = Arc::new(AtomicUsize::new(0));
        (
            Self {
                family: AttrFamily::new(family),
                node: false,
                tint: None,
                disposed: Arc::clone(&disposed),
            },
            disposed,
        )
    }

    pub fn node(family: &'static str) -> (Self, Arc<AtomicUsize>) {
        let (mut attr, disposed) = Self::new(family);
        attr.node = true;
        (attr, disposed)
    }

    pub fn tinted(family: &'static str, tint: u8) -> Self {
        let (mut attr, _) = Self::new(family);
        attr.tint = Some(tint);
        attr
    }
}

impl Attribute for Counted {
    fn family(&self) -> AttrFamily {
        self.family
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn is_node(&self) -> bool {
        self.node
    }

    fn setup_mod(&self) -> Option<&dyn SetupMod> {
        self.tint.map(|_| self as &dyn SetupMod)
    }

    fn dispose(&mut self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

impl SetupMod for Counted {
    fn gob_state(&self) -> Deferred<Option<Op>> {
        Ok(self.tint.map(|t| Arc::new(Tint(t)) as Op))
    }
}

/// Resource-backed attribute that remembers its payload.
pub struct Tag {
    pub payload: Message,
    pub updates: usize,
    accept_update: bool,
    disposed: Arc<AtomicUsize>,
}

impl ResAttr for Tag {
    fn family(&self) -> ResAttrFamily {
        Self::FAMILY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn update(&mut self, payload: &Message) -> bool {
        if self.accept_update {
            self.payload = payload.clone();
            self.updates += 1;
        }
        self.accept_update
    }

    fn dispose(&mut self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

impl ResAttrKind for Tag {
    const FAMILY: ResAttrFamily = ResAttrFamily::new("tag");
}

/// Second resource-backed family.
pub struct Badge {
    disposed: Arc<AtomicUsize>,
}

impl ResAttr for Badge {
    fn family(&self) -> ResAttrFamily {
        Self::FAMILY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dispose(&mut self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

impl ResAttrKind for Badge {
    const FAMILY: ResAttrFamily = ResAttrFamily::new("badge");
}

/// Factory for [`Tag`] or [`Badge`], counting builds and disposals.
#[derive(Default)]
pub struct TagFactory {
    pub badge: bool,
    pub accept_update: bool,
    pub builds: AtomicUsize,
    pub disposed: Arc<AtomicUsize>,
}

impl TagFactory {
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl MakeResAttr for TagFactory {
    fn make(&self, _owner: &Owner<'_>, payload: &Message) -> GobResult<Box<dyn ResAttr>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let disposed = Arc::clone(&self.disposed);
        if self.badge {
            Ok(Box::new(Badge { disposed }))
        } else {
            Ok(Box::new(Tag {
                payload: payload.clone(),
                updates: 0,
                accept_update: self.accept_update,
                disposed,
            }))
        }
    }
}

pub fn tag_resource(name: &str, factory: &Arc<TagFactory>) -> Resource {
    Resource::new(name).with_attr(AttrFactory::Factory(Arc::clone(factory) as Arc<dyn MakeResAttr>))
}

/// Sprite that finishes after a fixed number of ticks.
pub struct Finite {
    pub left: u32,
    pub removable_when_persistent: bool,
    pub tint: Option<u8>,
}

impl Finite {
    pub fn new(left: u32) -> Self {
        Self {
            left,
            removable_when_persistent: false,
            tint: None,
        }
    }
}

impl Sprite for Finite {
    fn attach(&mut self, _slot: &SlotRef) -> GobResult<()> {
        Ok(())
    }

    fn tick(&mut self, _dt: f64) -> bool {
        self.left = self.left.saturating_sub(1);
        self.left == 0
    }

    fn setup_mod(&self) -> Option<&dyn SetupMod> {
        self.tint.map(|_| self as &dyn SetupMod)
    }

    fn removable_when_persistent(&self) -> bool {
        self.removable_when_persistent
    }
}

impl SetupMod for Finite {
    fn gob_state(&self) -> Deferred<Option<Op>> {
        Ok(self.tint.map(|t| Arc::new(Tint(t)) as Op))
    }
}

fn spark(_owner: &Owner<'_>, _res: &Resource, _payload: &Message) -> GobResult<Box<dyn Sprite>> {
    Ok(Box::new(Finite::new(u32::MAX)))
}

/// Resource whose sprite never finishes on its own.
pub fn sprite_resource(name: &str) -> Resource {
    Resource::new(name).with_sprite(SpriteFactory::Constructor(spark))
}

pub fn root(world: &World) -> SlotRef {
    world.graph.root()
}
