//! # Frame Driver End-to-End Tests
//!
//! Decoded updates go in through the event channel; publish counts come
//! out of the recording scene graph.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use hearth::{ClientConfig, EventChannel, ObjectEvent, TickDriver};
use hearth_core::{AttrFamily, FlatTerrain, Glob, MockGraph, MockResources, ResDrawable, Resource};
use hearth_shared::{Coord2d, Message, ObjectId, OutboundMessage, ResRef};

struct Client {
    driver: TickDriver,
    events: EventChannel<ObjectEvent>,
    resources: Arc<MockResources>,
    graph: Arc<MockGraph>,
    _session: Receiver<OutboundMessage>,
    dt: f64,
}

impl Client {
    fn send(&self, event: ObjectEvent) {
        self.events.send(event).unwrap();
    }

    fn body(&self, id: i64, res: u32) {
        self.send(ObjectEvent::set_attr(ObjectId(id), move || {
            ResDrawable::new(ResRef(res), Message::empty())
        }));
    }
}

fn client(toml: &str) -> Client {
    let config = ClientConfig::from_toml_str(toml).unwrap();
    let resources = MockResources::new();
    resources.define(
        ResRef(1),
        Resource::new("gfx/terobjs/crate").with_bounds(Coord2d::new(-2.0, -2.0), Coord2d::new(2.0, 2.0)),
    );
    let (tx, session) = crossbeam_channel::unbounded();
    let glob = Glob::new(
        resources.clone(),
        Arc::new(FlatTerrain::default()),
        config.display_settings(),
        tx,
    );
    let events = EventChannel::unbounded();
    let driver = TickDriver::new(glob, events.receiver(), config.timing.clone());
    Client {
        driver,
        events,
        resources,
        graph: MockGraph::new(),
        _session: session,
        dt: config.timing.sim_period(),
    }
}

const EVERY_FRAME: &str = "[timing]\nsim_tick_hz = 16.0\nplacement_tick_hz = 16.0\n";

#[test]
fn test_object_lifecycle_publishes_only_on_change() {
    let mut c = client(EVERY_FRAME);
    c.send(ObjectEvent::Create {
        id: ObjectId(5),
        position: Coord2d::ZERO,
    });
    let stats = c.driver.frame(c.dt);
    assert_eq!(stats.applied, 1);
    let obj = c.driver.object(ObjectId(5)).unwrap();

    // Treated as locally owned, so it goes away once it has nothing to show.
    obj.set_virtual(true);
    obj.attach_placed(&c.graph.root()).unwrap();
    let body_slot = obj.slots()[0].id();
    let placed_slot = obj.placement_slots()[0].id();

    c.body(5, 1);
    let stats = c.driver.frame(c.dt);
    assert_eq!(stats.applied, 1);
    assert!(obj.has_attr(AttrFamily::DRAWABLE));
    assert_eq!(c.graph.publish_count(body_slot), 1);
    assert_eq!(obj.render_generation(), 1);

    for _ in 0..3 {
        let stats = c.driver.frame(c.dt);
        assert!(stats.removed.is_empty());
        assert_eq!(stats.placements_published, 0);
    }
    assert_eq!(c.graph.publish_count(body_slot), 1);
    assert_eq!(c.graph.publish_count(placed_slot), 1);

    c.send(ObjectEvent::Move {
        id: ObjectId(5),
        position: Coord2d::new(10.0, 0.0),
        angle: 0.0,
    });
    let stats = c.driver.frame(c.dt);
    assert!(stats.placement_ran);
    assert_eq!(stats.placements_published, 1);
    assert_eq!(c.graph.publish_count(placed_slot), 2);
    assert_eq!(obj.placement_generation(), 2);
    assert_eq!(c.graph.publish_count(body_slot), 1);

    c.send(ObjectEvent::DelAttr {
        id: ObjectId(5),
        family: AttrFamily::DRAWABLE,
    });
    let stats = c.driver.frame(c.dt);
    assert_eq!(stats.removed, vec![ObjectId(5)]);
    assert!(c.driver.object(ObjectId(5)).is_none());
    assert!(obj.is_disposed());
    assert!(c.driver.await_removal(&obj));
}

#[test]
fn test_loading_event_parks_and_keeps_order() {
    let mut c = client(EVERY_FRAME);
    c.resources.pending(ResRef(2));
    c.send(ObjectEvent::Create {
        id: ObjectId(7),
        position: Coord2d::ZERO,
    });
    c.driver.frame(c.dt);
    let obj = c.driver.object(ObjectId(7)).unwrap();
    obj.attach_placed(&c.graph.root()).unwrap();

    c.body(7, 2);
    c.send(ObjectEvent::Move {
        id: ObjectId(7),
        position: Coord2d::new(4.0, 0.0),
        angle: 0.0,
    });
    let stats = c.driver.frame(c.dt);
    assert_eq!(stats.applied, 0);
    assert_eq!(stats.parked, 2);
    assert!(!obj.has_attr(AttrFamily::DRAWABLE));
    assert_eq!(obj.position(), Coord2d::ZERO);

    let stats = c.driver.frame(c.dt);
    assert_eq!(stats.parked, 2);

    c.resources.complete(ResRef(2), Resource::new("gfx/kritter/boar"));
    let stats = c.driver.frame(c.dt);
    assert_eq!(stats.applied, 2);
    assert_eq!(stats.parked, 0);
    assert!(obj.has_attr(AttrFamily::DRAWABLE));
    assert_eq!(obj.position(), Coord2d::new(4.0, 0.0));
}

#[test]
fn test_other_objects_are_not_held_back() {
    let mut c = client(EVERY_FRAME);
    c.resources.pending(ResRef(2));
    for id in [7, 8] {
        c.send(ObjectEvent::Create {
            id: ObjectId(id),
            position: Coord2d::ZERO,
        });
    }
    c.driver.frame(c.dt);
    let waiting = c.driver.object(ObjectId(7)).unwrap();
    waiting.attach_placed(&c.graph.root()).unwrap();

    c.body(7, 2);
    c.send(ObjectEvent::Move {
        id: ObjectId(8),
        position: Coord2d::new(1.0, 1.0),
        angle: 0.0,
    });
    let stats = c.driver.frame(c.dt);
    assert_eq!(stats.applied, 1);
    assert_eq!(stats.parked, 1);
    assert_eq!(c.driver.object(ObjectId(8)).unwrap().position(), Coord2d::new(1.0, 1.0));
}

#[test]
fn test_removal_discards_parked_events() {
    let mut c = client(EVERY_FRAME);
    c.resources.pending(ResRef(2));
    c.send(ObjectEvent::Create {
        id: ObjectId(7),
        position: Coord2d::ZERO,
    });
    c.driver.frame(c.dt);
    let obj = c.driver.object(ObjectId(7)).unwrap();
    obj.attach_placed(&c.graph.root()).unwrap();

    c.body(7, 2);
    assert_eq!(c.driver.frame(c.dt).parked, 1);

    c.send(ObjectEvent::Remove { id: ObjectId(7) });
    let stats = c.driver.frame(c.dt);
    assert_eq!(stats.parked, 0);
    assert_eq!(stats.applied, 1);
    assert!(obj.is_disposed());
    assert!(c.driver.object(ObjectId(7)).is_none());
}

#[test]
fn test_events_for_unknown_objects_are_dropped() {
    let mut c = client(EVERY_FRAME);
    c.send(ObjectEvent::Move {
        id: ObjectId(99),
        position: Coord2d::ZERO,
        angle: 0.0,
    });
    c.send(ObjectEvent::Remove { id: ObjectId(98) });
    let stats = c.driver.frame(c.dt);
    assert_eq!(stats.applied, 0);
    assert_eq!(stats.dropped, 2);
}

#[test]
fn test_overlay_events() {
    let mut c = client(EVERY_FRAME);
    c.resources.pending(ResRef(3));
    c.send(ObjectEvent::Create {
        id: ObjectId(3),
        position: Coord2d::ZERO,
    });
    c.send(ObjectEvent::AddOverlay {
        id: ObjectId(3),
        overlay: 40,
        res: ResRef(3),
        payload: Message::empty(),
        persistent: true,
    });
    c.driver.frame(c.dt);
    let obj = c.driver.object(ObjectId(3)).unwrap();
    let key = obj.find_overlay(40).unwrap();
    assert_eq!(obj.with_overlay(key, |o| o.is_persistent()), Some(true));
    assert_eq!(obj.with_overlay(key, |o| o.is_initialized()), Some(false));

    c.send(ObjectEvent::RemoveOverlay {
        id: ObjectId(3),
        overlay: 40,
    });
    c.send(ObjectEvent::RemoveOverlay {
        id: ObjectId(3),
        overlay: 40,
    });
    let stats = c.driver.frame(c.dt);
    assert_eq!(stats.applied, 2);
    assert_eq!(obj.overlay_count(), 0);
}

#[test]
fn test_display_toggle_refreshes_hitboxes() {
    let mut c = client("[display]\nshow_hitboxes = false\n");
    c.send(ObjectEvent::Create {
        id: ObjectId(11),
        position: Coord2d::ZERO,
    });
    c.body(11, 1);
    c.driver.frame(c.dt);
    let obj = c.driver.object(ObjectId(11)).unwrap();
    assert!(!obj.has_attr(AttrFamily::HITBOX));

    let mut config = ClientConfig::default();
    config.display.show_hitboxes = true;
    c.driver.set_display(config.into_core());
    assert!(obj.has_attr(AttrFamily::HITBOX));
}

#[test]
fn test_placement_runs_at_its_own_cadence() {
    let mut c = client("[timing]\nsim_tick_hz = 16.0\nplacement_tick_hz = 4.0\n");
    let ran: Vec<bool> = (0..8).map(|_| c.driver.frame(c.dt).placement_ran).collect();
    assert_eq!(ran, vec![false, false, false, true, false, false, false, true]);
    assert_eq!(c.driver.frames(), 8);
}
