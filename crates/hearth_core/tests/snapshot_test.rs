//! # Snapshot Publication Integration Tests
//!
//! Render state and placement must reach the scene graph only when they
//! actually change.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{root, world, world_with, Counted};
use hearth_core::{DisplaySettings, DrawOffset, Following, GatedTerrain, LinMove, Op};
use hearth_shared::{ClickKind, Coord, Coord2d, Coord3f, ObjectId, OutboundMessage, POSITION_RESOLUTION};
use rand::RngCore;

#[test]
fn test_render_state_publishes_only_on_change() {
    let w = world();
    let slot = root(&w);
    let obj = w.cache.create(ObjectId(1), Coord2d::ZERO);
    obj.on_attached_to(slot.clone()).unwrap();
    assert_eq!(w.graph.publish_count(slot.id()), 1);

    for _ in 0..3 {
        obj.advance(0.05).unwrap();
    }
    assert_eq!(w.graph.publish_count(slot.id()), 1);

    obj.set_attr(Box::new(Counted::tinted("tint", 1))).unwrap();
    obj.advance(0.05).unwrap();
    assert_eq!(w.graph.publish_count(slot.id()), 2);

    // An equal modifier from a fresh attribute is not a change.
    obj.set_attr(Box::new(Counted::tinted("tint", 1))).unwrap();
    obj.advance(0.05).unwrap();
    assert_eq!(w.graph.publish_count(slot.id()), 2);

    obj.set_attr(Box::new(Counted::tinted("tint", 2))).unwrap();
    obj.advance(0.05).unwrap();
    assert_eq!(w.graph.publish_count(slot.id()), 3);
    assert_eq!(obj.render_generation(), 3);
}

#[test]
fn test_placement_publishes_on_move_only() {
    let w = world();
    let parent = root(&w);
    let obj = w.cache.create(ObjectId(1), Coord2d::ZERO);
    obj.attach_placed(&parent).unwrap();

    let placed = obj.placement_slots();
    assert_eq!(placed.len(), 1);
    assert_eq!(w.graph.publish_count(placed[0].id()), 1);

    assert!(!obj.update_placement().unwrap());
    assert_eq!(w.graph.publish_count(placed[0].id()), 1);

    obj.move_to(Coord2d::new(10.0, 0.0), 0.0);
    assert!(obj.update_placement().unwrap());
    assert_eq!(w.graph.publish_count(placed[0].id()), 2);

    let placement = obj.placement().unwrap();
    assert_eq!(placement.origin(), Some(Coord3f::new(10.0, 0.0, 0.0)));
    assert_eq!(placement.render_position(), Some(Coord3f::new(10.0, -0.0, 0.0)));

    obj.detach_placed(parent.id()).unwrap();
    assert!(!w.graph.is_alive(placed[0].id()));
}

#[test]
fn test_draw_offset_shifts_placement() {
    let w = world();
    let obj = w.cache.create(ObjectId(1), Coord2d::new(1.0, 1.0));
    obj.set_attr(Box::new(DrawOffset(Coord3f::new(0.0, 0.0, 2.0)))).unwrap();
    obj.update_placement().unwrap();
    assert_eq!(obj.placement().unwrap().origin(), Some(Coord3f::new(1.0, 1.0, 2.0)));
}

#[test]
fn test_placement_waits_for_terrain() {
    let terrain = Arc::new(GatedTerrain::new());
    let w = world_with(DisplaySettings::default(), terrain.clone());
    let parent = root(&w);
    let obj = w.cache.create(ObjectId(1), Coord2d::ZERO);

    let err = obj.attach_placed(&parent).unwrap_err();
    assert!(err.is_loading());
    assert!(w.graph.children(parent.id()).is_empty());
    assert!(!obj.update_placement().unwrap());

    terrain.open(4.0);
    obj.attach_placed(&parent).unwrap();
    assert_eq!(obj.placement().unwrap().origin(), Some(Coord3f::new(0.0, 0.0, 4.0)));
}

#[test]
fn test_data_loading_resolves_on_next_update() {
    let w = world();
    let obj = w.cache.create(ObjectId(1), Coord2d::ZERO);
    let hits = Arc::new(AtomicUsize::new(0));

    let waiting = obj.data_loading("object data");
    let h = Arc::clone(&hits);
    let _w = waiting.wait_for(Box::new(move || {
        h.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    obj.updated();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // Registering against a stale sequence fires at once.
    let stale = obj.data_loading("object data");
    obj.updated();
    let h = Arc::clone(&hits);
    let _w = stale.wait_for(Box::new(move || {
        h.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_following_borrows_target_placement() {
    let w = world();
    let leader = w.cache.create(ObjectId(1), Coord2d::new(3.0, 4.0));
    let follower = w.cache.create(ObjectId(2), Coord2d::ZERO);
    follower.set_attr(Box::new(Following::new(ObjectId(1)))).unwrap();

    // Leader not placed yet: the follower waits.
    assert!(!follower.update_placement().unwrap());

    leader.update_placement().unwrap();
    assert!(follower.update_placement().unwrap());
    let borrowed = follower.placement().unwrap();
    let lead: Op = leader.placement().unwrap();
    assert!(Arc::ptr_eq(borrowed.follow().unwrap(), &lead));
    assert_eq!(follower.coordinate().unwrap(), Coord3f::new(3.0, 4.0, 0.0));

    assert!(!follower.update_placement().unwrap());

    leader.move_to(Coord2d::new(5.0, 4.0), 0.0);
    leader.update_placement().unwrap();
    assert!(follower.update_placement().unwrap());
}

#[test]
fn test_linear_motion_reports_velocity_and_position() {
    let w = world();
    let obj = w.cache.create(ObjectId(1), Coord2d::ZERO);
    obj.set_attr(Box::new(LinMove::new(Coord2d::ZERO, Coord2d::new(2.0, 0.0), 1.0)))
        .unwrap();
    assert!((obj.velocity() - 2.0).abs() < 1e-9);

    obj.advance(0.5).unwrap();
    assert_eq!(obj.coordinate().unwrap(), Coord3f::new(1.0, 0.0, 0.0));
    obj.advance(1.0).unwrap();
    assert!(obj.velocity().abs() < 1e-9);
}

#[test]
fn test_click_arguments_and_right_click() {
    let w = world();
    let pos = Coord2d::new(POSITION_RESOLUTION.x * 10.0, POSITION_RESOLUTION.y * 4.0);
    let obj = w.cache.create(ObjectId(8), pos);

    let args = obj.click_args(&[]).unwrap();
    assert_eq!(args.kind, ClickKind::Body);
    assert_eq!(args.position, Coord::new(10, 4));

    obj.right_click();
    match w.session.try_recv().unwrap() {
        OutboundMessage::Click { button, modflags, args, .. } => {
            assert_eq!(button, 3);
            assert_eq!(modflags, 0);
            assert_eq!(args.object, ObjectId(8));
            assert_eq!(args.mesh, -1);
        }
    }

    let ghost = w.cache.create_virtual(pos);
    assert!(ghost.click_args(&[]).is_none());
}

#[test]
fn test_rng_is_seeded_from_id() {
    let w = world();
    let a = w.cache.create(ObjectId(42), Coord2d::ZERO);
    let b = w.cache.create(ObjectId(43), Coord2d::ZERO);
    assert_eq!(a.rng().next_u64(), a.rng().next_u64());
    assert_ne!(a.rng().next_u64(), b.rng().next_u64());
}
