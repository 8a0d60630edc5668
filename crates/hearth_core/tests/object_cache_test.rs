//! # Object Cache Integration Tests
//!
//! Implicit removal of empty virtual objects, per-object fault isolation,
//! and display-driven attributes.

mod common;

use std::sync::Arc;

use common::{tag_resource, world, world_with, TagFactory};
use hearth_core::{AttrFamily, DisplaySettings, FlatTerrain, Hitbox, InfoLabel, Overlay, ResDrawable, Resource};
use hearth_shared::{Coord2d, Message, ObjectId, ResRef};

#[test]
fn test_empty_virtual_object_is_removed() {
    let w = world();
    let ghost = w.cache.create_virtual(Coord2d::ZERO);
    assert!(ghost.id().is_virtual());
    let solid = w.cache.create(ObjectId(1), Coord2d::ZERO);

    let report = w.cache.ctick(0.05);
    assert_eq!(report.removed, vec![ghost.id()]);
    assert!(w.cache.get(ghost.id()).is_none());
    assert!(ghost.is_disposed());
    assert!(w.cache.get(solid.id()).is_some());
}

#[test]
fn test_virtual_object_with_content_is_kept() {
    let w = world();
    w.resources.define(ResRef(1), Resource::new("gfx/terobjs/preview"));
    let ghost = w.cache.create_virtual(Coord2d::ZERO);
    ghost
        .set_attr(Box::new(ResDrawable::new(ResRef(1), Message::empty())))
        .unwrap();

    assert!(w.cache.ctick(0.05).removed.is_empty());
    ghost.del_attr(AttrFamily::DRAWABLE).unwrap();
    ghost
        .add_overlay(Overlay::from_sprite(None, Box::new(common::Finite::new(2))), false)
        .unwrap();
    assert!(w.cache.ctick(0.05).removed.is_empty());
    // The overlay finishes on this tick, leaving nothing to show.
    assert_eq!(w.cache.ctick(0.05).removed, vec![ghost.id()]);
}

#[test]
fn test_consistency_violation_isolates_one_object() {
    let w = world();
    let first = Arc::new(TagFactory::default());
    let second = Arc::new(TagFactory::default());
    w.resources.define(ResRef(1), tag_resource("ui/tag-a", &first));
    w.resources.pending(ResRef(2));

    let bad = w.cache.create(ObjectId(1), Coord2d::ZERO);
    let good = w.cache.create(ObjectId(2), Coord2d::ZERO);
    bad.set_res_attr(ResRef(1), Message::from(vec![1])).unwrap();
    bad.set_res_attr(ResRef(2), Message::from(vec![2])).unwrap();

    w.resources.complete(ResRef(2), tag_resource("ui/tag-b", &second));
    let report = w.cache.ctick(0.05);
    assert_eq!(report.faulted, vec![bad.id()]);
    assert!(w.cache.is_faulted(bad.id()));

    let report = w.cache.ctick(0.05);
    assert_eq!(report.ticked, 1);
    assert!(report.faulted.is_empty());
    assert!(good.advance(0.05).is_ok());
}

#[test]
fn test_hitbox_follows_display_settings() {
    let display = DisplaySettings {
        show_hitboxes: true,
        ..DisplaySettings::default()
    };
    let w = world_with(display, Arc::new(FlatTerrain::default()));
    w.resources.define(
        ResRef(1),
        Resource::new("gfx/terobjs/crate").with_bounds(Coord2d::new(-2.0, -2.0), Coord2d::new(2.0, 2.0)),
    );
    let body = || Box::new(ResDrawable::new(ResRef(1), Message::empty()));

    let real = w.cache.create(ObjectId(1), Coord2d::ZERO);
    real.set_attr(body()).unwrap();
    assert!(real.has_attr(AttrFamily::HITBOX));

    let ghost = w.cache.create_virtual(Coord2d::ZERO);
    ghost.set_attr(body()).unwrap();
    assert!(!ghost.has_attr(AttrFamily::HITBOX));

    let preview = w.cache.create_virtual(Coord2d::ZERO);
    preview.set_preview(true);
    preview.set_attr(body()).unwrap();
    assert!(preview.has_attr(AttrFamily::HITBOX));

    w.glob().set_display(DisplaySettings::default());
    w.cache.refresh_hitboxes();
    assert!(!real.has_attr(AttrFamily::HITBOX));
    assert!(!preview.has_attr(AttrFamily::HITBOX));
}

#[test]
fn test_info_label_renders_when_enabled() {
    let display = DisplaySettings {
        show_info_labels: true,
        ..DisplaySettings::default()
    };
    let w = world_with(display, Arc::new(FlatTerrain::default()));
    let obj = w.cache.create(ObjectId(12), Coord2d::ZERO);
    obj.advance(0.05).unwrap();
    obj.advance(0.05).unwrap();
    assert_eq!(obj.with_attr(|l: &InfoLabel| l.renders()), Some(1));
    assert_eq!(
        obj.with_attr(|l: &InfoLabel| l.text().map(str::to_owned)),
        Some(Some("#12 @ 0,0".to_owned()))
    );
}

#[test]
fn test_remove_and_clear_dispose_objects() {
    let w = world();
    let a = w.cache.create(ObjectId(1), Coord2d::ZERO);
    let b = w.cache.create(ObjectId(2), Coord2d::ZERO);
    assert_eq!(w.cache.len(), 2);
    assert!(Arc::ptr_eq(&w.cache.create(ObjectId(1), Coord2d::ZERO), &a));

    w.cache.remove(ObjectId(1));
    assert!(a.is_disposed());
    w.cache.clear();
    assert!(b.is_disposed());
    assert!(w.cache.is_empty());
}

#[test]
fn test_remove_takes_object_out_of_scene_graph() {
    let w = world();
    w.resources.define(ResRef(1), Resource::new("gfx/terobjs/crate"));
    let parent = w.graph.root();
    let direct = w.graph.root();
    let baseline = w.graph.live_slots();

    let obj = w.cache.create(ObjectId(4), Coord2d::ZERO);
    obj.attach_placed(&parent).unwrap();
    obj.on_attached_to(direct.clone()).unwrap();
    obj.set_attr(Box::new(ResDrawable::new(ResRef(1), Message::empty())))
        .unwrap();
    assert!(w.graph.live_slots() > baseline);

    w.cache.remove(ObjectId(4));
    assert!(obj.is_disposed());
    assert_eq!(w.graph.live_slots(), baseline);
    assert!(w.graph.children(parent.id()).is_empty());
    assert!(w.graph.children(direct.id()).is_empty());
    assert!(obj.slots().is_empty());
    assert!(obj.placement_slots().is_empty());
}

#[test]
fn test_hitbox_nodes_do_not_pile_up_across_reattach() {
    let display = DisplaySettings {
        show_hitboxes: true,
        ..DisplaySettings::default()
    };
    let w = world_with(display, Arc::new(FlatTerrain::default()));
    w.resources.define(
        ResRef(1),
        Resource::new("gfx/terobjs/crate").with_bounds(Coord2d::new(-1.0, -1.0), Coord2d::new(1.0, 1.0)),
    );
    let obj = w.cache.create(ObjectId(9), Coord2d::ZERO);
    obj.set_attr(Box::new(ResDrawable::new(ResRef(1), Message::empty())))
        .unwrap();
    assert_eq!(obj.with_attr(|h: &Hitbox| h.node_count()), Some(0));

    for _ in 0..3 {
        let slot = w.graph.root();
        obj.on_attached_to(slot.clone()).unwrap();
        assert_eq!(obj.with_attr(|h: &Hitbox| h.node_count()), Some(1));
        obj.on_detached_from(slot.id()).unwrap();
        assert_eq!(obj.with_attr(|h: &Hitbox| h.node_count()), Some(0));
    }

    let a = w.graph.root();
    let b = w.graph.root();
    obj.on_attached_to(a.clone()).unwrap();
    obj.on_attached_to(b).unwrap();
    obj.on_detached_from(a.id()).unwrap();
    assert_eq!(obj.with_attr(|h: &Hitbox| h.node_count()), Some(1));
}
