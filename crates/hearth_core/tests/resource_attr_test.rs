//! # Resource-Backed Attribute Integration Tests

mod common;

use std::sync::Arc;

use common::{tag_resource, world, Tag, TagFactory};
use hearth_core::{GobError, ResAttrKind};
use hearth_shared::{Coord2d, Message, ObjectId, ResRef};

#[test]
fn test_identical_payload_does_not_rebuild() {
    let w = world();
    let tags = Arc::new(TagFactory::default());
    w.resources.define(ResRef(1), tag_resource("ui/tag", &tags));
    let obj = w.cache.create(ObjectId(1), Coord2d::ZERO);

    obj.set_res_attr(ResRef(1), Message::from(vec![7])).unwrap();
    obj.set_res_attr(ResRef(1), Message::from(vec![7])).unwrap();
    assert_eq!(tags.builds(), 1);
    assert_eq!(tags.disposed(), 0);
}

#[test]
fn test_in_place_update_preferred_over_rebuild() {
    let w = world();
    let tags = Arc::new(TagFactory {
        accept_update: true,
        ..TagFactory::default()
    });
    w.resources.define(ResRef(1), tag_resource("ui/tag", &tags));
    let obj = w.cache.create(ObjectId(1), Coord2d::ZERO);

    obj.set_res_attr(ResRef(1), Message::from(vec![1])).unwrap();
    obj.set_res_attr(ResRef(1), Message::from(vec![2])).unwrap();
    assert_eq!(tags.builds(), 1);
    assert_eq!(obj.with_res_attr(|t: &Tag| t.updates), Some(1));
    assert_eq!(
        obj.with_res_attr(|t: &Tag| t.payload.clone()),
        Some(Message::from(vec![2]))
    );
}

#[test]
fn test_rejected_update_rebuilds_and_disposes_old() {
    let w = world();
    let tags = Arc::new(TagFactory::default());
    w.resources.define(ResRef(1), tag_resource("ui/tag", &tags));
    let obj = w.cache.create(ObjectId(1), Coord2d::ZERO);

    obj.set_res_attr(ResRef(1), Message::from(vec![1])).unwrap();
    obj.set_res_attr(ResRef(1), Message::from(vec![2])).unwrap();
    assert_eq!(tags.builds(), 2);
    assert_eq!(tags.disposed(), 1);
    assert_eq!(
        obj.with_res_attr(|t: &Tag| t.payload.clone()),
        Some(Message::from(vec![2]))
    );
}

#[test]
fn test_conflicting_resources_keep_first_binding() {
    let w = world();
    let first = Arc::new(TagFactory::default());
    let second = Arc::new(TagFactory::default());
    w.resources.define(ResRef(1), tag_resource("ui/tag-a", &first));
    w.resources.define(ResRef(2), tag_resource("ui/tag-b", &second));
    let obj = w.cache.create(ObjectId(1), Coord2d::ZERO);

    obj.set_res_attr(ResRef(1), Message::from(vec![1])).unwrap();
    let err = obj.set_res_attr(ResRef(2), Message::from(vec![2])).unwrap_err();
    match err {
        GobError::ConflictingResource { family, current, incoming } => {
            assert_eq!(family, Tag::FAMILY.name());
            assert_eq!(current, ResRef(1));
            assert_eq!(incoming, ResRef(2));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(first.disposed(), 0);
    assert_eq!(second.disposed(), 1);
    assert_eq!(obj.pending_res_attrs(), 0);
    assert_eq!(
        obj.with_res_attr(|t: &Tag| t.payload.clone()),
        Some(Message::from(vec![1]))
    );
}

#[test]
fn test_pending_update_replays_once_resource_loads() {
    let w = world();
    let tags = Arc::new(TagFactory::default());
    w.resources.pending(ResRef(3));
    let obj = w.cache.create(ObjectId(1), Coord2d::ZERO);

    obj.set_res_attr(ResRef(3), Message::from(vec![9])).unwrap();
    assert_eq!(obj.pending_res_attrs(), 1);
    obj.advance(0.05).unwrap();
    assert_eq!(obj.pending_res_attrs(), 1);

    w.resources.complete(ResRef(3), tag_resource("ui/tag", &tags));
    obj.advance(0.05).unwrap();
    assert_eq!(obj.pending_res_attrs(), 0);
    assert_eq!(tags.builds(), 1);
    assert!(obj.with_res_attr(|_: &Tag| ()).is_some());
}

#[test]
fn test_removal_cancels_pending_update() {
    let w = world();
    let tags = Arc::new(TagFactory::default());
    w.resources.pending(ResRef(3));
    let obj = w.cache.create(ObjectId(1), Coord2d::ZERO);

    obj.set_res_attr(ResRef(3), Message::from(vec![9])).unwrap();
    obj.del_res_attr(ResRef(3)).unwrap();
    w.resources.complete(ResRef(3), tag_resource("ui/tag", &tags));
    obj.advance(0.05).unwrap();

    assert_eq!(tags.builds(), 0);
    assert!(obj.with_res_attr(|_: &Tag| ()).is_none());
}

#[test]
fn test_resource_without_factory_is_an_error() {
    let w = world();
    w.resources.define(ResRef(4), hearth_core::Resource::new("gfx/plain"));
    let obj = w.cache.create(ObjectId(1), Coord2d::ZERO);
    assert!(matches!(
        obj.set_res_attr(ResRef(4), Message::empty()),
        Err(GobError::NoFactory { .. })
    ));
    assert_eq!(obj.pending_res_attrs(), 0);
}
