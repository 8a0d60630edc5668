//! # Hearth Core
//!
//! Keeps every world object's visible state in step with what the server
//! says about it, once per frame, without republishing anything that did
//! not change.
//!
//! ## Architecture Rules
//!
//! 1. **Missing data suspends** - anything still loading returns
//!    [`Loading`]; tick-driven callers retry next tick
//! 2. **Publish on change** - render state and placement are immutable
//!    snapshots, pushed to the scene graph only when they differ
//! 3. **Fail per object** - a consistency violation stops one object, not
//!    the frame
//!
//! ## Example
//!
//! ```rust,ignore
//! use hearth_core::{Glob, ObjectCache, FlatTerrain, MockResources};
//!
//! let (glob, _session) = Glob::headless(MockResources::new(), Arc::new(FlatTerrain::default()));
//! let cache = ObjectCache::new(glob);
//! let obj = cache.create(ObjectId(5), Coord2d::ZERO);
//! cache.ctick(0.05);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod attr;
pub mod cache;
pub mod damage;
pub mod deferred;
pub mod error;
pub mod glob;
pub mod object;
pub mod overlay;
pub mod placement;
pub mod resattr;
pub mod resource;
pub mod scene;
pub mod state;
pub mod terrain;

pub use attr::{
    AttrFamily, AttrKind, AttrStore, Attribute, DrawOffset, Drawable, Following, Highlight, HighlightTint, Hitbox,
    HitboxOutline, InfoLabel, LinMove, ModKey, ModSet, Moving, ResDrawable, SetupMod,
};
pub use cache::{ObjectCache, TickReport};
pub use damage::DamageInfo;
pub use deferred::{Callback, Deferred, LoadCell, Loading, WaitFor, WaitQueue, Waiting};
pub use error::{GobError, GobResult};
pub use glob::{DisplaySettings, Glob, ObjectRegistry};
pub use object::{GameObject, Owner};
pub use overlay::{Overlay, OverlayKey, OverlaySet, Sprite};
pub use placement::Placement;
pub use resattr::{Cell, ResAttr, ResAttrCache, ResAttrFamily, ResAttrKind};
pub use resource::mock::MockResources;
pub use resource::{AttrFactory, MakeResAttr, MakeSprite, ResAttrCtor, Resource, ResourceSource, SpriteCtor, SpriteFactory};
pub use scene::mock::{MockGraph, MockSlot};
pub use scene::{Attachments, Frame, NodeKey, Op, PipeOp, Slot, SlotId, SlotRef};
pub use state::{ClickNode, ClickTarget, GobState, SnapshotCache, TickMarker};
pub use terrain::{FlatTerrain, GatedTerrain, Terrain, TileState};
