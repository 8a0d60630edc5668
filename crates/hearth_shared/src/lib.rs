//! # Hearth Shared
//!
//! Plain data types used by both the object core and the integration layer.
//!
//! ## Rule
//!
//! Nothing in here locks, ticks or talks to the scene graph. If a type needs
//! behaviour tied to a live object, it belongs in `hearth_core`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;
pub mod protocol;

pub use constants::{FIRST_VIRTUAL_ID, POSITION_RESOLUTION, REMOVAL_WAIT_MS, TILE_SIZE};
pub use math::{Coord, Coord2d, Coord3f};
pub use protocol::{
    ClickArgs, ClickKind, Message, MessageError, MessageReader, ObjectId, OutboundMessage, ResRef,
};
