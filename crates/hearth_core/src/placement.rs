//! # Placement Snapshots
//!
//! Where an object sits in the world: either borrowed wholesale from an
//! object it follows, or computed from its own origin and heading. Tile
//! state and placement modifiers ride along either way.

use hearth_shared::Coord3f;

use crate::scene::{op_eq, Op};

/// Placement snapshot.
#[derive(Debug)]
pub struct Placement {
    follow: Option<Op>,
    origin: Option<Coord3f>,
    angle: f64,
    tile_state: Option<Op>,
    mods: Option<Op>,
}

impl Placement {
    /// Placement borrowed from a followed object.
    #[must_use]
    pub fn following(transform: Op, tile_state: Option<Op>, mods: Option<Op>) -> Self {
        Self {
            follow: Some(transform),
            origin: None,
            angle: 0.0,
            tile_state,
            mods,
        }
    }

    /// Placement at `origin` facing `angle`.
    #[must_use]
    pub fn at(origin: Coord3f, angle: f64, tile_state: Option<Op>, mods: Option<Op>) -> Self {
        Self {
            follow: None,
            origin: Some(origin),
            angle,
            tile_state,
            mods,
        }
    }

    /// World-space origin; `None` when following.
    #[must_use]
    pub fn origin(&self) -> Option<Coord3f> {
        self.origin
    }

    /// Render-space position (Y mirrored); `None` when following.
    #[must_use]
    pub fn render_position(&self) -> Option<Coord3f> {
        self.origin.map(Coord3f::flip_y)
    }

    /// Heading in radians.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Borrowed transform, when following.
    #[must_use]
    pub fn follow(&self) -> Option<&Op> {
        self.follow.as_ref()
    }

    /// Tile-dependent state.
    #[must_use]
    pub fn tile_state(&self) -> Option<&Op> {
        self.tile_state.as_ref()
    }

    /// Composed placement modifiers.
    #[must_use]
    pub fn mods(&self) -> Option<&Op> {
        self.mods.as_ref()
    }
}

/// A following placement equals another only if both borrow the very same
/// transform instance; otherwise origin and heading decide.
impl PartialEq for Placement {
    #[allow(clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        let position = match (&self.follow, &other.follow) {
            (Some(a), Some(b)) => std::sync::Arc::ptr_eq(a, b),
            (Some(_), None) => false,
            (None, _) => self.origin == other.origin && self.angle == other.angle,
        };
        position
            && op_eq(self.tile_state.as_ref(), other.tile_state.as_ref())
            && op_eq(self.mods.as_ref(), other.mods.as_ref())
    }
}
