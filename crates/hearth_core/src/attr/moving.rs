use std::any::Any;

use hearth_shared::{Coord2d, Coord3f, ObjectId};

use super::{AttrFamily, AttrKind, Attribute, Moving};
use crate::deferred::Deferred;
use crate::object::Owner;
use crate::scene::Op;

/// Straight-line motion at constant velocity.
#[derive(Debug, Clone)]
pub struct LinMove {
    from: Coord2d,
    velocity: Coord2d,
    elapsed: f64,
    duration: f64,
}

impl LinMove {
    /// Moves from `from` by `velocity` per second for `duration` seconds.
    #[must_use]
    pub fn new(from: Coord2d, velocity: Coord2d, duration: f64) -> Self {
        Self {
            from,
            velocity,
            elapsed: 0.0,
            duration,
        }
    }

    /// Ground position now.
    #[must_use]
    pub fn position(&self) -> Coord2d {
        self.from + self.velocity * self.elapsed.min(self.duration)
    }

    /// Whether the motion has run its course.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

impl Attribute for LinMove {
    fn family(&self) -> AttrFamily {
        Self::FAMILY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn ctick(&mut self, _owner: &Owner<'_>, dt: f64) {
        self.elapsed += dt;
    }

    fn as_moving(&self) -> Option<&dyn Moving> {
        Some(self)
    }

    fn as_moving_mut(&mut self) -> Option<&mut dyn Moving> {
        Some(self)
    }
}

impl AttrKind for LinMove {
    const FAMILY: AttrFamily = AttrFamily::MOVING;
}

impl Moving for LinMove {
    fn coordinate(&self, owner: &Owner<'_>) -> Deferred<Coord3f> {
        let pos = self.position();
        Ok(Coord3f::from_ground(pos, owner.glob.terrain().ground_z(pos)?))
    }

    fn velocity(&self) -> f64 {
        if self.finished() {
            0.0
        } else {
            self.velocity.dist(Coord2d::ZERO)
        }
    }

    fn moved(&mut self, to: Coord2d) {
        self.from = to;
        self.elapsed = 0.0;
    }
}

/// Rides along with another object.
///
/// Placement borrows the target's committed placement instead of computing
/// its own.
#[derive(Debug, Clone, Copy)]
pub struct Following {
    target: ObjectId,
}

impl Following {
    /// Follows `target`.
    #[must_use]
    pub fn new(target: ObjectId) -> Self {
        Self { target }
    }

    /// The followed object.
    #[must_use]
    pub fn target(&self) -> ObjectId {
        self.target
    }
}

impl Attribute for Following {
    fn family(&self) -> AttrFamily {
        Self::FAMILY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_moving(&self) -> Option<&dyn Moving> {
        Some(self)
    }

    fn as_moving_mut(&mut self) -> Option<&mut dyn Moving> {
        Some(self)
    }
}

impl AttrKind for Following {
    const FAMILY: AttrFamily = AttrFamily::MOVING;
}

impl Moving for Following {
    fn coordinate(&self, owner: &Owner<'_>) -> Deferred<Coord3f> {
        let target = owner.glob.objects().require(self.target)?;
        match target.placement().and_then(|p| p.origin()) {
            Some(c) => Ok(c),
            None => Err(target.data_loading("followed object not placed")),
        }
    }

    fn transform(&self, owner: &Owner<'_>) -> Deferred<Option<Op>> {
        let target = owner.glob.objects().require(self.target)?;
        match target.placement() {
            Some(p) => Ok(Some(p as Op)),
            None => Err(target.data_loading("followed object not placed")),
        }
    }
}
