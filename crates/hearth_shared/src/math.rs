//! Coordinate types.
//!
//! Only what the object core needs: integer grid coordinates, world-space
//! 2D positions in `f64`, and render-space 3D points in `f32`.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Integer grid coordinate (tiles, quantized positions, screen points).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct Coord {
    /// X component
    pub x: i32,
    /// Y component
    pub y: i32,
}

impl Coord {
    /// Origin.
    pub const ZERO: Self = Self::new(0, 0);

    /// Creates a new coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// World-space position on the ground plane.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Coord2d {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
}

impl Coord2d {
    /// Origin.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Creates a new position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Quantizes this position to the grid spanned by `res`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn floor(self, res: Self) -> Coord {
        Coord::new((self.x / res.x).floor() as i32, (self.y / res.y).floor() as i32)
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn dist(self, other: Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl std::ops::Add for Coord2d {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Coord2d {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Coord2d {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Render-space point; `z` is height above the ground plane.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Coord3f {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Coord3f {
    /// Origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Lifts a ground position to a point at height `z`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_ground(c: Coord2d, z: f32) -> Self {
        Self::new(c.x as f32, c.y as f32, z)
    }

    /// Mirrors the Y axis (world space to render space).
    #[must_use]
    pub const fn flip_y(self) -> Self {
        Self::new(self.x, -self.y, self.z)
    }

    /// Ground-plane projection of this point.
    #[must_use]
    pub fn ground(self) -> Coord2d {
        Coord2d::new(f64::from(self.x), f64::from(self.y))
    }
}

impl std::ops::Add for Coord3f {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}
