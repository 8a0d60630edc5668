//! Terrain queries.
//!
//! Height and per-tile render state both come from map data that streams
//! in, so both may be deferred.

use std::sync::Arc;

use hearth_shared::{Coord, Coord2d, Coord3f, TILE_SIZE};

use crate::deferred::{Deferred, LoadCell};
use crate::scene::Op;

/// Terrain lookups needed to place an object.
pub trait Terrain: Send + Sync {
    /// Ground height under `pos`.
    ///
    /// # Errors
    ///
    /// [`crate::Loading`] while the map cell is not loaded.
    fn ground_z(&self, pos: Coord2d) -> Deferred<f32>;

    /// Tile-dependent render state at `pos`.
    ///
    /// # Errors
    ///
    /// [`crate::Loading`] while the map cell is not loaded.
    fn tile_state(&self, pos: Coord3f) -> Deferred<Option<Op>>;
}

/// Tile state op: which tile an object stands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileState {
    /// Tile coordinate.
    pub tile: Coord,
}

/// Level ground everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatTerrain {
    /// Ground height.
    pub height: f32,
}

impl FlatTerrain {
    #[allow(clippy::cast_possible_truncation)]
    fn tile_of(pos: Coord3f) -> Coord {
        Coord::new(
            (f64::from(pos.x) / TILE_SIZE).floor() as i32,
            (f64::from(pos.y) / TILE_SIZE).floor() as i32,
        )
    }
}

impl Terrain for FlatTerrain {
    fn ground_z(&self, _pos: Coord2d) -> Deferred<f32> {
        Ok(self.height)
    }

    fn tile_state(&self, pos: Coord3f) -> Deferred<Option<Op>> {
        Ok(Some(Arc::new(TileState {
            tile: Self::tile_of(pos),
        })))
    }
}

/// Flat terrain that stays unavailable until [`GatedTerrain::open`].
pub struct GatedTerrain {
    gate: LoadCell<FlatTerrain>,
}

impl GatedTerrain {
    /// Terrain that is not loaded yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gate: LoadCell::pending("terrain"),
        }
    }

    /// Finishes loading.
    pub fn open(&self, height: f32) {
        self.gate.set(FlatTerrain { height });
    }
}

impl Default for GatedTerrain {
    fn default() -> Self {
        Self::new()
    }
}

impl Terrain for GatedTerrain {
    fn ground_z(&self, pos: Coord2d) -> Deferred<f32> {
        self.gate.get()?.ground_z(pos)
    }

    fn tile_state(&self, pos: Coord3f) -> Deferred<Option<Op>> {
        self.gate.get()?.tile_state(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::op_eq;

    #[test]
    fn test_tile_state_follows_tile_boundaries() {
        let t = FlatTerrain::default();
        let a = t.tile_state(Coord3f::new(1.0, 1.0, 0.0)).unwrap();
        let b = t.tile_state(Coord3f::new(10.0, 2.0, 0.0)).unwrap();
        let c = t.tile_state(Coord3f::new(12.0, 2.0, 0.0)).unwrap();
        assert!(op_eq(a.as_ref(), b.as_ref()));
        assert!(!op_eq(a.as_ref(), c.as_ref()));
    }

    #[test]
    fn test_gated_terrain_defers_until_open() {
        let t = GatedTerrain::new();
        assert!(t.ground_z(Coord2d::ZERO).is_err());
        t.open(3.0);
        assert!((t.ground_z(Coord2d::ZERO).unwrap() - 3.0).abs() < f32::EPSILON);
    }
}
