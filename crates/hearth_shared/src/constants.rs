//! Constants agreed with the remote simulation.

use crate::math::Coord2d;

/// World units per map tile edge.
pub const TILE_SIZE: f64 = 11.0;

/// Resolution positions are quantized to when sent back to the server.
pub const POSITION_RESOLUTION: Coord2d = Coord2d::new(TILE_SIZE / 1024.0, TILE_SIZE / 1024.0);

/// Default upper bound a caller waits for an object's removal to be observed.
///
/// This is a liveness guard only. Timing out means "not yet removed".
pub const REMOVAL_WAIT_MS: u64 = 15_000;

/// First id handed out to locally synthesized (virtual) objects.
///
/// Virtual ids count downwards from here.
pub const FIRST_VIRTUAL_ID: i64 = -1;
