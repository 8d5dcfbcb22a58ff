//! Tile and voxel coordinate spaces.
//!
//! Tile space addresses whole map cells. Voxel space subdivides each tile
//! into a 16×16×24 block and is used by the raycasting routines only.

use glam::{ivec3, IVec3};

/// Integer (x, y, z) triple in tile space.
pub type Position = IVec3;

/// Horizontal voxel subdivision of a tile edge.
pub const TILE_SIZE: i32 = 16;

/// Vertical voxel subdivision of a tile.
pub const TILE_HEIGHT: i32 = 24;

/// Voxel of the bottom north-west corner of a tile.
pub fn tile_to_voxel(pos: Position) -> IVec3 {
    ivec3(pos.x * TILE_SIZE, pos.y * TILE_SIZE, pos.z * TILE_HEIGHT)
}

/// Voxel in the middle of a tile's floor plan, `z` voxels above its base.
pub fn tile_center_voxel(pos: Position, z: i32) -> IVec3 {
    tile_to_voxel(pos) + ivec3(TILE_SIZE / 2, TILE_SIZE / 2, z)
}

/// Tile containing the given voxel.
pub fn voxel_to_tile(voxel: IVec3) -> Position {
    ivec3(
        voxel.x.div_euclid(TILE_SIZE),
        voxel.y.div_euclid(TILE_SIZE),
        voxel.z.div_euclid(TILE_HEIGHT),
    )
}

/// Horizontal distance between two tiles, rounded to whole tiles.
pub fn distance(a: Position, b: Position) -> i32 {
    let (dx, dy) = ((a.x - b.x) as f64, (a.y - b.y) as f64);
    (dx * dx + dy * dy).sqrt().round() as i32
}

/// Squared distance between two tiles.
///
/// With `consider_z` unset the vertical component is ignored, matching the
/// horizontal view-distance cutoff.
pub fn distance_sq(a: Position, b: Position, consider_z: bool) -> i32 {
    let d = a - b;
    let z = if consider_z { d.z * d.z } else { 0 };
    d.x * d.x + d.y * d.y + z
}

/// Facing direction (`DIR_8` index) from one tile towards another.
pub fn direction_to(a: Position, b: Position) -> usize {
    use util::VecExt;
    (b - a).to_dir8()
}
