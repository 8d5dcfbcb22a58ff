//! Voxel-level geometry queries.

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Vertical sampling offsets from a unit's center slice, in voxels.
///
/// Approximates a humanoid or vehicle silhouette without full 3D models:
/// scanning the offsets in order tries the center first and fans out
/// towards head and feet.
pub const HEIGHT_FROM_CENTER: [i32; 11] =
    [0, -2, 2, -4, 4, -6, 6, -8, 8, -12, 12];

/// Thickness of wall slabs and floors in voxels.
const SLAB: i32 = 2;

/// Horizontal radius of a unit silhouette in voxels.
const UNIT_RADIUS: i32 = 4;

/// What occupies a single voxel.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum VoxelKind {
    Empty,
    Floor,
    WestWall,
    NorthWall,
    Object,
    Unit(UnitId),
    OutOfBounds,
}

impl VoxelKind {
    pub fn is_blocking(self) -> bool {
        self != VoxelKind::Empty
    }

    /// Tile part slot this voxel belongs to, if terrain.
    pub fn part_kind(self) -> Option<PartKind> {
        match self {
            VoxelKind::Floor => Some(PartKind::Floor),
            VoxelKind::WestWall => Some(PartKind::WestWall),
            VoxelKind::NorthWall => Some(PartKind::NorthWall),
            VoxelKind::Object => Some(PartKind::Object),
            _ => None,
        }
    }
}

impl TileEngine {
    /// Classify the contents of one voxel.
    ///
    /// `exclude` ignores one unit (the shooter tracing its own shot);
    /// `exclude_all_units` ignores every unit; `exclude_all_but` ignores
    /// every unit except the given one (aiming at a specific target).
    pub fn voxel_check(
        &self,
        field: &Battlefield,
        voxel: IVec3,
        exclude: Option<UnitId>,
        exclude_all_units: bool,
        exclude_all_but: Option<UnitId>,
    ) -> VoxelKind {
        let pos = voxel_to_tile(voxel);
        let Some(tile) = field.tile(pos) else {
            return VoxelKind::OutOfBounds;
        };

        // In-tile voxel offsets.
        let ox = voxel.x.rem_euclid(TILE_SIZE);
        let oy = voxel.y.rem_euclid(TILE_SIZE);
        let oz = voxel.z.rem_euclid(TILE_HEIGHT);

        if let Some(def) = field.part_def(pos, PartKind::Floor) {
            if oz < SLAB + def.terrain_level {
                return VoxelKind::Floor;
            }
        }
        if let Some(def) = field.part_def(pos, PartKind::WestWall) {
            if ox < SLAB && !def.is_open {
                return VoxelKind::WestWall;
            }
        }
        if let Some(def) = field.part_def(pos, PartKind::NorthWall) {
            if oy < SLAB && !def.is_open {
                return VoxelKind::NorthWall;
            }
        }
        if let Some(def) = field.part_def(pos, PartKind::Object) {
            let base = field.terrain_level(pos);
            if def.height > 0 && oz >= base && oz < base + def.height {
                return VoxelKind::Object;
            }
        }

        if !exclude_all_units {
            if let Some(unit_id) = tile.unit {
                let skip = exclude == Some(unit_id)
                    || exclude_all_but.is_some_and(|keep| keep != unit_id);
                if !skip {
                    if let Some(unit) = field.unit(unit_id) {
                        if self.unit_occupies(field, unit, ox, oy, oz) {
                            return VoxelKind::Unit(unit_id);
                        }
                    }
                }
            }
        }

        VoxelKind::Empty
    }

    /// Test the unit silhouette at in-tile voxel offsets.
    fn unit_occupies(
        &self,
        field: &Battlefield,
        unit: &BattleUnit,
        ox: i32,
        oy: i32,
        oz: i32,
    ) -> bool {
        let base = field.terrain_level(unit.pos);
        let height = unit.current_height();
        if oz < base || oz >= base + height {
            return false;
        }

        // Cylinder slice, tighter at the head.
        let r = if oz >= base + height - 4 {
            UNIT_RADIUS - 2
        } else {
            UNIT_RADIUS
        };
        let (dx, dy) = (ox - TILE_SIZE / 2, oy - TILE_SIZE / 2);
        dx * dx + dy * dy <= r * r
    }

    /// Voxel a unit's eyesight originates from.
    pub fn sight_origin_voxel(
        &self,
        field: &Battlefield,
        unit: &BattleUnit,
    ) -> IVec3 {
        let eye_height =
            field.terrain_level(unit.pos) + unit.current_height() - 2;
        tile_center_voxel(unit.pos, eye_height.clamp(0, TILE_HEIGHT - 1))
    }

    /// Voxel in the middle of a unit's silhouette, the default aim point.
    pub fn unit_center_voxel(
        &self,
        field: &Battlefield,
        unit: &BattleUnit,
    ) -> IVec3 {
        let center =
            field.terrain_level(unit.pos) + unit.current_height() / 2;
        tile_center_voxel(unit.pos, center.clamp(0, TILE_HEIGHT - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn classify_terrain_voxels() {
        let (field, units) = field_with_units(&[r#"
####
#A.#
####
"#]);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();

        // Inside the solid block.
        let block = tile_center_voxel(ivec3(0, 0, 0), 12);
        assert_eq!(e.voxel_check(&field, block, None, false, None), VoxelKind::Object);

        // Floor slab under the unit.
        let floor = tile_center_voxel(ivec3(1, 1, 0), 0);
        assert_eq!(e.voxel_check(&field, floor, None, false, None), VoxelKind::Floor);

        // Unit torso.
        let torso = tile_center_voxel(ivec3(1, 1, 0), 10);
        assert_eq!(
            e.voxel_check(&field, torso, None, false, None),
            VoxelKind::Unit(a)
        );
        // Air above the unit's head.
        let air = tile_center_voxel(ivec3(2, 1, 0), 23);
        assert_eq!(e.voxel_check(&field, air, None, false, None), VoxelKind::Empty);

        // Outside the map.
        assert_eq!(
            e.voxel_check(&field, ivec3(-1, 0, 0), None, false, None),
            VoxelKind::OutOfBounds
        );
    }

    #[test]
    fn unit_exclusion_modes() {
        let (field, units) = field_with_units(&[r#"
A.b
"#]);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();
        let b = *units.get(&'b').unwrap();

        let torso_a = tile_center_voxel(ivec3(0, 0, 0), 10);
        assert_eq!(
            e.voxel_check(&field, torso_a, Some(a), false, None),
            VoxelKind::Empty
        );
        assert_eq!(
            e.voxel_check(&field, torso_a, None, true, None),
            VoxelKind::Empty
        );
        // Exclude-all-but the other unit still hides this one.
        assert_eq!(
            e.voxel_check(&field, torso_a, None, false, Some(b)),
            VoxelKind::Empty
        );
        assert_eq!(
            e.voxel_check(&field, torso_a, None, false, Some(a)),
            VoxelKind::Unit(a)
        );
    }
}
