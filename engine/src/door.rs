//! Opening and closing doors.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{prelude::*, DOOR_TU_COST};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum DoorResult {
    Opened,
    NoDoor,
    NotEnoughTu,
}

impl TileEngine {
    /// Open the door on the edge the unit is facing, or the given cardinal
    /// direction.
    ///
    /// Walls live on the north and west edges of their tile, so the edge a
    /// unit faces may belong to the neighboring tile. Opening a sliding
    /// door drags any connected door segments open with it, and everyone
    /// nearby gets their view towards the doorway refreshed.
    pub fn unit_opens_door(
        &self,
        field: &mut Battlefield,
        unit_id: UnitId,
        dir: Option<usize>,
    ) -> DoorResult {
        let Some(unit) = field.unit(unit_id) else {
            return DoorResult::NoDoor;
        };
        let dir = dir.unwrap_or(unit.facing);
        let (door_pos, kind) = match dir {
            0 => (unit.pos, PartKind::NorthWall),
            2 => (unit.pos + ivec3(1, 0, 0), PartKind::WestWall),
            4 => (unit.pos + ivec3(0, 1, 0), PartKind::NorthWall),
            6 => (unit.pos, PartKind::WestWall),
            _ => return DoorResult::NoDoor,
        };

        let Some(def) = field.part_def(door_pos, kind) else {
            return DoorResult::NoDoor;
        };
        if def.is_open || !(def.is_door || def.is_sliding_door) {
            return DoorResult::NoDoor;
        }
        let Some(alt) = def.alt_part else {
            return DoorResult::NoDoor;
        };
        let sliding = def.is_sliding_door;

        if !field
            .unit_mut(unit_id)
            .expect("checked above")
            .spend_tu(DOOR_TU_COST)
        {
            return DoorResult::NotEnoughTu;
        }

        debug!("door at {door_pos} opens");
        field
            .tile_mut(door_pos)
            .expect("part_def checked tile")
            .set_part(kind, Some(alt));
        if sliding {
            self.check_adjacent_doors(field, door_pos, kind);
        }
        self.calculate_fov_around(field, door_pos, 1);
        DoorResult::Opened
    }

    /// Drag connected closed segments of a sliding door open, free of
    /// charge. Segments connect along the axis the wall runs in.
    fn check_adjacent_doors(
        &self,
        field: &mut Battlefield,
        pos: Position,
        kind: PartKind,
    ) {
        let axis = match kind {
            PartKind::NorthWall => ivec3(1, 0, 0),
            PartKind::WestWall => ivec3(0, 1, 0),
            _ => return,
        };
        for step in [axis, -axis] {
            let mut p = pos + step;
            loop {
                let Some(def) = field.part_def(p, kind) else {
                    break;
                };
                if !def.is_sliding_door || def.is_open {
                    break;
                }
                let Some(alt) = def.alt_part else {
                    break;
                };
                field
                    .tile_mut(p)
                    .expect("part_def checked tile")
                    .set_part(kind, Some(alt));
                p += step;
            }
        }
    }

    /// Shut every open sliding door at the end of the turn.
    ///
    /// Doors with a unit standing in the doorway stay open. Returns how
    /// many doors closed.
    pub fn close_doors(&self, field: &mut Battlefield) -> usize {
        let mut closed = 0;
        let positions: Vec<Position> = field.positions().collect();
        for pos in positions {
            if field.unit_at(pos).is_some() {
                continue;
            }
            for kind in [PartKind::NorthWall, PartKind::WestWall] {
                let Some(def) = field.part_def(pos, kind) else {
                    continue;
                };
                if !def.is_sliding_door || !def.is_open {
                    continue;
                }
                let Some(alt) = def.alt_part else {
                    continue;
                };
                field
                    .tile_mut(pos)
                    .expect("part_def checked tile")
                    .set_part(kind, Some(alt));
                closed += 1;
            }
        }
        if closed > 0 {
            debug!("{closed} sliding doors closed");
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn hinged_door_opens_for_tu() {
        let (mut field, _) = field_with_units(&[r#"
...
.+.
...
"#]);
        field.global_shade = 0;
        let e = TileEngine::default();
        e.calculate_sun_shading(&mut field);
        let a = field.spawn_unit(BattleUnit::new(
            "a",
            Faction::Player,
            ivec3(1, 1, 0),
        ));

        let door_tile = ivec3(1, 1, 0);
        let above = ivec3(1, 0, 0);
        assert_eq!(
            e.horizontal_blockage(&field, above, door_tile, DamageType::None, false),
            HARD_BLOCK
        );

        // Facing north by default, straight at the door.
        assert_eq!(e.unit_opens_door(&mut field, a, None), DoorResult::Opened);
        assert_eq!(field.unit(a).unwrap().tu, 60 - crate::DOOR_TU_COST);
        assert_eq!(
            e.horizontal_blockage(&field, above, door_tile, DamageType::None, false),
            0
        );
        // The view through the doorway came with the opening.
        assert!(field.unit(a).unwrap().visible_tiles.contains(&above));

        // Already open.
        assert_eq!(e.unit_opens_door(&mut field, a, None), DoorResult::NoDoor);

        // No door on the west edge.
        assert_eq!(
            e.unit_opens_door(&mut field, a, Some(6)),
            DoorResult::NoDoor
        );
    }

    #[test]
    fn door_refused_without_tu() {
        let (mut field, _) = field_with_units(&[r#"
...
.+.
...
"#]);
        let e = TileEngine::default();
        let a = field.spawn_unit(BattleUnit::new(
            "a",
            Faction::Player,
            ivec3(1, 1, 0),
        ));
        field.unit_mut(a).unwrap().tu = 2;

        assert_eq!(
            e.unit_opens_door(&mut field, a, None),
            DoorResult::NotEnoughTu
        );
        // The door stayed shut.
        assert_eq!(
            e.horizontal_blockage(
                &field,
                ivec3(1, 0, 0),
                ivec3(1, 1, 0),
                DamageType::None,
                false
            ),
            HARD_BLOCK
        );
    }

    #[test]
    fn sliding_doors_gang_open_and_auto_close() {
        let (mut field, _) = field_with_units(&[r#"
....
.==.
....
"#]);
        let e = TileEngine::default();
        let a = field.spawn_unit(BattleUnit::new(
            "a",
            Faction::Player,
            ivec3(1, 1, 0),
        ));

        assert_eq!(e.unit_opens_door(&mut field, a, None), DoorResult::Opened);
        // The connected segment slid open too.
        for x in [1, 2] {
            let def =
                field.part_def(ivec3(x, 1, 0), PartKind::NorthWall).unwrap();
            assert!(def.is_open, "segment {x}");
        }

        // Standing in the doorway holds that segment open at end of turn.
        assert_eq!(e.close_doors(&mut field), 1);
        assert!(
            field
                .part_def(ivec3(1, 1, 0), PartKind::NorthWall)
                .unwrap()
                .is_open
        );
        assert!(
            !field
                .part_def(ivec3(2, 1, 0), PartKind::NorthWall)
                .unwrap()
                .is_open
        );

        // Once the unit steps aside, the rest shuts as well.
        assert!(field.move_unit(a, ivec3(1, 2, 0)));
        assert_eq!(e.close_doors(&mut field), 1);
        assert!(
            !field
                .part_def(ivec3(1, 1, 0), PartKind::NorthWall)
                .unwrap()
                .is_open
        );
    }
}
