//! Attenuation of sight, light, smoke and explosions by terrain parts.
//!
//! Invoked on every propagation hop and trace step, so everything here is
//! table lookups and integer sums, no allocation.

use crate::prelude::*;

impl TileEngine {
    /// Attenuation a single tile part applies to a damage type.
    ///
    /// `checking_from_origin` skips the tile's own object so a shot or
    /// explosion does not block itself at its starting tile; big walls
    /// still count.
    pub fn blockage(
        &self,
        field: &Battlefield,
        pos: Position,
        kind: PartKind,
        damage_type: DamageType,
        checking_from_origin: bool,
    ) -> i32 {
        let Some(def) = field.part_def(pos, kind) else {
            return if field.contains(pos) { 0 } else { HARD_BLOCK };
        };
        if checking_from_origin && kind == PartKind::Object && !def.is_big_wall
        {
            return 0;
        }
        def.block(damage_type)
    }

    /// Attenuation between two horizontally adjacent tiles (8-neighborhood).
    pub fn horizontal_blockage(
        &self,
        field: &Battlefield,
        from: Position,
        to: Position,
        damage_type: DamageType,
        skip_object: bool,
    ) -> i32 {
        self.crossing(field, from, to, &|d: &PartDef| d.block(damage_type), skip_object)
    }

    /// Attenuation between two vertically adjacent tiles.
    pub fn vertical_blockage(
        &self,
        field: &Battlefield,
        from: Position,
        to: Position,
        damage_type: DamageType,
    ) -> i32 {
        self.crossing(field, from, to, &|d: &PartDef| d.block(damage_type), false)
    }

    /// Light attenuation between two adjacent tiles.
    pub(crate) fn light_blockage(
        &self,
        field: &Battlefield,
        from: Position,
        to: Position,
    ) -> i32 {
        self.crossing(field, from, to, &|d: &PartDef| d.block_light, false)
    }

    /// Shared crossing rule for all adjacent-tile propagation.
    ///
    /// Walls sit on the north and west edges of their tile, so the wall
    /// crossed depends on travel direction. Diagonal steps decompose into
    /// the two L-shaped paths and take the cheaper one. Vertical steps are
    /// blocked by the upper tile's floor.
    fn crossing(
        &self,
        field: &Battlefield,
        from: Position,
        to: Position,
        value: &impl Fn(&PartDef) -> i32,
        skip_object: bool,
    ) -> i32 {
        if !field.contains(to) {
            return HARD_BLOCK;
        }
        let d = to - from;
        debug_assert!(
            d.abs().max_element() == 1 && (d.z == 0 || d.truncate() == ivec2(0, 0)),
            "crossing between non-adjacent tiles"
        );

        let part = |pos, kind| {
            field.part_def(pos, kind).map_or(0, value)
        };

        if d.z != 0 {
            let upper = if d.z > 0 { to } else { from };
            let mut sum = part(upper, PartKind::Floor);
            if !skip_object {
                sum += part(to, PartKind::Object);
            }
            return sum.min(HARD_BLOCK);
        }

        let wall = |from: Position, to: Position| -> i32 {
            match (to.x - from.x, to.y - from.y) {
                (0, -1) => part(from, PartKind::NorthWall),
                (0, 1) => part(to, PartKind::NorthWall),
                (-1, 0) => part(from, PartKind::WestWall),
                (1, 0) => part(to, PartKind::WestWall),
                _ => unreachable!(),
            }
        };

        let mut sum = if d.x != 0 && d.y != 0 {
            // Two candidate L-paths around the corner; the intermediate
            // tile's object blocks the path through it.
            let mid1 = from + ivec3(d.x, 0, 0);
            let mid2 = from + ivec3(0, d.y, 0);
            let path1 = wall(from, mid1)
                + part(mid1, PartKind::Object)
                + wall(mid1, to);
            let path2 = wall(from, mid2)
                + part(mid2, PartKind::Object)
                + wall(mid2, to);
            path1.min(path2)
        } else {
            wall(from, to)
        };

        if !skip_object {
            sum += part(to, PartKind::Object);
        }
        sum.min(HARD_BLOCK)
    }
}
