//! Light propagation over the battlefield.
//!
//! Two channels: sun shading is computed per column top-down, dynamic light
//! spreads outward from each source. Both are max-accumulated so propagation
//! order never changes the result, only how much work gets redone.

use std::collections::VecDeque;

use log::debug;

use crate::{prelude::*, FIRE_LIGHT_POWER};

impl TileEngine {
    /// Recompute sun-derived light for the whole map.
    pub fn calculate_sun_shading(&self, field: &mut Battlefield) {
        let size = field.size();
        for y in 0..size.y {
            for x in 0..size.x {
                self.calculate_sun_shading_column(field, x, y);
            }
        }
    }

    /// Recompute sun-derived light for one tile column.
    ///
    /// Sunlight enters from above at the mission's global shade level and is
    /// attenuated by each roof (a tile's floor shades the tiles below it)
    /// and full-tile object on the way down.
    pub fn calculate_sun_shading_column(
        &self,
        field: &mut Battlefield,
        x: i32,
        y: i32,
    ) {
        let mut light = (MAX_LIGHT - field.global_shade).max(0);
        for z in (0..field.size().z).rev() {
            let pos = ivec3(x, y, z);
            let floor_block = field
                .part_def(pos, PartKind::Floor)
                .map_or(0, |d| d.block_light);
            let object_block = field
                .part_def(pos, PartKind::Object)
                .map_or(0, |d| d.block_light);

            // Objects shade their own tile, roofs only the tiles below.
            let own = (light - object_block).max(0);
            field.tile_mut(pos).expect("column in bounds").light_sun = own;

            light = (own - floor_block).max(0);
        }
    }

    /// Recompute the dynamic light channel from every source on the map:
    /// glowing terrain, burning tiles, ground flares and unit lights.
    pub fn calculate_dynamic_lighting(&self, field: &mut Battlefield) {
        let positions: Vec<Position> = field.positions().collect();
        for &pos in &positions {
            field.tile_mut(pos).expect("in bounds").light_dyn = 0;
        }

        let mut sources: Vec<(Position, i32)> = Vec::new();

        for &pos in &positions {
            let tile = field.tile(pos).expect("in bounds");
            if tile.fire > 0 {
                sources.push((pos, FIRE_LIGHT_POWER));
            }
            for kind in [
                PartKind::Floor,
                PartKind::WestWall,
                PartKind::NorthWall,
                PartKind::Object,
            ] {
                if let Some(def) = field.part_def(pos, kind) {
                    if def.light_source > 0 {
                        sources.push((pos, def.light_source));
                    }
                }
            }
        }

        for item in field.items() {
            if let ItemOwner::Tile(pos) = item.owner {
                let def = &field.rules.items[item.def.0 as usize];
                if def.light_source > 0 {
                    sources.push((pos, def.light_source));
                }
            }
        }

        if self.personal_lighting() {
            for unit in field.units() {
                if !unit.is_out() && unit.personal_light > 0 {
                    sources.push((unit.pos, unit.personal_light));
                }
            }
        }

        debug!("relighting from {} dynamic sources", sources.len());
        for (pos, power) in sources {
            self.add_light(field, pos, power);
        }
    }

    /// Spread one light source outward.
    ///
    /// Tile light is the max over sources, so a hop only continues where it
    /// improves on what is already there; earlier brighter light dominates
    /// every path onward from that tile.
    fn add_light(&self, field: &mut Battlefield, center: Position, power: i32) {
        let power = power.min(MAX_LIGHT);
        if power <= 0 || !field.contains(center) {
            return;
        }

        let mut frontier: VecDeque<(Position, i32)> = VecDeque::new();
        {
            let tile = field.tile_mut(center).expect("checked above");
            if tile.light_dyn >= power {
                return;
            }
            tile.light_dyn = power;
        }
        frontier.push_back((center, power));

        while let Some((pos, p)) = frontier.pop_front() {
            let hop = |field: &mut Battlefield,
                           frontier: &mut VecDeque<(Position, i32)>,
                           to: Position,
                           step: i32| {
                if !field.contains(to) {
                    return;
                }
                let np = p - step - self.light_blockage(field, pos, to);
                if np <= 0 {
                    return;
                }
                let tile = field.tile_mut(to).expect("checked above");
                if np > tile.light_dyn {
                    tile.light_dyn = np;
                    frontier.push_back((to, np));
                }
            };

            for (i, dir) in DIR_8.iter().enumerate() {
                // Diagonal hops cost double to keep the falloff roughly
                // radial.
                let step = if i % 2 == 0 { 1 } else { 2 };
                hop(field, &mut frontier, pos + dir.extend(0), step);
            }
            hop(field, &mut frontier, pos + ivec3(0, 0, 1), 2);
            hop(field, &mut frontier, pos + ivec3(0, 0, -1), 2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn corridor_falloff() {
        // Light 10 at the west end of a corridor, attenuation one per tile:
        // 10, 9, 8, ... 1, then zero beyond.
        let (mut field, _) = field_with_units(&["............"]);
        let e = TileEngine::default();
        e.add_light(&mut field, ivec3(0, 0, 0), 10);

        for x in 0..12 {
            let expected = (10 - x).max(0);
            assert_eq!(
                field.tile(ivec3(x, 0, 0)).unwrap().light_dyn,
                expected,
                "tile {x}"
            );
        }
    }

    #[test]
    fn light_is_max_of_sources_and_clamped() {
        let (mut field, _) = field_with_units(&["......."]);
        let e = TileEngine::default();
        e.add_light(&mut field, ivec3(0, 0, 0), 15);
        e.add_light(&mut field, ivec3(6, 0, 0), 15);

        for x in 0..7 {
            let tile = field.tile(ivec3(x, 0, 0)).unwrap();
            // Falloff from the nearer source, never above max.
            let expected = (15 - x.min(6 - x)).min(MAX_LIGHT);
            assert_eq!(tile.light(), expected, "tile {x}");
            assert!(tile.light() <= MAX_LIGHT);
        }
    }

    #[test]
    fn walls_stop_light() {
        let (mut field, _) = field_with_units(&[r#"
...|...
"#]);
        let e = TileEngine::default();
        e.add_light(&mut field, ivec3(0, 0, 0), 12);
        // The west wall of (3,0) is opaque to light.
        assert!(field.tile(ivec3(2, 0, 0)).unwrap().light_dyn > 0);
        assert_eq!(field.tile(ivec3(3, 0, 0)).unwrap().light_dyn, 0);
    }

    #[test]
    fn sun_shading_respects_roofs() {
        // Right half of the lower level is roofed by upper-level floor.
        let (mut field, _) = field_with_units(&[
            "....",
            "  ..",
        ]);
        let e = TileEngine::default();
        field.global_shade = 0;
        e.calculate_sun_shading(&mut field);

        assert_eq!(field.tile(ivec3(0, 0, 0)).unwrap().light_sun, MAX_LIGHT);
        assert!(field.tile(ivec3(2, 0, 0)).unwrap().light_sun < MAX_LIGHT);

        // Night mission: everything dark.
        field.global_shade = 15;
        e.calculate_sun_shading(&mut field);
        assert_eq!(field.tile(ivec3(0, 0, 0)).unwrap().light_sun, 0);

        // Incremental column recompute matches the full pass.
        field.global_shade = 3;
        e.calculate_sun_shading(&mut field);
        let full = field.tile(ivec3(2, 0, 0)).unwrap().light_sun;
        e.calculate_sun_shading_column(&mut field, 2, 0);
        assert_eq!(field.tile(ivec3(2, 0, 0)).unwrap().light_sun, full);
    }

    #[test]
    fn dynamic_lighting_sources() {
        let (mut field, units) = field_with_units(&[r#"
A.....%
"#]);
        let e = TileEngine::default();
        e.calculate_dynamic_lighting(&mut field);

        // Unit personal light and the lamp both lit.
        assert!(field.tile(ivec3(0, 0, 0)).unwrap().light_dyn > 0);
        assert!(field.tile(ivec3(6, 0, 0)).unwrap().light_dyn > 0);

        // Douse the unit light and relight.
        field
            .unit_mut(*units.get(&'A').unwrap())
            .unwrap()
            .personal_light = 0;
        e.calculate_dynamic_lighting(&mut field);
        let by_unit = field.tile(ivec3(0, 0, 0)).unwrap().light_dyn;
        let by_lamp = field.tile(ivec3(6, 0, 0)).unwrap().light_dyn;
        assert!(by_lamp > by_unit);
    }
}
