//! Field of view and unit spotting.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{prelude::*, PERSONAL_VISIBILITY_RANGE, SMOKE_SIGHT_THRESHOLD};

/// Heights above the tile floor sampled when testing tile visibility.
const SIGHT_SAMPLE_HEIGHTS: [i32; 3] = [20, 12, 4];

/// A local change that only invalidates sight lines passing near it.
///
/// Passing one to [`TileEngine::calculate_fov`] limits the recomputation to
/// the angular sector covering the event, keeping the rest of the unit's
/// view as it was.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct SectorEvent {
    pub pos: Position,
    pub radius: i32,
}

impl TileEngine {
    /// Recompute what one unit sees.
    ///
    /// With an event, only tiles in the sector towards it are rescanned and
    /// the rest of the view is retained. Returns true when a hostile unit
    /// enters the view that was not in it before.
    pub fn calculate_fov(
        &self,
        field: &mut Battlefield,
        unit_id: UnitId,
        event: Option<SectorEvent>,
    ) -> bool {
        let Some(unit) = field.unit(unit_id) else {
            return false;
        };
        if unit.is_out() {
            return false;
        }
        let origin = unit.pos;
        let faction = unit.faction;
        let eye = self.sight_origin_voxel(field, unit);
        let prior_units = unit.visible_units.clone();
        let prior_tiles = unit.visible_tiles.clone();

        let mut tiles: HashSet<Position> = HashSet::default();
        let mut seen: IndexSet<UnitId> = IndexSet::default();

        if let Some(ev) = event {
            // Everything outside the sector is unaffected by the event.
            for &pos in &prior_tiles {
                if !in_sector(origin, pos, ev) {
                    tiles.insert(pos);
                }
            }
            for &id in &prior_units {
                if let Some(u) = field.unit(id) {
                    if !u.is_out() && !in_sector(origin, u.pos, ev) {
                        seen.insert(id);
                    }
                }
            }
        }

        let size = field.size();
        let r = self.max_view_distance();
        for z in 0..size.z {
            for y in (origin.y - r).max(0)..(origin.y + r + 1).min(size.y) {
                for x in (origin.x - r).max(0)..(origin.x + r + 1).min(size.x)
                {
                    let pos = ivec3(x, y, z);
                    if distance_sq(origin, pos, true)
                        > self.max_view_distance_sq()
                    {
                        continue;
                    }
                    if let Some(ev) = event {
                        if !in_sector(origin, pos, ev) {
                            continue;
                        }
                    }
                    if !self.tile_in_sight(field, unit_id, eye, pos) {
                        continue;
                    }
                    tiles.insert(pos);

                    let occupant = field
                        .tile(pos)
                        .and_then(|t| t.unit)
                        .and_then(|id| field.unit(id));
                    if let Some(other) = occupant {
                        if faction.hostile_to(other.faction)
                            && !other.is_out()
                            && self.visible(field, unit_id, pos)
                        {
                            seen.insert(other.id);
                        }
                    }
                }
            }
        }

        let spotted_new = seen.iter().any(|id| !prior_units.contains(id));
        if spotted_new {
            debug!("{unit_id:?} spotted a new hostile");
        }

        let unit = field.unit_mut(unit_id).expect("checked above");
        unit.visible_tiles = tiles;
        unit.visible_units = seen;
        spotted_new
    }

    /// Can the observer make out a unit standing on the given tile?
    ///
    /// Assumes tile-level line of sight has already been established; this
    /// adds the lighting and smoke rules that hide units on tiles the
    /// observer can otherwise see.
    pub fn visible(
        &self,
        field: &Battlefield,
        observer: UnitId,
        target_pos: Position,
    ) -> bool {
        let Some(obs) = field.unit(observer) else {
            return false;
        };
        let Some(tile) = field.tile(target_pos) else {
            return false;
        };
        if distance_sq(obs.pos, target_pos, true) > self.max_view_distance_sq()
        {
            return false;
        }

        // Units in darkness are only spotted up close.
        if tile.darkness() > self.max_darkness_to_see_units()
            && distance(obs.pos, target_pos) > PERSONAL_VISIBILITY_RANGE
        {
            return false;
        }

        let eye = self.sight_origin_voxel(field, obs);
        let aim = match tile.unit.and_then(|id| field.unit(id)) {
            Some(target) => self.unit_center_voxel(field, target),
            None => tile_center_voxel(target_pos, TILE_HEIGHT / 2),
        };
        let trace = self.calculate_line(
            field,
            eye,
            aim,
            true,
            Some(observer),
            tile.unit,
        );
        if trace.blocked() && voxel_to_tile(trace.stop) != target_pos {
            return false;
        }

        // Accumulated smoke along the sight line hides the unit even when
        // the geometry is clear.
        let mut smoke = 0;
        let mut prev = voxel_to_tile(eye);
        for &v in &trace.trajectory {
            let p = voxel_to_tile(v);
            if p != prev {
                prev = p;
                smoke += field.tile(p).map_or(0, |t| t.smoke);
            }
        }
        smoke <= SMOKE_SIGHT_THRESHOLD
    }

    /// Recompute the view of every unit whose sight could reach a changed
    /// location, e.g. after a door opens or a wall comes down.
    pub fn calculate_fov_around(
        &self,
        field: &mut Battlefield,
        pos: Position,
        radius: i32,
    ) -> bool {
        let reach = self.max_view_distance() + radius;
        let ids: Vec<UnitId> = field
            .units()
            .filter(|u| !u.is_out() && distance(u.pos, pos) <= reach)
            .map(|u| u.id)
            .collect();
        let mut spotted = false;
        for id in ids {
            spotted |=
                self.calculate_fov(field, id, Some(SectorEvent { pos, radius }));
        }
        spotted
    }

    /// Recompute every unit's view from scratch.
    pub fn recalculate_fov(&self, field: &mut Battlefield) {
        let ids = field.unit_ids();
        for id in ids {
            if let Some(unit) = field.unit_mut(id) {
                unit.clear_fov();
            }
            self.calculate_fov(field, id, None);
        }
    }

    /// How many silhouette slices of a unit can be hit from a voxel.
    ///
    /// Zero means fully covered; the maximum is the full slice count.
    pub fn check_voxel_exposure(
        &self,
        field: &Battlefield,
        origin: IVec3,
        target: UnitId,
        exclude: Option<UnitId>,
    ) -> i32 {
        let Some(unit) = field.unit(target) else {
            return 0;
        };
        let center = self.unit_center_voxel(field, unit);
        let base = field.terrain_level(unit.pos) + tile_to_voxel(unit.pos).z;
        let top = base + unit.current_height();

        let mut exposed = 0;
        for dz in HEIGHT_FROM_CENTER {
            let scan = center + ivec3(0, 0, dz);
            if scan.z < base || scan.z >= top {
                continue;
            }
            let trace = self.calculate_line(
                field,
                origin,
                scan,
                false,
                exclude,
                Some(target),
            );
            if trace.hit == VoxelKind::Unit(target) {
                exposed += 1;
            }
        }
        exposed
    }

    /// Find a voxel of the target unit a shot from `origin` can reach.
    ///
    /// Scans the silhouette center-first so the returned aim point is the
    /// most central exposed one.
    pub fn can_target_unit(
        &self,
        field: &Battlefield,
        origin: IVec3,
        target: UnitId,
        exclude: Option<UnitId>,
    ) -> Option<IVec3> {
        let unit = field.unit(target)?;
        let center = self.unit_center_voxel(field, unit);
        let base = field.terrain_level(unit.pos) + tile_to_voxel(unit.pos).z;
        let top = base + unit.current_height();

        for dz in HEIGHT_FROM_CENTER {
            let scan = center + ivec3(0, 0, dz);
            if scan.z < base || scan.z >= top {
                continue;
            }
            let trace = self.calculate_line(
                field,
                origin,
                scan,
                false,
                exclude,
                Some(target),
            );
            if trace.hit == VoxelKind::Unit(target) {
                return Some(scan);
            }
        }
        None
    }

    /// Find a voxel of a tile part a shot from `origin` can reach.
    pub fn can_target_tile(
        &self,
        field: &Battlefield,
        origin: IVec3,
        pos: Position,
        kind: PartKind,
        exclude: Option<UnitId>,
    ) -> Option<IVec3> {
        field.part_def(pos, kind)?;
        let corner = tile_to_voxel(pos);
        let candidates: &[IVec3] = match kind {
            PartKind::Floor => &[ivec3(8, 8, 1)],
            PartKind::WestWall => {
                &[ivec3(0, 8, 12), ivec3(0, 8, 20), ivec3(0, 8, 4)]
            }
            PartKind::NorthWall => {
                &[ivec3(8, 0, 12), ivec3(8, 0, 20), ivec3(8, 0, 4)]
            }
            PartKind::Object => {
                &[ivec3(8, 8, 12), ivec3(8, 8, 6), ivec3(8, 8, 18)]
            }
        };

        for &offset in candidates {
            let scan = corner + offset;
            let trace =
                self.calculate_line(field, origin, scan, false, exclude, None);
            if trace.hit.part_kind() == Some(kind)
                && voxel_to_tile(trace.stop) == pos
            {
                return Some(scan);
            }
        }
        None
    }

    /// Tile-level line of sight: at least one sample ray from the eye
    /// reaches the tile or stops on a surface inside it.
    fn tile_in_sight(
        &self,
        field: &Battlefield,
        observer: UnitId,
        eye: IVec3,
        pos: Position,
    ) -> bool {
        if voxel_to_tile(eye) == pos {
            return true;
        }
        for h in SIGHT_SAMPLE_HEIGHTS {
            let target = tile_center_voxel(pos, h);
            // Units never occlude terrain, so sight ignores all of them.
            let trace = self.calculate_line(
                field,
                eye,
                target,
                false,
                Some(observer),
                Some(observer),
            );
            if !trace.blocked() || voxel_to_tile(trace.stop) == pos {
                return true;
            }
        }
        false
    }
}

/// Is `pos` in the angular sector from `origin` towards the event?
///
/// The sector fans out just wide enough to cover the event's radius; tiles
/// inside that radius are always members.
fn in_sector(origin: Position, pos: Position, ev: SectorEvent) -> bool {
    if pos == origin || ev.pos == origin {
        return true;
    }
    if distance_sq(pos, ev.pos, true) <= (ev.radius + 1) * (ev.radius + 1) {
        return true;
    }
    let to_event = (ev.pos - origin).truncate().as_vec2();
    let to_tile = (pos - origin).truncate().as_vec2();
    if to_tile == glam::Vec2::ZERO || to_event == glam::Vec2::ZERO {
        return true;
    }
    let half_angle =
        (ev.radius as f32 + 1.5).atan2(to_event.length());
    let mut diff =
        (to_tile.y.atan2(to_tile.x) - to_event.y.atan2(to_event.x)).abs();
    if diff > std::f32::consts::PI {
        diff = 2.0 * std::f32::consts::PI - diff;
    }
    diff <= half_angle
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::*;

    fn lit(field: &mut Battlefield) {
        field.global_shade = 0;
        TileEngine::default().calculate_sun_shading(field);
    }

    #[test]
    fn open_room_mutual_spotting() {
        let (mut field, units) = field_with_units(&[r#"
A....b
......
"#]);
        lit(&mut field);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();
        let b = *units.get(&'b').unwrap();

        assert!(e.calculate_fov(&mut field, a, None));
        assert!(e.calculate_fov(&mut field, b, None));

        let ua = field.unit(a).unwrap();
        assert!(ua.visible_units.contains(&b));
        assert!(ua.visible_tiles.contains(&ivec3(5, 0, 0)));
        assert!(field.unit(b).unwrap().visible_units.contains(&a));
    }

    #[test]
    fn wall_blocks_sight() {
        let (mut field, units) = field_with_units(&[r#"
A.#.b
..#..
"#]);
        lit(&mut field);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();
        let b = *units.get(&'b').unwrap();

        assert!(!e.calculate_fov(&mut field, a, None));
        let ua = field.unit(a).unwrap();
        assert!(!ua.visible_units.contains(&b));
        assert!(!ua.visible_tiles.contains(&ivec3(4, 0, 0)));
        // The wall face itself is in view.
        assert!(ua.visible_tiles.contains(&ivec3(2, 0, 0)));
    }

    #[test]
    fn fov_is_idempotent() {
        let (mut field, units) = field_with_units(&[r#"
A..#...
....b..
.......
"#]);
        lit(&mut field);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();

        e.calculate_fov(&mut field, a, None);
        let tiles = field.unit(a).unwrap().visible_tiles.clone();
        let seen = field.unit(a).unwrap().visible_units.clone();

        // Recomputing on an unchanged field never reports a new spot and
        // reproduces the same view.
        assert!(!e.calculate_fov(&mut field, a, None));
        assert_eq!(field.unit(a).unwrap().visible_tiles, tiles);
        assert_eq!(field.unit(a).unwrap().visible_units, seen);
    }

    #[test]
    fn darkness_hides_asymmetrically() {
        // Night mission. A carries a light, b lurks in the dark twelve
        // tiles away: b sees A but not the other way round.
        let (mut field, units) = field_with_units(&[r#"
A...........b
"#]);
        field.global_shade = 15;
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();
        let b = *units.get(&'b').unwrap();
        field.unit_mut(b).unwrap().personal_light = 0;
        e.calculate_sun_shading(&mut field);
        e.calculate_dynamic_lighting(&mut field);

        assert!(field.tile(ivec3(0, 0, 0)).unwrap().darkness() < 3);
        assert!(field.tile(ivec3(12, 0, 0)).unwrap().darkness() > 9);

        e.calculate_fov(&mut field, a, None);
        e.calculate_fov(&mut field, b, None);
        assert!(!field.unit(a).unwrap().visible_units.contains(&b));
        assert!(field.unit(b).unwrap().visible_units.contains(&a));
    }

    #[test]
    fn smoke_screen_hides_units() {
        let (mut field, units) = field_with_units(&[r#"
A...~~...b
"#]);
        lit(&mut field);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();
        let b = *units.get(&'b').unwrap();

        e.calculate_fov(&mut field, a, None);
        let ua = field.unit(a).unwrap();
        // Smoke hides the unit but not the terrain behind it.
        assert!(!ua.visible_units.contains(&b));
        assert!(ua.visible_tiles.contains(&ivec3(9, 0, 0)));
    }

    #[test]
    fn sector_update_matches_full_recompute() {
        let (mut field, units) = field_with_units(&[r#"
A...#...
........
..b.....
"#]);
        lit(&mut field);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();

        e.calculate_fov(&mut field, a, None);
        let full_tiles = field.unit(a).unwrap().visible_tiles.clone();
        let full_units = field.unit(a).unwrap().visible_units.clone();

        // Nothing changed on the field, so a sector rescan must agree with
        // the full view no matter where the event was.
        let ev = SectorEvent {
            pos: ivec3(4, 0, 0),
            radius: 2,
        };
        assert!(!e.calculate_fov(&mut field, a, Some(ev)));
        assert_eq!(field.unit(a).unwrap().visible_tiles, full_tiles);
        assert_eq!(field.unit(a).unwrap().visible_units, full_units);
    }

    #[test]
    fn exposure_counts_cover() {
        let (mut field, units) = field_with_units(&[r#"
A....b
"#]);
        lit(&mut field);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();
        let b = *units.get(&'b').unwrap();
        let eye = {
            let ua = field.unit(a).unwrap();
            e.sight_origin_voxel(&field, ua)
        };

        let open = e.check_voxel_exposure(&field, eye, b, Some(a));
        assert!(open > 0);
        assert!(e.can_target_unit(&field, eye, b, Some(a)).is_some());

        // Fully walled off: no exposure, no aim point.
        let (field, units) = field_with_units(&[r#"
A.#.b
..#..
"#]);
        let a = *units.get(&'A').unwrap();
        let b = *units.get(&'b').unwrap();
        let eye = e.sight_origin_voxel(&field, field.unit(a).unwrap());
        assert_eq!(e.check_voxel_exposure(&field, eye, b, Some(a)), 0);
        assert_eq!(e.can_target_unit(&field, eye, b, Some(a)), None);
    }

    #[test]
    fn targeting_tile_parts() {
        let (field, units) = field_with_units(&[r#"
A.#..
"#]);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();
        let eye = e.sight_origin_voxel(&field, field.unit(a).unwrap());

        let aim =
            e.can_target_tile(&field, eye, ivec3(2, 0, 0), PartKind::Object, Some(a));
        assert!(aim.is_some());
        // The tile behind the block cannot be shot at.
        assert_eq!(
            e.can_target_tile(&field, eye, ivec3(4, 0, 0), PartKind::Floor, Some(a)),
            None
        );
    }
}
