//! Damage application: point hits, explosions, terrain destruction.

use std::collections::VecDeque;

use log::{debug, info, warn};

use crate::{prelude::*, EXPLOSION_STEP_POWER, TERRAIN_CHAIN_LIMIT};

impl TileEngine {
    /// Resolve a projectile or melee impact at a voxel.
    ///
    /// Returns the unit that was struck, if any.
    pub fn hit(
        &self,
        field: &mut Battlefield,
        impact: IVec3,
        power: i32,
        damage_type: DamageType,
        source: Option<UnitId>,
    ) -> Option<UnitId> {
        let pos = voxel_to_tile(impact);
        match self.voxel_check(field, impact, None, false, None) {
            VoxelKind::Unit(id) => {
                self.hit_unit(field, id, power, damage_type, source);
                Some(id)
            }
            kind => {
                if let Some(part) = kind.part_kind() {
                    self.hit_tile(field, pos, part, power);
                }
                if damage_type.ignites() {
                    self.try_ignite(field, pos, power);
                }
                None
            }
        }
    }

    /// Apply damage to a unit's pools; handle death and knockout.
    ///
    /// Returns true if the unit died.
    pub fn hit_unit(
        &self,
        field: &mut Battlefield,
        target: UnitId,
        power: i32,
        damage_type: DamageType,
        source: Option<UnitId>,
    ) -> bool {
        let Some(unit) = field.unit(target) else {
            return false;
        };
        if unit.is_out() {
            return false;
        }
        let dmg = (power - unit.armor).max(0);
        if dmg == 0 {
            return false;
        }
        // Physical damage has a stun side effect, stun damage leaves no
        // wounds.
        let (health_dmg, stun_dmg) = if damage_type.to_stun() {
            (0, dmg)
        } else {
            (dmg, dmg / 4)
        };

        let unit = field.unit_mut(target).expect("checked above");
        let died = unit.take_damage(health_dmg, stun_dmg);
        let pos = unit.pos;
        let faction = unit.faction;
        let out = unit.is_out();
        debug!("{} takes {dmg} {damage_type} damage", unit.name);

        if let Some(src) = source {
            if let Some(shooter) = field.unit_mut(src) {
                shooter.exp.firing += 1;
            }
        }

        if out {
            field.drop_from_play(target);
            let carried: Vec<ItemId> = {
                let u = field.unit(target).expect("checked above");
                u.weapon.into_iter().chain(u.inventory.iter().copied()).collect()
            };
            for item in carried {
                field.transfer_item(item, ItemOwner::Tile(pos));
            }
        }

        if died {
            info!(
                "{} dies",
                field.unit(target).expect("checked above").name
            );
            if let Some(corpse) = field.rules.item_named("corpse") {
                field.spawn_item(corpse, ItemOwner::Tile(pos));
            }
            // Watching a comrade die shakes the rest of the faction.
            for id in field.unit_ids() {
                let unit = field.unit_mut(id).expect("listed id");
                if id != target && unit.faction == faction {
                    unit.morale = (unit.morale - 10).max(0);
                }
            }
        }
        died
    }

    /// Apply damage to one terrain part.
    ///
    /// Returns true if the part was destroyed. Destruction swaps in the
    /// part's wreck form, queues its secondary explosion and drops anything
    /// that was standing on a destroyed floor.
    pub fn hit_tile(
        &self,
        field: &mut Battlefield,
        pos: Position,
        kind: PartKind,
        power: i32,
    ) -> bool {
        let Some(def) = field.part_def(pos, kind) else {
            return false;
        };
        if def.armor >= HARD_BLOCK || power / 2 < def.armor {
            return false;
        }
        let die_to = def.die_to;
        let explosive = def.explosive;
        debug!("{} at {pos} destroyed", def.name);

        let tile = field.tile_mut(pos).expect("part_def checked tile");
        tile.set_part(kind, die_to);
        if explosive > 0 {
            tile.explosive = tile.explosive.max(explosive);
        }

        if kind == PartKind::Floor && die_to.is_none() {
            self.apply_gravity(field, pos);
        }
        // Holes in roofs and broken lamps change the light.
        self.calculate_sun_shading_column(field, pos.x, pos.y);
        true
    }

    /// Detonate an explosion centered on a tile.
    ///
    /// Power spreads tile to tile, paying a per-step toll plus terrain
    /// attenuation, and each reached tile takes the remaining power. Any
    /// secondary explosions from destroyed terrain go off in the same call,
    /// up to a chain cap.
    ///
    /// Returns the power that arrived at each tile of the primary blast.
    pub fn explode(
        &self,
        field: &mut Battlefield,
        center: Position,
        power: i32,
        damage_type: DamageType,
        max_radius: i32,
        source: Option<UnitId>,
    ) -> HashMap<Position, i32> {
        let reached = self.explode_once(
            field, center, power, damage_type, max_radius, source,
        );

        let mut chain = 0;
        while let Some((pos, p)) = self.check_for_terrain_explosions(field) {
            chain += 1;
            if chain > TERRAIN_CHAIN_LIMIT {
                warn!("terrain explosion chain cut off at {pos}");
                break;
            }
            let radius = p / EXPLOSION_STEP_POWER;
            self.explode_once(
                field,
                pos,
                p,
                DamageType::HighExplosive,
                radius,
                source,
            );
        }
        reached
    }

    fn explode_once(
        &self,
        field: &mut Battlefield,
        center: Position,
        power: i32,
        damage_type: DamageType,
        max_radius: i32,
        source: Option<UnitId>,
    ) -> HashMap<Position, i32> {
        info!("{damage_type} explosion at {center}, power {power}");
        let mut best: HashMap<Position, i32> = HashMap::default();
        if !field.contains(center) || power <= 0 {
            return best;
        }
        best.insert(center, power);

        // Spread the power outward; a tile keeps the strongest power any
        // path delivers to it.
        let mut frontier: VecDeque<(Position, i32)> = VecDeque::new();
        frontier.push_back((center, power));
        while let Some((pos, p)) = frontier.pop_front() {
            if best.get(&pos) != Some(&p) {
                continue;
            }
            let hop = |frontier: &mut VecDeque<(Position, i32)>,
                           best: &mut HashMap<Position, i32>,
                           to: Position,
                           step: i32,
                           block: i32| {
                if !field.contains(to)
                    || distance_sq(center, to, true) > max_radius * max_radius
                {
                    return;
                }
                let np = p - step - block;
                if np <= 0 {
                    return;
                }
                if np > best.get(&to).copied().unwrap_or(0) {
                    best.insert(to, np);
                    frontier.push_back((to, np));
                }
            };

            for (i, dir) in DIR_8.iter().enumerate() {
                let to = pos + dir.extend(0);
                let step = if i % 2 == 0 {
                    EXPLOSION_STEP_POWER
                } else {
                    EXPLOSION_STEP_POWER * 3 / 2
                };
                let block = self
                    .horizontal_blockage(field, pos, to, damage_type, false);
                hop(&mut frontier, &mut best, to, step, block);
            }
            for dz in [-1, 1] {
                let to = pos + ivec3(0, 0, dz);
                let block =
                    self.vertical_blockage(field, pos, to, damage_type);
                hop(
                    &mut frontier,
                    &mut best,
                    to,
                    EXPLOSION_STEP_POWER * 2,
                    block,
                );
            }
        }

        // Apply effects in scan order so results never depend on the order
        // the frontier happened to reach tiles in.
        let positions: Vec<Position> = field.positions().collect();
        for pos in positions {
            let Some(&p) = best.get(&pos) else {
                continue;
            };
            match damage_type {
                DamageType::HighExplosive => {
                    self.detonate(field, pos, p);
                    field
                        .tile_mut(pos)
                        .expect("in bounds")
                        .add_smoke(p / 20);
                }
                DamageType::Smoke => {
                    field
                        .tile_mut(pos)
                        .expect("in bounds")
                        .add_smoke(p / 10 + 1);
                }
                DamageType::Incendiary => {
                    self.try_ignite(field, pos, p);
                }
                _ => {}
            }
            if let Some(id) = field.unit_at(pos) {
                self.hit_unit(field, id, p, damage_type, source);
            }
        }
        best
    }

    /// Apply explosive power to every part of one tile.
    ///
    /// Returns true if anything was destroyed.
    pub fn detonate(
        &self,
        field: &mut Battlefield,
        pos: Position,
        power: i32,
    ) -> bool {
        let mut destroyed = false;
        for kind in [
            PartKind::Object,
            PartKind::NorthWall,
            PartKind::WestWall,
            PartKind::Floor,
        ] {
            destroyed |= self.hit_tile(field, pos, kind, power);
        }
        destroyed
    }

    /// Pop the next pending secondary explosion, if any.
    ///
    /// Scan order makes the chaining deterministic.
    pub fn check_for_terrain_explosions(
        &self,
        field: &mut Battlefield,
    ) -> Option<(Position, i32)> {
        let pos = field
            .positions()
            .find(|&p| field.tile(p).is_some_and(|t| t.explosive > 0))?;
        let tile = field.tile_mut(pos).expect("found above");
        let power = tile.explosive;
        tile.explosive = 0;
        Some((pos, power))
    }

    /// Drop the unit and items on a floorless tile down to solid ground.
    pub fn apply_gravity(&self, field: &mut Battlefield, pos: Position) {
        let mut landing = pos;
        while landing.z > 0 && !field.has_floor(landing) {
            landing.z -= 1;
        }
        if landing == pos {
            return;
        }

        if let Some(id) = field.unit_at(pos) {
            if field.move_unit(id, landing) {
                debug!("{id:?} falls to {landing}");
            }
        }
        let items: Vec<ItemId> =
            field.tile(pos).map_or(Vec::new(), |t| t.items.clone());
        for item in items {
            field.transfer_item(item, ItemOwner::Tile(landing));
        }
    }

    /// Count down grenade timers, detonating the ones that reach zero.
    ///
    /// Called once per turn end.
    pub fn tick_fuses(&self, field: &mut Battlefield) {
        let mut exploding: Vec<ItemId> = Vec::new();
        for id in field.items().map(|i| i.id).collect::<Vec<_>>() {
            let Some(item) = field.item_mut(id) else {
                continue;
            };
            if let Fuse::Timed(turns) = item.fuse {
                if turns <= 1 {
                    exploding.push(id);
                } else {
                    item.fuse = Fuse::Timed(turns - 1);
                }
            }
        }

        for id in exploding {
            let Some(item) = field.item(id) else {
                continue;
            };
            let pos = match item.owner {
                ItemOwner::Tile(pos) => pos,
                ItemOwner::Unit(unit) => {
                    // Goes off in someone's hands.
                    match field.unit(unit) {
                        Some(u) => u.pos,
                        None => continue,
                    }
                }
                ItemOwner::None => continue,
            };
            let def = &field.rules.items[item.def.0 as usize];
            let (power, dt, radius) =
                (def.power, def.damage_type, def.blast_radius);
            field.transfer_item(id, ItemOwner::None);
            self.explode(field, pos, power, dt, radius, None);
        }
    }

    /// Burn down fires and thin out smoke at the end of a turn.
    ///
    /// Units standing in flames take fire damage.
    pub fn tick_terrain(&self, field: &mut Battlefield, source: Option<UnitId>) {
        let positions: Vec<Position> = field.positions().collect();
        for pos in positions {
            let burning = {
                let tile = field.tile_mut(pos).expect("in bounds");
                if tile.smoke > 0 {
                    tile.smoke -= 1;
                }
                if tile.fire > 0 {
                    tile.fire -= 1;
                    tile.add_smoke(1);
                    true
                } else {
                    false
                }
            };
            if burning {
                if let Some(id) = field.unit_at(pos) {
                    self.hit_unit(field, id, 10, DamageType::Incendiary, source);
                }
            }
        }
    }

    /// Set a tile burning if any of its parts catches at this power.
    fn try_ignite(&self, field: &mut Battlefield, pos: Position, power: i32) {
        let mut fuel = None;
        for kind in [
            PartKind::Floor,
            PartKind::WestWall,
            PartKind::NorthWall,
            PartKind::Object,
        ] {
            if let Some(def) = field.part_def(pos, kind) {
                if def.flammable < power {
                    fuel = Some(fuel.unwrap_or(0).max(def.fuel));
                }
            }
        }
        if let Some(fuel) = fuel {
            field.tile_mut(pos).expect("in bounds").ignite(fuel.max(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn explosion_power_falls_off_monotonically() {
        let (mut field, _) = field_with_units(&[r#"
.........
.........
.........
"#]);
        let e = TileEngine::default();
        let center = ivec3(4, 1, 0);
        let reached =
            e.explode(&mut field, center, 60, DamageType::HighExplosive, 5, None);

        assert_eq!(reached[&center], 60);
        let mut prev = i32::MAX;
        for x in 4..9 {
            let p = reached.get(&ivec3(x, 1, 0)).copied().unwrap_or(0);
            assert!(p <= prev, "power rose at x={x}");
            prev = p;
        }
        // Nothing lands beyond the blast radius.
        for pos in field.positions() {
            if distance_sq(center, pos, true) > 25 {
                assert!(!reached.contains_key(&pos), "power beyond radius at {pos}");
            }
        }
    }

    #[test]
    fn walls_shield_from_blasts() {
        let (mut field, _) = field_with_units(&[r#"
..|..
"#]);
        let e = TileEngine::default();
        let reached = e.explode(
            &mut field,
            ivec3(0, 0, 0),
            40,
            DamageType::HighExplosive,
            5,
            None,
        );
        let open = reached.get(&ivec3(1, 0, 0)).copied().unwrap_or(0);
        let shielded = reached.get(&ivec3(2, 0, 0)).copied().unwrap_or(0);
        assert!(open > 0);
        assert!(shielded < open - EXPLOSION_STEP_POWER);
    }

    #[test]
    fn blast_destroys_soft_walls() {
        let (mut field, _) = field_with_units(&[r#"
..|..
"#]);
        let e = TileEngine::default();
        // Wall armor is 40; the full 100 arrives at the wall's own tile.
        e.explode(
            &mut field,
            ivec3(2, 0, 0),
            100,
            DamageType::HighExplosive,
            5,
            None,
        );
        assert!(field.part_def(ivec3(2, 0, 0), PartKind::WestWall).is_none());
    }

    #[test]
    fn barrels_chain_explode() {
        let (mut field, _) = field_with_units(&[r#"
*.*..
"#]);
        let e = TileEngine::default();
        e.explode(
            &mut field,
            ivec3(0, 0, 0),
            50,
            DamageType::HighExplosive,
            5,
            None,
        );

        // Both barrels burst and their charges went off in a chain.
        let barrel = field.rules.part_named("barrel").unwrap();
        for x in [0, 2] {
            let tile = field.tile(ivec3(x, 0, 0)).unwrap();
            assert_ne!(tile.part(PartKind::Object), Some(barrel), "barrel {x}");
            assert_eq!(tile.explosive, 0);
        }
        // Only the chained blast at the far barrel is strong enough to
        // smoke up the end of the corridor.
        assert!(field.tile(ivec3(4, 0, 0)).unwrap().smoke > 0);
    }

    #[test]
    fn destroyed_floor_drops_unit() {
        let (mut field, units) = field_with_units(&[
            "...\n...",
            "..A\n...",
        ]);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();
        assert_eq!(unit_pos(&field, a), ivec3(2, 0, 1));

        assert!(e.hit_tile(&mut field, ivec3(2, 0, 1), PartKind::Floor, 60));
        assert_eq!(unit_pos(&field, a), ivec3(2, 0, 0));
    }

    #[test]
    fn rifle_fire_wounds_then_kills() {
        let (mut field, units) = field_with_units(&[r#"
A...b
"#]);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();
        let b = *units.get(&'b').unwrap();

        assert!(!e.hit_unit(
            &mut field,
            b,
            30,
            DamageType::ArmorPiercing,
            Some(a)
        ));
        assert_eq!(field.unit(b).unwrap().status, UnitStatus::Standing);

        assert!(e.hit_unit(&mut field, b, 30, DamageType::ArmorPiercing, Some(a)));
        assert_eq!(field.unit(b).unwrap().status, UnitStatus::Dead);
        // Tile reference cleared, corpse left behind.
        assert_eq!(field.unit_at(ivec3(4, 0, 0)), None);
        let corpse = field.rules.item_named("corpse").unwrap();
        assert!(field
            .tile(ivec3(4, 0, 0))
            .unwrap()
            .items
            .iter()
            .any(|&i| field.item(i).unwrap().def == corpse));
        // The shooter trained from both hits.
        assert_eq!(field.unit(a).unwrap().exp.firing, 2);
    }

    #[test]
    fn stun_damage_knocks_out() {
        let (mut field, units) = field_with_units(&[r#"
A.b
"#]);
        let e = TileEngine::default();
        let b = *units.get(&'b').unwrap();

        assert!(!e.hit_unit(&mut field, b, 55, DamageType::Stun, None));
        let unit = field.unit(b).unwrap();
        assert_eq!(unit.status, UnitStatus::Unconscious);
        assert_eq!(unit.health, 35);
    }

    #[test]
    fn grenade_fuse_counts_down() {
        let (mut field, _) = field_with_units(&[r#"
.....
"#]);
        let e = TileEngine::default();
        let grenade = field.rules.item_named("grenade").unwrap();
        let id = field.spawn_item(grenade, ItemOwner::Tile(ivec3(2, 0, 0)));
        field.item_mut(id).unwrap().prime(2);

        e.tick_fuses(&mut field);
        assert_eq!(field.item(id).unwrap().fuse, Fuse::Timed(1));
        assert_eq!(field.tile(ivec3(2, 0, 0)).unwrap().smoke, 0);

        e.tick_fuses(&mut field);
        // Went off: no longer on the tile, blast smoke left behind.
        assert!(field.tile(ivec3(2, 0, 0)).unwrap().items.is_empty());
        assert!(field.tile(ivec3(2, 0, 0)).unwrap().smoke > 0);
    }

    #[test]
    fn fire_burns_down_into_smoke() {
        let (mut field, _) = field_with_units(&[r#"
.!.
"#]);
        let e = TileEngine::default();
        assert_eq!(field.tile(ivec3(1, 0, 0)).unwrap().fire, 3);
        e.tick_terrain(&mut field, None);
        let tile = field.tile(ivec3(1, 0, 0)).unwrap();
        assert_eq!(tile.fire, 2);
        assert!(tile.smoke > 0);
    }
}
