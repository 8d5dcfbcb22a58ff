//! Deliberate attacks: melee, psionics and throwing.

use log::{debug, info};
use util::RngExt;

use crate::{prelude::*, MELEE_TU_COST, PSI_TU_COST, THROW_TU_COST};

impl TileEngine {
    /// Can the attacker strike the target tile hand to hand?
    ///
    /// The tiles must be adjacent on the same level with nothing solid on
    /// the edge between them; with a direction given, the attack must also
    /// come from that facing.
    pub fn valid_melee_range(
        &self,
        field: &Battlefield,
        attacker_pos: Position,
        target_pos: Position,
        dir: Option<usize>,
    ) -> bool {
        let d = target_pos - attacker_pos;
        if d.z != 0 || d.truncate().abs().max_element() != 1 {
            return false;
        }
        if let Some(dir) = dir {
            if position::direction_to(attacker_pos, target_pos) != dir {
                return false;
            }
        }
        // The sight channel decides reachability: a wall that can be seen
        // through at all can be struck through.
        self.horizontal_blockage(
            field,
            attacker_pos,
            target_pos,
            DamageType::None,
            true,
        ) < HARD_BLOCK
    }

    /// Strike an adjacent unit with the wielded weapon or bare hands.
    ///
    /// Returns false when the attack is impossible; a swing that merely
    /// misses still spends the time units and returns true.
    pub fn melee_attack(
        &self,
        field: &mut Battlefield,
        action: &BattleAction,
    ) -> bool {
        let Some(target) = field.unit_at(action.target) else {
            return false;
        };
        let (pos, skill, power, dt, tu_cost) = {
            let Some(unit) = field.unit(action.actor) else {
                return false;
            };
            if unit.is_out() {
                return false;
            }
            let (power, dt, tu) = unit
                .weapon
                .and_then(|w| field.item_def(w))
                .map_or((15, DamageType::Melee, MELEE_TU_COST), |d| {
                    (d.power, d.damage_type, d.tu_snap.max(MELEE_TU_COST))
                });
            (unit.pos, unit.stats.melee, power, dt, tu)
        };

        // The attacker turns into the strike first.
        let facing = position::direction_to(pos, action.target);
        if !self.valid_melee_range(field, pos, action.target, Some(facing)) {
            return false;
        }
        let unit = field.unit_mut(action.actor).expect("checked above");
        unit.facing = facing;
        if !unit.spend_tu(tu_cost) {
            return false;
        }

        if field.rng.percent(skill) {
            info!("{:?} strikes {target:?}", action.actor);
            self.hit_unit(field, target, power, dt, Some(action.actor));
            if let Some(unit) = field.unit_mut(action.actor) {
                unit.exp.melee += 1;
            }
        } else {
            debug!("{:?} swings and misses", action.actor);
        }
        true
    }

    /// Percent chance of a psionic attack overcoming the target's will.
    pub fn psi_attack_chance(
        &self,
        field: &Battlefield,
        attacker: UnitId,
        target: UnitId,
    ) -> i32 {
        let (Some(att), Some(def)) =
            (field.unit(attacker), field.unit(target))
        else {
            return 0;
        };
        let strength = att.stats.psi_strength * att.stats.psi_skill / 50;
        let defense = def.stats.psi_strength;
        let range_penalty = 2 * distance(att.pos, def.pos);
        (50 + strength - defense - range_penalty).clamp(0, 100)
    }

    /// Attempt a panic or mind control attack on the unit at the target
    /// tile. Returns true when the target's will was broken.
    pub fn psi_attack(
        &self,
        field: &mut Battlefield,
        action: &BattleAction,
    ) -> bool {
        let Some(target) = field.unit_at(action.target) else {
            return false;
        };
        let Some(attacker) = field.unit(action.actor) else {
            return false;
        };
        if attacker.stats.psi_skill <= 0
            || !self.visible(field, action.actor, action.target)
        {
            return false;
        }
        let attacker_faction = attacker.faction;

        if !field
            .unit_mut(action.actor)
            .expect("checked above")
            .spend_tu(PSI_TU_COST)
        {
            return false;
        }

        let chance = self.psi_attack_chance(field, action.actor, target);
        if !field.rng.percent(chance) {
            debug!("{:?} resists the psionic attack", target);
            return false;
        }

        let victim = field.unit_mut(target).expect("checked above");
        match action.kind {
            BattleActionType::Panic => {
                info!("{target:?} panics");
                victim.morale = (victim.morale - 30).max(0);
            }
            BattleActionType::MindControl => {
                info!("{target:?} is mind controlled");
                victim.faction = attacker_faction;
                victim.clear_fov();
                self.calculate_fov(field, target, None);
            }
            _ => return false,
        }
        if let Some(unit) = field.unit_mut(action.actor) {
            unit.exp.psi += 1;
        }
        true
    }

    /// Throw the held item at the target tile.
    ///
    /// Refused when no ballistic arc reaches the target. The item lands
    /// where the arc ends; an impact-fused explosive goes off there.
    pub fn throw_item(
        &self,
        field: &mut Battlefield,
        action: &BattleAction,
    ) -> bool {
        let Some(item) = action.weapon else {
            return false;
        };
        let (origin, actor_pos) = {
            let Some(unit) = field.unit(action.actor) else {
                return false;
            };
            if unit.is_out() {
                return false;
            }
            (self.sight_origin_voxel(field, unit), unit.pos)
        };
        if !field.contains(action.target) {
            return false;
        }
        let target = tile_center_voxel(action.target, 2);
        let Some(curvature) =
            self.validate_throw(field, origin, target, Some(action.actor))
        else {
            debug!("no arc from {actor_pos} to {}", action.target);
            return false;
        };
        if !field
            .unit_mut(action.actor)
            .expect("checked above")
            .spend_tu(THROW_TU_COST)
        {
            return false;
        }

        let trace = self.calculate_parabola(
            field,
            origin,
            target,
            false,
            Some(action.actor),
            curvature,
            (0.0, 0.0),
        );
        let landing = voxel_to_tile(trace.stop);
        info!("{:?} throws to {landing}", action.actor);

        let fuse = field.item(item).map_or(Fuse::Unprimed, |i| i.fuse);
        if fuse == Fuse::Instant {
            let def = field.item_def(item).expect("live item");
            let (power, dt, radius) =
                (def.power, def.damage_type, def.blast_radius);
            field.transfer_item(item, ItemOwner::None);
            self.explode(field, landing, power, dt, radius, Some(action.actor));
        } else {
            field.transfer_item(item, ItemOwner::Tile(landing));
            if let (Fuse::Timed(_), Some(def)) =
                (fuse, field.item_def(item))
            {
                if def.blast_radius > 0 {
                    let radius = def.blast_radius;
                    self.set_danger_zone(field, landing, radius);
                }
            }
        }
        true
    }

    /// Mark tiles an explosion at `pos` would reach as dangerous, so AI
    /// units know to move out of a grenade's blast zone.
    pub fn set_danger_zone(
        &self,
        field: &mut Battlefield,
        pos: Position,
        radius: i32,
    ) {
        let center = tile_center_voxel(pos, TILE_HEIGHT / 2);
        let marks: Vec<Position> = field
            .positions()
            .filter(|&p| {
                distance_sq(pos, p, true) <= radius * radius
                    && (p == pos || {
                        let t = tile_center_voxel(p, TILE_HEIGHT / 2);
                        let trace = self
                            .calculate_line(field, center, t, false, None, None);
                        !trace.blocked() || voxel_to_tile(trace.stop) == p
                    })
            })
            .collect();
        for p in marks {
            field.tile_mut(p).expect("in bounds").danger = true;
        }
    }
}
