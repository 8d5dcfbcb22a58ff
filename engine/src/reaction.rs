//! Reaction fire: interrupting a unit that moves in the open.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use util::RngExt;

use crate::{prelude::*, MELEE_TU_COST, REACTION_CHAIN_LIMIT};

/// A would-be reactor, the attack it can make and its initiative score.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct ReactionScore {
    pub unit: UnitId,
    pub attack: BattleActionType,
    pub score: f64,
}

impl TileEngine {
    /// All hostiles that see the trigger unit and have an attack ready,
    /// in spawn order.
    pub fn get_spotting_units(
        &self,
        field: &Battlefield,
        trigger: UnitId,
    ) -> Vec<ReactionScore> {
        let Some(target) = field.unit(trigger) else {
            return Vec::new();
        };
        field
            .units()
            .filter(|u| {
                u.id != trigger
                    && !u.is_out()
                    && u.faction.hostile_to(target.faction)
                    && self.visible(field, u.id, target.pos)
            })
            .filter_map(|u| {
                let attack = self.determine_reaction(field, u, target)?;
                Some(ReactionScore {
                    unit: u.id,
                    attack,
                    score: u.reaction_initiative(),
                })
            })
            .collect()
    }

    /// The spotter that outdraws the trigger, if any.
    ///
    /// Highest score wins; on a tie the earlier-spawned unit does. The
    /// winner still has to beat the trigger's own initiative.
    pub fn get_reactor(
        &self,
        field: &Battlefield,
        spotters: &[ReactionScore],
        trigger: UnitId,
    ) -> Option<ReactionScore> {
        let initiative =
            field.unit(trigger).map_or(0.0, |u| u.reaction_initiative());
        let mut best: Option<ReactionScore> = None;
        for s in spotters {
            if best.is_none_or(|b| s.score > b.score) {
                best = Some(*s);
            }
        }
        best.filter(|b| b.score > initiative)
    }

    /// Execute one reaction attack. Returns false when the attack turned
    /// out to be impossible after all; time units are only spent on a real
    /// attempt.
    pub fn try_reaction(
        &self,
        field: &mut Battlefield,
        reaction: &ReactionScore,
        target: UnitId,
    ) -> bool {
        match reaction.attack {
            BattleActionType::SnapShot => {
                self.reaction_shot(field, reaction.unit, target)
            }
            BattleActionType::Melee => {
                self.reaction_strike(field, reaction.unit, target)
            }
            _ => false,
        }
    }

    /// Let everyone who saw the trigger act on it, best reflexes first.
    ///
    /// Reactors keep going until the trigger is down or nobody beats its
    /// initiative anymore; every attack drains the reactor's time units and
    /// with them its score.
    pub fn check_reaction_fire(
        &self,
        field: &mut Battlefield,
        trigger: UnitId,
    ) -> bool {
        let mut acted = false;
        for _ in 0..REACTION_CHAIN_LIMIT {
            if field.unit(trigger).is_none_or(|u| u.is_out()) {
                break;
            }
            let spotters = self.get_spotting_units(field, trigger);
            let Some(reactor) = self.get_reactor(field, &spotters, trigger)
            else {
                break;
            };
            if !self.try_reaction(field, &reactor, trigger) {
                break;
            }
            acted = true;
        }
        acted
    }

    /// Attack a spotter could interrupt with right now, if any.
    fn determine_reaction(
        &self,
        field: &Battlefield,
        spotter: &BattleUnit,
        target: &BattleUnit,
    ) -> Option<BattleActionType> {
        if let Some(wid) = spotter.weapon {
            if let (Some(item), Some(def)) =
                (field.item(wid), field.item_def(wid))
            {
                let loaded = def.rounds == 0 || item.rounds > 0;
                if def.kind == ItemKind::Weapon
                    && def.tu_snap > 0
                    && spotter.tu >= def.tu_snap
                    && loaded
                {
                    let eye = self.sight_origin_voxel(field, spotter);
                    if self
                        .can_target_unit(field, eye, target.id, Some(spotter.id))
                        .is_some()
                    {
                        return Some(BattleActionType::SnapShot);
                    }
                }
            }
        }

        let d = spotter.pos - target.pos;
        if d.z == 0
            && d.truncate().abs().max_element() == 1
            && spotter.tu >= MELEE_TU_COST
        {
            return Some(BattleActionType::Melee);
        }
        None
    }

    fn reaction_shot(
        &self,
        field: &mut Battlefield,
        shooter: UnitId,
        target: UnitId,
    ) -> bool {
        let (wid, tu_cost, acc, power, dt, uses_ammo, firing, eye) = {
            let Some(unit) = field.unit(shooter) else {
                return false;
            };
            let Some(wid) = unit.weapon else {
                return false;
            };
            let Some(def) = field.item_def(wid) else {
                return false;
            };
            (
                wid,
                def.tu_snap,
                def.accuracy_snap,
                def.power,
                def.damage_type,
                def.rounds > 0,
                unit.stats.firing,
                self.sight_origin_voxel(field, unit),
            )
        };
        if uses_ammo
            && field.item(wid).is_none_or(|i| i.rounds <= 0)
        {
            return false;
        }
        let Some(aim) = self.can_target_unit(field, eye, target, Some(shooter))
        else {
            return false;
        };
        if !field
            .unit_mut(shooter)
            .expect("checked above")
            .spend_tu(tu_cost)
        {
            return false;
        }
        if uses_ammo {
            field.item_mut(wid).expect("checked above").rounds -= 1;
        }

        let chance = acc * firing / 100;
        if field.rng.percent(chance) {
            info!("{shooter:?} reaction shot hits {target:?}");
            self.hit(field, aim, power, dt, Some(shooter));
        } else {
            debug!("{shooter:?} reaction shot misses");
        }
        field.unit_mut(shooter).expect("checked above").exp.reactions += 1;
        true
    }

    fn reaction_strike(
        &self,
        field: &mut Battlefield,
        attacker: UnitId,
        target: UnitId,
    ) -> bool {
        let (skill, power, dt) = {
            let Some(unit) = field.unit(attacker) else {
                return false;
            };
            let (power, dt) = unit
                .weapon
                .and_then(|w| field.item_def(w))
                .map_or((15, DamageType::Melee), |d| (d.power, d.damage_type));
            (unit.stats.melee, power, dt)
        };
        if !field
            .unit_mut(attacker)
            .expect("checked above")
            .spend_tu(MELEE_TU_COST)
        {
            return false;
        }
        if field.rng.percent(skill) {
            info!("{attacker:?} reaction strike hits {target:?}");
            self.hit_unit(field, target, power, dt, Some(attacker));
        } else {
            debug!("{attacker:?} reaction strike misses");
        }
        field.unit_mut(attacker).expect("checked above").exp.reactions += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn lit(field: &mut Battlefield) {
        field.global_shade = 0;
        TileEngine::default().calculate_sun_shading(field);
    }

    #[test]
    fn spotters_are_scored_and_requeried() {
        let (mut field, units) = field_with_units(&[r#"
A....b
C.....
"#]);
        lit(&mut field);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();
        let b = *units.get(&'b').unwrap();
        let c = *units.get(&'C').unwrap();
        arm(&mut field, a, "rifle");
        arm(&mut field, c, "rifle");
        field.unit_mut(c).unwrap().stats.reactions = 30;
        // The trigger has spent most of its turn moving.
        field.unit_mut(b).unwrap().tu = 20;

        let spotters = e.get_spotting_units(&field, b);
        let scores: Vec<f64> = spotters.iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![50.0, 30.0]);

        let reactor = e.get_reactor(&field, &spotters, b).unwrap();
        assert_eq!(reactor.unit, a);

        // Once the first reactor has burned its time units down, the
        // requery hands the interrupt to the slower one.
        field.unit_mut(a).unwrap().tu = 30;
        let spotters = e.get_spotting_units(&field, b);
        let reactor = e.get_reactor(&field, &spotters, b).unwrap();
        assert_eq!(reactor.unit, c);
    }

    #[test]
    fn trigger_initiative_wins_draws() {
        let (mut field, units) = field_with_units(&[r#"
A....b
"#]);
        lit(&mut field);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();
        let b = *units.get(&'b').unwrap();
        arm(&mut field, a, "rifle");

        // Equal scores: the moving unit keeps the initiative.
        let spotters = e.get_spotting_units(&field, b);
        assert_eq!(spotters.len(), 1);
        assert!(e.get_reactor(&field, &spotters, b).is_none());
    }

    #[test]
    fn unarmed_units_only_react_in_melee_range() {
        let (mut field, units) = field_with_units(&[r#"
A....b
.....c
"#]);
        lit(&mut field);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();
        let b = *units.get(&'b').unwrap();

        // A is unarmed and five tiles away: no reaction against b.
        assert!(e.get_spotting_units(&field, b).is_empty());

        // Adjacent to c, the bare-handed strike is on the table.
        let c = *units.get(&'c').unwrap();
        field.unit_mut(a).unwrap().pos = ivec3(5, 0, 0);
        let spotters: Vec<_> = e.get_spotting_units(&field, c);
        assert_eq!(spotters.len(), 1);
        assert_eq!(spotters[0].attack, BattleActionType::Melee);
    }

    #[test]
    fn reaction_shot_spends_tu_and_ammo() {
        let (mut field, units) = field_with_units(&[r#"
A....b
"#]);
        lit(&mut field);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();
        let b = *units.get(&'b').unwrap();
        arm(&mut field, a, "rifle");

        let spotters = e.get_spotting_units(&field, b);
        assert!(e.try_reaction(&mut field, &spotters[0], b));

        let shooter = field.unit(a).unwrap();
        assert_eq!(shooter.tu, 48);
        assert_eq!(shooter.exp.reactions, 1);
        let rifle = shooter.weapon.unwrap();
        assert_eq!(field.item(rifle).unwrap().rounds, 19);
    }

    #[test]
    fn slow_trigger_draws_fire() {
        let (mut field, units) = field_with_units(&[r#"
A....b
"#]);
        lit(&mut field);
        let e = TileEngine::default();
        let a = *units.get(&'A').unwrap();
        let b = *units.get(&'b').unwrap();
        arm(&mut field, a, "rifle");
        field.unit_mut(b).unwrap().tu = 10;

        assert!(e.check_reaction_fire(&mut field, b));
        assert!(field.unit(a).unwrap().tu < 60);

        // Behind a wall nothing triggers.
        let (mut field, units) = field_with_units(&[r#"
A.#.b
..#..
"#]);
        lit(&mut field);
        let a = *units.get(&'A').unwrap();
        let b = *units.get(&'b').unwrap();
        arm(&mut field, a, "rifle");
        field.unit_mut(b).unwrap().tu = 10;
        assert!(!e.check_reaction_fire(&mut field, b));
    }
}
