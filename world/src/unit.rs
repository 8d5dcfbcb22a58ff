//! Units taking part in the battle.

use serde::{Deserialize, Serialize};
use util::{HashSet, IndexSet};

use crate::{item::ItemId, position::Position};

/// Registry key of a unit.
#[derive(
    Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize, PartialOrd, Ord,
)]
pub struct UnitId(pub u32);

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Faction {
    Player,
    Alien,
    Neutral,
}

impl Faction {
    /// Aliens are hostile to everyone else; neutrals only fight back.
    pub fn hostile_to(self, other: Faction) -> bool {
        use Faction::*;
        matches!(
            (self, other),
            (Player, Alien) | (Alien, Player) | (Alien, Neutral) | (Neutral, Alien)
        )
    }
}

#[derive(
    Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize,
)]
pub enum UnitStatus {
    #[default]
    Standing,
    Unconscious,
    Dead,
}

#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct UnitStats {
    pub reactions: i32,
    pub firing: i32,
    pub melee: i32,
    pub psi_skill: i32,
    pub psi_strength: i32,
}

/// Training counters bumped by successful actions.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct Experience {
    pub firing: i32,
    pub melee: i32,
    pub reactions: i32,
    pub psi: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BattleUnit {
    pub id: UnitId,
    pub name: String,
    pub faction: Faction,
    /// Faction the unit reverts to when mind control ends.
    pub original_faction: Faction,
    pub status: UnitStatus,
    pub pos: Position,
    /// Facing as a `DIR_8` index.
    pub facing: usize,

    pub tu: i32,
    pub max_tu: i32,
    pub energy: i32,
    pub max_energy: i32,
    pub health: i32,
    pub max_health: i32,
    pub stun: i32,
    pub morale: i32,
    pub armor: i32,
    pub stats: UnitStats,
    pub exp: Experience,

    /// Standing height in voxels.
    pub height: i32,
    pub kneel_height: i32,
    pub kneeling: bool,
    /// Personal light power emitted when unit lighting is on.
    pub personal_light: i32,

    /// Wielded weapon.
    pub weapon: Option<ItemId>,
    /// Inventory besides the wielded weapon.
    pub inventory: Vec<ItemId>,

    /// Tiles currently visible to this unit. Directional and per-unit.
    pub visible_tiles: HashSet<Position>,
    /// Units currently visible to this unit, in first-seen order.
    pub visible_units: IndexSet<UnitId>,
}

impl BattleUnit {
    /// A unit with baseline soldier stats. Callers adjust fields after.
    pub fn new(name: impl Into<String>, faction: Faction, pos: Position) -> Self {
        BattleUnit {
            id: UnitId(0),
            name: name.into(),
            faction,
            original_faction: faction,
            status: UnitStatus::Standing,
            pos,
            facing: 0,
            tu: 60,
            max_tu: 60,
            energy: 80,
            max_energy: 80,
            health: 35,
            max_health: 35,
            stun: 0,
            morale: 100,
            armor: 4,
            stats: UnitStats {
                reactions: 50,
                firing: 60,
                melee: 60,
                psi_skill: 0,
                psi_strength: 35,
            },
            exp: Experience::default(),
            height: 20,
            kneel_height: 14,
            kneeling: false,
            personal_light: 15,
            weapon: None,
            inventory: Vec::new(),
            visible_tiles: HashSet::default(),
            visible_units: IndexSet::default(),
        }
    }

    /// Unit is dead or unconscious and out of play.
    pub fn is_out(&self) -> bool {
        self.status != UnitStatus::Standing
    }

    pub fn current_height(&self) -> i32 {
        if self.kneeling {
            self.kneel_height
        } else {
            self.height
        }
    }

    pub fn spend_tu(&mut self, cost: i32) -> bool {
        if self.tu < cost {
            return false;
        }
        self.tu -= cost;
        true
    }

    /// Score a moving unit defends its initiative with against reactors.
    pub fn reaction_initiative(&self) -> f64 {
        if self.max_tu == 0 {
            return 0.0;
        }
        self.stats.reactions as f64 * self.tu as f64 / self.max_tu as f64
    }

    /// Apply raw damage to pools and update status.
    ///
    /// Returns true if this killed the unit.
    pub fn take_damage(&mut self, health_dmg: i32, stun_dmg: i32) -> bool {
        self.health -= health_dmg.max(0);
        self.stun += stun_dmg.max(0);

        if self.health <= 0 {
            self.status = UnitStatus::Dead;
            true
        } else {
            if self.stun >= self.health {
                self.status = UnitStatus::Unconscious;
            }
            false
        }
    }

    pub fn clear_fov(&mut self) {
        self.visible_tiles.clear();
        self.visible_units.clear();
    }

    pub fn release_mind_control(&mut self) {
        self.faction = self.original_faction;
    }
}
