//! Items on the battlefield: weapons, grenades, flares, corpses.

use serde::{Deserialize, Serialize};

use crate::{part::DamageType, position::Position, unit::UnitId};

/// Registry key of a live item.
#[derive(
    Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize, PartialOrd, Ord,
)]
pub struct ItemId(pub u32);

/// Index of an item definition in the ruleset.
#[derive(
    Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize,
)]
pub struct ItemDefId(pub u16);

#[derive(
    Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize,
)]
pub enum ItemKind {
    Weapon,
    Grenade,
    Flare,
    Corpse,
}

/// Fuse state of an explosive or a flare.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
pub enum Fuse {
    #[default]
    Unprimed,
    /// Detonates when the countdown reaches zero at end of turn.
    Timed(i32),
    /// Detonates on the next impact.
    Instant,
}

/// Exactly one of unit, tile or nothing holds an item at a time.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
pub enum ItemOwner {
    #[default]
    None,
    Unit(UnitId),
    Tile(Position),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemDef {
    pub name: String,
    pub kind: ItemKind,
    pub power: i32,
    pub damage_type: DamageType,
    /// Blast radius in tiles for explosives, zero for point damage.
    pub blast_radius: i32,
    /// Base percent accuracy of a snap shot.
    pub accuracy_snap: i32,
    /// Time unit cost of a snap shot.
    pub tu_snap: i32,
    /// Clip capacity for weapons, zero for single-use items.
    pub rounds: i32,
    /// Light power emitted while lying primed on the ground.
    pub light_source: i32,
}

impl Default for ItemDef {
    fn default() -> Self {
        ItemDef {
            name: String::new(),
            kind: ItemKind::Weapon,
            power: 0,
            damage_type: DamageType::None,
            blast_radius: 0,
            accuracy_snap: 0,
            tu_snap: 0,
            rounds: 0,
            light_source: 0,
        }
    }
}

impl ItemDef {
    /// Built-in item content used by tests and the demo driver.
    pub fn standard() -> Vec<ItemDef> {
        vec![
            ItemDef {
                name: "rifle".into(),
                kind: ItemKind::Weapon,
                power: 30,
                damage_type: DamageType::ArmorPiercing,
                accuracy_snap: 60,
                tu_snap: 12,
                rounds: 20,
                ..Default::default()
            },
            ItemDef {
                name: "stun-rod".into(),
                kind: ItemKind::Weapon,
                power: 55,
                damage_type: DamageType::Stun,
                accuracy_snap: 70,
                tu_snap: 10,
                rounds: 0,
                ..Default::default()
            },
            ItemDef {
                name: "grenade".into(),
                kind: ItemKind::Grenade,
                power: 50,
                damage_type: DamageType::HighExplosive,
                blast_radius: 5,
                ..Default::default()
            },
            ItemDef {
                name: "flare".into(),
                kind: ItemKind::Flare,
                light_source: 15,
                ..Default::default()
            },
            ItemDef {
                name: "corpse".into(),
                kind: ItemKind::Corpse,
                ..Default::default()
            },
        ]
    }
}

/// A live item instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BattleItem {
    pub id: ItemId,
    pub def: ItemDefId,
    /// Rounds left in the clip for weapons.
    pub rounds: i32,
    pub fuse: Fuse,
    pub owner: ItemOwner,
}

impl BattleItem {
    /// Arm an explosive. `turns` of zero primes for impact detonation.
    pub fn prime(&mut self, turns: i32) {
        self.fuse = if turns <= 0 {
            Fuse::Instant
        } else {
            Fuse::Timed(turns)
        };
    }
}
