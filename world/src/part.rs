//! Damageable terrain part definitions.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::{item::ItemDef, HARD_BLOCK};

/// The four part slots of a tile.
///
/// Walls sit on the north and west edges of their own tile; the southern and
/// eastern faces of a tile are the walls of its neighbors.
#[derive(
    Copy, Clone, Eq, PartialEq, Hash, Debug, Display, EnumIter, Serialize, Deserialize,
)]
pub enum PartKind {
    Floor,
    WestWall,
    NorthWall,
    Object,
}

/// Damage type categories, each with independent attenuation rules.
#[derive(
    Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Display, EnumIter, Serialize, Deserialize,
)]
pub enum DamageType {
    /// Pure line-of-sight probe, no damage semantics.
    #[default]
    None,
    ArmorPiercing,
    Incendiary,
    HighExplosive,
    Laser,
    Plasma,
    Stun,
    Melee,
    Acid,
    Smoke,
}

impl DamageType {
    /// Damage goes to the stun pool instead of health.
    pub fn to_stun(self) -> bool {
        matches!(self, DamageType::Stun | DamageType::Smoke)
    }

    /// Damage can set terrain on fire.
    pub fn ignites(self) -> bool {
        matches!(self, DamageType::Incendiary)
    }
}

/// Index of a part definition in the ruleset.
#[derive(
    Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize, PartialOrd, Ord,
)]
pub struct PartId(pub u16);

/// Terrain part definition: blockage, destructibility and door behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartDef {
    pub name: String,
    /// Damage needed to destroy the part. `HARD_BLOCK` means indestructible.
    pub armor: i32,
    /// Sight attenuation. `HARD_BLOCK` is opaque.
    pub block_vision: i32,
    /// Light attenuation on top of the per-tile falloff.
    pub block_light: i32,
    pub block_smoke: i32,
    pub block_fire: i32,
    pub block_stun: i32,
    pub block_explosive: i32,
    /// Raised walking surface height in voxels (stairs, rubble mounds).
    pub terrain_level: i32,
    /// Occupied voxel height for object parts.
    pub height: i32,
    /// Resistance against catching fire, `HARD_BLOCK` is fireproof.
    pub flammable: i32,
    /// Turns the part burns for once ignited.
    pub fuel: i32,
    /// Secondary explosion power released when the part is destroyed.
    pub explosive: i32,
    /// Light emitted by the part itself (lamps, glowing fungus).
    pub light_source: i32,
    /// Hinged door a unit can open by spending time units.
    pub is_door: bool,
    /// Sliding door that shuts again at the end of the turn.
    pub is_sliding_door: bool,
    /// This part is a door in its open state.
    pub is_open: bool,
    /// Object that fills the whole tile and blocks like a wall.
    pub is_big_wall: bool,
    /// Open/closed counterpart for door parts.
    pub alt_part: Option<PartId>,
    /// Part left behind when this one is destroyed.
    pub die_to: Option<PartId>,
}

impl Default for PartDef {
    fn default() -> Self {
        PartDef {
            name: String::new(),
            armor: 10,
            block_vision: 0,
            block_light: 0,
            block_smoke: 0,
            block_fire: 0,
            block_stun: 0,
            block_explosive: 0,
            terrain_level: 0,
            height: 0,
            flammable: HARD_BLOCK,
            fuel: 0,
            explosive: 0,
            light_source: 0,
            is_door: false,
            is_sliding_door: false,
            is_open: false,
            is_big_wall: false,
            alt_part: None,
            die_to: None,
        }
    }
}

impl PartDef {
    /// Attenuation this part applies to the given damage type.
    ///
    /// Called on every voxel step of every trace and every propagation hop,
    /// so it stays a plain table lookup.
    pub fn block(&self, damage_type: DamageType) -> i32 {
        use DamageType::*;
        match damage_type {
            None => self.block_vision,
            Smoke => self.block_smoke,
            Incendiary => self.block_fire,
            Stun => self.block_stun,
            ArmorPiercing | HighExplosive | Laser | Plasma | Melee | Acid => {
                self.block_explosive
            }
        }
    }

    pub fn blocks_vision(&self) -> bool {
        self.block_vision >= HARD_BLOCK
    }
}

/// Static battle content: terrain part and item definitions.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ruleset {
    pub parts: Vec<PartDef>,
    pub items: Vec<ItemDef>,
}

impl Ruleset {
    pub fn part(&self, id: PartId) -> &PartDef {
        &self.parts[id.0 as usize]
    }

    pub fn part_named(&self, name: &str) -> Option<PartId> {
        self.parts
            .iter()
            .position(|p| p.name == name)
            .map(|i| PartId(i as u16))
    }

    pub fn item_named(&self, name: &str) -> Option<crate::ItemDefId> {
        self.items
            .iter()
            .position(|i| i.name == name)
            .map(|i| crate::ItemDefId(i as u16))
    }

    /// Check referential integrity of the content.
    ///
    /// A failure here is malformed content, fatal per the error taxonomy.
    pub fn validate(&self) -> Result<()> {
        for (i, part) in self.parts.iter().enumerate() {
            for target in [part.alt_part, part.die_to].into_iter().flatten() {
                if target.0 as usize >= self.parts.len() {
                    bail!(
                        "part {:?} ({}) references missing part {}",
                        part.name,
                        i,
                        target.0
                    );
                }
            }
            if (part.is_door || part.is_sliding_door) && part.alt_part.is_none()
            {
                bail!("door part {:?} has no open/closed counterpart", part.name);
            }
        }
        Ok(())
    }

    /// Built-in content used by tests and the demo driver.
    pub fn standard() -> Ruleset {
        let mut ret = Ruleset::default();

        // Part ids are assigned in push order; doors and their counterparts
        // patch each other up after the pushes.
        let floor = ret.push_part(PartDef {
            name: "floor".into(),
            armor: 20,
            block_light: 10,
            ..Default::default()
        });
        debug_assert_eq!(floor, PartId(0));

        ret.push_part(PartDef {
            name: "wall".into(),
            armor: 40,
            block_vision: HARD_BLOCK,
            block_light: HARD_BLOCK,
            block_smoke: HARD_BLOCK,
            block_fire: HARD_BLOCK,
            block_stun: HARD_BLOCK,
            block_explosive: 50,
            ..Default::default()
        });

        ret.push_part(PartDef {
            name: "block".into(),
            armor: 60,
            height: TILE_OBJECT_HEIGHT,
            block_vision: HARD_BLOCK,
            block_light: HARD_BLOCK,
            block_smoke: HARD_BLOCK,
            block_fire: HARD_BLOCK,
            block_stun: HARD_BLOCK,
            block_explosive: 60,
            is_big_wall: true,
            ..Default::default()
        });

        ret.push_part(PartDef {
            name: "window".into(),
            armor: 5,
            block_vision: 0,
            block_light: 0,
            block_smoke: HARD_BLOCK,
            block_stun: HARD_BLOCK,
            block_explosive: 5,
            ..Default::default()
        });

        let door = ret.push_part(PartDef {
            name: "door".into(),
            armor: 20,
            block_vision: HARD_BLOCK,
            block_light: HARD_BLOCK,
            block_smoke: HARD_BLOCK,
            block_fire: HARD_BLOCK,
            block_stun: HARD_BLOCK,
            block_explosive: 20,
            is_door: true,
            ..Default::default()
        });
        let door_open = ret.push_part(PartDef {
            name: "door-open".into(),
            armor: 20,
            is_open: true,
            ..Default::default()
        });
        ret.parts[door.0 as usize].alt_part = Some(door_open);
        ret.parts[door_open.0 as usize].alt_part = Some(door);
        ret.parts[door_open.0 as usize].is_door = true;

        let slide = ret.push_part(PartDef {
            name: "sliding-door".into(),
            armor: 50,
            block_vision: HARD_BLOCK,
            block_light: HARD_BLOCK,
            block_smoke: HARD_BLOCK,
            block_fire: HARD_BLOCK,
            block_stun: HARD_BLOCK,
            block_explosive: 40,
            is_sliding_door: true,
            ..Default::default()
        });
        let slide_open = ret.push_part(PartDef {
            name: "sliding-door-open".into(),
            armor: 50,
            is_open: true,
            ..Default::default()
        });
        ret.parts[slide.0 as usize].alt_part = Some(slide_open);
        ret.parts[slide_open.0 as usize].alt_part = Some(slide);
        ret.parts[slide_open.0 as usize].is_sliding_door = true;

        let rubble = ret.push_part(PartDef {
            name: "rubble".into(),
            armor: 10,
            terrain_level: 4,
            ..Default::default()
        });

        ret.push_part(PartDef {
            name: "barrel".into(),
            armor: 8,
            height: 10,
            block_vision: 3,
            block_light: 2,
            block_explosive: 5,
            explosive: 40,
            flammable: 10,
            fuel: 3,
            die_to: Some(rubble),
            ..Default::default()
        });

        ret.push_part(PartDef {
            name: "lamp".into(),
            armor: 4,
            height: 8,
            light_source: 10,
            ..Default::default()
        });

        ret.items = ItemDef::standard();
        ret
    }

    fn push_part(&mut self, def: PartDef) -> PartId {
        self.parts.push(def);
        PartId((self.parts.len() - 1) as u16)
    }
}

/// Default voxel height of a full-tile object part.
pub const TILE_OBJECT_HEIGHT: i32 = 24;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_ruleset_is_valid() {
        let rules = Ruleset::standard();
        rules.validate().unwrap();
        assert!(rules.part_named("wall").is_some());
        assert!(rules.part_named("no-such-part").is_none());

        let door = rules.part_named("door").unwrap();
        let open = rules.part(door).alt_part.unwrap();
        assert!(rules.part(open).is_open);
        assert_eq!(rules.part(open).alt_part, Some(door));
    }

    #[test]
    fn validation_catches_dangling_reference() {
        let mut rules = Ruleset::standard();
        rules.parts[0].die_to = Some(PartId(999));
        assert!(rules.validate().is_err());
    }

    #[test]
    fn block_table() {
        let rules = Ruleset::standard();
        let wall = rules.part(rules.part_named("wall").unwrap());
        assert_eq!(wall.block(DamageType::None), HARD_BLOCK);
        assert_eq!(wall.block(DamageType::HighExplosive), 50);
        let window = rules.part(rules.part_named("window").unwrap());
        assert_eq!(window.block(DamageType::None), 0);
        assert_eq!(window.block(DamageType::Smoke), HARD_BLOCK);
    }
}
