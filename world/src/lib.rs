//! Battlefield datatypes and rulesets.

mod ascii;
pub use ascii::parse_map;

mod battlefield;
pub use battlefield::Battlefield;

mod item;
pub use item::{BattleItem, Fuse, ItemDef, ItemDefId, ItemId, ItemKind, ItemOwner};

mod part;
pub use part::{DamageType, PartDef, PartId, PartKind, Ruleset};

pub mod position;
pub use position::Position;

mod tile;
pub use tile::Tile;

mod unit;
pub use unit::{BattleUnit, Experience, Faction, UnitStats, UnitStatus};
pub use unit::UnitId;

/// Brightest possible light level on a tile.
pub const MAX_LIGHT: i32 = 15;

/// Densest possible smoke or fire on a tile.
pub const MAX_SMOKE: i32 = 15;

/// Blockage value treated as a solid, impassable obstruction.
pub const HARD_BLOCK: i32 = 255;
