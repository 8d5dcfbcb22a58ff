//! The spatial grid and entity registries.

use glam::{ivec3, IVec3};
use log::debug;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use util::{GameRng, IndexMap};

use crate::{
    item::{BattleItem, Fuse, ItemDefId, ItemId, ItemOwner},
    part::{PartDef, PartKind, Ruleset},
    position::Position,
    tile::Tile,
    unit::{BattleUnit, UnitId},
};

/// Owning container for tiles, units and items.
///
/// Entities refer to each other through registry keys; removing an entity is
/// a single deregistration that clears every back-reference.
#[derive(Serialize, Deserialize)]
pub struct Battlefield {
    size: IVec3,
    tiles: Vec<Tile>,
    pub rules: Ruleset,
    units: IndexMap<UnitId, BattleUnit>,
    items: IndexMap<ItemId, BattleItem>,
    next_unit_id: u32,
    next_item_id: u32,
    pub rng: GameRng,
    /// Global darkness of the mission, 0 full day to 15 night.
    pub global_shade: i32,
}

impl Battlefield {
    pub fn new(size: IVec3, rules: Ruleset, seed: u64) -> Self {
        assert!(size.min_element() > 0, "degenerate battlefield size");
        Battlefield {
            size,
            tiles: vec![Tile::default(); (size.x * size.y * size.z) as usize],
            rules,
            units: IndexMap::default(),
            items: IndexMap::default(),
            next_unit_id: 0,
            next_item_id: 0,
            rng: GameRng::seed_from_u64(seed),
            global_shade: 0,
        }
    }

    pub fn size(&self) -> IVec3 {
        self.size
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.min_element() >= 0
            && pos.x < self.size.x
            && pos.y < self.size.y
            && pos.z < self.size.z
    }

    fn index(&self, pos: Position) -> usize {
        ((pos.z * self.size.y + pos.y) * self.size.x + pos.x) as usize
    }

    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        self.contains(pos).then(|| &self.tiles[self.index(pos)])
    }

    pub fn tile_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        if self.contains(pos) {
            let i = self.index(pos);
            Some(&mut self.tiles[i])
        } else {
            None
        }
    }

    /// All tile positions in deterministic x, y, z scan order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let size = self.size;
        (0..size.z).flat_map(move |z| {
            (0..size.y)
                .flat_map(move |y| (0..size.x).map(move |x| ivec3(x, y, z)))
        })
    }

    /// Definition of a part slot of a tile, if the slot is filled.
    pub fn part_def(&self, pos: Position, kind: PartKind) -> Option<&PartDef> {
        self.tile(pos)
            .and_then(|t| t.part(kind))
            .map(|id| self.rules.part(id))
    }

    pub fn has_floor(&self, pos: Position) -> bool {
        self.part_def(pos, PartKind::Floor).is_some()
    }

    /// Raised walking surface height of the tile in voxels.
    pub fn terrain_level(&self, pos: Position) -> i32 {
        let floor = self
            .part_def(pos, PartKind::Floor)
            .map_or(0, |d| d.terrain_level);
        let object = self
            .part_def(pos, PartKind::Object)
            .map_or(0, |d| d.terrain_level);
        floor.max(object)
    }

    // Units.

    /// Register a unit and place it on its tile.
    ///
    /// Panics if the target tile is missing or occupied; spawning into an
    /// occupied tile is a mission generator bug.
    pub fn spawn_unit(&mut self, mut unit: BattleUnit) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        unit.id = id;

        let pos = unit.pos;
        let tile = self
            .tile_mut(pos)
            .unwrap_or_else(|| panic!("unit spawn outside map at {pos}"));
        assert!(tile.unit.is_none(), "unit spawn on occupied tile {pos}");
        tile.unit = Some(id);

        debug!("spawned {} at {}", unit.name, pos);
        self.units.insert(id, unit);
        id
    }

    pub fn unit(&self, id: UnitId) -> Option<&BattleUnit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut BattleUnit> {
        self.units.get_mut(&id)
    }

    /// Units in spawn order. Iteration order is a game-semantics guarantee,
    /// reaction tie-breaking depends on it.
    pub fn units(&self) -> impl Iterator<Item = &BattleUnit> {
        self.units.values()
    }

    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    pub fn unit_at(&self, pos: Position) -> Option<UnitId> {
        self.tile(pos).and_then(|t| t.unit)
    }

    /// Move a unit to a new tile, updating both tiles' back-references.
    pub fn move_unit(&mut self, id: UnitId, to: Position) -> bool {
        let Some(from) = self.unit(id).map(|u| u.pos) else {
            return false;
        };
        if !self.contains(to) || self.unit_at(to).is_some_and(|u| u != id) {
            return false;
        }

        if let Some(tile) = self.tile_mut(from) {
            if tile.unit == Some(id) {
                tile.unit = None;
            }
        }
        self.tile_mut(to).expect("checked above").unit = Some(id);
        self.unit_mut(id).expect("checked above").pos = to;
        true
    }

    /// Take a unit out of play, clearing its tile back-reference.
    ///
    /// The unit stays in the registry so ids held elsewhere keep resolving.
    pub fn drop_from_play(&mut self, id: UnitId) {
        let Some(pos) = self.unit(id).map(|u| u.pos) else {
            return;
        };
        if let Some(tile) = self.tile_mut(pos) {
            if tile.unit == Some(id) {
                tile.unit = None;
            }
        }
    }

    // Items.

    pub fn spawn_item(&mut self, def: ItemDefId, owner: ItemOwner) -> ItemId {
        let id = ItemId(self.next_item_id);
        self.next_item_id += 1;

        let rounds = self.rules.items[def.0 as usize].rounds;
        let item = BattleItem {
            id,
            def,
            rounds,
            fuse: Fuse::Unprimed,
            owner: ItemOwner::None,
        };
        self.items.insert(id, item);
        self.transfer_item(id, owner);
        id
    }

    pub fn item(&self, id: ItemId) -> Option<&BattleItem> {
        self.items.get(&id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut BattleItem> {
        self.items.get_mut(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &BattleItem> {
        self.items.values()
    }

    pub fn item_def(&self, id: ItemId) -> Option<&crate::ItemDef> {
        self.item(id).map(|i| &self.rules.items[i.def.0 as usize])
    }

    /// Move an item between owners, keeping ownership exclusive.
    pub fn transfer_item(&mut self, id: ItemId, to: ItemOwner) {
        let Some(old) = self.item(id).map(|i| i.owner) else {
            return;
        };

        match old {
            ItemOwner::Tile(pos) => {
                if let Some(tile) = self.tile_mut(pos) {
                    tile.items.retain(|&i| i != id);
                }
            }
            ItemOwner::Unit(unit) => {
                if let Some(unit) = self.unit_mut(unit) {
                    if unit.weapon == Some(id) {
                        unit.weapon = None;
                    }
                    unit.inventory.retain(|&i| i != id);
                }
            }
            ItemOwner::None => {}
        }

        match to {
            ItemOwner::Tile(pos) => {
                if let Some(tile) = self.tile_mut(pos) {
                    tile.items.push(id);
                } else {
                    // Fell off the map, item is gone from play.
                    self.item_mut(id).expect("checked above").owner = ItemOwner::None;
                    return;
                }
            }
            ItemOwner::Unit(unit) => {
                if let Some(unit) = self.unit_mut(unit) {
                    unit.inventory.push(id);
                }
            }
            ItemOwner::None => {}
        }
        self.item_mut(id).expect("checked above").owner = to;
    }

    /// Put a weapon in a unit's hands.
    pub fn equip_unit(&mut self, unit: UnitId, item: ItemId) {
        self.transfer_item(item, ItemOwner::Unit(unit));
        if let Some(u) = self.unit_mut(unit) {
            u.inventory.retain(|&i| i != item);
            u.weapon = Some(item);
        }
    }

    /// End-of-turn bookkeeping that lives on the data model: mind control
    /// release and danger zone decay.
    pub fn end_turn_upkeep(&mut self) {
        for unit in self.units.values_mut() {
            unit.release_mind_control();
        }
        for tile in &mut self.tiles {
            tile.danger = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Faction, ItemOwner};
    use glam::ivec3;

    fn field() -> Battlefield {
        Battlefield::new(ivec3(10, 10, 2), Ruleset::standard(), 1)
    }

    #[test]
    fn unit_move_updates_back_references() {
        let mut field = field();
        let id = field.spawn_unit(BattleUnit::new(
            "a",
            Faction::Player,
            ivec3(1, 1, 0),
        ));
        assert_eq!(field.unit_at(ivec3(1, 1, 0)), Some(id));

        assert!(field.move_unit(id, ivec3(2, 1, 0)));
        assert_eq!(field.unit_at(ivec3(1, 1, 0)), None);
        assert_eq!(field.unit_at(ivec3(2, 1, 0)), Some(id));

        field.drop_from_play(id);
        assert_eq!(field.unit_at(ivec3(2, 1, 0)), None);
        // Registry entry survives for id resolution.
        assert!(field.unit(id).is_some());
    }

    #[test]
    fn item_ownership_is_exclusive() {
        let mut field = field();
        let unit = field.spawn_unit(BattleUnit::new(
            "a",
            Faction::Player,
            ivec3(1, 1, 0),
        ));
        let rifle = field.rules.item_named("rifle").unwrap();
        let item = field.spawn_item(rifle, ItemOwner::Tile(ivec3(3, 3, 0)));

        assert_eq!(field.tile(ivec3(3, 3, 0)).unwrap().items, vec![item]);

        field.equip_unit(unit, item);
        assert!(field.tile(ivec3(3, 3, 0)).unwrap().items.is_empty());
        assert_eq!(field.unit(unit).unwrap().weapon, Some(item));

        field.transfer_item(item, ItemOwner::Tile(ivec3(4, 4, 0)));
        assert_eq!(field.unit(unit).unwrap().weapon, None);
        assert_eq!(field.tile(ivec3(4, 4, 0)).unwrap().items, vec![item]);
    }

    #[test]
    fn out_of_bounds_tiles() {
        let field = field();
        assert!(field.tile(ivec3(-1, 0, 0)).is_none());
        assert!(field.tile(ivec3(10, 0, 0)).is_none());
        assert!(field.tile(ivec3(9, 9, 1)).is_some());
    }
}
