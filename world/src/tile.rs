//! One grid cell of the battle map.

use serde::{Deserialize, Serialize};

use crate::{
    item::ItemId,
    part::{PartId, PartKind},
    unit::UnitId,
    MAX_LIGHT, MAX_SMOKE,
};

/// Tile state: terrain parts, light, smoke and fire, occupancy.
///
/// The tile does not own its occupying unit or the items resting on it, it
/// stores registry keys that the battlefield clears on removal.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Tile {
    parts: [Option<PartId>; 4],
    /// Sun-derived light channel, written by sun shading only.
    pub light_sun: i32,
    /// Dynamic light channel: units, fires, flares, glowing terrain.
    pub light_dyn: i32,
    pub smoke: i32,
    /// Turns of burning left.
    pub fire: i32,
    /// Pending secondary explosion power from a destroyed explosive part.
    pub explosive: i32,
    pub unit: Option<UnitId>,
    pub items: Vec<ItemId>,
    /// Marked dangerous for AI for the current turn.
    pub danger: bool,
}

impl Tile {
    pub fn part(&self, kind: PartKind) -> Option<PartId> {
        self.parts[kind as usize]
    }

    pub fn set_part(&mut self, kind: PartKind, part: Option<PartId>) {
        self.parts[kind as usize] = part;
    }

    /// Effective light level, max of the two channels clamped to range.
    pub fn light(&self) -> i32 {
        self.light_sun.max(self.light_dyn).clamp(0, MAX_LIGHT)
    }

    /// Darkness level, 0 in full light.
    pub fn darkness(&self) -> i32 {
        MAX_LIGHT - self.light()
    }

    pub fn add_smoke(&mut self, amount: i32) {
        self.smoke = (self.smoke + amount).clamp(0, MAX_SMOKE);
    }

    pub fn ignite(&mut self, fuel: i32) {
        self.fire = self.fire.max(fuel).clamp(0, MAX_SMOKE);
    }

    pub fn is_empty_terrain(&self) -> bool {
        self.parts.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_is_max_of_channels() {
        let mut tile = Tile::default();
        assert_eq!(tile.light(), 0);
        tile.light_sun = 7;
        tile.light_dyn = 3;
        assert_eq!(tile.light(), 7);
        tile.light_dyn = 99;
        assert_eq!(tile.light(), MAX_LIGHT);
        assert_eq!(tile.darkness(), 0);
    }

    #[test]
    fn smoke_clamps() {
        let mut tile = Tile::default();
        tile.add_smoke(40);
        assert_eq!(tile.smoke, MAX_SMOKE);
        tile.add_smoke(-40);
        assert_eq!(tile.smoke, 0);
    }
}
