//! Core battle computation: visibility, lighting, trajectories, reaction
//! fire and damage resolution over a battlefield grid.
//!
//! All entry points run to completion on the calling thread and are
//! deterministic given the battlefield RNG state.

use serde::{Deserialize, Serialize};
use world::position::TILE_SIZE;

/// How far units can see, in tiles.
pub const MAX_VIEW_DISTANCE: i32 = 20;

/// Darkness level above which units are only spotted within personal range.
pub const MAX_DARKNESS_TO_SEE_UNITS: i32 = 9;

/// Spotting range that works regardless of darkness.
pub const PERSONAL_VISIBILITY_RANGE: i32 = 9;

/// Accumulated smoke density that hides a unit along a sight line.
pub const SMOKE_SIGHT_THRESHOLD: i32 = 12;

/// Light power of a burning tile.
pub const FIRE_LIGHT_POWER: i32 = 15;

/// Power an explosion loses per tile ring travelled.
pub const EXPLOSION_STEP_POWER: i32 = 10;

/// Defensive cap on chained reaction interrupts from one trigger event.
pub const REACTION_CHAIN_LIMIT: usize = 16;

/// Cap on chained secondary terrain explosions.
pub const TERRAIN_CHAIN_LIMIT: usize = 32;

/// Time unit cost of opening a door.
pub const DOOR_TU_COST: i32 = 4;

/// Time unit cost of a melee strike.
pub const MELEE_TU_COST: i32 = 8;

/// Time unit cost of a psionic attack.
pub const PSI_TU_COST: i32 = 25;

/// Time unit cost of throwing an item.
pub const THROW_TU_COST: i32 = 10;

mod action;
pub use action::{BattleAction, BattleActionType};

mod attack;

mod blockage;

mod damage;

mod door;
pub use door::DoorResult;

mod fov;
pub use fov::SectorEvent;

mod light;

pub mod prelude;

mod reaction;
pub use reaction::ReactionScore;

mod trajectory;
pub use trajectory::Trace;

mod voxel;
pub use voxel::{VoxelKind, HEIGHT_FROM_CENTER};

/// Stateless tile-property computer.
///
/// Holds configuration only; every method reads and writes battlefield state
/// passed in explicitly, so computations are reentrant and reproducible.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileEngine {
    max_view_distance: i32,
    max_view_distance_sq: i32,
    max_voxel_view_distance: i32,
    max_darkness_to_see_units: i32,
    /// Soldier personal lights can be doused to avoid giving positions away.
    personal_lighting: bool,
}

impl Default for TileEngine {
    fn default() -> Self {
        TileEngine::new(MAX_VIEW_DISTANCE, MAX_DARKNESS_TO_SEE_UNITS)
    }
}

impl TileEngine {
    pub fn new(max_view_distance: i32, max_darkness_to_see_units: i32) -> Self {
        TileEngine {
            max_view_distance,
            max_view_distance_sq: max_view_distance * max_view_distance,
            max_voxel_view_distance: max_view_distance * TILE_SIZE,
            max_darkness_to_see_units,
            personal_lighting: true,
        }
    }

    pub fn max_view_distance(&self) -> i32 {
        self.max_view_distance
    }

    pub fn max_view_distance_sq(&self) -> i32 {
        self.max_view_distance_sq
    }

    pub fn max_voxel_view_distance(&self) -> i32 {
        self.max_voxel_view_distance
    }

    pub fn max_darkness_to_see_units(&self) -> i32 {
        self.max_darkness_to_see_units
    }

    pub fn toggle_personal_lighting(&mut self) {
        self.personal_lighting = !self.personal_lighting;
    }

    pub(crate) fn personal_lighting(&self) -> bool {
        self.personal_lighting
    }
}
