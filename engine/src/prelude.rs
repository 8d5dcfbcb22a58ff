pub use crate::{
    BattleAction, BattleActionType, DoorResult, ReactionScore, SectorEvent,
    TileEngine, Trace, VoxelKind, HEIGHT_FROM_CENTER,
};
pub use glam::{ivec2, ivec3, IVec2, IVec3};
pub use util::{HashMap, HashSet, IndexMap, IndexSet, VecExt, DIR_4, DIR_8};
pub use world::{
    position::{
        self, distance, distance_sq, tile_center_voxel, tile_to_voxel,
        voxel_to_tile, Position, TILE_HEIGHT, TILE_SIZE,
    },
    BattleItem, BattleUnit, Battlefield, DamageType, Faction, Fuse, ItemId,
    ItemKind, ItemOwner, PartDef, PartId, PartKind, Tile, UnitId, UnitStatus,
    HARD_BLOCK, MAX_LIGHT, MAX_SMOKE,
};
