//! Action descriptors passed in by the turn controller.

use serde::{Deserialize, Serialize};

use crate::prelude::*;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum BattleActionType {
    SnapShot,
    Throw,
    Melee,
    Panic,
    MindControl,
}

/// One attack attempt: who, with what, at which tile.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct BattleAction {
    pub actor: UnitId,
    pub kind: BattleActionType,
    pub weapon: Option<ItemId>,
    pub target: Position,
}

impl BattleAction {
    pub fn new(
        actor: UnitId,
        kind: BattleActionType,
        weapon: Option<ItemId>,
        target: Position,
    ) -> Self {
        BattleAction {
            actor,
            kind,
            weapon,
            target,
        }
    }
}
