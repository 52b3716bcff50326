// Buildings on the board.
//
// Same value discipline as `Unit`: stored in `Board::buildings` by position,
// replaced wholesale on every change. `redacted()` is the fogged form a
// viewer keeps for a building outside its vision: the kind and position are
// terrain knowledge, ownership and state are not.

use crate::types::{BuildingType, PlayerId};
use serde::{Deserialize, Serialize};

pub const MAX_BUILDING_HEALTH: u8 = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub building_type: BuildingType,
    pub player: PlayerId,
    pub health: u8,
    /// Has produced or acted this turn.
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub label: Option<u8>,
}

impl Building {
    pub fn new(building_type: BuildingType, player: PlayerId) -> Self {
        Self {
            building_type,
            player,
            health: MAX_BUILDING_HEALTH,
            completed: false,
            label: None,
        }
    }

    pub fn with_label(mut self, label: u8) -> Self {
        self.label = Some(label);
        self
    }

    /// What a viewer without vision of this tile knows about the building.
    pub fn redacted(&self) -> Self {
        Self::new(self.building_type, PlayerId::NEUTRAL)
    }
}
