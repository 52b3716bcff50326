// Player roster entries: resources, powers and running statistics.

use crate::types::{PlayerId, Skill, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-player counters. Fogged views zero other teams' statistics apart from
/// changes the viewer's team saw happen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub damage_dealt: u32,
    pub destroyed_units: u32,
    pub lost_units: u32,
    pub destroyed_buildings: u32,
    pub lost_buildings: u32,
    pub captured: u32,
    pub rescued: u32,
    pub one_shots: u32,
    pub created_units: u32,
    pub created_buildings: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub team: TeamId,
    pub funds: u32,
    /// Accrues from combat; spent on skills.
    pub charge: u32,
    pub skills: BTreeSet<Skill>,
    /// Powers active until this player's turn ends.
    pub active_powers: BTreeSet<Skill>,
    /// Consecutive missed turns. Any non-EndTurn action clears it.
    pub misses: u8,
    pub eliminated: bool,
    pub stats: PlayerStats,
}

impl Player {
    pub fn new(id: PlayerId, team: TeamId, funds: u32) -> Self {
        Self {
            id,
            team,
            funds,
            charge: 0,
            skills: BTreeSet::new(),
            active_powers: BTreeSet::new(),
            misses: 0,
            eliminated: false,
            stats: PlayerStats::default(),
        }
    }

    pub fn with_skill(mut self, skill: Skill) -> Self {
        self.skills.insert(skill);
        self
    }

    pub fn with_charge(mut self, charge: u32) -> Self {
        self.charge = charge;
        self
    }

    pub fn has_power(&self, skill: Skill) -> bool {
        self.active_powers.contains(&skill)
    }

    /// The view of this player held by someone on another team.
    pub fn redacted(&self) -> Self {
        Self {
            funds: 0,
            charge: 0,
            stats: PlayerStats::default(),
            ..self.clone()
        }
    }
}
