// Fog of war: what one player can legitimately see.
//
// `Vision::compute` gathers every vision source of the viewer's team (units
// on the board and owned buildings) and spreads each one over the grid with
// `pathfinding::flood`, charging the terrain vision cost of every tile
// entered. The four tiles orthogonally adjacent to a source and the source
// tile itself are always visible. Transported units do not see. An active
// Recon power widens the radius of all the owner's sources.
//
// `redact_board` turns an omniscient board into the viewer's board:
// - other teams' units outside vision are removed,
// - other teams' buildings outside vision keep only their kind,
// - other teams' funds, charge and statistics are zeroed,
// - rewards granted to other teams are dropped.
// With fog disabled every tile is visible and nothing is redacted.
//
// Other players' statistics are not secret once the outcomes behind them
// were seen. `Sightings` holds what one team has watched accumulate, and
// `redact_board_with` puts it back in place of the zeroes.
//
// Vision is never stored; it is recomputed from a board on demand.
//
// See also: `encoder.rs` (per-viewer traces), `resolver.rs` (visible
// blockers and attack targets), `automated.rs` (fogged decision input).

use crate::board::Board;
use crate::config::GameConfig;
use crate::pathfinding::flood;
use crate::player::PlayerStats;
use crate::types::{PlayerId, Size, TeamId, Vector};
use std::collections::{BTreeMap, BTreeSet};

/// Other teams' statistics as one team has seen them.
pub type Sightings = BTreeMap<PlayerId, PlayerStats>;

#[derive(Clone, Debug)]
pub struct Vision {
    viewer: PlayerId,
    team: Option<TeamId>,
    fog: bool,
    size: Size,
    visible: BTreeSet<Vector>,
}

impl Vision {
    pub fn compute(config: &GameConfig, board: &Board, viewer: PlayerId) -> Self {
        let team = board.team_of(viewer);
        let mut visible = BTreeSet::new();
        if board.fog {
            if let Some(team) = team {
                for (origin, radius) in sources(config, board, team) {
                    reveal(config, board, origin, radius, &mut visible);
                }
            }
        }
        Self {
            viewer,
            team,
            fog: board.fog,
            size: board.size,
            visible,
        }
    }

    pub fn viewer(&self) -> PlayerId {
        self.viewer
    }

    pub fn is_visible(&self, v: Vector) -> bool {
        if self.fog {
            self.visible.contains(&v)
        } else {
            self.size.contains(v)
        }
    }

    /// Whether entities owned by `player` are fully known to the viewer.
    pub fn is_friend(&self, board: &Board, player: PlayerId) -> bool {
        self.team.is_some() && board.team_of(player) == self.team
    }

    pub fn fog(&self) -> bool {
        self.fog
    }

    /// The viewer's legitimate copy of `board`.
    pub fn redact_board(&self, board: &Board) -> Board {
        let mut out = board.clone();
        if !self.fog {
            return out;
        }
        out.units
            .retain(|&v, unit| self.is_friend(board, unit.player) || self.is_visible(v));
        for (&v, building) in out.buildings.iter_mut() {
            if !self.is_friend(board, building.player) && !self.is_visible(v) {
                *building = building.redacted();
            }
        }
        for player in out.players.values_mut() {
            if !self.is_friend(board, player.id) {
                *player = player.redacted();
            }
        }
        out.granted_rewards
            .retain(|&(player, _)| self.is_friend(board, player));
        out
    }

    /// `redact_board`, keeping the statistics the viewer's team has `seen`.
    pub fn redact_board_with(&self, board: &Board, seen: &Sightings) -> Board {
        let mut out = self.redact_board(board);
        if !self.fog {
            return out;
        }
        for player in out.players.values_mut() {
            if self.is_friend(board, player.id) {
                continue;
            }
            if let Some(stats) = seen.get(&player.id) {
                player.stats = stats.clone();
            }
        }
        out
    }

    /// Other teams' statistics as they stand on a board the viewer holds.
    pub fn sightings(&self, held: &Board) -> Sightings {
        if !self.fog {
            return Sightings::new();
        }
        held.players
            .values()
            .filter(|p| !self.is_friend(held, p.id))
            .map(|p| (p.id, p.stats.clone()))
            .collect()
    }
}

/// Shorthand for a single visibility query.
pub fn is_visible(config: &GameConfig, board: &Board, player: PlayerId, v: Vector) -> bool {
    Vision::compute(config, board, player).is_visible(v)
}

fn vision_bonus(config: &GameConfig, board: &Board, player: PlayerId) -> u32 {
    board.player(player).map_or(0, |p| {
        p.active_powers
            .iter()
            .filter_map(|skill| config.skills.get(skill))
            .map(|info| u32::from(info.vision_bonus))
            .sum()
    })
}

fn sources(config: &GameConfig, board: &Board, team: TeamId) -> Vec<(Vector, u32)> {
    let on_team = |player: PlayerId| board.team_of(player) == Some(team);
    let mut out = Vec::new();
    for (&v, unit) in &board.units {
        if on_team(unit.player) {
            if let Some(info) = config.units.get(&unit.unit_type) {
                out.push((v, u32::from(info.vision) + vision_bonus(config, board, unit.player)));
            }
        }
    }
    for (&v, building) in &board.buildings {
        if on_team(building.player) {
            if let Some(info) = config.buildings.get(&building.building_type) {
                out.push((v, u32::from(info.vision) + vision_bonus(config, board, building.player)));
            }
        }
    }
    out
}

fn reveal(config: &GameConfig, board: &Board, origin: Vector, radius: u32, visible: &mut BTreeSet<Vector>) {
    visible.insert(origin);
    for n in origin.neighbors() {
        if board.contains(n) {
            visible.insert(n);
        }
    }
    let reach = flood(origin, radius, |v| {
        board.tile(v).map(|tile| config.vision_cost(tile))
    });
    visible.extend(reach.tiles());
}
