// Board state: the immutable snapshot every component reads.
//
// `Board` holds the tile layer, the unit and building collections keyed by
// `Vector`, the player roster, turn bookkeeping and the objective table.
// Nothing mutates a board that has been handed out; `apply.rs` clones the
// previous board, edits the clone and returns it as the next snapshot.
//
// Transported units are nested inside their carrier's `cargo`, so the only
// addressing scheme is "position on this board". A unit keeps its identity
// across snapshots because the position key and the value move together.
//
// The `with_*` builders are used by scenario setup and tests. They do not
// validate; run `invariants::check_board` on a hand-built board if in doubt.
//
// See also: `apply.rs` (produces successor boards), `vision.rs` (redacts a
// board for one viewer), `invariants.rs` (structural checks).
//
// **Critical constraint: determinism.** All collections are `BTreeMap` /
// `BTreeSet`; iteration order is the `Ord` of the key.

use crate::building::Building;
use crate::objective::Objective;
use crate::player::Player;
use crate::types::{PlayerId, Reward, Size, TeamId, TileType, Vector, vector_map};
use crate::unit::Unit;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub size: Size,
    /// Row-major, `size.area()` entries.
    pub tiles: Vec<TileType>,
    /// Tiles currently blocked by a lightning barrier.
    #[serde(default)]
    pub lightning: BTreeSet<Vector>,
    /// Linked teleporter tiles. Stepping onto one rotates the occupants of
    /// its ring forward by one position.
    #[serde(default)]
    pub teleporters: Vec<Vec<Vector>>,
    #[serde(with = "vector_map")]
    pub units: BTreeMap<Vector, Unit>,
    #[serde(with = "vector_map")]
    pub buildings: BTreeMap<Vector, Building>,
    pub players: BTreeMap<PlayerId, Player>,
    /// Players still in the match, in turn order.
    pub active_players: Vec<PlayerId>,
    pub current_player: PlayerId,
    pub round: u16,
    #[serde(default)]
    pub objectives: BTreeMap<u8, Objective>,
    pub fog: bool,
    #[serde(default)]
    pub winner: Option<TeamId>,
    #[serde(default)]
    pub ended: bool,
    /// Every `(player, reward)` pair issued so far in the match.
    #[serde(default)]
    pub granted_rewards: BTreeSet<(PlayerId, Reward)>,
}

impl Board {
    /// An empty plain-tile board in round 1 with fog enabled.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            tiles: vec![TileType::Plain; size.area()],
            lightning: BTreeSet::new(),
            teleporters: Vec::new(),
            units: BTreeMap::new(),
            buildings: BTreeMap::new(),
            players: BTreeMap::new(),
            active_players: Vec::new(),
            current_player: PlayerId::NEUTRAL,
            round: 1,
            objectives: BTreeMap::new(),
            fog: true,
            winner: None,
            ended: false,
            granted_rewards: BTreeSet::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    pub fn with_fog(mut self, fog: bool) -> Self {
        self.fog = fog;
        self
    }

    pub fn with_tile(mut self, v: Vector, tile: TileType) -> Self {
        if let Some(i) = self.size.index(v) {
            self.tiles[i] = tile;
        }
        self
    }

    /// Add a player. The lowest id becomes the current player.
    pub fn with_player(mut self, player: Player) -> Self {
        let id = player.id;
        self.players.insert(id, player);
        if !self.active_players.contains(&id) {
            self.active_players.push(id);
            self.active_players.sort_unstable();
        }
        if let Some(&first) = self.active_players.first() {
            self.current_player = first;
        }
        self
    }

    pub fn with_unit(mut self, v: Vector, unit: Unit) -> Self {
        self.units.insert(v, unit);
        self
    }

    pub fn with_building(mut self, v: Vector, building: Building) -> Self {
        self.buildings.insert(v, building);
        self
    }

    pub fn with_objective(mut self, id: u8, objective: Objective) -> Self {
        self.objectives.insert(id, objective);
        self
    }

    pub fn with_lightning(mut self, v: Vector) -> Self {
        self.lightning.insert(v);
        self
    }

    /// Link tiles into a teleporter ring and mark them as teleporters.
    pub fn with_teleporters(mut self, ring: Vec<Vector>) -> Self {
        for &v in &ring {
            self = self.with_tile(v, TileType::Teleporter);
        }
        self.teleporters.push(ring);
        self
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn contains(&self, v: Vector) -> bool {
        self.size.contains(v)
    }

    pub fn tile(&self, v: Vector) -> Option<TileType> {
        self.size.index(v).and_then(|i| self.tiles.get(i).copied())
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn team_of(&self, id: PlayerId) -> Option<TeamId> {
        self.players.get(&id).map(|p| p.team)
    }

    pub fn is_active(&self, id: PlayerId) -> bool {
        self.active_players.contains(&id)
    }

    /// Same player, or two players registered on the same team.
    pub fn same_team(&self, a: PlayerId, b: PlayerId) -> bool {
        if a == b {
            return true;
        }
        match (self.team_of(a), self.team_of(b)) {
            (Some(ta), Some(tb)) => ta == tb,
            _ => false,
        }
    }

    /// Two real players on different teams.
    pub fn is_opponent(&self, a: PlayerId, b: PlayerId) -> bool {
        !a.is_neutral() && !b.is_neutral() && !self.same_team(a, b)
    }

    /// Teams with at least one active player.
    pub fn active_teams(&self) -> BTreeSet<TeamId> {
        self.active_players
            .iter()
            .filter_map(|&id| self.team_of(id))
            .collect()
    }

    /// All players registered on `team`, eliminated or not.
    pub fn team_players(&self, team: TeamId) -> Vec<PlayerId> {
        self.players
            .values()
            .filter(|p| p.team == team)
            .map(|p| p.id)
            .collect()
    }

    pub fn units_of(&self, player: PlayerId) -> impl Iterator<Item = (Vector, &Unit)> {
        self.units
            .iter()
            .filter(move |(_, u)| u.player == player)
            .map(|(&v, u)| (v, u))
    }

    pub fn buildings_of(&self, player: PlayerId) -> impl Iterator<Item = (Vector, &Building)> {
        self.buildings
            .iter()
            .filter(move |(_, b)| b.player == player)
            .map(|(&v, b)| (v, b))
    }

    pub fn has_units(&self, player: PlayerId) -> bool {
        self.units.values().any(|u| u.player == player)
    }

    /// In bounds and without a unit.
    pub fn is_free(&self, v: Vector) -> bool {
        self.contains(v) && !self.units.contains_key(&v)
    }

    /// The teleporter ring a tile belongs to.
    pub fn ring_of(&self, v: Vector) -> Option<&[Vector]> {
        self.teleporters
            .iter()
            .find(|ring| ring.contains(&v))
            .map(Vec::as_slice)
    }
}
