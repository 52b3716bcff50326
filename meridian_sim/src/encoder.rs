// Trace Encoder: the per-viewer, fog-safe form of a resolution chain.
//
// The server resolves a chain against the omniscient board. Each connected
// client only ever holds its redacted board (`Vision::redact_board`), and
// receives an `EncodedTrace` built here:
//
// - `project` rewrites one outcome for one viewer. Outcomes by the viewer's
//   own team pass unchanged apart from other teams' charge. Other outcomes pass unchanged only when every
//   tile they touch was visible; otherwise they become one of the `Hidden*`
//   variants carrying just the visible half, or disappear entirely.
//   Lifecycle outcomes (turn changes, eliminations, objectives, GameEnd)
//   are always sent, with other teams' funds zeroed.
// - For every step the encoder replays what the client will do (apply the
//   projected outcome to its simulated client board) and compares the
//   result with the redacted server board. The differences become the
//   entry's unit, building and player deltas: entities that came into view,
//   left it, or changed out of sight of the projected outcome. If some other
//   part of the board still disagrees, the full redacted board is attached
//   as a snapshot.
// - Other teams' statistics on the client move only with the outcomes it
//   applies, so a kill the viewer watched stays counted while one in the
//   fog never shows. `observe` reports where they ended up; the server keeps
//   that per team and passes it back in for the next chain.
// - Capturing an enemy headquarters reveals every building the loser held
//   to the capturing team, listed in that entry's building delta whether or
//   not the client already knew it.
//
// Because every delta is taken from a redacted board and projected outcomes
// only contain visible data, nothing outside the viewer's vision ever
// leaves the server. Order is preserved; entries with nothing to show are
// dropped.
//
// `apply_encoded` is the client half: it replays an encoded trace onto the
// client's board. After a full trace the client board equals the server's
// redacted board.
//
// See also: `vision.rs`, `apply.rs` (the client applies the same outcomes),
// `game.rs` (`TraceEntry`), `meridian_protocol` (carries the bytes).

use crate::apply::apply_response;
use crate::board::Board;
use crate::building::Building;
use crate::config::GameConfig;
use crate::error::DecodeError;
use crate::game::TraceEntry;
use crate::player::Player;
use crate::response::ActionResponse;
use crate::types::{PlayerId, Vector};
use crate::unit::Unit;
use crate::vision::{Sightings, Vision};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Bumped whenever the encoded layout changes.
pub const TRACE_VERSION: u16 = 1;

/// One visible step of a chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedEntry {
    #[serde(default)]
    pub response: Option<ActionResponse>,
    /// `None` removes the unit from that tile.
    #[serde(default)]
    pub units: Vec<(Vector, Option<Unit>)>,
    #[serde(default)]
    pub buildings: Vec<(Vector, Option<Building>)>,
    #[serde(default)]
    pub players: Vec<Player>,
    /// The complete redacted board, when deltas cannot express the change.
    #[serde(default)]
    pub snapshot: Option<Board>,
}

impl EncodedEntry {
    fn is_empty(&self) -> bool {
        self.response.is_none()
            && self.units.is_empty()
            && self.buildings.is_empty()
            && self.players.is_empty()
            && self.snapshot.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedTrace {
    pub version: u16,
    /// The outcome of the viewer's own intent, when the chain started with one.
    pub own: Option<EncodedEntry>,
    pub entries: Vec<EncodedEntry>,
}

// ---------------------------------------------------------------------------
// Projection of a single outcome
// ---------------------------------------------------------------------------

struct View<'a> {
    board: &'a Board,
    before: Vision,
    after: Vision,
}

impl View<'_> {
    fn friend(&self, player: PlayerId) -> bool {
        self.before.is_friend(self.board, player)
    }

    fn seen_before(&self, v: Vector) -> bool {
        self.before.is_visible(v)
    }

    fn seen_after(&self, v: Vector) -> bool {
        self.after.is_visible(v)
    }

    fn seen(&self, v: Vector) -> bool {
        self.seen_before(v) || self.seen_after(v)
    }

    fn charge(&self, player: PlayerId, charge: u32) -> u32 {
        if self.friend(player) { charge } else { 0 }
    }

    /// `response` with every other team's charge zeroed.
    fn scrub(&self, response: &ActionResponse) -> ActionResponse {
        let mut out = response.clone();
        match &mut out {
            ActionResponse::AttackUnit {
                player_a,
                player_b,
                charge_a,
                charge_b,
                ..
            } => {
                *charge_a = self.charge(*player_a, *charge_a);
                *charge_b = self.charge(*player_b, *charge_b);
            }
            ActionResponse::AttackBuilding { player_a, charge_a, .. } => {
                *charge_a = self.charge(*player_a, *charge_a);
            }
            _ => {}
        }
        out
    }
}

/// What `viewer` is told about `response`, resolved from `before` to `after`.
pub fn project(
    config: &GameConfig,
    before: &Board,
    after: &Board,
    response: &ActionResponse,
    viewer: PlayerId,
) -> Option<ActionResponse> {
    if !before.fog {
        return Some(response.clone());
    }
    let view = View {
        board: before,
        before: Vision::compute(config, before, viewer),
        after: Vision::compute(config, after, viewer),
    };
    if response.actor(before).is_some_and(|actor| view.friend(actor)) {
        return Some(view.scrub(response));
    }

    use ActionResponse as R;
    match response {
        R::Move {
            from,
            to,
            path,
            completed,
            ..
        } => {
            let seen_from = view.seen_before(*from);
            let seen_to = view.seen_after(*to);
            if seen_from && path.iter().all(|&v| view.seen(v)) {
                return Some(response.clone());
            }
            let visible_path: Vec<Vector> = path.iter().copied().filter(|&v| view.seen(v)).collect();
            if !seen_from && !seen_to && visible_path.is_empty() {
                return None;
            }
            Some(R::HiddenMove {
                from: seen_from.then_some(*from),
                to: seen_to.then_some(*to),
                path: visible_path,
                completed: *completed,
                unit: if seen_to { after.units.get(to).cloned() } else { None },
            })
        }
        R::AttackUnit {
            from,
            to,
            player_a,
            player_b,
            unit_a,
            unit_b,
            has_counter_attack,
            charge_a,
            charge_b,
        } => {
            let seen_a = view.seen_before(*from);
            let seen_b = view.friend(*player_b) || view.seen_before(*to);
            match (seen_a, seen_b) {
                (true, true) => Some(R::AttackUnit {
                    from: *from,
                    to: *to,
                    player_a: *player_a,
                    player_b: *player_b,
                    unit_a: unit_a.clone(),
                    unit_b: unit_b.clone(),
                    has_counter_attack: *has_counter_attack,
                    charge_a: view.charge(*player_a, *charge_a),
                    charge_b: view.charge(*player_b, *charge_b),
                }),
                (false, true) => Some(R::HiddenSourceAttackUnit {
                    to: *to,
                    unit_b: unit_b.clone(),
                }),
                (true, false) => Some(R::HiddenTargetAttackUnit {
                    from: *from,
                    unit_a: unit_a.clone(),
                }),
                (false, false) => None,
            }
        }
        R::AttackBuilding {
            from,
            to,
            player_a,
            unit_a,
            building,
            charge_a,
        } => {
            let owner = before.buildings.get(to).map(|b| b.player);
            let seen_a = view.seen_before(*from);
            let seen_b = owner.is_some_and(|o| view.friend(o)) || view.seen_before(*to);
            match (seen_a, seen_b) {
                (true, true) => Some(R::AttackBuilding {
                    from: *from,
                    to: *to,
                    player_a: *player_a,
                    unit_a: unit_a.clone(),
                    building: building.clone(),
                    charge_a: view.charge(*player_a, *charge_a),
                }),
                (false, true) => Some(R::HiddenSourceAttackBuilding {
                    to: *to,
                    building: building.clone(),
                }),
                (true, false) => Some(R::HiddenTargetAttackBuilding {
                    from: *from,
                    unit_a: unit_a.clone(),
                }),
                (false, false) if building.is_none() => Some(R::HiddenDestroyedBuilding { position: *to }),
                (false, false) => None,
            }
        }
        R::Capture { from, .. }
        | R::Fold { from }
        | R::Unfold { from }
        | R::Supply { from, .. }
        | R::CompleteUnit { from } => view.seen_before(*from).then(|| response.clone()),
        R::CreateUnit { to, .. } => view.seen_after(*to).then(|| response.clone()),
        R::CreateBuilding { from, .. } => view.seen_before(*from).then(|| response.clone()),
        R::DropUnit { from, to, .. } => (view.seen_before(*from) && view.seen_after(*to)).then(|| response.clone()),
        R::Rescue {
            from,
            to,
            player,
            completed,
        } => {
            if view.seen_before(*from) {
                Some(response.clone())
            } else if view.seen_before(*to) {
                Some(R::HiddenSourceRescue {
                    to: *to,
                    player: *player,
                    completed: *completed,
                })
            } else {
                None
            }
        }
        R::Sabotage { from, to, unit } => {
            if view.seen_before(*from) {
                Some(response.clone())
            } else if view.friend(unit.player) || view.seen_before(*to) {
                Some(R::HiddenSourceSabotage {
                    to: *to,
                    unit: unit.clone(),
                })
            } else {
                None
            }
        }
        R::ToggleLightning { .. } | R::ActivatePower { .. } | R::Message { .. } => Some(response.clone()),
        R::EndTurn {
            current,
            next,
            round,
            funds,
            miss,
        } => Some(R::EndTurn {
            current: *current,
            next: *next,
            round: *round,
            funds: if view.friend(*next) { *funds } else { 0 },
            miss: *miss,
        }),
        R::Spawn { units } => {
            let visible: Vec<(Vector, Unit)> = units
                .iter()
                .filter(|(v, u)| view.friend(u.player) || view.seen_after(*v))
                .cloned()
                .collect();
            (!visible.is_empty()).then_some(R::Spawn { units: visible })
        }
        R::ReceiveReward { player, .. } => view.friend(*player).then(|| response.clone()),
        R::OptionalObjective { .. }
        | R::GameEnd { .. }
        | R::BeginTurnGameOver { .. }
        | R::PreviousTurnGameOver { .. }
        | R::CaptureGameOver { .. }
        | R::AttackBuildingGameOver { .. } => Some(response.clone()),
        R::HiddenMove { .. }
        | R::HiddenSourceAttackUnit { .. }
        | R::HiddenTargetAttackUnit { .. }
        | R::HiddenSourceAttackBuilding { .. }
        | R::HiddenTargetAttackBuilding { .. }
        | R::HiddenDestroyedBuilding { .. }
        | R::HiddenSourceRescue { .. }
        | R::HiddenSourceSabotage { .. } => Some(response.clone()),
    }
}

// ---------------------------------------------------------------------------
// Whole-chain encoding
// ---------------------------------------------------------------------------

/// Encode the chain that took `start` through `trace` for `viewer`, whose
/// team had `seen` the given statistics when it started.
pub fn encode_trace(
    config: &GameConfig,
    start: &Board,
    trace: &[TraceEntry],
    viewer: PlayerId,
    seen: &Sightings,
) -> EncodedTrace {
    encode(config, start, trace, viewer, seen).0
}

/// The statistics `viewer`'s team has seen once the chain is over.
pub fn observe(config: &GameConfig, start: &Board, trace: &[TraceEntry], viewer: PlayerId, seen: &Sightings) -> Sightings {
    encode(config, start, trace, viewer, seen).1
}

fn encode(
    config: &GameConfig,
    start: &Board,
    trace: &[TraceEntry],
    viewer: PlayerId,
    seen: &Sightings,
) -> (EncodedTrace, Sightings) {
    let mut client = Vision::compute(config, start, viewer).redact_board_with(start, seen);
    let mut sightings = seen.clone();
    let mut before = start;
    let mut own = None;
    let mut entries = Vec::new();

    for (index, step) in trace.iter().enumerate() {
        let response = project(config, before, &step.board, &step.response, viewer);
        let simulated = match &response {
            Some(r) => apply_response(config, &client, r),
            None => client.clone(),
        };
        // Statistics move only with the outcomes the client applies.
        let vision = Vision::compute(config, &step.board, viewer);
        sightings = vision.sightings(&simulated);
        let desired = vision.redact_board_with(&step.board, &sightings);

        let mut entry = EncodedEntry {
            response,
            units: diff(&simulated.units, &desired.units),
            buildings: diff(&simulated.buildings, &desired.buildings),
            players: desired
                .players
                .values()
                .filter(|p| simulated.players.get(&p.id) != Some(*p))
                .cloned()
                .collect(),
            snapshot: None,
        };
        if let ActionResponse::CaptureGameOver { player, by, .. } = &step.response {
            if step.board.same_team(*by, viewer) {
                reveal_inheritance(&mut entry, before, &desired, *player);
            }
        }
        let patched = patch(config, &client, &entry);
        if patched != desired {
            entry.snapshot = Some(desired.clone());
        }
        client = desired;

        if index == 0 && step.response.actor(before) == Some(viewer) {
            own = Some(entry);
        } else if !entry.is_empty() {
            entries.push(entry);
        }
        before = &step.board;
    }

    let trace = EncodedTrace {
        version: TRACE_VERSION,
        own,
        entries,
    };
    (trace, sightings)
}

/// List every building `loser` held before the capture, as the capturing
/// team now sees it.
fn reveal_inheritance(entry: &mut EncodedEntry, before: &Board, desired: &Board, loser: PlayerId) {
    let listed: BTreeSet<Vector> = entry.buildings.iter().map(|(v, _)| *v).collect();
    for (v, _) in before.buildings_of(loser) {
        if !listed.contains(&v) {
            entry.buildings.push((v, desired.buildings.get(&v).cloned()));
        }
    }
    entry.buildings.sort_by_key(|(v, _)| *v);
}

fn diff<T: Clone + PartialEq>(have: &BTreeMap<Vector, T>, want: &BTreeMap<Vector, T>) -> Vec<(Vector, Option<T>)> {
    let keys: BTreeSet<&Vector> = have.keys().chain(want.keys()).collect();
    keys.into_iter()
        .filter(|v| have.get(v) != want.get(v))
        .map(|v| (*v, want.get(v).cloned()))
        .collect()
}

/// Apply one entry to a client board.
fn patch(config: &GameConfig, board: &Board, entry: &EncodedEntry) -> Board {
    if let Some(snapshot) = &entry.snapshot {
        return snapshot.clone();
    }
    let mut next = match &entry.response {
        Some(r) => apply_response(config, board, r),
        None => board.clone(),
    };
    for (v, unit) in &entry.units {
        match unit {
            Some(u) => {
                next.units.insert(*v, u.clone());
            }
            None => {
                next.units.remove(v);
            }
        }
    }
    for (v, building) in &entry.buildings {
        match building {
            Some(b) => {
                next.buildings.insert(*v, b.clone());
            }
            None => {
                next.buildings.remove(v);
            }
        }
    }
    for player in &entry.players {
        next.players.insert(player.id, player.clone());
    }
    next
}

/// Replay an encoded trace onto the client's board.
pub fn apply_encoded(config: &GameConfig, board: &Board, trace: &EncodedTrace) -> Board {
    trace
        .own
        .iter()
        .chain(&trace.entries)
        .fold(board.clone(), |b, entry| patch(config, &b, entry))
}

// ---------------------------------------------------------------------------
// Wire form
// ---------------------------------------------------------------------------

pub fn serialize_trace(trace: &EncodedTrace) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(trace)
}

/// Parse a trace received from the server. Failures are logged and returned.
pub fn decode_trace(bytes: &[u8]) -> Result<EncodedTrace, DecodeError> {
    let trace: EncodedTrace = serde_json::from_slice(bytes).map_err(|e| {
        warn!(error = %e, "failed to decode trace");
        DecodeError::from(e)
    })?;
    if trace.version != TRACE_VERSION {
        warn!(found = trace.version, expected = TRACE_VERSION, "trace version mismatch");
        return Err(DecodeError::Version {
            found: trace.version,
            expected: TRACE_VERSION,
        });
    }
    Ok(trace)
}
