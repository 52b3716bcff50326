// Successor boards: apply one outcome record to a board.
//
// `apply_response` is total. It accepts any `ActionResponse`, including the
// `Hidden*` variants a client receives, and silently skips the parts that do
// not fit the board (a missing unit, an unknown player). Servers only ever
// feed it outcomes that `resolver::validate` produced against the same
// board, so on the server every branch lands. Clients apply projected
// outcomes to their fogged copy, where gaps are expected and later filled
// by the encoder's deltas.
//
// Statistics are derived here from the difference between the previous
// board and the outcome (damage dealt, kills, captures), so the resolver
// never needs to carry them.
//
// See also: `resolver.rs` (produces the outcomes), `encoder.rs` (client
// replay), `invariants.rs`.
//
// **Critical constraint: determinism.** Same board and same outcome give
// the same successor board, byte for byte when serialized.

use crate::board::Board;
use crate::config::GameConfig;
use crate::player::PlayerStats;
use crate::response::ActionResponse;
use crate::types::{PlayerId, Reward, Vector};
use crate::unit::{MAX_HEALTH, Unit};

/// The board after `response`.
pub fn apply_response(config: &GameConfig, board: &Board, response: &ActionResponse) -> Board {
    use ActionResponse as R;
    let mut next = board.clone();
    match response {
        R::Move {
            from,
            to,
            fuel,
            completed,
            ..
        } => {
            if let Some(mut unit) = next.units.remove(from) {
                unit.fuel = *fuel;
                unit.moved = true;
                unit.capture_progress = 0;
                unit.completed |= *completed;
                place_moved(&mut next, *from, *to, unit);
            }
        }
        R::AttackUnit {
            from,
            to,
            player_a,
            player_b,
            unit_a,
            unit_b,
            charge_a,
            charge_b,
            ..
        } => {
            let health_a = board.units.get(from).map_or(0, |u| u.health);
            let health_b = board.units.get(to).map_or(0, |u| u.health);
            let dealt = health_b.saturating_sub(unit_b.as_ref().map_or(0, |u| u.health));
            let received = health_a.saturating_sub(unit_a.as_ref().map_or(0, |u| u.health));
            set_unit(&mut next, *from, unit_a.clone());
            set_unit(&mut next, *to, unit_b.clone());
            if let Some(p) = next.players.get_mut(player_a) {
                p.charge = *charge_a;
            }
            if let Some(p) = next.players.get_mut(player_b) {
                p.charge = *charge_b;
            }
            with_stats(&mut next, *player_a, |s| s.damage_dealt += u32::from(dealt));
            with_stats(&mut next, *player_b, |s| s.damage_dealt += u32::from(received));
            if unit_b.is_none() && health_b > 0 {
                with_stats(&mut next, *player_a, |s| {
                    s.destroyed_units += 1;
                    if health_b == MAX_HEALTH {
                        s.one_shots += 1;
                    }
                });
                with_stats(&mut next, *player_b, |s| s.lost_units += 1);
            }
            if unit_a.is_none() && health_a > 0 {
                with_stats(&mut next, *player_b, |s| s.destroyed_units += 1);
                with_stats(&mut next, *player_a, |s| s.lost_units += 1);
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
            let before = board.buildings.get(to);
            let owner = before.map(|b| b.player);
            let dealt = before.map_or(0, |b| b.health).saturating_sub(building.as_ref().map_or(0, |b| b.health));
            next.units.insert(*from, unit_a.clone());
            match building {
                Some(b) => {
                    next.buildings.insert(*to, b.clone());
                }
                None => {
                    next.buildings.remove(to);
                }
            }
            if let Some(p) = next.players.get_mut(player_a) {
                p.charge = *charge_a;
            }
            with_stats(&mut next, *player_a, |s| s.damage_dealt += u32::from(dealt));
            if building.is_none() && before.is_some() {
                with_stats(&mut next, *player_a, |s| s.destroyed_buildings += 1);
                if let Some(owner) = owner {
                    with_stats(&mut next, owner, |s| s.lost_buildings += 1);
                }
            }
        }
        R::Capture {
            from,
            player,
            progress,
            building,
        } => {
            if let Some(unit) = next.units.get_mut(from) {
                unit.completed = true;
                unit.capture_progress = progress.unwrap_or(0);
            }
            if let Some(captured) = building {
                let previous = board.buildings.get(from).map(|b| b.player);
                next.buildings.insert(*from, captured.clone());
                with_stats(&mut next, *player, |s| s.captured += 1);
                if let Some(previous) = previous.filter(|p| !p.is_neutral()) {
                    with_stats(&mut next, previous, |s| s.lost_buildings += 1);
                }
            }
        }
        R::CreateUnit { from, to, unit, cost } => {
            let owner = unit.player;
            next.units.insert(*to, unit.clone());
            if let Some(building) = next.buildings.get_mut(from) {
                if building.player == owner {
                    building.completed = true;
                }
            }
            if let Some(p) = next.players.get_mut(&owner) {
                p.funds = p.funds.saturating_sub(*cost);
            }
            with_stats(&mut next, owner, |s| s.created_units += 1);
        }
        R::CreateBuilding { from, building, cost } => {
            let owner = building.player;
            next.buildings.insert(*from, building.clone());
            if let Some(unit) = next.units.get_mut(from) {
                unit.completed = true;
            }
            if let Some(p) = next.players.get_mut(&owner) {
                p.funds = p.funds.saturating_sub(*cost);
            }
            with_stats(&mut next, owner, |s| s.created_buildings += 1);
        }
        R::DropUnit {
            from,
            index,
            to,
            completed,
        } => {
            let dropped = next
                .units
                .get_mut(from)
                .filter(|t| *index < t.cargo.len())
                .map(|t| t.cargo.remove(*index));
            if let Some(mut unit) = dropped {
                unit.moved = true;
                unit.completed = *completed;
                next.units.insert(*to, unit);
            }
        }
        R::Rescue {
            from,
            to,
            player,
            completed,
        } => {
            if let Some(rescuer) = next.units.get_mut(from) {
                rescuer.completed = true;
            }
            rescue_target(&mut next, *to, *player, *completed);
        }
        R::Sabotage { from, to, unit } => {
            let dealt = board
                .units
                .get(to)
                .map_or(0, |u| u.health.saturating_sub(unit.health));
            let saboteur = next.units.get_mut(from).map(|s| {
                s.completed = true;
                s.player
            });
            next.units.insert(*to, unit.clone());
            if let Some(player) = saboteur {
                with_stats(&mut next, player, |s| s.damage_dealt += u32::from(dealt));
            }
        }
        R::Fold { from } => {
            if let Some(unit) = next.units.get_mut(from) {
                unit.folded = true;
            }
        }
        R::Unfold { from } => {
            if let Some(unit) = next.units.get_mut(from) {
                unit.folded = false;
                unit.completed = true;
            }
        }
        R::ToggleLightning { from, to, .. } => {
            if !next.lightning.remove(to) {
                next.lightning.insert(*to);
            }
            if let Some(building) = next.buildings.get_mut(from) {
                building.completed = true;
            }
        }
        R::ActivatePower { player, skill } => {
            let info = config.skills.get(skill);
            if let Some(p) = next.players.get_mut(player) {
                p.charge = p.charge.saturating_sub(info.map_or(0, |i| i.charge_cost));
                p.active_powers.insert(*skill);
            }
            let heal = info.map_or(0, |i| i.heal);
            if heal > 0 {
                for unit in next.units.values_mut().filter(|u| u.player == *player) {
                    unit.health = unit.health.saturating_add(heal).min(MAX_HEALTH);
                }
            }
        }
        R::Supply { from, player } => {
            if let Some(unit) = next.units.get_mut(from) {
                unit.completed = true;
            }
            for n in from.neighbors() {
                if let Some(unit) = next.units.get_mut(&n) {
                    if unit.player == *player {
                        if let Some(info) = config.units.get(&unit.unit_type) {
                            unit.resupply(info);
                        }
                    }
                }
            }
        }
        R::CompleteUnit { from } => {
            if let Some(unit) = next.units.get_mut(from) {
                unit.completed = true;
            }
        }
        R::EndTurn {
            current,
            next: upcoming,
            round,
            funds,
            miss,
        } => {
            if let Some(p) = next.players.get_mut(current) {
                p.active_powers.clear();
                if *miss {
                    p.misses = p.misses.saturating_add(1);
                }
            }
            next.current_player = *upcoming;
            next.round = *round;
            if let Some(p) = next.players.get_mut(upcoming) {
                p.funds = *funds;
            }
            for unit in next.units.values_mut().filter(|u| u.player == *upcoming) {
                unit.refresh();
            }
            for building in next.buildings.values_mut().filter(|b| b.player == *upcoming) {
                building.completed = false;
            }
        }
        R::Message { .. } => {}
        R::Spawn { units } => {
            for (v, unit) in units {
                next.units.insert(*v, unit.clone());
            }
        }
        R::OptionalObjective {
            objective_id,
            objective,
            ..
        } => {
            next.objectives.insert(*objective_id, objective.clone());
        }
        R::ReceiveReward { player, reward } => {
            next.granted_rewards.insert((*player, *reward));
            if let Reward::Skill(skill) = reward {
                if let Some(p) = next.players.get_mut(player) {
                    p.skills.insert(*skill);
                }
            }
        }
        R::GameEnd {
            winner,
            objective_id,
            objective,
        } => {
            next.winner = *winner;
            next.ended = true;
            if let (Some(id), Some(objective)) = (objective_id, objective) {
                next.objectives.insert(*id, objective.clone());
            }
        }
        R::CaptureGameOver { player, by, .. } => eliminate(&mut next, *player, *by),
        R::BeginTurnGameOver { player }
        | R::PreviousTurnGameOver { player }
        | R::AttackBuildingGameOver { player, .. } => eliminate(&mut next, *player, PlayerId::NEUTRAL),

        R::HiddenMove {
            from,
            to,
            completed,
            unit,
            ..
        } => {
            if let Some(from) = from {
                next.units.remove(from);
            }
            if let (Some(to), Some(unit)) = (to, unit) {
                let mut unit = unit.clone();
                unit.completed |= *completed;
                place_moved(&mut next, *to, *to, unit);
            }
        }
        R::HiddenSourceAttackUnit { to, unit_b } => set_unit(&mut next, *to, unit_b.clone()),
        R::HiddenTargetAttackUnit { from, unit_a } => set_unit(&mut next, *from, unit_a.clone()),
        R::HiddenSourceAttackBuilding { to, building } => match building {
            Some(b) => {
                next.buildings.insert(*to, b.clone());
            }
            None => {
                next.buildings.remove(to);
            }
        },
        R::HiddenTargetAttackBuilding { from, unit_a } => {
            next.units.insert(*from, unit_a.clone());
        }
        R::HiddenDestroyedBuilding { position } => {
            next.buildings.remove(position);
        }
        R::HiddenSourceRescue { to, player, completed } => rescue_target(&mut next, *to, *player, *completed),
        R::HiddenSourceSabotage { to, unit } => {
            next.units.insert(*to, unit.clone());
        }
    }

    if !matches!(response, R::EndTurn { .. }) {
        if let Some(actor) = response.actor(board) {
            if let Some(p) = next.players.get_mut(&actor) {
                p.misses = 0;
            }
        }
    }
    next
}

/// Replay a list of outcomes from `board`.
pub fn apply_all<'a>(
    config: &GameConfig,
    board: &Board,
    responses: impl IntoIterator<Item = &'a ActionResponse>,
) -> Board {
    responses
        .into_iter()
        .fold(board.clone(), |b, r| apply_response(config, &b, r))
}

fn set_unit(board: &mut Board, v: Vector, unit: Option<Unit>) {
    match unit {
        Some(u) => {
            board.units.insert(v, u);
        }
        None => {
            board.units.remove(&v);
        }
    }
}

fn with_stats(board: &mut Board, player: PlayerId, f: impl FnOnce(&mut PlayerStats)) {
    if let Some(p) = board.players.get_mut(&player) {
        f(&mut p.stats);
    }
}

/// Put a unit that just moved onto `to`: into an own transport standing
/// there, or onto the tile (rotating a teleporter ring it lands on).
fn place_moved(board: &mut Board, from: Vector, to: Vector, mut unit: Unit) {
    if to != from {
        if let Some(transport) = board.units.get_mut(&to) {
            unit.loaded_this_turn = true;
            unit.completed = true;
            transport.cargo.push(unit);
            return;
        }
    }
    board.units.insert(to, unit);
    if to != from {
        teleport(board, to);
    }
}

/// Rotate every occupant of the ring containing `at` one position forward.
fn teleport(board: &mut Board, at: Vector) {
    let Some(ring) = board.ring_of(at).map(<[Vector]>::to_vec) else {
        return;
    };
    if ring.len() < 2 {
        return;
    }
    let occupants: Vec<Option<Unit>> = ring.iter().map(|v| board.units.remove(v)).collect();
    for (i, occupant) in occupants.into_iter().enumerate() {
        if let Some(unit) = occupant {
            board.units.insert(ring[(i + 1) % ring.len()], unit);
        }
    }
}

fn rescue_target(board: &mut Board, to: Vector, player: PlayerId, completed: bool) {
    let Some(target) = board.units.get_mut(&to) else {
        return;
    };
    if completed {
        target.player = player;
        target.rescuer = None;
        target.completed = true;
        with_stats(board, player, |s| s.rescued += 1);
    } else {
        target.rescuer = Some(player);
    }
}

/// Remove `player` from the match. Their units vanish; their buildings go
/// to `heir` (neutral unless captured).
fn eliminate(board: &mut Board, player: PlayerId, heir: PlayerId) {
    if let Some(p) = board.players.get_mut(&player) {
        p.eliminated = true;
        p.active_powers.clear();
    }
    board.active_players.retain(|&id| id != player);
    board.units.retain(|_, u| u.player != player);
    for building in board.buildings.values_mut().filter(|b| b.player == player) {
        building.player = heir;
    }
}

/// Whether `player` is still in the match on `board`.
pub fn is_alive(board: &Board, player: PlayerId) -> bool {
    board.player(player).is_some_and(|p| !p.eliminated)
}
