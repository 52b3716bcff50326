// Automated players.
//
// `AutomatedPlayer` is the single seam through which a decision-maker joins
// a match. `game::play_automated_turn` hands it the board redacted for the
// player it controls, collects the returned intents, and resolves them one
// by one with the same validation a human client gets. Proposals that turn
// out to be illegal (usually because an earlier intent changed the board,
// or because fog hid something) are dropped.
//
// `GreedyPlayer` is the reference implementation. Per unit, in priority
// order:
//
// 1. Attack the target it damages most from where it stands.
// 2. Capture the building it stands on.
// 3. Move and capture, for units that can capture.
// 4. Move and attack, for units without ranged weapons.
// 5. Advance toward the nearest opposing unit or building.
//
// A unit's `Behavior` narrows this: `Passive` units are left alone and
// `Defense` units only act from the tile they stand on.
//
// Units are planned in parallel with rayon over the frozen input board;
// plans are then accepted in position order, skipping any whose destination
// another plan already claimed. Buildings then produce the most expensive
// unit they can afford, and the turn ends.
//
// **Critical constraint: determinism.** Ties between equally good tiles are
// broken with a per-unit `MatchRng` seeded from the player's generator
// before the parallel section, so results do not depend on thread
// scheduling.

use crate::board::Board;
use crate::combat::unit_strike;
use crate::config::{GameConfig, UnitInfo};
use crate::intent::Intent;
use crate::pathfinding::{Reachable, enter_cost, reachable};
use crate::prng::MatchRng;
use crate::types::{Behavior, PlayerId, Vector};
use crate::unit::Unit;
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use tracing::debug;

pub trait AutomatedPlayer {
    /// Intents for `player`'s turn, in the order they should be resolved.
    /// `board` is already limited to what `player` can see.
    fn decide(&mut self, config: &GameConfig, board: &Board, player: PlayerId) -> Vec<Intent>;
}

#[derive(Clone, Debug)]
pub struct GreedyPlayer {
    rng: MatchRng,
}

impl GreedyPlayer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: MatchRng::new(seed),
        }
    }
}

struct Plan {
    from: Vector,
    destination: Vector,
    intents: Vec<Intent>,
}

impl AutomatedPlayer for GreedyPlayer {
    fn decide(&mut self, config: &GameConfig, board: &Board, player: PlayerId) -> Vec<Intent> {
        let units: Vec<(Vector, &Unit)> = board.units_of(player).filter(|(_, u)| !u.completed).collect();
        let seeds: Vec<u64> = units.iter().map(|_| self.rng.next_u64()).collect();

        let plans: Vec<Option<Plan>> = units
            .par_iter()
            .zip(seeds.par_iter())
            .map(|(&(from, unit), &seed)| plan_unit(config, board, player, from, unit, MatchRng::new(seed)))
            .collect();

        let mut claimed: BTreeSet<Vector> = board.units.keys().copied().collect();
        let mut intents = Vec::new();
        for plan in plans.into_iter().flatten() {
            if plan.destination != plan.from {
                if claimed.contains(&plan.destination) {
                    continue;
                }
                claimed.remove(&plan.from);
                claimed.insert(plan.destination);
            }
            intents.extend(plan.intents);
        }
        intents.extend(produce(config, board, player, &mut claimed));
        intents.push(Intent::EndTurn);
        debug!(%player, intents = intents.len(), "automated turn planned");
        intents
    }
}

// ---------------------------------------------------------------------------
// Per-unit planning
// ---------------------------------------------------------------------------

fn plan_unit(
    config: &GameConfig,
    board: &Board,
    player: PlayerId,
    from: Vector,
    unit: &Unit,
    mut rng: MatchRng,
) -> Option<Plan> {
    if unit.behavior == Some(Behavior::Passive) {
        return None;
    }
    let info = config.units.get(&unit.unit_type)?;
    let stay = |intents: Vec<Intent>| {
        Some(Plan {
            from,
            destination: from,
            intents,
        })
    };

    if info.requires_fold {
        if !unit.folded {
            return stay(vec![Intent::Fold { from }]);
        }
        let (to, _) = best_target(config, board, player, unit, from)?;
        return stay(vec![Intent::AttackUnit { from, to }]);
    }
    if let Some((to, _)) = best_target(config, board, player, unit, from) {
        return stay(vec![Intent::AttackUnit { from, to }]);
    }
    if info.capture_power > 0 && capturable(config, board, player, from) {
        return stay(vec![Intent::Capture { from }]);
    }
    if unit.moved || unit.behavior == Some(Behavior::Defense) {
        return None;
    }

    let range = movement_range(config, board, player, from, unit, info);
    let free: Vec<Vector> = range
        .tiles()
        .filter(|&v| v != from && !board.units.contains_key(&v))
        .collect();
    let go = |to: Vector, then: Option<Intent>| {
        let mut intents = vec![Intent::Move { from, to, path: None }];
        intents.extend(then);
        Some(Plan {
            from,
            destination: to,
            intents,
        })
    };

    if info.capture_power > 0 {
        let targets: Vec<Vector> = free
            .iter()
            .copied()
            .filter(|&v| capturable(config, board, player, v))
            .collect();
        if let Some(to) = cheapest(&range, &targets, &mut rng) {
            return go(to, Some(Intent::Capture { from: to }));
        }
    }

    if !info.weapons.iter().any(|w| w.is_ranged()) {
        let strikes: Vec<(Vector, Vector, u8)> = free
            .iter()
            .filter_map(|&at| best_target(config, board, player, unit, at).map(|(to, damage)| (at, to, damage)))
            .collect();
        if let Some(best) = strikes.iter().map(|s| s.2).max() {
            let tied: Vec<(Vector, Vector, u8)> = strikes.into_iter().filter(|s| s.2 == best).collect();
            if let Some(&(at, to, _)) = rng.pick(&tied) {
                return go(at, Some(Intent::AttackUnit { from: at, to }));
            }
        }
    }

    let goals = goals(config, board, player);
    let distance_to_goal = |v: Vector| goals.iter().map(|g| v.distance(*g)).min();
    let here = distance_to_goal(from)?;
    let best = free.iter().filter_map(|&v| distance_to_goal(v)).min()?;
    if best >= here {
        return None;
    }
    let closest: Vec<Vector> = free
        .iter()
        .copied()
        .filter(|&v| distance_to_goal(v) == Some(best))
        .collect();
    let to = cheapest(&range, &closest, &mut rng)?;
    go(to, None)
}

fn movement_range(
    config: &GameConfig,
    board: &Board,
    player: PlayerId,
    from: Vector,
    unit: &Unit,
    info: &UnitInfo,
) -> Reachable {
    let budget = u32::from(info.movement_radius.min(unit.fuel));
    reachable(config, board, from, info.movement_type, budget, |v| {
        board
            .units
            .get(&v)
            .is_some_and(|other| board.is_opponent(player, other.player))
    })
}

/// The opposing unit `unit` would damage most when firing from `at`.
fn best_target(config: &GameConfig, board: &Board, player: PlayerId, unit: &Unit, at: Vector) -> Option<(Vector, u8)> {
    let mut best: Option<(Vector, u8)> = None;
    for (&to, defender) in &board.units {
        if !board.is_opponent(player, defender.player) {
            continue;
        }
        if let Some(strike) = unit_strike(config, board, unit, at, defender, to, false) {
            if best.is_none_or(|(_, damage)| strike.damage > damage) {
                best = Some((to, strike.damage));
            }
        }
    }
    best
}

fn capturable(config: &GameConfig, board: &Board, player: PlayerId, v: Vector) -> bool {
    board.buildings.get(&v).is_some_and(|b| {
        !board.same_team(b.player, player)
            && config
                .buildings
                .get(&b.building_type)
                .is_some_and(|info| info.capture_resistance.is_some())
    })
}

/// Opposing units and every building not held by `player`'s team.
fn goals(config: &GameConfig, board: &Board, player: PlayerId) -> Vec<Vector> {
    let units = board
        .units
        .iter()
        .filter(|(_, u)| board.is_opponent(player, u.player))
        .map(|(v, _)| *v);
    let buildings = board
        .buildings
        .keys()
        .copied()
        .filter(|&v| capturable(config, board, player, v));
    units.chain(buildings).collect()
}

/// The cheapest of `candidates` to reach, ties broken by `rng`.
fn cheapest(range: &Reachable, candidates: &[Vector], rng: &mut MatchRng) -> Option<Vector> {
    let best = candidates.iter().filter_map(|&v| range.cost(v)).min()?;
    let tied: Vec<Vector> = candidates
        .iter()
        .copied()
        .filter(|&v| range.cost(v) == Some(best))
        .collect();
    rng.pick(&tied).copied()
}

// ---------------------------------------------------------------------------
// Production
// ---------------------------------------------------------------------------

fn produce(config: &GameConfig, board: &Board, player: PlayerId, claimed: &mut BTreeSet<Vector>) -> Vec<Intent> {
    let mut funds = board.player(player).map_or(0, |p| p.funds);
    let mut out = Vec::new();
    for (at, building) in board.buildings_of(player) {
        if building.completed {
            continue;
        }
        let Some(info) = config.buildings.get(&building.building_type) else {
            continue;
        };
        let Some(to) = std::iter::once(at)
            .chain(at.neighbors())
            .find(|v| board.contains(*v) && !claimed.contains(v))
        else {
            continue;
        };
        let choice = info
            .produces
            .iter()
            .filter_map(|&t| config.units.get(&t).map(|u| (t, u)))
            .filter(|(_, u)| u.cost <= funds && enter_cost(config, board, to, u.movement_type).is_some())
            .max_by_key(|&(t, u)| (u.cost, Reverse(t)));
        if let Some((unit_type, unit_info)) = choice {
            funds -= unit_info.cost;
            claimed.insert(to);
            out.push(Intent::CreateUnit {
                from: at,
                to,
                unit_type,
            });
        }
    }
    out
}
