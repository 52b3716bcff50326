// Uniform-cost flood fill over the tile grid.
//
// `flood` is a Dijkstra search from one origin with a cost budget, using a
// `BinaryHeap` min-heap keyed by `(cost, Vector)`. It answers both "where can
// this unit move" (step cost = terrain movement cost, blocked tiles return
// `None`) and "what can this unit see" (step cost = terrain vision cost, see
// `vision.rs`). Parents are recorded so a cheapest path can be rebuilt.
//
// See also: `resolver.rs` (move validation and ambush truncation),
// `automated.rs` (candidate destinations).
//
// **Critical constraint: determinism.** Ties are broken by `Vector` order in
// the heap and by the fixed neighbor order of `Vector::neighbors`, so the
// same board always yields the same path.

use crate::board::Board;
use crate::config::GameConfig;
use crate::types::{MovementType, Vector};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

/// Everything reachable from `origin` within a budget.
#[derive(Clone, Debug)]
pub struct Reachable {
    pub origin: Vector,
    costs: BTreeMap<Vector, u32>,
    parents: BTreeMap<Vector, Vector>,
}

impl Reachable {
    pub fn cost(&self, v: Vector) -> Option<u32> {
        self.costs.get(&v).copied()
    }

    pub fn contains(&self, v: Vector) -> bool {
        self.costs.contains_key(&v)
    }

    /// Reachable tiles in `Vector` order, origin included.
    pub fn tiles(&self) -> impl Iterator<Item = Vector> + '_ {
        self.costs.keys().copied()
    }

    /// Cheapest path to `to`, excluding the origin. Empty for the origin itself.
    pub fn path_to(&self, to: Vector) -> Option<Vec<Vector>> {
        if !self.contains(to) {
            return None;
        }
        let mut path = Vec::new();
        let mut current = to;
        while current != self.origin {
            path.push(current);
            current = *self.parents.get(&current)?;
        }
        path.reverse();
        Some(path)
    }
}

/// Dijkstra from `origin`. `step` returns the cost of entering a tile, or
/// `None` if it cannot be entered.
pub fn flood(origin: Vector, budget: u32, step: impl Fn(Vector) -> Option<u32>) -> Reachable {
    let mut costs = BTreeMap::new();
    let mut parents = BTreeMap::new();
    let mut open = BinaryHeap::new();
    costs.insert(origin, 0);
    open.push(Reverse((0u32, origin)));

    while let Some(Reverse((cost, current))) = open.pop() {
        if costs.get(&current).is_some_and(|&best| cost > best) {
            continue;
        }
        for next in current.neighbors() {
            let Some(step_cost) = step(next) else {
                continue;
            };
            let total = cost + step_cost;
            if total > budget {
                continue;
            }
            if costs.get(&next).is_none_or(|&best| total < best) {
                costs.insert(next, total);
                parents.insert(next, current);
                open.push(Reverse((total, next)));
            }
        }
    }

    Reachable {
        origin,
        costs,
        parents,
    }
}

/// Terrain cost for `movement_type` to enter `v`, ignoring units.
/// Out-of-bounds tiles and lightning barriers are impassable.
pub fn enter_cost(
    config: &GameConfig,
    board: &Board,
    v: Vector,
    movement_type: MovementType,
) -> Option<u32> {
    if board.lightning.contains(&v) {
        return None;
    }
    let tile = board.tile(v)?;
    config.movement_cost(tile, movement_type)
}

/// Movement range from `from` for a unit of `movement_type`. Tiles for which
/// `blocked` returns true cannot be entered or crossed.
pub fn reachable(
    config: &GameConfig,
    board: &Board,
    from: Vector,
    movement_type: MovementType,
    budget: u32,
    blocked: impl Fn(Vector) -> bool,
) -> Reachable {
    flood(from, budget, |v| {
        if blocked(v) {
            None
        } else {
            enter_cost(config, board, v, movement_type)
        }
    })
}

/// Total cost of walking `path` from `from`, or `None` if a step is not
/// orthogonally adjacent to the previous one or is impassable.
pub fn path_cost(
    config: &GameConfig,
    board: &Board,
    from: Vector,
    path: &[Vector],
    movement_type: MovementType,
) -> Option<u32> {
    let mut previous = from;
    let mut total = 0;
    for &step in path {
        if !previous.is_adjacent(step) {
            return None;
        }
        total += enter_cost(config, board, step, movement_type)?;
        previous = step;
    }
    Some(total)
}
