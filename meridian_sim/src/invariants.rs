// Structural invariants of boards and resolution chains.
//
// These are programmer-error checks, not rule checks: a legal intent can
// never produce a violation. The pipeline in `game.rs` runs
// `check_invariants` after every appended outcome under `debug_assert!`, and
// the scenario tests run it on every board they see.
//
// ## Board checks
//
// - Every unit and building sits inside the board.
// - Units on the board have health in `1..=MAX_HEALTH`; cargo respects the
//   carrier's capacity.
// - Every owner exists in the roster (neutral excepted).
// - Eliminated players own no units and are not in the active list.
//
// ## Chain checks
//
// - At most one `GameEnd`, and nothing after it.
// - No `(player, reward)` pair issued twice, including pairs already
//   recorded on the starting board.
//
// See also: `board.rs`, `game.rs`.

use crate::board::Board;
use crate::config::GameConfig;
use crate::response::ActionResponse;
use crate::types::{PlayerId, Reward, Vector};
use crate::unit::{MAX_HEALTH, Unit};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    OutOfBounds(Vector),
    BadHealth { at: Vector, health: u8 },
    OverCapacity { at: Vector, cargo: usize },
    UnknownOwner { at: Vector, player: PlayerId },
    EliminatedOwner { at: Vector, player: PlayerId },
    EliminatedButActive(PlayerId),
    OutcomeAfterGameEnd { index: usize },
    DuplicateReward { player: PlayerId, reward: Reward },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds(v) => write!(f, "entity outside the board at {v}"),
            Self::BadHealth { at, health } => write!(f, "unit at {at} has health {health}"),
            Self::OverCapacity { at, cargo } => write!(f, "transport at {at} carries {cargo} units"),
            Self::UnknownOwner { at, player } => write!(f, "entity at {at} owned by unknown {player}"),
            Self::EliminatedOwner { at, player } => write!(f, "unit at {at} owned by eliminated {player}"),
            Self::EliminatedButActive(p) => write!(f, "{p} is eliminated but still active"),
            Self::OutcomeAfterGameEnd { index } => write!(f, "outcome {index} follows GameEnd"),
            Self::DuplicateReward { player, reward } => write!(f, "{reward:?} issued twice to {player}"),
        }
    }
}

pub fn check_board(config: &GameConfig, board: &Board) -> Vec<InvariantViolation> {
    let mut out = Vec::new();
    let owner_ok = |at: Vector, player: PlayerId, out: &mut Vec<InvariantViolation>| {
        if player.is_neutral() {
            return;
        }
        match board.player(player) {
            None => out.push(InvariantViolation::UnknownOwner { at, player }),
            Some(p) if p.eliminated => out.push(InvariantViolation::EliminatedOwner { at, player }),
            Some(_) => {}
        }
    };

    for (&at, unit) in &board.units {
        if !board.contains(at) {
            out.push(InvariantViolation::OutOfBounds(at));
        }
        check_unit(config, at, unit, &mut out);
        owner_ok(at, unit.player, &mut out);
    }
    for (&at, building) in &board.buildings {
        if !board.contains(at) {
            out.push(InvariantViolation::OutOfBounds(at));
        }
        if !building.player.is_neutral() && board.player(building.player).is_none() {
            out.push(InvariantViolation::UnknownOwner {
                at,
                player: building.player,
            });
        }
    }
    for &id in &board.active_players {
        if board.player(id).is_none_or(|p| p.eliminated) {
            out.push(InvariantViolation::EliminatedButActive(id));
        }
    }
    out
}

fn check_unit(config: &GameConfig, at: Vector, unit: &Unit, out: &mut Vec<InvariantViolation>) {
    if unit.health == 0 || unit.health > MAX_HEALTH {
        out.push(InvariantViolation::BadHealth {
            at,
            health: unit.health,
        });
    }
    let capacity = config.units.get(&unit.unit_type).map_or(0, |info| usize::from(info.capacity));
    if unit.cargo.len() > capacity {
        out.push(InvariantViolation::OverCapacity {
            at,
            cargo: unit.cargo.len(),
        });
    }
    for passenger in &unit.cargo {
        check_unit(config, at, passenger, out);
    }
}

/// Chain-level checks. `start` supplies the rewards issued before the chain.
pub fn check_trace<'a>(
    start: &Board,
    responses: impl IntoIterator<Item = &'a ActionResponse>,
) -> Vec<InvariantViolation> {
    let mut out = Vec::new();
    let mut granted: BTreeSet<(PlayerId, Reward)> = start.granted_rewards.clone();
    let mut ended = start.ended;
    for (index, response) in responses.into_iter().enumerate() {
        if ended {
            out.push(InvariantViolation::OutcomeAfterGameEnd { index });
        }
        match response {
            ActionResponse::GameEnd { .. } => ended = true,
            ActionResponse::ReceiveReward { player, reward } => {
                if !granted.insert((*player, *reward)) {
                    out.push(InvariantViolation::DuplicateReward {
                        player: *player,
                        reward: *reward,
                    });
                }
            }
            _ => {}
        }
    }
    out
}

/// Board and chain checks together.
pub fn check_invariants<'a>(
    config: &GameConfig,
    start: &Board,
    responses: impl IntoIterator<Item = &'a ActionResponse>,
    board: &Board,
) -> Vec<InvariantViolation> {
    let mut out = check_trace(start, responses);
    out.extend(check_board(config, board));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Player;
    use crate::types::{Size, Skill, TeamId, UnitType};

    const P1: PlayerId = PlayerId(1);
    const P2: PlayerId = PlayerId(2);

    fn board() -> Board {
        Board::new(Size::new(4, 4))
            .with_player(Player::new(P1, TeamId(1), 0))
            .with_player(Player::new(P2, TeamId(2), 0))
    }

    fn unit(config: &GameConfig, unit_type: UnitType, player: PlayerId) -> Unit {
        Unit::new(unit_type, player, &config.units[&unit_type])
    }

    #[test]
    fn a_clean_board_passes() {
        let config = GameConfig::default();
        let b = board().with_unit(Vector::new(1, 1), unit(&config, UnitType::Infantry, P1));
        assert_eq!(check_board(&config, &b), vec![]);
    }

    #[test]
    fn board_violations_are_reported() {
        let config = GameConfig::default();
        let mut b = board()
            .with_unit(Vector::new(9, 9), unit(&config, UnitType::Infantry, P1))
            .with_unit(Vector::new(0, 0), unit(&config, UnitType::Tank, PlayerId(7)))
            .with_unit(
                Vector::new(1, 0),
                unit(&config, UnitType::Infantry, P2).with_cargo(unit(&config, UnitType::Infantry, P2)),
            );
        b.units.get_mut(&Vector::new(9, 9)).unwrap().health = 0;
        let found = check_board(&config, &b);
        assert!(found.contains(&InvariantViolation::OutOfBounds(Vector::new(9, 9))));
        assert!(found.contains(&InvariantViolation::BadHealth {
            at: Vector::new(9, 9),
            health: 0
        }));
        assert!(found.contains(&InvariantViolation::UnknownOwner {
            at: Vector::new(0, 0),
            player: PlayerId(7)
        }));
        assert!(found.contains(&InvariantViolation::OverCapacity {
            at: Vector::new(1, 0),
            cargo: 1
        }));
    }

    #[test]
    fn eliminated_players_must_be_gone() {
        let config = GameConfig::default();
        let mut b = board().with_unit(Vector::new(2, 2), unit(&config, UnitType::Infantry, P2));
        b.players.get_mut(&P2).unwrap().eliminated = true;
        let found = check_board(&config, &b);
        assert!(found.contains(&InvariantViolation::EliminatedButActive(P2)));
        assert!(found.contains(&InvariantViolation::EliminatedOwner {
            at: Vector::new(2, 2),
            player: P2
        }));
    }

    #[test]
    fn chains_end_once_and_reward_once() {
        let mut start = board();
        start.granted_rewards.insert((P1, Reward::Skill(Skill::Recon)));
        let chain = [
            ActionResponse::ReceiveReward {
                player: P1,
                reward: Reward::Skill(Skill::Recon),
            },
            ActionResponse::GameEnd {
                winner: None,
                objective_id: None,
                objective: None,
            },
            ActionResponse::EndTurn {
                current: P1,
                next: P2,
                round: 1,
                funds: 0,
                miss: false,
            },
        ];
        assert_eq!(
            check_trace(&start, &chain),
            vec![
                InvariantViolation::DuplicateReward {
                    player: P1,
                    reward: Reward::Skill(Skill::Recon)
                },
                InvariantViolation::OutcomeAfterGameEnd { index: 2 },
            ]
        );
    }
}
