// Objective Tracker: eliminations, objective completion, rewards, GameEnd.
//
// `check` looks at one transition (board before, outcome, board after) and
// returns the lifecycle outcomes it causes, in order:
//
// 1. Headquarters loss. Capturing an active player's headquarters yields
//    `CaptureGameOver` (their buildings pass to the capturer); destroying
//    it yields `AttackBuildingGameOver` (their buildings turn neutral).
// 2. Survival objectives, on `EndTurn`, for every active player once the
//    round threshold is reached.
// 3. Action-driven objectives for every active player, the actor first:
//    running totals from team statistics (`*Amount`) or labeled entities on
//    the board (`*Label`, escorts). Removal criteria (`DestroyLabel`,
//    `DefeatLabel`) compare the board before the outcome with the tracker's
//    own board, so eliminations it appends count too. Transported units
//    count as standing on their transport's tile.
// 4. The default win: one team (or none) left standing.
//
// An optional objective completing for a player yields `OptionalObjective`
// carrying the updated snapshot; it fires once per player because the
// snapshot's `completed` set closes it for them. A mandatory objective
// completing ends the match for the completing player's team. Before any `GameEnd`,
// `ReceiveReward` outcomes hand each reward the winning team earned to each
// of its players, skipping pairs already recorded in
// `Board::granted_rewards`.
//
// Outcomes are applied to a local copy of the board as they are produced,
// so later steps see earlier ones. Nothing follows a `GameEnd`.
//
// See also: `objective.rs` (definitions), `game.rs` (where the returned
// outcomes enter the chain), `apply.rs` (eliminations).

use crate::apply::apply_response;
use crate::board::Board;
use crate::config::GameConfig;
use crate::objective::{Criteria, Objective};
use crate::player::PlayerStats;
use crate::response::ActionResponse;
use crate::types::{PlayerId, Reward, TeamId, Vector};
use crate::unit::Unit;
use std::collections::BTreeSet;
use tracing::info;

/// One resolved step of a chain.
#[derive(Clone, Copy, Debug)]
pub struct Transition<'a> {
    pub before: &'a Board,
    pub response: &'a ActionResponse,
    pub after: &'a Board,
}

/// Lifecycle outcomes caused by `transition`.
pub fn check(config: &GameConfig, transition: Transition<'_>) -> Vec<ActionResponse> {
    let mut tracker = Tracker {
        config,
        board: transition.after.clone(),
        out: Vec::new(),
    };
    if transition.after.ended {
        return tracker.out;
    }

    if let Some(elimination) = headquarters_loss(config, transition) {
        tracker.push(elimination);
    }

    if matches!(transition.response, ActionResponse::EndTurn { .. }) {
        let players = tracker.board.active_players.clone();
        for player in players {
            if tracker.evaluate(player, |objective, board, player| {
                objective.criteria == Criteria::Survival && survived(objective, board, player)
            }) {
                return tracker.out;
            }
        }
    } else {
        let before = transition.before;
        for player in evaluation_order(&tracker.board, transition.response.actor(before)) {
            if !tracker.board.is_active(player) {
                continue;
            }
            if tracker.evaluate(player, |objective, board, player| {
                action_criteria_met(objective, before, board, player)
            }) {
                return tracker.out;
            }
        }
    }

    let teams = tracker.board.active_teams();
    if teams.len() <= 1 {
        let winner = teams.first().copied();
        tracker.finish(winner, None);
    }
    tracker.out
}

struct Tracker<'a> {
    config: &'a GameConfig,
    board: Board,
    out: Vec<ActionResponse>,
}

impl Tracker<'_> {
    fn push(&mut self, response: ActionResponse) {
        self.board = apply_response(self.config, &self.board, &response);
        self.out.push(response);
    }

    /// Run `met` over every open objective for `player`. Returns true when
    /// a mandatory objective ended the match.
    fn evaluate(&mut self, player: PlayerId, met: impl Fn(&Objective, &Board, PlayerId) -> bool) -> bool {
        let ids: Vec<u8> = self.board.objectives.keys().copied().collect();
        for id in ids {
            let Some(objective) = self.board.objectives.get(&id) else {
                continue;
            };
            if !objective.is_open_for(player) || !met(objective, &self.board, player) {
                continue;
            }
            let mut snapshot = objective.clone();
            snapshot.completed.insert(player);
            if snapshot.optional {
                info!(objective = id, %player, "optional objective completed");
                self.push(ActionResponse::OptionalObjective {
                    objective_id: id,
                    objective: snapshot,
                    player,
                });
            } else {
                let winner = self.board.team_of(player);
                self.finish(winner, Some((id, snapshot)));
                return true;
            }
        }
        false
    }

    /// Append the winners' rewards and the `GameEnd`.
    fn finish(&mut self, winner: Option<TeamId>, decided_by: Option<(u8, Objective)>) {
        if let Some(team) = winner {
            for (player, reward) in self.rewards(team, decided_by.as_ref()) {
                self.push(ActionResponse::ReceiveReward { player, reward });
            }
        }
        info!(?winner, objective = ?decided_by.as_ref().map(|(id, _)| *id), "game ended");
        let (objective_id, objective) = match decided_by {
            Some((id, objective)) => (Some(id), Some(objective)),
            None => (None, None),
        };
        self.push(ActionResponse::GameEnd {
            winner,
            objective_id,
            objective,
        });
    }

    fn rewards(&self, team: TeamId, decided_by: Option<&(u8, Objective)>) -> Vec<(PlayerId, Reward)> {
        let members = self.board.team_players(team);
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        let mut grant = |player: PlayerId, reward: Reward| {
            if !self.board.granted_rewards.contains(&(player, reward)) && seen.insert((player, reward)) {
                out.push((player, reward));
            }
        };

        if let Some((_, objective)) = decided_by {
            if let Some(reward) = objective.reward {
                for &player in &members {
                    grant(player, reward);
                }
            }
        }
        for objective in self.board.objectives.values() {
            let Some(reward) = objective.reward else {
                continue;
            };
            if objective.optional {
                for player in members.iter().filter(|p| objective.completed.contains(p)) {
                    grant(*player, reward);
                }
            } else if objective.criteria == Criteria::Default && decided_by.is_none() {
                for &player in &members {
                    grant(player, reward);
                }
            }
        }
        out
    }
}

fn headquarters_loss(config: &GameConfig, transition: Transition<'_>) -> Option<ActionResponse> {
    let before = transition.before;
    let is_active_headquarters = |v: &Vector| {
        before.buildings.get(v).filter(|b| {
            before.is_active(b.player)
                && config
                    .buildings
                    .get(&b.building_type)
                    .is_some_and(|info| info.is_headquarters)
        })
    };
    match transition.response {
        ActionResponse::Capture {
            from,
            building: Some(captured),
            ..
        } => is_active_headquarters(from).map(|hq| ActionResponse::CaptureGameOver {
            from: *from,
            player: hq.player,
            by: captured.player,
        }),
        ActionResponse::AttackBuilding {
            to, building: None, ..
        } => is_active_headquarters(to).map(|hq| ActionResponse::AttackBuildingGameOver {
            from: *to,
            player: hq.player,
        }),
        _ => None,
    }
}

/// Active players, the actor first. A counter-attack or a teammate's action
/// can complete an objective for someone who did not act.
fn evaluation_order(board: &Board, actor: Option<PlayerId>) -> Vec<PlayerId> {
    let mut players = board.active_players.clone();
    if let Some(at) = actor.and_then(|actor| players.iter().position(|&p| p == actor)) {
        let actor = players.remove(at);
        players.insert(0, actor);
    }
    players
}

fn survived(objective: &Objective, board: &Board, player: PlayerId) -> bool {
    board.is_active(player) && objective.rounds.is_some_and(|rounds| board.round >= rounds)
}

fn required(objective: &Objective) -> u32 {
    u32::from(objective.amount.unwrap_or(1).max(1))
}

fn team_of(board: &Board, player: PlayerId) -> Vec<PlayerId> {
    board
        .team_of(player)
        .map(|team| board.team_players(team))
        .unwrap_or_default()
}

fn team_total(board: &Board, player: PlayerId, stat: impl Fn(&PlayerStats) -> u32) -> u32 {
    team_of(board, player)
        .iter()
        .filter_map(|p| board.player(*p))
        .map(|p| stat(&p.stats))
        .sum()
}

/// Every unit on the board, cargo included, with the tile it occupies.
fn all_units(board: &Board) -> Vec<(Vector, &Unit)> {
    fn walk<'a>(v: Vector, unit: &'a Unit, out: &mut Vec<(Vector, &'a Unit)>) {
        out.push((v, unit));
        for passenger in &unit.cargo {
            walk(v, passenger, out);
        }
    }
    let mut out = Vec::new();
    for (&v, unit) in &board.units {
        walk(v, unit, &mut out);
    }
    out
}

fn action_criteria_met(objective: &Objective, before: &Board, after: &Board, player: PlayerId) -> bool {
    let on_team = |board: &Board, owner: PlayerId| !owner.is_neutral() && board.same_team(owner, player);
    let labeled_unit = |u: &Unit| objective.matches_label(u.label);
    match objective.criteria {
        Criteria::Default | Criteria::Survival => false,
        Criteria::CaptureAmount => team_total(after, player, |s| s.captured) >= required(objective),
        Criteria::DestroyAmount => team_total(after, player, |s| s.destroyed_buildings) >= required(objective),
        Criteria::DefeatAmount => team_total(after, player, |s| s.destroyed_units) >= required(objective),
        Criteria::RescueAmount => team_total(after, player, |s| s.rescued) >= required(objective),
        Criteria::CaptureLabel => {
            let labeled: Vec<_> = after
                .buildings
                .values()
                .filter(|b| objective.matches_label(b.label))
                .collect();
            labeled.len() as u32 >= required(objective) && labeled.iter().all(|b| on_team(after, b.player))
        }
        Criteria::DestroyLabel => {
            let opposing = |board: &Board| {
                board
                    .buildings
                    .values()
                    .filter(|b| objective.matches_label(b.label) && !on_team(board, b.player))
                    .count()
            };
            opposing(before) > 0 && opposing(after) == 0
        }
        Criteria::DefeatLabel => {
            let opposing = |board: &Board| {
                all_units(board)
                    .into_iter()
                    .filter(|(_, u)| labeled_unit(u) && !u.player.is_neutral() && !on_team(board, u.player))
                    .count()
            };
            opposing(before) > 0 && opposing(after) == 0
        }
        Criteria::RescueLabel => {
            let labeled: Vec<_> = all_units(after)
                .into_iter()
                .filter(|(_, u)| labeled_unit(u))
                .collect();
            labeled.len() as u32 >= required(objective) && labeled.iter().all(|(_, u)| on_team(after, u.player))
        }
        Criteria::EscortAmount => {
            let escorted = all_units(after)
                .into_iter()
                .filter(|(v, u)| {
                    objective.vectors.contains(v)
                        && on_team(after, u.player)
                        && (objective.label.is_empty() || labeled_unit(u))
                })
                .count();
            escorted as u32 >= required(objective)
        }
        Criteria::EscortLabel => {
            let escorts: Vec<_> = all_units(after)
                .into_iter()
                .filter(|(_, u)| labeled_unit(u) && on_team(after, u.player))
                .collect();
            !escorts.is_empty() && escorts.iter().all(|(v, _)| objective.vectors.contains(v))
        }
    }
}
