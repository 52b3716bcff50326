// Action Resolver: intent + board -> outcome record, or a rejection.
//
// `validate` checks an intent against the current board and computes every
// number the outcome needs (damage, counter damage, charge, remaining fuel,
// capture progress, cost). It never touches the board. `apply_response`
// (in `apply.rs`) turns the outcome into the successor board. `resolve`
// composes the two, so a rejected intent leaves nothing behind.
//
// Two origins exist:
// - `Origin::Player` intents come from a client or an automated player and
//   must respect turn order, ownership, completion flags, funds and fog.
//   Effect-only intents (`Spawn`, `Message`) are refused.
// - `Origin::Effect` intents are synthesized by scripted effects. They skip
//   turn order, completion flags and prices, and see through fog, but still
//   obey board geometry (bounds, occupancy, terrain).
//
// Movement: the budget is `min(movement_radius, fuel)`. Units of other
// teams that the mover can see block the search. Units it cannot see do not
// block the search; walking into one stops the mover on the last free tile
// before it and marks it completed (an ambush). Ending on an own transport
// with a free compatible slot loads the unit.
//
// Combat: see `combat.rs`. The attacker strikes first; a surviving defender
// with a direct weapon in range strikes back. Both players' charge accrues
// from damage dealt and received.
//
// Capture: progress lives on the capturing unit and is reset when it moves.
// The building changes hands once progress reaches its capture resistance.
//
// Rescue: the first rescue places a claim on a neutral unit, a second rescue
// by the claimant converts it. A rescue by another player moves the claim.
//
// See also: `apply.rs`, `combat.rs`, `pathfinding.rs`, `turn.rs` (EndTurn),
// `game.rs` for the pipeline that calls `validate`.
//
// **Critical constraint: determinism.** `validate` is a pure function of
// its inputs. No randomness, no iteration over unordered collections.

use crate::apply::apply_response;
use crate::board::Board;
use crate::building::Building;
use crate::combat::{accrue_charge, building_strike, unit_strike};
use crate::config::{GameConfig, UnitInfo};
use crate::error::Rejection;
use crate::intent::Intent;
use crate::pathfinding::{enter_cost, path_cost, reachable};
use crate::response::ActionResponse;
use crate::turn;
use crate::types::{BuildingType, PlayerId, Skill, UnitType, Vector};
use crate::unit::{MAX_HEALTH, Unit};
use crate::vision::Vision;
use std::collections::BTreeSet;

/// Who is behind an intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Player,
    Effect,
}

/// Validate and apply in one step.
pub fn resolve(
    config: &GameConfig,
    board: &Board,
    intent: &Intent,
    player: PlayerId,
    origin: Origin,
) -> Result<(ActionResponse, Board), Rejection> {
    let response = validate(config, board, intent, player, origin)?;
    let next = apply_response(config, board, &response);
    Ok((response, next))
}

/// Check an intent and compute its outcome without changing the board.
pub fn validate(
    config: &GameConfig,
    board: &Board,
    intent: &Intent,
    player: PlayerId,
    origin: Origin,
) -> Result<ActionResponse, Rejection> {
    if board.ended {
        return Err(Rejection::GameOver);
    }
    match origin {
        Origin::Player => {
            if intent.is_effect_only() {
                return Err(Rejection::EffectOnly);
            }
            if !board.is_active(player) {
                return Err(Rejection::UnknownPlayer(player));
            }
            if board.current_player != player {
                return Err(Rejection::NotYourTurn(player));
            }
        }
        Origin::Effect => {
            if !player.is_neutral() && board.player(player).is_none_or(|p| p.eliminated) {
                return Err(Rejection::UnknownPlayer(player));
            }
        }
    }

    let ctx = Resolver {
        config,
        board,
        player,
        origin,
    };
    match intent {
        Intent::Move { from, to, path } => ctx.move_unit(*from, *to, path.as_deref()),
        Intent::AttackUnit { from, to } => ctx.attack_unit(*from, *to),
        Intent::AttackBuilding { from, to } => ctx.attack_building(*from, *to),
        Intent::Capture { from } => ctx.capture(*from),
        Intent::CreateUnit {
            from,
            to,
            unit_type,
        } => ctx.create_unit(*from, *to, *unit_type),
        Intent::CreateBuilding {
            from,
            building_type,
        } => ctx.create_building(*from, *building_type),
        Intent::DropUnit { from, index, to } => ctx.drop_unit(*from, *index, *to),
        Intent::Rescue { from, to } => ctx.rescue(*from, *to),
        Intent::Sabotage { from, to } => ctx.sabotage(*from, *to),
        Intent::Fold { from } => ctx.fold(*from, true),
        Intent::Unfold { from } => ctx.fold(*from, false),
        Intent::ToggleLightning { from, to } => ctx.toggle_lightning(*from, *to),
        Intent::ActivatePower { skill } => ctx.activate_power(*skill),
        Intent::Supply { from } => ctx.supply(*from),
        Intent::CompleteUnit { from } => {
            ctx.ready_unit(*from)?;
            Ok(ActionResponse::CompleteUnit { from: *from })
        }
        Intent::EndTurn => turn::end_turn(config, board, false).ok_or(Rejection::UnknownPlayer(player)),
        Intent::Spawn { units } => ctx.spawn(units),
        Intent::Message { message } => Ok(ActionResponse::Message {
            player,
            message: message.clone(),
        }),
    }
}

struct Resolver<'a> {
    config: &'a GameConfig,
    board: &'a Board,
    player: PlayerId,
    origin: Origin,
}

impl Resolver<'_> {
    fn is_player(&self) -> bool {
        self.origin == Origin::Player
    }

    /// The acting player's vision, or `None` when acting with full knowledge.
    fn vision(&self) -> Option<Vision> {
        (self.is_player() && self.board.fog).then(|| Vision::compute(self.config, self.board, self.player))
    }

    fn in_bounds(&self, v: Vector) -> Result<(), Rejection> {
        if self.board.contains(v) {
            Ok(())
        } else {
            Err(Rejection::OutOfBounds(v))
        }
    }

    /// An own unit that may still act this turn.
    fn ready_unit(&self, from: Vector) -> Result<&Unit, Rejection> {
        self.in_bounds(from)?;
        let unit = self.board.units.get(&from).ok_or(Rejection::NoUnit(from))?;
        if unit.player != self.player {
            return Err(Rejection::WrongOwner(from));
        }
        if self.is_player() && unit.completed {
            return Err(Rejection::AlreadyCompleted(from));
        }
        Ok(unit)
    }

    /// An own building that has not acted this turn.
    fn ready_building(&self, from: Vector) -> Result<&Building, Rejection> {
        self.in_bounds(from)?;
        let building = self
            .board
            .buildings
            .get(&from)
            .ok_or(Rejection::NoBuilding(from))?;
        if building.player != self.player {
            return Err(Rejection::WrongOwner(from));
        }
        if self.is_player() && building.completed {
            return Err(Rejection::AlreadyCompleted(from));
        }
        Ok(building)
    }

    fn funds(&self) -> u32 {
        self.board.player(self.player).map_or(0, |p| p.funds)
    }

    fn charge_of(&self, player: PlayerId) -> u32 {
        self.board.player(player).map_or(0, |p| p.charge)
    }

    fn require_funds(&self, cost: u32) -> Result<(), Rejection> {
        let funds = self.funds();
        if cost > funds {
            Err(Rejection::InsufficientFunds { cost, funds })
        } else {
            Ok(())
        }
    }

    fn adjacent(&self, from: Vector, to: Vector) -> Result<(), Rejection> {
        self.in_bounds(to)?;
        if from.is_adjacent(to) {
            Ok(())
        } else {
            Err(Rejection::OutOfRange(to))
        }
    }

    // -----------------------------------------------------------------------
    // Movement
    // -----------------------------------------------------------------------

    fn can_load(&self, transport: &Unit, passenger: &Unit, passenger_info: &UnitInfo) -> bool {
        transport.player == passenger.player
            && passenger.cargo.is_empty()
            && self.config.units.get(&transport.unit_type).is_some_and(|t| {
                t.can_carry(passenger_info.movement_type) && transport.cargo.len() < usize::from(t.capacity)
            })
    }

    fn move_unit(&self, from: Vector, to: Vector, path: Option<&[Vector]>) -> Result<ActionResponse, Rejection> {
        let unit = self.ready_unit(from)?;
        if self.is_player() && unit.moved {
            return Err(Rejection::AlreadyMoved(from));
        }
        let info = self.config.unit(unit.unit_type)?;
        if info.requires_fold && unit.folded {
            return Err(Rejection::Folded(from));
        }
        self.in_bounds(to)?;
        if to == from {
            return Err(Rejection::InvalidPath(to));
        }

        let board = self.board;
        let vision = self.vision();
        let seen = |v: Vector| vision.as_ref().is_none_or(|vis| vis.is_visible(v));
        let is_blocker = |v: Vector| {
            board
                .units
                .get(&v)
                .is_some_and(|other| !board.same_team(other.player, unit.player) || other.player.is_neutral())
        };
        let visible_blocker = |v: Vector| is_blocker(v) && seen(v);
        let movement_type = info.movement_type;
        let radius = u32::from(info.movement_radius);
        let budget = radius.min(u32::from(unit.fuel));

        let planned = match path {
            Some(steps) => {
                if steps.last() != Some(&to) || steps.contains(&from) {
                    return Err(Rejection::InvalidPath(to));
                }
                let cost = path_cost(self.config, board, from, steps, movement_type)
                    .ok_or(Rejection::InvalidPath(to))?;
                if steps.iter().any(|&v| visible_blocker(v) && v != to) {
                    return Err(Rejection::InvalidPath(to));
                }
                if cost > budget {
                    return Err(if cost <= radius {
                        Rejection::InsufficientFuel(to)
                    } else {
                        Rejection::OutOfRange(to)
                    });
                }
                steps.to_vec()
            }
            None => {
                let reach = reachable(self.config, board, from, movement_type, budget, |v| {
                    visible_blocker(v) && v != to
                });
                match reach.path_to(to) {
                    Some(steps) => steps,
                    None => {
                        let by_radius = reachable(self.config, board, from, movement_type, radius, |v| {
                            visible_blocker(v) && v != to
                        });
                        return Err(if budget < radius && by_radius.contains(to) {
                            Rejection::InsufficientFuel(to)
                        } else {
                            Rejection::OutOfRange(to)
                        });
                    }
                }
            }
        };

        // The destination itself: a visible unit there must be a transport
        // willing to take us.
        if let Some(occupant) = board.units.get(&to) {
            if seen(to) && !self.can_load(occupant, unit, info) {
                let is_transport = self
                    .config
                    .units
                    .get(&occupant.unit_type)
                    .is_some_and(|t| t.capacity > 0);
                return Err(if occupant.player == unit.player && is_transport {
                    Rejection::CannotLoad(to)
                } else {
                    Rejection::Occupied(to)
                });
            }
        }

        let mut walked = Vec::with_capacity(planned.len());
        let mut ambushed = false;
        for &step in &planned {
            if is_blocker(step) && !seen(step) {
                ambushed = true;
                break;
            }
            walked.push(step);
        }
        if ambushed {
            while walked.last().is_some_and(|v| board.units.contains_key(v)) {
                walked.pop();
            }
        }
        let end = walked.last().copied().unwrap_or(from);
        let spent = path_cost(self.config, board, from, &walked, movement_type).unwrap_or(0);
        let fuel = u32::from(unit.fuel).saturating_sub(spent) as u8;

        Ok(ActionResponse::Move {
            from,
            to: end,
            path: walked,
            fuel,
            completed: ambushed,
        })
    }

    // -----------------------------------------------------------------------
    // Combat
    // -----------------------------------------------------------------------

    /// Pick the most precise rejection when no weapon can fire.
    fn no_strike(&self, attacker: &Unit, info: &UnitInfo, from: Vector, to: Vector) -> Rejection {
        if info.requires_fold && !attacker.folded {
            return Rejection::Folded(from);
        }
        let distance = from.distance(to);
        let reaching: Vec<_> = info.weapons.iter().filter(|w| w.reaches(distance)).collect();
        if reaching.is_empty() {
            Rejection::OutOfRange(to)
        } else if attacker.moved && reaching.iter().all(|w| w.is_ranged()) {
            Rejection::AlreadyMoved(from)
        } else {
            Rejection::NoWeapon(from)
        }
    }

    fn attack_unit(&self, from: Vector, to: Vector) -> Result<ActionResponse, Rejection> {
        let attacker = self.ready_unit(from)?;
        self.in_bounds(to)?;
        let defender = self.board.units.get(&to).ok_or(Rejection::NoUnit(to))?;
        if !self.board.is_opponent(attacker.player, defender.player) {
            return Err(Rejection::IllegalTarget(to));
        }
        if self.vision().is_some_and(|vis| !vis.is_visible(to)) {
            return Err(Rejection::NotVisible(to));
        }
        let info = self.config.unit(attacker.unit_type)?;
        if !info.has_weapons() {
            return Err(Rejection::NoWeapon(from));
        }
        let strike = unit_strike(self.config, self.board, attacker, from, defender, to, false)
            .ok_or_else(|| self.no_strike(attacker, info, from, to))?;

        let mut a = attacker.clone();
        let mut b = defender.clone();
        a.spend_ammo(strike.weapon);
        a.completed = true;
        a.moved = true;
        b.health = b.health.saturating_sub(strike.damage);

        let mut counter_damage = 0;
        let mut has_counter_attack = false;
        if b.is_alive() {
            if let Some(counter) = unit_strike(self.config, self.board, &b, to, &a, from, true) {
                b.spend_ammo(counter.weapon);
                a.health = a.health.saturating_sub(counter.damage);
                counter_damage = counter.damage;
                has_counter_attack = true;
            }
        }

        let charge_a = accrue_charge(self.config, self.charge_of(a.player), strike.damage, counter_damage);
        let charge_b = accrue_charge(self.config, self.charge_of(b.player), counter_damage, strike.damage);
        Ok(ActionResponse::AttackUnit {
            from,
            to,
            player_a: a.player,
            player_b: b.player,
            unit_a: a.is_alive().then_some(a),
            unit_b: b.is_alive().then_some(b),
            has_counter_attack,
            charge_a,
            charge_b,
        })
    }

    fn attack_building(&self, from: Vector, to: Vector) -> Result<ActionResponse, Rejection> {
        let attacker = self.ready_unit(from)?;
        self.in_bounds(to)?;
        let building = self.board.buildings.get(&to).ok_or(Rejection::NoBuilding(to))?;
        if self.vision().is_some_and(|vis| !vis.is_visible(to)) {
            return Err(Rejection::NotVisible(to));
        }
        if !self.board.is_opponent(attacker.player, building.player) {
            return Err(Rejection::IllegalTarget(to));
        }
        let info = self.config.unit(attacker.unit_type)?;
        let strike = building_strike(self.config, self.board, attacker, from, to, building.health)
            .ok_or_else(|| self.no_strike(attacker, info, from, to))?;

        let mut a = attacker.clone();
        a.spend_ammo(strike.weapon);
        a.completed = true;
        a.moved = true;
        let mut b = building.clone();
        b.health = b.health.saturating_sub(strike.damage);
        let charge_a = accrue_charge(self.config, self.charge_of(a.player), strike.damage, 0);
        Ok(ActionResponse::AttackBuilding {
            from,
            to,
            player_a: a.player,
            unit_a: a,
            building: (b.health > 0).then_some(b),
            charge_a,
        })
    }

    // -----------------------------------------------------------------------
    // Capture, rescue, sabotage
    // -----------------------------------------------------------------------

    fn capture(&self, from: Vector) -> Result<ActionResponse, Rejection> {
        let unit = self.ready_unit(from)?;
        let info = self.config.unit(unit.unit_type)?;
        if info.capture_power == 0 {
            return Err(Rejection::Incapable(from));
        }
        let building = self.board.buildings.get(&from).ok_or(Rejection::NoBuilding(from))?;
        if !building.player.is_neutral() && self.board.same_team(building.player, unit.player) {
            return Err(Rejection::IllegalTarget(from));
        }
        let resistance = self
            .config
            .building(building.building_type)?
            .capture_resistance
            .ok_or(Rejection::IllegalTarget(from))?;

        let power = (u32::from(info.capture_power) * u32::from(unit.health) / u32::from(MAX_HEALTH)).max(1);
        let progress = u32::from(unit.capture_progress) + power;
        if progress >= u32::from(resistance) {
            let captured = Building {
                player: unit.player,
                completed: true,
                ..building.clone()
            };
            Ok(ActionResponse::Capture {
                from,
                player: unit.player,
                progress: None,
                building: Some(captured),
            })
        } else {
            Ok(ActionResponse::Capture {
                from,
                player: unit.player,
                progress: Some(progress as u8),
                building: None,
            })
        }
    }

    fn rescue(&self, from: Vector, to: Vector) -> Result<ActionResponse, Rejection> {
        let unit = self.ready_unit(from)?;
        if !self.config.unit(unit.unit_type)?.can_rescue {
            return Err(Rejection::Incapable(from));
        }
        self.adjacent(from, to)?;
        let target = self.board.units.get(&to).ok_or(Rejection::NoUnit(to))?;
        if !target.player.is_neutral() {
            return Err(Rejection::IllegalTarget(to));
        }
        Ok(ActionResponse::Rescue {
            from,
            to,
            player: unit.player,
            completed: target.rescuer == Some(unit.player),
        })
    }

    fn sabotage(&self, from: Vector, to: Vector) -> Result<ActionResponse, Rejection> {
        let unit = self.ready_unit(from)?;
        if !self.config.unit(unit.unit_type)?.can_sabotage {
            return Err(Rejection::Incapable(from));
        }
        self.adjacent(from, to)?;
        let target = self.board.units.get(&to).ok_or(Rejection::NoUnit(to))?;
        if !self.board.is_opponent(unit.player, target.player) {
            return Err(Rejection::IllegalTarget(to));
        }
        let mut sabotaged = target.clone();
        sabotaged.health = sabotaged.health.saturating_sub(self.config.sabotage_damage).max(1);
        Ok(ActionResponse::Sabotage {
            from,
            to,
            unit: sabotaged,
        })
    }

    // -----------------------------------------------------------------------
    // Production and construction
    // -----------------------------------------------------------------------

    fn create_unit(&self, from: Vector, to: Vector, unit_type: UnitType) -> Result<ActionResponse, Rejection> {
        let info = self.config.unit(unit_type)?;
        let cost = if self.is_player() {
            let building = self.ready_building(from)?;
            let produces = &self.config.building(building.building_type)?.produces;
            if !produces.contains(&unit_type) {
                return Err(Rejection::Incapable(from));
            }
            self.in_bounds(to)?;
            if to != from && !from.is_adjacent(to) {
                return Err(Rejection::OutOfRange(to));
            }
            self.require_funds(info.cost)?;
            info.cost
        } else {
            0
        };
        self.in_bounds(to)?;
        if !self.board.is_free(to) {
            return Err(Rejection::Occupied(to));
        }
        if enter_cost(self.config, self.board, to, info.movement_type).is_none() {
            return Err(Rejection::IllegalTarget(to));
        }
        let mut unit = Unit::new(unit_type, self.player, info);
        unit.completed = true;
        unit.moved = true;
        Ok(ActionResponse::CreateUnit { from, to, unit, cost })
    }

    fn create_building(&self, from: Vector, building_type: BuildingType) -> Result<ActionResponse, Rejection> {
        let unit = self.ready_unit(from)?;
        if !self.config.unit(unit.unit_type)?.builds.contains(&building_type) {
            return Err(Rejection::Incapable(from));
        }
        if self.board.buildings.contains_key(&from) {
            return Err(Rejection::Occupied(from));
        }
        let price = self
            .config
            .building(building_type)?
            .cost
            .ok_or(Rejection::Incapable(from))?;
        let cost = if self.is_player() {
            self.require_funds(price)?;
            price
        } else {
            0
        };
        let mut building = Building::new(building_type, unit.player);
        building.completed = true;
        Ok(ActionResponse::CreateBuilding { from, building, cost })
    }

    // -----------------------------------------------------------------------
    // Transport, fold, supply
    // -----------------------------------------------------------------------

    fn drop_unit(&self, from: Vector, index: usize, to: Vector) -> Result<ActionResponse, Rejection> {
        let transport = self.ready_unit(from)?;
        let passenger = transport.cargo.get(index).ok_or(Rejection::NoCargo(from))?;
        self.adjacent(from, to)?;
        if !self.board.is_free(to) {
            return Err(Rejection::Occupied(to));
        }
        let info = self.config.unit(passenger.unit_type)?;
        if enter_cost(self.config, self.board, to, info.movement_type).is_none() {
            return Err(Rejection::IllegalTarget(to));
        }
        let completed = passenger.completed || (passenger.loaded_this_turn && !info.can_act_after_drop);
        Ok(ActionResponse::DropUnit {
            from,
            index,
            to,
            completed,
        })
    }

    fn fold(&self, from: Vector, fold: bool) -> Result<ActionResponse, Rejection> {
        let unit = self.ready_unit(from)?;
        if !self.config.unit(unit.unit_type)?.requires_fold {
            return Err(Rejection::Incapable(from));
        }
        if unit.folded == fold {
            return Err(Rejection::Folded(from));
        }
        Ok(if fold {
            ActionResponse::Fold { from }
        } else {
            ActionResponse::Unfold { from }
        })
    }

    fn supply(&self, from: Vector) -> Result<ActionResponse, Rejection> {
        let unit = self.ready_unit(from)?;
        if !self.config.unit(unit.unit_type)?.can_supply {
            return Err(Rejection::Incapable(from));
        }
        Ok(ActionResponse::Supply {
            from,
            player: unit.player,
        })
    }

    // -----------------------------------------------------------------------
    // Buildings and powers
    // -----------------------------------------------------------------------

    fn toggle_lightning(&self, from: Vector, to: Vector) -> Result<ActionResponse, Rejection> {
        let building = self.ready_building(from)?;
        if !self.config.building(building.building_type)?.controls_lightning {
            return Err(Rejection::Incapable(from));
        }
        self.in_bounds(to)?;
        if from.distance(to) > u32::from(self.config.lightning_radius) {
            return Err(Rejection::OutOfRange(to));
        }
        if self.board.units.contains_key(&to) {
            return Err(Rejection::Occupied(to));
        }
        if self.board.buildings.contains_key(&to) {
            return Err(Rejection::IllegalTarget(to));
        }
        Ok(ActionResponse::ToggleLightning {
            from,
            to,
            player: self.player,
        })
    }

    fn activate_power(&self, skill: Skill) -> Result<ActionResponse, Rejection> {
        let player = self
            .board
            .player(self.player)
            .ok_or(Rejection::UnknownPlayer(self.player))?;
        if !player.skills.contains(&skill) {
            return Err(Rejection::UnknownSkill(self.player, skill));
        }
        if player.has_power(skill) {
            return Err(Rejection::PowerActive(skill));
        }
        let cost = self
            .config
            .skills
            .get(&skill)
            .ok_or(Rejection::UnknownSkill(self.player, skill))?
            .charge_cost;
        if player.charge < cost {
            return Err(Rejection::InsufficientCharge {
                cost,
                charge: player.charge,
            });
        }
        Ok(ActionResponse::ActivatePower {
            player: self.player,
            skill,
        })
    }

    // -----------------------------------------------------------------------
    // Effect-only
    // -----------------------------------------------------------------------

    fn spawn(&self, units: &[(Vector, Unit)]) -> Result<ActionResponse, Rejection> {
        let mut taken = BTreeSet::new();
        for (v, unit) in units {
            let v = *v;
            self.in_bounds(v)?;
            if !self.board.is_free(v) || !taken.insert(v) {
                return Err(Rejection::Occupied(v));
            }
            if !unit.player.is_neutral() && !self.board.is_active(unit.player) {
                return Err(Rejection::UnknownPlayer(unit.player));
            }
            if !unit.is_alive() || unit.health > MAX_HEALTH {
                return Err(Rejection::IllegalTarget(v));
            }
            let info = self.config.unit(unit.unit_type)?;
            if enter_cost(self.config, self.board, v, info.movement_type).is_none() {
                return Err(Rejection::IllegalTarget(v));
            }
        }
        Ok(ActionResponse::Spawn {
            units: units.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Player;
    use crate::types::{Size, TeamId, TileType};

    const P1: PlayerId = PlayerId(1);
    const P2: PlayerId = PlayerId(2);

    fn unit(config: &GameConfig, unit_type: UnitType, player: PlayerId) -> Unit {
        Unit::new(unit_type, player, &config.units[&unit_type])
    }

    fn duel_board() -> Board {
        Board::new(Size::new(8, 8))
            .with_player(Player::new(P1, TeamId(1), 1000))
            .with_player(Player::new(P2, TeamId(2), 1000))
    }

    fn ok(config: &GameConfig, board: &Board, intent: Intent) -> (ActionResponse, Board) {
        resolve(config, board, &intent, board.current_player, Origin::Player).unwrap()
    }

    fn err(config: &GameConfig, board: &Board, intent: Intent) -> Rejection {
        resolve(config, board, &intent, board.current_player, Origin::Player).unwrap_err()
    }

    #[test]
    fn move_spends_fuel_and_marks_moved() {
        let config = GameConfig::default();
        let from = Vector::new(1, 1);
        let board = duel_board().with_unit(from, unit(&config, UnitType::Infantry, P1));
        let (response, next) = ok(
            &config,
            &board,
            Intent::Move {
                from,
                to: Vector::new(1, 4),
                path: None,
            },
        );
        let ActionResponse::Move { to, path, fuel, completed, .. } = response else {
            panic!("expected a move, got {response:?}");
        };
        assert_eq!(to, Vector::new(1, 4));
        assert_eq!(path.len(), 3);
        assert_eq!(fuel, 37);
        assert!(!completed);
        let moved = &next.units[&Vector::new(1, 4)];
        assert!(moved.moved);
        assert!(!next.units.contains_key(&from));
        // The original board is untouched.
        assert!(board.units.contains_key(&from));
    }

    #[test]
    fn move_rejections() {
        let config = GameConfig::default();
        let from = Vector::new(1, 1);
        let board = duel_board()
            .with_unit(from, unit(&config, UnitType::Infantry, P1))
            .with_unit(Vector::new(1, 2), unit(&config, UnitType::Infantry, P2))
            .with_unit(Vector::new(6, 6), unit(&config, UnitType::Infantry, P2));
        assert_eq!(
            err(&config, &board, Intent::Move { from, to: Vector::new(7, 7), path: None }),
            Rejection::OutOfRange(Vector::new(7, 7))
        );
        assert_eq!(
            err(&config, &board, Intent::Move { from, to: Vector::new(1, 2), path: None }),
            Rejection::Occupied(Vector::new(1, 2))
        );
        assert_eq!(
            err(&config, &board, Intent::Move { from: Vector::new(6, 6), to: Vector::new(6, 5), path: None }),
            Rejection::WrongOwner(Vector::new(6, 6))
        );
        assert_eq!(
            err(&config, &board, Intent::Move { from, to: Vector::new(9, 1), path: None }),
            Rejection::OutOfBounds(Vector::new(9, 1))
        );
        assert_eq!(
            err(
                &config,
                &board,
                Intent::Move {
                    from,
                    to: Vector::new(1, 3),
                    path: Some(vec![Vector::new(1, 3)])
                }
            ),
            Rejection::InvalidPath(Vector::new(1, 3))
        );
    }

    #[test]
    fn hidden_blocker_springs_an_ambush() {
        let config = GameConfig::default();
        let from = Vector::new(0, 0);
        // Jeep vision 3 from (0,0) does not reach (5,0).
        let board = duel_board()
            .with_tile(Vector::new(1, 0), TileType::Road)
            .with_tile(Vector::new(2, 0), TileType::Road)
            .with_tile(Vector::new(3, 0), TileType::Road)
            .with_tile(Vector::new(4, 0), TileType::Road)
            .with_tile(Vector::new(5, 0), TileType::Road)
            .with_tile(Vector::new(6, 0), TileType::Road)
            .with_unit(from, unit(&config, UnitType::Jeep, P1))
            .with_unit(Vector::new(5, 0), unit(&config, UnitType::Infantry, P2));
        let path: Vec<Vector> = (1..=6).map(|x| Vector::new(x, 0)).collect();
        let (response, next) = ok(
            &config,
            &board,
            Intent::Move {
                from,
                to: Vector::new(6, 0),
                path: Some(path),
            },
        );
        let ActionResponse::Move { to, completed, path, .. } = response else {
            panic!("expected a move");
        };
        assert_eq!(to, Vector::new(4, 0));
        assert_eq!(path.len(), 4);
        assert!(completed);
        assert!(next.units[&Vector::new(4, 0)].completed);
    }

    #[test]
    fn fuel_limits_movement() {
        let config = GameConfig::default();
        let from = Vector::new(0, 0);
        let mut infantry = unit(&config, UnitType::Infantry, P1);
        infantry.fuel = 1;
        let board = duel_board().with_unit(from, infantry);
        assert_eq!(
            err(&config, &board, Intent::Move { from, to: Vector::new(0, 2), path: None }),
            Rejection::InsufficientFuel(Vector::new(0, 2))
        );
    }

    #[test]
    fn lethal_attack_without_counter() {
        let config = GameConfig::default();
        let from = Vector::new(2, 2);
        let to = Vector::new(2, 3);
        let board = duel_board()
            .with_unit(from, unit(&config, UnitType::Infantry, P1))
            .with_unit(to, unit(&config, UnitType::Artillery, P2).with_health(1));
        let (response, next) = ok(&config, &board, Intent::AttackUnit { from, to });
        let ActionResponse::AttackUnit {
            unit_a,
            unit_b,
            has_counter_attack,
            charge_a,
            charge_b,
            ..
        } = response
        else {
            panic!("expected an attack");
        };
        assert!(!has_counter_attack);
        assert!(unit_b.is_none());
        assert_eq!(unit_a.map(|u| u.health), Some(100));
        assert_eq!(charge_a, 2);
        assert_eq!(charge_b, 1);
        assert!(!next.units.contains_key(&to));
        assert_eq!(next.players[&P1].stats.destroyed_units, 1);
        assert_eq!(next.players[&P2].stats.lost_units, 1);
    }

    #[test]
    fn survivors_counter_attack() {
        let config = GameConfig::default();
        let from = Vector::new(2, 2);
        let to = Vector::new(3, 2);
        let board = duel_board()
            .with_unit(from, unit(&config, UnitType::Infantry, P1))
            .with_unit(to, unit(&config, UnitType::Infantry, P2));
        let (response, _) = ok(&config, &board, Intent::AttackUnit { from, to });
        let ActionResponse::AttackUnit {
            unit_a,
            unit_b,
            has_counter_attack,
            charge_a,
            charge_b,
            ..
        } = response
        else {
            panic!("expected an attack");
        };
        assert!(has_counter_attack);
        // Plain cover 10%: 55 -> 49. Counter at 51 health: 55*51/100 = 28 -> 25.
        assert_eq!(unit_b.as_ref().map(|u| u.health), Some(51));
        assert_eq!(unit_a.as_ref().map(|u| u.health), Some(75));
        assert_eq!(charge_a, 49 * 2 + 25);
        assert_eq!(charge_b, 25 * 2 + 49);
        assert!(unit_a.is_some_and(|u| u.completed));
    }

    #[test]
    fn attacks_need_an_opponent_in_view() {
        let config = GameConfig::default();
        let from = Vector::new(0, 0);
        let board = duel_board()
            .with_unit(from, unit(&config, UnitType::Artillery, P1))
            .with_unit(Vector::new(0, 1), unit(&config, UnitType::Infantry, P1))
            .with_unit(Vector::new(0, 3), unit(&config, UnitType::Infantry, P2));
        assert_eq!(
            err(&config, &board, Intent::AttackUnit { from, to: Vector::new(0, 1) }),
            Rejection::IllegalTarget(Vector::new(0, 1))
        );
        // Artillery vision 2 reaches (0,2) but not (0,3); the infantry at (0,1) sees it.
        assert!(resolve(
            &config,
            &board,
            &Intent::AttackUnit { from, to: Vector::new(0, 3) },
            P1,
            Origin::Player
        )
        .is_ok());
        let lonely = duel_board()
            .with_unit(from, unit(&config, UnitType::Artillery, P1))
            .with_unit(Vector::new(3, 0), unit(&config, UnitType::Infantry, P2));
        assert_eq!(
            err(&config, &lonely, Intent::AttackUnit { from, to: Vector::new(3, 0) }),
            Rejection::NotVisible(Vector::new(3, 0))
        );
    }

    #[test]
    fn capture_takes_two_turns() {
        let config = GameConfig::default();
        let at = Vector::new(3, 3);
        let board = duel_board()
            .with_unit(at, unit(&config, UnitType::Infantry, P1))
            .with_building(at, Building::new(BuildingType::Barracks, PlayerId::NEUTRAL));
        let (first, next) = ok(&config, &board, Intent::Capture { from: at });
        assert_eq!(
            first,
            ActionResponse::Capture {
                from: at,
                player: P1,
                progress: Some(10),
                building: None
            }
        );
        assert_eq!(next.buildings[&at].player, PlayerId::NEUTRAL);
        assert_eq!(
            err(&config, &next, Intent::Capture { from: at }),
            Rejection::AlreadyCompleted(at)
        );

        let mut refreshed = next.clone();
        if let Some(u) = refreshed.units.get_mut(&at) {
            u.refresh();
        }
        let (second, done) = ok(&config, &refreshed, Intent::Capture { from: at });
        assert!(matches!(second, ActionResponse::Capture { building: Some(_), .. }));
        assert_eq!(done.buildings[&at].player, P1);
        assert_eq!(done.players[&P1].stats.captured, 1);
    }

    #[test]
    fn production_costs_funds() {
        let config = GameConfig::default();
        let at = Vector::new(4, 4);
        let board = duel_board().with_building(at, Building::new(BuildingType::Factory, P1));
        let (response, next) = ok(
            &config,
            &board,
            Intent::CreateUnit {
                from: at,
                to: at,
                unit_type: UnitType::Tank,
            },
        );
        assert!(matches!(response, ActionResponse::CreateUnit { cost: 700, .. }));
        assert_eq!(next.players[&P1].funds, 300);
        assert!(next.units[&at].completed);
        assert!(next.buildings[&at].completed);
        assert_eq!(
            err(
                &config,
                &next,
                Intent::CreateUnit {
                    from: at,
                    to: Vector::new(4, 5),
                    unit_type: UnitType::Jeep
                }
            ),
            Rejection::AlreadyCompleted(at)
        );
        assert_eq!(
            err(
                &config,
                &board,
                Intent::CreateUnit {
                    from: at,
                    to: at,
                    unit_type: UnitType::Infantry
                }
            ),
            Rejection::Incapable(at)
        );
    }

    #[test]
    fn poor_players_cannot_build() {
        let config = GameConfig::default();
        let at = Vector::new(4, 4);
        let mut board = duel_board().with_building(at, Building::new(BuildingType::Airfield, P1));
        if let Some(p) = board.players.get_mut(&P1) {
            p.funds = 799;
        }
        assert_eq!(
            err(
                &config,
                &board,
                Intent::CreateUnit {
                    from: at,
                    to: at,
                    unit_type: UnitType::Helicopter
                }
            ),
            Rejection::InsufficientFunds { cost: 800, funds: 799 }
        );
    }

    #[test]
    fn load_and_drop() {
        let config = GameConfig::default();
        let jeep_at = Vector::new(2, 2);
        let board = duel_board()
            .with_unit(jeep_at, unit(&config, UnitType::Jeep, P1))
            .with_unit(Vector::new(2, 4), unit(&config, UnitType::Pioneer, P1));
        let (_, loaded) = ok(
            &config,
            &board,
            Intent::Move {
                from: Vector::new(2, 4),
                to: jeep_at,
                path: None,
            },
        );
        assert_eq!(loaded.units[&jeep_at].cargo.len(), 1);
        assert!(!loaded.units.contains_key(&Vector::new(2, 4)));

        let (drop, dropped) = ok(
            &config,
            &loaded,
            Intent::DropUnit {
                from: jeep_at,
                index: 0,
                to: Vector::new(3, 2),
            },
        );
        assert!(matches!(drop, ActionResponse::DropUnit { completed: true, .. }));
        assert!(dropped.units[&Vector::new(3, 2)].completed);
        assert!(dropped.units[&jeep_at].cargo.is_empty());
    }

    #[test]
    fn infantry_may_act_after_drop() {
        let config = GameConfig::default();
        let jeep_at = Vector::new(2, 2);
        let board = duel_board()
            .with_unit(jeep_at, unit(&config, UnitType::Jeep, P1))
            .with_unit(Vector::new(2, 3), unit(&config, UnitType::Infantry, P1));
        let (_, loaded) = ok(
            &config,
            &board,
            Intent::Move {
                from: Vector::new(2, 3),
                to: jeep_at,
                path: None,
            },
        );
        let (drop, _) = ok(
            &config,
            &loaded,
            Intent::DropUnit {
                from: jeep_at,
                index: 0,
                to: Vector::new(1, 2),
            },
        );
        // Boarding completes the passenger, and that flag survives the drop.
        assert!(matches!(drop, ActionResponse::DropUnit { completed: true, .. }));

        let mut carried = unit(&config, UnitType::Infantry, P1);
        carried.loaded_this_turn = true;
        let fresh = duel_board().with_unit(jeep_at, unit(&config, UnitType::Jeep, P1).with_cargo(carried));
        let (drop, _) = ok(
            &config,
            &fresh,
            Intent::DropUnit {
                from: jeep_at,
                index: 0,
                to: Vector::new(1, 2),
            },
        );
        assert!(matches!(drop, ActionResponse::DropUnit { completed: false, .. }));
    }

    #[test]
    fn full_transport_refuses_passengers() {
        let config = GameConfig::default();
        let jeep_at = Vector::new(2, 2);
        let rider = unit(&config, UnitType::Pioneer, P1);
        let board = duel_board()
            .with_unit(jeep_at, unit(&config, UnitType::Jeep, P1).with_cargo(rider))
            .with_unit(Vector::new(2, 3), unit(&config, UnitType::Infantry, P1));
        assert_eq!(
            err(
                &config,
                &board,
                Intent::Move {
                    from: Vector::new(2, 3),
                    to: jeep_at,
                    path: None
                }
            ),
            Rejection::CannotLoad(jeep_at)
        );
    }

    #[test]
    fn rescue_claim_then_convert() {
        let config = GameConfig::default();
        let from = Vector::new(1, 1);
        let to = Vector::new(1, 2);
        let board = duel_board()
            .with_unit(from, unit(&config, UnitType::Pioneer, P1))
            .with_unit(to, unit(&config, UnitType::Tank, PlayerId::NEUTRAL));
        let (first, claimed) = ok(&config, &board, Intent::Rescue { from, to });
        assert!(matches!(first, ActionResponse::Rescue { completed: false, .. }));
        assert_eq!(claimed.units[&to].rescuer, Some(P1));

        let mut again = claimed.clone();
        if let Some(u) = again.units.get_mut(&from) {
            u.refresh();
        }
        let (second, rescued) = ok(&config, &again, Intent::Rescue { from, to });
        assert!(matches!(second, ActionResponse::Rescue { completed: true, .. }));
        assert_eq!(rescued.units[&to].player, P1);
        assert_eq!(rescued.players[&P1].stats.rescued, 1);
    }

    #[test]
    fn sabotage_never_kills() {
        let config = GameConfig::default();
        let from = Vector::new(1, 1);
        let to = Vector::new(2, 1);
        let board = duel_board()
            .with_unit(from, unit(&config, UnitType::Saboteur, P1))
            .with_unit(to, unit(&config, UnitType::Tank, P2).with_health(20));
        let (response, next) = ok(&config, &board, Intent::Sabotage { from, to });
        assert!(matches!(response, ActionResponse::Sabotage { .. }));
        assert_eq!(next.units[&to].health, 1);
    }

    #[test]
    fn snipers_fold_before_firing() {
        let config = GameConfig::default();
        let from = Vector::new(1, 1);
        let to = Vector::new(1, 3);
        let board = duel_board()
            .with_unit(from, unit(&config, UnitType::Sniper, P1))
            .with_unit(to, unit(&config, UnitType::Infantry, P2));
        assert_eq!(
            err(&config, &board, Intent::AttackUnit { from, to }),
            Rejection::Folded(from)
        );
        let (_, folded) = ok(&config, &board, Intent::Fold { from });
        assert!(folded.units[&from].folded);
        assert_eq!(
            err(&config, &folded, Intent::Move { from, to: Vector::new(2, 1), path: None }),
            Rejection::Folded(from)
        );
        let (attack, _) = ok(&config, &folded, Intent::AttackUnit { from, to });
        assert!(matches!(attack, ActionResponse::AttackUnit { has_counter_attack: false, .. }));
    }

    #[test]
    fn lightning_toggles_within_radius() {
        let config = GameConfig::default();
        let radar = Vector::new(3, 3);
        let board = duel_board().with_building(radar, Building::new(BuildingType::Radar, P1));
        let (_, next) = ok(&config, &board, Intent::ToggleLightning { from: radar, to: Vector::new(3, 5) });
        assert!(next.lightning.contains(&Vector::new(3, 5)));
        assert_eq!(
            err(&config, &board, Intent::ToggleLightning { from: radar, to: Vector::new(7, 7) }),
            Rejection::OutOfRange(Vector::new(7, 7))
        );
    }

    #[test]
    fn powers_cost_charge() {
        let config = GameConfig::default();
        let board = duel_board().with_unit(Vector::new(1, 1), unit(&config, UnitType::Tank, P1).with_health(50));
        assert_eq!(
            err(&config, &board, Intent::ActivatePower { skill: Skill::FieldRepair }),
            Rejection::UnknownSkill(P1, Skill::FieldRepair)
        );
        let board = board.with_player(
            Player::new(P1, TeamId(1), 1000)
                .with_skill(Skill::FieldRepair)
                .with_charge(250),
        );
        let (_, next) = ok(&config, &board, Intent::ActivatePower { skill: Skill::FieldRepair });
        assert_eq!(next.players[&P1].charge, 50);
        assert_eq!(next.units[&Vector::new(1, 1)].health, 70);
        assert_eq!(
            err(&config, &next, Intent::ActivatePower { skill: Skill::FieldRepair }),
            Rejection::PowerActive(Skill::FieldRepair)
        );
    }

    #[test]
    fn turn_order_and_effect_only_intents() {
        let config = GameConfig::default();
        let board = duel_board();
        assert_eq!(
            resolve(&config, &board, &Intent::EndTurn, P2, Origin::Player).unwrap_err(),
            Rejection::NotYourTurn(P2)
        );
        assert_eq!(
            err(&config, &board, Intent::Message { message: "hi".into() }),
            Rejection::EffectOnly
        );
        assert!(resolve(&config, &board, &Intent::Message { message: "hi".into() }, P2, Origin::Effect).is_ok());
    }

    #[test]
    fn ended_games_reject_everything() {
        let config = GameConfig::default();
        let mut board = duel_board();
        board.ended = true;
        assert_eq!(err(&config, &board, Intent::EndTurn), Rejection::GameOver);
    }

    #[test]
    fn resolution_is_deterministic() {
        let config = GameConfig::default();
        let from = Vector::new(2, 2);
        let to = Vector::new(3, 2);
        let board = duel_board()
            .with_unit(from, unit(&config, UnitType::Tank, P1))
            .with_unit(to, unit(&config, UnitType::Tank, P2));
        let intent = Intent::AttackUnit { from, to };
        let a = resolve(&config, &board, &intent, P1, Origin::Player).unwrap();
        let b = resolve(&config, &board, &intent, P1, Origin::Player).unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a.1).unwrap(), serde_json::to_string(&b.1).unwrap());
    }

    #[test]
    fn effects_spawn_on_free_tiles_only() {
        let config = GameConfig::default();
        let board = duel_board().with_unit(Vector::new(1, 1), unit(&config, UnitType::Tank, P1));
        let spawn = |v: Vector| Intent::Spawn {
            units: vec![(v, unit(&config, UnitType::Infantry, P2))],
        };
        assert!(resolve(&config, &board, &spawn(Vector::new(2, 2)), P2, Origin::Effect).is_ok());
        assert_eq!(
            resolve(&config, &board, &spawn(Vector::new(1, 1)), P2, Origin::Effect).unwrap_err(),
            Rejection::Occupied(Vector::new(1, 1))
        );
    }
}
