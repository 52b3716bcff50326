// Damage arithmetic.
//
// All values are integer health points (0..=100):
//
//   damage = base * attacker_health / 100
//   damage = damage * (100 + attack_bonus) / 100       (active powers)
//   damage = damage * (100 - cover) / 100              (ground targets only)
//   damage = clamp(damage, 1, target_health)
//
// A unit picks the weapon with the highest resulting damage among those with
// ammunition, range and a non-zero damage column; ties go to the lower
// weapon index. Ranged weapons cannot fire after moving and never
// counter-attack. Units that must fold can only fire while folded.
//
// See also: `resolver.rs` for the attack sequence (strike, counter, charge),
// `config.rs` for weapon tables.

use crate::board::Board;
use crate::config::{GameConfig, Weapon};
use crate::types::{PlayerId, TargetClass, Vector};
use crate::unit::Unit;

/// The chosen weapon and the damage it deals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Strike {
    pub weapon: usize,
    pub damage: u8,
}

/// Percentage damage bonus from `player`'s active powers.
pub fn attack_bonus(config: &GameConfig, board: &Board, player: PlayerId) -> u32 {
    board.player(player).map_or(0, |p| {
        p.active_powers
            .iter()
            .filter_map(|skill| config.skills.get(skill))
            .map(|info| u32::from(info.attack_bonus))
            .sum()
    })
}

fn raw_damage(weapon: &Weapon, class: TargetClass, attacker_health: u8, bonus: u32, cover: u32) -> u32 {
    let base = u32::from(weapon.damage_against(class));
    if base == 0 {
        return 0;
    }
    let mut damage = base * u32::from(attacker_health) / 100;
    damage = damage * (100 + bonus) / 100;
    if !matches!(class, TargetClass::Air | TargetClass::Building) {
        damage = damage * (100 - cover.min(100)) / 100;
    }
    damage.max(1)
}

fn best_strike(
    config: &GameConfig,
    board: &Board,
    attacker: &Unit,
    distance: u32,
    class: TargetClass,
    cover: u32,
    target_health: u8,
    counter: bool,
) -> Option<Strike> {
    let info = config.units.get(&attacker.unit_type)?;
    if info.requires_fold && !attacker.folded {
        return None;
    }
    let bonus = attack_bonus(config, board, attacker.player);
    let mut best: Option<Strike> = None;
    for (index, weapon) in info.weapons.iter().enumerate() {
        if !attacker.has_ammo(index) || !weapon.reaches(distance) {
            continue;
        }
        if weapon.is_ranged() && (counter || attacker.moved) {
            continue;
        }
        let damage = raw_damage(weapon, class, attacker.health, bonus, cover);
        if damage == 0 {
            continue;
        }
        let damage = damage.min(u32::from(target_health)) as u8;
        if best.is_none_or(|b| damage > b.damage) {
            best = Some(Strike {
                weapon: index,
                damage,
            });
        }
    }
    best
}

/// Strike from `attacker` at `from` against `defender` at `to`. With
/// `counter` set, only direct weapons qualify.
pub fn unit_strike(
    config: &GameConfig,
    board: &Board,
    attacker: &Unit,
    from: Vector,
    defender: &Unit,
    to: Vector,
    counter: bool,
) -> Option<Strike> {
    let class = config
        .units
        .get(&defender.unit_type)?
        .movement_type
        .target_class();
    let cover = board.tile(to).map_or(0, |t| config.cover(t));
    best_strike(
        config,
        board,
        attacker,
        from.distance(to),
        class,
        cover,
        defender.health,
        counter,
    )
}

/// Strike from `attacker` at `from` against a building with `health` at `to`.
pub fn building_strike(
    config: &GameConfig,
    board: &Board,
    attacker: &Unit,
    from: Vector,
    to: Vector,
    health: u8,
) -> Option<Strike> {
    best_strike(
        config,
        board,
        attacker,
        from.distance(to),
        TargetClass::Building,
        0,
        health,
        false,
    )
}

/// Charge after dealing and receiving damage, capped at `max_charge`.
pub fn accrue_charge(config: &GameConfig, charge: u32, dealt: u8, received: u8) -> u32 {
    let gained = u32::from(dealt) * config.charge_dealt_rate
        + u32::from(received) * config.charge_received_rate;
    config.cap_charge(charge.saturating_add(gained))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Player;
    use crate::types::{Size, Skill, TeamId, TileType, UnitType};

    fn unit(config: &GameConfig, unit_type: UnitType, player: u8) -> Unit {
        Unit::new(unit_type, PlayerId(player), &config.units[&unit_type])
    }

    fn board() -> Board {
        Board::new(Size::new(6, 6))
            .with_player(Player::new(PlayerId(1), TeamId(1), 0))
            .with_player(Player::new(PlayerId(2), TeamId(2), 0))
    }

    #[test]
    fn cover_reduces_damage() {
        let config = GameConfig::default();
        let tank = unit(&config, UnitType::Tank, 1);
        let infantry = unit(&config, UnitType::Infantry, 2);
        let from = Vector::new(1, 1);
        let to = Vector::new(2, 1);
        let open = board().with_tile(to, TileType::Road);
        let wooded = board().with_tile(to, TileType::Forest);
        let a = unit_strike(&config, &open, &tank, from, &infantry, to, false).unwrap();
        let b = unit_strike(&config, &wooded, &tank, from, &infantry, to, false).unwrap();
        // Road: machine gun (45) beats cannon (40).
        assert_eq!(a, Strike { weapon: 1, damage: 45 });
        // Forest: 45 * 70 / 100.
        assert_eq!(b, Strike { weapon: 1, damage: 31 });
    }

    #[test]
    fn wounded_attackers_hit_softer() {
        let config = GameConfig::default();
        let tank = unit(&config, UnitType::Tank, 1).with_health(50);
        let target = unit(&config, UnitType::Tank, 2);
        let to = Vector::new(2, 1);
        let b = board().with_tile(to, TileType::Road);
        let strike = unit_strike(&config, &b, &tank, Vector::new(1, 1), &target, to, false).unwrap();
        assert_eq!(strike, Strike { weapon: 0, damage: 30 });
    }

    #[test]
    fn damage_never_exceeds_remaining_health() {
        let config = GameConfig::default();
        let tank = unit(&config, UnitType::Tank, 1);
        let target = unit(&config, UnitType::Infantry, 2).with_health(1);
        let strike =
            unit_strike(&config, &board(), &tank, Vector::new(1, 1), &target, Vector::new(1, 2), false).unwrap();
        assert_eq!(strike.damage, 1);
    }

    #[test]
    fn ranged_weapons_do_not_counter_or_fire_after_moving() {
        let config = GameConfig::default();
        let mut artillery = unit(&config, UnitType::Artillery, 2);
        let infantry = unit(&config, UnitType::Infantry, 1);
        let b = board();
        let at = Vector::new(1, 1);
        let far = Vector::new(1, 3);
        assert!(unit_strike(&config, &b, &artillery, at, &infantry, far, false).is_some());
        assert!(unit_strike(&config, &b, &artillery, at, &infantry, far, true).is_none());
        artillery.moved = true;
        assert!(unit_strike(&config, &b, &artillery, at, &infantry, far, false).is_none());
    }

    #[test]
    fn snipers_must_fold_first() {
        let config = GameConfig::default();
        let mut sniper = unit(&config, UnitType::Sniper, 1);
        let target = unit(&config, UnitType::Infantry, 2);
        let b = board();
        let (from, to) = (Vector::new(0, 0), Vector::new(0, 2));
        assert!(unit_strike(&config, &b, &sniper, from, &target, to, false).is_none());
        sniper.folded = true;
        assert!(unit_strike(&config, &b, &sniper, from, &target, to, false).is_some());
    }

    #[test]
    fn overdrive_adds_its_bonus() {
        let config = GameConfig::default();
        let mut b = board();
        if let Some(p) = b.players.get_mut(&PlayerId(1)) {
            p.active_powers.insert(Skill::Overdrive);
        }
        assert_eq!(attack_bonus(&config, &b, PlayerId(1)), 30);
        assert_eq!(attack_bonus(&config, &b, PlayerId(2)), 0);
    }

    #[test]
    fn buildings_ignore_cover() {
        let config = GameConfig::default();
        let tank = unit(&config, UnitType::Tank, 1);
        let to = Vector::new(2, 1);
        let b = board().with_tile(to, TileType::Forest);
        let strike = building_strike(&config, &b, &tank, Vector::new(1, 1), to, 100).unwrap();
        assert_eq!(strike, Strike { weapon: 0, damage: 50 });
    }

    #[test]
    fn charge_is_capped() {
        let config = GameConfig::default();
        assert_eq!(accrue_charge(&config, 0, 40, 10), 90);
        assert_eq!(accrue_charge(&config, 990, 100, 0), config.max_charge);
    }
}
