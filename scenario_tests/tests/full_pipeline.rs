// End-to-end scenarios through the match harness.
//
// Each test builds a small board, seats every player through the real
// handshake (via TestMatch), and plays intents through the full path:
// client frame → server resolution → per-viewer encode → client board.
// After every step the client boards must equal their redacted view of the
// server, and the history must pass the structural checks.

use meridian_protocol::{ServerMessage, decode_server};
use meridian_sim::automated::GreedyPlayer;
use meridian_sim::board::Board;
use meridian_sim::building::Building;
use meridian_sim::config::GameConfig;
use meridian_sim::effects::{Condition, Effect, EffectAction, Effects, RelativeVector};
use meridian_sim::error::Rejection;
use meridian_sim::intent::Intent;
use meridian_sim::player::Player;
use meridian_sim::response::{ActionKind, ActionResponse};
use meridian_sim::turn::TurnState;
use meridian_sim::types::{BuildingType, PlayerId, Size, TeamId, UnitType, Vector};
use meridian_sim::unit::Unit;
use scenario_tests::TestMatch;

const P1: PlayerId = PlayerId(1);
const P2: PlayerId = PlayerId(2);
const P3: PlayerId = PlayerId(3);

fn unit(config: &GameConfig, unit_type: UnitType, player: PlayerId) -> Unit {
    Unit::new(unit_type, player, &config.units[&unit_type])
}

/// Two players on a fogged 10x10 map, headquarters in opposite corners.
fn skirmish() -> Board {
    Board::new(Size::new(10, 10))
        .with_player(Player::new(P1, TeamId(1), 1000))
        .with_player(Player::new(P2, TeamId(2), 1000))
        .with_building(Vector::new(0, 0), Building::new(BuildingType::Headquarters, P1))
        .with_building(Vector::new(9, 9), Building::new(BuildingType::Headquarters, P2))
}

fn kinds<'a>(responses: impl Iterator<Item = &'a ActionResponse>) -> Vec<ActionKind> {
    responses.map(ActionResponse::kind).collect()
}

fn checked(m: &TestMatch) {
    m.assert_in_sync();
    m.assert_invariants();
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

#[test]
fn every_client_starts_from_its_own_view() {
    let config = GameConfig::default();
    let board = skirmish()
        .with_unit(Vector::new(1, 1), unit(&config, UnitType::Infantry, P1))
        .with_unit(Vector::new(8, 8), unit(&config, UnitType::Infantry, P2));
    let m = TestMatch::new(config, board, Effects::new());
    checked(&m);

    let p1 = &m.client(P1).board;
    assert!(p1.units.contains_key(&Vector::new(1, 1)));
    assert!(!p1.units.contains_key(&Vector::new(8, 8)));
    assert_eq!(p1.players[&P2].funds, 0);
    assert_eq!(p1.buildings[&Vector::new(9, 9)].player, PlayerId::NEUTRAL);
}

#[test]
fn mismatched_rules_are_turned_away() {
    let config = GameConfig::default();
    let m = TestMatch::new(config.clone(), skirmish(), Effects::new());
    let mut other = config;
    other.max_misses = 5;
    match decode_server(&m.hello(&other, P1)).unwrap() {
        ServerMessage::Rejected { reason } => assert_eq!(reason, "rules mismatch"),
        msg => panic!("expected Rejected, got {msg:?}"),
    }
}

// ---------------------------------------------------------------------------
// Action resolution
// ---------------------------------------------------------------------------

/// A 1-health defender without weapons dies to the first strike and cannot
/// answer it.
#[test]
fn a_defenceless_unit_is_destroyed_without_a_counter() {
    let config = GameConfig::default();
    let board = skirmish()
        .with_unit(Vector::new(4, 4), unit(&config, UnitType::Infantry, P1))
        .with_unit(Vector::new(4, 5), unit(&config, UnitType::Jeep, P2).with_health(1));
    let mut m = TestMatch::new(config, board, Effects::new());

    let step = m
        .submit(
            P1,
            &Intent::AttackUnit {
                from: Vector::new(4, 4),
                to: Vector::new(4, 5),
            },
        )
        .unwrap();
    match &step.trace[0].response {
        ActionResponse::AttackUnit {
            has_counter_attack,
            unit_a,
            unit_b,
            ..
        } => {
            assert!(!has_counter_attack);
            assert!(unit_b.is_none());
            assert_eq!(unit_a.as_ref().map(|u| u.health), Some(100));
        }
        other => panic!("expected AttackUnit, got {other:?}"),
    }
    assert!(!m.game.board.units.contains_key(&Vector::new(4, 5)));
    assert!(!m.game.is_over());
    checked(&m);
    assert!(!m.client(P2).board.units.contains_key(&Vector::new(4, 5)));
    assert_eq!(m.client(P2).board.players[&P1].stats.destroyed_units, 1);
}

/// Capture resistance 20 against capture power 10: the first capture only
/// records progress, the next turn's capture transfers the building.
#[test]
fn capture_completes_on_the_second_turn() {
    let config = GameConfig::default();
    let at = Vector::new(5, 5);
    let board = skirmish()
        .with_building(at, Building::new(BuildingType::Barracks, PlayerId::NEUTRAL))
        .with_unit(at, unit(&config, UnitType::Infantry, P1))
        .with_unit(Vector::new(8, 8), unit(&config, UnitType::Infantry, P2));
    let mut m = TestMatch::new(config, board, Effects::new());

    let first = m.submit(P1, &Intent::Capture { from: at }).unwrap();
    assert_eq!(
        first.trace[0].response,
        ActionResponse::Capture {
            from: at,
            player: P1,
            progress: Some(10),
            building: None,
        }
    );
    assert_eq!(m.game.board.buildings[&at].player, PlayerId::NEUTRAL);
    assert_eq!(
        m.submit(P1, &Intent::Capture { from: at }).unwrap_err(),
        Rejection::AlreadyCompleted(at)
    );
    assert!(matches!(
        m.client(P1).inbox.last(),
        Some(ServerMessage::IntentRejected { .. })
    ));
    checked(&m);

    m.submit(P1, &Intent::EndTurn).unwrap();
    m.submit(P2, &Intent::EndTurn).unwrap();
    let second = m.submit(P1, &Intent::Capture { from: at }).unwrap();
    assert!(matches!(
        second.trace[0].response,
        ActionResponse::Capture { building: Some(_), progress: None, .. }
    ));
    assert_eq!(m.game.board.buildings[&at].player, P1);
    assert_eq!(m.client(P1).board.buildings[&at].player, P1);
    checked(&m);
}

#[test]
fn moving_out_of_sight_hides_the_unit_from_the_opponent() {
    let config = GameConfig::default();
    let board = skirmish()
        .with_unit(Vector::new(3, 3), unit(&config, UnitType::Infantry, P1))
        .with_unit(Vector::new(4, 4), unit(&config, UnitType::Infantry, P2))
        .with_unit(Vector::new(8, 8), unit(&config, UnitType::Infantry, P2));
    let mut m = TestMatch::new(config, board, Effects::new());
    m.submit(P1, &Intent::EndTurn).unwrap();
    checked(&m);
    assert!(m.client(P1).board.units.contains_key(&Vector::new(4, 4)));

    m.submit(
        P2,
        &Intent::Move {
            from: Vector::new(4, 4),
            to: Vector::new(4, 7),
            path: None,
        },
    )
    .unwrap();
    checked(&m);
    let p1 = &m.client(P1).board;
    assert!(p1.units.values().all(|u| u.player == P1));
    assert!(m.client(P2).board.units.contains_key(&Vector::new(4, 7)));
}

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

fn reinforcement_effects() -> Effects {
    Effects::new().with(
        ActionKind::CreateUnit,
        Effect::new(vec![EffectAction::new(Intent::CreateUnit {
            from: Vector::new(3, 3),
            to: Vector::new(5, 5),
            unit_type: UnitType::Pioneer,
        })])
        .when(Condition::UnitEquals {
            at: RelativeVector::Target,
            unit_type: UnitType::Infantry,
            player: None,
        }),
    )
}

fn barracks_board() -> Board {
    skirmish().with_building(Vector::new(3, 3), Building::new(BuildingType::Barracks, P1))
}

#[test]
fn a_matching_creation_brings_a_second_one() {
    let config = GameConfig::default();
    let mut m = TestMatch::new(config, barracks_board(), reinforcement_effects());
    let step = m
        .submit(
            P1,
            &Intent::CreateUnit {
                from: Vector::new(3, 3),
                to: Vector::new(3, 4),
                unit_type: UnitType::Infantry,
            },
        )
        .unwrap();
    assert_eq!(
        kinds(step.responses()),
        vec![ActionKind::CreateUnit, ActionKind::CreateUnit]
    );
    assert_eq!(m.game.board.units[&Vector::new(3, 4)].unit_type, UnitType::Infantry);
    assert_eq!(m.game.board.units[&Vector::new(5, 5)].unit_type, UnitType::Pioneer);
    assert_eq!(m.game.board.units[&Vector::new(5, 5)].player, P1);
    let cost = m.game.config.units[&UnitType::Infantry].cost;
    assert_eq!(m.game.board.players[&P1].funds, 1000 - cost);
    checked(&m);
}

#[test]
fn a_creation_failing_the_condition_stays_alone() {
    let config = GameConfig::default();
    let mut m = TestMatch::new(config, barracks_board(), reinforcement_effects());
    let step = m
        .submit(
            P1,
            &Intent::CreateUnit {
                from: Vector::new(3, 3),
                to: Vector::new(3, 4),
                unit_type: UnitType::Pioneer,
            },
        )
        .unwrap();
    assert_eq!(kinds(step.responses()), vec![ActionKind::CreateUnit]);
    assert!(!m.game.board.units.contains_key(&Vector::new(5, 5)));
    checked(&m);
}

#[test]
fn a_blocked_effect_is_dropped_whole() {
    let config = GameConfig::default();
    let board = barracks_board().with_unit(Vector::new(5, 5), unit(&config, UnitType::Infantry, P2));
    let mut m = TestMatch::new(config, board, reinforcement_effects());
    let step = m
        .submit(
            P1,
            &Intent::CreateUnit {
                from: Vector::new(3, 3),
                to: Vector::new(3, 4),
                unit_type: UnitType::Infantry,
            },
        )
        .unwrap();
    assert_eq!(kinds(step.responses()), vec![ActionKind::CreateUnit]);
    assert_eq!(m.game.board.units[&Vector::new(5, 5)].player, P2);
    checked(&m);
}

// ---------------------------------------------------------------------------
// Turn sequencing
// ---------------------------------------------------------------------------

#[test]
fn two_misses_remove_one_of_three_and_play_goes_on() {
    let config = GameConfig::default();
    let board = Board::new(Size::new(9, 9))
        .with_player(Player::new(P1, TeamId(1), 0))
        .with_player(Player::new(P2, TeamId(2), 0))
        .with_player(Player::new(P3, TeamId(3), 0))
        .with_unit(Vector::new(0, 0), unit(&config, UnitType::Infantry, P1))
        .with_unit(Vector::new(4, 4), unit(&config, UnitType::Infantry, P2))
        .with_unit(Vector::new(8, 8), unit(&config, UnitType::Infantry, P3));
    let mut m = TestMatch::new(config, board, Effects::new());

    m.miss().unwrap();
    m.submit(P2, &Intent::EndTurn).unwrap();
    m.submit(P3, &Intent::EndTurn).unwrap();
    let step = m.miss().unwrap();

    assert_eq!(
        kinds(step.responses()),
        vec![ActionKind::EndTurn, ActionKind::PreviousTurnGameOver]
    );
    assert!(m.game.board.players[&P1].eliminated);
    assert!(!m.game.board.players[&P2].eliminated);
    assert!(!m.game.board.players[&P3].eliminated);
    assert!(!m.game.is_over());
    assert!(!m.game.board.units.contains_key(&Vector::new(0, 0)));
    assert_eq!(m.game.turn_state(), TurnState::Active(P2));
    checked(&m);
    assert!(m.client(P2).inbox.is_empty());
}

#[test]
fn two_misses_in_a_duel_end_the_match() {
    let config = GameConfig::default();
    let board = skirmish()
        .with_unit(Vector::new(1, 1), unit(&config, UnitType::Infantry, P1))
        .with_unit(Vector::new(8, 8), unit(&config, UnitType::Infantry, P2));
    let mut m = TestMatch::new(config, board, Effects::new());

    m.miss().unwrap();
    m.submit(P2, &Intent::EndTurn).unwrap();
    let step = m.miss().unwrap();

    assert_eq!(
        kinds(step.responses()),
        vec![
            ActionKind::EndTurn,
            ActionKind::PreviousTurnGameOver,
            ActionKind::GameEnd
        ]
    );
    assert!(m.game.is_over());
    assert_eq!(m.game.turn_state(), TurnState::Ended);
    assert_eq!(m.game.winner(), Some(TeamId(2)));
    checked(&m);
    for player in [P1, P2] {
        assert_eq!(
            m.client(player).inbox.last(),
            Some(&ServerMessage::GameOver { winner: Some(2) })
        );
    }
    assert_eq!(m.submit(P2, &Intent::EndTurn).unwrap_err(), Rejection::GameOver);
}

// ---------------------------------------------------------------------------
// Automated play
// ---------------------------------------------------------------------------

#[test]
fn greedy_players_keep_every_client_in_sync() {
    let config = GameConfig::default();
    let board = skirmish()
        .with_building(Vector::new(1, 0), Building::new(BuildingType::Barracks, P1))
        .with_building(Vector::new(8, 9), Building::new(BuildingType::Barracks, P2))
        .with_building(Vector::new(5, 4), Building::new(BuildingType::House, PlayerId::NEUTRAL))
        .with_unit(Vector::new(1, 1), unit(&config, UnitType::Infantry, P1))
        .with_unit(Vector::new(2, 1), unit(&config, UnitType::Tank, P1))
        .with_unit(Vector::new(8, 8), unit(&config, UnitType::Infantry, P2))
        .with_unit(Vector::new(7, 8), unit(&config, UnitType::Tank, P2));
    let mut m = TestMatch::new(config, board, Effects::new());
    m.start();

    for turn in 0..20u64 {
        if m.game.is_over() {
            break;
        }
        let mut ai = GreedyPlayer::new(turn);
        m.run_automated(&mut ai).unwrap();
        checked(&m);
    }
    assert_eq!(m.game.replay(), m.game.board);
}
