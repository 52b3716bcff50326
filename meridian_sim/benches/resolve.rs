// Benchmarks for the resolution pipeline and the trace encoder.
//
// `automated_round` plays one full round of two greedy players on a mid-size
// fogged map; `encode_round` encodes that round for one viewer.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use meridian_sim::automated::GreedyPlayer;
use meridian_sim::board::Board;
use meridian_sim::building::Building;
use meridian_sim::config::GameConfig;
use meridian_sim::effects::Effects;
use meridian_sim::game::{Game, Step};
use meridian_sim::player::Player;
use meridian_sim::types::{BuildingType, PlayerId, Size, TeamId, TileType, UnitType, Vector};
use meridian_sim::unit::Unit;

const P1: PlayerId = PlayerId(1);
const P2: PlayerId = PlayerId(2);

fn skirmish(config: &GameConfig) -> Board {
    let mut board = Board::new(Size::new(24, 24))
        .with_player(Player::new(P1, TeamId(1), 3000))
        .with_player(Player::new(P2, TeamId(2), 3000))
        .with_building(Vector::new(1, 1), Building::new(BuildingType::Headquarters, P1))
        .with_building(Vector::new(22, 22), Building::new(BuildingType::Headquarters, P2))
        .with_building(Vector::new(3, 1), Building::new(BuildingType::Factory, P1))
        .with_building(Vector::new(20, 22), Building::new(BuildingType::Factory, P2));
    for i in 0..24 {
        board = board
            .with_tile(Vector::new(i, 12), TileType::Road)
            .with_tile(Vector::new(12, i), TileType::Forest);
    }
    for (i, unit_type) in [UnitType::Infantry, UnitType::Tank, UnitType::Jeep, UnitType::Artillery]
        .into_iter()
        .enumerate()
    {
        let offset = i as i32 * 2;
        board = board
            .with_unit(
                Vector::new(2 + offset, 4),
                Unit::new(unit_type, P1, &config.units[&unit_type]),
            )
            .with_unit(
                Vector::new(21 - offset, 19),
                Unit::new(unit_type, P2, &config.units[&unit_type]),
            );
    }
    board
}

fn play_round(game: &mut Game, seed: u64) -> Vec<Step> {
    let mut steps = Vec::new();
    for player in [P1, P2] {
        let mut ai = GreedyPlayer::new(seed ^ u64::from(player.0));
        if let Ok(step) = game.run_automated(&mut ai) {
            steps.push(step);
        }
    }
    steps
}

fn bench_automated_round(c: &mut Criterion) {
    let config = GameConfig::default();
    let board = skirmish(&config);
    c.bench_function("automated_round", |b| {
        b.iter(|| {
            let mut game = Game::new(config.clone(), board.clone(), Effects::new());
            black_box(play_round(&mut game, black_box(42)))
        });
    });
}

fn bench_encode_round(c: &mut Criterion) {
    let config = GameConfig::default();
    let mut game = Game::new(config.clone(), skirmish(&config), Effects::new());
    let steps = play_round(&mut game, 42);
    c.bench_function("encode_round", |b| {
        b.iter(|| {
            for step in &steps {
                black_box(step.encode_for(&config, black_box(P1)));
            }
        });
    });
}

criterion_group!(benches, bench_automated_round, bench_encode_round);
criterion_main!(benches);
