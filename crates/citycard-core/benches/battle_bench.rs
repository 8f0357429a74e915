use criterion::{black_box, criterion_group, criterion_main, Criterion};
use citycard_core::{AbilityRequest, Game, GameConfig, PlayerId, StaticCatalog};

/// Two full rosters with three cities deployed a side.
fn setup_game() -> (Game, PlayerId, PlayerId) {
    let config = GameConfig {
        starting_gold: 24,
        ..GameConfig::default()
    };
    let mut game = Game::new(config, StaticCatalog::builtin());
    let alice = game.add_player("alice", 0).unwrap();
    let bob = game.add_player("bob", 1).unwrap();
    let rosters = [
        (alice, ["Beijing", "Hangzhou", "Ningbo", "Wenzhou", "Chengdu"]),
        (bob, ["Shanghai", "Nanjing", "Suzhou", "Wuxi", "Wuhan"]),
    ];
    for (player, roster) in rosters {
        for name in roster {
            game.add_city(player, name).unwrap();
        }
        game.set_center(player, roster[0]).unwrap();
    }
    game.deploy(alice, &["Hangzhou", "Ningbo", "Chengdu"]).unwrap();
    game.deploy(bob, &["Nanjing", "Suzhou", "Wuhan"]).unwrap();
    (game, alice, bob)
}

fn bench_resolve_battle(c: &mut Criterion) {
    let (game, alice, bob) = setup_game();
    c.bench_function("resolve_battle", |b| {
        b.iter(|| {
            black_box(game.resolve_battle(
                black_box(alice),
                &["Hangzhou", "Ningbo", "Chengdu"],
                black_box(bob),
                &["Nanjing", "Suzhou", "Wuhan"],
            ))
        })
    });
}

fn bench_resolve_battle_with_barrier(c: &mut Criterion) {
    let (mut game, alice, bob) = setup_game();
    game.activate_ability(&AbilityRequest::new("set_barrier", bob));
    game.activate_ability(&AbilityRequest::new("attract_attack", bob).city("Suzhou"));
    c.bench_function("resolve_battle_with_barrier", |b| {
        b.iter(|| {
            black_box(game.resolve_battle(
                black_box(alice),
                &["Hangzhou", "Ningbo", "Chengdu"],
                black_box(bob),
                &["Nanjing", "Suzhou", "Wuhan"],
            ))
        })
    });
}

fn bench_activate_and_roll_back(c: &mut Criterion) {
    let (mut game, alice, _) = setup_game();
    let request = AbilityRequest::new("set_barrier", alice);
    c.bench_function("activate_and_roll_back", |b| {
        b.iter(|| {
            black_box(game.activate_ability(&request));
            black_box(game.rollback())
        })
    });
}

fn bench_full_round(c: &mut Criterion) {
    c.bench_function("full_round", |b| {
        b.iter_batched(
            setup_game,
            |(mut game, _, _)| black_box(game.advance_round()),
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_resolve_battle,
    bench_resolve_battle_with_barrier,
    bench_activate_and_roll_back,
    bench_full_round
);
criterion_main!(benches);
