//! Fixtures shared by the unit and integration tests.
//!
//! Two kinds of setup are provided: full [`Game`]s built through the public
//! setup calls, and bare [`World`]s with synthetic cities for exercising the
//! battle arithmetic without catalog HP getting in the way.

use crate::catalog::StaticCatalog;
use crate::config::GameConfig;
use crate::entity::{City, CityKey, PlayerId};
use crate::game::Game;
use crate::world::World;

// =============================================================================
// Game Setup
// =============================================================================

/// Alice's roster in the standard game; the first city is her center.
pub const ALICE_CITIES: [&str; 4] = ["Beijing", "Hangzhou", "Ningbo", "Wenzhou"];

/// Bob's roster in the standard game; the first city is his center.
pub const BOB_CITIES: [&str; 4] = ["Shanghai", "Nanjing", "Suzhou", "Wuxi"];

/// Sets up the standard two-player game with full purses.
///
/// Alice (team 0) holds Beijing (center), Hangzhou, Ningbo and Wenzhou.
/// Bob (team 1) holds Shanghai (center), Nanjing, Suzhou and Wuxi. Both start
/// at the gold cap of 24. Nothing is deployed and no city is known to the
/// opponent.
///
/// # Returns
///
/// A tuple of (game, alice, bob).
pub fn two_player_game() -> (Game, PlayerId, PlayerId) {
    game_with_gold(crate::config::GOLD_CAP)
}

/// Sets up the standard two-player game with a chosen purse.
///
/// # Arguments
///
/// * `gold` - Starting gold for both players
///
/// # Returns
///
/// A tuple of (game, alice, bob).
pub fn game_with_gold(gold: u32) -> (Game, PlayerId, PlayerId) {
    let config = GameConfig {
        starting_gold: gold,
        ..GameConfig::default()
    };
    let mut game = Game::new(config, StaticCatalog::builtin());
    let alice = game.add_player("alice", 0).expect("setup is open");
    let bob = game.add_player("bob", 1).expect("setup is open");
    for (player, roster) in [(alice, ALICE_CITIES), (bob, BOB_CITIES)] {
        for name in roster {
            game.add_city(player, name).expect("catalog city");
        }
        game.set_center(player, roster[0]).expect("owned city");
    }
    (game, alice, bob)
}

/// Carol's roster in the three-player game; the first city is her center.
pub const CAROL_CITIES: [&str; 3] = ["Chengdu", "Wuhan", "Qingdao"];

/// The standard game plus Carol (team 2) with full purses.
///
/// # Returns
///
/// A tuple of (game, alice, bob, carol).
pub fn three_player_game() -> (Game, PlayerId, PlayerId, PlayerId) {
    let (mut game, alice, bob) = two_player_game();
    let carol = game.add_player("carol", 2).expect("setup is open");
    for name in CAROL_CITIES {
        game.add_city(carol, name).expect("catalog city");
    }
    game.set_center(carol, CAROL_CITIES[0]).expect("owned city");
    (game, alice, bob, carol)
}

/// Looks up the key of a city by owner and name.
///
/// # Panics
///
/// If `player` does not own a city called `name`.
pub fn city_key(game: &Game, player: PlayerId, name: &str) -> CityKey {
    game.world()
        .city_key_by_name(player, name)
        .unwrap_or_else(|| panic!("{player} owns no city named {name}"))
}

/// Current HP of a city by owner and name.
pub fn hp_of(game: &Game, player: PlayerId, name: &str) -> u64 {
    let key = city_key(game, player, name);
    game.world().city(key).map_or(0, |c| c.current_hp)
}

// =============================================================================
// World Setup
// =============================================================================

/// Builds a bare two-player world with synthetic cities.
///
/// Uses the default config (2 starting gold each). Alice is on team 0 and Bob
/// on team 1. No center is set, every listed city is declared for battle and
/// nothing is known to the opponent.
///
/// # Arguments
///
/// * `a` - Alice's cities as (name, hp)
/// * `b` - Bob's cities as (name, hp)
///
/// # Returns
///
/// A tuple of (world, alice, bob).
pub fn battle_world(a: &[(&str, u64)], b: &[(&str, u64)]) -> (World, PlayerId, PlayerId) {
    let mut world = World::new(GameConfig::default());
    let alice = world.add_player("alice", 0);
    let bob = world.add_player("bob", 1);
    for (player, cities) in [(alice, a), (bob, b)] {
        let mut declared = Vec::with_capacity(cities.len());
        for (name, hp) in cities {
            let id = world.allocate_city_id();
            world
                .player_mut(player)
                .expect("player was just added")
                .add_city(City::new(id, *name, *hp));
            declared.push(id);
        }
        world.set_deployment(player, declared);
    }
    (world, alice, bob)
}

/// Adds a third player with synthetic, declared cities to a battle world.
///
/// # Arguments
///
/// * `world` - A world from [`battle_world`]
/// * `cities` - The newcomer's cities as (name, hp)
///
/// # Returns
///
/// The new player, Carol, on team 2.
pub fn add_bystander(world: &mut World, cities: &[(&str, u64)]) -> PlayerId {
    let carol = world.add_player("carol", 2);
    let mut declared = Vec::with_capacity(cities.len());
    for (name, hp) in cities {
        let id = world.allocate_city_id();
        world
            .player_mut(carol)
            .expect("player was just added")
            .add_city(City::new(id, *name, *hp));
        declared.push(id);
    }
    world.set_deployment(carol, declared);
    carol
}

// =============================================================================
// Logging
// =============================================================================

/// Routes `tracing` output through the test harness.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
