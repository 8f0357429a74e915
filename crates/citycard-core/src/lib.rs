//! # City Card Core
//!
//! Rules engine for the city card game: ability effects, the gold economy,
//! timed status effects and simultaneous two-sided battle resolution.
//!
//! ## Architecture
//!
//! - **Entities**: players, cities and their modifiers ([`entity`])
//! - **Stores**: the gold ledger ([`ledger`]) and timed statuses ([`status`]),
//!   both owned by the [`World`](world::World)
//! - **Abilities**: one handler per ability, dispatched through a single gate
//!   that checks phase, cost, caps and cooldowns ([`ability`])
//! - **Resolvers**: one per phase of the round, double-buffered so a failed
//!   phase leaves the world untouched ([`resolver`])
//!
//! The [`Game`](game::Game) facade ties these together and is the only type a
//! client needs.
//!
//! ## Usage
//!
//! ```rust
//! use citycard_core::{AbilityRequest, Game, GameConfig, StaticCatalog};
//!
//! let mut game = Game::new(GameConfig::default(), StaticCatalog::builtin());
//! let alice = game.add_player("alice", 0).unwrap();
//! let bob = game.add_player("bob", 1).unwrap();
//! for (player, city) in [(alice, "Beijing"), (alice, "Hangzhou"), (bob, "Shanghai"), (bob, "Wuxi")] {
//!     game.add_city(player, city).unwrap();
//! }
//! game.set_center(alice, "Beijing").unwrap();
//! game.set_center(bob, "Shanghai").unwrap();
//!
//! game.deploy(alice, &["Hangzhou"]).unwrap();
//! game.deploy(bob, &["Wuxi"]).unwrap();
//! let preview = game.resolve_battle(alice, &["Hangzhou"], bob, &["Wuxi"]).unwrap();
//! assert_eq!(preview.destroyed_cities, vec!["Wuxi".to_string()]);
//!
//! let result = game.activate_ability(&AbilityRequest::new("gold_loan", bob));
//! assert!(result.success);
//! game.advance_round().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ability;
pub mod catalog;
pub mod config;
pub mod entity;
pub mod error;
pub mod game;
pub mod ledger;
pub mod log;
pub mod resolver;
pub mod status;
pub mod world;

pub use ability::{Ability, AbilityData, AbilityOutcome, AbilityRequest, AbilityResult};
pub use catalog::{CityCatalog, GameCatalog, ProvinceClassifier, StaticCatalog};
pub use config::GameConfig;
pub use entity::{City, CityId, CityKey, Player, PlayerId};
pub use error::{AbilityError, DeployError, ResolveError, RoundError, SetupError};
pub use game::{Game, RoundSnapshot};
pub use resolver::BattleOutcome;
pub use world::{Phase, World};

#[cfg(test)]
mod tests;
