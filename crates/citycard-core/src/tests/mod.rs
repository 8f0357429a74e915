//! Cross-module tests.
//!
//! - `determinism.rs`: same seed and same calls give the same game
//! - `integration.rs`: whole-game scenarios through the [`Game`](crate::game::Game) facade
//! - `properties.rs`: proptest invariants of the ledger, status store and battles
//! - `helpers.rs`: fixtures shared with the per-module unit tests

mod determinism;
pub mod helpers;
mod integration;

pub use helpers::*;
