//! Game configuration.
//!
//! Every tunable the engine reads lives in [`GameConfig`]. A partial JSON
//! document overrides only the keys it names:
//!
//! ```
//! use citycard_core::config::GameConfig;
//!
//! let config = GameConfig::from_json(r#"{ "seed": 7, "barrier_hp": 20000 }"#).unwrap();
//! assert_eq!(config.seed, 7);
//! assert_eq!(config.barrier_hp, 20000);
//! assert_eq!(config.gold_cap, 24);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound on any player's gold.
pub const GOLD_CAP: u32 = 24;

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seed for the world RNG.
    pub seed: u64,
    /// Maximum gold a player may hold.
    pub gold_cap: u32,
    /// Gold each player starts with.
    pub starting_gold: u32,
    /// Gold granted to every player in settlement.
    pub base_income: u32,
    /// Income while a financial crisis is active.
    pub crisis_income: u32,
    /// Maximum cities a player may deploy in one round.
    pub max_deploy: usize,
    /// Maximum roster size reachable through acquisition.
    pub max_roster: usize,
    /// HP of a newly raised barrier.
    pub barrier_hp: u64,
    /// Rounds a barrier lasts.
    pub barrier_rounds: u32,
    /// Percentage of absorbed damage a barrier reflects.
    pub barrier_reflect_percent: u32,
    /// HP a barrier regains per round.
    pub barrier_regen: u64,
    /// Rounds a Protection lasts.
    pub protection_rounds: u32,
    /// Charges of a fresh IronShield.
    pub iron_charges: u32,
    /// Rounds an anchor lock lasts.
    pub anchor_rounds: u32,
    /// Rounds a hard block lasts.
    pub hard_block_rounds: u32,
    /// Rounds a disguise lasts.
    pub disguise_rounds: u32,
    /// Rounds an embargo ban lasts.
    pub ban_rounds: u32,
    /// Rounds a stare-down lasts.
    pub stare_down_rounds: u32,
    /// Whether Protection may be placed on a center city.
    pub allow_center_protection: bool,
    /// Battle power of a center city, in percent of its HP.
    pub center_power_percent: u32,
    /// Battle power of a sub-center city, in percent of its HP.
    pub sub_center_power_percent: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            gold_cap: GOLD_CAP,
            starting_gold: 2,
            base_income: 3,
            crisis_income: 1,
            max_deploy: 3,
            max_roster: 10,
            barrier_hp: 15_000,
            barrier_rounds: 5,
            barrier_reflect_percent: 50,
            barrier_regen: 3_000,
            protection_rounds: 10,
            iron_charges: 2,
            anchor_rounds: 10,
            hard_block_rounds: 3,
            disguise_rounds: 3,
            ban_rounds: 3,
            stare_down_rounds: 3,
            allow_center_protection: false,
            center_power_percent: 200,
            sub_center_power_percent: 150,
        }
    }
}

impl GameConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] on malformed JSON and
    /// [`ConfigError::Invalid`] when a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gold_cap == 0 {
            return Err(ConfigError::Invalid("gold_cap must be positive".into()));
        }
        if self.starting_gold > self.gold_cap {
            return Err(ConfigError::Invalid(
                "starting_gold must not exceed gold_cap".into(),
            ));
        }
        if self.barrier_reflect_percent > 100 {
            return Err(ConfigError::Invalid(
                "barrier_reflect_percent must be at most 100".into(),
            ));
        }
        if self.max_deploy == 0 {
            return Err(ConfigError::Invalid("max_deploy must be positive".into()));
        }
        Ok(())
    }
}
