//! Error types for the city card engine.
//!
//! All ability failures are recoverable: the dispatcher turns them into a
//! failed [`AbilityResult`](crate::ability::AbilityResult) and the world is left
//! exactly as it was before the call.

use thiserror::Error;

use crate::ability::Ability;
use crate::world::Phase;

/// Why an ability activation was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbilityError {
    /// The caster cannot afford the ability.
    #[error("{ability}: insufficient gold (needs {needed}, has {available})")]
    InsufficientGold {
        /// Ability attempted.
        ability: Ability,
        /// Actual cost after modifiers.
        needed: u32,
        /// Caster's gold.
        available: u32,
    },

    /// A target is missing, dead, not deployed or not visible.
    #[error("{ability}: invalid target: {reason}")]
    InvalidTarget {
        /// Ability attempted.
        ability: Ability,
        /// What was wrong with the target.
        reason: String,
    },

    /// An ability-specific gate failed.
    #[error("{ability}: {reason}")]
    PreconditionNotMet {
        /// Ability attempted.
        ability: Ability,
        /// Which gate failed.
        reason: String,
    },

    /// The per-game usage cap is exhausted.
    #[error("{ability}: usage cap of {cap} reached")]
    UsageCapReached {
        /// Ability attempted.
        ability: Ability,
        /// Configured cap.
        cap: u32,
    },

    /// The ability is cooling down for this caster.
    #[error("{ability}: on cooldown for {rounds} more round(s)")]
    OnCooldown {
        /// Ability attempted.
        ability: Ability,
        /// Rounds remaining.
        rounds: u32,
    },

    /// The target's hard block intercepted the ability.
    #[error("{ability}: blocked by {target}'s invulnerability shield")]
    BlockedByShield {
        /// Ability attempted.
        ability: Ability,
        /// Name of the shielded player.
        target: String,
    },

    /// The ability has been banned for this caster.
    #[error("{ability}: disabled ({reason})")]
    AbilityDisabled {
        /// Ability attempted.
        ability: Ability,
        /// Why it is disabled.
        reason: String,
    },

    /// An entity vanished between validation and application.
    #[error("{ability}: inconsistent state: {detail}")]
    InconsistentState {
        /// Ability attempted.
        ability: Ability,
        /// What went missing.
        detail: String,
    },

    /// Abilities may only be activated during the ability window.
    #[error("{ability}: abilities cannot be used during {phase}")]
    OutsideAbilityWindow {
        /// Ability attempted.
        ability: Ability,
        /// Current phase.
        phase: Phase,
    },

    /// The requested name does not denote an ability.
    #[error("unknown ability '{0}'")]
    UnknownAbility(String),

    /// The handler panicked; the world was restored.
    #[error("{ability}: internal error, the ability had no effect")]
    HandlerPanicked {
        /// Ability attempted.
        ability: Ability,
    },
}

impl AbilityError {
    /// The ability this error refers to, if it parsed.
    #[must_use]
    pub const fn ability(&self) -> Option<Ability> {
        match self {
            Self::InsufficientGold { ability, .. }
            | Self::InvalidTarget { ability, .. }
            | Self::PreconditionNotMet { ability, .. }
            | Self::UsageCapReached { ability, .. }
            | Self::OnCooldown { ability, .. }
            | Self::BlockedByShield { ability, .. }
            | Self::AbilityDisabled { ability, .. }
            | Self::InconsistentState { ability, .. }
            | Self::OutsideAbilityWindow { ability, .. }
            | Self::HandlerPanicked { ability } => Some(*ability),
            Self::UnknownAbility(_) => None,
        }
    }
}

/// Why a phase transition did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoundError {
    /// A resolver reported an inconsistency; the round stays in `phase`.
    #[error("round {round} held in {phase}: {detail}")]
    Held {
        /// Round number.
        round: u32,
        /// Phase that failed to complete.
        phase: Phase,
        /// What the resolver reported.
        detail: String,
    },

    /// The game has already ended.
    #[error("the game is over")]
    GameOver,
}

/// Deployment declaration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeployError {
    /// Deployment can only change during the ability window.
    #[error("deployment is locked during {0}")]
    Locked(Phase),

    /// Unknown or eliminated player.
    #[error("unknown or eliminated player {0}")]
    UnknownPlayer(String),

    /// A named city is not deployable.
    #[error("{city} cannot be deployed: {reason}")]
    NotDeployable {
        /// City name.
        city: String,
        /// Why.
        reason: String,
    },

    /// Too many cities.
    #[error("at most {max} cities may be deployed")]
    TooMany {
        /// Configured maximum.
        max: usize,
    },
}

/// Game setup errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// The catalog has no such city.
    #[error("unknown city '{0}'")]
    UnknownCity(String),

    /// The city is already owned by someone.
    #[error("city '{0}' is already in play")]
    CityTaken(String),

    /// No such player.
    #[error("unknown player {0}")]
    UnknownPlayer(String),

    /// A destroyed city cannot become a center.
    #[error("city '{0}' is destroyed")]
    DeadCity(String),

    /// Players and rosters can only change before the first phase advance.
    #[error("the game has already started")]
    AlreadyStarted,
}

/// A phase resolver found the world in a state it cannot process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{detail}")]
pub struct ResolveError {
    /// What was inconsistent.
    pub detail: String,
}

impl ResolveError {
    /// Creates an error from a description.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The document is not valid JSON for [`GameConfig`](crate::config::GameConfig).
    #[error("invalid config document: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Result alias for ability handlers.
pub type Result<T> = std::result::Result<T, AbilityError>;
