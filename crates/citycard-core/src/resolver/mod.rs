//! Phase resolvers for the round lifecycle.
//!
//! Each non-ability phase of a round has one resolver. The game facade clones
//! the world into `next`, hands the resolver both copies and commits `next`
//! only if the resolver returns `Ok`. A failing resolver therefore leaves the
//! round exactly where it was.
//!
//! # Invariants
//!
//! - Resolvers read pre-phase values from `current` and write to `next`.
//! - Resolvers are deterministic: all iteration goes through ordered maps and
//!   the turn order, and randomness (if any) comes from the world RNG.
//!
//! # Available Resolvers
//!
//! - [`BattleResolver`]: simultaneous pairwise battles (`Resolving`)
//! - [`SettlementResolver`]: income, loot and post-battle aftermaths (`Settling`)
//! - [`ExpiryResolver`]: decrements every timer once (`Expiring`)
//! - [`WinCheckResolver`]: succession, elimination and game end (`WinCheck`)

mod battle;
mod expiry;
mod settlement;
mod win_check;

pub use battle::{resolve_deployments, resolve_pair, BattleOutcome, BattleResolver, Deployment};
pub use expiry::ExpiryResolver;
pub use settlement::SettlementResolver;
pub use win_check::WinCheckResolver;

use crate::error::ResolveError;
use crate::log::GameLog;
use crate::world::{Phase, World};

/// Resolves one phase of a round.
///
/// # Example
///
/// ```
/// use citycard_core::error::ResolveError;
/// use citycard_core::log::GameLog;
/// use citycard_core::resolver::PhaseResolver;
/// use citycard_core::world::{Phase, World};
///
/// struct Noop;
///
/// impl PhaseResolver for Noop {
///     fn phase(&self) -> Phase {
///         Phase::Expiring
///     }
///
///     fn resolve(
///         &self,
///         _current: &World,
///         _next: &mut World,
///         _log: &mut GameLog,
///     ) -> Result<(), ResolveError> {
///         Ok(())
///     }
/// }
/// ```
pub trait PhaseResolver: Send + Sync {
    /// The phase this resolver completes.
    fn phase(&self) -> Phase;

    /// Applies the phase.
    ///
    /// # Arguments
    ///
    /// * `current` - The world as it was when the phase began (read-only)
    /// * `next` - A clone of `current` to mutate
    /// * `log` - Lines produced by the phase
    ///
    /// # Errors
    ///
    /// [`ResolveError`] if the world is inconsistent. The caller discards
    /// `next` and `log`.
    fn resolve(&self, current: &World, next: &mut World, log: &mut GameLog)
        -> Result<(), ResolveError>;
}

/// The resolver that completes `phase`, if the phase has one.
#[must_use]
pub fn for_phase(phase: Phase) -> Option<Box<dyn PhaseResolver>> {
    match phase {
        Phase::Resolving => Some(Box::new(BattleResolver)),
        Phase::Settling => Some(Box::new(SettlementResolver)),
        Phase::Expiring => Some(Box::new(ExpiryResolver)),
        Phase::WinCheck => Some(Box::new(WinCheckResolver)),
        Phase::AbilityWindow | Phase::DeploymentLocked | Phase::GameOver => None,
    }
}
