//! Transient modifiers attached to cities and players.
//!
//! Modifiers are written by abilities during the ability window and read by the
//! battle resolver. Each carries an optional round counter; the expiry resolver
//! decrements it once per round and drops the modifier at zero. A modifier with
//! no counter lives until it is consumed or its owner dies.

use serde::{Deserialize, Serialize};

use super::PlayerId;

/// What a modifier does.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifierKind {
    // -- city modifiers --
    /// Multiplies the city's battle power.
    PowerMultiplier(u32),
    /// The city does not suffer fatigue halving.
    IgnoreFatigue,
    /// The city absorbs all damage aimed at its side.
    Attract,
    /// The city is destroyed after the battle it fights in.
    SuicideAttack,
    /// On death, splash this much damage onto every opposing deployed city.
    DesperateRetaliation(u64),
    /// On death, every opposing deployed city takes damage equal to its own
    /// pre-round HP.
    MutualDestruction,
    /// Immune to damage the first time the city is deployed.
    FirstDeploymentImmunity,

    // -- player modifiers --
    /// All damage goes to the defender's highest-HP deployed city.
    AttackPriorityHighestHp,
    /// This side's outgoing damage is halved.
    OutgoingDamageHalved,
    /// This side takes no damage from `from`.
    DamageImmunity {
        /// The player whose damage is ignored.
        from: PlayerId,
    },
    /// This side deploys nothing.
    NoDeploy,
    /// Damage from `against` is turned back onto its own deployment.
    Counterstrike {
        /// The attacker whose damage is turned back.
        against: PlayerId,
    },
    /// Damage from `against` heals this side instead; neither side deals damage.
    StrawBoats {
        /// The attacker whose damage becomes healing.
        against: PlayerId,
    },
    /// Damage dealt to `against` is converted into stolen gold at settlement.
    Loot {
        /// The looted player.
        against: PlayerId,
    },
    /// Extra damage per `against` deployed city, and `against`'s income this
    /// round is redirected.
    RestAndWait {
        /// The targeted player.
        against: PlayerId,
    },
    /// If this side is the weaker one against `against`, its attack goes to
    /// the third player instead.
    Feint {
        /// The player this side would rather not fight.
        against: PlayerId,
    },
    /// This side's attack on `against` also strikes their center.
    Besiege {
        /// The besieged player.
        against: PlayerId,
    },
}

/// A modifier instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    /// Effect.
    pub kind: ModifierKind,
    /// Rounds left, or `None` for "until consumed".
    pub rounds_remaining: Option<u32>,
}

impl Modifier {
    /// A modifier lasting `rounds` expiry passes.
    #[must_use]
    pub const fn for_rounds(kind: ModifierKind, rounds: u32) -> Self {
        Self {
            kind,
            rounds_remaining: Some(rounds),
        }
    }

    /// A modifier that lives until it is consumed.
    #[must_use]
    pub const fn until_consumed(kind: ModifierKind) -> Self {
        Self {
            kind,
            rounds_remaining: None,
        }
    }

    /// Decrements the counter.
    ///
    /// # Returns
    ///
    /// `true` if the modifier should be kept.
    pub fn tick(&mut self) -> bool {
        match self.rounds_remaining.as_mut() {
            Some(rounds) => {
                *rounds = rounds.saturating_sub(1);
                *rounds > 0
            }
            None => true,
        }
    }
}
