//! Ability registry and dispatcher.
//!
//! Every ability is a variant of the closed [`Ability`] enum. Its static data
//! (cost, cap, cooldown, hard-block exposure) lives in the match arms of the
//! accessor methods, and [`dispatch`] maps each variant to its handler with an
//! exhaustive match, so adding an ability is a compile-checked change.
//!
//! # Gating order
//!
//! 1. The world must be in [`Phase::AbilityWindow`].
//! 2. The caster must exist and not be eliminated.
//! 3. Bans and stare-downs ([`AbilityError::AbilityDisabled`]).
//! 4. Cooldown ([`AbilityError::OnCooldown`]).
//! 5. Usage cap ([`AbilityError::UsageCapReached`]).
//! 6. The handler: structural checks (including the target's hard block), then
//!    [`ResourceLedger::try_debit`](crate::ledger::ResourceLedger::try_debit),
//!    then the effect.
//!
//! Usage is recorded and the cooldown started only after the handler succeeds.
//! The game facade snapshots the world before calling [`dispatch`] and restores
//! it on any error, so a handler that fails after debiting still leaves no
//! trace.
//!
//! # Handler families
//!
//! - [`battle`]: shape this round's combat (modifiers read by the battle resolver)
//! - [`defense`]: shields, barriers, heals and designations on the caster's side
//! - [`economy`]: gold, costs and bans
//! - [`tactics`]: immediate strikes, swaps, intelligence and rollback

pub mod battle;
pub mod defense;
pub mod economy;
pub mod tactics;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::GameCatalog;
use crate::entity::{City, CityKey, PlayerId};
use crate::error::{AbilityError, Result};
use crate::world::{Phase, World};

// =============================================================================
// Ability
// =============================================================================

/// When an ability takes effect.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    /// Writes modifiers the battle resolver reads this round.
    Battle,
    /// Takes effect immediately.
    Tactical,
}

macro_rules! abilities {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Every ability the engine knows.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum Ability {
            $(
                #[doc = concat!("`", $name, "`")]
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl Ability {
            /// All abilities in declaration order.
            pub const ALL: &'static [Ability] = &[$(Ability::$variant),+];

            /// Stable snake_case name.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Ability::$variant => $name),+
                }
            }
        }

        impl FromStr for Ability {
            type Err = AbilityError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Ability::$variant),)+
                    other => Err(AbilityError::UnknownAbility(other.to_string())),
                }
            }
        }
    };
}

abilities! {
    HoldPosition => "hold_position",
    CaptureTheKing => "capture_the_king",
    ShadowArmy => "shadow_army",
    BraveUnderFire => "brave_under_fire",
    AttractAttack => "attract_attack",
    SafeArrival => "safe_arrival",
    IronWall => "iron_wall",
    LastStand => "last_stand",
    Foresight => "foresight",
    MutualDestruction => "mutual_destruction",
    Berserk => "berserk",
    RoyalExpedition => "royal_expedition",
    SetBarrier => "set_barrier",
    Potential => "potential_surge",
    Counterstrike => "counterstrike",
    RestAndWait => "rest_and_wait",
    StrawBoats => "straw_boats",
    Loot => "loot",
    JadeShatter => "jade_shatter",
    DizzySwap => "dizzy_swap",
    CastBrick => "cast_brick",
    StareDown => "stare_down",
    TransferGold => "transfer_gold",
    GoldLoan => "gold_loan",
    Anchor => "anchor",
    CityProtection => "city_protection",
    QuickHeal => "quick_heal",
    AdvancedHeal => "advanced_heal",
    IronCity => "iron_city",
    CostInflation => "cost_inflation",
    Embargo => "embargo",
    Invulnerable => "invulnerable",
    Rollback => "rollback",
    Disguise => "disguise",
    Conjure => "conjure",
    PreemptiveSwap => "preemptive_swap",
    CityDetective => "city_detective",
    KeenInsight => "keen_insight",
    FinancialCrisis => "financial_crisis",
    Momentum => "momentum",
    PurpleChamber => "purple_chamber",
    SubCenter => "sub_center",
    Solidarity => "solidarity",
    Revive => "revive",
    ConsecutiveStrike => "consecutive_strike",
    HostageExchange => "hostage_exchange",
    Feint => "feint",
    Besiege => "besiege",
    Trap => "trap",
}

impl Ability {
    /// Registry base cost before inflation and discounts.
    #[must_use]
    pub const fn base_cost(self) -> u32 {
        match self {
            Self::TransferGold => 0,
            Self::GoldLoan
            | Self::Anchor
            | Self::Embargo
            | Self::PreemptiveSwap
            | Self::CityDetective
            | Self::FinancialCrisis => 1,
            Self::HoldPosition | Self::CastBrick => 2,
            Self::CaptureTheKing
            | Self::ShadowArmy
            | Self::BraveUnderFire
            | Self::SetBarrier
            | Self::CityProtection
            | Self::QuickHeal
            | Self::KeenInsight
            | Self::Feint => 3,
            Self::AttractAttack
            | Self::SafeArrival
            | Self::AdvancedHeal
            | Self::Revive
            | Self::HostageExchange => 4,
            Self::IronWall
            | Self::JadeShatter
            | Self::IronCity
            | Self::CostInflation
            | Self::Invulnerable
            | Self::Conjure
            | Self::Momentum => 5,
            Self::LastStand | Self::Foresight | Self::RestAndWait | Self::Solidarity => 6,
            Self::MutualDestruction
            | Self::Berserk
            | Self::StareDown
            | Self::Disguise
            | Self::ConsecutiveStrike
            | Self::Trap => 7,
            Self::RoyalExpedition | Self::StrawBoats | Self::Loot => 8,
            Self::DizzySwap => 10,
            Self::Counterstrike | Self::Rollback | Self::SubCenter => 11,
            Self::Besiege => 12,
            Self::PurpleChamber => 16,
            Self::Potential => 20,
        }
    }

    /// Per-game usage cap, if any.
    #[must_use]
    pub const fn usage_cap(self) -> Option<u32> {
        match self {
            Self::RoyalExpedition
            | Self::JadeShatter
            | Self::Conjure
            | Self::Besiege
            | Self::Trap => Some(2),
            Self::Revive => Some(3),
            Self::Potential | Self::Momentum => Some(1),
            _ => None,
        }
    }

    /// Rounds of cooldown after a successful use.
    #[must_use]
    pub const fn cooldown(self) -> u32 {
        match self {
            Self::Foresight | Self::Rollback => 2,
            Self::Revive => 5,
            _ => 0,
        }
    }

    /// Whether an opponent's hard block stops this ability.
    #[must_use]
    pub const fn is_hard_blockable(self) -> bool {
        matches!(
            self,
            Self::IronWall
                | Self::Foresight
                | Self::RoyalExpedition
                | Self::Counterstrike
                | Self::StrawBoats
                | Self::DizzySwap
                | Self::CostInflation
                | Self::Rollback
                | Self::ConsecutiveStrike
                | Self::HostageExchange
                | Self::Besiege
                | Self::Trap
        )
    }

    /// When the ability takes effect.
    #[must_use]
    pub const fn category(self) -> Category {
        match self {
            Self::HoldPosition
            | Self::CaptureTheKing
            | Self::ShadowArmy
            | Self::BraveUnderFire
            | Self::AttractAttack
            | Self::SafeArrival
            | Self::IronWall
            | Self::LastStand
            | Self::MutualDestruction
            | Self::Berserk
            | Self::Counterstrike
            | Self::RestAndWait
            | Self::StrawBoats
            | Self::Loot
            | Self::Feint
            | Self::Besiege
            | Self::Trap => Category::Battle,
            _ => Category::Tactical,
        }
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Request and result shapes
// =============================================================================

/// An ability activation as submitted by a client.
///
/// # Example
///
/// ```
/// use citycard_core::ability::AbilityRequest;
/// use citycard_core::entity::PlayerId;
///
/// let request = AbilityRequest::new("quick_heal", PlayerId::new(0)).city("Hangzhou");
/// assert_eq!(request.target_cities, vec!["Hangzhou".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityRequest {
    /// Snake_case ability name.
    pub ability: String,
    /// Who pays and acts.
    pub caster: PlayerId,
    /// Opposing player, for hostile abilities.
    #[serde(default)]
    pub target_player: Option<PlayerId>,
    /// City names; own cities or the target's, depending on the ability.
    #[serde(default)]
    pub target_cities: Vec<String>,
    /// Numeric parameter (gold amounts).
    #[serde(default)]
    pub amount: Option<u32>,
    /// Free-form parameter (an ability name, a disguise alias).
    #[serde(default)]
    pub argument: Option<String>,
}

impl AbilityRequest {
    /// A request with no targets.
    pub fn new(ability: impl Into<String>, caster: PlayerId) -> Self {
        Self {
            ability: ability.into(),
            caster,
            target_player: None,
            target_cities: Vec::new(),
            amount: None,
            argument: None,
        }
    }

    /// Sets the target player.
    #[must_use]
    pub fn target(mut self, player: PlayerId) -> Self {
        self.target_player = Some(player);
        self
    }

    /// Appends a target city name.
    #[must_use]
    pub fn city(mut self, name: impl Into<String>) -> Self {
        self.target_cities.push(name.into());
        self
    }

    /// Sets the numeric parameter.
    #[must_use]
    pub const fn amount(mut self, amount: u32) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Sets the free-form parameter.
    #[must_use]
    pub fn argument(mut self, argument: impl Into<String>) -> Self {
        self.argument = Some(argument.into());
        self
    }
}

/// Structured payload returned alongside an ability message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbilityData {
    /// Gold paid.
    Paid {
        /// Actual cost.
        cost: u32,
    },
    /// A barrier was raised.
    Barrier {
        /// Barrier HP.
        hp: u64,
        /// Lifetime.
        rounds: u32,
    },
    /// A city was hit outside battle.
    Strike {
        /// City name.
        city: String,
        /// HP removed.
        damage: u64,
        /// Whether a shield absorbed it.
        blocked: bool,
        /// Whether the city died.
        destroyed: bool,
    },
    /// Cities were healed.
    Healed {
        /// City names and HP restored.
        cities: Vec<(String, u64)>,
    },
    /// Two cities changed hands.
    Swapped {
        /// City the caster gave away.
        given: String,
        /// City the caster received.
        received: String,
    },
    /// A city joined the caster's roster.
    Acquired {
        /// City name.
        city: String,
        /// Its HP.
        hp: u64,
    },
    /// Intelligence about one city.
    Inspected {
        /// Real name.
        name: String,
        /// Real current HP.
        hp: u64,
        /// Whether it was disguised.
        was_disguised: bool,
    },
    /// Cities that became known.
    Revealed {
        /// City names.
        cities: Vec<String>,
    },
    /// Gold moved between players.
    Transferred {
        /// Gold moved.
        amount: u32,
    },
}

/// What a successful handler reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityOutcome {
    /// Line every participant sees.
    pub public: String,
    /// Line only the caster sees.
    pub private: Option<String>,
    /// Structured payload.
    pub data: Option<AbilityData>,
}

impl AbilityOutcome {
    /// An outcome with only a public line.
    pub fn public(text: impl Into<String>) -> Self {
        Self {
            public: text.into(),
            private: None,
            data: None,
        }
    }

    /// Adds a caster-only line.
    #[must_use]
    pub fn with_private(mut self, text: impl Into<String>) -> Self {
        self.private = Some(text.into());
        self
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_data(mut self, data: AbilityData) -> Self {
        self.data = Some(data);
        self
    }
}

/// The result handed back to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityResult {
    /// Whether the ability took effect.
    pub success: bool,
    /// Public line, or the failure reason.
    pub public_message: String,
    /// Caster-only line.
    pub private_message: Option<String>,
    /// Structured payload.
    pub data: Option<AbilityData>,
}

impl From<std::result::Result<AbilityOutcome, AbilityError>> for AbilityResult {
    fn from(result: std::result::Result<AbilityOutcome, AbilityError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                public_message: outcome.public,
                private_message: outcome.private,
                data: outcome.data,
            },
            Err(err) => Self {
                success: false,
                public_message: err.to_string(),
                private_message: None,
                data: None,
            },
        }
    }
}

// =============================================================================
// Handler context
// =============================================================================

/// The state captured before the most recent successful ability.
#[derive(Debug, Clone)]
pub struct UndoSlot {
    /// World before the ability ran.
    pub world: World,
    /// The ability that ran.
    pub ability: Ability,
    /// Who cast it.
    pub caster: PlayerId,
}

/// Everything a handler may read or write.
pub struct AbilityContext<'a> {
    /// The ability being run.
    pub ability: Ability,
    /// The request.
    pub request: &'a AbilityRequest,
    /// The world, written in place.
    pub world: &'a mut World,
    /// City data and province classification.
    pub catalog: &'a dyn GameCatalog,
    /// The most recent undoable activation.
    pub undo: Option<&'a UndoSlot>,
}

impl fmt::Debug for AbilityContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbilityContext")
            .field("ability", &self.ability)
            .field("request", &self.request)
            .field("round", &self.world.round)
            .finish_non_exhaustive()
    }
}

impl AbilityContext<'_> {
    /// The caster.
    #[must_use]
    pub fn caster(&self) -> PlayerId {
        self.request.caster
    }

    /// The caster's display name.
    #[must_use]
    pub fn caster_name(&self) -> String {
        self.world.player_name(self.caster())
    }

    pub(crate) fn invalid(&self, reason: impl Into<String>) -> AbilityError {
        AbilityError::InvalidTarget {
            ability: self.ability,
            reason: reason.into(),
        }
    }

    pub(crate) fn unmet(&self, reason: impl Into<String>) -> AbilityError {
        AbilityError::PreconditionNotMet {
            ability: self.ability,
            reason: reason.into(),
        }
    }

    pub(crate) fn inconsistent(&self, detail: impl Into<String>) -> AbilityError {
        AbilityError::InconsistentState {
            ability: self.ability,
            detail: detail.into(),
        }
    }

    /// Charges the registry cost.
    pub(crate) fn debit(&mut self) -> Result<u32> {
        let caster = self.caster();
        self.world.ledger.try_debit(self.ability, caster)
    }

    /// The opposing player, checked for existence and the hard block.
    pub(crate) fn hostile_target(&self) -> Result<PlayerId> {
        let target = self
            .request
            .target_player
            .ok_or_else(|| self.invalid("a target player is required"))?;
        if target == self.caster() {
            return Err(self.invalid("cannot target yourself"));
        }
        if !self.world.is_active(target) {
            return Err(self.invalid(format!("{target} is not in the game")));
        }
        if self
            .world
            .status
            .is_hard_blocked(target, self.caster(), self.ability)
        {
            return Err(AbilityError::BlockedByShield {
                ability: self.ability,
                target: self.world.player_name(target),
            });
        }
        Ok(target)
    }

    /// The `index`-th requested city name.
    pub(crate) fn city_arg(&self, index: usize) -> Result<&str> {
        self.request
            .target_cities
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| self.invalid("a city name is required"))
    }

    /// The caster's alive city named by the `index`-th argument.
    pub(crate) fn own_city(&self, index: usize) -> Result<CityKey> {
        let name = self.city_arg(index)?;
        let key = self
            .world
            .city_key_by_name(self.caster(), name)
            .ok_or_else(|| self.invalid(format!("you do not own {name}")))?;
        self.require_alive(key)?;
        Ok(key)
    }

    /// `target`'s alive city named by the `index`-th argument, which the caster
    /// must know.
    pub(crate) fn opponent_city(&self, target: PlayerId, index: usize) -> Result<CityKey> {
        let name = self.city_arg(index)?;
        let key = self
            .world
            .city_key_by_name(target, name)
            .filter(|key| self.world.status.is_known(self.caster(), *key))
            .ok_or_else(|| self.invalid(format!("no known city {name}")))?;
        self.require_alive(key)?;
        Ok(key)
    }

    fn require_alive(&self, key: CityKey) -> Result<()> {
        let city = self.city(key)?;
        if city.alive {
            Ok(())
        } else {
            Err(self.invalid(format!("{} is destroyed", city.name)))
        }
    }

    /// A city that validation already found.
    pub(crate) fn city(&self, key: CityKey) -> Result<&City> {
        self.world
            .city(key)
            .ok_or_else(|| self.inconsistent(format!("city {key} vanished")))
    }

    /// A city that validation already found, mutably.
    pub(crate) fn city_mut(&mut self, key: CityKey) -> Result<&mut City> {
        let ability = self.ability;
        self.world
            .city_mut(key)
            .ok_or_else(|| AbilityError::InconsistentState {
                ability,
                detail: format!("city {key} vanished"),
            })
    }

    /// Hits a city outside battle, consulting its shields first.
    pub(crate) fn strike(&mut self, key: CityKey, damage: u64) -> Result<AbilityData> {
        let name = self.city(key)?.name.clone();
        if damage > 0 && self.world.status.consume_shield(key) {
            return Ok(AbilityData::Strike {
                city: name,
                damage: 0,
                blocked: true,
                destroyed: false,
            });
        }
        let applied = self.city_mut(key)?.apply_damage(damage);
        let destroyed = !self.city(key)?.alive;
        if destroyed {
            self.world.destroy_city(key);
        }
        Ok(AbilityData::Strike {
            city: name,
            damage: applied,
            blocked: false,
            destroyed,
        })
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Gates, runs and books one ability activation.
///
/// # Errors
///
/// Any [`AbilityError`]. On error the world may be partially written; the
/// caller restores its snapshot.
pub fn dispatch(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let ability = cx.ability;
    let caster = cx.caster();

    if cx.world.phase != Phase::AbilityWindow {
        return Err(AbilityError::OutsideAbilityWindow {
            ability,
            phase: cx.world.phase,
        });
    }
    if !cx.world.is_active(caster) {
        return Err(cx.invalid(format!("{caster} is not in the game")));
    }
    if let Some(reason) = cx.world.ledger.disabled_reason(ability, caster) {
        return Err(AbilityError::AbilityDisabled { ability, reason });
    }
    let rounds = cx.world.ledger.remaining_cooldown(ability, caster);
    if rounds > 0 {
        return Err(AbilityError::OnCooldown { ability, rounds });
    }
    if let (Some(cap), Some(0)) = (
        ability.usage_cap(),
        cx.world.ledger.remaining_uses(ability, caster),
    ) {
        return Err(AbilityError::UsageCapReached { ability, cap });
    }

    let outcome = run(cx)?;

    cx.world.ledger.record_use(ability, caster)?;
    cx.world
        .ledger
        .start_cooldown(ability, caster, ability.cooldown());
    Ok(outcome)
}

fn run(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    match cx.ability {
        Ability::HoldPosition => battle::hold_position(cx),
        Ability::CaptureTheKing => battle::capture_the_king(cx),
        Ability::ShadowArmy => battle::shadow_army(cx),
        Ability::BraveUnderFire => battle::brave_under_fire(cx),
        Ability::AttractAttack => battle::attract_attack(cx),
        Ability::SafeArrival => battle::safe_arrival(cx),
        Ability::IronWall => battle::iron_wall(cx),
        Ability::LastStand => battle::last_stand(cx),
        Ability::MutualDestruction => battle::mutual_destruction(cx),
        Ability::Berserk => battle::berserk(cx),
        Ability::Counterstrike => battle::counterstrike(cx),
        Ability::RestAndWait => battle::rest_and_wait(cx),
        Ability::StrawBoats => battle::straw_boats(cx),
        Ability::Loot => battle::loot(cx),
        Ability::Feint => battle::feint(cx),
        Ability::Besiege => battle::besiege(cx),
        Ability::Trap => battle::trap(cx),
        Ability::SetBarrier => defense::set_barrier(cx),
        Ability::CityProtection => defense::city_protection(cx),
        Ability::IronCity => defense::iron_city(cx),
        Ability::QuickHeal => defense::quick_heal(cx),
        Ability::AdvancedHeal => defense::advanced_heal(cx),
        Ability::Invulnerable => defense::invulnerable(cx),
        Ability::Anchor => defense::anchor(cx),
        Ability::Disguise => defense::disguise(cx),
        Ability::Solidarity => defense::solidarity(cx),
        Ability::PurpleChamber => defense::purple_chamber(cx),
        Ability::SubCenter => defense::sub_center(cx),
        Ability::Revive => defense::revive(cx),
        Ability::TransferGold => economy::transfer_gold(cx),
        Ability::GoldLoan => economy::gold_loan(cx),
        Ability::CostInflation => economy::cost_inflation(cx),
        Ability::Embargo => economy::embargo(cx),
        Ability::FinancialCrisis => economy::financial_crisis(cx),
        Ability::Momentum => economy::momentum(cx),
        Ability::StareDown => economy::stare_down(cx),
        Ability::Conjure => economy::conjure(cx),
        Ability::Foresight => tactics::foresight(cx),
        Ability::RoyalExpedition => tactics::royal_expedition(cx),
        Ability::Potential => tactics::potential_surge(cx),
        Ability::JadeShatter => tactics::jade_shatter(cx),
        Ability::DizzySwap => tactics::dizzy_swap(cx),
        Ability::CastBrick => tactics::cast_brick(cx),
        Ability::PreemptiveSwap => tactics::preemptive_swap(cx),
        Ability::CityDetective => tactics::city_detective(cx),
        Ability::KeenInsight => tactics::keen_insight(cx),
        Ability::ConsecutiveStrike => tactics::consecutive_strike(cx),
        Ability::HostageExchange => tactics::hostage_exchange(cx),
        Ability::Rollback => tactics::rollback(cx),
    }
}
