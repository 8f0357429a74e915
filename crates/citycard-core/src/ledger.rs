//! Resource Ledger: gold, ability costs, usage caps, cooldowns and bans.
//!
//! The ledger is the only place gold changes. Every balance stays within
//! `[0, gold_cap]`: credits clamp at the cap and debits fail rather than go
//! negative.
//!
//! # Cost pipeline
//!
//! 1. Base cost from the ability registry (or a handler-supplied base).
//! 2. Inflation mark: bases of 8 or more cost `ceil(base * 1.5)` and the mark is
//!    consumed by the debit.
//! 3. Discount accumulator: minus a percentage per distinct ability the caster
//!    has already used, capped, rounded up.
//!
//! # Example
//!
//! ```
//! use citycard_core::ability::Ability;
//! use citycard_core::entity::PlayerId;
//! use citycard_core::ledger::ResourceLedger;
//!
//! let alice = PlayerId::new(0);
//! let mut ledger = ResourceLedger::new(24);
//! ledger.open_account(alice, 20);
//! ledger.mark_inflation(alice);
//!
//! assert_eq!(ledger.cost(Ability::RoyalExpedition, alice), 12);
//! assert_eq!(ledger.try_debit(Ability::RoyalExpedition, alice), Ok(12));
//! assert_eq!(ledger.gold(alice), 8);
//! assert!(!ledger.has_inflation_mark(alice));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ability::Ability;
use crate::entity::PlayerId;
use crate::error::{AbilityError, Result};

/// Base cost at or above which the inflation mark applies.
pub const INFLATION_THRESHOLD: u32 = 8;

/// A caster's discount accumulator settings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    /// Percent off per distinct ability already used.
    pub percent_per_distinct: u32,
    /// Maximum percent off.
    pub cap_percent: u32,
}

/// Per-player balance and cost state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Current gold.
    pub gold: u32,
    /// Next debit of a base-8+ ability costs half again.
    pub inflation_mark: bool,
    /// Rounds during which base income is suspended.
    pub loan_rounds: u32,
    /// Discount accumulator, if enabled.
    pub discount: Option<Discount>,
    /// Distinct abilities successfully paid for.
    pub used: BTreeSet<Ability>,
}

/// The price of one activation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Gold to deduct.
    pub cost: u32,
    /// Whether paying consumes the inflation mark.
    pub consumes_mark: bool,
}

/// Gold, usage counters, cooldowns and bans for every player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLedger {
    gold_cap: u32,
    accounts: BTreeMap<PlayerId, Account>,
    usage: BTreeMap<(PlayerId, Ability), u32>,
    cooldowns: BTreeMap<(PlayerId, Ability), u32>,
    bans: BTreeMap<(PlayerId, Ability), u32>,
    stare_downs: BTreeMap<PlayerId, u32>,
}

impl ResourceLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new(gold_cap: u32) -> Self {
        Self {
            gold_cap,
            accounts: BTreeMap::new(),
            usage: BTreeMap::new(),
            cooldowns: BTreeMap::new(),
            bans: BTreeMap::new(),
            stare_downs: BTreeMap::new(),
        }
    }

    /// The configured cap.
    #[must_use]
    pub const fn gold_cap(&self) -> u32 {
        self.gold_cap
    }

    /// Opens an account with the given balance, clamped to the cap.
    pub fn open_account(&mut self, player: PlayerId, gold: u32) {
        self.accounts.insert(
            player,
            Account {
                gold: gold.min(self.gold_cap),
                ..Account::default()
            },
        );
    }

    /// Returns the account of `player`.
    #[must_use]
    pub fn account(&self, player: PlayerId) -> Option<&Account> {
        self.accounts.get(&player)
    }

    /// Current gold (0 for unknown players).
    #[must_use]
    pub fn gold(&self, player: PlayerId) -> u32 {
        self.accounts.get(&player).map_or(0, |a| a.gold)
    }

    /// Adds gold, clamped at the cap.
    ///
    /// # Returns
    ///
    /// The amount actually credited.
    pub fn credit(&mut self, player: PlayerId, amount: u32) -> u32 {
        let cap = self.gold_cap;
        let Some(account) = self.accounts.get_mut(&player) else {
            return 0;
        };
        let before = account.gold;
        account.gold = account.gold.saturating_add(amount).min(cap);
        account.gold - before
    }

    /// Removes up to `amount` gold.
    ///
    /// # Returns
    ///
    /// The amount actually removed.
    pub fn take_up_to(&mut self, player: PlayerId, amount: u32) -> u32 {
        let Some(account) = self.accounts.get_mut(&player) else {
            return 0;
        };
        let taken = amount.min(account.gold);
        account.gold -= taken;
        taken
    }

    /// Room left under the cap.
    #[must_use]
    pub fn headroom(&self, player: PlayerId) -> u32 {
        self.gold_cap.saturating_sub(self.gold(player))
    }

    // -------------------------------------------------------------------------
    // Costs
    // -------------------------------------------------------------------------

    /// Actual cost of `ability` for `caster` right now.
    #[must_use]
    pub fn cost(&self, ability: Ability, caster: PlayerId) -> u32 {
        self.quote(caster, ability.base_cost()).cost
    }

    /// Prices an activation with an explicit base cost.
    #[must_use]
    pub fn quote(&self, caster: PlayerId, base: u32) -> Quote {
        let Some(account) = self.accounts.get(&caster) else {
            return Quote {
                cost: base,
                consumes_mark: false,
            };
        };
        let consumes_mark = account.inflation_mark && base >= INFLATION_THRESHOLD;
        let mut cost = if consumes_mark {
            (base * 3).div_ceil(2)
        } else {
            base
        };
        if let Some(discount) = account.discount {
            let distinct = u32::try_from(account.used.len()).unwrap_or(u32::MAX);
            let percent = discount
                .percent_per_distinct
                .saturating_mul(distinct)
                .min(discount.cap_percent)
                .min(100);
            cost = (cost * (100 - percent)).div_ceil(100);
        }
        Quote {
            cost,
            consumes_mark,
        }
    }

    /// Why `ability` is administratively disabled for `caster`, if it is.
    #[must_use]
    pub fn disabled_reason(&self, ability: Ability, caster: PlayerId) -> Option<String> {
        if let Some(rounds) = self.stare_downs.get(&caster) {
            return Some(format!("under a stare-down for {rounds} more round(s)"));
        }
        self.bans
            .get(&(caster, ability))
            .map(|rounds| format!("embargoed for {rounds} more round(s)"))
    }

    /// Charges the registry cost of `ability` to `caster`.
    ///
    /// # Errors
    ///
    /// `AbilityDisabled` if banned or stared down, `InsufficientGold` if the
    /// caster cannot pay. Nothing changes on error.
    pub fn try_debit(&mut self, ability: Ability, caster: PlayerId) -> Result<u32> {
        self.try_debit_with_base(ability, caster, ability.base_cost())
    }

    /// Charges `caster` for `ability` priced from an explicit base cost.
    ///
    /// # Errors
    ///
    /// Same as [`try_debit`](Self::try_debit).
    pub fn try_debit_with_base(
        &mut self,
        ability: Ability,
        caster: PlayerId,
        base: u32,
    ) -> Result<u32> {
        if let Some(reason) = self.disabled_reason(ability, caster) {
            return Err(AbilityError::AbilityDisabled { ability, reason });
        }
        let quote = self.quote(caster, base);
        let account = self
            .accounts
            .get_mut(&caster)
            .ok_or_else(|| AbilityError::InconsistentState {
                ability,
                detail: format!("no account for {caster}"),
            })?;
        if account.gold < quote.cost {
            return Err(AbilityError::InsufficientGold {
                ability,
                needed: quote.cost,
                available: account.gold,
            });
        }
        account.gold -= quote.cost;
        if quote.consumes_mark {
            account.inflation_mark = false;
        }
        account.used.insert(ability);
        debug!(%ability, %caster, cost = quote.cost, "debited");
        Ok(quote.cost)
    }

    /// Takes an already-priced payment for `ability` from `caster`.
    ///
    /// Used when a debit made against one copy of the world has to be carried
    /// into another, so the price is not recomputed.
    ///
    /// # Errors
    ///
    /// `InsufficientGold` if the balance is short. Nothing changes on error.
    pub fn charge(
        &mut self,
        ability: Ability,
        caster: PlayerId,
        amount: u32,
        consume_mark: bool,
    ) -> Result<()> {
        let account = self
            .accounts
            .get_mut(&caster)
            .ok_or_else(|| AbilityError::InconsistentState {
                ability,
                detail: format!("no account for {caster}"),
            })?;
        if account.gold < amount {
            return Err(AbilityError::InsufficientGold {
                ability,
                needed: amount,
                available: account.gold,
            });
        }
        account.gold -= amount;
        if consume_mark {
            account.inflation_mark = false;
        }
        account.used.insert(ability);
        Ok(())
    }

    /// Sets the inflation mark on `player`.
    pub fn mark_inflation(&mut self, player: PlayerId) {
        if let Some(account) = self.accounts.get_mut(&player) {
            account.inflation_mark = true;
        }
    }

    /// Whether `player` carries the inflation mark.
    #[must_use]
    pub fn has_inflation_mark(&self, player: PlayerId) -> bool {
        self.accounts.get(&player).is_some_and(|a| a.inflation_mark)
    }

    /// Enables the discount accumulator for `player`.
    pub fn enable_discount(&mut self, player: PlayerId, discount: Discount) {
        if let Some(account) = self.accounts.get_mut(&player) {
            account.discount = Some(discount);
        }
    }

    // -------------------------------------------------------------------------
    // Usage caps and cooldowns
    // -------------------------------------------------------------------------

    /// Times `caster` has successfully used `ability` this game.
    #[must_use]
    pub fn uses(&self, ability: Ability, caster: PlayerId) -> u32 {
        self.usage.get(&(caster, ability)).copied().unwrap_or(0)
    }

    /// Uses left under the cap, or `None` if the ability is uncapped.
    #[must_use]
    pub fn remaining_uses(&self, ability: Ability, caster: PlayerId) -> Option<u32> {
        ability
            .usage_cap()
            .map(|cap| cap.saturating_sub(self.uses(ability, caster)))
    }

    /// Increments the usage counter.
    ///
    /// # Errors
    ///
    /// `UsageCapReached` if the counter is already at the cap.
    pub fn record_use(&mut self, ability: Ability, caster: PlayerId) -> Result<()> {
        if let Some(cap) = ability.usage_cap() {
            if self.uses(ability, caster) >= cap {
                return Err(AbilityError::UsageCapReached { ability, cap });
            }
        }
        *self.usage.entry((caster, ability)).or_insert(0) += 1;
        Ok(())
    }

    /// Rounds of cooldown left (0 if ready).
    #[must_use]
    pub fn remaining_cooldown(&self, ability: Ability, caster: PlayerId) -> u32 {
        self.cooldowns.get(&(caster, ability)).copied().unwrap_or(0)
    }

    /// Starts a cooldown. A zero-round cooldown is a no-op.
    pub fn start_cooldown(&mut self, ability: Ability, caster: PlayerId, rounds: u32) {
        if rounds > 0 {
            self.cooldowns.insert((caster, ability), rounds);
        }
    }

    // -------------------------------------------------------------------------
    // Bans, stare-downs, loans
    // -------------------------------------------------------------------------

    /// Bans `ability` for `player` for `rounds`.
    pub fn ban(&mut self, player: PlayerId, ability: Ability, rounds: u32) {
        if rounds > 0 {
            self.bans.insert((player, ability), rounds);
        }
    }

    /// Disables every ability for `player` for `rounds`.
    pub fn stare_down(&mut self, player: PlayerId, rounds: u32) {
        if rounds > 0 {
            self.stare_downs.insert(player, rounds);
        }
    }

    /// Starts a loan: base income is suspended for `rounds`.
    pub fn start_loan(&mut self, player: PlayerId, rounds: u32) {
        if let Some(account) = self.accounts.get_mut(&player) {
            account.loan_rounds = rounds;
        }
    }

    /// Rounds of suspended income left.
    #[must_use]
    pub fn loan_rounds(&self, player: PlayerId) -> u32 {
        self.accounts.get(&player).map_or(0, |a| a.loan_rounds)
    }

    // -------------------------------------------------------------------------
    // Expiry
    // -------------------------------------------------------------------------

    /// Decrements every ban, dropping those that reach zero.
    pub fn tick_bans(&mut self) {
        tick_map(&mut self.bans);
    }

    /// Decrements every cooldown, dropping those that reach zero.
    pub fn tick_cooldowns(&mut self) {
        tick_map(&mut self.cooldowns);
    }

    /// Decrements every stare-down, dropping those that reach zero.
    pub fn tick_stare_downs(&mut self) {
        tick_map(&mut self.stare_downs);
    }

    /// Decrements every loan counter.
    pub fn tick_loans(&mut self) {
        for account in self.accounts.values_mut() {
            account.loan_rounds = account.loan_rounds.saturating_sub(1);
        }
    }
}

/// Decrements every counter in `map` and removes the ones that hit zero.
pub(crate) fn tick_map<K: Ord>(map: &mut BTreeMap<K, u32>) {
    map.retain(|_, rounds| {
        *rounds = rounds.saturating_sub(1);
        *rounds > 0
    });
}
