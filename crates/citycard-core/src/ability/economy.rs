//! Gold, cost manipulation, bans and acquisition.

use rand::Rng;

use crate::ability::Ability;
use crate::catalog::AdministrativeRank;
use crate::error::{AbilityError, Result};
use crate::ledger::Discount;

use super::{AbilityContext, AbilityData, AbilityOutcome};

/// Gold granted by a loan.
pub const LOAN_AMOUNT: u32 = 5;
/// Rounds of suspended income after a loan.
pub const LOAN_ROUNDS: u32 = 2;
/// Rounds a financial crisis lasts.
pub const CRISIS_ROUNDS: u32 = 3;
/// Discount granted by momentum.
pub const MOMENTUM_DISCOUNT: Discount = Discount {
    percent_per_distinct: 10,
    cap_percent: 30,
};

/// Price of an embargo on `banned`: half its base cost, rounded up, within 1..=8.
#[must_use]
pub const fn embargo_base_cost(banned: Ability) -> u32 {
    let half = banned.base_cost().div_ceil(2);
    if half < 1 {
        1
    } else if half > 8 {
        8
    } else {
        half
    }
}

/// Moves gold from the caster to the target.
pub fn transfer_gold(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    let amount = cx
        .request
        .amount
        .filter(|a| *a > 0)
        .ok_or_else(|| cx.invalid("a positive amount is required"))?;
    let caster = cx.caster();
    let available = cx.world.ledger.gold(caster);
    if available < amount {
        return Err(AbilityError::InsufficientGold {
            ability: cx.ability,
            needed: amount,
            available,
        });
    }
    if cx.world.ledger.headroom(target) < amount {
        return Err(cx.unmet(format!(
            "{} cannot hold {amount} more gold",
            cx.world.player_name(target)
        )));
    }
    cx.debit()?;
    let taken = cx.world.ledger.take_up_to(caster, amount);
    let credited = cx.world.ledger.credit(target, taken);
    if credited != amount {
        return Err(cx.inconsistent("transfer amount changed mid-flight"));
    }
    Ok(AbilityOutcome::public(format!(
        "{} gave {amount} gold to {}",
        cx.caster_name(),
        cx.world.player_name(target)
    ))
    .with_data(AbilityData::Transferred { amount }))
}

/// Borrows gold against future income.
pub fn gold_loan(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let caster = cx.caster();
    if cx.world.ledger.loan_rounds(caster) > 0 {
        return Err(cx.unmet("a loan is still outstanding"));
    }
    cx.debit()?;
    let credited = cx.world.ledger.credit(caster, LOAN_AMOUNT);
    cx.world.ledger.start_loan(caster, LOAN_ROUNDS);
    Ok(AbilityOutcome::public(format!(
        "{} took a loan of {credited} gold; income is suspended for {LOAN_ROUNDS} rounds",
        cx.caster_name()
    )))
}

/// The target's next expensive ability costs half again.
pub fn cost_inflation(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    if cx.world.ledger.has_inflation_mark(target) {
        return Err(cx.unmet(format!(
            "{} is already under inflation",
            cx.world.player_name(target)
        )));
    }
    cx.debit()?;
    cx.world.ledger.mark_inflation(target);
    Ok(AbilityOutcome::public(format!(
        "{} inflated {}'s costs",
        cx.caster_name(),
        cx.world.player_name(target)
    )))
}

/// Bans one ability for the target.
pub fn embargo(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    let name = cx
        .request
        .argument
        .as_deref()
        .ok_or_else(|| cx.invalid("name the ability to embargo"))?;
    let banned: Ability = name
        .parse()
        .map_err(|_| cx.invalid(format!("'{name}' is not an ability")))?;
    let caster = cx.caster();
    cx.world
        .ledger
        .try_debit_with_base(cx.ability, caster, embargo_base_cost(banned))?;
    let rounds = cx.world.config().ban_rounds;
    cx.world.ledger.ban(target, banned, rounds);
    Ok(AbilityOutcome::public(format!(
        "{} embargoed {banned} for {} ({rounds} rounds)",
        cx.caster_name(),
        cx.world.player_name(target)
    )))
}

/// Every player's income drops for a few rounds.
pub fn financial_crisis(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    if cx.world.status.financial_crisis_active() {
        return Err(cx.unmet("a financial crisis is already under way"));
    }
    cx.debit()?;
    cx.world.status.start_financial_crisis(CRISIS_ROUNDS);
    Ok(AbilityOutcome::public(format!(
        "{} triggered a financial crisis: income is reduced for {CRISIS_ROUNDS} rounds",
        cx.caster_name()
    )))
}

/// Enables the caster's discount accumulator.
pub fn momentum(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let caster = cx.caster();
    if cx
        .world
        .ledger
        .account(caster)
        .is_some_and(|a| a.discount.is_some())
    {
        return Err(cx.unmet("momentum is already building"));
    }
    cx.debit()?;
    cx.world.ledger.enable_discount(caster, MOMENTUM_DISCOUNT);
    Ok(AbilityOutcome::public(format!(
        "{} is building momentum",
        cx.caster_name()
    )))
}

/// The target cannot activate abilities for a while.
pub fn stare_down(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    cx.debit()?;
    let rounds = cx.world.config().stare_down_rounds;
    cx.world.ledger.stare_down(target, rounds);
    Ok(AbilityOutcome::public(format!(
        "{} stared down {} for {rounds} rounds",
        cx.caster_name(),
        cx.world.player_name(target)
    )))
}

/// Draws a random ordinary city from the unused pool.
///
/// The candidate set is checked for emptiness before the RNG is touched, and
/// the drawn name leaves the pool in the same step it joins the roster.
pub fn conjure(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let caster = cx.caster();
    let roster = cx.world.player(caster).map_or(0, |p| p.cities.len());
    if roster >= cx.world.config().max_roster {
        return Err(cx.unmet("the roster is full"));
    }
    let candidates: Vec<String> = cx
        .world
        .pool()
        .iter()
        .filter(|name| cx.catalog.rank_of(name) == Some(AdministrativeRank::Ordinary))
        .cloned()
        .collect();
    if candidates.is_empty() {
        return Err(cx.unmet("no ordinary city is left in the pool"));
    }
    cx.debit()?;
    let pick = cx.world.rng_mut().gen_range(0..candidates.len());
    let name = &candidates[pick];
    let base = cx
        .catalog
        .lookup_base_city(name)
        .ok_or_else(|| cx.inconsistent(format!("{name} left the catalog")))?;
    let key = cx
        .world
        .grant_city(caster, name, &base)
        .ok_or_else(|| cx.inconsistent("caster vanished"))?;
    let hp = cx.city(key)?.current_hp;
    Ok(
        AbilityOutcome::public(format!("{} conjured a new city", cx.caster_name()))
            .with_private(format!("{name} ({hp} HP) joined your roster"))
            .with_data(AbilityData::Acquired {
                city: name.clone(),
                hp,
            }),
    )
}
