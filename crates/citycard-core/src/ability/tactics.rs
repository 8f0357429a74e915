//! Immediate strikes, swaps, intelligence and rollback.

use rand::Rng;

use crate::entity::{CityKey, PlayerId};
use crate::error::{AbilityError, Result};
use crate::status::LockoutReason;

use super::{AbilityContext, AbilityData, AbilityOutcome};

/// Damage of a successful foresight strike.
pub const FORESIGHT_DAMAGE: u64 = 5000;
/// HP ceiling of a potential surge.
pub const POTENTIAL_CAP: u64 = 100_000;
/// Rounds a bricked city sits on the bench.
pub const BENCH_ROUNDS: u32 = 5;

/// Alive declared cities of `player`, as keys.
fn declared_alive(cx: &AbilityContext<'_>, player: PlayerId) -> Vec<CityKey> {
    cx.world
        .declared_deployment(player)
        .iter()
        .map(|id| CityKey::new(player, *id))
        .filter(|key| cx.world.city(*key).is_some_and(|c| c.alive))
        .collect()
}

/// The weakest city among `keys`; ties go to the earliest.
fn weakest(cx: &AbilityContext<'_>, keys: &[CityKey]) -> Option<(CityKey, u64)> {
    keys.iter()
        .filter_map(|key| cx.world.city(*key).map(|c| (*key, c.current_hp)))
        .fold(None, |best, (key, hp)| match best {
            Some((_, best_hp)) if best_hp <= hp => best,
            _ => Some((key, hp)),
        })
}

/// Whether a city may change hands through a swap.
fn swappable(cx: &AbilityContext<'_>, key: CityKey) -> bool {
    cx.world.city(key).is_some_and(|c| c.alive && !c.is_center)
        && !cx.world.status.is_locked(key)
        && cx.world.status.iron_charges(key) == 0
}

/// Alive roster cities of `player` that a swap may take, shields excluded.
fn tradeable(cx: &AbilityContext<'_>, player: PlayerId) -> Vec<CityKey> {
    cx.world
        .player(player)
        .map(|p| {
            p.alive_cities()
                .map(|c| CityKey::new(player, c.id))
                .filter(|key| swappable(cx, *key) && !cx.world.status.has_protection(*key))
                .collect()
        })
        .unwrap_or_default()
}

fn transfer(cx: &mut AbilityContext<'_>, from: CityKey, to: PlayerId) -> Result<CityKey> {
    let ability = cx.ability;
    cx.world
        .transfer_city(from, to)
        .ok_or_else(|| AbilityError::InconsistentState {
            ability,
            detail: format!("city {from} could not be moved"),
        })
}

/// Strikes the target's weakest declared city if the caster's is weaker still.
pub fn foresight(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    let caster = cx.caster();
    let own = declared_alive(cx, caster);
    let theirs = declared_alive(cx, target);
    let (Some((_, own_hp)), Some((victim, their_hp))) = (weakest(cx, &own), weakest(cx, &theirs))
    else {
        return Err(cx.unmet("both players must have declared a deployment"));
    };
    if own_hp >= their_hp {
        return Err(cx.unmet("your weakest city is not the weaker one"));
    }
    cx.debit()?;
    let data = cx.strike(victim, FORESIGHT_DAMAGE)?;
    Ok(AbilityOutcome::public(format!(
        "{} foresaw {}'s deployment and struck first",
        cx.caster_name(),
        cx.world.player_name(target)
    ))
    .with_data(data))
}

/// Destroys the target's strongest non-center city.
pub fn royal_expedition(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    let caster = cx.caster();
    let center_alive = cx
        .world
        .player(caster)
        .is_some_and(|p| p.cities.values().any(|c| c.is_center && c.alive));
    if !center_alive {
        return Err(cx.unmet("your center city must be alive"));
    }
    let victim = cx
        .world
        .player(target)
        .and_then(|p| {
            p.alive_cities()
                .filter(|c| !c.is_center)
                .fold(None::<(u64, _)>, |best, c| match best {
                    Some((hp, _)) if hp >= c.current_hp => best,
                    _ => Some((c.current_hp, c.id)),
                })
        })
        .map(|(_, id)| CityKey::new(target, id))
        .ok_or_else(|| cx.unmet("the target has no city to strike"))?;
    cx.debit()?;
    let hp = cx.city(victim)?.current_hp;
    let data = cx.strike(victim, hp)?;
    let public = match &data {
        AbilityData::Strike { city, blocked: true, .. } => {
            format!("{}'s royal expedition was turned back at {city}", cx.caster_name())
        }
        AbilityData::Strike { city, .. } => {
            format!("{}'s royal expedition razed {city}", cx.caster_name())
        }
        _ => return Err(cx.inconsistent("strike reported no hit")),
    };
    Ok(AbilityOutcome::public(public).with_data(data))
}

/// Doubles every alive own city.
pub fn potential_surge(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let caster = cx.caster();
    let keys: Vec<CityKey> = cx
        .world
        .player(caster)
        .map(|p| p.alive_cities().map(|c| CityKey::new(caster, c.id)).collect())
        .unwrap_or_default();
    cx.debit()?;
    let mut grown = Vec::with_capacity(keys.len());
    for key in keys {
        let city = cx.city_mut(key)?;
        let before = city.current_hp;
        let hp = before.saturating_mul(2).min(POTENTIAL_CAP).max(before);
        city.set_hp_raising_max(hp);
        grown.push((city.name.clone(), hp - before));
    }
    Ok(AbilityOutcome::public(format!(
        "{}'s cities surged with potential",
        cx.caster_name()
    ))
    .with_data(AbilityData::Healed { cities: grown }))
}

/// Strips a known enemy city's Protection and jade-marks it.
pub fn jade_shatter(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    let key = cx.opponent_city(target, 0)?;
    if cx.world.status.jade_mark(key).is_some() {
        return Err(cx.unmet("that city is already shattered"));
    }
    cx.debit()?;
    let caster = cx.caster();
    cx.world.status.clear_protection(key);
    cx.world.status.set_jade_mark(key, caster);
    Ok(AbilityOutcome::public(format!(
        "{} shattered {}'s {}",
        cx.caster_name(),
        cx.world.player_name(target),
        cx.world.city_name(key)
    )))
}

/// Halves two known enemy cities in quick succession.
pub fn consecutive_strike(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    let first = cx.opponent_city(target, 0)?;
    let second = cx.opponent_city(target, 1)?;
    if first == second {
        return Err(cx.invalid("choose two different cities"));
    }
    cx.debit()?;
    let mut report = Vec::with_capacity(2);
    for key in [first, second] {
        let damage = cx.city(key)?.current_hp / 2;
        match cx.strike(key, damage)? {
            AbilityData::Strike { city, blocked: true, .. } => {
                report.push(format!("{city} was shielded"));
            }
            AbilityData::Strike { city, damage, .. } => {
                report.push(format!("{city} lost {damage} HP"));
            }
            _ => return Err(cx.inconsistent("strike reported no hit")),
        }
    }
    Ok(AbilityOutcome::public(format!(
        "{} struck {} twice: {}",
        cx.caster_name(),
        cx.world.player_name(target),
        report.join(", ")
    )))
}

/// Swaps one random swappable declared city of each side.
pub fn dizzy_swap(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    let caster = cx.caster();
    let mine: Vec<CityKey> = declared_alive(cx, caster)
        .into_iter()
        .filter(|k| swappable(cx, *k))
        .collect();
    let theirs: Vec<CityKey> = declared_alive(cx, target)
        .into_iter()
        .filter(|k| swappable(cx, *k))
        .collect();
    if mine.is_empty() || theirs.is_empty() {
        return Err(cx.unmet("both sides need a swappable declared city"));
    }
    cx.debit()?;
    let given = mine[cx.world.rng_mut().gen_range(0..mine.len())];
    let taken = theirs[cx.world.rng_mut().gen_range(0..theirs.len())];
    let given_name = cx.world.city_name(given);
    let received_name = cx.world.city_name(taken);
    transfer(cx, given, target)?;
    transfer(cx, taken, caster)?;
    Ok(AbilityOutcome::public(format!(
        "{} and {} swapped {given_name} for {received_name}",
        cx.caster_name(),
        cx.world.player_name(target)
    ))
    .with_data(AbilityData::Swapped {
        given: given_name,
        received: received_name,
    }))
}

/// Benches the caster's weakest declared non-center city.
pub fn cast_brick(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let caster = cx.caster();
    let candidates: Vec<CityKey> = declared_alive(cx, caster)
        .into_iter()
        .filter(|k| cx.world.city(*k).is_some_and(|c| !c.is_center))
        .collect();
    let (key, original_hp) = weakest(cx, &candidates)
        .ok_or_else(|| cx.unmet("no declared non-center city to bench"))?;
    cx.debit()?;
    cx.world
        .lock_out(key, LockoutReason::Benched { original_hp }, BENCH_ROUNDS);
    Ok(AbilityOutcome::public(format!(
        "{} benched {} for {BENCH_ROUNDS} rounds",
        cx.caster_name(),
        cx.world.city_name(key)
    )))
}

/// Trades a chosen own city for a chosen known enemy city.
pub fn preemptive_swap(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    let caster = cx.caster();
    let own = cx.own_city(0)?;
    let theirs = cx.opponent_city(target, 1)?;
    for key in [own, theirs] {
        if !swappable(cx, key) || cx.world.status.has_protection(key) {
            return Err(cx.invalid(format!("{} cannot be swapped", cx.world.city_name(key))));
        }
    }
    cx.debit()?;
    let given = cx.world.city_name(own);
    let received = cx.world.city_name(theirs);
    let given_key = transfer(cx, own, target)?;
    let received_key = transfer(cx, theirs, caster)?;
    cx.world.status.mark_known(caster, given_key);
    cx.world.status.mark_known(target, received_key);
    Ok(AbilityOutcome::public(format!(
        "{} traded {given} to {} for {received}",
        cx.caster_name(),
        cx.world.player_name(target)
    ))
    .with_data(AbilityData::Swapped { given, received }))
}

/// Trades each side's weakest tradeable city; each side learns where its
/// hostage went.
pub fn hostage_exchange(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    let caster = cx.caster();
    let mine = tradeable(cx, caster);
    let theirs = tradeable(cx, target);
    let (Some((own, _)), Some((other, _))) = (weakest(cx, &mine), weakest(cx, &theirs)) else {
        return Err(cx.unmet("both sides need a city that can change hands"));
    };
    cx.debit()?;
    let given = cx.world.city_name(own);
    let received = cx.world.city_name(other);
    let given_key = transfer(cx, own, target)?;
    let received_key = transfer(cx, other, caster)?;
    cx.world.status.mark_known(caster, given_key);
    cx.world.status.mark_known(target, received_key);
    Ok(AbilityOutcome::public(format!(
        "{} and {} exchanged hostages: {given} for {received}",
        cx.caster_name(),
        cx.world.player_name(target)
    ))
    .with_data(AbilityData::Swapped { given, received }))
}

/// Reports the real identity of a known enemy city.
///
/// The city may be named by its real name or by the alias it is disguised as.
pub fn city_detective(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    let caster = cx.caster();
    let shown = cx.city_arg(0)?.to_owned();
    let by_alias = cx.world.player(target).and_then(|p| {
        p.alive_cities()
            .map(|c| CityKey::new(target, c.id))
            .find(|key| {
                cx.world.status.is_known(caster, *key)
                    && cx.world.status.disguise(*key).is_some_and(|d| d.alias == shown)
            })
    });
    let key = match by_alias {
        Some(key) => key,
        None => cx.opponent_city(target, 0)?,
    };
    cx.debit()?;
    let was_disguised = cx.world.status.disguise(key).is_some();
    let city = cx.city(key)?;
    let (name, hp) = (city.name.clone(), city.current_hp);
    Ok(AbilityOutcome::public(format!(
        "{} investigated one of {}'s cities",
        cx.caster_name(),
        cx.world.player_name(target)
    ))
    .with_private(format!("{shown} is really {name} with {hp} HP"))
    .with_data(AbilityData::Inspected {
        name,
        hp,
        was_disguised,
    }))
}

/// Reveals every city of the target to the caster.
pub fn keen_insight(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    let caster = cx.caster();
    cx.debit()?;
    let keys: Vec<CityKey> = cx
        .world
        .player(target)
        .map(|p| p.cities.keys().map(|id| CityKey::new(target, *id)).collect())
        .unwrap_or_default();
    let mut cities = Vec::with_capacity(keys.len());
    for key in keys {
        cx.world.status.mark_known(caster, key);
        cities.push(cx.world.city_name(key));
    }
    Ok(AbilityOutcome::public(format!(
        "{} scouted {}'s roster",
        cx.caster_name(),
        cx.world.player_name(target)
    ))
    .with_private(format!("Revealed: {}", cities.join(", ")))
    .with_data(AbilityData::Revealed { cities }))
}

/// Restores the world captured before the most recent ability.
///
/// The fee is priced and paid in the current world, then the same payment is
/// taken again from the restored balance, since restoring rewinds the ledger
/// too. A restored balance that cannot cover it fails the rollback.
pub fn rollback(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let caster = cx.caster();
    let slot = cx
        .undo
        .ok_or_else(|| cx.unmet("there is nothing to roll back"))?;
    if slot.caster == caster {
        return Err(cx.unmet("you cannot roll back your own ability"));
    }
    if cx
        .world
        .status
        .is_hard_blocked(slot.caster, caster, cx.ability)
    {
        return Err(AbilityError::BlockedByShield {
            ability: cx.ability,
            target: cx.world.player_name(slot.caster),
        });
    }
    let marked = cx.world.ledger.has_inflation_mark(caster);
    let fee = cx.debit()?;
    let consumed_mark = marked && !cx.world.ledger.has_inflation_mark(caster);

    let undone = slot.ability;
    let victim = cx.world.player_name(slot.caster);
    *cx.world = slot.world.clone();
    cx.world
        .ledger
        .charge(cx.ability, caster, fee, consumed_mark)?;
    Ok(AbilityOutcome::public(format!(
        "{} rolled back {victim}'s {undone}",
        cx.caster_name()
    ))
    .with_data(AbilityData::Paid { cost: fee }))
}
