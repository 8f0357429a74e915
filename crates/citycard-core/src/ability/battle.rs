//! Abilities that shape this round's combat.
//!
//! None of these touch HP directly (berserk aside). They attach modifiers to a
//! city or to a player, and the battle resolver reads them from its pre-round
//! snapshot. Most last one round: set during the ability window, read during
//! `Resolving`, gone after `Expiring`.
//!
//! Several publish only a vague public line; the opponent learns the effect
//! when the battle reveals it.

use crate::entity::{CityKey, Modifier, ModifierKind, PlayerId};
use crate::error::Result;

use super::{AbilityContext, AbilityOutcome};

/// Rounds a mutual-destruction pact stays armed.
pub const MUTUAL_DESTRUCTION_ROUNDS: u32 = 5;

/// Splash a last-stand city deals on death if its side destroyed nothing.
pub const LAST_STAND_SPLASH: u64 = 5000;

/// HP multiplier of a berserk city.
pub const BERSERK_FACTOR: u64 = 5;

fn add_player_modifier(
    cx: &mut AbilityContext<'_>,
    player: PlayerId,
    modifier: Modifier,
) -> Result<()> {
    let ability = cx.ability;
    let owner = cx
        .world
        .player_mut(player)
        .ok_or_else(|| crate::error::AbilityError::InconsistentState {
            ability,
            detail: format!("player {player} vanished"),
        })?;
    owner.modifiers.push(modifier);
    Ok(())
}

fn add_city_modifier(cx: &mut AbilityContext<'_>, key: CityKey, modifier: Modifier) -> Result<()> {
    cx.city_mut(key)?.modifiers.push(modifier);
    Ok(())
}

fn vague(cx: &AbilityContext<'_>) -> String {
    format!("{} is preparing something for the coming battle", cx.caster_name())
}

/// Caster deploys nothing this round.
pub fn hold_position(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    cx.debit()?;
    let caster = cx.caster();
    add_player_modifier(cx, caster, Modifier::for_rounds(ModifierKind::NoDeploy, 1))?;
    Ok(AbilityOutcome::public(vague(cx))
        .with_private("You hold position: none of your cities fight this round"))
}

/// Caster's damage goes to the defender's highest-HP deployed city.
pub fn capture_the_king(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    cx.debit()?;
    let caster = cx.caster();
    add_player_modifier(
        cx,
        caster,
        Modifier::for_rounds(ModifierKind::AttackPriorityHighestHp, 1),
    )?;
    Ok(AbilityOutcome::public(vague(cx))
        .with_private("Your attack will focus the strongest enemy city"))
}

/// Halves the target's outgoing damage this round.
pub fn shadow_army(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    cx.debit()?;
    add_player_modifier(
        cx,
        target,
        Modifier::for_rounds(ModifierKind::OutgoingDamageHalved, 1),
    )?;
    Ok(AbilityOutcome::public(format!(
        "{} sent a shadow army against {}; their damage is halved this round",
        cx.caster_name(),
        cx.world.player_name(target)
    )))
}

/// One fatigued own city ignores fatigue this round.
pub fn brave_under_fire(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let key = cx.own_city(0)?;
    let streak = cx
        .world
        .player(key.player)
        .map_or(0, |p| p.streak(key.city));
    if streak == 0 {
        return Err(cx.unmet("the city did not fight last round"));
    }
    cx.debit()?;
    add_city_modifier(cx, key, Modifier::for_rounds(ModifierKind::IgnoreFatigue, 1))?;
    let name = cx.city(key)?.name.clone();
    Ok(AbilityOutcome::public(vague(cx)).with_private(format!("{name} will fight without fatigue")))
}

/// One own city draws all incoming damage this round.
pub fn attract_attack(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let key = cx.own_city(0)?;
    cx.debit()?;
    add_city_modifier(cx, key, Modifier::for_rounds(ModifierKind::Attract, 1))?;
    let name = cx.city(key)?.name.clone();
    Ok(AbilityOutcome::public(vague(cx)).with_private(format!("{name} will draw every attack")))
}

/// A never-deployed own city is immune on its first deployment.
pub fn safe_arrival(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let key = cx.own_city(0)?;
    let city = cx.city(key)?;
    if city.deployments > 0 {
        return Err(cx.unmet(format!("{} has already been deployed", city.name)));
    }
    if city.has_modifier(|k| matches!(k, ModifierKind::FirstDeploymentImmunity)) {
        return Err(cx.unmet(format!("{} is already protected on arrival", city.name)));
    }
    cx.debit()?;
    add_city_modifier(
        cx,
        key,
        Modifier::until_consumed(ModifierKind::FirstDeploymentImmunity),
    )?;
    let name = cx.city(key)?.name.clone();
    Ok(AbilityOutcome::public(format!(
        "{} secured a safe arrival for one city",
        cx.caster_name()
    ))
    .with_private(format!("{name} takes no damage on its first deployment")))
}

/// Caster takes no damage from the target this round.
pub fn iron_wall(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    cx.debit()?;
    let caster = cx.caster();
    add_player_modifier(
        cx,
        caster,
        Modifier::for_rounds(ModifierKind::DamageImmunity { from: target }, 1),
    )?;
    Ok(AbilityOutcome::public(format!(
        "{} raised an iron wall against {}",
        cx.caster_name(),
        cx.world.player_name(target)
    )))
}

/// Double power, then self-destruct; a fruitless death splashes the enemy.
pub fn last_stand(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let key = cx.own_city(0)?;
    cx.debit()?;
    for kind in [
        ModifierKind::PowerMultiplier(2),
        ModifierKind::SuicideAttack,
        ModifierKind::DesperateRetaliation(LAST_STAND_SPLASH),
    ] {
        add_city_modifier(cx, key, Modifier::for_rounds(kind, 1))?;
    }
    let name = cx.city(key)?.name.clone();
    Ok(AbilityOutcome::public(vague(cx))
        .with_private(format!("{name} fights at double power and will not survive")))
}

/// Arms a city so its death takes the opposing deployment with it.
pub fn mutual_destruction(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let key = cx.own_city(0)?;
    let city = cx.city(key)?;
    if city.has_modifier(|k| matches!(k, ModifierKind::MutualDestruction)) {
        return Err(cx.unmet(format!("{} is already armed", city.name)));
    }
    cx.debit()?;
    add_city_modifier(
        cx,
        key,
        Modifier::for_rounds(ModifierKind::MutualDestruction, MUTUAL_DESTRUCTION_ROUNDS),
    )?;
    let name = cx.city(key)?.name.clone();
    Ok(AbilityOutcome::public(vague(cx)).with_private(format!(
        "If {name} falls in battle within {MUTUAL_DESTRUCTION_ROUNDS} rounds, its attackers fall with it"
    )))
}

/// Quintuples a city's HP once per game; settlement exhausts it afterwards.
pub fn berserk(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let key = cx.own_city(0)?;
    let alive = cx.world.player(key.player).map_or(0, |p| p.alive_count());
    if alive < 2 {
        return Err(cx.unmet("requires at least 2 alive cities"));
    }
    if cx.world.status.berserk(key).is_some() {
        return Err(cx.unmet(format!("{} has already gone berserk", cx.city(key)?.name)));
    }
    cx.debit()?;
    let original_max = cx.city(key)?.max_hp;
    cx.world.status.record_berserk(key, original_max);
    let city = cx.city_mut(key)?;
    city.max_hp = city.max_hp.saturating_mul(BERSERK_FACTOR);
    let hp = city.current_hp.saturating_mul(BERSERK_FACTOR);
    city.set_hp(hp);
    let name = city.name.clone();
    Ok(AbilityOutcome::public(format!("{name} of {} went berserk", cx.caster_name()))
        .with_private(format!("{name} now has {hp} HP")))
}

/// The target's damage against the caster is turned back on them.
pub fn counterstrike(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    let caster = cx.caster();
    let count = |p: PlayerId| cx.world.player(p).map_or(0, |p| p.alive_count());
    if count(caster) < 2 || count(target) < 2 {
        return Err(cx.unmet("both players need at least 2 alive cities"));
    }
    cx.debit()?;
    add_player_modifier(
        cx,
        caster,
        Modifier::for_rounds(ModifierKind::Counterstrike { against: target }, 1),
    )?;
    Ok(AbilityOutcome::public(vague(cx)).with_private(format!(
        "{}'s attack will strike their own cities",
        cx.world.player_name(target)
    )))
}

/// Extra damage per enemy deployed city, and the target's income.
pub fn rest_and_wait(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    cx.debit()?;
    let caster = cx.caster();
    add_player_modifier(
        cx,
        caster,
        Modifier::for_rounds(ModifierKind::RestAndWait { against: target }, 1),
    )?;
    Ok(AbilityOutcome::public(format!(
        "{} waits for {} to tire",
        cx.caster_name(),
        cx.world.player_name(target)
    )))
}

/// The target's attack heals the caster instead.
pub fn straw_boats(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    cx.debit()?;
    let caster = cx.caster();
    add_player_modifier(
        cx,
        caster,
        Modifier::for_rounds(ModifierKind::StrawBoats { against: target }, 1),
    )?;
    Ok(AbilityOutcome::public(vague(cx)).with_private(format!(
        "{}'s arrows will restore your cities",
        cx.world.player_name(target)
    )))
}

/// Damage dealt to the target becomes stolen gold at settlement.
pub fn loot(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    cx.debit()?;
    let caster = cx.caster();
    add_player_modifier(
        cx,
        caster,
        Modifier::for_rounds(ModifierKind::Loot { against: target }, 1),
    )?;
    Ok(AbilityOutcome::public(format!(
        "{} plans to plunder {}",
        cx.caster_name(),
        cx.world.player_name(target)
    )))
}

/// In a three-player game, a caster outmatched by the target strikes the
/// third player instead.
pub fn feint(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    if cx.world.active_players().len() != 3 {
        return Err(cx.unmet("feint needs exactly three players in the game"));
    }
    cx.debit()?;
    let caster = cx.caster();
    add_player_modifier(
        cx,
        caster,
        Modifier::for_rounds(ModifierKind::Feint { against: target }, 1),
    )?;
    Ok(AbilityOutcome::public(vague(cx)).with_private(format!(
        "If {} outmatches you, your attack turns on the third player",
        cx.world.player_name(target)
    )))
}

/// The caster's overflow against the target also strikes the target's center.
pub fn besiege(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    let center_alive = cx
        .world
        .player(target)
        .and_then(|p| p.city(p.center()?))
        .is_some_and(|c| c.alive);
    if !center_alive {
        return Err(cx.unmet("the target has no center to besiege"));
    }
    cx.debit()?;
    let caster = cx.caster();
    add_player_modifier(
        cx,
        caster,
        Modifier::for_rounds(ModifierKind::Besiege { against: target }, 1),
    )?;
    Ok(AbilityOutcome::public(format!(
        "{} laid siege to {}'s center",
        cx.caster_name(),
        cx.world.player_name(target)
    )))
}

/// Both sides stand down this round, and one declared enemy city is trapped
/// for its next battle against the caster.
pub fn trap(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let target = cx.hostile_target()?;
    let name = cx.city_arg(0)?.to_owned();
    let key = cx
        .world
        .city_key_by_name(target, &name)
        .filter(|key| cx.world.declared_deployment(target).contains(&key.city))
        .ok_or_else(|| cx.invalid(format!("{name} is not in the enemy deployment")))?;
    let city = cx.city(key)?;
    if !city.alive || city.is_center {
        return Err(cx.invalid(format!("{name} cannot be trapped")));
    }
    if cx.world.status.trap(key).is_some() {
        return Err(cx.unmet(format!("{name} is already trapped")));
    }
    cx.debit()?;
    let caster = cx.caster();
    let round = cx.world.round;
    cx.world.status.set_trap(key, caster, round);
    for player in [caster, target] {
        add_player_modifier(cx, player, Modifier::for_rounds(ModifierKind::NoDeploy, 1))?;
    }
    Ok(AbilityOutcome::public(format!(
        "{} and {} both withdrew from the field",
        cx.caster_name(),
        cx.world.player_name(target)
    ))
    .with_private(format!("{name} is trapped the next time it faces you")))
}
