//! Shields, barriers, heals and designations on the caster's own side.

use crate::entity::CityKey;
use crate::error::Result;
use crate::status::LockoutReason;

use super::{AbilityContext, AbilityData, AbilityOutcome};

/// Rounds a city healed by `advanced_heal` sits out.
pub const ADVANCED_HEAL_LOCKOUT: u32 = 2;

/// A revived city returns with `max_hp / REVIVE_DIVISOR`.
pub const REVIVE_DIVISOR: u64 = 2;

fn heal_to_full(cx: &mut AbilityContext<'_>, key: CityKey) -> Result<(String, u64)> {
    let city = cx.city_mut(key)?;
    let restored = city.heal(city.max_hp);
    Ok((city.name.clone(), restored))
}

/// Raises a barrier in front of the caster's cities.
pub fn set_barrier(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let caster = cx.caster();
    if cx.world.status.barrier(caster).is_some() {
        return Err(cx.unmet("a barrier is already up"));
    }
    cx.debit()?;
    let config = cx.world.config();
    let (hp, rounds, reflect) = (
        config.barrier_hp,
        config.barrier_rounds,
        config.barrier_reflect_percent,
    );
    cx.world.status.set_barrier(caster, hp, rounds, reflect);
    Ok(AbilityOutcome::public(format!(
        "{} raised a barrier of {hp} HP",
        cx.caster_name()
    ))
    .with_data(AbilityData::Barrier { hp, rounds }))
}

/// Single-charge shield on one own city.
pub fn city_protection(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let key = cx.own_city(0)?;
    let city = cx.city(key)?;
    let name = city.name.clone();
    if cx.world.status.has_protection(key) {
        return Err(cx.unmet(format!("{name} is already protected")));
    }
    if city.is_center && !cx.world.config().allow_center_protection {
        return Err(cx.invalid("the center city cannot be protected"));
    }
    if cx.world.status.jade_mark(key).is_some() {
        return Err(cx.unmet(format!("{name} is shattered and cannot be protected")));
    }
    cx.debit()?;
    let rounds = cx.world.config().protection_rounds;
    cx.world.status.set_protection(key, rounds);
    Ok(
        AbilityOutcome::public(format!("{} protected one of their cities", cx.caster_name()))
            .with_private(format!("{name} is protected for {rounds} rounds")),
    )
}

/// Multi-charge shield on one own city.
pub fn iron_city(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let key = cx.own_city(0)?;
    let name = cx.city(key)?.name.clone();
    if cx.world.status.iron_charges(key) > 0 {
        return Err(cx.unmet(format!("{name} is already an iron city")));
    }
    cx.debit()?;
    let charges = cx.world.config().iron_charges;
    cx.world.status.set_iron_shield(key, charges);
    Ok(AbilityOutcome::public(format!(
        "{} turned {name} into an iron city",
        cx.caster_name()
    )))
}

/// Restores one own city to full HP.
pub fn quick_heal(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let key = cx.own_city(0)?;
    let city = cx.city(key)?;
    if city.is_full() {
        return Err(cx.unmet(format!("{} is already at full HP", city.name)));
    }
    cx.debit()?;
    let healed = heal_to_full(cx, key)?;
    Ok(AbilityOutcome::public(format!(
        "{} healed {} by {} HP",
        cx.caster_name(),
        healed.0,
        healed.1
    ))
    .with_data(AbilityData::Healed {
        cities: vec![healed],
    }))
}

/// Restores one or two own cities to full, then rests them.
pub fn advanced_heal(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let count = cx.request.target_cities.len();
    if !(1..=2).contains(&count) {
        return Err(cx.invalid("choose one or two cities"));
    }
    let mut keys = Vec::with_capacity(count);
    for index in 0..count {
        let key = cx.own_city(index)?;
        if keys.contains(&key) {
            return Err(cx.invalid("the same city was named twice"));
        }
        keys.push(key);
    }
    let mut all_full = true;
    for key in &keys {
        all_full &= cx.city(*key)?.is_full();
    }
    if all_full {
        return Err(cx.unmet("every chosen city is already at full HP"));
    }
    cx.debit()?;
    let mut healed = Vec::with_capacity(keys.len());
    for key in keys {
        healed.push(heal_to_full(cx, key)?);
        cx.world
            .lock_out(key, LockoutReason::Healing, ADVANCED_HEAL_LOCKOUT);
    }
    let names: Vec<&str> = healed.iter().map(|(n, _)| n.as_str()).collect();
    Ok(AbilityOutcome::public(format!(
        "{} fully healed {}; they rest for {ADVANCED_HEAL_LOCKOUT} rounds",
        cx.caster_name(),
        names.join(", ")
    ))
    .with_data(AbilityData::Healed { cities: healed }))
}

/// Brings one own destroyed city back at half its max HP, rested.
pub fn revive(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let caster = cx.caster();
    let name = cx.city_arg(0)?.to_owned();
    let key = cx
        .world
        .city_key_by_name(caster, &name)
        .ok_or_else(|| cx.invalid(format!("you do not own {name}")))?;
    let (alive, is_center) = {
        let city = cx.city(key)?;
        (city.alive, city.is_center)
    };
    if alive {
        return Err(cx.unmet(format!("{name} is not destroyed")));
    }
    if is_center {
        return Err(cx.invalid("a fallen center cannot be revived"));
    }
    cx.debit()?;
    let city = cx.city_mut(key)?;
    let hp = (city.max_hp / REVIVE_DIVISOR).max(1);
    city.set_hp(hp);
    if let Some(owner) = cx.world.player_mut(caster) {
        owner.streaks.remove(&key.city);
    }
    Ok(AbilityOutcome::public(format!(
        "{} raised {name} from its ruins",
        cx.caster_name()
    ))
    .with_private(format!("{name} returns with {hp} HP"))
    .with_data(AbilityData::Healed {
        cities: vec![(name, hp)],
    }))
}

/// Hard block against the blockable abilities.
pub fn invulnerable(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let caster = cx.caster();
    if cx.world.status.hard_block_rounds(caster) > 0 {
        return Err(cx.unmet("already invulnerable"));
    }
    cx.debit()?;
    let rounds = cx.world.config().hard_block_rounds;
    cx.world.status.set_hard_block(caster, rounds);
    Ok(AbilityOutcome::public(format!(
        "{} is invulnerable for {rounds} rounds",
        cx.caster_name()
    )))
}

/// Locks one own city against swaps.
pub fn anchor(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let key = cx.own_city(0)?;
    let name = cx.city(key)?.name.clone();
    if cx.world.status.is_locked(key) {
        return Err(cx.unmet(format!("{name} is already anchored")));
    }
    cx.debit()?;
    let rounds = cx.world.config().anchor_rounds;
    cx.world.status.lock(key, rounds);
    Ok(AbilityOutcome::public(format!(
        "{} anchored {name} for {rounds} rounds",
        cx.caster_name()
    )))
}

/// Shows one own city to opponents as another catalog city.
pub fn disguise(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let key = cx.own_city(0)?;
    let real = cx.city(key)?.name.clone();
    let alias = cx
        .request
        .argument
        .clone()
        .ok_or_else(|| cx.invalid("name the city to disguise as"))?;
    if alias == real {
        return Err(cx.invalid("a city cannot disguise as itself"));
    }
    let shown = cx
        .catalog
        .lookup_base_city(&alias)
        .ok_or_else(|| cx.invalid(format!("unknown city '{alias}'")))?;
    cx.debit()?;
    let rounds = cx.world.config().disguise_rounds;
    cx.world
        .status
        .set_disguise(key, alias.clone(), shown.max_hp, rounds);
    Ok(
        AbilityOutcome::public(format!("{} disguised one of their cities", cx.caster_name()))
            .with_private(format!("{real} appears as {alias} for {rounds} rounds")),
    )
}

/// Heals every alive own city in one province.
pub fn solidarity(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let key = cx.own_city(0)?;
    let anchor = cx.city(key)?;
    let province = cx
        .catalog
        .province_of(&anchor.name)
        .unwrap_or_else(|| anchor.province.clone());
    let members: Vec<CityKey> = cx
        .world
        .player(key.player)
        .map(|p| {
            p.alive_cities()
                .filter(|c| {
                    cx.catalog
                        .province_of(&c.name)
                        .map_or(c.province == province, |p| p == province)
                })
                .map(|c| CityKey::new(key.player, c.id))
                .collect()
        })
        .unwrap_or_default();
    if members.len() < 2 {
        return Err(cx.unmet(format!("needs at least 2 alive cities in {province}")));
    }
    cx.debit()?;
    let mut healed = Vec::with_capacity(members.len());
    for member in members {
        healed.push(heal_to_full(cx, member)?);
    }
    Ok(AbilityOutcome::public(format!(
        "{} rallied the cities of {province}",
        cx.caster_name()
    ))
    .with_data(AbilityData::Healed { cities: healed }))
}

/// Designates a center successor that grows every round.
pub fn purple_chamber(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let key = cx.own_city(0)?;
    let city = cx.city(key)?;
    if city.is_center {
        return Err(cx.invalid("the center cannot be its own successor"));
    }
    let name = city.name.clone();
    if let Some(current) = cx.world.status.successor(key.player) {
        let alive = cx
            .world
            .city(CityKey::new(key.player, current))
            .is_some_and(|c| c.alive);
        if alive {
            return Err(cx.unmet("a successor is already designated"));
        }
    }
    cx.debit()?;
    cx.world.status.set_successor(key.player, key.city);
    Ok(AbilityOutcome::public(format!(
        "{} named {name} heir to the center",
        cx.caster_name()
    )))
}

/// Designates a sub-center that fights at raised power.
pub fn sub_center(cx: &mut AbilityContext<'_>) -> Result<AbilityOutcome> {
    let key = cx.own_city(0)?;
    let city = cx.city(key)?;
    if city.is_center {
        return Err(cx.invalid("the center cannot also be the sub-center"));
    }
    let name = city.name.clone();
    if cx.world.status.is_sub_center(key) {
        return Err(cx.unmet(format!("{name} is already the sub-center")));
    }
    cx.debit()?;
    cx.world.status.set_sub_center(key.player, key.city);
    Ok(AbilityOutcome::public(format!(
        "{} made {name} their sub-center",
        cx.caster_name()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::AbilityRequest;
    use crate::error::AbilityError;
    use crate::tests::helpers::*;

    mod barrier_tests {
        use super::*;

        #[test]
        fn barrier_costs_three_and_uses_config() {
            let (mut game, alice, _) = game_with_gold(3);
            let outcome = game
                .try_activate(&AbilityRequest::new("set_barrier", alice))
                .unwrap();
            assert_eq!(game.world().ledger.gold(alice), 0);
            let barrier = game.world().status.barrier(alice).unwrap();
            assert_eq!(barrier.hp, 15000);
            assert_eq!(barrier.rounds_left, 5);
            assert_eq!(
                outcome.data,
                Some(AbilityData::Barrier {
                    hp: 15000,
                    rounds: 5
                })
            );
        }

        #[test]
        fn second_barrier_is_rejected_without_charge() {
            let (mut game, alice, _) = two_player_game();
            game.try_activate(&AbilityRequest::new("set_barrier", alice))
                .unwrap();
            let gold = game.world().ledger.gold(alice);
            let err = game
                .try_activate(&AbilityRequest::new("set_barrier", alice))
                .unwrap_err();
            assert!(matches!(err, AbilityError::PreconditionNotMet { .. }));
            assert_eq!(game.world().ledger.gold(alice), gold);
        }
    }

    mod shield_tests {
        use super::*;

        #[test]
        fn protection_is_non_stacking() {
            let (mut game, alice, _) = two_player_game();
            let req = AbilityRequest::new("city_protection", alice).city("Hangzhou");
            game.try_activate(&req).unwrap();
            assert!(game
                .world()
                .status
                .has_protection(city_key(&game, alice, "Hangzhou")));
            assert!(matches!(
                game.try_activate(&req),
                Err(AbilityError::PreconditionNotMet { .. })
            ));
        }

        #[test]
        fn center_cannot_be_protected_by_default() {
            let (mut game, alice, _) = two_player_game();
            let err = game
                .try_activate(&AbilityRequest::new("city_protection", alice).city("Beijing"))
                .unwrap_err();
            assert!(matches!(err, AbilityError::InvalidTarget { .. }));
        }

        #[test]
        fn iron_city_gets_configured_charges() {
            let (mut game, alice, _) = two_player_game();
            game.try_activate(&AbilityRequest::new("iron_city", alice).city("Ningbo"))
                .unwrap();
            assert_eq!(
                game.world()
                    .status
                    .iron_charges(city_key(&game, alice, "Ningbo")),
                2
            );
        }

        #[test]
        fn invulnerable_blocks_hostile_abilities() {
            let (mut game, alice, bob) = two_player_game();
            game.try_activate(&AbilityRequest::new("invulnerable", bob))
                .unwrap();
            let gold = game.world().ledger.gold(alice);
            let err = game
                .try_activate(&AbilityRequest::new("cost_inflation", alice).target(bob))
                .unwrap_err();
            assert!(matches!(err, AbilityError::BlockedByShield { .. }));
            assert_eq!(game.world().ledger.gold(alice), gold);
            // not in the blockable set
            game.try_activate(&AbilityRequest::new("stare_down", alice).target(bob))
                .unwrap();
        }
    }

    mod heal_tests {
        use super::*;

        #[test]
        fn quick_heal_restores_full_hp() {
            let (mut game, alice, _) = two_player_game();
            let key = city_key(&game, alice, "Hangzhou");
            game.world_mut().city_mut(key).unwrap().apply_damage(5000);
            game.try_activate(&AbilityRequest::new("quick_heal", alice).city("Hangzhou"))
                .unwrap();
            assert!(game.world().city(key).unwrap().is_full());
        }

        #[test]
        fn quick_heal_fails_at_full() {
            let (mut game, alice, _) = two_player_game();
            let err = game
                .try_activate(&AbilityRequest::new("quick_heal", alice).city("Hangzhou"))
                .unwrap_err();
            assert!(matches!(err, AbilityError::PreconditionNotMet { .. }));
        }

        #[test]
        fn advanced_heal_locks_out_and_undeploys() {
            let (mut game, alice, _) = two_player_game();
            let hz = city_key(&game, alice, "Hangzhou");
            let nb = city_key(&game, alice, "Ningbo");
            game.world_mut().city_mut(hz).unwrap().apply_damage(100);
            game.deploy(alice, &["Hangzhou", "Ningbo"]).unwrap();

            game.try_activate(
                &AbilityRequest::new("advanced_heal", alice)
                    .city("Hangzhou")
                    .city("Ningbo"),
            )
            .unwrap();

            assert!(game.world().city(hz).unwrap().is_full());
            assert!(game.world().status.lockout(hz).is_some());
            assert!(game.world().status.lockout(nb).is_some());
            assert!(game.world().declared_deployment(alice).is_empty());
        }

        #[test]
        fn solidarity_heals_province() {
            let (mut game, alice, _) = two_player_game();
            let hz = city_key(&game, alice, "Hangzhou");
            let wz = city_key(&game, alice, "Wenzhou");
            game.world_mut().city_mut(hz).unwrap().apply_damage(1000);
            game.world_mut().city_mut(wz).unwrap().apply_damage(1000);
            let outcome = game
                .try_activate(&AbilityRequest::new("solidarity", alice).city("Ningbo"))
                .unwrap();
            assert!(game.world().city(hz).unwrap().is_full());
            assert!(game.world().city(wz).unwrap().is_full());
            assert!(matches!(outcome.data, Some(AbilityData::Healed { ref cities }) if cities.len() == 3));
        }

        #[test]
        fn solidarity_needs_two_in_province() {
            let (mut game, alice, _) = two_player_game();
            let err = game
                .try_activate(&AbilityRequest::new("solidarity", alice).city("Beijing"))
                .unwrap_err();
            assert!(matches!(err, AbilityError::PreconditionNotMet { .. }));
        }
    }

    mod revive_tests {
        use super::*;

        #[test]
        fn revive_restores_half_and_rests_the_city() {
            let (mut game, alice, _) = two_player_game();
            let wenzhou = city_key(&game, alice, "Wenzhou");
            game.world_mut()
                .player_mut(alice)
                .unwrap()
                .streaks
                .insert(wenzhou.city, 2);
            game.world_mut().destroy_city(wenzhou);

            let outcome = game
                .try_activate(&AbilityRequest::new("revive", alice).city("Wenzhou"))
                .unwrap();
            assert_eq!(
                outcome.data,
                Some(AbilityData::Healed {
                    cities: vec![("Wenzhou".into(), 4250)],
                })
            );
            let city = game.world().city(wenzhou).unwrap();
            assert!(city.alive);
            assert_eq!(city.current_hp, 4250);
            assert_eq!(game.world().player(alice).unwrap().streak(wenzhou.city), 0);
            assert_eq!(game.world().ledger.gold(alice), 20);
            assert!(game.world().undeployable_reason(wenzhou).is_none());
        }

        #[test]
        fn living_city_cannot_be_revived() {
            let (mut game, alice, _) = two_player_game();
            let err = game
                .try_activate(&AbilityRequest::new("revive", alice).city("Ningbo"))
                .unwrap_err();
            assert!(matches!(err, AbilityError::PreconditionNotMet { .. }));
            assert_eq!(game.world().ledger.gold(alice), 24);
        }

        #[test]
        fn revive_waits_out_its_cooldown() {
            let (mut game, alice, _) = two_player_game();
            for name in ["Ningbo", "Wenzhou"] {
                let key = city_key(&game, alice, name);
                game.world_mut().destroy_city(key);
            }
            game.try_activate(&AbilityRequest::new("revive", alice).city("Ningbo"))
                .unwrap();
            let err = game
                .try_activate(&AbilityRequest::new("revive", alice).city("Wenzhou"))
                .unwrap_err();
            assert!(matches!(err, AbilityError::OnCooldown { .. }));
        }
    }

    mod designation_tests {
        use super::*;

        #[test]
        fn disguise_needs_catalog_alias() {
            let (mut game, alice, _) = two_player_game();
            let err = game
                .try_activate(
                    &AbilityRequest::new("disguise", alice)
                        .city("Wenzhou")
                        .argument("Atlantis"),
                )
                .unwrap_err();
            assert!(matches!(err, AbilityError::InvalidTarget { .. }));

            game.try_activate(
                &AbilityRequest::new("disguise", alice)
                    .city("Wenzhou")
                    .argument("Chongqing"),
            )
            .unwrap();
            let disguise = game
                .world()
                .status
                .disguise(city_key(&game, alice, "Wenzhou"))
                .unwrap();
            assert_eq!(disguise.alias, "Chongqing");
            assert_eq!(disguise.shown_hp, 30000);
        }

        #[test]
        fn successor_must_not_be_center() {
            let (mut game, alice, _) = two_player_game();
            assert!(game
                .try_activate(&AbilityRequest::new("purple_chamber", alice).city("Beijing"))
                .is_err());
            game.try_activate(&AbilityRequest::new("purple_chamber", alice).city("Hangzhou"))
                .unwrap();
            assert_eq!(
                game.world().status.successor(alice),
                Some(city_key(&game, alice, "Hangzhou").city)
            );
        }

        #[test]
        fn anchor_is_not_repeatable() {
            let (mut game, alice, _) = two_player_game();
            let req = AbilityRequest::new("anchor", alice).city("Ningbo");
            game.try_activate(&req).unwrap();
            assert!(game
                .world()
                .status
                .is_locked(city_key(&game, alice, "Ningbo")));
            assert!(game.try_activate(&req).is_err());
        }
    }
}
