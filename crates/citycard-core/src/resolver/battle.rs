//! Simultaneous pairwise battle resolution.
//!
//! Active players fight in turn order, two at a time. Every number a battle
//! needs (power, targeting, reflection targets, trigger damage) is read from
//! the pre-round `current` world; HP, shields and barriers are written to
//! `next`. Neither side ever sees the other's post-damage state.
//!
//! # Resolution order
//!
//! 1. Side power from HP, center/sub-center scaling, fatigue, multipliers and
//!    jade marks; a side under `OutgoingDamageHalved` halves its total.
//! 2. Per direction: a weaker feinting side turns on the third player instead;
//!    immunity, straw boats and counterstrike short-circuit; otherwise the
//!    defender's barrier absorbs first, reflection goes to the attacker's
//!    lowest-HP city, and the overflow is targeted (attract beats a sprung
//!    trap, which beats highest-HP priority, which beats the even split). A
//!    besieging side also strikes the defender's center.
//! 3. Hits are summed per city; each hit city consumes at most one shield.
//! 4. Deaths plus self-destructing cities fire their triggers once. Trigger
//!    deaths do not trigger again.
//!
//! A side that deploys cities but has no power still goes through every
//! step, so its cities are counted as deployed and become known.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entity::{City, CityId, CityKey, ModifierKind, PlayerId};
use crate::error::ResolveError;
use crate::log::GameLog;
use crate::world::{Phase, RoundRecord, World};

use super::PhaseResolver;

/// Extra damage per defending city granted by rest-and-wait.
pub const REST_AND_WAIT_BONUS: u64 = 2000;

/// Most damage a siege can deal to the defender's center.
pub const BESIEGE_CAP: u64 = 10_000;

/// The result of one battle between two players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleOutcome {
    /// First player in turn order.
    pub side_a: PlayerId,
    /// Second player in turn order.
    pub side_b: PlayerId,
    /// Power of side A after modifiers.
    pub total_power_a: u64,
    /// Power of side B after modifiers.
    pub total_power_b: u64,
    /// HP side B's cities lost.
    pub net_damage_a_to_b: u64,
    /// HP side A's cities lost.
    pub net_damage_b_to_a: u64,
    /// Cities destroyed, in resolution order.
    pub destroyed_cities: Vec<String>,
    /// Cities whose shield absorbed a hit.
    pub blocked_cities: Vec<String>,
    /// Damage both barriers absorbed.
    pub barrier_absorbed: u64,
    /// Damage both barriers reflected.
    pub barrier_reflected: u64,
}

/// Resolves every battle of the round.
#[derive(Debug, Clone, Copy, Default)]
pub struct BattleResolver;

impl PhaseResolver for BattleResolver {
    fn phase(&self) -> Phase {
        Phase::Resolving
    }

    fn resolve(
        &self,
        current: &World,
        next: &mut World,
        log: &mut GameLog,
    ) -> Result<(), ResolveError> {
        next.round_record = RoundRecord::default();
        let players = current.active_players();
        for pair in players.chunks(2) {
            match *pair {
                [a, b] => {
                    let outcome = resolve_pair(current, next, a, b)?;
                    log.public(current.round, describe(current, &outcome));
                    next.round_record.battles.push(outcome);
                }
                [solo] => log.public(
                    current.round,
                    format!("{} has no opponent this round", current.player_name(solo)),
                ),
                _ => {}
            }
        }
        Ok(())
    }
}

fn describe(world: &World, outcome: &BattleOutcome) -> String {
    let mut line = format!(
        "{} ({}) vs {} ({}): {} dealt {}, {} dealt {}",
        world.player_name(outcome.side_a),
        outcome.total_power_a,
        world.player_name(outcome.side_b),
        outcome.total_power_b,
        world.player_name(outcome.side_a),
        outcome.net_damage_a_to_b,
        world.player_name(outcome.side_b),
        outcome.net_damage_b_to_a,
    );
    if !outcome.destroyed_cities.is_empty() {
        line.push_str(&format!("; destroyed: {}", outcome.destroyed_cities.join(", ")));
    }
    line
}

// =============================================================================
// Power
// =============================================================================

fn snapshot_city(world: &World, key: CityKey) -> Result<&City, ResolveError> {
    world
        .city(key)
        .ok_or_else(|| ResolveError::new(format!("deployed city {key} is missing")))
}

fn player_has(world: &World, player: PlayerId, predicate: impl Fn(&ModifierKind) -> bool) -> bool {
    world.player(player).is_some_and(|p| p.has_modifier(predicate))
}

/// Battle power of one city.
///
/// # Errors
///
/// [`ResolveError`] if the city does not exist.
pub fn city_power(world: &World, key: CityKey) -> Result<u64, ResolveError> {
    let city = snapshot_city(world, key)?;
    let config = world.config();
    let mut power = city.current_hp;
    if city.is_center {
        power = power * u64::from(config.center_power_percent) / 100;
    } else if world.status.is_sub_center(key) {
        power = power * u64::from(config.sub_center_power_percent) / 100;
    }
    let streak = world.player(key.player).map_or(0, |p| p.streak(key.city));
    if streak > 0 && !city.has_modifier(|k| matches!(k, ModifierKind::IgnoreFatigue)) {
        power /= 2;
    }
    power = power.saturating_mul(city.power_multiplier());
    if world.status.jade_mark(key).is_some() {
        power = power.saturating_mul(2);
    }
    Ok(power)
}

/// The cities one player sends into a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment<'a> {
    /// The player fighting.
    pub player: PlayerId,
    /// Their cities, in deployment order.
    pub cities: &'a [CityId],
}

impl<'a> Deployment<'a> {
    /// Creates a deployment.
    #[must_use]
    pub const fn new(player: PlayerId, cities: &'a [CityId]) -> Self {
        Self { player, cities }
    }
}

/// One side of a battle as seen in the snapshot.
#[derive(Debug, Clone)]
struct Side {
    player: PlayerId,
    cities: Vec<CityKey>,
    power: u64,
}

impl Side {
    /// A side facing `opponent`. Cities the opponent has trapped fight at zero
    /// power.
    fn new(world: &World, deployment: Deployment<'_>, opponent: PlayerId) -> Result<Self, ResolveError> {
        let player = deployment.player;
        let cities: Vec<CityKey> = deployment
            .cities
            .iter()
            .map(|id| CityKey::new(player, *id))
            .collect();
        let mut power = 0u64;
        for key in &cities {
            if world.status.is_trapped_by(*key, opponent) {
                continue;
            }
            power = power.saturating_add(city_power(world, *key)?);
        }
        if player_has(world, player, |k| matches!(k, ModifierKind::OutgoingDamageHalved)) {
            power /= 2;
        }
        Ok(Self {
            player,
            cities,
            power,
        })
    }
}

// =============================================================================
// Targeting
// =============================================================================

/// Damage and healing one side sends at the other.
#[derive(Debug, Default)]
struct Volley {
    hits: Vec<(CityKey, u64)>,
    heals: Vec<(CityKey, u64)>,
    absorbed: u64,
    reflected: u64,
}

fn split_evenly(amount: u64, keys: &[CityKey]) -> Vec<(CityKey, u64)> {
    let count = keys.len() as u64;
    if count == 0 {
        return Vec::new();
    }
    let (share, rest) = (amount / count, amount % count);
    keys.iter()
        .zip(0u64..)
        .map(|(key, i)| (*key, share + u64::from(i < rest)))
        .collect()
}

/// The city with the extreme snapshot HP; ties go to deployment order.
fn pick_by_hp(world: &World, keys: &[CityKey], highest: bool) -> Option<CityKey> {
    let mut best: Option<(CityKey, u64)> = None;
    for key in keys {
        let Some(city) = world.city(*key) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((_, hp)) if highest => city.current_hp > hp,
            Some((_, hp)) => city.current_hp < hp,
        };
        if better {
            best = Some((*key, city.current_hp));
        }
    }
    best.map(|(key, _)| key)
}

fn volley(
    current: &World,
    next: &mut World,
    attacker: &Side,
    defender: &Side,
) -> Result<Volley, ResolveError> {
    let mut out = Volley::default();
    if defender.cities.is_empty() {
        return Ok(out);
    }
    let (att, def) = (attacker.player, defender.player);

    let mut damage = attacker.power;
    if player_has(current, att, |k| *k == ModifierKind::RestAndWait { against: def }) {
        damage = damage.saturating_add(REST_AND_WAIT_BONUS * defender.cities.len() as u64);
    }

    if player_has(current, def, |k| *k == ModifierKind::DamageImmunity { from: att })
        || player_has(current, att, |k| *k == ModifierKind::StrawBoats { against: def })
    {
        return Ok(out);
    }
    if player_has(current, def, |k| *k == ModifierKind::StrawBoats { against: att }) {
        out.heals = split_evenly(damage, &defender.cities);
        return Ok(out);
    }
    if player_has(current, def, |k| *k == ModifierKind::Counterstrike { against: att }) {
        out.hits = split_evenly(damage, &attacker.cities);
        return Ok(out);
    }

    let hit = next.status.damage_barrier(def, damage);
    out.absorbed = hit.absorbed;
    out.reflected = hit.reflected;
    if hit.reflected > 0 {
        if let Some(target) = pick_by_hp(current, &attacker.cities, false) {
            out.hits.push((target, hit.reflected));
        }
    }

    if player_has(current, att, |k| *k == ModifierKind::Besiege { against: def }) {
        if let Some(center) = besieged_center(current, attacker, def) {
            out.hits.push((center, hit.overflow.min(BESIEGE_CAP)));
        }
    }

    let attract = defender.cities.iter().copied().find(|key| {
        current
            .city(*key)
            .is_some_and(|c| c.has_modifier(|k| matches!(k, ModifierKind::Attract)))
    });
    let caught = defender
        .cities
        .iter()
        .copied()
        .find(|key| current.status.is_trapped_by(*key, att));
    let priority = player_has(current, att, |k| {
        matches!(k, ModifierKind::AttackPriorityHighestHp)
    });
    if let Some(key) = attract.or(caught) {
        out.hits.push((key, hit.overflow));
    } else if let Some(key) = priority
        .then(|| pick_by_hp(current, &defender.cities, true))
        .flatten()
    {
        out.hits.push((key, hit.overflow));
    } else {
        out.hits.extend(split_evenly(hit.overflow, &defender.cities));
    }
    Ok(out)
}

/// The defender's alive center, unless an attacking city shares its province
/// and lifts the siege.
fn besieged_center(current: &World, attacker: &Side, defender: PlayerId) -> Option<CityKey> {
    let owner = current.player(defender)?;
    let center = owner.city(owner.center()?)?;
    if !center.alive {
        return None;
    }
    let lifted = !center.province.is_empty()
        && attacker.cities.iter().any(|key| {
            current
                .city(*key)
                .is_some_and(|c| c.province == center.province)
        });
    (!lifted).then(|| CityKey::new(defender, center.id))
}

/// The bystander a weaker feinting `attacker` turns on: the only other active
/// player, if the game has exactly three.
fn feint_target(current: &World, attacker: &Side, defender: &Side) -> Option<PlayerId> {
    let (att, def) = (attacker.player, defender.player);
    if attacker.power >= defender.power
        || !player_has(current, att, |k| *k == ModifierKind::Feint { against: def })
    {
        return None;
    }
    match current.active_players().as_slice() {
        [x, y, z] => [*x, *y, *z].into_iter().find(|p| *p != att && *p != def),
        _ => None,
    }
}

/// The attacker's volley, sent at the bystander instead when a feint fires.
fn directed_volley(
    current: &World,
    next: &mut World,
    attacker: &Side,
    defender: &Side,
    diverted: &mut Vec<(PlayerId, PlayerId)>,
) -> Result<Volley, ResolveError> {
    let Some(bystander) = feint_target(current, attacker, defender) else {
        return volley(current, next, attacker, defender);
    };
    let cities = current.effective_deployment(bystander);
    let side = Side::new(current, Deployment::new(bystander, &cities), attacker.player)?;
    debug!(attacker = %attacker.player, %bystander, "feint diverted the attack");
    diverted.push((attacker.player, bystander));
    volley(current, next, attacker, &side)
}

// =============================================================================
// Commit
// =============================================================================

fn is_first_deployment_immune(city: &City) -> bool {
    city.deployments == 0
        && city.has_modifier(|k| matches!(k, ModifierKind::FirstDeploymentImmunity))
}

/// Applies summed hits, one shield check per city.
///
/// Returns the cities that died.
fn apply_hits(
    current: &World,
    next: &mut World,
    hits: BTreeMap<CityKey, u64>,
    skip: &BTreeSet<CityKey>,
    lost: &mut BTreeMap<PlayerId, u64>,
    blocked: &mut Vec<String>,
) -> Result<Vec<CityKey>, ResolveError> {
    let mut dead = Vec::new();
    for (key, amount) in hits {
        if amount == 0 || skip.contains(&key) {
            continue;
        }
        let snapshot = snapshot_city(current, key)?;
        if is_first_deployment_immune(snapshot) {
            continue;
        }
        if !next.city(key).is_some_and(|c| c.alive) {
            continue;
        }
        if next.status.consume_shield(key) {
            blocked.push(snapshot.name.clone());
            continue;
        }
        let city = next
            .city_mut(key)
            .ok_or_else(|| ResolveError::new(format!("city {key} vanished mid-battle")))?;
        *lost.entry(key.player).or_default() += city.apply_damage(amount);
        if !city.alive {
            dead.push(key);
        }
    }
    Ok(dead)
}

/// Resolves one battle between `a` and `b` with their effective deployments,
/// reading `current` and writing `next`.
///
/// # Errors
///
/// [`ResolveError`] if a deployed city is missing from either world.
pub fn resolve_pair(
    current: &World,
    next: &mut World,
    a: PlayerId,
    b: PlayerId,
) -> Result<BattleOutcome, ResolveError> {
    let cities_a = current.effective_deployment(a);
    let cities_b = current.effective_deployment(b);
    resolve_deployments(
        current,
        next,
        Deployment::new(a, &cities_a),
        Deployment::new(b, &cities_b),
    )
}

/// Resolves one battle between two explicit deployments, reading `current`
/// and writing `next`.
///
/// The deployments need not match what the players declared, which lets a
/// caller evaluate a hypothetical line-up against a scratch copy of the world.
///
/// # Errors
///
/// [`ResolveError`] if a listed city is missing from either world.
pub fn resolve_deployments(
    current: &World,
    next: &mut World,
    first: Deployment<'_>,
    second: Deployment<'_>,
) -> Result<BattleOutcome, ResolveError> {
    let (a, b) = (first.player, second.player);
    let side_a = Side::new(current, first, b)?;
    let side_b = Side::new(current, second, a)?;

    let mut diverted = Vec::new();
    let a_to_b = directed_volley(current, next, &side_a, &side_b, &mut diverted)?;
    let b_to_a = directed_volley(current, next, &side_b, &side_a, &mut diverted)?;

    let mut incoming: BTreeMap<CityKey, u64> = BTreeMap::new();
    for (key, amount) in a_to_b.hits.iter().chain(&b_to_a.hits) {
        *incoming.entry(*key).or_default() += amount;
    }
    let mut lost = BTreeMap::new();
    let mut blocked = Vec::new();
    let main_dead = apply_hits(current, next, incoming, &BTreeSet::new(), &mut lost, &mut blocked)?;

    for (key, amount) in a_to_b.heals.iter().chain(&b_to_a.heals) {
        if let Some(city) = next.city_mut(*key) {
            city.heal(*amount);
        }
    }

    // Bookkeeping for everyone who took the field.
    for (side, opponent) in [(&side_a, b), (&side_b, a)] {
        for key in &side.cities {
            if let Some(city) = next.city_mut(*key) {
                city.deployments += 1;
                city.modifiers
                    .retain(|m| !matches!(m.kind, ModifierKind::FirstDeploymentImmunity));
            }
            next.status.mark_known(opponent, *key);
            if current.status.is_trapped_by(*key, opponent) {
                next.status.spring_trap(*key);
            }
        }
        next.round_record
            .fought
            .entry(side.player)
            .or_default()
            .extend(side.cities.iter().map(|k| k.city));
    }

    // Deaths and their triggers, read from the snapshot.
    let a_destroyed = main_dead.iter().any(|k| k.player == b);
    let b_destroyed = main_dead.iter().any(|k| k.player == a);
    let mut dying = main_dead;
    for key in side_a.cities.iter().chain(&side_b.cities) {
        let snapshot = snapshot_city(current, *key)?;
        if !dying.contains(key) && snapshot.has_modifier(|k| matches!(k, ModifierKind::SuicideAttack))
        {
            dying.push(*key);
        }
    }
    let mut splash: BTreeMap<CityKey, u64> = BTreeMap::new();
    for key in &dying {
        let snapshot = snapshot_city(current, *key)?;
        let (opponents, side_destroyed) = if key.player == a {
            (&side_b.cities, a_destroyed)
        } else if key.player == b {
            (&side_a.cities, b_destroyed)
        } else {
            // a bystander hit by a feint fires no triggers
            continue;
        };
        let mut per_city = 0u64;
        if snapshot.has_modifier(|k| matches!(k, ModifierKind::MutualDestruction)) {
            per_city = per_city.saturating_add(snapshot.current_hp);
        }
        if !side_destroyed {
            for modifier in &snapshot.modifiers {
                if let ModifierKind::DesperateRetaliation(amount) = modifier.kind {
                    per_city = per_city.saturating_add(amount);
                }
            }
        }
        if per_city > 0 {
            debug!(city = %snapshot.name, per_city, "death trigger");
            for target in opponents {
                *splash.entry(*target).or_default() += per_city;
            }
        }
    }
    let already: BTreeSet<CityKey> = dying.iter().copied().collect();
    let trigger_dead = apply_hits(current, next, splash, &already, &mut lost, &mut blocked)?;

    let mut destroyed_cities = Vec::new();
    for key in dying.into_iter().chain(trigger_dead) {
        destroyed_cities.push(snapshot_city(current, key)?.name.clone());
        next.destroy_city(key);
    }

    let net_a_to_b = lost.get(&b).copied().unwrap_or(0);
    let net_b_to_a = lost.get(&a).copied().unwrap_or(0);
    *next.round_record.damage_dealt.entry((a, b)).or_default() += net_a_to_b;
    *next.round_record.damage_dealt.entry((b, a)).or_default() += net_b_to_a;
    for (attacker, bystander) in diverted {
        let dealt = lost.get(&bystander).copied().unwrap_or(0);
        *next.round_record.damage_dealt.entry((attacker, bystander)).or_default() += dealt;
    }

    debug!(
        %a, %b,
        power_a = side_a.power,
        power_b = side_b.power,
        destroyed = destroyed_cities.len(),
        "battle resolved"
    );
    Ok(BattleOutcome {
        side_a: a,
        side_b: b,
        total_power_a: side_a.power,
        total_power_b: side_b.power,
        net_damage_a_to_b: net_a_to_b,
        net_damage_b_to_a: net_b_to_a,
        destroyed_cities,
        blocked_cities: blocked,
        barrier_absorbed: a_to_b.absorbed + b_to_a.absorbed,
        barrier_reflected: a_to_b.reflected + b_to_a.reflected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Modifier;
    use crate::tests::helpers::*;

    fn run(world: &World, a: PlayerId, b: PlayerId) -> (World, BattleOutcome) {
        let mut next = world.clone();
        let outcome = resolve_pair(world, &mut next, a, b).unwrap();
        (next, outcome)
    }

    fn hp(world: &World, player: PlayerId, name: &str) -> u64 {
        let key = world.city_key_by_name(player, name).unwrap();
        world.city(key).unwrap().current_hp
    }

    fn add_city_modifier(world: &mut World, player: PlayerId, name: &str, kind: ModifierKind) {
        let key = world.city_key_by_name(player, name).unwrap();
        world
            .city_mut(key)
            .unwrap()
            .modifiers
            .push(Modifier::for_rounds(kind, 1));
    }

    fn add_player_modifier(world: &mut World, player: PlayerId, kind: ModifierKind) {
        world
            .player_mut(player)
            .unwrap()
            .modifiers
            .push(Modifier::for_rounds(kind, 1));
    }

    mod power_tests {
        use super::*;

        #[test]
        fn fatigue_halves_unless_ignored() {
            let (mut world, a, _) = battle_world(&[("A1", 10000)], &[("B1", 1000)]);
            let key = world.city_key_by_name(a, "A1").unwrap();
            world.player_mut(a).unwrap().streaks.insert(key.city, 2);
            assert_eq!(city_power(&world, key).unwrap(), 5000);
            add_city_modifier(&mut world, a, "A1", ModifierKind::IgnoreFatigue);
            assert_eq!(city_power(&world, key).unwrap(), 10000);
        }

        #[test]
        fn center_and_jade_scale_power() {
            let (mut world, a, b) = battle_world(&[("A1", 10000)], &[("B1", 1000)]);
            let key = world.city_key_by_name(a, "A1").unwrap();
            world.player_mut(a).unwrap().set_center(key.city);
            assert_eq!(city_power(&world, key).unwrap(), 20000);
            world.status.set_jade_mark(key, b);
            assert_eq!(city_power(&world, key).unwrap(), 40000);
        }

        #[test]
        fn shadow_army_halves_side_total() {
            let (mut world, a, b) = battle_world(&[("A1", 5000), ("A2", 3000)], &[("B1", 1000)]);
            add_player_modifier(&mut world, a, ModifierKind::OutgoingDamageHalved);
            let (_, outcome) = run(&world, a, b);
            assert_eq!(outcome.total_power_a, 4000);
        }
    }

    mod resolution_tests {
        use super::*;

        #[test]
        fn simultaneous_damage_uses_snapshot() {
            let (world, a, b) = battle_world(&[("A1", 100), ("A2", 1000)], &[("B1", 100), ("B2", 1000)]);
            let (next, outcome) = run(&world, a, b);
            assert_eq!(outcome.total_power_a, 1100);
            assert_eq!(outcome.total_power_b, 1100);
            assert_eq!(outcome.net_damage_a_to_b, outcome.net_damage_b_to_a);
            assert_eq!(hp(&next, a, "A2"), 450);
            assert_eq!(hp(&next, b, "B2"), 450);
        }

        #[test]
        fn barrier_absorbs_and_reflects() {
            let (mut world, a, b) = battle_world(&[("A1", 11000), ("A2", 1000)], &[("D1", 1000)]);
            world.status.set_barrier(b, 8000, 5, 100);
            let (next, outcome) = run(&world, a, b);
            assert_eq!(outcome.barrier_absorbed, 8000);
            assert_eq!(outcome.barrier_reflected, 8000);
            assert!(next.status.barrier(b).is_none());
            assert!(outcome.destroyed_cities.contains(&"D1".to_string()));
            assert!(outcome.destroyed_cities.contains(&"A2".to_string()));
            assert_eq!(hp(&next, a, "A1"), 10500);
        }

        #[test]
        fn shield_blocks_one_summed_hit() {
            let (mut world, a, b) = battle_world(&[("A1", 9000)], &[("B1", 5000)]);
            let key = world.city_key_by_name(b, "B1").unwrap();
            world.status.set_protection(key, 10);
            let (next, outcome) = run(&world, a, b);
            assert_eq!(hp(&next, b, "B1"), 5000);
            assert_eq!(outcome.blocked_cities, vec!["B1".to_string()]);
            assert!(!next.status.has_protection(key));
            assert_eq!(hp(&next, a, "A1"), 4000);
        }

        #[test]
        fn attract_beats_priority() {
            let (mut world, a, b) =
                battle_world(&[("A1", 3000)], &[("B1", 9000), ("B2", 8000), ("B3", 7000)]);
            add_player_modifier(&mut world, a, ModifierKind::AttackPriorityHighestHp);
            add_city_modifier(&mut world, b, "B3", ModifierKind::Attract);
            let (next, _) = run(&world, a, b);
            assert_eq!(hp(&next, b, "B1"), 9000);
            assert_eq!(hp(&next, b, "B3"), 4000);
        }

        #[test]
        fn priority_hits_highest_hp() {
            let (mut world, a, b) = battle_world(&[("A1", 3000)], &[("B1", 8000), ("B2", 9000)]);
            add_player_modifier(&mut world, a, ModifierKind::AttackPriorityHighestHp);
            let (next, _) = run(&world, a, b);
            assert_eq!(hp(&next, b, "B1"), 8000);
            assert_eq!(hp(&next, b, "B2"), 6000);
        }

        #[test]
        fn even_split_gives_remainder_to_first() {
            let (world, a, b) =
                battle_world(&[("A1", 10)], &[("B1", 100), ("B2", 100), ("B3", 100)]);
            let (next, _) = run(&world, a, b);
            assert_eq!(hp(&next, b, "B1"), 96);
            assert_eq!(hp(&next, b, "B2"), 97);
            assert_eq!(hp(&next, b, "B3"), 97);
        }

        #[test]
        fn empty_side_takes_nothing() {
            let (world, a, b) = battle_world(&[("A1", 5000)], &[]);
            let (next, outcome) = run(&world, a, b);
            assert_eq!(outcome.total_power_b, 0);
            assert_eq!(outcome.net_damage_a_to_b, 0);
            assert_eq!(hp(&next, a, "A1"), 5000);
        }

        #[test]
        fn first_deployment_immunity_is_spent() {
            let (mut world, a, b) = battle_world(&[("A1", 5000)], &[("B1", 3000)]);
            let key = world.city_key_by_name(b, "B1").unwrap();
            world
                .city_mut(key)
                .unwrap()
                .modifiers
                .push(Modifier::until_consumed(ModifierKind::FirstDeploymentImmunity));
            let (next, _) = run(&world, a, b);
            let city = next.city(key).unwrap();
            assert_eq!(city.current_hp, 3000);
            assert_eq!(city.deployments, 1);
            assert!(!city.has_modifier(|k| matches!(k, ModifierKind::FirstDeploymentImmunity)));
        }

        #[test]
        fn deployed_cities_become_known() {
            let (world, a, b) = battle_world(&[("A1", 5000)], &[("B1", 3000)]);
            let key = world.city_key_by_name(b, "B1").unwrap();
            assert!(!world.status.is_known(a, key));
            let (next, _) = run(&world, a, b);
            assert!(next.status.is_known(a, key));
            assert!(next.round_record.fought(key));
        }
    }

    mod modifier_tests {
        use super::*;

        #[test]
        fn immunity_cancels_one_direction() {
            let (mut world, a, b) = battle_world(&[("A1", 5000)], &[("B1", 3000)]);
            add_player_modifier(&mut world, b, ModifierKind::DamageImmunity { from: a });
            let (next, _) = run(&world, a, b);
            assert_eq!(hp(&next, b, "B1"), 3000);
            assert_eq!(hp(&next, a, "A1"), 2000);
        }

        #[test]
        fn counterstrike_turns_damage_back() {
            let (mut world, a, b) = battle_world(&[("A1", 5000)], &[("B1", 8000)]);
            add_player_modifier(&mut world, b, ModifierKind::Counterstrike { against: a });
            let (next, outcome) = run(&world, a, b);
            assert_eq!(hp(&next, b, "B1"), 8000);
            assert!(outcome.destroyed_cities.contains(&"A1".to_string()));
        }

        #[test]
        fn straw_boats_heal_instead() {
            let (mut world, a, b) = battle_world(&[("A1", 5000)], &[("B1", 8000)]);
            let key = world.city_key_by_name(b, "B1").unwrap();
            world.city_mut(key).unwrap().current_hp = 4000;
            add_player_modifier(&mut world, b, ModifierKind::StrawBoats { against: a });
            let (next, _) = run(&world, a, b);
            assert_eq!(hp(&next, b, "B1"), 8000);
            assert_eq!(hp(&next, a, "A1"), 5000);
        }

        #[test]
        fn rest_and_wait_adds_per_city_bonus() {
            let (mut world, a, b) = battle_world(&[("A1", 1000)], &[("B1", 9000), ("B2", 9000)]);
            add_player_modifier(&mut world, a, ModifierKind::RestAndWait { against: b });
            let (next, _) = run(&world, a, b);
            assert_eq!(hp(&next, b, "B1"), 6500);
            assert_eq!(hp(&next, b, "B2"), 6500);
        }

        #[test]
        fn last_stand_splashes_when_side_destroyed_nothing() {
            let (mut world, a, b) = battle_world(&[("A1", 1000)], &[("B1", 20000), ("B2", 20000)]);
            add_city_modifier(&mut world, a, "A1", ModifierKind::SuicideAttack);
            add_city_modifier(&mut world, a, "A1", ModifierKind::DesperateRetaliation(5000));
            let (next, outcome) = run(&world, a, b);
            assert_eq!(hp(&next, b, "B1"), 20000 - 500 - 5000);
            assert_eq!(outcome.destroyed_cities, vec!["A1".to_string()]);
        }

        #[test]
        fn mutual_destruction_uses_pre_round_hp() {
            let (mut world, a, b) = battle_world(&[("A1", 4000)], &[("B1", 10000)]);
            add_city_modifier(&mut world, a, "A1", ModifierKind::MutualDestruction);
            let (next, outcome) = run(&world, a, b);
            assert_eq!(hp(&next, b, "B1"), 10000 - 4000 - 4000);
            assert_eq!(outcome.destroyed_cities, vec!["A1".to_string()]);
            assert_eq!(outcome.net_damage_a_to_b, 8000);
        }
    }

    mod deployment_tests {
        use super::*;

        #[test]
        fn powerless_attacker_still_takes_the_field() {
            let (mut world, a, b) = battle_world(&[("A1", 6000)], &[("B1", 3000)]);
            add_city_modifier(&mut world, a, "A1", ModifierKind::PowerMultiplier(0));
            world.status.set_barrier(b, 5000, 3, 50);
            let (next, outcome) = run(&world, a, b);

            assert_eq!(outcome.total_power_a, 0);
            assert_eq!(outcome.net_damage_a_to_b, 0);
            assert_eq!(outcome.barrier_absorbed, 0);
            assert_eq!(next.status.barrier(b).map(|x| x.hp), Some(5000));
            assert_eq!(hp(&next, b, "B1"), 3000);
            assert_eq!(hp(&next, a, "A1"), 3000);

            let a1 = world.city_key_by_name(a, "A1").unwrap();
            assert_eq!(next.city(a1).unwrap().deployments, 1);
            assert!(next.status.is_known(b, a1));
            assert!(next.round_record.fought(a1));
            assert_eq!(next.round_record.damage_dealt.get(&(a, b)), Some(&0));
        }

        #[test]
        fn explicit_line_ups_override_the_declared_ones() {
            let (world, a, b) = battle_world(&[("A1", 1000), ("A2", 9000)], &[("B1", 4000)]);
            let a2 = world.city_key_by_name(a, "A2").unwrap();
            let b1 = world.city_key_by_name(b, "B1").unwrap();
            let mut next = world.clone();
            let outcome = resolve_deployments(
                &world,
                &mut next,
                Deployment::new(a, &[a2.city]),
                Deployment::new(b, &[b1.city]),
            )
            .unwrap();
            assert_eq!(outcome.total_power_a, 9000);
            assert_eq!(hp(&next, a, "A1"), 1000);
            assert_eq!(hp(&next, a, "A2"), 5000);
            assert_eq!(outcome.destroyed_cities, vec!["B1".to_string()]);
        }

        #[test]
        fn missing_city_is_an_error() {
            let (world, a, b) = battle_world(&[("A1", 1000)], &[("B1", 4000)]);
            let mut next = world.clone();
            let ghost = [crate::entity::CityId::new(99)];
            assert!(resolve_deployments(
                &world,
                &mut next,
                Deployment::new(a, &ghost),
                Deployment::new(b, &[]),
            )
            .is_err());
        }
    }

    mod stratagem_tests {
        use super::*;

        fn set_center(world: &mut World, player: PlayerId, name: &str, province: &str) {
            let key = world.city_key_by_name(player, name).unwrap();
            let owner = world.player_mut(player).unwrap();
            owner.set_center(key.city);
            owner.cities.get_mut(&key.city).unwrap().province = province.to_string();
        }

        fn set_province(world: &mut World, player: PlayerId, name: &str, province: &str) {
            let key = world.city_key_by_name(player, name).unwrap();
            world.city_mut(key).unwrap().province = province.to_string();
        }

        #[test]
        fn siege_strikes_the_center_up_to_the_cap() {
            let (mut world, a, b) =
                battle_world(&[("A1", 30000)], &[("B1", 40000), ("Capital", 50000)]);
            set_center(&mut world, b, "Capital", "Jiangsu");
            let capital = world.city_key_by_name(b, "Capital").unwrap();
            let b1 = world.city_key_by_name(b, "B1").unwrap();
            world.set_deployment(b, vec![b1.city]);
            add_player_modifier(&mut world, a, ModifierKind::Besiege { against: b });

            let (next, outcome) = run(&world, a, b);
            assert_eq!(hp(&next, b, "B1"), 10000);
            assert_eq!(next.city(capital).unwrap().current_hp, 50000 - BESIEGE_CAP);
            assert_eq!(outcome.net_damage_a_to_b, 30000 + BESIEGE_CAP);
        }

        #[test]
        fn siege_is_lifted_by_a_city_of_the_same_province() {
            let (mut world, a, b) =
                battle_world(&[("A1", 3000)], &[("B1", 40000), ("Capital", 50000)]);
            set_center(&mut world, b, "Capital", "Jiangsu");
            set_province(&mut world, a, "A1", "Jiangsu");
            add_player_modifier(&mut world, a, ModifierKind::Besiege { against: b });

            let (next, _) = run(&world, a, b);
            let capital = world.city_key_by_name(b, "Capital").unwrap();
            assert_eq!(next.city(capital).unwrap().current_hp, 50000 - 1500);
        }

        #[test]
        fn weaker_feint_turns_on_the_bystander() {
            let (mut world, a, b) = battle_world(&[("A1", 3000)], &[("B1", 9000)]);
            let c = add_bystander(&mut world, &[("C1", 5000), ("C2", 5000)]);
            add_player_modifier(&mut world, a, ModifierKind::Feint { against: b });

            let (next, outcome) = run(&world, a, b);
            assert_eq!(hp(&next, b, "B1"), 9000);
            assert_eq!(hp(&next, c, "C1"), 3500);
            assert_eq!(hp(&next, c, "C2"), 3500);
            assert_eq!(outcome.net_damage_a_to_b, 0);
            assert_eq!(next.round_record.damage(a, c), 3000);
            assert!(outcome.destroyed_cities.contains(&"A1".to_string()));
        }

        #[test]
        fn stronger_feint_fights_normally() {
            let (mut world, a, b) = battle_world(&[("A1", 9000)], &[("B1", 3000)]);
            let c = add_bystander(&mut world, &[("C1", 5000)]);
            add_player_modifier(&mut world, a, ModifierKind::Feint { against: b });

            let (next, outcome) = run(&world, a, b);
            assert_eq!(hp(&next, c, "C1"), 5000);
            assert_eq!(outcome.net_damage_a_to_b, 3000);
        }

        #[test]
        fn feint_needs_exactly_three_players() {
            let (mut world, a, b) = battle_world(&[("A1", 3000)], &[("B1", 9000)]);
            add_player_modifier(&mut world, a, ModifierKind::Feint { against: b });
            let (next, _) = run(&world, a, b);
            assert_eq!(hp(&next, b, "B1"), 6000);
        }

        #[test]
        fn sprung_trap_disarms_and_draws_the_attack() {
            let (mut world, a, b) =
                battle_world(&[("A1", 6000)], &[("B1", 20000), ("Bait", 8000)]);
            let bait = world.city_key_by_name(b, "Bait").unwrap();
            world.status.set_trap(bait, a, 1);

            let (next, outcome) = run(&world, a, b);
            assert_eq!(outcome.total_power_b, 20000);
            assert_eq!(hp(&next, b, "Bait"), 2000);
            assert_eq!(hp(&next, b, "B1"), 20000);
            assert!(next.status.trap(bait).is_none());
        }

        #[test]
        fn trap_waits_for_its_setter() {
            let (mut world, a, b) = battle_world(&[("A1", 6000)], &[("Bait", 8000)]);
            let bait = world.city_key_by_name(b, "Bait").unwrap();
            let c = add_bystander(&mut world, &[]);
            world.status.set_trap(bait, c, 1);

            let (next, outcome) = run(&world, a, b);
            assert_eq!(outcome.total_power_b, 8000);
            assert!(next.status.is_trapped_by(bait, c));
        }
    }

    mod resolver_tests {
        use super::*;

        #[test]
        fn round_record_collects_damage() {
            let (world, a, b) = battle_world(&[("A1", 3000)], &[("B1", 2000)]);
            let mut next = world.clone();
            let mut log = GameLog::new();
            BattleResolver.resolve(&world, &mut next, &mut log).unwrap();
            assert_eq!(next.round_record.damage(a, b), 2000);
            assert_eq!(next.round_record.damage(b, a), 2000);
            assert_eq!(next.round_record.battles.len(), 1);
            assert_eq!(log.len(), 1);
        }
    }
}
