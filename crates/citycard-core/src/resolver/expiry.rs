//! Timer expiry.
//!
//! Every timer decrements exactly once per round, in a fixed order, so an
//! effect created this round has already spent its first round when it is
//! first ticked.

use crate::entity::CityKey;
use crate::error::ResolveError;
use crate::log::GameLog;
use crate::status::LockoutReason;
use crate::world::{Phase, World};

use super::PhaseResolver;

/// Percent of its pre-bench HP a benched city returns with.
pub const BENCH_RETURN_PERCENT: u64 = 20;

/// Decrements every timer-bearing entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpiryResolver;

impl PhaseResolver for ExpiryResolver {
    fn phase(&self) -> Phase {
        Phase::Expiring
    }

    fn resolve(
        &self,
        current: &World,
        next: &mut World,
        log: &mut GameLog,
    ) -> Result<(), ResolveError> {
        let round = current.round;

        next.status.tick_barriers();
        next.status.tick_protections();
        next.status.tick_anchors();
        next.status.tick_disguises();
        for (key, lockout) in next.status.tick_lockouts() {
            if let LockoutReason::Benched { original_hp } = lockout.reason {
                return_from_bench(next, key, original_hp, round, log);
            }
        }
        next.status.tick_hard_blocks();
        next.status.clear_jade_marks();

        next.ledger.tick_bans();
        next.ledger.tick_cooldowns();
        next.ledger.tick_stare_downs();
        next.ledger.tick_loans();
        next.status.tick_financial_crisis();

        let ids: Vec<_> = next.players().map(|p| p.id).collect();
        for id in &ids {
            if let Some(player) = next.player_mut(*id) {
                for city in player.cities.values_mut() {
                    city.modifiers.retain_mut(|m| m.tick());
                }
            }
        }
        for id in &ids {
            if let Some(player) = next.player_mut(*id) {
                player.modifiers.retain_mut(|m| m.tick());
            }
        }
        Ok(())
    }
}

fn return_from_bench(next: &mut World, key: CityKey, original_hp: u64, round: u32, log: &mut GameLog) {
    let Some(city) = next.city_mut(key) else {
        return;
    };
    if !city.alive {
        return;
    }
    let hp = (original_hp * BENCH_RETURN_PERCENT / 100).max(1);
    city.set_hp(hp);
    let name = city.name.clone();
    log.private(round, key.player, format!("{name} returns from the bench with {hp} HP"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::Ability;
    use crate::entity::{Modifier, ModifierKind};
    use crate::tests::helpers::*;

    fn expire(world: &World) -> World {
        let mut next = world.clone();
        let mut log = GameLog::new();
        ExpiryResolver.resolve(world, &mut next, &mut log).unwrap();
        next
    }

    #[test]
    fn timer_of_n_survives_n_passes() {
        let (mut world, a, _) = battle_world(&[("A1", 8000)], &[("B1", 100)]);
        let key = world.city_key_by_name(a, "A1").unwrap();
        world.status.set_protection(key, 2);
        world.status.set_barrier(a, 15000, 2, 50);
        let once = expire(&world);
        assert!(once.status.has_protection(key));
        assert!(once.status.barrier(a).is_some());
        let twice = expire(&once);
        assert!(!twice.status.has_protection(key));
        assert!(twice.status.barrier(a).is_none());
    }

    #[test]
    fn one_round_modifiers_are_gone_after_expiry() {
        let (mut world, a, b) = battle_world(&[("A1", 8000)], &[("B1", 100)]);
        let key = world.city_key_by_name(a, "A1").unwrap();
        world
            .city_mut(key)
            .unwrap()
            .modifiers
            .push(Modifier::for_rounds(ModifierKind::Attract, 1));
        world
            .player_mut(a)
            .unwrap()
            .modifiers
            .push(Modifier::for_rounds(ModifierKind::DamageImmunity { from: b }, 1));
        world.status.set_jade_mark(key, b);
        let next = expire(&world);
        assert!(next.city(key).unwrap().modifiers.is_empty());
        assert!(next.player(a).unwrap().modifiers.is_empty());
        assert!(next.status.jade_mark(key).is_none());
    }

    #[test]
    fn ledger_timers_tick() {
        let (mut world, a, b) = battle_world(&[("A1", 8000)], &[("B1", 100)]);
        world.ledger.start_cooldown(Ability::Foresight, a, 2);
        world.ledger.ban(b, Ability::SetBarrier, 1);
        let next = expire(&world);
        assert_eq!(next.ledger.remaining_cooldown(Ability::Foresight, a), 1);
        assert!(next.ledger.disabled_reason(Ability::SetBarrier, b).is_none());
    }

    #[test]
    fn bench_return_sets_fifth_of_original() {
        let (mut world, a, _) = battle_world(&[("A1", 8000)], &[("B1", 100)]);
        let key = world.city_key_by_name(a, "A1").unwrap();
        world.lock_out(key, LockoutReason::Benched { original_hp: 8000 }, 1);
        let next = expire(&world);
        assert!(next.status.lockout(key).is_none());
        assert_eq!(next.city(key).unwrap().current_hp, 1600);
    }
}
