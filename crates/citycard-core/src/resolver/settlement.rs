//! Post-battle settlement.
//!
//! Runs once per round after the battles, in a fixed order: income, loot,
//! bench bonus, berserk aftermath, jade aftermath, fatigue streaks, successor
//! growth and barrier regeneration. Battle facts come from the
//! [`RoundRecord`](crate::world::RoundRecord) the battle phase left in
//! `current`.

use tracing::debug;

use crate::entity::{CityKey, ModifierKind, PlayerId};
use crate::error::ResolveError;
use crate::log::GameLog;
use crate::status::LockoutReason;
use crate::world::{Phase, World};

use super::PhaseResolver;

/// Damage that earns one gold of loot.
pub const LOOT_DAMAGE_PER_GOLD: u64 = 1500;
/// Most gold one loot can steal.
pub const LOOT_MAX: u32 = 10;
/// Gold per round for each benched city.
pub const BENCH_INCOME: u32 = 2;
/// Rounds a city sits out after berserk.
pub const BERSERK_EXHAUSTION: u32 = 5;
/// HP ceiling of successor growth.
pub const SUCCESSOR_HP_CAP: u64 = 120_000;

/// Applies income and post-battle effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementResolver;

impl PhaseResolver for SettlementResolver {
    fn phase(&self) -> Phase {
        Phase::Settling
    }

    fn resolve(
        &self,
        current: &World,
        next: &mut World,
        log: &mut GameLog,
    ) -> Result<(), ResolveError> {
        let round = current.round;
        let players = current.active_players();

        // --- income
        let income = if current.status.financial_crisis_active() {
            current.config().crisis_income
        } else {
            current.config().base_income
        };
        for &player in &players {
            if current.ledger.loan_rounds(player) > 0 {
                log.private(round, player, "Loan outstanding: no income this round");
                continue;
            }
            let receiver = income_receiver(current, &players, player);
            let credited = next.ledger.credit(receiver, income);
            if receiver == player {
                log.private(round, player, format!("Income: +{credited} gold"));
            } else {
                log.public(
                    round,
                    format!(
                        "{} collected {}'s income ({credited} gold)",
                        current.player_name(receiver),
                        current.player_name(player)
                    ),
                );
            }
        }

        // --- loot
        for &player in &players {
            let Some(owner) = current.player(player) else {
                continue;
            };
            for modifier in &owner.modifiers {
                let ModifierKind::Loot { against } = modifier.kind else {
                    continue;
                };
                let damage = current.round_record.damage(player, against);
                let owed = u32::try_from(damage / LOOT_DAMAGE_PER_GOLD)
                    .unwrap_or(u32::MAX)
                    .min(LOOT_MAX)
                    .min(next.ledger.headroom(player));
                let taken = next.ledger.take_up_to(against, owed);
                next.ledger.credit(player, taken);
                if taken > 0 {
                    log.public(
                        round,
                        format!(
                            "{} looted {taken} gold from {}",
                            current.player_name(player),
                            current.player_name(against)
                        ),
                    );
                }
            }
        }

        // --- bench
        for (key, lockout) in current.status.lockouts() {
            if matches!(lockout.reason, LockoutReason::Benched { .. })
                && current.is_active(key.player)
            {
                next.ledger.credit(key.player, BENCH_INCOME);
            }
        }

        // --- berserk aftermath
        for (key, original_max) in next.status.take_berserk_aftermath() {
            let Some(city) = next.city_mut(key) else {
                continue;
            };
            if !city.alive {
                continue;
            }
            let halved = (city.current_hp / 2).max(1);
            city.max_hp = original_max;
            city.set_hp(halved);
            let name = city.name.clone();
            next.lock_out(key, LockoutReason::Exhausted, BERSERK_EXHAUSTION);
            log.public(round, format!("{name} collapses after its berserk fury"));
        }

        // --- jade aftermath
        let marked: Vec<CityKey> = current.status.jade_marks().map(|(key, _)| *key).collect();
        for key in marked {
            if !next.city(key).is_some_and(|c| c.alive) {
                continue;
            }
            let name = next.city_name(key);
            if current.round_record.fought(key) {
                next.destroy_city(key);
                log.public(round, format!("{name} shattered like jade"));
            } else if let Some(city) = next.city_mut(key) {
                let halved = (city.current_hp / 2).max(1);
                city.set_hp(halved);
                log.public(round, format!("{name} cracked and lost half its HP"));
            }
        }

        // --- streaks
        for &player in &players {
            let fought = current
                .round_record
                .fought
                .get(&player)
                .cloned()
                .unwrap_or_default();
            if let Some(owner) = next.player_mut(player) {
                let ids: Vec<_> = owner.cities.keys().copied().collect();
                for id in ids {
                    if fought.contains(&id) {
                        *owner.streaks.entry(id).or_default() += 1;
                    } else {
                        owner.streaks.remove(&id);
                    }
                }
            }
        }

        // --- successor growth
        let successors: Vec<(PlayerId, _)> =
            current.status.successors().map(|(p, c)| (*p, *c)).collect();
        for (player, id) in successors {
            if let Some(city) = next.city_mut(CityKey::new(player, id)) {
                if !city.alive {
                    continue;
                }
                let grown = city
                    .current_hp
                    .saturating_add(city.base_hp / 10)
                    .min(SUCCESSOR_HP_CAP);
                if grown > city.current_hp {
                    city.set_hp_raising_max(grown);
                }
            }
        }

        // --- barrier regeneration
        let regen = current.config().barrier_regen;
        next.status.regenerate_barriers(regen);

        debug!(round, players = players.len(), "settlement applied");
        Ok(())
    }
}

/// Who collects `player`'s income: a rest-and-wait caster aimed at them, else
/// the player.
fn income_receiver(world: &World, players: &[PlayerId], player: PlayerId) -> PlayerId {
    players
        .iter()
        .copied()
        .find(|other| {
            *other != player
                && world.player(*other).is_some_and(|p| {
                    p.has_modifier(|k| *k == ModifierKind::RestAndWait { against: player })
                })
        })
        .unwrap_or(player)
}
