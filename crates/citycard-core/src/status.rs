//! Status Store: typed per-player and per-city status tables.
//!
//! Each status kind is its own sparse map keyed by [`CityKey`] or
//! [`PlayerId`]. Because keys carry stable city ids rather than roster
//! positions, removing a city never shifts another city's entries; moving a
//! city between players goes through [`StatusStore::transfer_city`], which
//! re-keys every table in one step.
//!
//! # Shield order
//!
//! [`StatusStore::consume_shield`] is the single choke point for blocking a hit.
//! Protection (single charge) is spent before IronShield charges so the
//! stronger shield survives for later hits in the same round.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ability::Ability;
use crate::entity::{CityId, CityKey, PlayerId};
use crate::ledger::tick_map;

// =============================================================================
// Entry types
// =============================================================================

/// A player-wide HP pool that intercepts combat damage before any city.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barrier {
    /// Remaining HP.
    pub hp: u64,
    /// HP cap.
    pub max_hp: u64,
    /// Rounds left.
    pub rounds_left: u32,
    /// Percent of absorbed damage reflected onto the attacker.
    pub reflect_percent: u32,
}

/// Result of pushing damage into a barrier.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierHit {
    /// Damage the barrier took.
    pub absorbed: u64,
    /// Damage left over for the cities behind it.
    pub overflow: u64,
    /// `floor(absorbed * reflect_percent / 100)`.
    pub reflected: u64,
    /// Whether the barrier broke.
    pub destroyed: bool,
}

/// Which shield blocked a hit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShieldKind {
    /// Single-charge Protection.
    Protection,
    /// Multi-charge IronShield.
    IronShield,
}

/// A fake identity shown to opponents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disguise {
    /// Name shown instead of the real one.
    pub alias: String,
    /// HP shown instead of the real value.
    pub shown_hp: u64,
    /// Rounds left.
    pub rounds_left: u32,
}

/// Why a city is kept out of deployment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockoutReason {
    /// Recovering from a heal.
    Healing,
    /// Benched for gold; HP drops to a fifth of `original_hp` when it ends.
    Benched {
        /// HP when benched.
        original_hp: u64,
    },
    /// Recovering from berserk.
    Exhausted,
}

/// A deployment lockout.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockout {
    /// Why.
    pub reason: LockoutReason,
    /// Rounds left.
    pub rounds_left: u32,
}

/// Jade-shatter mark, valid for the round it is placed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JadeMark {
    /// Who placed it.
    pub by: PlayerId,
}

/// A trap set on an opponent's city; it springs the next time that city
/// fights the trapper.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trap {
    /// Who set it.
    pub by: PlayerId,
    /// Round it was set in.
    pub round: u32,
}

/// Berserk bookkeeping for a city.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BerserkRecord {
    /// Max HP before going berserk.
    pub original_max_hp: u64,
    /// Whether the post-battle aftermath is still due.
    pub aftermath_pending: bool,
}

// =============================================================================
// Status Store
// =============================================================================

/// Every status table in the game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusStore {
    protections: BTreeMap<CityKey, u32>,
    iron: BTreeMap<CityKey, u32>,
    barriers: BTreeMap<PlayerId, Barrier>,
    anchors: BTreeMap<CityKey, u32>,
    known: BTreeSet<(PlayerId, CityKey)>,
    disguises: BTreeMap<CityKey, Disguise>,
    lockouts: BTreeMap<CityKey, Lockout>,
    hard_blocks: BTreeMap<PlayerId, u32>,
    jade_marks: BTreeMap<CityKey, JadeMark>,
    traps: BTreeMap<CityKey, Trap>,
    berserk: BTreeMap<CityKey, BerserkRecord>,
    successors: BTreeMap<PlayerId, CityId>,
    sub_centers: BTreeMap<PlayerId, CityId>,
    financial_crisis: u32,
}

impl StatusStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Shields
    // -------------------------------------------------------------------------

    /// Places a Protection lasting `rounds`. Replaces an existing one.
    pub fn set_protection(&mut self, key: CityKey, rounds: u32) {
        self.protections.insert(key, rounds);
    }

    /// Places an IronShield with `charges`. Replaces an existing one.
    pub fn set_iron_shield(&mut self, key: CityKey, charges: u32) {
        if charges > 0 {
            self.iron.insert(key, charges);
        }
    }

    /// Removes a Protection, returning whether one was present.
    pub fn clear_protection(&mut self, key: CityKey) -> bool {
        self.protections.remove(&key).is_some()
    }

    /// Whether the city has an active Protection.
    #[must_use]
    pub fn has_protection(&self, key: CityKey) -> bool {
        self.protections.contains_key(&key)
    }

    /// IronShield charges left (0 if none).
    #[must_use]
    pub fn iron_charges(&self, key: CityKey) -> u32 {
        self.iron.get(&key).copied().unwrap_or(0)
    }

    /// Whether the city has any shield.
    #[must_use]
    pub fn is_shielded(&self, key: CityKey) -> bool {
        self.has_protection(key) || self.iron_charges(key) > 0
    }

    /// Spends one shield charge against a hit.
    ///
    /// Protection goes first, then IronShield. Returns whether anything
    /// absorbed the hit.
    pub fn consume_shield(&mut self, key: CityKey) -> bool {
        self.consume_shield_kind(key).is_some()
    }

    /// Like [`consume_shield`](Self::consume_shield), reporting which shield.
    pub fn consume_shield_kind(&mut self, key: CityKey) -> Option<ShieldKind> {
        if self.protections.remove(&key).is_some() {
            return Some(ShieldKind::Protection);
        }
        let charges = self.iron.get_mut(&key)?;
        *charges -= 1;
        if *charges == 0 {
            self.iron.remove(&key);
        }
        Some(ShieldKind::IronShield)
    }

    // -------------------------------------------------------------------------
    // Barriers
    // -------------------------------------------------------------------------

    /// Raises a barrier for `player`. Replaces an existing one.
    pub fn set_barrier(&mut self, player: PlayerId, hp: u64, rounds: u32, reflect_percent: u32) {
        self.barriers.insert(
            player,
            Barrier {
                hp,
                max_hp: hp,
                rounds_left: rounds,
                reflect_percent: reflect_percent.min(100),
            },
        );
    }

    /// The barrier of `player`, if any.
    #[must_use]
    pub fn barrier(&self, player: PlayerId) -> Option<&Barrier> {
        self.barriers.get(&player)
    }

    /// Pushes `amount` damage into the barrier of `player`.
    ///
    /// `absorbed = min(amount, hp)`, `overflow = amount - absorbed`, and
    /// `reflected = floor(absorbed * reflect_percent / 100)`. A barrier whose HP
    /// reaches zero is removed. Without a barrier everything overflows.
    pub fn damage_barrier(&mut self, player: PlayerId, amount: u64) -> BarrierHit {
        let Some(barrier) = self.barriers.get_mut(&player) else {
            return BarrierHit {
                overflow: amount,
                ..BarrierHit::default()
            };
        };
        let absorbed = amount.min(barrier.hp);
        barrier.hp -= absorbed;
        let reflected = absorbed * u64::from(barrier.reflect_percent) / 100;
        let destroyed = barrier.hp == 0;
        if destroyed {
            self.barriers.remove(&player);
        }
        BarrierHit {
            absorbed,
            overflow: amount - absorbed,
            reflected,
            destroyed,
        }
    }

    /// Every barrier regains `amount` HP, capped at its max.
    pub fn regenerate_barriers(&mut self, amount: u64) {
        for barrier in self.barriers.values_mut() {
            barrier.hp = barrier.hp.saturating_add(amount).min(barrier.max_hp);
        }
    }

    // -------------------------------------------------------------------------
    // Visibility and disguise
    // -------------------------------------------------------------------------

    /// `observer` now knows the city at `key`.
    pub fn mark_known(&mut self, observer: PlayerId, key: CityKey) {
        if observer != key.player {
            self.known.insert((observer, key));
        }
    }

    /// Whether `observer` knows the city. Owners always know their own cities.
    #[must_use]
    pub fn is_known(&self, observer: PlayerId, key: CityKey) -> bool {
        observer == key.player || self.known.contains(&(observer, key))
    }

    /// Disguises a city.
    pub fn set_disguise(&mut self, key: CityKey, alias: impl Into<String>, shown_hp: u64, rounds: u32) {
        self.disguises.insert(
            key,
            Disguise {
                alias: alias.into(),
                shown_hp,
                rounds_left: rounds,
            },
        );
    }

    /// The disguise on a city, if any.
    #[must_use]
    pub fn disguise(&self, key: CityKey) -> Option<&Disguise> {
        self.disguises.get(&key)
    }

    // -------------------------------------------------------------------------
    // Locks and lockouts
    // -------------------------------------------------------------------------

    /// Anchors a city against swaps for `rounds`.
    pub fn lock(&mut self, key: CityKey, rounds: u32) {
        if rounds > 0 {
            self.anchors.insert(key, rounds);
        }
    }

    /// Whether the city is anchored.
    #[must_use]
    pub fn is_locked(&self, key: CityKey) -> bool {
        self.anchors.contains_key(&key)
    }

    /// Keeps a city out of deployment for `rounds`.
    pub fn set_lockout(&mut self, key: CityKey, reason: LockoutReason, rounds: u32) {
        if rounds > 0 {
            self.lockouts.insert(
                key,
                Lockout {
                    reason,
                    rounds_left: rounds,
                },
            );
        }
    }

    /// The lockout on a city, if any.
    #[must_use]
    pub fn lockout(&self, key: CityKey) -> Option<&Lockout> {
        self.lockouts.get(&key)
    }

    /// Iterates over locked-out cities.
    pub fn lockouts(&self) -> impl Iterator<Item = (&CityKey, &Lockout)> {
        self.lockouts.iter()
    }

    // -------------------------------------------------------------------------
    // Hard block
    // -------------------------------------------------------------------------

    /// Raises `player`'s hard block for `rounds`.
    pub fn set_hard_block(&mut self, player: PlayerId, rounds: u32) {
        if rounds > 0 {
            self.hard_blocks.insert(player, rounds);
        }
    }

    /// Rounds of hard block left.
    #[must_use]
    pub fn hard_block_rounds(&self, player: PlayerId) -> u32 {
        self.hard_blocks.get(&player).copied().unwrap_or(0)
    }

    /// Whether `target`'s hard block stops `caster` from using `ability` on them.
    #[must_use]
    pub fn is_hard_blocked(&self, target: PlayerId, caster: PlayerId, ability: Ability) -> bool {
        target != caster && self.hard_block_rounds(target) > 0 && ability.is_hard_blockable()
    }

    // -------------------------------------------------------------------------
    // Round-scoped marks and designations
    // -------------------------------------------------------------------------

    /// Places a jade mark.
    pub fn set_jade_mark(&mut self, key: CityKey, by: PlayerId) {
        self.jade_marks.insert(key, JadeMark { by });
    }

    /// The jade mark on a city, if any.
    #[must_use]
    pub fn jade_mark(&self, key: CityKey) -> Option<&JadeMark> {
        self.jade_marks.get(&key)
    }

    /// Iterates over jade-marked cities.
    pub fn jade_marks(&self) -> impl Iterator<Item = (&CityKey, &JadeMark)> {
        self.jade_marks.iter()
    }

    /// Sets a trap on a city, replacing any earlier one.
    pub fn set_trap(&mut self, key: CityKey, by: PlayerId, round: u32) {
        self.traps.insert(key, Trap { by, round });
    }

    /// The trap on a city, if any.
    #[must_use]
    pub fn trap(&self, key: CityKey) -> Option<&Trap> {
        self.traps.get(&key)
    }

    /// Whether `by` has a trap waiting on the city.
    #[must_use]
    pub fn is_trapped_by(&self, key: CityKey, by: PlayerId) -> bool {
        self.traps.get(&key).is_some_and(|t| t.by == by)
    }

    /// Removes a sprung trap, returning whether one was present.
    pub fn spring_trap(&mut self, key: CityKey) -> bool {
        self.traps.remove(&key).is_some()
    }

    /// Records that a city went berserk.
    pub fn record_berserk(&mut self, key: CityKey, original_max_hp: u64) {
        self.berserk.insert(
            key,
            BerserkRecord {
                original_max_hp,
                aftermath_pending: true,
            },
        );
    }

    /// Berserk record of a city, if it ever went berserk.
    #[must_use]
    pub fn berserk(&self, key: CityKey) -> Option<&BerserkRecord> {
        self.berserk.get(&key)
    }

    /// Takes every pending berserk aftermath, leaving the records in place.
    pub fn take_berserk_aftermath(&mut self) -> Vec<(CityKey, u64)> {
        self.berserk
            .iter_mut()
            .filter(|(_, r)| r.aftermath_pending)
            .map(|(key, record)| {
                record.aftermath_pending = false;
                (*key, record.original_max_hp)
            })
            .collect()
    }

    /// Designates `city` as `player`'s center successor.
    pub fn set_successor(&mut self, player: PlayerId, city: CityId) {
        self.successors.insert(player, city);
    }

    /// Removes and returns `player`'s successor.
    pub fn take_successor(&mut self, player: PlayerId) -> Option<CityId> {
        self.successors.remove(&player)
    }

    /// `player`'s successor, if any.
    #[must_use]
    pub fn successor(&self, player: PlayerId) -> Option<CityId> {
        self.successors.get(&player).copied()
    }

    /// Iterates over all successor designations.
    pub fn successors(&self) -> impl Iterator<Item = (&PlayerId, &CityId)> {
        self.successors.iter()
    }

    /// Designates `city` as `player`'s sub-center.
    pub fn set_sub_center(&mut self, player: PlayerId, city: CityId) {
        self.sub_centers.insert(player, city);
    }

    /// Whether the city is its owner's sub-center.
    #[must_use]
    pub fn is_sub_center(&self, key: CityKey) -> bool {
        self.sub_centers.get(&key.player) == Some(&key.city)
    }

    /// Starts a financial crisis for `rounds`.
    pub fn start_financial_crisis(&mut self, rounds: u32) {
        self.financial_crisis = rounds;
    }

    /// Whether a financial crisis is running.
    #[must_use]
    pub const fn financial_crisis_active(&self) -> bool {
        self.financial_crisis > 0
    }

    // -------------------------------------------------------------------------
    // Re-keying and cleanup
    // -------------------------------------------------------------------------

    /// Moves every per-city entry from `from` to `to` in one step.
    ///
    /// A disguise travels with the card. A trap set by the new owner is
    /// dropped, and player-level designations pointing at the city are
    /// cleared, since the city has left that roster.
    pub fn transfer_city(&mut self, from: CityKey, to: CityKey) {
        rekey(&mut self.protections, from, to);
        rekey(&mut self.iron, from, to);
        rekey(&mut self.anchors, from, to);
        rekey(&mut self.lockouts, from, to);
        rekey(&mut self.jade_marks, from, to);
        rekey(&mut self.berserk, from, to);
        rekey(&mut self.disguises, from, to);
        rekey(&mut self.traps, from, to);
        if self.is_trapped_by(to, to.player) {
            self.traps.remove(&to);
        }

        let observers: Vec<PlayerId> = self
            .known
            .iter()
            .filter(|(_, key)| *key == from)
            .map(|(observer, _)| *observer)
            .collect();
        for observer in observers {
            self.known.remove(&(observer, from));
            if observer != to.player {
                self.known.insert((observer, to));
            }
        }

        if self.successors.get(&from.player) == Some(&from.city) {
            self.successors.remove(&from.player);
        }
        if self.sub_centers.get(&from.player) == Some(&from.city) {
            self.sub_centers.remove(&from.player);
        }
    }

    /// Drops the city-scoped entries of a city that just died.
    ///
    /// Visibility and berserk history survive death.
    pub fn clear_dead_city(&mut self, key: CityKey) {
        self.protections.remove(&key);
        self.iron.remove(&key);
        self.anchors.remove(&key);
        self.disguises.remove(&key);
        self.lockouts.remove(&key);
        self.traps.remove(&key);
        if self.sub_centers.get(&key.player) == Some(&key.city) {
            self.sub_centers.remove(&key.player);
        }
    }

    // -------------------------------------------------------------------------
    // Expiry (called by the expiry resolver in a fixed order)
    // -------------------------------------------------------------------------

    /// Decrements barrier lifetimes.
    pub fn tick_barriers(&mut self) {
        self.barriers.retain(|_, b| {
            b.rounds_left = b.rounds_left.saturating_sub(1);
            b.rounds_left > 0
        });
    }

    /// Decrements Protection lifetimes.
    pub fn tick_protections(&mut self) {
        tick_map(&mut self.protections);
    }

    /// Decrements anchor lifetimes.
    pub fn tick_anchors(&mut self) {
        tick_map(&mut self.anchors);
    }

    /// Decrements disguise lifetimes.
    pub fn tick_disguises(&mut self) {
        self.disguises.retain(|_, d| {
            d.rounds_left = d.rounds_left.saturating_sub(1);
            d.rounds_left > 0
        });
    }

    /// Decrements lockouts, returning the ones that ended.
    pub fn tick_lockouts(&mut self) -> Vec<(CityKey, Lockout)> {
        let mut ended = Vec::new();
        self.lockouts.retain(|key, lockout| {
            lockout.rounds_left = lockout.rounds_left.saturating_sub(1);
            if lockout.rounds_left == 0 {
                ended.push((*key, *lockout));
                false
            } else {
                true
            }
        });
        ended
    }

    /// Decrements hard blocks.
    pub fn tick_hard_blocks(&mut self) {
        tick_map(&mut self.hard_blocks);
    }

    /// Jade marks last one round.
    pub fn clear_jade_marks(&mut self) {
        self.jade_marks.clear();
    }

    /// Decrements the financial crisis.
    pub fn tick_financial_crisis(&mut self) {
        self.financial_crisis = self.financial_crisis.saturating_sub(1);
    }
}

fn rekey<V>(map: &mut BTreeMap<CityKey, V>, from: CityKey, to: CityKey) {
    if let Some(value) = map.remove(&from) {
        map.insert(to, value);
    }
}
