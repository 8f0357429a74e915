//! The shared world state.
//!
//! [`World`] bundles everything an ability or a phase resolver may touch:
//! players and their rosters, the [`ResourceLedger`], the [`StatusStore`], the
//! unused-city pool, declared deployments and the seeded RNG. It is `Clone`
//! so the game can snapshot it before every ability and before every phase,
//! and `PartialEq` so tests can assert that a failed call changed nothing.
//!
//! # Phases
//!
//! ```text
//! AbilityWindow -> DeploymentLocked -> Resolving -> Settling -> Expiring -> WinCheck
//!       ^                                                                     |
//!       +---------------------------------------------------------------------+
//! ```
//!
//! `WinCheck` leads to [`Phase::GameOver`] instead once at most one team is left.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::BaseCity;
use crate::config::GameConfig;
use crate::entity::{City, CityId, CityKey, ModifierKind, Player, PlayerId};
use crate::ledger::ResourceLedger;
use crate::resolver::BattleOutcome;
use crate::status::{LockoutReason, StatusStore};

// =============================================================================
// Phase
// =============================================================================

/// Round lifecycle state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Abilities may be activated and deployments declared.
    AbilityWindow,
    /// Deployments are frozen.
    DeploymentLocked,
    /// Battles have been resolved.
    Resolving,
    /// Income and post-battle effects have been applied.
    Settling,
    /// Timers have been decremented.
    Expiring,
    /// Eliminations have been evaluated.
    WinCheck,
    /// Terminal state.
    GameOver,
}

impl Phase {
    /// The phase that follows this one in a normal round.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::AbilityWindow => Self::DeploymentLocked,
            Self::DeploymentLocked => Self::Resolving,
            Self::Resolving => Self::Settling,
            Self::Settling => Self::Expiring,
            Self::Expiring => Self::WinCheck,
            Self::WinCheck => Self::AbilityWindow,
            Self::GameOver => Self::GameOver,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// Round record
// =============================================================================

/// What the battle phase leaves behind for settlement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Cities that actually fought, per player.
    pub fought: BTreeMap<PlayerId, Vec<CityId>>,
    /// City HP removed, keyed by `(attacker, defender)`.
    pub damage_dealt: BTreeMap<(PlayerId, PlayerId), u64>,
    /// Outcomes of this round's battles.
    pub battles: Vec<BattleOutcome>,
}

impl RoundRecord {
    /// Whether the city fought this round.
    #[must_use]
    pub fn fought(&self, key: CityKey) -> bool {
        self.fought
            .get(&key.player)
            .is_some_and(|cities| cities.contains(&key.city))
    }

    /// HP `attacker` removed from `defender` this round.
    #[must_use]
    pub fn damage(&self, attacker: PlayerId, defender: PlayerId) -> u64 {
        self.damage_dealt
            .get(&(attacker, defender))
            .copied()
            .unwrap_or(0)
    }
}

// =============================================================================
// World
// =============================================================================

/// All mutable game state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct World {
    config: GameConfig,
    /// Current round, starting at 1.
    pub round: u32,
    /// Current phase.
    pub phase: Phase,
    players: BTreeMap<PlayerId, Player>,
    turn_order: Vec<PlayerId>,
    /// Gold, costs, caps, cooldowns and bans.
    pub ledger: ResourceLedger,
    /// Shields, barriers, visibility and every other status table.
    pub status: StatusStore,
    pool: BTreeSet<String>,
    deployments: BTreeMap<PlayerId, Vec<CityId>>,
    rng: ChaCha8Rng,
    next_city_id: u32,
    /// Battle results for the round in progress.
    pub round_record: RoundRecord,
}

impl World {
    /// Creates an empty world at round 1, in the ability window.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        Self {
            round: 1,
            phase: Phase::AbilityWindow,
            players: BTreeMap::new(),
            turn_order: Vec::new(),
            ledger: ResourceLedger::new(config.gold_cap),
            status: StatusStore::new(),
            pool: BTreeSet::new(),
            deployments: BTreeMap::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            next_city_id: 1,
            round_record: RoundRecord::default(),
            config,
        }
    }

    /// Engine tunables.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The world RNG. Its position is part of the state, so rollback rewinds it.
    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    // -------------------------------------------------------------------------
    // Players
    // -------------------------------------------------------------------------

    /// Adds a player at the end of the turn order and opens their account.
    pub fn add_player(&mut self, name: impl Into<String>, team: u8) -> PlayerId {
        let id = PlayerId::new(u32::try_from(self.players.len()).unwrap_or(u32::MAX));
        self.players.insert(id, Player::new(id, name, team));
        self.turn_order.push(id);
        self.ledger.open_account(id, self.config.starting_gold);
        id
    }

    /// Returns a player.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Returns a player, mutably.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Looks a player up by name.
    #[must_use]
    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.values().find(|p| p.name == name)
    }

    /// Iterates over every player in id order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Turn order.
    #[must_use]
    pub fn turn_order(&self) -> &[PlayerId] {
        &self.turn_order
    }

    /// Non-eliminated players in turn order.
    #[must_use]
    pub fn active_players(&self) -> Vec<PlayerId> {
        self.turn_order
            .iter()
            .copied()
            .filter(|id| self.players.get(id).is_some_and(|p| !p.eliminated))
            .collect()
    }

    /// Whether `id` names a player who is still in the game.
    #[must_use]
    pub fn is_active(&self, id: PlayerId) -> bool {
        self.players.get(&id).is_some_and(|p| !p.eliminated)
    }

    /// Teams that still have a non-eliminated player.
    #[must_use]
    pub fn teams_remaining(&self) -> BTreeSet<u8> {
        self.players
            .values()
            .filter(|p| !p.eliminated)
            .map(|p| p.team)
            .collect()
    }

    /// Display name of a player, or its id if it does not exist.
    #[must_use]
    pub fn player_name(&self, id: PlayerId) -> String {
        self.players
            .get(&id)
            .map_or_else(|| id.to_string(), |p| p.name.clone())
    }

    // -------------------------------------------------------------------------
    // Cities
    // -------------------------------------------------------------------------

    /// Allocates a game-unique city id.
    pub fn allocate_city_id(&mut self) -> CityId {
        let id = CityId::new(self.next_city_id);
        self.next_city_id += 1;
        id
    }

    /// Creates a full-health city from catalog data in `player`'s roster.
    pub fn grant_city(&mut self, player: PlayerId, name: &str, base: &BaseCity) -> Option<CityKey> {
        if !self.players.contains_key(&player) {
            return None;
        }
        let id = self.allocate_city_id();
        let city = City::new(id, name, base.max_hp).with_classification(&base.province, base.tags);
        self.players.get_mut(&player)?.add_city(city);
        self.pool.remove(name);
        Some(CityKey::new(player, id))
    }

    /// Returns a city.
    #[must_use]
    pub fn city(&self, key: CityKey) -> Option<&City> {
        self.players.get(&key.player)?.city(key.city)
    }

    /// Returns a city, mutably.
    pub fn city_mut(&mut self, key: CityKey) -> Option<&mut City> {
        self.players.get_mut(&key.player)?.city_mut(key.city)
    }

    /// Finds `player`'s city called `name`.
    #[must_use]
    pub fn city_key_by_name(&self, player: PlayerId, name: &str) -> Option<CityKey> {
        let city = self.players.get(&player)?.city_by_name(name)?;
        Some(CityKey::new(player, city.id))
    }

    /// Display name of a city, or its key if it does not exist.
    #[must_use]
    pub fn city_name(&self, key: CityKey) -> String {
        self.city(key)
            .map_or_else(|| key.to_string(), |c| c.name.clone())
    }

    /// Kills a city and drops its city-scoped status entries.
    pub fn destroy_city(&mut self, key: CityKey) {
        if let Some(city) = self.city_mut(key) {
            city.destroy();
        }
        self.status.clear_dead_city(key);
        self.remove_from_deployment(key);
    }

    /// Moves a city to `to_player`, re-keying every status entry in one step.
    ///
    /// The city keeps its id. Its fatigue streak travels with it and it leaves
    /// any declared deployment.
    pub fn transfer_city(&mut self, from: CityKey, to_player: PlayerId) -> Option<CityKey> {
        if !self.players.contains_key(&to_player) {
            return None;
        }
        let source = self.players.get_mut(&from.player)?;
        let streak = source.streak(from.city);
        let city = source.remove_city(from.city)?;
        self.remove_from_deployment(from);

        let to = CityKey::new(to_player, from.city);
        let target = self.players.get_mut(&to_player)?;
        target.add_city(city);
        if streak > 0 {
            target.streaks.insert(from.city, streak);
        }
        self.status.transfer_city(from, to);
        Some(to)
    }

    // -------------------------------------------------------------------------
    // Pool
    // -------------------------------------------------------------------------

    /// Names not yet owned by anyone.
    #[must_use]
    pub const fn pool(&self) -> &BTreeSet<String> {
        &self.pool
    }

    /// Replaces the unused pool.
    pub fn set_pool(&mut self, names: impl IntoIterator<Item = String>) {
        self.pool = names.into_iter().collect();
    }

    // -------------------------------------------------------------------------
    // Deployment
    // -------------------------------------------------------------------------

    /// The deployment `player` declared this round.
    #[must_use]
    pub fn declared_deployment(&self, player: PlayerId) -> &[CityId] {
        self.deployments.get(&player).map_or(&[], Vec::as_slice)
    }

    /// Replaces `player`'s declared deployment.
    pub fn set_deployment(&mut self, player: PlayerId, cities: Vec<CityId>) {
        if cities.is_empty() {
            self.deployments.remove(&player);
        } else {
            self.deployments.insert(player, cities);
        }
    }

    /// Drops a city from its owner's declared deployment.
    pub fn remove_from_deployment(&mut self, key: CityKey) {
        if let Some(cities) = self.deployments.get_mut(&key.player) {
            cities.retain(|id| *id != key.city);
            if cities.is_empty() {
                self.deployments.remove(&key.player);
            }
        }
    }

    /// Why the city cannot be deployed, or `None` if it can.
    #[must_use]
    pub fn undeployable_reason(&self, key: CityKey) -> Option<String> {
        let Some(city) = self.city(key) else {
            return Some("not in the roster".into());
        };
        if !city.alive {
            return Some("destroyed".into());
        }
        self.status.lockout(key).map(|lockout| {
            format!(
                "locked out ({:?}) for {} more round(s)",
                lockout.reason, lockout.rounds_left
            )
        })
    }

    /// Keeps a city out of deployment for `rounds`, dropping it from the
    /// current declaration.
    pub fn lock_out(&mut self, key: CityKey, reason: LockoutReason, rounds: u32) {
        self.status.set_lockout(key, reason, rounds);
        self.remove_from_deployment(key);
    }

    /// The cities that will actually fight for `player`: the declaration
    /// filtered to alive, not locked-out cities, or nothing under `NoDeploy`.
    #[must_use]
    pub fn effective_deployment(&self, player: PlayerId) -> Vec<CityId> {
        let Some(owner) = self.players.get(&player) else {
            return Vec::new();
        };
        if owner.eliminated || owner.has_modifier(|k| matches!(k, ModifierKind::NoDeploy)) {
            return Vec::new();
        }
        self.declared_deployment(player)
            .iter()
            .copied()
            .filter(|id| self.undeployable_reason(CityKey::new(player, *id)).is_none())
            .collect()
    }
}
