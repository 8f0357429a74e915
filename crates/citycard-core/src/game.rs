//! The game facade.
//!
//! [`Game`] is the only type a client needs. It owns the world, the game log,
//! the depth-one undo slot and the catalog, and it exposes the three external
//! entry points: [`activate_ability`](Game::activate_ability),
//! [`resolve_battle`](Game::resolve_battle) and
//! [`advance_round`](Game::advance_round).
//!
//! # Ability calls
//!
//! Every activation snapshots the world first. A rejected ability (or one
//! whose handler panics) restores the snapshot, so failures leave no trace.
//! A successful one keeps the snapshot as the undo slot, which the
//! `rollback` ability and [`Game::rollback`] consume.
//!
//! # Phase advance
//!
//! Phase transitions are double-buffered: `next` is cloned from `world`, the
//! phase resolver writes `next`, and the buffers are swapped only on success.
//! A resolver error holds the round in its current phase.
//!
//! # Example
//!
//! ```
//! use citycard_core::ability::AbilityRequest;
//! use citycard_core::catalog::StaticCatalog;
//! use citycard_core::config::GameConfig;
//! use citycard_core::game::Game;
//!
//! let mut game = Game::new(GameConfig::default(), StaticCatalog::builtin());
//! let alice = game.add_player("alice", 0).unwrap();
//! let bob = game.add_player("bob", 1).unwrap();
//! game.add_city(alice, "Beijing").unwrap();
//! game.add_city(bob, "Shanghai").unwrap();
//! game.set_center(alice, "Beijing").unwrap();
//! game.set_center(bob, "Shanghai").unwrap();
//!
//! let result = game.activate_ability(&AbilityRequest::new("gold_loan", alice));
//! assert!(result.success);
//!
//! let snapshot = game.advance_round().unwrap();
//! assert_eq!(snapshot.round, 2);
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::ability::{
    self, Ability, AbilityContext, AbilityOutcome, AbilityRequest, AbilityResult, UndoSlot,
};
use crate::catalog::GameCatalog;
use crate::config::GameConfig;
use crate::entity::{CityId, CityKey, PlayerId};
use crate::error::{AbilityError, DeployError, ResolveError, RoundError, SetupError};
use crate::log::GameLog;
use crate::resolver::{self, BattleOutcome, Deployment};
use crate::world::{Phase, RoundRecord, World};

// =============================================================================
// Snapshots
// =============================================================================

/// A city as one observer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitySummary {
    /// Name, alias if disguised, or `None` if unknown to the observer.
    pub name: Option<String>,
    /// HP, shown HP if disguised, or `None` if unknown.
    pub hp: Option<u64>,
    /// Whether the city is alive.
    pub alive: bool,
    /// Whether it is its owner's center (hidden for unknown cities).
    pub is_center: bool,
}

/// A player as one observer sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    /// Player id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Team tag.
    pub team: u8,
    /// Gold (public information).
    pub gold: u32,
    /// Whether the player is out.
    pub eliminated: bool,
    /// Roster in id order.
    pub cities: Vec<CitySummary>,
}

/// The state of the game after a call to [`Game::advance_round`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    /// Current round.
    pub round: u32,
    /// Current phase.
    pub phase: Phase,
    /// Every player in turn order.
    pub players: Vec<PlayerSummary>,
}

// =============================================================================
// Game
// =============================================================================

/// The game facade.
pub struct Game {
    /// The authoritative world.
    world: World,
    /// Scratch buffer a phase resolver writes to.
    next: World,
    log: GameLog,
    undo: Option<UndoSlot>,
    catalog: Box<dyn GameCatalog>,
    started: bool,
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("round", &self.world.round)
            .field("phase", &self.world.phase)
            .field("log", &format!("[{} entries]", self.log.len()))
            .field("undo", &self.undo.as_ref().map(|slot| slot.ability))
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Creates a game with no players. Every catalog city starts in the pool.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine tunables (seed included)
    /// * `catalog` - City data and province classification
    #[must_use]
    pub fn new(config: GameConfig, catalog: impl GameCatalog + 'static) -> Self {
        let mut world = World::new(config);
        world.set_pool(catalog.city_names());
        Self {
            next: world.clone(),
            world,
            log: GameLog::new(),
            undo: None,
            catalog: Box::new(catalog),
            started: false,
        }
    }

    /// The authoritative world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access for tests and setup tooling.
    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The game log.
    #[must_use]
    pub const fn log(&self) -> &GameLog {
        &self.log
    }

    /// The catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn GameCatalog {
        self.catalog.as_ref()
    }

    /// Whether an undo slot is held.
    #[must_use]
    pub const fn can_roll_back(&self) -> bool {
        self.undo.is_some()
    }

    // -------------------------------------------------------------------------
    // Setup
    // -------------------------------------------------------------------------

    /// Adds a player at the end of the turn order.
    ///
    /// # Errors
    ///
    /// [`SetupError::AlreadyStarted`] once the first phase has advanced.
    pub fn add_player(&mut self, name: impl Into<String>, team: u8) -> Result<PlayerId, SetupError> {
        if self.started {
            return Err(SetupError::AlreadyStarted);
        }
        Ok(self.world.add_player(name, team))
    }

    /// Gives `player` the catalog city `name` at full HP.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted`, `UnknownPlayer`, `UnknownCity` (not in the catalog) or
    /// `CityTaken` (already owned).
    pub fn add_city(&mut self, player: PlayerId, name: &str) -> Result<CityId, SetupError> {
        if self.started {
            return Err(SetupError::AlreadyStarted);
        }
        if self.world.player(player).is_none() {
            return Err(SetupError::UnknownPlayer(player.to_string()));
        }
        let base = self
            .catalog
            .lookup_base_city(name)
            .ok_or_else(|| SetupError::UnknownCity(name.to_string()))?;
        if !self.world.pool().contains(name) {
            return Err(SetupError::CityTaken(name.to_string()));
        }
        self.world
            .grant_city(player, name, &base)
            .map(|key| key.city)
            .ok_or_else(|| SetupError::UnknownPlayer(player.to_string()))
    }

    /// Makes `name` the center of `player`.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted`, `UnknownPlayer`, `UnknownCity` (not in the player's
    /// roster) or `DeadCity`. Once play begins only succession moves a center.
    pub fn set_center(&mut self, player: PlayerId, name: &str) -> Result<(), SetupError> {
        if self.started {
            return Err(SetupError::AlreadyStarted);
        }
        let key = self
            .world
            .city_key_by_name(player, name)
            .ok_or_else(|| SetupError::UnknownCity(name.to_string()))?;
        if !self.world.city(key).is_some_and(|c| c.alive) {
            return Err(SetupError::DeadCity(name.to_string()));
        }
        let owner = self
            .world
            .player_mut(player)
            .ok_or_else(|| SetupError::UnknownPlayer(player.to_string()))?;
        owner.set_center(key.city);
        Ok(())
    }

    /// Declares which cities `player` sends into this round's battle.
    ///
    /// The declaration replaces the previous one and stays in force until
    /// changed; cities that die or get locked out drop out of it.
    ///
    /// # Errors
    ///
    /// [`DeployError`] if the window is closed, the player is out, a city is
    /// not deployable or too many are named. Nothing changes on error.
    pub fn deploy(&mut self, player: PlayerId, cities: &[&str]) -> Result<(), DeployError> {
        if self.world.phase != Phase::AbilityWindow {
            return Err(DeployError::Locked(self.world.phase));
        }
        if !self.world.is_active(player) {
            return Err(DeployError::UnknownPlayer(player.to_string()));
        }
        let max = self.world.config().max_deploy;
        if cities.len() > max {
            return Err(DeployError::TooMany { max });
        }
        let mut ids = Vec::with_capacity(cities.len());
        for name in cities {
            let not_deployable = |reason: &str| DeployError::NotDeployable {
                city: (*name).to_string(),
                reason: reason.to_string(),
            };
            let key = self
                .world
                .city_key_by_name(player, name)
                .ok_or_else(|| not_deployable("not in your roster"))?;
            if let Some(reason) = self.world.undeployable_reason(key) {
                return Err(not_deployable(&reason));
            }
            if ids.contains(&key.city) {
                return Err(not_deployable("listed twice"));
            }
            ids.push(key.city);
        }
        self.world.set_deployment(player, ids);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Abilities
    // -------------------------------------------------------------------------

    /// Activates an ability and reports the client-facing result.
    pub fn activate_ability(&mut self, request: &AbilityRequest) -> AbilityResult {
        AbilityResult::from(self.try_activate(request))
    }

    /// Activates an ability.
    ///
    /// # Errors
    ///
    /// Any [`AbilityError`]. The world is exactly as before the call.
    pub fn try_activate(&mut self, request: &AbilityRequest) -> Result<AbilityOutcome, AbilityError> {
        let caster = request.caster;
        let round = self.world.round;
        let ability: Ability = request.ability.parse().inspect_err(|err| {
            warn!(name = %request.ability, %caster, round, reason = %err, "ability rejected");
        })?;

        let snapshot = self.world.clone();
        let result = {
            let mut cx = AbilityContext {
                ability,
                request,
                world: &mut self.world,
                catalog: self.catalog.as_ref(),
                undo: self.undo.as_ref(),
            };
            panic::catch_unwind(AssertUnwindSafe(|| ability::dispatch(&mut cx)))
        };

        match result {
            Ok(Ok(outcome)) => {
                self.log.public(round, outcome.public.clone());
                if let Some(private) = &outcome.private {
                    self.log.private(round, caster, private.clone());
                }
                self.undo = if ability == Ability::Rollback {
                    None
                } else {
                    Some(UndoSlot {
                        world: snapshot,
                        ability,
                        caster,
                    })
                };
                info!(%ability, %caster, round, "ability activated");
                Ok(outcome)
            }
            Ok(Err(err)) => {
                self.world = snapshot;
                warn!(%ability, %caster, round, reason = %err, "ability rejected");
                Err(err)
            }
            Err(_) => {
                self.world = snapshot;
                error!(%ability, %caster, round, "ability handler panicked; world restored");
                Err(AbilityError::HandlerPanicked { ability })
            }
        }
    }

    /// Undoes the most recent successful ability without charging anyone.
    ///
    /// Returns the ability that was undone. The slot is consumed, so a second
    /// call fails until another ability succeeds.
    ///
    /// # Errors
    ///
    /// `OutsideAbilityWindow` after the window closed, `PreconditionNotMet`
    /// if there is nothing to undo.
    pub fn rollback(&mut self) -> Result<Ability, AbilityError> {
        if self.world.phase != Phase::AbilityWindow {
            return Err(AbilityError::OutsideAbilityWindow {
                ability: Ability::Rollback,
                phase: self.world.phase,
            });
        }
        let slot = self
            .undo
            .take()
            .ok_or_else(|| AbilityError::PreconditionNotMet {
                ability: Ability::Rollback,
                reason: "there is nothing to roll back".into(),
            })?;
        let round = self.world.round;
        self.world = slot.world;
        self.log.public(
            round,
            format!(
                "{}'s {} was rolled back",
                self.world.player_name(slot.caster),
                slot.ability
            ),
        );
        info!(ability = %slot.ability, caster = %slot.caster, round, "ability rolled back");
        Ok(slot.ability)
    }

    // -------------------------------------------------------------------------
    // Battles and rounds
    // -------------------------------------------------------------------------

    /// Computes how `a` fielding `a_cities` against `b` fielding `b_cities`
    /// would resolve now, without changing the game.
    ///
    /// The line-ups are hypothetical: they may differ from what either player
    /// declared, and lockouts are not consulted.
    ///
    /// # Errors
    ///
    /// [`ResolveError`] if a city is not in its player's roster or is
    /// destroyed.
    pub fn resolve_battle(
        &self,
        a: PlayerId,
        a_cities: &[&str],
        b: PlayerId,
        b_cities: &[&str],
    ) -> Result<BattleOutcome, ResolveError> {
        let ids_a = self.line_up(a, a_cities)?;
        let ids_b = self.line_up(b, b_cities)?;
        let mut scratch = self.world.clone();
        resolver::resolve_deployments(
            &self.world,
            &mut scratch,
            Deployment::new(a, &ids_a),
            Deployment::new(b, &ids_b),
        )
    }

    fn line_up(&self, player: PlayerId, names: &[&str]) -> Result<Vec<CityId>, ResolveError> {
        names
            .iter()
            .map(|name| {
                let key = self.world.city_key_by_name(player, name).ok_or_else(|| {
                    ResolveError::new(format!(
                        "{name} is not in {}'s roster",
                        self.world.player_name(player)
                    ))
                })?;
                if self.world.city(key).is_some_and(|c| c.alive) {
                    Ok(key.city)
                } else {
                    Err(ResolveError::new(format!("{name} is destroyed")))
                }
            })
            .collect()
    }

    /// Moves to the next phase, running its resolver.
    ///
    /// Entering `DeploymentLocked` invalidates the undo slot. Entering
    /// `AbilityWindow` starts the next round.
    ///
    /// # Errors
    ///
    /// [`RoundError::GameOver`] in the terminal phase, [`RoundError::Held`]
    /// if the resolver failed (the world is unchanged).
    pub fn advance_phase(&mut self) -> Result<Phase, RoundError> {
        let from = self.world.phase;
        if from == Phase::GameOver {
            return Err(RoundError::GameOver);
        }
        let target = from.next();
        let round = self.world.round;
        self.started = true;

        self.next.clone_from(&self.world);
        let mut lines = GameLog::new();
        if let Some(phase_resolver) = resolver::for_phase(target) {
            if let Err(err) = phase_resolver.resolve(&self.world, &mut self.next, &mut lines) {
                error!(round, phase = %target, detail = %err, "phase resolver failed; round held");
                return Err(RoundError::Held {
                    round,
                    phase: target,
                    detail: err.detail,
                });
            }
        }

        if self.next.phase != Phase::GameOver {
            self.next.phase = target;
        }
        match self.next.phase {
            Phase::DeploymentLocked => self.undo = None,
            Phase::AbilityWindow => {
                self.next.round += 1;
                self.next.round_record = RoundRecord::default();
            }
            _ => {}
        }

        std::mem::swap(&mut self.world, &mut self.next);
        self.log.append(&mut lines);
        info!(round = self.world.round, phase = %self.world.phase, "phase advanced");
        Ok(self.world.phase)
    }

    /// Runs the rest of the round and returns the unmasked state.
    ///
    /// Stops at the next `AbilityWindow`, or at `GameOver`.
    ///
    /// # Errors
    ///
    /// Whatever [`advance_phase`](Self::advance_phase) reports; a held round
    /// stays in the phase before the failing one.
    pub fn advance_round(&mut self) -> Result<RoundSnapshot, RoundError> {
        loop {
            let phase = self.advance_phase()?;
            if matches!(phase, Phase::AbilityWindow | Phase::GameOver) {
                return Ok(self.snapshot());
            }
        }
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    /// The full, unmasked state.
    #[must_use]
    pub fn snapshot(&self) -> RoundSnapshot {
        self.summarize(None)
    }

    /// The state as `observer` sees it: unknown opponent cities are masked and
    /// disguised ones show their alias.
    #[must_use]
    pub fn view_for(&self, observer: PlayerId) -> RoundSnapshot {
        self.summarize(Some(observer))
    }

    fn summarize(&self, observer: Option<PlayerId>) -> RoundSnapshot {
        let players = self
            .world
            .turn_order()
            .iter()
            .filter_map(|id| self.world.player(*id))
            .map(|player| {
                let cities = player
                    .cities
                    .values()
                    .map(|city| {
                        let key = CityKey::new(player.id, city.id);
                        let full = CitySummary {
                            name: Some(city.name.clone()),
                            hp: Some(city.current_hp),
                            alive: city.alive,
                            is_center: city.is_center,
                        };
                        match observer {
                            None => full,
                            Some(me) if me == player.id => full,
                            Some(me) if !self.world.status.is_known(me, key) => CitySummary {
                                name: None,
                                hp: None,
                                alive: city.alive,
                                is_center: false,
                            },
                            Some(_) => match self.world.status.disguise(key) {
                                Some(disguise) => CitySummary {
                                    name: Some(disguise.alias.clone()),
                                    hp: Some(disguise.shown_hp),
                                    ..full
                                },
                                None => full,
                            },
                        }
                    })
                    .collect();
                PlayerSummary {
                    id: player.id,
                    name: player.name.clone(),
                    team: player.team,
                    gold: self.world.ledger.gold(player.id),
                    eliminated: player.eliminated,
                    cities,
                }
            })
            .collect();
        RoundSnapshot {
            round: self.world.round,
            phase: self.world.phase,
            players,
        }
    }
}
