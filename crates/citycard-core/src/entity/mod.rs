//! Entity module: players, cities and the identifiers that key them.
//!
//! This module provides the core entity types for the city card game:
//! - [`PlayerId`] / [`CityId`]: Unique identifiers
//! - [`CityKey`]: Composite `(player, city)` key used by every per-city table
//! - [`City`]: A card with hit points, tags and transient modifiers
//! - [`Player`]: A roster of cities, a center designation and fatigue streaks
//!
//! # Ownership
//!
//! A [`City`] is owned by exactly one [`Player`]. When a city changes hands
//! (swap abilities), the city value moves between rosters and every per-city
//! status entry is re-keyed by the Status Store in the same step.
//!
//! # Example
//!
//! ```
//! use citycard_core::entity::{City, CityId, Player, PlayerId};
//!
//! let mut player = Player::new(PlayerId::new(0), "alice", 0);
//! player.add_city(City::new(CityId::new(1), "Hangzhou", 12000));
//! player.set_center(CityId::new(1));
//!
//! assert_eq!(player.center(), Some(CityId::new(1)));
//! assert!(player.city(CityId::new(1)).unwrap().is_center);
//! ```

pub mod modifier;
pub mod tags;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use modifier::{Modifier, ModifierKind};
pub use tags::CityTags;

// =============================================================================
// Identifiers
// =============================================================================

/// Unique identifier for a player.
///
/// Player ids are ordered by value, which fixes the deterministic iteration
/// order of every per-player table.
///
/// # Example
///
/// ```
/// use citycard_core::entity::PlayerId;
///
/// let a = PlayerId::new(0);
/// let b = PlayerId::new(1);
/// assert!(a < b);
/// assert_eq!(b.as_u32(), 1);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new `PlayerId` from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value of this identifier.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl From<u32> for PlayerId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Unique identifier for a city.
///
/// City ids are unique across the whole game, not just within a roster, so a
/// city keeps its id when it is swapped to another player.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CityId(u32);

impl CityId {
    /// Creates a new `CityId` from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value of this identifier.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CityId({})", self.0)
    }
}

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

impl From<u32> for CityId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Composite key addressing one city in one player's roster.
///
/// Every per-city Status Store table is keyed by `CityKey`. Ordering is by
/// player first, then city, matching the deterministic iteration order used by
/// the resolvers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CityKey {
    /// Owning player.
    pub player: PlayerId,
    /// City within that player's roster.
    pub city: CityId,
}

impl CityKey {
    /// Creates a new key.
    #[must_use]
    pub const fn new(player: PlayerId, city: CityId) -> Self {
        Self { player, city }
    }
}

impl fmt::Display for CityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.player, self.city)
    }
}

// =============================================================================
// City
// =============================================================================

/// A city card.
///
/// `current_hp` never exceeds `max_hp`, and `alive` is false exactly when
/// `current_hp` is zero, except inside the battle commit where a death is being
/// processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    /// Game-unique identifier.
    pub id: CityId,
    /// Display name, unique within the owner's roster.
    pub name: String,
    /// HP the city had when it entered the game.
    pub base_hp: u64,
    /// Current maximum HP (some abilities rescale it permanently).
    pub max_hp: u64,
    /// Current HP.
    pub current_hp: u64,
    /// Whether the city is still in play.
    pub alive: bool,
    /// Whether this city holds the owner's center designation.
    pub is_center: bool,
    /// Province name from the catalog.
    pub province: String,
    /// Classification tags from the catalog.
    pub tags: CityTags,
    /// Number of battles this city has been deployed in.
    pub deployments: u32,
    /// Transient modifiers attached to this city.
    pub modifiers: Vec<Modifier>,
}

impl City {
    /// Creates a full-health, untagged city.
    ///
    /// # Arguments
    ///
    /// * `id` - Game-unique identifier
    /// * `name` - Display name
    /// * `hp` - Base, maximum and current HP
    #[must_use]
    pub fn new(id: CityId, name: impl Into<String>, hp: u64) -> Self {
        Self {
            id,
            name: name.into(),
            base_hp: hp,
            max_hp: hp,
            current_hp: hp,
            alive: hp > 0,
            is_center: false,
            province: String::new(),
            tags: CityTags::empty(),
            deployments: 0,
            modifiers: Vec::new(),
        }
    }

    /// Sets the province and tags, returning the city for chaining.
    #[must_use]
    pub fn with_classification(mut self, province: impl Into<String>, tags: CityTags) -> Self {
        self.province = province.into();
        self.tags = tags;
        self
    }

    /// Returns true if the city is at full HP.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.current_hp >= self.max_hp
    }

    /// Reduces HP by `amount`, floored at zero.
    ///
    /// # Returns
    ///
    /// The HP actually removed.
    pub fn apply_damage(&mut self, amount: u64) -> u64 {
        let applied = amount.min(self.current_hp);
        self.current_hp -= applied;
        if self.current_hp == 0 {
            self.alive = false;
        }
        applied
    }

    /// Restores HP by `amount`, capped at `max_hp`. Dead cities are not healed.
    ///
    /// # Returns
    ///
    /// The HP actually restored.
    pub fn heal(&mut self, amount: u64) -> u64 {
        if !self.alive {
            return 0;
        }
        let before = self.current_hp;
        self.current_hp = self.current_hp.saturating_add(amount).min(self.max_hp);
        self.current_hp - before
    }

    /// Sets current HP, raising `max_hp` if needed so the invariant holds.
    pub fn set_hp_raising_max(&mut self, hp: u64) {
        self.current_hp = hp;
        self.max_hp = self.max_hp.max(hp);
        self.alive = hp > 0;
    }

    /// Sets current HP, clamped to `max_hp`.
    pub fn set_hp(&mut self, hp: u64) {
        self.current_hp = hp.min(self.max_hp);
        self.alive = self.current_hp > 0;
    }

    /// Kills the city outright and drops its modifiers.
    pub fn destroy(&mut self) {
        self.current_hp = 0;
        self.alive = false;
        self.modifiers.clear();
    }

    /// Returns true if any attached modifier matches `predicate`.
    pub fn has_modifier(&self, predicate: impl Fn(&ModifierKind) -> bool) -> bool {
        self.modifiers.iter().any(|m| predicate(&m.kind))
    }

    /// Returns the product of all `PowerMultiplier` modifiers.
    #[must_use]
    pub fn power_multiplier(&self) -> u64 {
        self.modifiers
            .iter()
            .filter_map(|m| match m.kind {
                ModifierKind::PowerMultiplier(factor) => Some(u64::from(factor)),
                _ => None,
            })
            .product()
    }
}

// =============================================================================
// Player
// =============================================================================

/// A participant and their roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique identifier.
    pub id: PlayerId,
    /// Unique display name.
    pub name: String,
    /// Team tag; players sharing a tag win or lose together.
    pub team: u8,
    /// Roster keyed by city id.
    pub cities: BTreeMap<CityId, City>,
    /// Consecutive-deployment counters used for fatigue.
    pub streaks: BTreeMap<CityId, u32>,
    /// Player-wide modifiers.
    pub modifiers: Vec<Modifier>,
    /// Set by the win check once the center falls with no successor.
    pub eliminated: bool,
    center: Option<CityId>,
}

impl Player {
    /// Creates a player with an empty roster.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>, team: u8) -> Self {
        Self {
            id,
            name: name.into(),
            team,
            cities: BTreeMap::new(),
            streaks: BTreeMap::new(),
            modifiers: Vec::new(),
            eliminated: false,
            center: None,
        }
    }

    /// Adds a city to the roster. An existing city with the same id is replaced.
    pub fn add_city(&mut self, city: City) {
        self.cities.insert(city.id, city);
    }

    /// Removes a city from the roster, clearing the center designation if it
    /// pointed at that city.
    pub fn remove_city(&mut self, id: CityId) -> Option<City> {
        let mut city = self.cities.remove(&id)?;
        self.streaks.remove(&id);
        if self.center == Some(id) {
            self.center = None;
        }
        city.is_center = false;
        Some(city)
    }

    /// Returns the current center city id.
    #[must_use]
    pub const fn center(&self) -> Option<CityId> {
        self.center
    }

    /// Moves the center designation to `id`.
    ///
    /// Exactly one city holds the flag afterwards. Returns false if the city is
    /// not in the roster, in which case nothing changes.
    pub fn set_center(&mut self, id: CityId) -> bool {
        if !self.cities.contains_key(&id) {
            return false;
        }
        for city in self.cities.values_mut() {
            city.is_center = city.id == id;
        }
        self.center = Some(id);
        true
    }

    /// Returns the city with the given id.
    #[must_use]
    pub fn city(&self, id: CityId) -> Option<&City> {
        self.cities.get(&id)
    }

    /// Returns the city with the given id, mutably.
    pub fn city_mut(&mut self, id: CityId) -> Option<&mut City> {
        self.cities.get_mut(&id)
    }

    /// Looks a city up by display name.
    #[must_use]
    pub fn city_by_name(&self, name: &str) -> Option<&City> {
        self.cities.values().find(|c| c.name == name)
    }

    /// Iterates over alive cities in id order.
    pub fn alive_cities(&self) -> impl Iterator<Item = &City> {
        self.cities.values().filter(|c| c.alive)
    }

    /// Number of alive cities.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.alive_cities().count()
    }

    /// Fatigue streak of a city (0 if it did not fight last round).
    #[must_use]
    pub fn streak(&self, id: CityId) -> u32 {
        self.streaks.get(&id).copied().unwrap_or(0)
    }

    /// Returns true if any player-wide modifier matches `predicate`.
    pub fn has_modifier(&self, predicate: impl Fn(&ModifierKind) -> bool) -> bool {
        self.modifiers.iter().any(|m| predicate(&m.kind))
    }
}
