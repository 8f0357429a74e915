//! City catalog and province classifier collaborators.
//!
//! The engine never hard-codes city data. Acquisition and replacement abilities
//! ask a [`CityCatalog`] for base stats, and province-scoped abilities ask a
//! [`ProvinceClassifier`] for administrative rank. Both are pure lookups.
//!
//! [`StaticCatalog`] is a small built-in table that implements both traits; it
//! is what tests and benchmarks use.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::CityTags;

/// Base stats of a catalog city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseCity {
    /// Starting maximum HP.
    pub max_hp: u64,
    /// Province name.
    pub province: String,
    /// Classification tags.
    pub tags: CityTags,
}

/// Administrative rank of a city.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AdministrativeRank {
    /// Ordinary prefecture-level city.
    Ordinary,
    /// Provincial capital.
    ProvincialCapital,
    /// Directly administered municipality or special region.
    Special,
}

/// Read-only city data source.
pub trait CityCatalog: Send + Sync {
    /// Looks up base stats by city name.
    fn lookup_base_city(&self, name: &str) -> Option<BaseCity>;

    /// All city names the catalog knows, in a stable order.
    fn city_names(&self) -> Vec<String>;
}

/// Read-only province/rank classifier.
pub trait ProvinceClassifier: Send + Sync {
    /// Province of a city, if known.
    fn province_of(&self, name: &str) -> Option<String>;

    /// Administrative rank of a city, if known.
    fn rank_of(&self, name: &str) -> Option<AdministrativeRank>;
}

/// Both collaborators behind one object, as the game facade holds them.
pub trait GameCatalog: CityCatalog + ProvinceClassifier {}

impl<T: CityCatalog + ProvinceClassifier> GameCatalog for T {}

/// Built-in catalog backed by a `BTreeMap`.
///
/// # Example
///
/// ```
/// use citycard_core::catalog::{CityCatalog, StaticCatalog};
///
/// let catalog = StaticCatalog::builtin();
/// let nanjing = catalog.lookup_base_city("Nanjing").unwrap();
/// assert_eq!(nanjing.province, "Jiangsu");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    cities: BTreeMap<String, BaseCity>,
}

impl StaticCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry, returning the catalog for chaining.
    #[must_use]
    pub fn with_city(
        mut self,
        name: impl Into<String>,
        max_hp: u64,
        province: impl Into<String>,
        tags: CityTags,
    ) -> Self {
        self.cities.insert(
            name.into(),
            BaseCity {
                max_hp,
                province: province.into(),
                tags,
            },
        );
        self
    }

    /// A compact table of real cities with representative HP values.
    #[must_use]
    pub fn builtin() -> Self {
        let coastal_capital = CityTags::COASTAL | CityTags::PROVINCIAL_CAPITAL;
        let municipality = CityTags::MUNICIPALITY;
        Self::new()
            .with_city("Beijing", 44000, "Beijing", municipality)
            .with_city("Shanghai", 47000, "Shanghai", municipality | CityTags::COASTAL)
            .with_city("Tianjin", 16000, "Tianjin", municipality | CityTags::COASTAL)
            .with_city("Chongqing", 30000, "Chongqing", municipality)
            .with_city("Shenzhen", 34000, "Guangdong", CityTags::COASTAL | CityTags::SPECIAL_ZONE)
            .with_city("Guangzhou", 30000, "Guangdong", coastal_capital)
            .with_city("Dongguan", 11000, "Guangdong", CityTags::empty())
            .with_city("Foshan", 13000, "Guangdong", CityTags::empty())
            .with_city("Hangzhou", 20000, "Zhejiang", CityTags::PROVINCIAL_CAPITAL)
            .with_city("Ningbo", 16000, "Zhejiang", CityTags::COASTAL)
            .with_city("Wenzhou", 8500, "Zhejiang", CityTags::COASTAL)
            .with_city("Nanjing", 17000, "Jiangsu", CityTags::PROVINCIAL_CAPITAL)
            .with_city("Suzhou", 24000, "Jiangsu", CityTags::empty())
            .with_city("Wuxi", 15000, "Jiangsu", CityTags::empty())
            .with_city("Chengdu", 22000, "Sichuan", CityTags::PROVINCIAL_CAPITAL)
            .with_city("Mianyang", 4000, "Sichuan", CityTags::empty())
            .with_city("Wuhan", 20000, "Hubei", CityTags::PROVINCIAL_CAPITAL)
            .with_city("Yichang", 5500, "Hubei", CityTags::empty())
            .with_city("Qingdao", 15000, "Shandong", CityTags::COASTAL)
            .with_city("Yantai", 10000, "Shandong", CityTags::COASTAL)
            .with_city("Kashgar", 1500, "Xinjiang", CityTags::BORDER)
            .with_city("Dandong", 1000, "Liaoning", CityTags::BORDER | CityTags::COASTAL)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    /// Returns true if the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

impl CityCatalog for StaticCatalog {
    fn lookup_base_city(&self, name: &str) -> Option<BaseCity> {
        self.cities.get(name).cloned()
    }

    fn city_names(&self) -> Vec<String> {
        self.cities.keys().cloned().collect()
    }
}

impl ProvinceClassifier for StaticCatalog {
    fn province_of(&self, name: &str) -> Option<String> {
        self.cities.get(name).map(|c| c.province.clone())
    }

    fn rank_of(&self, name: &str) -> Option<AdministrativeRank> {
        let city = self.cities.get(name)?;
        let rank = if city
            .tags
            .intersects(CityTags::MUNICIPALITY | CityTags::SPECIAL_ZONE)
        {
            AdministrativeRank::Special
        } else if city.tags.contains(CityTags::PROVINCIAL_CAPITAL) {
            AdministrativeRank::ProvincialCapital
        } else {
            AdministrativeRank::Ordinary
        };
        Some(rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup() {
        let catalog = StaticCatalog::builtin();
        let city = catalog.lookup_base_city("Suzhou").unwrap();
        assert_eq!(city.max_hp, 24000);
        assert_eq!(city.province, "Jiangsu");
        assert!(catalog.lookup_base_city("Atlantis").is_none());
    }

    #[test]
    fn names_are_sorted() {
        let names = StaticCatalog::builtin().city_names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn ranks_follow_tags() {
        let catalog = StaticCatalog::builtin();
        assert_eq!(catalog.rank_of("Beijing"), Some(AdministrativeRank::Special));
        assert_eq!(catalog.rank_of("Shenzhen"), Some(AdministrativeRank::Special));
        assert_eq!(
            catalog.rank_of("Nanjing"),
            Some(AdministrativeRank::ProvincialCapital)
        );
        assert_eq!(catalog.rank_of("Wuxi"), Some(AdministrativeRank::Ordinary));
        assert_eq!(catalog.rank_of("Atlantis"), None);
    }
}
