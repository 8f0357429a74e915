//! City classification tags.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Classification tags consumed by city-scoped abilities.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CityTags: u8 {
        /// On the coast.
        const COASTAL = 1 << 0;
        /// Seat of a provincial government.
        const PROVINCIAL_CAPITAL = 1 << 1;
        /// Directly administered municipality.
        const MUNICIPALITY = 1 << 2;
        /// Special administrative region or economic zone.
        const SPECIAL_ZONE = 1 << 3;
        /// On a national border.
        const BORDER = 1 << 4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_combine() {
        let tags = CityTags::COASTAL | CityTags::MUNICIPALITY;
        assert!(tags.contains(CityTags::COASTAL));
        assert!(!tags.contains(CityTags::BORDER));
    }

    #[test]
    fn tags_default_empty() {
        assert!(CityTags::default().is_empty());
    }
}
