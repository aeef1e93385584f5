//! Tier ranks and the static catalog describing every mergeable kind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rank of a mergeable entity. Rank 1 is the lowest tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tier(u8);

impl Tier {
    /// Lowest tier present in every valid catalog.
    pub const LOWEST: Tier = Tier(1);

    /// Creates a tier wrapper around the provided rank.
    #[must_use]
    pub const fn new(rank: u8) -> Self {
        Self(rank)
    }

    /// Retrieves the numeric rank of the tier.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        self.0
    }
}

/// Static description of a single tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierInfo {
    /// Stable identifier used by configuration and saved sessions.
    pub key: String,
    /// Rank of the tier within its catalog.
    pub tier: Tier,
    /// Display name, opaque to the engine.
    pub name: String,
    /// Display description, opaque to the engine.
    pub description: String,
    /// Points awarded when a merge produces this tier.
    pub value: u64,
    /// Relative weight for direct spawns. Zero means merge-only.
    pub spawn_weight: f64,
}

impl TierInfo {
    /// Builds a tier description.
    #[must_use]
    pub fn new(
        key: &str,
        rank: u8,
        name: &str,
        description: &str,
        value: u64,
        spawn_weight: f64,
    ) -> Self {
        Self {
            key: key.to_owned(),
            tier: Tier::new(rank),
            name: name.to_owned(),
            description: description.to_owned(),
            value,
            spawn_weight,
        }
    }
}

/// Reasons a catalog definition is rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum CatalogError {
    /// The catalog does not define any tier.
    #[error("tier catalog is empty")]
    Empty,
    /// Ranks must be contiguous and start at one.
    #[error("expected rank {expected} but found rank {found}")]
    NonContiguousRank {
        /// Rank required at this position.
        expected: u8,
        /// Rank that was provided.
        found: u8,
    },
    /// Tier values must be positive and never decrease with rank.
    #[error("tier `{key}` has value {value}, below the previous tier")]
    DecreasingValue {
        /// Key of the offending tier.
        key: String,
        /// Value that broke the ordering.
        value: u64,
    },
    /// Spawn weights must be finite and non-negative.
    #[error("tier `{key}` has invalid spawn weight {weight}")]
    InvalidWeight {
        /// Key of the offending tier.
        key: String,
        /// Weight that was provided.
        weight: f64,
    },
    /// At least one tier must be directly spawnable.
    #[error("no tier has a positive spawn weight")]
    NoSpawnableTier,
    /// The milestone rank does not exist in the catalog.
    #[error("milestone rank {0} is outside the catalog")]
    UnknownMilestone(u8),
    /// Two tiers share the same key.
    #[error("duplicate tier key `{0}`")]
    DuplicateKey(String),
}

/// Ordered table of tiers indexed by rank.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierCatalog {
    tiers: Vec<TierInfo>,
    milestone: Tier,
}

/// Rank that counts as a finished ship in the built-in catalogs.
const SHIP_MILESTONE_RANK: u8 = 6;

impl TierCatalog {
    /// Validates and builds a catalog from tiers ordered by rank.
    pub fn new(tiers: Vec<TierInfo>, milestone: Tier) -> Result<Self, CatalogError> {
        if tiers.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut previous_value = 0;
        for (index, info) in tiers.iter().enumerate() {
            let expected = u8::try_from(index + 1).unwrap_or(u8::MAX);
            if info.tier.rank() != expected {
                return Err(CatalogError::NonContiguousRank {
                    expected,
                    found: info.tier.rank(),
                });
            }
            if info.value == 0 || info.value < previous_value {
                return Err(CatalogError::DecreasingValue {
                    key: info.key.clone(),
                    value: info.value,
                });
            }
            if !info.spawn_weight.is_finite() || info.spawn_weight < 0.0 {
                return Err(CatalogError::InvalidWeight {
                    key: info.key.clone(),
                    weight: info.spawn_weight,
                });
            }
            if tiers[..index].iter().any(|other| other.key == info.key) {
                return Err(CatalogError::DuplicateKey(info.key.clone()));
            }
            previous_value = info.value;
        }

        if !tiers.iter().any(|info| info.spawn_weight > 0.0) {
            return Err(CatalogError::NoSpawnableTier);
        }

        if milestone.rank() == 0 || usize::from(milestone.rank()) > tiers.len() {
            return Err(CatalogError::UnknownMilestone(milestone.rank()));
        }

        Ok(Self { tiers, milestone })
    }

    /// Catalog used by the grid board: cosmic materials forged into ships.
    #[must_use]
    pub fn forge() -> Self {
        Self {
            tiers: vec![
                TierInfo::new("stardust", 1, "Stardust", "Basic cosmic material", 10, 0.5),
                TierInfo::new(
                    "meteorite_fragment",
                    2,
                    "Meteorite Fragment",
                    "Remains of space rock",
                    25,
                    0.3,
                ),
                TierInfo::new(
                    "spatial_mineral",
                    3,
                    "Spatial Mineral",
                    "Rare deep-space crystals",
                    60,
                    0.15,
                ),
                TierInfo::new(
                    "metal_alloy",
                    4,
                    "Metal Alloy",
                    "Refined construction metal",
                    150,
                    0.05,
                ),
                TierInfo::new("ship_module", 5, "Ship Module", "Base ship component", 400, 0.0),
                TierInfo::new("small_ship", 6, "Small Ship", "A first working ship", 1_000, 0.0),
                TierInfo::new(
                    "cargo_ship",
                    7,
                    "Cargo Ship",
                    "Hauls resources across the galaxy",
                    2_500,
                    0.0,
                ),
                TierInfo::new("combat_ship", 8, "Combat Ship", "Defends the alliance", 6_000, 0.0),
                TierInfo::new(
                    "spacecruiser",
                    9,
                    "Spacecruiser",
                    "Advanced fleet vessel",
                    15_000,
                    0.0,
                ),
                TierInfo::new(
                    "starforge_ark",
                    10,
                    "StarForge Ark",
                    "Humanity's salvation",
                    50_000,
                    0.0,
                ),
            ],
            milestone: Tier::new(SHIP_MILESTONE_RANK),
        }
    }

    /// Catalog used by the floating space: salvage assembled into a cruiser.
    #[must_use]
    pub fn salvage() -> Self {
        let third = 1.0 / 3.0;
        Self {
            tiers: vec![
                TierInfo::new("space_debris", 1, "Space Debris", "Old ship remains", 10, third),
                TierInfo::new(
                    "asteroid_chunk",
                    2,
                    "Asteroid Chunk",
                    "Space rock with minerals",
                    25,
                    third,
                ),
                TierInfo::new("iron_ore", 3, "Iron Ore", "Raw space metal", 60, third),
                TierInfo::new(
                    "crystal_shard",
                    4,
                    "Crystal Shard",
                    "Glowing energy crystal",
                    150,
                    0.0,
                ),
                TierInfo::new("energy_core", 5, "Energy Core", "Concentrated power", 400, 0.0),
                TierInfo::new("ship_hull", 6, "Ship Hull", "Main structure", 1_000, 0.0),
                TierInfo::new(
                    "engine_part",
                    7,
                    "Engine Part",
                    "Interstellar propulsion",
                    2_500,
                    0.0,
                ),
                TierInfo::new(
                    "nav_system",
                    8,
                    "Navigation System",
                    "Advanced flight control",
                    6_000,
                    0.0,
                ),
                TierInfo::new(
                    "warp_drive",
                    9,
                    "Warp Drive",
                    "Faster than light travel",
                    15_000,
                    0.0,
                ),
                TierInfo::new("star_cruiser", 10, "Star Cruiser", "The ultimate ship", 50_000, 0.0),
            ],
            milestone: Tier::new(SHIP_MILESTONE_RANK),
        }
    }

    /// Looks up the static description of a tier.
    #[must_use]
    pub fn info(&self, tier: Tier) -> Option<&TierInfo> {
        let index = usize::from(tier.rank()).checked_sub(1)?;
        self.tiers.get(index)
    }

    /// Reports whether the tier belongs to this catalog.
    #[must_use]
    pub fn contains(&self, tier: Tier) -> bool {
        self.info(tier).is_some()
    }

    /// Successor of the provided tier, or `None` for the highest tier.
    #[must_use]
    pub fn next_tier(&self, tier: Tier) -> Option<Tier> {
        if !self.contains(tier) {
            return None;
        }
        self.tier_by_rank(tier.rank().checked_add(1)?)
    }

    /// Resolves a rank to a tier of this catalog.
    #[must_use]
    pub fn tier_by_rank(&self, rank: u8) -> Option<Tier> {
        let tier = Tier::new(rank);
        self.contains(tier).then_some(tier)
    }

    /// Resolves a configuration key to a tier of this catalog.
    #[must_use]
    pub fn tier_by_key(&self, key: &str) -> Option<Tier> {
        self.tiers
            .iter()
            .find(|info| info.key == key)
            .map(|info| info.tier)
    }

    /// Highest tier of the catalog, which has no successor.
    #[must_use]
    pub fn max_tier(&self) -> Tier {
        self.tiers
            .last()
            .map(|info| info.tier)
            .unwrap_or(Tier::LOWEST)
    }

    /// Tier from which merges count as built ships.
    #[must_use]
    pub const fn milestone(&self) -> Tier {
        self.milestone
    }

    /// Points awarded for producing the tier, zero for unknown tiers.
    #[must_use]
    pub fn value_of(&self, tier: Tier) -> u64 {
        self.info(tier).map_or(0, |info| info.value)
    }

    /// Tiers with a positive spawn weight, in rank order.
    pub fn spawnable(&self) -> impl Iterator<Item = (Tier, f64)> + '_ {
        self.tiers
            .iter()
            .filter(|info| info.spawn_weight > 0.0)
            .map(|info| (info.tier, info.spawn_weight))
    }

    /// Iterator over every tier description in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &TierInfo> {
        self.tiers.iter()
    }

    /// Number of tiers in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Reports whether the catalog is empty. Validated catalogs never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(key: &str, rank: u8, value: u64, weight: f64) -> TierInfo {
        TierInfo::new(key, rank, key, "", value, weight)
    }

    #[test]
    fn built_in_catalogs_validate() {
        for catalog in [TierCatalog::forge(), TierCatalog::salvage()] {
            let rebuilt = TierCatalog::new(catalog.tiers.clone(), catalog.milestone());
            assert_eq!(rebuilt, Ok(catalog));
        }
    }

    #[test]
    fn next_tier_is_derived_from_rank_order() {
        let catalog = TierCatalog::forge();
        assert_eq!(catalog.next_tier(Tier::new(1)), Some(Tier::new(2)));
        assert_eq!(catalog.next_tier(Tier::new(9)), Some(Tier::new(10)));
        assert_eq!(catalog.next_tier(catalog.max_tier()), None);
        assert_eq!(catalog.next_tier(Tier::new(42)), None);
    }

    #[test]
    fn lookups_by_rank_and_key_agree() {
        let catalog = TierCatalog::forge();
        assert_eq!(catalog.tier_by_rank(3), catalog.tier_by_key("spatial_mineral"));
        assert_eq!(catalog.tier_by_rank(0), None);
        assert_eq!(catalog.tier_by_rank(11), None);
        assert_eq!(catalog.tier_by_key("unobtainium"), None);
    }

    #[test]
    fn values_never_decrease_with_rank() {
        for catalog in [TierCatalog::forge(), TierCatalog::salvage()] {
            let values: Vec<u64> = catalog.iter().map(|info| info.value).collect();
            assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
        }
    }

    #[test]
    fn rejects_gaps_in_ranks() {
        let result = TierCatalog::new(
            vec![tier("a", 1, 1, 1.0), tier("b", 3, 2, 0.0)],
            Tier::new(1),
        );
        assert_eq!(
            result,
            Err(CatalogError::NonContiguousRank {
                expected: 2,
                found: 3,
            })
        );
    }

    #[test]
    fn rejects_catalog_without_spawnable_tier() {
        let result = TierCatalog::new(
            vec![tier("a", 1, 1, 0.0), tier("b", 2, 2, 0.0)],
            Tier::new(1),
        );
        assert_eq!(result, Err(CatalogError::NoSpawnableTier));
    }

    #[test]
    fn rejects_decreasing_values_and_bad_weights() {
        assert!(matches!(
            TierCatalog::new(
                vec![tier("a", 1, 10, 1.0), tier("b", 2, 5, 0.0)],
                Tier::new(1)
            ),
            Err(CatalogError::DecreasingValue { .. })
        ));
        assert!(matches!(
            TierCatalog::new(vec![tier("a", 1, 10, f64::NAN)], Tier::new(1)),
            Err(CatalogError::InvalidWeight { .. })
        ));
        assert_eq!(TierCatalog::new(Vec::new(), Tier::new(1)), Err(CatalogError::Empty));
    }

    #[test]
    fn only_positive_weights_are_spawnable() {
        let catalog = TierCatalog::forge();
        let ranks: Vec<u8> = catalog.spawnable().map(|(tier, _)| tier.rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }
}
