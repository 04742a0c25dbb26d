use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// City row from the catalog (or synthesized from the places provider)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub region: String,
    #[serde(rename = "postalCode", default)]
    pub postal_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "marketCode", default)]
    pub market_code: Option<String>,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(rename = "marketName", default)]
    pub market_name: Option<String>,
}

impl City {
    pub fn new(name: impl Into<String>, region: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            postal_code: None,
            latitude,
            longitude,
            market_code: None,
            population: None,
            market_name: None,
        }
    }

    pub fn with_market(mut self, code: impl Into<String>) -> Self {
        self.market_code = Some(code.into());
        self
    }

    pub fn with_population(mut self, population: u64) -> Self {
        self.population = Some(population);
        self
    }

    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }

    pub fn key(&self) -> CityKey {
        CityKey::new(&self.name, &self.region)
    }

    /// Market code, ignoring blank values left over from ingestion
    pub fn market(&self) -> Option<&str> {
        self.market_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Identity of a city: folded name plus upper-cased region
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CityKey {
    pub name: String,
    pub region: String,
}

impl CityKey {
    pub fn new(name: &str, region: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            region: region.trim().to_uppercase(),
        }
    }
}

impl fmt::Display for CityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.name, self.region)
    }
}

/// Equipment class of the load, used for scoring affinity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentClass {
    Van,
    Reefer,
    Flatbed,
    General,
}

impl EquipmentClass {
    /// Parse a caller-supplied equipment code; unknown codes get no affinity
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "V" | "VAN" | "DRY VAN" | "DRYVAN" => EquipmentClass::Van,
            "R" | "RF" | "REEFER" => EquipmentClass::Reefer,
            "F" | "FD" | "FLATBED" | "SD" | "STEP DECK" | "STEPDECK" | "SB" | "RGN" => {
                EquipmentClass::Flatbed
            }
            _ => EquipmentClass::General,
        }
    }
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Distance band in miles, `(min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min_miles: f64,
    pub max_miles: f64,
}

impl Band {
    pub const fn new(min_miles: f64, max_miles: f64) -> Self {
        Self { min_miles, max_miles }
    }
}

/// One step of a side's search plan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub index: usize,
    pub ceiling_miles: f64,
    pub min_miles: f64,
    pub max_miles: f64,
    pub relaxed: bool,
}

impl Tier {
    #[inline]
    pub fn contains(&self, distance_miles: f64) -> bool {
        distance_miles > self.min_miles && distance_miles <= self.max_miles
    }

    pub fn relaxed(self) -> Self {
        Self { relaxed: true, ..self }
    }
}

/// Where a candidate's market code came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketCodeSource {
    /// Present on the catalog row
    Catalog,
    /// Exact name+region match in the catalog
    Lookup,
    /// Adopted from the best nearby catalog city
    Nearest,
    /// Built from region and name; not a real market
    Synthesized,
}

/// A city under consideration for one side of the lane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub city: City,
    pub market_code: String,
    pub market_source: MarketCodeSource,
    pub from_fallback: bool,
    pub distance_miles: f64,
    pub score: f64,
    pub tier: Tier,
}

impl Candidate {
    pub fn key(&self) -> CityKey {
        self.city.key()
    }

    pub fn market_synthesized(&self) -> bool {
        self.market_source == MarketCodeSource::Synthesized
    }
}

/// Market codes consumed on one side, with the tiers each was admitted in
#[derive(Debug, Clone, Default)]
pub struct MarketUsageSet {
    tiers: HashMap<String, Vec<usize>>,
}

impl MarketUsageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, market_code: &str) -> bool {
        self.tiers.contains_key(market_code)
    }

    pub fn insert(&mut self, market_code: &str, tier_index: usize) {
        self.tiers
            .entry(market_code.to_string())
            .or_default()
            .push(tier_index);
    }

    /// True when the market was already admitted from this same tier
    pub fn used_in_tier(&self, market_code: &str, tier_index: usize) -> bool {
        self.tiers
            .get(market_code)
            .map(|tiers| tiers.contains(&tier_index))
            .unwrap_or(false)
    }

    pub fn codes(&self) -> HashSet<String> {
        self.tiers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

/// Which end of the lane a candidate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Pickup,
    Delivery,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Pickup => write!(f, "pickup"),
            Side::Delivery => write!(f, "delivery"),
        }
    }
}

/// What to do when strict diversity cannot fill the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    /// Strict markets only; report the shortfall
    Report,
    /// Run the band de-collision relaxation pass before reporting
    #[default]
    Relax,
    /// Relax, and also drop pairs whose pickup and delivery are the same city
    NeverPad,
}

impl ShortfallPolicy {
    pub fn allows_relaxation(self) -> bool {
        !matches!(self, ShortfallPolicy::Report)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallReason {
    InsufficientUniqueMarkets,
    InsufficientUniqueMarketsAfterRelaxation,
}

impl ShortfallReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShortfallReason::InsufficientUniqueMarkets => "insufficient_unique_markets",
            ShortfallReason::InsufficientUniqueMarketsAfterRelaxation => {
                "insufficient_unique_markets_after_relaxation"
            }
        }
    }
}

/// A fully resolved pairing request
#[derive(Debug, Clone)]
pub struct LaneRequest {
    pub origin: City,
    pub destination: City,
    pub equipment: EquipmentClass,
    pub required_pairs: usize,
    pub max_radius_miles: Option<f64>,
    pub policy: ShortfallPolicy,
}

impl LaneRequest {
    pub fn new(origin: City, destination: City, equipment: EquipmentClass) -> Self {
        Self {
            origin,
            destination,
            equipment,
            required_pairs: 6,
            max_radius_miles: None,
            policy: ShortfallPolicy::default(),
        }
    }

    pub fn with_required_pairs(mut self, required_pairs: usize) -> Self {
        self.required_pairs = required_pairs;
        self
    }

    pub fn with_max_radius(mut self, max_radius_miles: f64) -> Self {
        self.max_radius_miles = Some(max_radius_miles);
        self
    }

    pub fn with_policy(mut self, policy: ShortfallPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Alternative pickup/delivery combination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pair {
    pub pickup: Candidate,
    pub delivery: Candidate,
    pub score: f64,
}

impl Pair {
    pub fn new(pickup: Candidate, delivery: Candidate) -> Self {
        let score = pickup.score + delivery.score;
        Self { pickup, delivery, score }
    }

    /// The wider of the two discovery tiers
    pub fn tier(&self) -> usize {
        self.pickup.tier.index.max(self.delivery.tier.index)
    }
}

/// How one side's search went
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideDiagnostics {
    pub tiers_searched: usize,
    pub admitted: usize,
    pub relaxation_used: bool,
    pub fallback_candidates: usize,
    pub synthesized_markets: usize,
}

/// Scoring weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub distance: f64,
    pub equipment_keyword: f64,
    pub equipment_region: f64,
    pub cross_market: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            distance: 1.0,
            equipment_keyword: 0.25,
            equipment_region: 0.15,
            cross_market: 0.10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_key_folds_case_and_whitespace() {
        let a = City::new(" Columbus ", "oh", 39.96, -83.0);
        let b = City::new("COLUMBUS", "OH ", 39.96, -83.0);
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().to_string(), "columbus, OH");
    }

    #[test]
    fn test_blank_market_is_missing() {
        let city = City::new("Dayton", "OH", 39.75, -84.19).with_market("  ");
        assert_eq!(city.market(), None);
    }

    #[test]
    fn test_equipment_codes() {
        assert_eq!(EquipmentClass::from_code("v"), EquipmentClass::Van);
        assert_eq!(EquipmentClass::from_code("Reefer"), EquipmentClass::Reefer);
        assert_eq!(EquipmentClass::from_code("SD"), EquipmentClass::Flatbed);
        assert_eq!(EquipmentClass::from_code("hotshot"), EquipmentClass::General);
    }

    #[test]
    fn test_tier_bounds_exclude_min() {
        let tier = Tier { index: 0, ceiling_miles: 50.0, min_miles: 0.0, max_miles: 25.0, relaxed: false };
        assert!(!tier.contains(0.0));
        assert!(tier.contains(25.0));
        assert!(!tier.contains(25.01));
    }

    #[test]
    fn test_market_usage_tracks_tiers() {
        let mut usage = MarketUsageSet::new();
        usage.insert("OH_COL", 0);
        assert!(usage.contains("OH_COL"));
        assert!(usage.used_in_tier("OH_COL", 0));
        assert!(!usage.used_in_tier("OH_COL", 1));
        assert_eq!(usage.len(), 1);
    }

    #[test]
    fn test_pair_combines_scores() {
        let tier = Tier { index: 2, ceiling_miles: 50.0, min_miles: 35.0, max_miles: 50.0, relaxed: false };
        let candidate = |name: &str, score: f64, tier: Tier| Candidate {
            city: City::new(name, "OH", 40.0, -83.0),
            market_code: name.to_uppercase(),
            market_source: MarketCodeSource::Catalog,
            from_fallback: false,
            distance_miles: 40.0,
            score,
            tier,
        };
        let pair = Pair::new(candidate("a", 1.5, tier), candidate("b", 0.5, Tier { index: 4, ..tier }));
        assert_eq!(pair.score, 2.0);
        assert_eq!(pair.tier(), 4);
    }
}
