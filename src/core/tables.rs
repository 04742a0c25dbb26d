use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::models::{City, CityKey, EquipmentClass, ScoringWeights};

/// Current version of the built-in tables
pub const TABLES_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationTier {
    pub min_population: u64,
    pub bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentAffinity {
    pub equipment: EquipmentClass,
    /// Lower-case fragments matched against the candidate name
    pub keywords: Vec<String>,
    /// Region codes that favor this equipment
    pub regions: Vec<String>,
}

/// Known local freight relationship: base city → candidate city bonus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubOverride {
    pub base_city: String,
    pub base_region: String,
    pub candidate_city: String,
    pub candidate_region: String,
    pub bonus: f64,
}

/// Heuristic tables behind the freight desirability score, loadable from a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringTables {
    pub version: u32,
    #[serde(default)]
    pub weights: ScoringWeights,
    pub population_tiers: Vec<PopulationTier>,
    pub equipment: Vec<EquipmentAffinity>,
    pub hub_overrides: Vec<HubOverride>,
}

#[derive(Debug, thiserror::Error)]
pub enum TablesError {
    #[error("Failed to read scoring tables: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse scoring tables: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ScoringTables {
    /// Load tables from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TablesError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Bonus for the highest population threshold exceeded
    pub fn population_bonus(&self, population: Option<u64>) -> f64 {
        let population = match population {
            Some(p) => p,
            None => return 0.0,
        };

        self.population_tiers
            .iter()
            .filter(|tier| population > tier.min_population)
            .map(|tier| tier.bonus)
            .fold(0.0, f64::max)
    }

    pub fn affinity(&self, equipment: EquipmentClass) -> Option<&EquipmentAffinity> {
        self.equipment.iter().find(|a| a.equipment == equipment)
    }

    /// Sum of override bonuses for this base/candidate combination
    pub fn hub_bonus(&self, base: &City, candidate: &City) -> f64 {
        let base_key = base.key();
        let candidate_key = candidate.key();

        self.hub_overrides
            .iter()
            .filter(|o| CityKey::new(&o.base_city, &o.base_region) == base_key)
            .filter(|o| CityKey::new(&o.candidate_city, &o.candidate_region) == candidate_key)
            .map(|o| o.bonus)
            .sum()
    }
}

impl Default for ScoringTables {
    fn default() -> Self {
        Self {
            version: TABLES_VERSION,
            weights: ScoringWeights::default(),
            population_tiers: vec![
                PopulationTier { min_population: 500_000, bonus: 0.30 },
                PopulationTier { min_population: 100_000, bonus: 0.20 },
                PopulationTier { min_population: 50_000, bonus: 0.10 },
            ],
            equipment: vec![
                EquipmentAffinity {
                    equipment: EquipmentClass::Flatbed,
                    keywords: words(&["port", "harbor", "steel", "mill", "iron", "forge", "industrial", "works", "landing"]),
                    regions: words(&["OH", "PA", "IN", "MI", "IL", "WI", "AL", "TX"]),
                },
                EquipmentAffinity {
                    equipment: EquipmentClass::Reefer,
                    keywords: words(&["farm", "valley", "orchard", "grove", "dairy", "garden", "fresh"]),
                    regions: words(&["CA", "FL", "WA", "GA", "ID", "AZ", "WI"]),
                },
                EquipmentAffinity {
                    equipment: EquipmentClass::Van,
                    keywords: words(&[
                        "memphis", "louisville", "indianapolis", "columbus", "atlanta", "dallas",
                        "joliet", "harrisburg", "allentown", "reno", "ontario", "junction",
                    ]),
                    regions: words(&["TN", "KY", "IN", "GA", "PA", "IL"]),
                },
            ],
            hub_overrides: vec![
                hub("Columbus", "OH", "Groveport", "OH", 0.30),
                hub("Columbus", "OH", "Obetz", "OH", 0.20),
                hub("Nashville", "TN", "Lebanon", "TN", 0.25),
                hub("Nashville", "TN", "La Vergne", "TN", 0.25),
                hub("Nashville", "TN", "Smyrna", "TN", 0.20),
                hub("Chicago", "IL", "Joliet", "IL", 0.30),
                hub("Atlanta", "GA", "McDonough", "GA", 0.25),
                hub("Memphis", "TN", "Olive Branch", "MS", 0.25),
                hub("Indianapolis", "IN", "Plainfield", "IN", 0.25),
                hub("Los Angeles", "CA", "Ontario", "CA", 0.30),
            ],
        }
    }
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn hub(base_city: &str, base_region: &str, candidate_city: &str, candidate_region: &str, bonus: f64) -> HubOverride {
    HubOverride {
        base_city: base_city.to_string(),
        base_region: base_region.to_string(),
        candidate_city: candidate_city.to_string(),
        candidate_region: candidate_region.to_string(),
        bonus,
    }
}
