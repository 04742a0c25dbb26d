use crate::core::tables::ScoringTables;
use crate::models::{Candidate, City, EquipmentClass};

/// Calculate the freight desirability score of a candidate city
///
/// Scoring formula (all terms additive, each bounded):
/// score = (
///     distance_weight * (1 - distance / ceiling) +   # Closer within the active tier = higher
///     population tier bonus +                        # Larger cities move more freight
///     equipment keyword / region bonus +             # Fits the trailer type
///     named hub override bonus +                     # Known local relationships
///     cross_market bonus                             # Different region than the base
/// )
pub fn calculate_freight_score(
    candidate: &Candidate,
    base: &City,
    equipment: EquipmentClass,
    tables: &ScoringTables,
) -> f64 {
    let weights = &tables.weights;

    let distance_score =
        calculate_distance_score(candidate.distance_miles, candidate.tier.ceiling_miles) * weights.distance;

    let population_score = tables.population_bonus(candidate.city.population);

    let equipment_score = calculate_equipment_score(&candidate.city, equipment, tables);

    let hub_score = tables.hub_bonus(base, &candidate.city);

    let cross_market_score = if is_cross_region(base, &candidate.city) {
        weights.cross_market
    } else {
        0.0
    };

    distance_score + population_score + equipment_score + hub_score + cross_market_score
}

/// Calculate distance score (0-1)
/// Linear: 1 at the base, 0 at the ceiling
#[inline]
fn calculate_distance_score(distance_miles: f64, max_radius_miles: f64) -> f64 {
    if !distance_miles.is_finite() || max_radius_miles <= 0.0 {
        return 0.0;
    }

    (1.0 - distance_miles / max_radius_miles).clamp(0.0, 1.0)
}

/// Keyword and region affinity for the equipment class
fn calculate_equipment_score(city: &City, equipment: EquipmentClass, tables: &ScoringTables) -> f64 {
    let affinity = match tables.affinity(equipment) {
        Some(a) => a,
        None => return 0.0,
    };

    let name = city.name.to_lowercase();
    let region = city.region.trim().to_uppercase();
    let mut score = 0.0;

    if affinity.keywords.iter().any(|k| name.contains(k.as_str())) {
        score += tables.weights.equipment_keyword;
    }

    if affinity.regions.iter().any(|r| r.eq_ignore_ascii_case(&region)) {
        score += tables.weights.equipment_region;
    }

    score
}

#[inline]
fn is_cross_region(base: &City, candidate: &City) -> bool {
    !base.region.trim().eq_ignore_ascii_case(candidate.region.trim())
}
