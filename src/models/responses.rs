use serde::{Deserialize, Serialize};
use crate::models::domain::{Candidate, City, Pair, ShortfallReason, SideDiagnostics, Tier};

/// City as shown to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationView {
    pub city: String,
    pub region: String,
    #[serde(rename = "postalCode")]
    pub postal_code: Option<String>,
    #[serde(rename = "marketCode", skip_serializing_if = "Option::is_none", default)]
    pub market_code: Option<String>,
}

impl From<&City> for LocationView {
    fn from(city: &City) -> Self {
        Self {
            city: city.name.clone(),
            region: city.region.clone(),
            postal_code: city.postal_code.clone(),
            market_code: city.market().map(str::to_string),
        }
    }
}

impl From<&Candidate> for LocationView {
    fn from(candidate: &Candidate) -> Self {
        Self {
            city: candidate.city.name.clone(),
            region: candidate.city.region.clone(),
            postal_code: candidate.city.postal_code.clone(),
            market_code: None,
        }
    }
}

/// One alternative lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairView {
    pub pickup: LocationView,
    pub delivery: LocationView,
    pub score: f64,
    pub pickup_distance: f64,
    pub delivery_distance: f64,
    pub pickup_market: String,
    pub delivery_market: String,
    pub tier: usize,
    pub pickup_tier: Tier,
    pub delivery_tier: Tier,
    pub pickup_market_synthesized: bool,
    pub delivery_market_synthesized: bool,
}

impl From<&Pair> for PairView {
    fn from(pair: &Pair) -> Self {
        Self {
            pickup: LocationView::from(&pair.pickup),
            delivery: LocationView::from(&pair.delivery),
            score: round2(pair.score),
            pickup_distance: round1(pair.pickup.distance_miles),
            delivery_distance: round1(pair.delivery.distance_miles),
            pickup_market: pair.pickup.market_code.clone(),
            delivery_market: pair.delivery.market_code.clone(),
            tier: pair.tier(),
            pickup_tier: pair.pickup.tier,
            delivery_tier: pair.delivery.tier,
            pickup_market_synthesized: pair.pickup.market_synthesized(),
            delivery_market_synthesized: pair.delivery.market_synthesized(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairingDiagnosticsView {
    pub pickup: SideDiagnostics,
    pub delivery: SideDiagnostics,
}

/// Response for the pair lanes endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairLanesResponse {
    pub request_id: String,
    pub base_origin: LocationView,
    pub base_destination: LocationView,
    pub pairs: Vec<PairView>,
    pub achieved_count: usize,
    pub required_count: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub shortfall_reason: Option<ShortfallReason>,
    pub diagnostics: PairingDiagnosticsView,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Issued reference numbers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceNumbersResponse {
    pub references: Vec<String>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::MarketCodeSource;

    #[test]
    fn test_pair_view_shape() {
        let tier = Tier { index: 1, ceiling_miles: 50.0, min_miles: 25.0, max_miles: 35.0, relaxed: false };
        let side = |name: &str, source| Candidate {
            city: City::new(name, "OH", 40.0, -83.0).with_postal_code("43004"),
            market_code: format!("OH_{}", name.to_uppercase()),
            market_source: source,
            from_fallback: false,
            distance_miles: 30.04,
            score: 1.234,
            tier,
        };
        let pair = Pair::new(side("Newark", MarketCodeSource::Catalog), side("Zanesville", MarketCodeSource::Synthesized));
        let view = PairView::from(&pair);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["pickup"]["city"], "Newark");
        assert_eq!(json["pickup"]["postalCode"], "43004");
        assert!(json["pickup"].get("marketCode").is_none());
        assert_eq!(json["pickupDistance"], 30.0);
        assert_eq!(json["score"], 2.47);
        assert_eq!(json["deliveryMarketSynthesized"], true);
        assert_eq!(json["tier"], 1);
    }
}
