// Integration tests for lane-diversity

use lane_diversity::core::{EngineError, EngineSettings, PairingEngine, PairingOutcome, ScoringTables};
use lane_diversity::models::{City, CityKey, EquipmentClass, LaneRequest, PairView, ShortfallPolicy, ShortfallReason};
use lane_diversity::services::{HttpPlacesClient, InMemoryCatalog, Place, StaticPlacesProvider};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn city(name: &str, region: &str, lat: f64, lon: f64, market: &str, population: u64) -> City {
    City::new(name, region, lat, lon).with_market(market).with_population(population)
}

/// Central Ohio: seven distinct markets within 75 miles of Columbus
fn ohio() -> Vec<City> {
    vec![
        city("Columbus", "OH", 39.9612, -82.9988, "OH_COL", 905_000),
        city("Obetz", "OH", 39.8787, -82.9507, "OH_COL", 5_000),
        city("Grove City", "OH", 39.8815, -83.0930, "OH_COL", 41_000),
        city("Delaware", "OH", 40.2987, -83.0680, "OH_DEL", 41_000),
        city("Newark", "OH", 40.0581, -82.4013, "OH_NEW", 49_000),
        city("Lancaster", "OH", 39.7137, -82.5993, "OH_LAN", 40_000),
        city("Marion", "OH", 40.5887, -83.1285, "OH_MAR", 36_000),
        city("Chillicothe", "OH", 39.3331, -82.9824, "OH_CHI", 22_000),
        city("Springfield", "OH", 39.9242, -83.8088, "OH_SPR", 58_000),
        city("Zanesville", "OH", 39.9403, -82.0132, "OH_ZAN", 25_000),
    ]
}

/// Middle Tennessee: seven distinct markets within 75 miles of Nashville
fn tennessee() -> Vec<City> {
    vec![
        city("Nashville", "TN", 36.1627, -86.7816, "TN_NAS", 690_000),
        city("La Vergne", "TN", 36.0156, -86.5819, "TN_NAS", 38_000),
        city("Franklin", "TN", 35.9251, -86.8689, "TN_FRA", 83_000),
        city("Gallatin", "TN", 36.3884, -86.4467, "TN_GAL", 44_000),
        city("Murfreesboro", "TN", 35.8456, -86.3903, "TN_MUR", 152_000),
        city("Lebanon", "TN", 36.2081, -86.2911, "TN_LEB", 38_000),
        city("Clarksville", "TN", 36.5298, -87.3595, "TN_CLA", 166_000),
        city("Columbia", "TN", 35.6151, -87.0353, "TN_CLM", 41_000),
        city("Bowling Green", "KY", 36.9685, -86.4808, "KY_BOW", 72_000),
    ]
}

/// Eastern Nevada: three distinct markets within 100 miles of Ely
fn nevada() -> Vec<City> {
    vec![
        city("Ely", "NV", 39.2474, -114.8886, "NV_ELY", 4_000),
        city("McGill", "NV", 39.4049, -114.7761, "NV_MCG", 1_100),
        city("Ruth", "NV", 39.2791, -115.0006, "NV_RUT", 400),
        city("Lund", "NV", 38.8597, -115.0064, "NV_RUT", 300),
        city("Baker", "NV", 39.0130, -114.1228, "NV_BAK", 70),
    ]
}

fn engine_with(cities: Vec<City>, settings: EngineSettings) -> PairingEngine {
    PairingEngine::new(
        Arc::new(InMemoryCatalog::new(cities)),
        Arc::new(ScoringTables::default()),
        settings,
    )
}

fn engine() -> PairingEngine {
    let mut cities = ohio();
    cities.extend(tennessee());
    cities.extend(nevada());
    engine_with(cities, EngineSettings::default())
}

async fn lane(engine: &PairingEngine, origin: (&str, &str), destination: (&str, &str)) -> LaneRequest {
    let origin = engine.resolve_base(origin.0, origin.1).await.unwrap();
    let destination = engine.resolve_base(destination.0, destination.1).await.unwrap();
    LaneRequest::new(origin, destination, EquipmentClass::Van)
}

fn pickup_markets(outcome: &PairingOutcome) -> HashSet<String> {
    outcome.pairs.iter().map(|p| p.pickup.market_code.clone()).collect()
}

fn delivery_markets(outcome: &PairingOutcome) -> HashSet<String> {
    outcome.pairs.iter().map(|p| p.delivery.market_code.clone()).collect()
}

#[tokio::test]
async fn test_columbus_to_nashville_six_diverse_pairs() {
    let engine = engine();
    let request = lane(&engine, ("Columbus", "OH"), ("Nashville", "TN")).await.with_max_radius(75.0);

    let outcome = engine.pair(request).await.unwrap();

    assert_eq!(outcome.achieved_count, 6);
    assert_eq!(outcome.pairs.len(), 6);
    assert!(outcome.shortfall_reason.is_none());
    assert_eq!(pickup_markets(&outcome).len(), 6);
    assert_eq!(delivery_markets(&outcome).len(), 6);

    for pair in &outcome.pairs {
        assert!(pair.pickup.distance_miles <= 75.0);
        assert!(pair.delivery.distance_miles <= 75.0);
        assert!(pair.pickup.tier.contains(pair.pickup.distance_miles));
        assert!(pair.delivery.tier.contains(pair.delivery.distance_miles));
        assert_ne!(pair.pickup.market_code, "OH_COL");
        assert_ne!(pair.delivery.market_code, "TN_NAS");
        assert!(!pair.pickup.tier.relaxed && !pair.delivery.tier.relaxed);
    }
    assert!(!outcome.pickup.relaxation_used);
}

#[tokio::test]
async fn test_pairs_come_from_nearest_tiers_first() {
    let engine = engine();
    let request = lane(&engine, ("Columbus", "OH"), ("Nashville", "TN")).await;

    let outcome = engine.pair(request).await.unwrap();

    // Six markets fit within 50 miles on both sides; Zanesville never needed
    assert!(outcome.pairs.iter().all(|p| p.pickup.city.name != "Zanesville"));
    assert!(outcome.pairs.iter().all(|p| p.tier() <= 2));
    assert_eq!(outcome.pairs[0].pickup.city.name, "Delaware");
}

#[tokio::test]
async fn test_sparse_origin_reports_shortfall_without_duplicates() {
    let engine = engine();
    let request = lane(&engine, ("Ely", "NV"), ("Nashville", "TN"))
        .await
        .with_policy(ShortfallPolicy::Report);

    let outcome = engine.pair(request).await.unwrap();

    assert!(outcome.achieved_count <= 3);
    assert_eq!(outcome.achieved_count, outcome.pairs.len());
    assert_eq!(outcome.shortfall_reason, Some(ShortfallReason::InsufficientUniqueMarkets));
    assert_eq!(pickup_markets(&outcome).len(), outcome.pairs.len());

    let keys: HashSet<CityKey> = outcome.pairs.iter().map(|p| p.pickup.key()).collect();
    assert_eq!(keys.len(), outcome.pairs.len());
}

#[tokio::test]
async fn test_relaxation_reuses_markets_only_across_bands() {
    let engine = engine();
    let request = lane(&engine, ("Ely", "NV"), ("Nashville", "TN")).await;

    let outcome = engine.pair(request).await.unwrap();

    // Lund shares NV_RUT with Ruth but sits in a different band
    assert_eq!(outcome.achieved_count, 4);
    assert_eq!(
        outcome.shortfall_reason,
        Some(ShortfallReason::InsufficientUniqueMarketsAfterRelaxation)
    );
    assert!(outcome.pickup.relaxation_used);

    let lund = outcome.pairs.iter().find(|p| p.pickup.city.name == "Lund").unwrap();
    assert!(lund.pickup.tier.relaxed);

    for (i, a) in outcome.pairs.iter().enumerate() {
        for b in &outcome.pairs[i + 1..] {
            if a.pickup.market_code == b.pickup.market_code {
                assert_ne!(a.pickup.tier.index, b.pickup.tier.index);
            }
        }
    }
}

#[tokio::test]
async fn test_identical_requests_are_deterministic() {
    let engine = engine();

    let first = engine
        .pair(lane(&engine, ("Columbus", "OH"), ("Nashville", "TN")).await)
        .await
        .unwrap();
    let second = engine
        .pair(lane(&engine, ("Columbus", "OH"), ("Nashville", "TN")).await)
        .await
        .unwrap();

    let first: Vec<PairView> = first.pairs.iter().map(PairView::from).collect();
    let second: Vec<PairView> = second.pairs.iter().map(PairView::from).collect();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_wider_radius_never_reduces_pairs() {
    let engine = engine();
    let mut previous = 0;

    for radius in [25.0, 35.0, 50.0, 75.0, 100.0] {
        let request = lane(&engine, ("Columbus", "OH"), ("Nashville", "TN"))
            .await
            .with_max_radius(radius)
            .with_policy(ShortfallPolicy::Report);

        let outcome = engine.pair(request).await.unwrap();
        assert!(
            outcome.achieved_count >= previous,
            "radius {} gave {} pairs, fewer than {}",
            radius,
            outcome.achieved_count,
            previous
        );
        assert!(outcome.pairs.iter().all(|p| p.pickup.distance_miles <= radius));
        previous = outcome.achieved_count;
    }

    assert_eq!(previous, 6);
}

#[tokio::test]
async fn test_unknown_city_fails_resolution() {
    let engine = engine();
    let result = engine.resolve_base("Springfield", "ZZ").await;
    assert!(matches!(result, Err(EngineError::Resolution { .. })));
}

#[tokio::test]
async fn test_provider_place_already_in_catalog_is_not_duplicated() {
    let mut cities = ohio();
    cities.extend(tennessee());
    let provider = StaticPlacesProvider::new(vec![
        Place {
            name: "DELAWARE".into(),
            region: "oh".into(),
            latitude: 40.2987,
            longitude: -83.0680,
            population: Some(41_000),
            postal_code: Some("43015".into()),
        },
        Place {
            name: "Marysville".into(),
            region: "OH".into(),
            latitude: 40.2364,
            longitude: -83.3671,
            population: Some(25_000),
            postal_code: None,
        },
    ]);
    let provider = Arc::new(provider);
    let engine = engine_with(cities, EngineSettings::default()).with_places(provider.clone());

    let request = lane(&engine, ("Columbus", "OH"), ("Nashville", "TN")).await;
    let outcome = engine.pair(request).await.unwrap();

    let delaware = outcome
        .pairs
        .iter()
        .filter(|p| p.pickup.key() == CityKey::new("Delaware", "OH"))
        .count();
    assert_eq!(delaware, 1);

    let keys: HashSet<CityKey> = outcome.pairs.iter().map(|p| p.pickup.key()).collect();
    assert_eq!(keys.len(), outcome.pairs.len());
    assert!(provider.calls() > 0);
}

#[tokio::test]
async fn test_http_provider_fills_sparse_area_with_synthesized_market() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/places")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"places": [{"name": "Eureka", "region": "NV", "latitude": 39.5127, "longitude": -115.9606}]}"#)
        .expect_at_least(1)
        .create_async()
        .await;

    let mut settings = EngineSettings::default();
    // Nothing in the catalog lies within 20 miles of Eureka
    settings.source.reference_radius_miles = 20.0;

    let mut cities = nevada();
    cities.extend(tennessee());
    let client = HttpPlacesClient::new(server.url(), None, Duration::from_secs(5)).unwrap();
    let engine = engine_with(cities, settings).with_places(Arc::new(client));

    let request = lane(&engine, ("Ely", "NV"), ("Nashville", "TN"))
        .await
        .with_policy(ShortfallPolicy::Report);
    let outcome = engine.pair(request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(outcome.achieved_count, 4);
    assert_eq!(outcome.pickup.fallback_candidates, 1);
    assert_eq!(outcome.pickup.synthesized_markets, 1);

    let eureka = outcome.pairs.iter().find(|p| p.pickup.city.name == "Eureka").unwrap();
    assert_eq!(eureka.pickup.market_code, "NV_EUR");
    assert!(PairView::from(eureka).pickup_market_synthesized);
}

#[tokio::test]
async fn test_provider_outage_degrades_to_catalog() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", mockito::Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let mut cities = nevada();
    cities.extend(tennessee());
    let client = HttpPlacesClient::new(server.url(), None, Duration::from_secs(5)).unwrap();
    let engine = engine_with(cities, EngineSettings::default()).with_places(Arc::new(client));

    let request = lane(&engine, ("Ely", "NV"), ("Nashville", "TN"))
        .await
        .with_policy(ShortfallPolicy::Report);
    let outcome = engine.pair(request).await.unwrap();

    assert_eq!(outcome.achieved_count, 3);
    assert_eq!(outcome.pickup.fallback_candidates, 0);
}
