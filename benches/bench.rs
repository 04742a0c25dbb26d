// Criterion benchmarks for lane-diversity

use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};
use lane_diversity::core::{
    assemble_pairs, build_tier_plan, calculate_freight_score,
    distance::{calculate_bounding_box, haversine_miles},
    EngineSettings, PairingEngine, ScoringTables, DEFAULT_BANDS, DEFAULT_CEILINGS,
};
use lane_diversity::models::{Candidate, City, EquipmentClass, LaneRequest, MarketCodeSource, ShortfallPolicy, Tier};
use lane_diversity::services::InMemoryCatalog;
use std::sync::Arc;

const COLUMBUS: (f64, f64) = (39.9612, -82.9988);
const NASHVILLE: (f64, f64) = (36.1627, -86.7816);

/// Cities scattered on a spiral around a center, one market per three cities
fn create_cities(prefix: &str, region: &str, center: (f64, f64), count: usize) -> Vec<City> {
    (0..count)
        .map(|i| {
            let angle = i as f64 * 0.7;
            let reach = 0.05 + (i as f64 * 0.013) % 1.4;
            City::new(
                format!("{} {}", prefix, i),
                region,
                center.0 + reach * angle.sin(),
                center.1 + reach * angle.cos(),
            )
            .with_market(format!("{}_{}", region, i / 3))
            .with_population(1_000 + (i as u64 * 7_919) % 400_000)
        })
        .collect()
}

fn create_candidate(i: usize, tier: Tier) -> Candidate {
    Candidate {
        city: City::new(format!("City {}", i), "OH", 40.0, -83.0).with_population(i as u64 * 1_000),
        market_code: format!("OH_{}", i),
        market_source: MarketCodeSource::Catalog,
        from_fallback: false,
        distance_miles: (i % 50) as f64,
        score: i as f64 * 0.01,
        tier,
    }
}

fn bench_haversine_miles(c: &mut Criterion) {
    c.bench_function("haversine_miles", |b| {
        b.iter(|| {
            haversine_miles(
                black_box(COLUMBUS.0),
                black_box(COLUMBUS.1),
                black_box(NASHVILLE.0),
                black_box(NASHVILLE.1),
            )
        });
    });
}

fn bench_bounding_box(c: &mut Criterion) {
    c.bench_function("bounding_box_calculation", |b| {
        b.iter(|| {
            calculate_bounding_box(
                black_box(COLUMBUS.0),
                black_box(COLUMBUS.1),
                black_box(75.0),
            )
        });
    });
}

fn bench_tier_plan(c: &mut Criterion) {
    c.bench_function("tier_plan", |b| {
        b.iter(|| build_tier_plan(black_box(&DEFAULT_BANDS), black_box(&DEFAULT_CEILINGS), black_box(Some(150.0))));
    });
}

fn bench_scoring(c: &mut Criterion) {
    let tables = ScoringTables::default();
    let base = City::new("Columbus", "OH", COLUMBUS.0, COLUMBUS.1).with_market("OH_COL");
    let tier = Tier { index: 2, ceiling_miles: 50.0, min_miles: 35.0, max_miles: 50.0, relaxed: false };
    let candidate = create_candidate(42, tier);

    c.bench_function("freight_score", |b| {
        b.iter(|| {
            calculate_freight_score(
                black_box(&candidate),
                black_box(&base),
                black_box(EquipmentClass::Flatbed),
                black_box(&tables),
            )
        });
    });
}

fn bench_assembly(c: &mut Criterion) {
    let tier = Tier { index: 0, ceiling_miles: 50.0, min_miles: 0.0, max_miles: 25.0, relaxed: false };
    let pickups: Vec<Candidate> = (0..50).map(|i| create_candidate(i, tier)).collect();
    let deliveries: Vec<Candidate> = (50..100).map(|i| create_candidate(i, tier)).collect();

    c.bench_function("assemble_pairs_50", |b| {
        b.iter(|| {
            assemble_pairs(
                black_box(pickups.clone()),
                black_box(deliveries.clone()),
                black_box(25),
                ShortfallPolicy::NeverPad,
                false,
            )
        });
    });
}

fn bench_pairing(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    let mut group = c.benchmark_group("pairing");

    for city_count in [50, 200, 1000].iter() {
        let mut cities = vec![
            City::new("Columbus", "OH", COLUMBUS.0, COLUMBUS.1).with_market("OH_COL"),
            City::new("Nashville", "TN", NASHVILLE.0, NASHVILLE.1).with_market("TN_NAS"),
        ];
        cities.extend(create_cities("Ohio", "OH", COLUMBUS, *city_count));
        cities.extend(create_cities("Tenn", "TN", NASHVILLE, *city_count));

        let engine = PairingEngine::new(
            Arc::new(InMemoryCatalog::new(cities)),
            Arc::new(ScoringTables::default()),
            EngineSettings::default(),
        );
        let request = LaneRequest::new(
            City::new("Columbus", "OH", COLUMBUS.0, COLUMBUS.1).with_market("OH_COL"),
            City::new("Nashville", "TN", NASHVILLE.0, NASHVILLE.1).with_market("TN_NAS"),
            EquipmentClass::Van,
        );

        group.bench_with_input(
            BenchmarkId::new("pair", city_count),
            city_count,
            |b, _| {
                b.iter(|| runtime.block_on(engine.pair(black_box(request.clone()))));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_haversine_miles,
    bench_bounding_box,
    bench_tier_plan,
    bench_scoring,
    bench_assembly,
    bench_pairing
);

criterion_main!(benches);
