use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};
use crate::core::distance::{calculate_bounding_box, haversine_miles};
use crate::core::market::MarketResolver;
use crate::models::{Candidate, City, CityKey, MarketCodeSource, Tier};
use crate::services::catalog::{with_timeout, CatalogError, CatalogQuery, CityCatalog};
use crate::services::places::{Place, PlacesProvider};

/// Knobs for candidate discovery
#[derive(Debug, Clone, Copy)]
pub struct SourceSettings {
    /// Below this many usable catalog rows the places provider is consulted
    pub sparse_threshold: usize,
    pub reference_radius_miles: f64,
    pub catalog_timeout: Duration,
    pub places_timeout: Duration,
    pub catalog_limit: Option<usize>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            sparse_threshold: 10,
            reference_radius_miles: 100.0,
            catalog_timeout: Duration::from_secs(10),
            places_timeout: Duration::from_secs(5),
            catalog_limit: None,
        }
    }
}

/// Candidate discovery for one side of one request
///
/// Owns the request-scoped memo tables (provider responses, market
/// resolutions); dropped with the request.
pub struct CandidateSource<'a> {
    catalog: &'a dyn CityCatalog,
    places: Option<&'a dyn PlacesProvider>,
    settings: SourceSettings,
    resolver: MarketResolver<'a>,
    fallback_radius_miles: f64,
    places_memo: Vec<(f64, Vec<Place>)>,
}

impl<'a> CandidateSource<'a> {
    pub fn new(
        catalog: &'a dyn CityCatalog,
        places: Option<&'a dyn PlacesProvider>,
        settings: SourceSettings,
    ) -> Self {
        Self {
            catalog,
            places,
            settings,
            resolver: MarketResolver::new(catalog, settings.reference_radius_miles, settings.catalog_timeout),
            fallback_radius_miles: 0.0,
            places_memo: Vec::new(),
        }
    }

    /// Widen every provider call to at least `radius_miles`
    ///
    /// Set to the outer edge of the tier plan so a sparse side costs one
    /// provider call, with each band served from the memo.
    pub fn with_fallback_radius(mut self, radius_miles: f64) -> Self {
        self.fallback_radius_miles = radius_miles;
        self
    }

    /// Fetch unscored candidates in `tier` around `base`
    ///
    /// `strict` keeps the base's own market out of the pool. Candidates whose
    /// market is in `excluded` are dropped. Catalog failures are fatal;
    /// provider failures only shrink the pool.
    pub async fn fetch_candidates(
        &mut self,
        base: &City,
        tier: Tier,
        excluded: &HashSet<String>,
        strict: bool,
    ) -> Result<Vec<Candidate>, CatalogError> {
        let base_market = if strict { base.market() } else { None };
        let base_key = base.key();

        let query = CatalogQuery {
            bounding_box: calculate_bounding_box(base.latitude, base.longitude, tier.max_miles),
            require_market: true,
            exclude_market: base_market.map(str::to_string),
            limit: self.settings.catalog_limit,
        };

        let rows = with_timeout(self.settings.catalog_timeout, self.catalog.cities_in_box(&query)).await?;

        let catalog_keys: HashSet<CityKey> = rows.iter().map(City::key).collect();
        let mut seen: HashSet<CityKey> = HashSet::new();
        let mut pool: Vec<Candidate> = Vec::new();

        for city in rows {
            if !city.has_coordinates() {
                continue;
            }
            let key = city.key();
            if key == base_key || seen.contains(&key) {
                continue;
            }
            let market = match city.market() {
                Some(m) => m.to_string(),
                None => continue,
            };
            if Some(market.as_str()) == base_market || excluded.contains(&market) {
                continue;
            }
            let distance = haversine_miles(base.latitude, base.longitude, city.latitude, city.longitude);
            if !tier.contains(distance) {
                continue;
            }

            seen.insert(key);
            pool.push(Candidate {
                city,
                market_code: market,
                market_source: MarketCodeSource::Catalog,
                from_fallback: false,
                distance_miles: distance,
                score: 0.0,
                tier,
            });
        }

        let usable = pool.len();
        if usable >= self.settings.sparse_threshold || self.places.is_none() {
            return Ok(pool);
        }

        debug!(
            "Catalog sparse around {} in {:.0}-{:.0}mi ({} usable), consulting places provider",
            base_key, tier.min_miles, tier.max_miles, usable
        );

        let places = self.fallback_places(base, tier.max_miles).await;

        for place in places {
            let mut city = place.to_city();
            if !city.has_coordinates() {
                continue;
            }
            let key = city.key();
            if key == base_key || catalog_keys.contains(&key) || seen.contains(&key) {
                continue;
            }
            let distance = haversine_miles(base.latitude, base.longitude, city.latitude, city.longitude);
            if !tier.contains(distance) {
                continue;
            }

            let (market, source) = self.resolver.resolve(&city).await?;
            if Some(market.as_str()) == base_market || excluded.contains(&market) {
                continue;
            }

            city.market_code = Some(market.clone());
            seen.insert(key);
            pool.push(Candidate {
                city,
                market_code: market,
                market_source: source,
                from_fallback: true,
                distance_miles: distance,
                score: 0.0,
                tier,
            });
        }

        debug!("Places provider added {} candidates", pool.len() - usable);
        Ok(pool)
    }

    /// Places within `radius_miles` of the base, memoized per request
    ///
    /// The provider is asked for the wider of `radius_miles` and the fallback
    /// radius; a memo entry for an equal or wider radius is reused. Provider
    /// errors and timeouts are logged and yield no places.
    async fn fallback_places(&mut self, base: &City, radius_miles: f64) -> Vec<Place> {
        let provider = match self.places {
            Some(p) => p,
            None => return Vec::new(),
        };

        let cached = self
            .places_memo
            .iter()
            .find(|(r, _)| *r >= radius_miles)
            .map(|(_, places)| places.clone());

        let places = match cached {
            Some(places) => places,
            None => {
                let fetch_radius = radius_miles.max(self.fallback_radius_miles);
                let call = provider.places_near(base.latitude, base.longitude, fetch_radius);
                let places = match tokio::time::timeout(self.settings.places_timeout, call).await {
                    Ok(Ok(places)) => places,
                    Ok(Err(e)) => {
                        warn!("Places provider unavailable, continuing with catalog only: {}", e);
                        Vec::new()
                    }
                    Err(_) => {
                        warn!(
                            "Places provider timed out after {:?}, continuing with catalog only",
                            self.settings.places_timeout
                        );
                        Vec::new()
                    }
                };
                self.places_memo.push((fetch_radius, places.clone()));
                places
            }
        };

        places
            .into_iter()
            .filter(|p| haversine_miles(base.latitude, base.longitude, p.latitude, p.longitude) <= radius_miles)
            .collect()
    }
}
