use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use crate::core::distance::{calculate_bounding_box, haversine_miles};
use crate::models::{City, CityKey, MarketCodeSource};
use crate::services::catalog::{with_timeout, CatalogError, CatalogQuery, CityCatalog};

/// Request-scoped market code resolver; memoizes by city key
///
/// Resolution order: exact catalog match, then the best nearby catalog
/// city (close and populous), then a synthesized `REGION_XXX` code.
pub struct MarketResolver<'a> {
    catalog: &'a dyn CityCatalog,
    reference_radius_miles: f64,
    timeout: Duration,
    memo: HashMap<CityKey, (String, MarketCodeSource)>,
}

impl<'a> MarketResolver<'a> {
    pub fn new(catalog: &'a dyn CityCatalog, reference_radius_miles: f64, timeout: Duration) -> Self {
        Self {
            catalog,
            reference_radius_miles,
            timeout,
            memo: HashMap::new(),
        }
    }

    /// Resolve a market code for `city`
    ///
    /// Catalog failures are returned; every other path yields a code.
    pub async fn resolve(&mut self, city: &City) -> Result<(String, MarketCodeSource), CatalogError> {
        if let Some(code) = city.market() {
            return Ok((code.to_string(), MarketCodeSource::Catalog));
        }

        let key = city.key();
        if let Some(hit) = self.memo.get(&key) {
            return Ok(hit.clone());
        }

        let resolved = self.resolve_uncached(city, &key).await?;
        debug!("Resolved market for {} -> {} ({:?})", key, resolved.0, resolved.1);
        self.memo.insert(key, resolved.clone());
        Ok(resolved)
    }

    async fn resolve_uncached(
        &self,
        city: &City,
        key: &CityKey,
    ) -> Result<(String, MarketCodeSource), CatalogError> {
        // Step 1: exact name + region
        let exact = with_timeout(self.timeout, self.catalog.find_city(&city.name, &city.region)).await?;
        if let Some(code) = exact.as_ref().and_then(|c| c.market()) {
            return Ok((code.to_string(), MarketCodeSource::Lookup));
        }

        // Step 2: best nearby reference city
        if city.has_coordinates() {
            let query = CatalogQuery::new(calculate_bounding_box(
                city.latitude,
                city.longitude,
                self.reference_radius_miles,
            ));
            let references = with_timeout(self.timeout, self.catalog.cities_in_box(&query)).await?;

            if let Some(code) = best_reference(city, key, &references, self.reference_radius_miles) {
                return Ok((code, MarketCodeSource::Nearest));
            }
        }

        // Step 3: last resort
        let code = synthesize_market_code(city);
        warn!("No market reference near {}, synthesized {}", key, code);
        Ok((code, MarketCodeSource::Synthesized))
    }
}

/// Weight of a reference city: populous and close wins
#[inline]
pub fn reference_weight(distance_miles: f64, population: Option<u64>) -> f64 {
    let population = population.unwrap_or(0) as f64;
    (1.0 + (population + 1.0).log10()) / (1.0 + distance_miles)
}

/// Pick the market code of the highest-weight reference within the radius
fn best_reference(city: &City, key: &CityKey, references: &[City], radius_miles: f64) -> Option<String> {
    references
        .iter()
        .filter(|r| r.has_coordinates() && &r.key() != key)
        .filter_map(|r| {
            let code = r.market()?;
            let distance = haversine_miles(city.latitude, city.longitude, r.latitude, r.longitude);
            if !distance.is_finite() || distance > radius_miles {
                return None;
            }
            Some((reference_weight(distance, r.population), distance, r.key(), code))
        })
        .min_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then(a.1.total_cmp(&b.1))
                .then_with(|| a.2.cmp(&b.2))
        })
        .map(|(_, _, _, code)| code.to_string())
}

/// Build `REGION_XXX` from the region and the first three alphanumerics of the name
pub fn synthesize_market_code(city: &City) -> String {
    let fragment: String = city
        .name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();

    let fragment = if fragment.is_empty() { "UNK".to_string() } else { fragment };
    format!("{}_{}", city.region.trim().to_uppercase(), fragment)
}
