use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use crate::core::candidates::{CandidateSource, SourceSettings};
use crate::core::market::MarketResolver;
use crate::core::pairing::assemble_pairs;
use crate::core::selector::{build_tier_plan, DiversitySelector, SideSelection, DEFAULT_BANDS, DEFAULT_CEILINGS};
use crate::core::tables::ScoringTables;
use crate::models::{Band, City, LaneRequest, Pair, ShortfallPolicy, ShortfallReason, Side, SideDiagnostics, Tier};
use crate::services::catalog::{with_timeout, CatalogError, CityCatalog};
use crate::services::places::PlacesProvider;

/// Errors that abort a pairing request
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Could not resolve {city}, {region} to a known city")]
    Resolution { city: String, region: String },

    #[error("City catalog unavailable: {0}")]
    CatalogUnavailable(#[from] CatalogError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Engine-wide tuning, fixed at startup
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub bands: Vec<Band>,
    pub radius_ceilings: Vec<f64>,
    pub default_required_pairs: usize,
    pub default_policy: ShortfallPolicy,
    pub source: SourceSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            bands: DEFAULT_BANDS.to_vec(),
            radius_ceilings: DEFAULT_CEILINGS.to_vec(),
            default_required_pairs: 6,
            default_policy: ShortfallPolicy::default(),
            source: SourceSettings::default(),
        }
    }
}

/// Result of one pairing request
#[derive(Debug, Clone)]
pub struct PairingOutcome {
    pub origin: City,
    pub destination: City,
    pub pairs: Vec<Pair>,
    pub achieved_count: usize,
    pub required_count: usize,
    pub shortfall_reason: Option<ShortfallReason>,
    pub pickup: SideDiagnostics,
    pub delivery: SideDiagnostics,
}

/// Geographic diversity pairing engine
///
/// Holds only shared read-only handles; all per-request state (market
/// usage, memo tables) lives inside a single `pair` call.
#[derive(Clone)]
pub struct PairingEngine {
    catalog: Arc<dyn CityCatalog>,
    places: Option<Arc<dyn PlacesProvider>>,
    tables: Arc<ScoringTables>,
    settings: Arc<EngineSettings>,
}

impl PairingEngine {
    pub fn new(catalog: Arc<dyn CityCatalog>, tables: Arc<ScoringTables>, settings: EngineSettings) -> Self {
        Self {
            catalog,
            places: None,
            tables,
            settings: Arc::new(settings),
        }
    }

    pub fn with_places(mut self, places: Arc<dyn PlacesProvider>) -> Self {
        self.places = Some(places);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &dyn CityCatalog {
        self.catalog.as_ref()
    }

    /// Look up a base location in the catalog
    ///
    /// A base without a market code gets one from the nearest reference city
    /// so its own market stays out of the strict pass.
    pub async fn resolve_base(&self, city: &str, region: &str) -> Result<City, EngineError> {
        let timeout = self.settings.source.catalog_timeout;
        let found = with_timeout(timeout, self.catalog.find_city(city, region)).await?;

        let mut base = match found {
            Some(base) if base.has_coordinates() => base,
            _ => {
                return Err(EngineError::Resolution {
                    city: city.to_string(),
                    region: region.to_string(),
                })
            }
        };

        if base.market().is_none() {
            let mut resolver = MarketResolver::new(
                self.catalog.as_ref(),
                self.settings.source.reference_radius_miles,
                timeout,
            );
            let (code, source) = resolver.resolve(&base).await?;
            debug!("Base {} has no market code, using {} ({:?})", base.key(), code, source);
            base.market_code = Some(code);
        }

        Ok(base)
    }

    /// Produce up to `required_pairs` market-diverse pickup/delivery pairs
    ///
    /// Both sides are searched concurrently; the first catalog failure
    /// cancels the other side.
    pub async fn pair(&self, request: LaneRequest) -> Result<PairingOutcome, EngineError> {
        if request.required_pairs == 0 {
            return Err(EngineError::InvalidRequest("requiredPairs must be at least 1".to_string()));
        }
        if let Some(radius) = request.max_radius_miles {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(EngineError::InvalidRequest(format!(
                    "maxRadius must be a positive number, got {}",
                    radius
                )));
            }
        }

        let plan = build_tier_plan(
            &self.settings.bands,
            &self.settings.radius_ceilings,
            request.max_radius_miles,
        );

        info!(
            "Pairing {} -> {}: {} pairs, {} tiers, policy {:?}",
            request.origin.key(),
            request.destination.key(),
            request.required_pairs,
            plan.len(),
            request.policy
        );

        let (pickups, deliveries) = tokio::try_join!(
            self.select_side(&request, &plan, &request.origin, Side::Pickup),
            self.select_side(&request, &plan, &request.destination, Side::Delivery),
        )?;

        let relaxation_used = pickups.diagnostics.relaxation_used || deliveries.diagnostics.relaxation_used;
        let assembly = assemble_pairs(
            pickups.candidates,
            deliveries.candidates,
            request.required_pairs,
            request.policy,
            relaxation_used,
        );

        let achieved_count = assembly.pairs.len();
        match assembly.shortfall_reason {
            Some(reason) => info!(
                "Pairing short: {}/{} ({})",
                achieved_count,
                request.required_pairs,
                reason.as_str()
            ),
            None => info!("Pairing complete: {} pairs", achieved_count),
        }

        Ok(PairingOutcome {
            origin: request.origin,
            destination: request.destination,
            pairs: assembly.pairs,
            achieved_count,
            required_count: request.required_pairs,
            shortfall_reason: assembly.shortfall_reason,
            pickup: pickups.diagnostics,
            delivery: deliveries.diagnostics,
        })
    }

    async fn select_side(
        &self,
        request: &LaneRequest,
        plan: &[Tier],
        base: &City,
        side: Side,
    ) -> Result<SideSelection, CatalogError> {
        let fallback_radius = plan.last().map_or(0.0, |t| t.max_miles);
        let mut source = CandidateSource::new(
            self.catalog.as_ref(),
            self.places.as_deref(),
            self.settings.source,
        )
        .with_fallback_radius(fallback_radius);
        let selector = DiversitySelector::new(
            &self.tables,
            plan,
            request.equipment,
            request.required_pairs,
            request.policy,
        );

        selector.select(&mut source, base, side).await
    }
}
