use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::core::{EngineError, PairingEngine, PairingOutcome};
use crate::models::{
    City, EquipmentClass, ErrorResponse, HealthResponse, IssueReferenceRequest, LaneRequest, LocationInput,
    LocationView, PairLanesRequest, PairLanesResponse, PairView, PairingDiagnosticsView, ReferenceNumbersResponse,
};
use crate::services::{CacheError, CacheKey, CacheManager, ReferenceIssuer};
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: PairingEngine,
    pub cache: Arc<CacheManager>,
    pub references: Arc<ReferenceIssuer>,
}

/// Configure all lane-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/lanes/pairs", web::post().to(pair_lanes))
        .route("/reference-numbers", web::post().to(issue_reference_numbers))
        .route("/cache/invalidate", web::post().to(invalidate_cache));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let catalog_healthy = state.engine.catalog().health_check().await.unwrap_or(false);

    let status = if catalog_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Pair alternative lanes endpoint
///
/// POST /api/v1/lanes/pairs
///
/// Request body:
/// ```json
/// {
///   "origin": {"city": "Columbus", "region": "OH"},
///   "destination": {"city": "Nashville", "region": "TN"},
///   "equipmentClass": "V",
///   "requiredPairs": 6,
///   "maxRadius": 75,
///   "shortfallPolicy": "relax"
/// }
/// ```
async fn pair_lanes(
    state: web::Data<AppState>,
    req: web::Json<PairLanesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for pair_lanes request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let request_id = uuid::Uuid::new_v4().to_string();
    let req = req.into_inner();

    tracing::info!(
        "[{}] Pairing lanes {}, {} -> {}, {} ({})",
        request_id,
        req.origin.city,
        req.origin.region,
        req.destination.city,
        req.destination.region,
        req.equipment_class
    );

    let bases = tokio::try_join!(
        resolve_cached(&state, &req.origin),
        resolve_cached(&state, &req.destination),
    );
    let (origin, destination) = match bases {
        Ok(bases) => bases,
        Err(e) => return engine_error_response(&request_id, &e),
    };

    let settings = state.engine.settings();
    let mut lane = LaneRequest::new(origin, destination, EquipmentClass::from_code(&req.equipment_class))
        .with_required_pairs(req.required_pairs.map(usize::from).unwrap_or(settings.default_required_pairs))
        .with_policy(req.shortfall_policy.unwrap_or(settings.default_policy));
    if let Some(radius) = req.max_radius {
        lane = lane.with_max_radius(radius);
    }

    match state.engine.pair(lane).await {
        Ok(outcome) => {
            tracing::info!(
                "[{}] Returning {}/{} pairs",
                request_id,
                outcome.achieved_count,
                outcome.required_count
            );
            HttpResponse::Ok().json(build_response(request_id, &outcome))
        }
        Err(e) => engine_error_response(&request_id, &e),
    }
}

/// Issue reference numbers endpoint
///
/// POST /api/v1/reference-numbers
async fn issue_reference_numbers(
    state: web::Data<AppState>,
    req: web::Json<IssueReferenceRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let references = state.references.issue_many(usize::from(req.count));
    tracing::debug!("Issued {} reference numbers", references.len());

    HttpResponse::Ok().json(ReferenceNumbersResponse { references })
}

/// Drop every cached base location
///
/// POST /api/v1/cache/invalidate
async fn invalidate_cache(state: web::Data<AppState>) -> impl Responder {
    match state.cache.invalidate_all().await {
        Ok(()) => HttpResponse::Ok().json(state.cache.stats()),
        Err(e) => {
            tracing::error!("Failed to invalidate cache: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "cache_error".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Resolve a base location, consulting the cache first
///
/// Cache failures only cost a catalog lookup.
async fn resolve_cached(state: &AppState, location: &LocationInput) -> Result<City, EngineError> {
    let key = CacheKey::base_location(&location.city, &location.region);

    match state.cache.get::<City>(&key).await {
        Ok(city) => return Ok(city),
        Err(CacheError::CacheMiss(_)) => {}
        Err(e) => tracing::warn!("Cache read failed for {}, using catalog: {}", key, e),
    }

    let city = state.engine.resolve_base(&location.city, &location.region).await?;

    if let Err(e) = state.cache.set(&key, &city).await {
        tracing::warn!("Failed to cache base location {}: {}", key, e);
    }

    Ok(city)
}

fn build_response(request_id: String, outcome: &PairingOutcome) -> PairLanesResponse {
    PairLanesResponse {
        request_id,
        base_origin: LocationView::from(&outcome.origin),
        base_destination: LocationView::from(&outcome.destination),
        pairs: outcome.pairs.iter().map(PairView::from).collect(),
        achieved_count: outcome.achieved_count,
        required_count: outcome.required_count,
        shortfall_reason: outcome.shortfall_reason,
        diagnostics: PairingDiagnosticsView {
            pickup: outcome.pickup.clone(),
            delivery: outcome.delivery.clone(),
        },
    }
}

/// Map engine failures onto HTTP responses
fn engine_error_response(request_id: &str, err: &EngineError) -> HttpResponse {
    match err {
        EngineError::Resolution { .. } => {
            tracing::info!("[{}] {}", request_id, err);
            HttpResponse::NotFound().json(ErrorResponse {
                error: "resolution_failed".to_string(),
                message: err.to_string(),
                status_code: 404,
            })
        }
        EngineError::CatalogUnavailable(_) => {
            tracing::error!("[{}] {}", request_id, err);
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: "catalog_unavailable".to_string(),
                message: err.to_string(),
                status_code: 503,
            })
        }
        EngineError::InvalidRequest(_) => HttpResponse::BadRequest().json(ErrorResponse {
            error: "invalid_request".to_string(),
            message: err.to_string(),
            status_code: 400,
        }),
    }
}
