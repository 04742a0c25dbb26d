use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use lane_diversity::config::Settings;
use lane_diversity::core::{PairingEngine, ScoringTables};
use lane_diversity::models::ScoringWeights;
use lane_diversity::routes::{self, lanes::AppState};
use lane_diversity::services::{
    CacheManager, CityCatalog, HttpPlacesClient, InMemoryCatalog, PostgresCatalog, ReferenceIssuer,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, error};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, format!("Configuration error: {}", e))
    })?;

    // Initialize logging; RUST_LOG wins over LOG_LEVEL, which wins over [logging]
    let logging = settings
        .logging
        .overridden(std::env::var("LOG_LEVEL").ok(), std::env::var("LOG_FORMAT").ok());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }

    info!("Starting lane diversity pairing service...");
    info!("Configuration loaded successfully");

    // City catalog: seed file for local runs, PostgreSQL otherwise
    let catalog: Arc<dyn CityCatalog> = match (&settings.database.seed_file, &settings.database.url) {
        (Some(seed), _) => {
            let catalog = InMemoryCatalog::from_json_file(seed)
                .map_err(|e| startup_error("Failed to load city seed file", e))?;
            info!("In-memory city catalog loaded from {} ({} cities)", seed, catalog.len());
            Arc::new(catalog)
        }
        (None, Some(url)) => {
            let catalog = PostgresCatalog::from_settings(
                url,
                settings.database.max_connections,
                settings.database.min_connections,
                settings.database.acquire_timeout_secs,
                settings.database.idle_timeout_secs,
            )
            .await
            .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?;
            info!("PostgreSQL city catalog initialized");
            Arc::new(catalog)
        }
        (None, None) => {
            return Err(startup_error(
                "Configuration error",
                "set database.url (or DATABASE_URL) or database.seed_file",
            ));
        }
    };

    // Scoring tables with configured weights
    let weights = ScoringWeights::from(&settings.scoring.weights);
    let tables = match &settings.scoring.tables_file {
        Some(path) => ScoringTables::from_file(path)
            .map_err(|e| startup_error("Failed to load scoring tables", e))?,
        None => ScoringTables::default(),
    }
    .with_weights(weights);

    info!("Scoring tables v{} loaded with weights: {:?}", tables.version, weights);

    let mut engine = PairingEngine::new(catalog, Arc::new(tables), settings.to_engine_settings());

    // Places provider is optional; without it sparse areas simply yield fewer candidates
    match &settings.geocoder.endpoint {
        Some(endpoint) => {
            let client = HttpPlacesClient::new(
                endpoint.clone(),
                settings.geocoder.api_key.clone(),
                Duration::from_secs(settings.geocoder.timeout_secs),
            )
            .map_err(|e| startup_error("Failed to build places client", e))?;
            engine = engine.with_places(Arc::new(client));
            info!("Places provider enabled at {}", endpoint);
        }
        None => warn!("No places provider configured, catalog-only candidate discovery"),
    }

    // Base-location cache; a Redis outage degrades to L1 only
    let l1_size = settings.cache.l1_cache_size;
    let ttl = settings.cache.ttl_secs;
    let cache = match CacheManager::new(settings.cache.redis_url.as_deref(), l1_size, ttl).await {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to connect to Redis ({}), using in-memory cache only", e);
            CacheManager::in_memory(l1_size, ttl)
        }
    };
    info!(
        "Cache manager initialized (L1: {} entries, TTL: {}s, redis: {})",
        l1_size,
        ttl,
        cache.has_redis()
    );

    let references = ReferenceIssuer::new(settings.reference.prefix.clone(), settings.reference.start);

    let app_state = AppState {
        engine,
        cache: Arc::new(cache),
        references: Arc::new(references),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
