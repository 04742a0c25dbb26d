use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use crate::core::candidates::SourceSettings;
use crate::core::engine::EngineSettings;
use crate::core::selector::{DEFAULT_BANDS, DEFAULT_CEILINGS};
use crate::models::{Band, ScoringWeights, ShortfallPolicy};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub geocoder: GeocoderSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub pairing: PairingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub reference: ReferenceSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// City catalog connection
///
/// When `seed_file` is set the catalog is loaded from that JSON file into
/// memory and `url` is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub seed_file: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

/// Fallback places provider
#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderSettings {
    /// No endpoint disables the fallback
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_geocoder_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_geocoder_timeout(),
        }
    }
}

fn default_geocoder_timeout() -> u64 { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_l1_size")]
    pub l1_cache_size: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: default_ttl(),
            l1_cache_size: default_l1_size(),
        }
    }
}

fn default_ttl() -> u64 { 3600 }
fn default_l1_size() -> u64 { 10_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct PairingSettings {
    #[serde(default = "default_required_pairs")]
    pub default_required_pairs: usize,
    #[serde(default)]
    pub default_policy: ShortfallPolicy,
    #[serde(default = "default_bands")]
    pub bands: Vec<Band>,
    #[serde(default = "default_ceilings")]
    pub radius_ceilings: Vec<f64>,
    #[serde(default = "default_sparse_threshold")]
    pub sparse_threshold: usize,
    #[serde(default = "default_reference_radius")]
    pub reference_radius_miles: f64,
    #[serde(default = "default_catalog_timeout")]
    pub catalog_timeout_secs: u64,
    pub catalog_limit: Option<usize>,
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self {
            default_required_pairs: default_required_pairs(),
            default_policy: ShortfallPolicy::default(),
            bands: default_bands(),
            radius_ceilings: default_ceilings(),
            sparse_threshold: default_sparse_threshold(),
            reference_radius_miles: default_reference_radius(),
            catalog_timeout_secs: default_catalog_timeout(),
            catalog_limit: None,
        }
    }
}

fn default_required_pairs() -> usize { 6 }
fn default_bands() -> Vec<Band> { DEFAULT_BANDS.to_vec() }
fn default_ceilings() -> Vec<f64> { DEFAULT_CEILINGS.to_vec() }
fn default_sparse_threshold() -> usize { 10 }
fn default_reference_radius() -> f64 { 100.0 }
fn default_catalog_timeout() -> u64 { 10 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    /// JSON scoring tables; built-in tables when absent
    pub tables_file: Option<String>,
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_distance_weight")]
    pub distance: f64,
    #[serde(default = "default_equipment_keyword_weight")]
    pub equipment_keyword: f64,
    #[serde(default = "default_equipment_region_weight")]
    pub equipment_region: f64,
    #[serde(default = "default_cross_market_weight")]
    pub cross_market: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            distance: default_distance_weight(),
            equipment_keyword: default_equipment_keyword_weight(),
            equipment_region: default_equipment_region_weight(),
            cross_market: default_cross_market_weight(),
        }
    }
}

impl From<&WeightsConfig> for ScoringWeights {
    fn from(config: &WeightsConfig) -> Self {
        Self {
            distance: config.distance,
            equipment_keyword: config.equipment_keyword,
            equipment_region: config.equipment_region,
            cross_market: config.cross_market,
        }
    }
}

fn default_distance_weight() -> f64 { 1.0 }
fn default_equipment_keyword_weight() -> f64 { 0.25 }
fn default_equipment_region_weight() -> f64 { 0.15 }
fn default_cross_market_weight() -> f64 { 0.10 }

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceSettings {
    #[serde(default = "default_reference_prefix")]
    pub prefix: String,
    #[serde(default = "default_reference_start")]
    pub start: u64,
}

impl Default for ReferenceSettings {
    fn default() -> Self {
        Self {
            prefix: default_reference_prefix(),
            start: default_reference_start(),
        }
    }
}

fn default_reference_prefix() -> String { "LD".to_string() }
fn default_reference_start() -> u64 { 1 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingSettings {
    /// Apply `LOG_LEVEL` / `LOG_FORMAT` style overrides on top of the file values
    pub fn overridden(&self, level: Option<String>, format: Option<String>) -> Self {
        Self {
            level: level.unwrap_or_else(|| self.level.clone()),
            format: format.unwrap_or_else(|| self.format.clone()),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration files (config/default, config/local)
    /// 3. Environment variables (prefixed with LANE__)
    /// 4. DATABASE_URL and PLACES_API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., LANE__SERVER__PORT -> server.port
            .add_source(env_source())
            .build()?;

        apply_env_overrides(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        apply_env_overrides(settings)?.try_deserialize()
    }

    /// Engine tuning derived from the pairing and geocoder sections
    pub fn to_engine_settings(&self) -> EngineSettings {
        let pairing = &self.pairing;
        EngineSettings {
            bands: pairing.bands.clone(),
            radius_ceilings: pairing.radius_ceilings.clone(),
            default_required_pairs: pairing.default_required_pairs.max(1),
            default_policy: pairing.default_policy,
            source: SourceSettings {
                sparse_threshold: pairing.sparse_threshold,
                reference_radius_miles: pairing.reference_radius_miles,
                catalog_timeout: Duration::from_secs(pairing.catalog_timeout_secs),
                places_timeout: Duration::from_secs(self.geocoder.timeout_secs),
                catalog_limit: pairing.catalog_limit,
            },
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("LANE")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Well-known variables that override their config keys
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", url)?;
    }
    if let Ok(key) = env::var("PLACES_API_KEY") {
        builder = builder.set_override("geocoder.api_key", key)?;
    }

    builder.build()
}
