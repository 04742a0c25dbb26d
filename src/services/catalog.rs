use crate::core::distance::is_within_bounding_box;
use crate::models::{BoundingBox, City, CityKey};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when querying the city catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Catalog query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid catalog data: {0}")]
    InvalidData(String),
}

/// Bounding-box query against the catalog
#[derive(Debug, Clone)]
pub struct CatalogQuery {
    pub bounding_box: BoundingBox,
    /// Only rows with a non-blank market code
    pub require_market: bool,
    /// Skip rows carrying this market code
    pub exclude_market: Option<String>,
    pub limit: Option<usize>,
}

impl CatalogQuery {
    pub fn new(bounding_box: BoundingBox) -> Self {
        Self {
            bounding_box,
            require_market: true,
            exclude_market: None,
            limit: None,
        }
    }
}

/// Read-only city catalog
///
/// Results of `cities_in_box` are ordered by population, largest first.
#[async_trait]
pub trait CityCatalog: Send + Sync {
    /// Exact name + region lookup
    async fn find_city(&self, name: &str, region: &str) -> Result<Option<City>, CatalogError>;

    async fn cities_in_box(&self, query: &CatalogQuery) -> Result<Vec<City>, CatalogError>;

    async fn health_check(&self) -> Result<bool, CatalogError> {
        Ok(true)
    }
}

/// Run a catalog call under a deadline; elapsed deadlines become `CatalogError::Timeout`
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, CatalogError>
where
    F: Future<Output = Result<T, CatalogError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| CatalogError::Timeout(limit))?
}

/// PostgreSQL-backed catalog over a `cities` table
///
/// Expected columns: name, region, postal_code, latitude, longitude,
/// market_code, population, market_name.
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Create a new catalog client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a new catalog client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, CatalogError> {
        tracing::info!("Connecting to city catalog database");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    fn row_to_city(row: &PgRow) -> Result<City, CatalogError> {
        let population: Option<i64> = row.try_get("population")?;
        let population = match population {
            Some(p) if p < 0 => {
                return Err(CatalogError::InvalidData(format!("negative population {}", p)));
            }
            Some(p) => Some(p as u64),
            None => None,
        };

        Ok(City {
            name: row.try_get("name")?,
            region: row.try_get("region")?,
            postal_code: row.try_get("postal_code")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            market_code: row.try_get("market_code")?,
            population,
            market_name: row.try_get("market_name")?,
        })
    }
}

#[async_trait]
impl CityCatalog for PostgresCatalog {
    async fn find_city(&self, name: &str, region: &str) -> Result<Option<City>, CatalogError> {
        let query = r#"
            SELECT name, region, postal_code, latitude, longitude,
                   market_code, population, market_name
            FROM cities
            WHERE LOWER(TRIM(name)) = LOWER(TRIM($1))
              AND UPPER(TRIM(region)) = UPPER(TRIM($2))
              AND latitude IS NOT NULL
              AND longitude IS NOT NULL
            ORDER BY (market_code IS NULL OR market_code = '') ASC,
                     population DESC NULLS LAST
            LIMIT 1
        "#;

        let row = sqlx::query(query)
            .bind(name)
            .bind(region)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_city).transpose()
    }

    async fn cities_in_box(&self, query: &CatalogQuery) -> Result<Vec<City>, CatalogError> {
        let sql = r#"
            SELECT name, region, postal_code, latitude, longitude,
                   market_code, population, market_name
            FROM cities
            WHERE latitude BETWEEN $1 AND $2
              AND longitude BETWEEN $3 AND $4
              AND ($5 = FALSE OR (market_code IS NOT NULL AND market_code <> ''))
              AND ($6::TEXT IS NULL OR market_code IS DISTINCT FROM $6)
            ORDER BY population DESC NULLS LAST, name ASC, region ASC
            LIMIT $7
        "#;

        let bbox = &query.bounding_box;
        let limit = query.limit.map(|l| l as i64).unwrap_or(i64::MAX);

        let rows = sqlx::query(sql)
            .bind(bbox.min_lat)
            .bind(bbox.max_lat)
            .bind(bbox.min_lon)
            .bind(bbox.max_lon)
            .bind(query.require_market)
            .bind(query.exclude_market.as_deref())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Catalog returned {} rows for {:?}", rows.len(), bbox);

        rows.iter().map(Self::row_to_city).collect()
    }

    async fn health_check(&self) -> Result<bool, CatalogError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

/// Catalog held in memory, loaded once per process
///
/// Used for seed files, local development and tests. The data is immutable
/// after construction; reload by building a new instance.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    cities: Vec<City>,
}

impl InMemoryCatalog {
    pub fn new(cities: Vec<City>) -> Self {
        Self { cities }
    }

    /// Load a JSON array of cities
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CatalogError::InvalidData(format!("{}: {}", path.as_ref().display(), e)))?;
        let cities: Vec<City> = serde_json::from_str(&raw)
            .map_err(|e| CatalogError::InvalidData(e.to_string()))?;
        Ok(Self::new(cities))
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

#[async_trait]
impl CityCatalog for InMemoryCatalog {
    async fn find_city(&self, name: &str, region: &str) -> Result<Option<City>, CatalogError> {
        let key = CityKey::new(name, region);

        let best = self
            .cities
            .iter()
            .filter(|c| c.has_coordinates() && c.key() == key)
            .max_by(|a, b| {
                a.market()
                    .is_some()
                    .cmp(&b.market().is_some())
                    .then_with(|| a.population.unwrap_or(0).cmp(&b.population.unwrap_or(0)))
            });

        Ok(best.cloned())
    }

    async fn cities_in_box(&self, query: &CatalogQuery) -> Result<Vec<City>, CatalogError> {
        let mut rows: Vec<City> = self
            .cities
            .iter()
            .filter(|c| is_within_bounding_box(c.latitude, c.longitude, &query.bounding_box))
            .filter(|c| !query.require_market || c.market().is_some())
            .filter(|c| match (&query.exclude_market, c.market()) {
                (Some(excluded), Some(market)) => excluded != market,
                _ => true,
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            b.population
                .unwrap_or(0)
                .cmp(&a.population.unwrap_or(0))
                .then_with(|| a.key().cmp(&b.key()))
        });

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }
}
