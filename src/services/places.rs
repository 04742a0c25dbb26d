use crate::core::distance::haversine_miles;
use crate::models::City;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling the places provider
#[derive(Debug, Error)]
pub enum GeocoderError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Rate limited by places provider")]
    RateLimited,

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// A populated place reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(rename = "postalCode", default)]
    pub postal_code: Option<String>,
}

impl Place {
    /// Transient city value; market code is resolved later
    pub fn to_city(&self) -> City {
        City {
            name: self.name.clone(),
            region: self.region.clone(),
            postal_code: self.postal_code.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            market_code: None,
            population: self.population,
            market_name: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    places: Vec<Place>,
}

/// External geocoding / places lookup, used only when the catalog is sparse
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    async fn places_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_miles: f64,
    ) -> Result<Vec<Place>, GeocoderError>;
}

/// HTTP places provider client
///
/// Issues `GET {endpoint}/places?lat=..&lon=..&radius_miles=..&category=city`
/// and expects `{"places": [...]}`.
pub struct HttpPlacesClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpPlacesClient {
    /// Create a new places client
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Result<Self, GeocoderError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl PlacesProvider for HttpPlacesClient {
    async fn places_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_miles: f64,
    ) -> Result<Vec<Place>, GeocoderError> {
        let url = format!(
            "{}/places?lat={}&lon={}&radius_miles={}&category={}",
            self.base_url.trim_end_matches('/'),
            latitude,
            longitude,
            radius_miles,
            urlencoding::encode("city")
        );

        tracing::debug!("Querying places provider: {}", url);

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(GeocoderError::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(GeocoderError::Unauthorized),
            status if !status.is_success() => {
                return Err(GeocoderError::ApiError(format!("Failed to query places: {}", status)));
            }
            _ => {}
        }

        let body: PlacesResponse = response
            .json()
            .await
            .map_err(|e| GeocoderError::InvalidResponse(e.to_string()))?;

        Ok(body.places)
    }
}

/// Fixed list of places, filtered by radius
///
/// Stands in for the real provider in offline setups and tests; counts calls.
#[derive(Debug, Default)]
pub struct StaticPlacesProvider {
    places: Vec<Place>,
    calls: AtomicUsize,
}

impl StaticPlacesProvider {
    pub fn new(places: Vec<Place>) -> Self {
        Self {
            places,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlacesProvider for StaticPlacesProvider {
    async fn places_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_miles: f64,
    ) -> Result<Vec<Place>, GeocoderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .places
            .iter()
            .filter(|p| haversine_miles(latitude, longitude, p.latitude, p.longitude) <= radius_miles)
            .cloned()
            .collect())
    }
}
