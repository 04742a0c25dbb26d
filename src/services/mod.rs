// Service exports
pub mod cache;
pub mod catalog;
pub mod places;
pub mod sequence;

pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use catalog::{with_timeout, CatalogError, CatalogQuery, CityCatalog, InMemoryCatalog, PostgresCatalog};
pub use places::{GeocoderError, HttpPlacesClient, Place, PlacesProvider, StaticPlacesProvider};
pub use sequence::ReferenceIssuer;
