use geo::{HaversineDistance, Point};
use crate::models::BoundingBox;

/// Meters in one statute mile
const METERS_PER_MILE: f64 = 1609.344;

/// Approximate miles per degree of latitude
const MILES_PER_DEGREE: f64 = 69.0;

/// Smallest cosine used for the longitude correction, keeps polar boxes finite
const MIN_COS_LATITUDE: f64 = 0.01;

/// Calculate the Haversine distance between two points in miles
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in statute miles. NaN input yields NaN; callers filter with `is_finite`.
#[inline]
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let from = Point::new(lon1, lat1);
    let to = Point::new(lon2, lat2);
    from.haversine_distance(&to) / METERS_PER_MILE
}

/// Calculate a bounding box around a center point
///
/// This is a coarse catalog pre-filter; the corners over-include, so the
/// exact distance is always rechecked after the fetch.
/// 1° latitude ≈ 69mi, 1° longitude ≈ 69mi * cos(latitude)
pub fn calculate_bounding_box(lat: f64, lon: f64, radius_miles: f64) -> BoundingBox {
    let lat_delta = radius_miles / MILES_PER_DEGREE;

    let cos_lat = lat.to_radians().cos().abs().max(MIN_COS_LATITUDE);
    let lon_delta = radius_miles / (MILES_PER_DEGREE * cos_lat);

    BoundingBox {
        min_lat: lat - lat_delta,
        max_lat: lat + lat_delta,
        min_lon: lon - lon_delta,
        max_lon: lon + lon_delta,
    }
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(lat: f64, lon: f64, bbox: &BoundingBox) -> bool {
    lat >= bbox.min_lat
        && lat <= bbox.max_lat
        && lon >= bbox.min_lon
        && lon <= bbox.max_lon
}
