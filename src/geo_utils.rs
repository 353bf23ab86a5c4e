//! Geographic helpers shared by the geometry kernel and the aggregation views.

use crate::{Bounds, GeoPoint};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres per degree of latitude (approximately constant).
const KM_PER_DEG_LAT: f64 = 111.32;

/// Haversine great-circle distance between two points in kilometres.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Bounding box of a point set. Empty input yields a zero box at the origin.
pub fn compute_bounds(points: &[GeoPoint]) -> Bounds {
    Bounds::from_points(points).unwrap_or(Bounds::new(0.0, 0.0, 0.0, 0.0))
}

/// Arithmetic centroid of a point set. Empty input yields the origin.
pub fn compute_center(points: &[GeoPoint]) -> GeoPoint {
    if points.is_empty() {
        return GeoPoint::new(0.0, 0.0);
    }
    let n = points.len() as f64;
    let lat = points.iter().map(|p| p.latitude).sum::<f64>() / n;
    let lng = points.iter().map(|p| p.longitude).sum::<f64>() / n;
    GeoPoint::new(lat, lng)
}

/// Convert a distance in kilometres to degrees of longitude at a latitude.
///
/// Used to widen a search box before the exact haversine check, so this
/// deliberately errs on the large side near the poles.
pub fn km_to_degrees(km: f64, latitude: f64) -> f64 {
    let cos_lat = latitude.to_radians().cos().abs().max(0.01);
    km / (KM_PER_DEG_LAT * cos_lat)
}

/// Search box around a point that contains every point within `radius_km`.
pub fn bounds_around(center: &GeoPoint, radius_km: f64) -> Bounds {
    let dlat = radius_km / KM_PER_DEG_LAT;
    let dlng = km_to_degrees(radius_km, center.latitude);
    Bounds::new(
        center.latitude - dlat,
        center.latitude + dlat,
        center.longitude - dlng,
        center.longitude + dlng,
    )
}

/// Search boxes in [-180, 180] longitude covering every point within
/// `radius_km`. A box crossing the antimeridian is split in two; one that
/// reaches a pole spans every longitude.
pub fn search_bounds(center: &GeoPoint, radius_km: f64) -> Vec<Bounds> {
    let b = bounds_around(center, radius_km);
    let min_lat = b.min_lat.max(-90.0);
    let max_lat = b.max_lat.min(90.0);

    if b.min_lat <= -90.0 || b.max_lat >= 90.0 || b.max_lng - b.min_lng >= 360.0 {
        return vec![Bounds::new(min_lat, max_lat, -180.0, 180.0)];
    }
    if b.min_lng < -180.0 {
        vec![
            Bounds::new(min_lat, max_lat, -180.0, b.max_lng),
            Bounds::new(min_lat, max_lat, b.min_lng + 360.0, 180.0),
        ]
    } else if b.max_lng > 180.0 {
        vec![
            Bounds::new(min_lat, max_lat, b.min_lng, 180.0),
            Bounds::new(min_lat, max_lat, -180.0, b.max_lng - 360.0),
        ]
    } else {
        vec![Bounds::new(min_lat, max_lat, b.min_lng, b.max_lng)]
    }
}
