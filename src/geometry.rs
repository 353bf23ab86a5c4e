//! Geometry kernel: polygon containment and great-circle distance.
//!
//! Boundaries arrive as GeoJSON `Feature` strings whose geometry is a
//! `Polygon`. Only the outer ring (`coordinates[0]`) is consulted; holes and
//! additional rings are ignored. Containment uses the even-odd
//! (crossing-number) rule. Points exactly on an edge or vertex may land on
//! either side.

use geo::{BoundingRect, Coord, LineString, Rect};
use log::debug;
use serde_json::Value;

use crate::error::GeometryError;
use crate::geo_utils::haversine_km;
use crate::{Bounds, GeoPoint};

/// Parsed outer ring of a GeoJSON polygon, with its envelope.
///
/// Parse once and reuse when testing many points against the same boundary.
#[derive(Debug, Clone)]
pub struct BoundaryPolygon {
    ring: LineString<f64>,
    envelope: Rect<f64>,
}

impl BoundaryPolygon {
    /// Parse a GeoJSON Feature string.
    pub fn parse(feature: &str) -> Result<Self, GeometryError> {
        let doc: Value =
            serde_json::from_str(feature).map_err(|e| GeometryError::InvalidJson(e.to_string()))?;
        Self::from_feature(&doc)
    }

    /// Build from an already-decoded GeoJSON Feature.
    pub fn from_feature(doc: &Value) -> Result<Self, GeometryError> {
        let geometry = doc
            .get("geometry")
            .ok_or(GeometryError::MissingField("geometry"))?;
        let kind = geometry
            .get("type")
            .and_then(Value::as_str)
            .ok_or(GeometryError::MissingField("geometry.type"))?;
        if kind != "Polygon" {
            return Err(GeometryError::UnsupportedType(kind.to_string()));
        }

        let rings = geometry
            .get("coordinates")
            .and_then(Value::as_array)
            .ok_or(GeometryError::MissingField("geometry.coordinates"))?;
        let outer = rings
            .first()
            .and_then(Value::as_array)
            .ok_or(GeometryError::MissingField("geometry.coordinates[0]"))?;

        let mut coords = Vec::with_capacity(outer.len());
        for (i, vertex) in outer.iter().enumerate() {
            let pair = vertex
                .as_array()
                .filter(|pair| pair.len() >= 2)
                .ok_or(GeometryError::InvalidCoordinate(i))?;
            // GeoJSON order is [lon, lat]
            let lon = pair[0]
                .as_f64()
                .ok_or(GeometryError::InvalidCoordinate(i))?;
            let lat = pair[1]
                .as_f64()
                .ok_or(GeometryError::InvalidCoordinate(i))?;
            coords.push(Coord { x: lon, y: lat });
        }

        Self::from_coords(coords)
    }

    /// Build from `(lon, lat)` vertices of an outer ring.
    pub fn from_coords(coords: Vec<Coord<f64>>) -> Result<Self, GeometryError> {
        if coords.len() < 3 {
            return Err(GeometryError::DegenerateRing(coords.len()));
        }
        let ring = LineString::new(coords);
        let envelope = ring
            .bounding_rect()
            .ok_or(GeometryError::DegenerateRing(0))?;
        Ok(Self { ring, envelope })
    }

    /// Even-odd containment test against the outer ring.
    ///
    /// For each edge `(i, j = i - 1)`, wrapping at the start, the result
    /// toggles when the test latitude lies between the edge's latitudes and
    /// the point is west of where the edge crosses that latitude.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        if !self.envelope_contains(lat, lon) {
            // A closed ring is crossed an even number of times outside its envelope
            return false;
        }

        let pts = &self.ring.0;
        let mut inside = false;
        let mut j = pts.len() - 1;
        for i in 0..pts.len() {
            let (xi, yi) = (pts[i].x, pts[i].y);
            let (xj, yj) = (pts[j].x, pts[j].y);
            if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    fn envelope_contains(&self, lat: f64, lon: f64) -> bool {
        let min = self.envelope.min();
        let max = self.envelope.max();
        lat >= min.y && lat <= max.y && lon >= min.x && lon <= max.x
    }

    /// Envelope of the outer ring.
    pub fn bounds(&self) -> Bounds {
        let min = self.envelope.min();
        let max = self.envelope.max();
        Bounds::new(min.y, max.y, min.x, max.x)
    }

    /// Number of vertices in the outer ring (closing vertex included).
    pub fn vertex_count(&self) -> usize {
        self.ring.0.len()
    }
}

/// Containment test that reports why a boundary could not be evaluated.
pub fn try_contains_point(lat: f64, lon: f64, feature: &str) -> Result<bool, GeometryError> {
    BoundaryPolygon::parse(feature).map(|polygon| polygon.contains(lat, lon))
}

/// Fail-closed containment test.
///
/// Returns `false` for anything that is not a parseable Polygon feature.
pub fn contains_point(lat: f64, lon: f64, feature: &str) -> bool {
    match try_contains_point(lat, lon, feature) {
        Ok(inside) => inside,
        Err(e) => {
            debug!("[geometry] boundary not evaluated, treating as outside: {}", e);
            false
        }
    }
}

/// Haversine great-circle distance in kilometres (Earth radius 6371 km).
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_km(&GeoPoint::new(lat1, lon1), &GeoPoint::new(lat2, lon2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Vec<Coord<f64>> {
        vec![
            Coord { x: min, y: min },
            Coord { x: max, y: min },
            Coord { x: max, y: max },
            Coord { x: min, y: max },
            Coord { x: min, y: min },
        ]
    }

    #[test]
    fn test_from_coords_envelope() {
        let polygon = BoundaryPolygon::from_coords(square(-2.0, 3.0)).unwrap();
        let bounds = polygon.bounds();
        assert_eq!(bounds.min_lat, -2.0);
        assert_eq!(bounds.max_lng, 3.0);
        assert_eq!(polygon.vertex_count(), 5);
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        let coords = vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }];
        assert_eq!(
            BoundaryPolygon::from_coords(coords).unwrap_err(),
            GeometryError::DegenerateRing(2)
        );
    }

    #[test]
    fn test_concave_ring() {
        // U shape opening north: the notch between x=1 and x=2 is outside
        let coords = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 3.0, y: 0.0 },
            Coord { x: 3.0, y: 3.0 },
            Coord { x: 2.0, y: 3.0 },
            Coord { x: 2.0, y: 1.0 },
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 1.0, y: 3.0 },
            Coord { x: 0.0, y: 3.0 },
            Coord { x: 0.0, y: 0.0 },
        ];
        let polygon = BoundaryPolygon::from_coords(coords).unwrap();
        assert!(polygon.contains(0.5, 1.5));
        assert!(polygon.contains(2.0, 0.5));
        assert!(!polygon.contains(2.0, 1.5));
    }

    #[test]
    fn test_open_ring_wraps() {
        // Ring without the closing vertex still forms a closed polygon
        let coords = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 4.0, y: 0.0 },
            Coord { x: 4.0, y: 4.0 },
            Coord { x: 0.0, y: 4.0 },
        ];
        let polygon = BoundaryPolygon::from_coords(coords).unwrap();
        assert!(polygon.contains(2.0, 2.0));
        assert!(!polygon.contains(5.0, 2.0));
    }
}
