//! # Seabed
//!
//! Spatial filtering and aggregation core for seabed exploration data.
//!
//! This library provides:
//! - A geometry kernel (GeoJSON polygon containment, haversine distance)
//! - Bulk association of sampling stations to licence blocks
//! - Filtered contractor/area/block and cruise/station/sample/media trees
//! - Block, area and contractor analytics rollups
//! - A tiered TTL cache in front of the aggregation read paths
//! - A client-side filter engine with pinned-selection invariants
//!
//! ## Features
//!
//! - **`persistence`** - SQLite-backed entity store
//! - **`synthetic`** - Deterministic synthetic datasets for benches and tests
//!
//! ## Quick Start
//!
//! ```rust
//! use seabed::geometry::{contains_point, distance_km};
//!
//! let feature = r#"{
//!     "type": "Feature",
//!     "geometry": {
//!         "type": "Polygon",
//!         "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]
//!     }
//! }"#;
//!
//! assert!(contains_point(0.5, 0.5, feature));
//! assert!(!contains_point(2.0, 2.0, feature));
//! assert_eq!(distance_km(10.0, 20.0, 10.0, 20.0), 0.0);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{FilterError, GeometryError, OptionExt, Result, SeabedError};

// Geographic utilities (bounds, centers)
pub mod geo_utils;

// Geometry kernel: polygon containment and great-circle distance
pub mod geometry;
pub use geometry::{contains_point, distance_km, try_contains_point, BoundaryPolygon};

// Entity records and the dataset snapshot format
pub mod entities;
pub use entities::{
    Area, AreaId, Block, BlockId, ContractStatus, ContractType, Contractor, ContractorId, Cruise,
    CruiseId, Dataset, EnvResult, GeoResult, Media, Sample, SampleId, Station, StationId,
};

// Tiered TTL cache
pub mod cache;
pub use cache::{CacheConfig, CacheStats, Clock, ExpiryPolicy, ManualClock, SystemClock, TierConfig, TtlCache};

// Storage, association and aggregation components
pub mod engine;
pub use engine::{
    AggregationStore, AssociationReport, AssociationService, BlockIndex, BlockLocator,
    EntitySource, InMemoryStore, SeabedEngine, StationWriter,
};

// Result views served to the map UI
pub mod views;
pub use views::{
    AreaNode, AreaSummary, BlockAnalytics, ContractorNode, ContractorSummary, CruiseNode,
    MapDataView, MapFilter, ReferenceLookups, StationNode,
};

// Client-side filter engine
pub mod filter;
pub use filter::{FilterEngine, FilterPredicates, Gazetteer, Location, PinnedSelection};

// SQLite entity store
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteEntityStore;

// Synthetic dataset generator
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use seabed::GeoPoint;
/// let point = GeoPoint::new(12.5, -128.0); // Clarion-Clipperton Zone
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from raw corner values.
    pub fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    /// Create bounds from points.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Inclusive containment test.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }

    /// Inclusive containment test for a point.
    pub fn contains_point(&self, point: &GeoPoint) -> bool {
        self.contains(point.latitude, point.longitude)
    }
}
