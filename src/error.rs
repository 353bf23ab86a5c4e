//! Unified error handling.
//!
//! Three layers of failure exist in the crate:
//! - [`GeometryError`] for boundary documents that cannot be evaluated.
//!   Callers of [`crate::geometry::contains_point`] never see it; it is
//!   folded into "not contained".
//! - [`FilterError`] for client-side recomputation failures. The
//!   [`crate::filter::FilterEngine`] logs these and falls back to the
//!   unfiltered baseline.
//! - [`SeabedError`] for storage, integrity and lookup failures.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SeabedError>;

/// Reasons a GeoJSON boundary cannot be evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("invalid GeoJSON: {0}")]
    InvalidJson(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unsupported geometry type: {0}")]
    UnsupportedType(String),

    #[error("outer ring has {0} vertices, at least 3 required")]
    DegenerateRing(usize),

    #[error("invalid coordinate at vertex {0}")]
    InvalidCoordinate(usize),
}

/// Failures during client-side filter recomputation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("unknown contract type id: {0}")]
    UnknownContractType(i64),

    #[error("unknown contract status id: {0}")]
    UnknownContractStatus(i64),

    #[error("unknown location: {0}")]
    UnknownLocation(String),
}

/// Storage, integrity and lookup errors.
#[derive(Error, Debug)]
pub enum SeabedError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("integrity violation: {entity} {id} references missing {missing} {missing_id}")]
    Integrity {
        entity: &'static str,
        id: i64,
        missing: &'static str,
        missing_id: i64,
    },

    #[error("duplicate {entity} id {id}")]
    DuplicateId { entity: &'static str, id: i64 },

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "persistence")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Convert an absent lookup into [`SeabedError::NotFound`].
pub trait OptionExt<T> {
    fn ok_or_not_found(self, entity: &'static str, id: i64) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &'static str, id: i64) -> Result<T> {
        self.ok_or(SeabedError::NotFound { entity, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_error_display() {
        let err = GeometryError::UnsupportedType("Point".to_string());
        assert_eq!(err.to_string(), "unsupported geometry type: Point");

        let err = GeometryError::MissingField("coordinates");
        assert_eq!(err.to_string(), "missing field: coordinates");

        let err = GeometryError::DegenerateRing(2);
        assert_eq!(
            err.to_string(),
            "outer ring has 2 vertices, at least 3 required"
        );
    }

    #[test]
    fn test_seabed_error_display() {
        let err = SeabedError::NotFound {
            entity: "block",
            id: 42,
        };
        assert_eq!(err.to_string(), "block 42 not found");

        let err = SeabedError::Integrity {
            entity: "area",
            id: 3,
            missing: "contractor",
            missing_id: 9,
        };
        assert_eq!(
            err.to_string(),
            "integrity violation: area 3 references missing contractor 9"
        );
    }

    #[test]
    fn test_geometry_error_converts() {
        let err: SeabedError = GeometryError::MissingField("geometry").into();
        assert!(matches!(err, SeabedError::Geometry(_)));
        assert_eq!(err.to_string(), "missing field: geometry");
    }
}
