//! Tests for error module

use seabed::error::{FilterError, GeometryError, OptionExt, SeabedError};

#[test]
fn test_error_display() {
    let err = SeabedError::DuplicateId {
        entity: "station",
        id: 7,
    };
    assert_eq!(err.to_string(), "duplicate station id 7");

    let err = FilterError::UnknownLocation("atlantis".to_string());
    assert_eq!(err.to_string(), "unknown location: atlantis");

    let err = GeometryError::InvalidCoordinate(3);
    assert!(err.to_string().contains("vertex 3"));
}

#[test]
fn test_option_ext() {
    let none: Option<i32> = None;
    let result = none.ok_or_not_found("block", 42);
    assert!(matches!(
        result,
        Err(SeabedError::NotFound {
            entity: "block",
            id: 42
        })
    ));

    assert_eq!(Some(5).ok_or_not_found("block", 42).unwrap(), 5);
}

#[test]
fn test_json_error_converts() {
    let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
    let err: SeabedError = parse.unwrap_err().into();
    assert!(matches!(err, SeabedError::Json(_)));
}
