//! Shared fixture for integration tests.
//!
//! Three contractors with blocks in three ocean regions:
//!
//! | Contractor | Type / status          | State  | Year | Area (center)          |
//! |------------|------------------------|--------|------|------------------------|
//! | 1          | Exploration / Active   | France | 2001 | 10 at (12, -130)       |
//! | 2          | Exploration / Pending  | Japan  | 2006 | 20, no center          |
//! | 3          | Exploitation / Active  | France | 2012 | 30 at (35, -40)        |
//!
//! Blocks 101 and 103 overlap around (11.5, -130.5); 101 comes first.
//! Block 202 has no boundary and block 203 an unparseable one.

#![allow(dead_code)]

use chrono::NaiveDate;
use seabed::{
    Area, Block, ContractStatus, ContractType, Contractor, Cruise, Dataset, EnvResult, GeoPoint,
    GeoResult, Media, Sample, Station,
};

pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Closed square ring as a GeoJSON Feature, (lon, lat) order.
pub fn square_feature(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> String {
    format!(
        r#"{{"type":"Feature","properties":{{}},"geometry":{{"type":"Polygon","coordinates":[[[{min_lng},{min_lat}],[{max_lng},{min_lat}],[{max_lng},{max_lat}],[{min_lng},{max_lat}],[{min_lng},{min_lat}]]]}}}}"#
    )
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn contractor(id: i64, name: &str, type_id: i64, status_id: i64, state: &str, year: i32) -> Contractor {
    Contractor {
        id,
        name: name.to_string(),
        contract_type_id: type_id,
        contract_status_id: status_id,
        sponsoring_state: state.to_string(),
        contractual_year: year,
        contract_number: format!("C-{}", id),
        remarks: None,
    }
}

fn block(id: i64, area_id: i64, status: &str, boundary: String, center: Option<GeoPoint>) -> Block {
    Block {
        id,
        area_id,
        name: format!("Block {}", id),
        status: status.to_string(),
        boundary,
        center,
        size_km2: 1000.0,
        category: "exploration".to_string(),
        resource_density: None,
        economic_value: None,
    }
}

fn cruise(
    id: i64,
    contractor_id: i64,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    center: Option<GeoPoint>,
) -> Cruise {
    Cruise {
        id,
        contractor_id,
        name: format!("Cruise {}", id),
        vessel: "RV Test".to_string(),
        start_date: start,
        end_date: end,
        center,
    }
}

fn station(id: i64, cruise_id: i64, latitude: f64, longitude: f64, block_id: Option<i64>) -> Station {
    Station {
        id,
        cruise_id,
        code: format!("ST-{}", id),
        station_type: "Box core".to_string(),
        latitude,
        longitude,
        block_id,
    }
}

fn sample(id: i64, station_id: i64, sample_type: &str, upper: Option<f64>, lower: Option<f64>) -> Sample {
    Sample {
        id,
        station_id,
        code: format!("SA-{}", id),
        sample_type: sample_type.to_string(),
        matrix_type: "Sediment".to_string(),
        habitat_type: "Abyssal plain".to_string(),
        device: "Corer".to_string(),
        depth_upper: upper,
        depth_lower: lower,
        description: None,
        analysis: None,
        result: None,
        unit: None,
    }
}

fn env(id: i64, sample_id: i64, category: &str, name: &str, value: f64, unit: &str) -> EnvResult {
    EnvResult {
        id,
        sample_id,
        category: category.to_string(),
        name: name.to_string(),
        value,
        unit: unit.to_string(),
        remarks: None,
    }
}

fn geo(id: i64, sample_id: i64, category: &str, analysis: &str, value: f64, unit: &str) -> GeoResult {
    GeoResult {
        id,
        sample_id,
        category: category.to_string(),
        analysis: analysis.to_string(),
        value,
        unit: unit.to_string(),
        qualifier: None,
        remarks: None,
    }
}

fn media(id: i64, sample_id: i64, file_name: &str) -> Media {
    Media {
        id,
        sample_id,
        file_name: file_name.to_string(),
        media_type: "photo".to_string(),
        camera_specs: None,
        capture_date: None,
        remarks: None,
    }
}

pub fn fixture_dataset() -> Dataset {
    Dataset {
        contract_types: vec![
            ContractType {
                id: 1,
                name: "Exploration".to_string(),
            },
            ContractType {
                id: 2,
                name: "Exploitation".to_string(),
            },
        ],
        contract_statuses: vec![
            ContractStatus {
                id: 1,
                name: "Active".to_string(),
            },
            ContractStatus {
                id: 2,
                name: "Pending".to_string(),
            },
        ],
        contractors: vec![
            contractor(1, "Alpha Minerals", 1, 1, "France", 2001),
            contractor(2, "Beta Ocean", 1, 2, "Japan", 2006),
            contractor(3, "Gamma Deep", 2, 1, "France", 2012),
        ],
        areas: vec![
            Area {
                id: 10,
                contractor_id: 1,
                name: "Area 10".to_string(),
                boundary: square_feature(10.0, 13.0, -132.0, -128.0),
                center: Some(GeoPoint::new(12.0, -130.0)),
                total_size_km2: 5000.0,
            },
            Area {
                id: 20,
                contractor_id: 2,
                name: "Area 20".to_string(),
                boundary: String::new(),
                center: None,
                total_size_km2: 3000.0,
            },
            Area {
                id: 30,
                contractor_id: 3,
                name: "Area 30".to_string(),
                boundary: String::new(),
                center: Some(GeoPoint::new(35.0, -40.0)),
                total_size_km2: 2000.0,
            },
        ],
        blocks: vec![
            block(101, 10, "active", square_feature(10.0, 12.0, -132.0, -130.0), Some(GeoPoint::new(11.0, -131.0))),
            block(102, 10, "Pending", square_feature(10.0, 12.0, -130.0, -128.0), Some(GeoPoint::new(11.0, -129.0))),
            block(103, 10, "active", square_feature(11.0, 13.0, -131.0, -129.0), None),
            block(201, 20, "active", square_feature(-11.0, -9.0, 74.0, 76.0), Some(GeoPoint::new(-10.0, 75.0))),
            block(202, 20, "reserved", String::new(), None),
            block(203, 20, "inactive", "{not json".to_string(), None),
            block(301, 30, "active", square_feature(34.0, 36.0, -41.0, -39.0), None),
        ],
        cruises: vec![
            cruise(1000, 1, date(2015, 3, 1), date(2015, 4, 10), None),
            cruise(1001, 1, date(2019, 6, 1), date(2019, 7, 1), None),
            cruise(1002, 1, date(2021, 1, 10), date(2021, 2, 20), Some(GeoPoint::new(-30.0, 50.0))),
            cruise(2000, 2, date(2018, 5, 1), date(2018, 6, 1), None),
            cruise(3000, 3, None, None, Some(GeoPoint::new(35.0, -40.0))),
        ],
        stations: vec![
            station(1, 1000, 11.0, -131.0, None),
            station(2, 1000, 11.0, -129.0, None),
            station(3, 1000, 11.5, -130.5, None),
            station(4, 1000, 0.0, 0.0, None),
            station(5, 2000, -10.0, 75.0, None),
            station(6, 2000, -10.5, 74.5, Some(201)),
            station(7, 1001, 12.5, -129.5, None),
        ],
        samples: vec![
            sample(11, 1, "Box core", Some(0.0), Some(0.1)),
            sample(12, 1, "Multicore", Some(0.0), Some(0.3)),
            sample(13, 3, "Box core", Some(0.05), Some(0.2)),
            sample(51, 5, "Grab", None, None),
        ],
        env_results: vec![
            env(1, 11, "Physical", "Temperature", 2.0, "°C"),
            env(2, 13, "Physical", "Temperature", 4.0, "degC"),
            env(3, 12, "Chemical", "Oxygen", 150.0, "µmol/kg"),
            env(4, 51, "Physical", "Temperature", 1.5, "°C"),
        ],
        geo_results: vec![
            geo(1, 11, "Metals", "Nickel", 1.2, "wt%"),
            geo(2, 12, "Metals", "Nickel", 1.4, "wt%"),
            geo(3, 13, "Nodules", "Abundance", 10.0, "kg/m2"),
        ],
        media: vec![media(1, 11, "core11.jpg"), media(2, 51, "grab51.jpg")],
    }
}
