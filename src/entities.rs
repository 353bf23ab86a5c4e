//! Entity records for seabed exploration data.
//!
//! The hierarchy is a strict forest: Contractor → Area → Block and
//! Contractor → Cruise → Station → Sample → {EnvResult, GeoResult, Media}.
//! Records only carry the id of their parent; navigation happens through
//! id-indexed lookups, never through object references.

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::GeoPoint;

pub type ContractorId = i64;
pub type AreaId = i64;
pub type BlockId = i64;
pub type CruiseId = i64;
pub type StationId = i64;
pub type SampleId = i64;

/// Contract type reference entry (e.g. "Exploration", "Exploitation").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractType {
    pub id: i64,
    pub name: String,
}

/// Contract status reference entry (e.g. "Active", "Pending").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractStatus {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contractor {
    pub id: ContractorId,
    pub name: String,
    pub contract_type_id: i64,
    pub contract_status_id: i64,
    pub sponsoring_state: String,
    pub contractual_year: i32,
    #[serde(default)]
    pub contract_number: String,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Licence area. `boundary` is a GeoJSON Feature string, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: AreaId,
    pub contractor_id: ContractorId,
    pub name: String,
    #[serde(default)]
    pub boundary: String,
    #[serde(default)]
    pub center: Option<GeoPoint>,
    #[serde(default)]
    pub total_size_km2: f64,
}

/// Administrative block inside an area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,
    pub area_id: AreaId,
    pub name: String,
    /// Free-text category such as active, pending, inactive or reserved
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub boundary: String,
    #[serde(default)]
    pub center: Option<GeoPoint>,
    #[serde(default)]
    pub size_km2: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub resource_density: Option<f64>,
    #[serde(default)]
    pub economic_value: Option<f64>,
}

impl Block {
    pub fn has_boundary(&self) -> bool {
        !self.boundary.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cruise {
    pub id: CruiseId,
    pub contractor_id: ContractorId,
    pub name: String,
    #[serde(default)]
    pub vessel: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub center: Option<GeoPoint>,
}

/// Sampling station. `block_id` is written only by the association pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: StationId,
    pub cruise_id: CruiseId,
    pub code: String,
    #[serde(rename = "type", default)]
    pub station_type: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub block_id: Option<BlockId>,
}

impl Station {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub id: SampleId,
    pub station_id: StationId,
    pub code: String,
    #[serde(default)]
    pub sample_type: String,
    #[serde(default)]
    pub matrix_type: String,
    #[serde(default)]
    pub habitat_type: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub depth_upper: Option<f64>,
    #[serde(default)]
    pub depth_lower: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Environmental measurement on a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvResult {
    pub id: i64,
    pub sample_id: SampleId,
    pub category: String,
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Geological or resource measurement on a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoResult {
    pub id: i64,
    pub sample_id: SampleId,
    pub category: String,
    pub analysis: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub qualifier: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: i64,
    pub sample_id: SampleId,
    pub file_name: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub camera_specs: Option<String>,
    #[serde(default)]
    pub capture_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Complete snapshot of every collection, in storage order.
///
/// This is the import/seed format for the stores and the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dataset {
    pub contract_types: Vec<ContractType>,
    pub contract_statuses: Vec<ContractStatus>,
    pub contractors: Vec<Contractor>,
    pub areas: Vec<Area>,
    pub blocks: Vec<Block>,
    pub cruises: Vec<Cruise>,
    pub stations: Vec<Station>,
    pub samples: Vec<Sample>,
    pub env_results: Vec<EnvResult>,
    pub geo_results: Vec<GeoResult>,
    pub media: Vec<Media>,
}

impl Dataset {
    /// Load a dataset from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the dataset as pretty-printed JSON.
    pub fn write_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
