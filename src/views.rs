//! Result views served to the map UI.
//!
//! Every aggregation result has an explicit record type. Nested views are
//! plain owned trees (contractor → area → block, cruise → station → sample
//! → media) built from id-grouped bulk reads, so cloning a view is a deep
//! copy and no node refers back to its parent.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entities::{
    Area, Block, ContractStatus, ContractType, Contractor, ContractorId, Cruise, CruiseId, Media,
    Sample, Station,
};
use crate::GeoPoint;

// ============================================================================
// Filtered tree
// ============================================================================

/// Server-side filter for the nested map tree. Every field is optional;
/// an absent field means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapFilter {
    pub contractor_id: Option<ContractorId>,
    pub contract_type_id: Option<i64>,
    pub contract_status_id: Option<i64>,
    pub sponsoring_state: Option<String>,
    pub year: Option<i32>,
    pub cruise_id: Option<CruiseId>,
}

impl MapFilter {
    /// Conjunction of every contractor-level field that is set.
    pub fn matches_contractor(&self, contractor: &Contractor) -> bool {
        self.contractor_id.map_or(true, |id| contractor.id == id)
            && self
                .contract_type_id
                .map_or(true, |id| contractor.contract_type_id == id)
            && self
                .contract_status_id
                .map_or(true, |id| contractor.contract_status_id == id)
            && self
                .sponsoring_state
                .as_deref()
                .map_or(true, |state| contractor.sponsoring_state == state)
            && self
                .year
                .map_or(true, |year| contractor.contractual_year == year)
    }

    /// Stringified filter tuple used as the tree cache key.
    ///
    /// Unset fields are empty segments and set fields are `=value`; the
    /// sponsoring state is JSON-quoted so no value can pass for another.
    pub fn cache_key(&self) -> String {
        fn part<T: fmt::Display>(value: &Option<T>) -> String {
            value.as_ref().map_or_else(String::new, |v| format!("={}", v))
        }
        let state = self
            .sponsoring_state
            .as_deref()
            .map(serde_json::Value::from);
        format!(
            "tree:{}:{}:{}:{}:{}:{}",
            part(&self.contractor_id),
            part(&self.contract_type_id),
            part(&self.contract_status_id),
            part(&state),
            part(&self.year),
            part(&self.cruise_id),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaNode {
    #[serde(flatten)]
    pub area: Area,
    pub blocks: Vec<Block>,
}

/// Contractor with resolved reference names and its areas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorNode {
    #[serde(flatten)]
    pub contractor: Contractor,
    pub contract_type: String,
    pub contract_status: String,
    pub areas: Vec<AreaNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleNode {
    #[serde(flatten)]
    pub sample: Sample,
    pub media: Vec<Media>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationNode {
    #[serde(flatten)]
    pub station: Station,
    pub samples: Vec<SampleNode>,
}

/// Cruise with its stations. `center` falls back to the station centroid
/// when the cruise record has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CruiseNode {
    #[serde(flatten)]
    pub cruise: Cruise,
    pub center_point: Option<GeoPoint>,
    pub stations: Vec<StationNode>,
}

/// The nested map tree. Never null: an empty match is two empty lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDataView {
    pub contractors: Vec<ContractorNode>,
    pub cruises: Vec<CruiseNode>,
}

impl MapDataView {
    pub fn is_empty(&self) -> bool {
        self.contractors.is_empty() && self.cruises.is_empty()
    }

    pub fn contractor(&self, id: ContractorId) -> Option<&ContractorNode> {
        self.contractors.iter().find(|c| c.contractor.id == id)
    }

    pub fn cruise(&self, id: CruiseId) -> Option<&CruiseNode> {
        self.cruises.iter().find(|c| c.cruise.id == id)
    }

    pub fn contractor_ids(&self) -> Vec<ContractorId> {
        self.contractors.iter().map(|c| c.contractor.id).collect()
    }

    pub fn cruise_ids(&self) -> Vec<CruiseId> {
        self.cruises.iter().map(|c| c.cruise.id).collect()
    }

    pub fn station_count(&self) -> usize {
        self.cruises.iter().map(|c| c.stations.len()).sum()
    }
}

// ============================================================================
// Reference lookups
// ============================================================================

/// Slow-changing lookup lists for filter dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceLookups {
    pub contract_types: Vec<ContractType>,
    pub contract_statuses: Vec<ContractStatus>,
    /// Distinct, sorted
    pub sponsoring_states: Vec<String>,
    /// Distinct, sorted
    pub contractual_years: Vec<i32>,
}

impl ReferenceLookups {
    pub fn contract_type_name(&self, id: i64) -> Option<&str> {
        self.contract_types
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.name.as_str())
    }

    pub fn contract_status_name(&self, id: i64) -> Option<&str> {
        self.contract_statuses
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.name.as_str())
    }
}

// ============================================================================
// Analytics
// ============================================================================

/// avg/min/max/count over one measurement group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub category: String,
    /// Parameter name (environmental) or analysis (resource)
    pub name: String,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    /// Unit of the first measurement in the group
    pub unit: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthRange {
    /// Minimum lower depth
    pub min: Option<f64>,
    /// Maximum upper depth
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleTypeSummary {
    pub sample_type: String,
    pub count: usize,
    pub depth_range: DepthRange,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsCounts {
    pub stations: usize,
    pub samples: usize,
    pub env_results: usize,
    pub geo_results: usize,
}

/// Statistical rollup for one block. Sections are empty, never absent,
/// when the block has no associated data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAnalytics {
    pub block: Block,
    pub environmental_parameters: Vec<MetricSummary>,
    pub resource_metrics: Vec<MetricSummary>,
    pub sample_types: Vec<SampleTypeSummary>,
    /// Up to five stations, highest id first
    pub recent_stations: Vec<Station>,
    pub counts: AnalyticsCounts,
}

/// Rollup for one area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaSummary {
    pub area_id: i64,
    pub name: String,
    pub contractor_id: ContractorId,
    pub total_size_km2: f64,
    pub block_count: usize,
    pub blocks_size_km2: f64,
    pub block_status_counts: BTreeMap<String, usize>,
    pub station_count: usize,
    pub sample_count: usize,
}

/// Rollup for one contractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorSummary {
    pub contractor_id: ContractorId,
    pub name: String,
    pub contract_type: String,
    pub contract_status: String,
    pub area_count: usize,
    pub block_count: usize,
    pub total_area_km2: f64,
    pub block_status_counts: BTreeMap<String, usize>,
    pub cruise_count: usize,
    pub station_count: usize,
    pub sample_count: usize,
    pub first_cruise_start: Option<NaiveDate>,
    pub last_cruise_end: Option<NaiveDate>,
}
