//! Synthetic exploration dataset generator for stress testing and benchmarking.
//!
//! Generates contractors with areas tiled by square GeoJSON blocks, cruises
//! whose stations fall partly inside those blocks, and samples with
//! measurements and media. The expected block of every station is recorded
//! as ground truth for association.
//!
//! Feature-gated behind `synthetic`, not included in production builds.
//!
//! # Example
//!
//! ```rust
//! use seabed::synthetic::SyntheticScenario;
//!
//! let scenario = SyntheticScenario {
//!     contractor_count: 2,
//!     stations_per_cruise: 10,
//!     ..SyntheticScenario::small()
//! };
//!
//! let synthetic = scenario.generate();
//! assert_eq!(synthetic.dataset.contractors.len(), 2);
//! assert_eq!(synthetic.expected_blocks.len(), synthetic.dataset.stations.len());
//! ```

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::entities::{
    Area, Block, BlockId, ContractStatus, ContractType, Contractor, Cruise, Dataset, EnvResult,
    GeoResult, Media, Sample, Station, StationId,
};
use crate::geo_utils::km_to_degrees;
use crate::GeoPoint;

// ============================================================================
// Types
// ============================================================================

/// Dataset plus association ground truth.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub dataset: Dataset,
    /// Block each station lies in, `None` for stations outside every block.
    pub expected_blocks: HashMap<StationId, Option<BlockId>>,
}

/// Generator parameters.
#[derive(Debug, Clone)]
pub struct SyntheticScenario {
    /// South-west corner of the first area.
    pub origin: GeoPoint,
    pub contractor_count: usize,
    pub areas_per_contractor: usize,
    /// Each area is a `blocks_per_side` x `blocks_per_side` grid.
    pub blocks_per_side: usize,
    /// Block edge length in degrees.
    pub block_size_deg: f64,
    pub cruises_per_contractor: usize,
    pub stations_per_cruise: usize,
    /// Fraction of stations placed inside a block (0.0-1.0).
    pub inside_fraction: f64,
    pub samples_per_station: usize,
    /// Random seed for reproducibility.
    pub seed: u64,
}

const SPONSORING_STATES: [&str; 6] = ["Belgium", "China", "France", "Germany", "India", "Japan"];
const BLOCK_STATUSES: [&str; 4] = ["active", "pending", "inactive", "reserved"];
const SAMPLE_TYPES: [&str; 4] = ["Box core", "Multicore", "Grab", "Dredge"];
const ENV_PARAMETERS: [(&str, &str, &str); 3] = [
    ("Physical", "Temperature", "°C"),
    ("Physical", "Salinity", "PSU"),
    ("Chemical", "Dissolved oxygen", "mg/L"),
];
const RESOURCE_ANALYSES: [(&str, &str, &str); 3] = [
    ("Metals", "Nickel", "wt%"),
    ("Metals", "Cobalt", "wt%"),
    ("Nodules", "Abundance", "kg/m2"),
];

/// GeoJSON Feature for an axis-aligned square, closed, in (lon, lat) order.
pub fn square_feature(min_lat: f64, min_lng: f64, size_deg: f64) -> String {
    let (max_lat, max_lng) = (min_lat + size_deg, min_lng + size_deg);
    format!(
        r#"{{"type":"Feature","properties":{{}},"geometry":{{"type":"Polygon","coordinates":[[[{min_lng},{min_lat}],[{max_lng},{min_lat}],[{max_lng},{max_lat}],[{min_lng},{max_lat}],[{min_lng},{min_lat}]]]}}}}"#
    )
}

// ============================================================================
// Generation
// ============================================================================

impl SyntheticScenario {
    /// Generate the dataset.
    pub fn generate(&self) -> SyntheticDataset {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut data = Dataset {
            contract_types: vec![
                ContractType {
                    id: 1,
                    name: "Exploration".into(),
                },
                ContractType {
                    id: 2,
                    name: "Exploitation".into(),
                },
            ],
            contract_statuses: vec![
                ContractStatus {
                    id: 1,
                    name: "Active".into(),
                },
                ContractStatus {
                    id: 2,
                    name: "Pending".into(),
                },
            ],
            ..Default::default()
        };

        let area_width = self.blocks_per_side as f64 * self.block_size_deg;
        let area_gap = self.block_size_deg;
        let block_km2 = {
            let edge_km = self.block_size_deg / km_to_degrees(1.0, self.origin.latitude);
            edge_km * edge_km
        };

        // (block id, min_lat, min_lng) for placing stations inside blocks
        let mut cells: Vec<(BlockId, f64, f64)> = Vec::new();
        let mut area_index = 0usize;

        for c in 0..self.contractor_count {
            let contractor_id = c as i64 + 1;
            data.contractors.push(Contractor {
                id: contractor_id,
                name: format!("Contractor {}", contractor_id),
                contract_type_id: if c % 5 == 4 { 2 } else { 1 },
                contract_status_id: if c % 3 == 2 { 2 } else { 1 },
                sponsoring_state: SPONSORING_STATES[c % SPONSORING_STATES.len()].to_string(),
                contractual_year: 2001 + (c % 20) as i32,
                contract_number: format!("ISBA/C{:03}", contractor_id),
                remarks: None,
            });

            for _ in 0..self.areas_per_contractor {
                let area_id = area_index as i64 + 1;
                let min_lat = self.origin.latitude;
                let min_lng = self.origin.longitude + area_index as f64 * (area_width + area_gap);
                area_index += 1;

                data.areas.push(Area {
                    id: area_id,
                    contractor_id,
                    name: format!("Area {}", area_id),
                    boundary: square_feature(min_lat, min_lng, area_width),
                    center: Some(GeoPoint::new(
                        min_lat + area_width / 2.0,
                        min_lng + area_width / 2.0,
                    )),
                    total_size_km2: block_km2 * (self.blocks_per_side * self.blocks_per_side) as f64,
                });

                for row in 0..self.blocks_per_side {
                    for col in 0..self.blocks_per_side {
                        let block_id = data.blocks.len() as i64 + 1;
                        let b_lat = min_lat + row as f64 * self.block_size_deg;
                        let b_lng = min_lng + col as f64 * self.block_size_deg;
                        let half = self.block_size_deg / 2.0;
                        data.blocks.push(Block {
                            id: block_id,
                            area_id,
                            name: format!("Block {}-{}", area_id, row * self.blocks_per_side + col + 1),
                            status: BLOCK_STATUSES[rng.gen_range(0..BLOCK_STATUSES.len())].to_string(),
                            boundary: square_feature(b_lat, b_lng, self.block_size_deg),
                            center: Some(GeoPoint::new(b_lat + half, b_lng + half)),
                            size_km2: block_km2,
                            category: "exploration".into(),
                            resource_density: Some(rng.gen_range(2.0..20.0)),
                            economic_value: None,
                        });
                        cells.push((block_id, b_lat, b_lng));
                    }
                }
            }

            for _ in 0..self.cruises_per_contractor {
                let cruise_id = data.cruises.len() as i64 + 1;
                let start = NaiveDate::from_ymd_opt(2010 + rng.gen_range(0..14), 1, 1)
                    .map(|d| d + Duration::days(rng.gen_range(0..300)));
                let end = start.map(|d| d + Duration::days(rng.gen_range(14..60)));
                data.cruises.push(Cruise {
                    id: cruise_id,
                    contractor_id,
                    name: format!("Cruise {}", cruise_id),
                    vessel: format!("RV Synthetic {}", c + 1),
                    start_date: start,
                    end_date: end,
                    center: None,
                });
            }
        }

        let mut expected_blocks = HashMap::new();
        let cruise_ids: Vec<i64> = data.cruises.iter().map(|c| c.id).collect();

        for cruise_id in cruise_ids {
            for _ in 0..self.stations_per_cruise {
                let station_id = data.stations.len() as i64 + 1;
                let inside = !cells.is_empty() && rng.gen::<f64>() < self.inside_fraction;

                let (latitude, longitude, expected) = if inside {
                    let (block_id, b_lat, b_lng) = cells[rng.gen_range(0..cells.len())];
                    // Keep clear of edges
                    let margin = self.block_size_deg * 0.05;
                    let span = self.block_size_deg - 2.0 * margin;
                    (
                        b_lat + margin + rng.gen::<f64>() * span,
                        b_lng + margin + rng.gen::<f64>() * span,
                        Some(block_id),
                    )
                } else {
                    // South of every area
                    (
                        self.origin.latitude - 1.0 - rng.gen::<f64>() * 5.0,
                        self.origin.longitude + rng.gen::<f64>() * area_width,
                        None,
                    )
                };

                data.stations.push(Station {
                    id: station_id,
                    cruise_id,
                    code: format!("ST-{:05}", station_id),
                    station_type: "Sampling".into(),
                    latitude,
                    longitude,
                    block_id: None,
                });
                expected_blocks.insert(station_id, expected);

                for _ in 0..self.samples_per_station {
                    self.push_sample(&mut data, &mut rng, station_id);
                }
            }
        }

        SyntheticDataset {
            dataset: data,
            expected_blocks,
        }
    }

    fn push_sample(&self, data: &mut Dataset, rng: &mut StdRng, station_id: StationId) {
        let sample_id = data.samples.len() as i64 + 1;
        let depth_upper: f64 = rng.gen_range(0.0..0.05);
        data.samples.push(Sample {
            id: sample_id,
            station_id,
            code: format!("SA-{:06}", sample_id),
            sample_type: SAMPLE_TYPES[rng.gen_range(0..SAMPLE_TYPES.len())].to_string(),
            matrix_type: "Sediment".into(),
            habitat_type: "Abyssal plain".into(),
            device: "Corer".into(),
            depth_upper: Some(depth_upper),
            depth_lower: Some(depth_upper + rng.gen_range(0.05..0.5)),
            description: None,
            analysis: None,
            result: None,
            unit: None,
        });

        let (category, name, unit) = ENV_PARAMETERS[rng.gen_range(0..ENV_PARAMETERS.len())];
        data.env_results.push(EnvResult {
            id: data.env_results.len() as i64 + 1,
            sample_id,
            category: category.into(),
            name: name.into(),
            value: rng.gen_range(0.0..40.0),
            unit: unit.into(),
            remarks: None,
        });

        let (category, analysis, unit) =
            RESOURCE_ANALYSES[rng.gen_range(0..RESOURCE_ANALYSES.len())];
        data.geo_results.push(GeoResult {
            id: data.geo_results.len() as i64 + 1,
            sample_id,
            category: category.into(),
            analysis: analysis.into(),
            value: rng.gen_range(0.0..25.0),
            unit: unit.into(),
            qualifier: None,
            remarks: None,
        });

        if rng.gen_bool(0.25) {
            data.media.push(Media {
                id: data.media.len() as i64 + 1,
                sample_id,
                file_name: format!("SA-{:06}.jpg", sample_id),
                media_type: "photo".into(),
                camera_specs: None,
                capture_date: None,
                remarks: None,
            });
        }
    }

    // ========================================================================
    // Preset scenarios
    // ========================================================================

    /// A handful of contractors, for tests.
    pub fn small() -> Self {
        Self {
            origin: GeoPoint::new(10.0, -130.0),
            contractor_count: 3,
            areas_per_contractor: 1,
            blocks_per_side: 3,
            block_size_deg: 0.5,
            cruises_per_contractor: 2,
            stations_per_cruise: 20,
            inside_fraction: 0.7,
            samples_per_station: 2,
            seed: 42,
        }
    }

    /// Association benchmark: many blocks, many stations.
    pub fn benchmark() -> Self {
        Self {
            contractor_count: 20,
            areas_per_contractor: 2,
            blocks_per_side: 10,
            block_size_deg: 0.2,
            cruises_per_contractor: 5,
            stations_per_cruise: 100,
            samples_per_station: 1,
            ..Self::small()
        }
    }

    /// `small()` scaled to roughly `station_count` stations.
    pub fn with_station_count(station_count: usize) -> Self {
        let base = Self::small();
        let cruises = base.contractor_count * base.cruises_per_contractor;
        Self {
            stations_per_cruise: station_count.div_ceil(cruises.max(1)),
            ..base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::contains_point;

    #[test]
    fn test_generation_is_deterministic() {
        let a = SyntheticScenario::small().generate();
        let b = SyntheticScenario::small().generate();
        assert_eq!(a.dataset, b.dataset);
    }

    #[test]
    fn test_counts() {
        let scenario = SyntheticScenario::small();
        let synthetic = scenario.generate();
        let data = &synthetic.dataset;
        assert_eq!(data.contractors.len(), 3);
        assert_eq!(data.areas.len(), 3);
        assert_eq!(data.blocks.len(), 27);
        assert_eq!(data.cruises.len(), 6);
        assert_eq!(data.stations.len(), 120);
        assert_eq!(data.samples.len(), 240);
        assert!(data.stations.iter().all(|s| s.block_id.is_none()));
    }

    #[test]
    fn test_expected_blocks_contain_their_stations() {
        let synthetic = SyntheticScenario::small().generate();
        let blocks: HashMap<BlockId, &Block> =
            synthetic.dataset.blocks.iter().map(|b| (b.id, b)).collect();

        for station in &synthetic.dataset.stations {
            match synthetic.expected_blocks[&station.id] {
                Some(block_id) => assert!(contains_point(
                    station.latitude,
                    station.longitude,
                    &blocks[&block_id].boundary
                )),
                None => assert!(station.latitude < SyntheticScenario::small().origin.latitude),
            }
        }
    }
}
