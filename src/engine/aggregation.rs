//! Filtered tree aggregation and analytics rollups.
//!
//! Read paths are stateless over the [`EntitySource`] and safe to call from
//! many threads. The list and tree paths go through the tiered
//! [`TtlCache`]s; analytics are computed on every call.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use log::debug;

use crate::cache::{CacheConfig, CacheStats, Clock, SystemClock, TtlCache};
use crate::entities::{
    Area, AreaId, Block, BlockId, Contractor, ContractorId, Cruise, Media, Sample, SampleId,
    Station, StationId,
};
use crate::error::Result;
use crate::geo_utils::{compute_center, haversine_km, search_bounds};
use crate::views::{
    AnalyticsCounts, AreaNode, AreaSummary, BlockAnalytics, ContractorNode, ContractorSummary,
    CruiseNode, DepthRange, MapDataView, MapFilter, MetricSummary, ReferenceLookups, SampleNode,
    SampleTypeSummary, StationNode,
};
use crate::{Bounds, GeoPoint};

use super::entity_store::EntitySource;

/// Number of stations reported in `BlockAnalytics::recent_stations`.
const RECENT_STATION_LIMIT: usize = 5;

const UNKNOWN_REFERENCE: &str = "Unknown";

/// Builds map views and rollups from an entity source, behind TTL caches.
pub struct AggregationStore<S> {
    source: Arc<S>,
    reference_cache: TtlCache<ReferenceLookups>,
    contractor_cache: TtlCache<Vec<Contractor>>,
    area_cache: TtlCache<Vec<Area>>,
    block_cache: TtlCache<Vec<Block>>,
    tree_cache: TtlCache<MapDataView>,
}

impl<S: EntitySource> AggregationStore<S> {
    /// Create a store with wall-clock cache expiry.
    pub fn new(source: Arc<S>, config: &CacheConfig) -> Self {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    /// Create a store whose caches use the given time source.
    pub fn with_clock(source: Arc<S>, config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            reference_cache: TtlCache::with_clock("reference", &config.reference, clock.clone()),
            contractor_cache: TtlCache::with_clock("contractors", &config.lists, clock.clone()),
            area_cache: TtlCache::with_clock("areas", &config.lists, clock.clone()),
            block_cache: TtlCache::with_clock("blocks", &config.lists, clock.clone()),
            tree_cache: TtlCache::with_clock("tree", &config.tree, clock),
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    // ========================================================================
    // Reference data and lists
    // ========================================================================

    /// Contract types/statuses, sponsoring states and contractual years.
    pub fn reference_lookups(&self) -> Result<Arc<ReferenceLookups>> {
        self.reference_cache
            .get_or_try_insert_with("reference", || self.build_reference_lookups())
    }

    fn build_reference_lookups(&self) -> Result<ReferenceLookups> {
        let contractors = self.source.contractors()?;

        let mut sponsoring_states: Vec<String> = contractors
            .iter()
            .map(|c| c.sponsoring_state.clone())
            .filter(|s| !s.is_empty())
            .collect();
        sponsoring_states.sort();
        sponsoring_states.dedup();

        let mut contractual_years: Vec<i32> =
            contractors.iter().map(|c| c.contractual_year).collect();
        contractual_years.sort_unstable();
        contractual_years.dedup();

        Ok(ReferenceLookups {
            contract_types: self.source.contract_types()?,
            contract_statuses: self.source.contract_statuses()?,
            sponsoring_states,
            contractual_years,
        })
    }

    /// Every contractor, in storage order.
    pub fn contractors(&self) -> Result<Arc<Vec<Contractor>>> {
        self.contractor_cache
            .get_or_try_insert_with("contractors", || self.source.contractors())
    }

    /// Areas, optionally restricted to one contractor.
    pub fn areas(&self, contractor_id: Option<ContractorId>) -> Result<Arc<Vec<Area>>> {
        let key = match contractor_id {
            Some(id) => format!("areas:{}", id),
            None => "areas:*".to_string(),
        };
        self.area_cache.get_or_try_insert_with(&key, || {
            Ok(self
                .source
                .areas()?
                .into_iter()
                .filter(|a| contractor_id.map_or(true, |id| a.contractor_id == id))
                .collect())
        })
    }

    /// Blocks, optionally restricted to one area.
    pub fn blocks(&self, area_id: Option<AreaId>) -> Result<Arc<Vec<Block>>> {
        let key = match area_id {
            Some(id) => format!("blocks:{}", id),
            None => "blocks:*".to_string(),
        };
        self.block_cache.get_or_try_insert_with(&key, || {
            Ok(self
                .source
                .blocks()?
                .into_iter()
                .filter(|b| area_id.map_or(true, |id| b.area_id == id))
                .collect())
        })
    }

    // ========================================================================
    // Filtered tree
    // ========================================================================

    /// Nested contractor and cruise tree for a filter, cached per filter.
    pub fn get_filtered_tree(&self, filter: &MapFilter) -> Result<Arc<MapDataView>> {
        self.tree_cache
            .get_or_try_insert_with(&filter.cache_key(), || self.build_filtered_tree(filter))
    }

    /// Build the tree without consulting the cache.
    pub fn build_filtered_tree(&self, filter: &MapFilter) -> Result<MapDataView> {
        let lookups = self.reference_lookups()?;

        // Contractors: conjunction of contractor-level fields
        let contractors: Vec<Contractor> = self
            .source
            .contractors()?
            .into_iter()
            .filter(|c| filter.matches_contractor(c))
            .collect();
        let contractor_ids: HashSet<ContractorId> = contractors.iter().map(|c| c.id).collect();

        let areas: Vec<Area> = self
            .source
            .areas()?
            .into_iter()
            .filter(|a| contractor_ids.contains(&a.contractor_id))
            .collect();
        let area_ids: HashSet<AreaId> = areas.iter().map(|a| a.id).collect();
        let mut blocks_by_area = group_by(
            self.source
                .blocks()?
                .into_iter()
                .filter(|b| area_ids.contains(&b.area_id)),
            |b| b.area_id,
        );
        let mut areas_by_contractor = group_by(
            areas.into_iter().map(|area| AreaNode {
                blocks: blocks_by_area.remove(&area.id).unwrap_or_default(),
                area,
            }),
            |node| node.area.contractor_id,
        );

        let contractor_nodes: Vec<ContractorNode> = contractors
            .into_iter()
            .map(|contractor| ContractorNode {
                contract_type: lookups
                    .contract_type_name(contractor.contract_type_id)
                    .unwrap_or(UNKNOWN_REFERENCE)
                    .to_string(),
                contract_status: lookups
                    .contract_status_name(contractor.contract_status_id)
                    .unwrap_or(UNKNOWN_REFERENCE)
                    .to_string(),
                areas: areas_by_contractor
                    .remove(&contractor.id)
                    .unwrap_or_default(),
                contractor,
            })
            .collect();

        // Cruises: explicit cruise, else explicit contractor, else the contractor set
        let cruises: Vec<Cruise> = self
            .source
            .cruises()?
            .into_iter()
            .filter(|c| match (filter.cruise_id, filter.contractor_id) {
                (Some(cruise_id), _) => c.id == cruise_id,
                (None, Some(contractor_id)) => c.contractor_id == contractor_id,
                (None, None) => contractor_ids.contains(&c.contractor_id),
            })
            .collect();

        // Three bulk reads, grouped in memory
        let cruise_ids = cruises.iter().map(|c| c.id).collect();
        let stations = self.source.stations_for_cruises(&cruise_ids)?;
        let station_ids: HashSet<StationId> = stations.iter().map(|s| s.id).collect();
        let samples = self.source.samples_for_stations(&station_ids)?;
        let sample_ids: HashSet<SampleId> = samples.iter().map(|s| s.id).collect();
        let media = self.source.media_for_samples(&sample_ids)?;

        let mut media_by_sample = group_by(media, |m: &Media| m.sample_id);
        let mut samples_by_station = group_by(
            samples.into_iter().map(|sample| SampleNode {
                media: media_by_sample.remove(&sample.id).unwrap_or_default(),
                sample,
            }),
            |node| node.sample.station_id,
        );
        let mut stations_by_cruise = group_by(
            stations.into_iter().map(|station| StationNode {
                samples: samples_by_station.remove(&station.id).unwrap_or_default(),
                station,
            }),
            |node| node.station.cruise_id,
        );

        let cruise_nodes: Vec<CruiseNode> = cruises
            .into_iter()
            .map(|cruise| {
                let stations = stations_by_cruise.remove(&cruise.id).unwrap_or_default();
                let center_point = cruise.center.or_else(|| station_centroid(&stations));
                CruiseNode {
                    cruise,
                    center_point,
                    stations,
                }
            })
            .collect();

        debug!(
            "[aggregation] tree {} -> {} contractors, {} cruises",
            filter.cache_key(),
            contractor_nodes.len(),
            cruise_nodes.len()
        );

        Ok(MapDataView {
            contractors: contractor_nodes,
            cruises: cruise_nodes,
        })
    }

    /// Stations inside a bounding box, independent of the tree filter.
    pub fn stations_in_bounds(&self, bounds: &Bounds) -> Result<Vec<Station>> {
        Ok(self
            .source
            .stations()?
            .into_iter()
            .filter(|s| bounds.contains(s.latitude, s.longitude))
            .collect())
    }

    /// Stations within `radius_km` of a point, nearest first.
    pub fn stations_within_km(&self, center: &GeoPoint, radius_km: f64) -> Result<Vec<(Station, f64)>> {
        let search = search_bounds(center, radius_km);
        let mut hits: Vec<(Station, f64)> = self
            .source
            .stations()?
            .into_iter()
            .filter(|s| search.iter().any(|b| b.contains(s.latitude, s.longitude)))
            .map(|s| {
                let d = haversine_km(center, &s.point());
                (s, d)
            })
            .filter(|(_, d)| *d <= radius_km)
            .collect();
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(hits)
    }

    // ========================================================================
    // Analytics
    // ========================================================================

    /// Rollup of measurements under one block. `Ok(None)` if the block does
    /// not exist.
    pub fn get_block_analytics(&self, block_id: BlockId) -> Result<Option<BlockAnalytics>> {
        let Some(block) = self.source.blocks()?.into_iter().find(|b| b.id == block_id) else {
            return Ok(None);
        };

        let stations = self.source.stations_in_block(block_id)?;
        let station_ids: HashSet<StationId> = stations.iter().map(|s| s.id).collect();
        let samples = self.source.samples_for_stations(&station_ids)?;
        let sample_ids: HashSet<SampleId> = samples.iter().map(|s| s.id).collect();
        let env_results = self.source.env_results_for_samples(&sample_ids)?;
        let geo_results = self.source.geo_results_for_samples(&sample_ids)?;

        let environmental_parameters = summarize(
            &env_results,
            |r| (r.category.clone(), r.name.clone()),
            |r| r.value,
            |r| r.unit.clone(),
        );
        let resource_metrics = summarize(
            &geo_results,
            |r| (r.category.clone(), r.analysis.clone()),
            |r| r.value,
            |r| r.unit.clone(),
        );

        let counts = AnalyticsCounts {
            stations: stations.len(),
            samples: samples.len(),
            env_results: env_results.len(),
            geo_results: geo_results.len(),
        };

        let mut recent_stations = stations;
        recent_stations.sort_by(|a, b| b.id.cmp(&a.id));
        recent_stations.truncate(RECENT_STATION_LIMIT);

        Ok(Some(BlockAnalytics {
            block,
            environmental_parameters,
            resource_metrics,
            sample_types: summarize_sample_types(&samples),
            recent_stations,
            counts,
        }))
    }

    /// Rollup for one area. `Ok(None)` if the area does not exist.
    pub fn get_area_summary(&self, area_id: AreaId) -> Result<Option<AreaSummary>> {
        let Some(area) = self.source.areas()?.into_iter().find(|a| a.id == area_id) else {
            return Ok(None);
        };

        let blocks: Vec<Block> = self
            .source
            .blocks()?
            .into_iter()
            .filter(|b| b.area_id == area_id)
            .collect();
        let block_ids: HashSet<BlockId> = blocks.iter().map(|b| b.id).collect();
        let station_ids: HashSet<StationId> = self
            .source
            .stations()?
            .iter()
            .filter(|s| s.block_id.is_some_and(|id| block_ids.contains(&id)))
            .map(|s| s.id)
            .collect();
        let sample_count = self.source.samples_for_stations(&station_ids)?.len();

        Ok(Some(AreaSummary {
            area_id: area.id,
            name: area.name,
            contractor_id: area.contractor_id,
            total_size_km2: area.total_size_km2,
            block_count: blocks.len(),
            blocks_size_km2: blocks.iter().map(|b| b.size_km2).sum(),
            block_status_counts: status_counts(&blocks),
            station_count: station_ids.len(),
            sample_count,
        }))
    }

    /// Rollup for one contractor. `Ok(None)` if the contractor does not exist.
    pub fn get_contractor_summary(
        &self,
        contractor_id: ContractorId,
    ) -> Result<Option<ContractorSummary>> {
        let Some(contractor) = self
            .source
            .contractors()?
            .into_iter()
            .find(|c| c.id == contractor_id)
        else {
            return Ok(None);
        };
        let lookups = self.reference_lookups()?;

        let areas: Vec<Area> = self
            .source
            .areas()?
            .into_iter()
            .filter(|a| a.contractor_id == contractor_id)
            .collect();
        let area_ids: HashSet<AreaId> = areas.iter().map(|a| a.id).collect();
        let blocks: Vec<Block> = self
            .source
            .blocks()?
            .into_iter()
            .filter(|b| area_ids.contains(&b.area_id))
            .collect();

        let cruises: Vec<Cruise> = self
            .source
            .cruises()?
            .into_iter()
            .filter(|c| c.contractor_id == contractor_id)
            .collect();
        let cruise_ids = cruises.iter().map(|c| c.id).collect();
        let station_ids: HashSet<StationId> = self
            .source
            .stations_for_cruises(&cruise_ids)?
            .iter()
            .map(|s| s.id)
            .collect();
        let sample_count = self.source.samples_for_stations(&station_ids)?.len();

        Ok(Some(ContractorSummary {
            contractor_id,
            contract_type: lookups
                .contract_type_name(contractor.contract_type_id)
                .unwrap_or(UNKNOWN_REFERENCE)
                .to_string(),
            contract_status: lookups
                .contract_status_name(contractor.contract_status_id)
                .unwrap_or(UNKNOWN_REFERENCE)
                .to_string(),
            name: contractor.name,
            area_count: areas.len(),
            block_count: blocks.len(),
            total_area_km2: areas.iter().map(|a| a.total_size_km2).sum(),
            block_status_counts: status_counts(&blocks),
            cruise_count: cruises.len(),
            station_count: station_ids.len(),
            sample_count,
            first_cruise_start: cruises.iter().filter_map(|c| c.start_date).min(),
            last_cruise_end: cruises.iter().filter_map(|c| c.end_date).max(),
        }))
    }

    /// Per-tier cache counters, for diagnostics.
    pub fn cache_stats(&self) -> Vec<(&'static str, CacheStats)> {
        vec![
            ("reference", self.reference_cache.stats()),
            ("contractors", self.contractor_cache.stats()),
            ("areas", self.area_cache.stats()),
            ("blocks", self.block_cache.stats()),
            ("tree", self.tree_cache.stats()),
        ]
    }
}

// ============================================================================
// Grouping helpers
// ============================================================================

/// Group items by key, keeping input order within each group.
fn group_by<T, K, I, F>(items: I, key: F) -> HashMap<K, Vec<T>>
where
    I: IntoIterator<Item = T>,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut groups: HashMap<K, Vec<T>> = HashMap::new();
    for item in items {
        groups.entry(key(&item)).or_default().push(item);
    }
    groups
}

/// avg/min/max/count per `(category, name)` group, in first-seen order.
fn summarize<T>(
    items: &[T],
    key: impl Fn(&T) -> (String, String),
    value: impl Fn(&T) -> f64,
    unit: impl Fn(&T) -> String,
) -> Vec<MetricSummary> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), Vec<&T>> = HashMap::new();
    for item in items {
        let k = key(item);
        if !groups.contains_key(&k) {
            order.push(k.clone());
        }
        groups.entry(k).or_default().push(item);
    }

    order
        .into_iter()
        .filter_map(|k| {
            let members = groups.remove(&k)?;
            let first = members.first()?;
            let values: Vec<f64> = members.iter().map(|m| value(*m)).collect();
            let sum: f64 = values.iter().sum();
            Some(MetricSummary {
                unit: unit(*first),
                category: k.0,
                name: k.1,
                avg: sum / values.len() as f64,
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                count: values.len(),
            })
        })
        .collect()
}

/// Count and depth range per sample type, in first-seen order.
fn summarize_sample_types(samples: &[Sample]) -> Vec<SampleTypeSummary> {
    let mut summaries: Vec<SampleTypeSummary> = Vec::new();
    for sample in samples {
        let idx = match summaries
            .iter()
            .position(|s| s.sample_type == sample.sample_type)
        {
            Some(idx) => idx,
            None => {
                summaries.push(SampleTypeSummary {
                    sample_type: sample.sample_type.clone(),
                    count: 0,
                    depth_range: DepthRange::default(),
                });
                summaries.len() - 1
            }
        };
        let summary = &mut summaries[idx];
        summary.count += 1;
        if let Some(lower) = sample.depth_lower {
            summary.depth_range.min = Some(summary.depth_range.min.map_or(lower, |m| m.min(lower)));
        }
        if let Some(upper) = sample.depth_upper {
            summary.depth_range.max = Some(summary.depth_range.max.map_or(upper, |m| m.max(upper)));
        }
    }
    summaries
}

fn status_counts(blocks: &[Block]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for block in blocks {
        *counts.entry(block.status.to_lowercase()).or_insert(0) += 1;
    }
    counts
}

fn station_centroid(stations: &[StationNode]) -> Option<GeoPoint> {
    if stations.is_empty() {
        return None;
    }
    let points: Vec<GeoPoint> = stations.iter().map(|s| s.station.point()).collect();
    Some(compute_center(&points))
}
