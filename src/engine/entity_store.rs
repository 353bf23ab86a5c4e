//! Entity storage seams and the in-memory arena store.
//!
//! [`EntitySource`] is the bulk read API the aggregation and association
//! components consume; [`StationWriter`] is the single write they need.
//! Joins are expressed as bulk reads followed by in-memory filtering, so an
//! implementation only has to supply whole collections.

use std::collections::{HashMap, HashSet};

use log::debug;
use parking_lot::RwLock;

use crate::entities::{
    Area, Block, BlockId, ContractStatus, ContractType, Contractor, Cruise, CruiseId, Dataset,
    EnvResult, GeoResult, Media, Sample, SampleId, Station, StationId,
};
use crate::error::{OptionExt, Result, SeabedError};

/// Bulk read access to every entity collection, in storage order.
pub trait EntitySource: Send + Sync {
    fn contract_types(&self) -> Result<Vec<ContractType>>;
    fn contract_statuses(&self) -> Result<Vec<ContractStatus>>;
    fn contractors(&self) -> Result<Vec<Contractor>>;
    fn areas(&self) -> Result<Vec<Area>>;
    fn blocks(&self) -> Result<Vec<Block>>;
    fn cruises(&self) -> Result<Vec<Cruise>>;
    fn stations(&self) -> Result<Vec<Station>>;
    fn samples(&self) -> Result<Vec<Sample>>;
    fn env_results(&self) -> Result<Vec<EnvResult>>;
    fn geo_results(&self) -> Result<Vec<GeoResult>>;
    fn media(&self) -> Result<Vec<Media>>;

    fn stations_for_cruises(&self, cruise_ids: &HashSet<CruiseId>) -> Result<Vec<Station>> {
        Ok(self
            .stations()?
            .into_iter()
            .filter(|s| cruise_ids.contains(&s.cruise_id))
            .collect())
    }

    fn stations_in_block(&self, block_id: BlockId) -> Result<Vec<Station>> {
        Ok(self
            .stations()?
            .into_iter()
            .filter(|s| s.block_id == Some(block_id))
            .collect())
    }

    fn samples_for_stations(&self, station_ids: &HashSet<StationId>) -> Result<Vec<Sample>> {
        Ok(self
            .samples()?
            .into_iter()
            .filter(|s| station_ids.contains(&s.station_id))
            .collect())
    }

    fn media_for_samples(&self, sample_ids: &HashSet<SampleId>) -> Result<Vec<Media>> {
        Ok(self
            .media()?
            .into_iter()
            .filter(|m| sample_ids.contains(&m.sample_id))
            .collect())
    }

    fn env_results_for_samples(&self, sample_ids: &HashSet<SampleId>) -> Result<Vec<EnvResult>> {
        Ok(self
            .env_results()?
            .into_iter()
            .filter(|r| sample_ids.contains(&r.sample_id))
            .collect())
    }

    fn geo_results_for_samples(&self, sample_ids: &HashSet<SampleId>) -> Result<Vec<GeoResult>> {
        Ok(self
            .geo_results()?
            .into_iter()
            .filter(|r| sample_ids.contains(&r.sample_id))
            .collect())
    }
}

/// Persists station → block assignments.
pub trait StationWriter: Send + Sync {
    /// Apply every update as one batch. Either all rows are written or none.
    ///
    /// Returns the number of stations updated.
    fn save_station_blocks(&self, updates: &[(StationId, BlockId)]) -> Result<usize>;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
struct Tables {
    data: Dataset,
    station_index: HashMap<StationId, usize>,
    block_ids: HashSet<BlockId>,
}

/// Arena store: collections kept in storage order, with id indexes.
///
/// Loading validates the ownership forest (every child's parent exists, no
/// duplicate ids, station block references resolve).
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

fn check_unique<T>(
    entity: &'static str,
    items: &[T],
    id_of: impl Fn(&T) -> i64,
) -> Result<HashSet<i64>> {
    let mut ids = HashSet::with_capacity(items.len());
    for item in items {
        let id = id_of(item);
        if !ids.insert(id) {
            return Err(SeabedError::DuplicateId { entity, id });
        }
    }
    Ok(ids)
}

fn check_parent(
    entity: &'static str,
    id: i64,
    missing: &'static str,
    parent_id: i64,
    parents: &HashSet<i64>,
) -> Result<()> {
    if parents.contains(&parent_id) {
        Ok(())
    } else {
        Err(SeabedError::Integrity {
            entity,
            id,
            missing,
            missing_id: parent_id,
        })
    }
}

/// Validate the forest invariants of a dataset.
pub fn validate_dataset(data: &Dataset) -> Result<()> {
    check_unique("contract type", &data.contract_types, |t| t.id)?;
    check_unique("contract status", &data.contract_statuses, |s| s.id)?;
    let contractors = check_unique("contractor", &data.contractors, |c| c.id)?;
    let areas = check_unique("area", &data.areas, |a| a.id)?;
    let blocks = check_unique("block", &data.blocks, |b| b.id)?;
    let cruises = check_unique("cruise", &data.cruises, |c| c.id)?;
    let stations = check_unique("station", &data.stations, |s| s.id)?;
    let samples = check_unique("sample", &data.samples, |s| s.id)?;
    check_unique("env result", &data.env_results, |r| r.id)?;
    check_unique("geo result", &data.geo_results, |r| r.id)?;
    check_unique("media", &data.media, |m| m.id)?;

    for a in &data.areas {
        check_parent("area", a.id, "contractor", a.contractor_id, &contractors)?;
    }
    for b in &data.blocks {
        check_parent("block", b.id, "area", b.area_id, &areas)?;
    }
    for c in &data.cruises {
        check_parent("cruise", c.id, "contractor", c.contractor_id, &contractors)?;
    }
    for s in &data.stations {
        check_parent("station", s.id, "cruise", s.cruise_id, &cruises)?;
        if let Some(block_id) = s.block_id {
            check_parent("station", s.id, "block", block_id, &blocks)?;
        }
    }
    for s in &data.samples {
        check_parent("sample", s.id, "station", s.station_id, &stations)?;
    }
    for r in &data.env_results {
        check_parent("env result", r.id, "sample", r.sample_id, &samples)?;
    }
    for r in &data.geo_results {
        check_parent("geo result", r.id, "sample", r.sample_id, &samples)?;
    }
    for m in &data.media {
        check_parent("media", m.id, "sample", m.sample_id, &samples)?;
    }
    Ok(())
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a dataset after validating its invariants.
    pub fn from_dataset(data: Dataset) -> Result<Self> {
        let store = Self::new();
        store.replace(data)?;
        Ok(store)
    }

    /// Replace every collection with a validated dataset (import/seed).
    pub fn replace(&self, data: Dataset) -> Result<()> {
        validate_dataset(&data)?;
        let station_index = data
            .stations
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.id, idx))
            .collect();
        let block_ids = data.blocks.iter().map(|b| b.id).collect();
        debug!(
            "[store] loaded {} contractors, {} blocks, {} stations, {} samples",
            data.contractors.len(),
            data.blocks.len(),
            data.stations.len(),
            data.samples.len()
        );
        *self.tables.write() = Tables {
            data,
            station_index,
            block_ids,
        };
        Ok(())
    }

    /// Copy of every collection.
    pub fn snapshot(&self) -> Dataset {
        self.tables.read().data.clone()
    }

    /// Look up one station by id.
    pub fn station(&self, id: StationId) -> Option<Station> {
        let tables = self.tables.read();
        tables
            .station_index
            .get(&id)
            .map(|&idx| tables.data.stations[idx].clone())
    }

    /// Current block assignment of every station, keyed by station id.
    pub fn station_blocks(&self) -> HashMap<StationId, Option<BlockId>> {
        self.tables
            .read()
            .data
            .stations
            .iter()
            .map(|s| (s.id, s.block_id))
            .collect()
    }

    pub fn station_count(&self) -> usize {
        self.tables.read().data.stations.len()
    }

    pub fn block_count(&self) -> usize {
        self.tables.read().data.blocks.len()
    }
}

impl EntitySource for InMemoryStore {
    fn contract_types(&self) -> Result<Vec<ContractType>> {
        Ok(self.tables.read().data.contract_types.clone())
    }

    fn contract_statuses(&self) -> Result<Vec<ContractStatus>> {
        Ok(self.tables.read().data.contract_statuses.clone())
    }

    fn contractors(&self) -> Result<Vec<Contractor>> {
        Ok(self.tables.read().data.contractors.clone())
    }

    fn areas(&self) -> Result<Vec<Area>> {
        Ok(self.tables.read().data.areas.clone())
    }

    fn blocks(&self) -> Result<Vec<Block>> {
        Ok(self.tables.read().data.blocks.clone())
    }

    fn cruises(&self) -> Result<Vec<Cruise>> {
        Ok(self.tables.read().data.cruises.clone())
    }

    fn stations(&self) -> Result<Vec<Station>> {
        Ok(self.tables.read().data.stations.clone())
    }

    fn samples(&self) -> Result<Vec<Sample>> {
        Ok(self.tables.read().data.samples.clone())
    }

    fn env_results(&self) -> Result<Vec<EnvResult>> {
        Ok(self.tables.read().data.env_results.clone())
    }

    fn geo_results(&self) -> Result<Vec<GeoResult>> {
        Ok(self.tables.read().data.geo_results.clone())
    }

    fn media(&self) -> Result<Vec<Media>> {
        Ok(self.tables.read().data.media.clone())
    }

    // Filter under the lock instead of cloning whole collections first
    fn stations_for_cruises(&self, cruise_ids: &HashSet<CruiseId>) -> Result<Vec<Station>> {
        Ok(self
            .tables
            .read()
            .data
            .stations
            .iter()
            .filter(|s| cruise_ids.contains(&s.cruise_id))
            .cloned()
            .collect())
    }

    fn samples_for_stations(&self, station_ids: &HashSet<StationId>) -> Result<Vec<Sample>> {
        Ok(self
            .tables
            .read()
            .data
            .samples
            .iter()
            .filter(|s| station_ids.contains(&s.station_id))
            .cloned()
            .collect())
    }

    fn media_for_samples(&self, sample_ids: &HashSet<SampleId>) -> Result<Vec<Media>> {
        Ok(self
            .tables
            .read()
            .data
            .media
            .iter()
            .filter(|m| sample_ids.contains(&m.sample_id))
            .cloned()
            .collect())
    }
}

impl StationWriter for InMemoryStore {
    fn save_station_blocks(&self, updates: &[(StationId, BlockId)]) -> Result<usize> {
        let mut tables = self.tables.write();

        // Validate the whole batch before touching anything
        let mut targets = Vec::with_capacity(updates.len());
        for &(station_id, block_id) in updates {
            let idx = tables
                .station_index
                .get(&station_id)
                .copied()
                .ok_or_not_found("station", station_id)?;
            if !tables.block_ids.contains(&block_id) {
                return Err(SeabedError::Integrity {
                    entity: "station",
                    id: station_id,
                    missing: "block",
                    missing_id: block_id,
                });
            }
            targets.push((idx, block_id));
        }

        for (idx, block_id) in targets {
            tables.data.stations[idx].block_id = Some(block_id);
        }
        Ok(updates.len())
    }
}
