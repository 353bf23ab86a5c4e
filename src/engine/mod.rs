//! # Seabed Engine
//!
//! Server-side components over a shared entity store.
//!
//! ## Architecture
//!
//! The engine is composed of focused modules:
//! - `EntitySource` / `StationWriter` - Bulk read and batch write seams, with
//!   the `InMemoryStore` arena implementation
//! - `BlockIndex` - R-tree over block envelopes
//! - `AssociationService` - Station to block assignment
//! - `AggregationStore` - Cached filtered trees, lists and rollups

pub mod aggregation;
pub mod association;
pub mod entity_store;
pub mod spatial_index;

pub use aggregation::AggregationStore;
pub use association::{AssociationReport, AssociationService, BlockLocator};
pub use entity_store::{validate_dataset, EntitySource, InMemoryStore, StationWriter};
pub use spatial_index::{BlockEnvelope, BlockIndex};

use std::sync::Arc;

use crate::cache::{CacheConfig, Clock, SystemClock};
use crate::entities::{AreaId, BlockId, ContractorId};
use crate::error::Result;
use crate::filter::{FilterEngine, Gazetteer};
use crate::views::{AreaSummary, BlockAnalytics, ContractorSummary, MapDataView, MapFilter, ReferenceLookups};

/// Association and aggregation over one store.
///
/// All operations take `&self`; the engine can be shared across threads
/// behind an `Arc`.
pub struct SeabedEngine<S> {
    store: Arc<S>,
    pub association: AssociationService<S>,
    pub aggregation: AggregationStore<S>,
    gazetteer: Gazetteer,
}

impl<S: EntitySource + StationWriter> SeabedEngine<S> {
    /// Create an engine with default cache tiers and regions.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, &CacheConfig::default(), Gazetteer::default())
    }

    pub fn with_config(store: Arc<S>, cache: &CacheConfig, gazetteer: Gazetteer) -> Self {
        Self::with_clock(store, cache, gazetteer, Arc::new(SystemClock))
    }

    /// Create an engine whose caches use the given time source.
    pub fn with_clock(
        store: Arc<S>,
        cache: &CacheConfig,
        gazetteer: Gazetteer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            association: AssociationService::new(Arc::clone(&store)),
            aggregation: AggregationStore::with_clock(Arc::clone(&store), cache, clock),
            store,
            gazetteer,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    // ========================================================================
    // Association
    // ========================================================================

    pub fn find_block_for_point(&self, lat: f64, lon: f64) -> Result<Option<BlockId>> {
        self.association.find_block_for_point(lat, lon)
    }

    pub fn associate_all_stations(&self) -> bool {
        self.association.associate_all_stations()
    }

    pub fn associate_all_stations_report(&self) -> Result<AssociationReport> {
        self.association.associate_all_stations_report()
    }

    // ========================================================================
    // Aggregation
    // ========================================================================

    pub fn reference_lookups(&self) -> Result<Arc<ReferenceLookups>> {
        self.aggregation.reference_lookups()
    }

    pub fn get_filtered_tree(&self, filter: &MapFilter) -> Result<Arc<MapDataView>> {
        self.aggregation.get_filtered_tree(filter)
    }

    pub fn get_block_analytics(&self, block_id: BlockId) -> Result<Option<BlockAnalytics>> {
        self.aggregation.get_block_analytics(block_id)
    }

    pub fn get_area_summary(&self, area_id: AreaId) -> Result<Option<AreaSummary>> {
        self.aggregation.get_area_summary(area_id)
    }

    pub fn get_contractor_summary(&self, contractor_id: ContractorId) -> Result<Option<ContractorSummary>> {
        self.aggregation.get_contractor_summary(contractor_id)
    }

    // ========================================================================
    // Client filtering
    // ========================================================================

    /// Fetch the unfiltered tree and wrap it in a client filter engine.
    pub fn filter_engine(&self) -> Result<FilterEngine> {
        let original = self.get_filtered_tree(&MapFilter::default())?;
        let lookups = self.reference_lookups()?;
        Ok(FilterEngine::new(original, lookups, self.gazetteer.clone()))
    }

    /// Refetch the unfiltered tree into an existing filter engine.
    pub fn reset_filter_engine(&self, engine: &mut FilterEngine) -> Result<Arc<MapDataView>> {
        let fresh = self.get_filtered_tree(&MapFilter::default())?;
        let lookups = self.reference_lookups()?;
        Ok(engine.reset(fresh, lookups))
    }
}
