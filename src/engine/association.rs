//! Bulk assignment of stations to blocks.
//!
//! Each pass reads every station and block, parses block boundaries once,
//! and tests stations sequentially. A station gets the first block, in
//! storage order, whose polygon contains it. Overlapping blocks therefore
//! resolve by storage order. Stations outside every block keep their
//! current assignment.
//!
//! All changed assignments are written in one batch at the end. Passes are
//! not mutually exclusive: two concurrent passes each write their own batch
//! and the last commit wins per station.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info};
use serde::Serialize;

use crate::entities::{Block, BlockId, StationId};
use crate::error::Result;
use crate::geometry::BoundaryPolygon;

use super::entity_store::{EntitySource, StationWriter};
use super::spatial_index::{BlockEnvelope, BlockIndex};

/// Parsed block polygons with an envelope index.
#[derive(Debug)]
pub struct BlockLocator {
    /// (block id, polygon) in storage order
    polygons: Vec<(BlockId, BoundaryPolygon)>,
    index: BlockIndex,
    invalid_boundaries: usize,
}

impl BlockLocator {
    /// Parse every non-empty block boundary. Unparseable boundaries are
    /// counted and never match.
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut polygons = Vec::with_capacity(blocks.len());
        let mut invalid_boundaries = 0;

        for block in blocks.iter().filter(|b| b.has_boundary()) {
            match BoundaryPolygon::parse(&block.boundary) {
                Ok(polygon) => polygons.push((block.id, polygon)),
                Err(e) => {
                    invalid_boundaries += 1;
                    debug!("[association] block {} boundary skipped: {}", block.id, e);
                }
            }
        }

        let envelopes = polygons
            .iter()
            .enumerate()
            .map(|(ordinal, (id, polygon))| BlockEnvelope::new(*id, ordinal, &polygon.bounds()))
            .collect();

        Self {
            polygons,
            index: BlockIndex::build(envelopes),
            invalid_boundaries,
        }
    }

    /// First block in storage order containing the point.
    pub fn locate(&self, lat: f64, lon: f64) -> Option<BlockId> {
        self.index
            .candidates_at(lat, lon)
            .into_iter()
            .filter(|candidate| self.polygons[candidate.ordinal].1.contains(lat, lon))
            .min_by_key(|candidate| candidate.ordinal)
            .map(|candidate| candidate.block_id)
    }

    /// Number of blocks with a usable polygon.
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn invalid_boundaries(&self) -> usize {
        self.invalid_boundaries
    }
}

/// Outcome of one association pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationReport {
    pub stations_examined: usize,
    pub stations_matched: usize,
    pub stations_unmatched: usize,
    pub blocks_considered: usize,
    pub invalid_boundaries: usize,
    /// Stations whose block assignment changed and was written
    pub updates_saved: usize,
    pub elapsed_ms: u64,
}

/// Writes `Station.block_id` from station coordinates and block polygons.
#[derive(Debug)]
pub struct AssociationService<S> {
    store: Arc<S>,
}

impl<S> Clone for AssociationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: EntitySource + StationWriter> AssociationService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// First block in storage order whose boundary contains the point.
    pub fn find_block_for_point(&self, lat: f64, lon: f64) -> Result<Option<BlockId>> {
        let blocks = self.store.blocks()?;
        Ok(BlockLocator::from_blocks(&blocks).locate(lat, lon))
    }

    /// Run a full pass and return counts.
    pub fn associate_all_stations_report(&self) -> Result<AssociationReport> {
        let start = Instant::now();
        let stations = self.store.stations()?;
        let blocks = self.store.blocks()?;
        let locator = BlockLocator::from_blocks(&blocks);

        info!(
            "[association] testing {} stations against {} blocks",
            stations.len(),
            locator.len()
        );

        let mut report = AssociationReport {
            stations_examined: stations.len(),
            blocks_considered: locator.len(),
            invalid_boundaries: locator.invalid_boundaries(),
            ..Default::default()
        };

        let mut updates: Vec<(StationId, BlockId)> = Vec::new();
        for station in &stations {
            match locator.locate(station.latitude, station.longitude) {
                Some(block_id) => {
                    report.stations_matched += 1;
                    if station.block_id != Some(block_id) {
                        updates.push((station.id, block_id));
                    }
                }
                None => report.stations_unmatched += 1,
            }
        }

        report.updates_saved = if updates.is_empty() {
            0
        } else {
            self.store.save_station_blocks(&updates)?
        };
        report.elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            "[association] matched {}/{} stations, saved {} updates in {}ms",
            report.stations_matched,
            report.stations_examined,
            report.updates_saved,
            report.elapsed_ms
        );
        Ok(report)
    }

    /// Run a full pass. Returns `false` if reading or saving failed; nothing
    /// from a failed pass is persisted.
    pub fn associate_all_stations(&self) -> bool {
        match self.associate_all_stations_report() {
            Ok(_) => true,
            Err(e) => {
                error!("[association] station association failed: {}", e);
                false
            }
        }
    }
}
