//! Spatial indexing for block boundaries.
//!
//! Uses an R-tree over boundary envelopes to prune the blocks whose
//! polygons need an exact containment test.

use rstar::{RTree, RTreeObject, AABB};

use crate::entities::BlockId;
use crate::Bounds;

/// Block envelope wrapper for R-tree spatial indexing.
///
/// `ordinal` is the block's position in storage order among the indexed
/// blocks, used to keep first-match semantics after pruning.
#[derive(Debug, Clone)]
pub struct BlockEnvelope {
    pub block_id: BlockId,
    pub ordinal: usize,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BlockEnvelope {
    pub fn new(block_id: BlockId, ordinal: usize, bounds: &Bounds) -> Self {
        Self {
            block_id,
            ordinal,
            min_lat: bounds.min_lat,
            max_lat: bounds.max_lat,
            min_lng: bounds.min_lng,
            max_lng: bounds.max_lng,
        }
    }
}

impl RTreeObject for BlockEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_lng, self.min_lat], [self.max_lng, self.max_lat])
    }
}

/// Spatial index of block envelopes.
#[derive(Debug)]
pub struct BlockIndex {
    tree: RTree<BlockEnvelope>,
}

impl Default for BlockIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk-load an index from envelopes.
    pub fn build(envelopes: Vec<BlockEnvelope>) -> Self {
        Self {
            tree: RTree::bulk_load(envelopes),
        }
    }

    /// Envelopes touching a point, in no particular order.
    pub fn candidates_at(&self, lat: f64, lng: f64) -> Vec<&BlockEnvelope> {
        let probe = AABB::from_point([lng, lat]);
        self.tree.locate_in_envelope_intersecting(&probe).collect()
    }

    /// Block ids whose envelopes intersect a viewport.
    pub fn query_viewport(&self, bounds: &Bounds) -> Vec<BlockId> {
        let search_bounds = AABB::from_corners(
            [bounds.min_lng, bounds.min_lat],
            [bounds.max_lng, bounds.max_lat],
        );

        let mut hits: Vec<&BlockEnvelope> = self
            .tree
            .locate_in_envelope_intersecting(&search_bounds)
            .collect();
        hits.sort_by_key(|e| e.ordinal);
        hits.into_iter().map(|e| e.block_id).collect()
    }

    /// Get the number of indexed blocks.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
