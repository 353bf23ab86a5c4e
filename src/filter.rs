//! Client-side filtering over a cached map tree.
//!
//! The [`FilterEngine`] holds the last unfiltered tree fetched from the
//! aggregation store (`original`) and the view currently shown (`current`).
//! Every predicate or pin change re-derives `current` from `original`
//! synchronously. Nothing is fetched again until [`FilterEngine::reset`].
//!
//! `current` is only ever replaced, never mutated, so holders of an older
//! `Arc` keep a consistent snapshot. With no active predicate `current` is
//! the very same allocation as `original`.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::entities::{ContractorId, CruiseId};
use crate::error::FilterError;
use crate::views::{ContractorNode, CruiseNode, MapDataView, ReferenceLookups};
use crate::Bounds;

// ============================================================================
// Gazetteer
// ============================================================================

/// Named rectangular region used by the `location_id` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub bounds: Bounds,
}

impl Location {
    pub fn new(id: impl Into<String>, name: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bounds,
        }
    }
}

/// Lookup of named regions. Independent of area and block boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gazetteer {
    locations: Vec<Location>,
}

impl Default for Gazetteer {
    fn default() -> Self {
        Self::default_regions()
    }
}

impl Gazetteer {
    /// An empty gazetteer.
    pub fn empty() -> Self {
        Self {
            locations: Vec::new(),
        }
    }

    /// The built-in exploration regions.
    pub fn default_regions() -> Self {
        Self::empty()
            .with_location(Location::new(
                "ccz",
                "Clarion-Clipperton Zone",
                Bounds::new(0.0, 23.0, -160.0, -110.0),
            ))
            .with_location(Location::new(
                "ciob",
                "Central Indian Ocean Basin",
                Bounds::new(-20.0, 0.0, 65.0, 90.0),
            ))
            .with_location(Location::new(
                "mar",
                "Mid-Atlantic Ridge",
                Bounds::new(-10.0, 40.0, -50.0, -20.0),
            ))
            .with_location(Location::new(
                "wp",
                "Western Pacific",
                Bounds::new(0.0, 30.0, 130.0, 170.0),
            ))
            .with_location(Location::new(
                "swir",
                "Southwest Indian Ridge",
                Bounds::new(-45.0, -25.0, 25.0, 70.0),
            ))
    }

    /// Add a location, replacing any existing one with the same id.
    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.retain(|l| l.id != location.id);
        self.locations.push(location);
        self
    }

    pub fn get(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }
}

// ============================================================================
// Predicates and pins
// ============================================================================

/// Client filter predicates. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterPredicates {
    pub contractor_id: Option<ContractorId>,
    pub contract_type_id: Option<i64>,
    pub contract_status_id: Option<i64>,
    pub sponsoring_state: Option<String>,
    pub year: Option<i32>,
    pub location_id: Option<String>,
}

impl FilterPredicates {
    pub fn is_empty(&self) -> bool {
        self.contractor_id.is_none()
            && self.contract_type_id.is_none()
            && self.contract_status_id.is_none()
            && self.sponsoring_state.is_none()
            && self.year.is_none()
            && self.location_id.is_none()
    }
}

/// Entities chosen by direct interaction. They stay visible whatever the
/// predicates say.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PinnedSelection {
    pub contractor_id: Option<ContractorId>,
    pub cruise_id: Option<CruiseId>,
}

impl PinnedSelection {
    pub fn is_empty(&self) -> bool {
        self.contractor_id.is_none() && self.cruise_id.is_none()
    }
}

// ============================================================================
// Derivation
// ============================================================================

fn contractor_in_location(node: &ContractorNode, bounds: &Bounds) -> bool {
    node.areas.iter().any(|area| match area.area.center {
        Some(center) => bounds.contains_point(&center),
        None => area
            .blocks
            .iter()
            .filter_map(|b| b.center)
            .any(|c| bounds.contains_point(&c)),
    })
}

fn cruise_in_location(node: &CruiseNode, bounds: &Bounds) -> bool {
    if node.stations.is_empty() {
        node.cruise
            .center
            .is_some_and(|c| bounds.contains_point(&c))
    } else {
        node.stations
            .iter()
            .any(|s| bounds.contains(s.station.latitude, s.station.longitude))
    }
}

/// Derive a filtered view from an unfiltered tree.
///
/// Contractors are filtered by each set predicate in order. The cruise set
/// is every cruise of the pinned contractor if there is one, otherwise the
/// cruises of the surviving contractors. A pinned cruise and its contractor
/// are always reinstated. The cruise location pass only runs without a
/// pinned contractor and never drops the pinned cruise. Output order follows
/// `original`.
pub fn derive_view(
    original: &MapDataView,
    predicates: &FilterPredicates,
    pinned: &PinnedSelection,
    lookups: &ReferenceLookups,
    gazetteer: &Gazetteer,
) -> Result<MapDataView, FilterError> {
    let type_name = predicates
        .contract_type_id
        .map(|id| {
            lookups
                .contract_type_name(id)
                .ok_or(FilterError::UnknownContractType(id))
        })
        .transpose()?;
    let status_name = predicates
        .contract_status_id
        .map(|id| {
            lookups
                .contract_status_name(id)
                .ok_or(FilterError::UnknownContractStatus(id))
        })
        .transpose()?;
    let location = predicates
        .location_id
        .as_deref()
        .map(|id| {
            gazetteer
                .get(id)
                .ok_or_else(|| FilterError::UnknownLocation(id.to_string()))
        })
        .transpose()?;

    let mut contractor_ids: HashSet<ContractorId> = original
        .contractors
        .iter()
        .filter(|node| predicates.contractor_id.map_or(true, |id| node.contractor.id == id))
        .filter(|node| type_name.map_or(true, |name| node.contract_type == name))
        .filter(|node| status_name.map_or(true, |name| node.contract_status == name))
        .filter(|node| {
            predicates
                .sponsoring_state
                .as_deref()
                .map_or(true, |state| node.contractor.sponsoring_state == state)
        })
        .filter(|node| {
            predicates
                .year
                .map_or(true, |year| node.contractor.contractual_year == year)
        })
        .filter(|node| location.map_or(true, |loc| contractor_in_location(node, &loc.bounds)))
        .map(|node| node.contractor.id)
        .collect();

    let mut cruise_ids: HashSet<CruiseId> = original
        .cruises
        .iter()
        .filter(|node| match pinned.contractor_id {
            Some(pinned_id) => node.cruise.contractor_id == pinned_id,
            None => contractor_ids.contains(&node.cruise.contractor_id),
        })
        .map(|node| node.cruise.id)
        .collect();

    if let Some(pinned_cruise) = pinned.cruise_id {
        if let Some(node) = original.cruise(pinned_cruise) {
            cruise_ids.insert(pinned_cruise);
            contractor_ids.insert(node.cruise.contractor_id);
        }
    }

    if let (Some(loc), None) = (location, pinned.contractor_id) {
        cruise_ids.retain(|id| {
            Some(*id) == pinned.cruise_id
                || original
                    .cruise(*id)
                    .is_some_and(|node| cruise_in_location(node, &loc.bounds))
        });
    }

    Ok(MapDataView {
        contractors: original
            .contractors
            .iter()
            .filter(|node| contractor_ids.contains(&node.contractor.id))
            .cloned()
            .collect(),
        cruises: original
            .cruises
            .iter()
            .filter(|node| cruise_ids.contains(&node.cruise.id))
            .cloned()
            .collect(),
    })
}

// ============================================================================
// Engine
// ============================================================================

/// Holds the cached baseline tree and the derived view.
#[derive(Debug)]
pub struct FilterEngine {
    original: Arc<MapDataView>,
    current: Arc<MapDataView>,
    predicates: FilterPredicates,
    pinned: PinnedSelection,
    lookups: Arc<ReferenceLookups>,
    gazetteer: Gazetteer,
    last_error: Option<FilterError>,
}

impl FilterEngine {
    /// Start from an unfiltered tree with no predicates or pins.
    pub fn new(original: Arc<MapDataView>, lookups: Arc<ReferenceLookups>, gazetteer: Gazetteer) -> Self {
        Self {
            current: Arc::clone(&original),
            original,
            predicates: FilterPredicates::default(),
            pinned: PinnedSelection::default(),
            lookups,
            gazetteer,
            last_error: None,
        }
    }

    /// Replace the predicate set and recompute.
    pub fn apply_filters(&mut self, predicates: FilterPredicates) -> Arc<MapDataView> {
        self.predicates = predicates;
        self.recompute()
    }

    /// Drop every predicate. Pins are kept.
    pub fn clear_filters(&mut self) -> Arc<MapDataView> {
        self.apply_filters(FilterPredicates::default())
    }

    /// Pin a contractor and/or cruise and recompute.
    pub fn set_pinned_selection(
        &mut self,
        contractor_id: Option<ContractorId>,
        cruise_id: Option<CruiseId>,
    ) -> Arc<MapDataView> {
        self.pinned = PinnedSelection {
            contractor_id,
            cruise_id,
        };
        self.recompute()
    }

    pub fn clear_pinned_selection(&mut self) -> Arc<MapDataView> {
        self.set_pinned_selection(None, None)
    }

    /// Install a freshly fetched baseline and lookups, clearing predicates
    /// and pins.
    pub fn reset(&mut self, fresh: Arc<MapDataView>, lookups: Arc<ReferenceLookups>) -> Arc<MapDataView> {
        debug!(
            "[filter] reset with {} contractors, {} cruises",
            fresh.contractors.len(),
            fresh.cruises.len()
        );
        self.original = fresh;
        self.lookups = lookups;
        self.predicates = FilterPredicates::default();
        self.pinned = PinnedSelection::default();
        self.last_error = None;
        self.current = Arc::clone(&self.original);
        self.current()
    }

    pub fn current(&self) -> Arc<MapDataView> {
        Arc::clone(&self.current)
    }

    pub fn original(&self) -> Arc<MapDataView> {
        Arc::clone(&self.original)
    }

    pub fn predicates(&self) -> &FilterPredicates {
        &self.predicates
    }

    pub fn pinned(&self) -> PinnedSelection {
        self.pinned
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    /// The error swallowed by the most recent recompute, if it failed.
    pub fn last_error(&self) -> Option<&FilterError> {
        self.last_error.as_ref()
    }

    fn recompute(&mut self) -> Arc<MapDataView> {
        if self.predicates.is_empty() {
            self.last_error = None;
            self.current = Arc::clone(&self.original);
            return self.current();
        }

        match derive_view(
            &self.original,
            &self.predicates,
            &self.pinned,
            &self.lookups,
            &self.gazetteer,
        ) {
            Ok(view) => {
                self.last_error = None;
                self.current = Arc::new(view);
            }
            Err(e) => {
                warn!("[filter] recompute failed, showing unfiltered data: {}", e);
                self.last_error = Some(e);
                self.current = Arc::clone(&self.original);
            }
        }
        self.current()
    }
}
