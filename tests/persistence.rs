//! Tests for the SQLite entity store

#![cfg(feature = "persistence")]

mod common;

use std::sync::Arc;

use common::fixture_dataset;
use seabed::{EntitySource, MapFilter, SeabedEngine, SqliteEntityStore};

#[test]
fn test_round_trip_in_memory() {
    let store = SqliteEntityStore::in_memory().unwrap();
    store.import(&fixture_dataset()).unwrap();
    assert_eq!(store.export().unwrap(), fixture_dataset());
}

#[test]
fn test_reimport_replaces_everything() {
    let store = SqliteEntityStore::in_memory().unwrap();
    store.import(&fixture_dataset()).unwrap();

    let mut smaller = fixture_dataset();
    smaller.media.clear();
    smaller.stations.retain(|s| s.id != 4);
    store.import(&smaller).unwrap();

    assert_eq!(store.media().unwrap().len(), 0);
    assert_eq!(store.stations().unwrap().len(), 6);
}

#[test]
fn test_association_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seabed.db");

    {
        let store = Arc::new(SqliteEntityStore::open(&path).unwrap());
        store.import(&fixture_dataset()).unwrap();

        let engine = SeabedEngine::new(Arc::clone(&store));
        let report = engine.associate_all_stations_report().unwrap();
        assert_eq!(report.stations_matched, 6);
        assert_eq!(report.updates_saved, 5);
    }

    // Reopen and read the persisted assignments
    let store = Arc::new(SqliteEntityStore::open(&path).unwrap());
    let assignments: Vec<(i64, Option<i64>)> = store
        .stations()
        .unwrap()
        .iter()
        .map(|s| (s.id, s.block_id))
        .collect();
    assert_eq!(
        assignments,
        vec![
            (1, Some(101)),
            (2, Some(102)),
            (3, Some(101)),
            (4, None),
            (5, Some(201)),
            (6, Some(201)),
            (7, Some(103)),
        ]
    );

    // Same tree as the in-memory store
    let engine = SeabedEngine::new(store);
    let tree = engine.get_filtered_tree(&MapFilter::default()).unwrap();
    assert_eq!(tree.contractor_ids(), vec![1, 2, 3]);
    assert_eq!(tree.cruise_ids(), vec![1000, 1001, 1002, 2000, 3000]);

    let analytics = engine.get_block_analytics(101).unwrap().unwrap();
    assert_eq!(analytics.counts.stations, 2);
    assert_eq!(analytics.counts.samples, 3);
}
