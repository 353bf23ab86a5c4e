//! Integration tests for InMemoryStore

mod common;

use std::collections::HashSet;

use common::fixture_dataset;
use seabed::{EntitySource, InMemoryStore, SeabedError, StationWriter};

#[test]
fn test_load_keeps_storage_order() {
    let store = InMemoryStore::from_dataset(fixture_dataset()).unwrap();

    let block_ids: Vec<i64> = store.blocks().unwrap().iter().map(|b| b.id).collect();
    assert_eq!(block_ids, vec![101, 102, 103, 201, 202, 203, 301]);
    assert_eq!(store.station_count(), 7);
    assert_eq!(store.block_count(), 7);
    assert_eq!(store.snapshot(), fixture_dataset());
}

#[test]
fn test_rejects_duplicate_ids() {
    let mut data = fixture_dataset();
    let dup = data.stations[0].clone();
    data.stations.push(dup);

    let err = InMemoryStore::from_dataset(data).unwrap_err();
    assert!(matches!(
        err,
        SeabedError::DuplicateId {
            entity: "station",
            id: 1
        }
    ));
}

#[test]
fn test_rejects_orphans() {
    let mut data = fixture_dataset();
    data.blocks[0].area_id = 99;
    let err = InMemoryStore::from_dataset(data).unwrap_err();
    assert!(matches!(
        err,
        SeabedError::Integrity {
            entity: "block",
            id: 101,
            missing: "area",
            missing_id: 99
        }
    ));

    let mut data = fixture_dataset();
    data.areas[1].contractor_id = 42;
    assert!(InMemoryStore::from_dataset(data).is_err());

    let mut data = fixture_dataset();
    data.stations[0].block_id = Some(999);
    let err = InMemoryStore::from_dataset(data).unwrap_err();
    assert!(matches!(
        err,
        SeabedError::Integrity {
            missing: "block",
            missing_id: 999,
            ..
        }
    ));
}

#[test]
fn test_failed_replace_keeps_previous_data() {
    let store = InMemoryStore::from_dataset(fixture_dataset()).unwrap();
    let mut bad = fixture_dataset();
    bad.samples[0].station_id = 77;

    assert!(store.replace(bad).is_err());
    assert_eq!(store.snapshot(), fixture_dataset());
}

#[test]
fn test_joins() {
    let store = InMemoryStore::from_dataset(fixture_dataset()).unwrap();

    let cruises: HashSet<i64> = [1000, 1001].into_iter().collect();
    let stations = store.stations_for_cruises(&cruises).unwrap();
    let ids: Vec<i64> = stations.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 7]);

    let station_ids: HashSet<i64> = ids.into_iter().collect();
    let samples = store.samples_for_stations(&station_ids).unwrap();
    assert_eq!(samples.len(), 3);

    let sample_ids: HashSet<i64> = samples.iter().map(|s| s.id).collect();
    assert_eq!(store.media_for_samples(&sample_ids).unwrap().len(), 1);
    assert_eq!(store.env_results_for_samples(&sample_ids).unwrap().len(), 3);
    assert_eq!(store.geo_results_for_samples(&sample_ids).unwrap().len(), 3);

    let in_block = store.stations_in_block(201).unwrap();
    assert_eq!(in_block.len(), 1);
    assert_eq!(in_block[0].id, 6);
}

#[test]
fn test_save_station_blocks() {
    let store = InMemoryStore::from_dataset(fixture_dataset()).unwrap();

    let saved = store.save_station_blocks(&[(1, 101), (5, 201)]).unwrap();
    assert_eq!(saved, 2);
    assert_eq!(store.station(1).unwrap().block_id, Some(101));
    assert_eq!(store.station(5).unwrap().block_id, Some(201));
    assert_eq!(store.station(2).unwrap().block_id, None);
}

#[test]
fn test_save_station_blocks_is_all_or_nothing() {
    let store = InMemoryStore::from_dataset(fixture_dataset()).unwrap();
    let before = store.station_blocks();

    let err = store.save_station_blocks(&[(1, 101), (99, 101)]).unwrap_err();
    assert!(matches!(
        err,
        SeabedError::NotFound {
            entity: "station",
            id: 99
        }
    ));
    assert_eq!(store.station_blocks(), before);

    let err = store.save_station_blocks(&[(1, 101), (2, 555)]).unwrap_err();
    assert!(matches!(err, SeabedError::Integrity { missing_id: 555, .. }));
    assert_eq!(store.station_blocks(), before);
}
