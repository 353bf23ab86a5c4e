//! Integration tests for BlockIndex

use seabed::engine::{BlockEnvelope, BlockIndex};
use seabed::Bounds;

fn setup_index() -> BlockIndex {
    BlockIndex::build(vec![
        BlockEnvelope::new(101, 0, &Bounds::new(10.0, 12.0, -132.0, -130.0)),
        BlockEnvelope::new(102, 1, &Bounds::new(10.0, 12.0, -130.0, -128.0)),
        BlockEnvelope::new(103, 2, &Bounds::new(11.0, 13.0, -131.0, -129.0)),
        BlockEnvelope::new(201, 3, &Bounds::new(-11.0, -9.0, 74.0, 76.0)),
    ])
}

#[test]
fn test_build() {
    let index = setup_index();
    assert_eq!(index.len(), 4);
    assert!(!index.is_empty());
    assert!(BlockIndex::new().is_empty());
}

#[test]
fn test_candidates_at_point() {
    let index = setup_index();

    let mut ids: Vec<i64> = index
        .candidates_at(11.5, -130.5)
        .into_iter()
        .map(|e| e.block_id)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![101, 103]);

    let ids: Vec<i64> = index
        .candidates_at(-10.0, 75.0)
        .into_iter()
        .map(|e| e.block_id)
        .collect();
    assert_eq!(ids, vec![201]);

    assert!(index.candidates_at(0.0, 0.0).is_empty());
}

#[test]
fn test_query_viewport_in_storage_order() {
    let index = setup_index();
    let results = index.query_viewport(&Bounds::new(10.5, 12.5, -131.5, -128.5));
    assert_eq!(results, vec![101, 102, 103]);
}

#[test]
fn test_query_viewport_empty() {
    let index = setup_index();
    let results = index.query_viewport(&Bounds::new(40.0, 50.0, 0.0, 10.0));
    assert!(results.is_empty());
}
