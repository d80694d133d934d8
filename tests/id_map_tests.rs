//! Unit tests for IdMap point operations, traversal and id allocation.

use std::ops::ControlFlow;
use std::rc::Rc;

use id_trie::{IdMap, IdMapError};
use rstest::{fixture, rstest};

#[fixture]
fn thousand() -> IdMap<u64> {
    (0..1000).map(|id| (id, id * 2)).collect()
}

fn sorted_keys<V>(map: &IdMap<V>) -> Vec<u64> {
    let mut keys: Vec<u64> = map.keys().collect();
    keys.sort_unstable();
    keys
}

// =============================================================================
// Construction
// =============================================================================

#[rstest]
fn test_new_creates_empty_map() {
    let map: IdMap<i32> = IdMap::new();
    assert!(map.is_empty());
    assert_eq!(map.len(), 0);
    assert_eq!(map.iter().next(), None);
}

#[rstest]
fn test_default_and_try_new_create_empty_maps() {
    let default: IdMap<i32> = IdMap::default();
    let fallible: IdMap<i32> = IdMap::try_new().unwrap();
    assert!(default.is_empty());
    assert!(fallible.is_empty());
}

#[rstest]
fn test_drop_releases_every_value() {
    let object = Rc::new(0);
    let mut map = IdMap::new();
    for id in [0, 31, 32, 1000, u64::MAX] {
        map.set(id, Rc::clone(&object)).unwrap();
    }
    assert_eq!(Rc::strong_count(&object), 6);

    drop(map);
    assert_eq!(Rc::strong_count(&object), 1);
}

#[rstest]
fn test_destroy_with_hands_out_every_value(thousand: IdMap<u64>) {
    let mut destroyed = Vec::new();
    thousand.destroy_with(|value| destroyed.push(value));

    destroyed.sort_unstable();
    assert_eq!(destroyed, (0..1000).map(|id| id * 2).collect::<Vec<_>>());
}

#[rstest]
fn test_clear_allows_reuse(mut thousand: IdMap<u64>) {
    let mut calls = 0;
    thousand.clear_with(|_| calls += 1);
    assert_eq!(calls, 1000);
    assert!(thousand.is_empty());
    assert_eq!(thousand.get(500), None);

    thousand.set(500, 1).unwrap();
    assert_eq!(thousand.len(), 1);
    thousand.clear();
    assert!(thousand.is_empty());
}

// =============================================================================
// Point operations
// =============================================================================

#[rstest]
#[case(0)]
#[case(31)]
#[case(32)]
#[case(33)]
#[case(1023)]
#[case(1024 + 32)]
#[case(u64::from(u32::MAX))]
#[case(u64::MAX)]
fn test_set_then_get(#[case] id: u64) {
    let mut map = IdMap::new();
    assert_eq!(map.set(id, "value").unwrap(), None);
    assert_eq!(map.get(id), Some(&"value"));
    assert!(map.contains_key(id));
    assert_eq!(map.len(), 1);
    assert_eq!(map.keys().collect::<Vec<_>>(), vec![id]);
}

#[rstest]
fn test_set_replaces_and_returns_previous() {
    let mut map = IdMap::new();
    map.set(1000, 1).unwrap();
    assert_eq!(map.set(1000, 2).unwrap(), Some(1));
    assert_eq!(map.get(1000), Some(&2));
    assert_eq!(map.len(), 1);
}

#[rstest]
fn test_add_rejects_occupied_id() {
    let mut map = IdMap::new();
    map.add(65, "first").unwrap();

    let error = map.add(65, "second").unwrap_err();
    assert_eq!(error.error(), IdMapError::KeyExists);
    assert_eq!(error.value(), &"second");
    assert_eq!(map.get(65), Some(&"first"));
    assert_eq!(map.len(), 1);
}

#[rstest]
fn test_get_missing_id_returns_none(thousand: IdMap<u64>) {
    assert_eq!(thousand.get(1000), None);
    assert_eq!(thousand.get(u64::MAX), None);
    assert!(!thousand.contains_key(5000));
}

#[rstest]
fn test_get_mut_updates_in_place(mut thousand: IdMap<u64>) {
    if let Some(value) = thousand.get_mut(777) {
        *value = 0;
    }
    assert_eq!(thousand.get(777), Some(&0));
    assert_eq!(thousand.get_mut(5000), None);
}

#[rstest]
fn test_pop_removes_value(mut thousand: IdMap<u64>) {
    assert_eq!(thousand.pop(999), Some(1998));
    assert_eq!(thousand.pop(999), None);
    assert_eq!(thousand.get(999), None);
    assert_eq!(thousand.len(), 999);
}

#[rstest]
fn test_count_tracks_interleaved_operations() {
    let mut map = IdMap::new();
    let mut present = std::collections::BTreeSet::new();

    for step in 0u64..3000 {
        let id = (step * 7919) % 1500;
        if step % 3 == 0 {
            assert_eq!(map.pop(id).is_some(), present.remove(&id));
        } else if step % 3 == 1 {
            map.set(id, step).unwrap();
            present.insert(id);
            assert_eq!(map.get(id), Some(&step));
        } else {
            let added = map.add(id, step).is_ok();
            assert_eq!(added, present.insert(id));
        }
        assert_eq!(map.len(), present.len());
    }
    assert_eq!(sorted_keys(&map), present.into_iter().collect::<Vec<_>>());
}

#[rstest]
fn test_pop_everything_leaves_nothing_to_walk(mut thousand: IdMap<u64>) {
    for id in 0..1000 {
        thousand.pop(id);
    }
    assert!(thousand.is_empty());

    let mut calls = 0;
    let _ = thousand.walk(|_| -> ControlFlow<()> {
        calls += 1;
        ControlFlow::Continue(())
    });
    assert_eq!(calls, 0);
}

// =============================================================================
// Traversal
// =============================================================================

#[rstest]
fn test_walk_visits_every_value(thousand: IdMap<u64>) {
    let mut total = 0;
    let flow = thousand.walk(|value| -> ControlFlow<()> {
        total += value;
        ControlFlow::Continue(())
    });

    assert_eq!(flow, ControlFlow::Continue(()));
    assert_eq!(total, (0..1000).map(|id| id * 2).sum::<u64>());
}

#[rstest]
fn test_walk_stops_at_break(thousand: IdMap<u64>) {
    let mut calls = 0;
    let flow = thousand.walk(|_| {
        calls += 1;
        if calls == 10 {
            ControlFlow::Break("stopped")
        } else {
            ControlFlow::Continue(())
        }
    });

    assert_eq!(flow, ControlFlow::Break("stopped"));
    assert_eq!(calls, 10);
}

#[rstest]
fn test_walk_order_matches_iter(thousand: IdMap<u64>) {
    let mut walked = Vec::new();
    let _ = thousand.walk(|value| -> ControlFlow<()> {
        walked.push(value);
        ControlFlow::Continue(())
    });

    assert_eq!(walked, thousand.values().collect::<Vec<_>>());
}

#[rstest]
fn test_walk_order_is_digit_order() {
    let map: IdMap<u64> = [1000, 33, 1, 65, 2].into_iter().map(|id| (id, id)).collect();
    assert_eq!(map.keys().collect::<Vec<_>>(), vec![1, 33, 65, 2, 1000]);
}

#[rstest]
fn test_walk_mut_rewrites_values(mut thousand: IdMap<u64>) {
    let _ = thousand.walk_mut(|value| -> ControlFlow<()> {
        *value += 1;
        ControlFlow::Continue(())
    });
    assert_eq!(thousand.get(0), Some(&1));
    assert_eq!(thousand.get(999), Some(&1999));
}

#[rstest]
#[case(0, 0)]
#[case(1, 1)]
#[case(10, 10)]
#[case(5000, 1000)]
fn test_walkn_stops_when_budget_is_spent(
    thousand: IdMap<u64>,
    #[case] budget: usize,
    #[case] expected_calls: usize,
) {
    let mut remaining = budget;
    let mut calls = 0;
    thousand.walkn(&mut remaining, |_| {
        calls += 1;
        1
    });

    assert_eq!(calls, expected_calls);
    assert_eq!(remaining, budget - expected_calls);
}

#[rstest]
fn test_walkn_saturates_large_costs(thousand: IdMap<u64>) {
    let mut remaining = 3;
    let mut calls = 0;
    thousand.walkn(&mut remaining, |_| {
        calls += 1;
        usize::MAX
    });
    assert_eq!(calls, 1);
    assert_eq!(remaining, 0);
}

#[rstest]
fn test_iter_reconstructs_ids(thousand: IdMap<u64>) {
    assert_eq!(thousand.iter().len(), 1000);
    for (id, value) in &thousand {
        assert_eq!(*value, id * 2);
    }
    assert_eq!(sorted_keys(&thousand), (0..1000).collect::<Vec<_>>());
}

#[rstest]
fn test_iter_reconstructs_sparse_large_ids() {
    let ids = [u64::MAX, u64::MAX / 3, 1 << 40, (1 << 40) + 1, 12_345_678_901];
    let map: IdMap<u64> = ids.into_iter().map(|id| (id, id)).collect();

    for (id, value) in &map {
        assert_eq!(id, *value);
    }
    let mut expected = ids.to_vec();
    expected.sort_unstable();
    assert_eq!(sorted_keys(&map), expected);
}

#[rstest]
fn test_to_vec_follows_walk_order(thousand: IdMap<u64>) {
    let values = thousand.to_vec().unwrap();
    assert_eq!(values.len(), 1000);
    assert_eq!(values, thousand.values().collect::<Vec<_>>());
}

#[rstest]
fn test_to_vec_with_refs_survives_mutation() {
    let objects: Vec<Rc<u64>> = (0..100).map(Rc::new).collect();
    let mut map = IdMap::new();
    for (id, object) in (0..).zip(&objects) {
        map.set(id, Rc::clone(object)).unwrap();
    }

    let snapshot = map.to_vec_with_refs().unwrap();
    assert_eq!(Rc::strong_count(&objects[50]), 3);

    for value in &snapshot {
        map.pop(**value);
        map.pop(99 - **value);
    }
    assert!(map.is_empty());
    assert_eq!(snapshot.len(), 100);

    drop(snapshot);
    assert!(objects.iter().all(|object| Rc::strong_count(object) == 1));
}

#[rstest]
fn test_debug_lists_entries() {
    let map: IdMap<&str> = [(1, "one")].into_iter().collect();
    assert_eq!(format!("{map:?}"), r#"{1: "one"}"#);
}

// =============================================================================
// Structural equality
// =============================================================================

#[rstest]
fn test_structural_eq_compares_identity() {
    let objects: Vec<Rc<u64>> = (0..64).map(Rc::new).collect();
    let build = |ids: &[usize]| -> IdMap<Rc<u64>> {
        ids.iter()
            .map(|&id| (id as u64, Rc::clone(&objects[id])))
            .collect()
    };

    let left = build(&[1, 33, 2]);
    let right = build(&[2, 33, 1]);
    assert!(left.structural_eq(&right));
    assert_eq!(left, right);

    let other = build(&[1, 33]);
    assert_ne!(left, other);

    let mut copies = IdMap::new();
    for id in [1, 33, 2] {
        copies.set(id, Rc::new(id)).unwrap();
    }
    assert_ne!(left, copies);
}

#[rstest]
fn test_structural_eq_ignores_node_shape() {
    let object = Rc::new(0);
    let mut single = IdMap::new();
    single.set(33, Rc::clone(&object)).unwrap();

    let mut dense = IdMap::new();
    dense.set(33, Rc::clone(&object)).unwrap();
    dense.set(65, Rc::new(1)).unwrap();
    dense.pop(65);

    assert_eq!(single, dense);
}

// =============================================================================
// unused_id
// =============================================================================

#[rstest]
fn test_unused_id_of_empty_map_is_zero() {
    let map: IdMap<()> = IdMap::new();
    assert_eq!(map.unused_id(100), 0);
}

#[rstest]
fn test_unused_id_prefers_top_level_slots() {
    let map: IdMap<()> = [0, 1, 2, 4].into_iter().map(|id| (id, ())).collect();
    assert_eq!(map.unused_id(100), 3);
}

#[rstest]
#[case(32)]
#[case(64)]
#[case(1056)]
#[case(5000)]
fn test_unused_id_is_free_and_below_max(#[case] populated: u64) {
    let mut map: IdMap<()> = (0..populated).map(|id| (id, ())).collect();
    let max = populated + 10;

    let id = map.unused_id(max);
    assert!(id < max);
    assert!(!map.contains_key(id));

    map.pop(populated / 2);
    let id = map.unused_id(populated);
    assert_eq!(id, populated / 2);
}

#[rstest]
fn test_unused_id_returns_max_when_full() {
    let map: IdMap<()> = (0..100).map(|id| (id, ())).collect();
    assert_eq!(map.unused_id(100), 100);
    assert_eq!(map.unused_id(40), 40);
}
