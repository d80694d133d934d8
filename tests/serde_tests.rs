#![cfg(feature = "serde")]

//! Integration tests for serde support in id-trie.

use id_trie::IdMap;
use rstest::rstest;

#[rstest]
fn test_id_map_json_roundtrip() {
    let map: IdMap<String> = [1, 33, 1000, u64::MAX]
        .into_iter()
        .map(|id| (id, format!("thing-{id}")))
        .collect();

    let json = serde_json::to_string(&map).unwrap();
    let restored: IdMap<String> = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.len(), 4);
    for (id, value) in &map {
        assert_eq!(restored.get(id), Some(value));
    }
}

#[rstest]
fn test_id_map_serializes_as_object() {
    let map: IdMap<i32> = [(7, 70)].into_iter().collect();
    assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"7":70}"#);
}

#[rstest]
fn test_empty_id_map_roundtrip() {
    let map: IdMap<i32> = IdMap::new();
    let json = serde_json::to_string(&map).unwrap();
    assert_eq!(json, "{}");

    let restored: IdMap<i32> = serde_json::from_str(&json).unwrap();
    assert!(restored.is_empty());
}

#[rstest]
fn test_duplicate_keys_keep_last_value() {
    let restored: IdMap<i32> = serde_json::from_str(r#"{"5":1,"5":2}"#).unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored.get(5), Some(&2));
}

#[rstest]
fn test_non_integer_key_is_rejected() {
    let result: Result<IdMap<i32>, _> = serde_json::from_str(r#"{"thing":1}"#);
    assert!(result.is_err());
}
