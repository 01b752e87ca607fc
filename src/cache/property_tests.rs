//! Property-Based Tests for the Map Primitive
//!
//! Model-checks `SyncMap` against a plain `HashMap` over arbitrary operation
//! sequences.

use proptest::prelude::*;
use std::collections::HashMap;

use crate::cache::SyncMap;

// == Strategies ==
/// Keys drawn from a small alphabet so sequences revisit the same slots.
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-d][0-9]?".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,32}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum MapOp {
    Store { key: String, value: String },
    Delete { key: String },
    LoadOrStore { key: String, value: String },
    Update { key: String, suffix: String },
    Clear,
}

fn map_op_strategy() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        4 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| MapOp::Store { key, value }),
        2 => key_strategy().prop_map(|key| MapOp::Delete { key }),
        2 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| MapOp::LoadOrStore { key, value }),
        2 => (key_strategy(), "[a-z]{1,4}")
            .prop_map(|(key, suffix)| MapOp::Update { key, suffix }),
        1 => Just(MapOp::Clear),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any operation sequence, SyncMap agrees with a HashMap model on
    // every load and on the final contents.
    #[test]
    fn prop_map_matches_model(ops in prop::collection::vec(map_op_strategy(), 1..60)) {
        let map = SyncMap::new();
        let mut model: HashMap<String, String> = HashMap::new();

        for op in ops {
            match op {
                MapOp::Store { key, value } => {
                    map.store(&key, value.clone());
                    if !key.is_empty() {
                        model.insert(key, value);
                    }
                }
                MapOp::Delete { key } => {
                    prop_assert_eq!(map.delete(&key), model.remove(&key));
                }
                MapOp::LoadOrStore { key, value } => {
                    let (got, found) = map.load_or_store(&key, value.clone());
                    match model.get(&key) {
                        Some(existing) => {
                            prop_assert!(found);
                            prop_assert_eq!(&got, existing);
                        }
                        None => {
                            prop_assert!(!found);
                            prop_assert_eq!(&got, &value);
                            if !key.is_empty() {
                                model.insert(key, value);
                            }
                        }
                    }
                }
                MapOp::Update { key, suffix } => {
                    let updated = map.update(&key, |v| v.push_str(&suffix));
                    prop_assert_eq!(updated, model.contains_key(&key));
                    if let Some(v) = model.get_mut(&key) {
                        v.push_str(&suffix);
                    }
                }
                MapOp::Clear => {
                    map.clear();
                    model.clear();
                }
            }

            prop_assert_eq!(map.len(), model.len());
        }

        prop_assert_eq!(map.snapshot(), model);
    }

    // Loads hand out copies: mutating a loaded value never changes the map.
    #[test]
    fn prop_load_is_deep_copy(key in "[a-z]{1,8}", value in value_strategy()) {
        let map = SyncMap::new();
        map.store(&key, value.clone());

        let mut loaded = map.load(&key).unwrap();
        loaded.push_str("-mutated");

        prop_assert_eq!(map.load(&key), Some(value));
    }

    // Store on an empty key is always a no-op.
    #[test]
    fn prop_empty_key_never_stored(value in value_strategy()) {
        let map = SyncMap::new();

        map.store("", value.clone());
        let (_, found) = map.load_or_store("", value);

        prop_assert!(!found);
        prop_assert_eq!(map.len(), 0);
    }
}
