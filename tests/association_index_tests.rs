// Association index integration tests
//
// Purpose: ranking guarantees over whole datasets, through the public API
// Run with: cargo test --test association_index_tests

use approx::assert_relative_eq;
use drug_effects_rust::{
    AssociationIndex, BytesSource, Dataset, DatasetStore, LoadState, QueryError, RankedEntry,
};
use serde_json::json;

fn dataset_from(value: serde_json::Value) -> Dataset {
    let bytes = serde_json::to_vec(&value).unwrap();
    Dataset::from_json_slice(&bytes, "fixture").unwrap()
}

fn names(entries: &[RankedEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

/// 40 drugs x 25 effects with repeating scores, some missing, some garbage
fn synthetic_dataset() -> Dataset {
    let mut records = Vec::new();
    for d in 0..40u32 {
        let mut effects = serde_json::Map::new();
        for e in 0..25u32 {
            let key = format!("Effect {}", e);
            match (d * 7 + e * 13) % 11 {
                // No recorded association
                0 => continue,
                1 => effects.insert(key, json!("n/a")),
                2 => effects.insert(key, json!(null)),
                r => effects.insert(key, json!(format!("{}", (r * (e + 1)) % 17))),
            };
        }
        records.push(json!({ "drugName": format!("Drug {}", d), "sideEffects": effects }));
    }
    dataset_from(serde_json::Value::Array(records))
}

// ============================================================================
// Section 1: Top effects per drug
// ============================================================================

#[test]
fn test_top_effects_bounded_sorted_and_scored() {
    let dataset = synthetic_dataset();
    let index = AssociationIndex::build(&dataset);

    for record in dataset.records() {
        for k in [1, 3, 5, 100] {
            let top = index.top_effects(&record.drug_name, k).unwrap();
            assert!(top.len() <= k);

            for pair in top.windows(2) {
                assert!(pair[0].score >= pair[1].score, "not sorted: {:?}", pair);
            }

            // Only effects with a numeric score in the record
            for entry in top {
                let raw = &record.side_effects[&entry.name];
                let parsed: f64 = raw.as_str().unwrap().parse().unwrap();
                assert_relative_eq!(parsed, entry.score);
            }
        }
    }
}

#[test]
fn test_unparseable_score_never_ranked() {
    let dataset = dataset_from(json!([
        {"drugName": "X", "sideEffects": {"nausea": "n/a", "fatigue": "3.2"}}
    ]));
    let index = AssociationIndex::build(&dataset);

    let top = index.top_effects("X", 5).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].name, "fatigue");
    assert_relative_eq!(top[0].score, 3.2);
}

#[test]
fn test_unknown_drug_not_found() {
    let index = AssociationIndex::build(&synthetic_dataset());

    assert!(matches!(
        index.top_effects("Unobtainium", 5),
        Err(QueryError::DrugNotFound(name)) if name == "Unobtainium"
    ));
}

#[test]
fn test_fewer_than_k_effects() {
    let dataset = dataset_from(json!([
        {"drugName": "A", "sideEffects": {"Rash": "1", "Acne": "2"}}
    ]));
    let index = AssociationIndex::build(&dataset);

    assert_eq!(names(index.top_effects("A", 5).unwrap()), vec!["Acne", "Rash"]);
}

#[test]
fn test_effect_ties_keep_mapping_order() {
    let dataset = dataset_from(json!([
        {"drugName": "A", "sideEffects": {"Zoster": "4", "Acne": "4", "Rash": "9", "Itch": "4"}}
    ]));
    let index = AssociationIndex::build(&dataset);

    assert_eq!(
        names(index.top_effects("A", 5).unwrap()),
        vec!["Rash", "Zoster", "Acne", "Itch"]
    );
}

// ============================================================================
// Section 2: Drug rankings per effect
// ============================================================================

#[test]
fn test_top_and_bottom_for_headache() {
    let dataset = dataset_from(json!([
        {"drugName": "A", "sideEffects": {"headache": "5"}},
        {"drugName": "B", "sideEffects": {"headache": "2"}},
        {"drugName": "C", "sideEffects": {"headache": "8"}}
    ]));
    let index = AssociationIndex::build(&dataset);

    let ranking = index.ranked_drugs_for_effect("headache", 1);
    assert_eq!(
        ranking.top,
        vec![RankedEntry { name: "C".to_string(), score: 8.0 }]
    );
    assert_eq!(
        ranking.bottom,
        vec![RankedEntry { name: "B".to_string(), score: 2.0 }]
    );
}

#[test]
fn test_single_drug_effect_overlaps() {
    let dataset = dataset_from(json!([
        {"drugName": "A", "sideEffects": {"Hiccups": "3"}},
        {"drugName": "B", "sideEffects": {"Rash": "1"}}
    ]));
    let index = AssociationIndex::build(&dataset);

    let ranking = index.ranked_drugs_for_effect("Hiccups", 3);
    assert_eq!(ranking.top.len(), 1);
    assert_eq!(ranking.bottom, ranking.top);
}

#[test]
fn test_overlap_is_not_deduplicated() {
    let dataset = dataset_from(json!([
        {"drugName": "A", "sideEffects": {"Rash": "3"}},
        {"drugName": "B", "sideEffects": {"Rash": "2"}},
        {"drugName": "C", "sideEffects": {"Rash": "1"}}
    ]));
    let index = AssociationIndex::build(&dataset);

    let ranking = index.ranked_drugs_for_effect("Rash", 2);
    assert_eq!(names(&ranking.top), vec!["A", "B"]);
    assert_eq!(names(&ranking.bottom), vec!["C", "B"]);
}

#[test]
fn test_drug_ties_keep_dataset_order() {
    let dataset = dataset_from(json!([
        {"drugName": "Zeta", "sideEffects": {"Rash": "5"}},
        {"drugName": "Alpha", "sideEffects": {"Rash": "5"}},
        {"drugName": "Mid", "sideEffects": {"Rash": "1"}}
    ]));
    let index = AssociationIndex::build(&dataset);

    let ranking = index.ranked_drugs_for_effect("Rash", 3);
    assert_eq!(names(&ranking.top), vec!["Zeta", "Alpha", "Mid"]);
    assert_eq!(names(&ranking.bottom), vec!["Mid", "Alpha", "Zeta"]);
}

#[test]
fn test_top_starts_with_maximum() {
    let index = AssociationIndex::build(&synthetic_dataset());

    for effect in index.effect_catalog() {
        let ranking = index.ranked_drugs_for_effect(effect, 4);
        if let Some(first) = ranking.top.first() {
            assert!(ranking.top.iter().all(|e| first.score >= e.score));
        }
        if let Some(lowest) = ranking.bottom.first() {
            assert!(ranking.bottom.iter().all(|e| lowest.score <= e.score));
        }
    }
}

#[test]
fn test_unknown_or_unscored_effect_is_empty() {
    let dataset = dataset_from(json!([
        {"drugName": "A", "sideEffects": {"Nausea": "unknown", "Rash": "1"}}
    ]));
    let index = AssociationIndex::build(&dataset);

    assert!(index.ranked_drugs_for_effect("Vertigo", 3).is_empty());
    assert!(index.ranked_drugs_for_effect("Nausea", 3).is_empty());
    assert!(index.is_known_effect("Nausea"));
}

#[test]
fn test_zero_score_is_ranked() {
    let dataset = dataset_from(json!([
        {"drugName": "A", "sideEffects": {"Rash": "0"}},
        {"drugName": "B", "sideEffects": {"Rash": "2"}}
    ]));
    let index = AssociationIndex::build(&dataset);

    let ranking = index.ranked_drugs_for_effect("Rash", 1);
    assert_eq!(names(&ranking.bottom), vec!["A"]);
}

// ============================================================================
// Section 3: Determinism and lifecycle
// ============================================================================

#[test]
fn test_rebuild_is_identical() {
    let dataset = synthetic_dataset();
    let first = AssociationIndex::build(&dataset);
    let second = AssociationIndex::build(&dataset);

    assert_eq!(first, second);
    assert_eq!(first.effect_catalog(), second.effect_catalog());
    for effect in first.effect_catalog() {
        assert_eq!(
            first.ranked_drugs_for_effect(effect, 3),
            second.ranked_drugs_for_effect(effect, 3)
        );
    }
}

#[test]
fn test_catalog_is_first_seen_union() {
    let dataset = dataset_from(json!([
        {"drugName": "A", "sideEffects": {"Rash": "1", "Acne": "x"}},
        {"drugName": "B", "sideEffects": {"Nausea": "2", "Rash": "3"}}
    ]));
    let index = AssociationIndex::build(&dataset);

    assert_eq!(index.effect_catalog(), &["Rash", "Acne", "Nausea"]);
}

#[test]
fn test_store_serves_queries_after_load() {
    let payload = r#"[{"drugName": "Zoloft", "sideEffects": {"Nausea": "6", "Insomnia": "4"}}]"#;

    let mut store = DatasetStore::new();
    assert!(store.index().is_none());

    store.load(&BytesSource::new("fixture", payload)).unwrap();
    assert!(matches!(store.state(), LoadState::Ready(_)));

    let index = store.index().unwrap();
    assert_eq!(names(index.top_effects("zoloft", 1).unwrap()), vec!["Nausea"]);
    assert_eq!(store.dataset().unwrap().find_drug("ZOLOFT").unwrap().drug_name, "Zoloft");
}

#[test]
fn test_store_surfaces_malformed_payload() {
    let mut store = DatasetStore::new();
    let err = store
        .load(&BytesSource::new("fixture", r#"{"not": "an array"}"#))
        .unwrap_err();

    assert_eq!(err.origin(), "fixture");
    assert!(matches!(store.state(), LoadState::Failed(_)));
    assert!(store.dataset().is_none());
}

#[test]
fn test_concurrent_readers_share_index() {
    let index = std::sync::Arc::new(AssociationIndex::build(&synthetic_dataset()));
    let expected = index.ranked_drugs_for_effect("Effect 3", 3);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let index = std::sync::Arc::clone(&index);
            std::thread::spawn(move || index.ranked_drugs_for_effect("Effect 3", 3))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
