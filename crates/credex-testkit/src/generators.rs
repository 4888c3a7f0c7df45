//! Proptest strategies for property-based testing.

use credex_core::GroupType;
use proptest::prelude::*;

/// A plausible subject identifier.
pub fn subject_id() -> impl Strategy<Value = String> {
    "[a-z]{2,8}-[0-9]{1,3}"
}

/// A plausible subject code.
pub fn subject_code() -> impl Strategy<Value = String> {
    "[A-Z]{2,4}[0-9]{3}"
}

/// A percent string anywhere in [0.00, 100.00].
pub fn percent_string() -> impl Strategy<Value = String> {
    (0u32..=10_000).prop_map(|n| format!("{}.{:02}", n / 100, n % 100))
}

/// Any group type.
pub fn group_type() -> impl Strategy<Value = GroupType> {
    prop_oneof![
        Just(GroupType::All),
        Just(GroupType::Any),
        Just(GroupType::Credits),
    ]
}

/// A small free-form metadata payload.
pub fn metadata_value() -> impl Strategy<Value = serde_json::Value> {
    (
        "[a-z_]{3,16}",
        0u32..=10_000,
        proptest::collection::vec("[a-z]{1,8}", 0..4),
    )
        .prop_map(|(method, score, tags)| {
            serde_json::json!({
                "analysis_method": method,
                "similarity_score": score as f64 / 100.0,
                "tags": tags,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use credex_core::{analysis_digest, Percent, Record};
    use credex_core::EquivalenceRecord;
    use credex_store::{MemoryStore, PageRequest, RecordStore};

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime builds")
    }

    proptest! {
        #[test]
        fn percent_normalization_is_idempotent(s in percent_string()) {
            let once = Percent::parse(&s).unwrap();
            let twice = Percent::parse(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn digest_is_deterministic(
            metadata in metadata_value(),
            percent in percent_string(),
            contract in "[a-z0-9]{8,16}",
        ) {
            let d1 = analysis_digest(&metadata, &percent, &contract);
            let d2 = analysis_digest(&metadata, &percent, &contract);
            prop_assert_eq!(d1, d2);
            prop_assert_eq!(d1.to_hex().len(), 64);
        }

        #[test]
        fn appended_indexes_are_unique_and_increasing(
            pairs in proptest::collection::vec((subject_id(), subject_id()), 1..20)
        ) {
            let rt = runtime();
            rt.block_on(async {
                let store = MemoryStore::new();
                let mut previous = 0u64;
                for (source, target) in &pairs {
                    let record = EquivalenceRecord::new_request(
                        source.clone(),
                        format!("{target}-t"),
                        "inst1",
                        0,
                    );
                    let stored = store.append(record).await.unwrap();
                    let value: u64 = stored.index().parse().unwrap();
                    assert!(value > previous, "indexes must strictly increase");
                    previous = value;
                }
            });
        }

        #[test]
        fn pagination_walk_is_complete(
            total in 1usize..60,
            page_size in 1u64..10,
        ) {
            let rt = runtime();
            rt.block_on(async {
                let store = MemoryStore::new();
                for i in 0..total {
                    let record = EquivalenceRecord::new_request(
                        format!("s{i}"),
                        "target",
                        "inst1",
                        0,
                    );
                    store.append(record).await.unwrap();
                }

                let mut seen = Vec::new();
                let mut page = PageRequest::with_limit(page_size);
                loop {
                    let (records, info) = store
                        .list_by_prefix::<EquivalenceRecord>("target", "target", &page)
                        .await
                        .unwrap();
                    assert_eq!(info.total as usize, total);
                    seen.extend(records.into_iter().map(|r| r.index));
                    match info.next_cursor {
                        Some(cursor) => page = PageRequest::from_cursor(cursor, page_size),
                        None => break,
                    }
                }

                seen.sort();
                seen.dedup();
                assert_eq!(seen.len(), total, "no duplicates, no omissions");
            });
        }
    }
}
