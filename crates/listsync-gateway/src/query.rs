//! Server-side semantics shared by the bundled backends.
//!
//! Both [`MemoryGateway`](crate::MemoryGateway) and
//! [`SqliteGateway`](crate::SqliteGateway) run the same helpers, so they
//! agree on id assignment, timestamps, patch merging and query evaluation.

use std::sync::atomic::{AtomicI64, Ordering};

use listsync_core::{matches_predicate, now_millis, Document, OrderKey, Predicate, RecordId};
use serde_json::Value;

/// Fields only the server may set.
pub const SERVER_FIELDS: [&str; 3] = ["id", "created_date", "updated_date"];

/// Wall clock that never repeats or goes backwards.
///
/// Two records created in the same millisecond still get distinct,
/// increasing `created_date` values, so ordering by creation is total.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp (Unix ms), strictly greater than the previous one.
    pub fn tick(&self) -> i64 {
        let now = now_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Generate a server record id: 32 hex chars.
pub fn new_server_id() -> RecordId {
    use rand::Rng;
    let bytes: [u8; 16] = rand::thread_rng().gen();
    RecordId::new(hex::encode(bytes))
}

/// Turn a draft into a stored document: strip client-supplied server fields,
/// then assign the id and both timestamps.
pub fn stamp_created(mut draft: Document, id: &RecordId, now: i64) -> Document {
    for field in SERVER_FIELDS {
        draft.remove(field);
    }
    draft.insert("id".into(), Value::String(id.to_string()));
    draft.insert("created_date".into(), Value::from(now));
    draft.insert("updated_date".into(), Value::from(now));
    draft
}

/// Shallow-merge a patch into a stored document and bump `updated_date`.
///
/// `id` and `created_date` in the patch are ignored.
pub fn merge_patch(stored: &mut Document, patch: Document, now: i64) {
    for (field, value) in patch {
        if SERVER_FIELDS.contains(&field.as_str()) {
            continue;
        }
        stored.insert(field, value);
    }
    stored.insert("updated_date".into(), Value::from(now));
}

/// Evaluate a query over candidate documents: predicate, then order, then
/// limit. Sorting is stable, so equal keys keep the candidates' order.
pub fn apply_query(
    candidates: impl IntoIterator<Item = Document>,
    predicate: &Predicate,
    order: Option<&OrderKey>,
    limit: Option<usize>,
) -> Vec<Document> {
    let mut docs: Vec<Document> = candidates
        .into_iter()
        .filter(|doc| matches_predicate(predicate, doc))
        .collect();

    if let Some(order) = order {
        docs.sort_by(|a, b| order.compare(a, b));
    }

    if let Some(limit) = limit {
        docs.truncate(limit);
    }

    docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_stamp_created_overrides_client_fields() {
        let id = RecordId::new("srv-1");
        let stored = stamp_created(doc(json!({ "id": "mine", "created_date": 1, "text": "hi" })), &id, 42);

        assert_eq!(stored.get("id"), Some(&json!("srv-1")));
        assert_eq!(stored.get("created_date"), Some(&json!(42)));
        assert_eq!(stored.get("updated_date"), Some(&json!(42)));
        assert_eq!(stored.get("text"), Some(&json!("hi")));
    }

    #[test]
    fn test_merge_patch_is_partial() {
        let mut stored = doc(json!({ "id": "a", "created_date": 1, "updated_date": 1, "qty": 2, "name": "tea" }));
        merge_patch(&mut stored, doc(json!({ "qty": 3, "id": "b", "created_date": 9 })), 7);

        assert_eq!(stored.get("qty"), Some(&json!(3)));
        assert_eq!(stored.get("name"), Some(&json!("tea")));
        assert_eq!(stored.get("id"), Some(&json!("a")));
        assert_eq!(stored.get("created_date"), Some(&json!(1)));
        assert_eq!(stored.get("updated_date"), Some(&json!(7)));
    }

    #[test]
    fn test_apply_query_orders_before_limit() {
        let docs = vec![
            doc(json!({ "id": "a", "circle": "x", "n": 1 })),
            doc(json!({ "id": "b", "circle": "y", "n": 2 })),
            doc(json!({ "id": "c", "circle": "x", "n": 3 })),
            doc(json!({ "id": "d", "circle": "x", "n": 4 })),
        ];
        let mut predicate = Predicate::new();
        predicate.insert("circle".into(), json!("x"));

        let result = apply_query(docs, &predicate, Some(&OrderKey::descending("n")), Some(2));
        let ids: Vec<_> = result.iter().map(|d| d["id"].clone()).collect();
        assert_eq!(ids, vec![json!("d"), json!("c")]);
    }

    #[test]
    fn test_clock_is_strictly_increasing() {
        let clock = MonotonicClock::new();
        let a = clock.tick();
        let b = clock.tick();
        let c = clock.tick();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_server_ids_are_hex() {
        let id = new_server_id();
        assert_eq!(id.as_str().len(), 32);
        assert!(!id.is_temporary());
        assert!(hex::decode(id.as_str()).is_ok());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn rows() -> impl Strategy<Value = Vec<Document>> {
            prop::collection::vec((0u8..3, 0i64..50), 0..30).prop_map(|rows| {
                rows.into_iter()
                    .enumerate()
                    .map(|(i, (group, n))| doc(json!({ "id": i.to_string(), "group": group, "n": n })))
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn query_result_is_filtered_sorted_and_capped(
                docs in rows(),
                group in 0u8..3,
                limit in prop::option::of(0usize..10),
                descending in any::<bool>(),
            ) {
                let mut predicate = Predicate::new();
                predicate.insert("group".into(), json!(group));
                let order = if descending {
                    OrderKey::descending("n")
                } else {
                    OrderKey::ascending("n")
                };

                let result = apply_query(docs.clone(), &predicate, Some(&order), limit);

                let matching = docs.iter().filter(|d| d["group"] == json!(group)).count();
                prop_assert_eq!(result.len(), limit.map_or(matching, |l| l.min(matching)));
                prop_assert!(result.iter().all(|d| d["group"] == json!(group)));
                prop_assert!(result
                    .windows(2)
                    .all(|w| order.compare(&w[0], &w[1]) != std::cmp::Ordering::Greater));
            }
        }
    }
}
