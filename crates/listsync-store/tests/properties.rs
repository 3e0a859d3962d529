//! Property tests: arbitrary workloads against a gateway that fails on
//! demand.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use listsync_core::{Criteria, RecordId};
use listsync_gateway::{GatewayError, MemoryGateway};
use listsync_store::{verify_convergence, StoreConfig, StoreView, SyncStore};
use listsync_testkit::generators::store_ops;
use listsync_testkit::{
    cart_row, CartItem, CartItemPatch, FlakyGateway, Message, MessagePatch, ScriptedGateway,
    StoreOp,
};

type Gateway = Arc<FlakyGateway<MemoryGateway>>;

fn assert_unique(view: &StoreView<Message>) -> Result<(), TestCaseError> {
    let ids: HashSet<_> = view.records.iter().map(|r| r.id.clone()).collect();
    prop_assert_eq!(ids.len(), view.records.len(), "duplicate ids in {:?}", view.ids());
    Ok(())
}

async fn apply(store: &SyncStore<Message, Gateway>, gateway: &Gateway, op: StoreOp) {
    let records = store.records();
    // Results are ignored: failures are expected and rolled back.
    match op {
        StoreOp::Insert { text } => {
            let _ = store.insert_optimistic(Message::new(text)).await;
        }
        StoreOp::Update { target, text } if !records.is_empty() => {
            let id = &records[target % records.len()].id;
            let _ = store.update_optimistic(id, MessagePatch::text(text)).await;
        }
        StoreOp::Delete { target } if !records.is_empty() => {
            let id = &records[target % records.len()].id;
            let _ = store.delete_optimistic(id).await;
        }
        StoreOp::Refresh => {
            let _ = store.refresh().await;
        }
        StoreOp::FailNext(operation) => gateway.fail_next(operation, 1),
        StoreOp::Update { .. } | StoreOp::Delete { .. } => {}
    }
}

/// One mutation held open against a seeded list.
#[derive(Debug, Clone)]
struct Step {
    index: usize,
    delete: bool,
    confirm: bool,
}

/// A list length, mutations on distinct rows in issue order, and the order
/// in which their gateway calls settle.
fn overlapping_plan() -> impl Strategy<Value = (usize, Vec<Step>, Vec<usize>)> {
    (2usize..8).prop_flat_map(|len| {
        proptest::sample::subsequence((0..len).collect::<Vec<_>>(), 1..=len)
            .prop_shuffle()
            .prop_flat_map(|targets| {
                let n = targets.len();
                (
                    Just(targets),
                    proptest::collection::vec((any::<bool>(), any::<bool>()), n),
                    Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
                )
            })
            .prop_map(move |(targets, kinds, settle_order)| {
                let steps = targets
                    .into_iter()
                    .zip(kinds)
                    .map(|(index, (delete, confirm))| Step {
                        index,
                        delete,
                        confirm,
                    })
                    .collect();
                (len, steps, settle_order)
            })
    })
}

fn row_id(index: usize) -> String {
    format!("r{}", index)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sequential_workload_stays_unique_and_converged(ops in store_ops(24)) {
        runtime().block_on(async {
            let gateway: Gateway = Arc::new(FlakyGateway::new(MemoryGateway::new()));
            let store = SyncStore::new(gateway.clone(), StoreConfig::manual());
            store.initialize(Criteria::all()).await;

            for op in ops {
                apply(&store, &gateway, op).await;

                let view = store.snapshot();
                assert_unique(&view)?;
                prop_assert!(view.pending.is_empty());

                // Every settled mutation, confirmed or rolled back, leaves the
                // store matching the server.
                let result = verify_convergence(&store, gateway.inner()).await.unwrap();
                prop_assert!(result.is_converged(), "{:?}", result);
            }
            Ok(())
        })?;
    }

    #[test]
    fn concurrent_workload_stays_unique(ops in store_ops(24)) {
        runtime().block_on(async {
            let gateway: Gateway = Arc::new(FlakyGateway::new(MemoryGateway::new()));
            let store = SyncStore::new(gateway.clone(), StoreConfig::manual());
            store.initialize(Criteria::all()).await;

            for batch in ops.chunks(4) {
                let mut tasks = Vec::new();
                for op in batch.iter().cloned() {
                    let store = store.clone();
                    let gateway = gateway.clone();
                    tasks.push(tokio::spawn(async move { apply(&store, &gateway, op).await }));
                }
                for task in tasks {
                    task.await.unwrap();
                }
                assert_unique(&store.snapshot())?;
            }

            // Once everything settles, one successful refresh converges.
            while store.refresh().await.is_err() {}
            prop_assert_eq!(store.pending_count(), 0);
            let result = verify_convergence(&store, gateway.inner()).await.unwrap();
            prop_assert!(result.is_converged(), "{:?}", result);
            Ok(())
        })?;
    }

    #[test]
    fn overlapping_mutations_settle_in_place((len, steps, settle_order) in overlapping_plan()) {
        runtime().block_on(async {
            let (gateway, mut calls) = ScriptedGateway::new();
            let store: SyncStore<CartItem, ScriptedGateway> =
                SyncStore::new(gateway, StoreConfig::manual());
            let init = tokio::spawn({
                let store = store.clone();
                async move { store.initialize(Criteria::all()).await }
            });
            let rows = (0..len).map(|i| cart_row(&row_id(i), i as i64 + 1, 1)).collect();
            calls.next().await.respond_documents(rows);
            init.await.unwrap();

            let mut in_flight = Vec::new();
            for step in &steps {
                let store = store.clone();
                let id = RecordId::new(row_id(step.index));
                let delete = step.delete;
                let index = step.index;
                let task = tokio::spawn(async move {
                    if delete {
                        store.delete_optimistic(&id).await
                    } else {
                        store
                            .update_optimistic(&id, CartItemPatch::quantity(100 + index as u32))
                            .await
                            .map(|_| ())
                    }
                });
                in_flight.push(Some((calls.next().await, task)));
            }

            for position in settle_order {
                let (call, task) = in_flight[position].take().unwrap();
                let step = &steps[position];
                match (step.confirm, step.delete) {
                    (true, true) => call.respond_ok(),
                    (true, false) => call.respond_document(cart_row(
                        &row_id(step.index),
                        step.index as i64 + 1,
                        100 + step.index as u32,
                    )),
                    (false, _) => call.fail(GatewayError::Transport("offline".into())),
                }
                prop_assert_eq!(task.await.unwrap().is_ok(), step.confirm);
            }

            let expected: Vec<(String, u32)> = (0..len)
                .filter_map(|i| match steps.iter().find(|s| s.index == i) {
                    Some(s) if s.confirm && s.delete => None,
                    Some(s) if s.confirm => Some((row_id(i), 100 + i as u32)),
                    _ => Some((row_id(i), 1)),
                })
                .collect();
            let actual: Vec<(String, u32)> = store
                .records()
                .into_iter()
                .map(|r| (r.id.to_string(), r.fields.quantity))
                .collect();
            prop_assert_eq!(actual, expected);
            prop_assert_eq!(store.pending_count(), 0);
            Ok(())
        })?;
    }
}
