//! Folding server results into the local snapshot.
//!
//! These functions are pure: they take the current snapshot and pending set
//! and produce the next snapshot. The store calls them under its state lock.

use listsync_core::{Entity, MutationKind, OrderKey, PendingSet, Record, Snapshot};

use crate::config::Placement;

/// Put a new record where `placement` says. Returns its index.
pub fn place<E: Entity>(
    snapshot: &mut Snapshot<E>,
    record: Record<E>,
    placement: Placement,
    order: Option<&OrderKey>,
) -> usize {
    match (placement, order) {
        (Placement::Prepend, _) => snapshot.insert_at(0, record),
        (Placement::Ordered, Some(order)) => snapshot.insert_ordered(record, order),
        _ => snapshot.insert_at(usize::MAX, record),
    }
}

/// Build the snapshot that follows a successful refresh.
///
/// Server records come first, in server order. Pending mutations then win
/// over what the server said:
/// - a pending update keeps its optimistic value at the server position, or
///   at its previous index when the server no longer returns it;
/// - a pending delete takes the server value and position, or keeps its
///   previous index when the server no longer returns it; the store keeps
///   it hidden either way;
/// - a pending insert placeholder is placed again by `placement`.
///
/// Local records with no pending mutation that the server did not return
/// are dropped.
pub fn merge_refresh<E: Entity>(
    current: &Snapshot<E>,
    fetched: Vec<Record<E>>,
    pending: &PendingSet<E>,
    placement: Placement,
    order: Option<&OrderKey>,
) -> Snapshot<E> {
    let mut next = Snapshot::new();

    for record in fetched {
        match pending.get(&record.id).map(|p| &p.kind) {
            Some(MutationKind::Update { .. }) => match current.get(&record.id) {
                Some(local) => next.push(local.clone()),
                None => next.push(record),
            },
            _ => next.push(record),
        }
    }

    for (index, record) in current.iter().enumerate() {
        if next.contains(&record.id) {
            continue;
        }
        match pending.get(&record.id).map(|p| &p.kind) {
            Some(MutationKind::Insert) => {
                place(&mut next, record.clone(), placement, order);
            }
            Some(MutationKind::Update { .. } | MutationKind::Delete) => {
                next.insert_at(index, record.clone());
            }
            None => {}
        }
    }

    next
}
