//! Pending mutations: optimistic changes awaiting gateway confirmation.
//!
//! A [`PendingSet`] admits at most one mutation per record id. Each entry is
//! tagged with a correlation number so a late response can only settle the
//! mutation that issued it.

use std::collections::HashMap;

use crate::entity::Record;
use crate::types::{now_millis, RecordId};

/// What an optimistic change did, with what is needed to undo it.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationKind<E> {
    /// A placeholder was added under a temporary id.
    Insert,
    /// The record was replaced by a patched copy of `prior`.
    Update { prior: Record<E> },
    /// The record stays in the snapshot but is hidden until the gateway
    /// confirms. Undoing it only unhides.
    Delete,
}

impl<E> MutationKind<E> {
    pub fn label(&self) -> &'static str {
        match self {
            MutationKind::Insert => "insert",
            MutationKind::Update { .. } => "update",
            MutationKind::Delete { .. } => "delete",
        }
    }
}

/// One in-flight optimistic change.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation<E> {
    pub correlation: u64,
    pub kind: MutationKind<E>,
    /// When the change was applied locally (Unix ms).
    pub started_at: i64,
}

/// In-flight mutations keyed by record id.
#[derive(Debug, Clone)]
pub struct PendingSet<E> {
    entries: HashMap<RecordId, PendingMutation<E>>,
    next_correlation: u64,
}

impl<E> Default for PendingSet<E> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_correlation: 1,
        }
    }
}

impl<E> PendingSet<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mutation for `id`.
    ///
    /// Returns the correlation number, or `None` if `id` already has a
    /// pending mutation (nothing is recorded in that case).
    pub fn begin(&mut self, id: RecordId, kind: MutationKind<E>) -> Option<u64> {
        if self.entries.contains_key(&id) {
            return None;
        }
        let correlation = self.next_correlation;
        self.next_correlation += 1;
        self.entries.insert(
            id,
            PendingMutation {
                correlation,
                kind,
                started_at: now_millis(),
            },
        );
        Some(correlation)
    }

    /// Settle the mutation on `id` if it is the one tagged `correlation`.
    pub fn finish(&mut self, id: &RecordId, correlation: u64) -> Option<PendingMutation<E>> {
        match self.entries.get(id) {
            Some(pending) if pending.correlation == correlation => self.entries.remove(id),
            _ => None,
        }
    }

    pub fn get(&self, id: &RecordId) -> Option<&PendingMutation<E>> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &PendingMutation<E>)> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.entries.keys()
    }

    /// Whether `id` is hidden by a pending delete.
    pub fn is_deleting(&self, id: &RecordId) -> bool {
        matches!(
            self.entries.get(id).map(|p| &p.kind),
            Some(MutationKind::Delete)
        )
    }
}
