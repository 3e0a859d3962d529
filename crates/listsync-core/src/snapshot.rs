//! Snapshot: the ordered, id-unique view of one resource.
//!
//! Every insertion path replaces an existing entry with the same id, so a
//! snapshot can never hold two records with one id.

use std::cmp::Ordering;

use crate::criteria::OrderKey;
use crate::entity::{Entity, Record};
use crate::types::RecordId;

/// Ordered collection of records with unique ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<E> {
    records: Vec<Record<E>>,
}

impl<E> Default for Snapshot<E> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<E: Entity> Snapshot<E> {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a sequence, keeping the first position of each id and the
    /// last value seen for it.
    pub fn from_records(records: impl IntoIterator<Item = Record<E>>) -> Self {
        let mut snapshot = Self::new();
        for record in records {
            snapshot.push(record);
        }
        snapshot
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record<E>] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record<E>> {
        self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record<E>> {
        self.records.iter()
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    /// Index of the record with this id.
    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|r| &r.id == id)
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record<E>> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.position(id).is_some()
    }

    /// Append, or replace in place if the id is already present.
    pub fn push(&mut self, record: Record<E>) {
        match self.position(&record.id) {
            Some(index) => self.records[index] = record,
            None => self.records.push(record),
        }
    }

    /// Insert at `index` (clamped to the length). An existing entry with the
    /// same id is removed first. Returns the final index.
    pub fn insert_at(&mut self, index: usize, record: Record<E>) -> usize {
        if let Some(existing) = self.position(&record.id) {
            self.records.remove(existing);
        }
        let index = index.min(self.records.len());
        self.records.insert(index, record);
        index
    }

    /// Insert at the position `order` dictates, after any equal keys.
    pub fn insert_ordered(&mut self, record: Record<E>, order: &OrderKey) -> usize {
        if let Some(existing) = self.position(&record.id) {
            self.records.remove(existing);
        }
        let key = record.field_value(&order.field);
        let index = self
            .records
            .iter()
            .position(|r| order.compare_values(&r.field_value(&order.field), &key) == Ordering::Greater)
            .unwrap_or(self.records.len());
        self.records.insert(index, record);
        index
    }

    /// Replace the record with the same id, keeping its position.
    ///
    /// Returns false when no such record exists.
    pub fn replace(&mut self, record: Record<E>) -> bool {
        match self.position(&record.id) {
            Some(index) => {
                self.records[index] = record;
                true
            }
            None => false,
        }
    }

    /// Replace the record `id` by `record`, which may carry a different id.
    ///
    /// If `record.id` already exists elsewhere, that entry takes the new value
    /// and `id` is dropped. Returns false when neither id is present.
    pub fn swap_id(&mut self, id: &RecordId, record: Record<E>) -> bool {
        if &record.id == id {
            return self.replace(record);
        }
        match (self.position(id), self.position(&record.id)) {
            (_, Some(existing)) => {
                self.records[existing] = record;
                self.remove(id);
                true
            }
            (Some(index), None) => {
                self.records[index] = record;
                true
            }
            (None, None) => false,
        }
    }

    /// Remove a record, returning its former index and value.
    pub fn remove(&mut self, id: &RecordId) -> Option<(usize, Record<E>)> {
        let index = self.position(id)?;
        Some((index, self.records.remove(index)))
    }
}

impl<E: Entity> IntoIterator for Snapshot<E> {
    type Item = Record<E>;
    type IntoIter = std::vec::IntoIter<Record<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
