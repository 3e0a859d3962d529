//! In-memory implementation of the Gateway trait.
//!
//! This is primarily for testing and demos. It has the same semantics as the
//! SQLite backend but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use listsync_core::{Document, OrderKey, Predicate, RecordId};

use crate::error::{GatewayError, Result};
use crate::query::{apply_query, merge_patch, new_server_id, stamp_created, MonotonicClock};
use crate::traits::Gateway;

/// In-memory gateway.
///
/// Records of each entity are kept in creation order. Thread-safe via RwLock.
pub struct MemoryGateway {
    inner: RwLock<HashMap<String, Vec<Document>>>,
    clock: MonotonicClock,
}

impl MemoryGateway {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            clock: MonotonicClock::new(),
        }
    }

    /// Store a document verbatim, bypassing server stamping.
    ///
    /// Replaces an existing document with the same `id`. Useful for seeding
    /// fixtures with known ids and timestamps.
    pub fn insert_raw(&self, entity: &str, document: Document) -> Result<()> {
        let id = document_id(&document)?;
        let mut inner = self.write()?;
        let docs = inner.entry(entity.to_string()).or_default();
        match docs.iter().position(|d| document_id(d).ok().as_ref() == Some(&id)) {
            Some(index) => docs[index] = document,
            None => docs.push(document),
        }
        Ok(())
    }

    /// Every stored document of an entity, in creation order.
    pub fn documents(&self, entity: &str) -> Result<Vec<Document>> {
        let inner = self.read()?;
        Ok(inner.get(entity).cloned().unwrap_or_default())
    }

    /// Number of stored documents of an entity.
    pub fn count(&self, entity: &str) -> Result<usize> {
        let inner = self.read()?;
        Ok(inner.get(entity).map(Vec::len).unwrap_or(0))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Vec<Document>>>> {
        self.inner
            .read()
            .map_err(|e| GatewayError::Transport(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Vec<Document>>>> {
        self.inner
            .write()
            .map_err(|e| GatewayError::Transport(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn list(
        &self,
        entity: &str,
        order: Option<&OrderKey>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        self.filter(entity, &Predicate::new(), order, limit).await
    }

    async fn filter(
        &self,
        entity: &str,
        predicate: &Predicate,
        order: Option<&OrderKey>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let inner = self.read()?;
        let candidates = inner.get(entity).cloned().unwrap_or_default();
        Ok(apply_query(candidates, predicate, order, limit))
    }

    async fn create(&self, entity: &str, draft: Document) -> Result<Document> {
        let id = new_server_id();
        let stored = stamp_created(draft, &id, self.clock.tick());

        let mut inner = self.write()?;
        inner
            .entry(entity.to_string())
            .or_default()
            .push(stored.clone());

        Ok(stored)
    }

    async fn update(&self, entity: &str, id: &RecordId, patch: Document) -> Result<Document> {
        let now = self.clock.tick();
        let mut inner = self.write()?;

        let stored = inner
            .get_mut(entity)
            .and_then(|docs| {
                docs.iter_mut()
                    .find(|d| document_id(d).ok().as_ref() == Some(id))
            })
            .ok_or_else(|| GatewayError::NotFound {
                entity: entity.to_string(),
                id: id.clone(),
            })?;

        merge_patch(stored, patch, now);
        Ok(stored.clone())
    }

    async fn delete(&self, entity: &str, id: &RecordId) -> Result<()> {
        let mut inner = self.write()?;

        let docs = inner.get_mut(entity);
        let index = docs
            .as_ref()
            .and_then(|docs| docs.iter().position(|d| document_id(d).ok().as_ref() == Some(id)));

        match (docs, index) {
            (Some(docs), Some(index)) => {
                docs.remove(index);
                Ok(())
            }
            _ => Err(GatewayError::NotFound {
                entity: entity.to_string(),
                id: id.clone(),
            }),
        }
    }
}

/// Read the `id` field of a stored document.
pub(crate) fn document_id(document: &Document) -> Result<RecordId> {
    match document.get("id") {
        Some(serde_json::Value::String(id)) => Ok(RecordId::new(id.clone())),
        _ => Err(GatewayError::Serialization(
            "document has no string id".into(),
        )),
    }
}
