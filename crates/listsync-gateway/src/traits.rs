//! Gateway trait: the abstract interface to the remote entity store.
//!
//! This trait keeps the synchronized store transport-agnostic.
//! Implementations include SQLite and in-memory; an HTTP client for a hosted
//! backend fits behind the same signatures.

use std::sync::Arc;

use async_trait::async_trait;
use listsync_core::{Document, OrderKey, Predicate, RecordId};

use crate::error::Result;

/// Async CRUD over named backend entities.
///
/// Documents are flat JSON objects carrying `id`, `created_date`,
/// `updated_date` and the entity's own fields.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// List every record of an entity.
    async fn list(
        &self,
        entity: &str,
        order: Option<&OrderKey>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>>;

    /// List the records matching every predicate entry.
    async fn filter(
        &self,
        entity: &str,
        predicate: &Predicate,
        order: Option<&OrderKey>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>>;

    /// Create a record. The server assigns `id` and the timestamps.
    async fn create(&self, entity: &str, draft: Document) -> Result<Document>;

    /// Partially update a record. Unspecified fields keep their value.
    ///
    /// Fails with `NotFound` if the id no longer exists.
    async fn update(&self, entity: &str, id: &RecordId, patch: Document) -> Result<Document>;

    /// Delete a record. Fails with `NotFound` if the id does not exist.
    async fn delete(&self, entity: &str, id: &RecordId) -> Result<()>;
}

#[async_trait]
impl<G: Gateway + ?Sized> Gateway for Arc<G> {
    async fn list(
        &self,
        entity: &str,
        order: Option<&OrderKey>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        (**self).list(entity, order, limit).await
    }

    async fn filter(
        &self,
        entity: &str,
        predicate: &Predicate,
        order: Option<&OrderKey>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        (**self).filter(entity, predicate, order, limit).await
    }

    async fn create(&self, entity: &str, draft: Document) -> Result<Document> {
        (**self).create(entity, draft).await
    }

    async fn update(&self, entity: &str, id: &RecordId, patch: Document) -> Result<Document> {
        (**self).update(entity, id, patch).await
    }

    async fn delete(&self, entity: &str, id: &RecordId) -> Result<()> {
        (**self).delete(entity, id).await
    }
}

#[async_trait]
impl<G: Gateway + ?Sized> Gateway for Box<G> {
    async fn list(
        &self,
        entity: &str,
        order: Option<&OrderKey>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        (**self).list(entity, order, limit).await
    }

    async fn filter(
        &self,
        entity: &str,
        predicate: &Predicate,
        order: Option<&OrderKey>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        (**self).filter(entity, predicate, order, limit).await
    }

    async fn create(&self, entity: &str, draft: Document) -> Result<Document> {
        (**self).create(entity, draft).await
    }

    async fn update(&self, entity: &str, id: &RecordId, patch: Document) -> Result<Document> {
        (**self).update(entity, id, patch).await
    }

    async fn delete(&self, entity: &str, id: &RecordId) -> Result<()> {
        (**self).delete(entity, id).await
    }
}
