//! Failure injection around a real gateway.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use listsync_core::{Document, OrderKey, Predicate, RecordId};
use listsync_gateway::{Gateway, GatewayError, Result};

/// A gateway operation, for targeting injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Filter,
    Create,
    Update,
    Delete,
}

/// Wraps a gateway and fails chosen calls with a transport error.
///
/// Failing calls never reach the inner gateway.
pub struct FlakyGateway<G> {
    inner: G,
    failures: Mutex<HashMap<Operation, usize>>,
}

impl<G: Gateway> FlakyGateway<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Fail the next `times` calls of `operation`.
    pub fn fail_next(&self, operation: Operation, times: usize) {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        *failures.entry(operation).or_insert(0) += times;
    }

    /// Failures still armed for `operation`.
    pub fn armed(&self, operation: Operation) -> usize {
        let failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        failures.get(&operation).copied().unwrap_or(0)
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    fn check(&self, operation: Operation) -> Result<()> {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        match failures.get_mut(&operation) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(GatewayError::Transport(format!(
                    "injected {:?} failure",
                    operation
                )))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl<G: Gateway> Gateway for FlakyGateway<G> {
    async fn list(
        &self,
        entity: &str,
        order: Option<&OrderKey>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        self.check(Operation::List)?;
        self.inner.list(entity, order, limit).await
    }

    async fn filter(
        &self,
        entity: &str,
        predicate: &Predicate,
        order: Option<&OrderKey>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        self.check(Operation::Filter)?;
        self.inner.filter(entity, predicate, order, limit).await
    }

    async fn create(&self, entity: &str, draft: Document) -> Result<Document> {
        self.check(Operation::Create)?;
        self.inner.create(entity, draft).await
    }

    async fn update(&self, entity: &str, id: &RecordId, patch: Document) -> Result<Document> {
        self.check(Operation::Update)?;
        self.inner.update(entity, id, patch).await
    }

    async fn delete(&self, entity: &str, id: &RecordId) -> Result<()> {
        self.check(Operation::Delete)?;
        self.inner.delete(entity, id).await
    }
}
