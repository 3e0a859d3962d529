//! Read-only views of the store state and the subscription stream.

use std::collections::BTreeSet;
use std::sync::Weak;

use listsync_core::{Record, RecordId};
use tokio::sync::watch;

use crate::error::{LoadError, Result, StoreError};

/// An immutable copy of the store state.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreView<E> {
    /// The records, in display order.
    pub records: Vec<Record<E>>,
    /// Ids with a mutation in flight.
    pub pending: BTreeSet<RecordId>,
    /// The last refresh failure, cleared by the next successful refresh.
    pub load_error: Option<LoadError>,
    /// Whether a refresh is in flight.
    pub loading: bool,
    pub initialized: bool,
    pub closed: bool,
    /// Incremented on every published change.
    pub version: u64,
}

impl<E> Default for StoreView<E> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            pending: BTreeSet::new(),
            load_error: None,
            loading: false,
            initialized: false,
            closed: false,
            version: 0,
        }
    }
}

impl<E> StoreView<E> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record<E>> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn is_pending(&self, id: &RecordId) -> bool {
        self.pending.contains(id)
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }
}

/// Hook a subscription uses to tell the store it went away.
pub(crate) trait SubscriberRelease: Send + Sync {
    fn release(&self);
}

/// A live stream of [`StoreView`] updates.
///
/// While at least one subscription exists on an initialized, open store, the
/// store polls the gateway. Dropping the last subscription stops polling.
pub struct Subscription<E> {
    updates: watch::Receiver<StoreView<E>>,
    owner: Weak<dyn SubscriberRelease>,
}

impl<E: Clone> Subscription<E> {
    pub(crate) fn new(
        updates: watch::Receiver<StoreView<E>>,
        owner: Weak<dyn SubscriberRelease>,
    ) -> Self {
        Self { updates, owner }
    }

    /// The most recently published view.
    pub fn current(&self) -> StoreView<E> {
        self.updates.borrow().clone()
    }

    /// Wait for the next published view.
    ///
    /// Fails with `Closed` once every store handle is gone.
    pub async fn changed(&mut self) -> Result<StoreView<E>> {
        self.updates
            .changed()
            .await
            .map_err(|_| StoreError::Closed)?;
        Ok(self.updates.borrow_and_update().clone())
    }

    /// Wait until a published view satisfies `ready`, checking the current
    /// one first.
    pub async fn wait_until<F>(&mut self, mut ready: F) -> Result<StoreView<E>>
    where
        F: FnMut(&StoreView<E>) -> bool,
    {
        loop {
            {
                let view = self.updates.borrow_and_update();
                if ready(&view) {
                    return Ok(view.clone());
                }
            }
            self.updates
                .changed()
                .await
                .map_err(|_| StoreError::Closed)?;
        }
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.release();
        }
    }
}

impl<E> std::fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("version", &self.updates.borrow().version)
            .finish()
    }
}
