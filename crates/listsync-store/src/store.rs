//! The synchronized list store.
//!
//! `SyncStore` keeps a local [`Snapshot`] of the records matching a
//! [`Criteria`], refreshes it from the gateway, and applies mutations
//! optimistically: the local change is published before the gateway call
//! and rolled back if that call fails.
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. Every gateway call is a suspension point, so refreshes and
//! mutations interleave freely; correlation numbers and refresh tickets
//! decide which late result still counts.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use listsync_core::{
    encode_fields, encode_patch, Criteria, Document, Entity, MutationKind, PendingMutation,
    PendingSet, Record, RecordId, Snapshot,
};
use listsync_gateway::Gateway;
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::config::StoreConfig;
use crate::error::{LoadError, Result, StoreError};
use crate::poller::{Poller, Tick};
use crate::reconcile::{merge_refresh, place};
use crate::view::{StoreView, SubscriberRelease, Subscription};

/// What a refresh did with the server result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The snapshot was rebuilt; it now holds `len` records.
    Applied { len: usize },
    /// A later refresh was requested meanwhile; this result was dropped.
    Superseded,
    /// The store was closed meanwhile; this result was dropped.
    Discarded,
}

/// A synchronized, optimistically mutable list of `E` records.
///
/// Cloning yields another handle to the same store.
pub struct SyncStore<E: Entity, G: Gateway> {
    shared: Arc<Shared<E, G>>,
}

impl<E: Entity, G: Gateway> Clone for SyncStore<E, G> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<E: Entity, G: Gateway> {
    gateway: G,
    config: StoreConfig,
    state: Mutex<State<E>>,
    updates: watch::Sender<StoreView<E>>,
}

struct State<E> {
    criteria: Criteria,
    snapshot: Snapshot<E>,
    pending: PendingSet<E>,
    load_error: Option<LoadError>,
    initialized: bool,
    closed: bool,
    /// Ticket of the most recently requested refresh.
    requested: u64,
    /// Refreshes issued but not yet resolved.
    in_flight: usize,
    subscribers: usize,
    poller: Option<Poller>,
    version: u64,
}

impl<E: Entity> State<E> {
    fn view(&self) -> StoreView<E> {
        StoreView {
            records: self.visible().cloned().collect(),
            pending: self.pending.ids().cloned().collect::<BTreeSet<_>>(),
            load_error: self.load_error.clone(),
            loading: self.in_flight > 0,
            initialized: self.initialized,
            closed: self.closed,
            version: self.version,
        }
    }

    /// Records in display order, without those hidden by a pending delete.
    fn visible(&self) -> impl Iterator<Item = &Record<E>> {
        self.snapshot
            .iter()
            .filter(|r| !self.pending.is_deleting(&r.id))
    }

    /// Turn every refresh requested so far into a superseded one.
    ///
    /// Called when a mutation is confirmed: those refreshes may have read the
    /// server before it applied the change.
    fn supersede_refreshes(&mut self) {
        self.requested += 1;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    /// Fail if `id` cannot take a new mutation right now.
    fn ensure_idle(&self, id: &RecordId) -> Result<()> {
        self.ensure_open()?;
        if self.pending.contains(id) {
            return Err(StoreError::MutationConflict { id: id.clone() });
        }
        Ok(())
    }
}

impl<E: Entity, G: Gateway + 'static> SyncStore<E, G> {
    /// Create an uninitialized store. Nothing is fetched until
    /// [`initialize`](Self::initialize).
    pub fn new(gateway: G, config: StoreConfig) -> Self {
        let (updates, _) = watch::channel(StoreView::default());
        Self {
            shared: Arc::new(Shared {
                gateway,
                config,
                state: Mutex::new(State {
                    criteria: Criteria::default(),
                    snapshot: Snapshot::new(),
                    pending: PendingSet::new(),
                    load_error: None,
                    initialized: false,
                    closed: false,
                    requested: 0,
                    in_flight: 0,
                    subscribers: 0,
                    poller: None,
                    version: 0,
                }),
                updates,
            }),
        }
    }

    /// Set the criteria, start polling if anyone is subscribed, and load.
    ///
    /// Load failures are recorded in [`load_error`](Self::load_error), never
    /// returned.
    pub async fn initialize(&self, criteria: Criteria) {
        if !self.shared.apply_criteria(criteria) {
            return;
        }
        self.shared.sync_poller();
        if let Err(e) = self.shared.refresh().await {
            tracing::debug!(entity = E::NAME, error = %e, "initial load failed");
        }
    }

    /// Switch to new criteria and reload.
    ///
    /// Records from the previous criteria without a pending mutation are
    /// dropped immediately.
    pub async fn set_criteria(&self, criteria: Criteria) {
        self.initialize(criteria).await;
    }

    /// Fetch the records matching the current criteria and rebuild the
    /// snapshot. Overlapping refreshes are last-requested-wins.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        self.shared.refresh().await
    }

    /// Show `draft` immediately under a temporary id, then create it.
    ///
    /// Returns the server record, which has replaced the placeholder. On
    /// failure the placeholder is removed and the error returned.
    pub async fn insert_optimistic(&self, draft: E) -> Result<Record<E>> {
        let shared = &*self.shared;
        let body = encode_fields(&draft)?;
        let placeholder = Record::placeholder(draft);
        let temp_id = placeholder.id.clone();

        let settlement = {
            let mut state = shared.state();
            state.ensure_open()?;
            let correlation = state
                .pending
                .begin(temp_id.clone(), MutationKind::Insert)
                .ok_or_else(|| StoreError::MutationConflict {
                    id: temp_id.clone(),
                })?;
            let order = state.criteria.display_order();
            place(
                &mut state.snapshot,
                placeholder,
                shared.config.placement,
                order.as_ref(),
            );
            shared.publish(&mut state);
            Settlement::new(shared, temp_id.clone(), correlation)
        };

        let result = shared
            .call("create", shared.gateway.create(E::NAME, body))
            .await
            .and_then(decode::<E>);

        let mut state = shared.state();
        let settled = settlement.settle(&mut state);
        state.ensure_open()?;

        match result {
            Ok(record) => {
                state.snapshot.swap_id(&temp_id, record.clone());
                state.supersede_refreshes();
                shared.publish(&mut state);
                tracing::debug!(entity = E::NAME, id = %record.id, "insert confirmed");
                Ok(record)
            }
            Err(e) => {
                shared.roll_back(&mut state, &temp_id, settled);
                shared.publish(&mut state);
                tracing::warn!(entity = E::NAME, error = %e, "insert rolled back");
                Err(e)
            }
        }
    }

    /// Apply `patch` locally, then send it.
    ///
    /// Fails fast with `MutationConflict` while another mutation on `id` is
    /// in flight, and with `NotFound` when `id` is not in the snapshot. On
    /// gateway failure the record reverts to its prior value.
    pub async fn update_optimistic(&self, id: &RecordId, patch: E::Patch) -> Result<Record<E>> {
        let shared = &*self.shared;

        let (settlement, body) = {
            let mut state = shared.state();
            state.ensure_idle(id)?;
            let prior = state
                .snapshot
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
            let body = encode_patch::<E>(&patch)?;
            let optimistic = prior.patched(&patch);
            let correlation = state
                .pending
                .begin(id.clone(), MutationKind::Update { prior })
                .ok_or_else(|| StoreError::MutationConflict { id: id.clone() })?;
            state.snapshot.replace(optimistic);
            shared.publish(&mut state);
            (Settlement::new(shared, id.clone(), correlation), body)
        };

        let result = shared
            .call("update", shared.gateway.update(E::NAME, id, body))
            .await
            .and_then(decode::<E>);

        let mut state = shared.state();
        let settled = settlement.settle(&mut state);
        state.ensure_open()?;

        match result {
            Ok(record) => {
                state.snapshot.replace(record.clone());
                state.supersede_refreshes();
                shared.publish(&mut state);
                tracing::debug!(entity = E::NAME, id = %id, "update confirmed");
                Ok(record)
            }
            Err(e) => {
                shared.roll_back(&mut state, id, settled);
                shared.publish(&mut state);
                tracing::warn!(entity = E::NAME, id = %id, error = %e, "update rolled back");
                Err(e)
            }
        }
    }

    /// Hide the record, then delete it.
    ///
    /// Same conflict and not-found rules as updates. The record keeps its
    /// slot while hidden, so on gateway failure it reappears exactly where it
    /// was, however other deletes settled meanwhile.
    pub async fn delete_optimistic(&self, id: &RecordId) -> Result<()> {
        let shared = &*self.shared;

        let settlement = {
            let mut state = shared.state();
            state.ensure_idle(id)?;
            if !state.snapshot.contains(id) {
                return Err(StoreError::NotFound { id: id.clone() });
            }
            let correlation = state
                .pending
                .begin(id.clone(), MutationKind::Delete)
                .ok_or_else(|| StoreError::MutationConflict { id: id.clone() })?;
            shared.publish(&mut state);
            Settlement::new(shared, id.clone(), correlation)
        };

        let result = shared
            .call("delete", shared.gateway.delete(E::NAME, id))
            .await;

        let mut state = shared.state();
        let settled = settlement.settle(&mut state);
        state.ensure_open()?;

        match result {
            Ok(()) => {
                state.snapshot.remove(id);
                state.supersede_refreshes();
                shared.publish(&mut state);
                tracing::debug!(entity = E::NAME, id = %id, "delete confirmed");
                Ok(())
            }
            Err(e) => {
                shared.roll_back(&mut state, id, settled);
                shared.publish(&mut state);
                tracing::warn!(entity = E::NAME, id = %id, error = %e, "delete rolled back");
                Err(e)
            }
        }
    }

    /// An immutable copy of the current state.
    pub fn snapshot(&self) -> StoreView<E> {
        self.shared.state().view()
    }

    /// The current records, in display order.
    pub fn records(&self) -> Vec<Record<E>> {
        self.shared.state().visible().cloned().collect()
    }

    pub fn get(&self, id: &RecordId) -> Option<Record<E>> {
        let state = self.shared.state();
        if state.pending.is_deleting(id) {
            return None;
        }
        state.snapshot.get(id).cloned()
    }

    /// Subscribe to state changes. Starts polling on an initialized store.
    pub fn subscribe(&self) -> Subscription<E> {
        let updates = self.shared.updates.subscribe();
        self.shared.state().subscribers += 1;
        self.shared.sync_poller();

        let weak = Arc::downgrade(&self.shared);
        let owner: Weak<dyn SubscriberRelease> = weak;
        Subscription::new(updates, owner)
    }

    pub fn is_pending(&self, id: &RecordId) -> bool {
        self.shared.state().pending.contains(id)
    }

    pub fn pending_count(&self) -> usize {
        self.shared.state().pending.len()
    }

    pub fn criteria(&self) -> Criteria {
        self.shared.state().criteria.clone()
    }

    pub fn load_error(&self) -> Option<LoadError> {
        self.shared.state().load_error.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.state().initialized
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state().closed
    }

    /// Whether the background poller is running.
    pub fn is_polling(&self) -> bool {
        self.shared
            .state()
            .poller
            .as_ref()
            .map(|p| !p.is_finished())
            .unwrap_or(false)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    pub fn gateway(&self) -> &G {
        &self.shared.gateway
    }

    /// Fetch what the gateway currently returns for the store's criteria,
    /// without touching the snapshot.
    pub async fn fetch_remote(&self) -> Result<Vec<Record<E>>> {
        let criteria = self.criteria();
        self.shared.fetch(&criteria).await
    }

    /// Stop polling and mark the store closed.
    ///
    /// Results arriving afterwards are discarded and every later operation
    /// fails with `Closed`.
    pub fn close(&self) {
        let mut state = self.shared.state();
        if state.closed {
            return;
        }
        state.closed = true;
        state.poller = None;
        self.shared.publish(&mut state);
        tracing::debug!(entity = E::NAME, "store closed");
    }
}

impl<E: Entity, G: Gateway + 'static> Shared<E, G> {
    fn state(&self) -> MutexGuard<'_, State<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bump the version and push the new view to subscribers.
    fn publish(&self, state: &mut State<E>) {
        state.version += 1;
        self.updates.send_replace(state.view());
    }

    /// Undo a settled mutation that did not go through.
    fn roll_back(&self, state: &mut State<E>, id: &RecordId, settled: Option<PendingMutation<E>>) {
        let Some(mutation) = settled else {
            return;
        };
        match mutation.kind {
            MutationKind::Insert => {
                state.snapshot.remove(id);
            }
            MutationKind::Update { prior } => {
                state.snapshot.replace(prior);
            }
            // Settling already unhid it.
            MutationKind::Delete => {}
        }
    }

    /// Returns false when the store is closed.
    fn apply_criteria(&self, criteria: Criteria) -> bool {
        let mut state = self.state();
        if state.closed {
            return false;
        }

        if state.initialized && state.criteria != criteria {
            let pending = &state.pending;
            let kept: Vec<Record<E>> = state
                .snapshot
                .iter()
                .filter(|r| pending.contains(&r.id))
                .cloned()
                .collect();
            state.snapshot = Snapshot::from_records(kept);
            state.load_error = None;
        }
        state.criteria = criteria;
        state.initialized = true;
        self.publish(&mut state);
        true
    }

    /// Start or stop the poller to match the current state.
    fn sync_poller(self: &Arc<Self>) {
        let mut state = self.state();
        let wanted = state.initialized && !state.closed && state.subscribers > 0;
        let period = match self.config.poll_interval {
            Some(period) if wanted => period,
            _ => {
                state.poller = None;
                return;
            }
        };

        if state.poller.as_ref().is_some_and(|p| !p.is_finished()) {
            return;
        }
        match Handle::try_current() {
            Ok(runtime) => {
                let weak = Arc::downgrade(self);
                let target: Weak<dyn Tick> = weak;
                state.poller = Some(Poller::spawn(&runtime, target, period));
                tracing::debug!(entity = E::NAME, ?period, "poller started");
            }
            Err(_) => {
                tracing::warn!(entity = E::NAME, "no tokio runtime, polling disabled");
            }
        }
    }

    async fn refresh(&self) -> Result<RefreshOutcome> {
        let (ticket, criteria) = {
            let mut state = self.state();
            state.ensure_open()?;
            state.requested += 1;
            state.in_flight += 1;
            self.publish(&mut state);
            (state.requested, state.criteria.clone())
        };
        let mut loading = Loading {
            shared: self,
            done: false,
        };

        let result = self.fetch(&criteria).await;

        let mut state = self.state();
        loading.done = true;
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.closed {
            return Ok(RefreshOutcome::Discarded);
        }
        if ticket != state.requested {
            self.publish(&mut state);
            tracing::debug!(entity = E::NAME, ticket, latest = state.requested, "refresh superseded");
            return Ok(RefreshOutcome::Superseded);
        }

        match result {
            Ok(records) => {
                let order = state.criteria.display_order();
                let next = merge_refresh(
                    &state.snapshot,
                    records,
                    &state.pending,
                    self.config.placement,
                    order.as_ref(),
                );
                state.snapshot = next;
                state.load_error = None;
                self.publish(&mut state);

                let len = state.visible().count();
                tracing::debug!(entity = E::NAME, ticket, len, "refresh applied");
                Ok(RefreshOutcome::Applied { len })
            }
            Err(e) => {
                let load = LoadError::from_error(&e);
                state.load_error = Some(load.clone());
                self.publish(&mut state);
                tracing::warn!(entity = E::NAME, ticket, error = %e, "refresh failed");
                Err(StoreError::Load(load))
            }
        }
    }

    async fn fetch(&self, criteria: &Criteria) -> Result<Vec<Record<E>>> {
        let order = criteria.order.as_ref();
        let documents = if criteria.is_unfiltered() {
            self.call("list", self.gateway.list(E::NAME, order, criteria.limit))
                .await?
        } else {
            self.call(
                "filter",
                self.gateway
                    .filter(E::NAME, &criteria.predicate, order, criteria.limit),
            )
            .await?
        };

        let mut records = documents
            .into_iter()
            .map(decode::<E>)
            .collect::<Result<Vec<_>>>()?;
        if criteria.reverse {
            records.reverse();
        }
        Ok(records)
    }

    /// Await a gateway call under the configured timeout.
    async fn call<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = listsync_gateway::Result<T>>,
    {
        match self.config.call_timeout {
            Some(after) => match tokio::time::timeout(after, call).await {
                Ok(result) => result.map_err(StoreError::from),
                Err(_) => {
                    tracing::warn!(entity = E::NAME, operation, ?after, "gateway call timed out");
                    Err(StoreError::Timeout { operation, after })
                }
            },
            None => call.await.map_err(StoreError::from),
        }
    }
}

/// Ties a pending mutation to the call awaiting its result.
///
/// If the call is dropped before it resolves, the mutation is rolled back as
/// if it had failed.
struct Settlement<'a, E: Entity, G: Gateway + 'static> {
    shared: &'a Shared<E, G>,
    id: RecordId,
    correlation: u64,
    settled: bool,
}

impl<'a, E: Entity, G: Gateway + 'static> Settlement<'a, E, G> {
    fn new(shared: &'a Shared<E, G>, id: RecordId, correlation: u64) -> Self {
        Self {
            shared,
            id,
            correlation,
            settled: false,
        }
    }

    /// Remove the pending entry, returning it if it is still ours.
    fn settle(mut self, state: &mut State<E>) -> Option<PendingMutation<E>> {
        self.settled = true;
        state.pending.finish(&self.id, self.correlation)
    }
}

impl<E: Entity, G: Gateway + 'static> Drop for Settlement<'_, E, G> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.shared.state();
        let mutation = state.pending.finish(&self.id, self.correlation);
        if state.closed || mutation.is_none() {
            return;
        }
        self.shared.roll_back(&mut state, &self.id, mutation);
        self.shared.publish(&mut state);
        tracing::warn!(entity = E::NAME, id = %self.id, "mutation cancelled, rolled back");
    }
}

/// Keeps `loading` accurate when a refresh is dropped mid-flight.
struct Loading<'a, E: Entity, G: Gateway + 'static> {
    shared: &'a Shared<E, G>,
    done: bool,
}

impl<E: Entity, G: Gateway + 'static> Drop for Loading<'_, E, G> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut state = self.shared.state();
        state.in_flight = state.in_flight.saturating_sub(1);
        if !state.closed {
            self.shared.publish(&mut state);
        }
    }
}

fn decode<E: Entity>(document: Document) -> Result<Record<E>> {
    Ok(Record::from_document(document)?)
}

#[async_trait]
impl<E: Entity, G: Gateway + 'static> Tick for Shared<E, G> {
    async fn tick(&self) -> bool {
        match self.refresh().await {
            Ok(_) => true,
            Err(StoreError::Closed) => false,
            Err(e) => {
                tracing::warn!(entity = E::NAME, error = %e, "poll refresh failed");
                true
            }
        }
    }
}

impl<E: Entity, G: Gateway + 'static> SubscriberRelease for Shared<E, G> {
    fn release(&self) {
        let mut state = self.state();
        state.subscribers = state.subscribers.saturating_sub(1);
        if state.subscribers == 0 && state.poller.take().is_some() {
            tracing::debug!(entity = E::NAME, "last subscriber gone, poller stopped");
        }
    }
}

impl<E: Entity, G: Gateway> std::fmt::Debug for SyncStore<E, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStore")
            .field("entity", &E::NAME)
            .field("config", &self.shared.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listsync_core::OrderKey;
    use listsync_gateway::{GatewayError, MemoryGateway};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    #[derive(Debug, Clone, Default, Serialize)]
    struct NotePatch {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    }

    impl Entity for Note {
        const NAME: &'static str = "Note";
        type Patch = NotePatch;

        fn apply_patch(&mut self, patch: &NotePatch) {
            if let Some(text) = &patch.text {
                self.text = text.clone();
            }
        }
    }

    fn note(text: &str) -> Note {
        Note { text: text.into() }
    }

    fn seed(gateway: &MemoryGateway, id: &str, created: i64, text: &str) {
        let value = json!({ "id": id, "created_date": created, "updated_date": created, "text": text });
        if let serde_json::Value::Object(doc) = value {
            gateway.insert_raw("Note", doc).unwrap();
        }
    }

    fn texts(store: &SyncStore<Note, Arc<MemoryGateway>>) -> Vec<String> {
        store.records().into_iter().map(|r| r.fields.text).collect()
    }

    fn manual_store(gateway: Arc<MemoryGateway>) -> SyncStore<Note, Arc<MemoryGateway>> {
        SyncStore::new(gateway, StoreConfig::manual())
    }

    #[tokio::test]
    async fn test_initialize_loads() {
        let gateway = Arc::new(MemoryGateway::new());
        seed(&gateway, "a", 1, "first");
        seed(&gateway, "b", 2, "second");

        let store = manual_store(gateway);
        assert!(!store.is_initialized());
        store
            .initialize(Criteria::all().order_by(OrderKey::descending("created_date")))
            .await;

        assert!(store.is_initialized());
        assert_eq!(texts(&store), vec!["second", "first"]);
        assert!(store.load_error().is_none());
    }

    #[tokio::test]
    async fn test_reversed_criteria() {
        let gateway = Arc::new(MemoryGateway::new());
        for (i, text) in ["one", "two", "three"].iter().enumerate() {
            seed(&gateway, &format!("m{}", i), i as i64 + 1, text);
        }

        let store = manual_store(gateway);
        store
            .initialize(
                Criteria::all()
                    .order_by(OrderKey::descending("created_date"))
                    .limit(2)
                    .reversed(),
            )
            .await;
        assert_eq!(texts(&store), vec!["two", "three"]);
    }

    #[tokio::test]
    async fn test_mutations_round_trip_through_gateway() {
        let gateway = Arc::new(MemoryGateway::new());
        let store = manual_store(gateway.clone());
        store.initialize(Criteria::all()).await;

        let created = store.insert_optimistic(note("hello")).await.unwrap();
        assert!(!created.is_placeholder());
        assert_eq!(store.records(), vec![created.clone()]);

        let updated = store
            .update_optimistic(
                &created.id,
                NotePatch {
                    text: Some("edited".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.fields.text, "edited");
        assert_eq!(texts(&store), vec!["edited"]);

        store.delete_optimistic(&created.id).await.unwrap();
        assert!(store.records().is_empty());
        assert_eq!(gateway.count("Note").unwrap(), 0);
        assert_eq!(store.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = manual_store(Arc::new(MemoryGateway::new()));
        store.initialize(Criteria::all()).await;
        let missing = RecordId::new("missing");

        let err = store
            .update_optimistic(&missing, NotePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        let err = store.delete_optimistic(&missing).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_of_vanished_record_rolls_back() {
        let gateway = Arc::new(MemoryGateway::new());
        seed(&gateway, "a", 1, "a");
        seed(&gateway, "b", 2, "b");
        let store = manual_store(gateway.clone());
        store.initialize(Criteria::all()).await;

        gateway.delete("Note", &RecordId::new("b")).await.unwrap();
        let err = store.delete_optimistic(&RecordId::new("b")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Remote(GatewayError::NotFound { .. })
        ));
        assert_eq!(texts(&store), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_set_criteria_drops_old_records() {
        let gateway = Arc::new(MemoryGateway::new());
        let a = json!({ "id": "a", "created_date": 1, "text": "in c1", "circle_id": "c1" });
        let b = json!({ "id": "b", "created_date": 2, "text": "in c2", "circle_id": "c2" });
        for value in [a, b] {
            if let serde_json::Value::Object(doc) = value {
                gateway.insert_raw("Note", doc).unwrap();
            }
        }

        let store = manual_store(gateway);
        store.initialize(Criteria::all().where_eq("circle_id", "c1")).await;
        assert_eq!(texts(&store), vec!["in c1"]);

        store.set_criteria(Criteria::all().where_eq("circle_id", "c2")).await;
        assert_eq!(texts(&store), vec!["in c2"]);
        assert_eq!(
            store.criteria(),
            Criteria::all().where_eq("circle_id", "c2")
        );
    }

    #[tokio::test]
    async fn test_close_rejects_everything() {
        let store = manual_store(Arc::new(MemoryGateway::new()));
        store.initialize(Criteria::all()).await;
        store.close();

        assert!(store.is_closed());
        assert!(matches!(store.refresh().await, Err(StoreError::Closed)));
        assert!(matches!(
            store.insert_optimistic(note("late")).await,
            Err(StoreError::Closed)
        ));
        assert!(store.snapshot().closed);
    }

    #[tokio::test]
    async fn test_versions_increase() {
        let store = manual_store(Arc::new(MemoryGateway::new()));
        let before = store.snapshot().version;
        store.initialize(Criteria::all()).await;
        let after_init = store.snapshot().version;
        assert!(after_init > before);

        store.insert_optimistic(note("x")).await.unwrap();
        assert!(store.snapshot().version > after_init);
    }

    #[test]
    fn test_subscribe_before_initialize_does_not_poll() {
        let store = SyncStore::<Note, _>::new(MemoryGateway::new(), StoreConfig::default());
        let _subscription = store.subscribe();
        assert!(!store.is_polling());
    }
}
