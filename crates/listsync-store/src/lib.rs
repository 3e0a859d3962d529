//! # listsync store
//!
//! The synchronized list store: a local, observable copy of the records a
//! [`Criteria`](listsync_core::Criteria) selects, kept fresh by polling and
//! mutated optimistically.
//!
//! ## Overview
//!
//! - **Refresh**: fetch from the gateway and rebuild the snapshot.
//!   Overlapping refreshes are last-requested-wins.
//! - **Optimistic mutations**: insert, update and delete apply locally first,
//!   then call the gateway; failures roll back.
//! - **Polling**: a background task refreshes on a fixed period while anyone
//!   is subscribed.
//!
//! ## Key Types
//!
//! - [`SyncStore`]: the store itself, cheap to clone
//! - [`StoreView`]: an immutable copy of the state
//! - [`Subscription`]: a stream of views
//! - [`StoreConfig`]: poll interval, call timeout, placement
//!
//! ## Usage
//!
//! ```ignore
//! let store = SyncStore::<Message, _>::new(gateway, StoreConfig::default());
//! store.initialize(Criteria::all().where_eq("circle_id", "c1")).await;
//!
//! let mut updates = store.subscribe();
//! let sent = store.insert_optimistic(draft).await?;
//! let view = updates.changed().await?;
//! ```
//!
//! ## Design Notes
//!
//! - At most one mutation per record id is in flight. A second attempt fails
//!   with [`StoreError::MutationConflict`] and changes nothing.
//! - Refreshes never clobber pending mutations: pending updates keep their
//!   optimistic value and pending deletes stay hidden.
//! - Nothing is retried automatically.

pub mod config;
pub mod convergence;
pub mod error;
mod poller;
pub mod reconcile;
pub mod store;
pub mod view;

pub use config::{Placement, StoreConfig};
pub use convergence::{snapshot_digest, verify_convergence, ConvergenceResult};
pub use error::{LoadError, Result, StoreError};
pub use store::{RefreshOutcome, SyncStore};
pub use view::{StoreView, Subscription};
