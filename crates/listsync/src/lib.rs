//! # listsync
//!
//! Synchronized, optimistically mutable lists of records from a remote
//! record API.
//!
//! ## Overview
//!
//! A UI showing a list of remote records (a chat feed, a shopping cart)
//! wants three things: the list kept fresh, changes shown the moment the
//! user makes them, and failed changes undone. listsync provides:
//!
//! - **Stores**: a local snapshot per query, refreshed by polling
//! - **Optimistic mutations**: insert, update and delete apply locally
//!   first and roll back if the server refuses
//! - **Gateways**: the remote record API, with in-memory and SQLite backends
//! - **Services**: the signed-in user and file uploads, for filling drafts
//!
//! ## Key Concepts
//!
//! - **Record**: a server value with `id`, `created_date` and
//!   `updated_date` plus the entity's own fields.
//! - **Criteria**: equality filter, order, limit and display reversal.
//! - **Placeholder**: a locally created record under a temporary id, shown
//!   until the server confirms it.
//! - **Pending mutation**: at most one per record; a second one fails with a
//!   conflict.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use listsync::{Client, ClientConfig};
//! use listsync::core::{Criteria, OrderKey};
//!
//! async fn example() -> listsync::Result<()> {
//!     let client = Client::in_memory(ClientConfig::default());
//!
//!     // The newest 50 messages of a circle, shown oldest first.
//!     let feed = client
//!         .open::<Message>(
//!             Criteria::all()
//!                 .where_eq("circle_id", "c1")
//!                 .order_by(OrderKey::descending("created_date"))
//!                 .limit(50)
//!                 .reversed(),
//!         )
//!         .await;
//!
//!     let mut updates = feed.subscribe();
//!     client.insert_authored(&feed, Message::new("hello")).await?;
//!     let view = updates.changed().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `listsync::core` - Records, criteria, snapshots
//! - `listsync::gateway` - The remote record API and its backends
//! - `listsync::services` - Auth and uploads
//! - `listsync::store` - The synchronized list store

pub mod client;
pub mod error;

// Re-export component crates
pub use listsync_core as core;
pub use listsync_gateway as gateway;
pub use listsync_services as services;
pub use listsync_store as store;

// Re-export main types for convenience
pub use client::{Client, ClientConfig};
pub use error::{ClientError, Result};

// Re-export commonly used types
pub use listsync_core::{Criteria, Entity, OrderKey, Record, RecordId};
pub use listsync_store::{
    Placement, RefreshOutcome, StoreConfig, StoreError, StoreView, Subscription, SyncStore,
};
