//! # listsync Testkit
//!
//! Testing utilities for listsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Scripted gateway**: every call parks until the test answers it, so
//!   races between refreshes and mutations can be replayed exactly
//! - **Flaky gateway**: wraps a real gateway and fails chosen calls
//! - **Fixtures**: `Message` and `CartItem` entities and seeding helpers
//! - **Generators**: Proptest strategies for drafts, criteria and workloads
//!
//! ## Scripted Races
//!
//! ```rust,ignore
//! use listsync_testkit::{ScriptedGateway, cart_row};
//!
//! let (gateway, mut calls) = ScriptedGateway::new();
//! let store = SyncStore::<CartItem, _>::new(gateway, StoreConfig::manual());
//!
//! let first = tokio::spawn({ let s = store.clone(); async move { s.refresh().await } });
//! let slow = calls.next().await;
//! let second = tokio::spawn({ let s = store.clone(); async move { s.refresh().await } });
//! calls.next().await.respond_documents(vec![cart_row("new", 2, 1)]);
//! slow.respond_documents(vec![cart_row("old", 1, 1)]); // superseded
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use listsync_testkit::generators::store_ops;
//!
//! proptest! {
//!     #[test]
//!     fn snapshot_ids_stay_unique(ops in store_ops(20)) {
//!         // replay ops against a store over a FlakyGateway
//!     }
//! }
//! ```

pub mod fixtures;
pub mod flaky;
pub mod generators;
pub mod scripted;

pub use fixtures::{
    cart_row, document, init_tracing, message_row, remote_documents, seeded_gateway, CartItem,
    CartItemPatch, Message, MessagePatch,
};
pub use flaky::{FlakyGateway, Operation};
pub use generators::{store_ops, StoreOp};
pub use scripted::{Call, CallQueue, PendingCall, ScriptedGateway};
