//! # listsync Gateway
//!
//! The remote entity gateway: generic `list / filter / create / update /
//! delete` over named backend entities, exchanging flat JSON documents.
//!
//! ## Overview
//!
//! The store never talks to a backend directly. It goes through the
//! [`Gateway`] trait, so the transport is an implementation detail. Two
//! backends ship with the crate: [`MemoryGateway`] for tests and demos and
//! [`SqliteGateway`] for a persistent local backend.
//!
//! ## Key Types
//!
//! - [`Gateway`] - The async trait for all remote operations
//! - [`MemoryGateway`] - In-memory backend
//! - [`SqliteGateway`] - SQLite-based backend
//! - [`GatewayError`] - Every remote failure (recoverable, never fatal)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use listsync_gateway::{Gateway, MemoryGateway};
//! use listsync_core::Predicate;
//!
//! async fn example() {
//!     let gateway = MemoryGateway::new();
//!
//!     let mut draft = serde_json::Map::new();
//!     draft.insert("text".into(), "hi".into());
//!     let created = gateway.create("Message", draft).await.unwrap();
//!
//!     let all = gateway.filter("Message", &Predicate::new(), None, Some(50)).await.unwrap();
//!     assert_eq!(all.len(), 1);
//!     # let _ = created;
//! }
//! ```
//!
//! ## Server Semantics
//!
//! - **Server-owned fields**: `create` assigns `id`, `created_date` and
//!   `updated_date`; drafts cannot set them
//! - **Partial updates**: `update` merges the patch shallowly and bumps
//!   `updated_date`; `id` and `created_date` never change
//! - **Queries**: predicates are AND-ed equality matches; the limit applies
//!   after ordering

pub mod error;
pub mod memory;
pub mod migration;
pub mod query;
pub mod sqlite;
pub mod traits;

pub use error::{GatewayError, Result};
pub use memory::MemoryGateway;
pub use query::{apply_query, merge_patch, new_server_id, stamp_created, MonotonicClock};
pub use sqlite::SqliteGateway;
pub use traits::Gateway;
