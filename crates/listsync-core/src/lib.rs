//! # listsync Core
//!
//! Pure primitives for the synchronized list store: typed records, filter
//! criteria, ordered snapshots and pending-mutation bookkeeping.
//!
//! This crate contains no I/O, no networking and no async code. It is the
//! value layer the store and the gateways share.
//!
//! ## Key Types
//!
//! - [`Entity`] - A typed field set for one backend resource
//! - [`Record`] - An entity value plus its server-owned id and timestamps
//! - [`RecordId`] - Opaque record identifier (server or temporary)
//! - [`Criteria`] - Predicate, ordering and limit for a list query
//! - [`Snapshot`] - Ordered collection of records with unique ids
//! - [`PendingSet`] - At most one in-flight mutation per record id
//!
//! ## Wire Form
//!
//! Records travel as flat JSON objects ([`Document`]): `id`, `created_date`,
//! `updated_date` and the entity's own fields side by side.

pub mod criteria;
pub mod entity;
pub mod error;
pub mod pending;
pub mod snapshot;
pub mod types;

pub use criteria::{compare_values, matches_predicate, Criteria, Direction, OrderKey, Predicate};
pub use entity::{encode_fields, encode_patch, Document, Entity, Record};
pub use error::{CoreError, Result};
pub use pending::{MutationKind, PendingMutation, PendingSet};
pub use snapshot::Snapshot;
pub use types::{now_millis, RecordId};
