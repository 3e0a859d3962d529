//! Entities and records.
//!
//! An [`Entity`] is the typed field set of one backend resource. A
//! [`Record`] wraps an entity value with the fields the server owns: the
//! stable id and the creation/update timestamps.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::types::{now_millis, RecordId};

/// Untyped wire form of a record: one flat JSON object.
pub type Document = serde_json::Map<String, Value>;

/// A typed field set for one backend resource.
///
/// Implementors enumerate the fields a call site reads and writes. Fields the
/// server adds that the entity does not name are ignored on decode.
pub trait Entity:
    Clone + fmt::Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Backend entity name, e.g. `"Message"`.
    const NAME: &'static str;

    /// Partial update. Unset fields must be omitted when serialized.
    type Patch: Clone + fmt::Debug + Send + Sync + Serialize + 'static;

    /// Apply a patch to a local copy (the optimistic guess of the server value).
    fn apply_patch(&mut self, patch: &Self::Patch);
}

/// An entity value as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "E: Serialize", deserialize = "E: DeserializeOwned"))]
pub struct Record<E> {
    /// Stable identifier.
    pub id: RecordId,
    /// Creation time (Unix ms), assigned by the server.
    #[serde(default)]
    pub created_date: i64,
    /// Last update time (Unix ms), assigned by the server.
    #[serde(default)]
    pub updated_date: i64,
    /// Resource-specific attributes.
    #[serde(flatten)]
    pub fields: E,
}

impl<E: Entity> Record<E> {
    /// Build a record from its parts.
    pub fn new(id: impl Into<RecordId>, created_date: i64, fields: E) -> Self {
        Self {
            id: id.into(),
            created_date,
            updated_date: created_date,
            fields,
        }
    }

    /// Build a locally visible placeholder for a draft that is being created.
    pub fn placeholder(fields: E) -> Self {
        let now = now_millis();
        Self {
            id: RecordId::temporary(),
            created_date: now,
            updated_date: now,
            fields,
        }
    }

    /// Whether this record is a local placeholder not yet confirmed.
    pub fn is_placeholder(&self) -> bool {
        self.id.is_temporary()
    }

    /// Copy of this record with a patch applied to its fields.
    pub fn patched(&self, patch: &E::Patch) -> Self {
        let mut next = self.clone();
        next.fields.apply_patch(patch);
        next
    }

    /// Decode a record from its wire form.
    pub fn from_document(document: Document) -> Result<Self> {
        serde_json::from_value(Value::Object(document)).map_err(|e| CoreError::Decode {
            entity: E::NAME,
            message: e.to_string(),
        })
    }

    /// Encode a record to its wire form.
    pub fn to_document(&self) -> Result<Document> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(CoreError::Encode {
                entity: E::NAME,
                message: format!("expected an object, got {}", other),
            }),
            Err(e) => Err(CoreError::Encode {
                entity: E::NAME,
                message: e.to_string(),
            }),
        }
    }

    /// Value of a named field in wire form, `Null` when absent.
    ///
    /// Used for ordering, so `id`, `created_date` and `updated_date` resolve
    /// too.
    pub fn field_value(&self, field: &str) -> Value {
        match field {
            "id" => Value::String(self.id.to_string()),
            "created_date" => Value::from(self.created_date),
            "updated_date" => Value::from(self.updated_date),
            _ => match serde_json::to_value(&self.fields) {
                Ok(Value::Object(mut map)) => map.remove(field).unwrap_or(Value::Null),
                _ => Value::Null,
            },
        }
    }
}

/// Encode a draft entity (no server fields) for a `create` call.
pub fn encode_fields<E: Entity>(fields: &E) -> Result<Document> {
    encode_object(E::NAME, fields)
}

/// Encode a patch for an `update` call.
pub fn encode_patch<E: Entity>(patch: &E::Patch) -> Result<Document> {
    encode_object(E::NAME, patch)
}

fn encode_object<T: Serialize + ?Sized>(entity: &'static str, value: &T) -> Result<Document> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CoreError::Encode {
            entity,
            message: format!("expected an object, got {}", other),
        }),
        Err(e) => Err(CoreError::Encode {
            entity,
            message: e.to_string(),
        }),
    }
}
