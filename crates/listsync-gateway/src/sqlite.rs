//! SQLite implementation of the Gateway trait.
//!
//! A persistent local backend: every entity shares one `records` table and
//! each row stores the full document as JSON. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use listsync_core::{Document, OrderKey, Predicate, RecordId};

use crate::error::{GatewayError, Result};
use crate::memory::document_id;
use crate::migration;
use crate::query::{apply_query, merge_patch, new_server_id, stamp_created, MonotonicClock};
use crate::traits::Gateway;

/// SQLite-based gateway.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteGateway {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
    clock: Arc<MonotonicClock>,
}

impl SqliteGateway {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            clock: Arc::new(MonotonicClock::new()),
        }
    }

    /// Store a document verbatim, bypassing server stamping.
    pub async fn insert_raw(&self, entity: &str, document: Document) -> Result<()> {
        let entity = entity.to_string();
        self.run(move |conn| {
            let id = document_id(&document)?;
            let created = timestamp(&document, "created_date");
            let updated = timestamp(&document, "updated_date");
            let body = serde_json::to_string(&document)?;
            conn.execute(
                "INSERT INTO records (entity, id, seq, created_date, updated_date, body)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(seq), 0) + 1 FROM records WHERE entity = ?1), ?3, ?4, ?5)
                 ON CONFLICT(entity, id) DO UPDATE SET
                    created_date = excluded.created_date,
                    updated_date = excluded.updated_date,
                    body = excluded.body",
                params![entity, id.as_str(), created, updated, body],
            )?;
            Ok(())
        })
        .await
    }

    /// Number of stored documents of an entity.
    pub async fn count(&self, entity: &str) -> Result<usize> {
        let entity = entity.to_string();
        self.run(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM records WHERE entity = ?1",
                params![entity],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
    }

    /// Execute a blocking operation on the connection.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                GatewayError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| GatewayError::Transport(format!("blocking task failed: {}", e)))?
    }
}

/// Read a document's JSON body column.
fn parse_body(body: &str) -> Result<Document> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(GatewayError::Serialization(
            "stored body is not a JSON object".into(),
        )),
    }
}

fn timestamp(document: &Document, field: &str) -> i64 {
    document.get(field).and_then(Value::as_i64).unwrap_or(0)
}

fn load_entity(conn: &Connection, entity: &str) -> Result<Vec<Document>> {
    let mut stmt = conn.prepare("SELECT body FROM records WHERE entity = ?1 ORDER BY seq")?;
    let bodies = stmt
        .query_map(params![entity], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    bodies.iter().map(|b| parse_body(b)).collect()
}

#[async_trait]
impl Gateway for SqliteGateway {
    async fn list(
        &self,
        entity: &str,
        order: Option<&OrderKey>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        self.filter(entity, &Predicate::new(), order, limit).await
    }

    async fn filter(
        &self,
        entity: &str,
        predicate: &Predicate,
        order: Option<&OrderKey>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let entity = entity.to_string();
        let candidates = self.run(move |conn| load_entity(conn, &entity)).await?;
        Ok(apply_query(candidates, predicate, order, limit))
    }

    async fn create(&self, entity: &str, draft: Document) -> Result<Document> {
        let id = new_server_id();
        let now = self.clock.tick();
        let stored = stamp_created(draft, &id, now);
        let body = serde_json::to_string(&stored)?;
        let entity = entity.to_string();

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO records (entity, id, seq, created_date, updated_date, body)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(seq), 0) + 1 FROM records WHERE entity = ?1), ?3, ?3, ?4)",
                params![entity, id.as_str(), now, body],
            )?;
            Ok(())
        })
        .await?;

        Ok(stored)
    }

    async fn update(&self, entity: &str, id: &RecordId, patch: Document) -> Result<Document> {
        let now = self.clock.tick();
        let entity = entity.to_string();
        let id = id.clone();

        self.run(move |conn| {
            let tx = conn.transaction()?;

            let body: Option<String> = tx
                .query_row(
                    "SELECT body FROM records WHERE entity = ?1 AND id = ?2",
                    params![entity, id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            let mut stored = match body {
                Some(body) => parse_body(&body)?,
                None => return Err(GatewayError::NotFound { entity, id }),
            };

            merge_patch(&mut stored, patch, now);

            tx.execute(
                "UPDATE records SET updated_date = ?3, body = ?4 WHERE entity = ?1 AND id = ?2",
                params![entity, id.as_str(), now, serde_json::to_string(&stored)?],
            )?;
            tx.commit()?;

            Ok(stored)
        })
        .await
    }

    async fn delete(&self, entity: &str, id: &RecordId) -> Result<()> {
        let entity = entity.to_string();
        let id = id.clone();

        self.run(move |conn| {
            let changed = conn.execute(
                "DELETE FROM records WHERE entity = ?1 AND id = ?2",
                params![entity, id.as_str()],
            )?;
            if changed == 0 {
                return Err(GatewayError::NotFound { entity, id });
            }
            Ok(())
        })
        .await
    }
}
