//! Versioned schema for the SQLite gateway.
//!
//! `MIGRATIONS[n]` moves the schema from version `n` to `n + 1`. Applied
//! versions are recorded in `schema_migrations`; opening an older file
//! applies whatever is missing in one transaction.

use rusqlite::{params, Connection};

use crate::error::{GatewayError, Result};

/// Schema steps, oldest first.
const MIGRATIONS: &[&str] = &[
    // v1: one row per record, full document as JSON
    r#"
    CREATE TABLE records (
        entity TEXT NOT NULL,
        id TEXT NOT NULL,
        seq INTEGER NOT NULL,
        created_date INTEGER NOT NULL,
        updated_date INTEGER NOT NULL,
        body TEXT NOT NULL,
        PRIMARY KEY (entity, id)
    );
    CREATE INDEX idx_records_entity_seq ON records(entity, seq);
    CREATE INDEX idx_records_entity_created ON records(entity, created_date);
    "#,
    // v2: "-updated_date" is the other common sort
    r#"
    CREATE INDEX idx_records_entity_updated ON records(entity, updated_date);
    "#,
];

/// Latest schema version.
pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring the schema up to [`CURRENT_VERSION`]. Safe to call repeatedly.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    migrate_to(conn, CURRENT_VERSION)
}

/// Bring the schema up to `target`.
pub(crate) fn migrate_to(conn: &mut Connection, target: u32) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current = schema_version(conn)?;
    if current > CURRENT_VERSION {
        return Err(GatewayError::Migration(format!(
            "database schema v{} is newer than supported v{}",
            current, CURRENT_VERSION
        )));
    }
    if current >= target {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for version in (current + 1)..=target {
        let sql = MIGRATIONS
            .get(version as usize - 1)
            .ok_or_else(|| GatewayError::Migration(format!("no migration for v{}", version)))?;
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![version, listsync_core::now_millis()],
        )?;
    }
    tx.commit()?;

    tracing::debug!(from = current, to = target, "migrated gateway schema");
    Ok(())
}

/// Highest applied version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}
